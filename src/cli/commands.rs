use crate::cli::{Commands, HandlerKind, OutputFormat};
use crate::config::{ControlPlaneConfig, Policy};
use crate::control::{ResultEntry, TableSnapshot};
use crate::handler::{self, Handler};
use crate::metrics::collector::ReplaySummary;
use crate::metrics::{PrometheusExporter, ReplayStats};
use crate::{replay, ControlPlane, HostcountError, Result};
use hostcount_common::{check_license, InsertPolicy, ProgramMeta};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub async fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Replay {
            frames,
            handler,
            config,
            policy,
            workers,
            format,
        } => handle_replay(frames, handler, config, policy, workers, format).await,
        Commands::Results { lhs, rhs, format } => handle_results(lhs, rhs, format),
        Commands::Check { license, config } => handle_check(license, config),
    }
}

fn load_config(path: Option<&Path>, policy: Option<Policy>) -> Result<ControlPlaneConfig> {
    let mut config = match path {
        Some(path) => ControlPlaneConfig::from_file(path)?,
        None => ControlPlaneConfig::default(),
    };
    if let Some(policy) = policy {
        config.insert_policy = policy;
    }
    Ok(config)
}

#[derive(Serialize)]
struct ReplayReport {
    handler: &'static str,
    frames: usize,
    summary: ReplaySummary,
    table: TableSnapshot,
}

async fn handle_replay(
    frames: PathBuf,
    kind: HandlerKind,
    config: Option<PathBuf>,
    policy: Option<Policy>,
    workers: usize,
    format: OutputFormat,
) -> Result<()> {
    let config = load_config(config.as_deref(), policy)?;
    let plane = ControlPlane::from_config(&config)?;

    let frames: Arc<[bytes::Bytes]> = replay::load_frames(&frames).await?.into();
    let stats = ReplayStats::new();

    let name = match kind {
        HandlerKind::Source => {
            let handler = Arc::new(plane.source_counter()?);
            run(handler, frames.clone(), workers, stats.clone()).await?
        }
        HandlerKind::Classifier => {
            let handler = Arc::new(plane.frame_classifier()?);
            run(handler, frames.clone(), workers, stats.clone()).await?
        }
        HandlerKind::Socket => {
            let handler = Arc::new(plane.socket_gate()?);
            run(handler, frames.clone(), workers, stats.clone()).await?
        }
        HandlerKind::Message => {
            let handler = Arc::new(plane.message_gate()?);
            run(handler, frames.clone(), workers, stats.clone()).await?
        }
        HandlerKind::SockAddr => {
            let handler = Arc::new(plane.sock_addr_gate()?);
            run(handler, frames.clone(), workers, stats.clone()).await?
        }
    };

    let report = ReplayReport {
        handler: name,
        frames: frames.len(),
        summary: stats.summary(),
        table: plane.snapshot(),
    };
    info!(
        "Replay finished: {} invocations, {} short frames",
        report.summary.invocations, report.summary.short_frames
    );

    match format {
        OutputFormat::Table => print_replay_table(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
        OutputFormat::Prometheus => {
            let exporter = PrometheusExporter::new()?;
            exporter.record_table(&report.table);
            exporter.record_replay(&report.summary);
            print!("{}", exporter.render()?);
        }
    }
    Ok(())
}

async fn run<H: Handler + 'static>(
    handler: Arc<H>,
    frames: Arc<[bytes::Bytes]>,
    workers: usize,
    stats: ReplayStats,
) -> Result<&'static str> {
    let name = handler.meta().name;
    replay::replay(handler, frames, workers, stats).await?;
    Ok(name)
}

fn print_replay_table(report: &ReplayReport) {
    let summary = &report.summary;
    println!("Handler:      {}", report.handler);
    println!("Frames:       {}", report.frames);
    println!("Invocations:  {}", summary.invocations);
    println!("Short frames: {}", summary.short_frames);
    println!("Counted:      {}", summary.counted);
    println!("Inserted:     {}", summary.inserted);
    println!("Missed:       {}", summary.missed);
    for (verdict, count) in &summary.verdicts {
        println!("Verdict {:<14} {}", verdict, count);
    }

    println!();
    println!(
        "Counting table ({}, {}/{} slots)",
        report.table.policy, report.table.len, report.table.capacity
    );
    println!("{:<18} {:>12}", "SOURCE", "PACKETS");
    for entry in &report.table.entries {
        println!("{:<18} {:>12}", entry.addr, entry.count);
    }
}

fn handle_results(lhs: u64, rhs: u64, format: OutputFormat) -> Result<()> {
    let plane = ControlPlane::new(InsertPolicy::LookupOnly);
    let harness = plane.results_harness(lhs, rhs)?;
    let ret = harness.fire();
    info!("Results harness returned {}", ret);

    let results = plane.results_snapshot();
    match format {
        OutputFormat::Table => print_results_table(&results),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&results)?),
        OutputFormat::Prometheus => {
            let exporter = PrometheusExporter::new()?;
            exporter.record_results(&results);
            print!("{}", exporter.render()?);
        }
    }
    Ok(())
}

fn print_results_table(results: &[ResultEntry]) {
    println!("{:<6} {:<12} {:>20}", "SLOT", "NAME", "VALUE");
    for entry in results {
        println!("{:<6} {:<12} {:>20}", entry.slot, entry.name, entry.value);
    }
}

const PROGRAMS: [ProgramMeta; 6] = [
    handler::source_counter::META,
    handler::classifier::META,
    handler::socket_gate::META,
    handler::msg_gate::META,
    handler::sock_addr::META,
    handler::results::META,
];

fn handle_check(license: Option<String>, config: Option<PathBuf>) -> Result<()> {
    let license = match license {
        Some(license) => license,
        None => load_config(config.as_deref(), None)?.license,
    };

    let mut rejected = 0;
    for meta in &PROGRAMS {
        match check_license(meta.name, &license, meta.requires) {
            Ok(()) => println!("{:<16} {:<28} ok", meta.name, meta.section),
            Err(e) => {
                warn!("{}", e);
                println!("{:<16} {:<28} rejected", meta.name, meta.section);
                rejected += 1;
            }
        }
    }

    if rejected > 0 {
        return Err(HostcountError::ConfigError(format!(
            "{} of {} programs cannot load under license {:?}",
            rejected,
            PROGRAMS.len(),
            license
        )));
    }
    Ok(())
}
