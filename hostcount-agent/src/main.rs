//! hostcount-agent - loads the counting programs and reports per-host totals
//!
//! The agent:
//! - Loads the source counter, writes the insert policy and seeds known hosts
//! - Attaches it at XDP ingress on one interface
//! - Optionally attaches the results harness to execve
//! - Logs counters on an interval until Ctrl+C

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hostcount-agent", version)]
struct Args {
    #[arg(short, long, default_value = "lo", help = "Interface to attach the XDP counter to")]
    iface: String,

    #[arg(short, long, help = "Control-plane YAML config")]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 5, help = "Seconds between counter reports")]
    interval: u64,

    #[arg(long, help = "Also attach the results harness to execve")]
    harness: bool,
}

#[cfg(not(target_os = "linux"))]
fn main() -> Result<()> {
    let _ = Args::parse();
    eprintln!("Error: hostcount-agent requires Linux to run eBPF programs");
    std::process::exit(1);
}

#[cfg(target_os = "linux")]
#[tokio::main]
async fn main() -> Result<()> {
    use hostcount::ControlPlaneConfig;
    use hostcount_agent::probe_loader::ProbeManager;
    use log::{info, warn};
    use std::time::Duration;
    use tokio::signal;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    info!("hostcount-agent starting...");

    let config = match &args.config {
        Some(path) => ControlPlaneConfig::from_file(path)?,
        None => ControlPlaneConfig::default(),
    };

    let mut manager = ProbeManager::new(&config)?;
    manager.attach_counter(&args.iface)?;

    if args.harness {
        manager.attach_harness(&config.license)?;
    }

    info!("hostcount-agent running. Press Ctrl+C to exit.");

    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval.max(1)));
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            _ = ticker.tick() => {
                match manager.counters() {
                    Ok(entries) => {
                        let total: u64 = entries.iter().map(|e| e.count).sum();
                        info!("{} sources, {} packets", entries.len(), total);
                        for entry in entries.iter().filter(|e| e.count > 0) {
                            info!("  {:<16} {}", entry.addr, entry.count);
                        }
                    }
                    Err(e) => warn!("Failed to read counters: {}", e),
                }

                match manager.results() {
                    Ok(results) => {
                        for entry in results {
                            info!("  result {} = {}", entry.name, entry.value);
                        }
                    }
                    Err(e) => warn!("Failed to read result slots: {}", e),
                }
            }
        }
    }

    manager.unload();

    info!("hostcount-agent stopped");
    Ok(())
}
