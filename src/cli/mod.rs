pub mod commands;

use crate::config::Policy;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hostcount")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Replay frames through verifier-style handlers and inspect per-host counters", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HandlerKind {
    /// Ingress filter counting frames per source address
    Source,
    /// Egress classifier
    Classifier,
    /// Socket verdict gate
    Socket,
    /// sk_msg gate
    Message,
    /// cgroup sock_addr gate
    SockAddr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
    Prometheus,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Replay captured frames through a handler")]
    Replay {
        #[arg(short, long, help = "File with one hex-encoded frame per line")]
        frames: PathBuf,

        #[arg(long, value_enum, default_value = "source", help = "Handler to invoke")]
        handler: HandlerKind,

        #[arg(short, long, help = "Control-plane YAML config")]
        config: Option<PathBuf>,

        #[arg(short, long, value_enum, help = "Override the configured insert policy")]
        policy: Option<Policy>,

        #[arg(short, long, default_value_t = 4, help = "Concurrent replay workers")]
        workers: usize,

        #[arg(long, value_enum, default_value = "table", help = "Output format")]
        format: OutputFormat,
    },
    #[command(about = "Fire the results harness and print its slots")]
    Results {
        #[arg(long, default_value_t = 10)]
        lhs: u64,

        #[arg(long, default_value_t = 20)]
        rhs: u64,

        #[arg(long, value_enum, default_value = "table", help = "Output format")]
        format: OutputFormat,
    },
    #[command(about = "Run the load-time capability check for every handler")]
    Check {
        #[arg(short, long, help = "License string to check against")]
        license: Option<String>,

        #[arg(short, long, help = "Control-plane YAML config")]
        config: Option<PathBuf>,
    },
}
