pub mod cli;
pub mod config;
pub mod control;
pub mod error;
pub mod handler;
pub mod metrics;
pub mod replay;

pub use config::{ControlPlaneConfig, Policy};
pub use control::ControlPlane;
pub use error::{HostcountError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
