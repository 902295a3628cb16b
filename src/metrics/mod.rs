pub mod collector;
pub mod exporter;

pub use collector::ReplayStats;
pub use exporter::PrometheusExporter;
