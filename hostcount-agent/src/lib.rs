//! Node agent for hostcount
//!
//! Responsibilities:
//! - Load the source counter and results harness into the kernel
//! - Write the insert policy and seed known hosts before attaching
//! - Read counters and result slots back for reporting

#[cfg(target_os = "linux")]
pub mod probe_loader;
