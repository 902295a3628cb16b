use super::{AttachContext, Program, SharedResults};
use hostcount_common::{Arithmetic, Capabilities, License, ProgramMeta};

pub const META: ProgramMeta = ProgramMeta {
    name: "tp_execve_vars",
    section: "tracepoint/syscalls/sys_enter_execve",
    license: License::GPL,
    requires: Capabilities::RESULTS_SLOTS,
};

/// Tracepoint harness storing fixed arithmetic into the result slots.
#[derive(Debug, Clone)]
pub struct ResultsHarness {
    results: SharedResults,
    lhs: u64,
    rhs: u64,
}

impl ResultsHarness {
    pub fn new(results: SharedResults, lhs: u64, rhs: u64) -> Self {
        Self { results, lhs, rhs }
    }

    /// One tracepoint hit. Returns the tracepoint's exit code, always 0.
    pub fn fire(&self) -> u32 {
        Arithmetic::compute(self.lhs, self.rhs).store_into(&self.results);
        0
    }
}

impl Program for ResultsHarness {
    fn meta(&self) -> ProgramMeta {
        META
    }

    fn context(&self) -> AttachContext {
        AttachContext::Tracepoint
    }
}
