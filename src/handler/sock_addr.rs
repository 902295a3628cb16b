use super::{AttachContext, Handler, Observed, Outcome, Program};
use hostcount_common::{Capabilities, Invocation, License, ProgramMeta, SockAddrAction};

pub const META: ProgramMeta = ProgramMeta {
    name: "sock_addr_gate",
    section: "cgroup/connect4",
    license: License::GPL,
    requires: Capabilities::NONE,
};

/// cgroup sock_addr gate allowing every connection attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct SockAddrGate;

impl SockAddrGate {
    pub fn new() -> Self {
        Self
    }
}

impl Program for SockAddrGate {
    fn meta(&self) -> ProgramMeta {
        META
    }

    fn context(&self) -> AttachContext {
        AttachContext::SockAddr
    }
}

impl Handler for SockAddrGate {
    type Verdict = SockAddrAction;

    fn observe(&self, _frame: &[u8]) -> Observed<SockAddrAction> {
        let verdict = Invocation::<SockAddrAction>::new().run(|| Ok(()), |()| None);

        Observed {
            verdict,
            outcome: Outcome::Parsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostcount_common::Verdict;

    #[test]
    fn test_allows_connection() {
        let gate = SockAddrGate::new();
        assert_eq!(gate.invoke(&[]), SockAddrAction::Allow);
        assert_eq!(gate.invoke(&[0u8; 16]).raw(), 1);
    }
}
