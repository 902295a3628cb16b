use super::{AttachContext, Handler, Observed, Outcome, Program};
use hostcount_common::{Capabilities, Invocation, License, ProgramMeta, SkAction};

pub const META: ProgramMeta = ProgramMeta {
    name: "msg_gate",
    section: "sk_msg",
    license: License::GPL,
    requires: Capabilities::NONE,
};

/// sk_msg gate. Messages are admitted without reading their payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageGate;

impl MessageGate {
    pub fn new() -> Self {
        Self
    }
}

impl Program for MessageGate {
    fn meta(&self) -> ProgramMeta {
        META
    }

    fn context(&self) -> AttachContext {
        AttachContext::MessageGate
    }
}

impl Handler for MessageGate {
    type Verdict = SkAction;

    fn observe(&self, _frame: &[u8]) -> Observed<SkAction> {
        let verdict = Invocation::<SkAction>::new().run(|| Ok(()), |()| None);

        Observed {
            verdict,
            outcome: Outcome::Parsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits_any_message() {
        let gate = MessageGate::new();
        for msg in [&[][..], &[0u8; 1][..], &[0xffu8; 4096][..]] {
            let observed = gate.observe(msg);
            assert_eq!(observed.verdict, SkAction::Pass);
            assert_eq!(observed.outcome, Outcome::Parsed);
        }
    }
}
