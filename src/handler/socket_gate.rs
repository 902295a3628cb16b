use super::{AttachContext, Handler, Observed, Outcome, Program};
use hostcount_common::{Capabilities, FrameReader, Invocation, License, ProgramMeta, SkAction};

pub const META: ProgramMeta = ProgramMeta {
    name: "sk_gate",
    section: "sk_skb/stream_verdict",
    license: License::GPL,
    requires: Capabilities::NONE,
};

/// Socket gate admitting every buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketGate;

impl SocketGate {
    pub fn new() -> Self {
        Self
    }
}

impl Program for SocketGate {
    fn meta(&self) -> ProgramMeta {
        META
    }

    fn context(&self) -> AttachContext {
        AttachContext::SocketGate
    }
}

impl Handler for SocketGate {
    type Verdict = SkAction;

    fn observe(&self, frame: &[u8]) -> Observed<SkAction> {
        let reader = FrameReader::new(frame);
        let mut outcome = Outcome::InsufficientData;

        let verdict = Invocation::<SkAction>::new().run(
            || reader.require(1),
            |()| {
                outcome = Outcome::Parsed;
                None
            },
        );

        Observed { verdict, outcome }
    }
}
