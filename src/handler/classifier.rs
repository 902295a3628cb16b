use super::{AttachContext, Handler, Observed, Outcome, Program};
use hostcount_common::frame::ETH_HDR_LEN;
use hostcount_common::{Capabilities, FrameReader, Invocation, License, ProgramMeta, TcAction};

pub const META: ProgramMeta = ProgramMeta {
    name: "classify_frames",
    section: "classifier",
    license: License::GPL,
    requires: Capabilities::NONE,
};

/// Egress classifier: needs a full Ethernet header, never counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameClassifier;

impl FrameClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Program for FrameClassifier {
    fn meta(&self) -> ProgramMeta {
        META
    }

    fn context(&self) -> AttachContext {
        AttachContext::EgressClassifier
    }
}

impl Handler for FrameClassifier {
    type Verdict = TcAction;

    fn observe(&self, frame: &[u8]) -> Observed<TcAction> {
        let reader = FrameReader::new(frame);
        let mut outcome = Outcome::InsufficientData;

        let verdict = Invocation::<TcAction>::new().run(
            || reader.require(ETH_HDR_LEN),
            |()| {
                outcome = Outcome::Parsed;
                None
            },
        );

        Observed { verdict, outcome }
    }
}
