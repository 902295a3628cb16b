//! Userspace handlers, one per attachment context
//!
//! Each handler runs the same linear pipeline as its kernel counterpart:
//! frame reader -> counting table (optional) -> dispatcher. Shared state is
//! passed in as `Arc` handles, never reached through globals.

pub mod classifier;
pub mod msg_gate;
pub mod results;
pub mod sock_addr;
pub mod socket_gate;
pub mod source_counter;

pub use classifier::FrameClassifier;
pub use msg_gate::MessageGate;
pub use results::ResultsHarness;
pub use sock_addr::SockAddrGate;
pub use socket_gate::SocketGate;
pub use source_counter::SourceCounter;

use hostcount_common::{CountingTable, Increment, ProgramMeta, ResultsSlots, Verdict};
use std::sync::Arc;

/// Counting table shared by every invocation and the control plane
pub type SharedTable = Arc<CountingTable>;

/// Result slots shared by the harness and the control plane
pub type SharedResults = Arc<ResultsSlots>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachContext {
    IngressFilter,
    EgressClassifier,
    SocketGate,
    MessageGate,
    SockAddr,
    Tracepoint,
}

impl AttachContext {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AttachContext::IngressFilter => "ingress-filter",
            AttachContext::EgressClassifier => "egress-classifier",
            AttachContext::SocketGate => "socket-gate",
            AttachContext::MessageGate => "message-gate",
            AttachContext::SockAddr => "sock-addr",
            AttachContext::Tracepoint => "tracepoint",
        }
    }
}

impl std::fmt::Display for AttachContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static declaration consumed by the control plane before deployment.
pub trait Program {
    fn meta(&self) -> ProgramMeta;

    fn context(&self) -> AttachContext;
}

/// What happened inside one invocation, besides the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The frame was too short; nothing was read or counted.
    InsufficientData,
    /// The frame parsed and the handler does not count.
    Parsed,
    /// The frame parsed and the table was consulted.
    Counted(Increment),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observed<V> {
    pub verdict: V,
    pub outcome: Outcome,
}

/// A handler invoked once per frame.
pub trait Handler: Program + Send + Sync {
    type Verdict: Verdict + Send;

    /// Run one invocation and report its outcome alongside the verdict.
    fn observe(&self, frame: &[u8]) -> Observed<Self::Verdict>;

    fn invoke(&self, frame: &[u8]) -> Self::Verdict {
        self.observe(frame).verdict
    }
}
