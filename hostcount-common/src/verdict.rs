//! Verdicts per attachment context and the dispatcher
//!
//! Each attachment context owns a separate enumeration, so a handler cannot
//! return a code that is meaningless to the hook it runs on:
//! - `XdpAction`: ingress filter (redirect-capable set)
//! - `TcAction`: egress classifier (transmit-classifier set)
//! - `SkAction`: socket gates (sk_skb, sk_msg, cgroup_skb)
//! - `SockAddrAction`: cgroup sock_addr hooks (connect, bind, sendmsg)
//!
//! Dispatch policy, in priority order:
//! 1. frame too short -> the context's pass-through verdict
//! 2. otherwise -> the context's continue verdict, whether or not the
//!    counting table had the key

use crate::frame::InsufficientData;
use crate::table::Increment;

/// A verdict code understood by one attachment context.
pub trait Verdict: Copy + Eq + core::fmt::Debug {
    /// Raw type returned to the invoking runtime
    type Raw: Copy;

    /// Returned when the frame is too short to parse
    const PASS_THROUGH: Self;

    /// Returned after a completed parse
    const CONTINUE: Self;

    fn raw(self) -> Self::Raw;

    fn name(self) -> &'static str;
}

/// XDP return codes
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XdpAction {
    Aborted = 0,
    Drop = 1,
    Pass = 2,
    Tx = 3,
    Redirect = 4,
}

impl Verdict for XdpAction {
    type Raw = u32;

    const PASS_THROUGH: Self = XdpAction::Pass;
    const CONTINUE: Self = XdpAction::Pass;

    fn raw(self) -> u32 {
        self as u32
    }

    fn name(self) -> &'static str {
        match self {
            XdpAction::Aborted => "XDP_ABORTED",
            XdpAction::Drop => "XDP_DROP",
            XdpAction::Pass => "XDP_PASS",
            XdpAction::Tx => "XDP_TX",
            XdpAction::Redirect => "XDP_REDIRECT",
        }
    }
}

/// Traffic control classifier return codes
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TcAction {
    Unspec = -1,
    Ok = 0,
    Shot = 2,
}

impl Verdict for TcAction {
    type Raw = i32;

    const PASS_THROUGH: Self = TcAction::Ok;
    const CONTINUE: Self = TcAction::Ok;

    fn raw(self) -> i32 {
        self as i32
    }

    fn name(self) -> &'static str {
        match self {
            TcAction::Unspec => "TC_ACT_UNSPEC",
            TcAction::Ok => "TC_ACT_OK",
            TcAction::Shot => "TC_ACT_SHOT",
        }
    }
}

/// Socket gate return codes (sk_skb, cgroup_skb)
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkAction {
    Drop = 0,
    Pass = 1,
}

impl Verdict for SkAction {
    type Raw = u32;

    const PASS_THROUGH: Self = SkAction::Pass;
    const CONTINUE: Self = SkAction::Pass;

    fn raw(self) -> u32 {
        self as u32
    }

    fn name(self) -> &'static str {
        match self {
            SkAction::Drop => "SK_DROP",
            SkAction::Pass => "SK_PASS",
        }
    }
}

/// cgroup sock_addr return codes
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SockAddrAction {
    Reject = 0,
    Allow = 1,
}

impl Verdict for SockAddrAction {
    type Raw = i32;

    const PASS_THROUGH: Self = SockAddrAction::Allow;
    const CONTINUE: Self = SockAddrAction::Allow;

    fn raw(self) -> i32 {
        self as i32
    }

    fn name(self) -> &'static str {
        match self {
            SockAddrAction::Reject => "SOCK_ADDR_REJECT",
            SockAddrAction::Allow => "SOCK_ADDR_ALLOW",
        }
    }
}

/// Select the verdict for a parse outcome and an optional table outcome.
///
/// `lookup` is `None` when the handler does not count. Counting never
/// gates the verdict.
#[inline(always)]
pub fn dispatch<V: Verdict>(read: Result<(), InsufficientData>, lookup: Option<Increment>) -> V {
    match (read, lookup) {
        (Err(_), _) => V::PASS_THROUGH,
        (Ok(()), None) => V::CONTINUE,
        (Ok(()), Some(Increment::Updated(_) | Increment::Inserted | Increment::NotFound)) => {
            V::CONTINUE
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage<V> {
    Parsing,
    Done(V),
}

/// Single-shot invocation: `Parsing` until the first `run`, then `Done`.
/// Running a finished invocation returns the stored verdict and touches
/// nothing.
#[derive(Debug)]
pub struct Invocation<V> {
    stage: Stage<V>,
}

impl<V: Verdict> Invocation<V> {
    pub const fn new() -> Self {
        Self {
            stage: Stage::Parsing,
        }
    }

    pub fn stage(&self) -> Stage<V> {
        self.stage
    }

    pub fn is_done(&self) -> bool {
        matches!(self.stage, Stage::Done(_))
    }

    /// Run `read`, then `count` on the extracted field, then dispatch.
    /// `count` is not called when `read` fails.
    pub fn run<T, R, C>(&mut self, read: R, count: C) -> V
    where
        R: FnOnce() -> Result<T, InsufficientData>,
        C: FnOnce(T) -> Option<Increment>,
    {
        if let Stage::Done(verdict) = self.stage {
            return verdict;
        }

        let verdict = match read() {
            Err(short) => dispatch(Err(short), None),
            Ok(field) => {
                let lookup = count(field);
                dispatch(Ok(()), lookup)
            }
        };
        self.stage = Stage::Done(verdict);
        verdict
    }
}

impl<V: Verdict> Default for Invocation<V> {
    fn default() -> Self {
        Self::new()
    }
}
