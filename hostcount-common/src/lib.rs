//! Shared types between eBPF (kernel) and userspace
//!
//! This crate holds the pieces of the packet-counting pipeline that must
//! behave identically in kernel programs and in userspace:
//! - `frame`: bounds-checked field reads from a raw frame
//! - `table`: fixed-capacity lock-free counting table
//! - `results`: fixed result slots written by the arithmetic harness
//! - `verdict`: per-attachment verdict enumerations and the dispatcher
//! - `license`: static license/capability declarations checked at load time
//!
//! Everything here is `no_std` compatible and allocation free.

#![cfg_attr(not(feature = "userspace"), no_std)]

pub mod frame;
pub mod license;
pub mod results;
pub mod table;
pub mod verdict;

pub use frame::{fits, Field, FrameReader, InsufficientData, Scalar};
pub use license::{
    check_capabilities, check_license, Capabilities, CapabilityError, License, ProgramMeta,
};
pub use results::{Arithmetic, ResultsSlots, RESULTS_CAPACITY};
pub use table::{CountingTable, Increment, InsertPolicy, TableFull, COUNTER_CAPACITY};
pub use verdict::{
    dispatch, Invocation, SkAction, SockAddrAction, Stage, TcAction, Verdict, XdpAction,
};

/// Map names shared by the kernel programs and the agent
pub mod maps {
    /// Per-source-address packet counters (hash, u32 -> u64)
    pub const CONNECTION_COUNTER: &str = "CONNECTION_COUNTER";
    /// Arithmetic harness result slots (array, u32 -> u64)
    pub const RESULTS: &str = "RESULTS";
    /// Control-plane settings read by the kernel programs (array, u32 -> u32)
    pub const CONTROL: &str = "CONTROL";
}

/// Slots of the `CONTROL` array map
pub mod control {
    /// Insert policy, see [`crate::table::InsertPolicy::as_raw`]
    pub const SLOT_INSERT_POLICY: u32 = 0;
    /// Number of control slots
    pub const SLOTS: u32 = 4;
}

#[cfg(feature = "userspace")]
const _: () = {
    assert!(
        frame::MIN_SOURCE_FRAME_LEN == 30,
        "source counting needs Ethernet + IPv4 up to the source address"
    );
    assert!(
        core::mem::size_of::<XdpAction>() == 4,
        "XdpAction must match the 32-bit XDP return code"
    );
    assert!(
        RESULTS_CAPACITY >= results::slot::NAMES.len(),
        "every named result needs a slot"
    );
};
