//! XDP ingress filter counting packets per IPv4 source address
//!
//! This program:
//! - Reads the source address at a fixed offset after a bounds check
//! - Atomically increments the address's counter if the control plane
//!   seeded it (or inserts it when the control map enables that)
//! - Always returns XDP_PASS; counting never decides the packet's fate
//!
//! Note: This binary must be built for the bpfel-unknown-none target.
//! hostcount-agent's build.rs handles cross-compilation.

#![no_std]
#![no_main]

use aya_ebpf::{
    bindings::BPF_NOEXIST,
    macros::{map, xdp},
    maps::{Array, HashMap},
    programs::XdpContext,
};
use core::sync::atomic::AtomicU64;
use hostcount_common::{
    control,
    frame::{packet_fits, InsufficientData, SRC_ADDR},
    table::bump,
    Increment, InsertPolicy, Invocation, Verdict, XdpAction, COUNTER_CAPACITY,
};

#[no_mangle]
#[link_section = "license"]
pub static LICENSE: [u8; 4] = *b"GPL\0";

#[map]
static CONNECTION_COUNTER: HashMap<u32, u64> =
    HashMap::with_max_entries(COUNTER_CAPACITY as u32, 0);

#[map]
static CONTROL: Array<u32> = Array::with_max_entries(control::SLOTS, 0);

#[xdp]
pub fn filter_packets(ctx: XdpContext) -> u32 {
    let mut invocation = Invocation::<XdpAction>::new();
    invocation
        .run(|| source_key(&ctx), |key| Some(count_source(key)))
        .raw()
}

#[inline(always)]
fn source_key(ctx: &XdpContext) -> Result<u32, InsufficientData> {
    let data = ctx.data();
    let data_end = ctx.data_end();

    if !packet_fits(data, data_end, SRC_ADDR.offset(), SRC_ADDR.width()) {
        return Err(InsufficientData {
            needed: SRC_ADDR.end(),
            available: data_end.saturating_sub(data),
        });
    }

    // SAFETY: the four bytes at the offset were bounds checked above
    let key = unsafe { core::ptr::read_unaligned((data + SRC_ADDR.offset()) as *const u32) };
    Ok(key)
}

#[inline(always)]
fn count_source(key: u32) -> Increment {
    if let Some(count) = counter(key) {
        return bump(count);
    }

    match insert_policy() {
        InsertPolicy::LookupOnly => Increment::NotFound,
        InsertPolicy::LookupOrInsert => {
            if CONNECTION_COUNTER.insert(&key, &1, BPF_NOEXIST as u64).is_ok() {
                return Increment::Inserted;
            }
            // Another CPU inserted first, or the map is full
            match counter(key) {
                Some(count) => bump(count),
                None => Increment::NotFound,
            }
        }
    }
}

#[inline(always)]
fn counter(key: u32) -> Option<&'static AtomicU64> {
    let ptr = CONNECTION_COUNTER.get_ptr_mut(&key)?;
    // SAFETY: map values are 8-byte aligned and live as long as the map
    Some(unsafe { AtomicU64::from_ptr(ptr) })
}

#[inline(always)]
fn insert_policy() -> InsertPolicy {
    match CONTROL.get(control::SLOT_INSERT_POLICY) {
        Some(raw) => InsertPolicy::from_raw(*raw),
        None => InsertPolicy::LookupOnly,
    }
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}
