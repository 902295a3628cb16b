//! Tracepoint harness for value propagation
//!
//! On every execve, stores the results of fixed arithmetic on 10 and 20
//! into the RESULTS array so the agent can verify them.

#![no_std]
#![no_main]

use aya_ebpf::{
    macros::{map, tracepoint},
    maps::Array,
    programs::TracePointContext,
};
use hostcount_common::{
    results::{slot, Arithmetic},
    RESULTS_CAPACITY,
};

const LHS: u64 = 10;
const RHS: u64 = 20;

#[no_mangle]
#[link_section = "license"]
pub static LICENSE: [u8; 4] = *b"GPL\0";

#[map]
static RESULTS: Array<u64> = Array::with_max_entries(RESULTS_CAPACITY as u32, 0);

#[tracepoint]
pub fn tp_execve_vars(_ctx: TracePointContext) -> u32 {
    let r = Arithmetic::compute(LHS, RHS);

    store(slot::SUM, r.sum);
    store(slot::DIFFERENCE, r.difference);
    store(slot::PRODUCT, r.product);
    store(slot::QUOTIENT, r.quotient);
    store(slot::REMAINDER, r.remainder);

    0
}

#[inline(always)]
fn store(index: u32, value: u64) {
    if let Some(ptr) = RESULTS.get_ptr_mut(index) {
        // SAFETY: array values live as long as the map
        unsafe { *ptr = value };
    }
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}
