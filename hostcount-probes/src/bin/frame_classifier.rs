//! tc egress classifier
//!
//! Checks that a full Ethernet header is present and lets the frame
//! continue. Short frames are passed through unmodified.

#![no_std]
#![no_main]

use aya_ebpf::{macros::classifier, programs::TcContext};
use hostcount_common::{
    frame::{packet_fits, InsufficientData, ETH_HDR_LEN},
    Invocation, TcAction, Verdict,
};

#[no_mangle]
#[link_section = "license"]
pub static LICENSE: [u8; 4] = *b"GPL\0";

#[classifier]
pub fn classify_frames(ctx: TcContext) -> i32 {
    let mut invocation = Invocation::<TcAction>::new();
    invocation.run(|| ethernet_header(&ctx), |()| None).raw()
}

#[inline(always)]
fn ethernet_header(ctx: &TcContext) -> Result<(), InsufficientData> {
    if !packet_fits(ctx.data(), ctx.data_end(), 0, ETH_HDR_LEN) {
        return Err(InsufficientData {
            needed: ETH_HDR_LEN,
            available: ctx.len() as usize,
        });
    }
    Ok(())
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}
