//! Socket gates: sk_skb stream verdict, cgroup_skb, sk_msg and
//! cgroup sock_addr
//!
//! All of them admit everything. An empty buffer has nothing to inspect
//! and is passed through like any other short frame. The sk_msg and
//! sock_addr gates read no data at all.

#![no_std]
#![no_main]

use aya_ebpf::{
    macros::{cgroup_skb, cgroup_sock_addr, sk_msg, stream_verdict},
    programs::{SkBuffContext, SkMsgContext, SockAddrContext},
};
use hostcount_common::{fits, InsufficientData, Invocation, SkAction, SockAddrAction, Verdict};

#[no_mangle]
#[link_section = "license"]
pub static LICENSE: [u8; 4] = *b"GPL\0";

#[stream_verdict]
pub fn sk_gate(ctx: SkBuffContext) -> u32 {
    gate(&ctx).raw()
}

#[cgroup_skb]
pub fn cgroup_gate(ctx: SkBuffContext) -> i32 {
    gate(&ctx).raw() as i32
}

#[sk_msg]
pub fn msg_gate(_ctx: SkMsgContext) -> u32 {
    Invocation::<SkAction>::new()
        .run(|| Ok(()), |()| None)
        .raw()
}

#[cgroup_sock_addr(connect4)]
pub fn sock_addr_gate(_ctx: SockAddrContext) -> i32 {
    Invocation::<SockAddrAction>::new()
        .run(|| Ok(()), |()| None)
        .raw()
}

#[inline(always)]
fn gate(ctx: &SkBuffContext) -> SkAction {
    let len = ctx.len() as usize;
    Invocation::<SkAction>::new().run(
        || {
            if fits(0, len, 0, 1) {
                Ok(())
            } else {
                Err(InsufficientData {
                    needed: 1,
                    available: len,
                })
            }
        },
        |()| None,
    )
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}
