//! eBPF programs for hostcount
//!
//! Each binary in src/bin/ is one attachment context:
//! - `source_counter`: XDP ingress filter counting packets per IPv4 source
//! - `frame_classifier`: tc egress classifier
//! - `socket_gate`: sk_skb stream verdict and cgroup_skb gate
//! - `results_harness`: tracepoint writing arithmetic results
//!
//! All of them share the bounds predicate and verdict types from
//! hostcount-common, so kernel and userspace agree on boundary behavior.

#![cfg_attr(not(test), no_std)]

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}
