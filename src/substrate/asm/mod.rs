//! Native per-architecture context switch.
//!
//! The heavy lifting lives in hand-written assembly compiled by
//! `build.rs` (`x86_64.S` / `aarch64.S`, ported from the reference C
//! implementation's `BOOTSTRAP_CONTEXT`/`SWAP_CONTEXT` macros). Both
//! routines save only the callee-saved registers and the stack pointer;
//! the stack pointer doubles as the entire inactive-context record, the
//! same "windowed" technique used for this kernel's own scheduler
//! switch. No heap allocation, no syscalls, no locks: a handful of
//! memory accesses and one indirect jump.

use std::cell::UnsafeCell;

extern "C" {
    /// Saves the caller's callee-saved registers and stack pointer into
    /// `*ctx`, loads the peer's previously-saved stack pointer from the
    /// same slot, and resumes there. Symmetric: calling it again from the
    /// peer swaps back.
    fn symcoro_swap(ctx: *mut usize);

    /// Saves the caller's registers into `*ctx` exactly like
    /// `symcoro_swap`, then switches to `new_sp` and calls
    /// `entry(arg)`. `entry` must not return.
    fn symcoro_bootstrap(ctx: *mut usize, new_sp: usize, entry: unsafe extern "C" fn(*mut u8), arg: *mut u8);
}

/// Inactive-context storage: the suspended peer's saved stack pointer,
/// or zero before the first transfer has ever happened.
pub(crate) struct Context {
    slot: UnsafeCell<usize>,
}

impl Context {
    pub(crate) fn new() -> Self {
        Context {
            slot: UnsafeCell::new(0),
        }
    }
}

pub(crate) fn switch(ctx: &Context) {
    unsafe { symcoro_swap(ctx.slot.get()) }
}

/// Terminal hand-off once a coroutine body has returned. On this
/// substrate there is nothing special about the last switch: the
/// register window is saved like any other, it is simply never resumed.
pub(crate) fn finish(ctx: &Context) {
    switch(ctx)
}

/// # Safety
/// `stack` must be at least large enough for one activation of `entry`
/// and must not be referenced again until the channel is destroyed.
pub(crate) unsafe fn bootstrap(
    ctx: &Context,
    stack: &mut [u8],
    entry: unsafe extern "C" fn(*mut u8),
    arg: *mut u8,
) {
    let top = (stack.as_mut_ptr() as usize + stack.len()) & !0xf;
    symcoro_bootstrap(ctx.slot.get(), top, entry, arg)
}
