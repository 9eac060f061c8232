//! POSIX `ucontext` substrate, for unix targets without a hand-written
//! `asm` backend. Ported from the reference implementation's
//! `coroutine_using_ucontext.c`: `getcontext`/`makecontext` build the
//! child's initial register image, `swapcontext` does every transfer
//! after that.
//!
//! The inactive-context slot holds a raw pointer to a `ucontext_t` that
//! lives in the *stack frame of whichever `swapcontext` call is
//! currently suspended* — every switch declares a fresh local `ucontext_t`
//! buffer, publishes its address as the new inactive context, and blocks
//! in `swapcontext` until a later switch resumes it. That call frame
//! never truly returns until that happens, so the buffer stays valid for
//! as long as anyone might still swap back into it. This is the same
//! trick the reference implementation's `swap_context_symmetric` uses.
//!
//! `makecontext` only accepts `int` varargs, so the 64-bit trampoline
//! argument pointer crosses as two halves, reassembled on the other
//! side, exactly as the reference implementation does.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;

pub(crate) struct Context {
    inactive: UnsafeCell<*mut libc::ucontext_t>,
}

impl Context {
    pub(crate) fn new() -> Self {
        Context {
            inactive: UnsafeCell::new(std::ptr::null_mut()),
        }
    }
}

unsafe fn swap_symmetric(ctx: &Context, target: *mut libc::ucontext_t) {
    let mut buf: MaybeUninit<libc::ucontext_t> = MaybeUninit::uninit();
    *ctx.inactive.get() = buf.as_mut_ptr();
    let rc = libc::swapcontext(buf.as_mut_ptr(), target);
    debug_assert_eq!(rc, 0, "symcoro: swapcontext failed");
}

pub(crate) fn switch(ctx: &Context) {
    unsafe {
        let target = *ctx.inactive.get();
        debug_assert!(
            !target.is_null(),
            "symcoro: switch() called before bootstrap() on this channel"
        );
        swap_symmetric(ctx, target);
    }
}

/// Terminal hand-off once a coroutine body has returned; identical to
/// `switch` on this substrate, since the buffer this call saves into is
/// simply never resumed.
pub(crate) fn finish(ctx: &Context) {
    switch(ctx)
}

struct TrampolineArgs {
    entry: unsafe extern "C" fn(*mut u8),
    arg: *mut u8,
}

extern "C" fn trampoline_entry(hi: u32, lo: u32) {
    let packed = ((hi as u64) << 32) | lo as u64;
    let args = unsafe { Box::from_raw(packed as *mut TrampolineArgs) };
    unsafe { (args.entry)(args.arg) }
    unreachable!("symcoro: coroutine entry point returned across the ucontext boundary");
}

/// # Safety
/// Same contract as the `asm` substrate's `bootstrap`: `stack` must
/// outlive the channel and not be touched by anyone else while it does.
pub(crate) unsafe fn bootstrap(
    ctx: &Context,
    stack: &mut [u8],
    entry: unsafe extern "C" fn(*mut u8),
    arg: *mut u8,
) {
    let mut dest: MaybeUninit<libc::ucontext_t> = MaybeUninit::uninit();
    let rc = libc::getcontext(dest.as_mut_ptr());
    debug_assert_eq!(rc, 0, "symcoro: getcontext failed");

    let d = &mut *dest.as_mut_ptr();
    d.uc_stack.ss_sp = stack.as_mut_ptr() as *mut libc::c_void;
    d.uc_stack.ss_size = stack.len();
    d.uc_link = std::ptr::null_mut();

    let boxed = Box::new(TrampolineArgs { entry, arg });
    let packed = Box::into_raw(boxed) as u64;
    let hi = (packed >> 32) as u32;
    let lo = packed as u32;

    libc::makecontext(
        dest.as_mut_ptr(),
        std::mem::transmute::<extern "C" fn(u32, u32), extern "C" fn()>(trampoline_entry),
        2,
        hi,
        lo,
    );

    swap_symmetric(ctx, dest.as_mut_ptr());
}
