//! OS-thread-plus-condvar substrate, the portable fallback for targets
//! with neither a hand-written `asm` backend nor `ucontext`. Context
//! switching is real thread parking rather than a register swap, about
//! three orders of magnitude slower and with no hard-realtime guarantee,
//! but it works anywhere `std::thread` does.
//!
//! Ported from the reference implementation's `coroutine_using_pthreads.c`,
//! with one deliberate deviation: the reference keeps a single
//! thread-local "tree mutex" shared by every coroutine spawned from the
//! same OS thread, so that nested coroutines sharing an ancestor can
//! still be woken correctly. That coupling is exactly the kind of
//! action-at-a-distance this crate's handle-ownership model is meant to
//! rule out, so each channel gets its own private `Mutex`/`Condvar` pair
//! instead: nesting still works (a coroutine body is free to spawn and
//! switch to further coroutines; each pair is independent), and one
//! channel's lock contention can never stall an unrelated one.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

struct Shared {
    mutex: Mutex<Turn>,
    condvar: Condvar,
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum Turn {
    Parent,
    Child,
}

pub(crate) struct Context {
    shared: Arc<Shared>,
    handle: std::cell::RefCell<Option<JoinHandle<()>>>,
}

impl Context {
    pub(crate) fn new() -> Self {
        Context {
            shared: Arc::new(Shared {
                mutex: Mutex::new(Turn::Parent),
                condvar: Condvar::new(),
            }),
            handle: std::cell::RefCell::new(None),
        }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        // Only reached once the channel has observed termination (the
        // owning `Coroutine` drives the close protocol to completion
        // first), so the thread is either already exiting or blocked
        // forever on its own condvar wait, which never happens once
        // `entry` has returned.
        if let Some(handle) = self.handle.borrow_mut().take() {
            let _ = handle.join();
        }
    }
}

fn wait_for_turn(shared: &Shared, want: Turn) {
    let mut turn = shared.mutex.lock().unwrap_or_else(|e| e.into_inner());
    while *turn != want {
        turn = shared
            .condvar
            .wait(turn)
            .unwrap_or_else(|e| e.into_inner());
    }
}

fn hand_off(shared: &Shared, to: Turn) {
    *shared.mutex.lock().unwrap_or_else(|e| e.into_inner()) = to;
    shared.condvar.notify_all();
}

/// Raw pointers aren't `Send`, but the mutex/condvar hand-off guarantees
/// only one of {parent thread, child thread} ever touches the pointee at
/// a time, so moving them across the spawn boundary is sound.
struct SendPtr<T>(*mut T);
unsafe impl<T> Send for SendPtr<T> {}

pub(crate) fn switch(ctx: &Context) {
    // Whichever side calls switch() is relinquishing its turn; figure out
    // which turn that is by reading the current value, which is always
    // "us" right before we flip it (the protocol never calls switch()
    // except while holding the turn).
    let mine = *ctx.shared.mutex.lock().unwrap_or_else(|e| e.into_inner());
    let other = match mine {
        Turn::Parent => Turn::Child,
        Turn::Child => Turn::Parent,
    };
    hand_off(&ctx.shared, other);
    wait_for_turn(&ctx.shared, mine);
}

/// Terminal hand-off used once a coroutine body has returned. Unlike
/// `switch`, this does not wait to be resumed: the calling (child)
/// thread is about to exit for good, and blocking here would wedge
/// `Context::drop`'s join forever.
pub(crate) fn finish(ctx: &Context) {
    hand_off(&ctx.shared, Turn::Parent);
}

/// # Safety
/// `stack`'s length becomes the spawned thread's stack size (its
/// contents are otherwise unused, since the OS manages the thread's own
/// stack); `arg` must point at memory that outlives the channel (in
/// practice: `'static`, since it is about to be shared with a detached
/// OS thread).
pub(crate) unsafe fn bootstrap(
    ctx: &Context,
    stack: &mut [u8],
    entry: unsafe extern "C" fn(*mut u8),
    arg: *mut u8,
) {
    let stack_size = stack.len();
    let shared = Arc::clone(&ctx.shared);
    let entry_bits = entry as usize;
    let arg_ptr = SendPtr(arg);

    wait_for_turn_init(&shared);

    let handle = std::thread::Builder::new()
        .stack_size(stack_size.max(64 * 1024))
        .spawn(move || {
            let entry: unsafe extern "C" fn(*mut u8) =
                unsafe { std::mem::transmute::<usize, unsafe extern "C" fn(*mut u8)>(entry_bits) };
            let arg = arg_ptr.0;
            wait_for_turn(&shared, Turn::Child);
            unsafe { entry(arg) }
        })
        .expect("symcoro: failed to spawn fallback coroutine thread");

    *ctx.handle.borrow_mut() = Some(handle);

    // Hand off to the child and block until it (eventually) hands back,
    // mirroring the reference implementation's startup rendezvous.
    hand_off(&ctx.shared, Turn::Child);
    wait_for_turn(&ctx.shared, Turn::Parent);
}

fn wait_for_turn_init(shared: &Shared) {
    // Nothing to wait for yet; the lock simply establishes happens-before
    // ordering with the spawned thread's first lock acquisition.
    let _ = shared.mutex.lock().unwrap_or_else(|e| e.into_inner());
}
