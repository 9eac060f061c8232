use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::any::Any;
use std::cell::{Cell, UnsafeCell};
use std::marker::PhantomData;
use std::mem;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::ptr::{self, NonNull};

use crate::error::CreateError;
use crate::substrate::{self, Context};

/// Default stack size for [`Coroutine::spawn`], matching the reference
/// implementation's `coroutine_create` default.
pub const DEFAULT_STACK_SIZE: usize = 512 * 1024;

/// Smallest block this crate will place a channel and stack into.
/// Below this there isn't room for a useful activation record on any
/// supported target.
pub const MIN_STACK_SIZE: usize = 16 * 1024;

const CHANNEL_ALIGN: usize = 64;

/// The rendezvous mailbox: at any instant holds nothing, a value handed
/// across the last switch, or a close request, but never more than one
/// of those at a time.
enum Slot<T> {
    Empty,
    Close,
    Value(T),
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Empty
    }
}

type Body<T> = Box<dyn FnOnce(&Channel<T>) + 'static>;

/// The shared rendezvous object a parent and its child coroutine switch
/// through. A `Channel` is always reached through a [`Coroutine`] handle
/// (from the parent side) or through the `&Channel<T>` reference a
/// running body is invoked with (from the child side) -- the type never
/// appears on its own in application code.
pub struct Channel<T> {
    ctx: Context,
    body: UnsafeCell<Option<Body<T>>>,
    slot: UnsafeCell<Slot<T>>,
    terminated: Cell<bool>,
    panic: UnsafeCell<Option<Box<dyn Any + Send + 'static>>>,
}

impl<T> Channel<T> {
    /// Size in bytes of the channel header itself (everything other
    /// than the stack it sits above). Together with
    /// [`Channel::<T>::STACK_ALIGNMENT`], lets a `spawn_in` caller
    /// compute exactly how large a block to supply: at least
    /// `HEADER_LEN + MIN_STACK_SIZE` bytes, aligned to
    /// `STACK_ALIGNMENT`.
    pub const HEADER_LEN: usize = mem::size_of::<Channel<T>>();

    /// Alignment required of the block passed to `spawn_in`, and of the
    /// channel header's placement within it. At least `CHANNEL_ALIGN`,
    /// bumped up further if `T` itself demands stricter alignment than
    /// that.
    pub const STACK_ALIGNMENT: usize = {
        let t_align = mem::align_of::<Channel<T>>();
        if t_align > CHANNEL_ALIGN {
            t_align
        } else {
            CHANNEL_ALIGN
        }
    };

    fn ctx(&self) -> &Context {
        &self.ctx
    }

    fn deposit(&self, slot: Slot<T>) {
        unsafe { *self.slot.get() = slot };
    }

    fn take(&self) -> Slot<T> {
        unsafe { mem::replace(&mut *self.slot.get(), Slot::Empty) }
    }

    fn is_empty_slot(&self) -> bool {
        matches!(unsafe { &*self.slot.get() }, Slot::Empty)
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.terminated.get()
    }

    pub(crate) fn take_panic(&self) -> Option<Box<dyn Any + Send + 'static>> {
        unsafe { (*self.panic.get()).take() }
    }

    /// Hand `value` to the peer and block until control comes back.
    ///
    /// Called from the body to produce a value for the parent, or by
    /// `Coroutine::yield_to` on the parent side to send the child its
    /// next input.
    pub fn yield_to(&self, value: T) {
        self.deposit(Slot::Value(value));
        self.switch();
    }

    /// Transfer control to the peer. A no-op once the peer has
    /// terminated: there is no context left to resume into.
    pub fn switch(&self) {
        if self.is_terminated() {
            return;
        }
        substrate::switch(self.ctx());
    }

    /// Deposit a close request and transfer control; used internally by
    /// `Coroutine::close_and_join` and exposed for bodies that
    /// themselves drive a further nested coroutine's shutdown.
    pub(crate) fn close(&self) {
        self.deposit(Slot::Close);
        self.switch();
    }

    /// Read the next value the peer produces, switching to give it the
    /// chance to do so if the mailbox is currently empty.
    ///
    /// Returns `None` once the peer has terminated, or once a close
    /// request is read in the slot -- the two conditions the reference
    /// implementation conflates into a single `NULL` return.
    pub fn from(&self) -> Option<T> {
        if !self.is_terminated() && self.is_empty_slot() {
            self.switch();
        }
        if self.is_terminated() {
            return None;
        }
        match self.take() {
            Slot::Value(v) => Some(v),
            Slot::Close | Slot::Empty => None,
        }
    }
}

/// Owning, non-send, non-sync handle to a coroutine's channel, held by
/// whichever side created it. Dropping it (without having already
/// observed termination through [`Coroutine::from`] or
/// [`Coroutine::close_and_join`]) drives the close protocol to
/// completion first, so the child is never simply abandoned mid-flight.
pub struct Coroutine<T> {
    inner: Option<Inner<T>>,
    _not_send: PhantomData<*const ()>,
}

struct Inner<T> {
    channel: NonNull<Channel<T>>,
    owned_memory: Option<(NonNull<u8>, Layout)>,
}

/// Computes where, within a block of `len` bytes starting at `base`, the
/// channel header should sit (at the high end, aligned) and how much
/// room is left below it for a stack.
fn place_channel<T>(base: *mut u8, len: usize) -> Result<(usize, usize), CreateError> {
    let align = Channel::<T>::STACK_ALIGNMENT;
    let header = Channel::<T>::HEADER_LEN;
    if len < header + MIN_STACK_SIZE {
        return Err(CreateError::BlockTooSmall {
            needed: header + MIN_STACK_SIZE,
            got: len,
        });
    }
    let raw_top = base as usize + len;
    let channel_addr = (raw_top - header) & !(align - 1);
    if channel_addr < base as usize {
        return Err(CreateError::BlockTooSmall {
            needed: header + MIN_STACK_SIZE,
            got: len,
        });
    }
    let stack_len = channel_addr - base as usize;
    Ok((channel_addr, stack_len))
}

unsafe extern "C" fn trampoline<T>(arg: *mut u8) {
    let channel = &*(arg as *const Channel<T>);

    let body = (*channel.body.get())
        .take()
        .expect("symcoro: coroutine body missing on first entry");

    let result = catch_unwind(AssertUnwindSafe(|| body(channel)));
    if let Err(payload) = result {
        *channel.panic.get() = Some(payload);
    }
    channel.terminated.set(true);

    substrate::finish(channel.ctx());
    // On the asm/ucontext substrates this point is never reached again:
    // `finish` transfers onto a stack with no unwind tables, so a Rust
    // panic here could not unwind safely even if we wanted it to.
    // Reaching it means the parent switched back into an already-dead
    // channel, a protocol violation this crate's types are meant to make
    // unrepresentable -- abort rather than run on into corrupted state.
    #[cfg(not(symcoro_substrate = "thread"))]
    {
        log::error!(target: "symcoro", "resumed a terminated coroutine");
        std::process::abort();
    }
}

impl<T: 'static> Coroutine<T> {
    /// Spawns a coroutine with the default stack size, in a freshly
    /// allocated block. Aborts (via
    /// [`std::alloc::handle_alloc_error`]) on allocation failure, same
    /// policy as the reference implementation's `posix_memalign`-or-abort.
    ///
    /// Unlike the reference implementation's `coroutine_create`, there is
    /// no separate `arg` parameter: `body` is a full Rust closure, so the
    /// idiomatic way to seed it with initial data is to `move` that data
    /// in directly, the same way `std::thread::spawn` callers do.
    pub fn spawn<F>(body: F) -> Coroutine<T>
    where
        F: FnOnce(&Channel<T>) + 'static,
    {
        Self::spawn_with_stack_size(body, DEFAULT_STACK_SIZE)
    }

    /// Like [`Coroutine::spawn`], with an explicit stack size.
    pub fn spawn_with_stack_size<F>(body: F, stack_size: usize) -> Coroutine<T>
    where
        F: FnOnce(&Channel<T>) + 'static,
    {
        let header = Channel::<T>::HEADER_LEN;
        let total = header + stack_size.max(MIN_STACK_SIZE);
        let layout = Layout::from_size_align(total, Channel::<T>::STACK_ALIGNMENT)
            .expect("symcoro: degenerate channel layout");
        let base = unsafe { alloc(layout) };
        if base.is_null() {
            handle_alloc_error(layout);
        }

        let channel_addr = match place_channel::<T>(base, total) {
            Ok((addr, _)) => addr,
            Err(_) => unreachable!("symcoro: owned allocation is always large enough"),
        };

        log::debug!(
            target: "symcoro",
            "spawning coroutine: substrate={}, stack_size={}",
            substrate::SUBSTRATE_NAME,
            stack_size
        );

        let channel = unsafe { Self::init_channel(base, channel_addr, body) };

        Coroutine {
            inner: Some(Inner {
                channel,
                owned_memory: Some((NonNull::new(base).unwrap(), layout)),
            }),
            _not_send: PhantomData,
        }
    }

    /// Spawns a coroutine inside caller-supplied memory instead of a
    /// fresh allocation -- the path a hard-realtime caller (audio
    /// callback, interrupt handler) uses to avoid allocating on the hot
    /// path. The block must be `'static`: it is handed to a detached OS
    /// thread on the thread-fallback substrate, so a non-`'static`
    /// borrow could outlive its owner.
    ///
    /// The block must be at least `Channel::<T>::HEADER_LEN +
    /// MIN_STACK_SIZE` bytes and aligned to
    /// `Channel::<T>::STACK_ALIGNMENT`; undersized or misaligned blocks
    /// are rejected with `CreateError` rather than silently truncated.
    pub fn spawn_in<F>(body: F, block: &'static mut [u8]) -> Result<Coroutine<T>, CreateError>
    where
        F: FnOnce(&Channel<T>) + 'static,
    {
        let base = block.as_mut_ptr();
        let len = block.len();
        let align = Channel::<T>::STACK_ALIGNMENT;
        if (base as usize) % align != 0 {
            return Err(CreateError::Misaligned {
                block_start: base as usize,
                required: align,
            });
        }
        let (channel_addr, _) = place_channel::<T>(base, len)?;

        log::debug!(
            target: "symcoro",
            "spawning coroutine in caller-supplied block: substrate={}, block_len={}",
            substrate::SUBSTRATE_NAME,
            len
        );

        let channel = unsafe { Self::init_channel(base, channel_addr, body) };

        Ok(Coroutine {
            inner: Some(Inner {
                channel,
                owned_memory: None,
            }),
            _not_send: PhantomData,
        })
    }

    unsafe fn init_channel<F>(base: *mut u8, channel_addr: usize, body: F) -> NonNull<Channel<T>>
    where
        F: FnOnce(&Channel<T>) + 'static,
    {
        let channel_ptr = channel_addr as *mut Channel<T>;
        ptr::write(
            channel_ptr,
            Channel {
                ctx: Context::new(),
                body: UnsafeCell::new(Some(Box::new(body))),
                slot: UnsafeCell::new(Slot::Empty),
                terminated: Cell::new(false),
                panic: UnsafeCell::new(None),
            },
        );

        let stack_len = channel_addr - base as usize;
        let stack = std::slice::from_raw_parts_mut(base, stack_len);
        substrate::bootstrap(&(*channel_ptr).ctx, stack, trampoline::<T>, channel_ptr as *mut u8);

        NonNull::new_unchecked(channel_ptr)
    }

    /// Sends `value` to the child and runs it until it next yields,
    /// requests input, or returns.
    pub fn yield_to(&mut self, value: T) {
        match &self.inner {
            Some(inner) => unsafe { inner.channel.as_ref().yield_to(value) },
            None => debug_assert!(false, "symcoro: yield_to called on an already-joined coroutine"),
        }
    }

    /// Transfers control without sending a new value.
    pub fn switch(&mut self) {
        match &self.inner {
            Some(inner) => unsafe { inner.channel.as_ref().switch() },
            None => debug_assert!(false, "symcoro: switch called on an already-joined coroutine"),
        }
    }

    /// Reads the next value the child produces. Returns `None` once the
    /// child has returned; from that point on, every further call is a
    /// safe no-op that also returns `None`.
    ///
    /// If the child's body panicked, the first call to observe
    /// termination re-raises that panic in the caller instead of
    /// returning.
    pub fn from(&mut self) -> Option<T> {
        let Some(inner) = &self.inner else {
            return None;
        };
        let channel = unsafe { inner.channel.as_ref() };
        let value = channel.from();
        if channel.is_terminated() {
            self.finish_and_free();
        }
        value
    }

    /// Requests that the child wind down (by feeding it close tokens
    /// until it returns), then joins and releases the channel. Consumes
    /// the handle, so a destroyed channel can never be touched again --
    /// the hazard the reference implementation warns callers about by
    /// convention, this type rules out statically.
    pub fn close_and_join(mut self) {
        if let Some(inner) = &self.inner {
            let channel = unsafe { inner.channel.as_ref() };
            while !channel.is_terminated() {
                channel.close();
            }
            self.finish_and_free();
        }
    }

    fn finish_and_free(&mut self) {
        let Some(inner) = self.inner.take() else {
            return;
        };
        let payload = unsafe { inner.channel.as_ref().take_panic() };
        unsafe {
            ptr::drop_in_place(inner.channel.as_ptr());
            if let Some((ptr, layout)) = inner.owned_memory {
                dealloc(ptr.as_ptr(), layout);
            }
        }
        if let Some(payload) = payload {
            resume_unwind(payload);
        }
    }
}

impl<T: 'static> Drop for Coroutine<T> {
    fn drop(&mut self) {
        if let Some(inner) = &self.inner {
            let channel = unsafe { inner.channel.as_ref() };
            while !channel.is_terminated() {
                channel.close();
            }
        }
        // Panics from a body are only re-raised through an explicit
        // `from`/`close_and_join` call; a drop-driven join swallows them
        // (matching `JoinHandle`'s own drop behaviour) rather than
        // risking a double panic while already unwinding.
        let _ = std::panic::catch_unwind(AssertUnwindSafe(|| self.finish_and_free()));
    }
}
