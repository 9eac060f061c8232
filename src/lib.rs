//! Stackful, symmetric, single-threaded coroutines.
//!
//! A [`Coroutine`] is a cooperative peer that runs on its own stack and
//! trades control back and forth with whoever created it through a
//! shared [`Channel`]: `yield_to` hands the peer a value and waits,
//! `from` reads the next value the peer produces, `switch` transfers
//! control without sending anything, and `close_and_join` asks the
//! child to wind down and reclaims its memory. Only one of the two
//! peers ever runs at a time -- there is no preemption and no implicit
//! parallelism, which is what makes this usable for generators,
//! coroutine-style pipelines, state machines, and hard-realtime
//! producers (audio/video callbacks) that cannot tolerate an allocator
//! or a lock on their hot path.
//!
//! Three interchangeable substrates do the actual context switch,
//! selected at build time (see `build.rs`):
//!
//! - `asm` (default): hand-written per-architecture assembly
//!   (`x86_64`, `aarch64`). No allocation, no syscalls, no locks.
//! - `ucontext`: POSIX `getcontext`/`makecontext`/`swapcontext`, for
//!   unix targets without a hand-written backend.
//! - `thread-fallback`: a real OS thread gated by a private
//!   mutex/condvar pair per channel. Portable, several orders of
//!   magnitude slower, no realtime guarantee.
//!
//! ```no_run
//! use symcoro::Coroutine;
//!
//! let mut counter = Coroutine::spawn(|channel: &symcoro::Channel<i64>| {
//!     let mut n = 0;
//!     loop {
//!         channel.yield_to(n);
//!         n += 1;
//!     }
//! });
//!
//! for _ in 0..5 {
//!     println!("{}", counter.from().unwrap());
//! }
//! counter.close_and_join();
//! ```

mod channel;
mod error;
mod substrate;

pub use channel::{Channel, Coroutine, DEFAULT_STACK_SIZE, MIN_STACK_SIZE};
pub use error::CreateError;

/// Name of the context-switch substrate this build was compiled with
/// (`"asm"`, `"ucontext"`, or `"thread"`).
pub use substrate::SUBSTRATE_NAME;
