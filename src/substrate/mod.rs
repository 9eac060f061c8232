//! Context-switch substrates.
//!
//! Exactly one of these backends is compiled in, selected by `build.rs`
//! through the `symcoro_substrate` cfg (see the crate's `build.rs` for the
//! selection cascade: `thread-fallback` feature wins if requested, then
//! `ucontext`, then hand-written `asm` where a backend exists for the
//! target architecture, then an automatic unix-vs-everything-else
//! fallback). Every backend exports the same three items so `channel.rs`
//! never has to know which one it got:
//!
//! - `Context`: opaque inactive-context storage, one per channel.
//! - `bootstrap`: first transfer onto a freshly prepared child.
//! - `switch`: every subsequent symmetric transfer.
//! - `finish`: the terminal transfer once a coroutine body has returned.

#[cfg(symcoro_substrate = "asm")]
mod asm;
#[cfg(symcoro_substrate = "asm")]
pub(crate) use asm::{bootstrap, finish, switch, Context};

#[cfg(symcoro_substrate = "ucontext")]
mod ucontext;
#[cfg(symcoro_substrate = "ucontext")]
pub(crate) use self::ucontext::{bootstrap, finish, switch, Context};

#[cfg(symcoro_substrate = "thread")]
mod thread;
#[cfg(symcoro_substrate = "thread")]
pub(crate) use thread::{bootstrap, finish, switch, Context};

/// Name of the active substrate, for logging and diagnostics.
pub const SUBSTRATE_NAME: &str = {
    #[cfg(symcoro_substrate = "asm")]
    {
        "asm"
    }
    #[cfg(symcoro_substrate = "ucontext")]
    {
        "ucontext"
    }
    #[cfg(symcoro_substrate = "thread")]
    {
        "thread"
    }
};
