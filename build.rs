//! Picks exactly one context-switch substrate for this build and emits a
//! `cfg` the rest of the crate dispatches on. Priority, matching the
//! fallback cascade documented in `src/substrate/mod.rs`:
//!
//! 1. `thread-fallback` feature, if explicitly requested: always wins.
//! 2. `ucontext` feature, if requested and the target is unix: honored.
//! 3. `asm` feature (the default), if the target has a hand-written
//!    backend (x86_64 / aarch64): compiles the `.S` file via `cc`.
//! 4. Otherwise: `ucontext` on unix, `thread-fallback` everywhere else.

fn has_feature(name: &str) -> bool {
    std::env::var(format!("CARGO_FEATURE_{name}")).is_ok()
}

fn main() {
    let arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    let is_unix = std::env::var("CARGO_CFG_UNIX").is_ok();

    let want_thread = has_feature("THREAD_FALLBACK");
    let want_ucontext = has_feature("UCONTEXT");
    let want_asm = has_feature("ASM");
    let asm_supported = matches!(arch.as_str(), "x86_64" | "aarch64");

    let substrate = if want_thread {
        "thread"
    } else if want_ucontext && is_unix {
        "ucontext"
    } else if want_asm && asm_supported {
        "asm"
    } else if is_unix {
        "ucontext"
    } else {
        "thread"
    };

    println!("cargo:rustc-cfg=symcoro_substrate=\"{substrate}\"");
    println!("cargo:rustc-check-cfg=cfg(symcoro_substrate, values(\"asm\", \"ucontext\", \"thread\"))");

    if substrate == "asm" {
        let file = match arch.as_str() {
            "x86_64" => "src/substrate/asm/x86_64.S",
            "aarch64" => "src/substrate/asm/aarch64.S",
            _ => unreachable!("asm_supported guards this"),
        };
        println!("cargo:rerun-if-changed={file}");
        cc::Build::new()
            .file(file)
            .flag_if_supported("-fno-asynchronous-unwind-tables")
            .compile("symcoro_switch");
    }
}
