//! Round-trip timing CLI, ported from the reference implementation's
//! `context_switch_timing.c` (and its `timing.c` helper, folded here
//! into `std::time::Instant` since this isn't a libc binding). Useful
//! for comparing the `asm`, `ucontext`, and `thread-fallback`
//! substrates against each other on a given machine -- build three
//! times with `--no-default-features --features <substrate>` and
//! compare.

use clap::Parser;
use symcoro::Coroutine;

#[derive(Parser)]
#[command(about = "Time round trips through a coroutine that does nothing but yield")]
struct Args {
    /// Number of round trips to time.
    #[arg(default_value_t = 8_388_608u64)]
    yield_count: u64,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    log::info!(target: "symcoro::demos::timing", "timing {} round trips via the {} substrate", args.yield_count, symcoro::SUBSTRATE_NAME);

    let yield_count = args.yield_count;
    let time_start = std::time::Instant::now();

    let mut child = Coroutine::spawn(move |channel: &symcoro::Channel<u64>| {
        for ipass in 0..yield_count {
            channel.yield_to(ipass);
        }
    });
    while child.from().is_some() {}

    let elapsed = time_start.elapsed();
    let ns_total = elapsed.as_nanos() as f64;

    eprintln!(
        "{:.1} ns per round-trip between coroutines ({:.1} ns per switch)",
        ns_total / yield_count as f64,
        ns_total / (2.0 * yield_count as f64),
    );
}
