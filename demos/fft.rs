//! Two concurrent 8-point FFT butterflies, ported from the reference
//! implementation's `cotests.c` (`fft8_with_intermission`, `child_fft`,
//! `parent_fft`). Each FFT is split into three stages by two
//! `channel.switch()` "intermission" points, and the parent runs one
//! stage of its own FFT every time it regains control from the child,
//! demonstrating genuinely interleaved (not just producer/consumer)
//! cooperative scheduling: two stacks, each holding a full set of
//! in-flight floating-point locals across the switch.

use symcoro::Coroutine;

/// Minimal complex type: the reference uses C's `float complex`, and
/// pulling in a whole numeric crate for eight butterfly additions
/// would be overkill.
#[derive(Clone, Copy, Debug)]
struct Cpx {
    re: f32,
    im: f32,
}

impl Cpx {
    const fn new(re: f32, im: f32) -> Self {
        Cpx { re, im }
    }
}

impl std::ops::Add for Cpx {
    type Output = Cpx;
    fn add(self, rhs: Cpx) -> Cpx {
        Cpx::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl std::ops::Sub for Cpx {
    type Output = Cpx;
    fn sub(self, rhs: Cpx) -> Cpx {
        Cpx::new(self.re - rhs.re, self.im - rhs.im)
    }
}

const FRAC_1_SQRT_2: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Radix-2 decimation-in-time FFT of a fixed 8-point input, split into
/// three stages by two intermissions. `channel` carries no data across
/// the switch -- the locals simply live on this coroutine's stack for
/// as long as the computation takes, which is the whole point of the
/// demo: it would be exactly this awkward to turn into a state machine
/// by hand.
fn fft8_with_intermission<T>(channel: &symcoro::Channel<T>, x: &[Cpx; 8]) -> [Cpx; 8] {
    // four dfts of size 2, two of which pick up a -90 degree twiddle
    let a0 = x[0] + x[4];
    let a1 = x[0] - x[4];
    let a2 = x[2] + x[6];
    let a3 = Cpx::new(x[2].im - x[6].im, x[6].re - x[2].re);
    let a4 = x[1] + x[5];
    let a5 = x[1] - x[5];
    let a6 = x[3] + x[7];
    let a7 = Cpx::new(x[3].im - x[7].im, x[7].re - x[3].re);

    // two more dfts of size 2
    let c0 = a0 + a2;
    let c1 = a1 + a3;
    let c2 = a0 - a2;
    let c3 = a1 - a3;
    let c4 = a4 + a6;
    let b5 = a5 + a7;
    let b6 = a4 - a6;
    let b7 = a5 - a7;

    channel.switch();

    // final twiddle factors
    let c5 = Cpx::new(
        (b5.im + b5.re) * FRAC_1_SQRT_2,
        (b5.im - b5.re) * FRAC_1_SQRT_2,
    );
    let c6 = Cpx::new(b6.im, -b6.re);
    let c7 = Cpx::new(
        (b7.im - b7.re) * FRAC_1_SQRT_2,
        -(b7.re + b7.im) * FRAC_1_SQRT_2,
    );

    channel.switch();

    // four dfts of length two, combining the two halves
    [
        c0 + c4,
        c1 + c5,
        c2 + c6,
        c3 + c7,
        c0 - c4,
        c1 - c5,
        c2 - c6,
        c3 - c7,
    ]
}

fn print_spectrum(who: &str, y: &[Cpx; 8]) {
    for (i, v) in y.iter().enumerate() {
        println!("{who}: y[{i}] = {} {:+}i", v.re, v.im);
    }
}

fn main() {
    env_logger::init();
    log::info!(target: "symcoro::demos::fft", "two concurrent tasks which use as many fp regs as possible, via the {} substrate", symcoro::SUBSTRATE_NAME);

    let child_input: [Cpx; 8] = [
        Cpx::new(1.0, 0.0),
        Cpx::new(0.0, 1.0),
        Cpx::new(-1.0, 0.0),
        Cpx::new(0.0, -1.0),
        Cpx::new(1.0, 0.0),
        Cpx::new(0.0, 1.0),
        Cpx::new(-1.0, 0.0),
        Cpx::new(0.0, -1.0),
    ];

    let mut child = Coroutine::spawn(move |channel: &symcoro::Channel<()>| {
        let y = fft8_with_intermission(channel, &child_input);
        print_spectrum("child_fft", &y);
    });

    let parent_input: [Cpx; 8] = [
        Cpx::new(0.25, 0.0),
        Cpx::new(0.25, 0.0),
        Cpx::new(1.25, 0.0),
        Cpx::new(0.25, 0.0),
        Cpx::new(0.25, 0.0),
        Cpx::new(0.25, 0.0),
        Cpx::new(0.25, 0.0),
        Cpx::new(0.25, 0.0),
    ];

    // child.switch() stands in for the reference's bare coroutine_switch:
    // no value crosses, we just alternate which stack is running.
    let y = fft8_with_intermission_on_parent(&mut child, &parent_input);

    child.close_and_join();
    print_spectrum("parent_fft", &y);
}

/// Same three-stage computation as `fft8_with_intermission`, but driven
/// from the parent's side of the handle instead of from inside a
/// channel body -- the parent has no `Channel` of its own, only the
/// `Coroutine` handle to the child it hands control to at each
/// intermission.
fn fft8_with_intermission_on_parent(child: &mut Coroutine<()>, x: &[Cpx; 8]) -> [Cpx; 8] {
    let a0 = x[0] + x[4];
    let a1 = x[0] - x[4];
    let a2 = x[2] + x[6];
    let a3 = Cpx::new(x[2].im - x[6].im, x[6].re - x[2].re);
    let a4 = x[1] + x[5];
    let a5 = x[1] - x[5];
    let a6 = x[3] + x[7];
    let a7 = Cpx::new(x[3].im - x[7].im, x[7].re - x[3].re);

    let c0 = a0 + a2;
    let c1 = a1 + a3;
    let c2 = a0 - a2;
    let c3 = a1 - a3;
    let c4 = a4 + a6;
    let b5 = a5 + a7;
    let b6 = a4 - a6;
    let b7 = a5 - a7;

    child.switch();

    let c5 = Cpx::new(
        (b5.im + b5.re) * FRAC_1_SQRT_2,
        (b5.im - b5.re) * FRAC_1_SQRT_2,
    );
    let c6 = Cpx::new(b6.im, -b6.re);
    let c7 = Cpx::new(
        (b7.im - b7.re) * FRAC_1_SQRT_2,
        -(b7.re + b7.im) * FRAC_1_SQRT_2,
    );

    child.switch();

    [
        c0 + c4,
        c1 + c5,
        c2 + c6,
        c3 + c7,
        c0 - c4,
        c1 - c5,
        c2 - c6,
        c3 - c7,
    ]
}
