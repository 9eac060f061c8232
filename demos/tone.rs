//! Hard-realtime audio tone generator, ported from the reference
//! implementation's `cotone.c`. The original is driven by an SDL audio
//! callback; this demo drops the SDL dependency (not part of this
//! crate's stack) and instead drives the exact same fixed-size,
//! allocation-free "fill this buffer" loop repeatedly from `main`,
//! writing the result to a WAV file -- the callback shape is what the
//! demo is about, not the playback backend.

use std::cell::RefCell;
use std::rc::Rc;

use clap::Parser;
use symcoro::Coroutine;

#[derive(Parser)]
#[command(about = "Render the cotone.c two-tone sequence to a WAV file")]
struct Args {
    /// Output path for the rendered audio.
    #[arg(default_value = "tone.wav")]
    out: String,

    /// Sample rate in Hz, matching the reference's SDL device config.
    #[arg(long, default_value_t = 11025.0)]
    sample_rate: f32,

    /// Total seconds to render.
    #[arg(long, default_value_t = 6.0)]
    seconds: f32,

    /// Samples per simulated audio-callback buffer.
    #[arg(long, default_value_t = 1024)]
    buffer_len: usize,
}

/// Shared between parent and child exactly like the reference's
/// `audio_generator_context`: the parent points it at the next buffer
/// to fill, the child writes into it and switches back once full.
/// Only one side ever runs at a time, so a `RefCell` borrow never
/// actually contends.
struct AudioGeneratorContext {
    sample_rate: f32,
    buffer: Vec<f32>,
    cursor: usize,
}

fn yield_sample(channel: &symcoro::Channel<()>, context: &Rc<RefCell<AudioGeneratorContext>>, sample: f32) {
    let done = {
        let mut ctx = context.borrow_mut();
        let cursor = ctx.cursor;
        ctx.buffer[cursor] = sample;
        ctx.cursor += 1;
        ctx.cursor == ctx.buffer.len()
    };
    if done {
        channel.switch();
    }
}

fn tone(channel: &symcoro::Channel<()>, context: &Rc<RefCell<AudioGeneratorContext>>, tone_frequency: f32, duration: f32) {
    let sample_rate = context.borrow().sample_rate;
    let mut carrier_re = 1.0f32;
    let mut carrier_im = 0.0f32;
    let angle = 2.0 * std::f32::consts::PI * tone_frequency / sample_rate;
    let (advance_im, advance_re) = angle.sin_cos();

    let samples = (duration * sample_rate) as usize;
    for _ in 0..samples {
        yield_sample(channel, context, carrier_im);

        let next_re = carrier_re * advance_re - carrier_im * advance_im;
        let next_im = carrier_re * advance_im + carrier_im * advance_re;
        carrier_re = next_re;
        carrier_im = next_im;

        // renormalize, exploiting 1/|x| ~= (3 - |x|^2) / 2 for |x| near 1
        let mag_sq = carrier_re * carrier_re + carrier_im * carrier_im;
        let correction = (3.0 - mag_sq) * 0.5;
        carrier_re *= correction;
        carrier_im *= correction;
    }
}

fn silence(channel: &symcoro::Channel<()>, context: &Rc<RefCell<AudioGeneratorContext>>, duration: f32) {
    let sample_rate = context.borrow().sample_rate;
    let samples = (duration * sample_rate) as usize;
    for _ in 0..samples {
        yield_sample(channel, context, 0.0);
    }
}

/// Main loop of the child coroutine: not run from start to finish on
/// each buffer fill, and unlike a plain callback this can have
/// arbitrary loop structure and locals that persist across fills.
fn tone_generator(channel: &symcoro::Channel<()>, context: Rc<RefCell<AudioGeneratorContext>>) -> ! {
    loop {
        tone(channel, &context, 2525.0, 0.249_901);
        silence(channel, &context, 0.5);
        tone(channel, &context, 2475.0, 0.250_101);
        silence(channel, &context, 2.0);
    }
}

fn write_wav_mono_f32(path: &str, sample_rate: u32, samples: &[f32]) -> std::io::Result<()> {
    use std::io::Write;

    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    let data_bytes = (samples.len() * 4) as u32;
    let byte_rate = sample_rate * 4;

    file.write_all(b"RIFF")?;
    file.write_all(&(36 + data_bytes).to_le_bytes())?;
    file.write_all(b"WAVE")?;
    file.write_all(b"fmt ")?;
    file.write_all(&16u32.to_le_bytes())?;
    file.write_all(&3u16.to_le_bytes())?; // IEEE float
    file.write_all(&1u16.to_le_bytes())?; // mono
    file.write_all(&sample_rate.to_le_bytes())?;
    file.write_all(&byte_rate.to_le_bytes())?;
    file.write_all(&4u16.to_le_bytes())?; // block align
    file.write_all(&32u16.to_le_bytes())?; // bits per sample
    file.write_all(b"data")?;
    file.write_all(&data_bytes.to_le_bytes())?;
    for sample in samples {
        file.write_all(&sample.to_le_bytes())?;
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    log::info!(target: "symcoro::demos::tone", "rendering {:.1}s at {}Hz via the {} substrate", args.seconds, args.sample_rate, symcoro::SUBSTRATE_NAME);

    let context = Rc::new(RefCell::new(AudioGeneratorContext {
        sample_rate: args.sample_rate,
        buffer: Vec::new(),
        cursor: 0,
    }));
    let context_for_child = Rc::clone(&context);

    // Stack space for the child, allocated once in bss, same as the
    // reference's `stack_space_for_child`: not calling the allocator on
    // every simulated callback invocation. Sized off the crate's own
    // published constants rather than a guessed round number.
    const STACK_BYTES: usize = 48 * 1024;
    const BLOCK_LEN: usize = symcoro::Channel::<()>::HEADER_LEN + STACK_BYTES;
    #[repr(align(64))]
    struct AlignedBlock([u8; BLOCK_LEN]);
    static mut STACK_SPACE_FOR_CHILD: AlignedBlock = AlignedBlock([0u8; BLOCK_LEN]);
    let block: &'static mut [u8] =
        unsafe { &mut (*std::ptr::addr_of_mut!(STACK_SPACE_FOR_CHILD)).0 };

    let mut child = Coroutine::spawn_in(
        move |channel: &symcoro::Channel<()>| tone_generator(channel, context_for_child),
        block,
    )
    .expect("sized from Channel::<()>::HEADER_LEN, always large enough");

    let total_samples = (args.seconds * args.sample_rate) as usize;
    let mut rendered = Vec::with_capacity(total_samples);

    while rendered.len() < total_samples {
        {
            let mut ctx = context.borrow_mut();
            ctx.buffer = vec![0.0f32; args.buffer_len];
            ctx.cursor = 0;
        }
        // Guard the switch exactly like the reference does: we don't
        // care whether the child already ran up to its first switch
        // on creation.
        if context.borrow().cursor != context.borrow().buffer.len() {
            child.switch();
        }
        rendered.extend_from_slice(&context.borrow().buffer);
    }
    rendered.truncate(total_samples);
    drop(child);

    write_wav_mono_f32(&args.out, args.sample_rate as u32, &rendered)
        .expect("failed to write WAV file");
    log::info!(target: "symcoro::demos::tone", "wrote {} samples to {}", rendered.len(), args.out);
}
