//! Morse encoder generator, ported from the reference implementation's
//! `comorse.c`. Demonstrates the benefit of a generator function for
//! producing output that depends on internal state (here: which letter,
//! and which pixel within that letter, we're currently on) without
//! turning the loop inside out into a callback with explicit state.

use clap::Parser;
use symcoro::Coroutine;

#[derive(Parser)]
#[command(about = "Encode a sentence as a stream of Morse dots and dashes")]
struct Args {
    /// Sentence to transmit.
    #[arg(default_value = "test")]
    sentence: String,
}

fn morse_pixels(c: char) -> &'static str {
    match c.to_ascii_uppercase() {
        ' ' => "      ",
        'A' => " - ---  ",
        'B' => " --- - - -  ",
        'C' => " --- - --- -  ",
        'D' => " --- - -  ",
        'E' => " -  ",
        'F' => " - - --- -  ",
        'G' => " --- --- -  ",
        'H' => " - - - -  ",
        'I' => " - -  ",
        'J' => " --- --- --- -  ",
        'K' => " --- - ---  ",
        'L' => " - --- - -  ",
        'M' => " --- ---  ",
        'N' => " --- -  ",
        'O' => " --- --- ---  ",
        'P' => " - --- --- -  ",
        'Q' => " --- --- - ---  ",
        'R' => " - --- -  ",
        'S' => " - - -  ",
        'T' => " ---  ",
        'U' => " - - ---  ",
        'V' => " - - - ---  ",
        'W' => " - --- ---  ",
        'X' => " --- - - ---  ",
        'Y' => " --- - --- ---  ",
        'Z' => " --- --- - -  ",
        '1' => " - --- --- --- ---  ",
        '2' => " - - --- --- ---  ",
        '3' => " - - - --- ---  ",
        '4' => " - - - - ---  ",
        '5' => " - - - - -  ",
        '6' => " --- - - - -  ",
        '7' => " --- --- - - -  ",
        '8' => " --- --- --- - -  ",
        '9' => " --- --- --- --- -  ",
        '0' => " --- --- --- --- ---  ",
        '+' => " - --- - --- -  ",
        '-' => " --- - - - - ---  ",
        '?' => " - - --- --- - -  ",
        '/' => " --- - - --- -  ",
        '.' => " - --- - --- - ---  ",
        ',' => " --- --- - - --- ---  ",
        '\'' => " --- - - --- -  ",
        ')' => " --- - --- --- - ---  ",
        '(' => " --- - --- --- -  ",
        ':' => " --- --- --- - - -  ",
        _ => morse_pixels(' '),
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    log::info!(target: "symcoro::demos::morse", "encoding {:?} via the {} substrate", args.sentence, symcoro::SUBSTRATE_NAME);

    let sentence = args.sentence;
    let mut child = Coroutine::spawn(move |channel: &symcoro::Channel<char>| {
        for letter in sentence.chars() {
            for pixel in morse_pixels(letter).chars() {
                channel.yield_to(pixel);
            }
        }
    });
    while let Some(pixel) = child.from() {
        print!("{pixel}");
    }
    println!();
}
