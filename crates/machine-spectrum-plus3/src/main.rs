//! Headless +3 runner.
//!
//! Runs the machine for a number of 20 ms frames, optionally typing text
//! and dumping the beeper output to a WAV file.

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process;

use machine_spectrum_plus3::capture::AudioCapture;
use machine_spectrum_plus3::{Plus3, Plus3Config, keys};

/// One PAL frame.
const FRAME_US: u64 = 20_000;

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

struct CliArgs {
    rom_path: Option<PathBuf>,
    dsk_path: Option<PathBuf>,
    frames: u32,
    audio_path: Option<PathBuf>,
    type_text: Option<String>,
    type_at: u32,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        rom_path: None,
        dsk_path: None,
        frames: 200,
        audio_path: None,
        type_text: None,
        type_at: 100,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--rom" => {
                i += 1;
                cli.rom_path = args.get(i).map(PathBuf::from);
            }
            "--dsk" => {
                i += 1;
                cli.dsk_path = args.get(i).map(PathBuf::from);
            }
            "--frames" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.frames = s.parse().unwrap_or(200);
                }
            }
            "--audio" => {
                i += 1;
                cli.audio_path = args.get(i).map(PathBuf::from);
            }
            "--type" => {
                i += 1;
                cli.type_text = args.get(i).cloned();
            }
            "--type-at" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.type_at = s.parse().unwrap_or(100);
                }
            }
            "--help" | "-h" => {
                eprintln!("Usage: plus3-headless [OPTIONS]");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  --rom <file>         ROM image mapped at 0x0000 (first 16K)");
                eprintln!("  --dsk <file>         Insert a DSK disc image into drive A:");
                eprintln!("  --frames <n>         Number of 20 ms frames to run [default: 200]");
                eprintln!("  --audio <file>       Save a WAV audio dump");
                eprintln!("  --type <text>        Type text, one key per frame (use \\n for Enter)");
                eprintln!("  --type-at <frame>    Frame at which to start typing [default: 100]");
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

/// Host key codes for `text`, with `\n` escapes turned into Enter.
fn key_codes(text: &str) -> Vec<u8> {
    text.replace("\\n", "\r")
        .bytes()
        .filter(u8::is_ascii)
        .collect()
}

fn run(cli: &CliArgs) -> Result<(), Box<dyn Error>> {
    let rom = match &cli.rom_path {
        Some(path) => Some(fs::read(path)?),
        None => None,
    };
    let config = Plus3Config {
        rom,
        ..Plus3Config::default()
    };
    let typing = cli
        .type_text
        .as_deref()
        .map(|text| keys::typing_schedule(&key_codes(text), config.sticky_keys))
        .unwrap_or_default();
    let mut machine = Plus3::new(config);

    if let Some(path) = &cli.dsk_path {
        machine.insert_disc(0, fs::read(path)?)?;
        eprintln!("Inserted {}", path.display());
    }

    let mut capture = match &cli.audio_path {
        Some(path) => Some(AudioCapture::create(path, machine.audio_hz())?),
        None => None,
    };
    let mut held: Option<u8> = None;

    for frame in 0..cli.frames {
        if let Some(key) = held.take() {
            machine.key_up(key);
        }
        let typed = frame
            .checked_sub(cli.type_at)
            .and_then(|n| typing.get(n as usize))
            .copied()
            .flatten();
        if let Some(key) = typed {
            machine.key_down(key);
            held = Some(key);
        }

        machine.exec(FRAME_US);
        machine.frame_update();
        let audio = machine.take_audio();
        if let Some(capture) = capture.as_mut() {
            capture.write_frame(&audio)?;
        }
    }
    eprintln!(
        "Ran {} frames ({} T-states), PC={:04X}",
        cli.frames,
        machine.ticks(),
        machine.cpu().regs().pc
    );

    if let (Some(capture), Some(path)) = (capture, &cli.audio_path) {
        let samples = capture.finish()?;
        eprintln!("Audio saved to {} ({samples} samples)", path.display());
    }
    Ok(())
}

fn main() {
    let cli = parse_args();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
