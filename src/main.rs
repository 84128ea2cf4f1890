// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
mod banner;
mod dmusic;
mod error;
mod mci;
mod player;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{crate_version, CommandFactory, Parser, Subcommand};

use player::Backend;

const AFTER_HELP: &str = r#"Notes for DS mode:
  Set the audio device index to a negative value to use the default device.
  Set the MIDI output port index to a negative value to play over the
  default audio path. To disable loading a DLS collection, use '-' as the
  DLS file. This mode only renders through the synthesizer built into the
  operating system; ports that route to external MIDI modules are refused.

Notes for MM mode:
  Do not use this mode for the built-in software synthesizer. It is meant
  for synthesizers on your sound card and for external hardware modules.

Examples:
  midiplay DS -1 -1 gm.dls music.mid
  midiplay DS -1 -1 - music.mid
  midiplay MM 1 music.mid"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A command-line MIDI file player for Windows.",
    after_help = AFTER_HELP
)]
struct Cli {
    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Plays through the DirectSound and DirectMusic stack.
    #[clap(name = "DS")]
    Ds {
        /// The audio output device index. Negative selects the default device.
        #[clap(allow_negative_numbers = true)]
        audio_index: i32,
        /// The MIDI output port index. Negative plays over the default audio path.
        #[clap(allow_negative_numbers = true)]
        port_index: i32,
        /// The DLS collection to load, or "-" to load none.
        dls_file: String,
        /// The MIDI file to play.
        midi_file: PathBuf,
    },
    /// Plays through the multimedia sequencer.
    #[clap(name = "MM")]
    Mm {
        /// The MIDI output device index.
        port: u32,
        /// The MIDI file to play.
        midi_file: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    // Bad arguments are exit code 1 here, while clap defaults to 2.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    banner::print();

    let code = match cli.command {
        None => list_devices(),
        Some(Commands::Ds {
            audio_index,
            port_index,
            dls_file,
            midi_file,
        }) => play_directmusic(audio_index, port_index, &dls_file, &midi_file),
        Some(Commands::Mm { port, midi_file }) => play_sequencer(port, &midi_file),
    };

    ExitCode::from(code)
}

/// Maps the DLS argument to a collection path. The "-" sentinel disables
/// loading; anything else, including the empty string, is a real path.
fn bank_path(dls_file: &str) -> Option<PathBuf> {
    if dls_file == "-" {
        return None;
    }

    Some(PathBuf::from(dls_file))
}

fn play_directmusic(audio_index: i32, port_index: i32, dls_file: &str, midi_file: &Path) -> u8 {
    let mut player = match player::open(Backend::DirectMusic {
        audio_index,
        port_index,
        bank: bank_path(dls_file),
    }) {
        Ok(player) => player,
        Err(err) => {
            eprintln!("Failed to initialise playback: {}", err);
            return 1;
        }
    };

    play_and_wait(player.as_mut(), midi_file, 2)
}

fn play_sequencer(port: u32, midi_file: &Path) -> u8 {
    match mci::list_devices() {
        Ok(devices) => print_midi_out(&devices),
        Err(err) => {
            eprintln!("Failed to list MIDI out devices: {}", err);
            return 1;
        }
    }

    let mut player = match player::open(Backend::Mci { port }) {
        Ok(player) => player,
        Err(err) => {
            eprintln!("Failed to open the sequencer: {}", err);
            return 1;
        }
    };

    play_and_wait(player.as_mut(), midi_file, 1)
}

/// Starts playback, blocks until the user presses Enter, then tears the
/// player down.
fn play_and_wait(player: &mut dyn player::Player, midi_file: &Path, failure_code: u8) -> u8 {
    println!("Playing MIDI file: {}", midi_file.display());
    println!("Press Enter to stop ...");

    if let Err(err) = player.play(midi_file) {
        eprintln!("Failed to play MIDI file: {}", err);
        let _ = player.close();
        return failure_code;
    }

    let mut line = String::new();
    let _ = io::stdin().read_line(&mut line);

    if let Err(err) = player.close() {
        eprintln!("Failed to close the player: {}", err);
        return failure_code;
    }

    0
}

fn print_midi_out(devices: &[mci::OutputDevice]) {
    println!("Available MIDI Out Devices:");
    for (index, device) in devices.iter().enumerate() {
        println!("[{}] {}", index, device);
    }
    println!();
}

/// The zero argument path: usage, then every device the host reports.
fn list_devices() -> u8 {
    let _ = Cli::command().print_help();
    println!();

    match mci::list_devices() {
        Ok(devices) => print_midi_out(&devices),
        Err(err) => eprintln!("Failed to list MIDI out devices: {}", err),
    }

    let stack = match dmusic::get_stack() {
        Ok(stack) => stack,
        Err(err) => {
            eprintln!("Failed to list devices: {}", err);
            return 1;
        }
    };
    match dmusic::list(stack) {
        Ok(inventory) => {
            println!("Available Audio Devices:");
            for (index, device) in inventory.audio_devices().iter().enumerate() {
                println!("[{}] {}", index, device);
            }
            println!();

            println!("Available MIDI Ports:");
            for port in inventory.ports() {
                println!("{}", port);
            }
            println!();

            0
        }
        Err(err) => {
            eprintln!("Failed to list devices: {}", err);
            1
        }
    }
}
