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
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::{dmusic, mci};

/// A back end that can play a MIDI file. Opening is construction: each back
/// end exposes its own way of being built, after which playback and shutdown
/// look the same to the caller.
pub trait Player {
    /// Schedules playback of the given MIDI file. Returns once the file has
    /// been handed to the underlying provider; playback proceeds on the
    /// provider's own timing thread.
    fn play(&mut self, path: &Path) -> Result<(), Error>;

    /// Stops playback and releases everything the back end acquired. Safe to
    /// call more than once.
    fn close(&mut self) -> Result<(), Error>;
}

/// A playback back end selection, as taken from the command line.
pub enum Backend {
    /// The COM music and sound stack rendering through the built-in software
    /// synthesizer.
    DirectMusic {
        audio_index: i32,
        port_index: i32,
        bank: Option<PathBuf>,
    },
    /// The multimedia sequencer driven over command strings.
    Mci { port: u32 },
}

/// Opens a player for the given back end.
pub fn open(backend: Backend) -> Result<Box<dyn Player>, Error> {
    match backend {
        Backend::DirectMusic {
            audio_index,
            port_index,
            bank,
        } => {
            let stack = dmusic::get_stack()?;
            let session = dmusic::Session::initialise(
                stack,
                &dmusic::Options {
                    audio_index,
                    port_index,
                    bank,
                },
            )?;
            Ok(Box::new(session))
        }
        Backend::Mci { port } => {
            let transport = mci::get_transport()?;
            Ok(Box::new(mci::Player::open(transport, port)))
        }
    }
}
