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
use std::fmt;
use std::path::Path;

use tracing::info;

use crate::error::Error;
use crate::player;

#[cfg(test)]
pub mod mock;
#[cfg(windows)]
mod winmm;

/// The sequencer alias playback commands address.
const ALIAS: &str = "music";

/// The command string interface of the multimedia sequencer.
pub trait Transport {
    /// Sends a single command string to the sequencer.
    fn send(&mut self, command: &str) -> Result<(), Error>;
}

/// Gets the operating system's command string transport.
pub fn get_transport() -> Result<Box<dyn Transport>, Error> {
    #[cfg(windows)]
    {
        Ok(Box::new(winmm::Transport::new()?))
    }
    #[cfg(not(windows))]
    {
        Err(Error::UnsupportedPlatform { backend: "MM" })
    }
}

/// A MIDI output device as reported by the multimedia stack.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputDevice {
    pub name: String,
    pub manufacturer_id: u16,
    pub product_id: u16,
    pub driver_version: u32,
    pub technology: u16,
    pub voices: u16,
    pub channel_mask: u16,
    pub support: u32,
}

impl fmt::Display for OutputDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}) {} Drv={} PID={} MID={} DevType={} Voices={} ChanMask={} Funcs={}",
            self.product_id,
            self.name,
            self.driver_version,
            self.product_id,
            self.manufacturer_id,
            self.technology,
            self.voices,
            self.channel_mask,
            self.support
        )
    }
}

/// Lists the MIDI output devices known to the multimedia stack.
pub fn list_devices() -> Result<Vec<OutputDevice>, Error> {
    #[cfg(windows)]
    {
        winmm::list()
    }
    #[cfg(not(windows))]
    {
        Err(Error::UnsupportedPlatform { backend: "MM" })
    }
}

/// Plays a MIDI file by remote-controlling the sequencer with command
/// strings. Shares nothing with the COM back end except the output port
/// index space.
pub struct Player {
    transport: Box<dyn Transport>,
    port: u32,
    opened: bool,
}

impl Player {
    /// Opens a player that will route through the given output port.
    pub fn open(transport: Box<dyn Transport>, port: u32) -> Player {
        Player {
            transport,
            port,
            opened: false,
        }
    }

    fn send(&mut self, command: String) -> Result<(), Error> {
        println!("> {}", command);
        self.transport.send(&command)
    }
}

impl player::Player for Player {
    fn play(&mut self, path: &Path) -> Result<(), Error> {
        self.send(format!(
            "open \"{}\" type sequencer alias {}",
            path.display(),
            ALIAS
        ))?;
        self.opened = true;
        self.send(format!("set {} port {}", ALIAS, self.port))?;
        self.send(format!("play {} notify", ALIAS))?;

        info!(file = %path.display(), port = self.port, "Scheduled sequencer playback.");
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        if !self.opened {
            return Ok(());
        }

        self.opened = false;
        self.send(format!("close {}", ALIAS))
    }
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use crate::error::Error;
    use crate::player::Player as _;

    use super::{mock, OutputDevice, Player};

    #[test]
    fn test_play_sends_commands_in_order() {
        let transport = mock::Transport::new();
        let mut player = Player::open(Box::new(transport.clone()), 2);

        player.play(Path::new("tune.mid")).expect("play");

        assert_eq!(
            vec![
                "open \"tune.mid\" type sequencer alias music".to_string(),
                "set music port 2".to_string(),
                "play music notify".to_string(),
            ],
            transport.commands()
        );
    }

    #[test]
    fn test_close_exactly_once() {
        let transport = mock::Transport::new();
        let mut player = Player::open(Box::new(transport.clone()), 0);

        player.play(Path::new("tune.mid")).expect("play");
        player.close().expect("close");
        player.close().expect("second close");

        let commands = transport.commands();
        assert_eq!(4, commands.len());
        assert_eq!("close music", commands[3]);
    }

    #[test]
    fn test_close_without_open_sends_nothing() {
        let transport = mock::Transport::new();
        let mut player = Player::open(Box::new(transport.clone()), 0);

        player.close().expect("close");
        assert!(transport.commands().is_empty());
    }

    #[test]
    fn test_error_carries_failing_command() {
        let transport = mock::Transport::new().fail_on("set");
        let mut player = Player::open(Box::new(transport.clone()), 9);

        let err = player.play(Path::new("tune.mid")).expect_err("failure");
        match err {
            Error::Command { command, code } => {
                assert_eq!("set music port 9", command);
                assert_ne!(0, code.code());
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_output_device_display() {
        let device = OutputDevice {
            name: "Microsoft GS Wavetable Synth".to_string(),
            manufacturer_id: 1,
            product_id: 27,
            driver_version: 1280,
            technology: 7,
            voices: 32,
            channel_mask: 65535,
            support: 1,
        };
        assert_eq!(
            "(27) Microsoft GS Wavetable Synth Drv=1280 PID=27 MID=1 DevType=7 Voices=32 ChanMask=65535 Funcs=1",
            device.to_string()
        );
    }
}
