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
use std::sync::{Arc, Mutex};

use crate::error::{Error, ResultCode};

/// Error code handed out for scripted failures.
const FAIL_CODE: i32 = 263;

/// A mock transport. Doesn't drive a sequencer; records the commands sent
/// through it instead.
#[derive(Clone, Default)]
pub struct Transport {
    fail_on: Option<&'static str>,
    commands: Arc<Mutex<Vec<String>>>,
}

impl Transport {
    /// Gets a new mock transport.
    pub fn new() -> Transport {
        Transport::default()
    }

    /// Fails any command starting with the given verb.
    pub fn fail_on(mut self, verb: &'static str) -> Transport {
        self.fail_on = Some(verb);
        self
    }

    /// The commands sent so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.commands
            .lock()
            .expect("unable to get command lock")
            .clone()
    }
}

impl super::Transport for Transport {
    fn send(&mut self, command: &str) -> Result<(), Error> {
        self.commands
            .lock()
            .expect("unable to get command lock")
            .push(command.to_string());

        match self.fail_on {
            Some(verb) if command.starts_with(verb) => Err(Error::Command {
                command: command.to_string(),
                code: ResultCode::with_message(FAIL_CODE, "scripted failure"),
            }),
            _ => Ok(()),
        }
    }
}
