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

/// A numeric result code surfaced by the underlying provider stack, together
/// with the decoded system message when one is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultCode {
    code: i32,
    message: Option<String>,
}

impl ResultCode {
    /// Creates a result code without a decoded message.
    pub fn new(code: i32) -> ResultCode {
        ResultCode {
            code,
            message: None,
        }
    }

    /// Creates a result code with a decoded system message.
    pub fn with_message(code: i32, message: impl Into<String>) -> ResultCode {
        let message = message.into();
        ResultCode {
            code,
            message: if message.is_empty() {
                None
            } else {
                Some(message)
            },
        }
    }

    /// Returns the raw numeric code.
    pub fn code(&self) -> i32 {
        self.code
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Signed hex formatting renders the two's complement bit pattern,
        // which is how the provider documents its codes.
        write!(f, "{:#010X}", self.code)?;
        if let Some(message) = &self.message {
            write!(f, " ({})", message.trim_end())?;
        }
        Ok(())
    }
}

/// Typed errors for the player so callers can distinguish e.g. a selection
/// mistake from a provider failure without string matching.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No console window handle could be obtained for the host process.
    #[error("no console window is available to host playback")]
    NoHostWindow,

    /// An underlying provider call failed. The failing function is named so
    /// the user can see exactly which step gave up.
    #[error("{function} failed: {code}")]
    Provider {
        function: &'static str,
        code: ResultCode,
    },

    /// The audio device index does not address the enumerated list.
    #[error("audio device index {index} is out of range ({count} devices enumerated)")]
    AudioSelection { index: usize, count: usize },

    /// Port enumeration was exhausted before reaching the requested ordinal.
    #[error("MIDI port [{ordinal}] is not found")]
    PortNotFound { ordinal: usize },

    /// The chosen port routes to an external MIDI module, a path the
    /// operating system no longer services. Playback is refused up front
    /// rather than producing silence.
    #[error("external MIDI module path is not supported")]
    ExternalModule,

    /// The playback session has already been torn down.
    #[error("playback session is closed")]
    Closed,

    /// A multimedia command string was rejected by the sequencer interface.
    #[error("multimedia command {command:?} failed: {code}")]
    Command { command: String, code: ResultCode },

    /// The requested back end only exists on Windows.
    #[error("the {backend} back end is not supported on this platform")]
    UnsupportedPlatform { backend: &'static str },
}

impl Error {
    /// Shorthand for a provider failure without a decoded message.
    pub fn provider(function: &'static str, code: i32) -> Error {
        Error::Provider {
            function,
            code: ResultCode::new(code),
        }
    }
}
