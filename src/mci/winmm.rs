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
use windows::core::PCWSTR;
use windows::Win32::Foundation::HWND;
use windows::Win32::Media::Audio::{midiOutGetDevCapsW, midiOutGetNumDevs, MIDIOUTCAPSW};
use windows::Win32::Media::Multimedia::{mciGetErrorStringW, mciSendStringW};
use windows::Win32::System::Console::GetConsoleWindow;

use crate::error::{Error, ResultCode};

use super::OutputDevice;

/// The command string transport over the multimedia sequencer interface.
pub struct Transport {
    window: HWND,
}

impl Transport {
    /// Gets a transport bound to the console window, which receives the
    /// sequencer's completion notifications.
    pub fn new() -> Result<Transport, Error> {
        let window = unsafe { GetConsoleWindow() };
        if window.0 == 0 {
            return Err(Error::NoHostWindow);
        }

        Ok(Transport { window })
    }
}

impl super::Transport for Transport {
    fn send(&mut self, command: &str) -> Result<(), Error> {
        let command_w: Vec<u16> = command.encode_utf16().chain(std::iter::once(0)).collect();
        // Only the play command asks for completion notifications.
        let callback = if command.starts_with("play ") {
            self.window
        } else {
            HWND(0)
        };

        let code = unsafe { mciSendStringW(PCWSTR(command_w.as_ptr()), None, callback) };
        if code != 0 {
            return Err(Error::Command {
                command: command.to_string(),
                code: ResultCode::with_message(code as i32, error_text(code)),
            });
        }

        Ok(())
    }
}

/// Decodes a sequencer error code into its system message.
fn error_text(code: u32) -> String {
    let mut buffer = [0u16; 256];
    if !unsafe { mciGetErrorStringW(code, &mut buffer) }.as_bool() {
        return String::new();
    }

    let len = buffer.iter().position(|c| *c == 0).unwrap_or(buffer.len());
    String::from_utf16_lossy(&buffer[..len])
}

/// Lists the MIDI output devices known to the multimedia stack.
pub fn list() -> Result<Vec<OutputDevice>, Error> {
    let count = unsafe { midiOutGetNumDevs() };
    let mut devices = Vec::with_capacity(count as usize);

    for index in 0..count {
        let mut caps = MIDIOUTCAPSW::default();
        let code = unsafe {
            midiOutGetDevCapsW(
                index as usize,
                &mut caps,
                std::mem::size_of::<MIDIOUTCAPSW>() as u32,
            )
        };
        if code != 0 {
            return Err(Error::Provider {
                function: "midiOutGetDevCapsW",
                code: ResultCode::new(code as i32),
            });
        }

        let len = caps
            .szPname
            .iter()
            .position(|c| *c == 0)
            .unwrap_or(caps.szPname.len());
        devices.push(OutputDevice {
            name: String::from_utf16_lossy(&caps.szPname[..len]),
            manufacturer_id: caps.wMid,
            product_id: caps.wPid,
            driver_version: caps.vDriverVersion,
            technology: caps.wTechnology,
            voices: caps.wVoices,
            channel_mask: caps.wChannelMask,
            support: caps.dwSupport,
        });
    }

    Ok(devices)
}
