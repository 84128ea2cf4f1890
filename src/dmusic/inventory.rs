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

use crate::error::Error;

use super::stack::Stack;

/// An opaque 128-bit audio device identifier assigned by the operating
/// system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceId(pub u128);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.0;
        write!(
            f,
            "{:08X}-{:04X}-{:04X}-{:04X}-{:012X}",
            (id >> 96) as u32,
            (id >> 80) as u16,
            (id >> 64) as u16,
            (id >> 48) as u16,
            id & 0xFFFF_FFFF_FFFF
        )
    }
}

/// An opaque identifier for a synth port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortId(pub u128);

/// An enumerated audio output device. The identifier is absent for the
/// entry representing the default device.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioDevice {
    pub id: Option<DeviceId>,
    pub name: String,
}

impl fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "({}) {}", id, self.name),
            None => write!(f, "(default) {}", self.name),
        }
    }
}

/// The capabilities a synth port declares for itself.
#[derive(Clone, Debug, PartialEq)]
pub struct PortCapabilities {
    pub id: PortId,
    pub description: String,
    pub max_voices: u32,
    pub max_channel_groups: u32,
    pub max_audio_channels: u32,
    pub effect_flags: u32,
    pub feature_flags: u32,
}

impl PortCapabilities {
    /// Feature flag bits, as declared by the provider stack.
    pub const DLS: u32 = 0x0000_0001;
    pub const EXTERNAL: u32 = 0x0000_0002;
    pub const SOFTWARE_SYNTH: u32 = 0x0000_0004;
    pub const AUDIO_PATH: u32 = 0x0000_0400;

    /// Whether the port renders downloadable instrument collections.
    pub fn supports_dls(&self) -> bool {
        self.feature_flags & Self::DLS != 0
    }

    /// Whether the port can route through an audio path.
    pub fn supports_audio_path(&self) -> bool {
        self.feature_flags & Self::AUDIO_PATH != 0
    }

    /// Whether the port forwards to an external MIDI module.
    pub fn is_external(&self) -> bool {
        self.feature_flags & Self::EXTERNAL != 0
    }

    /// Whether the port is a software synthesizer.
    pub fn is_software_synth(&self) -> bool {
        self.feature_flags & Self::SOFTWARE_SYNTH != 0
    }
}

/// A synth port as discovered during enumeration.
#[derive(Clone, Debug, PartialEq)]
pub struct PortDescriptor {
    pub ordinal: usize,
    pub caps: PortCapabilities,
}

impl fmt::Display for PortDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.ordinal, self.caps.description)
    }
}

/// The enumeration snapshot produced during initialisation. Selection
/// indices are resolved against this snapshot for the rest of the session.
pub struct Inventory {
    audio: Vec<AudioDevice>,
    ports: Vec<PortDescriptor>,
}

impl Inventory {
    /// Scans both device inventories.
    pub fn scan(stack: &mut dyn Stack) -> Result<Inventory, Error> {
        Ok(Inventory {
            audio: stack.enumerate_audio()?,
            ports: stack.enumerate_ports()?,
        })
    }

    /// The enumerated audio output devices.
    pub fn audio_devices(&self) -> &[AudioDevice] {
        &self.audio
    }

    /// The enumerated synth ports.
    pub fn ports(&self) -> &[PortDescriptor] {
        &self.ports
    }

    /// Resolves an audio device index. A negative index selects the default
    /// device; a non-negative index must address the enumerated list.
    pub fn select_audio(&self, index: i32) -> Result<Option<&DeviceId>, Error> {
        if index < 0 {
            return Ok(None);
        }

        let index = index as usize;
        match self.audio.get(index) {
            Some(device) => Ok(device.id.as_ref()),
            None => Err(Error::AudioSelection {
                index,
                count: self.audio.len(),
            }),
        }
    }
}

/// Resolves a MIDI port index to the capabilities of the port with the
/// matching ordinal. A negative index selects the default audio path. The
/// ports are re-enumerated rather than read from the snapshot, in case the
/// provider invalidated it between listing and selection.
pub fn resolve_port(stack: &mut dyn Stack, index: i32) -> Result<Option<PortCapabilities>, Error> {
    if index < 0 {
        return Ok(None);
    }

    let ordinal = index as usize;
    match stack.port_by_ordinal(ordinal)? {
        Some(caps) => Ok(Some(caps)),
        None => Err(Error::PortNotFound { ordinal }),
    }
}
