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
use std::path::Path;

use crate::error::Error;

use super::inventory::{AudioDevice, DeviceId, PortCapabilities, PortDescriptor};

/// PCM format imposed on the primary output buffer before the performance
/// binds to the audio object.
pub const PRIMARY_SAMPLE_RATE: u32 = 44_100;
pub const PRIMARY_BITS_PER_SAMPLE: u16 = 16;
pub const PRIMARY_CHANNELS: u16 = 2;

/// Performance channels allocated on the default audio path.
pub const DEFAULT_PATH_CHANNELS: u32 = 16;

/// The operating system's music and sound stack, modeled as one stateful
/// collaborator. The session drives these calls in a fixed order; the stack
/// itself holds the provider objects and hands out plain descriptors.
///
/// The release methods mirror the construction methods one for one. Each is
/// a no-op when its subject was never created, which is what makes teardown
/// safe to run after a partial initialisation.
pub trait Stack {
    /// Obtains the host console window that playback will be bound to.
    fn acquire_window(&mut self) -> Result<(), Error>;

    /// Joins the process-wide component infrastructure on this thread.
    fn init_com(&mut self) -> Result<(), Error>;

    /// Creates the loader, the performance, and the music object, in that
    /// order.
    fn create_objects(&mut self) -> Result<(), Error>;

    /// Enumerates the audio output devices. The first entry may represent
    /// the default device and carries no identifier.
    fn enumerate_audio(&mut self) -> Result<Vec<AudioDevice>, Error>;

    /// Enumerates the music object's synth ports in discovery order.
    fn enumerate_ports(&mut self) -> Result<Vec<PortDescriptor>, Error>;

    /// Re-scans the ports for the one with the given ordinal. Returns `None`
    /// when the provider reports exhaustion before reaching it.
    fn port_by_ordinal(&mut self, ordinal: usize) -> Result<Option<PortCapabilities>, Error>;

    /// Creates the audio output object against the given device (`None`
    /// selects the default device), raises the cooperative level so the
    /// primary buffer format may be changed, creates the primary buffer with
    /// volume and pan control, and imposes the fixed PCM format.
    fn open_audio(&mut self, device: Option<&DeviceId>) -> Result<(), Error>;

    /// Associates the audio object with the music object under the host
    /// window. The primary format must already be set.
    fn bind_audio(&mut self) -> Result<(), Error>;

    /// Loads a downloadable instrument collection. The collection is not
    /// attached anywhere; segment download finds it through the loader's
    /// cache.
    fn load_collection(&mut self, path: &Path) -> Result<(), Error>;

    /// Initialises the performance with the shared stereo-plus-reverb
    /// default audio path and [`DEFAULT_PATH_CHANNELS`] channels. Not
    /// compatible with explicit port addition.
    fn init_performance_default(&mut self) -> Result<(), Error>;

    /// Creates a synth port with parameters built from the given
    /// capabilities, then queries and returns the port's actual
    /// capabilities.
    fn create_port(&mut self, caps: &PortCapabilities) -> Result<PortCapabilities, Error>;

    /// Initialises the performance through the legacy initialiser that is
    /// compatible with explicit port addition.
    fn init_performance_legacy(&mut self) -> Result<(), Error>;

    /// Adds the created port to the performance.
    fn add_port(&mut self) -> Result<(), Error>;

    /// Activates the created port.
    fn activate_port(&mut self) -> Result<(), Error>;

    /// Loads the given MIDI file as a playable segment.
    fn load_segment(&mut self, path: &Path) -> Result<(), Error>;

    /// Downloads the segment's instrument data into the performance.
    fn download_segment(&mut self) -> Result<(), Error>;

    /// Schedules the segment after the prepare time, from the start of the
    /// performance clock.
    fn play_segment(&mut self) -> Result<(), Error>;

    /// Unloads the segment from the performance, then releases it.
    fn release_segment(&mut self);

    /// Releases the primary audio buffer.
    fn release_buffer(&mut self);

    /// Releases the synth port.
    fn release_port(&mut self);

    /// Releases the instrument collection.
    fn release_collection(&mut self);

    /// Releases the loader.
    fn release_loader(&mut self);

    /// Releases the audio object.
    fn release_audio(&mut self);

    /// Releases the music object.
    fn release_music(&mut self);

    /// Closes down the performance, then releases it.
    fn close_performance(&mut self);

    /// Leaves the process-wide component infrastructure.
    fn uninit_com(&mut self);
}
