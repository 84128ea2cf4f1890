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
use std::sync::{Arc, Mutex};

use crate::error::Error;

use super::inventory::{AudioDevice, DeviceId, PortCapabilities, PortDescriptor, PortId};
use super::stack;

/// Result code handed out for scripted failures.
const E_FAIL: i32 = 0x8000_4005_u32 as i32;

/// A call observed by the mock stack.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    AcquireWindow,
    InitCom,
    CreateObjects,
    EnumerateAudio,
    EnumeratePorts,
    PortByOrdinal(usize),
    OpenAudio(Option<DeviceId>),
    BindAudio,
    LoadCollection(PathBuf),
    InitPerformanceDefault,
    CreatePort(PortId),
    InitPerformanceLegacy,
    AddPort,
    ActivatePort,
    LoadSegment(PathBuf),
    DownloadSegment,
    PlaySegment,
    ReleaseSegment,
    ReleaseBuffer,
    ReleasePort,
    ReleaseCollection,
    ReleaseLoader,
    ReleaseAudio,
    ReleaseMusic,
    ClosePerformance,
    UninitCom,
}

/// A mock stack. Doesn't drive any provider; records every call and hands
/// out scripted device lists instead.
#[derive(Clone, Default)]
pub struct Stack {
    audio: Vec<AudioDevice>,
    ports: Vec<PortCapabilities>,
    fail_on: Option<&'static str>,
    events: Arc<Mutex<Vec<Event>>>,
}

impl Stack {
    /// Gets a new mock stack with no devices.
    pub fn new() -> Stack {
        Stack::default()
    }

    /// Scripts the audio device list.
    pub fn with_audio(mut self, audio: Vec<AudioDevice>) -> Stack {
        self.audio = audio;
        self
    }

    /// Scripts the synth port list. Ordinals are assigned by position.
    pub fn with_ports(mut self, ports: Vec<PortCapabilities>) -> Stack {
        self.ports = ports;
        self
    }

    /// Fails the named stack call with a scripted result code.
    pub fn fail_on(mut self, function: &'static str) -> Stack {
        self.fail_on = Some(function);
        self
    }

    /// The calls observed so far, in order.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("unable to get event lock").clone()
    }

    fn record(&self, event: Event) {
        self.events
            .lock()
            .expect("unable to get event lock")
            .push(event);
    }

    fn result_for(&self, function: &'static str) -> Result<(), Error> {
        if self.fail_on == Some(function) {
            return Err(Error::provider(function, E_FAIL));
        }

        Ok(())
    }
}

/// Builds the capabilities of a software synth port.
pub fn synth_port(description: &str) -> PortCapabilities {
    PortCapabilities {
        id: PortId(0x58D5_8419_71DA_11D1_A74C_0000_F875_AC12),
        description: description.to_string(),
        max_voices: 32,
        max_channel_groups: 2,
        max_audio_channels: 2,
        effect_flags: 0x1,
        feature_flags: PortCapabilities::DLS
            | PortCapabilities::AUDIO_PATH
            | PortCapabilities::SOFTWARE_SYNTH,
    }
}

/// Builds the capabilities of an external hardware module port.
pub fn external_port(description: &str) -> PortCapabilities {
    PortCapabilities {
        id: PortId(0xB548_6B17_ED9C_11D0_B16E_0024_7528_1389),
        description: description.to_string(),
        max_voices: 0,
        max_channel_groups: 16,
        max_audio_channels: 0,
        effect_flags: 0,
        feature_flags: PortCapabilities::EXTERNAL,
    }
}

impl stack::Stack for Stack {
    fn acquire_window(&mut self) -> Result<(), Error> {
        self.record(Event::AcquireWindow);
        self.result_for("acquire_window")
    }

    fn init_com(&mut self) -> Result<(), Error> {
        self.record(Event::InitCom);
        self.result_for("init_com")
    }

    fn create_objects(&mut self) -> Result<(), Error> {
        self.record(Event::CreateObjects);
        self.result_for("create_objects")
    }

    fn enumerate_audio(&mut self) -> Result<Vec<AudioDevice>, Error> {
        self.record(Event::EnumerateAudio);
        self.result_for("enumerate_audio")?;
        Ok(self.audio.clone())
    }

    fn enumerate_ports(&mut self) -> Result<Vec<PortDescriptor>, Error> {
        self.record(Event::EnumeratePorts);
        self.result_for("enumerate_ports")?;
        Ok(self
            .ports
            .iter()
            .cloned()
            .enumerate()
            .map(|(ordinal, caps)| PortDescriptor { ordinal, caps })
            .collect())
    }

    fn port_by_ordinal(&mut self, ordinal: usize) -> Result<Option<PortCapabilities>, Error> {
        self.record(Event::PortByOrdinal(ordinal));
        self.result_for("port_by_ordinal")?;
        Ok(self.ports.get(ordinal).cloned())
    }

    fn open_audio(&mut self, device: Option<&DeviceId>) -> Result<(), Error> {
        self.record(Event::OpenAudio(device.copied()));
        self.result_for("open_audio")
    }

    fn bind_audio(&mut self) -> Result<(), Error> {
        self.record(Event::BindAudio);
        self.result_for("bind_audio")
    }

    fn load_collection(&mut self, path: &Path) -> Result<(), Error> {
        self.record(Event::LoadCollection(path.to_path_buf()));
        self.result_for("load_collection")
    }

    fn init_performance_default(&mut self) -> Result<(), Error> {
        self.record(Event::InitPerformanceDefault);
        self.result_for("init_performance_default")
    }

    fn create_port(&mut self, caps: &PortCapabilities) -> Result<PortCapabilities, Error> {
        self.record(Event::CreatePort(caps.id));
        self.result_for("create_port")?;
        Ok(caps.clone())
    }

    fn init_performance_legacy(&mut self) -> Result<(), Error> {
        self.record(Event::InitPerformanceLegacy);
        self.result_for("init_performance_legacy")
    }

    fn add_port(&mut self) -> Result<(), Error> {
        self.record(Event::AddPort);
        self.result_for("add_port")
    }

    fn activate_port(&mut self) -> Result<(), Error> {
        self.record(Event::ActivatePort);
        self.result_for("activate_port")
    }

    fn load_segment(&mut self, path: &Path) -> Result<(), Error> {
        self.record(Event::LoadSegment(path.to_path_buf()));
        self.result_for("load_segment")
    }

    fn download_segment(&mut self) -> Result<(), Error> {
        self.record(Event::DownloadSegment);
        self.result_for("download_segment")
    }

    fn play_segment(&mut self) -> Result<(), Error> {
        self.record(Event::PlaySegment);
        self.result_for("play_segment")
    }

    fn release_segment(&mut self) {
        self.record(Event::ReleaseSegment);
    }

    fn release_buffer(&mut self) {
        self.record(Event::ReleaseBuffer);
    }

    fn release_port(&mut self) {
        self.record(Event::ReleasePort);
    }

    fn release_collection(&mut self) {
        self.record(Event::ReleaseCollection);
    }

    fn release_loader(&mut self) {
        self.record(Event::ReleaseLoader);
    }

    fn release_audio(&mut self) {
        self.record(Event::ReleaseAudio);
    }

    fn release_music(&mut self) {
        self.record(Event::ReleaseMusic);
    }

    fn close_performance(&mut self) {
        self.record(Event::ClosePerformance);
    }

    fn uninit_com(&mut self) {
        self.record(Event::UninitCom);
    }
}
