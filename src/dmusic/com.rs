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
use std::ffi::c_void;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;

use tracing::error;
use windows::core::{Interface, GUID, PCWSTR};
use windows::Win32::Foundation::{BOOL, E_POINTER, HWND, S_FALSE, S_OK};
use windows::Win32::Media::Audio::DirectMusic::{
    IDirectMusic, IDirectMusic8, IDirectMusicCollection, IDirectMusicLoader8,
    IDirectMusicPerformance8, IDirectMusicPort, IDirectMusicSegment8, DMUS_PORTCAPS,
    DMUS_PORTPARAMS8,
};
use windows::Win32::Media::Audio::DirectSound::{
    DirectSoundCreate8, DirectSoundEnumerateW, IDirectSound, IDirectSound8, IDirectSoundBuffer,
    DSBCAPS_CTRLPAN, DSBCAPS_CTRLVOLUME, DSBCAPS_PRIMARYBUFFER, DSBUFFERDESC, DSSCL_PRIORITY,
};
use windows::Win32::Media::Audio::{WAVEFORMATEX, WAVE_FORMAT_PCM};
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CoUninitialize, CLSCTX_INPROC_SERVER, COINIT_MULTITHREADED,
};
use windows::Win32::System::Console::GetConsoleWindow;

use crate::error::{Error, ResultCode};

use super::inventory::{AudioDevice, DeviceId, PortCapabilities, PortDescriptor, PortId};
use super::stack::{
    self, DEFAULT_PATH_CHANNELS, PRIMARY_BITS_PER_SAMPLE, PRIMARY_CHANNELS, PRIMARY_SAMPLE_RATE,
};

// Class identifiers from dmusici.h; the bindings do not export them all.
const CLSID_DIRECTMUSIC: GUID = GUID::from_u128(0x636b9f10_0c7d_11d1_95b2_0020afdc7421);
const CLSID_DIRECTMUSIC_LOADER: GUID = GUID::from_u128(0xd2ac2892_b39b_11d1_8704_00600893b1bd);
const CLSID_DIRECTMUSIC_PERFORMANCE: GUID =
    GUID::from_u128(0xd2ac2881_b39b_11d1_8704_00600893b1bd);
const CLSID_DIRECTMUSIC_COLLECTION: GUID =
    GUID::from_u128(0x480ff4b0_28b2_11d1_bef7_00c04fbf8fef);
const CLSID_DIRECTMUSIC_SEGMENT: GUID = GUID::from_u128(0xd2ac2882_b39b_11d1_8704_00600893b1bd);

// Port parameter flags from dmusicc.h.
const DMUS_PORTPARAMS_VOICES: u32 = 0x01;
const DMUS_PORTPARAMS_CHANNELGROUPS: u32 = 0x02;
const DMUS_PORTPARAMS_AUDIOCHANNELS: u32 = 0x04;
const DMUS_PORTPARAMS_SAMPLERATE: u32 = 0x08;
const DMUS_PORTPARAMS_EFFECTS: u32 = 0x20;
const DMUS_PORTPARAMS_SHARE: u32 = 0x40;
const DMUS_PORTPARAMS_FEATURES: u32 = 0x80;
const DMUS_PORT_FEATURE_AUDIOPATH: u32 = 0x01;

// Audio path topology and segment scheduling flags from dmusici.h.
const DMUS_APATH_SHARED_STEREOPLUSREVERB: u32 = 1;
const DMUS_SEGF_AFTERPREPARETIME: u32 = 1 << 10;

/// The real stack over the DirectMusic and DirectSound objects. The
/// interface pointers are reference counted, so releasing an object means
/// dropping its holder.
pub struct Stack {
    window: HWND,
    com_initialised: bool,
    loader: Option<IDirectMusicLoader8>,
    performance: Option<IDirectMusicPerformance8>,
    music: Option<IDirectMusic8>,
    audio: Option<IDirectSound8>,
    buffer: Option<IDirectSoundBuffer>,
    collection: Option<IDirectMusicCollection>,
    port: Option<IDirectMusicPort>,
    segment: Option<IDirectMusicSegment8>,
}

impl Stack {
    pub fn new() -> Stack {
        Stack {
            window: HWND(0),
            com_initialised: false,
            loader: None,
            performance: None,
            music: None,
            audio: None,
            buffer: None,
            collection: None,
            port: None,
            segment: None,
        }
    }
}

fn win_err(function: &'static str, err: windows::core::Error) -> Error {
    Error::Provider {
        function,
        code: ResultCode::with_message(err.code().0, err.message().to_string()),
    }
}

fn missing(object: &'static str) -> Error {
    Error::Provider {
        function: object,
        code: ResultCode::with_message(E_POINTER.0, "object is not created"),
    }
}

fn wide(path: &Path) -> Vec<u16> {
    path.as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

fn convert_caps(caps: &DMUS_PORTCAPS) -> PortCapabilities {
    let len = caps
        .wszDescription
        .iter()
        .position(|c| *c == 0)
        .unwrap_or(caps.wszDescription.len());
    PortCapabilities {
        id: PortId(caps.guidPort.to_u128()),
        description: String::from_utf16_lossy(&caps.wszDescription[..len]),
        max_voices: caps.dwMaxVoices,
        max_channel_groups: caps.dwMaxChannelGroups,
        max_audio_channels: caps.dwMaxAudioChannels,
        effect_flags: caps.dwEffectFlags,
        feature_flags: caps.dwFlags,
    }
}

unsafe extern "system" fn collect_device(
    guid: *mut GUID,
    description: PCWSTR,
    _module: PCWSTR,
    context: *mut c_void,
) -> BOOL {
    let devices = &mut *(context as *mut Vec<AudioDevice>);

    // The GUID is null only for the primary sound driver entry.
    let id = if guid.is_null() {
        None
    } else {
        Some(DeviceId((*guid).to_u128()))
    };
    let name = description.to_string().unwrap_or_default();
    devices.push(AudioDevice { id, name });

    BOOL(1)
}

impl stack::Stack for Stack {
    fn acquire_window(&mut self) -> Result<(), Error> {
        let window = unsafe { GetConsoleWindow() };
        if window.0 == 0 {
            return Err(Error::NoHostWindow);
        }

        self.window = window;
        Ok(())
    }

    fn init_com(&mut self) -> Result<(), Error> {
        unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) }
            .map_err(|err| win_err("CoInitializeEx", err))?;
        self.com_initialised = true;
        Ok(())
    }

    fn create_objects(&mut self) -> Result<(), Error> {
        let loader: IDirectMusicLoader8 =
            unsafe { CoCreateInstance(&CLSID_DIRECTMUSIC_LOADER, None, CLSCTX_INPROC_SERVER) }
                .map_err(|err| win_err("CoCreateInstance(DirectMusicLoader)", err))?;
        let performance: IDirectMusicPerformance8 =
            unsafe { CoCreateInstance(&CLSID_DIRECTMUSIC_PERFORMANCE, None, CLSCTX_INPROC_SERVER) }
                .map_err(|err| win_err("CoCreateInstance(DirectMusicPerformance)", err))?;
        let music: IDirectMusic8 =
            unsafe { CoCreateInstance(&CLSID_DIRECTMUSIC, None, CLSCTX_INPROC_SERVER) }
                .map_err(|err| win_err("CoCreateInstance(DirectMusic)", err))?;

        self.loader = Some(loader);
        self.performance = Some(performance);
        self.music = Some(music);
        Ok(())
    }

    fn enumerate_audio(&mut self) -> Result<Vec<AudioDevice>, Error> {
        let mut devices: Vec<AudioDevice> = Vec::new();
        unsafe {
            DirectSoundEnumerateW(
                Some(collect_device),
                Some(&mut devices as *mut Vec<AudioDevice> as *mut c_void),
            )
        }
        .map_err(|err| win_err("DirectSoundEnumerateW", err))?;
        Ok(devices)
    }

    fn enumerate_ports(&mut self) -> Result<Vec<PortDescriptor>, Error> {
        let music = self.music.as_ref().ok_or_else(|| missing("IDirectMusic8"))?;

        let mut ports = Vec::new();
        let mut index = 0u32;
        loop {
            let mut caps = DMUS_PORTCAPS {
                dwSize: std::mem::size_of::<DMUS_PORTCAPS>() as u32,
                ..Default::default()
            };

            // EnumPort reports exhaustion through S_FALSE, which the
            // generated bindings fold into Ok, so go through the vtable to
            // keep the raw result.
            let hr = unsafe { (music.vtable().base__.EnumPort)(music.as_raw(), index, &mut caps) };
            if hr == S_FALSE {
                break;
            }
            if hr != S_OK {
                // Keep whatever was enumerated so far.
                error!(code = hr.0, "Error during port enumeration.");
                break;
            }

            ports.push(PortDescriptor {
                ordinal: index as usize,
                caps: convert_caps(&caps),
            });
            index += 1;
        }

        Ok(ports)
    }

    fn port_by_ordinal(&mut self, ordinal: usize) -> Result<Option<PortCapabilities>, Error> {
        let ports = self.enumerate_ports()?;
        Ok(ports
            .into_iter()
            .find(|port| port.ordinal == ordinal)
            .map(|port| port.caps))
    }

    fn open_audio(&mut self, device: Option<&DeviceId>) -> Result<(), Error> {
        let guid = device.map(|id| GUID::from_u128(id.0));
        let mut audio: Option<IDirectSound8> = None;
        unsafe {
            DirectSoundCreate8(
                guid.as_ref().map(|guid| guid as *const GUID),
                &mut audio,
                None,
            )
        }
        .map_err(|err| win_err("DirectSoundCreate8", err))?;
        let audio = audio.ok_or_else(|| missing("IDirectSound8"))?;

        unsafe { audio.SetCooperativeLevel(self.window, DSSCL_PRIORITY) }
            .map_err(|err| win_err("SetCooperativeLevel", err))?;

        let desc = DSBUFFERDESC {
            dwSize: std::mem::size_of::<DSBUFFERDESC>() as u32,
            dwFlags: DSBCAPS_PRIMARYBUFFER | DSBCAPS_CTRLVOLUME | DSBCAPS_CTRLPAN,
            ..Default::default()
        };
        let mut buffer: Option<IDirectSoundBuffer> = None;
        unsafe { audio.CreateSoundBuffer(&desc, &mut buffer, None) }
            .map_err(|err| win_err("CreateSoundBuffer", err))?;
        let buffer = buffer.ok_or_else(|| missing("IDirectSoundBuffer"))?;

        let block_align = PRIMARY_CHANNELS * PRIMARY_BITS_PER_SAMPLE / 8;
        let format = WAVEFORMATEX {
            wFormatTag: WAVE_FORMAT_PCM as u16,
            nChannels: PRIMARY_CHANNELS,
            nSamplesPerSec: PRIMARY_SAMPLE_RATE,
            nAvgBytesPerSec: PRIMARY_SAMPLE_RATE * block_align as u32,
            nBlockAlign: block_align,
            wBitsPerSample: PRIMARY_BITS_PER_SAMPLE,
            cbSize: 0,
        };
        unsafe { buffer.SetFormat(&format) }.map_err(|err| win_err("SetFormat", err))?;

        self.audio = Some(audio);
        self.buffer = Some(buffer);
        Ok(())
    }

    fn bind_audio(&mut self) -> Result<(), Error> {
        let music = self.music.as_ref().ok_or_else(|| missing("IDirectMusic8"))?;
        let audio = self.audio.as_ref().ok_or_else(|| missing("IDirectSound8"))?;

        unsafe { music.SetDirectSound(audio, self.window) }
            .map_err(|err| win_err("SetDirectSound", err))?;
        Ok(())
    }

    fn load_collection(&mut self, path: &Path) -> Result<(), Error> {
        let loader = self
            .loader
            .as_ref()
            .ok_or_else(|| missing("IDirectMusicLoader8"))?;

        let path_w = wide(path);
        let mut object: *mut c_void = std::ptr::null_mut();
        unsafe {
            loader.LoadObjectFromFile(
                &CLSID_DIRECTMUSIC_COLLECTION,
                &IDirectMusicCollection::IID,
                PCWSTR(path_w.as_ptr()),
                &mut object,
            )
        }
        .map_err(|err| win_err("LoadObjectFromFile(collection)", err))?;

        self.collection = Some(unsafe { IDirectMusicCollection::from_raw(object) });
        Ok(())
    }

    fn init_performance_default(&mut self) -> Result<(), Error> {
        let performance = self
            .performance
            .as_ref()
            .ok_or_else(|| missing("IDirectMusicPerformance8"))?;
        let music = self.music.as_ref().ok_or_else(|| missing("IDirectMusic8"))?;
        let audio = self.audio.as_ref().ok_or_else(|| missing("IDirectSound8"))?;

        let mut music_g: Option<IDirectMusic> = Some(
            music
                .cast()
                .map_err(|err| win_err("QueryInterface(IDirectMusic)", err))?,
        );
        let mut audio_g: Option<IDirectSound> = Some(
            audio
                .cast()
                .map_err(|err| win_err("QueryInterface(IDirectSound)", err))?,
        );

        unsafe {
            performance.InitAudio(
                Some(&mut music_g as *mut Option<IDirectMusic>),
                Some(&mut audio_g as *mut Option<IDirectSound>),
                self.window,
                DMUS_APATH_SHARED_STEREOPLUSREVERB,
                DEFAULT_PATH_CHANNELS,
                0,
                None,
            )
        }
        .map_err(|err| win_err("InitAudio", err))?;
        Ok(())
    }

    fn create_port(&mut self, caps: &PortCapabilities) -> Result<PortCapabilities, Error> {
        let music = self.music.as_ref().ok_or_else(|| missing("IDirectMusic8"))?;

        let mut params = DMUS_PORTPARAMS8 {
            dwSize: std::mem::size_of::<DMUS_PORTPARAMS8>() as u32,
            dwValidParams: DMUS_PORTPARAMS_VOICES
                | DMUS_PORTPARAMS_CHANNELGROUPS
                | DMUS_PORTPARAMS_AUDIOCHANNELS
                | DMUS_PORTPARAMS_SAMPLERATE
                | DMUS_PORTPARAMS_EFFECTS
                | DMUS_PORTPARAMS_SHARE
                | DMUS_PORTPARAMS_FEATURES,
            dwVoices: caps.max_voices,
            dwChannelGroups: caps.max_channel_groups,
            dwAudioChannels: caps.max_audio_channels,
            dwSampleRate: PRIMARY_SAMPLE_RATE,
            dwEffectFlags: caps.effect_flags,
            fShare: BOOL(1),
            dwFeatures: DMUS_PORT_FEATURE_AUDIOPATH,
        };

        let guid = GUID::from_u128(caps.id.0);
        let mut port: Option<IDirectMusicPort> = None;
        unsafe { music.CreatePort(&guid, &mut params, &mut port, None) }
            .map_err(|err| win_err("CreatePort", err))?;
        let port = port.ok_or_else(|| missing("IDirectMusicPort"))?;

        let mut actual = DMUS_PORTCAPS {
            dwSize: std::mem::size_of::<DMUS_PORTCAPS>() as u32,
            ..Default::default()
        };
        unsafe { port.GetCaps(&mut actual) }.map_err(|err| win_err("GetCaps", err))?;

        self.port = Some(port);
        Ok(convert_caps(&actual))
    }

    fn init_performance_legacy(&mut self) -> Result<(), Error> {
        let performance = self
            .performance
            .as_ref()
            .ok_or_else(|| missing("IDirectMusicPerformance8"))?;
        let music = self.music.as_ref().ok_or_else(|| missing("IDirectMusic8"))?;
        let audio = self.audio.as_ref().ok_or_else(|| missing("IDirectSound8"))?;

        let mut music_g: Option<IDirectMusic> = Some(
            music
                .cast()
                .map_err(|err| win_err("QueryInterface(IDirectMusic)", err))?,
        );
        let audio_g: IDirectSound = audio
            .cast()
            .map_err(|err| win_err("QueryInterface(IDirectSound)", err))?;

        unsafe {
            performance.Init(
                Some(&mut music_g as *mut Option<IDirectMusic>),
                &audio_g,
                self.window,
            )
        }
        .map_err(|err| win_err("Init", err))?;
        Ok(())
    }

    fn add_port(&mut self) -> Result<(), Error> {
        let performance = self
            .performance
            .as_ref()
            .ok_or_else(|| missing("IDirectMusicPerformance8"))?;
        let port = self
            .port
            .as_ref()
            .ok_or_else(|| missing("IDirectMusicPort"))?;

        unsafe { performance.AddPort(port) }.map_err(|err| win_err("AddPort", err))?;
        Ok(())
    }

    fn activate_port(&mut self) -> Result<(), Error> {
        let port = self
            .port
            .as_ref()
            .ok_or_else(|| missing("IDirectMusicPort"))?;

        unsafe { port.Activate(true) }.map_err(|err| win_err("Activate", err))?;
        Ok(())
    }

    fn load_segment(&mut self, path: &Path) -> Result<(), Error> {
        let loader = self
            .loader
            .as_ref()
            .ok_or_else(|| missing("IDirectMusicLoader8"))?;

        let path_w = wide(path);
        let mut object: *mut c_void = std::ptr::null_mut();
        unsafe {
            loader.LoadObjectFromFile(
                &CLSID_DIRECTMUSIC_SEGMENT,
                &IDirectMusicSegment8::IID,
                PCWSTR(path_w.as_ptr()),
                &mut object,
            )
        }
        .map_err(|err| win_err("LoadObjectFromFile(segment)", err))?;

        self.segment = Some(unsafe { IDirectMusicSegment8::from_raw(object) });
        Ok(())
    }

    fn download_segment(&mut self) -> Result<(), Error> {
        let segment = self
            .segment
            .as_ref()
            .ok_or_else(|| missing("IDirectMusicSegment8"))?;
        let performance = self
            .performance
            .as_ref()
            .ok_or_else(|| missing("IDirectMusicPerformance8"))?;

        unsafe { segment.Download(performance) }.map_err(|err| win_err("Download", err))?;
        Ok(())
    }

    fn play_segment(&mut self) -> Result<(), Error> {
        let performance = self
            .performance
            .as_ref()
            .ok_or_else(|| missing("IDirectMusicPerformance8"))?;
        let segment = self
            .segment
            .as_ref()
            .ok_or_else(|| missing("IDirectMusicSegment8"))?;

        unsafe { performance.PlaySegment(segment, DMUS_SEGF_AFTERPREPARETIME, 0, None) }
            .map_err(|err| win_err("PlaySegment", err))?;
        Ok(())
    }

    fn release_segment(&mut self) {
        if let Some(segment) = self.segment.take() {
            if let Some(performance) = self.performance.as_ref() {
                if let Err(err) = unsafe { segment.Unload(performance) } {
                    error!(err = %err.message(), "Error unloading segment.");
                }
            }
        }
    }

    fn release_buffer(&mut self) {
        self.buffer = None;
    }

    fn release_port(&mut self) {
        self.port = None;
    }

    fn release_collection(&mut self) {
        self.collection = None;
    }

    fn release_loader(&mut self) {
        self.loader = None;
    }

    fn release_audio(&mut self) {
        self.audio = None;
    }

    fn release_music(&mut self) {
        self.music = None;
    }

    fn close_performance(&mut self) {
        if let Some(performance) = self.performance.take() {
            if let Err(err) = unsafe { performance.CloseDown() } {
                error!(err = %err.message(), "Error closing down performance.");
            }
        }
    }

    fn uninit_com(&mut self) {
        if self.com_initialised {
            unsafe { CoUninitialize() };
            self.com_initialised = false;
        }
    }
}
