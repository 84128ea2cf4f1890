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
use std::path::{Path, PathBuf};

use tracing::{info, span, Level, Span};

use crate::error::Error;
use crate::player;

use super::inventory::{self, Inventory, PortCapabilities};
use super::stack::{
    Stack, DEFAULT_PATH_CHANNELS, PRIMARY_BITS_PER_SAMPLE, PRIMARY_CHANNELS, PRIMARY_SAMPLE_RATE,
};

/// Playback session options, as taken from the command line.
pub struct Options {
    /// The audio output device index. Negative selects the default device.
    pub audio_index: i32,
    /// The MIDI output port index. Negative plays over the default audio
    /// path.
    pub port_index: i32,
    /// The downloadable instrument collection to load, if any.
    pub bank: Option<PathBuf>,
}

/// How the performance was initialised. Chosen once; there is no runtime
/// mode switch.
pub enum PerformanceMode {
    /// The performance created its own audio path over the shared
    /// stereo-plus-reverb topology.
    DefaultPath,
    /// A port was built from the resolved capabilities, added to the
    /// performance and activated.
    ExplicitPort(PortCapabilities),
}

impl fmt::Display for PerformanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceMode::DefaultPath => write!(f, "default audio path"),
            PerformanceMode::ExplicitPort(caps) => write!(f, "port {}", caps.description),
        }
    }
}

#[derive(Debug, PartialEq)]
enum State {
    Initialized,
    Playing,
    Closed,
}

/// A playback session against the music and sound stack. Owns the
/// construction order, the teardown order and the external module refusal
/// policy.
pub struct Session {
    stack: Box<dyn Stack>,
    mode: PerformanceMode,
    external: bool,
    state: State,
    span: Span,
}

impl Session {
    /// Initialises a playback session. On failure the partially constructed
    /// state is torn down in full before the error is returned.
    pub fn initialise(mut stack: Box<dyn Stack>, options: &Options) -> Result<Session, Error> {
        let span = span!(Level::INFO, "session");

        let constructed = {
            let _enter = span.enter();
            Session::construct(stack.as_mut(), options)
        };

        match constructed {
            Ok((mode, external)) => {
                let session = Session {
                    stack,
                    mode,
                    external,
                    state: State::Initialized,
                    span,
                };
                {
                    let _enter = session.span.enter();
                    info!(mode = %session.mode, "Initialised playback session.");
                }
                Ok(session)
            }
            Err(err) => {
                run_teardown(stack.as_mut());
                Err(err)
            }
        }
    }

    fn construct(
        stack: &mut dyn Stack,
        options: &Options,
    ) -> Result<(PerformanceMode, bool), Error> {
        stack.acquire_window()?;
        stack.init_com()?;
        stack.create_objects()?;

        let inventory = Inventory::scan(stack)?;

        let device = inventory.select_audio(options.audio_index)?.copied();
        if options.audio_index >= 0 {
            // select_audio validated the index.
            let name = inventory.audio_devices()[options.audio_index as usize]
                .name
                .as_str();
            info!(device = name, "Using audio device.");
        }
        stack.open_audio(device.as_ref())?;
        info!(
            sample_rate = PRIMARY_SAMPLE_RATE,
            bits = PRIMARY_BITS_PER_SAMPLE,
            channels = PRIMARY_CHANNELS,
            "Opened audio output."
        );
        stack.bind_audio()?;

        if let Some(bank) = options.bank.as_deref() {
            stack.load_collection(bank)?;
            info!(bank = %bank.display(), "Loaded instrument collection.");
        }

        match inventory::resolve_port(stack, options.port_index)? {
            None => {
                stack.init_performance_default()?;
                info!(
                    channels = DEFAULT_PATH_CHANNELS,
                    "Initialised performance on the default audio path."
                );
                Ok((PerformanceMode::DefaultPath, false))
            }
            Some(caps) => {
                info!(port = caps.description.as_str(), "Using MIDI port.");
                let actual = stack.create_port(&caps)?;
                info!(
                    dls = actual.supports_dls(),
                    audio_path = actual.supports_audio_path(),
                    external = actual.is_external(),
                    software_synth = actual.is_software_synth(),
                    "Created MIDI port."
                );
                stack.init_performance_legacy()?;
                stack.add_port()?;
                stack.activate_port()?;

                let external = actual.is_external();
                Ok((PerformanceMode::ExplicitPort(actual), external))
            }
        }
    }

    /// Tears the session down in the reverse of the construction order.
    /// Calling it a second time is a no-op.
    pub fn teardown(&mut self) {
        if self.state == State::Closed {
            return;
        }

        let _enter = self.span.enter();
        info!("Tearing down playback session.");
        run_teardown(self.stack.as_mut());
        self.state = State::Closed;
    }

    #[cfg(test)]
    pub fn mode(&self) -> &PerformanceMode {
        &self.mode
    }
}

impl player::Player for Session {
    /// Loads the MIDI file as a segment, downloads its instrument data into
    /// the performance and schedules it after the prepare time, from the
    /// start of the performance clock.
    fn play(&mut self, path: &Path) -> Result<(), Error> {
        let _enter = self.span.enter();

        if self.state == State::Closed {
            return Err(Error::Closed);
        }
        if self.external {
            return Err(Error::ExternalModule);
        }

        self.stack.load_segment(path)?;
        self.stack.download_segment()?;
        self.stack.play_segment()?;
        self.state = State::Playing;

        info!(file = %path.display(), "Scheduled segment for playback.");
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        self.teardown();
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Releases everything a session may have acquired, in the reverse of the
/// construction order. Every step is a no-op when its subject is absent,
/// which is what makes this safe to run after a partial initialisation.
pub(crate) fn run_teardown(stack: &mut dyn Stack) {
    stack.release_segment();
    stack.release_buffer();
    stack.release_port();
    stack.release_collection();
    stack.release_loader();
    stack.release_audio();
    stack.release_music();
    stack.close_performance();
    stack.uninit_com();
}

#[cfg(test)]
mod test {
    use std::path::{Path, PathBuf};

    use crate::dmusic::inventory::{AudioDevice, DeviceId};
    use crate::dmusic::mock::{self, Event};
    use crate::error::Error;
    use crate::player::Player as _;

    use super::{Options, PerformanceMode, Session};

    const SPEAKERS: DeviceId = DeviceId(0xBD6D_D71A_3DEB_11D1_B171_0024_7528_1389);

    fn stack() -> mock::Stack {
        mock::Stack::new()
            .with_audio(vec![
                AudioDevice {
                    id: None,
                    name: "Primary Sound Driver".to_string(),
                },
                AudioDevice {
                    id: Some(SPEAKERS),
                    name: "Speakers (High Definition Audio)".to_string(),
                },
            ])
            .with_ports(vec![
                mock::synth_port("Microsoft Synthesizer"),
                mock::external_port("MPU-401"),
            ])
    }

    fn options(audio_index: i32, port_index: i32) -> Options {
        Options {
            audio_index,
            port_index,
            bank: None,
        }
    }

    #[test]
    fn test_default_path_mode() {
        let stack = stack();
        let session =
            Session::initialise(Box::new(stack.clone()), &options(-1, -1)).expect("initialise");

        assert!(matches!(session.mode(), PerformanceMode::DefaultPath));

        let events = stack.events();
        assert!(events.contains(&Event::InitPerformanceDefault));
        assert!(!events.iter().any(|event| matches!(event, Event::CreatePort(_))));
        assert!(!events.contains(&Event::AddPort));
    }

    #[test]
    fn test_explicit_port_mode() {
        let stack = stack();
        let session =
            Session::initialise(Box::new(stack.clone()), &options(-1, 0)).expect("initialise");

        match session.mode() {
            PerformanceMode::ExplicitPort(caps) => {
                assert_eq!("Microsoft Synthesizer", caps.description)
            }
            PerformanceMode::DefaultPath => panic!("expected explicit port mode"),
        }

        let expected = vec![
            Event::AcquireWindow,
            Event::InitCom,
            Event::CreateObjects,
            Event::EnumerateAudio,
            Event::EnumeratePorts,
            Event::OpenAudio(None),
            Event::BindAudio,
            Event::PortByOrdinal(0),
            Event::CreatePort(mock::synth_port("Microsoft Synthesizer").id),
            Event::InitPerformanceLegacy,
            Event::AddPort,
            Event::ActivatePort,
        ];
        assert_eq!(expected, stack.events());
    }

    #[test]
    fn test_play_then_teardown_releases_everything_once() {
        let stack = stack();
        let mut session = Session::initialise(
            Box::new(stack.clone()),
            &Options {
                audio_index: -1,
                port_index: -1,
                bank: Some(PathBuf::from("gm.dls")),
            },
        )
        .expect("initialise");

        session.play(Path::new("tune.mid")).expect("play");
        session.teardown();

        let expected = vec![
            Event::AcquireWindow,
            Event::InitCom,
            Event::CreateObjects,
            Event::EnumerateAudio,
            Event::EnumeratePorts,
            Event::OpenAudio(None),
            Event::BindAudio,
            Event::LoadCollection(PathBuf::from("gm.dls")),
            Event::InitPerformanceDefault,
            Event::LoadSegment(PathBuf::from("tune.mid")),
            Event::DownloadSegment,
            Event::PlaySegment,
            Event::ReleaseSegment,
            Event::ReleaseBuffer,
            Event::ReleasePort,
            Event::ReleaseCollection,
            Event::ReleaseLoader,
            Event::ReleaseAudio,
            Event::ReleaseMusic,
            Event::ClosePerformance,
            Event::UninitCom,
        ];
        assert_eq!(expected, stack.events());
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let stack = stack();
        let mut session =
            Session::initialise(Box::new(stack.clone()), &options(-1, -1)).expect("initialise");

        session.teardown();
        let after_first = stack.events();
        session.teardown();
        assert_eq!(after_first, stack.events());

        // Dropping the session after an explicit teardown adds nothing.
        drop(session);
        assert_eq!(after_first, stack.events());
    }

    #[test]
    fn test_failed_step_triggers_full_teardown() {
        let stack = stack().fail_on("add_port");
        let result = Session::initialise(Box::new(stack.clone()), &options(-1, 0));

        assert!(matches!(
            result,
            Err(Error::Provider {
                function: "add_port",
                ..
            })
        ));

        let events = stack.events();
        let releases = &events[events.len() - 9..];
        assert_eq!(
            vec![
                Event::ReleaseSegment,
                Event::ReleaseBuffer,
                Event::ReleasePort,
                Event::ReleaseCollection,
                Event::ReleaseLoader,
                Event::ReleaseAudio,
                Event::ReleaseMusic,
                Event::ClosePerformance,
                Event::UninitCom,
            ],
            releases
        );
    }

    #[test]
    fn test_external_port_refuses_playback() {
        let stack = stack();
        let mut session =
            Session::initialise(Box::new(stack.clone()), &options(-1, 1)).expect("initialise");

        let err = session.play(Path::new("tune.mid")).expect_err("refusal");
        assert!(matches!(err, Error::ExternalModule));
        assert_eq!("external MIDI module path is not supported", err.to_string());

        // The segment was never touched.
        assert!(!stack
            .events()
            .iter()
            .any(|event| matches!(event, Event::LoadSegment(_))));
    }

    #[test]
    fn test_audio_selection() {
        let stack1 = stack();
        let _session =
            Session::initialise(Box::new(stack1.clone()), &options(1, -1)).expect("initialise");
        assert!(stack1.events().contains(&Event::OpenAudio(Some(SPEAKERS))));

        let stack2 = stack();
        let result = Session::initialise(Box::new(stack2.clone()), &options(5, -1));
        assert!(matches!(
            result,
            Err(Error::AudioSelection { index: 5, count: 2 })
        ));
        assert_eq!(Some(&Event::UninitCom), stack2.events().last());
    }

    #[test]
    fn test_port_not_found() {
        let stack = stack();
        let result = Session::initialise(Box::new(stack.clone()), &options(-1, 999));

        assert!(matches!(result, Err(Error::PortNotFound { ordinal: 999 })));
        assert_eq!(Some(&Event::UninitCom), stack.events().last());
    }

    #[test]
    fn test_play_after_close() {
        let stack = stack();
        let mut session =
            Session::initialise(Box::new(stack.clone()), &options(-1, -1)).expect("initialise");

        session.teardown();
        assert!(matches!(
            session.play(Path::new("tune.mid")),
            Err(Error::Closed)
        ));
    }
}
