use anyhow::{Context, Result};
use jack::{AsyncClient, Client, ClientOptions};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

use crate::amp::params::Parameters;
use crate::audio::jack::{NotificationHandler, ProcessHandler};
use crate::audio::ports::{INPUT_LEFT, INPUT_RIGHT, OUTPUT_LEFT, OUTPUT_RIGHT};
use crate::audio::recorder::Recorder;
use crate::processor::Processor;
use crate::settings::AudioSettings;

const CLIENT_NAME: &str = "crunchbox";

pub struct Manager {
    active_client: AsyncClient<NotificationHandler, ProcessHandler>,
    params: Arc<Parameters>,
    recorder: Option<Recorder>,
}

impl Manager {
    /// Open a JACK client, start processing and connect ports per `settings`.
    /// When `record_dir` is given, the processed output is also written to disk.
    pub fn new(
        settings: &AudioSettings,
        params: Arc<Parameters>,
        record_dir: Option<&Path>,
    ) -> Result<Self> {
        let (client, _) = Client::new(CLIENT_NAME, ClientOptions::NO_START_SERVER)
            .context("failed to create JACK client")?;

        let sample_rate = client.sample_rate();
        let buffer_size = client.buffer_size() as usize;
        info!("JACK running at {sample_rate} Hz, {buffer_size} frames");

        let (recorder, tap) = match record_dir {
            Some(dir) => {
                let (recorder, tap) = Recorder::new(sample_rate as u32, dir, buffer_size)?;
                (Some(recorder), Some(tap))
            }
            None => (None, None),
        };

        let processor = Processor::new(Arc::clone(&params));
        let jack_handler = ProcessHandler::new(&client, processor, tap)
            .context("failed to create process handler")?;

        let notifications = jack_handler.notifications();
        let active_client = client
            .activate_async(notifications, jack_handler)
            .context("failed to activate async client")?;

        let manager = Self {
            active_client,
            params,
            recorder,
        };

        manager.connect_ports(settings);

        Ok(manager)
    }

    /// Connect audio ports based on settings. Failures are logged, not fatal.
    fn connect_ports(&self, settings: &AudioSettings) {
        let client = self.active_client.as_client();
        let own = |port: &str| format!("{CLIENT_NAME}:{port}");

        let connections = [
            (settings.input_left_port.clone(), own(INPUT_LEFT)),
            (settings.input_right_port.clone(), own(INPUT_RIGHT)),
            (own(OUTPUT_LEFT), settings.output_left_port.clone()),
            (own(OUTPUT_RIGHT), settings.output_right_port.clone()),
        ];

        for (source, destination) in &connections {
            if let Err(e) = client.connect_ports_by_name(source, destination) {
                warn!("Failed to connect '{source}' -> '{destination}': {e}");
            } else {
                info!("Connected: {source} -> {destination}");
            }
        }
    }

    pub const fn params(&self) -> &Arc<Parameters> {
        &self.params
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    pub fn sample_rate(&self) -> usize {
        self.active_client.as_client().sample_rate() as usize
    }

    pub fn buffer_size(&self) -> usize {
        self.active_client.as_client().buffer_size() as usize
    }

    /// Stop processing, release the processor and finalize any recording.
    pub fn shutdown(self) -> Result<()> {
        let (_client, _notifications, handler) = self
            .active_client
            .deactivate()
            .context("failed to deactivate JACK client")?;

        let (mut processor, tap) = handler.into_parts();
        processor.teardown();
        drop(tap);

        if let Some(recorder) = self.recorder {
            recorder.stop()?;
        }

        info!("Audio stopped");
        Ok(())
    }
}
