use anyhow::{Context, Result};
use assert_no_alloc::assert_no_alloc;
use jack::{Client, Control, Frames, ProcessScope};
use log::{debug, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::audio::ports::Ports;
use crate::audio::recorder::RecorderTap;
use crate::processor::{Processor, StreamFormat};

/// Hands sample-rate changes to the process side; zero means none pending.
pub struct NotificationHandler {
    pending_rate: Arc<AtomicUsize>,
}

pub struct ProcessHandler {
    ports: Ports,
    processor: Processor,
    recorder: Option<RecorderTap>,
    pending_rate: Arc<AtomicUsize>,
}

impl jack::NotificationHandler for NotificationHandler {
    fn sample_rate(&mut self, _: &Client, sample_rate: Frames) -> Control {
        debug!(">> JACK sample_rate changed to {sample_rate}");
        self.pending_rate
            .store(sample_rate as usize, Ordering::Release);

        Control::Continue
    }
}

impl ProcessHandler {
    pub fn new(
        client: &Client,
        mut processor: Processor,
        recorder: Option<RecorderTap>,
    ) -> Result<Self> {
        let ports = Ports::new(client).context("failed to create audio ports")?;
        processor.setup(stream_format(client, client.buffer_size()));

        Ok(Self {
            ports,
            processor,
            recorder,
            pending_rate: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Notification handler that forwards sample-rate changes to this handler.
    pub fn notifications(&self) -> NotificationHandler {
        NotificationHandler {
            pending_rate: Arc::clone(&self.pending_rate),
        }
    }

    /// Take the processor and recorder tap back once the client is deactivated.
    pub fn into_parts(self) -> (Processor, Option<RecorderTap>) {
        (self.processor, self.recorder)
    }
}

impl jack::ProcessHandler for ProcessHandler {
    fn process(&mut self, _client: &Client, ps: &ProcessScope) -> Control {
        assert_no_alloc(|| {
            let rate = self.pending_rate.swap(0, Ordering::Acquire);
            if rate != 0 {
                self.processor.set_sample_rate(rate as f32);
            }

            let mut channels = self.ports.stage_outputs(ps);
            self.processor.process_block(&mut channels);

            if let Some(tap) = self.recorder.as_mut() {
                let [left, right] = &channels;
                tap.push(left, right);
            }
        });

        Control::Continue
    }

    fn buffer_size(&mut self, client: &Client, frames: Frames) -> Control {
        info!(">> JACK buffer_size changed to {frames} frames");
        self.processor.setup(stream_format(client, frames));

        Control::Continue
    }
}

fn stream_format(client: &Client, frames: Frames) -> StreamFormat {
    StreamFormat {
        sample_rate: client.sample_rate() as f32,
        max_block_size: frames as usize,
        channels: 2,
    }
}
