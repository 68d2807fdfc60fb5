//! Host-facing processor: lifecycle, per-block processing and state
//! persistence around the amplifier chain.

use crate::amp::chain::AmplifierChain;
use crate::amp::params::{ParamSnapshot, Parameters};
use crate::preset::state::{self, STATE_LEN};
use log::{debug, warn};
use std::sync::Arc;

/// Static description of the processor, as reported to a host.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginInfo {
    pub name: &'static str,
    pub input_channels: usize,
    pub output_channels: usize,
    pub accepts_midi: bool,
    pub produces_midi: bool,
    pub is_midi_effect: bool,
    pub tail_length_seconds: f64,
    pub num_programs: usize,
}

pub const PLUGIN_INFO: PluginInfo = PluginInfo {
    name: "Crunchbox",
    input_channels: 2,
    output_channels: 2,
    accepts_midi: false,
    produces_midi: false,
    is_midi_effect: false,
    tail_length_seconds: 0.0,
    num_programs: 1,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamFormat {
    pub sample_rate: f32,
    pub max_block_size: usize,
    pub channels: usize,
}

impl std::fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} Hz, {} frames, {} channel(s)",
            self.sample_rate, self.max_block_size, self.channels
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ProcessorState {
    #[default]
    Uninitialized,
    Ready(StreamFormat),
}

pub struct Processor {
    params: Arc<Parameters>,
    chain: AmplifierChain,
    state: ProcessorState,
}

impl Default for Processor {
    fn default() -> Self {
        Self::new(Arc::new(Parameters::new()))
    }
}

impl Processor {
    pub fn new(params: Arc<Parameters>) -> Self {
        Self {
            params,
            chain: AmplifierChain::default(),
            state: ProcessorState::Uninitialized,
        }
    }

    /// Shared handle to the live parameters, for control surfaces.
    pub fn params(&self) -> Arc<Parameters> {
        Arc::clone(&self.params)
    }

    pub const fn state(&self) -> ProcessorState {
        self.state
    }

    pub const fn is_ready(&self) -> bool {
        matches!(self.state, ProcessorState::Ready(_))
    }

    pub const fn chain(&self) -> &AmplifierChain {
        &self.chain
    }

    /// Prepare every stage for a stream format. Valid from either state;
    /// filter memory always starts from zero.
    pub fn setup(&mut self, format: StreamFormat) {
        debug!("Processor setup: {format}");
        self.chain
            .prepare(format.channels, format.sample_rate, &self.params.snapshot());
        self.state = ProcessorState::Ready(format);
    }

    /// Re-prepare every stage for a new sample rate, keeping the declared
    /// block size and channel count. Does nothing before setup. Real-time
    /// safe: the channel count is unchanged, so no stage storage is allocated.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        let ProcessorState::Ready(format) = self.state else {
            return;
        };
        let format = StreamFormat {
            sample_rate,
            ..format
        };
        self.chain
            .prepare(format.channels, sample_rate, &self.params.snapshot());
        self.state = ProcessorState::Ready(format);
    }

    pub fn teardown(&mut self) {
        debug!("Processor teardown");
        self.state = ProcessorState::Uninitialized;
    }

    #[inline]
    fn begin_block(&mut self) -> Option<StreamFormat> {
        let ProcessorState::Ready(format) = self.state else {
            debug_assert!(false, "process called before setup");
            return None;
        };
        self.chain.configure(&self.params.snapshot());
        Some(format)
    }

    /// Process planar audio in place. Never blocks or allocates.
    pub fn process_block(&mut self, channels: &mut [&mut [f32]]) {
        let Some(format) = self.begin_block() else {
            return;
        };

        debug_assert!(
            channels.len() <= format.channels,
            "block has more channels than declared at setup"
        );
        debug_assert!(
            channels.iter().all(|c| c.len() <= format.max_block_size),
            "block is longer than declared at setup"
        );

        self.chain.process_frames(channels, format.max_block_size);
    }

    /// Process interleaved audio in place. Never blocks or allocates.
    pub fn process_interleaved(&mut self, buffer: &mut [f32]) {
        let Some(format) = self.begin_block() else {
            return;
        };

        let limit = format.max_block_size * format.channels;
        debug_assert!(buffer.len() <= limit, "block is longer than declared at setup");

        let len = buffer.len().min(limit);
        self.chain.process_interleaved(&mut buffer[..len]);
    }

    pub fn serialize_state(&self) -> [u8; STATE_LEN] {
        state::encode(&self.params.snapshot())
    }

    /// Restore all parameters from a state block. Malformed or out-of-range
    /// input leaves the current state as it was.
    pub fn deserialize_state(&self, bytes: &[u8]) {
        match state::decode(bytes) {
            Some(snapshot) => {
                debug!("Restoring state: {snapshot}");
                self.params.restore(&snapshot);
            }
            None => warn!(
                "Ignoring invalid state block ({} bytes, expected {STATE_LEN})",
                bytes.len()
            ),
        }
    }

    pub fn snapshot(&self) -> ParamSnapshot {
        self.params.snapshot()
    }

    pub fn info(&self) -> &'static PluginInfo {
        &PLUGIN_INFO
    }

    pub const fn num_programs(&self) -> usize {
        PLUGIN_INFO.num_programs
    }

    pub const fn current_program(&self) -> usize {
        0
    }

    pub fn set_current_program(&mut self, index: usize) {
        debug!("Ignoring program change to {index}, only one program exists");
    }

    pub const fn program_name(&self, _index: usize) -> &'static str {
        ""
    }

    pub fn change_program_name(&mut self, index: usize, name: &str) {
        debug!("Ignoring rename of program {index} to '{name}'");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amp::stages::waveshaper::AmpType;

    const FORMAT: StreamFormat = StreamFormat {
        sample_rate: 48_000.0,
        max_block_size: 128,
        channels: 2,
    };

    #[test]
    fn lifecycle_transitions() {
        let mut processor = Processor::default();
        assert_eq!(processor.state(), ProcessorState::Uninitialized);

        processor.setup(FORMAT);
        assert_eq!(processor.state(), ProcessorState::Ready(FORMAT));

        let mut left = vec![0.1f32; 128];
        let mut right = vec![0.1f32; 128];
        processor.process_block(&mut [left.as_mut_slice(), right.as_mut_slice()]);
        assert!(processor.is_ready());

        let wider = StreamFormat {
            sample_rate: 96_000.0,
            ..FORMAT
        };
        processor.setup(wider);
        assert_eq!(processor.state(), ProcessorState::Ready(wider));
        assert_eq!(processor.chain().sample_rate(), 96_000.0);

        processor.teardown();
        assert_eq!(processor.state(), ProcessorState::Uninitialized);

        processor.setup(FORMAT);
        assert!(processor.is_ready());
    }

    #[test]
    fn setup_is_idempotent() {
        let mut once = Processor::default();
        once.setup(FORMAT);

        let mut twice = Processor::default();
        twice.setup(FORMAT);
        twice.setup(FORMAT);

        assert_eq!(once.chain(), twice.chain());
    }

    #[test]
    fn sample_rate_change_matches_fresh_setup() {
        let mut processor = Processor::default();
        processor.set_sample_rate(96_000.0);
        assert_eq!(processor.state(), ProcessorState::Uninitialized);

        processor.setup(FORMAT);
        let mut left = vec![0.7f32; 128];
        let mut right = vec![0.7f32; 128];
        processor.process_block(&mut [left.as_mut_slice(), right.as_mut_slice()]);

        processor.set_sample_rate(96_000.0);

        let mut fresh = Processor::default();
        let moved = StreamFormat {
            sample_rate: 96_000.0,
            ..FORMAT
        };
        fresh.setup(moved);
        assert_eq!(processor.state(), ProcessorState::Ready(moved));
        assert_eq!(processor.chain(), fresh.chain());
    }

    #[test]
    fn setup_resets_filter_memory() {
        let mut processor = Processor::default();
        processor.setup(FORMAT);
        let fresh = processor.chain().clone();

        let mut left = vec![0.7f32; 128];
        let mut right = vec![0.7f32; 128];
        processor.process_block(&mut [left.as_mut_slice(), right.as_mut_slice()]);
        assert_ne!(processor.chain(), &fresh);

        processor.setup(FORMAT);
        assert_eq!(processor.chain(), &fresh);
    }

    #[test]
    fn parameters_apply_at_next_block() {
        let mut processor = Processor::default();
        processor.setup(FORMAT);
        let params = processor.params();

        params.set_volume(0.0);

        let mut left = vec![0.5f32; 64];
        processor.process_block(&mut [left.as_mut_slice()]);
        assert!(left.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn state_round_trips_through_processor() {
        let source = Processor::default();
        let params = source.params();
        params.set_gain(100.0);
        params.set_tone_hz(20.0);
        params.set_volume(1.0);
        params.set_amp_type(AmpType::Lead);

        let target = Processor::default();
        target.deserialize_state(&source.serialize_state());

        assert_eq!(target.snapshot(), source.snapshot());
    }

    #[test]
    fn short_state_leaves_parameters_unchanged() {
        let processor = Processor::default();
        processor.params().set_amp_type(AmpType::Metal);
        let before = processor.serialize_state();

        processor.deserialize_state(&[1, 2, 3]);
        processor.deserialize_state(&before[..12]);

        assert_eq!(processor.serialize_state(), before);
    }

    #[test]
    fn static_metadata() {
        let mut processor = Processor::default();
        let info = processor.info();

        assert_eq!(info.input_channels, 2);
        assert_eq!(info.output_channels, 2);
        assert!(!info.accepts_midi && !info.produces_midi && !info.is_midi_effect);
        assert_eq!(info.tail_length_seconds, 0.0);
        assert_eq!(processor.num_programs(), 1);

        processor.set_current_program(3);
        processor.change_program_name(0, "Lead Tone");
        assert_eq!(processor.current_program(), 0);
        assert_eq!(processor.program_name(0), "");
    }
}
