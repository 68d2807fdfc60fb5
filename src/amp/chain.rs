use crate::amp::params::{ParamSnapshot, map_gain};
use crate::amp::stages::Stage;
use crate::amp::stages::filter::FilterStage;
use crate::amp::stages::level::LevelStage;
use crate::amp::stages::waveshaper::WaveshaperStage;

// One channel's worth of stages. Field order is processing order.
#[derive(Debug, Clone, PartialEq)]
struct ChannelStrip {
    input_gain: LevelStage,
    waveshaper: WaveshaperStage,
    tone: FilterStage,
    output_gain: LevelStage,
}

impl ChannelStrip {
    fn new(params: &ParamSnapshot, sample_rate: f32) -> Self {
        Self {
            input_gain: LevelStage::new(map_gain(params.gain)),
            waveshaper: WaveshaperStage::new(params.amp_type),
            tone: FilterStage::new(params.tone_hz, sample_rate),
            output_gain: LevelStage::new(params.volume),
        }
    }

    #[inline]
    fn configure(&mut self, input_gain: f32, params: &ParamSnapshot) {
        self.input_gain.set_gain(input_gain);
        self.waveshaper.set_amp_type(params.amp_type);
        self.tone.set_cutoff(params.tone_hz);
        self.output_gain.set_gain(params.volume);
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let signal = self.input_gain.process(input);
        let signal = self.waveshaper.process(signal);
        let signal = self.tone.process(signal);
        self.output_gain.process(signal)
    }

    fn process_block(&mut self, block: &mut [f32]) {
        self.input_gain.process_block(block);
        self.waveshaper.process_block(block);
        self.tone.process_block(block);
        self.output_gain.process_block(block);
    }
}

/// AmplifierChain runs input gain, waveshaper, tone filter and output gain,
/// in that order, over every channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AmplifierChain {
    strips: Vec<ChannelStrip>,
    sample_rate: f32,
}

impl AmplifierChain {
    pub fn new(channels: usize, sample_rate: f32, params: &ParamSnapshot) -> Self {
        let mut chain = Self::default();
        chain.prepare(channels, sample_rate, params);
        chain
    }

    /// (Re)build per-channel state for a stream format. Filter memory starts
    /// at zero. Allocates, so call it outside the audio callback.
    pub fn prepare(&mut self, channels: usize, sample_rate: f32, params: &ParamSnapshot) {
        self.sample_rate = sample_rate;
        self.strips.clear();
        self.strips
            .resize_with(channels, || ChannelStrip::new(params, sample_rate));
    }

    /// Apply a parameter snapshot to every stage. Real-time safe.
    pub fn configure(&mut self, params: &ParamSnapshot) {
        let input_gain = map_gain(params.gain);
        for strip in &mut self.strips {
            strip.configure(input_gain, params);
        }
    }

    pub fn reset(&mut self) {
        for strip in &mut self.strips {
            strip.input_gain.reset();
            strip.waveshaper.reset();
            strip.tone.reset();
            strip.output_gain.reset();
        }
    }

    pub fn channels(&self) -> usize {
        self.strips.len()
    }

    pub const fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    // process runs a single sample of one channel through the chain.
    pub fn process(&mut self, channel: usize, input: f32) -> f32 {
        self.strips
            .get_mut(channel)
            .map_or(input, |strip| strip.process(input))
    }

    /// Process planar audio in place, one slice per channel. Channels beyond
    /// the prepared count are left untouched.
    pub fn process_block(&mut self, channels: &mut [&mut [f32]]) {
        self.process_frames(channels, usize::MAX);
    }

    /// Like `process_block`, but only the first `frames` samples of each
    /// channel are touched.
    pub fn process_frames(&mut self, channels: &mut [&mut [f32]], frames: usize) {
        for (strip, block) in self.strips.iter_mut().zip(channels.iter_mut()) {
            let len = block.len().min(frames);
            strip.process_block(&mut block[..len]);
        }
    }

    /// Process interleaved audio in place.
    pub fn process_interleaved(&mut self, buffer: &mut [f32]) {
        let channels = self.strips.len();
        if channels == 0 {
            return;
        }

        for frame in buffer.chunks_mut(channels) {
            for (strip, sample) in self.strips.iter_mut().zip(frame.iter_mut()) {
                *sample = strip.process(*sample);
            }
        }
    }
}
