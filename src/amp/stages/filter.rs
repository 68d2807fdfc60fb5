use crate::amp::stages::Stage;
use crate::amp::stages::common::{lowpass_alpha, zap_denormal};

/// First-order low-pass used as the tone control.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStage {
    cutoff: f32,
    alpha: f32,
    prev_output: f32,
    sample_rate: f32,
}

impl FilterStage {
    /// Minimum cutoff frequency to avoid division-by-zero in the RC calculation.
    const MIN_CUTOFF_HZ: f32 = 0.1;

    fn compute_alpha(cutoff: f32, sample_rate: f32) -> f32 {
        lowpass_alpha(cutoff.max(Self::MIN_CUTOFF_HZ), sample_rate)
    }

    pub fn new(cutoff: f32, sample_rate: f32) -> Self {
        Self {
            cutoff,
            alpha: Self::compute_alpha(cutoff, sample_rate),
            prev_output: 0.0,
            sample_rate,
        }
    }

    /// Coefficients are only recomputed when the cutoff actually moved.
    pub fn set_cutoff(&mut self, cutoff: f32) {
        if cutoff != self.cutoff {
            self.cutoff = cutoff;
            self.update_coefficients();
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate != self.sample_rate {
            self.sample_rate = sample_rate;
            self.update_coefficients();
        }
    }

    pub const fn cutoff(&self) -> f32 {
        self.cutoff
    }

    pub const fn alpha(&self) -> f32 {
        self.alpha
    }

    fn update_coefficients(&mut self) {
        self.alpha = Self::compute_alpha(self.cutoff, self.sample_rate);
    }
}

impl Stage for FilterStage {
    fn process(&mut self, input: f32) -> f32 {
        let output = self
            .alpha
            .mul_add(input - self.prev_output, self.prev_output);
        self.prev_output = zap_denormal(output);
        self.prev_output
    }

    fn reset(&mut self) {
        self.prev_output = 0.0;
    }
}
