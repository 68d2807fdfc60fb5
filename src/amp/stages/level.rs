use crate::amp::stages::Stage;

/// Linear gain stage, used at both ends of the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelStage {
    gain: f32,
}

impl LevelStage {
    pub const fn new(gain: f32) -> Self {
        Self { gain }
    }

    pub const fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    pub const fn gain(&self) -> f32 {
        self.gain
    }
}

impl Stage for LevelStage {
    fn process(&mut self, input: f32) -> f32 {
        input * self.gain
    }
}
