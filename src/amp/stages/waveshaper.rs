use crate::amp::stages::Stage;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A stateless waveshaping curve.
pub type Curve = fn(f32) -> f32;

const CLEAN_LIMIT: f32 = 0.8;
const METAL_THRESHOLD: f32 = 0.3;

#[derive(ValueEnum, Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[repr(i32)]
pub enum AmpType {
    #[default]
    Clean = 0, // Hard limit, no coloration below the ceiling
    Crunch = 1, // Moderate tanh saturation
    Lead = 2,   // Stronger tanh saturation
    Metal = 3,  // Clean below the knee, saturated peaks
}

/// Curves indexed by `AmpType` ordinal.
const CURVES: [Curve; AmpType::COUNT] = [clean, crunch, lead, metal];

impl AmpType {
    pub const COUNT: usize = 4;
    pub const ALL: [Self; Self::COUNT] = [Self::Clean, Self::Crunch, Self::Lead, Self::Metal];

    /// Unknown ordinals fall back to `Clean`.
    pub const fn from_index(index: i32) -> Self {
        match index {
            1 => Self::Crunch,
            2 => Self::Lead,
            3 => Self::Metal,
            _ => Self::Clean,
        }
    }

    pub const fn index(self) -> i32 {
        self as i32
    }

    pub const fn curve(self) -> Curve {
        CURVES[self as usize]
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Clean => "Clean",
            Self::Crunch => "Crunch",
            Self::Lead => "Lead",
            Self::Metal => "Metal",
        }
    }
}

impl std::fmt::Display for AmpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for AmpType {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "clean" => Ok(Self::Clean),
            "1" | "crunch" => Ok(Self::Crunch),
            "2" | "lead" => Ok(Self::Lead),
            "3" | "metal" => Ok(Self::Metal),
            _ => Err("Amp type must be clean, crunch, lead or metal"),
        }
    }
}

pub fn clean(x: f32) -> f32 {
    x.clamp(-CLEAN_LIMIT, CLEAN_LIMIT)
}

pub fn crunch(x: f32) -> f32 {
    (x * 2.0).tanh()
}

pub fn lead(x: f32) -> f32 {
    (x * 4.0).tanh()
}

pub fn metal(x: f32) -> f32 {
    const T: f32 = METAL_THRESHOLD;
    const SPAN: f32 = 1.0 - METAL_THRESHOLD;

    if x > T {
        SPAN.mul_add(((x - T) / SPAN).tanh(), T)
    } else if x < -T {
        SPAN.mul_add(((x + T) / SPAN).tanh(), -T)
    } else {
        x
    }
}

/// Applies the curve of the selected amp type to every sample.
#[derive(Debug, Clone)]
pub struct WaveshaperStage {
    amp_type: AmpType,
    curve: Curve,
}

impl WaveshaperStage {
    pub const fn new(amp_type: AmpType) -> Self {
        Self {
            amp_type,
            curve: amp_type.curve(),
        }
    }

    pub const fn set_amp_type(&mut self, amp_type: AmpType) {
        self.amp_type = amp_type;
        self.curve = amp_type.curve();
    }

    pub const fn amp_type(&self) -> AmpType {
        self.amp_type
    }
}

// The curve is derived from the amp type, so comparing the type is enough.
impl PartialEq for WaveshaperStage {
    fn eq(&self, other: &Self) -> bool {
        self.amp_type == other.amp_type
    }
}

impl Stage for WaveshaperStage {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        (self.curve)(input)
    }
}
