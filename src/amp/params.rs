//! Live control values shared between the control surface and the audio thread.
//!
//! Every parameter is a single machine word held in an atomic, so the audio
//! thread can read it without locking while a control thread writes it. A
//! reader observes either the old or the new value of a field. The audio thread
//! takes one [`ParamSnapshot`] per block, so writes landing mid-block are
//! picked up by the next block.
//!
//! Writes are published under a sequence counter that is odd while a write is
//! in flight. [`Parameters::snapshot`] retries a bounded number of times when
//! it overlaps one, so a multi-field [`Parameters::restore`] lands as a unit.

use crate::amp::stages::common::map_linear;
use crate::amp::stages::waveshaper::AmpType;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::hint;
use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU64, Ordering, fence};

pub const GAIN_MIN: f32 = 1.0;
pub const GAIN_MAX: f32 = 100.0;
pub const TONE_MIN_HZ: f32 = 20.0;
pub const TONE_MAX_HZ: f32 = 20_000.0;
pub const VOLUME_MIN: f32 = 0.0;
pub const VOLUME_MAX: f32 = 1.0;

const MAPPED_GAIN_MIN: f32 = 0.1;
const MAPPED_GAIN_MAX: f32 = 10.0;

/// Reads attempted before a snapshot gives up on a write that stays in flight.
const SNAPSHOT_ATTEMPTS: usize = 4;

/// Map the 1-100 gain control onto a linear multiplier in 0.1-10.
///
/// The mapping is linear on purpose; the control is clamped first.
pub fn map_gain(gain: f32) -> f32 {
    map_linear(
        gain.clamp(GAIN_MIN, GAIN_MAX),
        GAIN_MIN,
        GAIN_MAX,
        MAPPED_GAIN_MIN,
        MAPPED_GAIN_MAX,
    )
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParamId {
    Gain,
    Tone,
    Volume,
    AmpType,
}

impl ParamId {
    pub const ALL: [Self; 4] = [Self::Gain, Self::Tone, Self::Volume, Self::AmpType];

    pub fn info(self) -> &'static ParamInfo {
        match self {
            Self::Gain => &GAIN_INFO,
            Self::Tone => &TONE_INFO,
            Self::Volume => &VOLUME_INFO,
            Self::AmpType => &AMP_TYPE_INFO,
        }
    }
}

impl FromStr for ParamId {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.info().id.eq_ignore_ascii_case(s.trim()))
            .ok_or("Unknown parameter name")
    }
}

/// Static description of a parameter, as presented to a control surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub step: f32,
    /// Value that sits at the middle of the normalized range, if the
    /// control is skewed.
    pub skew_midpoint: Option<f32>,
}

pub const GAIN_INFO: ParamInfo = ParamInfo {
    id: "gain",
    name: "Gain",
    min: GAIN_MIN,
    max: GAIN_MAX,
    default: 10.0,
    step: 0.1,
    skew_midpoint: None,
};

pub const TONE_INFO: ParamInfo = ParamInfo {
    id: "tone",
    name: "Tone",
    min: TONE_MIN_HZ,
    max: TONE_MAX_HZ,
    default: 1_000.0,
    step: 1.0,
    skew_midpoint: Some(1_000.0),
};

pub const VOLUME_INFO: ParamInfo = ParamInfo {
    id: "volume",
    name: "Volume",
    min: VOLUME_MIN,
    max: VOLUME_MAX,
    default: 0.5,
    step: 0.01,
    skew_midpoint: None,
};

pub const AMP_TYPE_INFO: ParamInfo = ParamInfo {
    id: "amp",
    name: "Amp Type",
    min: 0.0,
    max: (AmpType::COUNT - 1) as f32,
    default: 0.0,
    step: 1.0,
    skew_midpoint: None,
};

impl ParamInfo {
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    fn skew(&self) -> f32 {
        self.skew_midpoint.map_or(1.0, |mid| {
            0.5f32.ln() / ((mid - self.min) / (self.max - self.min)).ln()
        })
    }

    /// Position of `value` on a 0..1 control.
    pub fn to_normalized(&self, value: f32) -> f32 {
        let proportion = (self.clamp(value) - self.min) / (self.max - self.min);
        proportion.powf(self.skew())
    }

    /// Value at position `normalized` on a 0..1 control.
    pub fn from_normalized(&self, normalized: f32) -> f32 {
        let proportion = normalized.clamp(0.0, 1.0).powf(self.skew().recip());
        self.clamp(proportion.mul_add(self.max - self.min, self.min))
    }

    pub fn format_value(&self, value: f32) -> String {
        match self.id {
            "tone" => format!("{value:.0} Hz"),
            "volume" => format!("{value:.2}"),
            "amp" => AmpType::from_index(value.round() as i32).to_string(),
            _ => format!("{value:.1}"),
        }
    }
}

/// Plain copy of all four parameters, taken once per block.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamSnapshot {
    pub gain: f32,
    pub tone_hz: f32,
    pub volume: f32,
    pub amp_type: AmpType,
}

impl Default for ParamSnapshot {
    fn default() -> Self {
        Self {
            gain: GAIN_INFO.default,
            tone_hz: TONE_INFO.default,
            volume: VOLUME_INFO.default,
            amp_type: AmpType::default(),
        }
    }
}

impl ParamSnapshot {
    /// True when every field already lies within its declared range.
    pub fn is_in_range(&self) -> bool {
        (GAIN_MIN..=GAIN_MAX).contains(&self.gain)
            && (TONE_MIN_HZ..=TONE_MAX_HZ).contains(&self.tone_hz)
            && (VOLUME_MIN..=VOLUME_MAX).contains(&self.volume)
    }
}

impl std::fmt::Display for ParamSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} | {}: {} | {}: {} | {}: {}",
            GAIN_INFO.name,
            GAIN_INFO.format_value(self.gain),
            TONE_INFO.name,
            TONE_INFO.format_value(self.tone_hz),
            VOLUME_INFO.name,
            VOLUME_INFO.format_value(self.volume),
            AMP_TYPE_INFO.name,
            self.amp_type,
        )
    }
}

/// An `f32` stored as its bit pattern.
#[derive(Debug)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// The live parameter set. Share it as `Arc<Parameters>`.
#[derive(Debug)]
pub struct Parameters {
    gain: AtomicF32,
    tone_hz: AtomicF32,
    volume: AtomicF32,
    amp_type: AtomicI32,
    sequence: AtomicU64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self::from_snapshot(ParamSnapshot::default())
    }
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: ParamSnapshot) -> Self {
        let params = Self {
            gain: AtomicF32::new(GAIN_INFO.default),
            tone_hz: AtomicF32::new(TONE_INFO.default),
            volume: AtomicF32::new(VOLUME_INFO.default),
            amp_type: AtomicI32::new(AmpType::default().index()),
            sequence: AtomicU64::new(0),
        };
        params.restore(&snapshot);
        params
    }

    pub fn gain(&self) -> f32 {
        self.gain.load()
    }

    pub fn tone_hz(&self) -> f32 {
        self.tone_hz.load()
    }

    pub fn volume(&self) -> f32 {
        self.volume.load()
    }

    pub fn amp_type(&self) -> AmpType {
        AmpType::from_index(self.amp_type.load(Ordering::Relaxed))
    }

    pub fn set_gain(&self, gain: f32) {
        self.write(|| Self::store_clamped(&self.gain, &GAIN_INFO, gain));
    }

    pub fn set_tone_hz(&self, tone_hz: f32) {
        self.write(|| Self::store_clamped(&self.tone_hz, &TONE_INFO, tone_hz));
    }

    pub fn set_volume(&self, volume: f32) {
        self.write(|| Self::store_clamped(&self.volume, &VOLUME_INFO, volume));
    }

    pub fn set_amp_type(&self, amp_type: AmpType) {
        self.write(|| self.amp_type.store(amp_type.index(), Ordering::Relaxed));
    }

    /// Select by ordinal; unknown ordinals select `Clean`.
    pub fn set_amp_type_index(&self, index: i32) {
        self.set_amp_type(AmpType::from_index(index));
    }

    pub fn get(&self, id: ParamId) -> f32 {
        match id {
            ParamId::Gain => self.gain(),
            ParamId::Tone => self.tone_hz(),
            ParamId::Volume => self.volume(),
            ParamId::AmpType => self.amp_type().index() as f32,
        }
    }

    pub fn set(&self, id: ParamId, value: f32) {
        match id {
            ParamId::Gain => self.set_gain(value),
            ParamId::Tone => self.set_tone_hz(value),
            ParamId::Volume => self.set_volume(value),
            // Unknown ordinals fall back to Clean, same as `set_amp_type_index`.
            ParamId::AmpType => {
                if value.is_finite() {
                    self.set_amp_type_index(value.round() as i32);
                }
            }
        }
    }

    /// Read all four fields. Real-time safe: never blocks, and gives up
    /// retrying after [`SNAPSHOT_ATTEMPTS`] reads that overlap a write, in
    /// which case each field is still individually valid.
    #[inline]
    pub fn snapshot(&self) -> ParamSnapshot {
        let mut snapshot = self.read_fields();
        for _ in 0..SNAPSHOT_ATTEMPTS {
            let before = self.sequence.load(Ordering::Acquire);
            if before & 1 == 1 {
                hint::spin_loop();
                continue;
            }

            snapshot = self.read_fields();
            fence(Ordering::Acquire);
            if self.sequence.load(Ordering::Relaxed) == before {
                break;
            }
        }
        snapshot
    }

    /// Write all four fields, clamping each one. Published as one write.
    pub fn restore(&self, snapshot: &ParamSnapshot) {
        self.write(|| {
            Self::store_clamped(&self.gain, &GAIN_INFO, snapshot.gain);
            Self::store_clamped(&self.tone_hz, &TONE_INFO, snapshot.tone_hz);
            Self::store_clamped(&self.volume, &VOLUME_INFO, snapshot.volume);
            self.amp_type
                .store(snapshot.amp_type.index(), Ordering::Relaxed);
        });
    }

    /// Incremented on every write; a surface compares it to refresh its display.
    pub fn revision(&self) -> u64 {
        self.sequence.load(Ordering::Acquire) >> 1
    }

    #[inline]
    fn read_fields(&self) -> ParamSnapshot {
        ParamSnapshot {
            gain: self.gain(),
            tone_hz: self.tone_hz(),
            volume: self.volume(),
            amp_type: self.amp_type(),
        }
    }

    // Control threads only. Writers take turns by moving the sequence from
    // even to odd, and leave it even again one step further on.
    fn write(&self, store: impl FnOnce()) {
        let mut sequence = self.sequence.load(Ordering::Relaxed);
        loop {
            if sequence & 1 == 1 {
                hint::spin_loop();
                sequence = self.sequence.load(Ordering::Relaxed);
                continue;
            }
            match self.sequence.compare_exchange_weak(
                sequence,
                sequence + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => sequence = current,
            }
        }

        fence(Ordering::Release);
        store();
        self.sequence.store(sequence + 2, Ordering::Release);
    }

    // NaN is not a position on any control, so it is dropped.
    fn store_clamped(field: &AtomicF32, info: &ParamInfo, value: f32) {
        if !value.is_nan() {
            field.store(info.clamp(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn map_gain_endpoints_are_exact() {
        assert_eq!(map_gain(1.0), 0.1);
        assert_eq!(map_gain(100.0), 10.0);
        assert!((map_gain(10.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn map_gain_is_monotonic() {
        let mut prev = map_gain(GAIN_MIN);
        for i in 1..=990 {
            let gain = 0.1f32.mul_add(i as f32, GAIN_MIN);
            let mapped = map_gain(gain);
            assert!(mapped >= prev, "map_gain({gain}) = {mapped} < {prev}");
            prev = mapped;
        }
    }

    #[test]
    fn map_gain_clamps_before_mapping() {
        assert_eq!(map_gain(0.0), map_gain(1.0));
        assert_eq!(map_gain(101.0), map_gain(100.0));
    }

    #[test]
    fn defaults_match_descriptors() {
        let params = Parameters::new();
        let snapshot = params.snapshot();

        assert_eq!(snapshot.gain, 10.0);
        assert_eq!(snapshot.tone_hz, 1_000.0);
        assert_eq!(snapshot.volume, 0.5);
        assert_eq!(snapshot.amp_type, AmpType::Clean);
        assert_eq!(snapshot, ParamSnapshot::default());
    }

    #[test]
    fn out_of_range_writes_clamp() {
        let params = Parameters::new();

        params.set_gain(0.0);
        assert_eq!(params.gain(), 1.0);
        params.set_gain(101.0);
        assert_eq!(params.gain(), 100.0);

        params.set_tone_hz(5.0);
        assert_eq!(params.tone_hz(), 20.0);
        params.set_tone_hz(48_000.0);
        assert_eq!(params.tone_hz(), 20_000.0);

        params.set_volume(-0.5);
        assert_eq!(params.volume(), 0.0);
        params.set_volume(2.0);
        assert_eq!(params.volume(), 1.0);

        params.set_amp_type_index(9);
        assert_eq!(params.amp_type(), AmpType::Clean);
    }

    #[test]
    fn nan_writes_are_ignored() {
        let params = Parameters::new();
        params.set_gain(f32::NAN);
        params.set_tone_hz(f32::NAN);
        params.set_volume(f32::NAN);
        params.set(ParamId::AmpType, f32::NAN);

        assert_eq!(params.snapshot(), ParamSnapshot::default());
    }

    #[test]
    fn generic_access_by_id() {
        let params = Parameters::new();
        params.set(ParamId::AmpType, 2.0);
        params.set(ParamId::Tone, 3_000.0);

        assert_eq!(params.amp_type(), AmpType::Lead);
        assert_eq!(params.get(ParamId::AmpType), 2.0);
        assert_eq!(params.get(ParamId::Tone), 3_000.0);
        assert_eq!("Volume".parse::<ParamId>(), Ok(ParamId::Volume));
        assert!("drive".parse::<ParamId>().is_err());
    }

    #[test]
    fn unknown_amp_ordinal_selects_clean_by_id() {
        let params = Parameters::new();

        params.set(ParamId::AmpType, 3.0);
        assert_eq!(params.amp_type(), AmpType::Metal);
        params.set(ParamId::AmpType, 9.0);
        assert_eq!(params.amp_type(), AmpType::Clean);

        params.set(ParamId::AmpType, 1.0);
        params.set(ParamId::AmpType, -1.0);
        assert_eq!(params.amp_type(), AmpType::Clean);

        params.set_amp_type_index(9);
        assert_eq!(params.amp_type(), AmpType::Clean);
    }

    #[test]
    fn revision_tracks_writes() {
        let params = Parameters::new();
        let start = params.revision();

        params.set_volume(0.2);
        params.restore(&ParamSnapshot::default());

        assert_eq!(params.revision(), start + 2);
    }

    #[test]
    fn skewed_tone_control_centres_on_midpoint() {
        assert!((TONE_INFO.to_normalized(1_000.0) - 0.5).abs() < 1e-4);
        assert!((TONE_INFO.from_normalized(0.5) - 1_000.0).abs() < 0.5);
        assert_eq!(TONE_INFO.from_normalized(0.0), 20.0);
        assert!((TONE_INFO.from_normalized(1.0) - 20_000.0).abs() < 0.01);

        assert!((VOLUME_INFO.to_normalized(0.25) - 0.25).abs() < 1e-6);
        assert!((GAIN_INFO.from_normalized(1.0) - 100.0).abs() < 1e-4);
    }

    #[test]
    fn formats_values_for_display() {
        assert_eq!(TONE_INFO.format_value(1_000.0), "1000 Hz");
        assert_eq!(GAIN_INFO.format_value(10.0), "10.0");
        assert_eq!(VOLUME_INFO.format_value(0.5), "0.50");
        assert_eq!(AMP_TYPE_INFO.format_value(3.0), "Metal");
    }

    #[test]
    fn concurrent_writes_never_leave_range() {
        let params = Arc::new(Parameters::new());
        let writer = {
            let params = Arc::clone(&params);
            thread::spawn(move || {
                for i in 0..10_000 {
                    params.set_gain((i % 120) as f32);
                    params.set_volume((i % 3) as f32 * 0.75);
                }
            })
        };

        for _ in 0..10_000 {
            let snapshot = params.snapshot();
            assert!(snapshot.is_in_range(), "torn or unclamped read: {snapshot:?}");
        }

        writer.join().unwrap();
    }

    #[test]
    fn restores_are_never_observed_half_applied() {
        let quiet = ParamSnapshot {
            gain: 2.0,
            tone_hz: 500.0,
            volume: 0.1,
            amp_type: AmpType::Clean,
        };
        let loud = ParamSnapshot {
            gain: 90.0,
            tone_hz: 8_000.0,
            volume: 0.9,
            amp_type: AmpType::Metal,
        };

        let params = Arc::new(Parameters::from_snapshot(quiet));
        let writer = {
            let params = Arc::clone(&params);
            thread::spawn(move || {
                for i in 0..2_000 {
                    params.restore(if i % 2 == 0 { &loud } else { &quiet });
                    thread::sleep(Duration::from_micros(20));
                }
            })
        };

        while !writer.is_finished() {
            let snapshot = params.snapshot();
            assert!(
                snapshot == quiet || snapshot == loud,
                "mixed snapshot: {snapshot:?}"
            );
        }
        writer.join().unwrap();

        assert_eq!(params.snapshot(), quiet);
    }

    #[test]
    fn concurrent_writers_all_land() {
        let params = Arc::new(Parameters::new());
        let start = params.revision();

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let params = Arc::clone(&params);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        params.set_volume(0.3);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        assert_eq!(params.revision(), start + 4_000);
        assert_eq!(params.volume(), 0.3);
    }
}
