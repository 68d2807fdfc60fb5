//! Fixed-size binary encoding of the parameter set, used by hosts to persist
//! the processor state.
//!
//! Layout, little-endian: `f32 gain`, `f32 tone_hz`, `f32 volume`,
//! `i32 amp_type`, 16 bytes in total. Trailing bytes are ignored on decode.

use crate::amp::params::ParamSnapshot;
use crate::amp::stages::waveshaper::AmpType;

pub const STATE_LEN: usize = 16;

pub fn encode(params: &ParamSnapshot) -> [u8; STATE_LEN] {
    let mut out = [0u8; STATE_LEN];
    out[0..4].copy_from_slice(&params.gain.to_le_bytes());
    out[4..8].copy_from_slice(&params.tone_hz.to_le_bytes());
    out[8..12].copy_from_slice(&params.volume.to_le_bytes());
    out[12..16].copy_from_slice(&params.amp_type.index().to_le_bytes());
    out
}

/// Decode a state block. Returns `None` if the payload is too short or any
/// field is outside its declared range.
pub fn decode(bytes: &[u8]) -> Option<ParamSnapshot> {
    let block: &[u8; STATE_LEN] = bytes.get(..STATE_LEN)?.try_into().ok()?;
    let word = |offset: usize| {
        [
            block[offset],
            block[offset + 1],
            block[offset + 2],
            block[offset + 3],
        ]
    };

    let amp_index = i32::from_le_bytes(word(12));
    if !(0..AmpType::COUNT as i32).contains(&amp_index) {
        return None;
    }

    let params = ParamSnapshot {
        gain: f32::from_le_bytes(word(0)),
        tone_hz: f32::from_le_bytes(word(4)),
        volume: f32::from_le_bytes(word(8)),
        amp_type: AmpType::from_index(amp_index),
    };

    params.is_in_range().then_some(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_little_endian_in_field_order() {
        let params = ParamSnapshot {
            gain: 1.0,
            tone_hz: 20.0,
            volume: 0.0,
            amp_type: AmpType::Metal,
        };
        let bytes = encode(&params);

        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[4..8], &20.0f32.to_le_bytes());
        assert_eq!(&bytes[8..12], &[0, 0, 0, 0]);
        assert_eq!(&bytes[12..16], &[3, 0, 0, 0]);
    }

    #[test]
    fn boundary_values_round_trip() {
        for amp_type in AmpType::ALL {
            for (gain, tone_hz, volume) in [(1.0, 20.0, 0.0), (100.0, 20_000.0, 1.0), (37.3, 1234.5, 0.61)] {
                let params = ParamSnapshot {
                    gain,
                    tone_hz,
                    volume,
                    amp_type,
                };
                assert_eq!(decode(&encode(&params)), Some(params));
            }
        }
    }

    #[test]
    fn short_payloads_are_rejected() {
        let bytes = encode(&ParamSnapshot::default());
        for len in 0..STATE_LEN {
            assert_eq!(decode(&bytes[..len]), None);
        }
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut bytes = encode(&ParamSnapshot::default()).to_vec();
        bytes.extend_from_slice(&[0xff; 8]);

        assert_eq!(decode(&bytes), Some(ParamSnapshot::default()));
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        let mut bytes = encode(&ParamSnapshot::default());
        bytes[0..4].copy_from_slice(&250.0f32.to_le_bytes());
        assert_eq!(decode(&bytes), None);

        let mut bytes = encode(&ParamSnapshot::default());
        bytes[8..12].copy_from_slice(&f32::NAN.to_le_bytes());
        assert_eq!(decode(&bytes), None);

        let mut bytes = encode(&ParamSnapshot::default());
        bytes[12..16].copy_from_slice(&7i32.to_le_bytes());
        assert_eq!(decode(&bytes), None);
    }
}
