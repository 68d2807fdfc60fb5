use std::f32::consts::PI;

/// Linearly re-map `value` from `[in_min, in_max]` onto `[out_min, out_max]`.
///
/// Computed in `f64` so that both endpoints land exactly on the output bounds
/// once narrowed back to `f32`.
#[inline]
pub fn map_linear(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    let t = (f64::from(value) - f64::from(in_min)) / (f64::from(in_max) - f64::from(in_min));
    t.mul_add(
        f64::from(out_max) - f64::from(out_min),
        f64::from(out_min),
    ) as f32
}

/// Smoothing coefficient of a first-order RC low-pass.
///
/// `alpha = dt / (rc + dt)` with `rc = 1 / (2π·fc)` and `dt = 1 / fs`.
#[inline]
pub fn lowpass_alpha(cutoff_hz: f32, sample_rate: f32) -> f32 {
    let rc = 1.0 / (2.0 * PI * cutoff_hz);
    let dt = 1.0 / sample_rate;
    dt / (rc + dt)
}

/// Flush values too small to hear to zero so recursive state never goes subnormal.
#[inline]
pub fn zap_denormal(x: f32) -> f32 {
    if x.abs() < 1.0e-20 { 0.0 } else { x }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_linear_hits_both_endpoints() {
        assert_eq!(map_linear(1.0, 1.0, 100.0, 0.1, 10.0), 0.1);
        assert_eq!(map_linear(100.0, 1.0, 100.0, 0.1, 10.0), 10.0);
        assert!((map_linear(50.5, 1.0, 100.0, 0.0, 1.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn lowpass_alpha_grows_with_cutoff() {
        let sr = 48_000.0;
        let low = lowpass_alpha(100.0, sr);
        let high = lowpass_alpha(10_000.0, sr);

        assert!(low > 0.0 && low < high && high < 1.0);
    }

    #[test]
    fn zap_denormal_flushes_tiny_values_only() {
        assert_eq!(zap_denormal(f32::MIN_POSITIVE / 4.0), 0.0);
        assert_eq!(zap_denormal(-1.0e-25), 0.0);
        assert_eq!(zap_denormal(1.0e-6), 1.0e-6);
        assert_eq!(zap_denormal(-0.5), -0.5);
    }
}
