/// Quietest level the meter shows, in dBFS
const FLOOR_DB: f32 = -60.0;

/// Map a linear amplitude to a display level in [0, 1].
///
/// The scale is logarithmic: -60 dBFS and below is 0, full scale is 1.
pub fn normalize(amplitude: f32) -> f32 {
    if !amplitude.is_finite() || amplitude <= 0.0 {
        return 0.0;
    }
    let db = 20.0 * amplitude.min(1.0).log10();
    if db <= FLOOR_DB {
        0.0
    } else {
        (1.0 - db / FLOOR_DB).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(normalize(0.0), 0.0);
        assert_eq!(normalize(-1.0), 0.0);
        assert_eq!(normalize(f32::NAN), 0.0);
        assert_eq!(normalize(0.0001), 0.0); // -80 dBFS

        // -6 dBFS is a tenth of the way down the 60 dB range
        assert!((normalize(0.5) - 0.9).abs() < 0.01);
        // -20 dBFS
        assert!((normalize(0.1) - 0.667).abs() < 0.01);

        assert_eq!(normalize(1.0), 1.0);
        assert_eq!(normalize(4.0), 1.0);
    }
}
