//! Linear volume <-> mixer control value conversion
//!
//! Callers work with linear volume in `[0.0, 1.0]`. Mixer backends take a
//! logarithmic control value (dB). Anything at or below
//! [`SILENCE_LINEAR_FLOOR`] maps to [`CONTROL_SILENCE`], which keeps
//! `log10(0)` out of the picture.

/// Smallest linear volume still treated as audible (-80 dB)
pub const SILENCE_LINEAR_FLOOR: f32 = 0.0001;

/// Control value representing silence
pub const CONTROL_SILENCE: f32 = -80.0;

/// Largest linear volume (0 dB)
pub const MAX_LINEAR_VOLUME: f32 = 1.0;

/// Convert linear volume to a mixer control value (dB)
///
/// Monotonic; continuous except at the silence floor.
pub fn to_control(volume: f32) -> f32 {
    if volume <= SILENCE_LINEAR_FLOOR {
        CONTROL_SILENCE
    } else {
        20.0 * volume.log10()
    }
}

/// Convert a mixer control value (dB) back to linear volume
pub fn from_control(control: f32) -> f32 {
    if control <= CONTROL_SILENCE {
        0.0
    } else {
        10.0_f32.powf(control / 20.0)
    }
}

/// Clamp a linear volume into `[0.0, 1.0]`
///
/// NaN is treated as silence.
pub fn clamp_linear(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, MAX_LINEAR_VOLUME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_above_floor() {
        let mut v = 0.0002_f32;
        while v <= 1.0 {
            let back = from_control(to_control(v));
            assert!(
                (back - v).abs() <= v * 1e-4,
                "round trip of {} produced {}",
                v,
                back
            );
            v *= 1.37;
        }
        assert!((from_control(to_control(1.0)) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_floor_maps_to_silence() {
        assert_eq!(to_control(SILENCE_LINEAR_FLOOR), CONTROL_SILENCE);
        assert_eq!(to_control(0.0), CONTROL_SILENCE);
        assert_eq!(to_control(-1.0), CONTROL_SILENCE);
        assert_eq!(from_control(CONTROL_SILENCE), 0.0);
        assert_eq!(from_control(-120.0), 0.0);
    }

    #[test]
    fn test_unity_is_zero_db() {
        assert!(to_control(1.0).abs() < 1e-6);
        assert!((to_control(0.5) - (-6.0206)).abs() < 1e-3);
    }

    #[test]
    fn test_to_control_is_monotonic() {
        let samples = [0.0, 0.0001, 0.0002, 0.01, 0.1, 0.5, 0.8, 1.0];
        for pair in samples.windows(2) {
            assert!(to_control(pair[0]) <= to_control(pair[1]));
        }
    }

    #[test]
    fn test_clamp_linear() {
        assert_eq!(clamp_linear(1.5), 1.0);
        assert_eq!(clamp_linear(-0.2), 0.0);
        assert_eq!(clamp_linear(f32::NAN), 0.0);
        assert_eq!(clamp_linear(0.42), 0.42);
    }
}
