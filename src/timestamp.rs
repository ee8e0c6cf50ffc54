// src/timestamp.rs

//! Conversion between the history store's timestamps and calendar time.
//!
//! The store keeps visit times as floating-point seconds since
//! 2001-01-01T00:00:00 UTC. Whole seconds and the nanosecond fraction are
//! carried separately so the stored value survives a decode/encode cycle.

use chrono::{DateTime, Duration, TimeZone, Utc};

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// 2001-01-01T00:00:00 UTC
pub fn reference_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Converts stored epoch-seconds into an absolute timestamp.
///
/// Values past the range chrono can represent clamp to the nearest bound.
pub fn decode(epoch_seconds: f64) -> DateTime<Utc> {
    let secs = epoch_seconds.floor();
    let nanos = ((epoch_seconds - secs) * NANOS_PER_SECOND).round() as i64;

    Duration::try_seconds(secs as i64)
        .and_then(|d| d.checked_add(&Duration::nanoseconds(nanos)))
        .and_then(|d| reference_epoch().checked_add_signed(d))
        .unwrap_or(if epoch_seconds > 0.0 {
            DateTime::<Utc>::MAX_UTC
        } else {
            DateTime::<Utc>::MIN_UTC
        })
}

/// Seconds elapsed from the reference epoch to `t`; negative before 2001.
pub fn encode(t: DateTime<Utc>) -> f64 {
    let elapsed = t.signed_duration_since(reference_epoch());
    elapsed.num_seconds() as f64 + f64::from(elapsed.subsec_nanos()) / NANOS_PER_SECOND
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_zero_is_reference_epoch() {
        let expected = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(decode(0.0), expected);
    }

    #[test]
    fn decode_known_dates() {
        assert_eq!(decode(86400.0), Utc.with_ymd_and_hms(2001, 1, 2, 0, 0, 0).unwrap());
        assert_eq!(decode(757382400.0), Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn decode_keeps_fractional_seconds() {
        let t = decode(100.5);
        assert_eq!(t, reference_epoch() + Duration::milliseconds(100_500));
    }

    #[test]
    fn negative_values_are_before_the_epoch() {
        let t = decode(-86400.0);
        assert_eq!(t, Utc.with_ymd_and_hms(2000, 12, 31, 0, 0, 0).unwrap());
        assert_eq!(encode(t), -86400.0);
    }

    #[test]
    fn encode_decode_round_trip() {
        for x in [0.0, 1.0, -1.5, 100.5, 757418400.0, 757418400.123456, 1e9 + 0.25] {
            assert_eq!(encode(decode(x)), x, "round trip of {x}");
        }

        let t = Utc.with_ymd_and_hms(2024, 6, 30, 23, 59, 59).unwrap() + Duration::microseconds(42);
        assert_eq!(decode(encode(t)), t);
    }

    #[test]
    fn sub_microsecond_fractions_survive_a_round_trip() {
        for x in [757_418_400.123_456_7, 757_418_400.999_999_9, -31_536_000.123_456_7] {
            assert_eq!(encode(decode(x)), x, "round trip of {x}");
        }
    }

    #[test]
    fn out_of_range_values_clamp() {
        assert_eq!(decode(1e13), DateTime::<Utc>::MAX_UTC);
        assert_eq!(decode(f64::MAX), DateTime::<Utc>::MAX_UTC);
        assert_eq!(decode(-1e13), DateTime::<Utc>::MIN_UTC);
    }
}
