//! BPM input validation and tempo arithmetic

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MIN_BPM: u32 = 40;
pub const DEFAULT_MAX_BPM: u32 = 208;

const NANOS_PER_MINUTE: u64 = 60_000_000_000;

/// Why a user-entered BPM was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BpmError {
    #[error("'{input}' is not a number")]
    NotANumber { input: String },

    #[error("{value} is outside {min}-{max}")]
    OutOfRange { value: i64, min: u32, max: u32 },
}

/// Inclusive range of accepted BPM values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BpmRange {
    pub min: u32,
    pub max: u32,
}

impl BpmRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, bpm: i64) -> bool {
        bpm >= i64::from(self.min) && bpm <= i64::from(self.max)
    }

    /// Parse raw input and check it against the range
    ///
    /// Non-numeric input fails the same way an out-of-range number does.
    pub fn validate(&self, input: &str) -> Result<u32, BpmError> {
        let trimmed = input.trim();
        let value: i64 = trimmed.parse().map_err(|_| BpmError::NotANumber {
            input: trimmed.to_string(),
        })?;

        if !self.contains(value) {
            return Err(BpmError::OutOfRange {
                value,
                min: self.min,
                max: self.max,
            });
        }

        u32::try_from(value).map_err(|_| BpmError::OutOfRange {
            value,
            min: self.min,
            max: self.max,
        })
    }

    /// Message shown next to the input while the last entry is invalid
    pub fn validation_message(&self) -> String {
        format!("bpm must be within {}-{}", self.min, self.max)
    }
}

impl Default for BpmRange {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_BPM, DEFAULT_MAX_BPM)
    }
}

impl std::fmt::Display for BpmRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Period of the tick process: `60000 / bpm` ms
///
/// `None` for 0 bpm, which can never play.
pub fn tick_interval(bpm: u32) -> Option<Duration> {
    (bpm != 0).then(|| Duration::from_nanos(NANOS_PER_MINUTE / u64::from(bpm)))
}

/// Animation period in seconds per two beats: `120 / bpm`
pub fn tempo_duration(bpm: u32) -> f64 {
    if bpm == 0 {
        0.0
    } else {
        120.0 / f64::from(bpm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_interval_at_120_bpm() {
        assert_eq!(tick_interval(120), Some(Duration::from_millis(500)));
        assert_eq!(tempo_duration(120), 1.0);
    }

    #[test]
    fn test_interval_at_100_and_200_bpm() {
        assert_eq!(tick_interval(100), Some(Duration::from_millis(600)));
        assert_eq!(tempo_duration(100), 1.2);
        assert_eq!(tick_interval(200), Some(Duration::from_millis(300)));
        assert_eq!(tempo_duration(200), 0.6);
    }

    #[test]
    fn test_zero_bpm_cannot_play() {
        assert_eq!(tick_interval(0), None);
        assert_eq!(tempo_duration(0), 0.0);
    }

    #[test]
    fn test_validate_bounds_are_inclusive() {
        let range = BpmRange::new(40, 208);
        assert_eq!(range.validate("40"), Ok(40));
        assert_eq!(range.validate("208"), Ok(208));
        assert_eq!(range.validate(" 120 "), Ok(120));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let range = BpmRange::new(40, 208);
        assert_eq!(
            range.validate("9999"),
            Err(BpmError::OutOfRange {
                value: 9999,
                min: 40,
                max: 208
            })
        );
        assert!(matches!(
            range.validate("-5"),
            Err(BpmError::OutOfRange { value: -5, .. })
        ));
        assert!(range.validate("0").is_err());
    }

    #[test]
    fn test_validate_rejects_non_numeric() {
        let range = BpmRange::default();
        assert!(matches!(range.validate("fast"), Err(BpmError::NotANumber { .. })));
        assert!(matches!(range.validate(""), Err(BpmError::NotANumber { .. })));
        assert!(matches!(range.validate("12.5"), Err(BpmError::NotANumber { .. })));
    }

    #[test]
    fn test_validation_message() {
        assert_eq!(
            BpmRange::new(40, 208).validation_message(),
            "bpm must be within 40-208"
        );
    }

    proptest! {
        #[test]
        fn prop_in_range_is_accepted(bpm in DEFAULT_MIN_BPM..=DEFAULT_MAX_BPM) {
            let range = BpmRange::default();
            prop_assert_eq!(range.validate(&bpm.to_string()), Ok(bpm));
        }

        #[test]
        fn prop_out_of_range_is_rejected(bpm in prop_oneof![-10_000i64..40, 209i64..100_000]) {
            let range = BpmRange::default();
            let is_out_of_range = matches!(
                range.validate(&bpm.to_string()),
                Err(BpmError::OutOfRange { .. })
            );
            prop_assert!(is_out_of_range);
        }

        #[test]
        fn prop_non_numeric_is_rejected(input in "[a-zA-Z ]{0,12}") {
            prop_assert!(BpmRange::default().validate(&input).is_err());
        }

        #[test]
        fn prop_interval_matches_bpm(bpm in 1u32..=1000) {
            let interval = tick_interval(bpm).unwrap();
            prop_assert_eq!(interval.as_nanos(), u128::from(60_000_000_000u64 / u64::from(bpm)));
        }
    }
}
