//! Per-user event count range, written as `"min-max"`.

use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Inclusive range of events to generate per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventRange {
    min: u32,
    max: u32,
}

impl Default for EventRange {
    fn default() -> Self {
        EventRange { min: 2, max: 4 }
    }
}

impl EventRange {
    pub fn new(min: u32, max: u32) -> Result<Self, CoreError> {
        if min > max {
            return Err(CoreError::Config(format!(
                "Invalid event range {}-{}: min is greater than max",
                min, max
            )));
        }
        Ok(EventRange { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn contains(&self, n: u32) -> bool {
        (self.min..=self.max).contains(&n)
    }

    /// Draw a count uniformly from the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.random_range(self.min..=self.max)
    }
}

impl FromStr for EventRange {
    type Err = CoreError;

    /// Parse `"2-3"` or a single count such as `"3"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            CoreError::Config(format!(
                "Invalid event range '{}'. Expected MIN-MAX, e.g. 2-3",
                s
            ))
        };

        let (min, max) = match s.split_once('-') {
            Some((min, max)) => (min.trim(), max.trim()),
            None => (s.trim(), s.trim()),
        };

        let min = min.parse::<u32>().map_err(|_| invalid())?;
        let max = max.parse::<u32>().map_err(|_| invalid())?;

        EventRange::new(min, max)
    }
}

impl TryFrom<String> for EventRange {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EventRange> for String {
    fn from(value: EventRange) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for EventRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_parse_range() {
        let range: EventRange = "2-3".parse().unwrap();
        assert_eq!((range.min(), range.max()), (2, 3));

        let single: EventRange = " 4 ".parse().unwrap();
        assert_eq!((single.min(), single.max()), (4, 4));

        let spaced: EventRange = "1 - 5".parse().unwrap();
        assert_eq!(spaced.to_string(), "1-5");
    }

    #[test]
    fn test_parse_rejects_bad_ranges() {
        assert!("3-2".parse::<EventRange>().is_err());
        assert!("two-three".parse::<EventRange>().is_err());
        assert!("-1-2".parse::<EventRange>().is_err());
        assert!("".parse::<EventRange>().is_err());
    }

    #[test]
    fn test_sample_stays_in_bounds() {
        let range = EventRange::new(2, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            assert!(range.contains(range.sample(&mut rng)));
        }
    }

    #[test]
    fn test_serde_uses_string_form() {
        let range = EventRange::new(1, 6).unwrap();
        let json = serde_json::to_string(&range).unwrap();
        assert_eq!(json, "\"1-6\"");
        let back: EventRange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, range);
    }
}
