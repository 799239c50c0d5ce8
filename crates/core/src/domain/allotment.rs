// Wait Allotment - minutes an entry occupies the equipment once active

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Milliseconds in one minute
pub const MILLIS_PER_MINUTE: i64 = 60_000;

/// Longest allotment accepted from the store (one full day)
pub const MAX_WAIT_MINUTES: i64 = 24 * 60;

/// Whole-minute wait allotment, fixed at enqueue time
///
/// Parsed from the store's `"HH:MM"` representation. Zero and negative values
/// are valid; only their effective (non-negative) part extends the wait of
/// later entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WaitAllotment(i64);

impl WaitAllotment {
    pub fn from_minutes(minutes: i64) -> Self {
        Self(minutes)
    }

    /// Parse `"HH:MM"` (optionally prefixed with `-`) into whole minutes
    ///
    /// Exactly one colon, both parts decimal digits, minutes below 60 and a
    /// magnitude of at most [`MAX_WAIT_MINUTES`]. Anything else is rejected
    /// rather than coerced to zero.
    pub fn parse(raw: &str) -> Result<Self> {
        let malformed = || DomainError::MalformedWaitAllotment(raw.to_string());

        let trimmed = raw.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (hours, minutes) = body.split_once(':').ok_or_else(malformed)?;
        if !is_digits(hours) || !is_digits(minutes) {
            return Err(malformed());
        }

        let hours: i64 = hours.parse().map_err(|_| malformed())?;
        let minutes: i64 = minutes.parse().map_err(|_| malformed())?;
        if minutes >= 60 {
            return Err(malformed());
        }

        let total = hours
            .checked_mul(60)
            .and_then(|h| h.checked_add(minutes))
            .filter(|total| *total <= MAX_WAIT_MINUTES)
            .ok_or_else(malformed)?;

        Ok(Self(if negative { -total } else { total }))
    }

    /// Raw minute count as stored
    pub fn minutes(&self) -> i64 {
        self.0
    }

    /// Contribution to the waiting accumulator (never negative)
    pub fn effective_minutes(&self) -> i64 {
        self.0.max(0)
    }

    pub fn effective_millis(&self) -> i64 {
        self.effective_minutes().saturating_mul(MILLIS_PER_MINUTE)
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl std::fmt::Display for WaitAllotment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{:02}:{:02}", sign, abs / 60, abs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hours_and_minutes() {
        assert_eq!(WaitAllotment::parse("00:10").unwrap().minutes(), 10);
        assert_eq!(WaitAllotment::parse("01:30").unwrap().minutes(), 90);
        assert_eq!(WaitAllotment::parse("2:05").unwrap().minutes(), 125);
        assert_eq!(WaitAllotment::parse("00:00").unwrap().minutes(), 0);
    }

    #[test]
    fn test_parse_negative_is_valid_but_not_effective() {
        let allotment = WaitAllotment::parse("-00:15").unwrap();
        assert_eq!(allotment.minutes(), -15);
        assert_eq!(allotment.effective_minutes(), 0);
        assert_eq!(allotment.effective_millis(), 0);
    }

    #[test]
    fn test_parse_rejects_malformed_values() {
        for raw in [
            "abc",
            "",
            "10",
            "1:2:3",
            "00:75",
            ":30",
            "01:",
            "+1:00",
            "0a:10",
            "--1:00",
            "24:01",
            "-25:00",
            "999999999999999:00",
            "99999999999999999999:00",
        ] {
            let err = WaitAllotment::parse(raw).unwrap_err();
            assert!(
                matches!(err, DomainError::MalformedWaitAllotment(ref v) if v == raw),
                "expected malformed for {raw:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_parse_accepts_a_full_day() {
        assert_eq!(WaitAllotment::parse("24:00").unwrap().minutes(), MAX_WAIT_MINUTES);
        assert_eq!(WaitAllotment::parse("-24:00").unwrap().minutes(), -MAX_WAIT_MINUTES);
    }

    #[test]
    fn test_effective_millis_saturates() {
        assert_eq!(WaitAllotment::from_minutes(i64::MAX).effective_millis(), i64::MAX);
    }

    #[test]
    fn test_display_round_trips_store_format() {
        assert_eq!(WaitAllotment::from_minutes(90).to_string(), "01:30");
        assert_eq!(WaitAllotment::from_minutes(-5).to_string(), "-00:05");
    }
}
