//! Calendar-date boundary.
//!
//! Dates cross the system boundary as strict `YYYY-MM-DD` strings. Storage
//! keeps the instant of local midnight for that date; reading it back takes
//! the local calendar date of the stored instant.

use core::str::FromStr;

use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// A calendar date without time-of-day semantics.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CalendarDate(NaiveDate);

impl ValueObject for CalendarDate {}

impl CalendarDate {
    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> DomainResult<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "{year:04}-{month:02}-{day:02} is not a calendar date"
                ))
            })
    }

    /// Instant of local midnight for this date.
    pub fn to_instant(&self) -> DomainResult<DateTime<Utc>> {
        self.to_instant_in(&Local)
    }

    /// Instant of midnight for this date in `tz`.
    ///
    /// Where midnight does not exist (a DST gap starting at 00:00) the
    /// earliest existing hour of that day is used.
    pub fn to_instant_in<Tz: TimeZone>(&self, tz: &Tz) -> DomainResult<DateTime<Utc>> {
        for hour in 0..24 {
            let Some(local) = self.0.and_hms_opt(hour, 0, 0) else {
                continue;
            };
            if let Some(at) = tz.from_local_datetime(&local).earliest() {
                return Ok(at.with_timezone(&Utc));
            }
        }
        Err(DomainError::invariant(format!(
            "{self} has no representable local time"
        )))
    }

    /// Local calendar date of a stored instant.
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        Self::from_instant_in(instant, &Local)
    }

    pub fn from_instant_in<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> Self {
        Self(instant.with_timezone(tz).date_naive())
    }
}

impl core::fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            self.0.month(),
            self.0.day()
        )
    }
}

impl FromStr for CalendarDate {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        let shape_ok = bytes.len() == 10
            && bytes.iter().enumerate().all(|(i, b)| match i {
                4 | 7 => *b == b'-',
                _ => b.is_ascii_digit(),
            });
        if !shape_ok {
            return Err(DomainError::validation(format!(
                "date must be formatted as YYYY-MM-DD, got {s:?}"
            )));
        }

        // Shape check above guarantees these slices are ASCII digits.
        let year: i32 = s[0..4]
            .parse()
            .map_err(|_| DomainError::validation(format!("invalid year in {s:?}")))?;
        let month: u32 = s[5..7]
            .parse()
            .map_err(|_| DomainError::validation(format!("invalid month in {s:?}")))?;
        let day: u32 = s[8..10]
            .parse()
            .map_err(|_| DomainError::validation(format!("invalid day in {s:?}")))?;

        Self::from_ymd(year, month, day)
    }
}

impl TryFrom<String> for CalendarDate {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CalendarDate> for String {
    fn from(value: CalendarDate) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use proptest::prelude::*;

    #[test]
    fn round_trips_through_local_midnight() {
        let date: CalendarDate = "2026-02-07".parse().unwrap();
        let instant = date.to_instant().unwrap();
        assert_eq!(CalendarDate::from_instant(instant).to_string(), "2026-02-07");
    }

    #[test]
    fn midnight_is_local_not_utc() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let date: CalendarDate = "2026-02-07".parse().unwrap();
        let instant = date.to_instant_in(&tokyo).unwrap();

        assert_eq!(instant.to_rfc3339(), "2026-02-06T15:00:00+00:00");
        assert_eq!(CalendarDate::from_instant_in(instant, &tokyo), date);
    }

    #[test]
    fn rejects_nonexistent_dates() {
        let err = "2026-02-30".parse::<CalendarDate>().unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("not a calendar date")));
        assert!("2025-02-29".parse::<CalendarDate>().is_err());
        assert!("2024-02-29".parse::<CalendarDate>().is_ok());
    }

    #[test]
    fn rejects_malformed_shapes() {
        for bad in ["2026-2-07", "2026/02/07", "20260207", "", "2026-02-07T00:00", " 2026-02-07", "+026-02-07"] {
            assert!(bad.parse::<CalendarDate>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn serde_uses_the_string_form() {
        let date: CalendarDate = serde_json::from_str("\"2026-12-31\"").unwrap();
        assert_eq!(serde_json::to_string(&date).unwrap(), "\"2026-12-31\"");
        assert!(serde_json::from_str::<CalendarDate>("\"2026-13-01\"").is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: every valid date survives string and instant round trips,
        /// in any fixed UTC offset.
        #[test]
        fn dates_round_trip(
            days in 0i64..(365 * 200),
            offset_minutes in -(14 * 60i32)..=(14 * 60),
        ) {
            let base = NaiveDate::from_ymd_opt(1950, 1, 1).unwrap();
            let date = CalendarDate::from_naive(base + chrono::Duration::days(days));
            let tz = FixedOffset::east_opt(offset_minutes * 60).unwrap();

            let text = date.to_string();
            prop_assert_eq!(text.parse::<CalendarDate>().unwrap(), date);

            let instant = date.to_instant_in(&tz).unwrap();
            prop_assert_eq!(CalendarDate::from_instant_in(instant, &tz), date);
        }
    }
}
