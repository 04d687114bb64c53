//! Time utilities: local wall-clock stamps and checkout periods.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeError {
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),
    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

/// Date and time strings as they are written on the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStamp {
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
}

/// Convert a UTC instant into a local date/time stamp in an IANA tz like
/// "America/Santiago".
pub fn local_stamp(now: DateTime<Utc>, tz: &str) -> Result<LocalStamp, TimeError> {
    let tz: Tz = tz
        .parse()
        .map_err(|_| TimeError::InvalidTimezone(tz.to_string()))?;
    let local = now.with_timezone(&tz);
    Ok(LocalStamp {
        date: local.format("%Y-%m-%d").to_string(),
        time: local.format("%H:%M").to_string(),
    })
}

/// Reporting period of a checkout date: (month 0-11, year).
pub fn checkout_period(date: &str) -> Result<(u32, i32), TimeError> {
    let d = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| TimeError::InvalidDate(date.to_string()))?;
    Ok((d.month0(), d.year()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_local_stamp_santiago() {
        // March is still summer time in Chile (UTC-3).
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 2, 30, 0).unwrap();
        let stamp = local_stamp(now, "America/Santiago").unwrap();
        assert_eq!(stamp.date, "2026-03-01");
        assert_eq!(stamp.time, "23:30");
    }

    #[test]
    fn test_invalid_timezone() {
        let err = local_stamp(Utc::now(), "Mars/Olympus").unwrap_err();
        assert_eq!(err, TimeError::InvalidTimezone("Mars/Olympus".to_string()));
    }

    #[test]
    fn test_checkout_period() {
        assert_eq!(checkout_period("2026-01-31").unwrap(), (0, 2026));
        assert_eq!(checkout_period("2025-12-01").unwrap(), (11, 2025));
        assert!(checkout_period("01/12/2025").is_err());
    }
}
