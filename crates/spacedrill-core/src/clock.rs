//! Study-day boundaries.
//!
//! A study day starts at `day_start_hour` local time rather than midnight,
//! so a session at 01:00 still counts toward the previous day's quota.

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};

use crate::error::SchedulingError;
use crate::model::DateKey;

/// Hour (local time) at which a new study day begins.
pub const DEFAULT_DAY_START_HOUR: u32 = 4;

/// Maps wall-clock instants onto logical study days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalClock {
    day_start_hour: u32,
    utc_offset: FixedOffset,
}

impl Default for LogicalClock {
    fn default() -> Self {
        Self {
            day_start_hour: DEFAULT_DAY_START_HOUR,
            utc_offset: utc(),
        }
    }
}

impl LogicalClock {
    pub fn new(day_start_hour: u32, utc_offset: FixedOffset) -> Result<Self, SchedulingError> {
        if day_start_hour >= 24 {
            return Err(SchedulingError::InvalidConfig(format!(
                "day_start_hour must be below 24, got {day_start_hour}"
            )));
        }
        Ok(Self {
            day_start_hour,
            utc_offset,
        })
    }

    /// Build a clock from a UTC offset expressed in minutes east of UTC.
    pub fn with_offset_minutes(
        day_start_hour: u32,
        offset_minutes: i32,
    ) -> Result<Self, SchedulingError> {
        let offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                SchedulingError::InvalidConfig(format!(
                    "utc offset out of range: {offset_minutes} minutes"
                ))
            })?;
        Self::new(day_start_hour, offset)
    }

    pub fn day_start_hour(&self) -> u32 {
        self.day_start_hour
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    /// The study day `now` belongs to.
    pub fn logical_date(&self, now: DateTime<Utc>) -> DateKey {
        let local = now.with_timezone(&self.utc_offset);
        let shifted = local - Duration::hours(i64::from(self.day_start_hour));
        DateKey::new(shifted.date_naive())
    }
}

/// [`LogicalClock::logical_date`] with the default 04:00 UTC boundary.
pub fn logical_date(now: DateTime<Utc>) -> DateKey {
    LogicalClock::default().logical_date(now)
}

fn utc() -> FixedOffset {
    Utc.fix()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn late_night_belongs_to_previous_day() {
        let before_boundary = logical_date(at(2024, 5, 2, 3, 59));
        let prior_evening = logical_date(at(2024, 5, 1, 23, 59));
        assert_eq!(before_boundary, prior_evening);
        assert_eq!(before_boundary.to_string(), "2024-05-01");
    }

    #[test]
    fn after_boundary_starts_new_day() {
        assert_eq!(logical_date(at(2024, 5, 2, 4, 1)).to_string(), "2024-05-02");
        assert_eq!(logical_date(at(2024, 5, 2, 4, 0)).to_string(), "2024-05-02");
    }

    #[test]
    fn crosses_month_and_year_boundaries() {
        assert_eq!(logical_date(at(2025, 1, 1, 2, 0)).to_string(), "2024-12-31");
        assert_eq!(logical_date(at(2024, 3, 1, 0, 30)).to_string(), "2024-02-29");
    }

    #[test]
    fn fixed_offset_is_applied_before_shift() {
        // 20:30 UTC is 04:30 the next day at UTC+8.
        let clock = LogicalClock::with_offset_minutes(4, 8 * 60).unwrap();
        assert_eq!(clock.logical_date(at(2024, 5, 1, 20, 30)).to_string(), "2024-05-02");
        // 19:30 UTC is 03:30 at UTC+8, still the 1st.
        assert_eq!(clock.logical_date(at(2024, 5, 1, 19, 30)).to_string(), "2024-05-01");
    }

    #[test]
    fn custom_start_hour() {
        let clock = LogicalClock::new(0, utc()).unwrap();
        assert_eq!(clock.logical_date(at(2024, 5, 2, 0, 1)).to_string(), "2024-05-02");
    }

    #[test]
    fn rejects_invalid_configuration() {
        assert!(matches!(
            LogicalClock::new(24, utc()),
            Err(SchedulingError::InvalidConfig(_))
        ));
        assert!(LogicalClock::with_offset_minutes(4, 24 * 60).is_err());
    }
}
