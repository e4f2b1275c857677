//! crates/chefito_core/src/clock.rs
//!
//! The week/year clock used to bucket recipe views.
//!
//! Weeks are counted as whole 7-day spans elapsed since midnight UTC on
//! 1 January, plus one. This is not ISO-8601 week numbering: week 1 always
//! starts on 1 January whatever the weekday, and the last bucket of the year
//! (week 53) holds only one or two days.

use chrono::{DateTime, Datelike, TimeZone, Utc};

const SECONDS_PER_WEEK: i64 = 7 * 24 * 60 * 60;

/// A source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// The (week, year) bucket a view is recorded under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekStamp {
    pub week_number: u32,
    pub year: i32,
}

impl WeekStamp {
    pub fn at(now: DateTime<Utc>) -> Self {
        let year = now.year();
        let start_of_year = Utc
            .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or(now);
        let elapsed = (now - start_of_year).num_seconds().max(0);

        Self {
            week_number: (elapsed / SECONDS_PER_WEEK) as u32 + 1,
            year,
        }
    }

    pub fn current(clock: &dyn Clock) -> Self {
        Self::at(clock.now())
    }
}

pub fn current_week(clock: &dyn Clock) -> u32 {
    WeekStamp::current(clock).week_number
}

pub fn current_year(clock: &dyn Clock) -> i32 {
    clock.now().year()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn first_instant_of_the_year_is_week_one() {
        let stamp = WeekStamp::at(utc(2024, 1, 1, 0));
        assert_eq!(stamp, WeekStamp { week_number: 1, year: 2024 });
    }

    #[test]
    fn weeks_roll_over_every_seven_days_from_january_first() {
        assert_eq!(WeekStamp::at(utc(2024, 1, 7, 23)).week_number, 1);
        assert_eq!(WeekStamp::at(utc(2024, 1, 8, 0)).week_number, 2);
        assert_eq!(WeekStamp::at(utc(2024, 1, 15, 12)).week_number, 3);
        assert_eq!(WeekStamp::at(utc(2024, 1, 21, 23)).week_number, 3);
    }

    #[test]
    fn week_boundaries_ignore_weekdays() {
        // 2023-01-01 was a Sunday; the following Monday is still week 1.
        assert_eq!(WeekStamp::at(utc(2023, 1, 2, 9)).week_number, 1);
    }

    #[test]
    fn last_days_of_the_year_fall_into_week_fifty_three() {
        assert_eq!(WeekStamp::at(utc(2023, 12, 31, 12)).week_number, 53);
        // Leap year: day 366 is also in the trailing bucket.
        assert_eq!(WeekStamp::at(utc(2024, 12, 30, 12)).week_number, 53);
        assert_eq!(WeekStamp::at(utc(2024, 12, 29, 12)).week_number, 52);
    }

    #[test]
    fn year_boundary_restarts_numbering() {
        let before = WeekStamp::at(utc(2024, 12, 31, 23));
        let after = WeekStamp::at(utc(2025, 1, 1, 0));
        assert_eq!(before, WeekStamp { week_number: 53, year: 2024 });
        assert_eq!(after, WeekStamp { week_number: 1, year: 2025 });
    }

    #[test]
    fn helpers_read_the_given_clock() {
        let clock = FixedClock(utc(2024, 1, 16, 10));
        assert_eq!(current_week(&clock), 3);
        assert_eq!(current_year(&clock), 2024);
    }
}
