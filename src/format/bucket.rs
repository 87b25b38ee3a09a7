//! Chooses the calendar granularity used to describe how far away an instant is.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone};

pub const SECOND_MS: i64 = 1_000;
pub const MINUTE_MS: i64 = 60 * SECOND_MS;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;
pub const WEEK_MS: i64 = 7 * DAY_MS;
pub const MONTH_MS: i64 = 30 * DAY_MS;
pub const YEAR_MS: i64 = 365 * DAY_MS;

/// Ordered from finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

/// Which suffix accompanies the relative phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Precision {
    pub show_clock_time: bool,
    pub show_weekday: bool,
}

impl Precision {
    pub const NONE: Self = Self {
        show_clock_time: false,
        show_weekday: false,
    };
    pub const CLOCK: Self = Self {
        show_clock_time: true,
        show_weekday: false,
    };
    pub const WEEKDAY: Self = Self {
        show_clock_time: false,
        show_weekday: true,
    };

    pub fn has_suffix(self) -> bool {
        self.show_clock_time || self.show_weekday
    }
}

/// A signed count of `unit`s: positive in the future, negative in the past.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub unit: TimeUnit,
    pub value: i64,
    pub precision: Precision,
}

impl Bucket {
    fn new(unit: TimeUnit, value: i64, precision: Precision) -> Self {
        Self {
            unit,
            value,
            precision,
        }
    }
}

/// `(iso_year, week_number)` of the ISO week containing `date`.
pub fn iso_week(date: NaiveDate) -> (i32, u32) {
    let week = date.iso_week();
    (week.year(), week.week())
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Whole ISO weeks from `now`'s week to `target`'s week.
fn iso_week_difference(now: NaiveDate, target: NaiveDate) -> i64 {
    (week_start(target) - week_start(now)).num_days() / 7
}

/// Calendar days between the two dates, ignoring time of day.
fn midnight_day_difference(now: NaiveDate, target: NaiveDate) -> i64 {
    (target - now).num_days()
}

/// Buckets the distance between `now` and `target`, both seen in the same time zone.
///
/// Integer division truncates toward zero, which is the rounding relative
/// phrasing expects for signed counts.
pub fn bucket<Tz: TimeZone>(now: &DateTime<Tz>, target: &DateTime<Tz>) -> Bucket {
    let elapsed = now.timestamp_millis() - target.timestamp_millis();
    let distance = elapsed.saturating_abs();
    let ahead = elapsed.saturating_neg();

    let now_date = now.date_naive();
    let target_date = target.date_naive();

    if distance < MINUTE_MS {
        Bucket::new(TimeUnit::Second, ahead / SECOND_MS, Precision::CLOCK)
    } else if distance < DAY_MS {
        if now_date != target_date {
            Bucket::new(
                TimeUnit::Day,
                midnight_day_difference(now_date, target_date),
                Precision::CLOCK,
            )
        } else if distance < HOUR_MS {
            Bucket::new(TimeUnit::Minute, ahead / MINUTE_MS, Precision::CLOCK)
        } else {
            Bucket::new(TimeUnit::Hour, ahead / HOUR_MS, Precision::CLOCK)
        }
    } else if distance < WEEK_MS {
        if iso_week(now_date) == iso_week(target_date) {
            Bucket::new(
                TimeUnit::Day,
                midnight_day_difference(now_date, target_date),
                Precision::CLOCK,
            )
        } else {
            Bucket::new(
                TimeUnit::Week,
                iso_week_difference(now_date, target_date),
                Precision::WEEKDAY,
            )
        }
    } else if distance < MONTH_MS {
        let weeks = iso_week_difference(now_date, target_date);
        if weeks.abs() == 1 {
            Bucket::new(TimeUnit::Week, weeks, Precision::WEEKDAY)
        } else {
            Bucket::new(TimeUnit::Week, ahead / WEEK_MS, Precision::NONE)
        }
    } else if distance < YEAR_MS {
        Bucket::new(TimeUnit::Month, ahead / MONTH_MS, Precision::NONE)
    } else {
        Bucket::new(TimeUnit::Year, ahead / YEAR_MS, Precision::NONE)
    }
}
