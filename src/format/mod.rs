//! Locale-aware absolute, relative, and tooltip rendering of instants.

pub mod bucket;
pub mod relative;

use std::fmt;

use chrono::{DateTime, Local, Locale, TimeZone, Utc};

use crate::error::{TimestampError, TimestampResult};
use crate::token::{TimestampStyle, TimestampToken};
use bucket::{bucket, Precision, TimeUnit};
use relative::{relative_for_locale, RelativeTimeFormat};

pub use bucket::{iso_week, Bucket};

/// Resolves a host locale preference such as `en-US` or `de_DE.UTF-8`.
/// Unknown or missing preferences fall back to `en_US`.
pub fn parse_locale(preference: Option<&str>) -> Locale {
    preference
        .map(|pref| pref.split('.').next().unwrap_or(pref).replace('-', "_"))
        .and_then(|name| Locale::try_from(name.as_str()).ok())
        .unwrap_or(Locale::en_US)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateOrder {
    MonthFirst,
    DayFirst,
    YearFirst,
}

/// Clock and date-order conventions read back from the locale's own `%X` and `%x`.
#[derive(Debug, Clone, Copy)]
struct LocalePatterns {
    twelve_hour: bool,
    date_order: DateOrder,
}

impl LocalePatterns {
    fn probe(locale: Locale) -> Self {
        let probe = Utc.with_ymd_and_hms(2001, 2, 3, 16, 5, 6).single();
        let Some(probe) = probe else {
            return Self {
                twelve_hour: false,
                date_order: DateOrder::DayFirst,
            };
        };

        let time = probe.format_localized("%X", locale).to_string();
        let date = probe.format_localized("%x", locale).to_string();

        let date_order = if date.starts_with("2001") {
            DateOrder::YearFirst
        } else {
            match (date.find("02"), date.find("03")) {
                (Some(month), Some(day)) if month < day => DateOrder::MonthFirst,
                _ => DateOrder::DayFirst,
            }
        };

        Self {
            twelve_hour: !time.contains("16"),
            date_order,
        }
    }

    fn clock(&self) -> &'static str {
        if self.twelve_hour {
            "%-I:%M %p"
        } else {
            "%H:%M"
        }
    }

    fn long_date(&self) -> &'static str {
        match self.date_order {
            DateOrder::MonthFirst => "%B %-d, %Y",
            DateOrder::DayFirst => "%-d %B %Y",
            DateOrder::YearFirst => "%Y %B %-d",
        }
    }
}

/// Renders instants in one time zone and locale. Pure given its inputs.
pub struct Formatter<Tz: TimeZone = Local> {
    tz: Tz,
    locale: Locale,
    patterns: LocalePatterns,
    relative: Box<dyn RelativeTimeFormat>,
}

impl Formatter<Local> {
    pub fn local(locale_preference: Option<&str>) -> Self {
        Self::new(Local, parse_locale(locale_preference))
    }
}

impl<Tz> Formatter<Tz>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    pub fn new(tz: Tz, locale: Locale) -> Self {
        Self {
            tz,
            locale,
            patterns: LocalePatterns::probe(locale),
            relative: relative_for_locale(locale),
        }
    }

    pub fn with_relative(mut self, relative: Box<dyn RelativeTimeFormat>) -> Self {
        self.relative = relative;
        self
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    fn zoned(&self, epoch_millis: i64) -> TimestampResult<DateTime<Tz>> {
        DateTime::from_timestamp_millis(epoch_millis)
            .map(|utc| utc.with_timezone(&self.tz))
            .ok_or(TimestampError::OutOfRange(epoch_millis / 1000))
    }

    fn localized(&self, instant: &DateTime<Tz>, pattern: &str) -> String {
        instant.format_localized(pattern, self.locale).to_string()
    }

    /// Renders whichever form the token's style asks for.
    pub fn render(&self, now: DateTime<Utc>, token: &TimestampToken) -> TimestampResult<String> {
        if token.style.is_relative() {
            self.render_relative(now, token.epoch_millis())
        } else {
            self.render_absolute(token.epoch_millis(), token.style)
        }
    }

    pub fn render_absolute(&self, epoch_millis: i64, style: TimestampStyle) -> TimestampResult<String> {
        let instant = self.zoned(epoch_millis)?;
        let clock = self.patterns.clock();
        let long_date = self.patterns.long_date();

        let text = match style {
            TimestampStyle::ShortTime => self.localized(&instant, clock),
            TimestampStyle::LongTime => self.localized(&instant, "%X"),
            TimestampStyle::ShortDate => self.localized(&instant, "%x"),
            TimestampStyle::LongDate => self.localized(&instant, long_date),
            TimestampStyle::ShortDateTime => {
                self.localized(&instant, &format!("{} {}", long_date, clock))
            }
            TimestampStyle::FullDateTime => {
                self.localized(&instant, &format!("%A, {} {}", long_date, clock))
            }
            TimestampStyle::Relative => {
                return Err(TimestampError::UnsupportedStyle(style.flag()));
            }
        };
        Ok(text)
    }

    pub fn render_relative(&self, now: DateTime<Utc>, target_millis: i64) -> TimestampResult<String> {
        let now = now.with_timezone(&self.tz);
        let target = self.zoned(target_millis)?;

        let Bucket {
            unit,
            value,
            mut precision,
        } = bucket(&now, &target);
        let phrase = self.relative.format(value, unit);

        // "yesterday (@ 14:02)" reads as missing an anchor; name the day instead.
        if unit == TimeUnit::Day
            && precision.show_clock_time
            && !phrase.chars().any(char::is_numeric)
        {
            precision = Precision::WEEKDAY;
        }

        if !precision.has_suffix() {
            return Ok(phrase);
        }

        let clock = self.localized(&target, &format!("{} %Z", self.patterns.clock()));
        let suffix = if precision.show_weekday {
            let weekday = target.format_localized("%A", self.relative.language());
            format!("{} @ {}", weekday, clock)
        } else {
            format!("@ {}", clock)
        };
        Ok(format!("{} ({})", phrase, suffix))
    }

    /// `"<local date and time> (<same instant in UTC>)"`.
    pub fn render_tooltip(&self, epoch_millis: i64) -> TimestampResult<String> {
        let local = self.zoned(epoch_millis)?;
        let utc = local.with_timezone(&Utc);
        Ok(format!(
            "{} ({})",
            self.localized(&local, "%c"),
            utc.format_localized("%c", self.locale)
        ))
    }
}
