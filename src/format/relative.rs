use chrono::{Locale, TimeZone, Utc};

use super::bucket::TimeUnit;

/// Turns a signed unit count into a phrase ("in 3 days", "2 hours ago").
pub trait RelativeTimeFormat: Send + Sync {
    fn format(&self, value: i64, unit: TimeUnit) -> String;

    /// Language the phrases are written in. Weekday names next to a phrase use it too.
    fn language(&self) -> Locale {
        Locale::en_US
    }
}

/// Phrase table for `locale`'s language, English when there is none.
pub fn relative_for_locale(locale: Locale) -> Box<dyn RelativeTimeFormat> {
    // 2001-01-01 was a Monday.
    let monday = Utc
        .with_ymd_and_hms(2001, 1, 1, 12, 0, 0)
        .single()
        .map(|d| d.format_localized("%A", locale).to_string());
    match monday.as_deref() {
        Some("Montag") => Box::new(GermanRelativeTime::default()),
        _ => Box::new(EnglishRelativeTime::default()),
    }
}

/// Whether idiomatic phrases ("yesterday", "next week") replace counts of 0 and ±1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Numeric {
    Always,
    #[default]
    Auto,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishRelativeTime {
    numeric: Numeric,
}

impl EnglishRelativeTime {
    pub fn new(numeric: Numeric) -> Self {
        Self { numeric }
    }

    fn unit_name(unit: TimeUnit) -> &'static str {
        match unit {
            TimeUnit::Second => "second",
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
            TimeUnit::Year => "year",
        }
    }

    fn idiom(value: i64, unit: TimeUnit) -> Option<String> {
        let phrase = match (unit, value) {
            (TimeUnit::Second, 0) => "now".to_string(),
            (TimeUnit::Day, 0) => "today".to_string(),
            (TimeUnit::Day, 1) => "tomorrow".to_string(),
            (TimeUnit::Day, -1) => "yesterday".to_string(),
            (_, 0) => format!("this {}", Self::unit_name(unit)),
            (TimeUnit::Week | TimeUnit::Month | TimeUnit::Year, 1) => {
                format!("next {}", Self::unit_name(unit))
            }
            (TimeUnit::Week | TimeUnit::Month | TimeUnit::Year, -1) => {
                format!("last {}", Self::unit_name(unit))
            }
            _ => return None,
        };
        Some(phrase)
    }
}

impl RelativeTimeFormat for EnglishRelativeTime {
    fn format(&self, value: i64, unit: TimeUnit) -> String {
        if self.numeric == Numeric::Auto {
            if let Some(phrase) = Self::idiom(value, unit) {
                return phrase;
            }
        }

        let count = value.unsigned_abs();
        let name = Self::unit_name(unit);
        let noun = if count == 1 {
            name.to_string()
        } else {
            format!("{}s", name)
        };

        if value < 0 {
            format!("{} {} ago", count, noun)
        } else {
            format!("in {} {}", count, noun)
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GermanRelativeTime {
    numeric: Numeric,
}

impl GermanRelativeTime {
    pub fn new(numeric: Numeric) -> Self {
        Self { numeric }
    }

    /// Singular and dative plural; both "vor" and "in" take the dative.
    fn unit_names(unit: TimeUnit) -> (&'static str, &'static str) {
        match unit {
            TimeUnit::Second => ("Sekunde", "Sekunden"),
            TimeUnit::Minute => ("Minute", "Minuten"),
            TimeUnit::Hour => ("Stunde", "Stunden"),
            TimeUnit::Day => ("Tag", "Tagen"),
            TimeUnit::Week => ("Woche", "Wochen"),
            TimeUnit::Month => ("Monat", "Monaten"),
            TimeUnit::Year => ("Jahr", "Jahren"),
        }
    }

    fn idiom(value: i64, unit: TimeUnit) -> Option<&'static str> {
        let phrase = match (unit, value) {
            (TimeUnit::Second, 0) => "jetzt",
            (TimeUnit::Minute, 0) => "in dieser Minute",
            (TimeUnit::Hour, 0) => "in dieser Stunde",
            (TimeUnit::Day, -2) => "vorgestern",
            (TimeUnit::Day, -1) => "gestern",
            (TimeUnit::Day, 0) => "heute",
            (TimeUnit::Day, 1) => "morgen",
            (TimeUnit::Day, 2) => "übermorgen",
            (TimeUnit::Week, -1) => "letzte Woche",
            (TimeUnit::Week, 0) => "diese Woche",
            (TimeUnit::Week, 1) => "nächste Woche",
            (TimeUnit::Month, -1) => "letzten Monat",
            (TimeUnit::Month, 0) => "diesen Monat",
            (TimeUnit::Month, 1) => "nächsten Monat",
            (TimeUnit::Year, -1) => "letztes Jahr",
            (TimeUnit::Year, 0) => "dieses Jahr",
            (TimeUnit::Year, 1) => "nächstes Jahr",
            _ => return None,
        };
        Some(phrase)
    }
}

impl RelativeTimeFormat for GermanRelativeTime {
    fn format(&self, value: i64, unit: TimeUnit) -> String {
        if self.numeric == Numeric::Auto {
            if let Some(phrase) = Self::idiom(value, unit) {
                return phrase.to_string();
            }
        }

        let count = value.unsigned_abs();
        let (one, many) = Self::unit_names(unit);
        let noun = if count == 1 { one } else { many };

        if value < 0 {
            format!("vor {} {}", count, noun)
        } else {
            format!("in {} {}", count, noun)
        }
    }

    fn language(&self) -> Locale {
        Locale::de_DE
    }
}
