//! Parsing of `<t:EPOCH:STYLE>` tokens embedded in message text.

use std::fmt;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{TimestampError, TimestampResult};

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<t:(?P<epoch>\d+):(?P<style>[tTdDfFR])>").expect("token pattern is valid")
});

/// Display style selected by the token's one-letter flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampStyle {
    ShortTime,
    LongTime,
    ShortDate,
    LongDate,
    ShortDateTime,
    FullDateTime,
    Relative,
}

impl TimestampStyle {
    pub fn from_flag(flag: char) -> TimestampResult<Self> {
        match flag {
            't' => Ok(Self::ShortTime),
            'T' => Ok(Self::LongTime),
            'd' => Ok(Self::ShortDate),
            'D' => Ok(Self::LongDate),
            'f' => Ok(Self::ShortDateTime),
            'F' => Ok(Self::FullDateTime),
            'R' => Ok(Self::Relative),
            other => Err(TimestampError::UnsupportedStyle(other)),
        }
    }

    pub fn flag(self) -> char {
        match self {
            Self::ShortTime => 't',
            Self::LongTime => 'T',
            Self::ShortDate => 'd',
            Self::LongDate => 'D',
            Self::ShortDateTime => 'f',
            Self::FullDateTime => 'F',
            Self::Relative => 'R',
        }
    }

    pub fn is_relative(self) -> bool {
        self == Self::Relative
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimestampToken {
    pub epoch_seconds: i64,
    pub style: TimestampStyle,
}

impl TimestampToken {
    pub fn epoch_millis(&self) -> i64 {
        self.epoch_seconds.saturating_mul(1000)
    }
}

impl fmt::Display for TimestampToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<t:{}:{}>", self.epoch_seconds, self.style.flag())
    }
}

/// One grammar match: the parse outcome plus the byte span it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMatch {
    pub span: Range<usize>,
    pub token: TimestampResult<TimestampToken>,
}

/// Finds the first token in `text`. `Ok(None)` means there is nothing left to format.
pub fn parse_next_token(text: &str) -> TimestampResult<Option<(TimestampToken, Range<usize>)>> {
    match TOKEN_RE.captures(text) {
        Some(caps) => {
            let span = span_of(&caps);
            parse_captures(&caps).map(|token| Some((token, span)))
        }
        None => Ok(None),
    }
}

/// Collects every token in a single forward pass. Matches never overlap, so the
/// spans can be substituted left to right without rescanning.
pub fn scan_tokens(text: &str) -> Vec<TokenMatch> {
    TOKEN_RE
        .captures_iter(text)
        .map(|caps| TokenMatch {
            span: span_of(&caps),
            token: parse_captures(&caps),
        })
        .collect()
}

fn span_of(caps: &Captures<'_>) -> Range<usize> {
    caps.get(0).map(|m| m.range()).unwrap_or(0..0)
}

fn parse_captures(caps: &Captures<'_>) -> TimestampResult<TimestampToken> {
    let raw = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
    let malformed = || TimestampError::MalformedToken(raw.to_string());

    let epoch = caps.name("epoch").ok_or_else(malformed)?;
    let style = caps.name("style").ok_or_else(malformed)?;

    // Digit runs longer than i64 are grammatical but cannot name an instant.
    let epoch_seconds: i64 = epoch.as_str().parse().map_err(|_| malformed())?;
    let flag = style.as_str().chars().next().ok_or_else(malformed)?;

    Ok(TimestampToken {
        epoch_seconds,
        style: TimestampStyle::from_flag(flag)?,
    })
}
