use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

/// Timestamp layouts a string slot may be recognised as, in priority order.
///
/// Each layout is named by its reference text (the fixed instant
/// `2006-01-02 15:04:05 -0700` written in that layout), which is what gets
/// reported to renderers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimestampFormat {
    Rfc3339Nano,
    DateTime,
    Reference,
    Rfc3339,
    DateOnly,
    UtcSeconds,
    UtcMillis,
    SlashDate,
    SlashDateTime,
}

impl TimestampFormat {
    pub const ALL: [TimestampFormat; 9] = [
        TimestampFormat::Rfc3339Nano,
        TimestampFormat::DateTime,
        TimestampFormat::Reference,
        TimestampFormat::Rfc3339,
        TimestampFormat::DateOnly,
        TimestampFormat::UtcSeconds,
        TimestampFormat::UtcMillis,
        TimestampFormat::SlashDate,
        TimestampFormat::SlashDateTime,
    ];

    pub fn layout(self) -> &'static str {
        match self {
            Self::Rfc3339Nano => "2006-01-02T15:04:05.999999999Z07:00",
            Self::DateTime => "2006-01-02 15:04:05",
            Self::Reference => "01/02 03:04:05PM '06 -0700",
            Self::Rfc3339 => "2006-01-02T15:04:05Z07:00",
            Self::DateOnly => "2006-01-02",
            Self::UtcSeconds => "2006-01-02T15:04:05Z",
            Self::UtcMillis => "2006-01-02T15:04:05.999Z",
            Self::SlashDate => "2006/01/02",
            Self::SlashDateTime => "2006/01/02 15:04:05",
        }
    }

    /// Whether `s` parses under this layout. Fractional seconds are accepted
    /// after any seconds field.
    pub fn parses(self, s: &str) -> bool {
        match self {
            Self::Rfc3339Nano | Self::Rfc3339 => {
                s.as_bytes().get(10) == Some(&b'T') && DateTime::parse_from_rfc3339(s).is_ok()
            }
            Self::DateTime => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").is_ok(),
            Self::Reference => DateTime::parse_from_str(s, "%m/%d %I:%M:%S%p '%y %z").is_ok(),
            Self::DateOnly => NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
            Self::UtcSeconds | Self::UtcMillis => {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ").is_ok()
            }
            Self::SlashDate => NaiveDate::parse_from_str(s, "%Y/%m/%d").is_ok(),
            Self::SlashDateTime => NaiveDateTime::parse_from_str(s, "%Y/%m/%d %H:%M:%S%.f").is_ok(),
        }
    }

    /// Anchored regex matching strings shaped like this layout: every digit
    /// of the reference text becomes `\d`, everything else is literal.
    pub fn validation_pattern(self) -> String {
        let mut out = String::from("^");
        for c in self.layout().chars() {
            if c.is_ascii_digit() {
                out.push_str(r"\d");
            } else {
                out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
            }
        }
        out.push('$');
        out
    }

    /// Word-only name for the layout, usable as a validator/tag key.
    pub fn tag_name(self) -> String {
        static DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());
        static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w]+").unwrap());
        let s = DASHES.replace_all(self.layout(), "_");
        NON_WORD.replace_all(&s, "").into_owned()
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl std::fmt::Display for TimestampFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.layout())
    }
}

impl Serialize for TimestampFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.layout())
    }
}

/// The layouts matched by the strings of an unbroken streak.
///
/// Each string contributes every layout it parses under; the node reports the
/// highest-priority layout any of its strings matched. Union does not depend on
/// the order strings arrive in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LayoutSet(u16);

impl LayoutSet {
    pub const EMPTY: LayoutSet = LayoutSet(0);

    /// Every layout that accepts `s`.
    pub fn matching(s: &str) -> LayoutSet {
        let mut out = LayoutSet::EMPTY;
        for format in TimestampFormat::ALL {
            if format.parses(s) {
                out.0 |= format.bit();
            }
        }
        out
    }

    pub fn union(self, other: LayoutSet) -> LayoutSet {
        LayoutSet(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, format: TimestampFormat) -> bool {
        self.0 & format.bit() != 0
    }

    /// Highest-priority layout in the set.
    pub fn first(self) -> Option<TimestampFormat> {
        self.iter().next()
    }

    pub fn iter(self) -> impl Iterator<Item = TimestampFormat> {
        TimestampFormat::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl Serialize for LayoutSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
