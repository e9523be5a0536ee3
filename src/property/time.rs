//! Calendar timestamps and ISO-8601 parsing

use chrono::{
    Datelike, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone,
    Timelike, Utc,
};
use regex::Regex;
use std::sync::LazyLock;

/// `YYYY-MM-DD` optionally followed by `THH[:MM[:SS]]`, anything after ignored
static ISO8601_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(-?\d+)-(\d+)-(\d+)(?:T(\d+)(?::(\d+)(?::(\d+))?)?)?").unwrap()
});

/// Calendar timestamp with second precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    /// Build from calendar fields, `None` if the fields are out of range
    pub fn from_ymd_hms(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        min: u32,
        sec: u32,
    ) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let time = NaiveTime::from_hms_opt(hour, min, sec)?;
        Some(Self(NaiveDateTime::new(date, time)))
    }

    /// Parse `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS` without any zone adjustment
    ///
    /// Date-only input yields midnight. Fractional seconds, a trailing `Z` and
    /// explicit offsets are ignored.
    pub fn parse_iso8601(input: &str) -> Option<Self> {
        if input.is_empty() {
            return None;
        }
        let caps = ISO8601_REGEX.captures(input)?;
        let field = |i: usize| -> Option<u32> {
            match caps.get(i) {
                Some(m) => m.as_str().parse().ok(),
                None => Some(0),
            }
        };

        let year: i32 = caps.get(1)?.as_str().parse().ok()?;
        Self::from_ymd_hms(year, field(2)?, field(3)?, field(4)?, field(5)?, field(6)?)
    }

    /// Wrap an existing naive date-time
    pub fn from_naive(naive: NaiveDateTime) -> Self {
        Self(naive)
    }

    /// The underlying naive date-time
    pub fn naive(&self) -> NaiveDateTime {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    pub fn second(&self) -> u32 {
        self.0.second()
    }

    /// Format as `YYYY-MM-DD`
    pub fn to_date_string(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    /// Format as `YYYY-MM-DDTHH:MM:SSZ`
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    /// Format with a caller-supplied strftime pattern
    pub fn format(&self, pattern: &str) -> String {
        self.0.format(pattern).to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_iso8601())
    }
}

/// Zone that upstream UTC timestamps are shifted into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalTime {
    /// The host's local zone, looked up per conversion
    #[default]
    System,
    /// A fixed offset from UTC
    Fixed(FixedOffset),
}

impl LocalTime {
    /// Fixed offset in minutes east of UTC, `None` if out of range
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(Self::Fixed)
    }

    /// UTC, no shift
    pub fn utc() -> Self {
        Self::Fixed(Utc.fix())
    }

    /// Shift a UTC timestamp into this zone
    ///
    /// `None` when the shifted value falls outside the representable range.
    pub fn adjust(&self, utc: Timestamp) -> Option<Timestamp> {
        let offset = match self {
            LocalTime::System => Local.offset_from_utc_datetime(&utc.naive()),
            LocalTime::Fixed(offset) => *offset,
        };
        utc.naive()
            .checked_add_signed(Duration::seconds(i64::from(offset.local_minus_utc())))
            .map(Timestamp)
    }

    /// Parse an ISO-8601 string and shift it into this zone
    pub fn parse(&self, input: &str) -> Option<Timestamp> {
        Timestamp::parse_iso8601(input).and_then(|ts| self.adjust(ts))
    }
}
