use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};


const SECOND_MS: i64 = 1_000;
const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 86_400_000;
const WEEK_MS: i64 = 604_800_000;
/// Months are a fixed 30 days
const MONTH_MS: i64 = 2_592_000_000;
/// Years are a fixed 365 days
const YEAR_MS: i64 = 31_536_000_000;

/// Units a duration can be expressed in, smallest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

/// A magnitude paired with its unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantity {
    pub magnitude: u64,
    pub unit: TimeUnit,
}

/// An age expressed in its largest fitting unit, with an optional
/// smaller-unit remainder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationBucket {
    pub magnitude: u64,
    pub unit: TimeUnit,
    pub remainder: Option<Quantity>,
}

/// Singular and plural words for every unit plus the trailing marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitWords {
    pub ago: String,
    pub second: String,
    pub seconds: String,
    pub minute: String,
    pub minutes: String,
    pub hour: String,
    pub hours: String,
    pub day: String,
    pub days: String,
    pub week: String,
    pub weeks: String,
    pub month: String,
    pub months: String,
    pub year: String,
    pub years: String,
}

impl Default for UnitWords {
    fn default() -> Self {
        Self {
            ago: "ago".to_string(),
            second: "second".to_string(),
            seconds: "seconds".to_string(),
            minute: "minute".to_string(),
            minutes: "minutes".to_string(),
            hour: "hour".to_string(),
            hours: "hours".to_string(),
            day: "day".to_string(),
            days: "days".to_string(),
            week: "week".to_string(),
            weeks: "weeks".to_string(),
            month: "month".to_string(),
            months: "months".to_string(),
            year: "year".to_string(),
            years: "years".to_string(),
        }
    }
}

impl UnitWords {
    /// Returns the word for `unit`, plural unless `magnitude` is exactly one
    pub fn word(&self, unit: TimeUnit, magnitude: u64) -> &str {
        let singular = magnitude == 1;
        match (unit, singular) {
            (TimeUnit::Second, true) => &self.second,
            (TimeUnit::Second, false) => &self.seconds,
            (TimeUnit::Minute, true) => &self.minute,
            (TimeUnit::Minute, false) => &self.minutes,
            (TimeUnit::Hour, true) => &self.hour,
            (TimeUnit::Hour, false) => &self.hours,
            (TimeUnit::Day, true) => &self.day,
            (TimeUnit::Day, false) => &self.days,
            (TimeUnit::Week, true) => &self.week,
            (TimeUnit::Week, false) => &self.weeks,
            (TimeUnit::Month, true) => &self.month,
            (TimeUnit::Month, false) => &self.months,
            (TimeUnit::Year, true) => &self.year,
            (TimeUnit::Year, false) => &self.years,
        }
    }
}

/// Picks the bucket for an age in milliseconds.
///
/// Boundaries are half-open and checked smallest unit first. Only the year
/// bucket carries a remainder (leftover whole months, when nonzero). The
/// hour bucket works out its leftover minutes but never reports them, which
/// keeps the rendered text identical to the long-standing widget output.
/// Negative ages are treated as zero.
pub fn bucket(age_ms: i64) -> DurationBucket {
    let age = age_ms.max(0);

    let (magnitude, unit, remainder) = if age < MINUTE_MS {
        (age / SECOND_MS, TimeUnit::Second, None)
    } else if age < HOUR_MS {
        (age / MINUTE_MS, TimeUnit::Minute, None)
    } else if age < DAY_MS {
        let hours = age / HOUR_MS;
        let _minutes = (age - hours * HOUR_MS) / MINUTE_MS;
        (hours, TimeUnit::Hour, None)
    } else if age < WEEK_MS {
        (age / DAY_MS, TimeUnit::Day, None)
    } else if age < MONTH_MS {
        (age / WEEK_MS, TimeUnit::Week, None)
    } else if age < YEAR_MS {
        (age / MONTH_MS, TimeUnit::Month, None)
    } else {
        let years = age / YEAR_MS;
        let months = (age - years * YEAR_MS) / MONTH_MS;
        let remainder = (months > 0).then_some(Quantity {
            magnitude: months as u64,
            unit: TimeUnit::Month,
        });
        (years, TimeUnit::Year, remainder)
    };

    DurationBucket {
        magnitude: magnitude as u64,
        unit,
        remainder,
    }
}

/// Inserts a `,` between every group of three digits, counting from the right
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn clause(magnitude: u64, unit: TimeUnit, words: &UnitWords) -> String {
    format!(
        "{}\u{00a0}{}",
        group_thousands(magnitude),
        words.word(unit, magnitude)
    )
}

impl DurationBucket {
    /// Renders the bucket, e.g. `1 year 2 months ago`
    pub fn render(&self, words: &UnitWords) -> String {
        let mut text = clause(self.magnitude, self.unit, words);
        if let Some(rest) = self.remainder {
            text.push(' ');
            text.push_str(&clause(rest.magnitude, rest.unit, words));
        }
        text.push(' ');
        text.push_str(&words.ago);
        text
    }
}

/// Formats how long ago `past` was, relative to `now`
pub fn format(now: DateTime<Utc>, past: DateTime<Utc>, words: &UnitWords) -> String {
    let age_ms = (now - past).num_milliseconds();
    bucket(age_ms).render(words)
}

/// Formats how long ago `past` was, relative to the current wall clock
pub fn format_since(past: DateTime<Utc>, words: &UnitWords) -> String {
    format(Utc::now(), past, words)
}
