//!
//! Calendar helpers: ISO 8601 duration text, timezone awareness and
//! ISO formatting.
//!

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone, Timelike,
    Utc,
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{NodeEdgeError, NodeEdgeResult};

const MICROS_PER_SECOND: u64 = 1_000_000;
const MICROS_PER_MINUTE: u64 = 60 * MICROS_PER_SECOND;
const MICROS_PER_HOUR: u64 = 60 * MICROS_PER_MINUTE;

static RELATIVE_DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^P(?:(?P<years>-?\d+)Y)?(?:(?P<months>-?\d+)M)?(?:(?P<days>-?\d+)D)?",
        r"(?:T(?:(?P<hours>-?\d+)H)?(?:(?P<minutes>-?\d+)M)?",
        r"(?:(?P<seconds>-?\d+)(?:\.(?P<fraction>\d{1,6}))?S)?)?$",
    ))
    .unwrap()
});

static DATE_DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?:(?P<years>-?\d+)Y)?(?:(?P<months>-?\d+)M)?(?:(?P<days>-?\d+)D)?$").unwrap()
});

/// Calendar aware duration: months and days are kept apart from the
/// exact time part.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct RelativeDelta {
    pub months: i32,
    pub days: i32,
    pub microseconds: i64,
}

impl RelativeDelta {
    pub const fn new(months: i32, days: i32, microseconds: i64) -> Self {
        Self {
            months,
            days,
            microseconds,
        }
    }

    pub fn negated(self) -> Self {
        Self {
            months: -self.months,
            days: -self.days,
            microseconds: -self.microseconds,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.months == 0 && self.days == 0 && self.microseconds == 0
    }
}

impl fmt::Display for RelativeDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_relative_duration(
            self.months,
            self.days,
            self.microseconds,
        ))
    }
}

impl FromStr for RelativeDelta {
    type Err = NodeEdgeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        parse_relative_duration(text)
    }
}

/// Months and days only.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct DateDelta {
    pub months: i32,
    pub days: i32,
}

impl DateDelta {
    pub const fn new(months: i32, days: i32) -> Self {
        Self { months, days }
    }
}

impl fmt::Display for DateDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_date_duration(self.months, self.days))
    }
}

impl FromStr for DateDelta {
    type Err = NodeEdgeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        parse_date_duration(text)
    }
}

fn invalid_duration(text: &str) -> NodeEdgeError {
    NodeEdgeError::Value(format!("invalid ISO 8601 duration: {:?}", text))
}

fn parse_component(captures: &regex::Captures, name: &str, text: &str) -> NodeEdgeResult<i64> {
    match captures.name(name) {
        Some(found) => found
            .as_str()
            .parse::<i64>()
            .map_err(|_| invalid_duration(text)),
        None => Ok(0),
    }
}

fn calendar_months(years: i64, months: i64, text: &str) -> NodeEdgeResult<i32> {
    years
        .checked_mul(12)
        .and_then(|months_of_years| months_of_years.checked_add(months))
        .and_then(|total| i32::try_from(total).ok())
        .ok_or_else(|| invalid_duration(text))
}

/// Parse `P[nY][nM][nD][T[nH][nM][n[.f]S]]`.
///
/// Time components carry a magnitude each; the sign of the last present
/// time component applies to the whole time part.
pub fn parse_relative_duration(text: &str) -> NodeEdgeResult<RelativeDelta> {
    let captures = RELATIVE_DURATION_RE
        .captures(text)
        .ok_or_else(|| invalid_duration(text))?;

    let has_date = ["years", "months", "days"]
        .iter()
        .any(|name| captures.name(name).is_some());
    let time_parts: Vec<_> = ["hours", "minutes", "seconds"]
        .iter()
        .filter_map(|name| captures.name(name))
        .collect();
    if !has_date && time_parts.is_empty() {
        return Err(invalid_duration(text));
    }
    if text.contains('T') && time_parts.is_empty() {
        return Err(invalid_duration(text));
    }

    let months = calendar_months(
        parse_component(&captures, "years", text)?,
        parse_component(&captures, "months", text)?,
        text,
    )?;
    let days = i32::try_from(parse_component(&captures, "days", text)?)
        .map_err(|_| invalid_duration(text))?;

    let fraction = match captures.name("fraction") {
        Some(found) => {
            let digits = found.as_str();
            let value: u64 = digits.parse().map_err(|_| invalid_duration(text))?;
            value * 10u64.pow(6 - digits.len() as u32)
        }
        None => 0,
    };

    let magnitude = parse_component(&captures, "hours", text)?
        .unsigned_abs()
        .checked_mul(MICROS_PER_HOUR)
        .and_then(|micros| {
            parse_component(&captures, "minutes", text)
                .ok()?
                .unsigned_abs()
                .checked_mul(MICROS_PER_MINUTE)?
                .checked_add(micros)
        })
        .and_then(|micros| {
            parse_component(&captures, "seconds", text)
                .ok()?
                .unsigned_abs()
                .checked_mul(MICROS_PER_SECOND)?
                .checked_add(micros)
        })
        .and_then(|micros| micros.checked_add(fraction))
        .and_then(|micros| i64::try_from(micros).ok())
        .ok_or_else(|| invalid_duration(text))?;

    let negative = time_parts
        .last()
        .map(|part| part.as_str().starts_with('-'))
        .unwrap_or(false);

    Ok(RelativeDelta {
        months,
        days,
        microseconds: if negative { -magnitude } else { magnitude },
    })
}

/// Canonical text of a relative duration. The time section is always
/// present, `T0S` when the time part is zero.
pub fn format_relative_duration(months: i32, days: i32, microseconds: i64) -> String {
    let mut text = String::from("P");
    push_calendar(&mut text, months, days);

    text.push('T');
    if microseconds == 0 {
        text.push_str("0S");
        return text;
    }

    let sign = if microseconds < 0 { "-" } else { "" };
    let magnitude = microseconds.unsigned_abs();
    let hours = magnitude / MICROS_PER_HOUR;
    let minutes = magnitude / MICROS_PER_MINUTE % 60;
    let seconds = magnitude / MICROS_PER_SECOND % 60;
    let fraction = magnitude % MICROS_PER_SECOND;

    if hours != 0 {
        text.push_str(&format!("{}{}H", sign, hours));
    }
    if minutes != 0 {
        text.push_str(&format!("{}{}M", sign, minutes));
    }
    if seconds != 0 || fraction != 0 {
        text.push_str(&format!("{}{}", sign, seconds));
        if fraction != 0 {
            let digits = format!("{:06}", fraction);
            text.push('.');
            text.push_str(digits.trim_end_matches('0'));
        }
        text.push('S');
    }
    text
}

/// Parse `P[nY][nM][nD]`. `PT0S` is accepted as zero.
pub fn parse_date_duration(text: &str) -> NodeEdgeResult<DateDelta> {
    if text == "PT0S" {
        return Ok(DateDelta::default());
    }
    let captures = DATE_DURATION_RE
        .captures(text)
        .ok_or_else(|| invalid_duration(text))?;
    if text == "P" {
        return Err(invalid_duration(text));
    }

    let months = calendar_months(
        parse_component(&captures, "years", text)?,
        parse_component(&captures, "months", text)?,
        text,
    )?;
    let days = i32::try_from(parse_component(&captures, "days", text)?)
        .map_err(|_| invalid_duration(text))?;

    Ok(DateDelta { months, days })
}

/// Canonical text of a date duration, `P0D` when zero.
pub fn format_date_duration(months: i32, days: i32) -> String {
    if months == 0 && days == 0 {
        return "P0D".to_string();
    }
    let mut text = String::from("P");
    push_calendar(&mut text, months, days);
    text
}

fn push_calendar(text: &mut String, months: i32, days: i32) {
    let years = months / 12;
    let months = months % 12;
    if years != 0 {
        text.push_str(&format!("{}Y", years));
    }
    if months != 0 {
        text.push_str(&format!("{}M", months));
    }
    if days != 0 {
        text.push_str(&format!("{}D", days));
    }
}

/// Human readable duration, e.g. `1 hours 2 minutes 3 seconds`.
pub fn format_duration(duration: &TimeDelta) -> String {
    let negative = *duration < TimeDelta::zero();
    let magnitude = duration.abs();
    let total_seconds = magnitude.num_seconds();
    let microseconds = magnitude.subsec_nanos() / 1000;

    let hours = total_seconds / 3600;
    let minutes = total_seconds % 3600 / 60;
    let seconds = total_seconds % 60;

    let mut parts = vec![];
    if hours != 0 {
        parts.push(format!("{} hours", hours));
    }
    if minutes != 0 {
        parts.push(format!("{} minutes", minutes));
    }
    if seconds != 0 {
        parts.push(format!("{} seconds", seconds));
    }
    if microseconds != 0 {
        parts.push(format!("{} microseconds", microseconds));
    }

    if parts.is_empty() {
        return "0 seconds".to_string();
    }
    let text = parts.join(" ");
    if negative {
        format!("-{}", text)
    } else {
        text
    }
}

/// Parsed date-time text, with or without offset.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParsedDateTime {
    Naive(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const AWARE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%z"];

pub fn parse_datetime(text: &str) -> NodeEdgeResult<ParsedDateTime> {
    let text = text.trim();
    if let Ok(aware) = DateTime::parse_from_rfc3339(text) {
        return Ok(ParsedDateTime::Aware(aware));
    }
    for format in AWARE_FORMATS {
        if let Ok(aware) = DateTime::parse_from_str(text, format) {
            return Ok(ParsedDateTime::Aware(aware));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(ParsedDateTime::Naive(naive));
        }
    }
    Err(NodeEdgeError::Value(format!("invalid datetime format: {:?}", text)))
}

pub fn parse_date(text: &str) -> NodeEdgeResult<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| NodeEdgeError::Value(format!("invalid date format: {:?}", text)))
}

pub fn parse_time(text: &str) -> NodeEdgeResult<NaiveTime> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .map_err(|_| NodeEdgeError::Value(format!("invalid time format: {:?}", text)))
}

/// Unix timestamp in seconds, or milliseconds when too large to be seconds.
pub fn from_timestamp(timestamp: f64) -> NodeEdgeResult<DateTime<Utc>> {
    const MS_WATERSHED: f64 = 2e10;

    if !timestamp.is_finite() {
        return Err(NodeEdgeError::Value(format!("invalid timestamp: {}", timestamp)));
    }
    let seconds = if timestamp.abs() > MS_WATERSHED {
        timestamp / 1000.0
    } else {
        timestamp
    };
    let whole = seconds.trunc();
    let nanos = ((seconds - whole) * 1e9).round() as i64;
    DateTime::from_timestamp(whole as i64, 0)
        .and_then(|at| at.checked_add_signed(TimeDelta::nanoseconds(nanos)))
        .ok_or_else(|| NodeEdgeError::Value(format!("timestamp out of range: {}", timestamp)))
}

pub fn make_aware(value: NaiveDateTime, offset: Option<FixedOffset>) -> NodeEdgeResult<DateTime<FixedOffset>> {
    let offset = offset.unwrap_or_else(utc_offset);
    offset
        .from_local_datetime(&value)
        .single()
        .ok_or_else(|| NodeEdgeError::Value(format!("ambiguous local time: {}", value)))
}

/// Local time at `offset` (UTC when absent), without the offset.
pub fn make_naive(value: DateTime<FixedOffset>, offset: Option<FixedOffset>) -> NaiveDateTime {
    let offset = offset.unwrap_or_else(utc_offset);
    value.with_timezone(&offset).naive_local()
}

pub fn utc_offset() -> FixedOffset {
    Utc.fix()
}

pub fn isoformat_date(value: &NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub fn isoformat_time(value: &NaiveTime) -> String {
    if value.nanosecond() / 1000 == 0 {
        value.format("%H:%M:%S").to_string()
    } else {
        format!("{}.{:06}", value.format("%H:%M:%S"), value.nanosecond() / 1000)
    }
}

pub fn isoformat_naive(value: &NaiveDateTime) -> String {
    format!("{}T{}", isoformat_date(&value.date()), isoformat_time(&value.time()))
}

pub fn isoformat_aware(value: &DateTime<FixedOffset>) -> String {
    format!("{}{}", isoformat_naive(&value.naive_local()), value.offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn relative_duration_text() {
        let delta = parse_relative_duration("P1Y3M34DT0S").unwrap();
        assert_eq!(delta, RelativeDelta::new(15, 34, 0));
        assert_eq!(delta.to_string(), "P1Y3M34DT0S");

        assert_eq!(
            parse_relative_duration("PT1H30M").unwrap(),
            RelativeDelta::new(0, 0, 90 * 60 * 1_000_000)
        );
        assert_eq!(
            parse_relative_duration("PT-1M-30S").unwrap().microseconds,
            -90_000_000
        );
        assert_eq!(
            parse_relative_duration("PT1.5S").unwrap().to_string(),
            "PT1.5S"
        );
        assert_eq!(parse_relative_duration("PT0S").unwrap(), RelativeDelta::default());
    }

    #[test]
    fn invalid_relative_duration_text() {
        for text in ["", "P", "PT", "P1DT", "1Y", "P1.5Y", "PT1.1234567S", "P1W"] {
            assert!(parse_relative_duration(text).is_err(), "{}", text);
        }
    }

    #[test]
    fn date_duration_text() {
        assert_eq!(parse_date_duration("P1Y2D").unwrap(), DateDelta::new(12, 2));
        assert_eq!(parse_date_duration("PT0S").unwrap(), DateDelta::default());
        assert_eq!(DateDelta::default().to_string(), "P0D");
        assert_eq!(DateDelta::new(-15, 3).to_string(), "P-1Y-3M3D");
        assert!(parse_date_duration("P").is_err());
        assert!(parse_date_duration("P1DT1H").is_err());
    }

    #[test]
    fn human_duration() {
        let duration = TimeDelta::seconds(3723) + TimeDelta::microseconds(5);
        assert_eq!(
            format_duration(&duration),
            "1 hours 2 minutes 3 seconds 5 microseconds"
        );
        assert_eq!(format_duration(&TimeDelta::zero()), "0 seconds");
        assert_eq!(format_duration(&TimeDelta::seconds(-90)), "-1 minutes 30 seconds");
    }

    #[test]
    fn awareness() {
        let naive = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let aware = make_aware(naive, None).unwrap();
        assert_eq!(isoformat_aware(&aware), "2024-01-02T03:04:05+00:00");
        assert_eq!(make_naive(aware, None), naive);

        assert!(matches!(
            parse_datetime("2024-01-02T03:04:05Z").unwrap(),
            ParsedDateTime::Aware(_)
        ));
        assert_eq!(
            parse_datetime("2024-01-02 03:04:05").unwrap(),
            ParsedDateTime::Naive(naive)
        );
    }

    #[test]
    fn timestamps() {
        assert_eq!(from_timestamp(0.0).unwrap().timestamp(), 0);
        assert_eq!(from_timestamp(86_400_000_000.0).unwrap().timestamp(), 86_400_000);
        for timestamp in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(from_timestamp(timestamp), Err(NodeEdgeError::Value(_))));
        }
    }

    #[test]
    fn iso_time_fraction() {
        let time = NaiveTime::from_hms_micro_opt(1, 2, 3, 400).unwrap();
        assert_eq!(isoformat_time(&time), "01:02:03.000400");
    }

    proptest! {
        #[test]
        fn relative_duration_text_round_trips(
            months in -1200i32..1200,
            days in -1000i32..1000,
            microseconds in -1_000_000_000_000i64..1_000_000_000_000,
        ) {
            let text = format_relative_duration(months, days, microseconds);
            let parsed = parse_relative_duration(&text).unwrap();
            prop_assert_eq!(parsed, RelativeDelta::new(months, days, microseconds));
        }

        #[test]
        fn date_duration_text_round_trips(months in -1200i32..1200, days in -1000i32..1000) {
            let text = format_date_duration(months, days);
            prop_assert_eq!(parse_date_duration(&text).unwrap(), DateDelta::new(months, days));
        }
    }
}
