use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime, TimeDelta, Utc};

use super::{invalid, reuse, FieldType, FieldValues};
use crate::datetime::{self, DateDelta, ParsedDateTime, RelativeDelta};
use crate::ty::FieldKind;
use crate::value::Value;
use crate::{NodeEdgeError, NodeEdgeResult};

fn timestamp(value: &Value) -> Option<f64> {
    match value {
        Value::Int(seconds) => Some(*seconds as f64),
        Value::Float(seconds) => Some(*seconds),
        _ => None,
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Date {
    values: FieldValues,
}

impl Date {
    pub fn today() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            values: FieldValues::both(Value::Date(date)),
        }
    }

    pub fn value(&self) -> Option<NaiveDate> {
        match self.values.python().as_ref() {
            Some(Value::Date(date)) => Some(*date),
            _ => None,
        }
    }
}

impl FieldType for Date {
    const KIND: FieldKind = FieldKind::Date;

    fn validate(raw: Value) -> NodeEdgeResult<Self> {
        if let Some(field) = reuse(&raw) {
            return Ok(field);
        }
        let date = match &raw {
            Value::Date(date) => *date,
            Value::NaiveDateTime(value) => value.date(),
            Value::AwareDateTime(value) => value.date_naive(),
            Value::Str(text) => datetime::parse_date(text)?,
            other => match timestamp(other) {
                Some(seconds) => datetime::from_timestamp(seconds)?.date_naive(),
                None => return Err(invalid(Self::KIND, other)),
            },
        };
        Ok(Self::from_date(date))
    }
}

impl_field!(Date);

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Time {
    values: FieldValues,
}

impl Time {
    pub fn now() -> Self {
        Self::from_time(Local::now().time())
    }

    pub fn from_time(time: NaiveTime) -> Self {
        Self {
            values: FieldValues::both(Value::Time(time)),
        }
    }

    pub fn value(&self) -> Option<NaiveTime> {
        match self.values.python().as_ref() {
            Some(Value::Time(time)) => Some(*time),
            _ => None,
        }
    }
}

impl FieldType for Time {
    const KIND: FieldKind = FieldKind::Time;

    fn validate(raw: Value) -> NodeEdgeResult<Self> {
        if let Some(field) = reuse(&raw) {
            return Ok(field);
        }
        match raw {
            Value::Time(time) => Ok(Self::from_time(time)),
            Value::Str(text) => Ok(Self::from_time(datetime::parse_time(&text)?)),
            other => Err(invalid(Self::KIND, &other)),
        }
    }
}

impl_field!(Time);

/// Date and time without offset. Offset-aware input is rejected.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NaiveDateTime {
    values: FieldValues,
}

impl NaiveDateTime {
    pub fn now() -> Self {
        Self::from_datetime(Local::now().naive_local())
    }

    pub fn from_datetime(value: chrono::NaiveDateTime) -> Self {
        Self {
            values: FieldValues::both(Value::NaiveDateTime(value)),
        }
    }

    pub fn value(&self) -> Option<chrono::NaiveDateTime> {
        match self.values.python().as_ref() {
            Some(Value::NaiveDateTime(value)) => Some(*value),
            _ => None,
        }
    }
}

fn aware_rejected() -> NodeEdgeError {
    NodeEdgeError::Value("datetime must not carry a UTC offset".to_string())
}

fn naive_rejected() -> NodeEdgeError {
    NodeEdgeError::Value("datetime must carry a UTC offset".to_string())
}

impl FieldType for NaiveDateTime {
    const KIND: FieldKind = FieldKind::NaiveDateTime;

    fn validate(raw: Value) -> NodeEdgeResult<Self> {
        if let Some(field) = reuse(&raw) {
            return Ok(field);
        }
        match &raw {
            Value::NaiveDateTime(value) => Ok(Self::from_datetime(*value)),
            Value::AwareDateTime(_) => Err(aware_rejected()),
            Value::Str(text) => match datetime::parse_datetime(text)? {
                ParsedDateTime::Naive(value) => Ok(Self::from_datetime(value)),
                ParsedDateTime::Aware(_) => Err(aware_rejected()),
            },
            other if timestamp(other).is_some() => Err(aware_rejected()),
            other => Err(invalid(Self::KIND, other)),
        }
    }
}

impl_field!(NaiveDateTime);

/// Date and time with a UTC offset. Naive input is rejected.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AwareDateTime {
    values: FieldValues,
}

impl AwareDateTime {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now().fixed_offset())
    }

    pub fn from_datetime(value: DateTime<FixedOffset>) -> Self {
        Self {
            values: FieldValues::both(Value::AwareDateTime(value)),
        }
    }

    pub fn value(&self) -> Option<DateTime<FixedOffset>> {
        match self.values.python().as_ref() {
            Some(Value::AwareDateTime(value)) => Some(*value),
            _ => None,
        }
    }
}

impl FieldType for AwareDateTime {
    const KIND: FieldKind = FieldKind::AwareDateTime;

    fn validate(raw: Value) -> NodeEdgeResult<Self> {
        if let Some(field) = reuse(&raw) {
            return Ok(field);
        }
        match &raw {
            Value::AwareDateTime(value) => Ok(Self::from_datetime(*value)),
            Value::NaiveDateTime(_) => Err(naive_rejected()),
            Value::Str(text) => match datetime::parse_datetime(text)? {
                ParsedDateTime::Aware(value) => Ok(Self::from_datetime(value)),
                ParsedDateTime::Naive(_) => Err(naive_rejected()),
            },
            other => match timestamp(other) {
                Some(seconds) => Ok(Self::from_datetime(
                    datetime::from_timestamp(seconds)?.fixed_offset(),
                )),
                None => Err(invalid(Self::KIND, other)),
            },
        }
    }
}

impl_field!(AwareDateTime);

/// Exact time span. Serializes as human readable text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Duration {
    values: FieldValues,
}

impl Duration {
    pub fn value(&self) -> Option<TimeDelta> {
        match self.values.python().as_ref() {
            Some(Value::Duration(value)) => Some(*value),
            _ => None,
        }
    }
}

impl FieldType for Duration {
    const KIND: FieldKind = FieldKind::Duration;

    fn validate(raw: Value) -> NodeEdgeResult<Self> {
        if let Some(field) = reuse(&raw) {
            return Ok(field);
        }
        match raw {
            Value::Duration(value) => Ok(Self {
                values: FieldValues::both(Value::Duration(value)),
            }),
            other => Err(invalid(Self::KIND, &other)),
        }
    }
}

impl_field!(Duration);

/// Calendar relative span. The python value is the ISO 8601 text,
/// the db value the parsed [`RelativeDelta`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelativeDuration {
    values: FieldValues,
}

impl RelativeDuration {
    pub fn delta(&self) -> Option<RelativeDelta> {
        match self.values.db().as_ref() {
            Some(Value::RelativeDuration(delta)) => Some(*delta),
            _ => None,
        }
    }

    pub fn months(&self) -> Option<i32> {
        self.delta().map(|delta| delta.months)
    }

    pub fn days(&self) -> Option<i32> {
        self.delta().map(|delta| delta.days)
    }

    pub fn microseconds(&self) -> Option<i64> {
        self.delta().map(|delta| delta.microseconds)
    }
}

impl FieldType for RelativeDuration {
    const KIND: FieldKind = FieldKind::RelativeDuration;

    fn validate(raw: Value) -> NodeEdgeResult<Self> {
        if let Some(field) = reuse(&raw) {
            return Ok(field);
        }
        let (text, delta) = match raw {
            Value::Str(text) => {
                let delta = datetime::parse_relative_duration(&text)?;
                (text, delta)
            }
            Value::RelativeDuration(delta) => (delta.to_string(), delta),
            other => return Err(invalid(Self::KIND, &other)),
        };
        Ok(Self {
            values: FieldValues::split(Value::Str(text), Value::RelativeDuration(delta)),
        })
    }
}

impl_field!(RelativeDuration, |field: &RelativeDuration| field.values.db_json(field));

/// Months and days span. The python value is the ISO 8601 text,
/// the db value the parsed [`DateDelta`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DateDuration {
    values: FieldValues,
}

impl DateDuration {
    pub fn delta(&self) -> Option<DateDelta> {
        match self.values.db().as_ref() {
            Some(Value::DateDuration(delta)) => Some(*delta),
            _ => None,
        }
    }

    pub fn months(&self) -> Option<i32> {
        self.delta().map(|delta| delta.months)
    }

    pub fn days(&self) -> Option<i32> {
        self.delta().map(|delta| delta.days)
    }
}

impl FieldType for DateDuration {
    const KIND: FieldKind = FieldKind::DateDuration;

    fn validate(raw: Value) -> NodeEdgeResult<Self> {
        if let Some(field) = reuse(&raw) {
            return Ok(field);
        }
        let (text, delta) = match raw {
            Value::Str(text) => {
                let delta = datetime::parse_date_duration(&text)?;
                (text, delta)
            }
            Value::DateDuration(delta) => (delta.to_string(), delta),
            other => return Err(invalid(Self::KIND, &other)),
        };
        Ok(Self {
            values: FieldValues::split(Value::Str(text), Value::DateDuration(delta)),
        })
    }
}

impl_field!(DateDuration, |field: &DateDuration| field.values.db_json(field));
