//!
//! Dynamic values and the value container capability.
//!

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Neg;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use num_bigint::BigInt;
use once_cell::sync::OnceCell;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::backends::RawRecord;
use crate::clone::{downcast, AttrValue, Cloneable, InitArgs, Overrides, Param};
use crate::datetime::{self, DateDelta, RelativeDelta};
use crate::field::Field;
use crate::model::ModelInstance;
use crate::{NodeEdgeError, NodeEdgeResult};

/// Name of the attribute holding the bound value.
pub const VALUE_ATTR: &str = "value";

/// A present or absent value. `Unset` is distinct from [`Value::Null`].
#[derive(Clone, Debug, PartialEq)]
pub enum Slot<T> {
    Unset,
    Present(T),
}

impl<T> Slot<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Self::Present(value) => Some(value),
            Self::Unset => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Present(value) => Some(value),
            Self::Unset => None,
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<T> From<Option<T>> for Slot<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Present(value),
            None => Self::Unset,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    BigInt,
    Float,
    Decimal,
    Str,
    Bytes,
    Uuid,
    Date,
    Time,
    NaiveDateTime,
    AwareDateTime,
    Duration,
    RelativeDuration,
    DateDuration,
    Json,
    List,
    Tuple,
    Set,
    NamedTuple,
    Field,
    Model,
    Record,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::BigInt => "bigint",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Str => "str",
            Self::Bytes => "bytes",
            Self::Uuid => "uuid",
            Self::Date => "date",
            Self::Time => "time",
            Self::NaiveDateTime => "naive_datetime",
            Self::AwareDateTime => "aware_datetime",
            Self::Duration => "duration",
            Self::RelativeDuration => "relative_duration",
            Self::DateDuration => "date_duration",
            Self::Json => "json",
            Self::List => "list",
            Self::Tuple => "tuple",
            Self::Set => "set",
            Self::NamedTuple => "named_tuple",
            Self::Field => "field",
            Self::Model => "model",
            Self::Record => "record",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepted value kinds. The empty set accepts anything.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ValueTypeSet(BTreeSet<ValueKind>);

impl ValueTypeSet {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn of(kinds: impl IntoIterator<Item = ValueKind>) -> Self {
        Self(kinds.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, kind: ValueKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn accepts(&self, kind: ValueKind) -> bool {
        self.is_empty() || self.contains(kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = ValueKind> + '_ {
        self.0.iter().copied()
    }
}

#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    BigInt(BigInt),
    Float(f64),
    Decimal(Decimal),
    Str(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    NaiveDateTime(NaiveDateTime),
    AwareDateTime(DateTime<FixedOffset>),
    Duration(TimeDelta),
    RelativeDuration(RelativeDelta),
    DateDuration(DateDelta),
    Json(serde_json::Value),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Set(Vec<Value>),
    NamedTuple(Vec<(String, Value)>),
    Field(Arc<dyn Field>),
    Model(Arc<ModelInstance>),
    Record(RawRecord),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::BigInt(_) => ValueKind::BigInt,
            Self::Float(_) => ValueKind::Float,
            Self::Decimal(_) => ValueKind::Decimal,
            Self::Str(_) => ValueKind::Str,
            Self::Bytes(_) => ValueKind::Bytes,
            Self::Uuid(_) => ValueKind::Uuid,
            Self::Date(_) => ValueKind::Date,
            Self::Time(_) => ValueKind::Time,
            Self::NaiveDateTime(_) => ValueKind::NaiveDateTime,
            Self::AwareDateTime(_) => ValueKind::AwareDateTime,
            Self::Duration(_) => ValueKind::Duration,
            Self::RelativeDuration(_) => ValueKind::RelativeDuration,
            Self::DateDuration(_) => ValueKind::DateDuration,
            Self::Json(_) => ValueKind::Json,
            Self::List(_) => ValueKind::List,
            Self::Tuple(_) => ValueKind::Tuple,
            Self::Set(_) => ValueKind::Set,
            Self::NamedTuple(_) => ValueKind::NamedTuple,
            Self::Field(_) => ValueKind::Field,
            Self::Model(_) => ValueKind::Model,
            Self::Record(_) => ValueKind::Record,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(text) => Some(text),
            _ => None,
        }
    }

    /// Elements of a sequence value, or the value itself as a single element.
    pub fn into_list(self) -> Vec<Value> {
        match self {
            Self::List(items) | Self::Tuple(items) | Self::Set(items) => items,
            other => vec![other],
        }
    }

    pub fn positive(&self) -> NodeEdgeResult<Value> {
        match self {
            Self::Bool(value) => Ok(Self::Int(*value as i64)),
            Self::Int(_)
            | Self::BigInt(_)
            | Self::Float(_)
            | Self::Decimal(_)
            | Self::Duration(_)
            | Self::RelativeDuration(_) => Ok(self.clone()),
            other => Err(NodeEdgeError::Type(format!(
                "bad operand type for unary +: '{}'",
                other.kind()
            ))),
        }
    }

    pub fn negative(&self) -> NodeEdgeResult<Value> {
        match self {
            Self::Bool(value) => Ok(Self::Int(-(*value as i64))),
            Self::Int(value) => value.checked_neg().map(Self::Int).ok_or_else(|| {
                NodeEdgeError::Value(format!("integer overflow negating {}", value))
            }),
            Self::BigInt(value) => Ok(Self::BigInt(-value)),
            Self::Float(value) => Ok(Self::Float(-value)),
            Self::Decimal(value) => Ok(Self::Decimal(-*value)),
            Self::Duration(value) => Ok(Self::Duration(-*value)),
            Self::RelativeDuration(value) => Ok(Self::RelativeDuration(value.negated())),
            other => Err(NodeEdgeError::Type(format!(
                "bad operand type for unary -: '{}'",
                other.kind()
            ))),
        }
    }

    /// JSON-compatible projection.
    pub fn to_json(&self) -> NodeEdgeResult<serde_json::Value> {
        use serde_json::Value as Json;

        Ok(match self {
            Self::Null => Json::Null,
            Self::Bool(value) => Json::Bool(*value),
            Self::Int(value) => Json::from(*value),
            Self::BigInt(value) => Json::String(value.to_string()),
            Self::Float(value) => serde_json::Number::from_f64(*value)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Self::Decimal(value) => Json::String(value.to_string()),
            Self::Str(value) => Json::String(value.clone()),
            Self::Bytes(value) => Json::String(
                String::from_utf8(value.clone())
                    .map_err(|_| NodeEdgeError::Value("bytes are not valid utf-8".into()))?,
            ),
            Self::Uuid(value) => Json::String(value.hyphenated().to_string()),
            Self::Date(value) => Json::String(datetime::isoformat_date(value)),
            Self::Time(value) => Json::String(datetime::isoformat_time(value)),
            Self::NaiveDateTime(value) => Json::String(datetime::isoformat_naive(value)),
            Self::AwareDateTime(value) => Json::String(datetime::isoformat_aware(value)),
            Self::Duration(value) => Json::String(datetime::format_duration(value)),
            Self::RelativeDuration(value) => Json::String(value.to_string()),
            Self::DateDuration(value) => Json::String(value.to_string()),
            Self::Json(value) => value.clone(),
            Self::List(items) | Self::Tuple(items) | Self::Set(items) => Json::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<NodeEdgeResult<_>>()?,
            ),
            Self::NamedTuple(items) => Json::Object(
                items
                    .iter()
                    .map(|(name, value)| Ok((name.clone(), value.to_json()?)))
                    .collect::<NodeEdgeResult<_>>()?,
            ),
            Self::Field(field) => field.as_jsonable_value()?,
            Self::Model(model) => model.as_jsonable_value()?,
            Self::Record(record) => record.to_json()?,
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::BigInt(a), Self::BigInt(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Uuid(a), Self::Uuid(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Time(a), Self::Time(b)) => a == b,
            (Self::NaiveDateTime(a), Self::NaiveDateTime(b)) => a == b,
            (Self::AwareDateTime(a), Self::AwareDateTime(b)) => a == b,
            (Self::Duration(a), Self::Duration(b)) => a == b,
            (Self::RelativeDuration(a), Self::RelativeDuration(b)) => a == b,
            (Self::DateDuration(a), Self::DateDuration(b)) => a == b,
            (Self::Json(a), Self::Json(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Tuple(a), Self::Tuple(b)) => a == b,
            (Self::Set(a), Self::Set(b)) => a == b,
            (Self::NamedTuple(a), Self::NamedTuple(b)) => a == b,
            (Self::Field(a), Self::Field(b)) => Arc::ptr_eq(a, b),
            (Self::Model(a), Self::Model(b)) => Arc::ptr_eq(a, b) || a == b,
            (Self::Record(a), Self::Record(b)) => a == b,
            _ => false,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    BigInt => BigInt,
    Decimal => Decimal,
    &str => Str,
    String => Str,
    Uuid => Uuid,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => NaiveDateTime,
    DateTime<FixedOffset> => AwareDateTime,
    TimeDelta => Duration,
    RelativeDelta => RelativeDuration,
    DateDelta => DateDuration,
    serde_json::Value => Json,
    Vec<Value> => List,
    Arc<dyn Field> => Field,
    Arc<ModelInstance> => Model,
    RawRecord => Record,
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::AwareDateTime(value.fixed_offset())
    }
}

impl From<ModelInstance> for Value {
    fn from(value: ModelInstance) -> Self {
        Self::Model(Arc::new(value))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Self::Null,
        }
    }
}

/// Compile-time declaration of the value kinds a container accepts.
pub trait DeclaredTypes: Send + Sync + 'static {
    fn declared() -> ValueTypeSet;
}

/// Accepts any value.
#[derive(Debug)]
pub struct Untyped;

impl DeclaredTypes for Untyped {
    fn declared() -> ValueTypeSet {
        ValueTypeSet::any()
    }
}

/// Capability of holding one checked value.
pub trait Valueable: Cloneable {
    fn value(&self) -> &Slot<Value>;

    /// Accepted value kinds, resolved lazily on first use.
    fn value_type(&self) -> &ValueTypeSet;

    fn check_value(&self, value: &Value) -> NodeEdgeResult<()> {
        if self.value_type().accepts(value.kind()) {
            Ok(())
        } else {
            Err(NodeEdgeError::Type(format!(
                "bad operand type for bind: '{}'",
                value.kind()
            )))
        }
    }

    /// A copy holding `value`.
    fn set_value(&self, value: impl Into<Value>) -> NodeEdgeResult<Self> {
        let value = value.into();
        self.check_value(&value)?;
        self.clone_with(Overrides::new().attr(VALUE_ATTR, Slot::Present(value)))
    }

    fn positive(&self) -> NodeEdgeResult<Self> {
        let value = present_value(self, "+")?.positive()?;
        self.clone_with(Overrides::new().attr(VALUE_ATTR, Slot::Present(value)))
    }

    fn negative(&self) -> NodeEdgeResult<Self> {
        let value = present_value(self, "-")?.negative()?;
        self.clone_with(Overrides::new().attr(VALUE_ATTR, Slot::Present(value)))
    }
}

fn present_value<'a, V: Valueable>(valueable: &'a V, operator: &str) -> NodeEdgeResult<&'a Value> {
    valueable.value().as_ref().ok_or_else(|| {
        NodeEdgeError::Type(format!("bad operand type for unary {}: 'unset'", operator))
    })
}

/// A standalone [`Valueable`] whose accepted kinds are declared by `D`.
pub struct ValueContainer<D: DeclaredTypes = Untyped> {
    value: Slot<Value>,
    value_type: OnceCell<ValueTypeSet>,
    declared: std::marker::PhantomData<D>,
}

impl<D: DeclaredTypes> ValueContainer<D> {
    pub fn new(value: impl Into<Value>) -> NodeEdgeResult<Self> {
        let value = value.into();
        let container = Self::unset();
        container.check_value(&value)?;
        Ok(Self {
            value: Slot::Present(value),
            ..container
        })
    }

    pub fn unset() -> Self {
        Self {
            value: Slot::Unset,
            value_type: OnceCell::new(),
            declared: std::marker::PhantomData,
        }
    }
}

impl<D: DeclaredTypes> Clone for ValueContainer<D> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            value_type: self.value_type.clone(),
            declared: std::marker::PhantomData,
        }
    }
}

impl<D: DeclaredTypes> fmt::Debug for ValueContainer<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueContainer")
            .field("value", &self.value)
            .finish()
    }
}

impl<D: DeclaredTypes> PartialEq for ValueContainer<D> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<D: DeclaredTypes> Cloneable for ValueContainer<D> {
    fn signature() -> &'static [Param] {
        const SIGNATURE: &[Param] = &[Param::positional(VALUE_ATTR)];
        SIGNATURE
    }

    fn get_attr(&self, name: &str) -> Option<AttrValue> {
        match name {
            VALUE_ATTR => Some(Box::new(self.value.clone())),
            _ => None,
        }
    }

    fn set_attr(&mut self, name: &str, value: AttrValue) -> NodeEdgeResult<()> {
        match name {
            VALUE_ATTR => {
                self.value = downcast(name, value)?;
                Ok(())
            }
            _ => Err(NodeEdgeError::Type(format!(
                "ValueContainer has no attribute '{}'",
                name
            ))),
        }
    }

    fn construct(mut args: InitArgs) -> NodeEdgeResult<Self> {
        match args.take::<Slot<Value>>(VALUE_ATTR)? {
            Slot::Present(value) => Self::new(value),
            Slot::Unset => Ok(Self::unset()),
        }
    }
}

impl<D: DeclaredTypes> Valueable for ValueContainer<D> {
    fn value(&self) -> &Slot<Value> {
        &self.value
    }

    fn value_type(&self) -> &ValueTypeSet {
        self.value_type.get_or_init(D::declared)
    }
}

impl<D: DeclaredTypes> Neg for &ValueContainer<D> {
    type Output = NodeEdgeResult<ValueContainer<D>>;

    fn neg(self) -> Self::Output {
        self.negative()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct IntOnly;

    impl DeclaredTypes for IntOnly {
        fn declared() -> ValueTypeSet {
            ValueTypeSet::of([ValueKind::Int])
        }
    }

    #[test]
    fn declared_types_reject_other_kinds() {
        let error = ValueContainer::<IntOnly>::new("hello").unwrap_err();
        assert_eq!(
            error,
            NodeEdgeError::Type("bad operand type for bind: 'str'".into())
        );
    }

    #[test]
    fn set_value_returns_a_new_container() {
        let original = ValueContainer::<IntOnly>::new(1).unwrap();
        let updated = original.set_value(2).unwrap();
        assert_eq!(original.value(), &Slot::Present(Value::Int(1)));
        assert_eq!(updated.value(), &Slot::Present(Value::Int(2)));
        assert!(original.set_value("nope").is_err());
    }

    #[test]
    fn negation() {
        let container = ValueContainer::<Untyped>::new(5).unwrap();
        let negated = (-&container).unwrap();
        assert_eq!(negated.value(), &Slot::Present(Value::Int(-5)));
        assert_eq!(
            container.positive().unwrap().value(),
            &Slot::Present(Value::Int(5))
        );
    }

    #[test]
    fn double_negation_restores_the_value() {
        let container = ValueContainer::<Untyped>::new(7).unwrap();
        let negated = (-&container).unwrap();
        let restored = (-&negated).unwrap();
        assert_eq!(restored.value(), container.value());
        assert_eq!(container.value(), &Slot::Present(Value::Int(7)));
        assert_eq!(negated.value(), &Slot::Present(Value::Int(-7)));
    }

    #[test]
    fn negating_text_is_a_type_error() {
        let container = ValueContainer::<Untyped>::new("text").unwrap();
        assert!(matches!(container.negative(), Err(NodeEdgeError::Type(_))));
    }

    #[test]
    fn unset_container() {
        let container = ValueContainer::<Untyped>::unset();
        assert!(!container.value().is_set());
        assert!(container.negative().is_err());
        let cloned = container.clone_with(Overrides::new()).unwrap();
        assert!(!cloned.value().is_set());
    }

    #[test]
    fn json_projection() {
        let value = Value::List(vec![Value::Int(1), "a".into(), Value::Null]);
        assert_eq!(value.to_json().unwrap(), serde_json::json!([1, "a", null]));
        assert_eq!(
            Value::BigInt(BigInt::from(12)).to_json().unwrap(),
            serde_json::json!("12")
        );
    }
}
