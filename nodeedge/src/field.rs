//!
//! Field kinds: validation of raw input and the python, db and jsonable
//! representations of a validated value.
//!

/// Implements [`Field`] for a type with a `values: FieldValues` member.
macro_rules! impl_field {
    ($ty:ident) => {
        impl_field!($ty, |field: &$ty| field.values.python_json(field));
    };
    ($ty:ident, $jsonable:expr) => {
        impl $crate::field::Field for $ty {
            fn kind(&self) -> $crate::ty::FieldKind {
                <$ty as $crate::field::FieldType>::KIND
            }

            fn as_python_value(&self) -> $crate::field::Represented<'_> {
                self.values.python_or(self)
            }

            fn as_db_value(&self) -> $crate::field::Represented<'_> {
                self.values.db_or(self)
            }

            fn as_jsonable_value(&self) -> $crate::NodeEdgeResult<serde_json::Value> {
                ($jsonable)(self)
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }
    };
}

pub mod collection;
pub mod link;
pub mod scalar;
pub mod temporal;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

pub use collection::{Array, NamedTuple, Set, Tuple};
pub use link::{Link, LinkArg, LinkData, MultiLink};
pub use scalar::{
    BigInt, Bool, Bytes, Decimal, Float32, Float64, Int16, Int32, Int64, Json, Str, Uuid1, Uuid3,
    Uuid4, Uuid5,
};
pub use temporal::{AwareDateTime, Date, DateDuration, Duration, NaiveDateTime, RelativeDuration, Time};

use crate::ty::FieldKind;
use crate::value::{Slot, Value};
use crate::{NodeEdgeError, NodeEdgeResult};

/// A representation, or the field itself when it has no distinct one.
#[derive(Clone, Copy, Debug)]
pub enum Represented<'a> {
    Value(&'a Value),
    Itself(&'a dyn Field),
}

impl<'a> Represented<'a> {
    pub fn value(&self) -> Option<&'a Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Itself(_) => None,
        }
    }

    pub fn is_itself(&self) -> bool {
        matches!(self, Self::Itself(_))
    }

    /// The represented value, with a field standing for itself as `Value::Field`.
    pub fn to_value(&self, field: &Arc<dyn Field>) -> Value {
        match self {
            Self::Value(value) => (*value).clone(),
            Self::Itself(_) => Value::Field(field.clone()),
        }
    }
}

/// A validated field value, used behind `Arc<dyn Field>`.
pub trait Field: fmt::Debug + Send + Sync + 'static {
    fn kind(&self) -> FieldKind;

    fn as_python_value(&self) -> Represented<'_>;

    fn as_db_value(&self) -> Represented<'_>;

    fn as_jsonable_value(&self) -> NodeEdgeResult<serde_json::Value>;

    fn as_json_text(&self) -> NodeEdgeResult<String> {
        Ok(self.as_jsonable_value()?.to_string())
    }

    fn as_any(&self) -> &dyn Any;

    fn is_single_link(&self) -> bool {
        false
    }

    fn is_multi_link(&self) -> bool {
        false
    }
}

impl dyn Field {
    pub fn downcast_ref<F: Field>(&self) -> Option<&F> {
        self.as_any().downcast_ref()
    }

    pub fn is<F: Field>(&self) -> bool {
        self.as_any().is::<F>()
    }
}

/// Statically known field kind.
pub trait FieldType: Field + Clone + Sized {
    const KIND: FieldKind;

    /// Replaces the backend's storage type name for this kind.
    const DB_FIELD_TYPE: Option<&'static str> = None;

    /// Replaces the storage type name used when this kind is a link.
    const DB_LINK_TYPE: Option<&'static str> = None;

    fn validate(raw: Value) -> NodeEdgeResult<Self>;

    fn as_db_type() -> NodeEdgeResult<String> {
        match Self::DB_FIELD_TYPE {
            Some(name) => Ok(name.to_string()),
            None => Self::KIND.as_db_type(),
        }
    }

    fn as_db_link_type() -> NodeEdgeResult<String> {
        match Self::DB_LINK_TYPE {
            Some(name) => Ok(name.to_string()),
            None => Self::as_db_type(),
        }
    }
}

/// Stored python and db representations of a field value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldValues {
    python: Slot<Value>,
    db: Slot<Value>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same value for both representations.
    pub fn both(value: Value) -> Self {
        Self {
            python: Slot::Present(value.clone()),
            db: Slot::Present(value),
        }
    }

    /// A db value only; the python representation is the field itself.
    pub fn db_only(db: Value) -> Self {
        Self {
            python: Slot::Unset,
            db: Slot::Present(db),
        }
    }

    pub fn split(python: Value, db: Value) -> Self {
        Self {
            python: Slot::Present(python),
            db: Slot::Present(db),
        }
    }

    pub fn python(&self) -> &Slot<Value> {
        &self.python
    }

    pub fn db(&self) -> &Slot<Value> {
        &self.db
    }

    pub fn python_or<'a>(&'a self, field: &'a dyn Field) -> Represented<'a> {
        match &self.python {
            Slot::Present(value) => Represented::Value(value),
            Slot::Unset => Represented::Itself(field),
        }
    }

    pub fn db_or<'a>(&'a self, field: &'a dyn Field) -> Represented<'a> {
        match &self.db {
            Slot::Present(value) => Represented::Value(value),
            Slot::Unset => Represented::Itself(field),
        }
    }

    pub fn python_json(&self, field: &dyn Field) -> NodeEdgeResult<serde_json::Value> {
        present(&self.python, field)?.to_json()
    }

    pub fn db_json(&self, field: &dyn Field) -> NodeEdgeResult<serde_json::Value> {
        present(&self.db, field)?.to_json()
    }
}

fn present<'a>(slot: &'a Slot<Value>, field: &dyn Field) -> NodeEdgeResult<&'a Value> {
    slot.as_ref().ok_or_else(|| {
        NodeEdgeError::Value(format!("{} value is not set", field.kind()))
    })
}

/// An already validated field of the same kind passed as raw input.
pub(crate) fn reuse<F: FieldType>(raw: &Value) -> Option<F> {
    match raw {
        Value::Field(field) => field.downcast_ref::<F>().cloned(),
        _ => None,
    }
}

pub(crate) fn invalid(kind: FieldKind, raw: &Value) -> NodeEdgeError {
    NodeEdgeError::Value(format!(
        "value of type '{}' is not a valid {}",
        raw.kind(),
        kind
    ))
}

/// Validate `raw` as a field of `kind`.
pub fn validate_kind(kind: FieldKind, raw: Value) -> NodeEdgeResult<Arc<dyn Field>> {
    fn boxed<F: FieldType>(raw: Value) -> NodeEdgeResult<Arc<dyn Field>> {
        Ok(Arc::new(F::validate(raw)?))
    }

    match kind {
        FieldKind::Str => boxed::<Str>(raw),
        FieldKind::Int16 => boxed::<Int16>(raw),
        FieldKind::Int32 => boxed::<Int32>(raw),
        FieldKind::Int64 => boxed::<Int64>(raw),
        FieldKind::BigInt => boxed::<BigInt>(raw),
        FieldKind::Float32 => boxed::<Float32>(raw),
        FieldKind::Float64 => boxed::<Float64>(raw),
        FieldKind::Decimal => boxed::<Decimal>(raw),
        FieldKind::Bool => boxed::<Bool>(raw),
        FieldKind::Date => boxed::<Date>(raw),
        FieldKind::Time => boxed::<Time>(raw),
        FieldKind::NaiveDateTime => boxed::<NaiveDateTime>(raw),
        FieldKind::AwareDateTime => boxed::<AwareDateTime>(raw),
        FieldKind::Duration => boxed::<Duration>(raw),
        FieldKind::RelativeDuration => boxed::<RelativeDuration>(raw),
        FieldKind::DateDuration => boxed::<DateDuration>(raw),
        FieldKind::Uuid1 => boxed::<Uuid1>(raw),
        FieldKind::Uuid3 => boxed::<Uuid3>(raw),
        FieldKind::Uuid4 => boxed::<Uuid4>(raw),
        FieldKind::Uuid5 => boxed::<Uuid5>(raw),
        FieldKind::Bytes => boxed::<Bytes>(raw),
        FieldKind::Array => boxed::<Array>(raw),
        FieldKind::Set => boxed::<Set>(raw),
        FieldKind::Tuple => boxed::<Tuple>(raw),
        FieldKind::NamedTuple => boxed::<NamedTuple>(raw),
        FieldKind::Json => boxed::<Json>(raw),
        FieldKind::Link => boxed::<Link>(raw),
        FieldKind::MultiLink => boxed::<MultiLink>(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_by_kind() {
        let field = validate_kind(FieldKind::Int16, Value::Int(3)).unwrap();
        assert_eq!(field.kind(), FieldKind::Int16);
        assert!(field.is::<Int16>());
        assert_eq!(field.as_db_value().value(), Some(&Value::Int(3)));
        assert_eq!(field.as_json_text().unwrap(), "3");
    }

    #[test]
    fn unvalidated_fields_represent_themselves() {
        let field = Str::default();
        assert!(field.as_python_value().is_itself());
        assert!(matches!(
            field.as_jsonable_value(),
            Err(NodeEdgeError::Value(_))
        ));
    }

    #[test]
    fn validated_fields_are_reused() {
        let field: Arc<dyn Field> = Arc::new(Str::validate("x".into()).unwrap());
        let again = Str::validate(Value::Field(field)).unwrap();
        assert_eq!(again.as_str(), Some("x"));
    }

    #[test]
    fn db_type_overrides() {
        #[derive(Clone, Debug, Default)]
        struct Email {
            values: FieldValues,
        }

        impl FieldType for Email {
            const KIND: FieldKind = FieldKind::Str;
            const DB_FIELD_TYPE: Option<&'static str> = Some("Email");

            fn validate(raw: Value) -> NodeEdgeResult<Self> {
                Ok(Self {
                    values: FieldValues::both(raw),
                })
            }
        }

        impl_field!(Email);

        assert_eq!(Email::as_db_type().unwrap(), "Email");
        assert_eq!(Email::as_db_link_type().unwrap(), "Email");
        assert_eq!(Str::as_db_type().unwrap(), "str");
    }
}
