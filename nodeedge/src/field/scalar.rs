use std::str::FromStr;

use num_traits::ToPrimitive;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use uuid::Uuid;

use super::{invalid, reuse, FieldType, FieldValues};
use crate::ty::FieldKind;
use crate::value::Value;
use crate::{NodeEdgeError, NodeEdgeResult};

static BIGINT_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<value>[0-9]+)(?:e\+(?P<exponent>[0-9]+))?n$").unwrap());

/// Largest accepted exponent of a bigint literal.
const MAX_BIGINT_EXPONENT: u32 = 65_535;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Str {
    values: FieldValues,
}

impl Str {
    pub fn as_str(&self) -> Option<&str> {
        self.values.python().as_ref().and_then(Value::as_str)
    }
}

impl FieldType for Str {
    const KIND: FieldKind = FieldKind::Str;

    fn validate(raw: Value) -> NodeEdgeResult<Self> {
        if let Some(field) = reuse(&raw) {
            return Ok(field);
        }
        match raw {
            Value::Str(text) => Ok(Self {
                values: FieldValues::both(Value::Str(text)),
            }),
            other => Err(invalid(Self::KIND, &other)),
        }
    }
}

impl_field!(Str);

fn coerce_int(kind: FieldKind, raw: &Value) -> NodeEdgeResult<i128> {
    let not_integer = || NodeEdgeError::Value("value is not a valid integer".to_string());
    match raw {
        Value::Int(value) => Ok(*value as i128),
        Value::Bool(value) => Ok(*value as i128),
        Value::BigInt(value) => value.to_i128().ok_or_else(not_integer),
        Value::Float(value) if value.is_finite() && value.fract() == 0.0 => Ok(*value as i128),
        Value::Decimal(value) if value.fract().is_zero() => value.to_i128().ok_or_else(not_integer),
        Value::Str(text) => text.trim().parse::<i128>().map_err(|_| not_integer()),
        Value::Float(_) | Value::Decimal(_) => Err(not_integer()),
        other => Err(invalid(kind, other)),
    }
}

fn check_range(value: i128, min: i128, max: i128) -> NodeEdgeResult<()> {
    if value < min {
        Err(NodeEdgeError::Value(format!(
            "ensure this value is greater than or equal to {}",
            min
        )))
    } else if value > max {
        Err(NodeEdgeError::Value(format!(
            "ensure this value is less than or equal to {}",
            max
        )))
    } else {
        Ok(())
    }
}

macro_rules! sized_int {
    ($name:ident, $int:ty) => {
        #[derive(Clone, Debug, Default, PartialEq)]
        pub struct $name {
            values: FieldValues,
        }

        impl $name {
            pub fn value(&self) -> Option<$int> {
                match self.values.python().as_ref() {
                    Some(Value::Int(value)) => <$int>::try_from(*value).ok(),
                    _ => None,
                }
            }
        }

        impl FieldType for $name {
            const KIND: FieldKind = FieldKind::$name;

            fn validate(raw: Value) -> NodeEdgeResult<Self> {
                if let Some(field) = reuse(&raw) {
                    return Ok(field);
                }
                let value = coerce_int(Self::KIND, &raw)?;
                check_range(value, <$int>::MIN as i128, <$int>::MAX as i128)?;
                Ok(Self {
                    values: FieldValues::both(Value::Int(value as i64)),
                })
            }
        }

        impl_field!($name);
    };
}

sized_int!(Int16, i16);
sized_int!(Int32, i32);
sized_int!(Int64, i64);

/// Arbitrary precision integer written as `<digits>[e+<exponent>]n`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BigInt {
    literal: Option<String>,
    values: FieldValues,
}

impl BigInt {
    pub fn literal(&self) -> Option<&str> {
        self.literal.as_deref()
    }

    pub fn value(&self) -> Option<&num_bigint::BigInt> {
        match self.values.python().as_ref() {
            Some(Value::BigInt(value)) => Some(value),
            _ => None,
        }
    }

    pub fn parse_literal(text: &str) -> NodeEdgeResult<num_bigint::BigInt> {
        let invalid_literal = || NodeEdgeError::Value(format!("invalid bigint literal {:?}", text));
        let captures = BIGINT_LITERAL.captures(text).ok_or_else(invalid_literal)?;
        let value = num_bigint::BigInt::from_str(&captures["value"]).map_err(|_| invalid_literal())?;
        match captures.name("exponent") {
            Some(exponent) => {
                let exponent: u32 = exponent.as_str().parse().map_err(|_| invalid_literal())?;
                if exponent > MAX_BIGINT_EXPONENT {
                    return Err(NodeEdgeError::Value(format!(
                        "bigint exponent {} is larger than {}",
                        exponent, MAX_BIGINT_EXPONENT
                    )));
                }
                Ok(value * num_bigint::BigInt::from(10u32).pow(exponent))
            }
            None => Ok(value),
        }
    }
}

impl FieldType for BigInt {
    const KIND: FieldKind = FieldKind::BigInt;

    fn validate(raw: Value) -> NodeEdgeResult<Self> {
        if let Some(field) = reuse(&raw) {
            return Ok(field);
        }
        let (literal, value) = match raw {
            Value::Str(text) => {
                let value = Self::parse_literal(text.trim())?;
                (text.trim().to_string(), value)
            }
            Value::BigInt(value) => (format!("{}n", value), value),
            Value::Int(value) => (format!("{}n", value), num_bigint::BigInt::from(value)),
            other => return Err(invalid(Self::KIND, &other)),
        };
        Ok(Self {
            literal: Some(literal),
            values: FieldValues::both(Value::BigInt(value)),
        })
    }
}

impl_field!(BigInt, |field: &BigInt| match &field.literal {
    Some(literal) => Ok(serde_json::Value::String(literal.clone())),
    None => field.values.python_json(field),
});

fn coerce_float(kind: FieldKind, raw: &Value) -> NodeEdgeResult<f64> {
    let not_float = || NodeEdgeError::Value("value is not a valid float".to_string());
    match raw {
        Value::Float(value) => Ok(*value),
        Value::Int(value) => Ok(*value as f64),
        Value::BigInt(value) => value.to_f64().ok_or_else(not_float),
        Value::Decimal(value) => value.to_f64().ok_or_else(not_float),
        Value::Str(text) => text.trim().parse::<f64>().map_err(|_| not_float()),
        other => Err(invalid(kind, other)),
    }
}

macro_rules! sized_float {
    ($name:ident, $limit:expr) => {
        #[derive(Clone, Debug, Default, PartialEq)]
        pub struct $name {
            values: FieldValues,
        }

        impl $name {
            pub fn value(&self) -> Option<f64> {
                match self.values.python().as_ref() {
                    Some(Value::Float(value)) => Some(*value),
                    _ => None,
                }
            }
        }

        impl FieldType for $name {
            const KIND: FieldKind = FieldKind::$name;

            fn validate(raw: Value) -> NodeEdgeResult<Self> {
                if let Some(field) = reuse(&raw) {
                    return Ok(field);
                }
                let value = coerce_float(Self::KIND, &raw)?;
                if !value.is_finite() || value.abs() > $limit {
                    return Err(NodeEdgeError::Value(format!(
                        "ensure this value is between {:e} and {:e}",
                        -$limit, $limit
                    )));
                }
                Ok(Self {
                    values: FieldValues::both(Value::Float(value)),
                })
            }
        }

        impl_field!($name);
    };
}

sized_float!(Float32, 3.4e38);
sized_float!(Float64, 1.7e308);

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Decimal {
    values: FieldValues,
}

impl Decimal {
    pub fn value(&self) -> Option<rust_decimal::Decimal> {
        match self.values.python().as_ref() {
            Some(Value::Decimal(value)) => Some(*value),
            _ => None,
        }
    }
}

impl FieldType for Decimal {
    const KIND: FieldKind = FieldKind::Decimal;

    fn validate(raw: Value) -> NodeEdgeResult<Self> {
        if let Some(field) = reuse(&raw) {
            return Ok(field);
        }
        let not_decimal = || NodeEdgeError::Value("value is not a valid decimal".to_string());
        let value = match raw {
            Value::Decimal(value) => value,
            Value::Int(value) => rust_decimal::Decimal::from(value),
            Value::BigInt(value) => {
                rust_decimal::Decimal::from_str(&value.to_string()).map_err(|_| not_decimal())?
            }
            Value::Float(value) => rust_decimal::Decimal::from_f64(value).ok_or_else(not_decimal)?,
            Value::Str(text) => {
                let text = text.trim();
                rust_decimal::Decimal::from_str(text)
                    .or_else(|_| rust_decimal::Decimal::from_scientific(text))
                    .map_err(|_| not_decimal())?
            }
            other => return Err(invalid(Self::KIND, &other)),
        };
        Ok(Self {
            values: FieldValues::both(Value::Decimal(value)),
        })
    }
}

impl_field!(Decimal);

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bool {
    values: FieldValues,
}

impl Bool {
    pub fn value(&self) -> Option<bool> {
        match self.values.python().as_ref() {
            Some(Value::Bool(value)) => Some(*value),
            _ => None,
        }
    }
}

impl FieldType for Bool {
    const KIND: FieldKind = FieldKind::Bool;

    fn validate(raw: Value) -> NodeEdgeResult<Self> {
        if let Some(field) = reuse(&raw) {
            return Ok(field);
        }
        let not_bool = || NodeEdgeError::Value("value could not be parsed to a boolean".to_string());
        let value = match raw {
            Value::Bool(value) => value,
            Value::Int(0) => false,
            Value::Int(1) => true,
            Value::Str(text) => match text.trim().to_lowercase().as_str() {
                "0" | "off" | "f" | "false" | "n" | "no" => false,
                "1" | "on" | "t" | "true" | "y" | "yes" => true,
                _ => return Err(not_bool()),
            },
            Value::Int(_) => return Err(not_bool()),
            other => return Err(invalid(Self::KIND, &other)),
        };
        Ok(Self {
            values: FieldValues::both(Value::Bool(value)),
        })
    }
}

impl_field!(Bool);

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bytes {
    values: FieldValues,
}

impl Bytes {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self.values.python().as_ref() {
            Some(Value::Bytes(bytes)) => Some(bytes),
            _ => None,
        }
    }
}

impl FieldType for Bytes {
    const KIND: FieldKind = FieldKind::Bytes;

    fn validate(raw: Value) -> NodeEdgeResult<Self> {
        if let Some(field) = reuse(&raw) {
            return Ok(field);
        }
        let bytes = match raw {
            Value::Bytes(bytes) => bytes,
            Value::Str(text) => text.into_bytes(),
            other => return Err(invalid(Self::KIND, &other)),
        };
        Ok(Self {
            values: FieldValues::both(Value::Bytes(bytes)),
        })
    }
}

impl_field!(Bytes);

/// JSON document: the python value is the text, the db value the parsed document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Json {
    values: FieldValues,
}

impl Json {
    pub fn document(&self) -> Option<&serde_json::Value> {
        match self.values.db().as_ref() {
            Some(Value::Json(document)) => Some(document),
            _ => None,
        }
    }
}

impl FieldType for Json {
    const KIND: FieldKind = FieldKind::Json;

    fn validate(raw: Value) -> NodeEdgeResult<Self> {
        if let Some(field) = reuse(&raw) {
            return Ok(field);
        }
        let (text, document) = match raw {
            Value::Str(text) => {
                let document = serde_json::from_str(&text)
                    .map_err(|_| NodeEdgeError::Value("Invalid JSON".to_string()))?;
                (text, document)
            }
            Value::Json(document) => (document.to_string(), document),
            other => return Err(invalid(Self::KIND, &other)),
        };
        Ok(Self {
            values: FieldValues::split(Value::Str(text), Value::Json(document)),
        })
    }
}

impl_field!(Json, |field: &Json| field.values.db_json(field));

macro_rules! uuid_field {
    ($name:ident, $version:expr) => {
        /// The python value is the uuid, the db value its hyphenated text.
        #[derive(Clone, Debug, Default, PartialEq)]
        pub struct $name {
            values: FieldValues,
        }

        impl $name {
            pub fn value(&self) -> Option<Uuid> {
                match self.values.python().as_ref() {
                    Some(Value::Uuid(uuid)) => Some(*uuid),
                    _ => None,
                }
            }
        }

        impl FieldType for $name {
            const KIND: FieldKind = FieldKind::$name;

            fn validate(raw: Value) -> NodeEdgeResult<Self> {
                if let Some(field) = reuse(&raw) {
                    return Ok(field);
                }
                let uuid = parse_uuid(Self::KIND, raw)?;
                if uuid.get_version_num() != $version {
                    return Err(NodeEdgeError::Value(format!(
                        "uuid version {} expected",
                        $version
                    )));
                }
                Ok(Self {
                    values: FieldValues::split(
                        Value::Uuid(uuid),
                        Value::Str(uuid.hyphenated().to_string()),
                    ),
                })
            }
        }

        impl_field!($name, |field: &$name| field.values.db_json(field));
    };
}

fn parse_uuid(kind: FieldKind, raw: Value) -> NodeEdgeResult<Uuid> {
    let not_uuid = || NodeEdgeError::Value("value is not a valid uuid".to_string());
    match raw {
        Value::Uuid(uuid) => Ok(uuid),
        Value::Str(text) => Uuid::parse_str(text.trim()).map_err(|_| not_uuid()),
        Value::Bytes(bytes) => Uuid::from_slice(&bytes).map_err(|_| not_uuid()),
        other => Err(invalid(kind, &other)),
    }
}

uuid_field!(Uuid1, 1);
uuid_field!(Uuid3, 3);
uuid_field!(Uuid4, 4);
uuid_field!(Uuid5, 5);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use proptest::prelude::*;

    #[test]
    fn str_jsonable_is_quoted() {
        let field = Str::validate("hello world".into()).unwrap();
        assert_eq!(field.as_json_text().unwrap(), "\"hello world\"");
        assert!(Str::validate(Value::Int(1)).is_err());
    }

    #[test]
    fn integers() {
        let field = Int16::validate("12".into()).unwrap();
        assert_eq!(field.value(), Some(12));
        assert_eq!(field.as_json_text().unwrap(), "12");
        assert!(Int16::validate(Value::Int(40_000)).is_err());
        assert!(Int32::validate(Value::Float(1.5)).is_err());
        assert_eq!(Int64::validate(Value::Bool(true)).unwrap().value(), Some(1));
        assert!(Int64::validate("twelve".into()).is_err());
    }

    #[test]
    fn integer_bounds() {
        assert_eq!(Int16::validate(Value::Int(32_767)).unwrap().value(), Some(i16::MAX));
        assert_eq!(Int16::validate(Value::Int(-32_768)).unwrap().value(), Some(i16::MIN));
        assert!(Int16::validate(Value::Int(32_768)).is_err());
        assert!(Int16::validate(Value::Int(-32_769)).is_err());

        assert_eq!(Int32::validate(Value::Int(i32::MAX as i64)).unwrap().value(), Some(i32::MAX));
        assert_eq!(Int32::validate(Value::Int(i32::MIN as i64)).unwrap().value(), Some(i32::MIN));
        assert!(Int32::validate(Value::Int(i32::MAX as i64 + 1)).is_err());
        assert!(Int32::validate(Value::Int(i32::MIN as i64 - 1)).is_err());

        assert_eq!(Int64::validate(Value::Int(i64::MAX)).unwrap().value(), Some(i64::MAX));
        assert_eq!(Int64::validate(Value::Int(i64::MIN)).unwrap().value(), Some(i64::MIN));
        assert!(Int64::validate("9223372036854775808".into()).is_err());
        assert!(Int64::validate("-9223372036854775809".into()).is_err());
    }

    #[test]
    fn bigint_literals() {
        let field = BigInt::validate("1e+100n".into()).unwrap();
        assert_eq!(
            field.value(),
            Some(&num_bigint::BigInt::from(10u32).pow(100))
        );
        assert_eq!(field.as_jsonable_value().unwrap(), serde_json::json!("1e+100n"));

        let field = BigInt::validate("12e+3n".into()).unwrap();
        assert_eq!(field.value(), Some(&num_bigint::BigInt::from(12_000)));
        assert_eq!(field.literal(), Some("12e+3n"));
        assert_eq!(field.as_jsonable_value().unwrap(), serde_json::json!("12e+3n"));

        let field = BigInt::validate("123456789012345678901234567890n".into()).unwrap();
        assert_eq!(
            field.value().unwrap().to_string(),
            "123456789012345678901234567890"
        );

        for text in ["12", "-1n", "1e3n", "n", "1e+70000n"] {
            assert!(BigInt::validate(text.into()).is_err(), "{}", text);
        }
    }

    #[test]
    fn floats() {
        assert_eq!(Float64::validate(Value::Int(2)).unwrap().value(), Some(2.0));
        assert!(Float32::validate(Value::Float(1e39)).is_err());
        assert!(Float64::validate(Value::Float(f64::NAN)).is_err());
        assert!(Float64::validate("inf".into()).is_err());
    }

    #[test]
    fn float_bounds() {
        assert_eq!(Float32::validate(Value::Float(3.4e38)).unwrap().value(), Some(3.4e38));
        assert_eq!(Float32::validate(Value::Float(-3.4e38)).unwrap().value(), Some(-3.4e38));
        assert!(Float32::validate(Value::Float(3.40282e38)).is_err());
        assert!(Float32::validate(Value::Float(-3.41e38)).is_err());

        assert_eq!(Float64::validate(Value::Float(1.7e308)).unwrap().value(), Some(1.7e308));
        assert_eq!(Float64::validate(Value::Float(-1.7e308)).unwrap().value(), Some(-1.7e308));
        assert!(Float64::validate(Value::Float(1.75e308)).is_err());
        assert!(Float64::validate(Value::Float(-1.71e308)).is_err());
    }

    #[test]
    fn decimals() {
        let field = Decimal::validate("1.50".into()).unwrap();
        assert_eq!(field.as_jsonable_value().unwrap(), serde_json::json!("1.50"));
        assert!(Decimal::validate("1.5e2".into()).is_ok());
        assert!(Decimal::validate("abc".into()).is_err());
    }

    #[test]
    fn booleans() {
        assert_eq!(Bool::validate("yes".into()).unwrap().value(), Some(true));
        assert_eq!(Bool::validate(Value::Int(0)).unwrap().value(), Some(false));
        assert!(Bool::validate(Value::Int(2)).is_err());
        assert!(Bool::validate("maybe".into()).is_err());
    }

    #[test]
    fn bytes_decode_for_json() {
        let field = Bytes::validate(Value::Bytes(b"abc".to_vec())).unwrap();
        assert_eq!(field.as_jsonable_value().unwrap(), serde_json::json!("abc"));
        let field = Bytes::validate(Value::Bytes(vec![0xff, 0xfe])).unwrap();
        assert!(field.as_jsonable_value().is_err());
    }

    #[test]
    fn json_documents() {
        let field = Json::validate(r#"{"a": [1, 2]}"#.into()).unwrap();
        assert_eq!(
            field.as_python_value().value(),
            Some(&Value::Str(r#"{"a": [1, 2]}"#.into()))
        );
        assert_eq!(field.as_jsonable_value().unwrap(), serde_json::json!({"a": [1, 2]}));
        assert_eq!(
            Json::validate("{".into()).unwrap_err(),
            NodeEdgeError::Value("Invalid JSON".into())
        );
    }

    #[test]
    fn uuids_check_their_version() {
        let v1 = "6fa459ea-ee8a-11ca-a80d-00c04fd430c8";
        let v4 = "550e8400-e29b-41d4-a716-446655440000";

        let field = Uuid1::validate(v1.into()).unwrap();
        assert_eq!(field.as_db_value().value(), Some(&Value::Str(v1.into())));
        assert_eq!(field.as_jsonable_value().unwrap(), serde_json::json!(v1));
        assert!(Uuid4::validate(v4.into()).is_ok());
        assert!(Uuid1::validate(v4.into()).is_err());
        assert!(Uuid5::validate("not-a-uuid".into()).is_err());
    }

    proptest! {
        #[test]
        fn int16_accepts_exactly_its_range(value in -100_000i64..100_000) {
            let result = Int16::validate(Value::Int(value));
            prop_assert_eq!(result.is_ok(), i16::try_from(value).is_ok());
        }
    }
}
