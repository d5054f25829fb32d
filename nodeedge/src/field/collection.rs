use super::{invalid, reuse, FieldType, FieldValues};
use crate::ty::FieldKind;
use crate::value::Value;
use crate::NodeEdgeResult;

/// Element-wise db projection: nested fields contribute their db value.
fn db_items(items: &[Value]) -> Vec<Value> {
    items
        .iter()
        .map(|item| match item {
            Value::Field(field) => field.as_db_value().to_value(field),
            other => other.clone(),
        })
        .collect()
}

fn json_items<'a>(items: impl Iterator<Item = &'a Value>) -> NodeEdgeResult<serde_json::Value> {
    Ok(serde_json::Value::Array(
        items.map(Value::to_json).collect::<NodeEdgeResult<_>>()?,
    ))
}

fn sequence(kind: FieldKind, raw: Value) -> NodeEdgeResult<Vec<Value>> {
    match raw {
        Value::List(items) | Value::Tuple(items) | Value::Set(items) => Ok(items),
        other => Err(invalid(kind, &other)),
    }
}

macro_rules! sequence_field {
    ($(#[$meta:meta])* $name:ident, $python:ident, $db:ident, $prepare:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq)]
        pub struct $name {
            data: Vec<Value>,
            values: FieldValues,
        }

        impl $name {
            pub fn data(&self) -> &[Value] {
                &self.data
            }

            pub fn len(&self) -> usize {
                self.data.len()
            }

            pub fn is_empty(&self) -> bool {
                self.data.is_empty()
            }

            pub fn get(&self, index: usize) -> Option<&Value> {
                self.data.get(index)
            }

            pub fn iter(&self) -> std::slice::Iter<'_, Value> {
                self.data.iter()
            }
        }

        impl FieldType for $name {
            const KIND: FieldKind = FieldKind::$name;

            fn validate(raw: Value) -> NodeEdgeResult<Self> {
                if let Some(field) = reuse(&raw) {
                    return Ok(field);
                }
                let data = ($prepare)(sequence(Self::KIND, raw)?);
                Ok(Self {
                    values: FieldValues::split(Value::$python(data.clone()), Value::$db(db_items(&data))),
                    data,
                })
            }
        }

        impl_field!($name, |field: &$name| json_items(field.data.iter()));
    };
}

sequence_field!(
    /// Ordered elements.
    Array,
    List,
    List,
    |items: Vec<Value>| items
);

sequence_field!(
    /// Distinct elements in first-seen order.
    Set,
    Set,
    List,
    |items: Vec<Value>| {
        let mut distinct: Vec<Value> = Vec::with_capacity(items.len());
        for item in items {
            if !distinct.contains(&item) {
                distinct.push(item);
            }
        }
        distinct
    }
);

sequence_field!(
    /// Fixed elements.
    Tuple,
    Tuple,
    Tuple,
    |items: Vec<Value>| items
);

/// Named elements; the db value is the tuple of element values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NamedTuple {
    data: Vec<(String, Value)>,
    values: FieldValues,
}

impl NamedTuple {
    pub fn data(&self) -> &[(String, Value)] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.data
            .iter()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, value)| value)
    }
}

impl FieldType for NamedTuple {
    const KIND: FieldKind = FieldKind::NamedTuple;

    fn validate(raw: Value) -> NodeEdgeResult<Self> {
        if let Some(field) = reuse(&raw) {
            return Ok(field);
        }
        let data = match raw {
            Value::NamedTuple(data) => data,
            other => return Err(invalid(Self::KIND, &other)),
        };
        let items: Vec<Value> = data.iter().map(|(_, value)| value.clone()).collect();
        Ok(Self {
            values: FieldValues::split(
                Value::NamedTuple(data.clone()),
                Value::Tuple(db_items(&items)),
            ),
            data,
        })
    }
}

impl_field!(NamedTuple, |field: &NamedTuple| json_items(
    field.data.iter().map(|(_, value)| value)
));

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field, Str};
    use std::sync::Arc;

    #[test]
    fn arrays_keep_order() {
        let field = Array::validate(Value::List(vec![3.into(), 1.into(), 3.into()])).unwrap();
        assert_eq!(field.len(), 3);
        assert_eq!(field.as_jsonable_value().unwrap(), serde_json::json!([3, 1, 3]));
        assert!(Array::validate(Value::Int(1)).is_err());
    }

    #[test]
    fn sets_drop_duplicates() {
        let field = Set::validate(Value::List(vec!["a".into(), "b".into(), "a".into()])).unwrap();
        assert_eq!(field.data(), &[Value::from("a"), Value::from("b")]);
        assert_eq!(
            field.as_python_value().value(),
            Some(&Value::Set(vec!["a".into(), "b".into()]))
        );
        assert_eq!(
            field.as_db_value().value(),
            Some(&Value::List(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn nested_fields_use_their_db_value() {
        let nested: Arc<dyn Field> = Arc::new(Str::validate("x".into()).unwrap());
        let field = Tuple::validate(Value::List(vec![Value::Field(nested), 2.into()])).unwrap();
        assert_eq!(
            field.as_db_value().value(),
            Some(&Value::Tuple(vec!["x".into(), 2.into()]))
        );
        assert_eq!(field.as_jsonable_value().unwrap(), serde_json::json!(["x", 2]));
    }

    #[test]
    fn named_tuples() {
        let field = NamedTuple::validate(Value::NamedTuple(vec![
            ("x".to_string(), 1.into()),
            ("y".to_string(), 2.into()),
        ]))
        .unwrap();
        assert_eq!(field.get("y"), Some(&Value::Int(2)));
        assert_eq!(
            field.as_db_value().value(),
            Some(&Value::Tuple(vec![1.into(), 2.into()]))
        );
        assert_eq!(field.as_jsonable_value().unwrap(), serde_json::json!([1, 2]));
        assert!(NamedTuple::validate(Value::List(vec![])).is_err());
    }
}
