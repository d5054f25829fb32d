//!
//! Filter expressions over model fields.
//!

use std::ops::{BitAnd, BitOr, Not};
use std::sync::Arc;

use crate::clone::{downcast, AttrValue, Cloneable, CloningAttrs, InitArgs, Overrides, Param};
use crate::field::Field;
use crate::logic::{Compositable, CompositableItem, Composition, Operand};
use crate::lookup::Lookup;
use crate::model::{ModelField, ModelInstance};
use crate::value::{Slot, Value, ValueTypeSet, Valueable, VALUE_ATTR};
use crate::{DomainError, NodeEdgeError, NodeEdgeResult};

const FIELD_ATTR: &str = "field";
const LOOKUP_ATTR: &str = "lookup";

/// A value holder that carries a lookup.
///
/// Every operation returns a modified copy.
pub trait Filterable: Valueable + CompositableItem {
    fn lookup(&self) -> Lookup;

    fn with_lookup(&self, lookup: Lookup) -> NodeEdgeResult<Self> {
        self.clone_with(Overrides::new().attr(LOOKUP_ATTR, lookup))
    }

    /// Adds `NOT` to lookups that allow it.
    fn negate(&self) -> NodeEdgeResult<Self> {
        let lookup = self.lookup();
        if !lookup.can_negate() {
            return Err(NodeEdgeError::Type(format!(
                "bad operand type for unary ~: '{}'",
                lookup.as_jsonable_value()
            )));
        }
        self.with_lookup(lookup | Lookup::NOT)
    }

    fn not_(&self) -> NodeEdgeResult<Self> {
        self.negate()
    }

    fn exists(&self) -> NodeEdgeResult<Self> {
        self.with_lookup(Lookup::EXISTS)
    }

    fn equal(&self, value: impl Into<Value>) -> NodeEdgeResult<Self> {
        self.with_lookup(Lookup::EQUAL)?.set_value(value)
    }

    fn lt(&self, value: impl Into<Value>) -> NodeEdgeResult<Self> {
        self.with_lookup(Lookup::LT)?.set_value(value)
    }

    fn le(&self, value: impl Into<Value>) -> NodeEdgeResult<Self> {
        self.with_lookup(Lookup::LE)?.set_value(value)
    }

    fn gt(&self, value: impl Into<Value>) -> NodeEdgeResult<Self> {
        self.with_lookup(Lookup::GT)?.set_value(value)
    }

    fn ge(&self, value: impl Into<Value>) -> NodeEdgeResult<Self> {
        self.with_lookup(Lookup::GE)?.set_value(value)
    }

    fn like(&self, value: impl Into<Value>) -> NodeEdgeResult<Self> {
        self.with_lookup(Lookup::LIKE)?.set_value(value)
    }

    fn ilike(&self, value: impl Into<Value>) -> NodeEdgeResult<Self> {
        self.with_lookup(Lookup::ILIKE)?.set_value(value)
    }

    /// A scalar is treated as a one-element list; each element must be
    /// an accepted value.
    fn in_(&self, value: impl Into<Value>) -> NodeEdgeResult<Self> {
        let items = value.into().into_list();
        for item in &items {
            self.check_value(item)?;
        }
        self.clone_with(
            Overrides::new()
                .attr(LOOKUP_ATTR, Lookup::IN)
                .attr(VALUE_ATTR, Slot::Present(Value::List(items))),
        )
    }
}

/// A lookup on one model field.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    field: ModelField,
    lookup: Lookup,
    value: Slot<Value>,
}

impl Filter {
    /// An `EQUAL` filter holding the value bound to `field`, if any.
    pub fn create_filter(field: ModelField) -> Self {
        Self {
            value: field.value().clone(),
            field,
            lookup: Lookup::EQUAL,
        }
    }

    pub fn field(&self) -> &ModelField {
        &self.field
    }

    pub fn try_and(&self, other: impl IntoFilterComposition) -> NodeEdgeResult<Compositable<Filter>> {
        Compositable::from(self.clone()).try_and(other)
    }

    pub fn try_or(&self, other: impl IntoFilterComposition) -> NodeEdgeResult<Compositable<Filter>> {
        Compositable::from(self.clone()).try_or(other)
    }
}

impl Cloneable for Filter {
    fn signature() -> &'static [Param] {
        const SIGNATURE: &[Param] = &[Param::positional(FIELD_ATTR), Param::keyword(LOOKUP_ATTR)];
        SIGNATURE
    }

    fn cloning_attrs() -> CloningAttrs {
        CloningAttrs::Set(&[VALUE_ATTR])
    }

    fn get_attr(&self, name: &str) -> Option<AttrValue> {
        match name {
            FIELD_ATTR => Some(Box::new(self.field.clone())),
            LOOKUP_ATTR => Some(Box::new(self.lookup)),
            VALUE_ATTR => Some(Box::new(self.value.clone())),
            _ => None,
        }
    }

    fn set_attr(&mut self, name: &str, value: AttrValue) -> NodeEdgeResult<()> {
        match name {
            LOOKUP_ATTR => self.lookup = downcast(name, value)?,
            VALUE_ATTR => self.value = downcast(name, value)?,
            _ => {
                return Err(NodeEdgeError::Type(format!(
                    "cannot assign attribute '{}' of Filter",
                    name
                )))
            }
        }
        Ok(())
    }

    fn construct(mut args: InitArgs) -> NodeEdgeResult<Self> {
        let field = args.take(FIELD_ATTR)?;
        let lookup = args.take_opt(LOOKUP_ATTR)?.unwrap_or(Lookup::EQUAL);
        Ok(Self {
            lookup,
            ..Self::create_filter(field)
        })
    }
}

impl Valueable for Filter {
    fn value(&self) -> &Slot<Value> {
        &self.value
    }

    fn value_type(&self) -> &ValueTypeSet {
        self.field.value_type()
    }
}

impl CompositableItem for Filter {}

impl Filterable for Filter {
    fn lookup(&self) -> Lookup {
        self.lookup
    }
}

impl<R: Into<Compositable<Filter>>> BitAnd<R> for Filter {
    type Output = Compositable<Filter>;

    fn bitand(self, rhs: R) -> Self::Output {
        Compositable::from(self) & rhs
    }
}

impl<R: Into<Compositable<Filter>>> BitOr<R> for Filter {
    type Output = Compositable<Filter>;

    fn bitor(self, rhs: R) -> Self::Output {
        Compositable::from(self) | rhs
    }
}

impl Not for &Filter {
    type Output = NodeEdgeResult<Filter>;

    fn not(self) -> Self::Output {
        self.negate()
    }
}

impl Not for Filter {
    type Output = NodeEdgeResult<Filter>;

    fn not(self) -> Self::Output {
        self.negate()
    }
}

/// Right-hand operands of [`Filter::try_and`] and [`Filter::try_or`].
pub trait IntoFilterComposition {
    fn into_filter_composition(self) -> NodeEdgeResult<Compositable<Filter>>;
}

impl IntoFilterComposition for Filter {
    fn into_filter_composition(self) -> NodeEdgeResult<Compositable<Filter>> {
        Ok(self.into())
    }
}

impl IntoFilterComposition for Compositable<Filter> {
    fn into_filter_composition(self) -> NodeEdgeResult<Compositable<Filter>> {
        Ok(self)
    }
}

impl IntoFilterComposition for Composition<Filter> {
    fn into_filter_composition(self) -> NodeEdgeResult<Compositable<Filter>> {
        Ok(self.into())
    }
}

impl IntoFilterComposition for ModelField {
    fn into_filter_composition(self) -> NodeEdgeResult<Compositable<Filter>> {
        Err(DomainError::NotAllowedComposition(format!(
            "field '{}' must be turned into a filter first",
            self.name()
        ))
        .into())
    }
}

impl IntoFilterComposition for Arc<dyn Field> {
    fn into_filter_composition(self) -> NodeEdgeResult<Compositable<Filter>> {
        Err(DomainError::NotAllowedComposition(format!(
            "{} field value cannot be composited",
            self.kind()
        ))
        .into())
    }
}

impl IntoFilterComposition for Arc<ModelInstance> {
    fn into_filter_composition(self) -> NodeEdgeResult<Compositable<Filter>> {
        Err(DomainError::InvalidCompositedType(format!(
            "{} instance cannot be composited",
            self.meta().name()
        ))
        .into())
    }
}

impl IntoFilterComposition for Value {
    fn into_filter_composition(self) -> NodeEdgeResult<Compositable<Filter>> {
        match self {
            Value::Field(field) => field.into_filter_composition(),
            Value::Model(model) => model.into_filter_composition(),
            other => Err(DomainError::InvalidCompositedType(format!(
                "value of type '{}' cannot be composited",
                other.kind()
            ))
            .into()),
        }
    }
}

impl Compositable<Filter> {
    pub fn try_and(self, other: impl IntoFilterComposition) -> NodeEdgeResult<Self> {
        self.try_combine(Operand::And, other)
    }

    pub fn try_or(self, other: impl IntoFilterComposition) -> NodeEdgeResult<Self> {
        self.try_combine(Operand::Or, other)
    }

    fn try_combine(self, operand: Operand, other: impl IntoFilterComposition) -> NodeEdgeResult<Self> {
        Ok(self.combine(operand, other.into_filter_composition()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::model::{FieldDecl, ModelBinder, ModelClass, ModelSchema};
    use crate::ty::FieldKind;

    fn class() -> Arc<ModelClass> {
        ModelBinder::new(Configuration::default())
            .bind(
                ModelSchema::node("Movie")
                    .field(FieldDecl::new("title", FieldKind::Str))
                    .field(FieldDecl::new("year", FieldKind::Int16)),
            )
            .unwrap()
    }

    #[test]
    fn filters_start_as_equal() {
        let title = class().field("title").unwrap();
        let filter = title.filter();
        assert_eq!(filter.lookup(), Lookup::EQUAL);
        assert_eq!(filter.value(), &Slot::Unset);

        let bound = Filter::create_filter(title.set_value("Heat").unwrap());
        assert_eq!(bound.value(), &Slot::Present(Value::from("Heat")));
    }

    #[test]
    fn lookups_set_values() {
        let year = class().field("year").unwrap();
        let filter = year.gt(1990).unwrap();
        assert_eq!(filter.lookup(), Lookup::GT);
        assert_eq!(filter.value(), &Slot::Present(Value::Int(1990)));
        assert!(year.gt("1990").is_err());

        let exists = year.exists().unwrap();
        assert_eq!(exists.lookup(), Lookup::EXISTS);
    }

    #[test]
    fn in_wraps_scalars() {
        let year = class().field("year").unwrap();
        let filter = year.in_(1999).unwrap();
        assert_eq!(filter.lookup(), Lookup::IN);
        assert_eq!(filter.value(), &Slot::Present(Value::List(vec![Value::Int(1999)])));

        let filter = year.in_(vec![Value::Int(1), Value::Int(2)]).unwrap();
        assert_eq!(filter.value(), &Slot::Present(Value::List(vec![1.into(), 2.into()])));
        assert!(year.in_(vec![Value::Int(1), Value::from("x")]).is_err());
    }

    #[test]
    fn negation_allow_list() {
        let title = class().field("title").unwrap();
        let negated = title.equal("Heat").unwrap().negate().unwrap();
        assert_eq!(negated.lookup(), Lookup::NOT | Lookup::EQUAL);
        assert_eq!(negated.value(), &Slot::Present(Value::from("Heat")));
        assert_eq!((!&negated).unwrap().lookup(), Lookup::NOT | Lookup::EQUAL);

        let error = title.lt("b").unwrap().negate().unwrap_err();
        assert_eq!(error, NodeEdgeError::Type("bad operand type for unary ~: 'LT'".into()));
    }

    #[test]
    fn filters_compose() {
        let class = class();
        let title = class.field("title").unwrap();
        let year = class.field("year").unwrap();

        let composed = title.equal("Heat").unwrap() & (year.gt(1990).unwrap() | year.lt(2000).unwrap());
        let composition = composed.as_composition().unwrap();
        assert_eq!(composition.operand(), Operand::And);
        assert!(composition.right().is_composition());
        assert_eq!(composed.items().len(), 3);
    }

    #[test]
    fn try_and_rejects_non_filters() {
        let class = class();
        let title = class.field("title").unwrap();
        let filter = title.equal("Heat").unwrap();

        assert!(filter.try_or(title.like("H%").unwrap()).is_ok());
        assert!(matches!(
            filter.try_and(title.clone()),
            Err(NodeEdgeError::Domain(DomainError::NotAllowedComposition(_)))
        ));

        let movie = Arc::new(class.instantiate(vec![("title", Value::from("Heat")), ("year", Value::Int(1995))]).unwrap());
        let value = movie.get("title").cloned().unwrap();
        assert!(matches!(
            filter.try_and(value),
            Err(NodeEdgeError::Domain(DomainError::NotAllowedComposition(_)))
        ));
        assert!(matches!(
            filter.try_and(movie),
            Err(NodeEdgeError::Domain(DomainError::InvalidCompositedType(_)))
        ));
        assert!(matches!(
            filter.try_and(Value::Int(1)),
            Err(NodeEdgeError::Domain(DomainError::InvalidCompositedType(_)))
        ));
    }
}
