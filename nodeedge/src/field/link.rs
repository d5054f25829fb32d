//!
//! Links to other node models.
//!
//! A link points at a model instance or just at its id, optionally with
//! an instance of a link-property model describing the edge itself.
//!

use std::any::Any;
use std::sync::Arc;

use uuid::Uuid;

use super::{invalid, reuse, Field, FieldType, FieldValues, Represented};
use crate::model::{ModelInstance, ModelKind};
use crate::ty::FieldKind;
use crate::value::Value;
use crate::{NodeEdgeError, NodeEdgeResult};

/// What a link points at.
#[derive(Clone, Debug, PartialEq)]
pub enum LinkData {
    Model(Arc<ModelInstance>),
    Id(Uuid),
}

impl LinkData {
    pub fn id(&self) -> Option<Uuid> {
        match self {
            Self::Model(model) => model.id(),
            Self::Id(id) => Some(*id),
        }
    }

    pub fn model(&self) -> Option<&Arc<ModelInstance>> {
        match self {
            Self::Model(model) => Some(model),
            Self::Id(_) => None,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Model(model) => Value::Model(model.clone()),
            Self::Id(id) => Value::Uuid(*id),
        }
    }
}

/// Normalized link input.
#[derive(Clone, Debug)]
pub enum LinkArg {
    Link(Link),
    Model(Arc<ModelInstance>),
    Id(Uuid),
    Pair(Arc<ModelInstance>, Option<Arc<ModelInstance>>),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Link {
    data: Option<LinkData>,
    property: Option<Arc<ModelInstance>>,
    values: FieldValues,
}

fn ensure_kind(model: &ModelInstance, kind: ModelKind) -> NodeEdgeResult<()> {
    if model.meta().kind() == kind {
        Ok(())
    } else {
        Err(NodeEdgeError::Value(format!(
            "{} is not a {} model",
            model.meta().name(),
            kind
        )))
    }
}

fn invalid_link(value: &Value) -> NodeEdgeError {
    NodeEdgeError::Value(format!("invalid Link value type: '{}'", value.kind()))
}

impl Link {
    pub fn new(data: LinkData, property: Option<Arc<ModelInstance>>) -> NodeEdgeResult<Self> {
        if let LinkData::Model(model) = &data {
            ensure_kind(model, ModelKind::Node)?;
        }
        if let Some(property) = &property {
            ensure_kind(property, ModelKind::LinkProperty)?;
        }
        Ok(Self {
            values: FieldValues::db_only(data.to_value()),
            data: Some(data),
            property,
        })
    }

    /// Classify link input: another link, a model instance, an id, a raw
    /// record (reduced to its id) or a `(model, link property)` pair.
    pub fn check_args(value: Value) -> NodeEdgeResult<LinkArg> {
        match value {
            Value::Field(field) => match field.downcast_ref::<Link>() {
                Some(link) => Ok(LinkArg::Link(link.clone())),
                None => Err(invalid_link(&Value::Field(field))),
            },
            Value::Model(model) => Ok(LinkArg::Model(model)),
            Value::Uuid(id) => Ok(LinkArg::Id(id)),
            Value::Record(record) => Ok(LinkArg::Id(record.id())),
            Value::List(items) | Value::Tuple(items) if items.len() == 2 => {
                let mut items = items.into_iter();
                match (items.next(), items.next()) {
                    (Some(Value::Model(model)), Some(Value::Null)) => Ok(LinkArg::Pair(model, None)),
                    (Some(Value::Model(model)), Some(Value::Model(property))) => {
                        Ok(LinkArg::Pair(model, Some(property)))
                    }
                    _ => Err(NodeEdgeError::Value(
                        "invalid Link value type: expected (model, link property)".to_string(),
                    )),
                }
            }
            other => Err(invalid_link(&other)),
        }
    }

    pub fn get_link_data(&self) -> Option<&LinkData> {
        self.data.as_ref()
    }

    pub fn get_link_property(&self) -> Option<&Arc<ModelInstance>> {
        self.property.as_ref()
    }

    /// Whether only the target id is known.
    pub fn is_id_link(&self) -> bool {
        matches!(self.data, Some(LinkData::Id(_)))
    }

    pub fn target(&self) -> Option<&Arc<ModelInstance>> {
        self.data.as_ref().and_then(LinkData::model)
    }

    pub fn target_id(&self) -> Option<Uuid> {
        self.data.as_ref().and_then(LinkData::id)
    }

    /// A field of the target instance.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Field>> {
        self.target()?.get(name)
    }

    fn db_value(&self) -> Value {
        self.data
            .as_ref()
            .map(LinkData::to_value)
            .unwrap_or(Value::Null)
    }
}

impl FieldType for Link {
    const KIND: FieldKind = FieldKind::Link;

    fn validate(raw: Value) -> NodeEdgeResult<Self> {
        if let Some(field) = reuse(&raw) {
            return Ok(field);
        }
        match Self::check_args(raw)? {
            LinkArg::Link(link) => Ok(link),
            LinkArg::Model(model) => Self::new(LinkData::Model(model), None),
            LinkArg::Id(id) => Self::new(LinkData::Id(id), None),
            LinkArg::Pair(model, property) => Self::new(LinkData::Model(model), property),
        }
    }
}

impl Field for Link {
    fn kind(&self) -> FieldKind {
        FieldKind::Link
    }

    fn as_python_value(&self) -> Represented<'_> {
        self.values.python_or(self)
    }

    fn as_db_value(&self) -> Represented<'_> {
        self.values.db_or(self)
    }

    fn as_jsonable_value(&self) -> NodeEdgeResult<serde_json::Value> {
        self.values.db_json(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_single_link(&self) -> bool {
        true
    }
}

/// Ordered links.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultiLink {
    links: Vec<Link>,
    values: FieldValues,
}

impl MultiLink {
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Link> {
        self.links.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Link> {
        self.links.iter()
    }
}

impl FieldType for MultiLink {
    const KIND: FieldKind = FieldKind::MultiLink;

    fn validate(raw: Value) -> NodeEdgeResult<Self> {
        if let Some(field) = reuse(&raw) {
            return Ok(field);
        }
        let items = match raw {
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => items,
            other => return Err(invalid(Self::KIND, &other)),
        };
        let links = items
            .into_iter()
            .map(Link::validate)
            .collect::<NodeEdgeResult<Vec<_>>>()?;
        Ok(Self {
            values: FieldValues::db_only(Value::List(links.iter().map(Link::db_value).collect())),
            links,
        })
    }
}

impl Field for MultiLink {
    fn kind(&self) -> FieldKind {
        FieldKind::MultiLink
    }

    fn as_python_value(&self) -> Represented<'_> {
        self.values.python_or(self)
    }

    fn as_db_value(&self) -> Represented<'_> {
        self.values.db_or(self)
    }

    fn as_jsonable_value(&self) -> NodeEdgeResult<serde_json::Value> {
        Ok(serde_json::Value::Array(
            self.links
                .iter()
                .map(Link::as_jsonable_value)
                .collect::<NodeEdgeResult<_>>()?,
        ))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_multi_link(&self) -> bool {
        true
    }
}
