//!
//! Model schemas and their binding into classes of field handles.
//!
//! Binding is two-phase: a [`ModelSchema`] declares the fields of a model,
//! and [`ModelBinder::bind`] turns it into a [`ModelClass`] whose
//! [`ModelField`]s know their owner, their storage type and, for links,
//! the model classes they point at. Link targets that are not bound yet
//! leave the field deferred until [`ModelBinder::update_forward_refs`].
//!

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::ops::Shr;
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::backends;
use crate::clone::{downcast, AttrValue, Cloneable, CloningAttrs, InitArgs, Overrides, Param};
use crate::config::Configuration;
use crate::field::{validate_kind, Field, Link, MultiLink};
use crate::filter::{Filter, Filterable};
use crate::path::{IntoPathSegment, PathNode, Pathable};
use crate::ty::FieldKind;
use crate::value::{Slot, Value, ValueTypeSet, Valueable, VALUE_ATTR};
use crate::{DomainError, FieldErrors, NodeEdgeError, NodeEdgeResult};

const DECL_ATTR: &str = "decl";
const INFO_ATTR: &str = "info";
const DB_TYPE_ATTR: &str = "db_type";

/// Name of the identity field added to node models on EdgeDB.
pub const ID_FIELD: &str = "id";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ModelKind {
    Node,
    LinkProperty,
}

impl ModelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::LinkProperty => "link property",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModelMeta {
    name: String,
    node_name: Option<String>,
    kind: ModelKind,
}

impl ModelMeta {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn get_node_name(&self) -> NodeEdgeResult<&str> {
        self.node_name().ok_or_else(|| {
            NodeEdgeError::Configuration(format!(
                "required Config.node_name of model {}",
                self.name
            ))
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LinkDecl {
    target: String,
    property: Option<String>,
}

impl LinkDecl {
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }
}

/// One declared attribute of a model.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDecl {
    name: String,
    kind: FieldKind,
    required: bool,
    default: Option<Value>,
    link: Option<LinkDecl>,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            default: None,
            link: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }

    /// Link target model name, and optionally the link-property model name.
    pub fn link_to(mut self, target: impl Into<String>, property: Option<&str>) -> Self {
        self.link = Some(LinkDecl {
            target: target.into(),
            property: property.map(str::to_string),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn link(&self) -> Option<&LinkDecl> {
        self.link.as_ref()
    }
}

/// Declaration of a model before binding.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelSchema {
    meta: ModelMeta,
    fields: Vec<FieldDecl>,
}

impl ModelSchema {
    pub fn node(name: impl Into<String>) -> Self {
        Self::with_kind(name, ModelKind::Node)
    }

    pub fn link_property(name: impl Into<String>) -> Self {
        Self::with_kind(name, ModelKind::LinkProperty)
    }

    fn with_kind(name: impl Into<String>, kind: ModelKind) -> Self {
        Self {
            meta: ModelMeta {
                name: name.into(),
                node_name: None,
                kind,
            },
            fields: vec![],
        }
    }

    pub fn node_name(mut self, node_name: impl Into<String>) -> Self {
        self.meta.node_name = Some(node_name.into());
        self
    }

    pub fn field(mut self, decl: FieldDecl) -> Self {
        self.fields.push(decl);
        self
    }

    pub fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }
}

/// Binding information of a [`ModelField`].
#[derive(Clone, Debug, PartialEq)]
pub struct FieldInfo {
    model: Arc<ModelMeta>,
    deferred: bool,
    is_single_link: bool,
    is_multi_link: bool,
    link_model: Option<Arc<ModelMeta>>,
    link_property_model: Option<Arc<ModelMeta>>,
}

impl FieldInfo {
    /// The owning model.
    pub fn model(&self) -> &ModelMeta {
        &self.model
    }

    /// Whether a link target was not bound yet.
    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    pub fn is_single_link(&self) -> bool {
        self.is_single_link
    }

    pub fn is_multi_link(&self) -> bool {
        self.is_multi_link
    }

    pub fn link_model(&self) -> Option<&ModelMeta> {
        self.link_model.as_deref()
    }

    pub fn link_property_model(&self) -> Option<&ModelMeta> {
        self.link_property_model.as_deref()
    }
}

fn resolve_info(
    owner: &Arc<ModelMeta>,
    decl: &FieldDecl,
    lookup: &dyn Fn(&str) -> Option<Arc<ModelMeta>>,
) -> FieldInfo {
    let mut info = FieldInfo {
        model: owner.clone(),
        deferred: false,
        is_single_link: decl.kind.is_single_link(),
        is_multi_link: decl.kind.is_multi_link(),
        link_model: None,
        link_property_model: None,
    };

    let link = match decl.link() {
        Some(link) => link,
        None => return info,
    };

    let mut resolve = |name: &str, kind: ModelKind| -> Option<Arc<ModelMeta>> {
        let resolved = match lookup(name) {
            Some(meta) => meta,
            None => {
                info.deferred = true;
                return None;
            }
        };
        if resolved.kind != kind {
            tracing::warn!(
                model = %owner.name,
                field = %decl.name,
                linked = %name,
                "linked model is not a {} model, ignoring it",
                kind
            );
            return None;
        }
        Some(resolved)
    };

    let link_model = resolve(link.target(), ModelKind::Node);
    let link_property_model = link
        .property()
        .and_then(|property| resolve(property, ModelKind::LinkProperty));

    info.link_model = link_model;
    info.link_property_model = link_property_model;
    if info.deferred {
        tracing::debug!(
            model = %owner.name,
            field = %decl.name,
            "deferring field until its linked models are bound"
        );
    }
    info
}

/// A field handle bound to one declared attribute of a model class.
#[derive(Clone, Debug)]
pub struct ModelField {
    decl: Arc<FieldDecl>,
    info: Arc<FieldInfo>,
    db_type: Arc<str>,
    value: Slot<Value>,
    value_type: OnceCell<ValueTypeSet>,
}

impl ModelField {
    fn new(decl: Arc<FieldDecl>, info: Arc<FieldInfo>, db_type: Arc<str>) -> Self {
        Self {
            decl,
            info,
            db_type,
            value: Slot::Unset,
            value_type: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.decl.name
    }

    pub fn kind(&self) -> FieldKind {
        self.decl.kind
    }

    pub fn decl(&self) -> &FieldDecl {
        &self.decl
    }

    pub fn info(&self) -> &FieldInfo {
        &self.info
    }

    /// Storage type name under the backend the class was bound with.
    pub fn db_type(&self) -> &str {
        &self.db_type
    }

    pub fn is_required(&self) -> bool {
        self.decl.required
    }

    /// Validate `raw` as a value of this field.
    pub fn validate(&self, raw: Value) -> NodeEdgeResult<Arc<dyn Field>> {
        let field = validate_kind(self.decl.kind, raw)?;
        if let Some(link) = field.downcast_ref::<Link>() {
            self.check_link_target(link)?;
        } else if let Some(links) = field.downcast_ref::<MultiLink>() {
            for link in links.iter() {
                self.check_link_target(link)?;
            }
        }
        Ok(field)
    }

    fn check_link_target(&self, link: &Link) -> NodeEdgeResult<()> {
        let (expected, target) = match (self.info.link_model(), link.target()) {
            (Some(expected), Some(target)) => (expected, target),
            _ => return Ok(()),
        };
        if target.meta().name() == expected.name() {
            Ok(())
        } else {
            Err(NodeEdgeError::Value(format!(
                "expected {} instance, got {}",
                expected.name(),
                target.meta().name()
            )))
        }
    }

    pub fn filter(&self) -> Filter {
        Filter::create_filter(self.clone())
    }

    pub fn equal(&self, value: impl Into<Value>) -> NodeEdgeResult<Filter> {
        self.filter().equal(value)
    }

    pub fn in_(&self, value: impl Into<Value>) -> NodeEdgeResult<Filter> {
        self.filter().in_(value)
    }

    pub fn lt(&self, value: impl Into<Value>) -> NodeEdgeResult<Filter> {
        self.filter().lt(value)
    }

    pub fn le(&self, value: impl Into<Value>) -> NodeEdgeResult<Filter> {
        self.filter().le(value)
    }

    pub fn gt(&self, value: impl Into<Value>) -> NodeEdgeResult<Filter> {
        self.filter().gt(value)
    }

    pub fn ge(&self, value: impl Into<Value>) -> NodeEdgeResult<Filter> {
        self.filter().ge(value)
    }

    pub fn like(&self, value: impl Into<Value>) -> NodeEdgeResult<Filter> {
        self.filter().like(value)
    }

    pub fn ilike(&self, value: impl Into<Value>) -> NodeEdgeResult<Filter> {
        self.filter().ilike(value)
    }

    pub fn exists(&self) -> NodeEdgeResult<Filter> {
        self.filter().exists()
    }
}

impl PartialEq for ModelField {
    fn eq(&self, other: &Self) -> bool {
        self.info.model.name == other.info.model.name
            && self.decl.name == other.decl.name
            && self.value == other.value
    }
}

impl Cloneable for ModelField {
    fn signature() -> &'static [Param] {
        const SIGNATURE: &[Param] = &[
            Param::positional(DECL_ATTR),
            Param::positional(INFO_ATTR),
            Param::positional(DB_TYPE_ATTR),
        ];
        SIGNATURE
    }

    fn cloning_attrs() -> CloningAttrs {
        CloningAttrs::Set(&[VALUE_ATTR])
    }

    fn get_attr(&self, name: &str) -> Option<AttrValue> {
        match name {
            DECL_ATTR => Some(Box::new(self.decl.clone())),
            INFO_ATTR => Some(Box::new(self.info.clone())),
            DB_TYPE_ATTR => Some(Box::new(self.db_type.clone())),
            VALUE_ATTR => Some(Box::new(self.value.clone())),
            _ => None,
        }
    }

    fn set_attr(&mut self, name: &str, value: AttrValue) -> NodeEdgeResult<()> {
        match name {
            VALUE_ATTR => self.value = downcast(name, value)?,
            INFO_ATTR => self.info = downcast(name, value)?,
            _ => {
                return Err(NodeEdgeError::Type(format!(
                    "cannot assign attribute '{}' of ModelField",
                    name
                )))
            }
        }
        Ok(())
    }

    fn construct(mut args: InitArgs) -> NodeEdgeResult<Self> {
        Ok(Self::new(
            args.take(DECL_ATTR)?,
            args.take(INFO_ATTR)?,
            args.take(DB_TYPE_ATTR)?,
        ))
    }
}

impl Valueable for ModelField {
    fn value(&self) -> &Slot<Value> {
        &self.value
    }

    fn value_type(&self) -> &ValueTypeSet {
        self.value_type.get_or_init(|| self.decl.kind.value_types())
    }
}

impl Pathable for ModelField {}

impl IntoPathSegment<ModelField> for &ModelField {
    fn into_path_segment(self) -> NodeEdgeResult<ModelField> {
        Ok(self.clone())
    }
}

impl IntoPathSegment<ModelField> for Arc<ModelInstance> {
    fn into_path_segment(self) -> NodeEdgeResult<ModelField> {
        Err(DomainError::InvalidPath(format!("{} instance cannot be a path segment", self.meta().name())).into())
    }
}

impl IntoPathSegment<ModelField> for &ModelInstance {
    fn into_path_segment(self) -> NodeEdgeResult<ModelField> {
        Err(DomainError::InvalidPath(format!("{} instance cannot be a path segment", self.meta().name())).into())
    }
}

impl IntoPathSegment<ModelField> for Arc<dyn Field> {
    fn into_path_segment(self) -> NodeEdgeResult<ModelField> {
        Err(DomainError::NotAllowedPath(format!(
            "{} field value is not a model field",
            self.kind()
        ))
        .into())
    }
}

impl IntoPathSegment<ModelField> for Value {
    fn into_path_segment(self) -> NodeEdgeResult<ModelField> {
        match self {
            Value::Field(field) => field.into_path_segment(),
            Value::Model(model) => model.into_path_segment(),
            other => Err(DomainError::InvalidPath(format!(
                "value of type '{}' cannot be a path segment",
                other.kind()
            ))
            .into()),
        }
    }
}

impl<S: IntoPathSegment<ModelField>> Shr<S> for ModelField {
    type Output = NodeEdgeResult<PathNode<ModelField>>;

    fn shr(self, other: S) -> Self::Output {
        PathNode::new(self).step_forward(other)
    }
}

impl<S: IntoPathSegment<ModelField>> Shr<S> for PathNode<ModelField> {
    type Output = NodeEdgeResult<PathNode<ModelField>>;

    fn shr(self, other: S) -> Self::Output {
        self.step_forward(other)
    }
}

impl Shr<ModelField> for NodeEdgeResult<PathNode<ModelField>> {
    type Output = NodeEdgeResult<PathNode<ModelField>>;

    fn shr(self, other: ModelField) -> Self::Output {
        self?.step_forward(other)
    }
}

/// A bound model: its metadata and field handles in declaration order.
#[derive(Debug)]
pub struct ModelClass {
    meta: Arc<ModelMeta>,
    fields: RwLock<Vec<ModelField>>,
}

impl ModelClass {
    pub fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn fields(&self) -> Vec<ModelField> {
        self.fields.read().clone()
    }

    /// The class-level handle of field `name`.
    pub fn field(&self, name: &str) -> NodeEdgeResult<ModelField> {
        self.fields
            .read()
            .iter()
            .find(|field| field.name() == name)
            .cloned()
            .ok_or_else(|| NodeEdgeError::UnknownField {
                model: self.meta.name.clone(),
                field: name.to_string(),
            })
    }

    pub fn is_deferred(&self) -> bool {
        self.fields.read().iter().any(|field| field.info.deferred)
    }

    /// Re-resolve deferred link fields against `models`; returns how many
    /// fields were resolved.
    pub fn update_forward_refs(&self, models: &[Arc<ModelClass>]) -> NodeEdgeResult<usize> {
        let lookup = |name: &str| {
            if name == self.meta.name {
                return Some(self.meta.clone());
            }
            models
                .iter()
                .find(|model| model.name() == name)
                .map(|model| model.meta.clone())
        };

        let mut resolved = 0;
        let mut fields = self.fields.write();
        for field in fields.iter_mut() {
            if !field.info.deferred {
                continue;
            }
            let info = resolve_info(&self.meta, &field.decl, &lookup);
            if info.deferred {
                continue;
            }
            *field = field.clone_with(Overrides::new().arg(INFO_ATTR, Arc::new(info)))?;
            resolved += 1;
        }
        if resolved > 0 {
            tracing::debug!(model = %self.meta.name, resolved, "updated forward references");
        }
        Ok(resolved)
    }

    /// Validate `values` field by field into an instance.
    pub fn instantiate<I, K, V>(self: &Arc<Self>, values: I) -> NodeEdgeResult<ModelInstance>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut raw: BTreeMap<String, Value> = values
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();

        let mut errors = vec![];
        let mut validated = vec![];
        for field in self.fields.read().iter() {
            let value = raw
                .remove(field.name())
                .or_else(|| field.decl.default.clone());
            match value {
                None | Some(Value::Null) if !field.is_required() => {}
                None => errors.push((
                    field.name().to_string(),
                    NodeEdgeError::Value("field required".to_string()),
                )),
                Some(Value::Null) => errors.push((
                    field.name().to_string(),
                    NodeEdgeError::Value("none is not an allowed value".to_string()),
                )),
                Some(value) => match field.validate(value) {
                    Ok(value) => validated.push((field.name().to_string(), value)),
                    Err(error) => errors.push((field.name().to_string(), error)),
                },
            }
        }

        for name in raw.keys() {
            tracing::debug!(model = %self.meta.name, field = %name, "ignoring undeclared field");
        }

        if !errors.is_empty() {
            return Err(NodeEdgeError::Validation {
                model: self.meta.name.clone(),
                errors: FieldErrors(errors),
            });
        }

        Ok(ModelInstance {
            class: self.clone(),
            values: validated,
        })
    }
}

/// A validated record of one model class.
#[derive(Clone, Debug)]
pub struct ModelInstance {
    class: Arc<ModelClass>,
    values: Vec<(String, Arc<dyn Field>)>,
}

impl ModelInstance {
    pub fn class(&self) -> &Arc<ModelClass> {
        &self.class
    }

    pub fn meta(&self) -> &ModelMeta {
        self.class.meta()
    }

    /// The populated field value of attribute `name`.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Field>> {
        self.values
            .iter()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, field)| field)
    }

    pub fn field<F: Field>(&self, name: &str) -> Option<&F> {
        self.get(name)?.downcast_ref()
    }

    pub fn id(&self) -> Option<Uuid> {
        match self.get(ID_FIELD)?.as_python_value().value() {
            Some(Value::Uuid(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Field>)> + '_ {
        self.values.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn as_jsonable_value(&self) -> NodeEdgeResult<serde_json::Value> {
        let mut object = serde_json::Map::new();
        for (name, field) in &self.values {
            object.insert(name.clone(), field.as_jsonable_value()?);
        }
        Ok(serde_json::Value::Object(object))
    }
}

impl PartialEq for ModelInstance {
    fn eq(&self, other: &Self) -> bool {
        self.meta().name() == other.meta().name()
            && self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|((a_name, a), (b_name, b))| {
                    a_name == b_name
                        && a.kind() == b.kind()
                        && a.as_db_value().value() == b.as_db_value().value()
                })
    }
}

static GLOBAL_BINDER: Lazy<ModelBinder> =
    Lazy::new(|| ModelBinder::new(Configuration::global().clone()));

/// Binds schemas into classes and keeps the bound classes by name.
#[derive(Debug)]
pub struct ModelBinder {
    config: Configuration,
    classes: RwLock<BTreeMap<String, Arc<ModelClass>>>,
}

impl ModelBinder {
    pub fn new(config: Configuration) -> Self {
        Self {
            config,
            classes: RwLock::new(BTreeMap::new()),
        }
    }

    /// The binder used by [`Model`] implementations.
    pub fn global() -> &'static Self {
        &GLOBAL_BINDER
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn get(&self, name: &str) -> Option<Arc<ModelClass>> {
        self.classes.read().get(name).cloned()
    }

    pub fn bind(&self, schema: ModelSchema) -> NodeEdgeResult<Arc<ModelClass>> {
        let ModelSchema { meta, mut fields } = schema;

        let mut names = HashSet::new();
        for decl in &fields {
            if !names.insert(decl.name.as_str()) {
                return Err(NodeEdgeError::Configuration(format!(
                    "duplicate field '{}' in model {}",
                    decl.name, meta.name
                )));
            }
            match (decl.kind.is_link(), decl.link.is_some()) {
                (true, false) => {
                    return Err(NodeEdgeError::Configuration(format!(
                        "link field '{}' of model {} has no target model",
                        decl.name, meta.name
                    )))
                }
                (false, true) => {
                    return Err(NodeEdgeError::Configuration(format!(
                        "field '{}' of model {} is not a link but declares a target model",
                        decl.name, meta.name
                    )))
                }
                _ => {}
            }
        }

        if meta.kind == ModelKind::Node
            && self.config.is_edgedb_backend()
            && !names.contains(ID_FIELD)
        {
            fields.insert(0, FieldDecl::new(ID_FIELD, FieldKind::Uuid1).optional());
        }

        let type_map = backends::resolve(self.config.backend())?;
        let meta = Arc::new(meta);

        let model_fields = {
            let classes = self.classes.read();
            let lookup = |name: &str| {
                if name == meta.name {
                    return Some(meta.clone());
                }
                classes.get(name).map(|class| class.meta.clone())
            };
            fields
                .into_iter()
                .map(|decl| {
                    let info = resolve_info(&meta, &decl, &lookup);
                    let db_type = type_map.type_name(decl.kind, decl.link().map(LinkDecl::target));
                    ModelField::new(Arc::new(decl), Arc::new(info), db_type.into())
                })
                .collect::<Vec<_>>()
        };

        let class = Arc::new(ModelClass {
            meta: meta.clone(),
            fields: RwLock::new(model_fields),
        });

        if self
            .classes
            .write()
            .insert(meta.name.clone(), class.clone())
            .is_some()
        {
            tracing::warn!(model = %meta.name, "replacing previously bound model class");
        }
        tracing::debug!(model = %meta.name, deferred = class.is_deferred(), "bound model class");
        Ok(class)
    }

    /// Re-resolve deferred fields of every bound class.
    pub fn update_forward_refs(&self) -> NodeEdgeResult<usize> {
        let classes: Vec<_> = self.classes.read().values().cloned().collect();
        let mut resolved = 0;
        for class in &classes {
            resolved += class.update_forward_refs(&classes)?;
        }
        Ok(resolved)
    }
}

/// A model type with a statically declared schema.
///
/// Usually implemented by `#[nodeedge::model]`.
pub trait Model: Sized + 'static {
    fn schema() -> ModelSchema;

    /// The class bound from [`Model::schema`] on first use.
    fn class() -> NodeEdgeResult<Arc<ModelClass>>;

    fn create<I, K, V>(values: I) -> NodeEdgeResult<ModelInstance>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::class()?.instantiate(values)
    }

    fn field(name: &str) -> NodeEdgeResult<ModelField> {
        Self::class()?.field(name)
    }

    fn update_forward_refs() -> NodeEdgeResult<usize> {
        Self::class()?;
        ModelBinder::global().update_forward_refs()
    }
}

/// Per-type storage of a lazily bound class.
pub struct ClassCell(OnceCell<Arc<ModelClass>>);

impl ClassCell {
    pub const fn new() -> Self {
        Self(OnceCell::new())
    }

    pub fn get_or_bind(&self, schema: fn() -> ModelSchema) -> NodeEdgeResult<Arc<ModelClass>> {
        self.0
            .get_or_try_init(|| ModelBinder::global().bind(schema()))
            .cloned()
    }
}

impl Default for ClassCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Str;

    fn binder() -> ModelBinder {
        ModelBinder::new(Configuration::default())
    }

    fn user() -> ModelSchema {
        ModelSchema::node("User")
            .node_name("default::User")
            .field(FieldDecl::new("name", FieldKind::Str))
            .field(FieldDecl::new("nick", FieldKind::Str).optional())
            .field(FieldDecl::new("friend", FieldKind::Link).optional().link_to("User", None))
    }

    #[test]
    fn binds_fields_with_id() {
        let class = binder().bind(user()).unwrap();
        let names: Vec<_> = class.fields().iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names, ["id", "name", "nick", "friend"]);

        let name = class.field("name").unwrap();
        assert_eq!(name.info().model().name(), "User");
        assert_eq!(name.db_type(), "str");
        assert!(!name.info().is_deferred());

        let friend = class.field("friend").unwrap();
        assert!(friend.info().is_single_link());
        assert_eq!(friend.info().link_model().map(ModelMeta::name), Some("User"));

        assert_eq!(
            class.field("age").unwrap_err(),
            NodeEdgeError::UnknownField {
                model: "User".into(),
                field: "age".into()
            }
        );
    }

    #[test]
    fn link_properties_have_no_id() {
        let class = binder()
            .bind(ModelSchema::link_property("Since").field(FieldDecl::new("year", FieldKind::Int16)))
            .unwrap();
        assert!(class.field(ID_FIELD).is_err());
        assert!(class.meta().get_node_name().is_err());
    }

    #[test]
    fn deferred_links_resolve_later() {
        let binder = binder();
        let post = binder
            .bind(
                ModelSchema::node("Post")
                    .field(FieldDecl::new("author", FieldKind::Link).link_to("Author", None)),
            )
            .unwrap();
        assert!(post.field("author").unwrap().info().is_deferred());
        assert!(post.is_deferred());

        binder.bind(ModelSchema::node("Author")).unwrap();
        assert_eq!(binder.update_forward_refs().unwrap(), 1);

        let author = post.field("author").unwrap();
        assert!(!author.info().is_deferred());
        assert_eq!(author.info().link_model().map(ModelMeta::name), Some("Author"));
    }

    #[test]
    fn wrong_link_model_kinds_are_dropped() {
        let binder = binder();
        binder.bind(ModelSchema::link_property("Since")).unwrap();
        let class = binder
            .bind(
                ModelSchema::node("Person")
                    .field(FieldDecl::new("knows", FieldKind::Link).link_to("Since", Some("Person"))),
            )
            .unwrap();
        let knows = class.field("knows").unwrap();
        assert_eq!(knows.info().link_model(), None);
        assert_eq!(knows.info().link_property_model(), None);
        assert!(!knows.info().is_deferred());
    }

    #[test]
    fn malformed_schemas_are_rejected() {
        let duplicate = ModelSchema::node("A")
            .field(FieldDecl::new("x", FieldKind::Str))
            .field(FieldDecl::new("x", FieldKind::Str));
        assert!(matches!(binder().bind(duplicate), Err(NodeEdgeError::Configuration(_))));

        let untargeted = ModelSchema::node("B").field(FieldDecl::new("l", FieldKind::Link));
        assert!(matches!(binder().bind(untargeted), Err(NodeEdgeError::Configuration(_))));

        let targeted = ModelSchema::node("C").field(FieldDecl::new("s", FieldKind::Str).link_to("C", None));
        assert!(matches!(binder().bind(targeted), Err(NodeEdgeError::Configuration(_))));
    }

    #[test]
    fn instantiate_validates_each_field() {
        let class = binder().bind(user()).unwrap();
        let instance = class.instantiate([("name", "ann")]).unwrap();
        assert_eq!(instance.field::<Str>("name").and_then(Str::as_str), Some("ann"));
        assert!(instance.get("nick").is_none());
        assert_eq!(instance.id(), None);

        let error = class
            .instantiate([("nick", Value::Int(1))])
            .unwrap_err();
        match error {
            NodeEdgeError::Validation { model, errors } => {
                assert_eq!(model, "User");
                assert_eq!(errors.len(), 2);
                assert_eq!(
                    errors.get("name"),
                    Some(&NodeEdgeError::Value("field required".into()))
                );
                assert!(errors.get("nick").is_some());
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn links_check_their_target_model() {
        let binder = binder();
        let users = binder.bind(user()).unwrap();
        let other = binder.bind(ModelSchema::node("Other")).unwrap();

        let ann = Arc::new(users.instantiate([("name", "ann")]).unwrap());
        let bob = users
            .instantiate(vec![("name", Value::from("bob")), ("friend", Value::Model(ann.clone()))])
            .unwrap();
        let friend = bob.field::<Link>("friend").unwrap();
        assert_eq!(friend.target(), Some(&ann));
        assert_eq!(friend.get("name").map(|f| f.kind()), Some(FieldKind::Str));

        let stranger = Arc::new(other.instantiate(Vec::<(String, Value)>::new()).unwrap());
        assert!(users
            .instantiate(vec![("name", Value::from("eve")), ("friend", Value::Model(stranger))])
            .is_err());
    }

    #[test]
    fn handles_carry_filter_values() {
        let class = binder().bind(user()).unwrap();
        let name = class.field("name").unwrap();
        let bound = name.set_value("ann").unwrap();
        assert_eq!(bound.value(), &Slot::Present(Value::from("ann")));
        assert_eq!(name.value(), &Slot::Unset);
        assert!(name.set_value(1).is_err());
    }

    #[test]
    fn path_segments() {
        let class = binder().bind(user()).unwrap();
        let friend = class.field("friend").unwrap();
        let name = class.field("name").unwrap();

        let path = (friend.clone() >> friend.clone() >> name.clone()).unwrap();
        assert_eq!(path.current_path(), &friend);
        assert_eq!(path.forward_path(), Some(&name));
        assert_eq!(path.backward_path(), Some(&friend));

        let ann = Arc::new(class.instantiate([("name", "ann")]).unwrap());
        assert!(matches!(
            friend.clone() >> ann.clone(),
            Err(NodeEdgeError::Domain(DomainError::InvalidPath(_)))
        ));
        let value = ann.get("name").cloned().unwrap();
        assert!(matches!(
            friend >> value,
            Err(NodeEdgeError::Domain(DomainError::NotAllowedPath(_)))
        ));
    }

    #[test]
    fn jsonable_instances() {
        let class = binder().bind(user()).unwrap();
        let instance = class.instantiate([("name", "ann")]).unwrap();
        assert_eq!(
            instance.as_jsonable_value().unwrap(),
            serde_json::json!({ "name": "ann" })
        );
    }
}
