//!
//! Pluggable storage backends.
//!
//! A backend is identified by a dotted name `<package>.<namespace...>.<name>`
//! and provides a [`FieldTypeMap`] naming the storage type of every
//! [`FieldKind`].
//!

#[cfg(feature = "edgedb")]
pub mod edgedb;
#[cfg(feature = "postgres")]
pub mod postgres;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::config::Configuration;
use crate::ty::FieldKind;
use crate::value::Value;
use crate::{NodeEdgeError, NodeEdgeResult};

/// Storage type name of a link, fixed or derived from the link target.
#[derive(Clone, Copy, Debug)]
pub enum LinkType {
    Name(&'static str),
    Resolver(fn(Option<&str>) -> String),
}

impl LinkType {
    pub fn resolve(&self, target: Option<&str>) -> String {
        match self {
            Self::Name(name) => name.to_string(),
            Self::Resolver(resolve) => resolve(target),
        }
    }
}

/// Storage type names, one per field kind.
#[derive(Clone, Copy, Debug)]
pub struct FieldTypeMap {
    pub str: &'static str,
    pub int16: &'static str,
    pub int32: &'static str,
    pub int64: &'static str,
    pub bigint: &'static str,
    pub float32: &'static str,
    pub float64: &'static str,
    pub decimal: &'static str,
    pub bool: &'static str,
    pub date: &'static str,
    pub time: &'static str,
    pub naive_datetime: &'static str,
    pub aware_datetime: &'static str,
    pub duration: &'static str,
    pub relative_duration: &'static str,
    pub date_duration: &'static str,
    pub uuid1: &'static str,
    pub uuid3: &'static str,
    pub uuid4: &'static str,
    pub uuid5: &'static str,
    pub bytes: &'static str,
    pub array: &'static str,
    pub set: &'static str,
    pub tuple: &'static str,
    pub named_tuple: &'static str,
    pub json: &'static str,
    pub link: LinkType,
    pub multi_link: LinkType,
}

impl FieldTypeMap {
    /// `link_target` is the node name of the linked model, if known.
    pub fn type_name(&self, kind: FieldKind, link_target: Option<&str>) -> String {
        let name = match kind {
            FieldKind::Str => self.str,
            FieldKind::Int16 => self.int16,
            FieldKind::Int32 => self.int32,
            FieldKind::Int64 => self.int64,
            FieldKind::BigInt => self.bigint,
            FieldKind::Float32 => self.float32,
            FieldKind::Float64 => self.float64,
            FieldKind::Decimal => self.decimal,
            FieldKind::Bool => self.bool,
            FieldKind::Date => self.date,
            FieldKind::Time => self.time,
            FieldKind::NaiveDateTime => self.naive_datetime,
            FieldKind::AwareDateTime => self.aware_datetime,
            FieldKind::Duration => self.duration,
            FieldKind::RelativeDuration => self.relative_duration,
            FieldKind::DateDuration => self.date_duration,
            FieldKind::Uuid1 => self.uuid1,
            FieldKind::Uuid3 => self.uuid3,
            FieldKind::Uuid4 => self.uuid4,
            FieldKind::Uuid5 => self.uuid5,
            FieldKind::Bytes => self.bytes,
            FieldKind::Array => self.array,
            FieldKind::Set => self.set,
            FieldKind::Tuple => self.tuple,
            FieldKind::NamedTuple => self.named_tuple,
            FieldKind::Json => self.json,
            FieldKind::Link => return self.link.resolve(link_target),
            FieldKind::MultiLink => return self.multi_link.resolve(link_target),
        };
        name.to_string()
    }
}

/// A record as returned by a backend driver: an id plus properties.
#[derive(Clone, Debug, PartialEq)]
pub struct RawRecord {
    id: Uuid,
    properties: BTreeMap<String, Value>,
}

impl RawRecord {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            properties: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn to_json(&self) -> NodeEdgeResult<serde_json::Value> {
        let mut object = serde_json::Map::new();
        object.insert(
            "id".to_string(),
            serde_json::Value::String(self.id.hyphenated().to_string()),
        );
        for (name, value) in &self.properties {
            object.insert(name.clone(), value.to_json()?);
        }
        Ok(serde_json::Value::Object(object))
    }
}

/// A resolved backend.
#[derive(Debug)]
pub struct BackendLoader {
    name: String,
    package: String,
    base_namespace: String,
    field_type_map: &'static FieldTypeMap,
}

impl BackendLoader {
    /// Resolve `backend` through the process-wide registry.
    pub fn new(backend: &str) -> NodeEdgeResult<Arc<Self>> {
        BackendRegistry::global().load(backend)
    }

    /// Split `<package>.<namespace...>.<name>` into
    /// `(package, base_namespace, name)`.
    pub fn split(backend: &str) -> NodeEdgeResult<(String, String, String)> {
        let segments: Vec<&str> = backend.split('.').collect();
        if segments.len() < 2 || segments.iter().any(|segment| segment.is_empty()) {
            return Err(NodeEdgeError::Configuration(format!(
                "invalid backend identifier '{}'",
                backend
            )));
        }
        let package = segments[0];
        let name = segments[segments.len() - 1];
        let base_namespace = segments[..segments.len() - 1].join(".");
        Ok((package.to_string(), base_namespace, name.to_string()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn base_namespace(&self) -> &str {
        &self.base_namespace
    }

    pub fn namespace(&self) -> String {
        format!("{}.{}", self.base_namespace, self.name)
    }

    pub fn field_type_map(&self) -> &'static FieldTypeMap {
        self.field_type_map
    }
}

static GLOBAL_REGISTRY: Lazy<BackendRegistry> = Lazy::new(BackendRegistry::with_builtins);

/// Backend modules by namespace, and loaders memoized by identifier.
#[derive(Default)]
pub struct BackendRegistry {
    modules: RwLock<HashMap<String, &'static FieldTypeMap>>,
    loaders: RwLock<HashMap<String, Arc<BackendLoader>>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry knowing the backends compiled into this crate.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        #[cfg(feature = "edgedb")]
        registry.register_module(edgedb::NAMESPACE, &edgedb::TYPE_MAP);
        #[cfg(feature = "postgres")]
        registry.register_module(postgres::NAMESPACE, &postgres::TYPE_MAP);
        registry
    }

    pub fn global() -> &'static Self {
        &GLOBAL_REGISTRY
    }

    pub fn register_module(&self, namespace: impl Into<String>, type_map: &'static FieldTypeMap) {
        let namespace = namespace.into();
        tracing::debug!(namespace = %namespace, "registered backend module");
        self.modules.write().insert(namespace, type_map);
    }

    pub fn load(&self, backend: &str) -> NodeEdgeResult<Arc<BackendLoader>> {
        if let Some(loader) = self.loaders.read().get(backend) {
            return Ok(loader.clone());
        }

        let mut loaders = self.loaders.write();
        if let Some(loader) = loaders.get(backend) {
            return Ok(loader.clone());
        }

        let (package, base_namespace, name) = BackendLoader::split(backend)?;
        let namespace = format!("{}.{}", base_namespace, name);
        let field_type_map = self
            .modules
            .read()
            .get(&namespace)
            .copied()
            .ok_or_else(|| {
                NodeEdgeError::Configuration(format!(
                    "cannot import backend module '{}'",
                    namespace
                ))
            })?;

        let loader = Arc::new(BackendLoader {
            name,
            package,
            base_namespace,
            field_type_map,
        });
        tracing::debug!(backend, namespace = %loader.namespace(), "loaded backend");
        loaders.insert(backend.to_string(), loader.clone());
        Ok(loader)
    }
}

/// The type map of `backend`, through the process-wide registry.
pub fn resolve(backend: &str) -> NodeEdgeResult<&'static FieldTypeMap> {
    Ok(BackendRegistry::global().load(backend)?.field_type_map())
}

/// The type map of the globally configured backend.
pub fn active_type_map() -> NodeEdgeResult<&'static FieldTypeMap> {
    resolve(Configuration::global().backend())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_parts() {
        let (package, base_namespace, name) =
            BackendLoader::split("nodeedge.backends.edgedb").unwrap();
        assert_eq!(package, "nodeedge");
        assert_eq!(base_namespace, "nodeedge.backends");
        assert_eq!(name, "edgedb");

        assert!(BackendLoader::split("edgedb").is_err());
        assert!(BackendLoader::split("nodeedge..edgedb").is_err());
    }

    #[cfg(feature = "edgedb")]
    #[test]
    fn loaders_are_memoized() {
        let registry = BackendRegistry::with_builtins();
        let first = registry.load("nodeedge.backends.edgedb").unwrap();
        let second = registry.load("nodeedge.backends.edgedb").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.namespace(), "nodeedge.backends.edgedb");
        assert_eq!(first.name(), "edgedb");
        assert_eq!(first.package(), "nodeedge");
    }

    #[test]
    fn unknown_backend_is_a_configuration_error() {
        let registry = BackendRegistry::with_builtins();
        let error = registry.load("nodeedge.backends.mysql").unwrap_err();
        assert!(matches!(error, NodeEdgeError::Configuration(_)));
    }

    fn custom_link(target: Option<&str>) -> String {
        format!("ref<{}>", target.unwrap_or("any"))
    }

    #[cfg(feature = "edgedb")]
    #[test]
    fn registered_modules_resolve() {
        static CUSTOM: FieldTypeMap = FieldTypeMap {
            str: "varchar",
            link: LinkType::Resolver(custom_link),
            ..edgedb::TYPE_MAP
        };

        let registry = BackendRegistry::new();
        registry.register_module("acme.stores.custom", &CUSTOM);
        let loader = registry.load("acme.stores.custom").unwrap();
        let type_map = loader.field_type_map();
        assert_eq!(type_map.type_name(FieldKind::Str, None), "varchar");
        assert_eq!(type_map.type_name(FieldKind::Int16, None), "int16");
        assert_eq!(
            type_map.type_name(FieldKind::Link, Some("default::User")),
            "ref<default::User>"
        );
    }

    #[test]
    fn raw_records() {
        let id = Uuid::nil();
        let record = RawRecord::new(id).with("name", "x");
        assert_eq!(record.id(), id);
        assert_eq!(record.get("name"), Some(&Value::Str("x".into())));
        assert_eq!(
            record.to_json().unwrap(),
            serde_json::json!({"id": "00000000-0000-0000-0000-000000000000", "name": "x"})
        );
    }
}
