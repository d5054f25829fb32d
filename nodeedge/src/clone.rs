//!
//! Copy-with-overrides for value holding types.
//!
//! A [`Cloneable`] type describes its constructor through [`Cloneable::signature`]
//! and a set of carry-over attributes that are copied onto the new object after
//! construction. The derived [`CloneShape`] is computed once per type and cached
//! in the [`CloneRegistry`].
//!

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::{NodeEdgeError, NodeEdgeResult};

pub type AttrValue = Box<dyn Any + Send + Sync>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParamKind {
    PositionalOnly,
    PositionalOrKeyword,
    VarPositional,
    KeywordOnly,
    VarKeyword,
}

impl ParamKind {
    fn is_positional(self) -> bool {
        matches!(
            self,
            Self::PositionalOnly | Self::PositionalOrKeyword | Self::VarPositional
        )
    }
}

/// One constructor parameter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Param {
    pub name: &'static str,
    pub kind: ParamKind,
}

impl Param {
    pub const fn positional(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::PositionalOrKeyword,
        }
    }

    pub const fn keyword(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::KeywordOnly,
        }
    }

    pub const fn new(name: &'static str, kind: ParamKind) -> Self {
        Self { name, kind }
    }
}

/// Declared carry-over attribute names.
#[derive(Clone, Copy, Debug)]
pub enum CloningAttrs {
    Set(&'static [&'static str]),
    Sequence(&'static [&'static str]),
}

impl CloningAttrs {
    pub const fn empty() -> Self {
        Self::Set(&[])
    }

    pub fn names(&self) -> &'static [&'static str] {
        match self {
            Self::Set(names) | Self::Sequence(names) => names,
        }
    }

    fn validate(&self, owner: &str) -> NodeEdgeResult<()> {
        let names = self.names();
        for (index, name) in names.iter().enumerate() {
            if !is_identifier(name) {
                return Err(NodeEdgeError::Configuration(format!(
                    "`{}` declares invalid cloning attribute {:?}",
                    owner, name
                )));
            }
            if let Self::Set(_) = self {
                if names[..index].contains(name) {
                    return Err(NodeEdgeError::Configuration(format!(
                        "`{}` declares cloning attribute '{}' twice",
                        owner, name
                    )));
                }
            }
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_alphabetic() => {
            chars.all(|c| c == '_' || c.is_alphanumeric())
        }
        _ => false,
    }
}

/// Constructor and carry-over layout of one cloneable type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CloneShape {
    type_name: &'static str,
    init_args: Vec<&'static str>,
    init_kwargs: BTreeSet<&'static str>,
    cloning_attrs: BTreeSet<&'static str>,
}

impl CloneShape {
    pub fn compute<T: Cloneable>() -> NodeEdgeResult<Self> {
        let type_name = std::any::type_name::<T>();

        let mut init_args = vec![];
        let mut init_kwargs = BTreeSet::new();
        for param in T::signature() {
            if param.kind.is_positional() {
                init_args.push(param.name);
            } else {
                init_kwargs.insert(param.name);
            }
        }

        let mut cloning_attrs = BTreeSet::new();
        for attrs in T::inherited_cloning_attrs()
            .into_iter()
            .chain(std::iter::once(T::cloning_attrs()))
        {
            attrs.validate(type_name)?;
            cloning_attrs.extend(attrs.names().iter().copied());
        }

        Ok(Self {
            type_name,
            init_args,
            init_kwargs,
            cloning_attrs,
        })
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Positional constructor parameter names, in order.
    pub fn init_args(&self) -> &[&'static str] {
        &self.init_args
    }

    pub fn init_kwargs(&self) -> &BTreeSet<&'static str> {
        &self.init_kwargs
    }

    pub fn cloning_attrs(&self) -> &BTreeSet<&'static str> {
        &self.cloning_attrs
    }
}

/// Named, type-erased attribute values.
#[derive(Default)]
pub struct Attrs {
    values: BTreeMap<&'static str, AttrValue>,
}

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<V: Any + Send + Sync>(&mut self, name: &'static str, value: V) {
        self.values.insert(name, Box::new(value));
    }

    pub fn insert_boxed(&mut self, name: &'static str, value: AttrValue) {
        self.values.insert(name, value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        self.values.remove(name)
    }

    /// Remove and downcast. A missing or mistyped value is a type error.
    pub fn take<V: Any>(&mut self, name: &str) -> NodeEdgeResult<V> {
        match self.values.remove(name) {
            Some(value) => downcast(name, value),
            None => Err(NodeEdgeError::Type(format!(
                "missing required argument: '{}'",
                name
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }
}

impl IntoIterator for Attrs {
    type Item = (&'static str, AttrValue);
    type IntoIter = std::collections::btree_map::IntoIter<&'static str, AttrValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl fmt::Debug for Attrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

/// Arguments handed to [`Cloneable::construct`].
#[derive(Debug, Default)]
pub struct InitArgs {
    positional: Vec<(&'static str, AttrValue)>,
    keyword: Attrs,
}

impl InitArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional<V: Any + Send + Sync>(mut self, name: &'static str, value: V) -> Self {
        self.positional.push((name, Box::new(value)));
        self
    }

    pub fn keyword<V: Any + Send + Sync>(mut self, name: &'static str, value: V) -> Self {
        self.keyword.insert(name, value);
        self
    }

    pub fn take<V: Any>(&mut self, name: &str) -> NodeEdgeResult<V> {
        if let Some(index) = self.positional.iter().position(|(n, _)| *n == name) {
            let (_, value) = self.positional.remove(index);
            return downcast(name, value);
        }
        self.keyword.take(name)
    }

    /// Like [`InitArgs::take`], but an absent argument is `None`.
    pub fn take_opt<V: Any>(&mut self, name: &str) -> NodeEdgeResult<Option<V>> {
        let present = self.positional.iter().any(|(n, _)| *n == name) || self.keyword.contains(name);
        if present {
            self.take(name).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn positional_names(&self) -> Vec<&'static str> {
        self.positional.iter().map(|(name, _)| *name).collect()
    }

    pub fn keyword_names(&self) -> Vec<&'static str> {
        self.keyword.names().collect()
    }
}

/// Overrides for one [`Cloneable::clone_with`] call.
#[derive(Debug, Default)]
pub struct Overrides {
    /// Constructor arguments by name. Positional names are placed
    /// positionally, others suppress the matching keyword argument.
    pub args: Attrs,
    pub kwargs: Attrs,
    /// Assigned on the new object after construction.
    pub attrs: Attrs,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg<V: Any + Send + Sync>(mut self, name: &'static str, value: V) -> Self {
        self.args.insert(name, value);
        self
    }

    pub fn kwarg<V: Any + Send + Sync>(mut self, name: &'static str, value: V) -> Self {
        self.kwargs.insert(name, value);
        self
    }

    pub fn attr<V: Any + Send + Sync>(mut self, name: &'static str, value: V) -> Self {
        self.attrs.insert(name, value);
        self
    }
}

pub fn downcast<V: Any>(name: &str, value: AttrValue) -> NodeEdgeResult<V> {
    let value: Box<dyn Any> = value;
    value
        .downcast::<V>()
        .map(|value| *value)
        .map_err(|_| NodeEdgeError::Type(format!("bad value type for attribute '{}'", name)))
}

pub trait Cloneable: Sized + Send + Sync + 'static {
    /// Constructor parameters.
    fn signature() -> &'static [Param];

    /// Carry-over attributes declared by this type.
    fn cloning_attrs() -> CloningAttrs {
        CloningAttrs::empty()
    }

    /// Carry-over attributes declared by the capabilities this type builds on.
    fn inherited_cloning_attrs() -> Vec<CloningAttrs> {
        vec![]
    }

    /// Read an attribute or constructor argument by name.
    fn get_attr(&self, name: &str) -> Option<AttrValue>;

    fn set_attr(&mut self, name: &str, value: AttrValue) -> NodeEdgeResult<()>;

    fn construct(args: InitArgs) -> NodeEdgeResult<Self>;

    fn clone_shape() -> NodeEdgeResult<Arc<CloneShape>> {
        CloneRegistry::global().shape_of::<Self>()
    }

    fn clone_with(&self, overrides: Overrides) -> NodeEdgeResult<Self> {
        clone_with(self, overrides)
    }
}

/// Build a new `T` from `source`:
///
/// 1. positional constructor arguments come from `overrides.args`, else from `source`
/// 2. keyword arguments named in `overrides.args` are left out, the rest come from
///    `overrides.kwargs`, else from `source`
/// 3. carry-over attributes not named in `overrides.attrs` are copied from `source`
/// 4. `overrides.attrs` are assigned last
pub fn clone_with<T: Cloneable>(source: &T, overrides: Overrides) -> NodeEdgeResult<T> {
    let shape = T::clone_shape()?;
    let Overrides {
        mut args,
        mut kwargs,
        attrs,
    } = overrides;

    let mut init = InitArgs::new();
    for name in shape.init_args() {
        let value = match args.remove(name) {
            Some(value) => value,
            None => source_attr(source, &shape, name)?,
        };
        init.positional.push((name, value));
    }

    for name in shape.init_kwargs() {
        if args.contains(name) {
            continue;
        }
        let value = match kwargs.remove(name) {
            Some(value) => value,
            None => source_attr(source, &shape, name)?,
        };
        init.keyword.insert_boxed(name, value);
    }

    let mut cloned = T::construct(init)?;

    for name in shape.cloning_attrs() {
        if attrs.contains(name) {
            continue;
        }
        if let Some(value) = source.get_attr(name) {
            cloned.set_attr(name, value)?;
        }
    }

    for (name, value) in attrs {
        cloned.set_attr(name, value)?;
    }

    Ok(cloned)
}

fn source_attr<T: Cloneable>(source: &T, shape: &CloneShape, name: &str) -> NodeEdgeResult<AttrValue> {
    source.get_attr(name).ok_or_else(|| {
        NodeEdgeError::Configuration(format!(
            "`{}` cannot supply constructor argument '{}'",
            shape.type_name(),
            name
        ))
    })
}

static GLOBAL_REGISTRY: Lazy<CloneRegistry> = Lazy::new(CloneRegistry::new);

/// Computed [`CloneShape`]s by type.
#[derive(Default)]
pub struct CloneRegistry {
    shapes: RwLock<HashMap<TypeId, Arc<CloneShape>>>,
}

impl CloneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static Self {
        &GLOBAL_REGISTRY
    }

    pub fn shape_of<T: Cloneable>(&self) -> NodeEdgeResult<Arc<CloneShape>> {
        let key = TypeId::of::<T>();
        if let Some(shape) = self.shapes.read().get(&key) {
            return Ok(shape.clone());
        }

        let mut shapes = self.shapes.write();
        if let Some(shape) = shapes.get(&key) {
            return Ok(shape.clone());
        }

        let shape = Arc::new(CloneShape::compute::<T>()?);
        tracing::trace!(
            type_name = shape.type_name(),
            init_args = ?shape.init_args(),
            cloning_attrs = ?shape.cloning_attrs(),
            "computed clone shape"
        );
        shapes.insert(key, shape.clone());
        Ok(shape)
    }

    pub fn len(&self) -> usize {
        self.shapes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Sample {
        value: String,
        value2: String,
        value3: String,
        tag: Option<String>,
    }

    impl Cloneable for Sample {
        fn signature() -> &'static [Param] {
            const SIGNATURE: &[Param] = &[
                Param::positional("value"),
                Param::positional("value2"),
                Param::keyword("value3"),
            ];
            SIGNATURE
        }

        fn cloning_attrs() -> CloningAttrs {
            CloningAttrs::Set(&["tag"])
        }

        fn get_attr(&self, name: &str) -> Option<AttrValue> {
            match name {
                "value" => Some(Box::new(self.value.clone())),
                "value2" => Some(Box::new(self.value2.clone())),
                "value3" => Some(Box::new(self.value3.clone())),
                "tag" => Some(Box::new(self.tag.clone())),
                _ => None,
            }
        }

        fn set_attr(&mut self, name: &str, value: AttrValue) -> NodeEdgeResult<()> {
            match name {
                "tag" => self.tag = downcast(name, value)?,
                "value" => self.value = downcast(name, value)?,
                _ => {
                    return Err(NodeEdgeError::Type(format!("unknown attribute '{}'", name)));
                }
            }
            Ok(())
        }

        fn construct(mut args: InitArgs) -> NodeEdgeResult<Self> {
            let value3 = args.take_opt("value3")?.unwrap_or_default();
            Ok(Self {
                value: args.take("value")?,
                value2: args.take("value2")?,
                value3,
                tag: None,
            })
        }
    }

    fn sample() -> Sample {
        Sample {
            value: "a".into(),
            value2: "b".into(),
            value3: "c".into(),
            tag: Some("t".into()),
        }
    }

    #[test]
    fn shape_splits_positional_and_keyword() {
        let shape = Sample::clone_shape().unwrap();
        assert_eq!(shape.init_args(), &["value", "value2"]);
        assert_eq!(
            shape.init_kwargs().iter().copied().collect::<Vec<_>>(),
            vec!["value3"]
        );
        assert!(shape.cloning_attrs().contains("tag"));
    }

    #[test]
    fn shape_is_cached_per_type() {
        let registry = CloneRegistry::new();
        let first = registry.shape_of::<Sample>().unwrap();
        let second = registry.shape_of::<Sample>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn plain_clone_copies_everything() {
        let source = sample();
        let cloned = source.clone_with(Overrides::new()).unwrap();
        assert_eq!(cloned, source);
    }

    #[test]
    fn overrides_replace_args_and_kwargs() {
        let cloned = sample()
            .clone_with(Overrides::new().arg("value2", "x".to_string()).kwarg("value3", "y".to_string()))
            .unwrap();
        assert_eq!(cloned.value, "a");
        assert_eq!(cloned.value2, "x");
        assert_eq!(cloned.value3, "y");
        assert_eq!(cloned.tag.as_deref(), Some("t"));
    }

    #[test]
    fn keyword_named_in_args_is_left_out() {
        let cloned = sample()
            .clone_with(Overrides::new().arg("value3", "ignored".to_string()))
            .unwrap();
        assert_eq!(cloned.value3, "");
    }

    #[test]
    fn attr_override_wins_over_carry_over() {
        let cloned = sample()
            .clone_with(Overrides::new().attr("tag", Option::<String>::None))
            .unwrap();
        assert_eq!(cloned.tag, None);
    }

    #[test]
    fn mistyped_attr_is_a_type_error() {
        let error = sample()
            .clone_with(Overrides::new().attr("tag", 42u32))
            .unwrap_err();
        assert!(matches!(error, NodeEdgeError::Type(_)));
    }

    struct BadAttrs;

    impl Cloneable for BadAttrs {
        fn signature() -> &'static [Param] {
            &[]
        }

        fn cloning_attrs() -> CloningAttrs {
            CloningAttrs::Set(&["a", "a"])
        }

        fn get_attr(&self, _: &str) -> Option<AttrValue> {
            None
        }

        fn set_attr(&mut self, _: &str, _: AttrValue) -> NodeEdgeResult<()> {
            Ok(())
        }

        fn construct(_: InitArgs) -> NodeEdgeResult<Self> {
            Ok(Self)
        }
    }

    #[test]
    fn duplicate_cloning_attrs_are_rejected() {
        let error = BadAttrs.clone_with(Overrides::new()).err().unwrap();
        assert!(matches!(error, NodeEdgeError::Configuration(_)));
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("value_2"));
        assert!(is_identifier("_hidden"));
        assert!(!is_identifier("2value"));
        assert!(!is_identifier("with space"));
        assert!(!is_identifier(""));
    }
}
