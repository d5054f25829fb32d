use std::fmt;
use std::str::FromStr;

use crate::backends;
use crate::value::{ValueKind, ValueTypeSet};
use crate::{NodeEdgeError, NodeEdgeResult};

/// The closed set of field kinds a model attribute can be declared with.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum FieldKind {
    Str,
    Int16,
    Int32,
    Int64,
    BigInt,
    Float32,
    Float64,
    Decimal,
    Bool,
    Date,
    Time,
    NaiveDateTime,
    AwareDateTime,
    Duration,
    RelativeDuration,
    DateDuration,
    Uuid1,
    Uuid3,
    Uuid4,
    Uuid5,
    Bytes,
    Array,
    Set,
    Tuple,
    NamedTuple,
    Json,
    Link,
    MultiLink,
}

impl FieldKind {
    pub const ALL: [FieldKind; 28] = [
        Self::Str,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::BigInt,
        Self::Float32,
        Self::Float64,
        Self::Decimal,
        Self::Bool,
        Self::Date,
        Self::Time,
        Self::NaiveDateTime,
        Self::AwareDateTime,
        Self::Duration,
        Self::RelativeDuration,
        Self::DateDuration,
        Self::Uuid1,
        Self::Uuid3,
        Self::Uuid4,
        Self::Uuid5,
        Self::Bytes,
        Self::Array,
        Self::Set,
        Self::Tuple,
        Self::NamedTuple,
        Self::Json,
        Self::Link,
        Self::MultiLink,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Str => "Str",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::BigInt => "BigInt",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::Decimal => "Decimal",
            Self::Bool => "Bool",
            Self::Date => "Date",
            Self::Time => "Time",
            Self::NaiveDateTime => "NaiveDateTime",
            Self::AwareDateTime => "AwareDateTime",
            Self::Duration => "Duration",
            Self::RelativeDuration => "RelativeDuration",
            Self::DateDuration => "DateDuration",
            Self::Uuid1 => "UUID1",
            Self::Uuid3 => "UUID3",
            Self::Uuid4 => "UUID4",
            Self::Uuid5 => "UUID5",
            Self::Bytes => "Bytes",
            Self::Array => "Array",
            Self::Set => "Set",
            Self::Tuple => "Tuple",
            Self::NamedTuple => "NamedTuple",
            Self::Json => "Json",
            Self::Link => "Link",
            Self::MultiLink => "MultiLink",
        }
    }

    pub fn is_link(self) -> bool {
        matches!(self, Self::Link | Self::MultiLink)
    }

    pub fn is_single_link(self) -> bool {
        self == Self::Link
    }

    pub fn is_multi_link(self) -> bool {
        self == Self::MultiLink
    }

    pub fn is_collection(self) -> bool {
        matches!(self, Self::Array | Self::Set | Self::Tuple | Self::NamedTuple)
    }

    /// Value kinds a filter on a field of this kind may be bound to.
    pub fn value_types(self) -> ValueTypeSet {
        use ValueKind::*;

        match self {
            Self::Str => ValueTypeSet::of([Str]),
            Self::Int16 | Self::Int32 | Self::Int64 => ValueTypeSet::of([Int]),
            Self::BigInt => ValueTypeSet::of([BigInt, Int, Str]),
            Self::Float32 | Self::Float64 => ValueTypeSet::of([Float, Int]),
            Self::Decimal => ValueTypeSet::of([Decimal, Int, Str]),
            Self::Bool => ValueTypeSet::of([Bool]),
            Self::Date => ValueTypeSet::of([Date, Str]),
            Self::Time => ValueTypeSet::of([Time, Str]),
            Self::NaiveDateTime => ValueTypeSet::of([NaiveDateTime, Str]),
            Self::AwareDateTime => ValueTypeSet::of([AwareDateTime, Str]),
            Self::Duration => ValueTypeSet::of([Duration]),
            Self::RelativeDuration => ValueTypeSet::of([RelativeDuration, Str]),
            Self::DateDuration => ValueTypeSet::of([DateDuration, Str]),
            Self::Uuid1 | Self::Uuid3 | Self::Uuid4 | Self::Uuid5 => ValueTypeSet::of([Uuid, Str]),
            Self::Bytes => ValueTypeSet::of([Bytes, Str]),
            Self::Array | Self::Set | Self::Tuple => ValueTypeSet::of([List, Tuple, Set]),
            Self::NamedTuple => ValueTypeSet::of([NamedTuple]),
            Self::Json => ValueTypeSet::any(),
            Self::Link => ValueTypeSet::of([Model, Uuid, Record, Field]),
            Self::MultiLink => ValueTypeSet::of([List, Tuple, Set]),
        }
    }

    /// Storage type name under the globally configured backend.
    pub fn as_db_type(self) -> NodeEdgeResult<String> {
        Ok(backends::active_type_map()?.type_name(self, None))
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldKind {
    type Err = NodeEdgeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| NodeEdgeError::Value(format!("unknown field kind '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in FieldKind::ALL {
            assert_eq!(kind.name().parse::<FieldKind>().unwrap(), kind);
        }
        assert!("Int8".parse::<FieldKind>().is_err());
    }

    #[test]
    fn link_kinds() {
        assert!(FieldKind::Link.is_single_link());
        assert!(FieldKind::MultiLink.is_link());
        assert!(!FieldKind::Str.is_link());
        assert!(FieldKind::NamedTuple.is_collection());
    }

    #[test]
    fn filter_value_types() {
        assert!(FieldKind::Int16.value_types().contains(ValueKind::Int));
        assert!(!FieldKind::Int16.value_types().accepts(ValueKind::Str));
        assert!(FieldKind::Json.value_types().accepts(ValueKind::List));
    }
}
