//!
//! EdgeDB storage types.
//!

use super::{FieldTypeMap, LinkType};

pub const NAMESPACE: &str = "nodeedge.backends.edgedb";

pub const TYPE_MAP: FieldTypeMap = FieldTypeMap {
    str: "str",
    int16: "int16",
    int32: "int32",
    int64: "int64",
    bigint: "bigint",
    float32: "float32",
    float64: "float64",
    decimal: "decimal",
    bool: "bool",
    date: "cal::local_date",
    time: "cal::local_time",
    naive_datetime: "cal::local_datetime",
    aware_datetime: "datetime",
    duration: "duration",
    relative_duration: "cal::relative_duration",
    date_duration: "cal::date_duration",
    uuid1: "uuid",
    uuid3: "uuid",
    uuid4: "uuid",
    uuid5: "uuid",
    bytes: "bytes",
    array: "array",
    set: "set",
    tuple: "tuple",
    named_tuple: "tuple",
    json: "json",
    link: LinkType::Name("uuid"),
    multi_link: LinkType::Name("array<uuid>"),
};
