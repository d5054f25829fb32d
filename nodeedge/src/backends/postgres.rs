//!
//! PostgreSQL storage types.
//!

use super::{FieldTypeMap, LinkType};

pub const NAMESPACE: &str = "nodeedge.backends.postgres";

fn link_type(target: Option<&str>) -> String {
    match target {
        Some(target) => format!("uuid references \"{}\"", target),
        None => "uuid".to_string(),
    }
}

pub const TYPE_MAP: FieldTypeMap = FieldTypeMap {
    str: "text",
    int16: "smallint",
    int32: "integer",
    int64: "bigint",
    bigint: "numeric",
    float32: "real",
    float64: "double precision",
    decimal: "numeric",
    bool: "boolean",
    date: "date",
    time: "time",
    naive_datetime: "timestamp",
    aware_datetime: "timestamptz",
    duration: "interval",
    relative_duration: "interval",
    date_duration: "interval",
    uuid1: "uuid",
    uuid3: "uuid",
    uuid4: "uuid",
    uuid5: "uuid",
    bytes: "bytea",
    array: "jsonb",
    set: "jsonb",
    tuple: "jsonb",
    named_tuple: "jsonb",
    json: "jsonb",
    link: LinkType::Resolver(link_type),
    multi_link: LinkType::Name("uuid[]"),
};
