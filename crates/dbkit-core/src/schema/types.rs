//! Universal/native type tables.
//!
//! Each table pairs a universal type name with the name the backend uses.
//! Lookups in either direction scan the same table, so the mapping stays
//! bidirectional by construction. Types missing from a table pass through
//! unchanged.

use crate::backend::Backend;

use super::field::{Field, FieldType};

/// MySQL/MariaDB names, as used in DDL and reported by `DATA_TYPE`.
///
/// Booleans are `tinyint(1)`, the one display width the server keeps in
/// `COLUMN_TYPE`; other tinyints read back as native.
const MYSQL_TYPES: &[(&str, &str)] = &[
    ("smallint", "smallint"),
    ("integer", "int"),
    ("bigint", "bigint"),
    ("real", "float"),
    ("float", "double"),
    ("numeric", "decimal"),
    ("date", "date"),
    ("time", "time"),
    ("timestamp", "datetime"),
    ("char", "char"),
    ("varchar", "varchar"),
    ("text", "longtext"),
    ("boolean", "tinyint(1)"),
];

/// PostgreSQL `udt_name` values.
const PG_CATALOG_TYPES: &[(&str, &str)] = &[
    ("smallint", "int2"),
    ("integer", "int4"),
    ("bigint", "int8"),
    ("real", "float4"),
    ("float", "float8"),
    ("numeric", "numeric"),
    ("date", "date"),
    ("time", "time"),
    ("timestamp", "timestamp"),
    ("char", "bpchar"),
    ("varchar", "varchar"),
    ("text", "text"),
    ("boolean", "bool"),
];

/// PostgreSQL DDL spellings.
const PG_DDL_TYPES: &[(&str, &str)] = &[
    ("smallint", "smallint"),
    ("integer", "integer"),
    ("bigint", "bigint"),
    ("real", "real"),
    ("float", "double precision"),
    ("numeric", "numeric"),
    ("date", "date"),
    ("time", "time"),
    ("timestamp", "timestamp"),
    ("char", "char"),
    ("varchar", "varchar"),
    ("text", "text"),
    ("boolean", "boolean"),
];

/// SQLite keeps the declared type text verbatim.
const SQLITE_TYPES: &[(&str, &str)] = &[
    ("smallint", "smallint"),
    ("integer", "integer"),
    ("bigint", "bigint"),
    ("real", "real"),
    ("float", "float"),
    ("numeric", "numeric"),
    ("date", "date"),
    ("time", "time"),
    ("timestamp", "timestamp"),
    ("char", "char"),
    ("varchar", "varchar"),
    ("text", "text"),
    ("boolean", "boolean"),
];

const fn ddl_table(backend: Backend) -> &'static [(&'static str, &'static str)] {
    match backend {
        Backend::MySql | Backend::MariaDb => MYSQL_TYPES,
        Backend::Postgres => PG_DDL_TYPES,
        Backend::Sqlite => SQLITE_TYPES,
    }
}

const fn catalog_table(backend: Backend) -> &'static [(&'static str, &'static str)] {
    match backend {
        Backend::MySql | Backend::MariaDb => MYSQL_TYPES,
        Backend::Postgres => PG_CATALOG_TYPES,
        Backend::Sqlite => SQLITE_TYPES,
    }
}

/// Native DDL type name for a universal type.
#[must_use]
pub fn native_type(backend: Backend, kind: &FieldType) -> String {
    let name = kind.name();
    ddl_table(backend)
        .iter()
        .find(|(universal, _)| universal.eq_ignore_ascii_case(name))
        .map_or_else(|| name.to_string(), |(_, native)| (*native).to_string())
}

/// Universal type for a native type name reported by the catalog.
#[must_use]
pub fn universal_type(backend: Backend, native: &str) -> FieldType {
    let native = native.trim();
    catalog_table(backend)
        .iter()
        .find(|(_, n)| n.eq_ignore_ascii_case(native))
        .map_or_else(
            || FieldType::Native(native.to_ascii_lowercase()),
            |(universal, _)| universal.parse().unwrap_or(FieldType::Text),
        )
}

/// Full column type for DDL, with length and scale where they apply.
#[must_use]
pub fn column_type(backend: Backend, field: &Field) -> String {
    let native = native_type(backend, &field.kind);
    let sized = field.kind.takes_length() && !native.ends_with(')');
    let rendered = match (sized, field.len, field.scale) {
        (true, Some(len), Some(scale)) => format!("{native}({len},{scale})"),
        (true, Some(len), None) => format!("{native}({len})"),
        _ => native,
    };
    if backend == Backend::Sqlite {
        rendered.to_ascii_uppercase()
    } else {
        rendered
    }
}

/// Splits a declared type such as `VARCHAR(255)` or `NUMERIC(10, 2)` into
/// its lowercase base name, length and scale.
#[must_use]
pub fn parse_declared_type(declared: &str) -> (String, Option<u32>, Option<u32>) {
    let declared = declared.trim();
    let Some(open) = declared.find('(') else {
        return (declared.to_ascii_lowercase(), None, None);
    };
    let base = declared[..open].trim().to_ascii_lowercase();
    let args = declared[open + 1..].trim_end_matches(')');
    let mut parts = args.split(',').map(|p| p.trim().parse::<u32>().ok());
    let len = parts.next().flatten();
    let scale = parts.next().flatten();
    (base, len, scale)
}
