//! PostgreSQL catalog, read from `information_schema` and `pg_catalog`
//! within the current schema.

use dbkit_core::schema::types::universal_type;
use dbkit_core::schema::{
    normalize_default, Action, Ddl, DefaultValue, Field, FieldType, Index, Key, KeyKind, Reference,
};
use dbkit_core::Backend;

use super::{fetch, group_columns, size, text, Emit, Introspect};
use crate::connection::Connection;
use crate::error::Result;

const TABLES: &str = "SELECT table_name::text AS name \
    FROM information_schema.tables \
    WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
    ORDER BY table_name";

const COLUMNS: &str = "SELECT column_name::text AS name, \
    udt_name::text AS data_type, \
    is_nullable::text AS nullable, \
    column_default::text AS dflt, \
    character_maximum_length::int AS char_len, \
    numeric_precision::int AS num_prec, \
    numeric_scale::int AS num_scale \
    FROM information_schema.columns \
    WHERE table_schema = current_schema() AND table_name = ? \
    ORDER BY ordinal_position";

const KEYS: &str = "SELECT c.conname::text AS name, c.contype::text AS kind, a.attname::text AS col \
    FROM pg_constraint c \
    JOIN pg_class t ON t.oid = c.conrelid \
    JOIN pg_namespace n ON n.oid = t.relnamespace \
    CROSS JOIN LATERAL unnest(c.conkey) WITH ORDINALITY AS k(attnum, ord) \
    JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum \
    WHERE n.nspname = current_schema() AND t.relname = ? AND c.contype IN ('p', 'u') \
    ORDER BY c.conname, k.ord";

const INDEXES: &str = "SELECT i.relname::text AS name, am.amname::text AS method, a.attname::text AS col \
    FROM pg_index x \
    JOIN pg_class t ON t.oid = x.indrelid \
    JOIN pg_class i ON i.oid = x.indexrelid \
    JOIN pg_namespace n ON n.oid = t.relnamespace \
    JOIN pg_am am ON am.oid = i.relam \
    CROSS JOIN LATERAL unnest(x.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord) \
    JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum \
    WHERE n.nspname = current_schema() AND t.relname = ? \
      AND NOT x.indisunique AND NOT x.indisprimary \
    ORDER BY i.relname, k.ord";

const FOREIGN_KEYS: &str = "SELECT c.conname::text AS name, a.attname::text AS col, \
    p.relname::text AS parent, pa.attname::text AS parent_col, \
    c.confupdtype::text AS on_update, c.confdeltype::text AS on_delete \
    FROM pg_constraint c \
    JOIN pg_class t ON t.oid = c.conrelid \
    JOIN pg_namespace n ON n.oid = t.relnamespace \
    JOIN pg_class p ON p.oid = c.confrelid \
    CROSS JOIN LATERAL unnest(c.conkey, c.confkey) WITH ORDINALITY AS k(attnum, pattnum, ord) \
    JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum \
    JOIN pg_attribute pa ON pa.attrelid = p.oid AND pa.attnum = k.pattnum \
    WHERE n.nspname = current_schema() AND t.relname = ? AND c.contype = 'f' \
    ORDER BY c.conname, k.ord";

/// Strategy for PostgreSQL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PgSchema;

/// Cleans a `column_default` expression: sequence defaults are not
/// defaults, and `::type` casts are dropped.
fn parse_default(raw: Option<&str>) -> Option<DefaultValue> {
    let raw = raw?.trim();
    if raw.starts_with("nextval(") {
        return None;
    }
    normalize_default(Some(DefaultValue::parse_literal(&strip_casts(raw))))
}

/// Removes `::type` suffixes outside string literals.
fn strip_casts(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut chars = expr.chars().peekable();
    let mut quoted = false;
    while let Some(c) = chars.next() {
        if c == '\'' {
            quoted = !quoted;
            out.push(c);
        } else if !quoted && c == ':' && chars.peek() == Some(&':') {
            chars.next();
            // the type name runs up to the next closing parenthesis or operator
            while let Some(&next) = chars.peek() {
                if next.is_ascii_alphanumeric() || matches!(next, '_' | ' ' | '"' | '[' | ']') {
                    chars.next();
                } else {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out.trim().to_string()
}

fn column_shape(
    data_type: &str,
    char_len: Option<u32>,
    precision: Option<u32>,
    scale: Option<u32>,
) -> (FieldType, Option<u32>, Option<u32>) {
    let kind = universal_type(Backend::Postgres, data_type);
    match kind {
        FieldType::Char | FieldType::Varchar => (kind, char_len, None),
        FieldType::Numeric => (kind, precision, scale),
        _ => (kind, None, None),
    }
}

fn action(code: &str) -> Action {
    code.chars().next().map_or(Action::NoAction, Action::from_pg_code)
}

impl Introspect for PgSchema {
    fn list_tables(&self, conn: &mut Connection) -> Result<Vec<String>> {
        fetch(conn, TABLES, ())?
            .iter()
            .map(|r| text(r, "name"))
            .collect()
    }

    fn list_columns(&self, conn: &mut Connection, table: &str) -> Result<Vec<Field>> {
        let mut fields = Vec::new();
        for record in fetch(conn, COLUMNS, table)? {
            let (kind, len, scale) = column_shape(
                &text(&record, "data_type")?,
                size(&record, "char_len")?,
                size(&record, "num_prec")?,
                size(&record, "num_scale")?,
            );
            let mut field = Field::new(text(&record, "name")?, kind);
            field.len = len;
            field.scale = scale;
            field.nullable = text(&record, "nullable")?.eq_ignore_ascii_case("YES");
            field.default = parse_default(record.get::<Option<String>>("dflt")?.as_deref());
            fields.push(field);
        }
        Ok(fields)
    }

    fn list_keys(&self, conn: &mut Connection, table: &str) -> Result<Vec<Key>> {
        let rows = fetch(conn, KEYS, table)?
            .iter()
            .map(|r| Ok((text(r, "name")?, text(r, "col")?, text(r, "kind")?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(group_columns(rows)
            .into_iter()
            .map(|(name, columns, kind)| Key {
                name,
                kind: if kind == "p" {
                    KeyKind::Primary
                } else {
                    KeyKind::Unique
                },
                columns,
            })
            .collect())
    }

    fn list_indexes(&self, conn: &mut Connection, table: &str) -> Result<Vec<Index>> {
        let rows = fetch(conn, INDEXES, table)?
            .iter()
            .map(|r| Ok((text(r, "name")?, text(r, "col")?, text(r, "method")?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(group_columns(rows)
            .into_iter()
            .map(|(name, columns, method)| Index {
                name,
                method,
                columns,
            })
            .collect())
    }

    fn list_foreign_keys(&self, conn: &mut Connection, table: &str) -> Result<Vec<Reference>> {
        let mut references: Vec<Reference> = Vec::new();
        for record in fetch(conn, FOREIGN_KEYS, table)? {
            let name = text(&record, "name")?;
            let column = text(&record, "col")?;
            let parent_column = text(&record, "parent_col")?;
            match references.last_mut() {
                Some(last) if last.name == name => {
                    last.columns.push(column);
                    last.parent_columns.push(parent_column);
                }
                _ => references.push(Reference {
                    name,
                    columns: vec![column],
                    parent_table: text(&record, "parent")?,
                    parent_columns: vec![parent_column],
                    on_update: action(&text(&record, "on_update")?),
                    on_delete: action(&text(&record, "on_delete")?),
                }),
            }
        }
        Ok(references)
    }
}

impl Emit for PgSchema {
    fn ddl(&self) -> Ddl {
        Ddl::new(Backend::Postgres)
    }
}
