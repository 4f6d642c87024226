//! MySQL and MariaDB catalog, read from `information_schema`.
//!
//! Columns are cast to CHAR/SIGNED so both servers return plain text and
//! integers whatever their collation or column types.

use dbkit_core::schema::types::universal_type;
use dbkit_core::schema::{
    normalize_default, Ddl, DefaultValue, Field, FieldType, Index, Key, KeyKind, Reference,
};
use dbkit_core::Backend;

use super::{fetch, group_columns, size, text, Emit, Introspect};
use crate::connection::Connection;
use crate::error::Result;

const TABLES: &str = "SELECT CAST(TABLE_NAME AS CHAR) AS name \
    FROM information_schema.TABLES \
    WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE' \
    ORDER BY TABLE_NAME";

const COLUMNS: &str = "SELECT CAST(COLUMN_NAME AS CHAR) AS name, \
    CAST(DATA_TYPE AS CHAR) AS data_type, \
    CAST(COLUMN_TYPE AS CHAR) AS column_type, \
    CAST(IS_NULLABLE AS CHAR) AS nullable, \
    CAST(COLUMN_DEFAULT AS CHAR) AS dflt, \
    CAST(CHARACTER_MAXIMUM_LENGTH AS SIGNED) AS char_len, \
    CAST(NUMERIC_PRECISION AS SIGNED) AS num_prec, \
    CAST(NUMERIC_SCALE AS SIGNED) AS num_scale \
    FROM information_schema.COLUMNS \
    WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
    ORDER BY ORDINAL_POSITION";

const KEYS: &str = "SELECT CAST(tc.CONSTRAINT_NAME AS CHAR) AS name, \
    CAST(tc.CONSTRAINT_TYPE AS CHAR) AS kind, \
    CAST(k.COLUMN_NAME AS CHAR) AS col \
    FROM information_schema.TABLE_CONSTRAINTS tc \
    JOIN information_schema.KEY_COLUMN_USAGE k \
      ON k.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA \
     AND k.TABLE_NAME = tc.TABLE_NAME \
     AND k.CONSTRAINT_NAME = tc.CONSTRAINT_NAME \
    WHERE tc.TABLE_SCHEMA = DATABASE() AND tc.TABLE_NAME = ? \
      AND tc.CONSTRAINT_TYPE IN ('PRIMARY KEY', 'UNIQUE') \
    ORDER BY tc.CONSTRAINT_NAME, k.ORDINAL_POSITION";

const INDEXES: &str = "SELECT CAST(INDEX_NAME AS CHAR) AS name, \
    CAST(INDEX_TYPE AS CHAR) AS method, \
    CAST(COLUMN_NAME AS CHAR) AS col \
    FROM information_schema.STATISTICS \
    WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND NON_UNIQUE = 1 \
    ORDER BY INDEX_NAME, SEQ_IN_INDEX";

const FOREIGN_KEYS: &str = "SELECT CAST(k.CONSTRAINT_NAME AS CHAR) AS name, \
    CAST(k.COLUMN_NAME AS CHAR) AS col, \
    CAST(k.REFERENCED_TABLE_NAME AS CHAR) AS parent, \
    CAST(k.REFERENCED_COLUMN_NAME AS CHAR) AS parent_col, \
    CAST(r.UPDATE_RULE AS CHAR) AS on_update, \
    CAST(r.DELETE_RULE AS CHAR) AS on_delete \
    FROM information_schema.KEY_COLUMN_USAGE k \
    JOIN information_schema.REFERENTIAL_CONSTRAINTS r \
      ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA \
     AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME \
     AND r.TABLE_NAME = k.TABLE_NAME \
    WHERE k.TABLE_SCHEMA = DATABASE() AND k.TABLE_NAME = ? \
    ORDER BY k.CONSTRAINT_NAME, k.ORDINAL_POSITION";

/// Strategy for MySQL and MariaDB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MySqlSchema {
    mariadb: bool,
}

impl MySqlSchema {
    /// Creates the strategy. MariaDB reports column defaults differently.
    #[must_use]
    pub const fn new(mariadb: bool) -> Self {
        Self { mariadb }
    }

    const fn backend(self) -> Backend {
        if self.mariadb {
            Backend::MariaDb
        } else {
            Backend::MySql
        }
    }

    /// Cleans a `COLUMN_DEFAULT` value.
    ///
    /// MySQL reports text defaults unquoted and SQL NULL for no default;
    /// MariaDB quotes text, spells the NULL default out and writes
    /// `current_timestamp()`.
    fn parse_default(self, raw: Option<&str>) -> Option<DefaultValue> {
        let raw = raw?.trim();
        if self.mariadb {
            return normalize_default(Some(DefaultValue::parse_literal(raw)));
        }
        let upper = raw.to_ascii_uppercase();
        if upper.starts_with("CURRENT_") || raw.ends_with(')') {
            return Some(DefaultValue::Expression(raw.to_string()));
        }
        if let Ok(n) = raw.parse::<i64>() {
            return Some(DefaultValue::Integer(n));
        }
        if let Ok(x) = raw.parse::<f64>() {
            return Some(DefaultValue::Float(x));
        }
        Some(DefaultValue::String(raw.to_string()))
    }
}

/// Type, length and scale of one column.
fn column_shape(
    backend: Backend,
    data_type: &str,
    column_type: &str,
    char_len: Option<u32>,
    precision: Option<u32>,
    scale: Option<u32>,
) -> (FieldType, Option<u32>, Option<u32>) {
    // tinyint(1) is how MySQL stores booleans; wider tinyints stay native
    if data_type.eq_ignore_ascii_case("tinyint") {
        let display = if column_type.starts_with("tinyint(1)") {
            "tinyint(1)"
        } else {
            "tinyint"
        };
        return (universal_type(backend, display), None, None);
    }
    let kind = universal_type(backend, data_type);
    match kind {
        FieldType::Char | FieldType::Varchar => (kind, char_len, None),
        FieldType::Numeric => (kind, precision, scale),
        _ => (kind, None, None),
    }
}

impl Introspect for MySqlSchema {
    fn list_tables(&self, conn: &mut Connection) -> Result<Vec<String>> {
        fetch(conn, TABLES, ())?
            .iter()
            .map(|r| text(r, "name"))
            .collect()
    }

    fn list_columns(&self, conn: &mut Connection, table: &str) -> Result<Vec<Field>> {
        let backend = self.backend();
        let mut fields = Vec::new();
        for record in fetch(conn, COLUMNS, table)? {
            let (kind, len, scale) = column_shape(
                backend,
                &text(&record, "data_type")?,
                &text(&record, "column_type")?.to_ascii_lowercase(),
                size(&record, "char_len")?,
                size(&record, "num_prec")?,
                size(&record, "num_scale")?,
            );
            let mut field = Field::new(text(&record, "name")?, kind);
            field.len = len;
            field.scale = scale;
            field.nullable = text(&record, "nullable")?.eq_ignore_ascii_case("YES");
            field.default = self.parse_default(record.get::<Option<String>>("dflt")?.as_deref());
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
                kind: if kind == "PRIMARY KEY" {
                    KeyKind::Primary
                } else {
                    KeyKind::Unique
                },
                columns,
            })
            .collect())
    }

    fn list_indexes(&self, conn: &mut Connection, table: &str) -> Result<Vec<Index>> {
        // InnoDB backs every foreign key with an index of the same name
        let foreign: Vec<String> = self
            .list_foreign_keys(conn, table)?
            .into_iter()
            .map(|r| r.name)
            .collect();
        let rows = fetch(conn, INDEXES, table)?
            .iter()
            .map(|r| Ok((text(r, "name")?, text(r, "col")?, text(r, "method")?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(group_columns(rows)
            .into_iter()
            .filter(|(name, _, _)| !foreign.contains(name))
            .map(|(name, columns, method)| Index {
                name,
                method: method.to_ascii_lowercase(),
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
                    on_update: text(&record, "on_update")?.parse().unwrap_or_default(),
                    on_delete: text(&record, "on_delete")?.parse().unwrap_or_default(),
                }),
            }
        }
        Ok(references)
    }
}

impl Emit for MySqlSchema {
    fn ddl(&self) -> Ddl {
        Ddl::new(self.backend())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbkit_core::schema::types::column_type;
    use dbkit_core::schema::{integer, numeric, varchar};

    #[test]
    fn test_mysql_defaults_are_unquoted() {
        let mysql = MySqlSchema::new(false);
        assert_eq!(mysql.parse_default(None), None);
        assert_eq!(
            mysql.parse_default(Some("abc")),
            Some(DefaultValue::String(String::from("abc")))
        );
        assert_eq!(mysql.parse_default(Some("0")), Some(DefaultValue::Integer(0)));
        assert_eq!(
            mysql.parse_default(Some("CURRENT_TIMESTAMP")),
            Some(DefaultValue::Expression(String::from("CURRENT_TIMESTAMP")))
        );
    }

    #[test]
    fn test_mariadb_defaults_are_quoted() {
        let mariadb = MySqlSchema::new(true);
        assert_eq!(mariadb.parse_default(Some("NULL")), None);
        assert_eq!(
            mariadb.parse_default(Some("'abc'")),
            Some(DefaultValue::String(String::from("abc")))
        );
        assert_eq!(
            mariadb.parse_default(Some("current_timestamp()")),
            Some(DefaultValue::Expression(String::from("current_timestamp()")))
        );
    }

    #[test]
    fn test_column_shape() {
        let shape = column_shape(Backend::MySql, "varchar", "varchar(64)", Some(64), None, None);
        assert_eq!(shape, (FieldType::Varchar, Some(64), None));
        let shape = column_shape(Backend::MySql, "decimal", "decimal(10,2)", None, Some(10), Some(2));
        assert_eq!(shape, (FieldType::Numeric, Some(10), Some(2)));
        let shape = column_shape(Backend::MySql, "int", "int(11)", None, Some(10), Some(0));
        assert_eq!(shape, (FieldType::Integer, None, None));
        let shape = column_shape(Backend::MySql, "tinyint", "tinyint(1)", None, Some(3), Some(0));
        assert_eq!(shape.0, FieldType::Native(String::from("boolean")));
        let shape = column_shape(Backend::MySql, "tinyint", "tinyint(4)", None, Some(3), Some(0));
        assert_eq!(shape.0, FieldType::Native(String::from("tinyint")));
    }

    #[test]
    fn test_created_types_read_back_unchanged() {
        let fields = [
            Field::new("flag", FieldType::Native(String::from("boolean"))),
            varchar("email", 120).not_null().build(),
            numeric("price", 10, 2).build(),
            integer("n").len(11).build(),
        ];
        for backend in [Backend::MySql, Backend::MariaDb] {
            for declared in &fields {
                let created = column_type(backend, declared);
                let data_type = created.split('(').next().unwrap_or_default().to_string();
                let (kind, len, scale) = column_shape(
                    backend,
                    &data_type,
                    &created,
                    declared.kind.is_sized().then_some(declared.len).flatten(),
                    Some(10),
                    Some(2),
                );
                let mut live = Field::new(declared.name.clone(), kind);
                live.len = len;
                live.scale = scale;
                live.nullable = declared.nullable;
                assert!(declared.matches(&live), "{created} on {backend:?}");
            }
        }
    }
}
