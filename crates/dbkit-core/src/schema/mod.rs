//! Logical schema representation.
//!
//! A [`Schema`] is either *declared* (built through the DSL below or loaded
//! from a JSON document) or *live* (filled in by an introspector). Both use
//! the same [`Table`] type so the diff planner can compare them directly.
//!
//! Declared schemas carry a prefix that is prepended to every table name,
//! every constraint name and every referenced parent table. Declarations are
//! validated eagerly: a bad identifier, a duplicate name or a key over an
//! undeclared field is reported by the call that introduces it.
//!
//! ```
//! use dbkit_core::schema::{bigint, varchar, Schema};
//!
//! let mut schema = Schema::declare("app_");
//! schema
//!     .table("users")?
//!     .field(bigint("id"))?
//!     .field(varchar("email", 190).not_null())?
//!     .primary("pk_users", &["id"])?
//!     .unique("uq_users_email", &["email"])?;
//!
//! let users = schema.get("app_users").unwrap();
//! assert_eq!(users.primary.as_ref().unwrap().name, "app_pk_users");
//! // primary key members become NOT NULL
//! assert!(!users.get_field("id").unwrap().nullable);
//! # Ok::<(), dbkit_core::SchemaError>(())
//! ```

mod constraint;
pub mod ddl;
mod field;
pub mod triggers;
pub mod types;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::ident::is_identifier;

pub use constraint::{Action, Index, Key, KeyKind, Reference};
pub use ddl::Ddl;
pub use field::{
    bigint, char, date, defaults_match, float, integer, normalize_default, numeric, real,
    smallint, text, time, timestamp, varchar, DefaultValue, Field, FieldBuilder, FieldType,
};

/// Length given to a VARCHAR declared without one.
pub const DEFAULT_VARCHAR_LEN: u32 = 255;

/// Length given to a CHAR declared without one.
pub const DEFAULT_CHAR_LEN: u32 = 1;

/// A table: fields plus the constraints and indexes defined on them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    /// Table name (prefixed for declared schemas).
    pub name: String,
    /// Fields in declaration order.
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Primary key, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<Key>,
    /// Unique keys.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uniques: Vec<Key>,
    /// Non-unique indexes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<Index>,
    /// Foreign keys.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Reference>,
    #[serde(skip)]
    prefix: String,
}

impl Table {
    /// Creates an empty table, as introspectors do.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The primary key followed by the unique keys.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.primary.iter().chain(self.uniques.iter())
    }

    /// Declares a field.
    ///
    /// A VARCHAR without a length gets [`DEFAULT_VARCHAR_LEN`], a CHAR gets
    /// [`DEFAULT_CHAR_LEN`], and an explicit NULL default is dropped.
    ///
    /// # Errors
    ///
    /// Fails on an invalid name or a name already declared on this table.
    pub fn field(&mut self, field: impl Into<Field>) -> Result<&mut Self, SchemaError> {
        let mut field = field.into();
        check_identifier(&field.name)?;
        if self.get_field(&field.name).is_some() {
            return Err(SchemaError::DuplicateField {
                table: self.name.clone(),
                field: field.name,
            });
        }
        match field.kind {
            FieldType::Varchar if field.len.is_none() => field.len = Some(DEFAULT_VARCHAR_LEN),
            FieldType::Char if field.len.is_none() => field.len = Some(DEFAULT_CHAR_LEN),
            _ => {}
        }
        field.default = normalize_default(field.default.take());
        self.fields.push(field);
        Ok(self)
    }

    /// Declares the primary key. Its fields become NOT NULL.
    ///
    /// # Errors
    ///
    /// Fails when a primary key already exists, the name is invalid or
    /// taken, or a column is not a declared field.
    pub fn primary(&mut self, name: &str, columns: &[&str]) -> Result<&mut Self, SchemaError> {
        if self.primary.is_some() {
            return Err(SchemaError::DuplicatePrimaryKey(self.name.clone()));
        }
        let name = self.constraint_name(name)?;
        let columns = self.declared_columns(&name, columns)?;
        for field in &mut self.fields {
            if columns.contains(&field.name) {
                field.nullable = false;
            }
        }
        self.primary = Some(Key {
            name,
            kind: KeyKind::Primary,
            columns,
        });
        Ok(self)
    }

    /// Declares a unique key.
    ///
    /// # Errors
    ///
    /// Fails when the name is invalid or taken, or a column is not a
    /// declared field.
    pub fn unique(&mut self, name: &str, columns: &[&str]) -> Result<&mut Self, SchemaError> {
        let name = self.constraint_name(name)?;
        let columns = self.declared_columns(&name, columns)?;
        self.uniques.push(Key {
            name,
            kind: KeyKind::Unique,
            columns,
        });
        Ok(self)
    }

    /// Declares a non-unique index using `method` (e.g. `btree`).
    ///
    /// # Errors
    ///
    /// Fails when the name is invalid or taken, or a column is not a
    /// declared field.
    pub fn index(
        &mut self,
        name: &str,
        method: &str,
        columns: &[&str],
    ) -> Result<&mut Self, SchemaError> {
        let name = self.constraint_name(name)?;
        let columns = self.declared_columns(&name, columns)?;
        self.indexes.push(Index {
            name,
            method: method.to_ascii_lowercase(),
            columns,
        });
        Ok(self)
    }

    /// Declares a foreign key to `parent` (prefixed like every table name).
    ///
    /// Parent columns are not checked here since the parent table may be
    /// declared later.
    ///
    /// # Errors
    ///
    /// Fails when a name is invalid or taken, a child column is not a
    /// declared field, or the column lists differ in length.
    #[allow(clippy::too_many_arguments)]
    pub fn reference(
        &mut self,
        name: &str,
        columns: &[&str],
        parent: &str,
        parent_columns: &[&str],
        on_update: Action,
        on_delete: Action,
    ) -> Result<&mut Self, SchemaError> {
        let name = self.constraint_name(name)?;
        let columns = self.declared_columns(&name, columns)?;
        check_identifier(parent)?;
        for column in parent_columns {
            check_identifier(column)?;
        }
        if parent_columns.len() != columns.len() {
            return Err(SchemaError::ReferenceArity(name));
        }
        self.references.push(Reference {
            name,
            columns,
            parent_table: format!("{}{parent}", self.prefix),
            parent_columns: parent_columns.iter().map(|c| (*c).to_string()).collect(),
            on_update,
            on_delete,
        });
        Ok(self)
    }

    fn constraint_name(&self, name: &str) -> Result<String, SchemaError> {
        check_identifier(name)?;
        let name = format!("{}{name}", self.prefix);
        let taken = self.keys().any(|k| k.name == name)
            || self.indexes.iter().any(|i| i.name == name)
            || self.references.iter().any(|r| r.name == name);
        if taken {
            return Err(SchemaError::DuplicateName {
                table: self.name.clone(),
                name,
            });
        }
        Ok(name)
    }

    fn declared_columns(&self, name: &str, columns: &[&str]) -> Result<Vec<String>, SchemaError> {
        if columns.is_empty() {
            return Err(SchemaError::EmptyColumns(name.to_string()));
        }
        columns
            .iter()
            .map(|column| {
                if self.get_field(column).is_some() {
                    Ok((*column).to_string())
                } else {
                    Err(SchemaError::UndeclaredField {
                        table: self.name.clone(),
                        name: name.to_string(),
                        field: (*column).to_string(),
                    })
                }
            })
            .collect()
    }
}

fn check_identifier(name: &str) -> Result<(), SchemaError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}

/// An ordered collection of tables.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(skip)]
    prefix: String,
    /// Tables in declaration (or catalog) order.
    #[serde(default)]
    pub tables: Vec<Table>,
}

impl Schema {
    /// Creates an empty schema with no prefix, as introspectors do.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a declared schema whose names all carry `prefix`.
    #[must_use]
    pub fn declare(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            tables: Vec::new(),
        }
    }

    /// The table name prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Opens table `prefix + name` for declaration, creating it on first use.
    ///
    /// # Errors
    ///
    /// Fails when `name` is not a valid identifier.
    pub fn table(&mut self, name: &str) -> Result<&mut Table, SchemaError> {
        check_identifier(name)?;
        let full = format!("{}{name}", self.prefix);
        let position = match self.tables.iter().position(|t| t.name == full) {
            Some(position) => position,
            None => {
                let mut table = Table::new(full);
                table.prefix.clone_from(&self.prefix);
                self.tables.push(table);
                self.tables.len() - 1
            }
        };
        Ok(&mut self.tables[position])
    }

    /// Adds a fully built table, replacing any table of the same name.
    pub fn push(&mut self, table: Table) {
        match self.tables.iter_mut().find(|t| t.name == table.name) {
            Some(existing) => *existing = table,
            None => self.tables.push(table),
        }
    }

    /// Looks up a table by its full (prefixed) name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Whether the schema has no tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Loads a declared schema from a JSON document.
    ///
    /// The document has the shape produced by [`Schema::to_json`], with
    /// unprefixed names. Every declaration is replayed through the DSL so
    /// the same validation and normalization apply.
    ///
    /// # Errors
    ///
    /// Fails when the document does not parse or a declaration is invalid.
    pub fn from_json(prefix: impl Into<String>, json: &str) -> Result<Self, SchemaError> {
        let document: Self =
            serde_json::from_str(json).map_err(|e| SchemaError::Document(e.to_string()))?;
        let mut schema = Self::declare(prefix);

        for source in document.tables {
            let table = schema.table(&source.name)?;
            for field in source.fields {
                table.field(field)?;
            }
            if let Some(key) = &source.primary {
                table.primary(&key.name, &as_strs(&key.columns))?;
            }
            for key in &source.uniques {
                table.unique(&key.name, &as_strs(&key.columns))?;
            }
            for index in &source.indexes {
                table.index(&index.name, &index.method, &as_strs(&index.columns))?;
            }
            for reference in &source.references {
                table.reference(
                    &reference.name,
                    &as_strs(&reference.columns),
                    &reference.parent_table,
                    &as_strs(&reference.parent_columns),
                    reference.on_update,
                    reference.on_delete,
                )?;
            }
        }

        Ok(schema)
    }

    /// Serializes the schema as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Fails only if serialization itself fails.
    pub fn to_json(&self) -> Result<String, SchemaError> {
        serde_json::to_string_pretty(self).map_err(|e| SchemaError::Document(e.to_string()))
    }
}

fn as_strs(columns: &[String]) -> Vec<&str> {
    columns.iter().map(String::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_prefixes_names() {
        let mut schema = Schema::declare("p_");
        schema
            .table("orders")
            .unwrap()
            .field(bigint("id"))
            .unwrap()
            .field(bigint("user_id"))
            .unwrap()
            .primary("pk_orders", &["id"])
            .unwrap()
            .index("ix_orders_user", "BTREE", &["user_id"])
            .unwrap()
            .reference(
                "fk_orders_user",
                &["user_id"],
                "users",
                &["id"],
                Action::Cascade,
                Action::Restrict,
            )
            .unwrap();

        let orders = schema.get("p_orders").unwrap();
        assert_eq!(orders.indexes[0].name, "p_ix_orders_user");
        assert_eq!(orders.indexes[0].method, "btree");
        assert_eq!(orders.references[0].name, "p_fk_orders_user");
        assert_eq!(orders.references[0].parent_table, "p_users");
        assert!(schema.get("orders").is_none());
    }

    #[test]
    fn test_table_is_reopened_not_duplicated() {
        let mut schema = Schema::declare("");
        schema.table("t").unwrap().field(integer("a")).unwrap();
        schema.table("t").unwrap().field(integer("b")).unwrap();
        assert_eq!(schema.tables.len(), 1);
        assert_eq!(schema.tables[0].fields.len(), 2);
    }

    #[test]
    fn test_declaration_errors() {
        let mut schema = Schema::declare("");
        assert_eq!(
            schema.table("bad name").unwrap_err(),
            SchemaError::InvalidIdentifier(String::from("bad name"))
        );

        let table = schema.table("t").unwrap();
        table.field(integer("a")).unwrap();
        assert!(matches!(
            table.field(text("a")).unwrap_err(),
            SchemaError::DuplicateField { .. }
        ));
        assert!(matches!(
            table.unique("uq", &["missing"]).unwrap_err(),
            SchemaError::UndeclaredField { .. }
        ));
        assert_eq!(
            table.index("ix", "btree", &[]).unwrap_err(),
            SchemaError::EmptyColumns(String::from("ix"))
        );
        table.primary("pk", &["a"]).unwrap();
        assert_eq!(
            table.primary("pk2", &["a"]).unwrap_err(),
            SchemaError::DuplicatePrimaryKey(String::from("t"))
        );
        assert!(matches!(
            table.unique("pk", &["a"]).unwrap_err(),
            SchemaError::DuplicateName { .. }
        ));
        assert_eq!(
            table
                .reference("fk", &["a"], "p", &["x", "y"], Action::NoAction, Action::NoAction)
                .unwrap_err(),
            SchemaError::ReferenceArity(String::from("fk"))
        );
    }

    #[test]
    fn test_declaration_normalizes_fields() {
        let mut schema = Schema::declare("");
        let table = schema.table("t").unwrap();
        table
            .field(FieldBuilder::new("v", FieldType::Varchar))
            .unwrap()
            .field(FieldBuilder::new("c", FieldType::Char))
            .unwrap()
            .field(text("n").default_null())
            .unwrap();
        assert_eq!(table.get_field("v").unwrap().len, Some(255));
        assert_eq!(table.get_field("c").unwrap().len, Some(1));
        assert_eq!(table.get_field("n").unwrap().default, None);
    }

    #[test]
    fn test_from_json_replays_declarations() {
        let json = r#"{
            "tables": [{
                "name": "tokens",
                "fields": [
                    {"name": "id", "type": "bigint"},
                    {"name": "value", "type": "varchar", "len": 64, "nullable": false},
                    {"name": "created", "type": "timestamp",
                     "default": {"expression": "CURRENT_TIMESTAMP"}}
                ],
                "primary": {"name": "pk_tokens", "columns": ["id"]},
                "uniques": [{"name": "uq_tokens_value", "columns": ["value"]}]
            }]
        }"#;

        let schema = Schema::from_json("x_", json).unwrap();
        let tokens = schema.get("x_tokens").unwrap();
        assert_eq!(tokens.fields.len(), 3);
        assert!(!tokens.get_field("id").unwrap().nullable);
        let primary = tokens.primary.as_ref().unwrap();
        assert_eq!(primary.kind, KeyKind::Primary);
        assert_eq!(primary.name, "x_pk_tokens");
        assert_eq!(tokens.uniques[0].kind, KeyKind::Unique);
        assert_eq!(
            tokens.get_field("created").unwrap().default,
            Some(DefaultValue::Expression(String::from("CURRENT_TIMESTAMP")))
        );
    }

    #[test]
    fn test_from_json_reports_document_errors() {
        assert!(matches!(
            Schema::from_json("", "{not json").unwrap_err(),
            SchemaError::Document(_)
        ));
        let json = r#"{"tables": [{"name": "t", "fields": [],
            "primary": {"name": "pk", "columns": ["id"]}}]}"#;
        assert!(matches!(
            Schema::from_json("", json).unwrap_err(),
            SchemaError::UndeclaredField { .. }
        ));
    }
}
