//! DDL statement generation.
//!
//! [`Ddl`] renders the statements a schema change needs on one backend.
//! Every method returns the full list of statements to run in order.
//! Changes SQLite cannot express in place return
//! [`SchemaError::RequiresRebuild`]; the SQLite strategy answers those with
//! [`Ddl::rebuild`].

use crate::backend::Backend;
use crate::error::SchemaError;

use super::constraint::{Index, Key, KeyKind, Reference};
use super::field::{defaults_match, Field};
use super::triggers;
use super::types::column_type;
use super::Table;

/// Suffix of the scratch table used while rebuilding a SQLite table.
pub const REBUILD_SUFFIX: &str = "_rebuild";

/// Statement result of every DDL method.
pub type Statements = Result<Vec<String>, SchemaError>;

/// DDL generator for one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ddl {
    backend: Backend,
}

impl Ddl {
    /// Creates a generator for `backend`.
    #[must_use]
    pub const fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// The target backend.
    #[must_use]
    pub const fn backend(&self) -> Backend {
        self.backend
    }

    fn q(&self, ident: &str) -> String {
        self.backend.quote(ident)
    }

    fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.q(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn rebuild_required(&self, table: &str) -> Statements {
        Err(SchemaError::RequiresRebuild(table.to_string()))
    }

    /// `"name" TYPE [NOT NULL] [DEFAULT x]`
    #[must_use]
    pub fn column_definition(&self, field: &Field) -> String {
        let mut sql = format!(
            "{} {}",
            self.q(&field.name),
            column_type(self.backend, field)
        );
        if !field.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &field.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.to_sql(self.backend));
        }
        sql
    }

    fn primary_clause(&self, key: &Key) -> String {
        if self.backend.named_primary_keys() {
            format!(
                "CONSTRAINT {} PRIMARY KEY ({})",
                self.q(&key.name),
                self.column_list(&key.columns)
            )
        } else {
            format!("PRIMARY KEY ({})", self.column_list(&key.columns))
        }
    }

    fn create_table_named(&self, name: &str, table: &Table) -> String {
        let mut parts: Vec<String> = table
            .fields
            .iter()
            .map(|f| self.column_definition(f))
            .collect();
        if let Some(primary) = &table.primary {
            parts.push(self.primary_clause(primary));
        }
        let mut sql = format!("CREATE TABLE {} ({})", self.q(name), parts.join(", "));
        if self.backend.is_mysql_family() {
            sql.push_str(" ENGINE=InnoDB DEFAULT CHARSET=utf8mb4");
        }
        sql
    }

    /// Creates a table with its fields and primary key. Unique keys,
    /// indexes and references are created separately.
    ///
    /// # Errors
    ///
    /// Never fails; the result type matches the other operations.
    pub fn create_table(&self, table: &Table) -> Statements {
        Ok(vec![self.create_table_named(&table.name, table)])
    }

    /// Adds a field to an existing table.
    ///
    /// # Errors
    ///
    /// Never fails; SQLite strategies decide themselves when ADD COLUMN is
    /// not enough.
    pub fn create_field(&self, table: &str, field: &Field) -> Statements {
        Ok(vec![format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.q(table),
            self.column_definition(field)
        )])
    }

    /// Changes a field from its live definition `from` to `to`.
    ///
    /// # Errors
    ///
    /// [`SchemaError::RequiresRebuild`] on SQLite.
    pub fn alter_field(&self, table: &str, from: &Field, to: &Field) -> Statements {
        let t = self.q(table);
        match self.backend {
            Backend::MySql | Backend::MariaDb => Ok(vec![format!(
                "ALTER TABLE {t} MODIFY COLUMN {}",
                self.column_definition(to)
            )]),
            Backend::Postgres => {
                let c = self.q(&to.name);
                let default_changed = !defaults_match(from.default.as_ref(), to.default.as_ref());
                let type_changed =
                    !from.kind.same_as(&to.kind) || from.len != to.len || from.scale != to.scale;
                let mut statements = Vec::new();

                if default_changed && from.default.is_some() {
                    statements.push(format!("ALTER TABLE {t} ALTER COLUMN {c} DROP DEFAULT"));
                }
                if type_changed {
                    let ty = column_type(self.backend, to);
                    statements.push(format!(
                        "ALTER TABLE {t} ALTER COLUMN {c} TYPE {ty} USING {c}::{ty}"
                    ));
                }
                if from.nullable != to.nullable {
                    let verb = if to.nullable { "DROP" } else { "SET" };
                    statements.push(format!("ALTER TABLE {t} ALTER COLUMN {c} {verb} NOT NULL"));
                }
                if default_changed {
                    if let Some(default) = &to.default {
                        statements.push(format!(
                            "ALTER TABLE {t} ALTER COLUMN {c} SET DEFAULT {}",
                            default.to_sql(self.backend)
                        ));
                    }
                }
                Ok(statements)
            }
            Backend::Sqlite => self.rebuild_required(table),
        }
    }

    /// Adds a primary key to a table that has none.
    ///
    /// # Errors
    ///
    /// [`SchemaError::RequiresRebuild`] on SQLite.
    pub fn create_primary(&self, table: &str, key: &Key) -> Statements {
        if self.backend == Backend::Sqlite {
            return self.rebuild_required(table);
        }
        Ok(vec![format!(
            "ALTER TABLE {} ADD {}",
            self.q(table),
            self.primary_clause(key)
        )])
    }

    /// Replaces primary key `from` with `to`. PostgreSQL renames the
    /// constraint in place when only the name changed.
    ///
    /// # Errors
    ///
    /// [`SchemaError::RequiresRebuild`] on SQLite.
    pub fn alter_primary(&self, table: &str, from: &Key, to: &Key) -> Statements {
        let t = self.q(table);
        match self.backend {
            Backend::MySql | Backend::MariaDb => Ok(vec![format!(
                "ALTER TABLE {t} DROP PRIMARY KEY, ADD {}",
                self.primary_clause(to)
            )]),
            Backend::Postgres if from.columns == to.columns => Ok(vec![format!(
                "ALTER TABLE {t} RENAME CONSTRAINT {} TO {}",
                self.q(&from.name),
                self.q(&to.name)
            )]),
            Backend::Postgres => Ok(vec![
                format!("ALTER TABLE {t} DROP CONSTRAINT {}", self.q(&from.name)),
                format!("ALTER TABLE {t} ADD {}", self.primary_clause(to)),
            ]),
            Backend::Sqlite => self.rebuild_required(table),
        }
    }

    /// Creates a unique key. SQLite gets a unique index.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn create_unique(&self, table: &str, key: &Key) -> Statements {
        let columns = self.column_list(&key.columns);
        Ok(vec![match self.backend {
            Backend::Sqlite => format!(
                "CREATE UNIQUE INDEX {} ON {} ({columns})",
                self.q(&key.name),
                self.q(table)
            ),
            _ => format!(
                "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({columns})",
                self.q(table),
                self.q(&key.name)
            ),
        }])
    }

    /// Drops a unique key.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn drop_unique(&self, table: &str, key: &Key) -> Statements {
        let name = self.q(&key.name);
        Ok(vec![match self.backend {
            Backend::MySql | Backend::MariaDb => {
                format!("ALTER TABLE {} DROP INDEX {name}", self.q(table))
            }
            Backend::Postgres => format!("ALTER TABLE {} DROP CONSTRAINT {name}", self.q(table)),
            Backend::Sqlite => format!("DROP INDEX {name}"),
        }])
    }

    /// Replaces unique key `from` with `to`.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn alter_unique(&self, table: &str, from: &Key, to: &Key) -> Statements {
        let mut statements = self.drop_unique(table, from)?;
        statements.extend(self.create_unique(table, to)?);
        Ok(statements)
    }

    /// Replaces key `from` with `to`, whatever their kinds.
    ///
    /// # Errors
    ///
    /// [`SchemaError::RequiresRebuild`] on SQLite when a primary key is
    /// involved.
    pub fn alter_key(&self, table: &str, from: &Key, to: &Key) -> Statements {
        match (from.kind, to.kind) {
            (KeyKind::Primary, KeyKind::Primary) => self.alter_primary(table, from, to),
            (KeyKind::Unique, KeyKind::Unique) => self.alter_unique(table, from, to),
            (KeyKind::Unique, KeyKind::Primary) => {
                let mut statements = self.drop_unique(table, from)?;
                statements.extend(self.create_primary(table, to)?);
                Ok(statements)
            }
            // a live primary key is left in place; only the unique key is added
            (KeyKind::Primary, KeyKind::Unique) => self.create_unique(table, to),
        }
    }

    /// Creates a primary or unique key.
    ///
    /// # Errors
    ///
    /// [`SchemaError::RequiresRebuild`] for a primary key on SQLite.
    pub fn create_key(&self, table: &str, key: &Key) -> Statements {
        match key.kind {
            KeyKind::Primary => self.create_primary(table, key),
            KeyKind::Unique => self.create_unique(table, key),
        }
    }

    /// Creates a non-unique index.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn create_index(&self, table: &str, index: &Index) -> Statements {
        let name = self.q(&index.name);
        let t = self.q(table);
        let columns = self.column_list(&index.columns);
        Ok(vec![match self.backend {
            Backend::MySql | Backend::MariaDb => format!(
                "CREATE INDEX {name} USING {} ON {t} ({columns})",
                index.method.to_ascii_uppercase()
            ),
            Backend::Postgres => format!(
                "CREATE INDEX {name} ON {t} USING {} ({columns})",
                index.method.to_ascii_lowercase()
            ),
            Backend::Sqlite => format!("CREATE INDEX {name} ON {t} ({columns})"),
        }])
    }

    /// Drops a non-unique index.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn drop_index(&self, table: &str, index: &Index) -> Statements {
        let name = self.q(&index.name);
        Ok(vec![if self.backend.is_mysql_family() {
            format!("DROP INDEX {name} ON {}", self.q(table))
        } else {
            format!("DROP INDEX {name}")
        }])
    }

    /// Replaces index `from` with `to`.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn alter_index(&self, table: &str, from: &Index, to: &Index) -> Statements {
        let mut statements = self.drop_index(table, from)?;
        statements.extend(self.create_index(table, to)?);
        Ok(statements)
    }

    /// Creates a foreign key on `table`. SQLite gets the trigger set.
    ///
    /// # Errors
    ///
    /// Fails only if trigger metadata cannot be serialized.
    pub fn create_reference(&self, table: &Table, reference: &Reference) -> Statements {
        if self.backend == Backend::Sqlite {
            return triggers::create_triggers(table, reference);
        }
        Ok(vec![format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) \
             ON UPDATE {} ON DELETE {}",
            self.q(&table.name),
            self.q(&reference.name),
            self.column_list(&reference.columns),
            self.q(&reference.parent_table),
            self.column_list(&reference.parent_columns),
            reference.on_update.as_sql(),
            reference.on_delete.as_sql()
        )])
    }

    /// Drops a foreign key.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn drop_reference(&self, table: &str, reference: &Reference) -> Statements {
        let name = self.q(&reference.name);
        Ok(match self.backend {
            Backend::MySql | Backend::MariaDb => {
                vec![format!("ALTER TABLE {} DROP FOREIGN KEY {name}", self.q(table))]
            }
            Backend::Postgres => {
                vec![format!("ALTER TABLE {} DROP CONSTRAINT {name}", self.q(table))]
            }
            Backend::Sqlite => triggers::drop_triggers(reference),
        })
    }

    /// Replaces foreign key `from` with `to`.
    ///
    /// # Errors
    ///
    /// Fails only if trigger metadata cannot be serialized.
    pub fn alter_reference(&self, table: &Table, from: &Reference, to: &Reference) -> Statements {
        let mut statements = self.drop_reference(&table.name, from)?;
        statements.extend(self.create_reference(table, to)?);
        Ok(statements)
    }

    /// Rebuilds a SQLite table from its live definition `original` into
    /// `target`: create a scratch table, copy the common fields, drop the
    /// original, rename the scratch table, then replay `preserved` (the
    /// captured index and trigger SQL of the original table).
    ///
    /// The rename runs with `legacy_alter_table` so triggers on other tables
    /// that mention this table are not rewritten to the scratch name.
    #[must_use]
    pub fn rebuild(&self, original: &Table, target: &Table, preserved: &[String]) -> Vec<String> {
        let scratch = format!("{}{REBUILD_SUFFIX}", target.name);
        let common = target
            .fields
            .iter()
            .filter(|f| original.get_field(&f.name).is_some())
            .map(|f| self.q(&f.name))
            .collect::<Vec<_>>()
            .join(", ");

        let mut statements = vec![self.create_table_named(&scratch, target)];
        if !common.is_empty() {
            statements.push(format!(
                "INSERT INTO {} ({common}) SELECT {common} FROM {}",
                self.q(&scratch),
                self.q(&original.name)
            ));
        }
        statements.push(format!("DROP TABLE {}", self.q(&original.name)));
        statements.push(String::from("PRAGMA legacy_alter_table = ON"));
        statements.push(format!(
            "ALTER TABLE {} RENAME TO {}",
            self.q(&scratch),
            self.q(&target.name)
        ));
        statements.push(String::from("PRAGMA legacy_alter_table = OFF"));
        statements.extend(preserved.iter().cloned());
        statements
    }
}
