//! Schema introspection and DDL strategies per backend.
//!
//! Each backend implements [`Introspect`] (reading the live catalog into
//! descriptors) and [`Emit`] (turning planned operations into statements).
//! MySQL and PostgreSQL emit immediately; SQLite buffers everything until
//! [`Emit::flush_stack`] so several changes to one table share a single
//! rebuild.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlSchema;
pub use postgres::PgSchema;
pub use sqlite::SqliteSchema;

use dbkit_core::schema::{Ddl, Field, Index, Key, KeyKind, Reference, Table};
use dbkit_core::{Backend, IntoParams, Schema, SyncOp};
use tracing::debug;

use crate::connection::Connection;
use crate::error::Result;
use crate::recordset::Record;

/// Reads the live schema.
pub trait Introspect {
    /// Base tables of the current database, sorted by name.
    ///
    /// # Errors
    ///
    /// Fails when the catalog query fails.
    fn list_tables(&self, conn: &mut Connection) -> Result<Vec<String>>;

    /// Fields of `table` in column order.
    ///
    /// # Errors
    ///
    /// Fails when the catalog query fails.
    fn list_columns(&self, conn: &mut Connection, table: &str) -> Result<Vec<Field>>;

    /// Primary and unique keys of `table`.
    ///
    /// # Errors
    ///
    /// Fails when the catalog query fails.
    fn list_keys(&self, conn: &mut Connection, table: &str) -> Result<Vec<Key>>;

    /// Non-unique indexes of `table`.
    ///
    /// # Errors
    ///
    /// Fails when the catalog query fails.
    fn list_indexes(&self, conn: &mut Connection, table: &str) -> Result<Vec<Index>>;

    /// Foreign keys declared on `table`.
    ///
    /// # Errors
    ///
    /// Fails when the catalog query fails.
    fn list_foreign_keys(&self, conn: &mut Connection, table: &str) -> Result<Vec<Reference>>;

    /// Assembles the full descriptor of `table`.
    ///
    /// # Errors
    ///
    /// Fails when a catalog query fails.
    fn reverse_table(&self, conn: &mut Connection, name: &str) -> Result<Table> {
        let mut table = Table::new(name);
        table.fields = self.list_columns(conn, name)?;
        for key in self.list_keys(conn, name)? {
            match key.kind {
                KeyKind::Primary => table.primary = Some(key),
                KeyKind::Unique => table.uniques.push(key),
            }
        }
        table.indexes = self.list_indexes(conn, name)?;
        table.references = self.list_foreign_keys(conn, name)?;
        Ok(table)
    }

    /// Reverse-engineers every table of the database.
    ///
    /// # Errors
    ///
    /// Fails when a catalog query fails.
    fn reverse(&self, conn: &mut Connection) -> Result<Schema> {
        let mut schema = Schema::new();
        for name in self.list_tables(conn)? {
            schema.push(self.reverse_table(conn, &name)?);
        }
        Ok(schema)
    }
}

/// Applies schema changes.
///
/// The default methods run the statements of [`Ddl`] right away. Every
/// method receives the declared table the change belongs to.
pub trait Emit {
    /// Statement generator for this backend.
    fn ddl(&self) -> Ddl;

    /// Runs statements in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Fails when a statement is rejected.
    fn run(&self, conn: &mut Connection, statements: Vec<String>) -> Result<()> {
        for sql in statements {
            conn.execute(&sql)?;
        }
        Ok(())
    }

    /// Creates a table with its fields and primary key.
    ///
    /// # Errors
    ///
    /// Fails when a statement is rejected.
    fn create_table(&mut self, conn: &mut Connection, table: &Table) -> Result<()> {
        let statements = self.ddl().create_table(table)?;
        self.run(conn, statements)
    }

    /// Adds a field.
    ///
    /// # Errors
    ///
    /// Fails when a statement is rejected.
    fn create_field(&mut self, conn: &mut Connection, table: &Table, field: &Field) -> Result<()> {
        let statements = self.ddl().create_field(&table.name, field)?;
        self.run(conn, statements)
    }

    /// Changes a field from `from` (live) to `to` (declared).
    ///
    /// # Errors
    ///
    /// Fails when a statement is rejected.
    fn alter_field(
        &mut self,
        conn: &mut Connection,
        table: &Table,
        from: &Field,
        to: &Field,
    ) -> Result<()> {
        let statements = self.ddl().alter_field(&table.name, from, to)?;
        self.run(conn, statements)
    }

    /// Creates a primary or unique key.
    ///
    /// # Errors
    ///
    /// Fails when a statement is rejected.
    fn create_key(&mut self, conn: &mut Connection, table: &Table, key: &Key) -> Result<()> {
        let statements = self.ddl().create_key(&table.name, key)?;
        self.run(conn, statements)
    }

    /// Replaces a key.
    ///
    /// # Errors
    ///
    /// Fails when a statement is rejected.
    fn alter_key(&mut self, conn: &mut Connection, table: &Table, from: &Key, to: &Key) -> Result<()> {
        let statements = self.ddl().alter_key(&table.name, from, to)?;
        self.run(conn, statements)
    }

    /// Drops a unique key.
    ///
    /// # Errors
    ///
    /// Fails when a statement is rejected.
    fn drop_unique(&mut self, conn: &mut Connection, table: &Table, key: &Key) -> Result<()> {
        let statements = self.ddl().drop_unique(&table.name, key)?;
        self.run(conn, statements)
    }

    /// Creates an index.
    ///
    /// # Errors
    ///
    /// Fails when a statement is rejected.
    fn create_index(&mut self, conn: &mut Connection, table: &Table, index: &Index) -> Result<()> {
        let statements = self.ddl().create_index(&table.name, index)?;
        self.run(conn, statements)
    }

    /// Replaces an index.
    ///
    /// # Errors
    ///
    /// Fails when a statement is rejected.
    fn alter_index(
        &mut self,
        conn: &mut Connection,
        table: &Table,
        from: &Index,
        to: &Index,
    ) -> Result<()> {
        let statements = self.ddl().alter_index(&table.name, from, to)?;
        self.run(conn, statements)
    }

    /// Creates a foreign key.
    ///
    /// # Errors
    ///
    /// Fails when a statement is rejected.
    fn create_reference(
        &mut self,
        conn: &mut Connection,
        table: &Table,
        reference: &Reference,
    ) -> Result<()> {
        let statements = self.ddl().create_reference(table, reference)?;
        self.run(conn, statements)
    }

    /// Replaces a foreign key.
    ///
    /// # Errors
    ///
    /// Fails when a statement is rejected.
    fn alter_reference(
        &mut self,
        conn: &mut Connection,
        table: &Table,
        from: &Reference,
        to: &Reference,
    ) -> Result<()> {
        let statements = self.ddl().alter_reference(table, from, to)?;
        self.run(conn, statements)
    }

    /// Executes buffered statements. Immediate strategies have nothing to do.
    ///
    /// # Errors
    ///
    /// Fails when a buffered statement is rejected.
    fn flush_stack(&mut self, _conn: &mut Connection) -> Result<()> {
        Ok(())
    }

    /// Applies one planned operation. `declared` supplies the table
    /// definitions operations refer to by name.
    ///
    /// # Errors
    ///
    /// Fails when a statement is rejected.
    fn apply(&mut self, conn: &mut Connection, declared: &Schema, op: &SyncOp) -> Result<()> {
        debug!(operation = %op, "Applying");
        let unknown;
        let table = match declared.get(op.table()) {
            Some(table) => table,
            None => {
                unknown = Table::new(op.table());
                &unknown
            }
        };
        match op {
            SyncOp::CreateTable(created) => self.create_table(conn, created),
            SyncOp::CreateField { field, .. } => self.create_field(conn, table, field),
            SyncOp::AlterField { from, to, .. } => self.alter_field(conn, table, from, to),
            SyncOp::CreateKey { key, .. } => self.create_key(conn, table, key),
            SyncOp::AlterKey { from, to, .. } => self.alter_key(conn, table, from, to),
            SyncOp::CreateIndex { index, .. } => self.create_index(conn, table, index),
            SyncOp::AlterIndex { from, to, .. } => self.alter_index(conn, table, from, to),
            SyncOp::CreateReference { reference, .. } => {
                self.create_reference(conn, table, reference)
            }
            SyncOp::AlterReference { from, to, .. } => {
                self.alter_reference(conn, table, from, to)
            }
        }
    }
}

/// A complete backend strategy.
pub trait Strategy: Introspect + Emit {}

impl<T: Introspect + Emit> Strategy for T {}

/// The strategy for `backend`.
#[must_use]
pub fn strategy(backend: Backend) -> Box<dyn Strategy> {
    match backend {
        Backend::MySql => Box::new(MySqlSchema::new(false)),
        Backend::MariaDb => Box::new(MySqlSchema::new(true)),
        Backend::Postgres => Box::new(PgSchema),
        Backend::Sqlite => Box::new(SqliteSchema::new()),
    }
}

/// Runs a catalog query and decodes every row.
fn fetch(conn: &mut Connection, sql: &str, params: impl IntoParams) -> Result<Vec<Record>> {
    conn.query(sql, params)?.rows()
}

/// A text column, empty when NULL.
fn text(record: &Record, column: &str) -> Result<String> {
    Ok(record.get::<Option<String>>(column)?.unwrap_or_default())
}

/// An optional non-negative integer column.
fn size(record: &Record, column: &str) -> Result<Option<u32>> {
    Ok(record
        .get::<Option<i64>>(column)?
        .and_then(|n| u32::try_from(n).ok()))
}

/// Groups consecutive `(name, column)` rows into named column lists.
fn group_columns<T>(rows: Vec<(String, String, T)>) -> Vec<(String, Vec<String>, T)> {
    let mut groups: Vec<(String, Vec<String>, T)> = Vec::new();
    for (name, column, extra) in rows {
        match groups.last_mut() {
            Some((last, columns, _)) if *last == name => columns.push(column),
            _ => groups.push((name, vec![column], extra)),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_columns_keeps_order() {
        let rows = vec![
            (String::from("a"), String::from("x"), 1),
            (String::from("a"), String::from("y"), 1),
            (String::from("b"), String::from("z"), 2),
        ];
        let groups = group_columns(rows);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].1, vec!["x", "y"]);
        assert_eq!(groups[1], (String::from("b"), vec![String::from("z")], 2));
    }

    #[test]
    fn test_strategy_per_backend() {
        assert_eq!(strategy(Backend::MariaDb).ddl().backend(), Backend::MariaDb);
        assert_eq!(strategy(Backend::Sqlite).ddl().backend(), Backend::Sqlite);
        assert_eq!(strategy(Backend::Postgres).ddl().backend(), Backend::Postgres);
    }
}
