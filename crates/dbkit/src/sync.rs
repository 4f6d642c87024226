//! Schema synchronization entry points.

use dbkit_core::{plan, Schema, SyncPlan};
use tracing::info;

use crate::connection::Connection;
use crate::error::Result;
use crate::introspect::{strategy, Strategy};

/// Brings a live database in line with a declared schema.
pub trait SchemaSync {
    /// Computes the changes without applying them.
    ///
    /// # Errors
    ///
    /// Fails when the live schema cannot be read.
    fn plan_against(&self, conn: &mut Connection) -> Result<SyncPlan>;

    /// Creates and alters tables, fields, keys, indexes and references
    /// until the live schema matches, and returns the number of operations
    /// applied. Nothing is ever dropped. Running it twice in a row applies
    /// nothing the second time.
    ///
    /// # Errors
    ///
    /// Stops at the first rejected statement.
    fn synchronize(&self, conn: &mut Connection) -> Result<usize>;
}

/// Live descriptors of the declared tables that already exist.
fn live_snapshot(
    strategy: &dyn Strategy,
    conn: &mut Connection,
    declared: &Schema,
) -> Result<Schema> {
    let existing = strategy.list_tables(conn)?;
    let mut live = Schema::new();
    for table in &declared.tables {
        if existing.contains(&table.name) {
            live.push(strategy.reverse_table(conn, &table.name)?);
        }
    }
    Ok(live)
}

impl SchemaSync for Schema {
    fn plan_against(&self, conn: &mut Connection) -> Result<SyncPlan> {
        let strategy = strategy(conn.backend());
        let live = live_snapshot(strategy.as_ref(), conn, self)?;
        Ok(plan(self, &live, conn.backend()))
    }

    fn synchronize(&self, conn: &mut Connection) -> Result<usize> {
        let mut strategy = strategy(conn.backend());
        let live = live_snapshot(strategy.as_ref(), conn, self)?;
        let operations = plan(self, &live, conn.backend());

        for op in &operations {
            strategy.apply(conn, self, op)?;
        }
        strategy.flush_stack(conn)?;

        info!(
            tables = self.tables.len(),
            operations = operations.len(),
            "Schema synchronized"
        );
        Ok(operations.len())
    }
}

/// Reverse-engineers the whole live database.
///
/// # Errors
///
/// Fails when a catalog query fails.
pub fn reverse(conn: &mut Connection) -> Result<Schema> {
    strategy(conn.backend()).reverse(conn)
}
