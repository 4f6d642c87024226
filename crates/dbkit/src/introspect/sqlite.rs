//! SQLite catalog and the buffered, rebuild-based DDL strategy.
//!
//! SQLite can add columns and indexes in place but cannot alter a column,
//! change a primary key or add a foreign key. Those changes rebuild the
//! table, and foreign keys become triggers. Every statement is buffered and
//! [`Emit::flush_stack`] runs them in dependency order:
//!
//! 1. new tables
//! 2. added columns of tables that are not rebuilt
//! 3. table rebuilds, each inside a savepoint
//! 4. keys and indexes
//! 5. foreign key triggers

use std::sync::OnceLock;

use dbkit_core::schema::triggers::parse_metadata;
use dbkit_core::schema::types::{parse_declared_type, universal_type};
use dbkit_core::schema::{
    normalize_default, Ddl, DefaultValue, Field, Index, Key, KeyKind, Reference, Table,
};
use dbkit_core::Backend;
use regex::Regex;
use tracing::{debug, info, warn};

use super::{fetch, text, Emit, Introspect};
use crate::connection::Connection;
use crate::error::Result;

const TABLES: &str = "SELECT name FROM sqlite_master \
    WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

const COLUMNS: &str = "SELECT name, type, \"notnull\" AS not_null, dflt_value, pk \
    FROM pragma_table_info(?) ORDER BY cid";

const TABLE_SQL: &str = "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?";

const INDEX_LIST: &str = "SELECT name, \"unique\" AS is_unique, origin FROM pragma_index_list(?)";

const INDEX_COLUMNS: &str = "SELECT name FROM pragma_index_info(?) ORDER BY seqno";

const TRIGGERS: &str = "SELECT sql FROM sqlite_master \
    WHERE type = 'trigger' AND tbl_name = ? AND sql IS NOT NULL ORDER BY name";

const ATTACHED: &str = "SELECT sql FROM sqlite_master \
    WHERE tbl_name = ? AND type IN ('index', 'trigger') AND sql IS NOT NULL ORDER BY type, name";

const SAVEPOINT: &str = "dbkit_rebuild";

/// Name SQLite reports for an unnamed primary key.
const PRIMARY: &str = "PRIMARY";

fn primary_name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"(?i)CONSTRAINT\s+["`]?(\w+)["`]?\s+PRIMARY\s+KEY"#).ok())
        .as_ref()
}

/// The primary key name written in a CREATE TABLE statement.
fn primary_name(create_sql: &str) -> String {
    primary_name_pattern()
        .and_then(|pattern| pattern.captures(create_sql))
        .and_then(|c| c.get(1))
        .map_or_else(|| String::from(PRIMARY), |m| m.as_str().to_string())
}

/// A pending table rebuild: the live definition, the definition to build,
/// and the index and trigger SQL to replay afterwards.
#[derive(Debug, Clone)]
struct Rebuild {
    original: Table,
    target: Table,
    preserved: Vec<String>,
}

/// Strategy for SQLite.
#[derive(Debug, Default)]
pub struct SqliteSchema {
    creates: Vec<String>,
    added: Vec<(String, Field)>,
    rebuilds: Vec<Rebuild>,
    statements: Vec<String>,
    triggers: Vec<String>,
}

impl SqliteSchema {
    /// Creates a strategy with empty buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing is waiting for [`Emit::flush_stack`].
    #[must_use]
    pub fn is_flushed(&self) -> bool {
        self.creates.is_empty()
            && self.added.is_empty()
            && self.rebuilds.is_empty()
            && self.statements.is_empty()
            && self.triggers.is_empty()
    }

    /// The pending rebuild of `table`, registering one on first use.
    fn rebuild_of(&mut self, conn: &mut Connection, table: &str) -> Result<&mut Table> {
        let position = match self.rebuilds.iter().position(|r| r.original.name == table) {
            Some(position) => position,
            None => {
                let original = self.reverse_table(conn, table)?;
                let preserved = fetch(conn, ATTACHED, table)?
                    .iter()
                    .map(|r| text(r, "sql"))
                    .collect::<Result<Vec<_>>>()?;
                debug!(table = %table, "Scheduling table rebuild");
                self.rebuilds.push(Rebuild {
                    target: original.clone(),
                    original,
                    preserved,
                });
                self.rebuilds.len() - 1
            }
        };
        Ok(&mut self.rebuilds[position].target)
    }

    fn is_rebuilt(&self, table: &str) -> bool {
        self.rebuilds.iter().any(|r| r.original.name == table)
    }

    /// The whole buffer in execution order, each rebuild wrapped in a
    /// savepoint. Empties the buffers.
    fn drain(&mut self) -> Vec<Batch> {
        let ddl = self.ddl();
        let mut batches = vec![Batch::Plain(std::mem::take(&mut self.creates))];

        let added = std::mem::take(&mut self.added);
        let mut columns = Vec::new();
        for (table, field) in &added {
            if !self.is_rebuilt(table) {
                columns.push(format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    Backend::Sqlite.quote(table),
                    ddl.column_definition(field)
                ));
            }
        }
        batches.push(Batch::Plain(columns));

        for mut rebuild in std::mem::take(&mut self.rebuilds) {
            for (table, field) in &added {
                if *table == rebuild.target.name && rebuild.target.get_field(&field.name).is_none() {
                    rebuild.target.fields.push(field.clone());
                }
            }
            batches.push(Batch::Rebuild(ddl.rebuild(
                &rebuild.original,
                &rebuild.target,
                &rebuild.preserved,
            )));
        }

        batches.push(Batch::Plain(std::mem::take(&mut self.statements)));
        batches.push(Batch::Plain(std::mem::take(&mut self.triggers)));
        batches
    }
}

/// A group of buffered statements.
#[derive(Debug)]
enum Batch {
    Plain(Vec<String>),
    Rebuild(Vec<String>),
}

/// Whether ADD COLUMN cannot add `field` to a table that may hold rows.
fn needs_rebuild(field: &Field) -> bool {
    !field.nullable && matches!(field.default, None | Some(DefaultValue::Expression(_)))
}

fn set_field(table: &mut Table, field: &Field) {
    match table.fields.iter_mut().find(|f| f.name == field.name) {
        Some(existing) => *existing = field.clone(),
        None => table.fields.push(field.clone()),
    }
}

fn set_primary(table: &mut Table, key: &Key) {
    for field in &mut table.fields {
        if key.columns.contains(&field.name) {
            field.nullable = false;
        }
    }
    table.primary = Some(key.clone());
}

impl Introspect for SqliteSchema {
    fn list_tables(&self, conn: &mut Connection) -> Result<Vec<String>> {
        fetch(conn, TABLES, ())?
            .iter()
            .map(|r| text(r, "name"))
            .collect()
    }

    fn list_columns(&self, conn: &mut Connection, table: &str) -> Result<Vec<Field>> {
        let mut fields = Vec::new();
        for record in fetch(conn, COLUMNS, table)? {
            let (base, len, scale) = parse_declared_type(&text(&record, "type")?);
            let mut field = Field::new(text(&record, "name")?, universal_type(Backend::Sqlite, &base));
            field.len = len;
            field.scale = scale;
            field.nullable = record.get::<i64>("not_null")? == 0;
            field.default = normalize_default(
                record
                    .get::<Option<String>>("dflt_value")?
                    .map(|d| DefaultValue::parse_literal(&d)),
            );
            fields.push(field);
        }
        Ok(fields)
    }

    fn list_keys(&self, conn: &mut Connection, table: &str) -> Result<Vec<Key>> {
        let mut keys = Vec::new();

        let mut primary: Vec<(i64, String)> = Vec::new();
        for record in fetch(conn, COLUMNS, table)? {
            let position = record.get::<i64>("pk")?;
            if position > 0 {
                primary.push((position, text(&record, "name")?));
            }
        }
        if !primary.is_empty() {
            primary.sort();
            let create_sql = match fetch(conn, TABLE_SQL, table)?.first() {
                Some(record) => text(record, "sql")?,
                None => String::new(),
            };
            keys.push(Key {
                name: primary_name(&create_sql),
                kind: KeyKind::Primary,
                columns: primary.into_iter().map(|(_, name)| name).collect(),
            });
        }

        for record in fetch(conn, INDEX_LIST, table)? {
            let origin = text(&record, "origin")?;
            if record.get::<i64>("is_unique")? == 1 && (origin == "c" || origin == "u") {
                let name = text(&record, "name")?;
                let columns = index_columns(conn, &name)?;
                keys.push(Key {
                    name,
                    kind: KeyKind::Unique,
                    columns,
                });
            }
        }
        Ok(keys)
    }

    fn list_indexes(&self, conn: &mut Connection, table: &str) -> Result<Vec<Index>> {
        let mut indexes = Vec::new();
        for record in fetch(conn, INDEX_LIST, table)? {
            if record.get::<i64>("is_unique")? == 0 && text(&record, "origin")? == "c" {
                let name = text(&record, "name")?;
                let columns = index_columns(conn, &name)?;
                indexes.push(Index {
                    name,
                    method: String::from("btree"),
                    columns,
                });
            }
        }
        Ok(indexes)
    }

    fn list_foreign_keys(&self, conn: &mut Connection, table: &str) -> Result<Vec<Reference>> {
        let mut references = Vec::new();
        for record in fetch(conn, TRIGGERS, table)? {
            if let Some(reference) = parse_metadata(&text(&record, "sql")?) {
                references.push(reference);
            }
        }
        Ok(references)
    }
}

fn index_columns(conn: &mut Connection, index: &str) -> Result<Vec<String>> {
    fetch(conn, INDEX_COLUMNS, index)?
        .iter()
        .map(|r| text(r, "name"))
        .collect()
}

impl Emit for SqliteSchema {
    fn ddl(&self) -> Ddl {
        Ddl::new(Backend::Sqlite)
    }

    fn create_table(&mut self, _conn: &mut Connection, table: &Table) -> Result<()> {
        let statements = self.ddl().create_table(table)?;
        self.creates.extend(statements);
        Ok(())
    }

    fn create_field(&mut self, conn: &mut Connection, table: &Table, field: &Field) -> Result<()> {
        if needs_rebuild(field) {
            set_field(self.rebuild_of(conn, &table.name)?, field);
        } else {
            self.added.push((table.name.clone(), field.clone()));
        }
        Ok(())
    }

    fn alter_field(
        &mut self,
        conn: &mut Connection,
        table: &Table,
        _from: &Field,
        to: &Field,
    ) -> Result<()> {
        set_field(self.rebuild_of(conn, &table.name)?, to);
        Ok(())
    }

    fn create_key(&mut self, conn: &mut Connection, table: &Table, key: &Key) -> Result<()> {
        match key.kind {
            KeyKind::Primary => set_primary(self.rebuild_of(conn, &table.name)?, key),
            KeyKind::Unique => {
                let statements = self.ddl().create_unique(&table.name, key)?;
                self.statements.extend(statements);
            }
        }
        Ok(())
    }

    fn alter_key(&mut self, conn: &mut Connection, table: &Table, from: &Key, to: &Key) -> Result<()> {
        let ddl = self.ddl();
        match (from.kind, to.kind) {
            (KeyKind::Unique, KeyKind::Unique) => {
                self.statements.extend(ddl.alter_unique(&table.name, from, to)?);
            }
            (KeyKind::Primary, KeyKind::Unique) => {
                self.statements.extend(ddl.create_unique(&table.name, to)?);
            }
            (KeyKind::Unique, KeyKind::Primary) => {
                self.statements.extend(ddl.drop_unique(&table.name, from)?);
                set_primary(self.rebuild_of(conn, &table.name)?, to);
            }
            (KeyKind::Primary, KeyKind::Primary) => {
                set_primary(self.rebuild_of(conn, &table.name)?, to);
            }
        }
        Ok(())
    }

    fn drop_unique(&mut self, _conn: &mut Connection, table: &Table, key: &Key) -> Result<()> {
        let statements = self.ddl().drop_unique(&table.name, key)?;
        self.statements.extend(statements);
        Ok(())
    }

    fn create_index(&mut self, _conn: &mut Connection, table: &Table, index: &Index) -> Result<()> {
        let statements = self.ddl().create_index(&table.name, index)?;
        self.statements.extend(statements);
        Ok(())
    }

    fn alter_index(
        &mut self,
        _conn: &mut Connection,
        table: &Table,
        from: &Index,
        to: &Index,
    ) -> Result<()> {
        let statements = self.ddl().alter_index(&table.name, from, to)?;
        self.statements.extend(statements);
        Ok(())
    }

    fn create_reference(
        &mut self,
        _conn: &mut Connection,
        table: &Table,
        reference: &Reference,
    ) -> Result<()> {
        let statements = self.ddl().create_reference(table, reference)?;
        self.triggers.extend(statements);
        Ok(())
    }

    fn alter_reference(
        &mut self,
        _conn: &mut Connection,
        table: &Table,
        from: &Reference,
        to: &Reference,
    ) -> Result<()> {
        let statements = self.ddl().alter_reference(table, from, to)?;
        self.triggers.extend(statements);
        Ok(())
    }

    fn flush_stack(&mut self, conn: &mut Connection) -> Result<()> {
        let batches = self.drain();
        let mut executed = 0;
        for batch in batches {
            match batch {
                Batch::Plain(statements) => {
                    executed += statements.len();
                    self.run(conn, statements)?;
                }
                Batch::Rebuild(statements) => {
                    executed += statements.len();
                    conn.execute(&format!("SAVEPOINT {SAVEPOINT}"))?;
                    if let Err(e) = self.run(conn, statements) {
                        rollback_savepoint(conn);
                        return Err(e);
                    }
                    conn.execute(&format!("RELEASE {SAVEPOINT}"))?;
                }
            }
        }
        if executed > 0 {
            info!(statements = executed, "Flushed SQLite schema changes");
        }
        Ok(())
    }
}

/// Undoes a failed rebuild. The original error is what the caller reports;
/// cleanup failures are only logged.
fn rollback_savepoint(conn: &mut Connection) {
    for sql in [
        format!("ROLLBACK TO {SAVEPOINT}"),
        format!("RELEASE {SAVEPOINT}"),
        String::from("PRAGMA legacy_alter_table = OFF"),
    ] {
        if let Err(e) = conn.execute(&sql) {
            warn!(sql = %sql, error = %e, "Cannot clean up failed rebuild");
        }
    }
}
