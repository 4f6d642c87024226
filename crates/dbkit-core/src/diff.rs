//! Schema diff planner.
//!
//! [`plan`] compares a declared schema with a live snapshot and returns the
//! operations that bring the live database up to the declaration. Nothing is
//! ever dropped: live tables, fields and constraints the declaration does not
//! mention are left alone.
//!
//! Keys, indexes and references are matched in two passes. A declared item
//! first looks for a live item of the same name; failing that it takes the
//! first live item with the same shape (column set plus kind, method or
//! parent table). A matched item whose definition differs becomes an alter,
//! so a renamed key is one alter and not a drop plus a create. An unmatched
//! item is created.

use std::fmt;

use crate::backend::Backend;
use crate::schema::{Field, Index, Key, Reference, Schema, Table};

/// One schema change.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOp {
    /// Create a table with its fields and primary key.
    CreateTable(Table),
    /// Add a field to an existing table.
    CreateField {
        /// Table name.
        table: String,
        /// Declared field.
        field: Field,
    },
    /// Change a field definition.
    AlterField {
        /// Table name.
        table: String,
        /// Live definition.
        from: Field,
        /// Declared definition.
        to: Field,
    },
    /// Create a primary or unique key.
    CreateKey {
        /// Table name.
        table: String,
        /// Declared key.
        key: Key,
    },
    /// Replace a key.
    AlterKey {
        /// Table name.
        table: String,
        /// Live key.
        from: Key,
        /// Declared key.
        to: Key,
    },
    /// Create an index.
    CreateIndex {
        /// Table name.
        table: String,
        /// Declared index.
        index: Index,
    },
    /// Replace an index.
    AlterIndex {
        /// Table name.
        table: String,
        /// Live index.
        from: Index,
        /// Declared index.
        to: Index,
    },
    /// Create a foreign key.
    CreateReference {
        /// Child table name.
        table: String,
        /// Declared reference.
        reference: Reference,
    },
    /// Replace a foreign key.
    AlterReference {
        /// Child table name.
        table: String,
        /// Live reference.
        from: Reference,
        /// Declared reference.
        to: Reference,
    },
}

impl SyncOp {
    /// Name of the table the operation applies to.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::CreateTable(table) => &table.name,
            Self::CreateField { table, .. }
            | Self::AlterField { table, .. }
            | Self::CreateKey { table, .. }
            | Self::AlterKey { table, .. }
            | Self::CreateIndex { table, .. }
            | Self::AlterIndex { table, .. }
            | Self::CreateReference { table, .. }
            | Self::AlterReference { table, .. } => table,
        }
    }
}

impl fmt::Display for SyncOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateTable(table) => {
                write!(f, "create table {} ({} fields)", table.name, table.fields.len())
            }
            Self::CreateField { table, field } => {
                write!(f, "create field {table}.{} {}", field.name, field.kind)
            }
            Self::AlterField { table, from, to } => write!(
                f,
                "alter field {table}.{} {} -> {}",
                to.name, from.kind, to.kind
            ),
            Self::CreateKey { table, key } => write!(
                f,
                "create key {table}.{} ({})",
                key.name,
                key.columns.join(", ")
            ),
            Self::AlterKey { table, from, to } => {
                write!(f, "alter key {table}.{} -> {}", from.name, to.name)
            }
            Self::CreateIndex { table, index } => write!(
                f,
                "create index {table}.{} ({})",
                index.name,
                index.columns.join(", ")
            ),
            Self::AlterIndex { table, from, to } => {
                write!(f, "alter index {table}.{} -> {}", from.name, to.name)
            }
            Self::CreateReference { table, reference } => write!(
                f,
                "create reference {table}.{} -> {}",
                reference.name, reference.parent_table
            ),
            Self::AlterReference { table, from, to } => {
                write!(f, "alter reference {table}.{} -> {}", from.name, to.name)
            }
        }
    }
}

/// Ordered list of operations produced by [`plan`].
///
/// The order is fixed: tables, fields, field alterations, keys, key
/// alterations, indexes, index alterations, references, reference
/// alterations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    ops: Vec<SyncOp>,
}

impl SyncPlan {
    /// Number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the live schema already matches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Iterates over the operations in application order.
    pub fn iter(&self) -> std::slice::Iter<'_, SyncOp> {
        self.ops.iter()
    }

    /// One-line summary per operation.
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        self.ops.iter().map(ToString::to_string).collect()
    }
}

impl IntoIterator for SyncPlan {
    type Item = SyncOp;
    type IntoIter = std::vec::IntoIter<SyncOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a> IntoIterator for &'a SyncPlan {
    type Item = &'a SyncOp;
    type IntoIter = std::slice::Iter<'a, SyncOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

#[derive(Default)]
struct Buckets {
    create_tables: Vec<SyncOp>,
    create_fields: Vec<SyncOp>,
    alter_fields: Vec<SyncOp>,
    create_keys: Vec<SyncOp>,
    alter_keys: Vec<SyncOp>,
    create_indexes: Vec<SyncOp>,
    alter_indexes: Vec<SyncOp>,
    create_references: Vec<SyncOp>,
    alter_references: Vec<SyncOp>,
}

impl Buckets {
    fn into_plan(self) -> SyncPlan {
        let ops = [
            self.create_tables,
            self.create_fields,
            self.alter_fields,
            self.create_keys,
            self.alter_keys,
            self.create_indexes,
            self.alter_indexes,
            self.create_references,
            self.alter_references,
        ]
        .into_iter()
        .flatten()
        .collect();
        SyncPlan { ops }
    }
}

/// Name match first, then the first live item of the same shape.
fn find_match<'a, T>(
    declared: &T,
    live: &'a [T],
    name: impl Fn(&T) -> &str,
    same_shape: impl Fn(&T, &T) -> bool,
) -> Option<&'a T> {
    live.iter()
        .find(|l| name(l) == name(declared))
        .or_else(|| live.iter().find(|l| same_shape(declared, l)))
}

/// Computes the operations that bring `live` up to `declared`.
#[must_use]
pub fn plan(declared: &Schema, live: &Schema, backend: Backend) -> SyncPlan {
    let mut buckets = Buckets::default();

    for table in &declared.tables {
        match live.get(&table.name) {
            None => plan_new_table(table, &mut buckets),
            Some(live_table) => plan_existing_table(table, live_table, backend, &mut buckets),
        }
    }

    buckets.into_plan()
}

fn plan_new_table(table: &Table, buckets: &mut Buckets) {
    let name = &table.name;
    buckets.create_tables.push(SyncOp::CreateTable(table.clone()));
    for key in &table.uniques {
        buckets.create_keys.push(SyncOp::CreateKey {
            table: name.clone(),
            key: key.clone(),
        });
    }
    for index in &table.indexes {
        buckets.create_indexes.push(SyncOp::CreateIndex {
            table: name.clone(),
            index: index.clone(),
        });
    }
    for reference in &table.references {
        buckets.create_references.push(SyncOp::CreateReference {
            table: name.clone(),
            reference: reference.clone(),
        });
    }
}

fn plan_existing_table(table: &Table, live: &Table, backend: Backend, buckets: &mut Buckets) {
    let name = &table.name;

    for field in &table.fields {
        match live.get_field(&field.name) {
            None => buckets.create_fields.push(SyncOp::CreateField {
                table: name.clone(),
                field: field.clone(),
            }),
            Some(live_field) if !field.matches(live_field) => {
                buckets.alter_fields.push(SyncOp::AlterField {
                    table: name.clone(),
                    from: live_field.clone(),
                    to: field.clone(),
                });
            }
            Some(_) => {}
        }
    }

    let live_keys: Vec<Key> = live.keys().cloned().collect();
    for key in table.keys() {
        match find_match(key, &live_keys, |k| &k.name, Key::same_shape) {
            None => buckets.create_keys.push(SyncOp::CreateKey {
                table: name.clone(),
                key: key.clone(),
            }),
            Some(found) if !key.same_definition(found, backend) => {
                buckets.alter_keys.push(SyncOp::AlterKey {
                    table: name.clone(),
                    from: found.clone(),
                    to: key.clone(),
                });
            }
            Some(_) => {}
        }
    }

    for index in &table.indexes {
        match find_match(index, &live.indexes, |i| &i.name, Index::same_shape) {
            None => buckets.create_indexes.push(SyncOp::CreateIndex {
                table: name.clone(),
                index: index.clone(),
            }),
            Some(found) if !index.same_definition(found) => {
                buckets.alter_indexes.push(SyncOp::AlterIndex {
                    table: name.clone(),
                    from: found.clone(),
                    to: index.clone(),
                });
            }
            Some(_) => {}
        }
    }

    for reference in &table.references {
        match find_match(
            reference,
            &live.references,
            |r| &r.name,
            Reference::same_shape,
        ) {
            None => buckets.create_references.push(SyncOp::CreateReference {
                table: name.clone(),
                reference: reference.clone(),
            }),
            Some(found) if !reference.same_definition(found) => {
                buckets.alter_references.push(SyncOp::AlterReference {
                    table: name.clone(),
                    from: found.clone(),
                    to: reference.clone(),
                });
            }
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{bigint, integer, text, varchar, Action, KeyKind};

    fn tokens() -> Schema {
        let mut schema = Schema::declare("");
        schema
            .table("tokens")
            .unwrap()
            .field(varchar("token", 64))
            .unwrap()
            .unique("uq_tokens_token", &["token"])
            .unwrap();
        schema
    }

    /// A live snapshot identical to the declaration.
    fn live_copy(declared: &Schema) -> Schema {
        let mut live = Schema::new();
        for table in &declared.tables {
            let mut copy = Table::new(table.name.clone());
            copy.fields = table.fields.clone();
            copy.primary = table.primary.clone();
            copy.uniques = table.uniques.clone();
            copy.indexes = table.indexes.clone();
            copy.references = table.references.clone();
            live.push(copy);
        }
        live
    }

    #[test]
    fn test_new_table_is_created_with_its_keys() {
        let plan = plan(&tokens(), &Schema::new(), Backend::Sqlite);
        assert_eq!(plan.len(), 2);
        assert!(matches!(plan.iter().next(), Some(SyncOp::CreateTable(t)) if t.name == "tokens"));
        assert!(matches!(
            plan.iter().nth(1),
            Some(SyncOp::CreateKey { key, .. }) if key.kind == KeyKind::Unique
        ));
    }

    #[test]
    fn test_matching_live_schema_is_a_noop() {
        let declared = tokens();
        for backend in [Backend::MySql, Backend::Postgres, Backend::Sqlite] {
            assert!(plan(&declared, &live_copy(&declared), backend).is_empty());
        }
    }

    #[test]
    fn test_renamed_key_is_one_alter() {
        let declared = tokens();
        let mut live = live_copy(&declared);
        live.tables[0].uniques[0].name = String::from("old_name");

        let plan = plan(&declared, &live, Backend::Postgres);
        assert_eq!(plan.len(), 1);
        match plan.iter().next() {
            Some(SyncOp::AlterKey { from, to, .. }) => {
                assert_eq!(from.name, "old_name");
                assert_eq!(to.name, "uq_tokens_token");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_swapped_key_names_alter_both() {
        let mut declared = Schema::declare("");
        declared
            .table("t")
            .unwrap()
            .field(integer("x"))
            .unwrap()
            .field(integer("y"))
            .unwrap()
            .unique("uq_a", &["x"])
            .unwrap()
            .unique("uq_b", &["y"])
            .unwrap();
        let mut live = live_copy(&declared);
        live.tables[0].uniques[0].columns = vec![String::from("y")];
        live.tables[0].uniques[1].columns = vec![String::from("x")];

        // name matching wins over the structurally identical swapped key
        let plan = plan(&declared, &live, Backend::Sqlite);
        assert_eq!(plan.len(), 2);
        assert!(plan.iter().all(|op| matches!(op, SyncOp::AlterKey { .. })));
    }

    #[test]
    fn test_mysql_ignores_primary_key_name() {
        let mut declared = Schema::declare("");
        declared
            .table("users")
            .unwrap()
            .field(bigint("id"))
            .unwrap()
            .primary("pk_users", &["id"])
            .unwrap();
        let mut live = live_copy(&declared);
        if let Some(primary) = live.tables[0].primary.as_mut() {
            primary.name = String::from("PRIMARY");
        }

        assert!(plan(&declared, &live, Backend::MySql).is_empty());
        assert_eq!(plan(&declared, &live, Backend::Postgres).len(), 1);
    }

    #[test]
    fn test_fields_indexes_and_references() {
        let mut declared = Schema::declare("");
        declared
            .table("posts")
            .unwrap()
            .field(bigint("id"))
            .unwrap()
            .field(bigint("author"))
            .unwrap()
            .field(text("body").not_null())
            .unwrap()
            .field(integer("score").default_int(0))
            .unwrap()
            .index("ix_posts_author", "btree", &["author"])
            .unwrap()
            .reference(
                "fk_posts_author",
                &["author"],
                "users",
                &["id"],
                Action::NoAction,
                Action::Cascade,
            )
            .unwrap();

        let mut live = live_copy(&declared);
        {
            let posts = &mut live.tables[0];
            posts.fields.retain(|f| f.name != "score");
            posts.fields[2].nullable = true;
            posts.indexes[0].name = String::from("posts_author_idx");
            posts.references[0].on_delete = Action::Restrict;
        }

        let plan = plan(&declared, &live, Backend::Postgres);
        let kinds: Vec<&str> = plan
            .iter()
            .map(|op| match op {
                SyncOp::CreateField { .. } => "create field",
                SyncOp::AlterField { .. } => "alter field",
                SyncOp::AlterIndex { .. } => "alter index",
                SyncOp::AlterReference { .. } => "alter reference",
                _ => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["create field", "alter field", "alter index", "alter reference"]
        );
        assert!(plan.iter().all(|op| op.table() == "posts"));
    }

    #[test]
    fn test_describe() {
        let plan = plan(&tokens(), &Schema::new(), Backend::Sqlite);
        assert_eq!(
            plan.describe(),
            vec![
                String::from("create table tokens (1 fields)"),
                String::from("create key tokens.uq_tokens_token (token)"),
            ]
        );
    }
}
