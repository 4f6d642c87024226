//! Foreign key emulation for SQLite.
//!
//! SQLite cannot add or drop a foreign key on an existing table, so every
//! reference is enforced by four triggers:
//!
//! - `{name}_ins`: BEFORE INSERT on the child, rejects rows whose parent is
//!   missing.
//! - `{name}_upd`: BEFORE UPDATE of the child columns, same check.
//! - `{name}_pdel`: BEFORE DELETE on the parent, applies ON DELETE.
//! - `{name}_pupd`: AFTER UPDATE of the parent columns, applies ON UPDATE.
//!
//! The insert trigger carries the reference definition as a JSON comment so
//! the introspector can read references back without parsing SQL.

use crate::backend::Backend;
use crate::error::SchemaError;

use super::constraint::{Action, Reference};
use super::Table;

const METADATA_OPEN: &str = "/*dbkit:";
const METADATA_CLOSE: &str = "*/";

/// Names of the four triggers enforcing `reference`.
#[must_use]
pub fn trigger_names(reference: &Reference) -> [String; 4] {
    let name = &reference.name;
    [
        format!("{name}_ins"),
        format!("{name}_upd"),
        format!("{name}_pdel"),
        format!("{name}_pupd"),
    ]
}

/// CREATE TRIGGER statements enforcing `reference`, declared on `child`.
///
/// # Errors
///
/// Fails if the reference cannot be serialized into the metadata comment.
pub fn create_triggers(child: &Table, reference: &Reference) -> Result<Vec<String>, SchemaError> {
    let q = |ident: &str| Backend::Sqlite.quote(ident);
    let [ins, upd, pdel, pupd] = trigger_names(reference);
    let child_name = q(&child.name);
    let parent_name = q(&reference.parent_table);
    let metadata =
        serde_json::to_string(reference).map_err(|e| SchemaError::Document(e.to_string()))?;

    let pairs: Vec<(String, String)> = reference
        .columns
        .iter()
        .zip(&reference.parent_columns)
        .map(|(c, p)| (q(c), q(p)))
        .collect();

    let child_present = pairs
        .iter()
        .map(|(c, _)| format!("NEW.{c} IS NOT NULL"))
        .collect::<Vec<_>>()
        .join(" AND ");
    let parent_match = pairs
        .iter()
        .map(|(c, p)| format!("{p} = NEW.{c}"))
        .collect::<Vec<_>>()
        .join(" AND ");
    let child_match = pairs
        .iter()
        .map(|(c, p)| format!("{c} = OLD.{p}"))
        .collect::<Vec<_>>()
        .join(" AND ");
    let child_columns = pairs
        .iter()
        .map(|(c, _)| c.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let parent_columns = pairs
        .iter()
        .map(|(_, p)| p.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let parent_changed = pairs
        .iter()
        .map(|(_, p)| format!("OLD.{p} IS NOT NEW.{p}"))
        .collect::<Vec<_>>()
        .join(" OR ");

    let missing_parent = format!(
        "SELECT RAISE(ABORT, 'foreign key {} violated: no matching row in {}') \
         WHERE NOT EXISTS (SELECT 1 FROM {parent_name} WHERE {parent_match});",
        reference.name, reference.parent_table
    );

    let mut statements = vec![
        format!(
            "CREATE TRIGGER {} BEFORE INSERT ON {child_name} FOR EACH ROW \
             WHEN {child_present} BEGIN {METADATA_OPEN}{metadata}{METADATA_CLOSE} \
             {missing_parent} END",
            q(&ins)
        ),
        format!(
            "CREATE TRIGGER {} BEFORE UPDATE OF {child_columns} ON {child_name} FOR EACH ROW \
             WHEN {child_present} BEGIN {missing_parent} END",
            q(&upd)
        ),
    ];

    let on_delete = parent_action(child, reference, false, &child_match);
    statements.push(format!(
        "CREATE TRIGGER {} BEFORE DELETE ON {parent_name} FOR EACH ROW BEGIN {on_delete} END",
        q(&pdel)
    ));

    let on_update = parent_action(child, reference, true, &child_match);
    statements.push(format!(
        "CREATE TRIGGER {} AFTER UPDATE OF {parent_columns} ON {parent_name} FOR EACH ROW \
         WHEN {parent_changed} BEGIN {on_update} END",
        q(&pupd)
    ));

    Ok(statements)
}

/// Body of a parent-side trigger applying ON UPDATE (`updating`) or
/// ON DELETE to the child rows matching `child_match`.
fn parent_action(child: &Table, reference: &Reference, updating: bool, child_match: &str) -> String {
    let child_name = Backend::Sqlite.quote(&child.name);
    let action = if updating {
        reference.on_update
    } else {
        reference.on_delete
    };

    match action {
        Action::NoAction | Action::Restrict => format!(
            "SELECT RAISE(ABORT, 'foreign key {} violated: rows in {} still reference this row') \
             WHERE EXISTS (SELECT 1 FROM {child_name} WHERE {child_match});",
            reference.name, child.name
        ),
        Action::Cascade if !updating => {
            format!("DELETE FROM {child_name} WHERE {child_match};")
        }
        Action::Cascade => {
            let set = assignments(reference, |_, parent| format!("NEW.{parent}"));
            format!("UPDATE {child_name} SET {set} WHERE {child_match};")
        }
        Action::SetNull => {
            let set = assignments(reference, |_, _| String::from("NULL"));
            format!("UPDATE {child_name} SET {set} WHERE {child_match};")
        }
        Action::SetDefault => {
            let set = assignments(reference, |column, _| {
                child
                    .get_field(column)
                    .and_then(|f| f.default.as_ref())
                    .map_or_else(|| String::from("NULL"), |d| d.to_sql(Backend::Sqlite))
            });
            format!("UPDATE {child_name} SET {set} WHERE {child_match};")
        }
    }
}

/// `"child" = value` pairs; `value` receives the raw child column and the
/// quoted parent column.
fn assignments(reference: &Reference, value: impl Fn(&str, &str) -> String) -> String {
    reference
        .columns
        .iter()
        .zip(&reference.parent_columns)
        .map(|(c, p)| {
            format!(
                "{} = {}",
                Backend::Sqlite.quote(c),
                value(c, &Backend::Sqlite.quote(p))
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// DROP TRIGGER statements for the triggers enforcing `reference`.
#[must_use]
pub fn drop_triggers(reference: &Reference) -> Vec<String> {
    trigger_names(reference)
        .iter()
        .map(|name| format!("DROP TRIGGER IF EXISTS {}", Backend::Sqlite.quote(name)))
        .collect()
}

/// Reads the reference definition embedded in a trigger's SQL, if any.
#[must_use]
pub fn parse_metadata(trigger_sql: &str) -> Option<Reference> {
    let start = trigger_sql.find(METADATA_OPEN)? + METADATA_OPEN.len();
    let len = trigger_sql[start..].find(METADATA_CLOSE)?;
    serde_json::from_str(&trigger_sql[start..start + len]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{bigint, integer, Schema};

    fn orders(on_update: Action, on_delete: Action) -> Table {
        let mut schema = Schema::declare("");
        schema
            .table("orders")
            .unwrap()
            .field(bigint("id"))
            .unwrap()
            .field(integer("user_id").default_int(0))
            .unwrap()
            .reference("fk_user", &["user_id"], "users", &["id"], on_update, on_delete)
            .unwrap();
        schema.tables.remove(0)
    }

    #[test]
    fn test_four_triggers_with_metadata() {
        let table = orders(Action::Cascade, Action::SetNull);
        let statements = create_triggers(&table, &table.references[0]).unwrap();
        assert_eq!(statements.len(), 4);
        assert!(statements[0].starts_with(
            "CREATE TRIGGER \"fk_user_ins\" BEFORE INSERT ON \"orders\" FOR EACH ROW \
             WHEN NEW.\"user_id\" IS NOT NULL BEGIN /*dbkit:"
        ));
        assert!(statements[1].contains("BEFORE UPDATE OF \"user_id\" ON \"orders\""));
        assert!(statements[2].contains(
            "UPDATE \"orders\" SET \"user_id\" = NULL WHERE \"user_id\" = OLD.\"id\";"
        ));
        assert!(statements[3].contains("AFTER UPDATE OF \"id\" ON \"users\""));
        assert!(statements[3].contains(
            "UPDATE \"orders\" SET \"user_id\" = NEW.\"id\" WHERE \"user_id\" = OLD.\"id\";"
        ));

        assert_eq!(parse_metadata(&statements[0]).as_ref(), Some(&table.references[0]));
        assert_eq!(parse_metadata(&statements[1]), None);
    }

    #[test]
    fn test_delete_actions() {
        let restrict = orders(Action::NoAction, Action::Restrict);
        let sql = &create_triggers(&restrict, &restrict.references[0]).unwrap()[2];
        assert!(sql.contains("SELECT RAISE(ABORT,"));
        assert!(sql.contains("WHERE EXISTS (SELECT 1 FROM \"orders\""));

        let cascade = orders(Action::NoAction, Action::Cascade);
        let sql = &create_triggers(&cascade, &cascade.references[0]).unwrap()[2];
        assert!(sql.contains("DELETE FROM \"orders\" WHERE \"user_id\" = OLD.\"id\";"));

        let default = orders(Action::NoAction, Action::SetDefault);
        let sql = &create_triggers(&default, &default.references[0]).unwrap()[2];
        assert!(sql.contains("SET \"user_id\" = 0 WHERE"));
    }

    #[test]
    fn test_drop_triggers() {
        let table = orders(Action::NoAction, Action::NoAction);
        let drops = drop_triggers(&table.references[0]);
        assert_eq!(drops[0], "DROP TRIGGER IF EXISTS \"fk_user_ins\"");
        assert_eq!(drops[3], "DROP TRIGGER IF EXISTS \"fk_user_pupd\"");
    }
}
