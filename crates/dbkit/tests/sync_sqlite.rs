//! Schema synchronization against SQLite: creation, idempotence, trigger
//! based foreign keys and table rebuilds.

mod common;

use common::{accounts, count, memory};
use dbkit::schema::{bigint, integer, text, varchar, KeyKind};
use dbkit::{reverse, strategy, Connection, DbError, Introspect, SchemaSync};

fn synced() -> Connection {
    let mut conn = memory();
    accounts(120, "uq_users_email").synchronize(&mut conn).unwrap();
    conn
}

fn seed(conn: &mut Connection) {
    conn.execute(
        "INSERT INTO app_users (id, email) VALUES (1, 'ann@example.com'), (2, 'bob@example.com');
         INSERT INTO app_tokens (id, user_id, token) VALUES (10, 1, 'a1'), (11, 1, 'a2'), (20, 2, 'b1');",
    )
    .unwrap();
}

#[test]
fn dry_run_lists_every_operation() {
    let mut conn = memory();
    let plan = accounts(120, "uq_users_email")
        .plan_against(&mut conn)
        .unwrap();

    let lines = plan.describe();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "create table app_users (2 fields)");
    assert_eq!(lines[1], "create table app_tokens (3 fields)");
    // nothing was applied
    assert!(strategy(conn.backend()).list_tables(&mut conn).unwrap().is_empty());
}

#[test]
fn synchronize_creates_then_does_nothing() {
    let mut conn = memory();
    let schema = accounts(120, "uq_users_email");

    // two tables, one unique key, one index, one reference
    assert_eq!(schema.synchronize(&mut conn).unwrap(), 5);
    assert_eq!(schema.synchronize(&mut conn).unwrap(), 0);

    let tables = strategy(conn.backend()).list_tables(&mut conn).unwrap();
    assert_eq!(tables, ["app_tokens", "app_users"]);
}

#[test]
fn introspection_reads_back_the_declaration() {
    let mut conn = synced();
    let live = reverse(&mut conn).unwrap();

    let users = live.get("app_users").unwrap();
    assert_eq!(users.primary.as_ref().unwrap().name, "app_pk_users");
    assert_eq!(users.uniques.len(), 1);
    assert_eq!(users.uniques[0].kind, KeyKind::Unique);
    assert_eq!(users.uniques[0].columns, ["email"]);
    let email = users.get_field("email").unwrap();
    assert_eq!(email.len, Some(120));
    assert!(!email.nullable);

    let tokens = live.get("app_tokens").unwrap();
    assert_eq!(tokens.indexes.len(), 1);
    assert_eq!(tokens.indexes[0].name, "app_ix_tokens_user");
    assert_eq!(tokens.references.len(), 1);
    assert_eq!(tokens.references[0].parent_table, "app_users");

    let json = live.to_json().unwrap();
    assert!(json.contains("app_fk_tokens_user"));
}

#[test]
fn triggers_enforce_the_reference() {
    let mut conn = synced();
    seed(&mut conn);

    let err = conn
        .execute("INSERT INTO app_tokens (id, user_id, token) VALUES (30, 99, 'x')")
        .unwrap_err();
    assert!(err.to_string().contains("foreign key"));
    // a NULL child column is not checked
    conn.execute("INSERT INTO app_tokens (id, user_id, token) VALUES (31, NULL, 'x')")
        .unwrap();

    // ON UPDATE CASCADE
    conn.execute("UPDATE app_users SET id = 5 WHERE id = 2").unwrap();
    let moved = conn
        .query("SELECT user_id FROM app_tokens WHERE id = ?", 20)
        .unwrap()
        .first()
        .unwrap()
        .unwrap();
    assert_eq!(moved.get::<i64>("user_id").unwrap(), 5);

    // ON DELETE CASCADE
    conn.execute("DELETE FROM app_users WHERE id = 1").unwrap();
    assert_eq!(count(&mut conn, "app_tokens"), 2);
}

#[test]
fn renamed_unique_key_is_one_alter() {
    let mut conn = synced();
    let renamed = accounts(120, "uq_users_mail");

    assert_eq!(renamed.synchronize(&mut conn).unwrap(), 1);
    assert_eq!(renamed.synchronize(&mut conn).unwrap(), 0);

    let users = reverse(&mut conn).unwrap();
    let keys: Vec<&str> = users
        .get("app_users")
        .unwrap()
        .uniques
        .iter()
        .map(|k| k.name.as_str())
        .collect();
    assert_eq!(keys, ["app_uq_users_mail"]);
}

#[test]
fn altered_field_rebuilds_the_table_and_keeps_rows() {
    let mut conn = synced();
    seed(&mut conn);

    let mut wider = accounts(200, "uq_users_email");
    wider
        .table("users")
        .unwrap()
        .field(text("note"))
        .unwrap();

    // one added field, one altered field
    assert_eq!(wider.synchronize(&mut conn).unwrap(), 2);
    assert_eq!(wider.synchronize(&mut conn).unwrap(), 0);

    assert_eq!(count(&mut conn, "app_users"), 2);
    let users = reverse(&mut conn).unwrap();
    let users = users.get("app_users").unwrap();
    assert_eq!(users.get_field("email").unwrap().len, Some(200));
    assert!(users.get_field("note").is_some());
    assert_eq!(users.primary.as_ref().unwrap().name, "app_pk_users");
    assert_eq!(users.uniques.len(), 1);

    // the unique index and the parent-side triggers came back
    let duplicate = conn.execute("INSERT INTO app_users (id, email) VALUES (3, 'ann@example.com')");
    assert!(matches!(duplicate, Err(DbError::Query { .. })));
    conn.execute("DELETE FROM app_users WHERE id = 1").unwrap();
    assert_eq!(count(&mut conn, "app_tokens"), 1);
}

#[test]
fn failed_rebuild_leaves_table_and_connection_intact() {
    let mut conn = synced();
    seed(&mut conn);

    // existing rows cannot fill a NOT NULL column without a default
    let mut strict = accounts(120, "uq_users_email");
    strict
        .table("users")
        .unwrap()
        .field(varchar("code", 8).not_null())
        .unwrap();
    assert!(strict.synchronize(&mut conn).is_err());

    let live = reverse(&mut conn).unwrap();
    let users = live.get("app_users").unwrap();
    assert!(users.get_field("code").is_none());
    assert_eq!(users.uniques.len(), 1);
    assert_eq!(count(&mut conn, "app_users"), 2);
    assert_eq!(
        strategy(conn.backend()).list_tables(&mut conn).unwrap(),
        ["app_tokens", "app_users"]
    );

    let legacy = conn
        .query("PRAGMA legacy_alter_table", ())
        .unwrap()
        .first()
        .unwrap()
        .unwrap();
    assert_eq!(legacy.get::<i64>("legacy_alter_table").unwrap(), 0);

    // no savepoint is left open
    conn.begin().unwrap();
    conn.execute("INSERT INTO app_users (id, email) VALUES (3, 'cid@example.com')")
        .unwrap();
    conn.commit().unwrap();
    assert_eq!(count(&mut conn, "app_users"), 3);
    assert_eq!(accounts(120, "uq_users_email").synchronize(&mut conn).unwrap(), 0);
}

#[test]
fn length_on_an_unsized_type_converges() {
    let mut conn = memory();
    let mut schema = dbkit::Schema::declare("app_");
    schema
        .table("counters")
        .unwrap()
        .field(bigint("id"))
        .unwrap()
        .field(integer("n").len(11))
        .unwrap();

    assert_eq!(schema.synchronize(&mut conn).unwrap(), 1);
    assert_eq!(schema.synchronize(&mut conn).unwrap(), 0);
    assert_eq!(schema.synchronize(&mut conn).unwrap(), 0);
}

#[test]
fn schema_document_synchronizes_like_the_dsl() {
    let mut conn = memory();
    let document = r#"{
        "tables": [
            {
                "name": "events",
                "fields": [
                    {"name": "id", "type": "bigint"},
                    {"name": "title", "type": "varchar", "len": 80, "nullable": false}
                ],
                "primary": {"name": "pk_events", "kind": "primary", "columns": ["id"]}
            }
        ]
    }"#;
    let schema = dbkit::Schema::from_json("app_", document).unwrap();

    assert_eq!(schema.synchronize(&mut conn).unwrap(), 1);
    assert_eq!(schema.synchronize(&mut conn).unwrap(), 0);
    assert_eq!(count(&mut conn, "app_events"), 0);
}
