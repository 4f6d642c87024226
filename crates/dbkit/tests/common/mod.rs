#![allow(dead_code)]

use dbkit::schema::{bigint, varchar, Action};
use dbkit::{Connection, ConnectionConfig, Schema};

pub fn memory() -> Connection {
    Connection::open(&ConnectionConfig::sqlite_memory())
        .unwrap_or_else(|e| panic!("Failed to open in-memory database: {e}"))
}

pub fn count(conn: &mut Connection, table: &str) -> i64 {
    let sql = format!("SELECT COUNT(*) AS n FROM \"{table}\"");
    conn.query(sql.as_str(), ())
        .and_then(|rs| rs.first())
        .unwrap_or_else(|e| panic!("Failed to count {table}: {e}"))
        .map(|record| record.get::<i64>("n").unwrap())
        .unwrap_or_default()
}

/// Users and their tokens, tokens cascading on user changes.
pub fn accounts(email_len: u32, unique_name: &str) -> Schema {
    let mut schema = Schema::declare("app_");
    schema
        .table("users")
        .unwrap()
        .field(bigint("id"))
        .unwrap()
        .field(varchar("email", email_len).not_null())
        .unwrap()
        .primary("pk_users", &["id"])
        .unwrap()
        .unique(unique_name, &["email"])
        .unwrap();
    schema
        .table("tokens")
        .unwrap()
        .field(bigint("id"))
        .unwrap()
        .field(bigint("user_id"))
        .unwrap()
        .field(varchar("token", 64).not_null())
        .unwrap()
        .primary("pk_tokens", &["id"])
        .unwrap()
        .index("ix_tokens_user", "btree", &["user_id"])
        .unwrap()
        .reference(
            "fk_tokens_user",
            &["user_id"],
            "users",
            &["id"],
            Action::Cascade,
            Action::Cascade,
        )
        .unwrap();
    schema
}
