//! Integration tests for planning: declared schemas, loaded either through
//! the DSL or a JSON document, against live snapshots.

use dbkit_core::schema::{varchar, Ddl, Schema};
use dbkit_core::{plan, Backend, SyncOp};

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

#[test]
fn tokens_against_empty_database_is_two_operations() {
    let declared = tokens();
    let ops: Vec<SyncOp> = plan(&declared, &Schema::new(), Backend::Postgres)
        .into_iter()
        .collect();

    assert_eq!(ops.len(), 2);
    assert!(matches!(&ops[0], SyncOp::CreateTable(t) if t.name == "tokens"));
    assert!(matches!(&ops[1], SyncOp::CreateKey { key, .. } if key.name == "uq_tokens_token"));
}

#[test]
fn live_copy_of_the_declaration_plans_nothing() {
    let declared = tokens();
    for backend in [
        Backend::MySql,
        Backend::MariaDb,
        Backend::Postgres,
        Backend::Sqlite,
    ] {
        assert!(plan(&declared, &declared, backend).is_empty());
    }
}

#[test]
fn document_and_dsl_declarations_agree() {
    let document = r#"{
        "tables": [
            {
                "name": "tokens",
                "fields": [{"name": "token", "type": "varchar", "len": 64}],
                "uniques": [{"name": "uq_tokens_token", "columns": ["token"]}]
            }
        ]
    }"#;
    let loaded = Schema::from_json("", document).unwrap();
    assert_eq!(loaded, tokens());

    let reloaded = Schema::from_json("", &loaded.to_json().unwrap()).unwrap();
    assert_eq!(reloaded, loaded);
}

#[test]
fn planned_operations_render_per_backend() {
    let declared = tokens();
    let table = &declared.tables[0];

    let sqlite = Ddl::new(Backend::Sqlite);
    assert_eq!(
        sqlite.create_table(table).unwrap(),
        ["CREATE TABLE \"tokens\" (\"token\" VARCHAR(64))"]
    );
    assert_eq!(
        sqlite.create_unique(&table.name, &table.uniques[0]).unwrap(),
        ["CREATE UNIQUE INDEX \"uq_tokens_token\" ON \"tokens\" (\"token\")"]
    );

    let mysql = Ddl::new(Backend::MySql);
    assert_eq!(
        mysql.create_unique(&table.name, &table.uniques[0]).unwrap(),
        ["ALTER TABLE `tokens` ADD CONSTRAINT `uq_tokens_token` UNIQUE (`token`)"]
    );
}
