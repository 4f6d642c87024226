use super::*;
use crate::backend::Direction;
use crate::value::raw;

fn pg() -> BuildOptions {
    BuildOptions::new(Backend::Postgres)
}

fn mysql() -> BuildOptions {
    BuildOptions::new(Backend::MySql)
}

fn sqlite() -> BuildOptions {
    BuildOptions::new(Backend::Sqlite)
}

/// Replaces every `?` and literal token with `_` so placeholder and inline
/// renderings can be compared structurally.
fn shape(sql: &str, literals: &[&str]) -> String {
    let mut out = sql.replace('?', "_");
    for literal in literals {
        out = out.replace(literal, "_");
    }
    out
}

#[test]
fn test_delete_with_raw_condition() {
    let (sql, params) = Query::new(pg())
        .table("users")
        .where_clause(cond("id = ?", 5))
        .delete()
        .build()
        .unwrap();

    assert_eq!(sql, "DELETE FROM \"users\" WHERE id = ?");
    assert_eq!(params, vec![Value::Int(5)]);
}

#[test]
fn test_select_with_alias_and_order() {
    let sql = Query::new(mysql())
        .columns(&["id"])
        .from("users u")
        .order_by(("last_login", "desc"))
        .sql()
        .unwrap();

    assert_eq!(
        sql,
        "SELECT `id` FROM `users` AS `u` ORDER BY `last_login` DESC"
    );
}

#[test]
fn test_select_defaults_to_star_from_table() {
    let sql = Query::new(sqlite()).table("users").sql().unwrap();
    assert_eq!(sql, "SELECT * FROM \"users\"");
}

#[test]
fn test_select_full_clause_order() {
    let (sql, params) = Query::new(sqlite())
        .distinct()
        .columns(&["u.id", "u.name AS uname"])
        .column_expr("COUNT(p.id)", Some("posts"))
        .from("users AS u")
        .left_join("posts p", cond("p.user_id = u.id AND p.state = ?", "published"))
        .where_clause(col("u.active").eq(true))
        .where_clause(col("u.age").gt_eq(18))
        .group_by(&["u.id", "u.name"])
        .having(cond("COUNT(p.id) > ?", 2))
        .order_by(("u.name", Direction::Asc))
        .limit(10)
        .offset(20)
        .build()
        .unwrap();

    assert_eq!(
        sql,
        "SELECT DISTINCT \"u\".\"id\", \"u\".\"name\" AS \"uname\", COUNT(p.id) AS \"posts\" \
         FROM \"users\" AS \"u\" \
         LEFT JOIN \"posts\" AS \"p\" ON p.user_id = u.id AND p.state = ? \
         WHERE \"u\".\"active\" = TRUE AND \"u\".\"age\" >= ? \
         GROUP BY \"u\".\"id\", \"u\".\"name\" \
         HAVING COUNT(p.id) > ? \
         ORDER BY \"u\".\"name\" ASC LIMIT 10 OFFSET 20"
    );
    // joins, then WHERE, then HAVING
    assert_eq!(
        params,
        vec![
            Value::Text(String::from("published")),
            Value::Int(18),
            Value::Int(2)
        ]
    );
}

#[test]
fn test_nested_groups() {
    let (sql, params) = Query::new(pg())
        .table("items")
        .where_clause(col("deleted").is_null())
        .where_group(|g| g.and(col("owner").eq(1)).or(cond("shared = ?", 1)))
        .or_where_group(|g| g.and_group(|inner| inner.and(col("public").eq(1))))
        .build()
        .unwrap();

    assert_eq!(
        sql,
        "SELECT * FROM \"items\" WHERE \"deleted\" IS NULL \
         AND (\"owner\" = ? OR shared = ?) OR ((\"public\" = ?))"
    );
    assert_eq!(params, vec![Value::Int(1), Value::Int(1), Value::Int(1)]);
}

#[test]
fn test_empty_group_is_dropped() {
    let sql = Query::new(pg())
        .table("items")
        .where_clause(col("id").eq(1))
        .where_group(|g| g)
        .sql()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM \"items\" WHERE \"id\" = ?");
}

#[test]
fn test_subquery_params_flatten_in_order() {
    let sub = Query::new(pg())
        .columns(&["user_id"])
        .from("bans")
        .where_clause(col("reason").eq("spam"));

    let (sql, params) = Query::new(pg())
        .table("users")
        .where_clause(col("age").gt(21))
        .where_clause(col("id").not_in_query(sub))
        .where_clause(col("name").like("a%"))
        .build()
        .unwrap();

    assert_eq!(
        sql,
        "SELECT * FROM \"users\" WHERE \"age\" > ? AND \"id\" NOT IN \
         (SELECT \"user_id\" FROM \"bans\" WHERE \"reason\" = ?) AND \"name\" LIKE ?"
    );
    assert_eq!(
        params,
        vec![
            Value::Int(21),
            Value::Text(String::from("spam")),
            Value::Text(String::from("a%"))
        ]
    );
}

#[test]
fn test_in_list() {
    let (sql, params) = Query::new(mysql())
        .table("t")
        .where_clause(col("id").in_list(vec![1, 2, 3]))
        .build()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM `t` WHERE `id` IN (?, ?, ?)");
    assert_eq!(params.len(), 3);

    let sql = Query::new(mysql())
        .table("t")
        .where_clause(col("id").in_list(Vec::<i64>::new()))
        .sql()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM `t` WHERE 1 = 0");
}

#[test]
fn test_null_bool_and_raw_are_never_placeholders() {
    let (sql, params) = Query::new(pg())
        .table("sessions")
        .set("expires", raw("NOW()"))
        .set("active", false)
        .set("token", Value::Null)
        .set("hits", 3)
        .where_clause(col("user_id").eq(Value::Null))
        .update()
        .build()
        .unwrap();

    assert_eq!(
        sql,
        "UPDATE \"sessions\" SET \"expires\" = NOW(), \"active\" = FALSE, \
         \"token\" = NULL, \"hits\" = ? WHERE \"user_id\" IS NULL"
    );
    assert_eq!(params, vec![Value::Int(3)]);
}

#[test]
fn test_update_params_set_then_where() {
    let (_, params) = Query::new(sqlite())
        .table("users")
        .data([("name", "bob"), ("email", "b@x")])
        .unwrap()
        .where_clause(cond("id = ?", 9))
        .update()
        .build()
        .unwrap();

    assert_eq!(
        params,
        vec![
            Value::Text(String::from("bob")),
            Value::Text(String::from("b@x")),
            Value::Int(9)
        ]
    );
}

#[test]
fn test_multi_row_insert() {
    let (sql, params) = Query::new(sqlite())
        .table("users")
        .columns(&["name", "age"])
        .values(("ann", 30))
        .unwrap()
        .values(("bob", 31))
        .unwrap()
        .insert()
        .build()
        .unwrap();

    assert_eq!(
        sql,
        "INSERT INTO \"users\" (\"name\", \"age\") VALUES (?, ?), (?, ?)"
    );
    assert_eq!(
        params,
        vec![
            Value::Text(String::from("ann")),
            Value::Int(30),
            Value::Text(String::from("bob")),
            Value::Int(31)
        ]
    );
}

#[test]
fn test_insert_from_data() {
    let sql = Query::new(BuildOptions::new(Backend::MySql).inline())
        .table("logs")
        .data([("msg", Value::Text(String::from("it's"))), ("at", raw("NOW()"))])
        .unwrap()
        .insert()
        .sql()
        .unwrap();
    assert_eq!(sql, "INSERT INTO `logs` (`msg`, `at`) VALUES ('it\\'s', NOW())");
}

#[test]
fn test_values_errors_at_construction() {
    let err = Query::new(sqlite())
        .table("users")
        .values(("ann", 30))
        .unwrap_err();
    assert_eq!(err, BuilderError::ValuesBeforeColumns);

    let err = Query::new(sqlite())
        .table("users")
        .columns(&["name", "age"])
        .values(("ann",))
        .unwrap_err();
    assert_eq!(
        err,
        BuilderError::ColumnCount {
            expected: 2,
            found: 1
        }
    );

    let err = Query::new(sqlite())
        .table("users")
        .columns(&["name"])
        .values("ann")
        .unwrap()
        .data([("name", "bob")])
        .unwrap_err();
    assert_eq!(err, BuilderError::MixedValues);
}

#[test]
fn test_update_and_delete_require_where() {
    let update = Query::new(pg()).table("users").set("name", "x").update();
    assert_eq!(update.build().unwrap_err(), BuilderError::MissingWhere("UPDATE"));

    let delete = Query::new(pg()).table("users").delete();
    assert_eq!(delete.build().unwrap_err(), BuilderError::MissingWhere("DELETE"));

    let delete = delete.where_clause(col("id").eq(1));
    assert!(delete.build().is_ok());
}

#[test]
fn test_invalid_identifiers_are_rejected() {
    let err = Query::new(pg()).table("users; DROP TABLE x").sql().unwrap_err();
    assert!(matches!(err, BuilderError::InvalidIdentifier(_)));

    let err = Query::new(pg())
        .table("users")
        .columns(&["id", "na-me"])
        .sql()
        .unwrap_err();
    assert_eq!(err, BuilderError::InvalidIdentifier(String::from("na-me")));

    let err = Query::new(pg())
        .table("users")
        .order_by(("id", "sideways"))
        .sql()
        .unwrap_err();
    assert_eq!(err, BuilderError::InvalidDirection(String::from("sideways")));
}

#[test]
fn test_marker_count_mismatch() {
    let err = Query::new(pg())
        .table("users")
        .where_clause(cond("a = ? AND b = ?", 1))
        .sql()
        .unwrap_err();
    assert!(matches!(
        err,
        BuilderError::ParameterCount {
            markers: 2,
            params: 1,
            ..
        }
    ));

    // quoted question marks are literal text
    let sql = Query::new(pg())
        .table("faq")
        .where_clause(cond("title = 'why?' AND id = ?", 3))
        .sql()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM \"faq\" WHERE title = 'why?' AND id = ?");
}

#[test]
fn test_inline_and_placeholder_modes_share_shape() {
    let build = |options: BuildOptions| {
        Query::new(options)
            .table("users")
            .where_clause(cond("name = ?", "o'hara"))
            .where_clause(col("age").in_list(vec![30, 40]))
            .order_by_lexical("name")
            .limit(5)
            .sql()
            .unwrap()
    };

    let placeholders = build(sqlite());
    let inline = build(sqlite().inline());

    assert_eq!(
        inline,
        "SELECT * FROM \"users\" WHERE name = 'o''hara' AND \"age\" IN (30, 40) \
         ORDER BY \"name\" COLLATE NOCASE ASC LIMIT 5"
    );
    assert_eq!(
        shape(&placeholders, &[]),
        shape(&inline, &["'o''hara'", "30", "40"])
    );
    assert!(Query::new(sqlite().inline())
        .table("users")
        .where_clause(col("id").eq(1))
        .params()
        .unwrap()
        .is_empty());
}

#[test]
fn test_recompilation_is_idempotent() {
    let query = Query::new(pg())
        .columns(&["id"])
        .from("users")
        .where_clause(col("id").gt(1));
    assert_eq!(query.build().unwrap(), query.build().unwrap());

    let query = query.limit(3);
    assert_eq!(
        query.sql().unwrap(),
        "SELECT \"id\" FROM \"users\" WHERE \"id\" > ? LIMIT 3"
    );
}

#[test]
fn test_postgres_null_ordering() {
    let sql = Query::new(pg())
        .table("users")
        .order_by("name")
        .order_by(("seen", "DESC"))
        .sql()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM \"users\" ORDER BY \"name\" ASC NULLS FIRST, \"seen\" DESC NULLS LAST"
    );
}
