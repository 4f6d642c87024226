//! Single-row INSERT/UPDATE helper.

use dbkit_core::builder::cond;
use dbkit_core::{BuildOptions, ParamMode, Query, ToValue, Value};

use crate::connection::{Connection, Prepared};
use crate::error::Result;

/// A name/value map bound to one table.
///
/// The cursor only builds statements. [`Cursor::insert`] and
/// [`Cursor::update`] run them through a connection, reusing the last
/// prepared statement while the generated SQL stays the same.
///
/// # Example
///
/// ```rust
/// use dbkit::{raw, Backend, BuildOptions, Cursor};
///
/// let mut cursor = Cursor::new("users");
/// cursor.set("name", "ann").set("created", raw("CURRENT_TIMESTAMP"));
///
/// let sql = cursor.build_insert(BuildOptions::new(Backend::Sqlite))?;
/// assert_eq!(
///     sql,
///     "INSERT INTO \"users\" (\"name\", \"created\") VALUES ('ann', CURRENT_TIMESTAMP)"
/// );
/// # Ok::<(), dbkit::DbError>(())
/// ```
#[derive(Debug)]
pub struct Cursor {
    table: String,
    fields: Vec<(String, Value)>,
    cached: Option<(String, Prepared)>,
}

impl Cursor {
    /// Creates an empty cursor for `table`.
    #[must_use]
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            fields: Vec::new(),
            cached: None,
        }
    }

    /// Table the cursor writes to.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Sets a field, replacing any previous value.
    pub fn set(&mut self, name: &str, value: impl ToValue) -> &mut Self {
        let value = value.to_value();
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name.to_string(), value)),
        }
        self
    }

    /// The value of a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Removes every field. The statement cache is kept.
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    fn insert_query(&self, options: BuildOptions) -> Result<Query> {
        Ok(Query::new(options)
            .insert()
            .table(&self.table)
            .data(self.fields.iter().map(|(n, v)| (n.as_str(), v.clone())))?)
    }

    fn update_query(&self, options: BuildOptions, where_sql: &str) -> Query {
        let query = self
            .fields
            .iter()
            .fold(Query::new(options).update().table(&self.table), |q, (n, v)| {
                q.set(n, v.clone())
            });
        if where_sql.trim().is_empty() {
            query
        } else {
            query.where_clause(cond(where_sql, ()))
        }
    }

    /// INSERT statement with every value inlined.
    ///
    /// # Errors
    ///
    /// Fails on an invalid identifier or an empty cursor.
    pub fn build_insert(&self, options: BuildOptions) -> Result<String> {
        let options = options.with_params(ParamMode::Inline);
        Ok(self.insert_query(options)?.sql()?)
    }

    /// UPDATE statement with every value inlined.
    ///
    /// # Errors
    ///
    /// Fails on an invalid identifier, an empty cursor or an empty
    /// `where_sql`.
    pub fn build_update(&self, options: BuildOptions, where_sql: &str) -> Result<String> {
        let options = options.with_params(ParamMode::Inline);
        Ok(self.update_query(options, where_sql).sql()?)
    }

    /// Inserts the row and returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Fails when the statement does not compile or is rejected.
    pub fn insert(&mut self, conn: &mut Connection) -> Result<u64> {
        let options = BuildOptions::new(conn.backend());
        let (sql, params) = self.insert_query(options)?.build()?;
        self.run(conn, sql, &params)
    }

    /// Updates the rows matching `where_sql` and returns how many changed.
    ///
    /// # Errors
    ///
    /// Fails when the statement does not compile or is rejected.
    pub fn update(&mut self, conn: &mut Connection, where_sql: &str) -> Result<u64> {
        let options = BuildOptions::new(conn.backend());
        let (sql, params) = self.update_query(options, where_sql).build()?;
        self.run(conn, sql, &params)
    }

    fn run(&mut self, conn: &mut Connection, sql: String, params: &[Value]) -> Result<u64> {
        let statement = match self.cached.take() {
            Some((cached, statement)) if cached == sql => statement,
            _ => conn.prepare(&sql)?,
        };
        let result = conn.execute_prepared(&sql, &statement, params);
        self.cached = Some((sql, statement));
        result
    }
}

#[cfg(test)]
mod tests {
    use dbkit_core::{raw, Backend};

    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut cursor = Cursor::new("users");
        cursor.set("a", 1).set("b", 2).set("a", 3);
        assert_eq!(cursor.get("a"), Some(&Value::Int(3)));
        assert_eq!(
            cursor.build_insert(BuildOptions::new(Backend::MySql)).unwrap(),
            "INSERT INTO `users` (`a`, `b`) VALUES (3, 2)"
        );
        cursor.clear();
        assert_eq!(cursor.get("a"), None);
    }

    #[test]
    fn test_build_update_escapes_values() {
        let mut cursor = Cursor::new("users");
        cursor.set("name", "o'hara").set("seen", raw("NOW()"));
        assert_eq!(
            cursor
                .build_update(BuildOptions::new(Backend::Postgres), "id = 7")
                .unwrap(),
            "UPDATE \"users\" SET \"name\" = 'o''hara', \"seen\" = NOW() WHERE id = 7"
        );
    }

    #[test]
    fn test_update_requires_where() {
        let mut cursor = Cursor::new("users");
        cursor.set("name", "x");
        assert!(cursor
            .build_update(BuildOptions::new(Backend::Sqlite), "")
            .is_err());
    }
}
