//! Blocking connections over sqlx.
//!
//! A [`Connection`] owns one native sqlx connection and a current-thread
//! tokio runtime that drives it, so callers get a plain synchronous API.

use std::str::FromStr;

use dbkit_core::ident::{number_markers, split_markers};
use dbkit_core::{Backend, BuildOptions, BuilderError, IntoParams, Query, Value};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlStatement};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgStatement};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteStatement};
use sqlx::{ConnectOptions, Executor, Statement};
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::config::{ConnectionConfig, Endpoint};
use crate::cursor::Cursor;
use crate::error::{DbError, Result};
use crate::recordset::{Recordset, Rows};

/// Binds dbkit values onto a sqlx query, in order.
macro_rules! bind_values {
    ($query:expr, $params:expr) => {{
        let mut query = $query;
        for value in $params {
            query = match value {
                Value::Null => query.bind(None::<String>),
                Value::Bool(b) => query.bind(*b),
                Value::Int(n) => query.bind(*n),
                Value::Float(x) => query.bind(*x),
                Value::Text(s) => query.bind(s.clone()),
                Value::Blob(b) => query.bind(b.clone()),
                Value::Raw(r) => query.bind(r.as_str().to_string()),
            };
        }
        query
    }};
}

/// Something that compiles to SQL text plus parameters.
pub trait IntoSql {
    /// Returns the SQL and its parameters.
    ///
    /// # Errors
    ///
    /// Fails when a query builder cannot compile.
    fn into_sql(self) -> std::result::Result<(String, Vec<Value>), BuilderError>;
}

impl IntoSql for &str {
    fn into_sql(self) -> std::result::Result<(String, Vec<Value>), BuilderError> {
        Ok((self.to_string(), Vec::new()))
    }
}

impl IntoSql for String {
    fn into_sql(self) -> std::result::Result<(String, Vec<Value>), BuilderError> {
        Ok((self, Vec::new()))
    }
}

impl IntoSql for &String {
    fn into_sql(self) -> std::result::Result<(String, Vec<Value>), BuilderError> {
        Ok((self.clone(), Vec::new()))
    }
}

impl IntoSql for Query {
    fn into_sql(self) -> std::result::Result<(String, Vec<Value>), BuilderError> {
        self.build()
    }
}

impl IntoSql for &Query {
    fn into_sql(self) -> std::result::Result<(String, Vec<Value>), BuilderError> {
        self.build()
    }
}

/// Replaces the markers of NULL, boolean and raw parameters with their
/// SQL spelling, keeping the rest as markers.
fn inline_fixed(
    backend: Backend,
    sql: &str,
    params: Vec<Value>,
) -> std::result::Result<(String, Vec<Value>), BuilderError> {
    let segments = split_markers(backend, sql);
    let markers = segments.len() - 1;
    if markers != params.len() {
        return Err(BuilderError::ParameterCount {
            sql: sql.to_string(),
            markers,
            params: params.len(),
        });
    }
    if !params.iter().any(Value::is_inlined) {
        return Ok((sql.to_string(), params));
    }
    let mut out = String::with_capacity(sql.len());
    let mut bound = Vec::with_capacity(params.len());
    for (segment, value) in segments.iter().zip(params.into_iter().map(Some).chain([None])) {
        out.push_str(segment);
        match value {
            Some(value) if value.is_inlined() => out.push_str(&value.to_sql_inline(backend)),
            Some(value) => {
                out.push('?');
                bound.push(value);
            }
            None => {}
        }
    }
    Ok((out, bound))
}

/// A statement prepared on the server.
#[derive(Debug)]
pub(crate) enum Prepared {
    MySql(MySqlStatement<'static>),
    Postgres(PgStatement<'static>),
    Sqlite(SqliteStatement<'static>),
}

/// The native connection.
#[derive(Debug)]
enum Link {
    MySql(MySqlConnection),
    Postgres(PgConnection),
    Sqlite(SqliteConnection),
}

/// Affected rows and generated id of one statement.
type Outcome = (u64, Option<i64>);

impl Link {
    async fn fetch(
        &mut self,
        sql: &str,
        params: &[Value],
        persistent: bool,
    ) -> std::result::Result<Rows, sqlx::Error> {
        match self {
            Self::MySql(conn) => bind_values!(sqlx::query(sql).persistent(persistent), params)
                .fetch_all(&mut *conn)
                .await
                .map(Rows::MySql),
            Self::Postgres(conn) => {
                let sql = number_markers(sql);
                bind_values!(sqlx::query(&sql).persistent(persistent), params)
                    .fetch_all(&mut *conn)
                    .await
                    .map(Rows::Postgres)
            }
            Self::Sqlite(conn) => bind_values!(sqlx::query(sql).persistent(persistent), params)
                .fetch_all(&mut *conn)
                .await
                .map(Rows::Sqlite),
        }
    }

    async fn execute(
        &mut self,
        sql: &str,
        params: &[Value],
        persistent: bool,
    ) -> std::result::Result<Outcome, sqlx::Error> {
        match self {
            Self::MySql(conn) => {
                let done = bind_values!(sqlx::query(sql).persistent(persistent), params)
                    .execute(&mut *conn)
                    .await?;
                Ok((done.rows_affected(), mysql_id(done.last_insert_id())))
            }
            Self::Postgres(conn) => {
                let sql = number_markers(sql);
                let done = bind_values!(sqlx::query(&sql).persistent(persistent), params)
                    .execute(&mut *conn)
                    .await?;
                Ok((done.rows_affected(), None))
            }
            Self::Sqlite(conn) => {
                let done = bind_values!(sqlx::query(sql).persistent(persistent), params)
                    .execute(&mut *conn)
                    .await?;
                Ok((done.rows_affected(), Some(done.last_insert_rowid())))
            }
        }
    }

    /// Runs SQL without preparing it. May hold several statements.
    async fn execute_raw(&mut self, sql: &str) -> std::result::Result<Outcome, sqlx::Error> {
        match self {
            Self::MySql(conn) => {
                let done = sqlx::raw_sql(sql).execute(&mut *conn).await?;
                Ok((done.rows_affected(), mysql_id(done.last_insert_id())))
            }
            Self::Postgres(conn) => {
                let done = sqlx::raw_sql(sql).execute(&mut *conn).await?;
                Ok((done.rows_affected(), None))
            }
            Self::Sqlite(conn) => {
                let done = sqlx::raw_sql(sql).execute(&mut *conn).await?;
                Ok((done.rows_affected(), Some(done.last_insert_rowid())))
            }
        }
    }

    async fn prepare(&mut self, sql: &str) -> std::result::Result<Prepared, sqlx::Error> {
        Ok(match self {
            Self::MySql(conn) => {
                let statement = conn.prepare(sql).await?;
                Prepared::MySql(Statement::to_owned(&statement))
            }
            Self::Postgres(conn) => {
                let sql = number_markers(sql);
                let statement = conn.prepare(&sql).await?;
                Prepared::Postgres(Statement::to_owned(&statement))
            }
            Self::Sqlite(conn) => {
                let statement = conn.prepare(sql).await?;
                Prepared::Sqlite(Statement::to_owned(&statement))
            }
        })
    }

    async fn execute_prepared(
        &mut self,
        statement: &Prepared,
        params: &[Value],
    ) -> std::result::Result<Outcome, sqlx::Error> {
        match (self, statement) {
            (Self::MySql(conn), Prepared::MySql(statement)) => {
                let done = bind_values!(statement.query(), params)
                    .execute(&mut *conn)
                    .await?;
                Ok((done.rows_affected(), mysql_id(done.last_insert_id())))
            }
            (Self::Postgres(conn), Prepared::Postgres(statement)) => {
                let done = bind_values!(statement.query(), params)
                    .execute(&mut *conn)
                    .await?;
                Ok((done.rows_affected(), None))
            }
            (Self::Sqlite(conn), Prepared::Sqlite(statement)) => {
                let done = bind_values!(statement.query(), params)
                    .execute(&mut *conn)
                    .await?;
                Ok((done.rows_affected(), Some(done.last_insert_rowid())))
            }
            _ => Err(sqlx::Error::Protocol(String::from(
                "statement prepared on another backend",
            ))),
        }
    }

    async fn close(self) -> std::result::Result<(), sqlx::Error> {
        match self {
            Self::MySql(conn) => sqlx::Connection::close(conn).await,
            Self::Postgres(conn) => sqlx::Connection::close(conn).await,
            Self::Sqlite(conn) => sqlx::Connection::close(conn).await,
        }
    }
}

/// MySQL reports 0 when no id was generated.
fn mysql_id(id: u64) -> Option<i64> {
    if id == 0 { None } else { i64::try_from(id).ok() }
}

async fn connect(config: &ConnectionConfig, backend: Backend) -> std::result::Result<Link, sqlx::Error> {
    let cache = if config.persistent { 100 } else { 0 };
    match backend {
        Backend::MySql | Backend::MariaDb => {
            let mut options = MySqlConnectOptions::new()
                .username(&config.user)
                .database(&config.database)
                .statement_cache_capacity(cache);
            if !config.password.is_empty() {
                options = options.password(&config.password);
            }
            options = match config.endpoint() {
                Endpoint::Socket(path) => options.socket(path),
                Endpoint::Tcp(host, Some(port)) => options.host(host).port(port),
                Endpoint::Tcp(host, None) => options.host(host),
            };
            options.connect().await.map(Link::MySql)
        }
        Backend::Postgres => {
            let mut options = PgConnectOptions::new()
                .username(&config.user)
                .database(&config.database)
                .statement_cache_capacity(cache);
            if !config.password.is_empty() {
                options = options.password(&config.password);
            }
            options = match config.endpoint() {
                // a directory host selects the Unix socket
                Endpoint::Socket(path) => options.host(path),
                Endpoint::Tcp(host, Some(port)) => options.host(host).port(port),
                Endpoint::Tcp(host, None) => options.host(host),
            };
            options.connect().await.map(Link::Postgres)
        }
        Backend::Sqlite => {
            let options = if config.database.is_empty() || config.database == ":memory:" {
                SqliteConnectOptions::from_str("sqlite::memory:")?
            } else {
                SqliteConnectOptions::new()
                    .filename(&config.database)
                    .create_if_missing(true)
            };
            options
                .statement_cache_capacity(cache)
                .connect()
                .await
                .map(Link::Sqlite)
        }
    }
}

/// A live, blocking database connection.
///
/// # Example
///
/// ```rust,no_run
/// use dbkit::{Connection, ConnectionConfig};
///
/// let mut conn = Connection::open(&ConnectionConfig::sqlite_memory())?;
/// conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)")?;
/// conn.execute_with("INSERT INTO t (name) VALUES (?)", "ann")?;
///
/// for record in conn.query("SELECT id, name FROM t", ())? {
///     let record = record?;
///     println!("{}: {}", record.get::<i64>("id")?, record.get::<String>("name")?);
/// }
/// # Ok::<(), dbkit::DbError>(())
/// ```
#[derive(Debug)]
pub struct Connection {
    // dropped before the runtime that registered its socket
    link: Option<Link>,
    runtime: Runtime,
    backend: Backend,
    database: String,
    version: String,
    persistent: bool,
    weak_lock: bool,
    options: BuildOptions,
    affected: u64,
    last_id: Option<i64>,
    last_error: Option<String>,
    in_transaction: bool,
    // Some(in_transaction at the time) while a write lock is held
    write_lock: Option<bool>,
}

impl Connection {
    /// Opens a connection.
    ///
    /// MySQL servers that identify as MariaDB switch the backend to
    /// [`Backend::MariaDb`].
    ///
    /// # Errors
    ///
    /// Fails on an unknown driver name or when the server cannot be reached.
    pub fn open(config: &ConnectionConfig) -> Result<Self> {
        let mut backend = config.backend()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let link = runtime
            .block_on(connect(config, backend))
            .map_err(|e| DbError::connection(&config.driver, &e))?;

        let mut conn = Self {
            link: Some(link),
            runtime,
            backend,
            database: config.database.clone(),
            version: String::new(),
            persistent: config.persistent,
            weak_lock: config.weak_lock,
            options: BuildOptions::new(backend).with_params(config.param_mode),
            affected: 0,
            last_id: None,
            last_error: None,
            in_transaction: false,
            write_lock: None,
        };

        let version_sql = match backend {
            Backend::MySql | Backend::MariaDb => "SELECT VERSION()",
            Backend::Postgres => "SHOW server_version",
            Backend::Sqlite => "SELECT sqlite_version()",
        };
        if let Some(record) = conn.query(version_sql, ())?.first()? {
            conn.version = record.at(0).map(ToString::to_string).unwrap_or_default();
        }
        if backend == Backend::MySql && conn.version.contains("MariaDB") {
            backend = Backend::MariaDb;
            conn.backend = backend;
            conn.options.backend = backend;
        }

        info!(
            driver = %backend,
            database = %conn.database,
            version = %conn.version,
            "Connected"
        );
        Ok(conn)
    }

    fn link(&mut self) -> Result<&mut Link> {
        self.link.as_mut().ok_or(DbError::NotConnected)
    }

    fn record_failure(&mut self, sql: &str, err: &sqlx::Error) -> DbError {
        let err = DbError::query(sql, err);
        self.last_error = Some(err.to_string());
        err
    }

    /// Runs a query and returns its rows.
    ///
    /// `sql` is raw text or a [`Query`]; `params` are appended after the
    /// builder's own parameters. NULL, boolean and raw parameters are
    /// written into the SQL instead of being bound.
    ///
    /// # Errors
    ///
    /// Fails when the query does not compile or the server rejects it.
    pub fn query(&mut self, sql: impl IntoSql, params: impl IntoParams) -> Result<Recordset> {
        let (sql, mut bound) = sql.into_sql()?;
        bound.extend(params.into_params());
        let (sql, bound) = inline_fixed(self.backend, &sql, bound)?;
        debug!(sql = %sql, params = bound.len(), "Query");

        let persistent = self.persistent;
        let link = self.link.as_mut().ok_or(DbError::NotConnected)?;
        match self.runtime.block_on(link.fetch(&sql, &bound, persistent)) {
            Ok(rows) => Ok(Recordset::new(rows)),
            Err(e) => Err(self.record_failure(&sql, &e)),
        }
    }

    /// Runs one or more statements without parameters and returns the
    /// number of affected rows.
    ///
    /// # Errors
    ///
    /// Fails when the server rejects a statement.
    pub fn execute(&mut self, sql: &str) -> Result<u64> {
        debug!(sql = %sql, "Execute");
        let link = self.link.as_mut().ok_or(DbError::NotConnected)?;
        match self.runtime.block_on(link.execute_raw(sql)) {
            Ok(outcome) => Ok(self.record(outcome)),
            Err(e) => Err(self.record_failure(sql, &e)),
        }
    }

    /// Runs one statement with parameters and returns the number of
    /// affected rows.
    ///
    /// # Errors
    ///
    /// Fails when the statement does not compile or the server rejects it.
    pub fn execute_with(&mut self, sql: impl IntoSql, params: impl IntoParams) -> Result<u64> {
        let (sql, mut bound) = sql.into_sql()?;
        bound.extend(params.into_params());
        let (sql, bound) = inline_fixed(self.backend, &sql, bound)?;
        debug!(sql = %sql, params = bound.len(), "Execute");

        let persistent = self.persistent;
        let link = self.link.as_mut().ok_or(DbError::NotConnected)?;
        match self.runtime.block_on(link.execute(&sql, &bound, persistent)) {
            Ok(outcome) => Ok(self.record(outcome)),
            Err(e) => Err(self.record_failure(&sql, &e)),
        }
    }

    fn record(&mut self, (affected, id): Outcome) -> u64 {
        self.affected = affected;
        if id.is_some() {
            self.last_id = id;
        }
        affected
    }

    pub(crate) fn prepare(&mut self, sql: &str) -> Result<Prepared> {
        debug!(sql = %sql, "Prepare");
        let link = self.link.as_mut().ok_or(DbError::NotConnected)?;
        match self.runtime.block_on(link.prepare(sql)) {
            Ok(statement) => Ok(statement),
            Err(e) => Err(self.record_failure(sql, &e)),
        }
    }

    pub(crate) fn execute_prepared(
        &mut self,
        sql: &str,
        statement: &Prepared,
        params: &[Value],
    ) -> Result<u64> {
        let link = self.link.as_mut().ok_or(DbError::NotConnected)?;
        match self.runtime.block_on(link.execute_prepared(statement, params)) {
            Ok(outcome) => Ok(self.record(outcome)),
            Err(e) => Err(self.record_failure(sql, &e)),
        }
    }

    /// A query builder set up for this connection's backend and mode.
    #[must_use]
    pub fn builder(&self) -> Query {
        Query::new(self.options)
    }

    /// A cursor for single-row writes to `table`.
    #[must_use]
    pub fn cursor(&self, table: &str) -> Cursor {
        Cursor::new(table)
    }

    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// [`DbError::Transaction`] when one is already open.
    pub fn begin(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(DbError::Transaction(String::from(
                "a transaction is already open",
            )));
        }
        self.execute(self.backend.begin_transaction())?;
        self.in_transaction = true;
        Ok(())
    }

    /// Commits the open transaction.
    ///
    /// # Errors
    ///
    /// [`DbError::Transaction`] when none is open.
    pub fn commit(&mut self) -> Result<()> {
        self.finish("COMMIT")
    }

    /// Rolls back the open transaction.
    ///
    /// # Errors
    ///
    /// [`DbError::Transaction`] when none is open.
    pub fn rollback(&mut self) -> Result<()> {
        self.finish("ROLLBACK")
    }

    fn finish(&mut self, sql: &str) -> Result<()> {
        if !self.in_transaction {
            return Err(DbError::Transaction(String::from("no transaction is open")));
        }
        self.in_transaction = false;
        self.execute(sql)?;
        Ok(())
    }

    /// Takes an exclusive write lock on `table` until [`Connection::end_write`].
    ///
    /// In weak mode a failed lock is logged and the call succeeds without
    /// holding anything.
    ///
    /// # Errors
    ///
    /// [`DbError::Lock`] when the lock cannot be taken and weak mode is off.
    pub fn begin_write(&mut self, table: &str) -> Result<()> {
        let inside = self.in_transaction;
        let opens = self.backend.write_lock_opens_transaction(inside);
        for (i, sql) in self.backend.begin_write(table, inside).iter().enumerate() {
            if let Err(e) = self.execute(sql) {
                let message = match &e {
                    DbError::Query { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                if self.backend == Backend::Postgres && opens && i > 0 {
                    // leave the transaction the lock opened
                    if let Err(e) = self.execute("ROLLBACK") {
                        warn!(table = %table, error = %e, "Cannot roll back failed lock");
                    }
                }
                if self.weak_lock {
                    warn!(table = %table, error = %message, "Cannot lock table, continuing unlocked");
                    return Ok(());
                }
                return Err(DbError::Lock {
                    table: table.to_string(),
                    message,
                });
            }
        }
        self.write_lock = Some(inside);
        Ok(())
    }

    /// Releases the lock taken by [`Connection::begin_write`]. Does nothing
    /// when no lock is held.
    ///
    /// A PostgreSQL lock taken inside [`Connection::begin`] stays with that
    /// transaction until it commits or rolls back.
    ///
    /// # Errors
    ///
    /// Fails when the release statement is rejected.
    pub fn end_write(&mut self, table: &str) -> Result<()> {
        let Some(inside) = self.write_lock.take() else {
            return Ok(());
        };
        for sql in self.backend.end_write(table, inside) {
            self.execute(&sql)?;
        }
        Ok(())
    }

    /// Reclaims storage for `table`.
    ///
    /// # Errors
    ///
    /// Fails when the server rejects the statement.
    pub fn vacuum(&mut self, table: &str) -> Result<()> {
        let sql = self.backend.vacuum(table);
        if self.backend.is_mysql_family() {
            // OPTIMIZE TABLE answers with a status row
            self.query(sql.as_str(), ())?.rows()?;
        } else {
            self.execute(&sql)?;
        }
        info!(table = %table, "Vacuumed");
        Ok(())
    }

    /// Quotes and escapes a string literal.
    #[must_use]
    pub fn escape(&self, s: &str) -> String {
        self.backend.escape_literal(s)
    }

    /// Validates and quotes an identifier.
    ///
    /// # Errors
    ///
    /// Fails when `ident` is not a valid identifier.
    pub fn escape_identifier(&self, ident: &str) -> Result<String> {
        Ok(self.backend.surround(ident)?)
    }

    /// Closes the connection. Later calls fail with [`DbError::NotConnected`].
    ///
    /// # Errors
    ///
    /// Fails when the server does not acknowledge the close.
    pub fn close(&mut self) -> Result<()> {
        if let Some(link) = self.link.take() {
            self.runtime
                .block_on(link.close())
                .map_err(|e| DbError::connection(self.backend.driver_name(), &e))?;
            info!(database = %self.database, "Connection closed");
        }
        Ok(())
    }

    /// Active backend.
    #[must_use]
    pub const fn backend(&self) -> Backend {
        self.backend
    }

    /// Server version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Database name or file.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Build options used by [`Connection::builder`].
    #[must_use]
    pub const fn options(&self) -> BuildOptions {
        self.options
    }

    /// Rows affected by the last statement.
    #[must_use]
    pub const fn affected_rows(&self) -> u64 {
        self.affected
    }

    /// Id generated by the last insert. Always `None` on PostgreSQL, where
    /// `RETURNING` is the way to read generated keys.
    #[must_use]
    pub const fn last_insert_id(&self) -> Option<i64> {
        self.last_id
    }

    /// Text of the last failure.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether the link is open.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Whether a transaction is open.
    #[must_use]
    pub const fn in_transaction(&self) -> bool {
        self.in_transaction
    }
}

/// Opens a connection from loose settings.
///
/// # Errors
///
/// See [`Connection::open`].
pub fn open_connection(
    driver: &str,
    host: &str,
    database: &str,
    user: &str,
    password: &str,
    persistent: bool,
) -> Result<Connection> {
    let config = ConnectionConfig::new(driver, database)
        .host(host)
        .credentials(user, password)
        .persistent(persistent);
    Connection::open(&config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_fixed_values() {
        let (sql, params) = inline_fixed(
            Backend::Sqlite,
            "INSERT INTO t (a, b, c, d) VALUES (?, ?, ?, '?')",
            vec![Value::Int(1), Value::Null, Value::Bool(true)],
        )
        .unwrap();
        assert_eq!(sql, "INSERT INTO t (a, b, c, d) VALUES (?, NULL, TRUE, '?')");
        assert_eq!(params, vec![Value::Int(1)]);
    }

    #[test]
    fn test_inline_fixed_mysql_escaped_literal() {
        let sql = Query::new(BuildOptions::new(Backend::MySql).inline())
            .columns(&["id"])
            .from("t")
            .where_clause(dbkit_core::builder::col("name").eq("it's?"))
            .sql()
            .unwrap();
        assert_eq!(sql, r"SELECT `id` FROM `t` WHERE `name` = 'it\'s?'");

        let (fixed, params) = inline_fixed(Backend::MySql, &sql, vec![]).unwrap();
        assert_eq!(fixed, sql);
        assert!(params.is_empty());

        let (fixed, params) = inline_fixed(
            Backend::MariaDb,
            r"UPDATE t SET a = ? WHERE b = 'x\\' AND c = ?",
            vec![Value::Null, Value::Int(2)],
        )
        .unwrap();
        assert_eq!(fixed, r"UPDATE t SET a = NULL WHERE b = 'x\\' AND c = ?");
        assert_eq!(params, vec![Value::Int(2)]);
    }

    #[test]
    fn test_inline_fixed_count_mismatch() {
        let err = inline_fixed(Backend::MySql, "a = ? AND b = ?", vec![Value::Int(1)]);
        assert!(matches!(
            err,
            Err(BuilderError::ParameterCount {
                markers: 2,
                params: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_mysql_id() {
        assert_eq!(mysql_id(0), None);
        assert_eq!(mysql_id(42), Some(42));
    }
}
