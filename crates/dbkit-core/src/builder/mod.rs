//! Fluent SQL statement builder.
//!
//! A [`Query`] is an explicit AST: every call records a clause and nothing
//! is rendered until [`Query::build`]. Compilation is deterministic, so a
//! query can be mutated and rebuilt any number of times.
//!
//! # Example
//!
//! ```rust
//! use dbkit_core::{Backend, BuildOptions};
//! use dbkit_core::builder::{Query, cond};
//!
//! let (sql, params) = Query::new(BuildOptions::new(Backend::Postgres))
//!     .table("users")
//!     .where_clause(cond("id = ?", 5))
//!     .delete()
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(sql, "DELETE FROM \"users\" WHERE id = ?");
//! assert_eq!(params.len(), 1);
//! ```

mod compile;
mod cond;

use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::error::BuilderError;
use crate::value::{IntoParams, ToValue, Value};

pub use cond::{Column, Conditions, Conjunction, Node, Predicate, col, cond};

/// How literal values reach the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamMode {
    /// Values become `?` placeholders returned by [`Query::params`].
    #[default]
    Placeholders,
    /// Values are escaped and inlined; no parameters are returned.
    Inline,
}

/// Compilation settings, fixed when a query is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Backend whose quoting and escaping rules apply.
    pub backend: Backend,
    /// Parameter handling mode.
    pub params: ParamMode,
}

impl BuildOptions {
    /// Placeholder-mode options for `backend`.
    #[must_use]
    pub const fn new(backend: Backend) -> Self {
        Self {
            backend,
            params: ParamMode::Placeholders,
        }
    }

    /// Switches to inline mode.
    #[must_use]
    pub const fn inline(mut self) -> Self {
        self.params = ParamMode::Inline;
        self
    }

    /// Sets the parameter mode.
    #[must_use]
    pub const fn with_params(mut self, params: ParamMode) -> Self {
        self.params = params;
        self
    }
}

/// Statement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// SELECT.
    #[default]
    Select,
    /// INSERT.
    Insert,
    /// UPDATE.
    Update,
    /// DELETE.
    Delete,
}

impl Mode {
    const fn keyword(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `JOIN`.
    Inner,
    /// `LEFT JOIN`.
    Left,
    /// `RIGHT JOIN`.
    Right,
    /// `CROSS JOIN` (its condition is ignored).
    Cross,
}

impl JoinKind {
    const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Cross => "CROSS JOIN",
        }
    }
}

#[derive(Debug, Clone)]
struct Join {
    kind: JoinKind,
    source: String,
    on: Conditions,
}

#[derive(Debug, Clone)]
enum Selectable {
    Column(String),
    Expr { sql: String, alias: Option<String> },
}

#[derive(Debug, Clone)]
struct OrderItem {
    column: String,
    direction: String,
    lexical: bool,
}

/// Anything that can be turned into an ORDER BY item: `"name"`,
/// `("last_login", "desc")` or `("last_login", Direction::Desc)`.
pub trait IntoOrder {
    /// Returns the column and the direction keyword.
    fn into_order(self) -> (String, String);
}

impl IntoOrder for &str {
    fn into_order(self) -> (String, String) {
        (String::from(self), String::from("ASC"))
    }
}

impl IntoOrder for (&str, &str) {
    fn into_order(self) -> (String, String) {
        (String::from(self.0), String::from(self.1))
    }
}

impl IntoOrder for (&str, crate::backend::Direction) {
    fn into_order(self) -> (String, String) {
        (String::from(self.0), String::from(self.1.as_sql()))
    }
}

/// A SELECT/INSERT/UPDATE/DELETE statement under construction.
#[derive(Debug, Clone)]
pub struct Query {
    options: BuildOptions,
    mode: Mode,
    distinct: bool,
    table: Option<String>,
    columns: Vec<Selectable>,
    sources: Vec<String>,
    joins: Vec<Join>,
    conditions: Conditions,
    group_by: Vec<String>,
    having: Conditions,
    order_by: Vec<OrderItem>,
    limit: Option<u64>,
    offset: Option<u64>,
    rows: Vec<Vec<Value>>,
    data: Vec<(String, Value)>,
}

impl Query {
    /// Creates an empty SELECT statement.
    #[must_use]
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            mode: Mode::Select,
            distinct: false,
            table: None,
            columns: vec![],
            sources: vec![],
            joins: vec![],
            conditions: Conditions::new(),
            group_by: vec![],
            having: Conditions::new(),
            order_by: vec![],
            limit: None,
            offset: None,
            rows: vec![],
            data: vec![],
        }
    }

    /// Returns the compilation options.
    #[must_use]
    pub const fn options(&self) -> BuildOptions {
        self.options
    }

    /// Returns the statement kind.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Switches to SELECT.
    #[must_use]
    pub fn select(mut self) -> Self {
        self.mode = Mode::Select;
        self
    }

    /// Switches to INSERT.
    #[must_use]
    pub fn insert(mut self) -> Self {
        self.mode = Mode::Insert;
        self
    }

    /// Switches to UPDATE.
    #[must_use]
    pub fn update(mut self) -> Self {
        self.mode = Mode::Update;
        self
    }

    /// Switches to DELETE.
    #[must_use]
    pub fn delete(mut self) -> Self {
        self.mode = Mode::Delete;
        self
    }

    /// Sets the target table (also the SELECT source when no `from` is given).
    #[must_use]
    pub fn table(mut self, name: &str) -> Self {
        self.table = Some(String::from(name));
        self
    }

    /// Adds columns: `"id"`, `"u.id"`, `"u.*"`, `"id AS uid"`.
    ///
    /// For INSERT these are the column list matched by [`Query::values`].
    #[must_use]
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns
            .extend(cols.iter().map(|c| Selectable::Column(String::from(*c))));
        self
    }

    /// Adds a raw expression column (`COUNT(*)`), optionally aliased.
    #[must_use]
    pub fn column_expr(mut self, sql: &str, alias: Option<&str>) -> Self {
        self.columns.push(Selectable::Expr {
            sql: String::from(sql),
            alias: alias.map(String::from),
        });
        self
    }

    /// Adds SELECT DISTINCT.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Adds a source: `"users"`, `"users u"` or `"users AS u"`.
    #[must_use]
    pub fn from(mut self, source: &str) -> Self {
        self.sources.push(String::from(source));
        self
    }

    /// Adds a join with an ON condition.
    #[must_use]
    pub fn join_on(mut self, kind: JoinKind, source: &str, on: impl Into<Conditions>) -> Self {
        self.joins.push(Join {
            kind,
            source: String::from(source),
            on: on.into(),
        });
        self
    }

    /// Adds an inner join.
    #[must_use]
    pub fn join(self, source: &str, on: impl Into<Conditions>) -> Self {
        self.join_on(JoinKind::Inner, source, on)
    }

    /// Adds a left join.
    #[must_use]
    pub fn left_join(self, source: &str, on: impl Into<Conditions>) -> Self {
        self.join_on(JoinKind::Left, source, on)
    }

    /// Adds a predicate to the WHERE tree, joined with AND.
    #[must_use]
    pub fn where_clause(mut self, predicate: Predicate) -> Self {
        self.conditions = self.conditions.and(predicate);
        self
    }

    /// Adds a predicate to the WHERE tree, joined with OR.
    #[must_use]
    pub fn or_where(mut self, predicate: Predicate) -> Self {
        self.conditions = self.conditions.or(predicate);
        self
    }

    /// Adds a parenthesized WHERE group joined with AND.
    #[must_use]
    pub fn where_group(mut self, build: impl FnOnce(Conditions) -> Conditions) -> Self {
        self.conditions = self.conditions.and_group(build);
        self
    }

    /// Adds a parenthesized WHERE group joined with OR.
    #[must_use]
    pub fn or_where_group(mut self, build: impl FnOnce(Conditions) -> Conditions) -> Self {
        self.conditions = self.conditions.or_group(build);
        self
    }

    /// Adds GROUP BY columns.
    #[must_use]
    pub fn group_by(mut self, cols: &[&str]) -> Self {
        self.group_by.extend(cols.iter().map(|c| String::from(*c)));
        self
    }

    /// Adds a HAVING predicate, joined with AND.
    #[must_use]
    pub fn having(mut self, predicate: Predicate) -> Self {
        self.having = self.having.and(predicate);
        self
    }

    /// Adds a HAVING predicate, joined with OR.
    #[must_use]
    pub fn or_having(mut self, predicate: Predicate) -> Self {
        self.having = self.having.or(predicate);
        self
    }

    /// Adds an ORDER BY item.
    #[must_use]
    pub fn order_by(mut self, item: impl IntoOrder) -> Self {
        let (column, direction) = item.into_order();
        self.order_by.push(OrderItem {
            column,
            direction,
            lexical: false,
        });
        self
    }

    /// Adds a case-insensitive ORDER BY item.
    #[must_use]
    pub fn order_by_lexical(mut self, item: impl IntoOrder) -> Self {
        let (column, direction) = item.into_order();
        self.order_by.push(OrderItem {
            column,
            direction,
            lexical: true,
        });
        self
    }

    /// Sets LIMIT.
    #[must_use]
    pub const fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Sets OFFSET.
    #[must_use]
    pub const fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Appends one VALUES row for a multi-row INSERT.
    ///
    /// # Errors
    ///
    /// Fails when no column list was set, when the row length differs from
    /// the column count, or when [`Query::data`] was already used.
    pub fn values(mut self, row: impl IntoParams) -> Result<Self, BuilderError> {
        if !self.data.is_empty() {
            return Err(BuilderError::MixedValues);
        }
        if self.columns.is_empty() {
            return Err(BuilderError::ValuesBeforeColumns);
        }
        let row = row.into_params();
        if row.len() != self.columns.len() {
            return Err(BuilderError::ColumnCount {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(self)
    }

    /// Sets column/value pairs: the single VALUES row of an INSERT or the
    /// SET list of an UPDATE.
    ///
    /// # Errors
    ///
    /// Fails when [`Query::values`] rows were already added.
    pub fn data<I, K, V>(mut self, pairs: I) -> Result<Self, BuilderError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToValue,
    {
        if !self.rows.is_empty() {
            return Err(BuilderError::MixedValues);
        }
        self.data
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.to_value())));
        Ok(self)
    }

    /// Sets a single column/value pair.
    #[must_use]
    pub fn set(mut self, column: &str, value: impl ToValue) -> Self {
        self.data.push((String::from(column), value.to_value()));
        self
    }

    /// Compiles to SQL text and the ordered parameter list.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError`] for invalid identifiers, UPDATE/DELETE
    /// without WHERE, missing tables or values, and raw fragments whose
    /// markers do not match their parameters.
    pub fn build(&self) -> Result<(String, Vec<Value>), BuilderError> {
        compile::Compiler::new(self.options).statement(self)
    }

    /// Compiles and returns only the SQL text.
    ///
    /// # Errors
    ///
    /// See [`Query::build`].
    pub fn sql(&self) -> Result<String, BuilderError> {
        self.build().map(|(sql, _)| sql)
    }

    /// Compiles and returns only the parameters.
    ///
    /// # Errors
    ///
    /// See [`Query::build`].
    pub fn params(&self) -> Result<Vec<Value>, BuilderError> {
        self.build().map(|(_, params)| params)
    }
}

#[cfg(test)]
mod tests;
