//! Error types shared by the builder, the schema DSL and the planner.

/// Errors raised while constructing or compiling a [`Query`](crate::builder::Query).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuilderError {
    /// An identifier does not match `^[A-Za-z][A-Za-z0-9_]*$`.
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    /// UPDATE or DELETE compiled without a WHERE clause.
    #[error("{0} requires a WHERE clause")]
    MissingWhere(&'static str),

    /// INSERT/UPDATE/DELETE compiled without a target table.
    #[error("{0} requires a table")]
    MissingTable(&'static str),

    /// A VALUES row does not have as many values as there are columns.
    #[error("expected {expected} values, got {found}")]
    ColumnCount {
        /// Number of declared columns.
        expected: usize,
        /// Number of values supplied.
        found: usize,
    },

    /// `values()` was called before `columns()`.
    #[error("values() requires a column list")]
    ValuesBeforeColumns,

    /// `values()` and `data()` were both used on the same statement.
    #[error("cannot mix values() rows with data()")]
    MixedValues,

    /// INSERT or UPDATE compiled without anything to write.
    #[error("{0} has no values")]
    NoValues(&'static str),

    /// A raw fragment's `?` markers do not match its parameters.
    #[error("fragment '{sql}' has {markers} placeholders but {params} parameters")]
    ParameterCount {
        /// The offending fragment.
        sql: String,
        /// Number of `?` markers found outside quotes.
        markers: usize,
        /// Number of parameters supplied.
        params: usize,
    },

    /// An ORDER BY direction other than ASC or DESC.
    #[error("invalid sort direction '{0}'")]
    InvalidDirection(String),
}

/// Errors raised while declaring a logical schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// A table, field, key, index or reference name is not a valid identifier.
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    /// The same field name was declared twice on one table.
    #[error("field '{field}' is already declared on table '{table}'")]
    DuplicateField {
        /// Table name.
        table: String,
        /// Field name.
        field: String,
    },

    /// A second primary key was declared on a table.
    #[error("table '{0}' already has a primary key")]
    DuplicatePrimaryKey(String),

    /// A key, index or reference name was reused on one table.
    #[error("'{name}' is already declared on table '{table}'")]
    DuplicateName {
        /// Table name.
        table: String,
        /// Constraint name.
        name: String,
    },

    /// A key, index or reference lists a field the table does not declare.
    #[error("'{name}' references undeclared field '{field}' on table '{table}'")]
    UndeclaredField {
        /// Table name.
        table: String,
        /// Key, index or reference name.
        name: String,
        /// The missing field.
        field: String,
    },

    /// A key, index or reference was declared with no columns.
    #[error("'{0}' has no columns")]
    EmptyColumns(String),

    /// A reference lists a different number of child and parent columns.
    #[error("reference '{0}' has mismatched column lists")]
    ReferenceArity(String),

    /// The operation cannot be expressed as a statement on this backend
    /// and needs a table rebuild instead.
    #[error("table '{0}' must be rebuilt for this change")]
    RequiresRebuild(String),

    /// A schema document could not be parsed.
    #[error("invalid schema document: {0}")]
    Document(String),
}

/// A driver name that does not select any supported backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown driver '{0}' (expected mysql, mariadb, pgsql or sqlite)")]
pub struct UnknownDriver(pub String);

/// A [`Value`](crate::Value) could not be converted to the requested Rust type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// The value has an incompatible variant.
    #[error("cannot convert {found} to {expected}")]
    Conversion {
        /// Requested Rust type.
        expected: &'static str,
        /// Variant that was found.
        found: &'static str,
    },

    /// The value is NULL and the target type is not optional.
    #[error("unexpected NULL for {0}")]
    Null(&'static str),
}
