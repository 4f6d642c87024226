//! Supported backends and their SQL syntax hooks.
//!
//! Every backend-specific spelling the builder, the DDL generator and the
//! driver need lives here, so adding a backend means adding one variant and
//! one arm per hook.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BuilderError, UnknownDriver};
use crate::ident::is_identifier;

/// Sort direction of an ORDER BY item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

impl Direction {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for Direction {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(BuilderError::InvalidDirection(s.to_string()))
        }
    }
}

/// The closed set of supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// MySQL.
    MySql,
    /// MariaDB (MySQL wire protocol, different catalog reporting).
    MariaDb,
    /// PostgreSQL.
    Postgres,
    /// SQLite.
    Sqlite,
}

impl FromStr for Backend {
    type Err = UnknownDriver;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" => Ok(Self::MySql),
            "mariadb" => Ok(Self::MariaDb),
            "pgsql" | "postgres" | "postgresql" => Ok(Self::Postgres),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            _ => Err(UnknownDriver(s.to_string())),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.driver_name())
    }
}

impl Backend {
    /// Canonical driver name.
    #[must_use]
    pub const fn driver_name(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::MariaDb => "mariadb",
            Self::Postgres => "pgsql",
            Self::Sqlite => "sqlite",
        }
    }

    /// Returns `true` for MySQL and MariaDB.
    #[must_use]
    pub const fn is_mysql_family(self) -> bool {
        matches!(self, Self::MySql | Self::MariaDb)
    }

    /// Character used to quote identifiers.
    #[must_use]
    pub const fn quote_char(self) -> char {
        if self.is_mysql_family() { '`' } else { '"' }
    }

    /// Validates and quotes an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::InvalidIdentifier`] unless `ident` matches
    /// `^[A-Za-z][A-Za-z0-9_]*$`.
    pub fn surround(self, ident: &str) -> Result<String, BuilderError> {
        if is_identifier(ident) {
            Ok(self.quote(ident))
        } else {
            Err(BuilderError::InvalidIdentifier(ident.to_string()))
        }
    }

    /// Quotes an identifier without validating it.
    ///
    /// Used for names read back from the catalog; embedded quote characters
    /// are doubled.
    #[must_use]
    pub fn quote(self, ident: &str) -> String {
        let q = self.quote_char();
        let doubled = format!("{q}{q}");
        format!("{q}{}{q}", ident.replace(q, &doubled))
    }

    /// Renders a string literal, quoted and escaped.
    #[must_use]
    pub fn escape_literal(self, s: &str) -> String {
        if self.is_mysql_family() {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('\'');
            for c in s.chars() {
                match c {
                    '\\' => out.push_str("\\\\"),
                    '\'' => out.push_str("\\'"),
                    '\0' => out.push_str("\\0"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\x1a' => out.push_str("\\Z"),
                    _ => out.push(c),
                }
            }
            out.push('\'');
            out
        } else {
            format!("'{}'", s.replace('\'', "''"))
        }
    }

    /// Renders a binary literal.
    #[must_use]
    pub fn blob_literal(self, bytes: &[u8]) -> String {
        let hex: String = bytes.iter().map(|byte| format!("{byte:02X}")).collect();
        match self {
            Self::Postgres => format!("'\\x{hex}'::bytea"),
            _ => format!("X'{hex}'"),
        }
    }

    /// Formats a date/time expression.
    ///
    /// `pattern` uses `%Y %m %d %H %M %S`; anything else is copied through.
    #[must_use]
    pub fn date_format(self, field: &str, pattern: &str) -> String {
        match self {
            Self::MySql | Self::MariaDb => {
                let native = pattern.replace("%M", "%i").replace("%S", "%s");
                format!("DATE_FORMAT({field}, {})", self.escape_literal(&native))
            }
            Self::Postgres => {
                let native = pattern
                    .replace("%Y", "YYYY")
                    .replace("%m", "MM")
                    .replace("%d", "DD")
                    .replace("%H", "HH24")
                    .replace("%M", "MI")
                    .replace("%S", "SS");
                format!("TO_CHAR({field}, {})", self.escape_literal(&native))
            }
            Self::Sqlite => format!("strftime({}, {field})", self.escape_literal(pattern)),
        }
    }

    /// Renders an ORDER BY clause from already quoted expressions.
    ///
    /// PostgreSQL sorts NULL last ascending; the explicit NULLS clauses
    /// line it up with MySQL and SQLite.
    #[must_use]
    pub fn order_by(self, items: &[(String, Direction)]) -> String {
        if items.is_empty() {
            return String::new();
        }
        let rendered: Vec<String> = items
            .iter()
            .map(|(expr, dir)| match (self, dir) {
                (Self::Postgres, Direction::Asc) => format!("{expr} ASC NULLS FIRST"),
                (Self::Postgres, Direction::Desc) => format!("{expr} DESC NULLS LAST"),
                (_, dir) => format!("{expr} {}", dir.as_sql()),
            })
            .collect();
        format!("ORDER BY {}", rendered.join(", "))
    }

    /// Wraps a field so it sorts case-insensitively.
    #[must_use]
    pub fn lexical_collation(self, field: &str) -> String {
        match self {
            Self::MySql | Self::MariaDb => field.to_string(),
            Self::Postgres => format!("LOWER({field})"),
            Self::Sqlite => format!("{field} COLLATE NOCASE"),
        }
    }

    /// Concatenates SQL expressions.
    #[must_use]
    pub fn concat(self, args: &[&str]) -> String {
        if self.is_mysql_family() {
            format!("CONCAT({})", args.join(", "))
        } else {
            args.join(" || ")
        }
    }

    /// Renders the LIMIT/OFFSET tail, with a leading space when non-empty.
    #[must_use]
    pub fn limit_clause(self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit, offset) {
            (None, None) => String::new(),
            (Some(n), None) => format!(" LIMIT {n}"),
            (Some(n), Some(o)) => format!(" LIMIT {n} OFFSET {o}"),
            (None, Some(o)) => match self {
                Self::MySql | Self::MariaDb => format!(" LIMIT 18446744073709551615 OFFSET {o}"),
                Self::Sqlite => format!(" LIMIT -1 OFFSET {o}"),
                Self::Postgres => format!(" OFFSET {o}"),
            },
        }
    }

    /// Statements that take an exclusive write lock on `table`.
    ///
    /// PostgreSQL locks only last until the end of a transaction, so one is
    /// opened unless the caller already has one, which then holds the lock.
    #[must_use]
    pub fn begin_write(self, table: &str, in_transaction: bool) -> Vec<String> {
        let table = self.quote(table);
        match self {
            Self::MySql | Self::MariaDb => vec![format!("LOCK TABLES {table} WRITE")],
            Self::Postgres if in_transaction => {
                vec![format!("LOCK TABLE {table} IN EXCLUSIVE MODE")]
            }
            Self::Postgres => vec![
                String::from("BEGIN"),
                format!("LOCK TABLE {table} IN EXCLUSIVE MODE"),
            ],
            Self::Sqlite => vec![String::from("BEGIN IMMEDIATE")],
        }
    }

    /// Whether [`Backend::begin_write`] opens a transaction of its own.
    #[must_use]
    pub const fn write_lock_opens_transaction(self, in_transaction: bool) -> bool {
        match self {
            Self::Postgres => !in_transaction,
            Self::Sqlite => true,
            Self::MySql | Self::MariaDb => false,
        }
    }

    /// Statements that release a lock taken by [`Backend::begin_write`]
    /// with the same `in_transaction`.
    #[must_use]
    pub fn end_write(self, _table: &str, in_transaction: bool) -> Vec<String> {
        match self {
            Self::MySql | Self::MariaDb => vec![String::from("UNLOCK TABLES")],
            // released by the caller's COMMIT or ROLLBACK
            Self::Postgres if in_transaction => Vec::new(),
            Self::Postgres | Self::Sqlite => vec![String::from("COMMIT")],
        }
    }

    /// Statement reclaiming space for `table`.
    #[must_use]
    pub fn vacuum(self, table: &str) -> String {
        match self {
            Self::MySql | Self::MariaDb => format!("OPTIMIZE TABLE {}", self.quote(table)),
            Self::Postgres => format!("VACUUM ANALYZE {}", self.quote(table)),
            Self::Sqlite => String::from("VACUUM"),
        }
    }

    /// Statement opening a transaction.
    #[must_use]
    pub const fn begin_transaction(self) -> &'static str {
        if self.is_mysql_family() {
            "START TRANSACTION"
        } else {
            "BEGIN"
        }
    }

    /// Whether the catalog keeps the declared name of a primary key.
    ///
    /// MySQL and MariaDB always report `PRIMARY`.
    #[must_use]
    pub const fn named_primary_keys(self) -> bool {
        !self.is_mysql_family()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_names() {
        assert_eq!("mysql".parse::<Backend>(), Ok(Backend::MySql));
        assert_eq!("MariaDB".parse::<Backend>(), Ok(Backend::MariaDb));
        assert_eq!("pgsql".parse::<Backend>(), Ok(Backend::Postgres));
        assert_eq!("postgresql".parse::<Backend>(), Ok(Backend::Postgres));
        assert_eq!("sqlite3".parse::<Backend>(), Ok(Backend::Sqlite));
        assert_eq!(
            "oracle".parse::<Backend>(),
            Err(UnknownDriver(String::from("oracle")))
        );
        assert_eq!(Backend::Postgres.to_string(), "pgsql");
    }

    #[test]
    fn test_surround() {
        assert_eq!(Backend::MySql.surround("users"), Ok(String::from("`users`")));
        assert_eq!(
            Backend::Postgres.surround("user_2"),
            Ok(String::from("\"user_2\""))
        );
        assert!(Backend::Sqlite.surround("2users").is_err());
        assert!(Backend::Sqlite.surround("users; DROP").is_err());
        assert!(Backend::Sqlite.surround("").is_err());
    }

    #[test]
    fn test_quote_doubles_embedded_quotes() {
        assert_eq!(Backend::Sqlite.quote("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_date_format() {
        assert_eq!(
            Backend::MySql.date_format("created", "%Y-%m-%d %H:%M:%S"),
            "DATE_FORMAT(created, '%Y-%m-%d %H:%i:%s')"
        );
        assert_eq!(
            Backend::Postgres.date_format("created", "%Y-%m-%d %H:%M"),
            "TO_CHAR(created, 'YYYY-MM-DD HH24:MI')"
        );
        assert_eq!(
            Backend::Sqlite.date_format("created", "%Y"),
            "strftime('%Y', created)"
        );
    }

    #[test]
    fn test_order_by_null_placement() {
        let items = vec![
            (String::from("\"a\""), Direction::Asc),
            (String::from("\"b\""), Direction::Desc),
        ];
        assert_eq!(
            Backend::Postgres.order_by(&items),
            "ORDER BY \"a\" ASC NULLS FIRST, \"b\" DESC NULLS LAST"
        );
        assert_eq!(Backend::Sqlite.order_by(&items), "ORDER BY \"a\" ASC, \"b\" DESC");
        assert_eq!(Backend::Sqlite.order_by(&[]), "");
    }

    #[test]
    fn test_offset_without_limit() {
        assert_eq!(
            Backend::MySql.limit_clause(None, Some(5)),
            " LIMIT 18446744073709551615 OFFSET 5"
        );
        assert_eq!(Backend::Sqlite.limit_clause(None, Some(5)), " LIMIT -1 OFFSET 5");
        assert_eq!(Backend::Postgres.limit_clause(None, Some(5)), " OFFSET 5");
        assert_eq!(Backend::Postgres.limit_clause(Some(1), None), " LIMIT 1");
    }

    #[test]
    fn test_postgres_write_lock_inside_a_transaction() {
        // the caller's transaction holds the lock and is never committed here
        assert_eq!(
            Backend::Postgres.begin_write("jobs", true),
            vec![String::from("LOCK TABLE \"jobs\" IN EXCLUSIVE MODE")]
        );
        assert!(Backend::Postgres.end_write("jobs", true).is_empty());
        assert!(!Backend::Postgres.write_lock_opens_transaction(true));

        assert!(Backend::Postgres.write_lock_opens_transaction(false));
        assert_eq!(
            Backend::Postgres.end_write("jobs", false),
            vec![String::from("COMMIT")]
        );
        assert_eq!(
            Backend::MySql.end_write("jobs", true),
            vec![String::from("UNLOCK TABLES")]
        );
    }

    #[test]
    fn test_locking_and_maintenance() {
        assert_eq!(
            Backend::MySql.begin_write("jobs", false),
            vec![String::from("LOCK TABLES `jobs` WRITE")]
        );
        assert_eq!(
            Backend::Postgres.begin_write("jobs", false),
            vec![
                String::from("BEGIN"),
                String::from("LOCK TABLE \"jobs\" IN EXCLUSIVE MODE")
            ]
        );
        assert_eq!(Backend::Sqlite.end_write("jobs", false), vec![String::from("COMMIT")]);
        assert_eq!(Backend::Postgres.vacuum("jobs"), "VACUUM ANALYZE \"jobs\"");
        assert_eq!(Backend::MySql.concat(&["a", "b"]), "CONCAT(a, b)");
        assert_eq!(Backend::Sqlite.concat(&["a", "b"]), "a || b");
        assert_eq!(
            Backend::Postgres.lexical_collation("\"name\""),
            "LOWER(\"name\")"
        );
    }
}
