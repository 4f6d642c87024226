//! # dbkit
//!
//! Portable database access for MySQL, MariaDB, PostgreSQL and SQLite:
//! blocking connections, lazily decoded result sets, single-row cursors,
//! schema introspection and declarative schema synchronization.
//!
//! SQL building, schema declaration and change planning live in
//! [`dbkit_core`], re-exported here.
//!
//! ## Synchronizing a Schema
//!
//! ```rust,no_run
//! use dbkit::schema::{bigint, varchar, Action};
//! use dbkit::{Connection, ConnectionConfig, Schema, SchemaSync};
//!
//! let mut schema = Schema::declare("app_");
//! schema
//!     .table("users")?
//!     .field(bigint("id"))?
//!     .field(varchar("email", 120).not_null())?
//!     .primary("pk_users", &["id"])?
//!     .unique("uq_users_email", &["email"])?;
//! schema
//!     .table("posts")?
//!     .field(bigint("id"))?
//!     .field(bigint("user_id"))?
//!     .primary("pk_posts", &["id"])?
//!     .reference("fk_posts_user", &["user_id"], "users", &["id"], Action::Cascade, Action::Cascade)?;
//!
//! let mut conn = Connection::open(&ConnectionConfig::new("sqlite", "app.db"))?;
//! let applied = schema.synchronize(&mut conn)?;
//! assert_eq!(schema.synchronize(&mut conn)?, 0);
//! println!("{applied} changes");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod connection;
pub mod cursor;
pub mod error;
pub mod introspect;
pub mod recordset;
pub mod sync;

pub use config::ConnectionConfig;
pub use connection::{open_connection, Connection, IntoSql};
pub use cursor::Cursor;
pub use error::{DbError, Result};
pub use introspect::{strategy, Emit, Introspect, MySqlSchema, PgSchema, SqliteSchema, Strategy};
pub use recordset::{ColumnInfo, Record, Recordset};
pub use sync::{reverse, SchemaSync};

pub use dbkit_core::{
    builder, diff, ident, raw, schema, Backend, BuildOptions, Direction, FromValue, IntoParams,
    ParamMode, Query, RawSql, Schema, SyncOp, SyncPlan, ToValue, Value,
};
