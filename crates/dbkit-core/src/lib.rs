//! # dbkit-core
//!
//! The I/O-free half of dbkit: SQL building, schema declaration and schema
//! diffing for MySQL, MariaDB, PostgreSQL and SQLite.
//!
//! This crate provides:
//! - A fluent query builder compiled to SQL text plus an ordered parameter
//!   list, in placeholder or inline mode
//! - Backend syntax hooks (quoting, escaping, ordering, locking)
//! - A logical schema DSL with eager validation
//! - DDL generation per backend, including SQLite's trigger-based foreign keys
//! - A planner computing the operations that synchronize a live schema
//!
//! ## Building Queries
//!
//! ```rust
//! use dbkit_core::builder::{col, cond, Query};
//! use dbkit_core::{Backend, BuildOptions, Value};
//!
//! let (sql, params) = Query::new(BuildOptions::new(Backend::Postgres))
//!     .table("users")
//!     .where_clause(cond("id = ?", 5))
//!     .delete()
//!     .build()?;
//!
//! assert_eq!(sql, "DELETE FROM \"users\" WHERE id = ?");
//! assert_eq!(params, vec![Value::Int(5)]);
//!
//! // Literal values never reach the SQL text in placeholder mode
//! let user_input = "'; DROP TABLE users; --";
//! let (sql, params) = Query::new(BuildOptions::new(Backend::MySql))
//!     .columns(&["id"])
//!     .from("users")
//!     .where_clause(col("name").eq(user_input))
//!     .build()?;
//!
//! assert_eq!(sql, "SELECT `id` FROM `users` WHERE `name` = ?");
//! assert_eq!(params, vec![Value::Text(user_input.to_string())]);
//! # Ok::<(), dbkit_core::BuilderError>(())
//! ```
//!
//! ## Planning Schema Changes
//!
//! ```rust
//! use dbkit_core::schema::{varchar, Schema};
//! use dbkit_core::{diff, Backend};
//!
//! let mut declared = Schema::declare("");
//! declared
//!     .table("tokens")?
//!     .field(varchar("token", 64))?
//!     .unique("uq_tokens_token", &["token"])?;
//!
//! let plan = diff::plan(&declared, &Schema::new(), Backend::Sqlite);
//! assert_eq!(plan.len(), 2);
//! # Ok::<(), dbkit_core::SchemaError>(())
//! ```

pub mod backend;
pub mod builder;
pub mod diff;
pub mod error;
pub mod ident;
pub mod schema;
pub mod value;

pub use backend::{Backend, Direction};
pub use builder::{BuildOptions, ParamMode, Query};
pub use diff::{plan, SyncOp, SyncPlan};
pub use error::{BuilderError, SchemaError, UnknownDriver, ValueError};
pub use schema::Schema;
pub use value::{raw, FromValue, IntoParams, RawSql, ToValue, Value};
