//! dbkit CLI
//!
//! Inspects a database, synchronizes it with a declared schema and runs
//! ad-hoc queries.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use dbkit::{reverse, Connection, ConnectionConfig, Schema, SchemaSync};

/// Portable database administration.
#[derive(Parser)]
#[command(name = "dbkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Driver name.
    ///
    /// One of `mysql`, `mariadb`, `pgsql` (or `postgres`) and `sqlite`. A
    /// MySQL server that turns out to be MariaDB is switched over after
    /// connecting.
    #[arg(long, env = "DBKIT_DRIVER", default_value = "sqlite")]
    driver: String,

    /// Server to connect to: `host`, `host:port` or a socket path. Unused
    /// for SQLite.
    #[arg(long, env = "DBKIT_HOST", default_value = "")]
    host: String,

    /// Database name, or the file path for SQLite (`:memory:` works too).
    #[arg(short, long, env = "DBKIT_DATABASE", default_value = "db.sqlite3")]
    database: String,

    #[arg(short, long, env = "DBKIT_USER", default_value = "")]
    user: String,

    #[arg(short, long, env = "DBKIT_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Log every statement.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tables of the database.
    Tables,

    /// Print the live schema as JSON.
    Reverse {
        /// Keep only tables whose name starts with this prefix.
        #[arg(long, default_value = "")]
        prefix: String,
    },

    /// Synchronize the database with a schema document.
    Sync {
        /// JSON schema document: `{"tables": [...]}`, with fields, keys,
        /// indexes and references per table.
        #[arg(short, long)]
        schema: PathBuf,

        /// Prefix for table, key, index and reference names.
        #[arg(long, default_value = "")]
        prefix: String,

        /// Print the planned operations without applying them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Run a query and print its rows, tab separated.
    Query {
        sql: String,
    },

    /// Reclaim storage for a table.
    Vacuum {
        /// Table to vacuum. SQLite vacuums the whole file regardless.
        table: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ConnectionConfig::new(&cli.driver, &cli.database)
        .host(&cli.host)
        .credentials(&cli.user, &cli.password);
    let mut conn = Connection::open(&config)?;

    match cli.command {
        Commands::Tables => {
            let strategy = dbkit::strategy(conn.backend());
            for table in strategy.list_tables(&mut conn)? {
                println!("{table}");
            }
        }

        Commands::Reverse { prefix } => {
            let mut schema = reverse(&mut conn)?;
            schema.tables.retain(|t| t.name.starts_with(&prefix));
            println!("{}", schema.to_json()?);
        }

        Commands::Sync {
            schema,
            prefix,
            dry_run,
        } => {
            let document = std::fs::read_to_string(&schema)?;
            let declared = Schema::from_json(prefix, &document)?;

            if dry_run {
                let plan = declared.plan_against(&mut conn)?;
                for line in plan.describe() {
                    println!("{line}");
                }
                info!(operations = plan.len(), "Dry run, nothing applied");
            } else {
                let applied = declared.synchronize(&mut conn)?;
                println!("{applied} operation(s) applied");
            }
        }

        Commands::Query { sql } => {
            let records = conn.query(sql.as_str(), ())?;
            let header: Vec<String> = records.columns().iter().map(|c| c.name.clone()).collect();
            if !header.is_empty() {
                println!("{}", header.join("\t"));
            }
            for record in records {
                let line: Vec<String> = record?
                    .iter()
                    .map(|(_, value)| value.to_string())
                    .collect();
                println!("{}", line.join("\t"));
            }
        }

        Commands::Vacuum { table } => {
            conn.vacuum(&table)?;
        }
    }

    conn.close()?;
    Ok(())
}
