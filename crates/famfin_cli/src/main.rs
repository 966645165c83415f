//! famfin CLI
//!
//! Maintenance tools for a famfin offline journal.
//!
//! # Commands
//!
//! - `status` - Table, queue and journal statistics
//! - `queue` - List queued offline mutations
//! - `cache` - List cached records of a family
//! - `replay` - Dry-run the queue against an in-memory backend
//! - `clear` - Drop cached data
//! - `purge` - Remove synced queue entries
//! - `compact` - Rewrite the journal as one snapshot
//! - `requeue` - Return parked entries to the queue

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use famfin_protocol::EntityKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// famfin offline store tools.
#[derive(Parser)]
#[command(name = "famfin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the journal file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Transaction,
    Account,
    Category,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Transaction => EntityKind::Transaction,
            KindArg::Account => EntityKind::Account,
            KindArg::Category => EntityKind::Category,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show table, queue and journal statistics
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List queued offline mutations
    Queue {
        /// Show parked entries only
        #[arg(long)]
        parked: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List cached records of a family
    Cache {
        /// Family id
        #[arg(long)]
        family: String,

        /// Restrict to one entity kind
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Replay the queue against an in-memory backend without touching the journal
    Replay,

    /// Drop cached data of one family, or everything including the queue
    Clear {
        /// Family id (all data if omitted)
        #[arg(long)]
        family: Option<String>,
    },

    /// Remove synced queue entries
    Purge,

    /// Rewrite the journal as a single snapshot
    Compact,

    /// Return parked entries to the queue
    Requeue,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Version = cli.command {
        println!("famfin CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("journal format v{}", famfin_store::FRAME_VERSION);
        return Ok(());
    }

    let path = cli.path.ok_or("Journal path required (--path)")?;
    match cli.command {
        Commands::Status { format } => commands::status::run(&path, &format)?,
        Commands::Queue { parked, format } => commands::queue::run(&path, parked, &format)?,
        Commands::Cache {
            family,
            kind,
            format,
        } => commands::cache::run(&path, &family, kind.map(EntityKind::from), &format)?,
        Commands::Replay => commands::replay::run(&path)?,
        Commands::Clear { family } => commands::maintenance::clear(&path, family.as_deref())?,
        Commands::Purge => commands::maintenance::purge(&path)?,
        Commands::Compact => commands::maintenance::compact(&path)?,
        Commands::Requeue => commands::maintenance::requeue(&path)?,
        Commands::Version => {}
    }

    Ok(())
}
