mod cli;
mod config;
mod error;
mod memory;
mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mnemo", version, about = "Durable memory MCP server for automation agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server
    Serve {
        /// Transport: "stdio" or "sse". Defaults to the configured transport.
        #[arg(long)]
        transport: Option<String>,
    },
    /// Store a new memory
    Add {
        /// Memory content
        content: String,
        /// Scope the memory belongs to
        #[arg(long, default_value = "global")]
        scope: String,
        /// Tags, repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Importance 0.0-1.0
        #[arg(long)]
        importance: Option<f64>,
    },
    /// Search memories
    Search {
        /// Free-text query
        query: Option<String>,
        /// Restrict to this scope
        #[arg(long)]
        scope: Option<String>,
        /// Tags to match, repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Maximum results (0 = unlimited)
        #[arg(long)]
        limit: Option<usize>,
        /// Include soft-deleted memories
        #[arg(long)]
        include_deleted: bool,
    },
    /// Print one memory by id
    Get { id: String },
    /// Patch fields of a memory
    Update {
        id: String,
        /// JSON object of fields to change, e.g. '{"importance": 0.9}'
        patch: String,
    },
    /// Soft-delete a memory
    Delete { id: String },
    /// Apply retention policies (dedup, age-out, summarize)
    Prune {
        /// Only prune this scope
        #[arg(long)]
        scope: Option<String>,
        /// Plan without applying
        #[arg(long)]
        dry_run: bool,
    },
    /// Rewrite the log to one line per memory
    Compact,
    /// Report log health
    Health,
    /// Drop unreadable lines from the log
    Repair {
        /// Also compact while rewriting
        #[arg(long)]
        compact: bool,
        /// Skip writing dropped lines to a quarantine file
        #[arg(long)]
        no_quarantine: bool,
    },
    /// Rebuild the scope/tag index from the log
    RebuildIndex,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = config::MnemoConfig::load()?;

    // Initialize tracing with the configured log level.
    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { transport } => {
            let transport = transport.unwrap_or_else(|| config.server.transport.clone());
            match transport.as_str() {
                "stdio" => server::serve_stdio(config).await?,
                "sse" | "http" => server::serve_sse(config).await?,
                other => anyhow::bail!("unknown transport '{other}' (expected stdio or sse)"),
            }
        }
        Command::Add {
            content,
            scope,
            tags,
            importance,
        } => cli::memory::add(&config, &scope, &content, tags, importance)?,
        Command::Search {
            query,
            scope,
            tags,
            limit,
            include_deleted,
        } => cli::search::search(&config, scope, tags, query, limit, include_deleted)?,
        Command::Get { id } => cli::memory::get(&config, &id)?,
        Command::Update { id, patch } => cli::memory::update(&config, &id, &patch)?,
        Command::Delete { id } => cli::memory::delete(&config, &id)?,
        Command::Prune { scope, dry_run } => {
            cli::maintenance::prune(&config, scope.as_deref(), dry_run)?
        }
        Command::Compact => cli::maintenance::compact(&config)?,
        Command::Health => cli::maintenance::health(&config)?,
        Command::Repair {
            compact,
            no_quarantine,
        } => cli::maintenance::repair(&config, compact, no_quarantine)?,
        Command::RebuildIndex => cli::maintenance::rebuild_index(&config)?,
    }

    Ok(())
}
