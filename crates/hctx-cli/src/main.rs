//! Hyper Context CLI: versioned knowledge retrieval for AI agents.
//!
//! Commands: serve, index, get, resolve, preview

mod config;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use rmcp::ServiceExt;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use hctx_core::scope::RequestScope;
use hctx_core::store::KnowledgeStore;
use hctx_mcp::KnowledgeMcpService;
use hctx_query::{
    build_preview, collect_data, get_knowledge, get_knowledge_index, load_snapshot, preview,
    resolve_name, resolve_version, Cancelled, DetailRequest, EventSink, IndexRequest, ToolEvent,
    ToolFailure,
};
use hctx_store::SqliteStore;

use crate::config::{Config, Overrides, Settings};

#[derive(Parser)]
#[command(name = "hctx", version, about = "Versioned knowledge retrieval for AI agents")]
struct Cli {
    /// Path to configuration file (default: ./hctx.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Project id to read from
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// Version to read: stable, draft, or a version id
    #[arg(long = "at", value_name = "VERSION", global = true)]
    at: Option<String>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve get-knowledge-index and get-knowledge over stdio (MCP)
    Serve,
    /// List the knowledge blocks of documents (NDJSON events)
    Index {
        /// Document specs, e.g. docs/intro.md or intro.md
        names: Vec<String>,
        /// Print the collected records as one JSON array instead of events
        #[arg(long)]
        json: bool,
    },
    /// Fetch full block content (NDJSON events)
    Get {
        /// Restrict to one document and optionally seed a block: path#Block
        #[arg(long)]
        name: Option<String>,
        /// Block names
        keys: Vec<String>,
        /// Print the collected records as one JSON array instead of events
        #[arg(long)]
        json: bool,
    },
    /// Resolve a name spec to a node and block
    Resolve {
        /// path/to/doc.md#Block or doc.md
        spec: String,
    },
    /// Render the flattened Markdown preview of a version
    Preview {
        /// Only render the subtree of this node id
        #[arg(long)]
        root: Option<String>,
    },
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    // stdout carries MCP frames and command output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

/// Writes each event as one JSON line and remembers a terminal error.
struct NdjsonSink<W: Write> {
    out: W,
    failure: Option<ToolFailure>,
}

impl<W: Write> EventSink for NdjsonSink<W> {
    fn emit(&mut self, event: ToolEvent) -> std::result::Result<(), Cancelled> {
        if let ToolEvent::Error { code, message } = &event {
            self.failure = Some(ToolFailure {
                code: *code,
                message: message.clone(),
            });
        }
        serde_json::to_writer(&mut self.out, &event).map_err(|_| Cancelled)?;
        self.out
            .write_all(b"\n")
            .and_then(|()| self.out.flush())
            .map_err(|_| Cancelled)
    }
}

/// Run a tool either as an NDJSON stream or collected into a JSON array.
fn emit_events(json: bool, run: impl FnOnce(&mut dyn EventSink)) -> Result<()> {
    if json {
        let mut events = Vec::new();
        run(&mut events);
        let data = collect_data(events)?;
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }
    let stdout = std::io::stdout();
    let mut sink = NdjsonSink {
        out: stdout.lock(),
        failure: None,
    };
    run(&mut sink);
    match sink.failure {
        Some(failure) => Err(failure.into()),
        None => Ok(()),
    }
}

/// Opening a missing path would create an empty database.
fn require_database(settings: &Settings) -> Result<()> {
    if !settings.database.is_file() {
        bail!("database {} does not exist", settings.database.display());
    }
    Ok(())
}

fn open_store(settings: &Settings) -> Result<(SqliteStore, RequestScope)> {
    let project = settings.require_project()?;
    require_database(settings)?;
    let store = SqliteStore::open(&settings.database)
        .with_context(|| format!("opening {}", settings.database.display()))?;
    Ok((store, RequestScope::new(project)))
}

async fn cmd_serve(settings: &Settings) -> Result<()> {
    let project = settings.require_project()?;
    require_database(settings)?;
    let service = KnowledgeMcpService::new(
        settings.database.clone(),
        RequestScope::new(project),
        settings.version.clone(),
    )
    .with_server_name(settings.server_name.clone());
    info!(db = %settings.database.display(), project, "serving MCP over stdio");
    let running = service
        .serve((tokio::io::stdin(), tokio::io::stdout()))
        .await
        .context("starting MCP session")?;
    running.waiting().await?;
    debug!("MCP session closed");
    Ok(())
}

fn cmd_index(settings: &Settings, names: Vec<String>, json: bool) -> Result<()> {
    let (store, scope) = open_store(settings)?;
    let request = IndexRequest::names(names);
    emit_events(json, |sink| {
        get_knowledge_index(&store, &scope, settings.version.as_deref(), &request, sink);
    })
}

fn cmd_get(settings: &Settings, name: Option<String>, keys: Vec<String>, json: bool) -> Result<()> {
    let (store, scope) = open_store(settings)?;
    let request = DetailRequest {
        name,
        keys: Some(keys),
    };
    emit_events(json, |sink| {
        get_knowledge(&store, &scope, settings.version.as_deref(), &request, sink);
    })
}

fn cmd_resolve(settings: &Settings, spec: &str) -> Result<()> {
    let (store, scope) = open_store(settings)?;
    let resolved = resolve_name(&store, &scope, spec)?;
    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}

fn cmd_preview(settings: &Settings, root: Option<&str>) -> Result<()> {
    let (store, scope) = open_store(settings)?;
    let token = settings.version.as_deref();
    let text = match root {
        None => preview(&store, &scope, token)?,
        Some(root) => {
            let version = resolve_version(&store, &scope, token)?;
            let snapshot = load_snapshot(&store, &scope, &version.id, Some(root))?;
            let project_name = store.project_name(&scope.project_id)?.unwrap_or_default();
            build_preview(&project_name, &snapshot.tree, &snapshot.contents)
        }
    };
    println!("{text}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let cwd = std::env::current_dir().context("reading working directory")?;
    let config = Config::discover(cli.config.as_deref(), &cwd)?;
    let settings = Settings::merge(
        config,
        Overrides {
            database: cli.db,
            project: cli.project,
            version: cli.at,
        },
    );
    debug!(?settings, "effective settings");

    match cli.command {
        Commands::Serve => cmd_serve(&settings).await,
        Commands::Index { names, json } => cmd_index(&settings, names, json),
        Commands::Get { name, keys, json } => cmd_get(&settings, name, keys, json),
        Commands::Resolve { spec } => cmd_resolve(&settings, &spec),
        Commands::Preview { root } => cmd_preview(&settings, root.as_deref()),
    }
}
