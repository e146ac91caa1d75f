//! # Content Relay CLI (`relay`)
//!
//! ## Usage
//!
//! ```bash
//! relay --config ./config/relay.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `relay search "<query>"` | Search saved content |
//! | `relay get <id>` | Retrieve one item (budget-gated) |
//! | `relay batch-get <id>...` | Retrieve several items |
//! | `relay recent` | List recently saved items |
//! | `relay synthesize "<query>"` | Synthesize across sources |
//! | `relay frameworks "<query>"` | Extract frameworks |
//! | `relay tool list` | List tools with their schemas |
//! | `relay tool call <name> --param k=v` | Call a tool as a host would |
//! | `relay serve mcp` | Start the HTTP/MCP tool server |

use clap::{Parser, Subcommand};
use content_relay::config::{self, Config};
use content_relay::frameworks::{extraction_options, run_frameworks};
use content_relay::get::{run_batch_get, run_get};
use content_relay::logging::init_tracing;
use content_relay::recent::run_recent;
use content_relay::search::run_search;
use content_relay::server;
use content_relay::synthesize::{clamp_sources, run_synthesize};
use content_relay::traits::{dispatch, ToolContext, ToolRegistry};
use content_relay_core::models::{ContentType, SynthesisMode, SynthesisRequest};
use content_relay_core::planner::CallerMode;
use content_relay_core::retrieval::SearchOptions;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Content Relay: token-budget-aware search and synthesis over saved content.
///
/// All commands read `--config` (TOML). The API key comes from the
/// environment variable named by `[backend].api_key_env`
/// (default `RELAY_API_KEY`).
#[derive(Parser)]
#[command(
    name = "relay",
    about = "Content Relay: token-budget-aware search and synthesis over saved content",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/relay.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search saved content.
    Search {
        query: String,

        /// smart, semantic, hybrid, fulltext, any, all, or phrase.
        #[arg(long, default_value = "smart")]
        mode: String,

        /// Disable concept expansion (on by default).
        #[arg(long)]
        no_expand: bool,

        #[arg(long)]
        limit: Option<u64>,

        /// Restrict to a content type (repeatable).
        #[arg(long = "type")]
        content_types: Vec<String>,

        /// Restrict to a tag (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Only items saved on or after this date.
        #[arg(long)]
        since: Option<String>,

        /// Only items saved on or before this date.
        #[arg(long)]
        until: Option<String>,

        /// Ask the backend to explain each match.
        #[arg(long)]
        explain: bool,
    },

    /// Retrieve one item by id.
    Get {
        id: String,

        /// Omit the full text.
        #[arg(long)]
        no_text: bool,

        /// Print full text even above the single-item budget.
        #[arg(long)]
        allow_large_content: bool,
    },

    /// Retrieve several items by id.
    BatchGet {
        #[arg(required = true)]
        ids: Vec<String>,

        #[arg(long)]
        allow_large_content: bool,
    },

    /// List recently saved items.
    Recent {
        #[arg(long)]
        limit: Option<u64>,
    },

    /// Synthesize insights across saved content.
    Synthesize {
        query: String,

        /// overview, deep, actionable, or comparison.
        #[arg(long, default_value = "overview")]
        mode: String,

        /// Explicit source id (repeatable).
        #[arg(long = "id")]
        ids: Vec<String>,

        #[arg(long)]
        contradictions: bool,

        #[arg(long)]
        max_sources: Option<u64>,
    },

    /// Extract frameworks (named methods with steps) from saved content.
    Frameworks {
        query: String,

        #[arg(long = "id")]
        ids: Vec<String>,

        #[arg(long)]
        min_confidence: Option<f64>,

        #[arg(long)]
        limit: Option<u64>,
    },

    /// Inspect and call tools.
    Tool {
        #[command(subcommand)]
        action: ToolAction,
    },

    /// Start a server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

#[derive(Subcommand)]
enum ToolAction {
    /// List all tools with their parameter schemas.
    List,
    /// Call a tool through the same dispatch the servers use.
    Call {
        name: String,
        /// Parameters as `key=value`; values are parsed as JSON when possible.
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
}

#[derive(Subcommand)]
enum ServeService {
    /// Start the HTTP tool server with the MCP endpoint at `/mcp`.
    Mcp,
}

/// Parse a `key=value` pair for `--param` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

/// `limit=5` becomes a number, `ids=["a","b"]` an array, `query=deep work`
/// stays a string.
fn params_to_json(params: Vec<(String, String)>) -> Value {
    let mut map = Map::new();
    for (k, v) in params {
        let value = serde_json::from_str::<Value>(&v).unwrap_or(Value::String(v));
        map.insert(k, value);
    }
    Value::Object(map)
}

fn parse_types(values: &[String]) -> anyhow::Result<Vec<ContentType>> {
    values
        .iter()
        .map(|v| v.parse::<ContentType>().map_err(anyhow::Error::msg))
        .collect()
}

fn synthesis_request(
    cfg: &Config,
    query: String,
    mode: SynthesisMode,
    ids: Vec<String>,
    contradictions: bool,
    max_sources: Option<u64>,
) -> SynthesisRequest {
    SynthesisRequest {
        query,
        content_ids: ids,
        mode,
        find_contradictions: contradictions,
        find_connections: true,
        max_sources: clamp_sources(cfg, max_sources),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Search {
            query,
            mode,
            no_expand,
            limit,
            content_types,
            tags,
            since,
            until,
            explain,
        } => {
            let opts = SearchOptions {
                mode: CallerMode::parse_lenient(&mode),
                expand_concepts: if no_expand { Some(false) } else { None },
                limit: cfg.retrieval.clamp_limit(limit),
                content_types: parse_types(&content_types)?,
                tags,
                date_from: since,
                date_to: until,
                explain_matches: explain,
                ..Default::default()
            };
            run_search(&cfg, &query, opts).await?;
        }
        Commands::Get {
            id,
            no_text,
            allow_large_content,
        } => {
            run_get(&cfg, &id, !no_text, allow_large_content).await?;
        }
        Commands::BatchGet {
            ids,
            allow_large_content,
        } => {
            run_batch_get(&cfg, &ids, allow_large_content).await?;
        }
        Commands::Recent { limit } => {
            run_recent(&cfg, limit).await?;
        }
        Commands::Synthesize {
            query,
            mode,
            ids,
            contradictions,
            max_sources,
        } => {
            let mode: SynthesisMode = mode.parse().map_err(anyhow::Error::msg)?;
            let request = synthesis_request(&cfg, query, mode, ids, contradictions, max_sources);
            run_synthesize(&cfg, request).await?;
        }
        Commands::Frameworks {
            query,
            ids,
            min_confidence,
            limit,
        } => {
            let request =
                synthesis_request(&cfg, query, SynthesisMode::Actionable, ids, false, None);
            let opts = extraction_options(&cfg, min_confidence, limit);
            run_frameworks(&cfg, request, opts).await?;
        }
        Commands::Tool { action } => match action {
            ToolAction::List => {
                let tools = ToolRegistry::with_builtins();
                for t in tools.tools() {
                    let access = if t.mutates() { "write" } else { "read" };
                    println!("{:<22} {:<5} {}", t.name(), access, t.description());
                }
            }
            ToolAction::Call { name, params } => {
                let tools = ToolRegistry::with_builtins();
                let ctx = ToolContext::from_config(Arc::new(cfg.clone()));
                let result = dispatch(&tools, &ctx, &name, params_to_json(params)).await?;
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        },
        Commands::Serve { service } => match service {
            ServeService::Mcp => {
                server::run_server(&cfg).await?;
            }
        },
    }

    Ok(())
}
