//! Example: a custom relay binary with an extra Rust tool.
//!
//! Registers a **`weekly_digest`** tool next to the built-ins. It lists the
//! most recent items, keeps those saved within the last `days` days, and
//! groups them by content type.
//!
//! # Running
//!
//! ```bash
//! mkdir -p /tmp/relay/config
//! cat > /tmp/relay/config/relay.toml << 'EOF'
//! [backend]
//! base_url = "https://content.example.com"
//!
//! [server]
//! bind = "127.0.0.1:7480"
//! read_only = true
//! EOF
//!
//! export RELAY_API_KEY=...
//! cargo run --example custom_relay -- --config /tmp/relay/config/relay.toml
//!
//! curl -s http://localhost:7480/tools/list | jq '.tools[].name'
//! curl -s -X POST http://localhost:7480/tools/weekly_digest \
//!   -H 'Content-Type: application/json' \
//!   -d '{"days": 7}' | jq .
//! ```

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use clap::Parser;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

use content_relay::config;
use content_relay::logging::init_tracing;
use content_relay::params::opt_u64;
use content_relay::recent::list_recent_content;
use content_relay::server::run_server_with_extensions;
use content_relay::traits::{Tool, ToolContext, ToolRegistry};

/// Items saved in the last `days` days, grouped by content type.
struct WeeklyDigestTool;

#[async_trait]
impl Tool for WeeklyDigestTool {
    fn name(&self) -> &str {
        "weekly_digest"
    }

    fn description(&self) -> &str {
        "Recently saved items grouped by content type"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "days": { "type": "integer", "minimum": 1, "maximum": 90, "default": 7 },
                "limit": { "type": "integer", "minimum": 1 }
            }
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let days = opt_u64(&params, "days").unwrap_or(7) as i64;
        let cutoff = Utc::now() - Duration::days(days);

        let backend = ctx.backend().await?;
        let recent =
            list_recent_content(&ctx.config, backend.as_ref(), opt_u64(&params, "limit")).await?;

        let mut groups: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        for item in recent.items.iter().filter(|c| c.created_at >= cutoff) {
            groups
                .entry(item.content_type.to_string())
                .or_default()
                .push(json!({
                    "id": item.id,
                    "title": item.display_title(),
                    "url": item.url,
                    "savedAt": item.created_at.to_rfc3339(),
                }));
        }

        Ok(json!({
            "days": days,
            "total": groups.values().map(Vec::len).sum::<usize>(),
            "groups": groups,
        }))
    }
}

#[derive(Parser)]
#[command(name = "custom-relay", about = "Content Relay with a digest tool")]
struct Cli {
    #[arg(long, default_value = "./config/relay.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    let mut tools = ToolRegistry::with_builtins();
    tools.register(Box::new(WeeklyDigestTool));

    run_server_with_extensions(&cfg, tools).await
}
