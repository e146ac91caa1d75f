//! Content search.
//!
//! Wraps the core retrieval executor with the relay's limit policy and the
//! aggregate token gate. Used by both `relay search` and the
//! `search_content` tool.
//!
//! Full text is only returned when the caller asks for it; the combined
//! estimate of all returned texts is then gated by the batch threshold.

use anyhow::Result;
use content_relay_core::backend::Backend;
use content_relay_core::budget::{self, TokenTier, OVERRIDE_PARAM};
use content_relay_core::models::SearchResult;
use content_relay_core::planner::BackendMode;
use content_relay_core::retrieval::{self, SearchOptions, Surface};
use serde::Serialize;

use crate::config::Config;
use crate::session::ClientHandle;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    pub mode: BackendMode,
    pub expand_concepts: bool,
    pub surface: Surface,
    pub total: usize,
    pub results: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<SearchBudget>,
}

/// Size report for a search that included full text.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchBudget {
    pub total_token_estimate: u64,
    pub tier: TokenTier,
    /// True when every result's text was cut to a preview.
    pub requires_confirmation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_param: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

/// Core search function returning structured data (used by CLI and tools).
pub async fn search_content(
    config: &Config,
    backend: &dyn Backend,
    query: &str,
    mut opts: SearchOptions,
    allow_large_content: bool,
) -> Result<SearchResponse> {
    opts.limit = config.retrieval.clamp_limit(Some(opts.limit as u64));
    let outcome = retrieval::search(backend, query, &opts).await?;

    let mut results = outcome.results;
    let budget = if opts.include_full_content {
        Some(gate_results(config, &mut results, allow_large_content))
    } else {
        for r in &mut results {
            r.content.full_text = None;
        }
        None
    };

    Ok(SearchResponse {
        query: query.trim().to_string(),
        mode: outcome.plan.mode,
        expand_concepts: outcome.plan.expand_concepts,
        surface: outcome.surface,
        total: results.len(),
        results,
        budget,
    })
}

fn gate_results(config: &Config, results: &mut [SearchResult], allow_large: bool) -> SearchBudget {
    let gate = config.budget.batch_gate();
    let total = budget::estimate_total(results.iter().map(|r| &r.content));
    let tier = budget::classify(total);

    if !gate.blocks(total, allow_large) {
        return SearchBudget {
            total_token_estimate: total,
            tier,
            requires_confirmation: false,
            override_param: None,
            advisory: budget::advisory(tier, total),
        };
    }

    for r in results.iter_mut() {
        if let Some(text) = r.content.full_text.take() {
            r.content.full_text = Some(text.chars().take(gate.preview_chars).collect());
        }
    }
    SearchBudget {
        total_token_estimate: total,
        tier,
        requires_confirmation: true,
        override_param: Some(OVERRIDE_PARAM),
        advisory: Some(format!(
            "{} Texts are cut to {} characters.",
            gate.withheld_note(total),
            gate.preview_chars
        )),
    }
}

/// CLI entry point: runs a search and prints a ranked listing to stdout.
pub async fn run_search(config: &Config, query: &str, opts: SearchOptions) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let handle = ClientHandle::from_config(&config.backend);
    let backend = handle.get().await?;
    let response = search_content(config, backend.as_ref(), query, opts, false).await?;

    if response.results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!(
        "{} result(s) for \"{}\" (mode: {}, surface: {:?})",
        response.total, response.query, response.mode, response.surface
    );
    println!();
    for (i, r) in response.results.iter().enumerate() {
        println!(
            "{}. [{:.2}] {}",
            i + 1,
            r.relevance_score,
            r.content.display_title()
        );
        println!("    id:   {}", r.content.id);
        println!("    type: {}", r.content.content_type);
        if !r.content.url.is_empty() {
            println!("    url:  {}", r.content.url);
        }
        if let Some(headline) = r.content.summary.as_ref().and_then(|s| s.headline()) {
            println!("    {}", headline);
        }
        if let Some(ref reason) = r.match_reason {
            println!("    why:  {}", reason);
        }
        if !r.content.tags.is_empty() {
            println!("    tags: {}", r.content.tags.join(", "));
        }
    }

    Ok(())
}
