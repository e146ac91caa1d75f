//! Content retrieval by id, single and batched.
//!
//! Used by `relay get`, `relay batch-get`, and the `get_content_details` /
//! `batch_get_content` tools. Full text passes through the token budget
//! gate before it is released; see [`content_relay_core::budget`].

use anyhow::{bail, Result};
use content_relay_core::backend::Backend;
use content_relay_core::budget::{
    self, BatchItem, BatchRelease, ContentRelease, OVERRIDE_PARAM,
};
use content_relay_core::models::Content;
use content_relay_core::normalize::normalize_single;
use content_relay_core::{RelayError, RelayResult};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::session::ClientHandle;

/// Most ids accepted by one batch call.
pub const MAX_BATCH_IDS: usize = 25;

/// An id the batch could not fetch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedItem {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchGetResponse {
    pub requested: usize,
    #[serde(flatten)]
    pub release: BatchRelease,
    pub failed: Vec<FailedItem>,
}

async fn fetch(backend: &dyn Backend, id: &str) -> RelayResult<Content> {
    let raw = backend.get_content(id).await?;
    normalize_single(&raw)
}

/// Fetch one record and gate its full text.
///
/// With `include_full_text == false` the text is dropped and nothing is
/// gated.
pub async fn get_content_details(
    config: &Config,
    backend: &dyn Backend,
    id: &str,
    include_full_text: bool,
    allow_large_content: bool,
) -> Result<ContentRelease> {
    let id = id.trim();
    if id.is_empty() {
        return Err(RelayError::InvalidRequest("id must not be empty".into()).into());
    }

    let content = fetch(backend, id).await?;
    if !include_full_text {
        return Ok(budget::strip_text(content));
    }

    let release = budget::gate_single(
        content,
        &config.budget.single_item_gate(),
        allow_large_content,
    );
    if release.is_preview() {
        debug!(id, "full text withheld pending confirmation");
    }
    Ok(release)
}

/// Fetch up to [`MAX_BATCH_IDS`] records one after another.
///
/// Duplicate ids are fetched once. A non-auth failure for one id is
/// reported in `failed` and the batch continues; an auth failure aborts.
pub async fn batch_get_content(
    config: &Config,
    backend: &dyn Backend,
    ids: &[String],
    include_full_text: bool,
    allow_large_content: bool,
) -> Result<BatchGetResponse> {
    let mut unique: Vec<&str> = Vec::new();
    for id in ids.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    if unique.is_empty() {
        bail!(RelayError::InvalidRequest("ids must not be empty".into()));
    }
    if unique.len() > MAX_BATCH_IDS {
        bail!(RelayError::InvalidRequest(format!(
            "at most {} ids per batch, got {}",
            MAX_BATCH_IDS,
            unique.len()
        )));
    }

    let mut fetched = Vec::with_capacity(unique.len());
    let mut failed = Vec::new();
    for id in &unique {
        match fetch(backend, id).await {
            Ok(content) => fetched.push(content),
            Err(e) if e.is_auth() => return Err(e.into()),
            Err(e) => {
                warn!(id, error = %e, "batch item failed");
                failed.push(FailedItem {
                    id: id.to_string(),
                    status: e.status(),
                    error: e.to_string(),
                });
            }
        }
    }

    let release = if include_full_text {
        budget::gate_batch(fetched, &config.budget.batch_gate(), allow_large_content)
    } else {
        budget::strip_batch(fetched)
    };

    Ok(BatchGetResponse {
        requested: unique.len(),
        release,
        failed,
    })
}

fn print_content_header(c: &Content) {
    println!("id:           {}", c.id);
    println!("title:        {}", c.display_title());
    println!("type:         {}", c.content_type);
    println!("status:       {}", c.status);
    if !c.url.is_empty() {
        println!("url:          {}", c.url);
    }
    if !c.tags.is_empty() {
        println!("tags:         {}", c.tags.join(", "));
    }
    println!("created_at:   {}", c.created_at.format("%Y-%m-%dT%H:%M:%SZ"));
    println!("updated_at:   {}", c.updated_at.format("%Y-%m-%dT%H:%M:%SZ"));
    if let Some(headline) = c.summary.as_ref().and_then(|s| s.headline()) {
        println!("summary:      {}", headline);
    }
}

/// CLI entry point: fetches one record and prints it to stdout.
pub async fn run_get(config: &Config, id: &str, full_text: bool, allow_large: bool) -> Result<()> {
    let handle = ClientHandle::from_config(&config.backend);
    let backend = handle.get().await?;
    let release = get_content_details(config, backend.as_ref(), id, full_text, allow_large).await?;

    match release {
        ContentRelease::Full {
            content,
            token_estimate,
            tier,
            advisory,
        } => {
            println!("--- Content ---");
            print_content_header(&content);
            if let Some(ref text) = content.full_text {
                println!("tokens:       ~{} ({:?})", token_estimate, tier);
                if let Some(note) = advisory {
                    println!("note:         {}", note);
                }
                println!();
                println!("--- Full Text ---");
                println!("{}", text);
            }
        }
        ContentRelease::RequiresConfirmation {
            preview,
            token_estimate,
            message,
            ..
        } => {
            println!("--- Preview (~{} tokens) ---", token_estimate);
            println!("id:           {}", preview.id);
            println!(
                "title:        {}",
                preview.title.as_deref().unwrap_or("(untitled)")
            );
            println!("url:          {}", preview.url);
            println!();
            println!("{}", preview.text_preview);
            if preview.truncated {
                println!("...");
            }
            println!();
            println!("{} (CLI: --{})", message, OVERRIDE_PARAM.replace('_', "-"));
        }
    }

    Ok(())
}

/// CLI entry point for batch retrieval.
pub async fn run_batch_get(config: &Config, ids: &[String], allow_large: bool) -> Result<()> {
    let handle = ClientHandle::from_config(&config.backend);
    let backend = handle.get().await?;
    let response = batch_get_content(config, backend.as_ref(), ids, true, allow_large).await?;

    println!(
        "Fetched {} of {} item(s), ~{} tokens",
        response.release.items.len(),
        response.requested,
        response.release.total_token_estimate
    );
    if let Some(ref note) = response.release.advisory {
        println!("{}", note);
    }
    for item in &response.release.items {
        println!();
        match item {
            BatchItem::Full(c) => print_content_header(c),
            BatchItem::Preview(p) => {
                println!("id:           {}", p.id);
                println!(
                    "title:        {}",
                    p.title.as_deref().unwrap_or("(untitled)")
                );
                println!("preview:      {}", p.text_preview);
            }
        }
    }
    for f in &response.failed {
        println!();
        println!("failed:       {} ({})", f.id, f.error);
    }

    Ok(())
}
