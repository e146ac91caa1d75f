//! Most recently saved content.

use anyhow::Result;
use content_relay_core::backend::Backend;
use content_relay_core::models::Content;
use content_relay_core::normalize::normalize_content_list;
use serde::Serialize;

use crate::config::Config;
use crate::session::ClientHandle;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentResponse {
    pub count: usize,
    pub items: Vec<Content>,
}

/// List recent items without their full text.
pub async fn list_recent_content(
    config: &Config,
    backend: &dyn Backend,
    limit: Option<u64>,
) -> Result<RecentResponse> {
    let limit = config.retrieval.clamp_limit(limit);
    let raw = backend.list_recent(limit).await?;
    let mut items = normalize_content_list(&raw)?;
    items.truncate(limit);
    for item in &mut items {
        item.full_text = None;
    }
    Ok(RecentResponse {
        count: items.len(),
        items,
    })
}

pub async fn run_recent(config: &Config, limit: Option<u64>) -> Result<()> {
    let handle = ClientHandle::from_config(&config.backend);
    let backend = handle.get().await?;
    let response = list_recent_content(config, backend.as_ref(), limit).await?;

    if response.items.is_empty() {
        println!("No saved content.");
        return Ok(());
    }
    for c in &response.items {
        println!(
            "{}  {:<13} {}  {}",
            c.created_at.format("%Y-%m-%d"),
            c.content_type.to_string(),
            c.id,
            c.display_title()
        );
    }
    Ok(())
}
