//! Write operations relayed to the remote service: tags, flags, saves.
//!
//! These are the only operations that change remote state. Read-only
//! deployments reject them in [`crate::traits::dispatch`] before any of
//! these functions run.

use anyhow::Result;
use content_relay_core::backend::Backend;
use content_relay_core::models::{Content, ContentFlag};
use content_relay_core::normalize::{normalize_single, unwrap_record};
use content_relay_core::RelayError;
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// Acknowledgement returned by every mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationAck {
    pub id: String,
    pub operation: &'static str,
    pub success: bool,
    /// The updated record, when the backend echoed one back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
}

/// Normalize an echoed record, if the response carries one.
fn echoed_content(raw: &Value) -> Option<Content> {
    let record = unwrap_record(raw);
    record.get("id")?;
    normalize_single(raw).ok()
}

fn clean_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for t in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if !out.iter().any(|o| o.eq_ignore_ascii_case(t)) {
            out.push(t.to_string());
        }
    }
    out
}

fn require_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(RelayError::InvalidRequest("id must not be empty".into()).into());
    }
    Ok(id)
}

/// Replace the tag set of a saved item.
pub async fn tag_content(backend: &dyn Backend, id: &str, tags: &[String]) -> Result<MutationAck> {
    let id = require_id(id)?;
    let tags = clean_tags(tags);
    if tags.is_empty() {
        return Err(RelayError::InvalidRequest("tags must not be empty".into()).into());
    }

    let raw = backend.update_tags(id, &tags).await?;
    info!(id, count = tags.len(), "tags updated");
    Ok(MutationAck {
        id: id.to_string(),
        operation: "tag",
        success: true,
        content: echoed_content(&raw),
    })
}

pub async fn set_content_flag(
    backend: &dyn Backend,
    id: &str,
    flag: ContentFlag,
    value: bool,
) -> Result<MutationAck> {
    let id = require_id(id)?;
    let raw = backend.set_flag(id, flag, value).await?;
    info!(id, flag = flag.wire_field(), value, "flag updated");
    Ok(MutationAck {
        id: id.to_string(),
        operation: "flag",
        success: true,
        content: echoed_content(&raw),
    })
}

/// Submit a URL for the remote service to ingest.
pub async fn save_content(backend: &dyn Backend, url: &str, tags: &[String]) -> Result<MutationAck> {
    let url = validate_url(url)?;
    let raw = backend.save_url(url.as_str(), &clean_tags(tags)).await?;
    let content = echoed_content(&raw);
    let id = content
        .as_ref()
        .map(|c| c.id.clone())
        .or_else(|| {
            unwrap_record(&raw)
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_default();
    info!(url = %url, id = %id, "content saved");
    Ok(MutationAck {
        id,
        operation: "save",
        success: true,
        content,
    })
}

/// Accept only absolute http(s) URLs with a host.
pub fn validate_url(raw: &str) -> Result<Url> {
    let invalid = |why: &str| RelayError::InvalidRequest(format!("invalid url '{}': {}", raw, why));
    let url = Url::parse(raw.trim()).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid("scheme must be http or https").into());
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host").into());
    }
    Ok(url)
}
