//! Synthesis orchestrator.
//!
//! Resolves a source set, requests cross-source synthesis, reconciles the
//! result shape, and drops insights unrelated to the query.
//!
//! Source resolution stops at the first non-empty tier:
//!
//! 1. explicit ids from the request
//! 2. a semantic, concept-expanded search for the query (bounded by
//!    `max_sources`)
//! 3. the most recently saved items (bounded by `max_sources`)
//!
//! With no sources the synthesis backend is never called. A failing modern
//! synthesis call degrades once to the legacy endpoint with the same
//! sources; if that fails too the outcome is [`SynthesisOutcome::Failed`].
//! Auth errors always propagate.

use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::error::{RelayError, RelayResult};
use crate::models::{SynthesisRequest, SynthesisResult};
use crate::normalize::{normalize_content_list, normalize_synthesis};
use crate::planner::CallerMode;
use crate::retrieval::{self, SearchOptions, Surface};
use crate::wire::{LegacySynthesisRequest, ModernSynthesisRequest};

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "her", "was", "one",
    "our", "out", "has", "have", "had", "how", "what", "when", "where", "which", "who", "why",
    "with", "this", "that", "these", "those", "from", "about", "into", "over", "than", "then",
    "them", "they", "their", "there", "will", "would", "should", "could", "does", "did", "been",
    "being", "some", "such", "only", "own", "same", "very", "just", "also", "more", "most",
    "other", "its", "his", "she", "him", "your", "yours", "get", "use", "using", "make",
];

/// Where the synthesis sources came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTier {
    Explicit,
    Search,
    Recent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSources {
    pub ids: Vec<String>,
    pub tier: SourceTier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SynthesisOutcome {
    Completed {
        result: SynthesisResult,
        sources: ResolvedSources,
        surface: Surface,
    },
    NoSources {
        reason: String,
    },
    Failed {
        reason: String,
        sources: ResolvedSources,
    },
}

impl SynthesisOutcome {
    pub fn result(&self) -> Option<&SynthesisResult> {
        match self {
            SynthesisOutcome::Completed { result, .. } => Some(result),
            _ => None,
        }
    }
}

/// Resolve the source set for a request. `None` when every tier is empty.
pub async fn resolve_sources(
    backend: &dyn Backend,
    request: &SynthesisRequest,
) -> RelayResult<Option<ResolvedSources>> {
    let explicit = dedup_ids(request.content_ids.iter().map(String::as_str), usize::MAX);
    if !explicit.is_empty() {
        return Ok(Some(ResolvedSources {
            ids: explicit,
            tier: SourceTier::Explicit,
        }));
    }

    let max = request.max_sources.max(1);
    let opts = SearchOptions {
        mode: CallerMode::Semantic,
        expand_concepts: Some(true),
        limit: max,
        ..Default::default()
    };
    match retrieval::search(backend, &request.query, &opts).await {
        Ok(outcome) => {
            let ids = dedup_ids(outcome.results.iter().map(|r| r.content.id.as_str()), max);
            if !ids.is_empty() {
                debug!(count = ids.len(), "synthesis sources resolved from search");
                return Ok(Some(ResolvedSources {
                    ids,
                    tier: SourceTier::Search,
                }));
            }
        }
        Err(e) if e.is_auth() => return Err(e),
        Err(e) => warn!(error = %e, "source search failed; falling back to recent items"),
    }

    let recent = match backend.list_recent(max).await {
        Ok(raw) => normalize_content_list(&raw)?,
        Err(e) if e.is_auth() => return Err(e),
        Err(e) => {
            warn!(error = %e, "recent items unavailable");
            Vec::new()
        }
    };
    let ids = dedup_ids(recent.iter().map(|c| c.id.as_str()), max);
    if ids.is_empty() {
        return Ok(None);
    }
    info!(count = ids.len(), "synthesis sources resolved from recent items");
    Ok(Some(ResolvedSources {
        ids,
        tier: SourceTier::Recent,
    }))
}

/// Run a full synthesis: resolve sources, call the backend, filter.
pub async fn synthesize(
    backend: &dyn Backend,
    request: &SynthesisRequest,
) -> RelayResult<SynthesisOutcome> {
    if request.query.trim().is_empty() {
        return Err(RelayError::InvalidRequest("query must not be empty".into()));
    }

    let Some(sources) = resolve_sources(backend, request).await? else {
        return Ok(SynthesisOutcome::NoSources {
            reason: format!(
                "No saved content matched \"{}\" and no recent items were found.",
                request.query.trim()
            ),
        });
    };

    let keywords = query_keywords(&request.query);

    let modern = backend
        .synthesize(&ModernSynthesisRequest::build(request, &sources.ids))
        .await
        .and_then(|raw| normalize_synthesis(&raw));
    let modern_error = match modern {
        Ok(result) => {
            return Ok(SynthesisOutcome::Completed {
                result: filter_relevant(result, &keywords),
                sources,
                surface: Surface::Modern,
            });
        }
        Err(e) if e.is_auth() => return Err(e),
        Err(e) => e,
    };
    warn!(error = %modern_error, "modern synthesis failed; trying legacy synthesis");

    let legacy = backend
        .legacy_synthesize(&LegacySynthesisRequest::build(request, &sources.ids))
        .await
        .and_then(|raw| normalize_synthesis(&raw));
    match legacy {
        Ok(result) => Ok(SynthesisOutcome::Completed {
            result: filter_relevant(result, &keywords),
            sources,
            surface: Surface::Legacy,
        }),
        Err(e) if e.is_auth() => Err(e),
        Err(e) => {
            warn!(error = %e, "legacy synthesis failed");
            Ok(SynthesisOutcome::Failed {
                reason: format!(
                    "Synthesis is unavailable right now ({}; legacy: {}).",
                    modern_error, e
                ),
                sources,
            })
        }
    }
}

/// Lowercased query tokens longer than two characters, minus stop words.
pub fn query_keywords(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() > 2 && !STOP_WORDS.contains(&t.as_str()))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Drop insights, themes, and connections mentioning none of `keywords`.
///
/// With no keywords the result is returned unchanged.
pub fn filter_relevant(mut result: SynthesisResult, keywords: &[String]) -> SynthesisResult {
    if keywords.is_empty() {
        return result;
    }
    let mentions = |text: &str| {
        let lower = text.to_lowercase();
        keywords.iter().any(|k| lower.contains(k.as_str()))
    };

    result.insights.retain(|i| mentions(&i.text));
    result
        .themes
        .retain(|t| mentions(&t.theme) || t.insight.as_deref().is_some_and(mentions));
    result.connections.retain(|c| mentions(&c.description));
    result
}

fn dedup_ids<'a>(ids: impl Iterator<Item = &'a str>, max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.map(str::trim)
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .take(max)
        .map(str::to_string)
        .collect()
}
