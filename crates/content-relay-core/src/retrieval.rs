//! Multi-tier retrieval executor.
//!
//! Issues the modern search built from the planner's output and degrades to
//! the legacy surface when the modern call fails, or broadens through it
//! when the modern call comes back empty. Tiers run strictly one after the
//! other. Results keep the backend's relevance order.
//!
//! # Tier rules
//!
//! | Modern outcome | Full content requested | Legacy called | Result |
//! |----------------|------------------------|---------------|--------|
//! | N > 0 results | any | no | modern results |
//! | 0 results | yes | no | empty |
//! | 0 results | no | yes | legacy results, or empty if legacy fails |
//! | recoverable error | any | yes, once | legacy results, or the legacy error |
//! | auth / schema / invalid request | any | no | error |

use serde::Serialize;
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::error::{RelayError, RelayResult};
use crate::models::{ContentType, SearchResult};
use crate::normalize::normalize_search_results;
use crate::planner::{self, CallerMode, QueryPlan};
use crate::wire::{
    LegacySearchRequest, ModernSearchRequest, SearchFeatures, SearchFilters, SearchRequestOptions,
};

/// Caller options for one search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub mode: CallerMode,
    /// `None` means "not specified"; the planner enables expansion then.
    pub expand_concepts: Option<bool>,
    pub limit: usize,
    pub offset: usize,
    pub content_types: Vec<ContentType>,
    pub tags: Vec<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub include_full_content: bool,
    pub explain_matches: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            mode: CallerMode::Smart,
            expand_concepts: None,
            limit: 10,
            offset: 0,
            content_types: Vec::new(),
            tags: Vec::new(),
            date_from: None,
            date_to: None,
            include_full_content: false,
            explain_matches: false,
        }
    }
}

/// Which backend surface produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Modern,
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub plan: QueryPlan,
    /// Surface whose response is reflected in `results`.
    pub surface: Surface,
}

/// Build the modern request body from a query, plan, and options.
pub fn modern_request(query: &str, plan: &QueryPlan, opts: &SearchOptions) -> ModernSearchRequest {
    ModernSearchRequest {
        query: query.to_string(),
        mode: plan.mode,
        filters: SearchFilters {
            content_types: opts.content_types.clone(),
            tags: opts.tags.clone(),
            date_from: opts.date_from.clone(),
            date_to: opts.date_to.clone(),
        },
        options: SearchRequestOptions {
            limit: opts.limit,
            offset: opts.offset,
            include_full_content: opts.include_full_content,
            expand_concepts: plan.expand_concepts,
        },
        features: SearchFeatures {
            explain_matches: opts.explain_matches,
        },
    }
}

/// Build the legacy request; only query, limit, one type, and tags survive.
pub fn legacy_request(query: &str, opts: &SearchOptions) -> LegacySearchRequest {
    LegacySearchRequest {
        query: query.to_string(),
        limit: opts.limit,
        content_type: opts.content_types.first().copied(),
        tags: opts.tags.clone(),
    }
}

/// Run a search across the modern and legacy surfaces.
pub async fn search(
    backend: &dyn Backend,
    query: &str,
    opts: &SearchOptions,
) -> RelayResult<SearchOutcome> {
    let query = query.trim();
    if query.is_empty() {
        return Err(RelayError::InvalidRequest("query must not be empty".into()));
    }

    let plan = planner::plan(opts.mode, opts.expand_concepts);
    debug!(mode = %plan.mode, expand = plan.expand_concepts, "planned search");

    let primary = backend
        .search(&modern_request(query, &plan, opts))
        .await
        .and_then(|raw| normalize_search_results(&raw));

    let primary_error = match primary {
        Ok(results) if !results.is_empty() || opts.include_full_content => {
            return Ok(SearchOutcome {
                results,
                plan,
                surface: Surface::Modern,
            });
        }
        Ok(_) => {
            debug!(query, "modern search returned nothing; broadening via legacy search");
            None
        }
        Err(e) if e.is_recoverable() => {
            warn!(error = %e, "modern search failed; degrading to legacy search");
            Some(e)
        }
        Err(e) => return Err(e),
    };

    let secondary = backend
        .legacy_search(&legacy_request(query, opts))
        .await
        .and_then(|raw| normalize_search_results(&raw));

    match secondary {
        Ok(results) => Ok(SearchOutcome {
            results,
            plan,
            surface: Surface::Legacy,
        }),
        Err(e) if e.is_auth() || primary_error.is_some() => Err(e),
        Err(e) => {
            warn!(error = %e, "legacy broadening failed; returning empty modern result");
            Ok(SearchOutcome {
                results: Vec::new(),
                plan,
                surface: Surface::Modern,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::scripted::{Op, ScriptedBackend};
    use crate::planner::BackendMode;
    use serde_json::json;

    fn unavailable() -> RelayError {
        RelayError::Backend {
            status: 503,
            message: "Service Unavailable".into(),
        }
    }

    fn hits(ids: &[&str]) -> serde_json::Value {
        let items: Vec<_> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                json!({"id": id, "url": format!("https://e.com/{}", id), "relevance_score": 1.0 - i as f64 * 0.1})
            })
            .collect();
        json!({ "results": items })
    }

    #[tokio::test]
    async fn test_primary_hits_skip_legacy() {
        let backend = ScriptedBackend::new().respond(Op::Search, Ok(hits(&["a", "b"])));
        let opts = SearchOptions {
            include_full_content: true,
            ..Default::default()
        };
        let out = search(&backend, "focus", &opts).await.unwrap();
        assert_eq!(out.results.len(), 2);
        assert_eq!(out.surface, Surface::Modern);
        assert_eq!(backend.calls(Op::LegacySearch), 0);
    }

    #[tokio::test]
    async fn test_primary_error_invokes_legacy_once() {
        let backend = ScriptedBackend::new()
            .respond(Op::Search, Err(unavailable()))
            .respond(Op::LegacySearch, Ok(hits(&["x"])));
        let out = search(&backend, "productivity", &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(out.surface, Surface::Legacy);
        assert_eq!(out.results[0].content.id, "x");
        assert_eq!(backend.calls(Op::LegacySearch), 1);
        assert_eq!(backend.sequence(), vec![Op::Search, Op::LegacySearch]);
    }

    #[tokio::test]
    async fn test_empty_primary_broadens_unless_full_content() {
        let backend = ScriptedBackend::new()
            .respond(Op::Search, Ok(json!({"results": []})))
            .respond(Op::LegacySearch, Ok(hits(&["late"])));
        let out = search(&backend, "q", &SearchOptions::default()).await.unwrap();
        assert_eq!(out.results.len(), 1);
        assert_eq!(backend.calls(Op::LegacySearch), 1);

        let backend = ScriptedBackend::new().respond(Op::Search, Ok(json!([])));
        let opts = SearchOptions {
            include_full_content: true,
            ..Default::default()
        };
        let out = search(&backend, "q", &opts).await.unwrap();
        assert!(out.results.is_empty());
        assert_eq!(backend.calls(Op::LegacySearch), 0);
    }

    #[tokio::test]
    async fn test_auth_error_never_falls_back() {
        let backend = ScriptedBackend::new()
            .respond(Op::Search, Err(RelayError::Auth("expired".into())))
            .respond(Op::LegacySearch, Ok(hits(&["x"])));
        let err = search(&backend, "q", &SearchOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_auth());
        assert_eq!(backend.calls(Op::LegacySearch), 0);
    }

    #[tokio::test]
    async fn test_both_tiers_fail_returns_last_error() {
        let backend = ScriptedBackend::new()
            .respond(Op::Search, Err(unavailable()))
            .respond(
                Op::LegacySearch,
                Err(RelayError::Transport("connection reset".into())),
            );
        let err = search(&backend, "q", &SearchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Transport(_)));
    }

    #[tokio::test]
    async fn test_failed_broadening_yields_empty() {
        let backend = ScriptedBackend::new()
            .respond(Op::Search, Ok(json!([])))
            .respond(Op::LegacySearch, Err(unavailable()));
        let out = search(&backend, "q", &SearchOptions::default()).await.unwrap();
        assert!(out.results.is_empty());
    }

    #[tokio::test]
    async fn test_backend_order_is_preserved() {
        let raw = json!([
            {"id": "low", "url": "u", "relevanceScore": 0.2},
            {"id": "high", "url": "u", "relevanceScore": 0.9}
        ]);
        let backend = ScriptedBackend::new().respond(Op::Search, Ok(raw));
        let out = search(&backend, "q", &SearchOptions::default()).await.unwrap();
        let ids: Vec<&str> = out.results.iter().map(|r| r.content.id.as_str()).collect();
        assert_eq!(ids, vec!["low", "high"]);
    }

    #[tokio::test]
    async fn test_requests_carry_plan_and_reduced_legacy_options() {
        let backend = ScriptedBackend::new()
            .respond(Op::Search, Err(unavailable()))
            .respond(Op::LegacySearch, Ok(json!([])));
        let opts = SearchOptions {
            mode: CallerMode::Phrase,
            expand_concepts: Some(false),
            limit: 7,
            content_types: vec![ContentType::Video, ContentType::Article],
            tags: vec!["ai".into(), "ml".into()],
            date_from: Some("2024-01-01".into()),
            ..Default::default()
        };
        let out = search(&backend, "deep work", &opts).await.unwrap();
        assert_eq!(out.plan.mode, BackendMode::Fulltext);

        let modern = &backend.requests(Op::Search)[0];
        assert_eq!(modern["mode"], "fulltext");
        assert_eq!(modern["options"]["expandConcepts"], false);
        assert_eq!(modern["filters"]["dateFrom"], "2024-01-01");

        let legacy = &backend.requests(Op::LegacySearch)[0];
        assert_eq!(
            legacy,
            &json!({"q": "deep work", "limit": "7", "type": "video", "tags": "ai,ml"})
        );
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let backend = ScriptedBackend::new();
        let err = search(&backend, "  ", &SearchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::InvalidRequest(_)));
        assert!(backend.sequence().is_empty());
    }
}
