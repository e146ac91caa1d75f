//! Request shapes sent to the two backend surfaces.
//!
//! The modern surface takes structured JSON bodies; the legacy surface takes
//! flat query strings and bodies. Both are built here from planner output so
//! the HTTP client only has to serialize them.

use serde::Serialize;

use crate::models::{ContentType, SynthesisRequest};
use crate::planner::BackendMode;

/// Body of `POST /api/v2/search`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModernSearchRequest {
    pub query: String,
    pub mode: BackendMode,
    pub filters: SearchFilters,
    pub options: SearchRequestOptions,
    pub features: SearchFeatures,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub content_types: Vec<ContentType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequestOptions {
    pub limit: usize,
    pub offset: usize,
    pub include_full_content: bool,
    pub expand_concepts: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFeatures {
    pub explain_matches: bool,
}

/// Parameters of `GET /api/search`.
///
/// The legacy surface understands only the query text, a limit, a single
/// content type, and tags.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacySearchRequest {
    pub query: String,
    pub limit: usize,
    pub content_type: Option<ContentType>,
    pub tags: Vec<String>,
}

impl LegacySearchRequest {
    /// Query-string pairs in the order the legacy endpoint documents them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("q", self.query.clone()), ("limit", self.limit.to_string())];
        if let Some(ct) = self.content_type {
            pairs.push(("type", ct.to_string()));
        }
        if !self.tags.is_empty() {
            pairs.push(("tags", self.tags.join(",")));
        }
        pairs
    }
}

/// Body of `POST /api/v2/synthesis`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModernSynthesisRequest {
    pub sources: SynthesisSources,
    pub synthesis: SynthesisOptions,
    pub output: SynthesisOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisSources {
    pub content_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisOptions {
    /// Backend vocabulary: overview, thematic, actionable, comparative.
    pub mode: String,
    pub query: String,
    pub find_contradictions: bool,
    pub find_connections: bool,
    pub max_sources: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisOutput {
    pub format: String,
}

impl ModernSynthesisRequest {
    pub fn build(request: &SynthesisRequest, source_ids: &[String]) -> Self {
        Self {
            sources: SynthesisSources {
                content_ids: source_ids.to_vec(),
            },
            synthesis: SynthesisOptions {
                mode: request.mode.backend_name().to_string(),
                query: request.query.clone(),
                find_contradictions: request.find_contradictions,
                find_connections: request.find_connections,
                max_sources: request.max_sources,
            },
            output: SynthesisOutput {
                format: "json".to_string(),
            },
        }
    }
}

/// Body of `POST /api/synthesize`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacySynthesisRequest {
    pub content_ids: Vec<String>,
    pub query: String,
    pub mode: String,
}

impl LegacySynthesisRequest {
    pub fn build(request: &SynthesisRequest, source_ids: &[String]) -> Self {
        Self {
            content_ids: source_ids.to_vec(),
            query: request.query.clone(),
            mode: request.mode.backend_name().to_string(),
        }
    }
}
