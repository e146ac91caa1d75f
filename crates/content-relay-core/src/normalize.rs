//! Response normalizer.
//!
//! Converts whatever JSON the backend produced (camelCase or snake_case,
//! nested or flat, string-or-object fields) into the canonical model in
//! [`crate::models`]. Each field is resolved through an explicit priority
//! table: the camelCase name wins, then its snake_case twin, then older
//! aliases, then a literal default.
//!
//! # Defaults
//!
//! | Field | Default when absent |
//! |-------|---------------------|
//! | `id`, `userId`, `url` | `""` |
//! | `contentType` | `article` |
//! | `status` | `completed` |
//! | optional text | `None` |
//! | `tags` | `[]` |
//! | `metadata` | `{}` |
//! | timestamps | now |
//!
//! Values that are present but cannot be interpreted produce a
//! [`RelayError::SchemaViolation`] carrying the raw payload.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::error::{RelayError, RelayResult};
use crate::models::{
    Connection, Content, ContentType, Insight, ProcessingStatus, SearchResult, Summary,
    SynthesisResult, Theme,
};

// ============ Field priority tables ============

const ID_KEYS: &[&str] = &["id", "_id", "contentId", "content_id"];
const USER_ID_KEYS: &[&str] = &["userId", "user_id", "ownerId", "owner_id"];
const URL_KEYS: &[&str] = &["url", "sourceUrl", "source_url", "originalUrl", "original_url"];
const TITLE_KEYS: &[&str] = &["title", "name"];
const DESCRIPTION_KEYS: &[&str] = &["description", "excerpt"];
const CONTENT_TYPE_KEYS: &[&str] = &["contentType", "content_type", "type"];
const STATUS_KEYS: &[&str] = &["status", "processingStatus", "processing_status"];
const SUMMARY_KEYS: &[&str] = &["summary", "aiSummary", "ai_summary"];
const FULL_TEXT_KEYS: &[&str] = &[
    "fullText",
    "full_text",
    "extractedText",
    "extracted_text",
    "content",
    "text",
    "body",
];
const TOKEN_COUNT_KEYS: &[&str] = &[
    "tokenCount",
    "token_count",
    "estimatedTokens",
    "estimated_tokens",
];
const THUMBNAIL_KEYS: &[&str] = &[
    "thumbnailUrl",
    "thumbnail_url",
    "previewImage",
    "preview_image",
    "imageUrl",
    "image_url",
];
const METADATA_KEYS: &[&str] = &["processingMetadata", "processing_metadata", "metadata"];
const TAGS_KEYS: &[&str] = &["tags", "tagNames", "tag_names"];
const CREATED_KEYS: &[&str] = &["createdAt", "created_at", "savedAt", "saved_at"];
const UPDATED_KEYS: &[&str] = &["updatedAt", "updated_at", "modifiedAt", "modified_at"];

const SCORE_KEYS: &[&str] = &[
    "relevanceScore",
    "relevance_score",
    "score",
    "similarity",
    "rank",
];
const MATCH_REASON_KEYS: &[&str] = &["matchReason", "match_reason", "explanation", "reason"];
const NESTED_RECORD_KEYS: &[&str] = &["content", "item", "record", "document"];

const LIST_KEYS: &[&str] = &["results", "items", "data", "content", "contents", "records"];
const SINGLE_WRAPPER_KEYS: &[&str] = &["content", "data", "item"];

const OVERVIEW_KEYS: &[&str] = &[
    "overview",
    "summary",
    "executiveSummary",
    "executive_summary",
    "synthesis",
];
const INSIGHT_KEYS: &[&str] = &[
    "insights",
    "actionableInsights",
    "actionable_insights",
    "keyInsights",
    "key_insights",
];
const THEME_KEYS: &[&str] = &["themes", "keyThemes", "key_themes", "mainThemes", "main_themes"];
const CONNECTION_KEYS: &[&str] = &[
    "connections",
    "patterns",
    "crossConnections",
    "cross_connections",
    "crossSourceConnections",
];
const GAP_KEYS: &[&str] = &["knowledgeGaps", "knowledge_gaps", "gaps"];
const CONTRADICTION_KEYS: &[&str] = &["contradictions", "conflicts"];

// ============ Public entry points ============

/// Normalize a single Content-like record.
pub fn normalize_content(raw: &Value) -> RelayResult<Content> {
    let obj = as_object(raw, "content record")?;

    let content_type = match pick_str(obj, CONTENT_TYPE_KEYS, raw)? {
        Some(s) => s
            .parse::<ContentType>()
            .map_err(|e| RelayError::schema(e, raw))?,
        None => ContentType::default(),
    };

    let status = match pick_str(obj, STATUS_KEYS, raw)? {
        Some(s) => s
            .parse::<ProcessingStatus>()
            .map_err(|e| RelayError::schema(e, raw))?,
        None => ProcessingStatus::default(),
    };

    let now = Utc::now();
    let created_at = match pick(obj, CREATED_KEYS) {
        Some(v) => parse_timestamp(v, raw)?,
        None => now,
    };
    let updated_at = match pick(obj, UPDATED_KEYS) {
        Some(v) => parse_timestamp(v, raw)?,
        None => now,
    };

    Ok(Content {
        id: pick_str(obj, ID_KEYS, raw)?.unwrap_or_default(),
        user_id: pick_str(obj, USER_ID_KEYS, raw)?.unwrap_or_default(),
        url: pick_str(obj, URL_KEYS, raw)?.unwrap_or_default(),
        title: pick_str(obj, TITLE_KEYS, raw)?,
        description: pick_str(obj, DESCRIPTION_KEYS, raw)?,
        content_type,
        status,
        summary: parse_summary(obj, raw)?,
        full_text: first_string(obj, FULL_TEXT_KEYS),
        token_count: parse_token_count(obj, raw)?,
        thumbnail_url: pick_str(obj, THUMBNAIL_KEYS, raw)?,
        metadata: pick(obj, METADATA_KEYS)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())),
        tags: parse_tags(obj, raw)?,
        created_at,
        updated_at,
    })
}

/// Normalize a SearchResult-like record, nested (`{content, score}`) or flat.
pub fn normalize_search_result(raw: &Value) -> RelayResult<SearchResult> {
    let obj = as_object(raw, "search result")?;

    let inner = NESTED_RECORD_KEYS
        .iter()
        .find_map(|k| obj.get(*k).filter(|v| v.is_object()))
        .unwrap_or(raw);

    let content = normalize_content(inner)?;

    let relevance_score = match pick(obj, SCORE_KEYS) {
        Some(v) => parse_score(v, raw)?,
        None => 0.0,
    };

    Ok(SearchResult {
        content,
        relevance_score,
        match_reason: pick_str(obj, MATCH_REASON_KEYS, raw)?,
    })
}

/// Normalize every record of a list response into [`Content`].
pub fn normalize_content_list(raw: &Value) -> RelayResult<Vec<Content>> {
    extract_records(raw)?
        .into_iter()
        .map(|r| normalize_content(unwrap_record(r)))
        .collect()
}

/// Normalize every record of a search response into [`SearchResult`].
pub fn normalize_search_results(raw: &Value) -> RelayResult<Vec<SearchResult>> {
    extract_records(raw)?
        .into_iter()
        .map(normalize_search_result)
        .collect()
}

/// Normalize a single-record response (bare, or wrapped in `content`/`data`).
pub fn normalize_single(raw: &Value) -> RelayResult<Content> {
    normalize_content(unwrap_record(raw))
}

/// Locate the record list inside a list response.
///
/// Accepts a bare array, or an object carrying the list under one of
/// `results`, `items`, `data`, `content`, `contents`, `records` (one level of
/// nesting under `data` is also accepted). An empty object, or an object whose
/// list key is `null`, is an empty list.
pub fn extract_records(raw: &Value) -> RelayResult<Vec<&Value>> {
    match raw {
        Value::Array(items) => Ok(items.iter().collect()),
        Value::Object(obj) => {
            for key in LIST_KEYS {
                match obj.get(*key) {
                    Some(Value::Array(items)) => return Ok(items.iter().collect()),
                    Some(Value::Null) => return Ok(Vec::new()),
                    Some(nested @ Value::Object(inner)) if *key == "data" => {
                        if LIST_KEYS.iter().any(|k| inner.contains_key(*k)) {
                            return extract_records(nested);
                        }
                    }
                    _ => {}
                }
            }
            if obj.is_empty() || obj.contains_key("total") || obj.contains_key("count") {
                Ok(Vec::new())
            } else {
                Err(RelayError::schema("expected a list of records", raw))
            }
        }
        Value::Null => Ok(Vec::new()),
        _ => Err(RelayError::schema("expected a list of records", raw)),
    }
}

/// Strip `content` / `data` / `item` wrappers around a single record.
pub fn unwrap_record(raw: &Value) -> &Value {
    let mut current = raw;
    for _ in 0..3 {
        let next = current.as_object().and_then(|obj| {
            if ID_KEYS.iter().any(|k| obj.contains_key(*k)) {
                return None;
            }
            SINGLE_WRAPPER_KEYS
                .iter()
                .find_map(|k| obj.get(*k).filter(|v| v.is_object()))
        });
        match next {
            Some(inner) => current = inner,
            None => break,
        }
    }
    current
}

/// Reconcile a synthesis response, nested under `synthesis`/`data` or flat.
pub fn normalize_synthesis(raw: &Value) -> RelayResult<SynthesisResult> {
    let body = unwrap_synthesis(raw);
    let obj = as_object(body, "synthesis result")?;

    let overview = OVERVIEW_KEYS.iter().find_map(|k| match obj.get(*k) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::Object(o)) => o.get("text").and_then(Value::as_str).map(str::to_string),
        _ => None,
    });

    let insights = pick_array(obj, INSIGHT_KEYS)
        .map(|items| items.iter().filter_map(parse_insight).collect())
        .unwrap_or_default();

    let themes = pick_array(obj, THEME_KEYS)
        .map(|items| items.iter().filter_map(parse_theme).collect())
        .unwrap_or_default();

    let connections = pick_array(obj, CONNECTION_KEYS)
        .map(|items| items.iter().filter_map(parse_connection).collect())
        .unwrap_or_default();

    let knowledge_gaps = pick_array(obj, GAP_KEYS)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| text_of(v, &["gap", "description", "text", "question"]))
                .collect()
        })
        .unwrap_or_default();

    let contradictions = pick_array(obj, CONTRADICTION_KEYS)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| text_of(v, &["description", "contradiction", "text", "summary"]))
                .collect()
        })
        .unwrap_or_default();

    Ok(SynthesisResult {
        overview,
        insights,
        themes,
        connections,
        knowledge_gaps,
        contradictions,
    })
}

// ============ Field helpers ============

fn as_object<'a>(raw: &'a Value, what: &str) -> RelayResult<&'a Map<String, Value>> {
    raw.as_object()
        .ok_or_else(|| RelayError::schema(format!("{} must be a JSON object", what), raw))
}

/// First non-null value among `keys`.
fn pick<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
}

fn pick_array<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_array))
}

/// Scalar text field. Numbers and booleans are stringified; arrays and
/// objects are a schema violation.
fn pick_str(obj: &Map<String, Value>, keys: &[&str], raw: &Value) -> RelayResult<Option<String>> {
    match pick(obj, keys) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => Err(RelayError::schema(
            format!("field '{}' must be a scalar", first_present(obj, keys)),
            raw,
        )),
    }
}

/// First value among `keys` that is a string; other shapes are skipped.
fn first_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

fn first_present<'a>(obj: &Map<String, Value>, keys: &[&'a str]) -> &'a str {
    keys.iter()
        .find(|k| obj.get(**k).is_some_and(|v| !v.is_null()))
        .copied()
        .unwrap_or("?")
}

fn parse_summary(obj: &Map<String, Value>, raw: &Value) -> RelayResult<Option<Summary>> {
    match pick(obj, SUMMARY_KEYS) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(Summary::Text(s.clone()))),
        Some(Value::Object(map)) => Ok(Some(Summary::Structured(map.clone()))),
        Some(_) => Err(RelayError::schema(
            "summary must be a string or an object",
            raw,
        )),
    }
}

fn parse_token_count(obj: &Map<String, Value>, raw: &Value) -> RelayResult<Option<u64>> {
    let value = pick(obj, TOKEN_COUNT_KEYS).or_else(|| {
        pick(obj, METADATA_KEYS)
            .and_then(Value::as_object)
            .and_then(|m| pick(m, TOKEN_COUNT_KEYS))
    });

    match value {
        None => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(u) = n.as_u64() {
                Ok(Some(u))
            } else {
                match n.as_f64() {
                    Some(f) if f >= 0.0 => Ok(Some(f.round() as u64)),
                    _ => Err(RelayError::schema("tokenCount must be non-negative", raw)),
                }
            }
        }
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| RelayError::schema("tokenCount must be numeric", raw)),
        Some(_) => Err(RelayError::schema("tokenCount must be numeric", raw)),
    }
}

fn parse_tags(obj: &Map<String, Value>, raw: &Value) -> RelayResult<Vec<String>> {
    match pick(obj, TAGS_KEYS) {
        None => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| tag_name(item).ok_or_else(|| RelayError::schema("malformed tag entry", raw)))
            .collect(),
        Some(_) => Err(RelayError::schema("tags must be a list", raw)),
    }
}

/// A tag is a bare string, `{name}`, `{tag: "..."}`, or `{tag: {name}}`.
fn tag_name(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Object(o) => ["name", "label", "tag"].iter().find_map(|k| match o.get(*k) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(nested @ Value::Object(_)) => tag_name(nested),
            _ => None,
        }),
        _ => None,
    }
}

fn parse_timestamp(v: &Value, raw: &Value) -> RelayResult<DateTime<Utc>> {
    let parsed = match v {
        Value::String(s) => parse_timestamp_str(s.trim()),
        Value::Number(n) => n.as_i64().and_then(|ts| {
            // Anything past year 5138 in seconds is almost certainly milliseconds.
            if ts.abs() > 100_000_000_000 {
                DateTime::from_timestamp_millis(ts)
            } else {
                DateTime::from_timestamp(ts, 0)
            }
        }),
        _ => None,
    };
    parsed.ok_or_else(|| RelayError::schema(format!("unparsable timestamp: {}", v), raw))
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_score(v: &Value, raw: &Value) -> RelayResult<f64> {
    let score = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| RelayError::schema("relevance score must be numeric", raw))?;

    Ok(score.clamp(0.0, 1.0))
}

// ============ Synthesis helpers ============

fn unwrap_synthesis(raw: &Value) -> &Value {
    let mut current = raw;
    for _ in 0..3 {
        let next = current.as_object().and_then(|obj| {
            ["synthesis", "data", "result"]
                .iter()
                .find_map(|k| obj.get(*k).filter(|v| v.is_object()))
        });
        match next {
            Some(inner) => current = inner,
            None => break,
        }
    }
    current
}

/// Text of a string-or-object list entry.
fn text_of(v: &Value, keys: &[&str]) -> Option<String> {
    let text = match v {
        Value::String(s) => Some(s.clone()),
        Value::Object(o) => first_string(o, keys),
        _ => None,
    }?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_insight(v: &Value) -> Option<Insight> {
    let text = text_of(v, &["text", "insight", "content", "description", "title"])?;
    let (category, source) = match v {
        Value::Object(o) => (
            first_string(o, &["category", "type", "kind"]),
            first_string(o, &["sourceTitle", "source_title", "source", "sourceId", "source_id"])
                .or_else(|| {
                    pick_array(o, &["sources", "sourceIds", "source_ids"])
                        .and_then(|arr| arr.iter().find_map(Value::as_str))
                        .map(str::to_string)
                }),
        ),
        _ => (None, None),
    };
    Some(Insight {
        text,
        category,
        source,
    })
}

fn parse_theme(v: &Value) -> Option<Theme> {
    let theme = text_of(v, &["theme", "name", "title", "label"])?;
    let (frequency, insight) = match v {
        Value::Object(o) => (
            pick(o, &["frequency", "count", "occurrences"])
                .and_then(Value::as_u64)
                .unwrap_or(1) as u32,
            first_string(o, &["insight", "description", "summary"]),
        ),
        _ => (1, None),
    };
    Some(Theme {
        theme,
        frequency,
        insight,
    })
}

fn parse_connection(v: &Value) -> Option<Connection> {
    let description = text_of(
        v,
        &["description", "connection", "pattern", "text", "insight"],
    )?;
    let sources = match v {
        Value::Object(o) => pick_array(o, &["sources", "sourceIds", "source_ids", "contentIds"])
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    };
    Some(Connection {
        description,
        sources,
    })
}
