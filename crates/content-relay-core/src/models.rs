//! Canonical data model.
//!
//! Every record that reaches caller-visible data has passed through
//! [`crate::normalize`] and is expressed in these types. They serialize in
//! camelCase, which is the shape tool callers receive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Kind of saved item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    Video,
    SocialPost,
    ForumThread,
    #[default]
    Article,
    Document,
}

impl ContentType {
    pub const ALL: [ContentType; 5] = [
        ContentType::Video,
        ContentType::SocialPost,
        ContentType::ForumThread,
        ContentType::Article,
        ContentType::Document,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Video => "video",
            ContentType::SocialPost => "social-post",
            ContentType::ForumThread => "forum-thread",
            ContentType::Article => "article",
            ContentType::Document => "document",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    /// Accepts the canonical names plus the aliases the backend has used
    /// over time (`youtube`, `tweet`, `reddit`, `pdf`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "video" | "youtube" | "tiktok" => Ok(ContentType::Video),
            "social-post" | "social" | "post" | "tweet" | "twitter" | "x" | "instagram"
            | "linkedin" | "threads" => Ok(ContentType::SocialPost),
            "forum-thread" | "forum" | "thread" | "reddit" => Ok(ContentType::ForumThread),
            "article" | "web" | "webpage" | "blog" | "newsletter" => Ok(ContentType::Article),
            "document" | "doc" | "pdf" | "file" => Ok(ContentType::Document),
            _ => Err(format!("Unknown content type: {}", s)),
        }
    }
}

/// Processing lifecycle of a saved item on the remote service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    #[default]
    Completed,
    Failed,
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingStatus::Pending => write!(f, "pending"),
            ProcessingStatus::Processing => write!(f, "processing"),
            ProcessingStatus::Completed => write!(f, "completed"),
            ProcessingStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" | "queued" => Ok(ProcessingStatus::Pending),
            "processing" | "in_progress" | "in-progress" | "running" => {
                Ok(ProcessingStatus::Processing)
            }
            "completed" | "complete" | "done" | "processed" | "ready" => {
                Ok(ProcessingStatus::Completed)
            }
            "failed" | "error" => Ok(ProcessingStatus::Failed),
            _ => Err(format!("Unknown processing status: {}", s)),
        }
    }
}

/// A summary exactly as the backend sent it: plain text or a structured object.
///
/// The two shapes are never converted into one another; presentation code
/// decides how to render each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Summary {
    Text(String),
    Structured(Map<String, Value>),
}

impl Summary {
    /// Best one-line description available in either shape.
    pub fn headline(&self) -> Option<&str> {
        match self {
            Summary::Text(text) => Some(text.as_str()),
            Summary::Structured(map) => ["oneLineSummary", "one_line_summary", "summary", "tldr"]
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str)),
        }
    }

    /// Key insights listed in a structured summary (empty for plain text).
    pub fn key_insights(&self) -> Vec<&str> {
        self.structured_list(&["keyInsights", "key_insights", "insights"])
    }

    pub fn main_topics(&self) -> Vec<&str> {
        self.structured_list(&["mainTopics", "main_topics", "topics"])
    }

    pub fn actionable_takeaways(&self) -> Vec<&str> {
        self.structured_list(&["actionableTakeaways", "actionable_takeaways", "takeaways"])
    }

    fn structured_list(&self, keys: &[&str]) -> Vec<&str> {
        match self {
            Summary::Text(_) => Vec::new(),
            Summary::Structured(map) => keys
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_array))
                .map(|arr| arr.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default(),
        }
    }
}

/// A saved item on the remote service.
///
/// `id` and `url` are always present (possibly empty) after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub id: String,
    pub user_id: String,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content_type: ContentType,
    pub status: ProcessingStatus,
    pub summary: Option<Summary>,
    pub full_text: Option<String>,
    pub token_count: Option<u64>,
    pub thumbnail_url: Option<String>,
    pub metadata: Value,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Content {
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("(untitled)")
    }
}

/// A [`Content`] record as returned by a search, with its relevance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(flatten)]
    pub content: Content,
    /// Relevance in `[0.0, 1.0]`, as ranked by the backend.
    pub relevance_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_reason: Option<String>,
}

/// Caller-facing synthesis mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisMode {
    #[default]
    Overview,
    Deep,
    Actionable,
    Comparison,
}

impl SynthesisMode {
    /// Name of the equivalent mode in the backend's vocabulary.
    pub fn backend_name(&self) -> &'static str {
        match self {
            SynthesisMode::Overview => "overview",
            SynthesisMode::Deep => "thematic",
            SynthesisMode::Actionable => "actionable",
            SynthesisMode::Comparison => "comparative",
        }
    }
}

impl FromStr for SynthesisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "overview" => Ok(SynthesisMode::Overview),
            "deep" => Ok(SynthesisMode::Deep),
            "actionable" => Ok(SynthesisMode::Actionable),
            "comparison" => Ok(SynthesisMode::Comparison),
            _ => Err(format!(
                "Unknown synthesis mode: {}. Use overview, deep, actionable, or comparison.",
                s
            )),
        }
    }
}

/// Input to the synthesis orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub query: String,
    /// Explicit sources; when empty the orchestrator resolves its own.
    pub content_ids: Vec<String>,
    pub mode: SynthesisMode,
    pub find_contradictions: bool,
    pub find_connections: bool,
    pub max_sources: usize,
}

impl SynthesisRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            content_ids: Vec::new(),
            mode: SynthesisMode::Overview,
            find_contradictions: false,
            find_connections: true,
            max_sources: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Title or id of the source the insight was drawn from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub theme: String,
    pub frequency: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

/// Cross-source synthesis, reconciled from whichever shape the backend used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisResult {
    pub overview: Option<String>,
    pub insights: Vec<Insight>,
    pub themes: Vec<Theme>,
    pub connections: Vec<Connection>,
    pub knowledge_gaps: Vec<String>,
    pub contradictions: Vec<String>,
}

impl SynthesisResult {
    pub fn is_empty(&self) -> bool {
        self.overview.as_deref().map_or(true, |o| o.trim().is_empty())
            && self.insights.is_empty()
            && self.themes.is_empty()
            && self.connections.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameworkType {
    Methodology,
    Process,
    Framework,
    Pattern,
    Technique,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkStep {
    pub order: u32,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkComponent {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<String>,
}

/// A named methodology mined from synthesis prose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Framework {
    pub name: String,
    #[serde(rename = "type")]
    pub framework_type: FrameworkType,
    pub description: String,
    pub steps: Vec<FrameworkStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<FrameworkComponent>,
    pub use_cases: Vec<String>,
    /// In `[0.0, 0.95]`.
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Boolean flags a caller may toggle on a saved item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFlag {
    Favorite,
    Archived,
}

impl ContentFlag {
    /// Field name the backend uses for this flag.
    pub fn wire_field(&self) -> &'static str {
        match self {
            ContentFlag::Favorite => "isFavorite",
            ContentFlag::Archived => "isArchived",
        }
    }
}

impl FromStr for ContentFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "favorite" | "favourite" => Ok(ContentFlag::Favorite),
            "archived" | "archive" => Ok(ContentFlag::Archived),
            _ => Err(format!("Unknown flag: {}. Use favorite or archived.", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_type_aliases() {
        assert_eq!("YouTube".parse::<ContentType>(), Ok(ContentType::Video));
        assert_eq!("social_post".parse::<ContentType>(), Ok(ContentType::SocialPost));
        assert_eq!("reddit".parse::<ContentType>(), Ok(ContentType::ForumThread));
        assert_eq!("pdf".parse::<ContentType>(), Ok(ContentType::Document));
        assert!("hologram".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_content_type_round_trips_through_display() {
        for ct in ContentType::ALL {
            assert_eq!(ct.to_string().parse::<ContentType>(), Ok(ct));
        }
    }

    #[test]
    fn test_synthesis_mode_backend_vocabulary() {
        assert_eq!(SynthesisMode::Overview.backend_name(), "overview");
        assert_eq!(SynthesisMode::Deep.backend_name(), "thematic");
        assert_eq!(SynthesisMode::Actionable.backend_name(), "actionable");
        assert_eq!(SynthesisMode::Comparison.backend_name(), "comparative");
    }

    #[test]
    fn test_summary_shapes_are_preserved() {
        let text: Summary = serde_json::from_value(json!("short take")).unwrap();
        assert_eq!(text, Summary::Text("short take".into()));
        assert_eq!(text.headline(), Some("short take"));
        assert!(text.key_insights().is_empty());

        let structured: Summary = serde_json::from_value(json!({
            "oneLineSummary": "one liner",
            "key_insights": ["a", "b"]
        }))
        .unwrap();
        assert!(matches!(structured, Summary::Structured(_)));
        assert_eq!(structured.headline(), Some("one liner"));
        assert_eq!(structured.key_insights(), vec!["a", "b"]);
    }

    #[test]
    fn test_framework_serializes_type_field() {
        let fw = Framework {
            name: "Loop Method".into(),
            framework_type: FrameworkType::Technique,
            description: String::new(),
            steps: vec![],
            components: vec![],
            use_cases: vec![],
            confidence: 0.65,
            source: None,
        };
        let v = serde_json::to_value(&fw).unwrap();
        assert_eq!(v["type"], "technique");
        assert!(v.get("components").is_none());
        assert!(v.get("useCases").is_some());
    }
}
