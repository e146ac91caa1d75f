//! Query-mode planner.
//!
//! Maps the caller's search intent onto one of the backend's search
//! strategies. The mapping is pure and total: every input yields exactly one
//! plan and there is no error path.
//!
//! # Rules (in priority order)
//!
//! | Condition | Backend mode |
//! |-----------|--------------|
//! | concept expansion explicitly `true` | `semantic` |
//! | caller mode `phrase` or `all` | `fulltext` |
//! | caller mode `any` | `hybrid` |
//! | caller mode `semantic` / `hybrid` / `fulltext` | same |
//! | anything else | `smart` |
//!
//! Concept expansion resolves to `true` unless the caller set it to `false`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-facing search mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallerMode {
    #[default]
    Smart,
    Semantic,
    Hybrid,
    Fulltext,
    Any,
    All,
    Phrase,
}

impl CallerMode {
    pub const ALL: [CallerMode; 7] = [
        CallerMode::Smart,
        CallerMode::Semantic,
        CallerMode::Hybrid,
        CallerMode::Fulltext,
        CallerMode::Any,
        CallerMode::All,
        CallerMode::Phrase,
    ];

    /// Parse a free-form mode name. Unrecognized names fall back to `Smart`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "semantic" | "vector" | "concept" => CallerMode::Semantic,
            "hybrid" => CallerMode::Hybrid,
            "fulltext" | "full-text" | "full_text" | "keyword" => CallerMode::Fulltext,
            "any" | "or" => CallerMode::Any,
            "all" | "and" => CallerMode::All,
            "phrase" | "exact" => CallerMode::Phrase,
            _ => CallerMode::Smart,
        }
    }
}

/// Search strategy understood by the modern backend surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    #[default]
    Smart,
    Semantic,
    Hybrid,
    Fulltext,
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendMode::Smart => write!(f, "smart"),
            BackendMode::Semantic => write!(f, "semantic"),
            BackendMode::Hybrid => write!(f, "hybrid"),
            BackendMode::Fulltext => write!(f, "fulltext"),
        }
    }
}

/// Resolved strategy for one search call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlan {
    pub mode: BackendMode,
    pub expand_concepts: bool,
}

/// Plan a search from the caller's mode and concept-expansion flag.
pub fn plan(mode: CallerMode, expand_concepts: Option<bool>) -> QueryPlan {
    let backend = if expand_concepts == Some(true) {
        BackendMode::Semantic
    } else {
        match mode {
            CallerMode::Phrase | CallerMode::All | CallerMode::Fulltext => BackendMode::Fulltext,
            CallerMode::Any | CallerMode::Hybrid => BackendMode::Hybrid,
            CallerMode::Semantic => BackendMode::Semantic,
            CallerMode::Smart => BackendMode::Smart,
        }
    };

    QueryPlan {
        mode: backend,
        expand_concepts: expand_concepts.unwrap_or(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrase_and_all_use_fulltext() {
        assert_eq!(plan(CallerMode::Phrase, None).mode, BackendMode::Fulltext);
        assert_eq!(plan(CallerMode::All, Some(false)).mode, BackendMode::Fulltext);
    }

    #[test]
    fn test_any_uses_hybrid() {
        assert_eq!(plan(CallerMode::Any, None).mode, BackendMode::Hybrid);
    }

    #[test]
    fn test_default_is_smart_with_expansion() {
        let p = plan(CallerMode::default(), None);
        assert_eq!(p.mode, BackendMode::Smart);
        assert!(p.expand_concepts);
    }

    #[test]
    fn test_explicit_false_disables_expansion() {
        assert!(!plan(CallerMode::Smart, Some(false)).expand_concepts);
    }

    #[test]
    fn test_expansion_true_always_semantic() {
        for mode in CallerMode::ALL {
            let p = plan(mode, Some(true));
            assert_eq!(p.mode, BackendMode::Semantic, "mode {:?}", mode);
            assert!(p.expand_concepts);
        }
    }

    #[test]
    fn test_plan_is_total_and_deterministic() {
        for mode in CallerMode::ALL {
            for expand in [None, Some(true), Some(false)] {
                assert_eq!(plan(mode, expand), plan(mode, expand));
            }
        }
    }

    #[test]
    fn test_lenient_parse() {
        assert_eq!(CallerMode::parse_lenient("PHRASE"), CallerMode::Phrase);
        assert_eq!(CallerMode::parse_lenient("any"), CallerMode::Any);
        assert_eq!(CallerMode::parse_lenient("whatever"), CallerMode::Smart);
        assert_eq!(CallerMode::parse_lenient(""), CallerMode::Smart);
    }
}
