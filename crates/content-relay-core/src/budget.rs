//! Token budget guard.
//!
//! Classifies an estimated response size into a warning tier and decides
//! whether full text may be released. Lower tiers only attach an advisory
//! note; past the configured threshold the full text is replaced by a
//! bounded preview unless the caller sets the override parameter.
//!
//! # Tiers
//!
//! | Tier | Estimated tokens |
//! |------|------------------|
//! | `none` | ≤ 1,000 |
//! | `mild` | ≤ 5,000 |
//! | `strong` | ≤ 10,000 |
//! | `critical` | ≤ 50,000 |
//! | `extreme` | > 50,000 |
//!
//! Above 100,000 tokens the advisory also warns about context-window size.

use serde::Serialize;

use crate::models::{Content, ContentType, Summary};

/// Name of the parameter a caller sets to receive oversized text anyway.
pub const OVERRIDE_PARAM: &str = "allow_large_content";

pub const MILD_THRESHOLD: u64 = 1_000;
pub const STRONG_THRESHOLD: u64 = 5_000;
pub const CRITICAL_THRESHOLD: u64 = 10_000;
pub const EXTREME_THRESHOLD: u64 = 50_000;
pub const CONTEXT_WINDOW_WARNING: u64 = 100_000;

/// Default cutover for single-item full-text retrieval.
pub const DEFAULT_SINGLE_ITEM_THRESHOLD: u64 = CRITICAL_THRESHOLD;
/// Default cutover for aggregate multi-item batches.
pub const DEFAULT_BATCH_THRESHOLD: u64 = EXTREME_THRESHOLD;
pub const DEFAULT_PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenTier {
    None,
    Mild,
    Strong,
    Critical,
    Extreme,
}

/// Classify a token estimate. Monotonic in `tokens`.
pub fn classify(tokens: u64) -> TokenTier {
    if tokens > EXTREME_THRESHOLD {
        TokenTier::Extreme
    } else if tokens > CRITICAL_THRESHOLD {
        TokenTier::Critical
    } else if tokens > STRONG_THRESHOLD {
        TokenTier::Strong
    } else if tokens > MILD_THRESHOLD {
        TokenTier::Mild
    } else {
        TokenTier::None
    }
}

/// `ceil(words × 1.3)`, computed in integers.
pub fn estimate_from_words(text: &str) -> u64 {
    let words = text.split_whitespace().count() as u64;
    (words * 13).div_ceil(10)
}

/// Token estimate for a record's full text: the reported count if the
/// backend supplied one, otherwise derived from the word count.
pub fn estimate_content(content: &Content) -> u64 {
    content
        .token_count
        .or_else(|| content.full_text.as_deref().map(estimate_from_words))
        .unwrap_or(0)
}

/// Combined estimate of several records. Backend-reported counts are
/// untrusted, so the sum saturates instead of overflowing.
pub fn estimate_total<'a>(items: impl IntoIterator<Item = &'a Content>) -> u64 {
    items
        .into_iter()
        .map(estimate_content)
        .fold(0u64, u64::saturating_add)
}

/// Advisory note for a tier, or `None` when the payload is small.
pub fn advisory(tier: TokenTier, tokens: u64) -> Option<String> {
    let note = match tier {
        TokenTier::None => return None,
        TokenTier::Mild => format!("Moderate payload (~{} tokens).", tokens),
        TokenTier::Strong => format!(
            "Large payload (~{} tokens); consider requesting a summary instead.",
            tokens
        ),
        TokenTier::Critical => format!(
            "Very large payload (~{} tokens); this will consume a significant share of the context budget.",
            tokens
        ),
        TokenTier::Extreme => format!(
            "Extremely large payload (~{} tokens); prefer summaries or targeted searches.",
            tokens
        ),
    };
    if tokens > CONTEXT_WINDOW_WARNING {
        Some(format!(
            "{} It may exceed a typical model context window.",
            note
        ))
    } else {
        Some(note)
    }
}

/// Gate configuration for one entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetGate {
    /// Estimates strictly above this are withheld without the override.
    pub threshold: u64,
    /// Characters of text included in a preview.
    pub preview_chars: usize,
}

impl BudgetGate {
    pub fn single_item() -> Self {
        Self {
            threshold: DEFAULT_SINGLE_ITEM_THRESHOLD,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    pub fn batch() -> Self {
        Self {
            threshold: DEFAULT_BATCH_THRESHOLD,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    /// Whether `tokens` must be withheld pending the override.
    pub fn blocks(&self, tokens: u64, allow_large: bool) -> bool {
        tokens > self.threshold && !allow_large
    }

    /// Message attached to an aggregate this gate withheld.
    pub fn withheld_note(&self, total: u64) -> String {
        format!(
            "Combined full text is ~{} tokens (limit {}). Call again with {}=true to receive it.",
            total, self.threshold, OVERRIDE_PARAM
        )
    }
}

/// Bounded stand-in for a record whose text was withheld.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPreview {
    pub id: String,
    pub title: Option<String>,
    pub content_type: ContentType,
    pub url: String,
    pub summary: Option<Summary>,
    pub text_preview: String,
    pub truncated: bool,
}

impl ContentPreview {
    pub fn from_content(content: &Content, chars: usize) -> Self {
        let text = content.full_text.as_deref().unwrap_or("");
        let text_preview: String = text.chars().take(chars).collect();
        let truncated = text_preview.len() < text.len();
        Self {
            id: content.id.clone(),
            title: content.title.clone(),
            content_type: content.content_type,
            url: content.url.clone(),
            summary: content.summary.clone(),
            text_preview,
            truncated,
        }
    }
}

/// Outcome of gating a single record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ContentRelease {
    Full {
        content: Box<Content>,
        #[serde(rename = "tokenEstimate")]
        token_estimate: u64,
        tier: TokenTier,
        #[serde(skip_serializing_if = "Option::is_none")]
        advisory: Option<String>,
    },
    RequiresConfirmation {
        preview: ContentPreview,
        #[serde(rename = "tokenEstimate")]
        token_estimate: u64,
        tier: TokenTier,
        #[serde(rename = "overrideParam")]
        override_param: &'static str,
        message: String,
    },
}

impl ContentRelease {
    pub fn is_preview(&self) -> bool {
        matches!(self, ContentRelease::RequiresConfirmation { .. })
    }
}

/// Gate a single record's full text.
pub fn gate_single(content: Content, gate: &BudgetGate, allow_large: bool) -> ContentRelease {
    let tokens = estimate_content(&content);
    let tier = classify(tokens);

    if gate.blocks(tokens, allow_large) {
        ContentRelease::RequiresConfirmation {
            preview: ContentPreview::from_content(&content, gate.preview_chars),
            token_estimate: tokens,
            tier,
            override_param: OVERRIDE_PARAM,
            message: format!(
                "Full text is ~{} tokens (limit {}). Showing a preview; call again with {}=true to receive the full text.",
                tokens, gate.threshold, OVERRIDE_PARAM
            ),
        }
    } else {
        ContentRelease::Full {
            content: Box::new(content),
            token_estimate: tokens,
            tier,
            advisory: advisory(tier, tokens),
        }
    }
}

/// One entry of a gated batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchItem {
    Full(Box<Content>),
    Preview(ContentPreview),
}

/// Outcome of gating a multi-item batch on its aggregate size.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRelease {
    pub items: Vec<BatchItem>,
    pub total_token_estimate: u64,
    pub tier: TokenTier,
    /// True when full text was withheld from every item.
    pub requires_confirmation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_param: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

/// Gate a batch: if the aggregate estimate exceeds the threshold, every item
/// is reduced to a preview.
pub fn gate_batch(items: Vec<Content>, gate: &BudgetGate, allow_large: bool) -> BatchRelease {
    let total = estimate_total(&items);
    let tier = classify(total);

    if gate.blocks(total, allow_large) {
        BatchRelease {
            items: items
                .iter()
                .map(|c| BatchItem::Preview(ContentPreview::from_content(c, gate.preview_chars)))
                .collect(),
            total_token_estimate: total,
            tier,
            requires_confirmation: true,
            override_param: Some(OVERRIDE_PARAM),
            advisory: Some(gate.withheld_note(total)),
        }
    } else {
        BatchRelease {
            items: items.into_iter().map(|c| BatchItem::Full(Box::new(c))).collect(),
            total_token_estimate: total,
            tier,
            requires_confirmation: false,
            override_param: None,
            advisory: advisory(tier, total),
        }
    }
}

/// Release a record with its full text removed. Nothing is left to gate.
pub fn strip_text(mut content: Content) -> ContentRelease {
    content.full_text = None;
    ContentRelease::Full {
        content: Box::new(content),
        token_estimate: 0,
        tier: TokenTier::None,
        advisory: None,
    }
}

/// Batch counterpart of [`strip_text`].
pub fn strip_batch(items: Vec<Content>) -> BatchRelease {
    BatchRelease {
        items: items
            .into_iter()
            .map(|mut c| {
                c.full_text = None;
                BatchItem::Full(Box::new(c))
            })
            .collect(),
        total_token_estimate: 0,
        tier: TokenTier::None,
        requires_confirmation: false,
        override_param: None,
        advisory: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_content;
    use serde_json::json;

    fn content_with_tokens(id: &str, tokens: u64) -> Content {
        let mut c = normalize_content(&json!({"id": id, "title": "T", "url": "https://x"})).unwrap();
        c.token_count = Some(tokens);
        c.full_text = Some("word ".repeat(300));
        c
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(classify(0), TokenTier::None);
        assert_eq!(classify(1_000), TokenTier::None);
        assert_eq!(classify(1_001), TokenTier::Mild);
        assert_eq!(classify(5_000), TokenTier::Mild);
        assert_eq!(classify(5_001), TokenTier::Strong);
        assert_eq!(classify(10_000), TokenTier::Strong);
        assert_eq!(classify(10_001), TokenTier::Critical);
        assert_eq!(classify(50_000), TokenTier::Critical);
        assert_eq!(classify(50_001), TokenTier::Extreme);
        assert_eq!(classify(u64::MAX), TokenTier::Extreme);
    }

    #[test]
    fn test_classify_is_monotonic() {
        let samples = [
            0, 1, 999, 1_000, 1_001, 4_999, 5_000, 5_001, 9_999, 10_000, 10_001, 49_999, 50_000,
            50_001, 99_999, 100_000, 100_001, 1_000_000,
        ];
        for w in samples.windows(2) {
            assert!(classify(w[0]) <= classify(w[1]), "{} vs {}", w[0], w[1]);
        }
    }

    #[test]
    fn test_word_estimate_rounds_up() {
        assert_eq!(estimate_from_words(""), 0);
        assert_eq!(estimate_from_words("one"), 2);
        assert_eq!(estimate_from_words("a b c d e f g h i j"), 13);
    }

    #[test]
    fn test_estimate_prefers_reported_count() {
        let c = content_with_tokens("a", 7);
        assert_eq!(estimate_content(&c), 7);

        let mut derived = c.clone();
        derived.token_count = None;
        assert_eq!(estimate_content(&derived), 390);
    }

    #[test]
    fn test_large_single_item_gets_preview() {
        let c = content_with_tokens("big", 120_000);
        let release = gate_single(c, &BudgetGate::single_item(), false);
        match release {
            ContentRelease::RequiresConfirmation {
                preview,
                token_estimate,
                tier,
                override_param,
                ..
            } => {
                assert_eq!(token_estimate, 120_000);
                assert_eq!(tier, TokenTier::Extreme);
                assert_eq!(override_param, OVERRIDE_PARAM);
                assert_eq!(preview.text_preview.chars().count(), 500);
                assert!(preview.truncated);
            }
            other => panic!("expected preview, got {:?}", other),
        }
    }

    #[test]
    fn test_override_releases_full_text() {
        let c = content_with_tokens("big", 120_000);
        let release = gate_single(c, &BudgetGate::single_item(), true);
        match release {
            ContentRelease::Full {
                content, advisory, ..
            } => {
                assert!(content.full_text.is_some());
                assert!(advisory.unwrap().contains("context window"));
            }
            other => panic!("expected full content, got {:?}", other),
        }
    }

    #[test]
    fn test_lower_tiers_only_annotate() {
        let c = content_with_tokens("mid", 4_000);
        let release = gate_single(c, &BudgetGate::single_item(), false);
        match release {
            ContentRelease::Full { tier, advisory, .. } => {
                assert_eq!(tier, TokenTier::Mild);
                assert!(advisory.is_some());
            }
            other => panic!("expected full content, got {:?}", other),
        }
    }

    #[test]
    fn test_batch_threshold_is_aggregate() {
        let items = vec![
            content_with_tokens("a", 30_000),
            content_with_tokens("b", 30_000),
        ];
        let single_ok = gate_batch(items[..1].to_vec(), &BudgetGate::batch(), false);
        assert!(!single_ok.requires_confirmation);

        let gated = gate_batch(items, &BudgetGate::batch(), false);
        assert!(gated.requires_confirmation);
        assert_eq!(gated.total_token_estimate, 60_000);
        assert!(gated
            .items
            .iter()
            .all(|i| matches!(i, BatchItem::Preview(_))));
    }

    #[test]
    fn test_hostile_token_counts_saturate() {
        let items = vec![
            content_with_tokens("a", u64::MAX),
            content_with_tokens("b", u64::MAX - 1),
        ];
        assert_eq!(estimate_total(&items), u64::MAX);

        let gated = gate_batch(items, &BudgetGate::batch(), false);
        assert!(gated.requires_confirmation);
        assert_eq!(gated.total_token_estimate, u64::MAX);
        assert_eq!(gated.tier, TokenTier::Extreme);
    }

    #[test]
    fn test_gate_blocks_only_above_threshold_without_override() {
        let gate = BudgetGate::batch();
        assert!(!gate.blocks(DEFAULT_BATCH_THRESHOLD, false));
        assert!(gate.blocks(DEFAULT_BATCH_THRESHOLD + 1, false));
        assert!(!gate.blocks(DEFAULT_BATCH_THRESHOLD + 1, true));
        assert!(gate.withheld_note(60_000).contains(OVERRIDE_PARAM));
    }

    #[test]
    fn test_stripped_release_is_never_gated() {
        let release = strip_text(content_with_tokens("big", 120_000));
        match release {
            ContentRelease::Full { content, tier, .. } => {
                assert!(content.full_text.is_none());
                assert_eq!(tier, TokenTier::None);
            }
            other => panic!("expected full content, got {:?}", other),
        }
        let batch = strip_batch(vec![content_with_tokens("a", 90_000)]);
        assert!(!batch.requires_confirmation);
    }

    #[test]
    fn test_preview_serialization_names_override() {
        let release = gate_single(
            content_with_tokens("big", 60_000),
            &BudgetGate::single_item(),
            false,
        );
        let v = serde_json::to_value(&release).unwrap();
        assert_eq!(v["status"], "requires_confirmation");
        assert_eq!(v["overrideParam"], OVERRIDE_PARAM);
        assert_eq!(v["tokenEstimate"], 60_000);
    }
}
