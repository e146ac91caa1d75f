//! Framework extraction from synthesis prose.
//!
//! Mines named methodologies ("3-Step Growth Framework", "Pomodoro
//! Technique") out of synthesis insight text with pattern heuristics and
//! scores each with a deterministic confidence.
//!
//! # Pipeline
//!
//! 1. Keep insights mentioning framework / methodology / process / step /
//!    approach / system (case-insensitive).
//! 2. Name: a capitalized phrase ending in Framework, Method, Process,
//!    System, Approach, Model, or Strategy; otherwise the first sentence,
//!    cut to 50 characters.
//! 3. Steps: numbered markers at line or sentence starts (or inline
//!    `1. … 2. …` enumerations), numbers 1–20 only, quantity phrases
//!    ("8 seconds", "4 key elements") discarded, deduplicated by number and
//!    sorted.
//! 4. Confidence (see [`confidence`]), filter, sort, truncate.

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::models::{Framework, FrameworkComponent, FrameworkStep, FrameworkType, Insight};

const CANDIDATE_KEYWORDS: [&str; 6] = [
    "framework",
    "methodology",
    "process",
    "step",
    "approach",
    "system",
];

const MAX_STEP_NUMBER: u32 = 20;
const MIN_STEP_CLAUSE_CHARS: usize = 10;
const MAX_FALLBACK_NAME_CHARS: usize = 50;
const MAX_STEP_TITLE_CHARS: usize = 60;
pub const MAX_CONFIDENCE: f64 = 0.95;

/// First word of a clause that marks a quantity phrase rather than a step.
const QUANTITY_WORDS: &[&str] = &[
    "step", "steps", "part", "parts", "stage", "stages", "phase", "phases", "key", "main",
    "core", "way", "ways", "tip", "tips", "thing", "things", "element", "elements", "pillar",
    "pillars", "principle", "principles", "second", "seconds", "minute", "minutes", "hour",
    "hours", "day", "days", "week", "weeks", "month", "months", "year", "years", "time",
    "times", "percent", "people", "x",
];

static NAMED_FRAMEWORK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:[A-Z0-9][A-Za-z0-9'&-]*\s+){1,5}(?:Framework|Method|Process|System|Approach|Model|Strategy)\b",
    )
    .expect("named framework pattern")
});

static NAMED_FRAMEWORK_EXACT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:[A-Z0-9][A-Za-z0-9'&-]*\s+){1,5}(?:Framework|Method|Process|System|Approach|Model|Strategy)$",
    )
    .expect("exact named framework pattern")
});

/// "3-Step", "5 Pillars", or an acronym such as "ABC".
static NUMERIC_OR_LETTERED_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d+[-\s]?[A-Za-z]+\b|[A-Z]{2,}\b)").expect("prefix pattern")
});

static STEP_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?P<lead>^|[.!?:;]\s+|\s+)(?P<step>Step\s+)?(?P<num>\d{1,2})(?P<sep>[.:)]|\s*-|\s)\s*(?P<head>[A-Z])",
    )
    .expect("step marker pattern")
});

static COMPONENT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*[-*•]\s+(?P<name>[A-Z][^:\n]{1,40}):\s+(?P<desc>[^\n]+)$")
        .expect("component pattern")
});

static USE_CASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:use (?:it |this )?when|useful (?:for|when)|ideal for|best for|great for|works well for)\s+(?P<case>[^.;\n]+)",
    )
    .expect("use case pattern")
});

/// Filtering and truncation applied to the extracted set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionOptions {
    pub min_confidence: f64,
    pub limit: usize,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            min_confidence: 0.6,
            limit: 10,
        }
    }
}

/// Whether an insight's text looks like it describes a framework.
pub fn is_candidate(text: &str) -> bool {
    let lower = text.to_lowercase();
    CANDIDATE_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Extract, deduplicate, score, filter, and rank frameworks from insights.
pub fn extract_frameworks(
    insights: &[Insight],
    query: &str,
    opts: &ExtractionOptions,
) -> Vec<Framework> {
    let mut by_key: HashMap<String, usize> = HashMap::new();
    let mut frameworks: Vec<Framework> = Vec::new();

    for insight in insights {
        let Some(fw) = extract_from_insight(insight, query) else {
            continue;
        };
        let key = dedup_key(&fw.name);
        match by_key.get(&key) {
            Some(&idx) => {
                if fw.confidence > frameworks[idx].confidence {
                    frameworks[idx] = fw;
                }
            }
            None => {
                by_key.insert(key, frameworks.len());
                frameworks.push(fw);
            }
        }
    }

    frameworks.retain(|f| f.confidence >= opts.min_confidence);
    frameworks.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
    frameworks.truncate(opts.limit);
    frameworks
}

/// Build a framework record from one insight, if it is a candidate.
pub fn extract_from_insight(insight: &Insight, query: &str) -> Option<Framework> {
    let text = insight.text.trim();
    if text.is_empty() || !is_candidate(text) {
        return None;
    }

    let name = extract_name(text);
    if name.is_empty() {
        return None;
    }
    let steps = extract_steps(text);
    let description = text.to_string();
    let has_source = insight.source.as_deref().is_some_and(|s| !s.trim().is_empty());

    let mut use_cases = extract_use_cases(text);
    if use_cases.is_empty() && !query.trim().is_empty() {
        use_cases.push(query.trim().to_string());
    }

    Some(Framework {
        framework_type: classify_type(&name, text, steps.len()),
        confidence: confidence(&name, &description, &steps, has_source),
        components: extract_components(text),
        name,
        description,
        steps,
        use_cases,
        source: insight.source.clone().filter(|s| !s.trim().is_empty()),
    })
}

/// Framework name: the named-framework phrase if present, else the first
/// sentence cut to 50 characters.
pub fn extract_name(text: &str) -> String {
    if let Some(m) = NAMED_FRAMEWORK.find(text) {
        return collapse_whitespace(m.as_str());
    }
    let first = text
        .split(['.', '!', '?', ':', '\n'])
        .next()
        .unwrap_or("")
        .trim();
    collapse_whitespace(&truncate_chars(first, MAX_FALLBACK_NAME_CHARS))
}

/// Deterministic confidence in `[0.0, 0.95]`.
///
/// | Feature | Bonus |
/// |---------|-------|
/// | base | 0.50 |
/// | name matches the named-framework pattern | +0.15 |
/// | name has a numeric or lettered prefix | +0.10 |
/// | ≥ 2 steps | +0.10 |
/// | ≥ 4 steps | +0.05 |
/// | description > 100 chars | +0.05 |
/// | description > 200 chars | +0.05 |
/// | source attribution | +0.05 |
///
/// Scored in hundredths so equal inputs give bit-identical outputs.
pub fn confidence(name: &str, description: &str, steps: &[FrameworkStep], has_source: bool) -> f64 {
    let mut hundredths: u32 = 50;
    if NAMED_FRAMEWORK_EXACT.is_match(name) {
        hundredths += 15;
    }
    if NUMERIC_OR_LETTERED_PREFIX.is_match(name) {
        hundredths += 10;
    }
    if steps.len() >= 2 {
        hundredths += 10;
    }
    if steps.len() >= 4 {
        hundredths += 5;
    }
    let len = description.chars().count();
    if len > 100 {
        hundredths += 5;
    }
    if len > 200 {
        hundredths += 5;
    }
    if has_source {
        hundredths += 5;
    }
    (f64::from(hundredths.min(95)) / 100.0).min(MAX_CONFIDENCE)
}

// ============ Steps ============

struct StepCandidate {
    num: u32,
    clause: String,
}

/// Ordered steps found in `text`.
pub fn extract_steps(text: &str) -> Vec<FrameworkStep> {
    let markers: Vec<_> = STEP_MARKER.captures_iter(text).collect();
    let mut candidates: Vec<StepCandidate> = Vec::new();

    for (i, caps) in markers.iter().enumerate() {
        let (Some(lead), Some(num), Some(sep), Some(head)) = (
            caps.name("lead"),
            caps.name("num"),
            caps.name("sep"),
            caps.name("head"),
        ) else {
            continue;
        };

        let lead = lead.as_str();
        let explicit_step = caps.name("step").is_some();
        let punctuated = matches!(sep.as_str(), "." | ":" | ")");
        let anchored = lead.is_empty()
            || lead.contains('\n')
            || lead.starts_with(['.', '!', '?', ':', ';']);

        // Mid-sentence numbers only count when written as an enumeration.
        if !anchored && !punctuated && !explicit_step {
            continue;
        }

        let Ok(n) = num.as_str().parse::<u32>() else {
            continue;
        };
        if n == 0 || n > MAX_STEP_NUMBER {
            continue;
        }

        let end = markers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(text.len());
        let raw_clause = &text[head.start()..end];
        let clause = raw_clause
            .split('\n')
            .next()
            .unwrap_or("")
            .trim()
            .trim_end_matches([',', ';'])
            .trim()
            .to_string();
        if clause.is_empty() {
            continue;
        }

        if !punctuated && is_quantity_phrase(&clause) {
            continue;
        }

        candidates.push(StepCandidate { num: n, clause });
    }

    let numbers: HashSet<u32> = candidates.iter().map(|c| c.num).collect();
    let mut seen: HashSet<u32> = HashSet::new();
    let mut steps: Vec<FrameworkStep> = candidates
        .into_iter()
        .filter(|c| {
            c.clause.chars().count() >= MIN_STEP_CLAUSE_CHARS
                || numbers.contains(&(c.num + 1))
                || (c.num > 1 && numbers.contains(&(c.num - 1)))
        })
        .filter(|c| seen.insert(c.num))
        .map(|c| {
            let (title, description) = split_step_clause(&c.clause);
            FrameworkStep {
                order: c.num,
                title,
                description,
            }
        })
        .collect();

    steps.sort_by_key(|s| s.order);
    steps
}

fn is_quantity_phrase(clause: &str) -> bool {
    clause
        .split_whitespace()
        .next()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .is_some_and(|w| QUANTITY_WORDS.contains(&w.as_str()))
}

fn split_step_clause(clause: &str) -> (String, String) {
    let split_at = [": ", " - ", " — "]
        .iter()
        .filter_map(|sep| clause.find(sep).map(|pos| (pos, sep.len())))
        .min_by_key(|(pos, _)| *pos);

    if let Some((pos, len)) = split_at {
        let title = clause[..pos].trim();
        let rest = clause[pos + len..].trim();
        if !title.is_empty() && title.chars().count() <= MAX_STEP_TITLE_CHARS && !rest.is_empty()
        {
            return (title.to_string(), rest.to_string());
        }
    }

    let title = clause.trim_end_matches(['.', '!', '?']).trim();
    (
        truncate_chars(title, MAX_STEP_TITLE_CHARS),
        clause.to_string(),
    )
}

// ============ Components, use cases, type ============

fn extract_components(text: &str) -> Vec<FrameworkComponent> {
    COMPONENT_LINE
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps.name("name")?.as_str().trim().to_string();
            let description = caps.name("desc")?.as_str().trim().to_string();
            let lower = description.to_lowercase();
            let importance = if ["critical", "essential", "most important", "crucial"]
                .iter()
                .any(|k| lower.contains(k))
            {
                Some("high".to_string())
            } else if ["optional", "nice to have", "bonus"]
                .iter()
                .any(|k| lower.contains(k))
            {
                Some("low".to_string())
            } else {
                None
            };
            Some(FrameworkComponent {
                name,
                description,
                importance,
            })
        })
        .collect()
}

fn extract_use_cases(text: &str) -> Vec<String> {
    let mut cases: Vec<String> = Vec::new();
    for caps in USE_CASE.captures_iter(text) {
        if let Some(m) = caps.name("case") {
            let case = m.as_str().trim().to_string();
            if !case.is_empty() && !cases.contains(&case) {
                cases.push(case);
            }
        }
    }
    cases
}

fn classify_type(name: &str, text: &str, step_count: usize) -> FrameworkType {
    for hay in [name.to_lowercase(), text.to_lowercase()] {
        if hay.contains("methodology") {
            return FrameworkType::Methodology;
        }
        if hay.contains("framework") {
            return FrameworkType::Framework;
        }
        if hay.contains("process") {
            return FrameworkType::Process;
        }
        if hay.contains("pattern") {
            return FrameworkType::Pattern;
        }
        if hay.contains("technique") || hay.contains("method") {
            return FrameworkType::Technique;
        }
    }
    if step_count >= 2 {
        FrameworkType::Process
    } else {
        FrameworkType::Framework
    }
}

// ============ Text helpers ============

fn dedup_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
