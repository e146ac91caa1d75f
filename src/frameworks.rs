//! Framework discovery: an actionable synthesis followed by extraction.

use anyhow::Result;
use content_relay_core::backend::Backend;
use content_relay_core::frameworks::{extract_frameworks, ExtractionOptions};
use content_relay_core::models::{Framework, SynthesisMode, SynthesisRequest};
use content_relay_core::retrieval::Surface;
use content_relay_core::synthesis::{self, ResolvedSources, SynthesisOutcome};
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::session::ClientHandle;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FrameworkOutcome {
    Extracted {
        frameworks: Vec<Framework>,
        /// Insights that survived the relevance filter and were scanned.
        #[serde(rename = "insightsScanned")]
        insights_scanned: usize,
        sources: ResolvedSources,
        surface: Surface,
    },
    NoSources {
        reason: String,
    },
    SynthesisFailed {
        reason: String,
    },
}

/// Extraction options from config, overridden per call.
pub fn extraction_options(
    config: &Config,
    min_confidence: Option<f64>,
    limit: Option<u64>,
) -> ExtractionOptions {
    ExtractionOptions {
        min_confidence: min_confidence.unwrap_or(config.frameworks.min_confidence),
        limit: limit
            .map(|n| n as usize)
            .unwrap_or(config.frameworks.limit)
            .max(1),
    }
}

/// Run an actionable synthesis for `request` and mine its insights.
///
/// The request's mode is forced to `actionable`.
pub async fn find_frameworks(
    backend: &dyn Backend,
    request: &SynthesisRequest,
    opts: &ExtractionOptions,
) -> Result<FrameworkOutcome> {
    let request = SynthesisRequest {
        mode: SynthesisMode::Actionable,
        ..request.clone()
    };

    let outcome = synthesis::synthesize(backend, &request).await?;
    Ok(match outcome {
        SynthesisOutcome::Completed {
            result,
            sources,
            surface,
        } => {
            let frameworks = extract_frameworks(&result.insights, &request.query, opts);
            debug!(
                insights = result.insights.len(),
                frameworks = frameworks.len(),
                "framework extraction done"
            );
            FrameworkOutcome::Extracted {
                frameworks,
                insights_scanned: result.insights.len(),
                sources,
                surface,
            }
        }
        SynthesisOutcome::NoSources { reason } => FrameworkOutcome::NoSources { reason },
        SynthesisOutcome::Failed { reason, .. } => FrameworkOutcome::SynthesisFailed { reason },
    })
}

pub async fn run_frameworks(
    config: &Config,
    request: SynthesisRequest,
    opts: ExtractionOptions,
) -> Result<()> {
    let handle = ClientHandle::from_config(&config.backend);
    let backend = handle.get().await?;

    match find_frameworks(backend.as_ref(), &request, &opts).await? {
        FrameworkOutcome::NoSources { reason } | FrameworkOutcome::SynthesisFailed { reason } => {
            println!("{}", reason)
        }
        FrameworkOutcome::Extracted {
            frameworks,
            insights_scanned,
            ..
        } => {
            if frameworks.is_empty() {
                println!(
                    "No frameworks at confidence >= {:.2} in {} insight(s).",
                    opts.min_confidence, insights_scanned
                );
                return Ok(());
            }
            for fw in &frameworks {
                println!("{} [{:?}] confidence {:.2}", fw.name, fw.framework_type, fw.confidence);
                for step in &fw.steps {
                    if step.description.is_empty() || step.description == step.title {
                        println!("  {}. {}", step.order, step.title);
                    } else {
                        println!("  {}. {}: {}", step.order, step.title, step.description);
                    }
                }
                for c in &fw.components {
                    println!("  - {}", c.name);
                }
                if !fw.use_cases.is_empty() {
                    println!("  use: {}", fw.use_cases.join("; "));
                }
                println!();
            }
        }
    }
    Ok(())
}
