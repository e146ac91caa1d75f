//! Cross-source synthesis.
//!
//! Thin layer over [`content_relay_core::synthesis`]: applies the configured
//! source ceiling and prints outcomes for the CLI. "No sources" and
//! "synthesis unavailable" are outcomes, not errors.

use anyhow::Result;
use content_relay_core::backend::Backend;
use content_relay_core::models::SynthesisRequest;
use content_relay_core::synthesis::{self, SynthesisOutcome};

use crate::config::Config;
use crate::session::ClientHandle;

/// Apply the `[retrieval].max_sources` ceiling to a caller-supplied value.
pub fn clamp_sources(config: &Config, requested: Option<u64>) -> usize {
    let max = config.retrieval.max_sources;
    requested.map(|n| n as usize).unwrap_or(max).clamp(1, max)
}

pub async fn synthesize_content(
    backend: &dyn Backend,
    request: &SynthesisRequest,
) -> Result<SynthesisOutcome> {
    Ok(synthesis::synthesize(backend, request).await?)
}

pub async fn run_synthesize(config: &Config, request: SynthesisRequest) -> Result<()> {
    let handle = ClientHandle::from_config(&config.backend);
    let backend = handle.get().await?;
    let outcome = synthesize_content(backend.as_ref(), &request).await?;

    match outcome {
        SynthesisOutcome::NoSources { reason } => println!("{}", reason),
        SynthesisOutcome::Failed { reason, sources } => {
            println!("{}", reason);
            println!("Sources tried: {}", sources.ids.join(", "));
        }
        SynthesisOutcome::Completed {
            result,
            sources,
            surface,
        } => {
            println!(
                "--- Synthesis ({} source(s) from {:?}, {:?} surface) ---",
                sources.ids.len(),
                sources.tier,
                surface
            );
            if let Some(ref overview) = result.overview {
                println!("{}", overview);
            }
            if !result.insights.is_empty() {
                println!();
                println!("Insights:");
                for i in &result.insights {
                    match i.category {
                        Some(ref cat) => println!("  - [{}] {}", cat, i.text),
                        None => println!("  - {}", i.text),
                    }
                }
            }
            if !result.themes.is_empty() {
                println!();
                println!("Themes:");
                for t in &result.themes {
                    println!("  - {} (x{})", t.theme, t.frequency);
                }
            }
            if !result.connections.is_empty() {
                println!();
                println!("Connections:");
                for c in &result.connections {
                    println!("  - {}", c.description);
                }
            }
            if !result.knowledge_gaps.is_empty() {
                println!();
                println!("Gaps:");
                for g in &result.knowledge_gaps {
                    println!("  - {}", g);
                }
            }
            if result.is_empty() {
                println!("(no insights relevant to \"{}\")", request.query);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_sources() {
        let cfg = Config::for_base_url("http://backend.test");
        assert_eq!(clamp_sources(&cfg, None), 10);
        assert_eq!(clamp_sources(&cfg, Some(3)), 3);
        assert_eq!(clamp_sources(&cfg, Some(0)), 1);
        assert_eq!(clamp_sources(&cfg, Some(40)), 10);
    }
}
