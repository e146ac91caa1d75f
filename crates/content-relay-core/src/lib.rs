//! # Content Relay Core
//!
//! Shared, runtime-agnostic logic for Content Relay: the canonical data
//! model, response normalization, query-mode planning, the tiered retrieval
//! executor, synthesis orchestration, token budgeting, and framework
//! extraction.
//!
//! This crate contains no tokio, reqwest, or filesystem I/O. Everything that
//! talks to the remote content service goes through the [`backend::Backend`]
//! trait, which the application crate implements over HTTP.

pub mod backend;
pub mod budget;
pub mod error;
pub mod frameworks;
pub mod models;
pub mod normalize;
pub mod planner;
pub mod retrieval;
pub mod synthesis;
pub mod wire;

pub use error::{RelayError, RelayResult};
