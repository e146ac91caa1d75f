//! Remote content service abstraction.
//!
//! The [`Backend`] trait is the single seam between the core logic and the
//! network. Every method returns the raw JSON body of a successful response;
//! interpretation is left to [`crate::normalize`]. Implementations classify
//! failures into [`RelayError`](crate::RelayError) variants: HTTP 401 is
//! [`Auth`](crate::RelayError::Auth), other non-2xx statuses are
//! [`Backend`](crate::RelayError::Backend), and anything that never
//! produced a response is [`Transport`](crate::RelayError::Transport).
//!
//! Implementations must be `Send + Sync` to be shared across concurrent
//! tool calls.

pub mod scripted;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RelayResult;
use crate::models::ContentFlag;
use crate::wire::{
    LegacySearchRequest, LegacySynthesisRequest, ModernSearchRequest, ModernSynthesisRequest,
};

/// One authenticated session against the remote content service.
///
/// # Operations
///
/// | Method | Endpoint |
/// |--------|----------|
/// | [`verify_auth`](Backend::verify_auth) | `GET /api/auth/verify` |
/// | [`search`](Backend::search) | `POST /api/v2/search` |
/// | [`legacy_search`](Backend::legacy_search) | `GET /api/search` |
/// | [`get_content`](Backend::get_content) | `GET /api/content/{id}` |
/// | [`list_recent`](Backend::list_recent) | `GET /api/content?sort=recent` |
/// | [`synthesize`](Backend::synthesize) | `POST /api/v2/synthesis` |
/// | [`legacy_synthesize`](Backend::legacy_synthesize) | `POST /api/synthesize` |
/// | [`update_tags`](Backend::update_tags) | `PUT /api/content/{id}/tags` |
/// | [`set_flag`](Backend::set_flag) | `PATCH /api/content/{id}` |
/// | [`save_url`](Backend::save_url) | `POST /api/content` |
#[async_trait]
pub trait Backend: Send + Sync {
    /// Confirm the credential is accepted.
    async fn verify_auth(&self) -> RelayResult<Value>;

    async fn search(&self, request: &ModernSearchRequest) -> RelayResult<Value>;

    async fn legacy_search(&self, request: &LegacySearchRequest) -> RelayResult<Value>;

    async fn get_content(&self, id: &str) -> RelayResult<Value>;

    /// Most recently saved items, newest first.
    async fn list_recent(&self, limit: usize) -> RelayResult<Value>;

    async fn synthesize(&self, request: &ModernSynthesisRequest) -> RelayResult<Value>;

    async fn legacy_synthesize(&self, request: &LegacySynthesisRequest) -> RelayResult<Value>;

    /// Replace the tag set of an item.
    async fn update_tags(&self, id: &str, tags: &[String]) -> RelayResult<Value>;

    async fn set_flag(&self, id: &str, flag: ContentFlag, value: bool) -> RelayResult<Value>;

    /// Ask the service to ingest a new URL.
    async fn save_url(&self, url: &str, tags: &[String]) -> RelayResult<Value>;
}
