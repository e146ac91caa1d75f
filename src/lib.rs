//! # Content Relay
//!
//! A token-budget-aware relay between AI tool hosts and a remote
//! content-management service.
//!
//! The relay turns a small catalog of tools (search, retrieve, synthesize,
//! extract frameworks, and a few writes) into reliable calls against a
//! backend with two incompatible API surfaces and inconsistent response
//! shapes. The pure logic (normalization, query planning, fallback
//! ordering, the token budget gate, framework extraction) lives in
//! [`content_relay_core`]; this crate adds the HTTP client, configuration,
//! the tool registry, and the servers.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌─────────────────────┐
//! │ MCP / HTTP   │──▶│ ToolRegistry  │──▶│ content_relay_core  │
//! │ CLI (relay)  │   │ dispatch()    │   │ retrieval/synthesis │
//! └──────────────┘   └───────┬───────┘   └──────────┬──────────┘
//!                            │                      ▼
//!                            │            ┌───────────────────┐
//!                            └───────────▶│ HttpBackend       │──▶ remote service
//!                                         │ (lazy, verified)  │
//!                                         └───────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export RELAY_API_KEY=...
//! relay search "deep work" --mode any
//! relay synthesize "habit formation" --mode actionable
//! relay serve mcp
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`client`] | reqwest implementation of the backend contract |
//! | [`session`] | Lazily-initialized, auth-verified backend handle |
//! | [`params`] | Tool parameter validation |
//! | [`search`] | Search with the aggregate token gate |
//! | [`get`] | Single and batch retrieval with budget gating |
//! | [`recent`] | Recently saved content |
//! | [`synthesize`] | Cross-source synthesis |
//! | [`frameworks`] | Framework discovery |
//! | [`mutate`] | Tag, flag, and save operations |
//! | [`traits`] | Tool trait, built-in tools, registry, dispatch |
//! | [`server`] | HTTP tool server |
//! | [`mcp`] | MCP protocol bridge |

pub mod client;
pub mod config;
pub mod frameworks;
pub mod get;
pub mod logging;
pub mod mcp;
pub mod mutate;
pub mod params;
pub mod recent;
pub mod search;
pub mod server;
pub mod session;
pub mod synthesize;
pub mod traits;
