//! Scripted [`Backend`] for tests.
//!
//! Responses are registered per operation: one-shot responses queued with
//! [`ScriptedBackend::push`] are consumed first, then the standing response
//! set with [`ScriptedBackend::respond`]. `get_content` additionally consults
//! a per-id table. Unscripted calls fail with a 404 backend error. Every call
//! is logged with a JSON rendering of its arguments.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{RelayError, RelayResult};
use crate::models::ContentFlag;
use crate::wire::{
    LegacySearchRequest, LegacySynthesisRequest, ModernSearchRequest, ModernSynthesisRequest,
};

use super::Backend;

/// Backend operation, used as the scripting key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    VerifyAuth,
    Search,
    LegacySearch,
    GetContent,
    ListRecent,
    Synthesize,
    LegacySynthesize,
    UpdateTags,
    SetFlag,
    SaveUrl,
}

#[derive(Default)]
pub struct ScriptedBackend {
    queued: Mutex<HashMap<Op, VecDeque<RelayResult<Value>>>>,
    standing: Mutex<HashMap<Op, RelayResult<Value>>>,
    contents: Mutex<HashMap<String, RelayResult<Value>>>,
    log: Mutex<Vec<(Op, Value)>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call to `op` with `result` once the queue is drained.
    pub fn respond(self, op: Op, result: RelayResult<Value>) -> Self {
        lock(&self.standing).insert(op, result);
        self
    }

    /// Queue a one-shot answer for the next call to `op`.
    pub fn push(self, op: Op, result: RelayResult<Value>) -> Self {
        lock(&self.queued).entry(op).or_default().push_back(result);
        self
    }

    /// Answer `get_content(id)` with `result`.
    pub fn with_content(self, id: &str, result: RelayResult<Value>) -> Self {
        lock(&self.contents).insert(id.to_string(), result);
        self
    }

    /// Number of calls made to `op`.
    pub fn calls(&self, op: Op) -> usize {
        lock(&self.log).iter().filter(|(o, _)| *o == op).count()
    }

    /// Arguments of every call made to `op`, in order.
    pub fn requests(&self, op: Op) -> Vec<Value> {
        lock(&self.log)
            .iter()
            .filter(|(o, _)| *o == op)
            .map(|(_, args)| args.clone())
            .collect()
    }

    /// Operations in the order they were called.
    pub fn sequence(&self) -> Vec<Op> {
        lock(&self.log).iter().map(|(op, _)| *op).collect()
    }

    fn answer(&self, op: Op, args: Value, id: Option<&str>) -> RelayResult<Value> {
        lock(&self.log).push((op, args));

        if let Some(next) = lock(&self.queued).get_mut(&op).and_then(VecDeque::pop_front) {
            return next;
        }
        if let Some(id) = id {
            if let Some(found) = lock(&self.contents).get(id) {
                return found.clone();
            }
        }
        if let Some(standing) = lock(&self.standing).get(&op) {
            return standing.clone();
        }
        Err(RelayError::Backend {
            status: 404,
            message: format!("no scripted response for {:?}", op),
        })
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn verify_auth(&self) -> RelayResult<Value> {
        self.answer(Op::VerifyAuth, Value::Null, None)
    }

    async fn search(&self, request: &ModernSearchRequest) -> RelayResult<Value> {
        let args = serde_json::to_value(request).unwrap_or(Value::Null);
        self.answer(Op::Search, args, None)
    }

    async fn legacy_search(&self, request: &LegacySearchRequest) -> RelayResult<Value> {
        let args: serde_json::Map<String, Value> = request
            .query_pairs()
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::String(v)))
            .collect();
        self.answer(Op::LegacySearch, Value::Object(args), None)
    }

    async fn get_content(&self, id: &str) -> RelayResult<Value> {
        self.answer(Op::GetContent, json!({ "id": id }), Some(id))
    }

    async fn list_recent(&self, limit: usize) -> RelayResult<Value> {
        self.answer(Op::ListRecent, json!({ "limit": limit }), None)
    }

    async fn synthesize(&self, request: &ModernSynthesisRequest) -> RelayResult<Value> {
        let args = serde_json::to_value(request).unwrap_or(Value::Null);
        self.answer(Op::Synthesize, args, None)
    }

    async fn legacy_synthesize(&self, request: &LegacySynthesisRequest) -> RelayResult<Value> {
        let args = serde_json::to_value(request).unwrap_or(Value::Null);
        self.answer(Op::LegacySynthesize, args, None)
    }

    async fn update_tags(&self, id: &str, tags: &[String]) -> RelayResult<Value> {
        self.answer(Op::UpdateTags, json!({ "id": id, "tags": tags }), None)
    }

    async fn set_flag(&self, id: &str, flag: ContentFlag, value: bool) -> RelayResult<Value> {
        let mut args = serde_json::Map::new();
        args.insert("id".to_string(), json!(id));
        args.insert(flag.wire_field().to_string(), json!(value));
        self.answer(Op::SetFlag, Value::Object(args), None)
    }

    async fn save_url(&self, url: &str, tags: &[String]) -> RelayResult<Value> {
        self.answer(Op::SaveUrl, json!({ "url": url, "tags": tags }), None)
    }
}
