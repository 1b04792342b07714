//! Upstream model collaborator.
//!
//! The batch engine sees the model as an opaque request/response boundary:
//! one prompt carrying every payload of a same-kind partition in, an ordered
//! list of per-task results plus aggregate token/cost figures out.
//! `results[i]` must correspond to the i-th task in the request.
//!
//! [`anthropic::AnthropicUpstream`] is the production implementation via
//! rig-core; tests substitute their own [`Upstream`].

pub mod anthropic;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Task, TaskKind};

pub use anthropic::{AnthropicUpstream, anthropic_client};

/// One consolidated call for a partition of same-kind tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamRequest {
    pub kind: TaskKind,
    pub task_count: usize,
    pub prompt: String,
}

impl UpstreamRequest {
    /// Structure a partition's payloads into one numbered prompt.
    pub fn for_batch(kind: TaskKind, tasks: &[Task]) -> Self {
        let mut prompt = format!(
            "Process the following {} {} items. Respond with a JSON array of exactly {} \
             elements, one per item, in the same order.\n",
            tasks.len(),
            kind,
            tasks.len()
        );
        for (i, task) in tasks.iter().enumerate() {
            prompt.push_str(&format!("\n### Item {} (id {})\n{}\n", i + 1, task.id, task.payload));
        }
        Self {
            kind,
            task_count: tasks.len(),
            prompt,
        }
    }
}

/// Ordered per-task results plus aggregates for the whole call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamResponse {
    pub results: Vec<serde_json::Value>,
    pub tokens_used: u64,
    pub cost: f64,
}

#[async_trait]
pub trait Upstream: Send + Sync {
    async fn dispatch(&self, request: UpstreamRequest) -> Result<UpstreamResponse>;
}

/// Pull the JSON array out of a model reply that may wrap it in prose or a
/// code fence.
pub fn extract_json_array(text: &str) -> Result<Vec<serde_json::Value>> {
    let start = text
        .find('[')
        .ok_or_else(|| Error::UpstreamDispatchFailed("response contains no JSON array".into()))?;
    let end = text
        .rfind(']')
        .filter(|&end| end > start)
        .ok_or_else(|| Error::UpstreamDispatchFailed("unterminated JSON array".into()))?;
    serde_json::from_str(&text[start..=end])
        .map_err(|e| Error::UpstreamDispatchFailed(format!("malformed JSON array: {e}")))
}
