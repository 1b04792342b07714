//! Anthropic upstream via rig-core.
//!
//! # Example
//! ```no_run
//! use freight_ai::llm::{AnthropicUpstream, anthropic_client};
//! use secrecy::SecretString;
//!
//! let key = SecretString::from("sk-ant-...");
//! let client = anthropic_client(&key).expect("failed to create Anthropic client");
//! let upstream = AnthropicUpstream::new(client, "claude-sonnet-4-20250514", 4096, 0.003);
//! ```

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use secrecy::{ExposeSecret, SecretString};
use tracing::{Instrument, debug};

use super::{Upstream, UpstreamRequest, UpstreamResponse, extract_json_array};
use crate::error::{Error, Result};
use crate::telemetry::genai::{record_token_usage, start_chat_span};
use crate::telemetry::metrics;

const PREAMBLE: &str = "You are the back-office assistant of a freight and fleet management \
platform. You receive numbered work items and answer with a JSON array only, one element \
per item, in order. Never add commentary outside the array.";

/// Rough characters-per-token ratio used for accounting; rig's prompt API
/// doesn't surface provider usage.
const CHARS_PER_TOKEN: usize = 4;

/// Create an Anthropic client from a secret API key.
///
/// # Errors
/// Returns an error if the underlying HTTP client cannot be constructed.
pub fn anthropic_client(
    api_key: &SecretString,
) -> std::result::Result<rig::providers::anthropic::Client, rig::http_client::Error> {
    rig::providers::anthropic::Client::new(api_key.expose_secret())
}

pub struct AnthropicUpstream {
    client: rig::providers::anthropic::Client,
    model: String,
    max_tokens: u64,
    cost_per_1k_tokens: f64,
}

impl AnthropicUpstream {
    pub fn new(
        client: rig::providers::anthropic::Client,
        model: impl Into<String>,
        max_tokens: u64,
        cost_per_1k_tokens: f64,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens,
            cost_per_1k_tokens,
        }
    }
}

#[async_trait]
impl Upstream for AnthropicUpstream {
    async fn dispatch(&self, request: UpstreamRequest) -> Result<UpstreamResponse> {
        let span = start_chat_span(&self.model, "anthropic");

        async {
            let agent = self
                .client
                .agent(&self.model)
                .preamble(PREAMBLE)
                .max_tokens(self.max_tokens)
                .build();

            let reply = agent
                .prompt(request.prompt.as_str())
                .await
                .map_err(|e| Error::Llm(e.to_string()))?;

            let input_tokens = (request.prompt.len() / CHARS_PER_TOKEN) as u64;
            let output_tokens = (reply.len() / CHARS_PER_TOKEN) as u64;
            record_token_usage(&tracing::Span::current(), input_tokens, output_tokens);
            metrics::llm_tokens().add(
                input_tokens + output_tokens,
                &[opentelemetry::KeyValue::new("model", self.model.clone())],
            );

            let results = extract_json_array(&reply)?;
            if results.len() != request.task_count {
                return Err(Error::UpstreamDispatchFailed(format!(
                    "expected {} results, got {}",
                    request.task_count,
                    results.len()
                )));
            }

            let tokens_used = input_tokens + output_tokens;
            let cost = tokens_used as f64 / 1000.0 * self.cost_per_1k_tokens;
            debug!(kind = %request.kind, tokens_used, cost, "upstream replied");

            Ok(UpstreamResponse {
                results,
                tokens_used,
                cost,
            })
        }
        .instrument(span)
        .await
    }
}
