//! # freight-ai
//!
//! Batching, budget and escalation core behind the freight platform's AI
//! services.
//!
//! Provides an in-memory task queue flushed in same-kind batches to an
//! upstream model (rig-core), a daily token/cost budget, a negotiation
//! policy with human handoff, and a platform orchestrator that supervises
//! every response. Observability via tracing and OpenTelemetry.

pub mod budget;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod llm;
pub mod model;
pub mod negotiation;
pub mod platform;
pub mod queue;
pub mod results;
pub mod telemetry;
