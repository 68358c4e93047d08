//! Driver layer for the outreach escalation engine.
//!
//! Provides the pieces the engine leaves abstract: an OpenAI-compatible HTTP
//! drafting backend, console and HTTP-relay channel transports, environment
//! and TOML configuration, and telemetry initialization. The CLI in
//! `main.rs` wires them together.

pub mod config;
pub mod drafter;
pub mod telemetry;
pub mod transports;

pub use config::{DrafterEndpoint, RunnerConfig};
pub use drafter::HttpDraftBackend;
pub use transports::{ConsoleTransport, HttpRelayTransport};
