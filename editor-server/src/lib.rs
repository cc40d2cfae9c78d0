//! # Automaton Editor Server Library
//!
//! WebSocket host transport for `editor-core`. Every connection owns one
//! [`HostBridge`](editor_core::HostBridge); text frames carry protocol
//! envelopes in both directions and a periodic tick drives the move
//! debounce and readiness retries.
//!
//! This library is used by both the binary and integration tests.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{routing::get, Router};
use clap::Parser;
use editor_core::EditorConfig;

pub mod health;
pub mod metrics;
pub mod session;
pub mod validation;

/// Default port for the editor server.
pub const DEFAULT_PORT: u16 = 9474;

/// Default tick interval for debounce and retry timers.
pub const DEFAULT_TICK_MS: u64 = 20;

/// Command-line arguments for the editor server.
#[derive(Debug, Clone, Parser)]
#[command(name = "automaton-editor")]
#[command(about = "WebSocket host for the automaton diagram editor")]
#[command(version)]
pub struct CliArgs {
    /// Port to listen on
    #[arg(long, env = "EDITOR_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind (localhost unless overridden)
    #[arg(long, env = "EDITOR_BIND", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub bind: IpAddr,

    /// JSON file holding an editor configuration
    #[arg(long, env = "EDITOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Timer tick interval in milliseconds
    #[arg(long, default_value_t = DEFAULT_TICK_MS)]
    pub tick_ms: u64,

    /// Accept envelopes without a `version` field
    #[arg(long)]
    pub legacy_envelopes: bool,
}

impl CliArgs {
    /// Socket address to listen on.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Load the editor configuration, applying command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or the
    /// tick interval is out of range.
    pub fn editor_config(&self) -> anyhow::Result<EditorConfig> {
        validation::validate_tick_interval(self.tick_ms)?;
        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                EditorConfig::from_json(&json)
                    .with_context(|| format!("Invalid editor config in {}", path.display()))?
            }
            None => EditorConfig::default(),
        };
        if self.legacy_envelopes {
            config.accept_legacy_envelopes = true;
        }
        Ok(config)
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Configuration every new session starts from.
    pub config: Arc<EditorConfig>,
    /// Timer tick interval.
    pub tick: Duration,
    sessions: Arc<AtomicUsize>,
}

impl AppState {
    /// Create state for the given session configuration.
    pub fn new(config: EditorConfig, tick: Duration) -> Self {
        Self {
            config: Arc::new(config),
            tick,
            sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of open editor sessions.
    pub fn active_sessions(&self) -> usize {
        self.sessions.load(Ordering::Relaxed)
    }

    pub(crate) fn session_opened(&self) -> usize {
        self.sessions.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn session_closed(&self) -> usize {
        self.sessions.fetch_sub(1, Ordering::Relaxed).saturating_sub(1)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(
            EditorConfig::default(),
            Duration::from_millis(DEFAULT_TICK_MS),
        )
    }
}

/// Build the editor routes (WebSocket and health checks).
///
/// Middleware and the `/metrics` endpoint are layered on by the binary.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/health", get(health::readiness))
        .route("/ws", get(session::websocket_handler))
        .with_state(state)
}
