//! Container configuration surface.
//!
//! Three knobs, all optional, all in milliseconds. Defaults match the
//! behavior the container guarantees out of the box: pooled instances idle
//! out after two minutes, per-client callers wait up to thirty seconds for a
//! held instance, and the post-call release jitter is disabled.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Default maximum idle age for pooled instances.
pub const DEFAULT_POOLED_MAX_IDLE_MS: u64 = 120_000;

/// Default bound on how long a caller waits for a held per-client instance.
pub const DEFAULT_GATE_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document failed to parse or carried unknown keys.
    #[error("invalid container config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Recognized container options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerConfig {
    /// Maximum time a pooled instance may sit idle before the background
    /// sweep evicts it.
    pub pooled_max_idle_ms: u64,

    /// How long a caller waits for a held per-client instance before failing
    /// with a concurrency timeout.
    pub gate_wait_timeout_ms: u64,

    /// Upper bound for a uniform random delay injected after a gated call
    /// completes and before the gate releases. Exists only to make races
    /// observable under test; zero (the default) disables it.
    pub gate_release_jitter_ms: u64,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            pooled_max_idle_ms: DEFAULT_POOLED_MAX_IDLE_MS,
            gate_wait_timeout_ms: DEFAULT_GATE_WAIT_TIMEOUT_MS,
            gate_release_jitter_ms: 0,
        }
    }
}

impl ContainerConfig {
    /// Parse a TOML document. Missing keys take their defaults; unknown keys
    /// are rejected.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Maximum idle age as a [`Duration`].
    pub fn pooled_max_idle(&self) -> Duration {
        Duration::from_millis(self.pooled_max_idle_ms)
    }

    /// Gate wait timeout as a [`Duration`].
    pub fn gate_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.gate_wait_timeout_ms)
    }

    /// Release jitter bound as a [`Duration`].
    pub fn gate_release_jitter(&self) -> Duration {
        Duration::from_millis(self.gate_release_jitter_ms)
    }
}
