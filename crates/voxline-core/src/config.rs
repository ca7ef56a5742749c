//! Session configuration: endpoint, credential, and timing knobs.
//!
//! The credential is supplied out of band (environment variable or
//! explicit constructor); this crate does not manage credential
//! acquisition or rotation. Missing credentials fail fast with
//! [`SynthesisError::Configuration`] — no connection attempt is made.

use std::time::Duration;

use crate::error::SynthesisError;

/// Default inference endpoint.
pub const DEFAULT_ENDPOINT: &str = "wss://dashscope.aliyuncs.com/api-ws/v1/inference/";

/// Environment variable holding the bearer credential.
pub const API_KEY_ENV: &str = "DASHSCOPE_API_KEY";

/// Default timeout for establishing the WebSocket connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default overall session deadline.
pub const DEFAULT_SESSION_DEADLINE: Duration = Duration::from_secs(300);

/// Default settle delay between sending the text payload and the
/// `finish-task` command.
pub const DEFAULT_FINISH_SETTLE_DELAY: Duration = Duration::from_secs(1);

// ── Timing knobs ───────────────────────────────────────────────────

/// Timing parameters of one synthesis session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthTiming {
    /// Settle delay between the text payload and the deferred
    /// `finish-task` command, allowing trailing audio to be produced.
    ///
    /// The delay is fixed regardless of input length; very long inputs
    /// may need a larger value to avoid truncating trailing audio.
    pub finish_settle_delay: Duration,

    /// Hard deadline for the whole session. On expiry the connection is
    /// torn down, the sink is finalized, and the session fails with
    /// [`SynthesisError::DeadlineExceeded`].
    pub session_deadline: Duration,
}

impl Default for SynthTiming {
    fn default() -> Self {
        Self {
            finish_settle_delay: DEFAULT_FINISH_SETTLE_DELAY,
            session_deadline: DEFAULT_SESSION_DEADLINE,
        }
    }
}

// ── Session configuration ──────────────────────────────────────────

/// Connection and timing configuration shared by every session.
#[derive(Debug, Clone)]
pub struct SynthConfig {
    /// WebSocket inference endpoint.
    pub endpoint: String,

    /// Bearer credential for the endpoint.
    pub api_key: String,

    /// Timeout for the WebSocket handshake.
    pub connect_timeout: Duration,

    /// Per-session timing knobs.
    pub timing: SynthTiming,
}

impl SynthConfig {
    /// Build a configuration from an explicit credential, with nominal
    /// defaults for everything else.
    pub fn new(api_key: impl Into<String>) -> Result<Self, SynthesisError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SynthesisError::Configuration(
                "API key must not be empty".to_string(),
            ));
        }
        Ok(Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            timing: SynthTiming::default(),
        })
    }

    /// Load the credential from [`API_KEY_ENV`].
    pub fn from_env() -> Result<Self, SynthesisError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the credential through an injectable lookup. Split out from
    /// [`from_env`](Self::from_env) so tests don't mutate process-wide
    /// environment state.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SynthesisError> {
        match lookup(API_KEY_ENV) {
            Some(key) if !key.trim().is_empty() => Self::new(key),
            _ => Err(SynthesisError::Configuration(format!(
                "{API_KEY_ENV} is not set — export it or pass the key explicitly"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_key_uses_default_endpoint() {
        let config = SynthConfig::new("sk-test").unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.timing.finish_settle_delay, Duration::from_secs(1));
    }

    #[test]
    fn empty_key_is_a_configuration_error() {
        let err = SynthConfig::new("   ").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn missing_env_var_fails_fast() {
        let err = SynthConfig::from_lookup(|_| None).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains(API_KEY_ENV));
    }

    #[test]
    fn env_lookup_populates_key() {
        let config = SynthConfig::from_lookup(|key| {
            assert_eq!(key, API_KEY_ENV);
            Some("sk-from-env".to_string())
        })
        .unwrap();
        assert_eq!(config.api_key, "sk-from-env");
    }
}
