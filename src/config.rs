use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;

/// Default request timeout; long enough to ride out a backend cold start.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 90;

/// Where the session cache keeps its entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCacheBackend {
    /// Files under the state directory; survives between CLI invocations.
    File,
    /// Process-local only.
    Memory,
}

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub spot_id: String,
    /// Directory holding the durable profile store and the file-backed cache.
    pub state_dir: PathBuf,
    pub request_timeout: Duration,
    pub session_cache: SessionCacheBackend,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let request_timeout_secs = match lookup("RUMBO_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                AppError::Config("RUMBO_REQUEST_TIMEOUT_SECS must be a positive integer".into())
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };
        if request_timeout_secs == 0 {
            return Err(AppError::Config(
                "RUMBO_REQUEST_TIMEOUT_SECS must be a positive integer".into(),
            ));
        }

        let session_cache = match lookup("RUMBO_SESSION_CACHE").as_deref().map(str::trim) {
            None | Some("file") => SessionCacheBackend::File,
            Some("memory") => SessionCacheBackend::Memory,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "RUMBO_SESSION_CACHE must be 'file' or 'memory', got '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            api_url: lookup("RUMBO_API_URL")
                .unwrap_or_else(|| "http://localhost:8000/api".to_string())
                .trim_end_matches('/')
                .to_string(),
            spot_id: lookup("RUMBO_SPOT_ID").unwrap_or_else(|| "varese".to_string()),
            state_dir: PathBuf::from(
                lookup("RUMBO_STATE_DIR").unwrap_or_else(|| "./.rumbo".to_string()),
            ),
            request_timeout: Duration::from_secs(request_timeout_secs),
            session_cache,
        })
    }

    pub fn profile_dir(&self) -> PathBuf {
        self.state_dir.join("profile")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.state_dir.join("session-cache")
    }
}
