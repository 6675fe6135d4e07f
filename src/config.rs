//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

/// Default settings namespace for in-progress wizard drafts.
pub const DEFAULT_DRAFT_NAMESPACE: &str = "planting_wizard_draft";

/// Server and persistence configuration.
#[derive(Debug, Clone)]
pub struct WizardConfig {
    /// Path of the libSQL database file.
    pub db_path: PathBuf,
    /// HTTP port for the wizard API.
    pub port: u16,
    /// Settings key under which each user's draft is stored.
    pub draft_namespace: String,
    /// Sessions idle for longer than this are dropped from memory.
    pub session_idle_timeout: Duration,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/planting-wizard.db"),
            port: 8080,
            draft_namespace: DEFAULT_DRAFT_NAMESPACE.to_string(),
            session_idle_timeout: Duration::from_secs(3600), // 1 hour
        }
    }
}

impl WizardConfig {
    /// Build config from `PLANTING_WIZARD_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup. Unparsable values fall
    /// back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let db_path = lookup("PLANTING_WIZARD_DB_PATH")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let port = match lookup("PLANTING_WIZARD_PORT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Invalid PLANTING_WIZARD_PORT, using default");
                defaults.port
            }),
            None => defaults.port,
        };

        let draft_namespace = lookup("PLANTING_WIZARD_DRAFT_NAMESPACE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.draft_namespace);

        let session_idle_timeout = match lookup("PLANTING_WIZARD_SESSION_IDLE_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    tracing::warn!(value = %raw, "Invalid PLANTING_WIZARD_SESSION_IDLE_SECS, using default");
                    defaults.session_idle_timeout
                }
            },
            None => defaults.session_idle_timeout,
        };

        Self {
            db_path,
            port,
            draft_namespace,
            session_idle_timeout,
        }
    }
}
