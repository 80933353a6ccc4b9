use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub loader: LoaderConfig,
    pub pacing: PacingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Fail-safe for the archive loader: loading is marked complete after
    /// this many milliseconds even if a collection never delivers its
    /// initial snapshot.
    pub load_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Optional pause after each section member processed during restore.
    /// Zero disables pacing; progress reporting is event-driven either way.
    pub section_member_delay_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::defaults().with_env_overrides()
    }

    fn defaults() -> Self {
        Self {
            loader: LoaderConfig { load_timeout_ms: 3000 },
            pacing: PacingConfig { section_member_delay_ms: 0 },
        }
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("ARCHIVE_LOAD_TIMEOUT_MS") {
            self.loader.load_timeout_ms = v.parse().unwrap_or(self.loader.load_timeout_ms);
        }
        if let Ok(v) = env::var("ARCHIVE_SECTION_MEMBER_DELAY_MS") {
            self.pacing.section_member_delay_ms =
                v.parse().unwrap_or(self.pacing.section_member_delay_ms);
        }
        self
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
