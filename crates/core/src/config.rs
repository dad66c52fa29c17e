//! Run configuration for the translation pipeline.
//! The CLI fills these from flags; library callers can start from `Default`.

use crate::error::ConfigError;
use crate::language::{resolve_language, SIMPLIFIED_CHINESE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of attempts per line (or joined block).
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// What a worker does when a line still fails after its last attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Keep the original text so the output stays complete.
    #[default]
    Fallback,
    /// Give up on the whole block and report it as failed.
    Abort,
}

/// How the content of a block is sent to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeMode {
    /// One call per non-blank line; blank lines keep their position.
    #[default]
    PerLine,
    /// Join non-blank lines with spaces and translate them in one call.
    Joined,
}

/// Settings for one translation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslateConfig {
    pub source_lang: String,
    pub dest_lang: String,
    /// Total attempts per call, including the first one.
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub workers: usize,
    pub on_failure: FailurePolicy,
    pub mode: MergeMode,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            source_lang: "en".to_string(),
            dest_lang: SIMPLIFIED_CHINESE.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            workers: default_workers(),
            on_failure: FailurePolicy::default(),
            mode: MergeMode::default(),
        }
    }
}

impl TranslateConfig {
    /// Check the settings that would make a run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.max_retries == 0 {
            return Err(ConfigError::NoAttempts);
        }
        Ok(())
    }

    /// Return a copy with both language tags resolved through the alias table.
    pub fn resolved(mut self) -> Self {
        self.source_lang = resolve_language(&self.source_lang);
        self.dest_lang = resolve_language(&self.dest_lang);
        self
    }
}

/// Number of execution units available to the process, at least one.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
