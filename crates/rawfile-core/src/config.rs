//! Runtime configuration.
//!
//! Settings are read from the environment once, on first use:
//! - `RAWFILE_MODE_GRAMMAR`: `strict` (default) rejects unknown mode
//!   characters, `compat` ignores them.
//! - `RAWFILE_HANDLE_POLICY`: `native` (default), `retain` or `sentinel`.
//! - `RAWFILE_LOG`: unset disables event logging; `stderr` logs to standard
//!   error; anything else is a JSONL file path.
//! - `RAWFILE_LOG_LEVEL`: `trace`, `debug`, `info` (default), `warn`, `error`.

use std::path::PathBuf;
use std::sync::OnceLock;

use crate::mode::ModeGrammar;
use crate::policy::PolicyChoice;
use crate::structured_log::LogLevel;

pub const ENV_MODE_GRAMMAR: &str = "RAWFILE_MODE_GRAMMAR";
pub const ENV_HANDLE_POLICY: &str = "RAWFILE_HANDLE_POLICY";
pub const ENV_LOG: &str = "RAWFILE_LOG";
pub const ENV_LOG_LEVEL: &str = "RAWFILE_LOG_LEVEL";

/// Where structured events go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

impl LogTarget {
    fn from_env_value(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "0" | "off" | "none" => None,
            "stderr" | "2" => Some(Self::Stderr),
            _ => Some(Self::File(PathBuf::from(trimmed))),
        }
    }
}

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub mode_grammar: ModeGrammar,
    pub handle_policy: PolicyChoice,
    pub log_target: Option<LogTarget>,
    pub log_level: LogLevel,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mode_grammar: ModeGrammar::Strict,
            handle_policy: PolicyChoice::Native,
            log_target: None,
            log_level: LogLevel::Info,
        }
    }
}

impl RuntimeConfig {
    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            mode_grammar: lookup(ENV_MODE_GRAMMAR)
                .map(|v| ModeGrammar::from_str_loose(&v))
                .unwrap_or(defaults.mode_grammar),
            handle_policy: lookup(ENV_HANDLE_POLICY)
                .map(|v| PolicyChoice::from_str_loose(&v))
                .unwrap_or(defaults.handle_policy),
            log_target: lookup(ENV_LOG).and_then(|v| LogTarget::from_env_value(&v)),
            log_level: lookup(ENV_LOG_LEVEL)
                .map(|v| LogLevel::from_str_loose(&v))
                .unwrap_or(defaults.log_level),
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Process-wide configuration, resolved from the environment on first call.
pub fn runtime() -> &'static RuntimeConfig {
    static CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();
    CONFIG.get_or_init(RuntimeConfig::from_env)
}
