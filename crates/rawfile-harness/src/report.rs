//! Machine-readable command reports.

use serde::{Deserialize, Serialize};

use rawfile_core::{ModeGrammar, OpenFlags};

/// What a mode string parses to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagsReport {
    pub mode: String,
    pub grammar: String,
    /// Raw union of the per-character flags.
    pub bits: i32,
    /// Flag word actually handed to `open(2)`.
    pub os_bits: i32,
    pub symbolic: String,
    pub readable: bool,
    pub writable: bool,
    pub creates: bool,
    pub truncates: bool,
    pub appends: bool,
}

impl FlagsReport {
    #[must_use]
    pub fn new(mode: &str, grammar: ModeGrammar, flags: OpenFlags) -> Self {
        Self {
            mode: mode.to_string(),
            grammar: grammar.as_str().to_string(),
            bits: flags.bits(),
            os_bits: flags.os_bits(),
            symbolic: flags.to_string(),
            readable: flags.is_readable(),
            writable: flags.is_writable(),
            creates: flags.creates(),
            truncates: flags.truncates(),
            appends: flags.appends(),
        }
    }
}

/// Outcome of a command that moved bytes between streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReport {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub destination: String,
    pub mode: String,
    pub bytes: usize,
}

impl TransferReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
