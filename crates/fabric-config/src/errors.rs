//! Config errors (§7 "Config error — missing required key / uncoercible value. Fatal at init.").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required config key [{section}] {key}")]
    MissingKey { section: String, key: String },

    #[error("config key [{section}] {key} = {raw:?} could not be coerced: {reason}")]
    Uncoercible {
        section: String,
        key: String,
        raw: String,
        reason: String,
    },

    #[error("malformed config at line {line}: {message}")]
    Malformed { line: usize, message: String },
}
