//! Runtime error kinds (§7). Config errors are fatal at init; everything else an Adapter worker
//! can recover from by logging and continuing (§7 kinds 2-5) is represented so callers can tell
//! the two apart, but the worker loop itself never propagates an `Err` out of `step()` — it logs
//! and moves on.

use thiserror::Error;

use fabric_config::ConfigError;
use fabric_transport::TransportError;

/// Fatal at `init()`: the adapter cannot come up at all.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("{0}")]
    Other(String),
}

/// Errors a Translator can hit translating a single Record; always record-scoped, never fatal to
/// the Translator itself (§7 kinds 4-5).
#[derive(Debug, Error, PartialEq)]
pub enum TranslateError {
    #[error("target adapter is gone")]
    TargetGone,
    #[error(transparent)]
    Key(#[from] fabric_core::KeyError),
}
