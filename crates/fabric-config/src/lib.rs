//! Configuration reading: a minimal `Config` trait over an INI-like file, plus typed coercion
//! helpers that keep the file format from leaking into the rest of the fabric (§6.1, §9).

mod coerce;
mod errors;
mod reader;

pub use coerce::ConfigExt;
pub use errors::ConfigError;
pub use reader::IniConfig;

/// The narrow seam every adapter/orchestrator reads config through. `IniConfig` is the only
/// implementation today; the trait exists so tests can hand adapters an in-memory stand-in.
pub trait Config {
    fn get(&self, section: &str, key: &str) -> Option<&str>;
}

impl Config for IniConfig {
    fn get(&self, section: &str, key: &str) -> Option<&str> {
        IniConfig::get(self, section, key)
    }
}
