//! The routing fabric: the `Adapter` trait and its concrete protocol implementations, the
//! `Translator`/`Distributor` machinery that wires them together, and the concrete `Record`
//! variants they exchange (§4.3-§4.6).

pub mod adapter;
pub mod adapters;
pub mod distributor;
pub mod errors;
pub mod ingress;
pub mod records;
pub mod registry;
pub mod translator;

pub use adapter::{dangling_target, Adapter, AdapterCore, IDLE_SLEEP};
pub use distributor::Distributor;
pub use errors::{AdapterError, TranslateError};
pub use ingress::IngressQueue;
pub use registry::AdapterRegistry;
pub use translator::{parse_rewrite_table, RewriteTable, Translator};
