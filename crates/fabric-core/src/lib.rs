//! Dynamic [`Value`] union, the polymorphic [`Record`] entity, and the key-expression protocol
//! (§3 of the specification) shared by every Adapter implementation.

mod key;
mod record;
mod value;

pub use key::{eval as eval_key, parse as parse_key, KeyError, KeyExpr};
pub use record::{get_base_field, own_id_to_source_record_id, BaseRecord, Record, RecordKind};
pub use value::{parse_map_literal, parse_seq_literal, render_map, render_seq, OrderedMap, OrderedSeq, Value};
