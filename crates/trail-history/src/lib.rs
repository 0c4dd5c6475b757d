//! Field history resolution: decode audit payloads, resolve labels, assemble records,
//! and coordinate fetches for one field-history session.

mod assembler;
mod labels;
mod session;

pub use assembler::assemble;
pub use labels::resolve_label;
pub use session::{FetchOutcome, HistorySession};
pub use trail_types::{FieldContext, FieldMetadata, HistoryRecord, HistoryState};
