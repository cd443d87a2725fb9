//! Line-oriented extraction of structure from free-form model replies.
//!
//! Every extractor here is pure and total: it never performs I/O, never
//! fails, and returns an empty collection when nothing matches. The
//! heuristics are tied to the reply formats requested in
//! [`crate::plan::prompts`]; keep the two in sync.

pub mod list;
pub mod objectives;
pub mod phases;
pub mod resources;
pub mod text;

pub use list::extract_list;
pub use objectives::{extract_objectives, serialize_objectives};
pub use phases::extract_phases;
pub use resources::{NO_DESCRIPTION, extract_resources};
pub use text::{strip_emphasis, truncate_chars};
