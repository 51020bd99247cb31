// Library exports for redraft

pub mod config;
pub mod error;
pub mod ingest;
pub mod richtext;
pub mod snapshot;
pub mod suggest;
pub mod workflow;

pub use error::{EditError, EditResult};
pub use richtext::range::{Segment, extract_text, resolve};
pub use richtext::range_mutator::replace_selection_with_text;
pub use richtext::selection::{Position, Selection};
pub use richtext::structured_document::{BlockId, Document, Span, StyleTag, TextBlock};
pub use richtext::style_editor::{apply_style_over_selection, remove_style_everywhere};
pub use snapshot::{Snapshot, SnapshotStore};
pub use workflow::{Delivery, SuggestionSession, WorkflowState};
