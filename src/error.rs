use thiserror::Error;

use crate::richtext::structured_document::BlockId;

/// Result of an editing operation
pub type EditResult<T> = std::result::Result<T, EditError>;

/// Errors that can occur during editing
///
/// All of these are recoverable. A caller holding a selection computed
/// against an older document should treat `UnknownBlock` and
/// `OffsetOutOfRange` as a no-op and re-resolve against the latest document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("block {0} is not part of the document")]
    UnknownBlock(BlockId),

    #[error("offset {offset} is past the end of block {block} (length {len})")]
    OffsetOutOfRange {
        block: BlockId,
        offset: usize,
        len: usize,
    },

    #[error("cannot replace a collapsed selection with empty text")]
    InvalidSelection,

    #[error("a document needs at least one block")]
    EmptyDocument,

    #[error("block id {0} appears more than once")]
    DuplicateBlock(BlockId),

    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("no suggestion candidate at index {0}")]
    NoSuchCandidate(usize),
}

impl EditError {
    /// True for errors caused by a selection that no longer matches the document
    pub fn is_stale_selection(&self) -> bool {
        matches!(
            self,
            EditError::UnknownBlock(_) | EditError::OffsetOutOfRange { .. }
        )
    }
}
