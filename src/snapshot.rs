use chrono::{DateTime, Utc};

use crate::richtext::structured_document::Document;

/// A document version retained for an exact rollback
#[derive(Debug, Clone)]
pub struct Snapshot {
    document: Document,
    captured_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(document: Document) -> Self {
        Snapshot {
            document,
            captured_at: Utc::now(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// The captured document, exactly as it was
    pub fn restore(self) -> Document {
        self.document
    }
}

/// Holds at most one snapshot: the document as it was before a speculative edit
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: Option<Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        SnapshotStore { current: None }
    }

    /// Retain `document`, replacing any earlier snapshot.
    /// Only a reference is kept, so this is O(1).
    pub fn capture(&mut self, document: &Document) -> Snapshot {
        let snapshot = Snapshot::new(document.clone());
        if self.current.is_some() {
            tracing::debug!("replacing existing snapshot");
        }
        self.current = Some(snapshot.clone());
        snapshot
    }

    /// The retained snapshot, if any, without removing it
    pub fn current(&self) -> Option<&Snapshot> {
        self.current.as_ref()
    }

    /// Remove and return the retained snapshot
    pub fn take(&mut self) -> Option<Snapshot> {
        self.current.take()
    }

    /// Drop the retained snapshot (the edit was committed)
    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}

/// Return the document a snapshot was taken of
pub fn restore(snapshot: Snapshot) -> Document {
    snapshot.restore()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::richtext::range_mutator::replace_selection_with_text;
    use crate::richtext::selection::{Position, Selection};
    use crate::richtext::structured_document::{BlockId, StyleTag};
    use crate::richtext::style_editor::apply_style_over_selection;

    #[test]
    fn test_restore_after_many_edits() {
        let d0 = Document::from_pairs([(BlockId(1), "Hello world"), (BlockId(2), "Goodbye now")])
            .unwrap();
        let mut store = SnapshotStore::new();
        let snapshot = store.capture(&d0);

        let sel = Selection::new(Position::new(2, 7), Position::new(1, 6));
        let styled = apply_style_over_selection(&d0, &sel, &StyleTag::pending()).unwrap();
        let (replaced, new_sel) =
            replace_selection_with_text(&styled, &sel, "Earth", Some(&StyleTag::pending())).unwrap();
        let (replaced, _) =
            replace_selection_with_text(&replaced, &new_sel, "Mars", Some(&StyleTag::pending())).unwrap();
        assert_ne!(replaced, d0);

        let restored = restore(snapshot);
        assert_eq!(restored, d0);
        assert!(restored.same_version(&d0));
    }

    #[test]
    fn test_store_holds_one_snapshot() {
        let first = Document::from_pairs([(BlockId(1), "one")]).unwrap();
        let second = Document::from_pairs([(BlockId(1), "two")]).unwrap();
        let mut store = SnapshotStore::new();
        assert!(store.is_empty());

        store.capture(&first);
        store.capture(&second);
        assert_eq!(store.current().unwrap().document(), &second);

        let taken = store.take().unwrap();
        assert_eq!(taken.restore(), second);
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear() {
        let doc = Document::new();
        let mut store = SnapshotStore::new();
        let snapshot = store.capture(&doc);
        assert!(snapshot.captured_at() <= Utc::now());
        store.clear();
        assert!(store.current().is_none());
    }
}
