// Suggestion workflow
// Sequences the engine operations for one "rewrite this selection" cycle:
// highlight, ask for candidates, apply one, then accept or roll back.

use chrono::Utc;

use crate::error::{EditError, EditResult};
use crate::richtext::range::extract_text;
use crate::richtext::range_mutator::replace_selection_with_text;
use crate::richtext::selection::Selection;
use crate::richtext::structured_document::{Document, StyleTag};
use crate::richtext::style_editor::{apply_style_over_selection, remove_style_everywhere};
use crate::snapshot::SnapshotStore;
use crate::suggest::{RequestId, SuggestionMode, SuggestionRequest};

/// Where the current edit cycle is
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    /// A range is marked for rewriting but nothing was requested yet
    Highlighting { selection: Selection },
    /// The range carries the pending highlight and a request is in flight
    AwaitingSuggestions {
        selection: Selection,
        request: RequestId,
    },
    /// Candidates arrived; the document has not been changed by them.
    /// `request` is the latest request, whose answer may still come in.
    PresentingOptions {
        selection: Selection,
        request: RequestId,
        candidates: Vec<String>,
        stale: bool,
    },
    /// A candidate replaced the range; `selection` covers the inserted text
    Applied {
        selection: Selection,
        candidates: Vec<String>,
        chosen: usize,
    },
}

impl WorkflowState {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Highlighting { .. } => "highlighting",
            WorkflowState::AwaitingSuggestions { .. } => "awaiting suggestions",
            WorkflowState::PresentingOptions { .. } => "presenting options",
            WorkflowState::Applied { .. } => "applied",
        }
    }

    /// The range the cycle is working on, if any
    pub fn selection(&self) -> Option<&Selection> {
        match self {
            WorkflowState::Idle => None,
            WorkflowState::Highlighting { selection }
            | WorkflowState::AwaitingSuggestions { selection, .. }
            | WorkflowState::PresentingOptions { selection, .. }
            | WorkflowState::Applied { selection, .. } => Some(selection),
        }
    }
}

/// What happened to a batch of candidates handed to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Candidates are now presented. `stale` is set when they answer an
    /// older request than the latest one.
    Presented { stale: bool },
    /// The session had already moved on; nothing changed
    Discarded,
}

/// One document plus the state of its suggestion cycle
#[derive(Debug)]
pub struct SuggestionSession {
    document: Document,
    state: WorkflowState,
    snapshots: SnapshotStore,
    pending_tag: StyleTag,
    next_request: u64,
}

impl SuggestionSession {
    pub fn new(document: Document) -> Self {
        Self::with_pending_tag(document, StyleTag::pending())
    }

    /// Use `tag` instead of `PENDING` to mark suggested text
    pub fn with_pending_tag(document: Document, tag: StyleTag) -> Self {
        SuggestionSession {
            document,
            state: WorkflowState::Idle,
            snapshots: SnapshotStore::new(),
            pending_tag: tag,
            next_request: 1,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn pending_tag(&self) -> &StyleTag {
        &self.pending_tag
    }

    pub fn is_idle(&self) -> bool {
        self.state == WorkflowState::Idle
    }

    fn invalid(&self, operation: &'static str) -> EditError {
        EditError::InvalidState {
            operation,
            state: self.state.name(),
        }
    }

    fn transition(&mut self, next: WorkflowState) {
        tracing::info!(from = self.state.name(), to = next.name(), "workflow");
        self.state = next;
    }

    /// Start a cycle on `selection`.
    ///
    /// A collapsed selection, or one holding only whitespace, becomes the
    /// whole document. If a cycle is already running its highlight is
    /// cleared but its snapshot is kept, so cancelling still returns to the
    /// document as it was before the first highlight.
    pub fn highlight(&mut self, selection: Selection) -> EditResult<Selection> {
        let text = extract_text(&self.document, &selection)?;

        if !self.is_idle() {
            tracing::debug!(state = self.state.name(), "restarting highlight");
            self.document = remove_style_everywhere(&self.document, &self.pending_tag);
        }

        let selection = if selection.is_collapsed() || text.trim().is_empty() {
            Selection::whole_document(&self.document)
        } else {
            selection
        };

        if self.snapshots.is_empty() {
            self.snapshots.capture(&self.document);
        }
        self.transition(WorkflowState::Highlighting { selection });
        Ok(selection)
    }

    /// Mark the range as pending and build the request for the suggestion
    /// service.
    ///
    /// Valid while highlighting, while a request is already in flight (a
    /// retry: the earlier response will arrive flagged stale), and after a
    /// candidate was applied (a resubmit of the inserted text).
    pub fn request_suggestions(
        &mut self,
        instructions: &str,
        mode: SuggestionMode,
    ) -> EditResult<SuggestionRequest> {
        let selection = match &self.state {
            WorkflowState::Highlighting { selection }
            | WorkflowState::AwaitingSuggestions { selection, .. }
            | WorkflowState::Applied { selection, .. } => *selection,
            _ => return Err(self.invalid("request suggestions")),
        };

        let document = apply_style_over_selection(&self.document, &selection, &self.pending_tag)?;
        let fragment = extract_text(&document, &selection)?;

        let id = RequestId(self.next_request);
        self.next_request += 1;
        self.document = document;

        tracing::info!(request = %id, %mode, fragment_len = fragment.chars().count(), "request suggestions");
        self.transition(WorkflowState::AwaitingSuggestions {
            selection,
            request: id,
        });

        Ok(SuggestionRequest {
            id,
            fragment,
            instructions: instructions.to_string(),
            mode,
            issued_at: Utc::now(),
        })
    }

    /// Hand over candidates returned for `request`.
    /// Does not touch the document.
    ///
    /// Candidates are taken while a request is in flight and while options
    /// are presented. An answer to the latest request replaces whatever is
    /// presented; an answer to an older one only replaces options that are
    /// stale themselves. Once a candidate was applied, or the cycle ended,
    /// nothing is taken.
    pub fn receive_candidates(&mut self, request: RequestId, candidates: Vec<String>) -> Delivery {
        let (selection, latest) = match &self.state {
            WorkflowState::AwaitingSuggestions { selection, request } => (*selection, *request),
            WorkflowState::PresentingOptions {
                selection,
                request: latest,
                stale,
                ..
            } if request == *latest || *stale => (*selection, *latest),
            state => {
                tracing::warn!(%request, state = state.name(), "discarding late suggestions");
                return Delivery::Discarded;
            }
        };

        let stale = request != latest;
        if stale {
            tracing::warn!(%request, %latest, "suggestions answer an older request");
        }
        self.transition(WorkflowState::PresentingOptions {
            selection,
            request: latest,
            candidates,
            stale,
        });
        Delivery::Presented { stale }
    }

    /// Replace the range with candidate `index`, highlighted as pending.
    ///
    /// Picking again after a candidate was applied swaps the inserted text
    /// for the new pick. On error the session is left unchanged.
    pub fn choose(&mut self, index: usize) -> EditResult<Selection> {
        let (selection, candidates) = match &self.state {
            WorkflowState::PresentingOptions {
                selection,
                candidates,
                ..
            }
            | WorkflowState::Applied {
                selection,
                candidates,
                ..
            } => (*selection, candidates),
            _ => return Err(self.invalid("choose a suggestion")),
        };
        let candidate = candidates
            .get(index)
            .ok_or(EditError::NoSuchCandidate(index))?;

        let (document, inserted) = replace_selection_with_text(
            &self.document,
            &selection,
            candidate,
            Some(&self.pending_tag),
        )?;

        let candidates = candidates.clone();
        self.document = document;
        self.transition(WorkflowState::Applied {
            selection: inserted,
            candidates,
            chosen: index,
        });
        Ok(inserted)
    }

    /// Keep the applied text: strip the pending highlight and forget the snapshot
    pub fn accept(&mut self) -> EditResult<&Document> {
        if !matches!(self.state, WorkflowState::Applied { .. }) {
            return Err(self.invalid("accept"));
        }
        self.document = remove_style_everywhere(&self.document, &self.pending_tag);
        self.snapshots.clear();
        self.transition(WorkflowState::Idle);
        Ok(&self.document)
    }

    /// Abandon the cycle and return to the document as it was before it
    /// started. Valid in any state; when idle nothing changes.
    pub fn cancel(&mut self) -> &Document {
        if let Some(snapshot) = self.snapshots.take() {
            tracing::info!(captured_at = %snapshot.captured_at(), "reverting to snapshot");
            self.document = snapshot.restore();
        }
        if !self.is_idle() {
            self.transition(WorkflowState::Idle);
        }
        &self.document
    }
}
