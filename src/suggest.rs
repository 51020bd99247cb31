// Suggestion requests
// What the workflow hands to the external rewrite service, and the seam
// that service plugs into.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Identifies one request so a late response can be matched to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of rewrite being asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionMode {
    /// One of the predefined actions ("Expand", "Summarise", ...)
    QuickAction(String),
    /// A free-form instruction typed by the user
    CustomPrompt(String),
}

impl SuggestionMode {
    /// Mode string understood by the suggestion service: a kind digit
    /// followed by the label, lowercased, with whitespace runs turned into
    /// underscores.
    pub fn wire_name(&self) -> String {
        let (prefix, label) = match self {
            SuggestionMode::QuickAction(label) => ("1", label),
            SuggestionMode::CustomPrompt(prompt) => ("4", prompt),
        };
        format!("{}{}", prefix, WHITESPACE.replace_all(&label.to_lowercase(), "_"))
    }
}

impl fmt::Display for SuggestionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.wire_name())
    }
}

/// A request for rewrite candidates of a text fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionRequest {
    pub id: RequestId,
    pub fragment: String,
    pub instructions: String,
    pub mode: SuggestionMode,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SuggestError {
    #[error("suggestion service failed: {0}")]
    Service(String),
    #[error("suggestion service returned no candidates")]
    NoCandidates,
}

/// The external rewrite service. Implementations own retries and timeouts.
pub trait SuggestionProvider {
    fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<String>, SuggestError>;
}

/// Returns the same candidates for every request
#[derive(Debug, Clone, Default)]
pub struct StaticSuggestions {
    candidates: Vec<String>,
}

impl StaticSuggestions {
    pub fn new(candidates: impl IntoIterator<Item = impl Into<String>>) -> Self {
        StaticSuggestions {
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }
}

impl SuggestionProvider for StaticSuggestions {
    fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<String>, SuggestError> {
        tracing::debug!(
            request = %request.id,
            mode = %request.mode,
            fragment_len = request.fragment.chars().count(),
            "static suggestions"
        );
        if self.candidates.is_empty() {
            return Err(SuggestError::NoCandidates);
        }
        Ok(self.candidates.clone())
    }
}
