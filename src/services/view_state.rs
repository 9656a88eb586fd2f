//! Presentation-side selection state with last-request-wins semantics

use std::sync::Arc;
use tracing::debug;

use crate::types::{Dataset, Result, Selection};

/// Handle for one in-flight request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    id: u64,
    selection: Selection,
}

impl RequestTicket {
    pub fn selection(&self) -> Selection {
        self.selection
    }
}

/// What the presentation layer renders.
///
/// Only the most recent request may change the state. When it fails,
/// the last good dataset stays and `error` holds the message.
#[derive(Debug, Default)]
pub struct ViewState {
    latest: u64,
    loading: bool,
    selection: Option<Selection>,
    dataset: Option<Arc<Dataset>>,
    error: Option<String>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, selection: Selection) -> RequestTicket {
        self.latest += 1;
        self.loading = true;
        RequestTicket {
            id: self.latest,
            selection,
        }
    }

    /// Apply a finished request. Returns false if a newer request has
    /// been issued since, in which case nothing changes.
    pub fn complete(&mut self, ticket: RequestTicket, result: Result<Arc<Dataset>>) -> bool {
        if ticket.id != self.latest {
            debug!(
                ticket = ticket.id,
                latest = self.latest,
                selection = %ticket.selection,
                "discarding superseded result"
            );
            return false;
        }

        self.loading = false;
        match result {
            Ok(dataset) => {
                self.selection = Some(ticket.selection);
                self.dataset = Some(dataset);
                self.error = None;
            }
            Err(e) => {
                self.error = Some(e.to_string());
            }
        }
        true
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Selection of the dataset currently shown
    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn dataset(&self) -> Option<&Arc<Dataset>> {
        self.dataset.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
