//! Progress reporting for batch runs

use clinotes_domain::{FailureKind, NoteId};

/// Something that happened during a batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A chunk is about to be processed
    ChunkStarted {
        /// Zero-based chunk index
        chunk: usize,
        /// Number of chunks in the run
        total_chunks: usize,
        /// Notes in this chunk
        size: usize,
    },

    /// A note has its result
    NoteCompleted {
        /// Zero-based position in the input
        position: usize,
        /// Notes in the run
        total: usize,
        /// The note
        note_id: NoteId,
        /// Failure category, if extraction failed
        failure: Option<FailureKind>,
    },

    /// Every note of a chunk has its result
    ChunkCompleted {
        /// Zero-based chunk index
        chunk: usize,
        /// Number of chunks in the run
        total_chunks: usize,
        /// Notes with results so far
        processed: usize,
    },
}

/// Receives progress events
///
/// Implemented for any `Fn(&ProgressEvent)` closure.
pub trait ProgressObserver: Send + Sync {
    /// Handle one event
    fn on_event(&self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_event(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_event(&self, _event: &ProgressEvent) {}
}
