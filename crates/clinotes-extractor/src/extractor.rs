//! Core batch extractor implementation

use crate::batching::plan_chunks;
use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::parser::parse_response;
use crate::progress::{ProgressEvent, ProgressObserver};
use crate::prompt::PromptBuilder;
use crate::types::BatchReport;
use clinotes_domain::{ClinicalNote, CompletionStats, ExtractionResult, FailureKind, FieldSchema};
use clinotes_llm::{CompletionProvider, ModelClient};
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Runs clinical notes through the model and collects structured results
pub struct BatchExtractor<P> {
    client: ModelClient<P>,
    config: ExtractorConfig,
    schema: &'static FieldSchema,
}

impl<P: CompletionProvider> BatchExtractor<P> {
    /// Create a new BatchExtractor
    pub fn new(client: ModelClient<P>, config: ExtractorConfig) -> Self {
        Self {
            client,
            config,
            schema: FieldSchema::clinical(),
        }
    }

    /// Extractor settings
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// The model client
    pub fn client(&self) -> &ModelClient<P> {
        &self.client
    }

    /// Extract fields from a single note
    ///
    /// Only configuration problems are errors; every other failure is
    /// recorded on the returned result.
    pub async fn extract_note(&self, note: &ClinicalNote) -> Result<ExtractionResult, ExtractorError> {
        self.validate()?;
        let builder = PromptBuilder::new(self.schema, self.config.max_note_chars);
        self.extract_with(&builder, note).await
    }

    /// Extract fields from every note
    ///
    /// Notes are processed in chunks of `batch_size`, with up to
    /// `max_concurrency` model calls in flight inside a chunk. Results keep
    /// input order. Cancelling `cancel` stops dispatching new notes and
    /// returns a truncated report once in-flight calls finish.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::Configuration`] if the settings are invalid
    /// or the model rejects the credentials or model id. No partial report
    /// is produced in that case.
    pub async fn run_batch(
        &self,
        notes: &[ClinicalNote],
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, ExtractorError> {
        self.validate()?;

        let run_id = Uuid::now_v7();
        let span = info_span!("batch", %run_id);
        self.run_chunks(run_id, notes, observer, cancel)
            .instrument(span)
            .await
    }

    fn validate(&self) -> Result<(), ExtractorError> {
        self.config
            .validate()
            .map_err(ExtractorError::Configuration)?;
        self.client
            .config()
            .validate()
            .map_err(|e| ExtractorError::Configuration(e.to_string()))
    }

    async fn run_chunks(
        &self,
        run_id: Uuid,
        notes: &[ClinicalNote],
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, ExtractorError> {
        let start_time = Instant::now();
        let builder = PromptBuilder::new(self.schema, self.config.max_note_chars);
        let chunks = plan_chunks(notes.len(), self.config.batch_size);
        let total_chunks = chunks.len();
        let delay = self.config.chunk_delay();

        info!(
            notes = notes.len(),
            chunks = total_chunks,
            model = %self.client.config().model_id,
            "Starting batch extraction"
        );

        let mut results = Vec::with_capacity(notes.len());
        let mut chunk_sizes = Vec::with_capacity(total_chunks);
        let mut truncated = false;

        for (chunk, range) in chunks.into_iter().enumerate() {
            if chunk > 0 && !delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            if cancel.is_cancelled() {
                truncated = true;
                break;
            }

            let chunk_notes = &notes[range];
            chunk_sizes.push(chunk_notes.len());
            observer.on_event(&ProgressEvent::ChunkStarted {
                chunk,
                total_chunks,
                size: chunk_notes.len(),
            });
            debug!(chunk = chunk + 1, total_chunks, size = chunk_notes.len(), "Processing chunk");

            let mut pending = stream::iter(
                chunk_notes
                    .iter()
                    .map(|note| self.dispatch(&builder, note, cancel)),
            )
            .buffered(self.config.max_concurrency);

            while let Some(outcome) = pending.next().await {
                let Some(result) = outcome? else {
                    truncated = true;
                    continue;
                };
                if truncated {
                    // Results must stay a prefix of the input
                    continue;
                }
                observer.on_event(&ProgressEvent::NoteCompleted {
                    position: results.len(),
                    total: notes.len(),
                    note_id: result.note_id().clone(),
                    failure: result.failure_kind(),
                });
                results.push(result);
            }

            if truncated {
                break;
            }
            observer.on_event(&ProgressEvent::ChunkCompleted {
                chunk,
                total_chunks,
                processed: results.len(),
            });
        }

        if truncated {
            warn!(
                processed = results.len(),
                total = notes.len(),
                "Batch cancelled, report is truncated"
            );
        }

        let statistics = CompletionStats::from_results(&results);
        info!(
            processed = statistics.processed,
            failures = statistics.failures,
            completion = statistics.overall_percentage(),
            "Batch extraction complete"
        );

        Ok(BatchReport {
            run_id,
            model_id: self.client.config().model_id.clone(),
            results,
            total_notes: notes.len(),
            chunk_sizes,
            truncated,
            statistics,
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        })
    }

    /// Extract one note unless the run was cancelled before it started
    async fn dispatch(
        &self,
        builder: &PromptBuilder,
        note: &ClinicalNote,
        cancel: &CancellationToken,
    ) -> Result<Option<ExtractionResult>, ExtractorError> {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        self.extract_with(builder, note).await.map(Some)
    }

    async fn extract_with(
        &self,
        builder: &PromptBuilder,
        note: &ClinicalNote,
    ) -> Result<ExtractionResult, ExtractorError> {
        let note_id = note.id().clone();

        if note.is_blank() {
            debug!(note_id = %note_id, "Blank note, skipping model call");
            return Ok(ExtractionResult::empty(note_id));
        }

        let prompt = match builder.build(note.text()) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(note_id = %note_id, error = %e, "Note rejected");
                return Ok(ExtractionResult::failed(
                    note_id,
                    FailureKind::InputTooLarge,
                    e.to_string(),
                    None,
                ));
            }
        };

        debug!(note_id = %note_id, prompt_chars = prompt.user.len(), "Calling model");
        match self.client.extract(&prompt.to_request()).await {
            Ok(raw) => Ok(parse_response(note_id, &raw, self.schema)),
            Err(e) if e.is_configuration() => Err(ExtractorError::Configuration(e.to_string())),
            Err(e) => {
                warn!(note_id = %note_id, error = %e, "Extraction unavailable");
                Ok(ExtractionResult::failed(
                    note_id,
                    FailureKind::ExtractionUnavailable,
                    e.to_string(),
                    None,
                ))
            }
        }
    }
}
