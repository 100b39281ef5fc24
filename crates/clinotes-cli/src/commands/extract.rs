//! Extract command implementation.

use crate::cli::{ExportFormat, ExtractArgs};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::export::{self, ExportOptions};
use crate::input::NoteSource;
use crate::output::Formatter;
use clinotes_domain::ClinicalNote;
use clinotes_extractor::{BatchExtractor, BatchReport, ProgressEvent};
use clinotes_llm::{CompletionProvider, ModelClient};
use futures::{Stream, StreamExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// Exit status after a forced second interrupt.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Execute the extract command.
pub async fn execute_extract(args: ExtractArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let model_config = config.model_config(&args)?;
    let extractor_config = config.extractor_config(&args)?;

    let source = NoteSource::detect(&args.input, &args.column, args.id_column.as_deref());
    let table = source.load().map_err(CliError::Input)?;
    let notes = &table.notes;
    if notes.is_empty() {
        return Err(CliError::InvalidInput(format!(
            "No notes found in {}",
            args.input.display()
        )));
    }

    let client = ModelClient::fireworks(model_config)?;
    let extractor = BatchExtractor::new(client, extractor_config);

    let cancel = CancellationToken::new();
    let interrupt = cancel_on_interrupt(cancel.clone());
    let report = run_extraction(&extractor, notes, formatter, &cancel).await;
    interrupt.abort();
    let report = report?;

    if report.truncated {
        eprintln!(
            "{}",
            formatter.warning(&format!(
                "Run interrupted: {} of {} notes processed",
                report.processed(),
                report.total_notes
            ))
        );
    }

    match &args.output {
        Some(path) => {
            let format = ExportFormat::resolve(args.export, path);
            let options = ExportOptions {
                drop_empty: args.drop_empty,
                source: args.keep_columns.then_some(&table.columns),
            };
            if args.keep_columns && table.columns.is_empty() {
                eprintln!(
                    "{}",
                    formatter.warning("--keep-columns has no effect for a directory of .txt notes")
                );
            }
            let rows = export::export_results(path, format, &report.results, options).map_err(CliError::Export)?;
            eprintln!(
                "{}",
                formatter.success(&format!("Wrote {} row(s) to {}", rows, path.display()))
            );
        }
        None => eprintln!(
            "{}",
            formatter.info("Per-note results were not saved; pass --output to export them")
        ),
    }

    println!("{}", formatter.format_report(&report)?);
    Ok(())
}

/// Run a batch, printing progress lines to stderr.
pub async fn run_extraction<P: CompletionProvider>(
    extractor: &BatchExtractor<P>,
    notes: &[ClinicalNote],
    formatter: &Formatter,
    cancel: &CancellationToken,
) -> Result<BatchReport> {
    let observer = |event: &ProgressEvent| {
        if let Some(line) = formatter.progress(event) {
            eprintln!("{}", line);
        }
    };
    Ok(extractor.run_batch(notes, &observer, cancel).await?)
}

/// Cancel the run on Ctrl+C; in-flight notes still finish. A second Ctrl+C
/// exits at once.
fn cancel_on_interrupt(cancel: CancellationToken) -> JoinHandle<()> {
    let signals = futures::stream::unfold((), |()| async {
        tokio::signal::ctrl_c().await.ok().map(|()| ((), ()))
    });
    tokio::spawn(watch_interrupts(Box::pin(signals), cancel, || {
        std::process::exit(INTERRUPTED_EXIT_CODE);
    }))
}

/// Cancel on the first interrupt, then call `force_exit` on the second.
async fn watch_interrupts<S, F>(mut interrupts: S, cancel: CancellationToken, force_exit: F)
where
    S: Stream<Item = ()> + Unpin,
    F: FnOnce(),
{
    if interrupts.next().await.is_none() {
        return;
    }
    warn!("Interrupt received, finishing notes already in flight; press Ctrl+C again to quit");
    cancel.cancel();

    if interrupts.next().await.is_some() {
        error!("Second interrupt received, exiting without saving results");
        force_exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test]
    async fn test_first_interrupt_cancels() {
        let cancel = CancellationToken::new();
        let exited = Cell::new(false);
        watch_interrupts(futures::stream::iter([()]), cancel.clone(), || exited.set(true)).await;
        assert!(cancel.is_cancelled());
        assert!(!exited.get());
    }

    #[tokio::test]
    async fn test_second_interrupt_forces_exit() {
        let cancel = CancellationToken::new();
        let exited = Cell::new(false);
        watch_interrupts(futures::stream::iter([(), ()]), cancel.clone(), || exited.set(true)).await;
        assert!(cancel.is_cancelled());
        assert!(exited.get());
    }

    #[tokio::test]
    async fn test_no_interrupt_leaves_run_alone() {
        let cancel = CancellationToken::new();
        watch_interrupts(futures::stream::empty(), cancel.clone(), || panic!("exited")).await;
        assert!(!cancel.is_cancelled());
    }
}
