//! End-to-end enrichment run: input table → enrich each row → result store.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use compenrich_completion::CompletionClient;
use compenrich_shared::{FailureRecord, InputRow, OutputEntry, Result};
use compenrich_storage::ResultStore;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::enrichment::{Enricher, EnrichmentOutcome};
use crate::input::{InputReader, ParsedRow};

/// Configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Input table location.
    pub input_path: PathBuf,
    /// Field delimiter of the input table.
    pub delimiter: char,
    /// Stop after this many enriched-or-failed rows.
    pub limit: Option<usize>,
}

/// Counters for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Data rows read from the input, skipped ones included.
    pub rows_read: usize,
    /// Rows without a company name.
    pub rows_skipped: usize,
    /// Rows persisted as verified records.
    pub enriched: usize,
    /// Rows persisted as "no valid data" records.
    pub failed: usize,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Entries appended to the store during this run.
    pub fn persisted(&self) -> usize {
        self.enriched + self.failed
    }
}

/// Callback for per-row pipeline events.
pub trait PipelineObserver: Send + Sync {
    /// Called before a row is sent for enrichment.
    fn row_started(&self, row: &InputRow);
    /// Called for a row that has no company name.
    fn row_skipped(&self, row_number: usize);
    /// Called when the reply for a company was not a usable JSON record.
    fn unparsable_response(&self, company_name: &str, raw: &str);
    /// Called after an entry has been written to the store.
    fn entry_persisted(&self, row: &InputRow, entry: &OutputEntry);
    /// Called when the run completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op observer for headless/test usage.
pub struct SilentObserver;

impl PipelineObserver for SilentObserver {
    fn row_started(&self, _row: &InputRow) {}
    fn row_skipped(&self, _row_number: usize) {}
    fn unparsable_response(&self, _company_name: &str, _raw: &str) {}
    fn entry_persisted(&self, _row: &InputRow, _entry: &OutputEntry) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Run the pipeline over every row of the input table.
///
/// Rows are handled strictly one at a time and each result is persisted
/// before the next row is read. A failed completion call aborts the run;
/// entries already appended stay on disk.
#[instrument(skip_all, fields(run_id = %Uuid::now_v7(), input = %config.input_path.display()))]
pub async fn run<C, S>(
    config: &RunConfig,
    enricher: &Enricher<C>,
    store: &mut S,
    observer: &dyn PipelineObserver,
) -> Result<RunSummary>
where
    C: CompletionClient,
    S: ResultStore,
{
    let start = Instant::now();
    let mut summary = RunSummary::default();

    info!(model = %enricher.config().model, "starting enrichment run");

    let rows = InputReader::open(&config.input_path, config.delimiter)?;

    for parsed in rows {
        if config.limit.is_some_and(|limit| summary.persisted() >= limit) {
            info!(limit = config.limit, "row limit reached");
            break;
        }

        summary.rows_read += 1;
        let row = match parsed? {
            ParsedRow::Row(row) => row,
            ParsedRow::Skipped { row_number } => {
                debug!(row_number, "skipping row without company name");
                summary.rows_skipped += 1;
                observer.row_skipped(row_number);
                continue;
            }
        };

        observer.row_started(&row);
        let outcome = enricher
            .enrich(&row.company_name, row.zone.as_deref())
            .await?;

        let entry = match outcome {
            EnrichmentOutcome::Verified(record) => {
                summary.enriched += 1;
                OutputEntry::Enriched(record)
            }
            EnrichmentOutcome::Empty => {
                summary.failed += 1;
                FailureRecord::no_valid_data(&row.company_name).into()
            }
            EnrichmentOutcome::Unparsable { raw, .. } => {
                observer.unparsable_response(&row.company_name, &raw);
                summary.failed += 1;
                FailureRecord::no_valid_data(&row.company_name).into()
            }
        };

        store.append(&entry)?;
        debug!(
            row_number = row.row_number,
            company = %row.company_name,
            failed = entry.is_failure(),
            "entry persisted"
        );
        observer.entry_persisted(&row, &entry);
    }

    summary.elapsed = start.elapsed();
    observer.done(&summary);

    info!(
        rows_read = summary.rows_read,
        rows_skipped = summary.rows_skipped,
        enriched = summary.enriched,
        failed = summary.failed,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "enrichment run complete"
    );

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
