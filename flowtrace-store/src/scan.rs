use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use flowtrace_codec::{CodecError, FlowLogReader};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::warn;

use crate::export::{ExportError, Exporter};
use crate::filter::HostFilter;
use crate::summary::{EndpointAggregator, EndpointEntry};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

#[derive(Debug)]
pub struct ExportReport {
    pub total_records: usize,
    pub matched_records: usize,
    pub exported: usize,
    pub failed_exports: usize,
    pub dropped_frames: usize,
    pub stopped_early: bool,
    pub endpoints: Vec<EndpointEntry>,
    pub summary_path: Option<PathBuf>,
}

impl ExportReport {
    pub fn succeeded(&self) -> bool {
        self.failed_exports == 0 && self.summary_path.is_some()
    }
}

/// Single-threaded pipeline: stream-decode, filter, classify, export. Decode
/// problems at the log tail end the scan and are counted, never fatal; I/O
/// failures on the log itself abort. A failed per-record export is logged and
/// the batch continues. The stop flag is checked between records; exports
/// written before the stop remain valid standalone documents.
pub fn run_export<R: Read>(
    mut reader: FlowLogReader<R>,
    exporter: &Exporter,
    filter: Option<&HostFilter>,
    stop: &AtomicBool,
) -> Result<ExportReport, ScanError> {
    let mut aggregator = EndpointAggregator::new();
    let mut total_records = 0;
    let mut matched_records = 0;
    let mut exported = 0;
    let mut failed_exports = 0;
    let mut stopped_early = false;

    while let Some(item) = reader.next() {
        if stop.load(Ordering::Relaxed) {
            stopped_early = true;
            break;
        }
        let record = item?;
        total_records += 1;
        if let Some(filter) = filter {
            if !filter.matches(&record) {
                continue;
            }
        }
        let index = matched_records;
        matched_records += 1;
        aggregator.observe(&record);
        match exporter.write_record(&record, index) {
            Ok(_) => exported += 1,
            Err(err) => {
                failed_exports += 1;
                warn!(index, error = %err, "failed to export record");
            }
        }
    }
    let dropped_frames = usize::from(reader.dropped_tail());
    if dropped_frames > 0 {
        warn!(dropped_frames, "flow log ended at an unreadable frame");
    }

    finish(
        exporter,
        aggregator,
        total_records,
        matched_records,
        exported,
        failed_exports,
        dropped_frames,
        stopped_early,
    )
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn finish(
    exporter: &Exporter,
    aggregator: EndpointAggregator,
    total_records: usize,
    matched_records: usize,
    exported: usize,
    mut failed_exports: usize,
    dropped_frames: usize,
    stopped_early: bool,
) -> Result<ExportReport, ScanError> {
    let endpoints = aggregator.ranked();
    let summary = summary_document(total_records, matched_records, dropped_frames, &endpoints);
    let summary_path = match exporter.write_summary(&summary) {
        Ok(path) => Some(path),
        Err(err) => {
            failed_exports += 1;
            warn!(error = %err, "failed to write summary");
            None
        }
    };

    Ok(ExportReport {
        total_records,
        matched_records,
        exported,
        failed_exports,
        dropped_frames,
        stopped_early,
        endpoints,
        summary_path,
    })
}

fn summary_document(
    total_records: usize,
    matched_records: usize,
    dropped_frames: usize,
    endpoints: &[EndpointEntry],
) -> Value {
    json!({
        "total_records": total_records,
        "matched_records": matched_records,
        "dropped_frames": dropped_frames,
        "exported_at": chrono::Utc::now().to_rfc3339(),
        "endpoints": endpoints,
    })
}
