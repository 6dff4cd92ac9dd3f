use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{bounded, unbounded};
use flowtrace_core::FlowRecord;
use tracing::warn;

use flowtrace_codec::FlowLogReader;

use crate::export::Exporter;
use crate::filter::HostFilter;
use crate::scan::{ExportReport, ScanError, finish};
use crate::summary::EndpointAggregator;

#[derive(Debug, Clone)]
pub struct ExportWorkerConfig {
    pub workers: usize,
    pub queue_depth: usize,
}

impl Default for ExportWorkerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_depth: 256,
        }
    }
}

/// Parallel variant of the export pipeline: the calling thread stream-decodes
/// the log, aggregates the summary (single accumulating owner), and feeds a
/// bounded channel; worker threads classify bodies and write the per-record
/// files. Each matched record owns a distinct index, so output filenames never
/// collide across workers.
pub fn run_export_parallel<R: Read>(
    mut reader: FlowLogReader<R>,
    exporter: &Exporter,
    filter: Option<&HostFilter>,
    stop: &AtomicBool,
    config: ExportWorkerConfig,
) -> Result<ExportReport, ScanError> {
    let workers = config.workers.max(1);
    let (job_tx, job_rx) = bounded::<(usize, FlowRecord)>(config.queue_depth);
    // Results are unbounded so a worker can never stall the decode loop by
    // blocking on a full result queue while the job queue is also full.
    let (result_tx, result_rx) = unbounded::<bool>();

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for (index, record) in job_rx.iter() {
                    let ok = match exporter.write_record(&record, index) {
                        Ok(_) => true,
                        Err(err) => {
                            warn!(index, error = %err, "failed to export record");
                            false
                        }
                    };
                    if result_tx.send(ok).is_err() {
                        break;
                    }
                }
            });
        }
        drop(job_rx);
        drop(result_tx);

        let mut aggregator = EndpointAggregator::new();
        let mut total_records = 0;
        let mut matched_records = 0;
        let mut stopped_early = false;
        let mut decode_error = None;

        while let Some(item) = reader.next() {
            if stop.load(Ordering::Relaxed) {
                stopped_early = true;
                break;
            }
            let record = match item {
                Ok(record) => record,
                Err(err) => {
                    decode_error = Some(err);
                    break;
                }
            };
            total_records += 1;
            if let Some(filter) = filter {
                if !filter.matches(&record) {
                    continue;
                }
            }
            let index = matched_records;
            matched_records += 1;
            aggregator.observe(&record);
            if job_tx.send((index, record)).is_err() {
                break;
            }
        }
        drop(job_tx);

        let mut exported = 0;
        let mut failed_exports = 0;
        for ok in result_rx.iter() {
            if ok {
                exported += 1;
            } else {
                failed_exports += 1;
            }
        }

        if let Some(err) = decode_error {
            return Err(err.into());
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
    })
}
