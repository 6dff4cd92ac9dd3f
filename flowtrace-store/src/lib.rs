mod config;
mod export;
mod filter;
mod scan;
mod summary;
mod worker;
#[cfg(test)]
mod scan_test;

pub use config::{ExportSettings, FilterSettings, TruncationSettings, WorkerSettings};
pub use export::{ExportError, Exporter, SLUG_MAX_CHARS, export_filename};
pub use filter::{HostFilter, filter_records};
pub use scan::{ExportReport, ScanError, run_export};
pub use summary::{EndpointAggregator, EndpointEntry};
pub use worker::{ExportWorkerConfig, run_export_parallel};
