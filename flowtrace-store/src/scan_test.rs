use std::sync::atomic::{AtomicBool, Ordering};

use flowtrace_codec::{FlowLogReader, FlowLogWriter};
use flowtrace_core::{FlowRecord, RequestData, ResponseData, TruncationPolicy};

use crate::export::Exporter;
use crate::filter::HostFilter;
use crate::scan::run_export;

fn record(host: &str, path: &str, status: u16) -> FlowRecord {
    FlowRecord {
        started_at_unix_ms: 1_700_000_000_000,
        request: RequestData {
            method: "GET".to_string(),
            url: format!("https://{host}{path}"),
            scheme: "https".to_string(),
            host: host.to_string(),
            port: 443,
            path: path.to_string(),
            headers: vec![("Host".to_string(), host.to_string())],
            cookies: Vec::new(),
        },
        response: Some(ResponseData {
            status_code: status,
            reason: Some("OK".to_string()),
            headers: Vec::new(),
        }),
        request_body: None,
        response_body: Some(br#"{"ok": true}"#.to_vec()),
    }
}

fn write_log(path: &std::path::Path, records: &[FlowRecord]) {
    let mut writer = FlowLogWriter::create(path).unwrap();
    for record in records {
        writer.write_record(record).unwrap();
    }
}

#[test]
fn end_to_end_export_writes_records_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("capture.flog");
    write_log(
        &log_path,
        &[
            record("api.example.com", "/a", 200),
            record("api.example.com", "/a", 404),
            record("cdn.example.com", "/b", 200),
        ],
    );

    let exporter = Exporter::new(dir.path().join("out"), TruncationPolicy::default()).unwrap();
    let reader = FlowLogReader::open(&log_path).unwrap();
    let stop = AtomicBool::new(false);
    let report = run_export(reader, &exporter, None, &stop).unwrap();

    assert_eq!(report.total_records, 3);
    assert_eq!(report.matched_records, 3);
    assert_eq!(report.exported, 3);
    assert_eq!(report.failed_exports, 0);
    assert_eq!(report.dropped_frames, 0);
    assert!(report.succeeded());

    assert!(dir.path().join("out").join("0000_GET__a.json").exists());
    assert!(dir.path().join("out").join("0002_GET__b.json").exists());

    let summary_path = report.summary_path.unwrap();
    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(summary_path).unwrap()).unwrap();
    assert_eq!(summary["total_records"], 3);
    assert_eq!(summary["matched_records"], 3);
    assert_eq!(summary["endpoints"][0]["endpoint"], "GET /a");
    assert_eq!(summary["endpoints"][0]["count"], 2);
    assert!(summary["exported_at"].is_string());
}

#[test]
fn host_filter_narrows_the_export_and_reindexes() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("capture.flog");
    write_log(
        &log_path,
        &[
            record("example.org", "/skip", 200),
            record("api.example.com", "/keep", 200),
        ],
    );

    let exporter = Exporter::new(dir.path().join("out"), TruncationPolicy::default()).unwrap();
    let reader = FlowLogReader::open(&log_path).unwrap();
    let filter = HostFilter::new("example.com");
    let stop = AtomicBool::new(false);
    let report = run_export(reader, &exporter, Some(&filter), &stop).unwrap();

    assert_eq!(report.total_records, 2);
    assert_eq!(report.matched_records, 1);
    // Matched records are re-indexed from zero.
    assert!(dir.path().join("out").join("0000_GET__keep.json").exists());
    assert!(!dir.path().join("out").join("0001_GET__keep.json").exists());
}

#[test]
fn truncated_log_tail_is_counted_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("capture.flog");
    write_log(
        &log_path,
        &[
            record("api.example.com", "/a", 200),
            record("api.example.com", "/b", 200),
        ],
    );

    // Chop the last few bytes off the final frame.
    let bytes = std::fs::read(&log_path).unwrap();
    std::fs::write(&log_path, &bytes[..bytes.len() - 5]).unwrap();

    let exporter = Exporter::new(dir.path().join("out"), TruncationPolicy::default()).unwrap();
    let reader = FlowLogReader::open(&log_path).unwrap();
    let stop = AtomicBool::new(false);
    let report = run_export(reader, &exporter, None, &stop).unwrap();

    assert_eq!(report.total_records, 1);
    assert_eq!(report.dropped_frames, 1);
    assert!(report.succeeded());

    let summary_path = report.summary_path.unwrap();
    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(summary_path).unwrap()).unwrap();
    assert_eq!(summary["dropped_frames"], 1);
}

#[test]
fn stop_flag_halts_before_any_work() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("capture.flog");
    write_log(&log_path, &[record("api.example.com", "/a", 200)]);

    let exporter = Exporter::new(dir.path().join("out"), TruncationPolicy::default()).unwrap();
    let reader = FlowLogReader::open(&log_path).unwrap();
    let stop = AtomicBool::new(false);
    stop.store(true, Ordering::Relaxed);
    let report = run_export(reader, &exporter, None, &stop).unwrap();

    assert!(report.stopped_early);
    assert_eq!(report.exported, 0);
    // The summary is still written for whatever was processed.
    assert!(report.summary_path.is_some());
}
