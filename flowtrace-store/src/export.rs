use std::fs;
use std::path::{Path, PathBuf};

use chrono::DateTime;
use flowtrace_core::{BodyPayload, BodyRole, FlowRecord, TruncationPolicy, classify};
use serde_json::{Map, Value, json};
use thiserror::Error;

pub const SLUG_MAX_CHARS: usize = 50;

const SUMMARY_FILENAME: &str = "_summary.json";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes one readable JSON document per record plus a `_summary.json` into a
/// target directory. Existing files at computed paths are overwritten
/// silently; the zero-padded index prefix is the only collision avoidance.
pub struct Exporter {
    output_dir: PathBuf,
    policy: TruncationPolicy,
}

impl Exporter {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        policy: TruncationPolicy,
    ) -> Result<Self, ExportError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(|source| ExportError::Io {
            path: output_dir.clone(),
            source,
        })?;
        Ok(Self { output_dir, policy })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Builds the export document for one record. Header and cookie lists are
    /// collapsed into plain objects with last-value-wins on duplicate names;
    /// HTTP allows repeated headers, so this flattening is lossy by design of
    /// the export format.
    pub fn document(&self, record: &FlowRecord, index: usize) -> Value {
        let mut request_doc = Map::new();
        request_doc.insert(
            "timestamp".to_string(),
            Value::String(format_timestamp(record.started_at_unix_ms)),
        );
        request_doc.insert(
            "method".to_string(),
            Value::String(record.request.method.clone()),
        );
        request_doc.insert("url".to_string(), Value::String(record.request.url.clone()));
        request_doc.insert(
            "host".to_string(),
            Value::String(record.request.host.clone()),
        );
        request_doc.insert(
            "path".to_string(),
            Value::String(record.request.path.clone()),
        );
        request_doc.insert(
            "headers".to_string(),
            Value::Object(collapse_pairs(&record.request.headers)),
        );
        request_doc.insert(
            "cookies".to_string(),
            Value::Object(collapse_pairs(&record.request.cookies)),
        );
        if let Some(body) = body_value(
            record.request_body.as_deref(),
            BodyRole::Request,
            self.policy,
        ) {
            request_doc.insert("body".to_string(), body);
        }

        let response_doc = record.response.as_ref().map(|response| {
            let mut doc = Map::new();
            doc.insert(
                "status_code".to_string(),
                Value::Number(response.status_code.into()),
            );
            doc.insert(
                "reason".to_string(),
                response
                    .reason
                    .as_ref()
                    .map(|reason| Value::String(reason.clone()))
                    .unwrap_or(Value::Null),
            );
            doc.insert(
                "headers".to_string(),
                Value::Object(collapse_pairs(&response.headers)),
            );
            if let Some(body) = body_value(
                record.response_body.as_deref(),
                BodyRole::Response,
                self.policy,
            ) {
                doc.insert("body".to_string(), body);
            }
            doc
        });

        json!({
            "index": index,
            "request": Value::Object(request_doc),
            "response": response_doc.map(Value::Object).unwrap_or(Value::Null),
        })
    }

    pub fn write_record(&self, record: &FlowRecord, index: usize) -> Result<PathBuf, ExportError> {
        let filename = export_filename(index, &record.request.method, &record.request.path);
        let path = self.output_dir.join(filename);
        let document = self.document(record, index);
        write_json(&path, &document)?;
        Ok(path)
    }

    pub fn write_summary(&self, summary: &Value) -> Result<PathBuf, ExportError> {
        let path = self.output_dir.join(SUMMARY_FILENAME);
        write_json(&path, summary)?;
        Ok(path)
    }
}

/// `<4-digit index>_<METHOD>_<slug>.json`, where the slug is the request path
/// with slashes replaced and capped at [`SLUG_MAX_CHARS`] characters so it
/// stays a single valid filename component.
pub fn export_filename(index: usize, method: &str, path: &str) -> String {
    let slug: String = path.replace('/', "_").chars().take(SLUG_MAX_CHARS).collect();
    format!("{index:04}_{method}_{slug}.json")
}

fn write_json(path: &Path, value: &Value) -> Result<(), ExportError> {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string());
    fs::write(path, rendered).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn body_value(body: Option<&[u8]>, role: BodyRole, policy: TruncationPolicy) -> Option<Value> {
    let payload = classify(body?, role, policy)?;
    Some(match payload {
        BodyPayload::Structured(value) => value,
        BodyPayload::Text {
            text,
            truncated: false,
            ..
        } => Value::String(text),
        BodyPayload::Text {
            text,
            truncated: true,
            original_chars,
        } => Value::String(format!(
            "{text}... (truncated, total {original_chars} chars)"
        )),
        BodyPayload::Opaque { byte_len } => Value::String(format!("<binary: {byte_len} bytes>")),
    })
}

fn collapse_pairs(pairs: &[(String, String)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (name, value) in pairs {
        map.insert(name.clone(), Value::String(value.clone()));
    }
    map
}

fn format_timestamp(unix_ms: i64) -> String {
    DateTime::from_timestamp_millis(unix_ms)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| unix_ms.to_string())
}
