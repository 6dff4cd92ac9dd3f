use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestData {
    pub method: String,
    pub url: String,
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
}

impl RequestData {
    /// Grouping key for endpoint aggregation. The path is taken verbatim,
    /// query string and trailing slashes included.
    pub fn endpoint(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseData {
    pub status_code: u16,
    pub reason: Option<String>,
    pub headers: Vec<(String, String)>,
}

/// One captured request/response exchange. Created once by the producer when
/// the exchange is finalized and never mutated afterwards; a missing response
/// marks the exchange as incomplete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlowRecord {
    pub started_at_unix_ms: i64,
    pub request: RequestData,
    pub response: Option<ResponseData>,
    pub request_body: Option<Vec<u8>>,
    pub response_body: Option<Vec<u8>>,
}

impl FlowRecord {
    pub fn is_complete(&self) -> bool {
        self.response.is_some()
    }
}
