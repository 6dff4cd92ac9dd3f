use serde::{Deserialize, Serialize};

pub const DEFAULT_RESPONSE_TEXT_CAP: usize = 10_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TruncationPolicy {
    pub response_text_cap: usize,
}

impl Default for TruncationPolicy {
    fn default() -> Self {
        Self {
            response_text_cap: DEFAULT_RESPONSE_TEXT_CAP,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BodyRole {
    Request,
    Response,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum BodyPayload {
    Structured(serde_json::Value),
    Text {
        text: String,
        truncated: bool,
        original_chars: usize,
    },
    Opaque {
        byte_len: usize,
    },
}

/// Total classification of raw body bytes: JSON first, UTF-8 text second,
/// opaque length-only otherwise. Empty input classifies to nothing at all.
/// Only response bodies are truncated; request bodies pass through whole.
pub fn classify(bytes: &[u8], role: BodyRole, policy: TruncationPolicy) -> Option<BodyPayload> {
    if bytes.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(bytes) {
        return Some(BodyPayload::Structured(value));
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => {
            let original_chars = text.chars().count();
            if role == BodyRole::Response && original_chars > policy.response_text_cap {
                let capped: String = text.chars().take(policy.response_text_cap).collect();
                Some(BodyPayload::Text {
                    text: capped,
                    truncated: true,
                    original_chars,
                })
            } else {
                Some(BodyPayload::Text {
                    text: text.to_string(),
                    truncated: false,
                    original_chars,
                })
            }
        }
        Err(_) => Some(BodyPayload::Opaque {
            byte_len: bytes.len(),
        }),
    }
}
