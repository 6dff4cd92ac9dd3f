mod body;
mod record;

pub use body::{BodyPayload, BodyRole, DEFAULT_RESPONSE_TEXT_CAP, TruncationPolicy, classify};
pub use record::{FlowRecord, RequestData, ResponseData};
