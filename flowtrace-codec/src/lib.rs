mod error;
mod frame;
mod reader;
mod writer;

pub use error::CodecError;
pub use frame::{FORMAT_VERSION, FRAME_PREFIX_LEN, HEADER_LEN, MAGIC, MAX_FRAME_LEN};
pub use reader::FlowLogReader;
pub use writer::FlowLogWriter;
