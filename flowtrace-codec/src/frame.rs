use flowtrace_core::FlowRecord;

use crate::error::CodecError;

pub const MAGIC: [u8; 4] = *b"FLOG";
pub const FORMAT_VERSION: u8 = 1;
pub const HEADER_LEN: usize = MAGIC.len() + 1;

/// u32 LE payload length followed by u32 LE CRC-32 of the payload.
pub const FRAME_PREFIX_LEN: usize = 8;

/// Upper bound on a declared payload length. A corrupt prefix must not be
/// able to trigger an arbitrarily large allocation.
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

const CRC32: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISCSI);

pub fn payload_checksum(payload: &[u8]) -> u32 {
    CRC32.checksum(payload)
}

/// Serializes one record into a complete frame: prefix plus payload, ready to
/// be appended as a single write.
pub fn encode_frame(record: &FlowRecord) -> Result<Vec<u8>, CodecError> {
    let payload = serde_json::to_vec(record).map_err(|err| CodecError::Encode(err.to_string()))?;
    if payload.len() > MAX_FRAME_LEN as usize {
        return Err(CodecError::Encode(format!(
            "record payload of {} bytes exceeds frame limit",
            payload.len()
        )));
    }
    let mut frame = Vec::with_capacity(FRAME_PREFIX_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload_checksum(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}
