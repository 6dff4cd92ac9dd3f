use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use flowtrace_core::FlowRecord;

use crate::error::CodecError;
use crate::frame::{
    FORMAT_VERSION, FRAME_PREFIX_LEN, HEADER_LEN, MAGIC, MAX_FRAME_LEN, payload_checksum,
};

/// Streaming flow log reader. Yields one record at a time with bounded memory
/// regardless of file size. A malformed or truncated trailing frame ends the
/// stream after the last valid record instead of surfacing an error; only
/// medium-level I/O failures are yielded to the caller. Not restartable: open
/// a fresh reader to rescan.
#[derive(Debug)]
pub struct FlowLogReader<R: Read> {
    inner: R,
    finished: bool,
    dropped_tail: bool,
}

impl FlowLogReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CodecError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read> FlowLogReader<R> {
    pub fn from_reader(mut inner: R) -> Result<Self, CodecError> {
        let mut header = [0u8; HEADER_LEN];
        match read_fully(&mut inner, &mut header)? {
            ReadStatus::Full => {}
            ReadStatus::Eof | ReadStatus::Partial => return Err(CodecError::BadMagic),
        }
        if header[..MAGIC.len()] != MAGIC {
            return Err(CodecError::BadMagic);
        }
        let version = header[MAGIC.len()];
        if version != FORMAT_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        Ok(Self {
            inner,
            finished: false,
            dropped_tail: false,
        })
    }

    /// True once the stream ended at an unreadable frame boundary rather than
    /// a clean end-of-file.
    pub fn dropped_tail(&self) -> bool {
        self.dropped_tail
    }

    fn end(&mut self, dropped: bool) {
        self.finished = true;
        if dropped {
            self.dropped_tail = true;
        }
    }

    fn next_record(&mut self) -> Option<Result<FlowRecord, CodecError>> {
        if self.finished {
            return None;
        }

        let mut prefix = [0u8; FRAME_PREFIX_LEN];
        match read_fully(&mut self.inner, &mut prefix) {
            Ok(ReadStatus::Full) => {}
            Ok(ReadStatus::Eof) => {
                self.end(false);
                return None;
            }
            Ok(ReadStatus::Partial) => {
                self.end(true);
                return None;
            }
            Err(err) => {
                self.end(false);
                return Some(Err(CodecError::Io(err)));
            }
        }

        let declared_len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
        let checksum = u32::from_le_bytes([prefix[4], prefix[5], prefix[6], prefix[7]]);
        if declared_len > MAX_FRAME_LEN {
            self.end(true);
            return None;
        }

        let mut payload = vec![0u8; declared_len as usize];
        match read_fully(&mut self.inner, &mut payload) {
            Ok(ReadStatus::Full) => {}
            Ok(ReadStatus::Eof) | Ok(ReadStatus::Partial) => {
                self.end(true);
                return None;
            }
            Err(err) => {
                self.end(false);
                return Some(Err(CodecError::Io(err)));
            }
        }

        if payload_checksum(&payload) != checksum {
            self.end(true);
            return None;
        }

        match serde_json::from_slice(&payload) {
            Ok(record) => Some(Ok(record)),
            Err(_) => {
                self.end(true);
                None
            }
        }
    }
}

impl<R: Read> Iterator for FlowLogReader<R> {
    type Item = Result<FlowRecord, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
    }
}

enum ReadStatus {
    Full,
    Partial,
    Eof,
}

fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<ReadStatus> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(if filled == buf.len() {
        ReadStatus::Full
    } else if filled == 0 {
        ReadStatus::Eof
    } else {
        ReadStatus::Partial
    })
}
