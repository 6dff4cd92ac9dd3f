use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use flowtrace_core::FlowRecord;

use crate::error::CodecError;
use crate::frame::{FORMAT_VERSION, HEADER_LEN, MAGIC, encode_frame};

/// Append-only flow log writer. Existing frames are never rewritten; each
/// record is encoded into one buffer and appended with a single write so a
/// failed call cannot leave a frame whose declared length disagrees with its
/// actual byte count.
#[derive(Debug)]
pub struct FlowLogWriter<W: Write> {
    inner: W,
}

impl FlowLogWriter<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, CodecError> {
        let file = File::create(path)?;
        Self::start(file)
    }

    /// Opens an existing log for appending, validating its header first. A
    /// missing file is created fresh.
    pub fn append(path: impl AsRef<Path>) -> Result<Self, CodecError> {
        let path = path.as_ref();
        if !path.exists() {
            return Self::create(path);
        }
        let mut probe = File::open(path)?;
        let mut header = [0u8; HEADER_LEN];
        if probe.read_exact(&mut header).is_err() {
            return Err(CodecError::BadMagic);
        }
        if header[..MAGIC.len()] != MAGIC {
            return Err(CodecError::BadMagic);
        }
        let version = header[MAGIC.len()];
        if version != FORMAT_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        let file = OpenOptions::new().append(true).open(path)?;
        Ok(Self { inner: file })
    }
}

impl<W: Write> FlowLogWriter<W> {
    /// Wraps a fresh sink and writes the file header.
    pub fn start(mut inner: W) -> Result<Self, CodecError> {
        inner.write_all(&MAGIC)?;
        inner.write_all(&[FORMAT_VERSION])?;
        inner.flush()?;
        Ok(Self { inner })
    }

    pub fn write_record(&mut self, record: &FlowRecord) -> Result<(), CodecError> {
        let frame = encode_frame(record)?;
        self.inner.write_all(&frame)?;
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
