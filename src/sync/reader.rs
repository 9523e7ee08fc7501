use std::io::Read;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::compression::{self, Source};
use crate::header::{FrameHeader, DEVICE_APPS_TYPE};
use crate::parse::{self, ParseError};
use crate::record::DeviceApps;

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("frame header magic is 0x{0:08x}; log stream is corrupt or misaligned")]
    FrameCorruption(u32),

    #[error("truncated frame header: got {0} of 8 bytes")]
    TruncatedHeader(usize),

    #[error("truncated payload: header declared {expected} bytes, got {got}")]
    TruncatedPayload { expected: usize, got: usize },

    #[error("payload does not decode as a device/apps message")]
    Codec(#[source] ParseError),

    #[error("failed to read log file")]
    Io(#[from] std::io::Error),
}

/// Streaming reader for device/apps log files.
///
/// Iterates decoded [`DeviceApps`] records lazily, one frame at a time,
/// skipping frames whose type tag is not the `DeviceApps` schema. The
/// sequence ends cleanly at end-of-stream on a frame boundary and is fused
/// after the first error. Restarting requires reopening the file.
pub struct LogReader {
    source: Source,
    path: PathBuf,
    done: bool,
}

impl LogReader {
    /// Open an existing log file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<LogReader, ReadError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        tracing::debug!(?path, "opened log file");

        Ok(LogReader {
            source: compression::source(file),
            path: path.to_path_buf(),
            done: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Adapter yielding the host-shape projection of each record.
    pub fn values(self) -> impl Iterator<Item = Result<Value, ReadError>> {
        self.map(|item| item.map(|record| record.to_value()))
    }

    /// Read the next frame header.
    ///
    /// `Ok(None)` means clean end of stream: zero bytes were available at a
    /// frame boundary. A partial header is an error.
    fn next_header(&mut self) -> Result<Option<FrameHeader>, ReadError> {
        let mut buf = [0u8; FrameHeader::SIZE];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.source.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled < buf.len() {
            return Err(ReadError::TruncatedHeader(filled));
        }

        match parse::parse_frame_header(&buf) {
            Ok((header, _)) => Ok(Some(header)),
            Err(ParseError::BadMagic(found)) => Err(ReadError::FrameCorruption(found)),
            Err(err) => Err(ReadError::Codec(err)),
        }
    }

    /// Read exactly `length` payload bytes.
    fn next_payload(&mut self, length: usize) -> Result<Vec<u8>, ReadError> {
        let mut payload = vec![0u8; length];
        let mut filled = 0;
        while filled < length {
            let n = self.source.read(&mut payload[filled..])?;
            if n == 0 {
                return Err(ReadError::TruncatedPayload {
                    expected: length,
                    got: filled,
                });
            }
            filled += n;
        }
        Ok(payload)
    }

    fn next_record(&mut self) -> Result<Option<DeviceApps>, ReadError> {
        loop {
            let header = match self.next_header()? {
                Some(header) => header,
                None => return Ok(None),
            };

            // The payload of a foreign frame type must still be consumed in
            // full to keep the stream aligned on the next header.
            let payload = self.next_payload(header.length as usize)?;
            if header.frame_type != DEVICE_APPS_TYPE {
                tracing::trace!(
                    frame_type = header.frame_type,
                    length = header.length,
                    "skipping frame of foreign type"
                );
                continue;
            }

            let record = parse::parse_device_apps(&payload).map_err(ReadError::Codec)?;
            return Ok(Some(record));
        }
    }
}

impl Iterator for LogReader {
    type Item = Result<DeviceApps, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Open the log at `path` and iterate its decoded records.
pub fn read_stream<P: AsRef<Path>>(path: P) -> Result<LogReader, ReadError> {
    LogReader::open(path)
}
