use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::compression::{self, Compression, Sink};
use crate::encode::{encode_device_apps, encode_frame_header};
use crate::header::{FrameHeader, MAX_PAYLOAD};
use crate::record::{DeviceApps, SchemaError};

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("record does not match the device/apps schema")]
    Schema(#[from] SchemaError),

    #[error("encoded payload is {0} bytes, exceeding the 65535-byte frame limit")]
    FrameOverflow(usize),

    #[error("failed to write log file")]
    Io(#[from] std::io::Error),
}

/// Streaming writer for device/apps log files.
///
/// Frames are appended through a gzip sink; [`finish`](LogWriter::finish)
/// must be called to flush the gzip trailer. [`write_stream`] wraps the
/// common iterate-append-finish sequence and removes the destination file on
/// any failure.
pub struct LogWriter {
    sink: Sink,
    path: PathBuf,
    bytes_written: u64,
    finished: bool,
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(
                "LogWriter dropped without calling finish(). \
                 Log at {:?} may be incomplete.",
                self.path
            );
        }
    }
}

impl LogWriter {
    /// Create a new log file, truncating any existing file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<LogWriter> {
        Self::create_with_compression(path, Compression::default())
    }

    /// Create a new log file with an explicit gzip level.
    pub fn create_with_compression<P: AsRef<Path>>(
        path: P,
        level: Compression,
    ) -> std::io::Result<LogWriter> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)?;
        tracing::debug!(?path, ?level, "created log file");

        Ok(LogWriter {
            sink: compression::sink(file, level),
            path: path.to_path_buf(),
            bytes_written: 0,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Uncompressed header+payload bytes appended so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Encode and append one record.
    ///
    /// Returns the bytes this frame added. The payload size is checked
    /// against the 16-bit frame limit before any header byte is written.
    pub fn append(&mut self, record: &DeviceApps) -> Result<u64, WriteError> {
        let payload = encode_device_apps(record);
        if payload.len() > MAX_PAYLOAD {
            return Err(WriteError::FrameOverflow(payload.len()));
        }

        let header = FrameHeader::device_apps(payload.len() as u16);
        self.sink.write_all(&encode_frame_header(&header))?;
        self.sink.write_all(&payload)?;

        let added = (FrameHeader::SIZE + payload.len()) as u64;
        self.bytes_written += added;
        Ok(added)
    }

    /// Validate and append one loosely typed host record.
    pub fn append_value(&mut self, value: &Value) -> Result<u64, WriteError> {
        let record = DeviceApps::from_value(value)?;
        self.append(&record)
    }

    /// Flush the gzip trailer and return total uncompressed bytes written.
    pub fn finish(mut self) -> Result<u64, WriteError> {
        self.sink.try_finish()?;
        self.sink.get_mut().flush()?;
        self.finished = true;
        Ok(self.bytes_written)
    }

    /// Drop the partially written log and remove the destination file.
    pub fn abort(mut self) {
        self.finished = true;
        let path = self.path.clone();
        drop(self);
        remove_partial(&path);
    }
}

fn remove_partial(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        tracing::warn!(?path, %err, "failed to remove partial log file");
    }
}

/// Write every record from `records` into a new log at `path`.
///
/// Returns the total uncompressed header+payload bytes written. On any
/// failure the destination file is removed: callers see either a complete
/// valid log or no file at all.
pub fn write_stream<I, P>(records: I, path: P) -> Result<u64, WriteError>
where
    I: IntoIterator<Item = Value>,
    P: AsRef<Path>,
{
    let mut writer = LogWriter::create(path.as_ref())?;

    for value in records {
        if let Err(err) = writer.append_value(&value) {
            writer.abort();
            return Err(err);
        }
    }

    match writer.finish() {
        Ok(total) => Ok(total),
        Err(err) => {
            remove_partial(path.as_ref());
            Err(err)
        }
    }
}
