//! Herein lies the device/apps log format: length-framed, schema-encoded
//! records inside a gzip container.
//!
//! Use [write_stream][write_stream] and [LogWriter][LogWriter] to produce
//! logs, and [read_stream][read_stream] and [LogReader][LogReader] to
//! iterate them back.
//!
//! Each record is one frame: an 8-byte header (magic sentinel, 16-bit type
//! tag, 16-bit payload length) followed by a tag/length/value-encoded
//! `DeviceApps` payload. The whole stream is gzip-compressed.

mod compression;
pub mod encode;
pub mod header;
pub mod parse;
mod record;
pub mod schema;
pub mod sync;

pub use compression::Compression;
pub use header::{FrameHeader, DEVICE_APPS_TYPE, MAGIC, MAX_PAYLOAD};
pub use parse::{ParseError, ParseResult};
pub use record::{Device, DeviceApps, SchemaError};
pub use sync::{read_stream, write_stream, LogReader, LogWriter, ReadError, WriteError};
