//! Sync (std) frontends for reading and writing device/apps logs.

mod reader;
mod writer;

pub use reader::{read_stream, LogReader, ReadError};
pub use writer::{write_stream, LogWriter, WriteError};
