//! Gzip container plumbing for log files.
//!
//! The framing layer never touches compression state directly: it writes
//! plain header+payload bytes into the sink built here and reads plain bytes
//! back out of the source.

use std::fs::File;
use std::io::{BufReader, BufWriter};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

/// Gzip compression level for the log container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Level 1.
    Fastest,
    /// Level 6, the zlib default.
    #[default]
    Default,
    /// Level 9.
    Best,
    /// An explicit level; values above 9 are clamped.
    Level(u32),
}

impl Compression {
    fn to_flate2(self) -> flate2::Compression {
        match self {
            Compression::Fastest => flate2::Compression::fast(),
            Compression::Default => flate2::Compression::default(),
            Compression::Best => flate2::Compression::best(),
            Compression::Level(level) => flate2::Compression::new(level.min(9)),
        }
    }
}

pub(crate) type Sink = GzEncoder<BufWriter<File>>;
pub(crate) type Source = BufReader<GzDecoder<BufReader<File>>>;

pub(crate) fn sink(file: File, level: Compression) -> Sink {
    GzEncoder::new(BufWriter::new(file), level.to_flate2())
}

pub(crate) fn source(file: File) -> Source {
    BufReader::new(GzDecoder::new(BufReader::new(file)))
}
