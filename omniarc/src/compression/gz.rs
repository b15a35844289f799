use std::borrow::Cow;
use std::io::{self, Read, Write};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

use crate::format::{header_matches, name_matches, Compression, CompressWriter, Format, MatchResult};

const GZIP_HEADER: &[u8] = &[0x1f, 0x8b, 0x08];

/// gzip. Concatenated members decode as one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gz {
    /// 0 (store) to 9 (best).
    pub level: u32,
}

impl Default for Gz {
    fn default() -> Self {
        Gz { level: 6 }
    }
}

impl Format for Gz {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(".gz")
    }

    fn matches(&self, filename: Option<&str>, stream: &mut dyn Read) -> io::Result<MatchResult> {
        Ok(MatchResult {
            by_name: name_matches(filename, ".gz"),
            by_stream: header_matches(stream, GZIP_HEADER)?,
        })
    }

    fn as_compression(&self) -> Option<&dyn Compression> {
        Some(self)
    }
}

impl Compression for Gz {
    fn open_writer<'w>(&self, sink: Box<dyn Write + 'w>) -> io::Result<Box<dyn CompressWriter + 'w>> {
        let level = flate2::Compression::new(self.level.min(9));
        Ok(Box::new(GzEncoder::new(sink, level)))
    }

    fn open_reader<'r>(&self, source: Box<dyn Read + 'r>) -> io::Result<Box<dyn Read + 'r>> {
        Ok(Box::new(MultiGzDecoder::new(source)))
    }
}

impl<W: Write> CompressWriter for GzEncoder<W> {
    fn close(self: Box<Self>) -> io::Result<()> {
        (*self).finish().map(drop)
    }
}
