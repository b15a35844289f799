use std::borrow::Cow;
use std::io::{self, Read, Write};

use zstd::stream::read::Decoder;
use zstd::stream::write::Encoder;

use crate::format::{header_matches, name_matches, Compression, CompressWriter, Format, MatchResult};

const ZSTD_HEADER: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];

/// Zstandard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zstd {
    /// 1 to 22; 0 selects the library default.
    pub level: i32,
}

impl Default for Zstd {
    fn default() -> Self {
        Zstd {
            level: zstd::DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl Format for Zstd {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(".zst")
    }

    fn matches(&self, filename: Option<&str>, stream: &mut dyn Read) -> io::Result<MatchResult> {
        Ok(MatchResult {
            by_name: name_matches(filename, ".zst"),
            by_stream: header_matches(stream, ZSTD_HEADER)?,
        })
    }

    fn as_compression(&self) -> Option<&dyn Compression> {
        Some(self)
    }
}

impl Compression for Zstd {
    fn open_writer<'w>(&self, sink: Box<dyn Write + 'w>) -> io::Result<Box<dyn CompressWriter + 'w>> {
        Ok(Box::new(Encoder::new(sink, self.level)?))
    }

    fn open_reader<'r>(&self, source: Box<dyn Read + 'r>) -> io::Result<Box<dyn Read + 'r>> {
        Ok(Box::new(Decoder::new(source)?))
    }
}

impl<W: Write> CompressWriter for Encoder<'static, W> {
    fn close(self: Box<Self>) -> io::Result<()> {
        (*self).finish().map(drop)
    }
}
