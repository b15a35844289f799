use std::borrow::Cow;
use std::io::{self, Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::format::{header_matches, name_matches, Compression, CompressWriter, Format, MatchResult};

// Only the CMF byte for a 32K window is checked.
const ZLIB_HEADER: &[u8] = &[0x78];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zlib {
    pub level: u32,
}

impl Default for Zlib {
    fn default() -> Self {
        Zlib { level: 6 }
    }
}

impl Format for Zlib {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(".zz")
    }

    fn matches(&self, filename: Option<&str>, stream: &mut dyn Read) -> io::Result<MatchResult> {
        Ok(MatchResult {
            by_name: name_matches(filename, ".zz"),
            by_stream: header_matches(stream, ZLIB_HEADER)?,
        })
    }

    fn as_compression(&self) -> Option<&dyn Compression> {
        Some(self)
    }
}

impl Compression for Zlib {
    fn open_writer<'w>(&self, sink: Box<dyn Write + 'w>) -> io::Result<Box<dyn CompressWriter + 'w>> {
        let level = flate2::Compression::new(self.level.min(9));
        Ok(Box::new(ZlibEncoder::new(sink, level)))
    }

    fn open_reader<'r>(&self, source: Box<dyn Read + 'r>) -> io::Result<Box<dyn Read + 'r>> {
        Ok(Box::new(ZlibDecoder::new(source)))
    }
}

impl<W: Write> CompressWriter for ZlibEncoder<W> {
    fn close(self: Box<Self>) -> io::Result<()> {
        (*self).finish().map(drop)
    }
}
