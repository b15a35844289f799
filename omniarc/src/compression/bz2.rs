use std::borrow::Cow;
use std::io::{self, Read, Write};

use bzip2::read::MultiBzDecoder;
use bzip2::write::BzEncoder;

use crate::format::{header_matches, name_matches, Compression, CompressWriter, Format, MatchResult};

const BZIP2_HEADER: &[u8] = b"BZh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bz2 {
    /// Block size, 1 to 9.
    pub level: u32,
}

impl Default for Bz2 {
    fn default() -> Self {
        Bz2 { level: 9 }
    }
}

impl Format for Bz2 {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(".bz2")
    }

    fn matches(&self, filename: Option<&str>, stream: &mut dyn Read) -> io::Result<MatchResult> {
        Ok(MatchResult {
            by_name: name_matches(filename, ".bz2"),
            by_stream: header_matches(stream, BZIP2_HEADER)?,
        })
    }

    fn as_compression(&self) -> Option<&dyn Compression> {
        Some(self)
    }
}

impl Compression for Bz2 {
    fn open_writer<'w>(&self, sink: Box<dyn Write + 'w>) -> io::Result<Box<dyn CompressWriter + 'w>> {
        let level = bzip2::Compression::new(self.level.clamp(1, 9));
        Ok(Box::new(BzEncoder::new(sink, level)))
    }

    fn open_reader<'r>(&self, source: Box<dyn Read + 'r>) -> io::Result<Box<dyn Read + 'r>> {
        Ok(Box::new(MultiBzDecoder::new(source)))
    }
}

impl<W: Write> CompressWriter for BzEncoder<W> {
    fn close(self: Box<Self>) -> io::Result<()> {
        (*self).finish().map(drop)
    }
}
