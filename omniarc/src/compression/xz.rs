use std::borrow::Cow;
use std::io::{self, Read, Write};

use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

use crate::format::{header_matches, name_matches, Compression, CompressWriter, Format, MatchResult};

const XZ_HEADER: &[u8] = &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Xz {
    /// Preset, 0 to 9.
    pub level: u32,
}

impl Default for Xz {
    fn default() -> Self {
        Xz { level: 6 }
    }
}

impl Format for Xz {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(".xz")
    }

    fn matches(&self, filename: Option<&str>, stream: &mut dyn Read) -> io::Result<MatchResult> {
        Ok(MatchResult {
            by_name: name_matches(filename, ".xz"),
            by_stream: header_matches(stream, XZ_HEADER)?,
        })
    }

    fn as_compression(&self) -> Option<&dyn Compression> {
        Some(self)
    }
}

impl Compression for Xz {
    fn open_writer<'w>(&self, sink: Box<dyn Write + 'w>) -> io::Result<Box<dyn CompressWriter + 'w>> {
        Ok(Box::new(XzEncoder::new(sink, self.level.min(9))))
    }

    fn open_reader<'r>(&self, source: Box<dyn Read + 'r>) -> io::Result<Box<dyn Read + 'r>> {
        Ok(Box::new(XzDecoder::new_multi_decoder(source)))
    }
}

impl<W: Write> CompressWriter for XzEncoder<W> {
    fn close(self: Box<Self>) -> io::Result<()> {
        (*self).finish().map(drop)
    }
}
