use std::borrow::Cow;
use std::io::{self, Read, Write};

use lz4_flex::frame::{FrameDecoder, FrameEncoder};

use crate::format::{header_matches, name_matches, Compression, CompressWriter, Format, MatchResult};

const LZ4_HEADER: &[u8] = &[0x04, 0x22, 0x4d, 0x18];

/// LZ4 frame format.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Lz4;

impl Format for Lz4 {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(".lz4")
    }

    fn matches(&self, filename: Option<&str>, stream: &mut dyn Read) -> io::Result<MatchResult> {
        Ok(MatchResult {
            by_name: name_matches(filename, ".lz4"),
            by_stream: header_matches(stream, LZ4_HEADER)?,
        })
    }

    fn as_compression(&self) -> Option<&dyn Compression> {
        Some(self)
    }
}

impl Compression for Lz4 {
    fn open_writer<'w>(&self, sink: Box<dyn Write + 'w>) -> io::Result<Box<dyn CompressWriter + 'w>> {
        Ok(Box::new(FrameEncoder::new(sink)))
    }

    fn open_reader<'r>(&self, source: Box<dyn Read + 'r>) -> io::Result<Box<dyn Read + 'r>> {
        Ok(Box::new(FrameDecoder::new(source)))
    }
}

impl<W: Write> CompressWriter for FrameEncoder<W> {
    fn close(self: Box<Self>) -> io::Result<()> {
        (*self)
            .finish()
            .map(drop)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}
