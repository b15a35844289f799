use std::borrow::Cow;
use std::io::{self, Read, Write};

use snap::read::FrameDecoder;
use snap::write::FrameEncoder;

use crate::format::{header_matches, name_matches, Compression, CompressWriter, Format, MatchResult};

/// Stream identifier chunk that opens every snappy framed stream.
const SNAPPY_HEADER: &[u8] = &[0xff, 0x06, 0x00, 0x00, 0x73, 0x4e, 0x61, 0x50, 0x70, 0x59];

/// Snappy, framing format.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Sz;

impl Format for Sz {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(".sz")
    }

    fn matches(&self, filename: Option<&str>, stream: &mut dyn Read) -> io::Result<MatchResult> {
        Ok(MatchResult {
            by_name: name_matches(filename, ".sz"),
            by_stream: header_matches(stream, SNAPPY_HEADER)?,
        })
    }

    fn as_compression(&self) -> Option<&dyn Compression> {
        Some(self)
    }
}

impl Compression for Sz {
    fn open_writer<'w>(&self, sink: Box<dyn Write + 'w>) -> io::Result<Box<dyn CompressWriter + 'w>> {
        Ok(Box::new(FrameEncoder::new(sink)))
    }

    fn open_reader<'r>(&self, source: Box<dyn Read + 'r>) -> io::Result<Box<dyn Read + 'r>> {
        Ok(Box::new(FrameDecoder::new(source)))
    }
}

impl<W: Write> CompressWriter for FrameEncoder<W> {
    fn close(mut self: Box<Self>) -> io::Result<()> {
        // Frames carry no trailer; flushing the pending block completes the stream.
        self.flush()
    }
}
