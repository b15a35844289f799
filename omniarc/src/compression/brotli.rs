use std::borrow::Cow;
use std::io::{self, Read, Write};

use brotli::{CompressorWriter, Decompressor};

use crate::format::{name_matches, Compression, CompressWriter, Format, MatchResult};

const BUFFER_SIZE: usize = 4096;
const WINDOW_BITS: u32 = 22;

/// Brotli. The format has no magic number, so it is only ever matched by file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brotli {
    /// 0 to 11.
    pub quality: u32,
}

impl Default for Brotli {
    fn default() -> Self {
        Brotli { quality: 6 }
    }
}

impl Format for Brotli {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(".br")
    }

    fn matches(&self, filename: Option<&str>, _stream: &mut dyn Read) -> io::Result<MatchResult> {
        Ok(MatchResult {
            by_name: name_matches(filename, ".br"),
            by_stream: false,
        })
    }

    fn as_compression(&self) -> Option<&dyn Compression> {
        Some(self)
    }
}

impl Compression for Brotli {
    fn open_writer<'w>(&self, sink: Box<dyn Write + 'w>) -> io::Result<Box<dyn CompressWriter + 'w>> {
        Ok(Box::new(CompressorWriter::new(
            sink,
            BUFFER_SIZE,
            self.quality.min(11),
            WINDOW_BITS,
        )))
    }

    fn open_reader<'r>(&self, source: Box<dyn Read + 'r>) -> io::Result<Box<dyn Read + 'r>> {
        Ok(Box::new(Decompressor::new(source, BUFFER_SIZE)))
    }
}

impl<W: Write> CompressWriter for CompressorWriter<W> {
    fn close(mut self: Box<Self>) -> io::Result<()> {
        self.flush()?;
        // into_inner writes the final meta-block.
        (*self).into_inner();
        Ok(())
    }
}
