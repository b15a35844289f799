use std::io::{self, Cursor, Read};

use crate::source::Source;

/// Records every byte read from a source so probing can start over from the beginning.
///
/// [`into_source`](RewindReader::into_source) gives back a stream positioned at the first
/// byte ever read; the recorder is consumed, so finalizing happens once.
pub struct RewindReader<'a> {
    source: Source<'a>,
    start: Option<u64>,
    buf: Vec<u8>,
    buf_pos: usize,
    rewound: bool,
}

impl<'a> RewindReader<'a> {
    pub fn new(mut source: Source<'a>) -> io::Result<Self> {
        let start = source.stream_position()?;
        Ok(RewindReader {
            source,
            start,
            buf: Vec::new(),
            buf_pos: 0,
            rewound: false,
        })
    }

    /// Replays recorded bytes on subsequent reads.
    pub fn rewind(&mut self) {
        self.buf_pos = 0;
        self.rewound = true;
    }

    /// Number of bytes recorded so far.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Returns a stream positioned at the first byte ever read, whether or not
    /// [`rewind`](Self::rewind) was called.
    ///
    /// A seekable source is seeked back to where reading started instead of being chained
    /// behind the buffer.
    pub fn into_source(mut self) -> io::Result<Source<'a>> {
        if let Some(start) = self.start {
            tracing::trace!(start, "finalizing seekable source");
            self.source.seek_to(start)?;
            return Ok(self.source);
        }

        tracing::trace!(pending = self.buf.len(), "finalizing buffered source");
        if self.buf.is_empty() {
            return Ok(self.source);
        }

        Ok(Source::Reader(Box::new(Cursor::new(self.buf).chain(self.source))))
    }
}

impl Read for RewindReader<'_> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }

        if self.rewound {
            let pending = &self.buf[self.buf_pos..];
            if !pending.is_empty() {
                let n = pending.len().min(out.len());
                out[..n].copy_from_slice(&pending[..n]);
                self.buf_pos += n;
                return Ok(n);
            }
            self.rewound = false;
        }

        let n = self.source.read(out)?;
        self.buf.extend_from_slice(&out[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::format::read_at_most;

    /// A reader that cannot seek and hands out bytes a few at a time.
    struct Drip {
        data: Vec<u8>,
        pos: usize,
    }

    impl Read for Drip {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            let n = (self.data.len() - self.pos).min(out.len()).min(3);
            out[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    fn payload() -> Vec<u8> {
        (0..200u8).collect()
    }

    #[test]
    fn rewinding_replays_the_same_bytes() {
        let data = payload();
        let source = Source::reader(Drip {
            data: data.clone(),
            pos: 0,
        });
        let mut reader = RewindReader::new(source).unwrap();

        for cycle in 0..10 {
            let probe = read_at_most(&mut reader, 16 + cycle * 4).unwrap();
            assert_eq!(probe, &data[..16 + cycle * 4], "cycle {}", cycle);
            reader.rewind();
        }

        let mut all = Vec::new();
        reader.into_source().unwrap().read_to_end(&mut all).unwrap();
        assert_eq!(all, data);
    }

    #[test]
    fn reading_past_buffer_continues_from_source() {
        let data = payload();
        let mut reader = RewindReader::new(Source::reader(&data[..])).unwrap();

        read_at_most(&mut reader, 10).unwrap();
        reader.rewind();
        let longer = read_at_most(&mut reader, 50).unwrap();
        assert_eq!(longer, &data[..50]);
        assert_eq!(reader.buffered(), 50);

        reader.rewind();
        let mut all = Vec::new();
        reader.into_source().unwrap().read_to_end(&mut all).unwrap();
        assert_eq!(all, data);
    }

    #[test]
    fn seekable_sources_are_seeked_back() {
        let data = payload();
        let mut cursor = Cursor::new(data.clone());
        cursor.set_position(5);

        let mut reader = RewindReader::new(Source::seekable(cursor)).unwrap();
        read_at_most(&mut reader, 40).unwrap();
        reader.rewind();

        let mut source = reader.into_source().unwrap();
        assert!(source.is_seekable());
        let mut all = Vec::new();
        source.read_to_end(&mut all).unwrap();
        assert_eq!(all, &data[5..]);
    }

    #[test]
    fn finalizing_without_rewind_keeps_recorded_bytes() {
        let data = payload();
        let source = Source::reader(Drip {
            data: data.clone(),
            pos: 0,
        });
        let mut reader = RewindReader::new(source).unwrap();
        assert_eq!(read_at_most(&mut reader, 10).unwrap(), &data[..10]);

        let mut all = Vec::new();
        reader.into_source().unwrap().read_to_end(&mut all).unwrap();
        assert_eq!(all, data);
    }

    #[test]
    fn partly_replayed_buffer_is_yielded_whole() {
        let data = payload();
        let mut reader = RewindReader::new(Source::reader(&data[..])).unwrap();
        read_at_most(&mut reader, 30).unwrap();
        reader.rewind();
        read_at_most(&mut reader, 12).unwrap();

        let mut all = Vec::new();
        reader.into_source().unwrap().read_to_end(&mut all).unwrap();
        assert_eq!(all, data);
    }

    #[test]
    fn seekable_sources_are_seeked_back_without_rewind() {
        let data = payload();
        let mut cursor = Cursor::new(data.clone());
        cursor.set_position(7);

        let mut reader = RewindReader::new(Source::seekable(cursor)).unwrap();
        read_at_most(&mut reader, 25).unwrap();

        let mut all = Vec::new();
        reader.into_source().unwrap().read_to_end(&mut all).unwrap();
        assert_eq!(all, &data[7..]);
    }

    #[test]
    fn empty_source() {
        let mut reader = RewindReader::new(Source::reader(io::empty())).unwrap();
        assert!(read_at_most(&mut reader, 8).unwrap().is_empty());
        reader.rewind();

        let mut all = Vec::new();
        reader.into_source().unwrap().read_to_end(&mut all).unwrap();
        assert!(all.is_empty());
    }
}
