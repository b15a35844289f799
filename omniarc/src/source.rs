//! Byte sources handed to identification and extraction.

use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek + ?Sized> ReadSeek for T {}

pub trait ReadWriteSeek: Read + Write + Seek {}
impl<T: Read + Write + Seek + ?Sized> ReadWriteSeek for T {}

/// An input stream, tagged with whether it can seek.
///
/// Containers with a central directory (zip, 7z) need [`Source::Seekable`].
pub enum Source<'a> {
    Reader(Box<dyn Read + 'a>),
    Seekable(Box<dyn ReadSeek + 'a>),
}

impl<'a> Source<'a> {
    pub fn reader(reader: impl Read + 'a) -> Self {
        Source::Reader(Box::new(reader))
    }

    pub fn seekable(reader: impl Read + Seek + 'a) -> Self {
        Source::Seekable(Box::new(reader))
    }

    pub fn is_seekable(&self) -> bool {
        matches!(self, Source::Seekable(_))
    }

    pub(crate) fn stream_position(&mut self) -> io::Result<Option<u64>> {
        match self {
            Source::Reader(_) => Ok(None),
            Source::Seekable(s) => s.stream_position().map(Some),
        }
    }

    pub(crate) fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        match self {
            Source::Reader(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "source is not seekable",
            )),
            Source::Seekable(s) => s.seek(SeekFrom::Start(pos)).map(drop),
        }
    }
}

impl Read for Source<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Source::Reader(r) => r.read(buf),
            Source::Seekable(r) => r.read(buf),
        }
    }
}

impl fmt::Debug for Source<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Reader(_) => f.write_str("Source::Reader(..)"),
            Source::Seekable(_) => f.write_str("Source::Seekable(..)"),
        }
    }
}

/// A window over a shared, immutable byte buffer.
///
/// Each call to [`reader`](Section::reader) yields an independent cursor, so one section can
/// back many concurrent reads.
#[derive(Clone)]
pub struct Section {
    data: Arc<dyn AsRef<[u8]> + Send + Sync>,
    offset: usize,
    len: usize,
}

impl Section {
    pub fn new(data: impl AsRef<[u8]> + Send + Sync + 'static) -> Self {
        let len = data.as_ref().len();
        Section {
            data: Arc::new(data),
            offset: 0,
            len,
        }
    }

    /// Memory maps `file` read-only.
    ///
    /// # Safety
    ///
    /// The file must not be modified or truncated while any clone of the section is alive.
    pub unsafe fn map(file: &File) -> io::Result<Self> {
        let mmap = memmap2::MmapOptions::new().map(file)?;
        Ok(Section::new(mmap))
    }

    /// Narrows the window to `len` bytes starting `offset` bytes into this one.
    pub fn slice(&self, offset: usize, len: usize) -> io::Result<Self> {
        let end = offset.checked_add(len).filter(|end| *end <= self.len);
        if end.is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "section slice {}..{} out of bounds for length {}",
                    offset,
                    offset.saturating_add(len),
                    self.len
                ),
            ));
        }

        Ok(Section {
            data: Arc::clone(&self.data),
            offset: self.offset + offset,
            len,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn reader(&self) -> Cursor<Section> {
        Cursor::new(self.clone())
    }
}

impl AsRef<[u8]> for Section {
    fn as_ref(&self) -> &[u8] {
        let data: &[u8] = (*self.data).as_ref();
        &data[self.offset..self.offset + self.len]
    }
}

impl fmt::Debug for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Section")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}
