use std::borrow::Cow;
use std::fmt;
use std::io::{self, Read, Write};

use crate::context::Context;
use crate::entry::FileEntry;
use crate::error::Result;
use crate::source::{ReadWriteSeek, Source};

/// Outcome of probing a stream against a format.
///
/// The two flags are independent: a file named `x.gz` holding zip data matches gzip by
/// name and zip by stream.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    pub by_name: bool,
    pub by_stream: bool,
}

impl MatchResult {
    pub fn matched(&self) -> bool {
        self.by_name || self.by_stream
    }
}

impl std::ops::BitOr for MatchResult {
    type Output = MatchResult;

    fn bitor(self, rhs: Self) -> Self::Output {
        MatchResult {
            by_name: self.by_name || rhs.by_name,
            by_stream: self.by_stream || rhs.by_stream,
        }
    }
}

/// What an extraction handler wants to happen after an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    /// Skip the rest of this directory (or, for a file, its parent directory).
    SkipDir,
    /// End the pass successfully.
    Stop,
}

pub type FileHandler<'h> = dyn FnMut(&Context, FileEntry<'_>) -> Result<Walk> + 'h;

/// A named format descriptor. Capabilities are discovered with the `as_*` queries.
pub trait Format: Send + Sync {
    /// Conventional extension, including the leading dot (`".gz"`).
    fn name(&self) -> Cow<'_, str>;

    /// Probes `filename` and the start of `stream`.
    ///
    /// Reaching end of input before a full header has been read is a non-match, not an error.
    fn matches(&self, filename: Option<&str>, stream: &mut dyn Read) -> io::Result<MatchResult>;

    fn as_compression(&self) -> Option<&dyn Compression> {
        None
    }

    fn as_archival(&self) -> Option<&dyn Archival> {
        None
    }

    fn as_inserter(&self) -> Option<&dyn Inserter> {
        None
    }

    fn as_async_archiver(&self) -> Option<&dyn ArchiverAsync> {
        None
    }
}

impl fmt::Debug for dyn Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Format").field(&self.name()).finish()
    }
}

/// A compressing writer that must be closed to terminate the stream.
pub trait CompressWriter: Write {
    fn close(self: Box<Self>) -> io::Result<()>;
}

pub trait Compression: Format {
    fn open_writer<'w>(&self, sink: Box<dyn Write + 'w>) -> io::Result<Box<dyn CompressWriter + 'w>>;

    fn open_reader<'r>(&self, source: Box<dyn Read + 'r>) -> io::Result<Box<dyn Read + 'r>>;
}

pub trait Archival: Format {
    /// Writes `files` as a new archive to `output`, in order.
    fn archive(&self, ctx: &Context, output: &mut dyn Write, files: Vec<FileEntry<'_>>) -> Result<()>;

    /// Walks the archive in `source`, calling `handler` for every entry that passes the
    /// `paths` filter.
    fn extract(
        &self,
        ctx: &Context,
        source: Source<'_>,
        paths: Option<&[String]>,
        handler: &mut FileHandler<'_>,
    ) -> Result<()>;
}

pub trait ArchiverAsync: Archival {
    /// Like [`Archival::archive`], but entries arrive over a channel until every sender is dropped.
    fn archive_async(
        &self,
        ctx: &Context,
        output: &mut dyn Write,
        files: flume::Receiver<FileEntry<'static>>,
    ) -> Result<()>;
}

pub trait Inserter: Archival {
    /// Appends `files` to the existing archive in `archive`.
    fn insert(&self, ctx: &Context, archive: &mut dyn ReadWriteSeek, files: Vec<FileEntry<'_>>) -> Result<()>;
}

/// True if the lowercased file name contains the format's extension anywhere.
pub fn name_matches(filename: Option<&str>, extension: &str) -> bool {
    filename
        .map(|f| f.to_lowercase().contains(extension))
        .unwrap_or(false)
}

/// Reads up to `n` bytes, stopping early only at end of input.
pub fn read_at_most(stream: &mut dyn Read, n: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    let mut filled = 0;

    while filled < n {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(count) => filled += count,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }
    }

    buf.truncate(filled);
    Ok(buf)
}

/// Matches a fixed magic prefix, treating a short stream as a non-match.
pub(crate) fn header_matches(stream: &mut dyn Read, magic: &[u8]) -> io::Result<bool> {
    let buf = read_at_most(stream, magic.len())?;
    Ok(buf == magic)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "done"));
            }
            buf[0] = self.0[0];
            self.0 = &self.0[1..];
            Ok(1)
        }
    }

    #[test]
    fn read_at_most_tolerates_short_input() {
        assert_eq!(read_at_most(&mut &b"abcdef"[..], 4).unwrap(), b"abcd");
        assert_eq!(read_at_most(&mut &b"ab"[..], 4).unwrap(), b"ab");
        assert_eq!(read_at_most(&mut io::empty(), 4).unwrap(), b"");
        assert_eq!(read_at_most(&mut Trickle(b"xyz"), 8).unwrap(), b"xyz");
    }

    #[test]
    fn match_flags_are_independent() {
        let name = MatchResult {
            by_name: true,
            by_stream: false,
        };
        let stream = MatchResult {
            by_name: false,
            by_stream: true,
        };
        assert!(name.matched());
        assert!(stream.matched());
        assert!(!MatchResult::default().matched());
        assert_eq!(
            name | stream,
            MatchResult {
                by_name: true,
                by_stream: true
            }
        );
    }

    #[test]
    fn names_match_case_insensitively_anywhere() {
        assert!(name_matches(Some("Backup.TAR.GZ"), ".gz"));
        assert!(name_matches(Some("backup.tar.gz"), ".tar"));
        assert!(!name_matches(Some("backup.tgz"), ".gz"));
        assert!(!name_matches(None, ".gz"));
    }
}
