use std::borrow::Cow;
use std::io::{self, Read, Write};
use std::sync::Arc;

use crate::context::Context;
use crate::entry::FileEntry;
use crate::error::{Error, Result};
use crate::format::{
    Archival, ArchiverAsync, CompressWriter, Compression, FileHandler, Format, Inserter,
    MatchResult,
};
use crate::rewind::RewindReader;
use crate::source::{ReadWriteSeek, Source};

/// An archive format wrapped in a compression format, such as `.tar.gz`.
///
/// Either layer may be absent, but not both.
#[derive(Clone)]
pub struct CompressedArchive {
    compression: Option<Arc<dyn Format>>,
    archival: Option<Arc<dyn Format>>,
}

impl CompressedArchive {
    /// # Panics
    ///
    /// If both layers are `None`, or a layer lacks the capability its position requires.
    pub fn new(compression: Option<Arc<dyn Format>>, archival: Option<Arc<dyn Format>>) -> Self {
        if compression.is_none() && archival.is_none() {
            panic!("compressed archive needs a compression or an archival format");
        }
        if let Some(c) = &compression {
            if c.as_compression().is_none() {
                panic!("{} cannot compress", c.name());
            }
        }
        if let Some(a) = &archival {
            if a.as_archival().is_none() {
                panic!("{} cannot archive", a.name());
            }
        }

        CompressedArchive {
            compression,
            archival,
        }
    }

    pub fn compression(&self) -> Option<&Arc<dyn Format>> {
        self.compression.as_ref()
    }

    pub fn archival(&self) -> Option<&Arc<dyn Format>> {
        self.archival.as_ref()
    }

    fn codec(&self) -> Option<&dyn Compression> {
        self.compression.as_deref().and_then(|c| c.as_compression())
    }

    fn archiver(&self) -> Result<&dyn Archival> {
        self.archival
            .as_deref()
            .and_then(|a| a.as_archival())
            .ok_or_else(|| Error::unsupported(self.name(), "archive"))
    }
}

impl Format for CompressedArchive {
    fn name(&self) -> Cow<'_, str> {
        let mut name = String::new();
        if let Some(a) = &self.archival {
            name.push_str(&a.name());
        }
        if let Some(c) = &self.compression {
            name.push_str(&c.name());
        }
        Cow::Owned(name)
    }

    fn matches(&self, filename: Option<&str>, stream: &mut dyn Read) -> io::Result<MatchResult> {
        let mut stream = RewindReader::new(Source::Reader(Box::new(stream)))?;

        let mut result = MatchResult::default();
        if let Some(c) = &self.compression {
            result = c.matches(filename, &mut stream)?;
            if !result.matched() {
                return Ok(result);
            }
            stream.rewind();
        }

        if let Some(a) = &self.archival {
            let archive_result = match self.codec() {
                Some(codec) => {
                    let mut decompressed = codec.open_reader(Box::new(&mut stream))?;
                    a.matches(filename, &mut decompressed)?
                }
                None => a.matches(filename, &mut stream)?,
            };
            if !archive_result.matched() {
                return Ok(MatchResult::default());
            }
            result = result | archive_result;
        }

        Ok(result)
    }

    fn as_compression(&self) -> Option<&dyn Compression> {
        match (&self.compression, &self.archival) {
            (Some(_), None) => Some(self),
            _ => None,
        }
    }

    fn as_archival(&self) -> Option<&dyn Archival> {
        self.archival.as_ref().map(|_| self as &dyn Archival)
    }

    fn as_inserter(&self) -> Option<&dyn Inserter> {
        self.archival.as_ref().map(|_| self as &dyn Inserter)
    }

    fn as_async_archiver(&self) -> Option<&dyn ArchiverAsync> {
        self.archival
            .as_deref()
            .and_then(|a| a.as_async_archiver())
            .map(|_| self as &dyn ArchiverAsync)
    }
}

impl Compression for CompressedArchive {
    fn open_writer<'w>(&self, sink: Box<dyn Write + 'w>) -> io::Result<Box<dyn CompressWriter + 'w>> {
        match self.codec() {
            Some(codec) => codec.open_writer(sink),
            None => Err(Error::unsupported(self.name(), "compress").into_io_error()),
        }
    }

    fn open_reader<'r>(&self, source: Box<dyn Read + 'r>) -> io::Result<Box<dyn Read + 'r>> {
        match self.codec() {
            Some(codec) => codec.open_reader(source),
            None => Err(Error::unsupported(self.name(), "decompress").into_io_error()),
        }
    }
}

/// Closes `writer` even when writing through it failed. The write error is reported first.
fn close_after(writer: Box<dyn CompressWriter + '_>, written: Result<()>) -> Result<()> {
    let closed = writer.close();
    written?;
    closed?;
    Ok(())
}

impl Archival for CompressedArchive {
    fn archive(&self, ctx: &Context, output: &mut dyn Write, files: Vec<FileEntry<'_>>) -> Result<()> {
        let archiver = self.archiver()?;
        match self.codec() {
            Some(codec) => {
                let mut writer = codec.open_writer(Box::new(output))?;
                let written = archiver.archive(ctx, &mut writer, files);
                close_after(writer, written)
            }
            None => archiver.archive(ctx, output, files),
        }
    }

    fn extract(
        &self,
        ctx: &Context,
        source: Source<'_>,
        paths: Option<&[String]>,
        handler: &mut FileHandler<'_>,
    ) -> Result<()> {
        let archiver = self.archiver()?;
        let source = match self.codec() {
            Some(codec) => Source::Reader(codec.open_reader(Box::new(source))?),
            None => source,
        };
        archiver.extract(ctx, source, paths, handler)
    }
}

impl ArchiverAsync for CompressedArchive {
    fn archive_async(
        &self,
        ctx: &Context,
        output: &mut dyn Write,
        files: flume::Receiver<FileEntry<'static>>,
    ) -> Result<()> {
        let archiver = self
            .archival
            .as_deref()
            .and_then(|a| a.as_async_archiver())
            .ok_or_else(|| Error::unsupported(self.name(), "archive_async"))?;

        match self.codec() {
            Some(codec) => {
                let mut writer = codec.open_writer(Box::new(output))?;
                let written = archiver.archive_async(ctx, &mut writer, files);
                close_after(writer, written)
            }
            None => archiver.archive_async(ctx, output, files),
        }
    }
}

impl Inserter for CompressedArchive {
    /// Always fails: a compressed stream cannot be reopened to append to its archive.
    fn insert(&self, _ctx: &Context, _archive: &mut dyn ReadWriteSeek, _files: Vec<FileEntry<'_>>) -> Result<()> {
        Err(Error::unsupported(self.name(), "insert"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, SystemTime};

    use crate::archive::Tar;
    use crate::compression::Gz;
    use crate::entry::{FileInfo, FileKind};
    use crate::format::Walk;

    /// Passes bytes through and remembers whether its writer was closed.
    #[derive(Default)]
    struct Tracked {
        closed: Arc<AtomicBool>,
    }

    struct TrackedWriter<'w> {
        sink: Box<dyn Write + 'w>,
        closed: Arc<AtomicBool>,
    }

    impl Format for Tracked {
        fn name(&self) -> Cow<'_, str> {
            Cow::Borrowed(".trk")
        }

        fn matches(&self, _: Option<&str>, _: &mut dyn Read) -> io::Result<MatchResult> {
            Ok(MatchResult::default())
        }

        fn as_compression(&self) -> Option<&dyn Compression> {
            Some(self)
        }
    }

    impl Compression for Tracked {
        fn open_writer<'w>(&self, sink: Box<dyn Write + 'w>) -> io::Result<Box<dyn CompressWriter + 'w>> {
            Ok(Box::new(TrackedWriter {
                sink,
                closed: self.closed.clone(),
            }))
        }

        fn open_reader<'r>(&self, source: Box<dyn Read + 'r>) -> io::Result<Box<dyn Read + 'r>> {
            Ok(source)
        }
    }

    impl Write for TrackedWriter<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.sink.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.sink.flush()
        }
    }

    impl CompressWriter for TrackedWriter<'_> {
        fn close(self: Box<Self>) -> io::Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn tar_gz() -> CompressedArchive {
        CompressedArchive::new(Some(Arc::new(Gz::default())), Some(Arc::new(Tar::default())))
    }

    fn file(name: &str, contents: &'static [u8]) -> FileEntry<'static> {
        let info = FileInfo {
            name: crate::path::base(name).to_string(),
            size: contents.len() as u64,
            permissions: 0o644,
            modified: SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000),
            kind: FileKind::Regular,
        };
        FileEntry::new(info, name).with_opener(move || Ok(Box::new(contents) as Box<dyn Read>))
    }

    #[test]
    fn name_is_archive_then_compression() {
        assert_eq!(tar_gz().name(), ".tar.gz");
        let gz_only = CompressedArchive::new(Some(Arc::new(Gz::default())), None);
        assert_eq!(gz_only.name(), ".gz");
        assert!(gz_only.as_archival().is_none());
        assert!(gz_only.as_compression().is_some());
    }

    #[test]
    #[should_panic]
    fn needs_a_layer() {
        CompressedArchive::new(None, None);
    }

    #[test]
    #[should_panic(expected = "cannot compress")]
    fn compression_layer_must_compress() {
        CompressedArchive::new(Some(Arc::new(Tar::default())), None);
    }

    #[test]
    fn archive_extract_round_trip() {
        let format = tar_gz();
        let ctx = Context::new();

        let mut out = Vec::new();
        format
            .archive(
                &ctx,
                &mut out,
                vec![file("a/one.txt", b"one"), file("a/two.txt", b"two!")],
            )
            .unwrap();
        assert_eq!(&out[..2], &[0x1f, 0x8b]);

        let mut seen = Vec::new();
        format
            .extract(&ctx, Source::reader(&out[..]), None, &mut |_, mut f| {
                let mut body = String::new();
                f.open()?.read_to_string(&mut body)?;
                seen.push((f.name_in_archive.clone(), body));
                Ok(Walk::Continue)
            })
            .unwrap();

        assert_eq!(
            seen,
            vec![
                ("a/one.txt".to_string(), "one".to_string()),
                ("a/two.txt".to_string(), "two!".to_string())
            ]
        );

        let result = format
            .matches(Some("backup.tar.gz"), &mut &out[..])
            .unwrap();
        assert!(result.by_name && result.by_stream);
        let result = format.matches(None, &mut &out[..]).unwrap();
        assert!(!result.by_name && result.by_stream);
        assert!(!format.matches(None, &mut &b"plain"[..]).unwrap().matched());
    }

    #[test]
    fn insert_is_rejected() {
        let format = tar_gz();
        let mut archive = Cursor::new(Vec::new());
        let err = format
            .as_inserter()
            .unwrap()
            .insert(&Context::new(), &mut archive, vec![file("x", b"x")])
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported { operation: "insert", .. }));
    }

    #[test]
    fn writer_is_closed_when_archiving_fails() {
        let tracked = Arc::new(Tracked::default());
        let closed = tracked.closed.clone();
        let format = CompressedArchive::new(Some(tracked), Some(Arc::new(Tar::default())));

        let broken = file("b.txt", b"b")
            .with_opener(|| Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")));
        let err = format
            .archive(&Context::new(), &mut Vec::new(), vec![file("a.txt", b"a"), broken])
            .unwrap_err();

        assert!(matches!(err, Error::Entry { index: 1, .. }));
        assert!(closed.load(Ordering::SeqCst));
    }
}
