use std::cell::Cell;
use std::io::{self, Read};
use std::sync::Arc;

use crate::composite::CompressedArchive;
use crate::error::{Error, Result};
use crate::format::{name_matches, Format, MatchResult};
use crate::registry::Registry;
use crate::rewind::RewindReader;
use crate::source::Source;

impl Registry {
    /// Determines the format of `source`, by `filename` and by content.
    ///
    /// Compression formats are tried first. Archive formats are then tried against the
    /// decompressed view when a compression format matched, so `x.tar.gz` identifies as a
    /// [`CompressedArchive`]. The returned source reads from the same position `source` was
    /// at, whatever probing consumed.
    ///
    /// Returns [`Error::NoMatch`] when nothing matched, or [`Error::Probe`] when reading the
    /// stream failed for a reason other than running out of input.
    pub fn identify<'a>(
        &self,
        filename: Option<&str>,
        source: Source<'a>,
    ) -> Result<(Arc<dyn Format>, Source<'a>)> {
        let mut stream = RewindReader::new(source)?;

        let mut compression: Option<Arc<dyn Format>> = None;
        for format in self.iter().filter(|f| f.as_compression().is_some()) {
            let result = probe(format.as_ref(), filename, &mut stream, None);
            stream.rewind();
            if result?.matched() {
                compression = Some(Arc::clone(format));
                break;
            }
        }

        let mut archival: Option<Arc<dyn Format>> = None;
        for format in self.iter().filter(|f| f.as_archival().is_some()) {
            let result = probe(
                format.as_ref(),
                filename,
                &mut stream,
                compression.as_deref(),
            );
            stream.rewind();
            if result?.matched() {
                archival = Some(Arc::clone(format));
                break;
            }
        }

        stream.rewind();
        let source = stream.into_source()?;

        let format: Arc<dyn Format> = match (compression, archival) {
            (Some(c), None) => c,
            (None, Some(a)) => a,
            (Some(c), Some(a)) => Arc::new(CompressedArchive::new(Some(c), Some(a))),
            (None, None) => return Err(Error::NoMatch),
        };

        tracing::debug!(format = %format.name(), "identified");
        Ok((format, source))
    }
}

/// Probes one format, through a fresh decompressor when `compression` is set.
///
/// Errors raised by the decompressor itself mean the data is not what its name claimed and
/// count as a non-match. Errors from the underlying stream abort identification.
fn probe(
    format: &dyn Format,
    filename: Option<&str>,
    stream: &mut RewindReader<'_>,
    compression: Option<&dyn Format>,
) -> Result<MatchResult> {
    let source_failed = Cell::new(false);

    let result = match compression.and_then(|c| c.as_compression()) {
        None => format.matches(filename, stream),
        Some(codec) => {
            let tracked = Tracked {
                inner: &mut *stream,
                failed: &source_failed,
            };
            codec
                .open_reader(Box::new(tracked))
                .and_then(|mut decompressed| format.matches(filename, &mut decompressed))
        }
    };

    match result {
        Ok(result) => {
            tracing::debug!(
                format = %format.name(),
                by_name = result.by_name,
                by_stream = result.by_stream,
                "probed"
            );
            Ok(result)
        }
        Err(e)
            if e.kind() == io::ErrorKind::UnexpectedEof
                || (compression.is_some() && !source_failed.get()) =>
        {
            tracing::debug!(format = %format.name(), error = %e, "stream unreadable as format");
            Ok(MatchResult {
                by_name: name_matches(filename, &format.name()),
                by_stream: false,
            })
        }
        Err(source) => Err(Error::Probe {
            format: format.name().into_owned(),
            source,
        }),
    }
}

struct Tracked<'s, 'a> {
    inner: &'s mut RewindReader<'a>,
    failed: &'s Cell<bool>,
}

impl Read for Tracked<'_, '_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).map_err(|e| {
            self.failed.set(true);
            e
        })
    }
}

/// Convenience wrapper for [`Registry::identify`] over any reader.
pub fn identify<'a>(
    registry: &Registry,
    filename: Option<&str>,
    reader: impl Read + 'a,
) -> Result<(Arc<dyn Format>, Source<'a>)> {
    registry.identify(filename, Source::reader(reader))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    fn identify_bytes(name: Option<&str>, bytes: &[u8]) -> Result<String> {
        let registry = Registry::default();
        let (format, mut source) = registry.identify(name, Source::reader(bytes))?;

        let mut replay = Vec::new();
        source.read_to_end(&mut replay)?;
        assert_eq!(replay, bytes, "stream must replay from the beginning");

        Ok(format.name().into_owned())
    }

    #[test]
    fn short_inputs_do_not_match() {
        for input in [&b""[..], &b"\x00"[..], &b"hello, plain text\n"[..]] {
            let err = identify_bytes(None, input).unwrap_err();
            assert!(err.is_no_match(), "{:?}: {}", input, err);
        }
    }

    #[test]
    fn archive_headers_match_by_content() {
        let mut zip = b"PK\x03\x04".to_vec();
        zip.extend_from_slice(&[0u8; 60]);
        let cases: Vec<(Vec<u8>, &str)> = vec![
            (zip, ".zip"),
            (b"7z\xBC\xAF\x27\x1C\x00\x04".to_vec(), ".7z"),
            (b"Rar!\x1a\x07\x00\x00\x00".to_vec(), ".rar"),
            (b"Rar!\x1a\x07\x01\x00\x00".to_vec(), ".rar"),
        ];

        for (bytes, expected) in cases {
            if Registry::default().get(expected).is_none() {
                continue;
            }
            assert_eq!(identify_bytes(None, &bytes).unwrap(), expected);
        }
    }

    #[test]
    fn truncated_headers_do_not_match() {
        for header in [
            &b"Rar!\x1a\x07"[..],
            &b"Rar!\x1a\x07\x01"[..],
            &b"\xfd\x37\x7a\x58\x5a"[..],
        ] {
            let err = identify_bytes(None, header).unwrap_err();
            assert!(err.is_no_match(), "{:?}: {}", header, err);
        }
    }

    #[test]
    fn names_match_without_content() {
        assert_eq!(identify_bytes(Some("notes.TAR"), b"").unwrap(), ".tar");
        assert_eq!(identify_bytes(Some("data.gz"), b"").unwrap(), ".gz");
        assert_eq!(
            identify_bytes(Some("backup.tar.gz"), b"").unwrap(),
            ".tar.gz"
        );
    }

    #[test]
    fn seekable_source_comes_back_at_start() {
        let registry = Registry::default();
        let bytes = b"Rar!\x1a\x07\x00 and more".to_vec();
        let (format, mut source) = registry
            .identify(None, Source::seekable(Cursor::new(bytes.clone())))
            .unwrap();

        assert_eq!(format.name(), ".rar");
        assert!(source.is_seekable());
        let mut replay = Vec::new();
        source.read_to_end(&mut replay).unwrap();
        assert_eq!(replay, bytes);
    }

    #[test]
    fn read_errors_name_the_format() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "nope"))
            }
        }

        let err = Registry::default()
            .identify(None, Source::reader(Broken))
            .unwrap_err();
        match err {
            Error::Probe { format, source } => {
                assert!(format.starts_with('.'));
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
