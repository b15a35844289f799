use std::borrow::Cow;
use std::io::{self, Read, Write};

use crate::context::Context;
use crate::entry::FileEntry;
use crate::error::{Error, Result};
use crate::format::{name_matches, read_at_most, Archival, FileHandler, Format, MatchResult};
use crate::source::Source;

const HEADER_V1_5: &[u8] = b"Rar!\x1a\x07\x00";
const HEADER_V5_0: &[u8] = b"Rar!\x1a\x07\x01\x00";

/// RAR archives, recognised by name and signature (both the 1.5 and 5.0 layouts).
///
/// No decoder is available, so archiving and extraction fail with [`Error::Unsupported`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Rar;

impl Format for Rar {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(".rar")
    }

    fn matches(&self, filename: Option<&str>, stream: &mut dyn Read) -> io::Result<MatchResult> {
        let buf = read_at_most(stream, HEADER_V5_0.len())?;

        Ok(MatchResult {
            by_name: name_matches(filename, ".rar"),
            by_stream: buf.starts_with(HEADER_V1_5) || buf.starts_with(HEADER_V5_0),
        })
    }

    fn as_archival(&self) -> Option<&dyn Archival> {
        Some(self)
    }
}

impl Archival for Rar {
    fn archive(&self, _ctx: &Context, _output: &mut dyn Write, _files: Vec<FileEntry<'_>>) -> Result<()> {
        Err(Error::unsupported(".rar", "archive"))
    }

    fn extract(
        &self,
        _ctx: &Context,
        _source: Source<'_>,
        _paths: Option<&[String]>,
        _handler: &mut FileHandler<'_>,
    ) -> Result<()> {
        Err(Error::unsupported(".rar", "extract"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::format::Walk;

    #[test]
    fn both_signatures_match() {
        let rar = Rar;
        for header in [HEADER_V1_5, HEADER_V5_0, b"Rar!\x1a\x07\x00\xcf\x90"] {
            assert!(rar.matches(None, &mut &header[..]).unwrap().by_stream);
        }
        for header in [&b"Rar!\x1a\x07"[..], b"Rar!\x1a\x07\x01", b"PK\x03\x04"] {
            assert!(!rar.matches(None, &mut &header[..]).unwrap().by_stream);
        }
    }

    #[test]
    fn operations_are_unsupported() {
        let rar = Rar;
        let err = rar
            .extract(&Context::new(), Source::reader(HEADER_V1_5), None, &mut |_, _| {
                Ok(Walk::Continue)
            })
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported { operation: "extract", .. }));
        assert!(rar.archive(&Context::new(), &mut Vec::new(), vec![]).is_err());
    }
}
