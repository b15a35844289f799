use std::borrow::Cow;
use std::io::{self, Read, Write};
use std::time::SystemTime;

use sevenz_rust::{Password, SevenZArchiveEntry, SevenZReader};

use super::{follow, require_seekable, stream_len};
use crate::context::Context;
use crate::entry::{file_is_included, FileEntry, FileInfo, FileKind, SkipList};
use crate::error::{Error, Result};
use crate::format::{header_matches, name_matches, Archival, FileHandler, Format, MatchResult};
use crate::path;
use crate::source::Source;

const HEADER: &[u8] = b"7z\xBC\xAF\x27\x1C";

/// Set in the attributes when the high 16 bits hold a unix mode.
const UNIX_EXTENSION: u32 = 0x8000;

/// 7-Zip archives, read only.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SevenZip {
    pub continue_on_error: bool,
    /// Password for encrypted archives.
    pub password: Option<String>,
}

fn sevenz_error(err: sevenz_rust::Error) -> Error {
    Error::Io(io::Error::new(io::ErrorKind::InvalidData, err.to_string()))
}

fn entry_info(entry: &SevenZArchiveEntry) -> FileInfo {
    let is_dir = entry.is_directory();
    let permissions = if entry.has_windows_attributes && entry.windows_attributes() & UNIX_EXTENSION != 0 {
        (entry.windows_attributes() >> 16) & 0o7777
    } else if is_dir {
        0o755
    } else {
        0o644
    };
    let modified = if entry.has_last_modified_date {
        SystemTime::from(entry.last_modified_date())
    } else {
        SystemTime::UNIX_EPOCH
    };

    FileInfo {
        name: path::base(entry.name().trim_end_matches('/')).to_string(),
        size: entry.size(),
        permissions,
        modified,
        kind: if is_dir {
            FileKind::Directory
        } else {
            FileKind::Regular
        },
    }
}

impl Format for SevenZip {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(".7z")
    }

    fn matches(&self, filename: Option<&str>, stream: &mut dyn Read) -> io::Result<MatchResult> {
        Ok(MatchResult {
            by_name: name_matches(filename, ".7z"),
            by_stream: header_matches(stream, HEADER)?,
        })
    }

    fn as_archival(&self) -> Option<&dyn Archival> {
        Some(self)
    }
}

impl Archival for SevenZip {
    fn archive(&self, _ctx: &Context, _output: &mut dyn Write, _files: Vec<FileEntry<'_>>) -> Result<()> {
        Err(Error::unsupported(".7z", "archive"))
    }

    fn extract(
        &self,
        ctx: &Context,
        source: Source<'_>,
        paths: Option<&[String]>,
        handler: &mut FileHandler<'_>,
    ) -> Result<()> {
        let mut source = require_seekable(source, ".7z")?;
        let len = stream_len(&mut *source)?;
        let password = match &self.password {
            Some(password) => Password::from(password.as_str()),
            None => Password::empty(),
        };
        let mut reader = SevenZReader::new(source, len, password).map_err(sevenz_error)?;

        let mut skip = SkipList::new();
        let mut index = 0;
        let mut stopped = false;
        let mut failure = None;

        // Entries of one folder share a decoder, so unread content is drained before moving on.
        // The reader keeps going through later folders after a `false`, hence `stopped`.
        reader
            .for_each_entries(|entry, content| {
                if stopped {
                    return Ok(false);
                }
                let current = index;
                index += 1;

                if let Err(err) = ctx.check() {
                    failure = Some(err);
                    stopped = true;
                    return Ok(false);
                }

                let name = entry.name().to_string();
                if !file_is_included(paths, &name) || skip.contains(&name) {
                    io::copy(content, &mut io::sink())?;
                    return Ok(true);
                }

                let is_dir = entry.is_directory();
                let mut file = FileEntry::new(entry_info(entry), name.clone());
                if !is_dir {
                    let body = &mut *content;
                    file = file.with_opener(move || Ok(Box::new(body) as Box<dyn Read + '_>));
                }

                let keep_going = match handler(ctx, file) {
                    Ok(walk) => follow(walk, &mut skip, &name, is_dir),
                    Err(err) if self.continue_on_error && !err.is_cancelled() => {
                        tracing::warn!(format = ".7z", entry = %name, error = %err, "handler failed");
                        true
                    }
                    Err(err) => {
                        failure = Some(Error::entry(current, name, err));
                        false
                    }
                };

                if keep_going {
                    io::copy(content, &mut io::sink())?;
                } else {
                    stopped = true;
                }
                Ok(keep_going)
            })
            .map_err(sevenz_error)?;

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
