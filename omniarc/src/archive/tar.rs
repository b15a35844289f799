use std::borrow::Cow;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::time::{Duration, SystemTime};

use ::tar::{Archive, Builder, EntryType, Header};

use super::follow;
use crate::context::Context;
use crate::entry::{file_is_included, FileEntry, FileInfo, FileKind, SkipList};
use crate::error::{Error, Result};
use crate::format::{
    name_matches, Archival, ArchiverAsync, FileHandler, Format, Inserter, MatchResult,
};
use crate::path;
use crate::source::{ReadWriteSeek, Source};

const BLOCK_SIZE: u64 = 512;

/// POSIX tar (ustar, GNU and pax extensions on read).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tar {
    /// Log and skip entries that fail to read or write instead of aborting.
    pub continue_on_error: bool,
}

impl Tar {
    fn write_files<'f, W: Write>(
        &self,
        ctx: &Context,
        builder: &mut Builder<W>,
        files: impl IntoIterator<Item = FileEntry<'f>>,
    ) -> Result<()> {
        for (index, file) in files.into_iter().enumerate() {
            let name = file.name_in_archive.clone();
            if let Err(err) = write_file(ctx, builder, file) {
                let err = Error::entry(index, name, err);
                if self.continue_on_error && !err.is_cancelled() {
                    tracing::warn!(format = ".tar", error = %err, "skipping entry");
                    continue;
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

fn write_file<W: Write>(ctx: &Context, builder: &mut Builder<W>, mut file: FileEntry<'_>) -> Result<()> {
    ctx.check()?;

    let mut header = Header::new_gnu();
    header.set_mode(file.info.permissions & 0o7777);
    header.set_mtime(
        file.info
            .modified
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0),
    );

    let name = file.name_in_archive.clone();
    match file.info.kind {
        FileKind::Regular => {
            header.set_entry_type(EntryType::Regular);
            header.set_size(file.info.size);
            let reader = file.open()?;
            builder.append_data(&mut header, &name, reader)?;
        }
        FileKind::Directory => {
            header.set_entry_type(EntryType::Directory);
            header.set_size(0);
            builder.append_data(&mut header, &name, io::empty())?;
        }
        FileKind::Symlink => {
            header.set_entry_type(EntryType::Symlink);
            header.set_size(0);
            let target = file.link_target.as_deref().unwrap_or_default();
            builder.append_link(&mut header, &name, target)?;
        }
        FileKind::Other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{}: unsupported file type", name),
            )
            .into())
        }
    }

    Ok(())
}

fn entry_info(header: &Header, name: &str, size: u64) -> FileInfo {
    let kind = match header.entry_type() {
        _ if name.ends_with('/') => FileKind::Directory,
        EntryType::Regular | EntryType::Continuous | EntryType::GNUSparse => FileKind::Regular,
        EntryType::Directory => FileKind::Directory,
        EntryType::Symlink => FileKind::Symlink,
        _ => FileKind::Other,
    };

    FileInfo {
        name: path::base(name).to_string(),
        size,
        permissions: header.mode().map(|m| m & 0o7777).unwrap_or(0o644),
        modified: SystemTime::UNIX_EPOCH + Duration::from_secs(header.mtime().unwrap_or(0)),
        kind,
    }
}

impl Format for Tar {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(".tar")
    }

    /// Matches by content when the first header parses; read errors are a non-match.
    fn matches(&self, filename: Option<&str>, stream: &mut dyn Read) -> io::Result<MatchResult> {
        let mut archive = Archive::new(stream);
        let by_stream = match archive.entries() {
            Ok(mut entries) => matches!(entries.next(), Some(Ok(_))),
            Err(_) => false,
        };

        Ok(MatchResult {
            by_name: name_matches(filename, ".tar"),
            by_stream,
        })
    }

    fn as_archival(&self) -> Option<&dyn Archival> {
        Some(self)
    }

    fn as_inserter(&self) -> Option<&dyn Inserter> {
        Some(self)
    }

    fn as_async_archiver(&self) -> Option<&dyn ArchiverAsync> {
        Some(self)
    }
}

impl Archival for Tar {
    fn archive(&self, ctx: &Context, output: &mut dyn Write, files: Vec<FileEntry<'_>>) -> Result<()> {
        let mut builder = Builder::new(output);
        self.write_files(ctx, &mut builder, files)?;
        builder.into_inner()?;
        Ok(())
    }

    fn extract(
        &self,
        ctx: &Context,
        source: Source<'_>,
        paths: Option<&[String]>,
        handler: &mut FileHandler<'_>,
    ) -> Result<()> {
        let mut archive = Archive::new(source);
        let mut skip = SkipList::new();

        for (index, entry) in archive.entries()?.enumerate() {
            ctx.check()?;

            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if self.continue_on_error => {
                    tracing::warn!(format = ".tar", index, error = %err, "advancing to next entry");
                    continue;
                }
                Err(err) => return Err(Error::entry(index, "", err)),
            };

            if entry.header().entry_type() == EntryType::XGlobalHeader {
                continue;
            }

            let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            if !file_is_included(paths, &name) || skip.contains(&name) {
                continue;
            }

            let info = entry_info(entry.header(), &name, entry.size());
            let is_dir = info.is_dir();
            let link_target = entry
                .link_name_bytes()
                .map(|target| String::from_utf8_lossy(&target).into_owned());
            let header = entry.header().clone();

            let mut file = FileEntry::new(info, name.clone()).with_header(header);
            if let Some(target) = link_target {
                file = file.with_link_target(target);
            }
            if !is_dir {
                file = file.with_opener(move || Ok(Box::new(entry) as Box<dyn Read + '_>));
            }

            let walk = handler(ctx, file).map_err(|err| Error::entry(index, name.clone(), err))?;
            if !follow(walk, &mut skip, &name, is_dir) {
                break;
            }
        }

        Ok(())
    }
}

impl ArchiverAsync for Tar {
    fn archive_async(
        &self,
        ctx: &Context,
        output: &mut dyn Write,
        files: flume::Receiver<FileEntry<'static>>,
    ) -> Result<()> {
        let mut builder = Builder::new(output);
        self.write_files(ctx, &mut builder, files.iter())?;
        builder.into_inner()?;
        Ok(())
    }
}

impl Inserter for Tar {
    /// Finds where the last entry's data ends, rounds up to the next block, and writes the
    /// new entries plus a fresh end-of-archive marker from there.
    fn insert(&self, ctx: &Context, archive: &mut dyn ReadWriteSeek, files: Vec<FileEntry<'_>>) -> Result<()> {
        let start = archive.stream_position()?;

        let mut data_end = 0;
        {
            let mut reader = Archive::new(&mut *archive);
            for entry in reader.entries()? {
                ctx.check()?;
                let entry = entry?;
                data_end = entry.raw_file_position() + entry.size();
            }
        }

        let offset = start + data_end.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
        tracing::debug!(offset, "appending to tar archive");
        archive.seek(SeekFrom::Start(offset))?;

        let mut builder = Builder::new(&mut *archive);
        self.write_files(ctx, &mut builder, files)?;
        builder.into_inner()?;
        Ok(())
    }
}
