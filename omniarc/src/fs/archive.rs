use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;

use super::implicit::{fill_implicit, open_read_dir, search, Listing};
use super::{check_name, os_error, FileSystem, FsFile, OpenFile};
use crate::context::Context;
use crate::entry::{FileInfo, FileKind};
use crate::error::{Error, Result};
use crate::format::{Archival, Format, Walk};
use crate::path;
use crate::source::{Section, Source};

/// Where an [`ArchiveFs`] reads its archive from.
#[derive(Clone)]
pub enum ArchiveSource {
    /// Reopened for every operation.
    Path(PathBuf),
    /// Read through a fresh cursor for every operation.
    Section(Section),
}

/// Browses an archive, or a compressed archive, as a directory tree.
///
/// Nothing is cached: every call re-reads the archive. Open and stat stop at the first
/// exact match; directory listings always read the whole archive, since entries of one
/// directory may be anywhere in it. Walking a large archive directory by directory is
/// therefore quadratic in the number of entries, while a single
/// [`extract`](crate::Archival::extract) pass is linear.
#[derive(Clone)]
pub struct ArchiveFs {
    source: ArchiveSource,
    format: Arc<dyn Format>,
    prefix: String,
    context: Context,
}

/// What ends a scan early.
#[derive(Clone, Copy, PartialEq, Eq)]
enum StopAt {
    /// An exact match that is not a directory; regular files get their content buffered.
    File,
    /// Any exact match, metadata only.
    Any,
}

impl ArchiveFs {
    pub fn new(source: ArchiveSource, format: Arc<dyn Format>) -> Self {
        ArchiveFs {
            source,
            format,
            prefix: String::new(),
            context: Context::new(),
        }
    }

    /// Operations observe cancellation of `context`.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn format(&self) -> &Arc<dyn Format> {
        &self.format
    }

    fn archival(&self) -> Result<&dyn Archival> {
        self.format
            .as_archival()
            .ok_or_else(|| Error::unsupported(self.format.name(), "extract"))
    }

    fn open_source(&self) -> Result<Source<'static>> {
        match &self.source {
            ArchiveSource::Path(path) => {
                let file = File::open(path)?;
                Ok(Source::seekable(BufReader::new(file)))
            }
            ArchiveSource::Section(section) => Ok(Source::seekable(section.reader())),
        }
    }

    /// Metadata of the archive root, which is always a directory.
    fn root_info(&self) -> Result<FileInfo> {
        match &self.source {
            ArchiveSource::Path(path) => {
                let metadata = std::fs::metadata(path)?;
                Ok(FileInfo {
                    name: path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| ".".to_string()),
                    size: 0,
                    permissions: crate::disk::file_info_from_metadata(".", &metadata).permissions,
                    modified: metadata.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH),
                    kind: FileKind::Directory,
                })
            }
            ArchiveSource::Section(_) => Ok(FileInfo::implicit_dir(".")),
        }
    }

    /// Extracts entries matching `name` (everything when `name` is `"."`), returning them
    /// and whether the scan stopped on an exact match.
    fn scan(&self, name: &str, stop_at: StopAt) -> Result<(Vec<Listing>, bool)> {
        let archival = self.archival()?;
        let source = self.open_source()?;
        let filter = [name.to_string()];
        let paths = if name == "." { None } else { Some(&filter[..]) };

        let mut entries = Vec::new();
        let mut found = false;

        archival.extract(&self.context, source, paths, &mut |_, mut file| {
            let entry_name = file.name_in_archive.trim_matches('/').to_string();
            let exact = entry_name == name
                && match stop_at {
                    StopAt::File => !file.info.is_dir(),
                    StopAt::Any => true,
                };

            let content = if exact && stop_at == StopAt::File && file.info.is_file() {
                let mut buf = Vec::new();
                file.open()?.read_to_end(&mut buf)?;
                Some(buf)
            } else {
                None
            };

            entries.push(Listing {
                name: entry_name,
                info: file.info.clone(),
                content,
            });

            if exact {
                found = true;
                Ok(Walk::Stop)
            } else {
                Ok(Walk::Continue)
            }
        })?;

        tracing::trace!(name, entries = entries.len(), found, "scanned archive");
        Ok((entries, found))
    }

    /// Resolves `name` (already prefixed) to one listing, synthesising parents if needed.
    fn lookup(&self, op: &'static str, name: &str, stop_at: StopAt) -> Result<(Listing, Vec<Listing>)> {
        let (mut entries, found) = self.scan(name, stop_at)?;
        let not_found = || Error::NotFound {
            op,
            path: name.to_string(),
        };

        if entries.is_empty() {
            return Err(not_found());
        }
        if found || (entries.len() == 1 && entries[0].name == name) {
            let exact = entries.pop().ok_or_else(not_found)?;
            return Ok((exact, Vec::new()));
        }

        let entries = fill_implicit(entries);
        let exact = search(name, &entries).cloned().ok_or_else(not_found)?;
        Ok((exact, entries))
    }
}

impl FileSystem for ArchiveFs {
    fn open(&self, name: &str) -> Result<Box<dyn FsFile>> {
        check_name(name, "open")?;
        let name = path::join(&self.prefix, name);

        if name == "." {
            let entries = self.read_dir(".")?;
            return Ok(Box::new(OpenFile::directory(&name, self.root_info()?, entries)));
        }

        let (exact, listing) = self.lookup("open", &name, StopAt::File)?;
        let file = match exact.info.kind {
            FileKind::Directory => {
                let entries = open_read_dir(&name, &listing);
                OpenFile::directory(&name, exact.info, entries)
            }
            FileKind::Regular => {
                let content = exact.content.unwrap_or_default();
                OpenFile::file(&name, exact.info, Box::new(Cursor::new(content)))
            }
            _ => OpenFile::empty(&name, exact.info),
        };
        Ok(Box::new(file))
    }

    fn read_dir(&self, name: &str) -> Result<Vec<FileInfo>> {
        check_name(name, "readdir")?;
        let name = path::join(&self.prefix, name);

        let (entries, found_file) = self.scan(&name, StopAt::File)?;
        let not_a_dir = || Error::NotADirectory {
            op: "readdir",
            path: name.clone(),
        };
        if found_file {
            return Err(not_a_dir());
        }

        let entries = fill_implicit(entries);
        if name != "." {
            match search(&name, &entries) {
                None => {
                    return Err(Error::NotFound {
                        op: "readdir",
                        path: name.clone(),
                    })
                }
                Some(dir) if !dir.info.is_dir() => return Err(not_a_dir()),
                Some(_) => {}
            }
        }

        Ok(open_read_dir(&name, &entries))
    }

    fn stat(&self, name: &str) -> Result<FileInfo> {
        check_name(name, "stat")?;
        let name = path::join(&self.prefix, name);

        if name == "." {
            return match &self.source {
                ArchiveSource::Path(path) => self
                    .root_info()
                    .map_err(|e| match e {
                        Error::Io(e) => os_error(e, "stat", &path.display().to_string()),
                        e => e,
                    }),
                ArchiveSource::Section(_) => self.root_info(),
            };
        }

        let (exact, _) = self.lookup("stat", &name, StopAt::Any)?;
        Ok(exact.info)
    }

    fn sub(&self, dir: &str) -> Result<Box<dyn FileSystem>> {
        check_name(dir, "sub")?;
        if !self.stat(dir)?.is_dir() {
            return Err(Error::NotADirectory {
                op: "sub",
                path: dir.to_string(),
            });
        }

        let mut sub = self.clone();
        sub.prefix = path::join(&self.prefix, dir);
        Ok(Box::new(sub))
    }
}
