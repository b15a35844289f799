//! Read-only filesystem views over directories, archives and single files.
//!
//! Every view speaks slash separated names relative to its root, with `"."` naming the
//! root itself. [`file_system`] picks the right view for a path on disk.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::context::Context;
use crate::entry::FileInfo;
use crate::error::{Error, Result};
use crate::format::Walk;
use crate::path;
use crate::registry::Registry;
use crate::source::Source;

mod archive;
mod dir;
mod file;
mod implicit;

pub use self::archive::{ArchiveFs, ArchiveSource};
pub use self::dir::DirFs;
pub use self::file::FileFs;

pub trait FileSystem {
    /// Opens `name`. Directories can be listed through [`FsFile::read_dir`].
    fn open(&self, name: &str) -> Result<Box<dyn FsFile>>;

    /// Lists the directory `name`, sorted by name.
    fn read_dir(&self, name: &str) -> Result<Vec<FileInfo>>;

    fn stat(&self, name: &str) -> Result<FileInfo>;

    /// A view rooted at the directory `dir`.
    fn sub(&self, dir: &str) -> Result<Box<dyn FileSystem>>;
}

/// An opened file or directory.
pub trait FsFile: Read {
    fn stat(&self) -> Result<FileInfo>;

    /// Reads the next `n` directory entries, or all remaining ones when `n` is `None`.
    ///
    /// An empty result means the listing is exhausted.
    fn read_dir(&mut self, n: Option<usize>) -> Result<Vec<FileInfo>>;
}

/// The file type behind every [`FsFile`] handed out by this module.
pub struct OpenFile {
    name: String,
    info: FileInfo,
    content: Option<Box<dyn Read>>,
    entries: Vec<FileInfo>,
    entries_read: usize,
}

impl OpenFile {
    pub(crate) fn directory(name: &str, info: FileInfo, entries: Vec<FileInfo>) -> Self {
        OpenFile {
            name: name.to_string(),
            info,
            content: None,
            entries,
            entries_read: 0,
        }
    }

    pub(crate) fn file(name: &str, info: FileInfo, content: Box<dyn Read>) -> Self {
        OpenFile {
            name: name.to_string(),
            info,
            content: Some(content),
            entries: Vec::new(),
            entries_read: 0,
        }
    }

    /// A file without readable content, such as a symlink.
    pub(crate) fn empty(name: &str, info: FileInfo) -> Self {
        OpenFile::file(name, info, Box::new(io::empty()))
    }
}

impl Read for OpenFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.content {
            Some(content) => content.read(buf),
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{}: is a directory", self.name),
            )),
        }
    }
}

impl FsFile for OpenFile {
    fn stat(&self) -> Result<FileInfo> {
        Ok(self.info.clone())
    }

    fn read_dir(&mut self, n: Option<usize>) -> Result<Vec<FileInfo>> {
        if !self.info.is_dir() {
            return Err(Error::NotADirectory {
                op: "readdir",
                path: self.name.clone(),
            });
        }

        let remaining = &self.entries[self.entries_read..];
        let take = n.map_or(remaining.len(), |n| n.min(remaining.len()));
        let batch = remaining[..take].to_vec();
        self.entries_read += take;
        Ok(batch)
    }
}

impl fmt::Debug for OpenFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenFile")
            .field("name", &self.name)
            .field("info", &self.info)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

pub(crate) fn check_name(name: &str, op: &'static str) -> Result<()> {
    if path::is_valid(name) {
        Ok(())
    } else {
        Err(Error::InvalidPath {
            op,
            path: name.to_string(),
        })
    }
}

/// Maps "not found" from the OS onto [`Error::NotFound`], keeping other errors as they are.
pub(crate) fn os_error(err: io::Error, op: &'static str, name: &str) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        Error::NotFound {
            op,
            path: name.to_string(),
        }
    } else {
        Error::Io(err)
    }
}

/// Opens `root` as a filesystem.
///
/// Directories are served from disk. Files are identified: archives (compressed or not) are
/// browsed as directories, compressed files are decompressed on read, and anything else
/// becomes a view holding just that file.
pub fn file_system(registry: &Registry, ctx: &Context, root: &Path) -> Result<Box<dyn FileSystem>> {
    let metadata = std::fs::metadata(root).map_err(|e| os_error(e, "open", &root.display().to_string()))?;
    if metadata.is_dir() {
        return Ok(Box::new(DirFs::new(root)));
    }

    let file = File::open(root)?;
    let filename = root.file_name().map(|n| n.to_string_lossy().into_owned());
    let format = match registry.identify(filename.as_deref(), Source::seekable(BufReader::new(file))) {
        Ok((format, _)) => format,
        Err(err) if err.is_no_match() => {
            tracing::debug!(path = %root.display(), "no format matched, serving as a plain file");
            return Ok(Box::new(FileFs::new(root)));
        }
        Err(err) => return Err(err),
    };

    if format.as_archival().is_some() {
        Ok(Box::new(
            ArchiveFs::new(ArchiveSource::Path(root.to_path_buf()), format).with_context(ctx.clone()),
        ))
    } else if format.as_compression().is_some() {
        Ok(Box::new(FileFs::new(root).with_compression(format)))
    } else {
        Ok(Box::new(FileFs::new(root)))
    }
}

/// Opens `name`, falling back to `name` without its first element.
///
/// Useful when it is unknown whether the root is an archive or a directory it was
/// extracted into without its top-level folder.
pub fn top_dir_open(fs: &dyn FileSystem, name: &str) -> Result<Box<dyn FsFile>> {
    fs.open(name).or_else(|_| fs.open(path::without_top_dir(name)))
}

/// Like [`top_dir_open`], for [`FileSystem::stat`].
pub fn top_dir_stat(fs: &dyn FileSystem, name: &str) -> Result<FileInfo> {
    fs.stat(name).or_else(|_| fs.stat(path::without_top_dir(name)))
}

/// Like [`top_dir_open`], for [`FileSystem::read_dir`].
pub fn top_dir_read_dir(fs: &dyn FileSystem, name: &str) -> Result<Vec<FileInfo>> {
    fs.read_dir(name)
        .or_else(|_| fs.read_dir(path::without_top_dir(name)))
}

/// Visits `root` and everything below it, depth first, each directory in name order.
///
/// [`Walk::SkipDir`] on a directory skips its contents; on a file it skips the file's
/// remaining siblings. [`Walk::Stop`] ends the walk.
///
/// Every directory visited is listed with [`FileSystem::read_dir`]. For archive views that
/// means one pass over the archive per directory.
pub fn walk_dir(
    fs: &dyn FileSystem,
    root: &str,
    visit: &mut dyn FnMut(&str, &FileInfo) -> Result<Walk>,
) -> Result<()> {
    let info = fs.stat(root)?;
    walk(fs, root, &info, visit)?;
    Ok(())
}

fn walk(
    fs: &dyn FileSystem,
    name: &str,
    info: &FileInfo,
    visit: &mut dyn FnMut(&str, &FileInfo) -> Result<Walk>,
) -> Result<Walk> {
    let answer = visit(name, info)?;
    if !info.is_dir() {
        return Ok(answer);
    }
    match answer {
        Walk::Continue => {}
        Walk::SkipDir => return Ok(Walk::Continue),
        Walk::Stop => return Ok(Walk::Stop),
    }

    for child in fs.read_dir(name)? {
        let child_name = path::join(name, &child.name);
        match walk(fs, &child_name, &child, visit)? {
            Walk::Continue => {}
            Walk::SkipDir => break,
            Walk::Stop => return Ok(Walk::Stop),
        }
    }

    Ok(Walk::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::SystemTime;

    use crate::entry::FileKind;

    fn info(name: &str, kind: FileKind) -> FileInfo {
        FileInfo {
            name: name.to_string(),
            size: 0,
            permissions: 0o644,
            modified: SystemTime::UNIX_EPOCH,
            kind,
        }
    }

    #[test]
    fn directory_handles_list_incrementally() {
        let entries = vec![
            info("a", FileKind::Regular),
            info("b", FileKind::Directory),
            info("c", FileKind::Regular),
        ];
        let mut dir = OpenFile::directory(".", FileInfo::implicit_dir("."), entries);

        assert_eq!(dir.read_dir(Some(2)).unwrap().len(), 2);
        assert_eq!(dir.read_dir(Some(2)).unwrap().len(), 1);
        assert!(dir.read_dir(Some(2)).unwrap().is_empty());
        assert!(dir.read_dir(None).unwrap().is_empty());
        assert!(dir.read(&mut [0; 4]).is_err());
    }

    #[test]
    fn files_are_not_directories() {
        let mut file = OpenFile::file("x", info("x", FileKind::Regular), Box::new(&b"data"[..]));
        let err = file.read_dir(None).unwrap_err();
        assert!(matches!(err, Error::NotADirectory { op: "readdir", .. }));

        let mut body = String::new();
        file.read_to_string(&mut body).unwrap();
        assert_eq!(body, "data");
    }

    #[test]
    fn names_are_checked() {
        for bad in ["", "/abs", "a/../b", "a//b", "./a", "a/"] {
            assert!(
                matches!(check_name(bad, "open"), Err(Error::InvalidPath { .. })),
                "{:?}",
                bad
            );
        }
        assert!(check_name(".", "open").is_ok());
        assert!(check_name("a/b.txt", "open").is_ok());
    }
}
