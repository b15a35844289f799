use std::any::Any;
use std::fmt;
use std::io::{self, Read};
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    Other,
}

/// Filesystem metadata of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Base name of the entry.
    pub name: String,
    pub size: u64,
    /// Permission bits (`0o7777` range).
    pub permissions: u32,
    pub modified: SystemTime,
    pub kind: FileKind,
}

impl FileInfo {
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::Regular
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == FileKind::Symlink
    }

    /// Metadata of a directory that exists only because other entries live inside it.
    pub fn implicit_dir(name: impl Into<String>) -> Self {
        FileInfo {
            name: name.into(),
            size: 0,
            permissions: 0o755,
            modified: SystemTime::UNIX_EPOCH,
            kind: FileKind::Directory,
        }
    }
}

type Opener<'a> = Box<dyn FnOnce() -> io::Result<Box<dyn Read + 'a>> + 'a>;

/// One file, directory or link, either read out of an archive or destined for one.
///
/// The content is opened lazily, at most once.
pub struct FileEntry<'a> {
    pub info: FileInfo,
    /// Slash separated path inside the archive.
    pub name_in_archive: String,
    pub link_target: Option<String>,
    /// The container's own header for this entry (`tar::Header`, `zip` metadata, ...).
    pub header: Option<Box<dyn Any + Send + Sync>>,
    opener: Option<Opener<'a>>,
}

impl<'a> FileEntry<'a> {
    pub fn new(info: FileInfo, name_in_archive: impl Into<String>) -> Self {
        FileEntry {
            info,
            name_in_archive: name_in_archive.into(),
            link_target: None,
            header: None,
            opener: None,
        }
    }

    pub fn with_opener<F>(mut self, opener: F) -> Self
    where
        F: FnOnce() -> io::Result<Box<dyn Read + 'a>> + 'a,
    {
        self.opener = Some(Box::new(opener));
        self
    }

    pub fn with_link_target(mut self, target: impl Into<String>) -> Self {
        self.link_target = Some(target.into());
        self
    }

    pub fn with_header(mut self, header: impl Any + Send + Sync) -> Self {
        self.header = Some(Box::new(header));
        self
    }

    /// Opens the content. Entries without content (directories, links) read as empty.
    ///
    /// Fails if called a second time.
    pub fn open(&mut self) -> io::Result<Box<dyn Read + 'a>> {
        match self.opener.take() {
            Some(opener) => opener(),
            None if self.info.is_file() => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{}: content already opened", self.name_in_archive),
            )),
            None => Ok(Box::new(io::empty())),
        }
    }

    pub fn has_content(&self) -> bool {
        self.opener.is_some()
    }
}

impl fmt::Debug for FileEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileEntry")
            .field("info", &self.info)
            .field("name_in_archive", &self.name_in_archive)
            .field("link_target", &self.link_target)
            .finish_non_exhaustive()
    }
}

/// Whether `name` is selected by the extraction filter `paths`.
///
/// No filter selects everything; otherwise the name must equal a listed path or live
/// beneath one.
pub fn file_is_included(paths: Option<&[String]>, name: &str) -> bool {
    let paths = match paths {
        Some(paths) => paths,
        None => return true,
    };

    paths.iter().any(|p| {
        name == p
            || name
                .strip_prefix(p.trim_end_matches('/'))
                .map_or(false, |rest| rest.starts_with('/'))
    })
}

/// Directories excluded from the rest of a walk.
///
/// Adding a path already covered by a broader entry is a no-op; adding a broader path
/// replaces the narrower ones it covers.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SkipList(Vec<String>);

impl SkipList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, dir: &str) {
        let trimmed = dir.trim_end_matches('/');
        if self
            .0
            .iter()
            .any(|e| e.trim_end_matches('/') == trimmed)
        {
            return;
        }

        let covered = self
            .0
            .iter()
            .any(|e| is_below(trimmed, e.trim_end_matches('/')));
        self.0.retain(|e| !is_below(e.trim_end_matches('/'), trimmed));
        if !covered {
            self.0.push(dir.to_string());
        }
    }

    /// True if `name` equals or lies beneath a skipped directory.
    pub fn contains(&self, name: &str) -> bool {
        let name = name.trim_end_matches('/');
        self.0.iter().any(|skipped| {
            let skipped = skipped.trim_end_matches('/');
            name == skipped || is_below(name, skipped)
        })
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

fn is_below(name: &str, dir: &str) -> bool {
    name.len() > dir.len() && name.starts_with(dir) && name.as_bytes()[dir.len()] == b'/'
}
