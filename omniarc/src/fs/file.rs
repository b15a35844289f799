use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{check_name, os_error, FileSystem, FsFile, OpenFile};
use crate::disk::file_info_from_metadata;
use crate::entry::FileInfo;
use crate::error::{Error, Result};
use crate::format::Format;

/// A single file on disk as the only entry of a filesystem.
///
/// The file is addressed as `"."` or by its base name. With a compression format set, reads
/// are transparently decompressed.
#[derive(Clone)]
pub struct FileFs {
    path: PathBuf,
    compression: Option<Arc<dyn Format>>,
}

impl FileFs {
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileFs {
            path: path.as_ref().to_path_buf(),
            compression: None,
        }
    }

    pub fn with_compression(mut self, format: Arc<dyn Format>) -> Self {
        self.compression = Some(format);
        self
    }

    fn base_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn check(&self, name: &str, op: &'static str) -> Result<()> {
        check_name(name, op)?;
        if name != "." && name != self.base_name() {
            return Err(Error::NotFound {
                op,
                path: name.to_string(),
            });
        }
        Ok(())
    }

    fn info(&self, op: &'static str) -> Result<FileInfo> {
        let metadata = fs::metadata(&self.path).map_err(|e| os_error(e, op, &self.path.display().to_string()))?;
        Ok(file_info_from_metadata(&self.base_name(), &metadata))
    }
}

impl FileSystem for FileFs {
    fn open(&self, name: &str) -> Result<Box<dyn FsFile>> {
        self.check(name, "open")?;
        let info = self.info("open")?;
        let file = File::open(&self.path)?;

        let codec = self.compression.as_deref().and_then(|c| c.as_compression());
        let content: Box<dyn Read> = match codec {
            Some(codec) => codec.open_reader(Box::new(BufReader::new(file)))?,
            None => Box::new(file),
        };
        Ok(Box::new(OpenFile::file(name, info, content)))
    }

    /// The file itself is the only entry.
    fn read_dir(&self, name: &str) -> Result<Vec<FileInfo>> {
        self.check(name, "readdir")?;
        Ok(vec![self.info("readdir")?])
    }

    fn stat(&self, name: &str) -> Result<FileInfo> {
        self.check(name, "stat")?;
        self.info("stat")
    }

    fn sub(&self, dir: &str) -> Result<Box<dyn FileSystem>> {
        self.check(dir, "sub")?;
        if dir == "." {
            return Ok(Box::new(self.clone()));
        }
        Err(Error::NotADirectory {
            op: "sub",
            path: dir.to_string(),
        })
    }
}

impl std::fmt::Debug for FileFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileFs")
            .field("path", &self.path)
            .field("compression", &self.compression.as_ref().map(|c| c.name().into_owned()))
            .finish()
    }
}
