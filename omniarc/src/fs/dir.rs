use std::fs::{self, File};
use std::path::{Path, PathBuf};

use super::{check_name, os_error, FileSystem, FsFile, OpenFile};
use crate::disk::file_info_from_metadata;
use crate::entry::FileInfo;
use crate::error::{Error, Result};
use crate::path;

/// A directory on disk.
#[derive(Debug, Clone)]
pub struct DirFs {
    root: PathBuf,
}

impl DirFs {
    pub fn new(root: impl AsRef<Path>) -> Self {
        DirFs {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, name: &str) -> PathBuf {
        if name == "." {
            self.root.clone()
        } else {
            self.root.join(name)
        }
    }

    fn info(&self, name: &str, op: &'static str) -> Result<FileInfo> {
        let metadata = fs::metadata(self.resolve(name)).map_err(|e| os_error(e, op, name))?;
        let base = if name == "." {
            "."
        } else {
            path::base(name)
        };
        Ok(file_info_from_metadata(base, &metadata))
    }
}

impl FileSystem for DirFs {
    fn open(&self, name: &str) -> Result<Box<dyn FsFile>> {
        check_name(name, "open")?;
        let info = self.info(name, "open")?;

        if info.is_dir() {
            let entries = self.read_dir(name)?;
            return Ok(Box::new(OpenFile::directory(name, info, entries)));
        }

        let file = File::open(self.resolve(name)).map_err(|e| os_error(e, "open", name))?;
        Ok(Box::new(OpenFile::file(name, info, Box::new(file))))
    }

    fn read_dir(&self, name: &str) -> Result<Vec<FileInfo>> {
        check_name(name, "readdir")?;

        let mut entries = Vec::new();
        for entry in fs::read_dir(self.resolve(name)).map_err(|e| os_error(e, "readdir", name))? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            let entry_name = entry.file_name().to_string_lossy().into_owned();
            entries.push(file_info_from_metadata(&entry_name, &metadata));
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn stat(&self, name: &str) -> Result<FileInfo> {
        check_name(name, "stat")?;
        self.info(name, "stat")
    }

    fn sub(&self, dir: &str) -> Result<Box<dyn FileSystem>> {
        check_name(dir, "sub")?;
        if !self.stat(dir)?.is_dir() {
            return Err(Error::NotADirectory {
                op: "sub",
                path: dir.to_string(),
            });
        }

        Ok(Box::new(DirFs::new(self.resolve(dir))))
    }
}
