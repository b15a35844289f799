//! Gathering files from the local filesystem for archiving.

use std::collections::BTreeMap;
use std::fs::{self, File, Metadata};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::entry::{FileEntry, FileInfo, FileKind};
use crate::error::Result;
use crate::path;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FromDiskOptions {
    /// Archive what symlinks point to rather than the links themselves.
    pub follow_symlinks: bool,
    /// Keep only the file type and permission bits, and reset modification times.
    pub clear_attributes: bool,
}

/// Lists files to archive from a map of paths on disk to names in the archive.
///
/// Directories are walked recursively and rooted at their name in the archive. A disk path
/// ending in a separator contributes only its contents, not itself. An empty archive name
/// means the base name at the archive root, and an archive name ending in `/` places the
/// base name inside that folder.
///
/// Content is opened from disk only when an archiver asks for it.
pub fn files_from_disk(
    options: Option<&FromDiskOptions>,
    filenames: &BTreeMap<PathBuf, String>,
) -> Result<Vec<FileEntry<'static>>> {
    let options = options.copied().unwrap_or_default();
    let mut files = Vec::new();

    for (root_on_disk, root_in_archive) in filenames {
        for entry in WalkDir::new(root_on_disk).follow_links(false).follow_root_links(false) {
            let entry = entry.map_err(io::Error::from)?;
            let path = entry.path().to_path_buf();

            let name_in_archive = name_on_disk_to_name_in_archive(&path, root_on_disk, root_in_archive);
            if entry.file_type().is_dir() && name_in_archive.is_empty() {
                continue;
            }

            let mut metadata = entry.metadata().map_err(io::Error::from)?;
            let mut link_target = None;
            if metadata.file_type().is_symlink() {
                if options.follow_symlinks {
                    metadata = fs::metadata(&path).map_err(|e| with_path(e, &path, "stat through symlink"))?;
                } else {
                    let target = fs::read_link(&path).map_err(|e| with_path(e, &path, "readlink"))?;
                    link_target = Some(target.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/"));
                }
            }

            let mut info = file_info_from_metadata(path::base(&name_in_archive), &metadata);
            if options.clear_attributes {
                info.modified = SystemTime::UNIX_EPOCH;
            }

            tracing::trace!(disk = %path.display(), archive = %name_in_archive, "adding file");

            let mut file = FileEntry::new(info, name_in_archive);
            if let Some(target) = link_target {
                file = file.with_link_target(target);
            } else if file.info.is_file() {
                file = file.with_opener(move || {
                    let f = File::open(&path)?;
                    Ok(Box::new(f) as Box<dyn Read>)
                });
            }
            files.push(file);
        }
    }

    Ok(files)
}

fn with_path(err: io::Error, path: &Path, op: &str) -> io::Error {
    io::Error::new(err.kind(), format!("{}: {}: {}", path.display(), op, err))
}

fn ends_with_separator(path: &Path) -> bool {
    path.as_os_str()
        .to_string_lossy()
        .chars()
        .last()
        .map_or(false, std::path::is_separator)
}

fn disk_base(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Converts a walked path to its archive name, following the rules of [`files_from_disk`].
pub fn name_on_disk_to_name_in_archive(name_on_disk: &Path, root_on_disk: &Path, root_in_archive: &str) -> String {
    let mut root = if ends_with_separator(root_on_disk) {
        path::trim_top_dir(root_in_archive).to_string()
    } else if root_in_archive.is_empty() {
        disk_base(root_on_disk)
    } else {
        root_in_archive.to_string()
    };

    if root.ends_with('/') {
        root.push_str(&disk_base(root_on_disk));
    }

    let remainder = name_on_disk
        .strip_prefix(root_on_disk)
        .map(|rest| {
            rest.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default();

    path::join(&root, &remainder)
}

/// Metadata of a file on disk, under the given base name.
pub fn file_info_from_metadata(name: &str, metadata: &Metadata) -> FileInfo {
    let file_type = metadata.file_type();
    let kind = if file_type.is_dir() {
        FileKind::Directory
    } else if file_type.is_symlink() {
        FileKind::Symlink
    } else if file_type.is_file() {
        FileKind::Regular
    } else {
        FileKind::Other
    };

    FileInfo {
        name: name.to_string(),
        size: if kind == FileKind::Regular { metadata.len() } else { 0 },
        permissions: permissions(metadata),
        modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        kind,
    }
}

#[cfg(unix)]
fn permissions(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permissions(metadata: &Metadata) -> u32 {
    match (metadata.is_dir(), metadata.permissions().readonly()) {
        (true, false) => 0o755,
        (true, true) => 0o555,
        (false, false) => 0o644,
        (false, true) => 0o444,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive_name(disk: &str, root: &str, in_archive: &str) -> String {
        name_on_disk_to_name_in_archive(Path::new(disk), Path::new(root), in_archive)
    }

    #[cfg(unix)]
    #[test]
    fn archive_names_follow_the_root_rules() {
        assert_eq!(archive_name("/tmp/docs/a.txt", "/tmp/docs", ""), "docs/a.txt");
        assert_eq!(archive_name("/tmp/docs", "/tmp/docs", ""), "docs");
        assert_eq!(archive_name("/tmp/docs/a.txt", "/tmp/docs/", ""), "a.txt");
        assert_eq!(archive_name("/tmp/docs/", "/tmp/docs/", ""), "");
        assert_eq!(archive_name("/tmp/docs/a.txt", "/tmp/docs", "files"), "files/a.txt");
        assert_eq!(archive_name("/tmp/docs/a.txt", "/tmp/docs", "out/"), "out/docs/a.txt");
        assert_eq!(archive_name("/tmp/x.txt", "/tmp/x.txt", ""), "x.txt");
        assert_eq!(archive_name("/tmp/x.txt", "/tmp/x.txt", "y/z.txt"), "y/z.txt");
    }

    #[test]
    fn walks_directories_lazily() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/inner.txt"), b"inner").unwrap();
        fs::write(dir.path().join("top.txt"), b"top").unwrap();

        let mut map = BTreeMap::new();
        map.insert(dir.path().to_path_buf(), "root".to_string());

        let mut files = files_from_disk(None, &map).unwrap();
        files.sort_by(|a, b| a.name_in_archive.cmp(&b.name_in_archive));

        let names: Vec<_> = files.iter().map(|f| f.name_in_archive.as_str()).collect();
        assert_eq!(names, vec!["root", "root/sub", "root/sub/inner.txt", "root/top.txt"]);
        assert!(files[0].info.is_dir());
        assert!(!files[0].has_content());

        let inner = &mut files[2];
        assert_eq!(inner.info.size, 5);
        assert_eq!(inner.info.name, "inner.txt");
        let mut body = String::new();
        inner.open().unwrap().read_to_string(&mut body).unwrap();
        assert_eq!(body, "inner");
    }

    #[test]
    fn clearing_attributes_resets_times() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        fs::write(&file, b"x").unwrap();

        let mut map = BTreeMap::new();
        map.insert(file, String::new());
        let options = FromDiskOptions {
            clear_attributes: true,
            ..Default::default()
        };

        let files = files_from_disk(Some(&options), &map).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name_in_archive, "f");
        assert_eq!(files[0].info.modified, SystemTime::UNIX_EPOCH);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_kept_or_followed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("target.txt"), b"pointed at").unwrap();
        std::os::unix::fs::symlink("target.txt", dir.path().join("link")).unwrap();

        let mut map = BTreeMap::new();
        map.insert(dir.path().join("link"), String::new());

        let kept = files_from_disk(None, &map).unwrap();
        assert!(kept[0].info.is_symlink());
        assert_eq!(kept[0].link_target.as_deref(), Some("target.txt"));

        let options = FromDiskOptions {
            follow_symlinks: true,
            ..Default::default()
        };
        let mut followed = files_from_disk(Some(&options), &map).unwrap();
        assert!(followed[0].info.is_file());
        assert_eq!(followed[0].info.size, 10);
        let mut body = String::new();
        followed[0].open().unwrap().read_to_string(&mut body).unwrap();
        assert_eq!(body, "pointed at");
    }

    #[test]
    fn missing_paths_fail() {
        let mut map = BTreeMap::new();
        map.insert(PathBuf::from("/definitely/not/here"), String::new());
        assert!(files_from_disk(None, &map).is_err());
    }
}
