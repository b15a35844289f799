//! Directory listings synthesised from the flat entry list of an archive.
//!
//! Archives need not contain entries for every directory, so parents are inferred from
//! the paths of the entries that do exist. Entries are then kept sorted by
//! `(parent, base name)`; both lookups below rely on that order.

use std::collections::BTreeSet;

use crate::entry::FileInfo;
use crate::path;

/// One entry collected from an archive, its name trimmed of slashes.
#[derive(Debug, Clone)]
pub(crate) struct Listing {
    pub name: String,
    pub info: FileInfo,
    /// Buffered content, for the one regular file an open asked for.
    pub content: Option<Vec<u8>>,
}

impl Listing {
    pub fn implicit(dir: &str) -> Self {
        Listing {
            name: dir.to_string(),
            info: FileInfo::implicit_dir(path::base(dir)),
            content: None,
        }
    }
}

fn sort_key(name: &str) -> (&str, &str) {
    let (dir, elem, _) = path::split(name);
    (dir, elem)
}

/// Adds every directory implied by the entries' paths and sorts the result.
pub(crate) fn fill_implicit(mut entries: Vec<Listing>) -> Vec<Listing> {
    let mut dirs = BTreeSet::new();
    let mut known = BTreeSet::new();

    for entry in &entries {
        let mut dir = path::dir(&entry.name);
        while dir != "." && dir != "/" {
            dirs.insert(dir.to_string());
            dir = path::dir(dir);
        }
        if entry.info.is_dir() {
            known.insert(entry.name.clone());
        }
    }

    entries.extend(
        dirs.iter()
            .filter(|dir| !known.contains(*dir))
            .map(|dir| Listing::implicit(dir)),
    );
    entries.sort_by(|a, b| sort_key(&a.name).cmp(&sort_key(&b.name)));
    entries
}

/// Finds `name` in sorted entries.
pub(crate) fn search<'a>(name: &str, entries: &'a [Listing]) -> Option<&'a Listing> {
    let key = sort_key(name);
    let i = entries.partition_point(|e| sort_key(&e.name) < key);

    let candidate = entries.get(i)?;
    let found = &candidate.name;
    let matches = found == name
        || (found.len() == name.len() + 1 && found.starts_with(name) && found.ends_with('/'));
    matches.then_some(candidate)
}

/// Contents of directory `dir` in sorted entries.
pub(crate) fn open_read_dir(dir: &str, entries: &[Listing]) -> Vec<FileInfo> {
    let start = entries.partition_point(|e| sort_key(&e.name).0 < dir);
    let end = entries.partition_point(|e| sort_key(&e.name).0 <= dir);

    entries[start..end].iter().map(|e| e.info.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::SystemTime;

    use crate::entry::FileKind;

    fn file(name: &str) -> Listing {
        Listing {
            name: name.to_string(),
            info: FileInfo {
                name: path::base(name).to_string(),
                size: 1,
                permissions: 0o644,
                modified: SystemTime::UNIX_EPOCH,
                kind: FileKind::Regular,
            },
            content: None,
        }
    }

    fn names(infos: &[FileInfo]) -> Vec<&str> {
        infos.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn parents_are_synthesised() {
        let entries = fill_implicit(vec![file("a/b/c"), file("a/d")]);

        assert_eq!(names(&open_read_dir(".", &entries)), vec!["a"]);
        assert_eq!(names(&open_read_dir("a", &entries)), vec!["b", "d"]);
        assert_eq!(names(&open_read_dir("a/b", &entries)), vec!["c"]);
        assert!(open_read_dir("a/b/c", &entries).is_empty());

        let a = search("a", &entries).unwrap();
        assert!(a.info.is_dir());
        assert!(search("a/b/c", &entries).unwrap().info.is_file());
        assert!(search("a/x", &entries).is_none());
        assert!(search("z", &entries).is_none());
    }

    #[test]
    fn listing_does_not_depend_on_archive_order() {
        let entries = fill_implicit(vec![file("1/2"), file("2/1"), file("1/1")]);
        assert_eq!(names(&open_read_dir("1", &entries)), vec!["1", "2"]);
        assert_eq!(names(&open_read_dir(".", &entries)), vec!["1", "2"]);
    }

    #[test]
    fn explicit_directories_are_not_duplicated() {
        let mut dir = file("a");
        dir.info = FileInfo::implicit_dir("a");
        dir.info.permissions = 0o700;

        let entries = fill_implicit(vec![file("a/x"), dir]);
        assert_eq!(entries.len(), 2);
        assert_eq!(search("a", &entries).unwrap().info.permissions, 0o700);
    }
}
