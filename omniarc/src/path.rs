//! Helpers for the slash separated paths used inside archives.

/// Whether `name` is usable as a filesystem path: unrooted, no empty, `.` or `..`
/// elements, or `"."` itself for the root.
///
/// On Windows, backslashes and colons are also rejected.
pub fn is_valid(name: &str) -> bool {
    if name == "." {
        return true;
    }
    if cfg!(windows) && name.contains(|c| c == '\\' || c == ':') {
        return false;
    }

    name.split('/')
        .all(|elem| !elem.is_empty() && elem != "." && elem != "..")
}

/// Joins `base` and `name`, dropping empty and `.` elements. Returns `""` if both are empty.
pub fn join(base: &str, name: &str) -> String {
    let joined = base
        .split('/')
        .chain(name.split('/'))
        .filter(|elem| !elem.is_empty() && *elem != ".")
        .collect::<Vec<_>>()
        .join("/");

    if joined.is_empty() && (base == "." || name == ".") {
        ".".to_string()
    } else {
        joined
    }
}

/// Parent of `name`, or `"."` for a top-level name.
pub fn dir(name: &str) -> &str {
    let name = name.trim_end_matches('/');
    match name.rfind('/') {
        Some(0) => "/",
        Some(i) => &name[..i],
        None => ".",
    }
}

/// Last element of `name`.
pub fn base(name: &str) -> &str {
    let name = name.trim_end_matches('/');
    match name.rfind('/') {
        Some(i) => &name[i + 1..],
        None => name,
    }
}

/// Splits `name` into its parent and last element, with a flag for a trailing slash.
pub fn split(name: &str) -> (&str, &str, bool) {
    let (name, is_dir) = match name.strip_suffix('/') {
        Some(trimmed) => (trimmed, true),
        None => (name, false),
    };

    match name.rfind('/') {
        Some(i) => (&name[..i], &name[i + 1..], is_dir),
        None => (".", name, is_dir),
    }
}

/// Drops the first element of a path: `"a/b/c"` becomes `"b/c"`.
pub fn trim_top_dir(dir: &str) -> &str {
    let dir = dir.strip_prefix('/').unwrap_or(dir);
    match dir.find('/') {
        Some(pos) => &dir[pos + 1..],
        None => dir,
    }
}

/// First element of a path: `"a/b/c"` becomes `"a"`.
pub fn top_dir(dir: &str) -> &str {
    let dir = dir.strip_prefix('/').unwrap_or(dir);
    match dir.find('/') {
        Some(pos) => &dir[..pos],
        None => dir,
    }
}

/// Like [`trim_top_dir`], without special treatment of a leading slash.
pub fn without_top_dir(path: &str) -> &str {
    match path.find('/') {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}
