use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use omniarc::archive::{Rar, SevenZip, Tar, Zip};
use omniarc::compression::{Brotli, Bz2, Gz, Lz4, Sz, Xz, Zlib, Zstd};
use omniarc::{FileInfo, FileKind, Format, Registry, Source};

use crate::error::{Error, Result};

/// Options that change how archive formats behave, applied when the registry is built.
#[derive(Debug, Default, Clone)]
pub struct FormatOptions {
    pub continue_on_error: bool,
    pub selective_compression: bool,
    pub password: Option<String>,
    pub text_encoding: Option<String>,
}

/// Every format this build knows, configured with `options`.
pub fn registry(options: &FormatOptions) -> Registry {
    let mut registry = Registry::new();
    registry
        .register(Brotli::default())
        .register(Bz2::default())
        .register(Gz::default())
        .register(Lz4)
        .register(Sz)
        .register(Xz::default())
        .register(Zlib::default())
        .register(Zstd::default())
        .register(Tar {
            continue_on_error: options.continue_on_error,
        })
        .register(Zip {
            selective_compression: options.selective_compression,
            continue_on_error: options.continue_on_error,
            text_encoding: options.text_encoding.clone(),
            ..Zip::default()
        })
        .register(SevenZip {
            continue_on_error: options.continue_on_error,
            password: options.password.clone(),
        })
        .register(Rar);
    registry
}

/// Opens `path` and identifies it by name and content.
///
/// The returned source is positioned at the start of the file.
pub fn identify_file(registry: &Registry, path: &Path) -> Result<(Arc<dyn Format>, Source<'static>)> {
    let file = File::open(path).map_err(|source| Error::OpenFile {
        path: path.to_path_buf(),
        source,
    })?;

    registry
        .identify(file_name(path).as_deref(), Source::seekable(BufReader::new(file)))
        .map_err(|source| Error::Identify {
            path: path.to_path_buf(),
            source,
        })
}

/// Picks a format from a name alone, such as `out.tar.gz` or `.zip`.
pub fn format_for_name(registry: &Registry, name: &str) -> Option<Arc<dyn Format>> {
    match registry.identify(Some(name), Source::reader(io::empty())) {
        Ok((format, _)) => Some(format),
        Err(err) => {
            tracing::debug!(name, error = %err, "no format for name");
            None
        }
    }
}

pub fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Splits `PATH[=NAME]` arguments into the map [`omniarc::files_from_disk`] takes.
pub fn disk_paths(args: &[String]) -> BTreeMap<PathBuf, String> {
    args.iter()
        .map(|arg| match arg.split_once('=') {
            Some((disk, name)) => (PathBuf::from(disk), name.to_string()),
            None => (PathBuf::from(arg), String::new()),
        })
        .collect()
}

/// Format file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    use humansize::{format_size, BINARY};
    format_size(bytes, BINARY)
}

pub fn format_time(time: SystemTime) -> String {
    let datetime: chrono::DateTime<chrono::Utc> = time.into();
    datetime.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// `ls -l` style type and permission column, e.g. `drwxr-xr-x`.
pub fn format_mode(info: &FileInfo) -> String {
    let mut s = String::with_capacity(10);
    s.push(match info.kind {
        FileKind::Directory => 'd',
        FileKind::Symlink => 'l',
        FileKind::Regular => '-',
        FileKind::Other => '?',
    });

    for shift in [6, 3, 0] {
        let bits = (info.permissions >> shift) & 0o7;
        s.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        s.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        s.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    s
}
