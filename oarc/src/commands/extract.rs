use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use omniarc::{path, Context, FileEntry, FileKind, Walk};

use crate::cli::ExtractArgs;
use crate::error::{Error, Result};
use crate::util::{identify_file, registry, FormatOptions};

pub fn run(args: ExtractArgs) -> Result<()> {
    let registry = registry(&FormatOptions {
        continue_on_error: args.continue_on_error,
        password: args.password.clone(),
        text_encoding: args.text_encoding.clone(),
        ..FormatOptions::default()
    });

    let (format, source) = identify_file(&registry, &args.archive)?;
    let archival = format.as_archival().ok_or_else(|| Error::NotAnArchive {
        path: args.archive.clone(),
        format: format.name().into_owned(),
    })?;

    let output_path = match args.output {
        Some(output) => output,
        None => std::env::current_dir().map_err(|source| Error::ProcessFile {
            path: PathBuf::from("."),
            source,
        })?,
    };
    fs::create_dir_all(&output_path).map_err(|source| Error::ProcessFile {
        path: output_path.clone(),
        source,
    })?;

    let filter = (!args.files.is_empty()).then_some(args.files.as_slice());
    let mut count = 0usize;

    archival
        .extract(&Context::new(), source, filter, &mut |_, mut file| {
            if write_entry(&output_path, &mut file)? {
                count += 1;
                if !args.quiet {
                    println!("{}", file.name_in_archive);
                }
            }
            Ok(Walk::Continue)
        })
        .map_err(|source| Error::Extract {
            path: args.archive.clone(),
            source,
        })?;

    if !args.quiet {
        println!("Extracted {} entries to {}", count, output_path.display());
    }

    Ok(())
}

/// Writes one entry below `root`. Returns false when the entry was skipped.
fn write_entry(root: &Path, file: &mut FileEntry<'_>) -> io::Result<bool> {
    let name = file.name_in_archive.trim_end_matches('/');
    if !path::is_valid(name) || name == "." {
        tracing::warn!(entry = %file.name_in_archive, "skipping entry with unsafe name");
        return Ok(false);
    }
    if crosses_symlink(root, name)? {
        tracing::warn!(entry = %file.name_in_archive, "skipping entry below a symlink");
        return Ok(false);
    }
    let target = root.join(name);

    match file.info.kind {
        FileKind::Directory => {
            fs::create_dir_all(&target)?;
        }
        FileKind::Regular => {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            io::copy(&mut file.open()?, &mut out)?;
            out.set_modified(file.info.modified)?;
            set_permissions(&target, file.info.permissions)?;
        }
        FileKind::Symlink => {
            let Some(link_target) = file.link_target.as_deref() else {
                tracing::warn!(entry = %name, "skipping symlink without a target");
                return Ok(false);
            };
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            return symlink(link_target, &target, name);
        }
        FileKind::Other => {
            tracing::warn!(entry = %name, "skipping special file");
            return Ok(false);
        }
    }

    Ok(true)
}

/// Whether any existing component of `name` below `root` is a symlink, which would
/// redirect the write outside `root`.
fn crosses_symlink(root: &Path, name: &str) -> io::Result<bool> {
    let mut current = root.to_path_buf();
    for component in name.split('/') {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => return Ok(true),
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err),
        }
    }
    Ok(false)
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn symlink(link_target: &str, path: &Path, _name: &str) -> io::Result<bool> {
    std::os::unix::fs::symlink(link_target, path)?;
    Ok(true)
}

#[cfg(not(unix))]
fn symlink(_link_target: &str, _path: &Path, name: &str) -> io::Result<bool> {
    tracing::warn!(entry = %name, "skipping symlink, not supported on this platform");
    Ok(false)
}
