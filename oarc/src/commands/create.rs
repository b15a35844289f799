use std::fs::File;
use std::io::{self, BufWriter, Write};

use omniarc::{files_from_disk, Compression, Context, FileEntry, FromDiskOptions};

use crate::cli::CreateArgs;
use crate::error::{Error, Result};
use crate::util::{disk_paths, file_name, format_for_name, registry, FormatOptions};

pub fn run(args: CreateArgs) -> Result<()> {
    if args.paths.is_empty() {
        return Err(Error::NoFilesSpecified);
    }
    if args.archive.exists() && !args.force {
        return Err(Error::ArchiveExists {
            path: args.archive.clone(),
        });
    }

    let registry = registry(&FormatOptions {
        continue_on_error: args.continue_on_error,
        selective_compression: args.selective_compression,
        ..FormatOptions::default()
    });

    let name = args
        .format
        .clone()
        .or_else(|| file_name(&args.archive))
        .unwrap_or_default();
    let format = format_for_name(&registry, &name).ok_or_else(|| Error::UnknownFormat {
        path: args.archive.clone(),
    })?;

    let options = FromDiskOptions {
        follow_symlinks: args.follow_symlinks,
        clear_attributes: args.clear_attributes,
    };
    let files = files_from_disk(Some(&options), &disk_paths(&args.paths))
        .map_err(|source| Error::CollectFiles { source })?;
    let count = files.len();

    let create_error = |source| Error::CreateArchive {
        path: args.archive.clone(),
        source,
    };

    let file = File::create(&args.archive).map_err(|source| Error::ProcessFile {
        path: args.archive.clone(),
        source,
    })?;
    let mut out = BufWriter::new(file);

    match (format.as_archival(), format.as_compression()) {
        (Some(archival), _) => archival
            .archive(&Context::new(), &mut out, files)
            .map_err(create_error)?,
        (None, Some(codec)) => compress_single(codec, files, &mut out, &format.name())?,
        (None, None) => {
            return Err(Error::UnknownFormat {
                path: args.archive.clone(),
            })
        }
    }

    out.flush()
        .map_err(|source| create_error(source.into()))?;

    if !args.quiet {
        println!(
            "Created {} ({}, {} entries)",
            args.archive.display(),
            format.name(),
            count
        );
    }

    Ok(())
}

/// Streams the only regular file in `files` through `codec`.
fn compress_single(
    codec: &dyn Compression,
    mut files: Vec<FileEntry<'_>>,
    out: &mut dyn Write,
    format: &str,
) -> Result<()> {
    if files.len() != 1 || !files[0].info.is_file() {
        return Err(Error::SingleFileOnly {
            format: format.to_string(),
            count: files.len(),
        });
    }
    let mut file = files.remove(0);

    let mut writer = codec
        .open_writer(Box::new(out))
        .map_err(|source| Error::WriteOutput { source })?;
    file.open()
        .and_then(|mut content| io::copy(&mut content, &mut writer))
        .map_err(|source| Error::WriteOutput { source })?;
    writer.close().map_err(|source| Error::WriteOutput { source })
}
