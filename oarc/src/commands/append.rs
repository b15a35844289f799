use std::fs::OpenOptions;

use omniarc::{files_from_disk, Context, FromDiskOptions};

use crate::cli::AppendArgs;
use crate::error::{Error, Result};
use crate::util::{disk_paths, identify_file, registry, FormatOptions};

pub fn run(args: AppendArgs) -> Result<()> {
    let registry = registry(&FormatOptions::default());

    let (format, _) = identify_file(&registry, &args.archive)?;
    let inserter = format.as_inserter().ok_or_else(|| Error::CannotAppend {
        format: format.name().into_owned(),
    })?;

    let options = FromDiskOptions {
        follow_symlinks: args.follow_symlinks,
        clear_attributes: args.clear_attributes,
    };
    let files = files_from_disk(Some(&options), &disk_paths(&args.paths))
        .map_err(|source| Error::CollectFiles { source })?;
    let count = files.len();

    let mut archive = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&args.archive)
        .map_err(|source| Error::OpenFile {
            path: args.archive.clone(),
            source,
        })?;

    inserter
        .insert(&Context::new(), &mut archive, files)
        .map_err(|source| Error::Append {
            path: args.archive.clone(),
            source,
        })?;

    tracing::debug!(archive = %args.archive.display(), count, "appended");
    Ok(())
}
