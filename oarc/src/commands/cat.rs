use std::io::{self, Write};

use omniarc::fs::{file_system, top_dir_open};
use omniarc::Context;

use crate::cli::CatArgs;
use crate::error::{Error, Result};
use crate::util::{registry, FormatOptions};

pub fn run(args: CatArgs) -> Result<()> {
    let registry = registry(&FormatOptions::default());
    let fs = file_system(&registry, &Context::new(), &args.path).map_err(|source| {
        Error::OpenFileSystem {
            path: args.path.clone(),
            source,
        }
    })?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    for name in &args.files {
        let read_error = |source| Error::ReadPath {
            name: name.clone(),
            source,
        };

        let mut file = top_dir_open(fs.as_ref(), name).map_err(read_error)?;
        if file.stat().map_err(read_error)?.is_dir() {
            return Err(read_error(omniarc::Error::NotAFile {
                op: "cat",
                path: name.clone(),
            }));
        }

        io::copy(&mut file, &mut out).map_err(|source| Error::WriteOutput { source })?;
    }

    out.flush().map_err(|source| Error::WriteOutput { source })
}
