use omniarc::fs::{file_system, walk_dir};
use omniarc::{path, Context, FileInfo, Walk};

use crate::cli::ListArgs;
use crate::error::{Error, Result};
use crate::util::{format_mode, format_size, format_time, registry, FormatOptions};

pub fn run(args: ListArgs) -> Result<()> {
    let registry = registry(&FormatOptions::default());
    let fs = file_system(&registry, &Context::new(), &args.path).map_err(|source| {
        Error::OpenFileSystem {
            path: args.path.clone(),
            source,
        }
    })?;

    let read_error = |source| Error::ReadPath {
        name: args.dir.clone(),
        source,
    };

    if args.recursive {
        walk_dir(fs.as_ref(), &args.dir, &mut |name, info| {
            if name != args.dir {
                print_entry(name, info, args.long);
            }
            Ok(Walk::Continue)
        })
        .map_err(read_error)?;
    } else {
        for info in fs.read_dir(&args.dir).map_err(read_error)? {
            let name = if args.dir == "." {
                info.name.clone()
            } else {
                path::join(&args.dir, &info.name)
            };
            print_entry(&name, &info, args.long);
        }
    }

    Ok(())
}

fn print_entry(name: &str, info: &FileInfo, long: bool) {
    let suffix = if info.is_dir() { "/" } else { "" };

    if long {
        let size = if info.is_file() {
            format_size(info.size)
        } else {
            "-".into()
        };
        println!(
            "{:10}  {:>10}  {:20}  {}{}",
            format_mode(info),
            size,
            format_time(info.modified),
            name,
            suffix
        );
    } else {
        println!("{}{}", name, suffix);
    }
}
