use crate::cli::IdentifyArgs;
use crate::error::{Error, Result};
use crate::util::{identify_file, registry, FormatOptions};

pub fn run(args: IdentifyArgs) -> Result<()> {
    let registry = registry(&FormatOptions::default());

    for path in &args.files {
        match identify_file(&registry, path) {
            Ok((format, _)) => println!("{}: {}", path.display(), format.name()),
            Err(Error::Identify { source, .. }) if source.is_no_match() => {
                println!("{}: unknown", path.display())
            }
            Err(err) => return Err(err),
        }
    }

    Ok(())
}
