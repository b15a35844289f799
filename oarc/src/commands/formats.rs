use crate::error::Result;
use crate::util::{registry, FormatOptions};

pub fn run() -> Result<()> {
    let registry = registry(&FormatOptions::default());

    println!("{:8}  {:8}  {:7}  {:6}  {:5}", "Name", "Compress", "Archive", "Append", "Async");
    println!("{}", "-".repeat(44));

    for format in registry.all() {
        let yes_no = |b: bool| if b { "yes" } else { "-" };
        println!(
            "{:8}  {:8}  {:7}  {:6}  {:5}",
            format.name(),
            yes_no(format.as_compression().is_some()),
            yes_no(format.as_archival().is_some()),
            yes_no(format.as_inserter().is_some()),
            yes_no(format.as_async_archiver().is_some()),
        );
    }

    Ok(())
}
