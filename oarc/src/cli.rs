use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "oarc",
    about = "Identify, browse, extract and create archives and compressed files.",
    version
)]
pub struct Cli {
    /// Log what identification and extraction are doing (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(visible_alias = "id", about = "Show the format of files")]
    Identify(IdentifyArgs),

    #[command(visible_aliases = ["l", "ls"], about = "List a directory inside an archive")]
    List(ListArgs),

    #[command(about = "Print files from inside an archive")]
    Cat(CatArgs),

    #[command(visible_alias = "x", about = "Extract files from an archive")]
    Extract(ExtractArgs),

    #[command(visible_alias = "c", about = "Create a new archive or compressed file")]
    Create(CreateArgs),

    #[command(visible_alias = "a", about = "Add files to an existing archive")]
    Append(AppendArgs),

    #[command(about = "List the formats this build supports")]
    Formats,
}

#[derive(Debug, clap::Args)]
pub struct IdentifyArgs {
    /// Files to identify
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, clap::Args)]
pub struct ListArgs {
    /// Archive, compressed file or directory to list
    pub path: PathBuf,

    /// Directory inside the archive to list
    #[arg(default_value = ".")]
    pub dir: String,

    /// List subdirectories too
    #[arg(short, long)]
    pub recursive: bool,

    /// Show permissions, size and modification time
    #[arg(short, long)]
    pub long: bool,
}

#[derive(Debug, clap::Args)]
pub struct CatArgs {
    /// Archive, compressed file or directory to read from
    pub path: PathBuf,

    /// Files inside the archive to print, in order
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<String>,
}

#[derive(Debug, clap::Args)]
pub struct ExtractArgs {
    /// Archive to extract
    pub archive: PathBuf,

    /// Output directory (defaults to current directory)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Keep going when an entry cannot be read
    #[arg(long)]
    pub continue_on_error: bool,

    /// Password for encrypted 7z archives
    #[arg(long)]
    pub password: Option<String>,

    /// Text encoding of non-UTF-8 names in zip archives (e.g. shiftjis, gbk)
    #[arg(long, value_name = "LABEL")]
    pub text_encoding: Option<String>,

    /// Suppress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Only extract these paths (and everything below them)
    #[arg(value_name = "PATH")]
    pub files: Vec<String>,
}

#[derive(Debug, clap::Args)]
#[command(after_help = "\
\x1b[1m\x1b[4mNaming:\x1b[0m
  The format is chosen from the output name, e.g. \x1b[1mout.tar.zst\x1b[0m or \x1b[1mout.zip\x1b[0m.
  A compression format on its own (\x1b[1mnotes.txt.gz\x1b[0m) compresses a single file.

  Each PATH lands in the archive under its base name. Use \x1b[1mPATH=NAME\x1b[0m to place it
  elsewhere, \x1b[1mPATH=NAME/\x1b[0m to place it inside a folder, or end PATH with a separator
  to add only the contents of a directory.

\x1b[1m\x1b[4mExamples:\x1b[0m
  oarc create site.tar.gz public/
  oarc create release.zip target/release/app=bin/app README.md
  oarc create --format .tar.xz backup.bin ~/notes")]
pub struct CreateArgs {
    /// Output path
    pub archive: PathBuf,

    /// Format name to use instead of guessing from the output name (e.g. .tar.gz)
    #[arg(long, value_name = "NAME")]
    pub format: Option<String>,

    /// Archive what symlinks point to instead of the links
    #[arg(short = 'L', long)]
    pub follow_symlinks: bool,

    /// Drop modification times from the archived files
    #[arg(long)]
    pub clear_attributes: bool,

    /// Store already compressed files (jpg, zip, ...) without recompressing them in zip archives
    #[arg(long)]
    pub selective_compression: bool,

    /// Skip files that cannot be read instead of failing
    #[arg(long)]
    pub continue_on_error: bool,

    /// Overwrite an existing output
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Suppress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Files and directories to add
    #[arg(value_name = "PATH[=NAME]")]
    pub paths: Vec<String>,
}

#[derive(Debug, clap::Args)]
pub struct AppendArgs {
    /// Archive to add to
    pub archive: PathBuf,

    /// Archive what symlinks point to instead of the links
    #[arg(short = 'L', long)]
    pub follow_symlinks: bool,

    /// Drop modification times from the added files
    #[arg(long)]
    pub clear_attributes: bool,

    /// Files and directories to add
    #[arg(required = true, value_name = "PATH[=NAME]")]
    pub paths: Vec<String>,
}
