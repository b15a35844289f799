use std::path::PathBuf;

use miette::Diagnostic;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum Error {
    #[error("Cannot open file `{}`", .path.display())]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot identify `{}`", .path.display())]
    Identify {
        path: PathBuf,
        #[source]
        source: omniarc::Error,
    },

    #[error("`{}` is {format}, which is not an archive", .path.display())]
    #[diagnostic(help("Use `oarc cat` to read a compressed file"))]
    NotAnArchive { path: PathBuf, format: String },

    #[error("Cannot pick a format for `{}`", .path.display())]
    #[diagnostic(help(
        "Give the output a known extension such as .tar.gz or .zip, or pass --format (see `oarc formats`)"
    ))]
    UnknownFormat { path: PathBuf },

    #[error("{format} does not support adding files to an existing archive")]
    #[diagnostic(help("Only uncompressed .tar and .zip archives can be appended to"))]
    CannotAppend { format: String },

    #[error("{format} compresses a single file, but {count} entries were found")]
    #[diagnostic(help("Give one regular file, or name the output as an archive such as .tar{format}"))]
    SingleFileOnly { format: String, count: usize },

    #[error("Cannot open `{}` as a filesystem", .path.display())]
    OpenFileSystem {
        path: PathBuf,
        #[source]
        source: omniarc::Error,
    },

    #[error("Cannot read `{name}`")]
    ReadPath {
        name: String,
        #[source]
        source: omniarc::Error,
    },

    #[error("Cannot extract `{}`", .path.display())]
    Extract {
        path: PathBuf,
        #[source]
        source: omniarc::Error,
    },

    #[error("Cannot collect files to archive")]
    CollectFiles {
        #[source]
        source: omniarc::Error,
    },

    #[error("Cannot create archive `{}`", .path.display())]
    CreateArchive {
        path: PathBuf,
        #[source]
        source: omniarc::Error,
    },

    #[error("Cannot add files to `{}`", .path.display())]
    Append {
        path: PathBuf,
        #[source]
        source: omniarc::Error,
    },

    #[error("Cannot process file `{}`", .path.display())]
    ProcessFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write output")]
    WriteOutput {
        #[source]
        source: std::io::Error,
    },

    #[error("Archive already exists: `{}`", path.display())]
    #[diagnostic(help("Use -f/--force to overwrite"))]
    ArchiveExists { path: PathBuf },

    #[error("No files specified to add to archive")]
    #[diagnostic(help("Specify one or more files or directories to archive"))]
    NoFilesSpecified,
}
