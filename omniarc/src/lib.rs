//! Identify, read and write archive and compression formats through one set of traits.
//!
//! A [`Registry`] holds [`Format`] descriptors. [`Registry::identify`] picks the format of a
//! stream by file name and content, stacking a compression layer under an archive layer
//! when both match (`.tar.gz`), and hands the stream back unconsumed. The [`fs`] module
//! browses archives, directories and plain files through one read-only interface.

pub mod archive;
mod composite;
pub mod compression;
mod context;
pub mod disk;
mod entry;
mod error;
mod format;
pub mod fs;
mod identify;
pub mod path;
mod registry;
mod rewind;
mod source;

pub use composite::CompressedArchive;
pub use context::Context;
pub use disk::{files_from_disk, FromDiskOptions};
pub use entry::{file_is_included, FileEntry, FileInfo, FileKind, SkipList};
pub use error::{Error, Result};
pub use format::{
    name_matches, read_at_most, Archival, ArchiverAsync, CompressWriter, Compression,
    FileHandler, Format, Inserter, MatchResult, Walk,
};
pub use identify::identify;
pub use registry::Registry;
pub use rewind::RewindReader;
pub use source::{ReadSeek, ReadWriteSeek, Section, Source};
