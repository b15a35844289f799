//! Archive formats.
//!
//! | Type | Name | archive | extract | insert |
//! |------|------|---------|---------|--------|
//! | [`Tar`] | `.tar` | yes (also from a channel) | streaming | yes |
//! | [`Zip`] | `.zip` | yes (also from a channel) | seekable sources | yes |
//! | [`SevenZip`] | `.7z` | no | seekable sources | no |
//! | [`Rar`] | `.rar` | no | no (identified only) | no |

#[cfg(feature = "sevenz")]
use std::io::{self, Seek, SeekFrom};

use crate::entry::SkipList;
#[cfg(any(feature = "zip", feature = "sevenz"))]
use crate::error::{Error, Result};
use crate::format::Walk;
use crate::path;
#[cfg(any(feature = "zip", feature = "sevenz"))]
use crate::source::{ReadSeek, Source};

mod rar;
#[cfg(feature = "sevenz")]
mod sevenzip;
mod tar;
#[cfg(feature = "zip")]
mod zip;

pub use self::rar::Rar;
#[cfg(feature = "sevenz")]
pub use self::sevenzip::SevenZip;
pub use self::tar::Tar;
#[cfg(feature = "zip")]
pub use self::zip::Zip;

/// Unwraps a seekable source, or fails before any extraction starts.
#[cfg(any(feature = "zip", feature = "sevenz"))]
fn require_seekable<'a>(source: Source<'a>, format: &str) -> Result<Box<dyn ReadSeek + 'a>> {
    match source {
        Source::Seekable(s) => Ok(s),
        Source::Reader(_) => Err(Error::NotSeekable {
            format: format.to_string(),
        }),
    }
}

/// Length of the stream, leaving the position untouched.
#[cfg(feature = "sevenz")]
fn stream_len(stream: &mut dyn ReadSeek) -> io::Result<u64> {
    let current = stream.stream_position()?;
    let end = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(current))?;
    Ok(end)
}

/// Records a [`Walk::SkipDir`] answer: a directory skips itself, a file its parent.
///
/// Returns `false` when the whole remaining walk is skipped.
fn skip_dir(skip: &mut SkipList, name: &str, is_dir: bool) -> bool {
    let dir = if is_dir {
        name.trim_end_matches('/')
    } else {
        path::dir(name)
    };

    if dir == "." || dir.is_empty() {
        return false;
    }
    skip.add(dir);
    true
}

/// Applies a handler's answer. `Ok(false)` ends the walk.
fn follow(walk: Walk, skip: &mut SkipList, name: &str, is_dir: bool) -> bool {
    match walk {
        Walk::Continue => true,
        Walk::SkipDir => skip_dir(skip, name, is_dir),
        Walk::Stop => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipping_from_a_file_skips_its_parent() {
        let mut skip = SkipList::new();
        assert!(follow(Walk::SkipDir, &mut skip, "a/b/c.txt", false));
        assert!(skip.contains("a/b/d.txt"));
        assert!(!skip.contains("a/e.txt"));

        assert!(follow(Walk::SkipDir, &mut skip, "x/", true));
        assert!(skip.contains("x/y"));

        assert!(!follow(Walk::SkipDir, &mut skip, "top.txt", false));
        assert!(!follow(Walk::Stop, &mut skip, "a", true));
    }

    #[cfg(any(feature = "zip", feature = "sevenz"))]
    #[test]
    fn streams_are_rejected_where_seeking_is_needed() {
        use std::io;

        assert!(matches!(
            require_seekable(Source::reader(io::empty()), ".zip"),
            Err(Error::NotSeekable { .. })
        ));
        assert!(require_seekable(Source::seekable(io::Cursor::new(vec![])), ".zip").is_ok());
    }
}
