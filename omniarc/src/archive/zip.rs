use std::borrow::Cow;
use std::io::{self, Cursor, Read, Seek, Write};
use std::time::{Duration, SystemTime};

use ::zip::result::ZipError;
use ::zip::write::SimpleFileOptions;
use ::zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};
use chrono::{Datelike, NaiveDate, Timelike, Utc};
use encoding_rs::Encoding;

use super::{follow, require_seekable};
use crate::context::Context;
use crate::entry::{file_is_included, FileEntry, FileInfo, FileKind, SkipList};
use crate::error::{Error, Result};
use crate::format::{
    header_matches, name_matches, Archival, ArchiverAsync, FileHandler, Format, Inserter,
    MatchResult,
};
use crate::path;
use crate::source::{ReadWriteSeek, Source};

const HEADER: &[u8] = b"PK\x03\x04";

/// Extensions of formats that are normally compressed already.
const COMPRESSED_EXTENSIONS: &[&str] = &[
    "7z", "avi", "br", "bz2", "cab", "docx", "gif", "gz", "jar", "jpeg", "jpg", "lz", "lz4",
    "lzma", "m4v", "mov", "mp3", "mp4", "mpeg", "mpg", "png", "pptx", "rar", "sz", "tbz2",
    "tgz", "tsz", "txz", "xlsx", "xz", "zip", "zipx",
];

/// PKZIP archives.
///
/// Extraction needs a seekable source, since the central directory lives at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zip {
    /// Store files that are already compressed (by extension) instead of recompressing them.
    pub selective_compression: bool,
    /// Method for regular files.
    pub method: CompressionMethod,
    pub continue_on_error: bool,
    /// Charset of names that are not UTF-8, such as `shiftjis` or `windows1252`.
    pub text_encoding: Option<String>,
}

impl Default for Zip {
    fn default() -> Self {
        Zip {
            selective_compression: false,
            method: CompressionMethod::Deflated,
            continue_on_error: false,
            text_encoding: None,
        }
    }
}

/// Per-entry details of a zip archive, attached as the entry's header.
#[derive(Debug, Clone)]
pub struct ZipHeader {
    pub method: CompressionMethod,
    pub compressed_size: u64,
    pub crc32: u32,
    pub comment: String,
}

fn zip_error(err: ZipError) -> Error {
    match err {
        ZipError::Io(err) => Error::Io(err),
        other => Error::Io(io::Error::new(io::ErrorKind::InvalidData, other)),
    }
}

fn encoding(label: &str) -> Option<&'static Encoding> {
    let known = match label {
        "ibm866" => encoding_rs::IBM866,
        "iso8859_2" => encoding_rs::ISO_8859_2,
        "iso8859_3" => encoding_rs::ISO_8859_3,
        "iso8859_4" => encoding_rs::ISO_8859_4,
        "iso8859_5" => encoding_rs::ISO_8859_5,
        "iso8859_6" => encoding_rs::ISO_8859_6,
        "iso8859_7" => encoding_rs::ISO_8859_7,
        "iso8859_8" => encoding_rs::ISO_8859_8,
        "iso8859_8I" => encoding_rs::ISO_8859_8_I,
        "iso8859_10" => encoding_rs::ISO_8859_10,
        "iso8859_13" => encoding_rs::ISO_8859_13,
        "iso8859_14" => encoding_rs::ISO_8859_14,
        "iso8859_15" => encoding_rs::ISO_8859_15,
        "iso8859_16" => encoding_rs::ISO_8859_16,
        "koi8r" => encoding_rs::KOI8_R,
        "koi8u" => encoding_rs::KOI8_U,
        "macintosh" => encoding_rs::MACINTOSH,
        "macintoshcyrillic" => encoding_rs::X_MAC_CYRILLIC,
        "windows874" => encoding_rs::WINDOWS_874,
        "windows1250" => encoding_rs::WINDOWS_1250,
        "windows1251" => encoding_rs::WINDOWS_1251,
        "windows1252" => encoding_rs::WINDOWS_1252,
        "windows1253" => encoding_rs::WINDOWS_1253,
        "windows1254" => encoding_rs::WINDOWS_1254,
        "windows1255" => encoding_rs::WINDOWS_1255,
        "windows1256" => encoding_rs::WINDOWS_1256,
        "windows1257" => encoding_rs::WINDOWS_1257,
        "windows1258" => encoding_rs::WINDOWS_1258,
        "gbk" => encoding_rs::GBK,
        "gb18030" => encoding_rs::GB18030,
        "big5" => encoding_rs::BIG5,
        "eucjp" => encoding_rs::EUC_JP,
        "iso2022jp" => encoding_rs::ISO_2022_JP,
        "shiftjis" => encoding_rs::SHIFT_JIS,
        "euckr" => encoding_rs::EUC_KR,
        "utf16be" => encoding_rs::UTF_16BE,
        "utf16le" => encoding_rs::UTF_16LE,
        other => return Encoding::for_label(other.as_bytes()),
    };
    Some(known)
}

/// Decodes a raw entry name. Names that are valid UTF-8 are taken as they are.
fn decode_name(raw: &[u8], charset: Option<&str>) -> Option<String> {
    if std::str::from_utf8(raw).is_ok() {
        return None;
    }
    let enc = encoding(charset?)?;
    let (name, _) = enc.decode_without_bom_handling(raw);
    Some(name.into_owned())
}

fn unix_time(dt: DateTime) -> SystemTime {
    let secs = NaiveDate::from_ymd_opt(dt.year().into(), dt.month().into(), dt.day().into())
        .and_then(|d| d.and_hms_opt(dt.hour().into(), dt.minute().into(), dt.second().into()))
        .map(|t| t.and_utc().timestamp())
        .unwrap_or(0);

    SystemTime::UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

fn zip_time(time: SystemTime) -> DateTime {
    let t = chrono::DateTime::<Utc>::from(time);
    u16::try_from(t.year())
        .ok()
        .and_then(|year| {
            DateTime::from_date_and_time(
                year,
                t.month() as u8,
                t.day() as u8,
                t.hour() as u8,
                t.minute() as u8,
                t.second() as u8,
            )
            .ok()
        })
        .unwrap_or_default()
}

impl Zip {
    fn method_for(&self, name: &str) -> CompressionMethod {
        if !self.selective_compression {
            return self.method;
        }

        let ext = path::base(name)
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase());
        match ext {
            Some(ext) if COMPRESSED_EXTENSIONS.contains(&ext.as_str()) => CompressionMethod::Stored,
            _ => self.method,
        }
    }

    fn write_file<W: Write + Seek>(
        &self,
        ctx: &Context,
        zw: &mut ZipWriter<W>,
        mut file: FileEntry<'_>,
    ) -> Result<()> {
        ctx.check()?;

        let options = SimpleFileOptions::default()
            .unix_permissions(file.info.permissions & 0o7777)
            .last_modified_time(zip_time(file.info.modified));
        let name = file.name_in_archive.clone();

        match file.info.kind {
            FileKind::Directory => zw
                .add_directory(name, options.compression_method(CompressionMethod::Stored))
                .map_err(zip_error)?,
            FileKind::Symlink => {
                let target = file.link_target.clone().unwrap_or_default();
                zw.add_symlink(name, target, options).map_err(zip_error)?
            }
            FileKind::Regular => {
                let options = options
                    .compression_method(self.method_for(&name))
                    .large_file(file.info.size >= u64::from(u32::MAX));
                zw.start_file(name, options).map_err(zip_error)?;
                io::copy(&mut file.open()?, zw)?;
            }
            FileKind::Other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{}: unsupported file type", name),
                )
                .into())
            }
        }

        Ok(())
    }

    fn write_files<'f, W: Write + Seek>(
        &self,
        ctx: &Context,
        zw: &mut ZipWriter<W>,
        files: impl IntoIterator<Item = FileEntry<'f>>,
    ) -> Result<()> {
        for (index, file) in files.into_iter().enumerate() {
            let name = file.name_in_archive.clone();
            if let Err(err) = self.write_file(ctx, zw, file) {
                let err = Error::entry(index, name, err);
                if self.continue_on_error && !err.is_cancelled() {
                    tracing::warn!(format = ".zip", error = %err, "skipping entry");
                    continue;
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// The writer needs to seek back over local headers, so the archive is assembled in
    /// memory and copied to `output` once complete.
    fn write_buffered<'f>(
        &self,
        ctx: &Context,
        output: &mut dyn Write,
        files: impl IntoIterator<Item = FileEntry<'f>>,
    ) -> Result<()> {
        let mut zw = ZipWriter::new(Cursor::new(Vec::new()));
        self.write_files(ctx, &mut zw, files)?;
        let buffer = zw.finish().map_err(zip_error)?;
        output.write_all(buffer.get_ref())?;
        Ok(())
    }
}

impl Format for Zip {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(".zip")
    }

    fn matches(&self, filename: Option<&str>, stream: &mut dyn Read) -> io::Result<MatchResult> {
        Ok(MatchResult {
            by_name: name_matches(filename, ".zip"),
            by_stream: header_matches(stream, HEADER)?,
        })
    }

    fn as_archival(&self) -> Option<&dyn Archival> {
        Some(self)
    }

    fn as_inserter(&self) -> Option<&dyn Inserter> {
        Some(self)
    }

    fn as_async_archiver(&self) -> Option<&dyn ArchiverAsync> {
        Some(self)
    }
}

impl Archival for Zip {
    fn archive(&self, ctx: &Context, output: &mut dyn Write, files: Vec<FileEntry<'_>>) -> Result<()> {
        self.write_buffered(ctx, output, files)
    }

    fn extract(
        &self,
        ctx: &Context,
        source: Source<'_>,
        paths: Option<&[String]>,
        handler: &mut FileHandler<'_>,
    ) -> Result<()> {
        let source = require_seekable(source, ".zip")?;
        let mut archive = ZipArchive::new(source).map_err(zip_error)?;
        let mut skip = SkipList::new();

        for index in 0..archive.len() {
            ctx.check()?;

            let mut file = match archive.by_index(index) {
                Ok(file) => file,
                Err(err) if self.continue_on_error => {
                    tracing::warn!(format = ".zip", index, error = %err, "skipping unreadable entry");
                    continue;
                }
                Err(err) => return Err(Error::entry(index, "", zip_error(err))),
            };

            let name = decode_name(file.name_raw(), self.text_encoding.as_deref())
                .unwrap_or_else(|| file.name().to_string());
            if !file_is_included(paths, &name) || skip.contains(&name) {
                continue;
            }

            let is_symlink = file
                .unix_mode()
                .map_or(false, |mode| mode & 0o170000 == 0o120000);
            let kind = if file.is_dir() {
                FileKind::Directory
            } else if is_symlink {
                FileKind::Symlink
            } else {
                FileKind::Regular
            };
            let is_dir = kind == FileKind::Directory;

            let info = FileInfo {
                name: path::base(name.trim_end_matches('/')).to_string(),
                size: file.size(),
                permissions: file
                    .unix_mode()
                    .map(|m| m & 0o7777)
                    .unwrap_or(if is_dir { 0o755 } else { 0o644 }),
                modified: file
                    .last_modified()
                    .map(unix_time)
                    .unwrap_or(SystemTime::UNIX_EPOCH),
                kind,
            };
            let header = ZipHeader {
                method: file.compression(),
                compressed_size: file.compressed_size(),
                crc32: file.crc32(),
                comment: file.comment().to_string(),
            };

            let mut entry = FileEntry::new(info, name.clone()).with_header(header);
            match kind {
                FileKind::Symlink => {
                    let mut target = String::new();
                    file.read_to_string(&mut target)?;
                    entry = entry.with_link_target(target);
                }
                FileKind::Regular => {
                    entry = entry.with_opener(move || Ok(Box::new(file) as Box<dyn Read + '_>));
                }
                _ => {}
            }

            match handler(ctx, entry) {
                Ok(walk) => {
                    if !follow(walk, &mut skip, &name, is_dir) {
                        break;
                    }
                }
                Err(err) if self.continue_on_error && !err.is_cancelled() => {
                    tracing::warn!(format = ".zip", entry = %name, error = %err, "handler failed");
                }
                Err(err) => return Err(Error::entry(index, name, err)),
            }
        }

        Ok(())
    }
}

impl ArchiverAsync for Zip {
    fn archive_async(
        &self,
        ctx: &Context,
        output: &mut dyn Write,
        files: flume::Receiver<FileEntry<'static>>,
    ) -> Result<()> {
        self.write_buffered(ctx, output, files.iter())
    }
}

impl Inserter for Zip {
    /// Rewrites the central directory after the new entries; existing entries stay in place.
    fn insert(&self, ctx: &Context, archive: &mut dyn ReadWriteSeek, files: Vec<FileEntry<'_>>) -> Result<()> {
        let mut zw = ZipWriter::new_append(&mut *archive).map_err(zip_error)?;
        self.write_files(ctx, &mut zw, files)?;
        zw.finish().map_err(zip_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::format::Walk;

    fn regular(name: &str, contents: &'static [u8]) -> FileEntry<'static> {
        let info = FileInfo {
            name: path::base(name).to_string(),
            size: contents.len() as u64,
            permissions: 0o600,
            modified: SystemTime::UNIX_EPOCH + Duration::from_secs(1_500_000_000),
            kind: FileKind::Regular,
        };
        FileEntry::new(info, name).with_opener(move || Ok(Box::new(contents) as Box<dyn Read>))
    }

    fn read_all(format: &Zip, bytes: Vec<u8>) -> Vec<(String, FileInfo, String, ZipHeader)> {
        let mut seen = Vec::new();
        format
            .extract(
                &Context::new(),
                Source::seekable(Cursor::new(bytes)),
                None,
                &mut |_, mut f| {
                    let mut body = String::new();
                    f.open()?.read_to_string(&mut body)?;
                    let header = f
                        .header
                        .as_ref()
                        .and_then(|h| h.downcast_ref::<ZipHeader>())
                        .cloned()
                        .unwrap();
                    seen.push((f.name_in_archive.clone(), f.info.clone(), body, header));
                    Ok(Walk::Continue)
                },
            )
            .unwrap();
        seen
    }

    #[test]
    fn round_trip() {
        let zip = Zip::default();
        let mut out = Vec::new();
        zip.archive(
            &Context::new(),
            &mut out,
            vec![
                FileEntry::new(FileInfo::implicit_dir("dir"), "dir"),
                regular("dir/hello.txt", b"hello, zip"),
            ],
        )
        .unwrap();
        assert_eq!(&out[..4], HEADER);

        let entries = read_all(&zip, out);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "dir/");
        assert!(entries[0].1.is_dir());
        assert_eq!(entries[0].1.name, "dir");

        let (name, info, body, header) = &entries[1];
        assert_eq!(name, "dir/hello.txt");
        assert_eq!(body, "hello, zip");
        assert_eq!(info.size, 10);
        assert_eq!(info.permissions, 0o600);
        assert_eq!(
            info.modified,
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_500_000_000)
        );
        assert_eq!(header.method, CompressionMethod::Deflated);
    }

    #[test]
    fn streams_are_rejected() {
        let err = Zip::default()
            .extract(&Context::new(), Source::reader(&b"PK\x03\x04"[..]), None, &mut |_, _| {
                Ok(Walk::Continue)
            })
            .unwrap_err();
        assert!(matches!(err, Error::NotSeekable { .. }));
    }

    #[test]
    fn selective_compression_stores_compressed_formats() {
        let zip = Zip {
            selective_compression: true,
            ..Zip::default()
        };
        let mut out = Vec::new();
        zip.archive(
            &Context::new(),
            &mut out,
            vec![regular("photo.JPG", b"jpeg bytes"), regular("notes.txt", b"text")],
        )
        .unwrap();

        let entries = read_all(&zip, out);
        assert_eq!(entries[0].3.method, CompressionMethod::Stored);
        assert_eq!(entries[1].3.method, CompressionMethod::Deflated);
    }

    #[test]
    fn insert_keeps_existing_entries() {
        let zip = Zip::default();
        let mut out = Vec::new();
        zip.archive(&Context::new(), &mut out, vec![regular("first", b"1")])
            .unwrap();

        let mut archive = Cursor::new(out);
        zip.insert(&Context::new(), &mut archive, vec![regular("second", b"2")])
            .unwrap();

        let names: Vec<_> = read_all(&zip, archive.into_inner())
            .into_iter()
            .map(|(name, _, body, _)| (name, body))
            .collect();
        assert_eq!(
            names,
            vec![
                ("first".to_string(), "1".to_string()),
                ("second".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn handler_errors_can_be_skipped() {
        let mut out = Vec::new();
        Zip::default()
            .archive(
                &Context::new(),
                &mut out,
                vec![regular("a", b"a"), regular("b", b"b")],
            )
            .unwrap();

        let zip = Zip {
            continue_on_error: true,
            ..Zip::default()
        };
        let mut handled = Vec::new();
        zip.extract(
            &Context::new(),
            Source::seekable(Cursor::new(out)),
            None,
            &mut |_, f| {
                handled.push(f.name_in_archive.clone());
                Err(io::Error::new(io::ErrorKind::Other, "refused").into())
            },
        )
        .unwrap();
        assert_eq!(handled, vec!["a", "b"]);
    }

    #[test]
    fn cancelling_mid_extract_stops_before_the_next_entry() {
        let mut out = Vec::new();
        Zip::default()
            .archive(
                &Context::new(),
                &mut out,
                vec![regular("a", b"a"), regular("b", b"b"), regular("c", b"c")],
            )
            .unwrap();

        let zip = Zip {
            continue_on_error: true,
            ..Zip::default()
        };
        let mut handled = Vec::new();
        let err = zip
            .extract(
                &Context::new(),
                Source::seekable(Cursor::new(out)),
                None,
                &mut |ctx, f| {
                    handled.push(f.name_in_archive.clone());
                    ctx.cancel();
                    Ok(Walk::Continue)
                },
            )
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(handled, vec!["a"]);
    }

    #[test]
    fn legacy_names_are_decoded() {
        assert_eq!(
            decode_name(b"\x82\xa0.txt", Some("shiftjis")).as_deref(),
            Some("\u{3042}.txt")
        );
        assert_eq!(
            decode_name(b"caf\xe9", Some("windows1252")).as_deref(),
            Some("caf\u{e9}")
        );
        assert_eq!(decode_name(b"plain.txt", Some("shiftjis")), None);
        assert_eq!(decode_name(b"caf\xe9", None), None);
        assert!(encoding("utf-8").is_some());
        assert!(encoding("klingon").is_none());
    }

    #[test]
    fn matches_local_file_header() {
        let zip = Zip::default();
        assert!(zip.matches(None, &mut &b"PK\x03\x04rest"[..]).unwrap().by_stream);
        assert!(!zip.matches(None, &mut &b"PK\x05\x06"[..]).unwrap().by_stream);
        assert!(zip.matches(Some("A.ZIP"), &mut &b""[..]).unwrap().by_name);
    }
}
