//! Stream compression formats.
//!
//! Each type is a [`Format`](crate::Format) descriptor with the
//! [`Compression`](crate::Compression) capability. Options are plain public fields; the
//! `Default` impls are what [`Registry::default`](crate::Registry) registers.
//!
//! | Type | Name | Matched by content |
//! |------|------|--------------------|
//! | [`Brotli`] | `.br` | no |
//! | [`Bz2`] | `.bz2` | `BZh` |
//! | [`Gz`] | `.gz` | `1f 8b 08` |
//! | [`Lz4`] | `.lz4` | `04 22 4d 18` |
//! | [`Sz`] | `.sz` | stream identifier chunk |
//! | [`Xz`] | `.xz` | `fd 37 7a 58 5a 00` |
//! | [`Zlib`] | `.zz` | `78` |
//! | [`Zstd`] | `.zst` | `28 b5 2f fd` |

#[cfg(feature = "brotli")]
mod brotli;
#[cfg(feature = "bzip2")]
mod bz2;
mod gz;
#[cfg(feature = "lz4")]
mod lz4;
#[cfg(feature = "snappy")]
mod sz;
#[cfg(feature = "xz")]
mod xz;
mod zlib;
#[cfg(feature = "zstd")]
mod zstd;

#[cfg(feature = "brotli")]
pub use self::brotli::Brotli;
#[cfg(feature = "bzip2")]
pub use self::bz2::Bz2;
pub use self::gz::Gz;
#[cfg(feature = "lz4")]
pub use self::lz4::Lz4;
#[cfg(feature = "snappy")]
pub use self::sz::Sz;
#[cfg(feature = "xz")]
pub use self::xz::Xz;
pub use self::zlib::Zlib;
#[cfg(feature = "zstd")]
pub use self::zstd::Zstd;

#[cfg(test)]
mod tests {
    use std::io::{self, Read, Write};

    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    use crate::{Registry, Source};

    fn payload() -> Vec<u8> {
        let mut rng = StdRng::seed_from_u64(0x0123_4567_89ab_cdef);
        let mut contents = vec![0u8; 1024];
        rng.fill_bytes(&mut contents);
        contents
    }

    fn compress(format: &dyn crate::Format, contents: &[u8]) -> Vec<u8> {
        let codec = format.as_compression().unwrap();
        let mut out = Vec::new();
        let mut writer = codec.open_writer(Box::new(&mut out)).unwrap();
        writer.write_all(contents).unwrap();
        writer.close().unwrap();
        out
    }

    #[test]
    fn every_compression_round_trips_and_identifies() {
        let registry = Registry::default();
        let contents = payload();

        for format in registry.all() {
            if format.as_compression().is_none() {
                continue;
            }
            let name = format.name().into_owned();
            let compressed = compress(format.as_ref(), &contents);

            let mut identified_by = vec![Some(format!("test{}", name))];
            if name != ".br" {
                identified_by.push(None);
            }

            for filename in identified_by {
                let (found, stream) = registry
                    .identify(filename.as_deref(), Source::reader(&compressed[..]))
                    .unwrap_or_else(|e| panic!("{} ({:?}): {}", name, filename, e));
                assert_eq!(found.name(), name, "filename {:?}", filename);

                let codec = found.as_compression().unwrap();
                let mut decompressed = Vec::new();
                codec
                    .open_reader(Box::new(stream))
                    .unwrap()
                    .read_to_end(&mut decompressed)
                    .unwrap();
                assert_eq!(decompressed, contents, "{}", name);
            }
        }
    }

    #[test]
    fn empty_input_round_trips() {
        let registry = Registry::default();
        for format in registry.all() {
            let codec = match format.as_compression() {
                Some(codec) => codec,
                None => continue,
            };
            let compressed = compress(format.as_ref(), b"");
            let mut out = Vec::new();
            codec
                .open_reader(Box::new(io::Cursor::new(compressed)))
                .unwrap()
                .read_to_end(&mut out)
                .unwrap();
            assert!(out.is_empty(), "{}", format.name());
        }
    }
}
