//! Deterministic ZIP archive writer and safe reader (`spec.md` §4.3).
//!
//! Grounded on `internal/shared/zipdet/zipdet.go`: entries are sorted by
//! name, validated (non-empty, not absolute, no backslash, no duplicates),
//! written with `Stored` (no compression) and a fixed 1980-01-01 mtime so
//! the same entry set always produces byte-identical archive bytes. The
//! `zip` crate's `DateTime::default()` is exactly that MS-DOS epoch, and
//! with the `deflate`/`time` features left off (see this crate's
//! `Cargo.toml`) `FileOptions::default()` already resolves to
//! `CompressionMethod::Stored` and that fixed timestamp, so both are
//! pinned structurally rather than by runtime choice.
//!
//! The `zip` crate's `DEFAULT_VERSION` (the `version_made_by`/
//! `version_needed_to_extract` fields it writes) is hardcoded to 46 with no
//! public setter, but `spec.md` §4.3 pins both to the literal `20`. Rather
//! than accept that divergence, [`patch_version_fields`] overwrites those
//! fields in the finished buffer at their fixed header offsets.
//!
//! The teacher's `bundle::writer`/`bundle::reader` pair (tar+gzip, not
//! zip) is the structural model for the writer/reader split and the
//! "reject anything the reader can't trust" posture; the `zip` crate
//! dependency itself is sourced from elsewhere in the pack, since the
//! teacher has no zip usage of its own.

use crate::error::ArchiveError;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

/// Write a deterministic ZIP archive from a sorted set of named entries.
///
/// Entries are written in name order (the caller's `BTreeMap` already
/// guarantees this) using `CompressionMethod::Stored` and a fixed
/// 1980-01-01 00:00:00 mtime, so two calls with the same entries always
/// produce identical bytes.
pub fn write_deterministic_zip(
    entries: &BTreeMap<String, Vec<u8>>,
) -> Result<Vec<u8>, ArchiveError> {
    if entries.is_empty() {
        return Err(ArchiveError::Empty);
    }
    for name in entries.keys() {
        validate_entry_name(name)?;
    }

    let buf = Cursor::new(Vec::new());
    let mut writer = ZipWriter::new(buf);
    let options = FileOptions::default();
    for (name, data) in entries {
        writer.start_file(name, options)?;
        writer.write_all(data)?;
    }
    let cursor = writer.finish()?;
    let mut bytes = cursor.into_inner();
    patch_version_fields(&mut bytes);
    Ok(bytes)
}

const LOCAL_FILE_HEADER_SIG: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];
const CENTRAL_DIR_HEADER_SIG: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];
const REQUIRED_VERSION: u16 = 20;

/// Overwrite `version_needed_to_extract` (local + central) and
/// `version_made_by` (central) with the fixed value `spec.md` §4.3 names,
/// in place of the `zip` crate's own `DEFAULT_VERSION` (46). Walked
/// structurally from each header's own declared field/name/extra/comment
/// lengths, not by scanning for signature bytes inside file data, so a
/// coincidental 4-byte match inside an entry's content can never be
/// mistaken for a header.
fn patch_version_fields(buf: &mut [u8]) {
    let version_bytes = REQUIRED_VERSION.to_le_bytes();

    let mut pos = 0usize;
    while buf.len() >= pos + 30 && buf[pos..pos + 4] == LOCAL_FILE_HEADER_SIG {
        buf[pos + 4..pos + 6].copy_from_slice(&version_bytes);
        let name_len = u16::from_le_bytes([buf[pos + 26], buf[pos + 27]]) as usize;
        let extra_len = u16::from_le_bytes([buf[pos + 28], buf[pos + 29]]) as usize;
        let compressed_size = u32::from_le_bytes([
            buf[pos + 18],
            buf[pos + 19],
            buf[pos + 20],
            buf[pos + 21],
        ]) as usize;
        pos += 30 + name_len + extra_len + compressed_size;
    }

    while buf.len() >= pos + 46 && buf[pos..pos + 4] == CENTRAL_DIR_HEADER_SIG {
        buf[pos + 4..pos + 6].copy_from_slice(&version_bytes);
        buf[pos + 6..pos + 8].copy_from_slice(&version_bytes);
        let name_len = u16::from_le_bytes([buf[pos + 28], buf[pos + 29]]) as usize;
        let extra_len = u16::from_le_bytes([buf[pos + 30], buf[pos + 31]]) as usize;
        let comment_len = u16::from_le_bytes([buf[pos + 32], buf[pos + 33]]) as usize;
        pos += 46 + name_len + extra_len + comment_len;
    }
}

/// Read a deterministic ZIP archive, rejecting any entry name that is
/// empty, absolute, contains a backslash, or attempts to traverse outside
/// the archive root (`../`).
pub fn read_deterministic_zip(bytes: &[u8]) -> Result<BTreeMap<String, Vec<u8>>, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut out = BTreeMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let name = file.name().to_string();
        validate_entry_name(&name)?;
        if file.enclosed_name().is_none() {
            return Err(ArchiveError::PathUnsafe(name));
        }
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        if out.insert(name.clone(), data).is_some() {
            return Err(ArchiveError::DuplicateEntryName(name));
        }
    }
    Ok(out)
}

fn validate_entry_name(name: &str) -> Result<(), ArchiveError> {
    if name.is_empty() || name.starts_with('/') {
        return Err(ArchiveError::InvalidEntryName(name.to_string()));
    }
    if name.contains('\\') {
        return Err(ArchiveError::InvalidEntryName(name.to_string()));
    }
    if name.split('/').any(|segment| segment == "..") {
        return Err(ArchiveError::PathUnsafe(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &[u8])]) -> BTreeMap<String, Vec<u8>> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_vec()))
            .collect()
    }

    #[test]
    fn round_trips() {
        let e = entries(&[("manifest.json", b"{}"), ("snapshot.bin", b"hello")]);
        let zip = write_deterministic_zip(&e).unwrap();
        let back = read_deterministic_zip(&zip).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn is_byte_identical_across_runs() {
        let e = entries(&[("a.txt", b"one"), ("b.txt", b"two")]);
        let first = write_deterministic_zip(&e).unwrap();
        let second = write_deterministic_zip(&e).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_entry_set_is_rejected() {
        let e: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        assert!(matches!(
            write_deterministic_zip(&e).unwrap_err(),
            ArchiveError::Empty
        ));
    }

    #[test]
    fn rejects_absolute_entry_name() {
        let e = entries(&[("/etc/passwd", b"x")]);
        assert!(matches!(
            write_deterministic_zip(&e).unwrap_err(),
            ArchiveError::InvalidEntryName(_)
        ));
    }

    #[test]
    fn rejects_backslash_entry_name() {
        let e = entries(&[("a\\b", b"x")]);
        assert!(matches!(
            write_deterministic_zip(&e).unwrap_err(),
            ArchiveError::InvalidEntryName(_)
        ));
    }

    #[test]
    fn rejects_path_traversal_on_read() {
        // Build a raw zip with a traversal entry directly, bypassing the
        // writer's own validation, to exercise the reader's defense.
        let buf = Cursor::new(Vec::new());
        let mut writer = ZipWriter::new(buf);
        writer
            .start_file("../escape.txt", FileOptions::default())
            .unwrap();
        writer.write_all(b"evil").unwrap();
        let cursor = writer.finish().unwrap();
        let bytes = cursor.into_inner();

        assert!(matches!(
            read_deterministic_zip(&bytes).unwrap_err(),
            ArchiveError::PathUnsafe(_)
        ));
    }

    #[test]
    fn entries_are_stored_uncompressed() {
        let e = entries(&[("a.txt", b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")]);
        let zip = write_deterministic_zip(&e).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(&zip)).unwrap();
        let file = archive.by_index(0).unwrap();
        assert_eq!(file.compression(), zip::CompressionMethod::Stored);
    }

    #[test]
    fn version_fields_are_patched_to_20() {
        let e = entries(&[("manifest.json", b"{}"), ("snapshot.bin", b"hello world")]);
        let zip = write_deterministic_zip(&e).unwrap();

        let mut local_headers_seen = 0;
        let mut pos = 0usize;
        while zip.len() >= pos + 30 && zip[pos..pos + 4] == LOCAL_FILE_HEADER_SIG {
            let version = u16::from_le_bytes([zip[pos + 4], zip[pos + 5]]);
            assert_eq!(version, 20, "local file header version field");
            let name_len = u16::from_le_bytes([zip[pos + 26], zip[pos + 27]]) as usize;
            let extra_len = u16::from_le_bytes([zip[pos + 28], zip[pos + 29]]) as usize;
            let compressed_size =
                u32::from_le_bytes([zip[pos + 18], zip[pos + 19], zip[pos + 20], zip[pos + 21]])
                    as usize;
            pos += 30 + name_len + extra_len + compressed_size;
            local_headers_seen += 1;
        }
        assert_eq!(local_headers_seen, e.len());

        let mut central_headers_seen = 0;
        while zip.len() >= pos + 46 && zip[pos..pos + 4] == CENTRAL_DIR_HEADER_SIG {
            let version_made_by = u16::from_le_bytes([zip[pos + 4], zip[pos + 5]]);
            let version_needed = u16::from_le_bytes([zip[pos + 6], zip[pos + 7]]);
            assert_eq!(version_made_by, 20, "central directory version_made_by");
            assert_eq!(version_needed, 20, "central directory version_needed_to_extract");
            let name_len = u16::from_le_bytes([zip[pos + 28], zip[pos + 29]]) as usize;
            let extra_len = u16::from_le_bytes([zip[pos + 30], zip[pos + 31]]) as usize;
            let comment_len = u16::from_le_bytes([zip[pos + 32], zip[pos + 33]]) as usize;
            pos += 46 + name_len + extra_len + comment_len;
            central_headers_seen += 1;
        }
        assert_eq!(central_headers_seen, e.len());

        // and the patched archive must still be readable
        let back = read_deterministic_zip(&zip).unwrap();
        assert_eq!(back, e);
    }
}
