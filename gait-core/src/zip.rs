// gait-core/src/zip.rs
// ============================================================================
// Module: Deterministic ZIP Container
// Description: A minimal ZIP writer/reader producing byte-identical archives
// for identical inputs.
// Purpose: Back runpacks, packs, callpacks, and evidence packs with an
// archive format whose bytes depend only on entry paths and contents, never
// on wall-clock time or filesystem metadata.
// Dependencies: flate2, std
// ============================================================================

//! ## Overview
//! No off-the-shelf ZIP crate in this workspace exposes the determinism
//! knobs `spec.md` §4.3 requires (fixed timestamp, forced entry order,
//! forced external file attributes), so this module implements the ZIP
//! local-file-header / central-directory / end-of-central-directory layout
//! directly, using [`flate2`] only for the DEFLATE payload compression.
//! Every entry is stored with the MS-DOS epoch (1980-01-01T00:00:00Z) as its
//! modification time and Unix mode `0100644` (regular file, rw-r--r--) as its
//! external attributes, regardless of the source file's actual metadata.
//! Entries are written in the order given to [`ZipWriter::add_entry`]; callers
//! are responsible for presenting entries in path-sorted order when
//! determinism across builds from an unordered source is required.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::io::Write;

use flate2::Compression;
use flate2::write::DeflateEncoder;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// MS-DOS date/time encoding of 1980-01-01T00:00:00Z, the fixed timestamp
/// written for every entry so archives never vary with wall-clock time.
const FIXED_DOS_TIME: u16 = 0;
const FIXED_DOS_DATE: u16 = 0b0000_0000_0010_0001;

/// Unix external file attributes for a regular file with mode 0644, shifted
/// into the high 16 bits of the ZIP external attribute field as `appnote.txt`
/// §4.4.15 specifies for archives written by a Unix-aware tool.
const UNIX_FILE_MODE: u32 = 0o100_644;

const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x0403_4b50;
const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0201_4b50;
const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;

const VERSION_MADE_BY: u16 = 0x031E;
const VERSION_NEEDED: u16 = 20;

/// Compression method 8 (DEFLATE) per the ZIP spec.
const METHOD_DEFLATE: u16 = 8;
/// Compression method 0 (store), used for empty entries.
const METHOD_STORE: u16 = 0;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while writing or reading a deterministic ZIP archive.
#[derive(Debug, Error)]
pub enum ZipError {
    /// An underlying IO operation failed.
    #[error("zip io error: {0}")]
    Io(String),

    /// A single entry's compressed payload exceeds the implementation's
    /// `u32` size limits (4 GiB), which `spec.md`'s archives never approach.
    #[error("entry {0} exceeds the 4 GiB size limit for this ZIP implementation")]
    EntryTooLarge(String),

    /// The archive bytes were not a well-formed ZIP container.
    #[error("malformed zip archive: {0}")]
    Malformed(String),

    /// Reading an entry would exceed the caller-supplied byte budget.
    #[error("entry {name} exceeds the maximum allowed size of {limit} bytes")]
    EntryExceedsLimit {
        /// Name of the offending entry.
        name: String,
        /// The byte budget that was exceeded.
        limit: u64,
    },
}

impl From<std::io::Error> for ZipError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// ============================================================================
// SECTION: Writer
// ============================================================================

struct PendingEntry {
    name: String,
    crc32: u32,
    uncompressed_size: u32,
    compressed_size: u32,
    method: u16,
    local_header_offset: u32,
}

/// Builds a deterministic ZIP archive in memory.
///
/// Entries are emitted in the order [`ZipWriter::add_entry`] is called;
/// callers wanting byte-stable output across re-orderings of an unordered
/// source must sort entries by path before adding them.
pub struct ZipWriter {
    buffer: Vec<u8>,
    entries: Vec<PendingEntry>,
}

impl Default for ZipWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ZipWriter {
    /// Creates an empty archive builder.
    #[must_use]
    pub fn new() -> Self {
        Self { buffer: Vec::new(), entries: Vec::new() }
    }

    /// Adds one entry with the given path-style name and raw contents.
    ///
    /// # Errors
    ///
    /// Returns [`ZipError::EntryTooLarge`] if `contents` or its compressed
    /// form would exceed `u32::MAX` bytes.
    pub fn add_entry(&mut self, name: &str, contents: &[u8]) -> Result<(), ZipError> {
        let uncompressed_size =
            u32::try_from(contents.len()).map_err(|_err| ZipError::EntryTooLarge(name.to_string()))?;
        let crc32 = crc32(contents);
        let (method, payload) = if contents.is_empty() {
            (METHOD_STORE, Vec::new())
        } else {
            let compressed = deflate(contents)?;
            if compressed.len() < contents.len() {
                (METHOD_DEFLATE, compressed)
            } else {
                (METHOD_STORE, contents.to_vec())
            }
        };
        let compressed_size =
            u32::try_from(payload.len()).map_err(|_err| ZipError::EntryTooLarge(name.to_string()))?;

        let local_header_offset =
            u32::try_from(self.buffer.len()).map_err(|_err| ZipError::EntryTooLarge(name.to_string()))?;
        write_local_header(&mut self.buffer, name, crc32, compressed_size, uncompressed_size, method);
        self.buffer.extend_from_slice(&payload);

        self.entries.push(PendingEntry {
            name: name.to_string(),
            crc32,
            uncompressed_size,
            compressed_size,
            method,
            local_header_offset,
        });
        Ok(())
    }

    /// Finalizes the archive, writing the central directory and
    /// end-of-central-directory record, and returns the complete bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ZipError::EntryTooLarge`] if the central directory offset
    /// would exceed `u32::MAX`.
    pub fn finish(mut self) -> Result<Vec<u8>, ZipError> {
        let central_directory_offset =
            u32::try_from(self.buffer.len()).map_err(|_err| ZipError::EntryTooLarge("<archive>".to_string()))?;
        for entry in &self.entries {
            write_central_directory_entry(&mut self.buffer, entry);
        }
        let central_directory_size = u32::try_from(self.buffer.len())
            .map_err(|_err| ZipError::EntryTooLarge("<archive>".to_string()))?
            - central_directory_offset;
        write_end_of_central_directory(
            &mut self.buffer,
            u16::try_from(self.entries.len()).unwrap_or(u16::MAX),
            central_directory_size,
            central_directory_offset,
        );
        Ok(self.buffer)
    }
}

fn deflate(contents: &[u8]) -> Result<Vec<u8>, ZipError> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(contents)?;
    Ok(encoder.finish()?)
}

fn write_local_header(
    out: &mut Vec<u8>,
    name: &str,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    method: u16,
) {
    out.extend_from_slice(&LOCAL_FILE_HEADER_SIGNATURE.to_le_bytes());
    out.extend_from_slice(&VERSION_NEEDED.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // general purpose bit flag
    out.extend_from_slice(&method.to_le_bytes());
    out.extend_from_slice(&FIXED_DOS_TIME.to_le_bytes());
    out.extend_from_slice(&FIXED_DOS_DATE.to_le_bytes());
    out.extend_from_slice(&crc32.to_le_bytes());
    out.extend_from_slice(&compressed_size.to_le_bytes());
    out.extend_from_slice(&uncompressed_size.to_le_bytes());
    let name_bytes = name.as_bytes();
    out.extend_from_slice(&(u16::try_from(name_bytes.len()).unwrap_or(u16::MAX)).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // extra field length
    out.extend_from_slice(name_bytes);
}

fn write_central_directory_entry(out: &mut Vec<u8>, entry: &PendingEntry) {
    out.extend_from_slice(&CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
    out.extend_from_slice(&VERSION_MADE_BY.to_le_bytes());
    out.extend_from_slice(&VERSION_NEEDED.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // general purpose bit flag
    out.extend_from_slice(&entry.method.to_le_bytes());
    out.extend_from_slice(&FIXED_DOS_TIME.to_le_bytes());
    out.extend_from_slice(&FIXED_DOS_DATE.to_le_bytes());
    out.extend_from_slice(&entry.crc32.to_le_bytes());
    out.extend_from_slice(&entry.compressed_size.to_le_bytes());
    out.extend_from_slice(&entry.uncompressed_size.to_le_bytes());
    let name_bytes = entry.name.as_bytes();
    out.extend_from_slice(&(u16::try_from(name_bytes.len()).unwrap_or(u16::MAX)).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // extra field length
    out.extend_from_slice(&0u16.to_le_bytes()); // file comment length
    out.extend_from_slice(&0u16.to_le_bytes()); // disk number start
    out.extend_from_slice(&0u16.to_le_bytes()); // internal file attributes
    out.extend_from_slice(&(UNIX_FILE_MODE << 16).to_le_bytes());
    out.extend_from_slice(&entry.local_header_offset.to_le_bytes());
    out.extend_from_slice(name_bytes);
}

fn write_end_of_central_directory(out: &mut Vec<u8>, entry_count: u16, directory_size: u32, directory_offset: u32) {
    out.extend_from_slice(&END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // disk number
    out.extend_from_slice(&0u16.to_le_bytes()); // disk with central directory
    out.extend_from_slice(&entry_count.to_le_bytes());
    out.extend_from_slice(&entry_count.to_le_bytes());
    out.extend_from_slice(&directory_size.to_le_bytes());
    out.extend_from_slice(&directory_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // comment length
}

// ============================================================================
// SECTION: Reader
// ============================================================================

/// One decoded entry from a deterministic ZIP archive.
#[derive(Debug, Clone)]
pub struct ZipEntry {
    /// The entry's path-style name.
    pub name: String,
    /// The entry's decompressed contents.
    pub contents: Vec<u8>,
}

/// Reads every entry from a deterministic ZIP archive produced by
/// [`ZipWriter`], enforcing a per-entry decompressed size budget.
///
/// # Errors
///
/// Returns [`ZipError::Malformed`] if the archive's end-of-central-directory
/// record or any central directory entry cannot be parsed, and
/// [`ZipError::EntryExceedsLimit`] if an entry's declared uncompressed size
/// exceeds `max_entry_bytes`.
pub fn read_entries(archive: &[u8], max_entry_bytes: u64) -> Result<Vec<ZipEntry>, ZipError> {
    let eocd_offset = find_end_of_central_directory(archive)?;
    let entry_count = read_u16(archive, eocd_offset + 10)?;
    let directory_offset = read_u32(archive, eocd_offset + 16)? as usize;

    let mut entries = Vec::with_capacity(entry_count as usize);
    let mut cursor = directory_offset;
    for _ in 0..entry_count {
        let (entry, next_cursor) = read_central_directory_entry(archive, cursor, max_entry_bytes)?;
        entries.push(entry);
        cursor = next_cursor;
    }
    Ok(entries)
}

fn find_end_of_central_directory(archive: &[u8]) -> Result<usize, ZipError> {
    if archive.len() < 22 {
        return Err(ZipError::Malformed("archive shorter than minimum EOCD size".to_string()));
    }
    let search_floor = archive.len().saturating_sub(22 + u16::MAX as usize);
    for offset in (search_floor..=archive.len() - 22).rev() {
        if archive[offset..offset + 4] == END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes() {
            return Ok(offset);
        }
    }
    Err(ZipError::Malformed("end of central directory record not found".to_string()))
}

fn read_central_directory_entry(
    archive: &[u8],
    offset: usize,
    max_entry_bytes: u64,
) -> Result<(ZipEntry, usize), ZipError> {
    if read_u32(archive, offset)? != CENTRAL_DIRECTORY_SIGNATURE {
        return Err(ZipError::Malformed("bad central directory signature".to_string()));
    }
    let method = read_u16(archive, offset + 10)?;
    let compressed_size = read_u32(archive, offset + 20)? as usize;
    let uncompressed_size = read_u32(archive, offset + 24)?;
    let name_len = read_u16(archive, offset + 28)? as usize;
    let extra_len = read_u16(archive, offset + 30)? as usize;
    let comment_len = read_u16(archive, offset + 32)? as usize;
    let local_header_offset = read_u32(archive, offset + 42)? as usize;
    let name_start = offset + 46;
    let name = String::from_utf8(archive.get(name_start..name_start + name_len).ok_or_else(malformed_bounds)?.to_vec())
        .map_err(|err| ZipError::Malformed(err.to_string()))?;

    if u64::from(uncompressed_size) > max_entry_bytes {
        return Err(ZipError::EntryExceedsLimit { name, limit: max_entry_bytes });
    }

    let contents = read_local_entry_payload(archive, local_header_offset, method, compressed_size, &name)?;

    let next_cursor = name_start + name_len + extra_len + comment_len;
    Ok((ZipEntry { name, contents }, next_cursor))
}

fn read_local_entry_payload(
    archive: &[u8],
    local_header_offset: usize,
    method: u16,
    compressed_size: usize,
    name: &str,
) -> Result<Vec<u8>, ZipError> {
    if read_u32(archive, local_header_offset)? != LOCAL_FILE_HEADER_SIGNATURE {
        return Err(ZipError::Malformed("bad local file header signature".to_string()));
    }
    let local_name_len = read_u16(archive, local_header_offset + 26)? as usize;
    let local_extra_len = read_u16(archive, local_header_offset + 28)? as usize;
    let data_start = local_header_offset + 30 + local_name_len + local_extra_len;
    let data = archive.get(data_start..data_start + compressed_size).ok_or_else(malformed_bounds)?;

    match method {
        METHOD_STORE => Ok(data.to_vec()),
        METHOD_DEFLATE => {
            let mut decoder = flate2::read::DeflateDecoder::new(data);
            let mut out = Vec::new();
            decoder.read_to_end(&mut out).map_err(|err| ZipError::Malformed(err.to_string()))?;
            Ok(out)
        }
        other => Err(ZipError::Malformed(format!("entry {name} uses unsupported compression method {other}"))),
    }
}

fn malformed_bounds() -> ZipError {
    ZipError::Malformed("entry header extends past archive bounds".to_string())
}

fn read_u16(archive: &[u8], offset: usize) -> Result<u16, ZipError> {
    let bytes: [u8; 2] = archive.get(offset..offset + 2).ok_or_else(malformed_bounds)?.try_into().map_err(|_err| malformed_bounds())?;
    Ok(u16::from_le_bytes(bytes))
}

fn read_u32(archive: &[u8], offset: usize) -> Result<u32, ZipError> {
    let bytes: [u8; 4] = archive.get(offset..offset + 4).ok_or_else(malformed_bounds)?.try_into().map_err(|_err| malformed_bounds())?;
    Ok(u32::from_le_bytes(bytes))
}

// ============================================================================
// SECTION: CRC-32
// ============================================================================

/// Computes the CRC-32 (ISO 3309 / ZIP) checksum of `data`.
fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            let mask = 0u32.wrapping_sub(crc & 1);
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::ZipWriter;
    use super::crc32;
    use super::read_entries;

    #[test]
    fn identical_inputs_produce_identical_bytes() {
        let build = || {
            let mut writer = ZipWriter::new();
            writer.add_entry("manifest.json", b"{\"a\":1}").unwrap();
            writer.add_entry("trace.json", b"{\"b\":2}").unwrap();
            writer.finish().unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn roundtrips_entries() {
        let mut writer = ZipWriter::new();
        writer.add_entry("a.txt", b"hello world").unwrap();
        writer.add_entry("empty.txt", b"").unwrap();
        let archive = writer.finish().unwrap();
        let entries = read_entries(&archive, 1024).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.txt");
        assert_eq!(entries[0].contents, b"hello world");
        assert_eq!(entries[1].name, "empty.txt");
        assert!(entries[1].contents.is_empty());
    }

    #[test]
    fn oversized_entry_is_rejected_on_read() {
        let mut writer = ZipWriter::new();
        writer.add_entry("big.bin", &vec![7u8; 4096]).unwrap();
        let archive = writer.finish().unwrap();
        assert!(read_entries(&archive, 128).is_err());
    }

    #[test]
    fn crc32_of_known_input_matches_reference_value() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }
}
