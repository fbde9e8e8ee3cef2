//! The store's optional trailing footer.
//!
//! Folds the offset table into the tail of the same file a store is written
//! to, so a store is a single regular file end to end rather than a data
//! file plus a separate index sidecar. Framing is hand-rolled rather than
//! going through a generic serializer, to pin the field layout down
//! byte-for-byte.
//!
//! Layout, written in order (so the marker lands on the last four bytes of
//! the file):
//! ```text
//! entries: count × (u64 id, i64 offset)
//! u32 dimension
//! u32 entry_count
//! u32 0xDEADBEEF
//! ```

use rustc_hash::FxHashMap;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Trailing marker that identifies a present footer.
pub const MARKER: u32 = 0xDEAD_BEEF;

/// Fixed byte length of the footer's tail (dimension + count + marker),
/// excluding the variable-length entry table.
const TAIL_LEN: u64 = 12;

/// Byte length of one offset-table entry (`u64` id, `i64` offset).
const ENTRY_LEN: u64 = 16;

/// A footer successfully parsed from the tail of a file.
pub struct Footer {
    /// Dimension recorded in the footer.
    pub dimension: u32,
    /// Offset index: live id → absolute byte offset of its record.
    pub offsets: FxHashMap<u64, u64>,
    /// Byte offset where the data region ends (and the footer begins).
    pub data_region_end: u64,
}

/// Attempts to read a footer from the end of `file`, whose current length is
/// `file_len`. Returns `None` if the trailing marker is absent, malformed, or
/// the recorded entry count doesn't fit within `file_len`: any of which
/// means the caller should fall back to a full scan.
pub fn try_read<F: Read + Seek>(file: &mut F, file_len: u64) -> io::Result<Option<Footer>> {
    if file_len < TAIL_LEN {
        return Ok(None);
    }

    file.seek(SeekFrom::Start(file_len - TAIL_LEN))?;
    let mut tail = [0u8; TAIL_LEN as usize];
    file.read_exact(&mut tail)?;

    let dimension = u32::from_le_bytes(tail[0..4].try_into().expect("4 bytes"));
    let count = u32::from_le_bytes(tail[4..8].try_into().expect("4 bytes"));
    let marker = u32::from_le_bytes(tail[8..12].try_into().expect("4 bytes"));

    if marker != MARKER {
        return Ok(None);
    }

    let entries_len = u64::from(count) * ENTRY_LEN;
    let footer_len = TAIL_LEN + entries_len;
    if footer_len > file_len {
        return Ok(None);
    }

    let entries_start = file_len - footer_len;
    file.seek(SeekFrom::Start(entries_start))?;
    let mut entries_buf = vec![0u8; entries_len as usize];
    file.read_exact(&mut entries_buf)?;

    let mut offsets = FxHashMap::default();
    offsets.reserve(count as usize);
    for chunk in entries_buf.chunks_exact(ENTRY_LEN as usize) {
        let id = u64::from_le_bytes(chunk[0..8].try_into().expect("8 bytes"));
        let offset = i64::from_le_bytes(chunk[8..16].try_into().expect("8 bytes"));
        offsets.insert(id, offset as u64);
    }

    Ok(Some(Footer {
        dimension,
        offsets,
        data_region_end: entries_start,
    }))
}

/// Writes a footer at the file's current position (which callers must have
/// already positioned at the true end of the data region, truncating away
/// any stale footer first).
pub fn write<F: Write>(file: &mut F, offsets: &FxHashMap<u64, u64>, dimension: u32) -> io::Result<()> {
    for (&id, &offset) in offsets {
        file.write_all(&id.to_le_bytes())?;
        file.write_all(&(offset as i64).to_le_bytes())?;
    }
    file.write_all(&dimension.to_le_bytes())?;
    #[allow(clippy::cast_possible_truncation)]
    let count = offsets.len() as u32;
    file.write_all(&count.to_le_bytes())?;
    file.write_all(&MARKER.to_le_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_write_then_read_round_trip() {
        let mut offsets = FxHashMap::default();
        offsets.insert(1u64, 0u64);
        offsets.insert(2u64, 40u64);
        offsets.insert(3u64, 80u64);

        let mut buf = Cursor::new(Vec::new());
        buf.get_mut().extend_from_slice(&[0u8; 120]); // pretend data region
        buf.set_position(120);
        write(&mut buf, &offsets, 8).unwrap();

        let len = buf.get_ref().len() as u64;
        let footer = try_read(&mut buf, len).unwrap().expect("footer present");
        assert_eq!(footer.dimension, 8);
        assert_eq!(footer.data_region_end, 120);
        assert_eq!(footer.offsets, offsets);
    }

    #[test]
    fn test_absent_marker_returns_none() {
        let mut buf = Cursor::new(vec![0u8; 64]);
        let len = buf.get_ref().len() as u64;
        assert!(try_read(&mut buf, len).unwrap().is_none());
    }

    #[test]
    fn test_too_short_file_returns_none() {
        let mut buf = Cursor::new(vec![0u8; 4]);
        assert!(try_read(&mut buf, 4).unwrap().is_none());
    }
}
