//! Store compaction: reclaiming space held by tombstones and shadowed
//! offsets.
//!
//! An in-place truncate-and-rewrite rather than a temp-file-plus-rename
//! swap: this store is one file with no sidecar data file to swap onto.
//! Phase ordering is copy live records out, install the new state, persist
//! the auxiliary structure. Quasi-atomic: a crash mid-compact can leave the
//! file part-written, which this design
//! accepts per the non-goal of crash-consistent durability.

use super::record;
use rustc_hash::FxHashMap;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Result of a successful compaction.
pub struct Compacted {
    /// Rebuilt offset index against the rewritten file.
    pub offsets: FxHashMap<u64, u64>,
    /// Byte offset immediately past the last live record (the next write
    /// position).
    pub end_offset: u64,
}

/// Rewrites `file` to contain only the live records named by `offsets`
/// (each `(id, old_offset)`), in ascending offset order, then truncates away
/// anything past the new end.
pub fn compact<F: Read + Write + Seek>(
    file: &mut F,
    offsets: &FxHashMap<u64, u64>,
    dimension: usize,
) -> io::Result<Compacted> {
    let stride = record::stride(dimension);

    // Phase 1: read every live record, in the order it was originally
    // written, into memory.
    let mut ordered: Vec<(u64, u64)> = offsets.iter().map(|(&id, &off)| (id, off)).collect();
    ordered.sort_by_key(|&(_, off)| off);

    let mut live = Vec::with_capacity(ordered.len() * stride);
    let mut buf = vec![0u8; stride];
    for &(id, old_offset) in &ordered {
        file.seek(SeekFrom::Start(old_offset))?;
        file.read_exact(&mut buf)?;
        let (on_disk_id, _) = record::decode(&buf, dimension);
        if on_disk_id != id {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("compaction: expected id {id} at offset {old_offset}, found {on_disk_id}"),
            ));
        }
        live.extend_from_slice(&buf);
    }

    // Phase 2: install the new state: rewrite the file from scratch with
    // only live records, then rebuild the offset map against their new
    // positions.
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&live)?;

    let mut new_offsets = FxHashMap::default();
    new_offsets.reserve(ordered.len());
    #[allow(clippy::cast_possible_truncation)]
    for (i, &(id, _)) in ordered.iter().enumerate() {
        new_offsets.insert(id, (i * stride) as u64);
    }

    let end_offset = live.len() as u64;
    Ok(Compacted {
        offsets: new_offsets,
        end_offset,
    })
}
