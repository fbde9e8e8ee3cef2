//! The persistent record store.
//!
//! One regular file: a record stream from offset 0, optionally followed by
//! a footer (see `footer.rs`). An append-only log with no separate index
//! file and no WAL; the record stream itself is the durability boundary;
//! durability beyond best-effort `sync` is out of scope.

use super::cache::VectorCache;
use super::{compaction, footer, record};
use crate::error::{Error, Result};
use crate::vector::DELETED;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

struct Inner {
    file: File,
    /// Live id → absolute byte offset of its most recent record.
    offsets: FxHashMap<u64, u64>,
    /// Next append position; also the boundary between the data region and
    /// any stale footer bytes left over from a prior `sync`.
    end_offset: u64,
}

/// A single-file append-only record store.
///
/// Owns one reader-writer lock per the concurrency model: `read` takes it
/// shared only on a cache miss (the cache's own locking governs hits); every
/// mutating operation takes it exclusive.
pub struct Store {
    path: PathBuf,
    dimension: usize,
    inner: RwLock<Inner>,
    cache: VectorCache,
}

impl Store {
    /// Opens `path`, creating it if absent, and rebuilds the offset index
    /// either from a trailing footer or by a full scan of the data region.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on filesystem failure or [`Error::StoreCorruption`]
    /// if a record's on-disk id doesn't match its indexed offset during scan
    /// recovery.
    pub fn open(path: impl AsRef<Path>, dimension: usize, cache_capacity: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let file_len = file.metadata()?.len();
        let stride = record::stride(dimension) as u64;

        let (offsets, end_offset) = match footer::try_read(&mut file, file_len)? {
            Some(f) if f.dimension as usize == dimension => {
                debug!(path = %path.display(), entries = f.offsets.len(), "opened store from footer");
                (f.offsets, f.data_region_end)
            }
            Some(_) => {
                warn!(path = %path.display(), "footer dimension mismatch, falling back to full scan");
                Self::scan(&mut file, file_len, stride, dimension)?
            }
            None => Self::scan(&mut file, file_len, stride, dimension)?,
        };

        info!(path = %path.display(), live = offsets.len(), "store opened");

        Ok(Self {
            path,
            dimension,
            inner: RwLock::new(Inner {
                file,
                offsets,
                end_offset,
            }),
            cache: VectorCache::new(cache_capacity),
        })
    }

    fn scan(
        file: &mut File,
        file_len: u64,
        stride: u64,
        dimension: usize,
    ) -> Result<(FxHashMap<u64, u64>, u64)> {
        let mut offsets = FxHashMap::default();
        let mut offset = 0u64;
        let mut buf = vec![0u8; stride as usize];

        file.seek(SeekFrom::Start(0))?;
        while offset + stride <= file_len {
            if file.read_exact(&mut buf).is_err() {
                // Truncated tail record: tolerated silently.
                break;
            }
            let (id, _) = record::decode(&buf, dimension);
            if !record::is_tombstone(id) {
                offsets.insert(id, offset);
            } else {
                offsets.remove(&id);
            }
            offset += stride;
        }

        Ok((offsets, offset))
    }

    /// Appends a record for `id`, shadowing any prior record for the same id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `vector.len()` doesn't match
    /// the store's configured dimension, or [`Error::Io`] on write failure.
    pub fn write(&self, id: u64, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let bytes = record::encode(id, vector);
        let mut inner = self.inner.write();

        // Defensively truncate away any footer a prior `sync()` appended
        // past `end_offset`, so the file always reflects exactly the data
        // region after a write.
        inner.file.set_len(inner.end_offset)?;
        inner.file.seek(SeekFrom::Start(inner.end_offset))?;
        inner.file.write_all(&bytes)?;

        let offset = inner.end_offset;
        inner.end_offset += bytes.len() as u64;
        inner.offsets.insert(id, offset);

        Ok(())
    }

    /// Reads the current vector for `id`. Returns `Ok(None)` if `id` isn't
    /// indexed (deleted or never written).
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreCorruption`] if the record at the indexed
    /// offset carries a different id than expected, or [`Error::Io`] on
    /// read failure.
    pub fn read(&self, id: u64) -> Result<Option<Vec<f32>>> {
        if let Some(v) = self.cache.get(id) {
            return Ok(Some(v));
        }

        let inner = self.inner.read();
        if let Some(v) = self.cache.get(id) {
            return Ok(Some(v));
        }
        let Some(&offset) = inner.offsets.get(&id) else {
            return Ok(None);
        };

        let stride = record::stride(self.dimension);
        let mut buf = vec![0u8; stride];
        {
            // SeekFrom + read_exact requires mutable access to the file
            // handle; the store's lock is shared here, so serialize the
            // actual I/O with a short critical section via clone_file.
            let mut file = inner.file.try_clone()?;
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut buf)?;
        }

        let (on_disk_id, vector) = record::decode(&buf, self.dimension);
        if on_disk_id != id {
            return Err(Error::StoreCorruption(format!(
                "expected id {id} at offset {offset}, found {on_disk_id}"
            )));
        }

        self.cache.insert(id, vector.clone());
        Ok(Some(vector))
    }

    /// Deletes `id` if present. Deleting an unknown id is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreCorruption`] if the on-disk id at the indexed
    /// offset doesn't match, or [`Error::Io`] on I/O failure.
    pub fn delete(&self, id: u64) -> Result<()> {
        self.cache.remove(id);

        let mut inner = self.inner.write();
        let Some(offset) = inner.offsets.remove(&id) else {
            return Ok(());
        };

        let mut id_buf = [0u8; 8];
        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.read_exact(&mut id_buf)?;
        let on_disk_id = u64::from_le_bytes(id_buf);
        if on_disk_id != id {
            return Err(Error::StoreCorruption(format!(
                "expected id {id} at offset {offset}, found {on_disk_id}"
            )));
        }

        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.write_all(&DELETED.to_le_bytes())?;
        Ok(())
    }

    /// Reads every live vector into an id → vector map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreCorruption`] or [`Error::Io`] under the same
    /// conditions as [`Store::read`].
    pub fn read_all(&self) -> Result<FxHashMap<u64, Vec<f32>>> {
        let mut inner = self.inner.write();
        let stride = record::stride(self.dimension);
        let mut out = FxHashMap::default();
        out.reserve(inner.offsets.len());

        let ids: Vec<(u64, u64)> = inner.offsets.iter().map(|(&id, &off)| (id, off)).collect();
        let mut buf = vec![0u8; stride];
        for (id, offset) in ids {
            inner.file.seek(SeekFrom::Start(offset))?;
            inner.file.read_exact(&mut buf)?;
            let (on_disk_id, vector) = record::decode(&buf, self.dimension);
            if on_disk_id != id {
                return Err(Error::StoreCorruption(format!(
                    "expected id {id} at offset {offset}, found {on_disk_id}"
                )));
            }
            out.insert(id, vector);
        }

        Ok(out)
    }

    /// Clears every record and resets the store to empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on failure to truncate the file.
    pub fn clear(&self) -> Result<()> {
        let mut inner = self.inner.write();
        inner.file.set_len(0)?;
        inner.offsets.clear();
        inner.end_offset = 0;
        self.cache.clear();
        Ok(())
    }

    /// Writes a footer reflecting the current offset index and flushes to
    /// durable media, without compacting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreFooterFailed`] on failure.
    pub fn sync(&self) -> Result<()> {
        let mut inner = self.inner.write();
        Self::write_footer(&mut inner, self.dimension).map_err(Error::StoreFooterFailed)?;
        inner.file.sync_all()?;
        Ok(())
    }

    /// Compacts away tombstones and shadowed records, then writes a footer
    /// and closes the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreCompactFailed`] if compaction fails, or
    /// [`Error::StoreFooterFailed`] if the footer write fails after a
    /// successful compaction.
    pub fn close(self) -> Result<()> {
        let mut inner = self.inner.into_inner();

        let compacted = compaction::compact(&mut inner.file, &inner.offsets, self.dimension)
            .map_err(Error::StoreCompactFailed)?;
        inner.offsets = compacted.offsets;
        inner.end_offset = compacted.end_offset;

        Self::write_footer(&mut inner, self.dimension).map_err(Error::StoreFooterFailed)?;
        let _ = inner.file.sync_all();

        info!(path = %self.path.display(), live = inner.offsets.len(), "store closed");
        Ok(())
    }

    fn write_footer(inner: &mut Inner, dimension: usize) -> std::io::Result<()> {
        inner.file.set_len(inner.end_offset)?;
        inner.file.seek(SeekFrom::Start(inner.end_offset))?;
        #[allow(clippy::cast_possible_truncation)]
        footer::write(&mut inner.file, &inner.offsets, dimension as u32)
    }

    /// Number of live ids currently indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().offsets.len()
    }

    /// Snapshot of every currently-indexed (live) id, in arbitrary order.
    #[must_use]
    pub fn ids(&self) -> Vec<u64> {
        self.inner.read().offsets.keys().copied().collect()
    }

    /// The fixed vector dimension this store was opened with.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// True if no ids are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path this store was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
