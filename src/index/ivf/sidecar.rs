//! The IVF cluster-assignment sidecar file (`<data_path>.ivf`).
//!
//! Hand-rolled little-endian framing, mirroring `index/hnsw/sidecar.rs` for
//! symmetry between the two engines' persistence formats. Save is always a
//! full snapshot. Dimension is never stored here; it's taken from the store
//! on load.

use super::cluster::{ClusterState, IvfParams};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAGIC: u32 = 0x4956_4620; // "IVF "
const VERSION: u32 = 1;

/// Saves a full snapshot of `state` to `path`.
///
/// # Errors
///
/// Returns [`Error::Io`] on write failure.
pub fn save(path: impl AsRef<Path>, state: &ClusterState) -> Result<()> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    let centroids = state.centroids_snapshot();
    let assignments = state.assignments_snapshot();

    w.write_all(&MAGIC.to_le_bytes())?;
    w.write_all(&VERSION.to_le_bytes())?;
    #[allow(clippy::cast_possible_truncation)]
    w.write_all(&(state.params.n_clusters as u32).to_le_bytes())?;
    #[allow(clippy::cast_possible_truncation)]
    w.write_all(&(state.params.n_probe as u32).to_le_bytes())?;
    #[allow(clippy::cast_possible_truncation)]
    w.write_all(&(centroids.len() as u32).to_le_bytes())?;
    #[allow(clippy::cast_possible_truncation)]
    w.write_all(&(assignments.len() as u32).to_le_bytes())?;

    for (cluster_id, centroid_record_id) in &centroids {
        w.write_all(&cluster_id.to_le_bytes())?;
        w.write_all(&centroid_record_id.to_le_bytes())?;
    }

    #[allow(clippy::cast_possible_truncation)]
    w.write_all(&(assignments.len() as u32).to_le_bytes())?;
    for (vector_id, cluster_id) in &assignments {
        w.write_all(&vector_id.to_le_bytes())?;
        w.write_all(&cluster_id.to_le_bytes())?;
    }

    w.flush()?;
    Ok(())
}

/// Loads an IVF sidecar from `path`, reconstructing `clusters` by inverting
/// the flat assignment list.
///
/// # Errors
///
/// Returns [`Error::IvfCorruption`] on magic/version mismatch or
/// truncation; returns [`Error::Io`] on other I/O failure.
pub fn load(path: impl AsRef<Path>) -> Result<ClusterState> {
    let file = File::open(path)?;
    let mut r = BufReader::new(file);

    let magic = read_u32(&mut r)?;
    if magic != MAGIC {
        return Err(Error::IvfCorruption(format!(
            "bad magic: expected {MAGIC:#010x}, found {magic:#010x}"
        )));
    }
    let version = read_u32(&mut r)?;
    if version != VERSION {
        return Err(Error::IvfCorruption(format!(
            "unsupported ivf sidecar version {version}"
        )));
    }

    #[allow(clippy::cast_possible_truncation)]
    let n_clusters = read_u32(&mut r)? as usize;
    #[allow(clippy::cast_possible_truncation)]
    let n_probe = read_u32(&mut r)? as usize;
    let centroid_count = read_u32(&mut r)?;
    let _size = read_u32(&mut r)?;

    let mut centroids = Vec::with_capacity(centroid_count as usize);
    for _ in 0..centroid_count {
        let cluster_id = read_i32(&mut r)?;
        let centroid_record_id = read_u64(&mut r)?;
        centroids.push((cluster_id, centroid_record_id));
    }

    let assignment_count = read_u32(&mut r)?;
    let mut assignments = Vec::with_capacity(assignment_count as usize);
    for _ in 0..assignment_count {
        let vector_id = read_u64(&mut r)?;
        let cluster_id = read_i32(&mut r)?;
        assignments.push((vector_id, cluster_id));
    }

    let params = IvfParams { n_clusters, n_probe };
    Ok(ClusterState::from_parts(params, centroids, assignments))
}

fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i32<R: Read>(r: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}
