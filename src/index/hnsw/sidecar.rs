//! The HNSW graph sidecar file (`<data_path>.graph`).
//!
//! Hand-rolled framing, little-endian throughout, a fixed byte-for-byte
//! layout. Save is always a full snapshot; there is no incremental format.

use super::graph::{Graph, HnswParams};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAGIC: u32 = 0x4853_4E57; // "HNSW"
const VERSION: u32 = 1;

/// Saves a full snapshot of `graph` to `path`.
///
/// # Errors
///
/// Returns [`Error::Io`] on write failure.
pub fn save(path: impl AsRef<Path>, dimension: u32, graph: &Graph) -> Result<()> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    w.write_all(&MAGIC.to_le_bytes())?;
    w.write_all(&VERSION.to_le_bytes())?;
    w.write_all(&dimension.to_le_bytes())?;
    #[allow(clippy::cast_possible_truncation)]
    w.write_all(&(graph.params.m as u32).to_le_bytes())?;
    #[allow(clippy::cast_possible_truncation)]
    w.write_all(&(graph.params.ef_construction as u32).to_le_bytes())?;
    #[allow(clippy::cast_possible_truncation)]
    w.write_all(&(graph.params.ef_search as u32).to_le_bytes())?;
    w.write_all(&graph.params.m_l.to_le_bytes())?;
    w.write_all(&graph.entry_point().unwrap_or(u64::MAX).to_le_bytes())?;
    w.write_all(&graph.max_level().to_le_bytes())?;

    let snapshot = graph.snapshot();
    #[allow(clippy::cast_possible_truncation)]
    w.write_all(&(snapshot.len() as u32).to_le_bytes())?;

    for (id, top_level, neighbors) in &snapshot {
        w.write_all(&id.to_le_bytes())?;
        w.write_all(&top_level.to_le_bytes())?;
        for (level, ids) in neighbors.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let level_tag = level as i32;
            w.write_all(&level_tag.to_le_bytes())?;
            #[allow(clippy::cast_possible_truncation)]
            w.write_all(&(ids.len() as u32).to_le_bytes())?;
            for nid in ids {
                w.write_all(&nid.to_le_bytes())?;
            }
        }
    }

    w.flush()?;
    Ok(())
}

/// Loads a graph sidecar from `path`. The file is authoritative over any
/// constructor-supplied parameters: callers should discard those and adopt
/// what's read here, including dimension.
///
/// # Errors
///
/// Returns [`Error::GraphCorruption`] on magic/version mismatch, a
/// `level_tag` that doesn't match its position, or truncation; returns
/// [`Error::Io`] on other I/O failure.
pub fn load(path: impl AsRef<Path>) -> Result<(u32, Graph)> {
    let file = File::open(path)?;
    let mut r = BufReader::new(file);

    let magic = read_u32(&mut r)?;
    if magic != MAGIC {
        return Err(Error::GraphCorruption(format!(
            "bad magic: expected {MAGIC:#010x}, found {magic:#010x}"
        )));
    }
    let version = read_u32(&mut r)?;
    if version != VERSION {
        return Err(Error::GraphCorruption(format!(
            "unsupported graph sidecar version {version}"
        )));
    }

    let dimension = read_u32(&mut r)?;
    #[allow(clippy::cast_possible_truncation)]
    let m = read_u32(&mut r)? as usize;
    #[allow(clippy::cast_possible_truncation)]
    let ef_construction = read_u32(&mut r)? as usize;
    #[allow(clippy::cast_possible_truncation)]
    let ef_search = read_u32(&mut r)? as usize;
    let m_l = read_f64(&mut r)?;
    let entry_point_raw = read_u64(&mut r)?;
    let max_level = read_i32(&mut r)?;
    let node_count = read_u32(&mut r)?;

    let entry_point = if entry_point_raw == u64::MAX {
        None
    } else {
        Some(entry_point_raw)
    };

    let mut nodes = Vec::with_capacity(node_count as usize);
    for _ in 0..node_count {
        let id = read_u64(&mut r)?;
        let top_level = read_i32(&mut r)?;
        if top_level < 0 {
            return Err(Error::GraphCorruption(format!(
                "node {id} has negative top_level {top_level}"
            )));
        }
        let mut levels = Vec::with_capacity(top_level as usize + 1);
        for expected_level in 0..=top_level {
            let level_tag = read_i32(&mut r)?;
            if level_tag != expected_level {
                return Err(Error::GraphCorruption(format!(
                    "node {id}: expected level_tag {expected_level}, found {level_tag}"
                )));
            }
            let neighbor_count = read_u32(&mut r)?;
            let mut neighbors = Vec::with_capacity(neighbor_count as usize);
            for _ in 0..neighbor_count {
                neighbors.push(read_u64(&mut r)?);
            }
            levels.push(neighbors);
        }
        nodes.push((id, top_level, levels));
    }

    let params = HnswParams {
        m,
        ef_construction,
        ef_search,
        m_l,
    };
    let graph = Graph::from_parts(params, nodes, entry_point, max_level);
    Ok((dimension, graph))
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

fn read_f64<R: Read>(r: &mut R) -> io::Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}
