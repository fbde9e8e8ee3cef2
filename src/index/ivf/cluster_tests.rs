use super::*;
use crate::storage::Store;
use tempfile::tempdir;

fn store(dim: usize) -> Store {
    let dir = tempdir().unwrap();
    Store::open(dir.path().join("vectors.db"), dim, 100).unwrap()
}

fn params(n_clusters: usize, n_probe: usize) -> IvfParams {
    IvfParams { n_clusters, n_probe }
}

#[test]
fn test_bootstrap_allocates_one_centroid_per_insert_below_target() {
    // Arrange
    let store = store(2);
    let state = ClusterState::new(params(3, 1));

    // Act
    state.insert(&store, 1, &[1.0, 1.0]).unwrap();
    state.insert(&store, 2, &[2.0, 2.0]).unwrap();

    // Assert
    assert_eq!(state.centroids_snapshot().len(), 2);
    assert_eq!(state.size(), 2);
}

#[test]
fn test_clustering_signal_finds_nearest_points() {
    // Arrange: D=4, n_clusters=5, insert 20 vectors along a line
    let store = store(4);
    let state = ClusterState::new(params(5, 3));
    for i in 0..20u64 {
        let v: Vec<f32> = (0..4).map(|j| i as f32 + 0.001 * j as f32).collect();
        state.insert(&store, i, &v).unwrap();
    }

    // Act
    let query: Vec<f32> = (0..4).map(|j| 10.0 + 0.001 * j as f32).collect();
    let results = state.search(&store, &query, 3).unwrap();

    // Assert: best-first, nondecreasing distances, self (id 10) ranks first
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].id, 10);
    for pair in results.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
}

#[test]
fn test_search_k_zero_is_invalid() {
    // Arrange
    let store = store(2);
    let state = ClusterState::new(params(2, 1));
    state.insert(&store, 1, &[1.0, 1.0]).unwrap();

    // Act
    let result = state.search(&store, &[1.0, 1.0], 0);

    // Assert
    assert!(matches!(result, Err(Error::InvalidK(0))));
}

#[test]
fn test_empty_index_search_returns_empty() {
    // Arrange
    let store = store(2);
    let state = ClusterState::new(params(2, 1));

    // Act
    let results = state.search(&store, &[1.0, 1.0], 5).unwrap();

    // Assert
    assert!(results.is_empty());
}

#[test]
fn test_delete_reduces_size_and_recenters_centroid() {
    // Arrange
    let store = store(2);
    let state = ClusterState::new(params(1, 1));
    state.insert(&store, 1, &[0.0, 0.0]).unwrap();
    state.insert(&store, 2, &[10.0, 10.0]).unwrap();
    let before = state.size();

    // Act
    state.delete(&store, 2).unwrap();

    // Assert
    assert_eq!(state.size(), before - 1);
    let results = state.search(&store, &[0.0, 0.0], 5).unwrap();
    assert!(results.iter().all(|r| r.id != 2));
}

#[test]
fn test_delete_unknown_id_forwards_to_store_and_succeeds() {
    // Arrange
    let store = store(2);
    let state = ClusterState::new(params(2, 1));
    state.insert(&store, 1, &[1.0, 1.0]).unwrap();

    // Act & Assert
    assert!(state.delete(&store, 999).is_ok());
    assert_eq!(state.size(), 1);
}

#[test]
fn test_centroid_ids_never_collide_with_member_ids() {
    // Arrange
    let store = store(2);
    let state = ClusterState::new(params(4, 1));

    // Act
    for i in 0..4u64 {
        state.insert(&store, i, &[i as f32, i as f32]).unwrap();
    }

    // Assert: every assigned cluster_id's centroid record id is from the
    // reserved descending range, distinct from the inserted application ids
    let centroids = state.centroids_snapshot();
    for (_, rec_id) in centroids {
        assert!(rec_id > 3);
    }
}

#[test]
fn test_every_assigned_id_appears_exactly_once_across_clusters() {
    // Arrange
    let store = store(3);
    let state = ClusterState::new(params(3, 2));

    // Act
    for i in 0..30u64 {
        let v: Vec<f32> = (0..3).map(|j| i as f32 + 0.01 * j as f32).collect();
        state.insert(&store, i, &v).unwrap();
    }

    // Assert
    let mut seen = std::collections::HashSet::new();
    for members in state.clusters.read().values() {
        for &m in members {
            assert!(seen.insert(m), "id {m} appeared in more than one cluster");
        }
    }
    assert_eq!(seen.len(), 30);
}
