use super::*;
use crate::storage::Store;
use tempfile::tempdir;

fn store(dim: usize) -> Store {
    let dir = tempdir().unwrap();
    Store::open(dir.path().join("vectors.db"), dim, 100).unwrap()
}

#[test]
fn test_insert_and_search_finds_self() {
    // Arrange
    let store = store(32);
    let graph = Graph::new(HnswParams::default());
    for i in 0..50u64 {
        let v: Vec<f32> = (0..32).map(|j| (i * 32 + j as u64) as f32).collect();
        graph.insert(&store, i, &v).unwrap();
    }

    // Act
    let query: Vec<f32> = (0..32).map(|j| j as f32).collect();
    let results = graph.search(&store, &query, 5).unwrap();

    // Assert
    assert!(!results.is_empty());
    assert!(results.len() <= 5);
    assert_eq!(results[0].0, 0);
}

#[test]
fn test_empty_graph_search_returns_empty() {
    // Arrange
    let store = store(4);
    let graph = Graph::new(HnswParams::default());

    // Act
    let results = graph.search(&store, &[1.0, 2.0, 3.0, 4.0], 10).unwrap();

    // Assert
    assert!(results.is_empty());
}

#[test]
fn test_search_k_zero_is_invalid() {
    // Arrange
    let store = store(4);
    let graph = Graph::new(HnswParams::default());
    graph.insert(&store, 1, &[1.0, 0.0, 0.0, 0.0]).unwrap();

    // Act
    let result = graph.search(&store, &[1.0, 0.0, 0.0, 0.0], 0);

    // Assert
    assert!(matches!(result, Err(Error::InvalidK(0))));
}

#[test]
fn test_overwrite_existing_id_does_not_change_topology() {
    // Arrange
    let store = store(2);
    let graph = Graph::new(HnswParams::default());
    graph.insert(&store, 1, &[1.0, 1.0]).unwrap();
    graph.insert(&store, 2, &[2.0, 2.0]).unwrap();
    let before = graph.len();

    // Act
    graph.insert(&store, 1, &[9.0, 9.0]).unwrap();

    // Assert
    assert_eq!(graph.len(), before);
    assert_eq!(store.read(1).unwrap(), Some(vec![9.0, 9.0]));
}

#[test]
fn test_delete_unlinks_from_all_neighbor_lists() {
    // Arrange
    let store = store(2);
    let graph = Graph::new(HnswParams::default());
    for i in 0..10u64 {
        graph.insert(&store, i, &[i as f32, i as f32]).unwrap();
    }

    // Act
    graph.delete(&store, 3).unwrap();

    // Assert
    assert!(!graph.contains(3));
    for id in 0..10u64 {
        if id == 3 || !graph.contains(id) {
            continue;
        }
        let results = graph.snapshot();
        for (nid, _, neighbors) in &results {
            if *nid == id {
                for level in neighbors {
                    assert!(!level.contains(&3));
                }
            }
        }
    }
}

#[test]
fn test_delete_entry_point_promotes_highest_level_node() {
    // Arrange
    let store = store(2);
    let graph = Graph::new(HnswParams::default());
    for i in 0..30u64 {
        graph.insert(&store, i, &[i as f32, i as f32]).unwrap();
    }
    let ep_before = graph.entry_point().unwrap();

    // Act
    graph.delete(&store, ep_before).unwrap();

    // Assert
    assert_ne!(graph.entry_point(), Some(ep_before));
    assert!(graph.entry_point().is_some());
}

#[test]
fn test_delete_last_node_clears_entry_point() {
    // Arrange
    let store = store(2);
    let graph = Graph::new(HnswParams::default());
    graph.insert(&store, 1, &[1.0, 1.0]).unwrap();

    // Act
    graph.delete(&store, 1).unwrap();

    // Assert
    assert!(graph.entry_point().is_none());
    assert_eq!(graph.max_level(), -1);
}

#[test]
fn test_delete_unknown_id_forwards_to_store_and_succeeds() {
    // Arrange
    let store = store(2);
    let graph = Graph::new(HnswParams::default());
    graph.insert(&store, 1, &[1.0, 1.0]).unwrap();

    // Act: id 99 was never inserted into the graph
    let result = graph.delete(&store, 99);

    // Assert
    assert!(result.is_ok());
    assert!(graph.contains(1));
}

#[test]
fn test_max_level_tracks_highest_inserted_node() {
    // Arrange
    let store = store(2);
    let graph = Graph::new(HnswParams::default());

    // Act
    for i in 0..200u64 {
        graph.insert(&store, i, &[i as f32, i as f32]).unwrap();
    }

    // Assert: every node's top level is at most max_level
    let snapshot = graph.snapshot();
    let max_level = graph.max_level();
    for (_, top_level, _) in snapshot {
        assert!(top_level <= max_level);
    }
}

#[test]
fn test_neighbor_pruning_respects_m() {
    // Arrange
    let params = HnswParams {
        m: 4,
        ..HnswParams::default()
    };
    let store = store(2);
    let graph = Graph::new(params);

    // Act: insert a cluster of nearby points, forcing pruning
    for i in 0..40u64 {
        graph.insert(&store, i, &[0.0, i as f32 * 0.01]).unwrap();
    }

    // Assert
    let snapshot = graph.snapshot();
    for (_, _, neighbors) in snapshot {
        for level in neighbors {
            assert!(level.len() <= 4);
        }
    }
}
