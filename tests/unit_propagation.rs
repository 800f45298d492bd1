// Unit tests for neighbor propagation.
//
// Tests the weighted average in isolation: order invariance, exact-match
// dominance as epsilon shrinks, skipped neighbors, and output dimension.

use std::collections::HashMap;

use coldprop::index::Neighbor;
use coldprop::propagation::{propagate, InverseDistance, PropagationError, Uniform};

fn neighbor(id: &str, distance: f64) -> Neighbor {
    Neighbor {
        id: id.to_string(),
        distance,
    }
}

fn table(entries: &[(&str, Vec<f64>)]) -> HashMap<String, Vec<f64>> {
    entries
        .iter()
        .map(|(id, v)| (id.to_string(), v.clone()))
        .collect()
}

fn assert_close(a: &[f64], b: &[f64], tolerance: f64) {
    assert_eq!(a.len(), b.len(), "length mismatch: {a:?} vs {b:?}");
    for (x, y) in a.iter().zip(b) {
        assert!((x - y).abs() < tolerance, "{a:?} != {b:?}");
    }
}

// ============================================================
// Weighted average
// ============================================================

#[test]
fn neighbor_order_does_not_change_result() {
    let embeddings = table(&[
        ("a", vec![1.0, 0.0, 2.0]),
        ("b", vec![0.0, 3.0, 1.0]),
        ("c", vec![-1.0, 1.0, 0.5]),
    ]);
    let forward = vec![neighbor("a", 0.1), neighbor("b", 0.4), neighbor("c", 0.9)];
    let reversed: Vec<Neighbor> = forward.iter().rev().cloned().collect();

    let weight = InverseDistance::default();
    let x = propagate(&forward, &embeddings, &weight).unwrap();
    let y = propagate(&reversed, &embeddings, &weight).unwrap();
    assert_close(&x.vector, &y.vector, 1e-12);
}

#[test]
fn exact_match_dominates_as_epsilon_shrinks() {
    let embeddings = table(&[("a", vec![2.0, 2.0]), ("b", vec![0.0, 0.0])]);
    let neighbors = vec![neighbor("a", 0.0), neighbor("b", 1.0)];

    let loose = propagate(&neighbors, &embeddings, &InverseDistance { epsilon: 1e-1 }).unwrap();
    let tight = propagate(&neighbors, &embeddings, &InverseDistance { epsilon: 1e-5 }).unwrap();

    assert!(tight.vector[0] > loose.vector[0]);
    assert_close(&tight.vector, &[2.0, 2.0], 1e-3);
}

#[test]
fn uniform_weights_give_plain_mean() {
    let embeddings = table(&[("a", vec![1.0, 3.0]), ("b", vec![3.0, 5.0])]);
    let neighbors = vec![neighbor("a", 0.2), neighbor("b", 1.7)];
    let result = propagate(&neighbors, &embeddings, &Uniform).unwrap();
    assert_close(&result.vector, &[2.0, 4.0], 1e-12);
    assert_close(&result.weights, &[0.5, 0.5], 1e-12);
}

#[test]
fn closure_weights_are_accepted() {
    let embeddings = table(&[("a", vec![4.0]), ("b", vec![0.0])]);
    let neighbors = vec![neighbor("a", 0.0), neighbor("b", 1.0)];
    let linear = |d: f64| 1.0 - d / 2.0;
    let result = propagate(&neighbors, &embeddings, &linear).unwrap();
    // weights 1.0 and 0.5
    assert_close(&result.vector, &[4.0 / 1.5], 1e-12);
}

// ============================================================
// Missing neighbors
// ============================================================

#[test]
fn missing_neighbors_contribute_nothing() {
    let embeddings = table(&[("a", vec![1.0, 1.0])]);
    let neighbors = vec![neighbor("ghost", 0.0), neighbor("a", 0.5)];
    let result = propagate(&neighbors, &embeddings, &InverseDistance::default()).unwrap();

    assert_eq!(result.contributors, vec!["a".to_string()]);
    assert_close(&result.weights, &[1.0], 1e-12);
    assert_close(&result.vector, &[1.0, 1.0], 1e-12);
}

#[test]
fn no_resolvable_neighbor_is_an_error() {
    let embeddings = table(&[("a", vec![1.0])]);
    let neighbors = vec![neighbor("x", 0.1), neighbor("y", 0.2)];
    let err = propagate(&neighbors, &embeddings, &InverseDistance::default()).unwrap_err();
    assert_eq!(err, PropagationError::NoResolvableNeighbors { candidates: 2 });
}

#[test]
fn empty_neighbor_list_is_an_error() {
    let embeddings = table(&[("a", vec![1.0])]);
    let err = propagate(&[], &embeddings, &Uniform).unwrap_err();
    assert_eq!(err, PropagationError::NoResolvableNeighbors { candidates: 0 });
}

// ============================================================
// Dimensions
// ============================================================

#[test]
fn output_has_trained_dimension_not_query_dimension() {
    // Neighbors come from a 2-d label space; trained vectors are 5-d.
    let embeddings = table(&[
        ("a", vec![1.0, 0.0, 0.0, 0.0, 1.0]),
        ("b", vec![0.0, 1.0, 0.0, 1.0, 0.0]),
    ]);
    let neighbors = vec![neighbor("a", 0.3), neighbor("b", 0.6)];
    let result = propagate(&neighbors, &embeddings, &InverseDistance::default()).unwrap();
    assert_eq!(result.vector.len(), 5);
}

#[test]
fn ragged_trained_table_is_rejected() {
    let embeddings = table(&[("a", vec![1.0, 0.0]), ("b", vec![1.0, 0.0, 0.0])]);
    let neighbors = vec![neighbor("a", 0.3), neighbor("b", 0.6)];
    let err = propagate(&neighbors, &embeddings, &Uniform).unwrap_err();
    assert!(matches!(
        err,
        PropagationError::DimensionMismatch {
            expected: 2,
            found: 3,
            ..
        }
    ));
}

#[test]
fn negative_weight_is_rejected() {
    let embeddings = table(&[("a", vec![1.0])]);
    let neighbors = vec![neighbor("a", 0.3)];
    let negative = |_: f64| -1.0;
    let err = propagate(&neighbors, &embeddings, &negative).unwrap_err();
    assert!(matches!(err, PropagationError::InvalidWeight { .. }));
}
