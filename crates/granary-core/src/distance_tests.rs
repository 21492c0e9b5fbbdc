//! Tests for the `distance` module.

use crate::distance::{
    cosine_similarity_simd, dot_product_simd, euclidean_distance_simd, hamming_distance,
    MetricKind,
};

fn dot_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn euclidean_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[test]
fn test_dot_product_matches_scalar_reference() {
    // Length 11 exercises both the SIMD body and the scalar tail.
    let a: Vec<f32> = (0..11).map(|i| i as f32 * 0.5).collect();
    let b: Vec<f32> = (0..11).map(|i| (11 - i) as f32 * 0.25).collect();

    let simd = dot_product_simd(&a, &b);
    let scalar = dot_scalar(&a, &b);
    assert!((simd - scalar).abs() < 1e-4, "{simd} vs {scalar}");
}

#[test]
fn test_euclidean_matches_scalar_reference() {
    let a: Vec<f32> = (0..19).map(|i| i as f32).collect();
    let b: Vec<f32> = (0..19).map(|i| (i as f32) - 1.5).collect();

    let simd = euclidean_distance_simd(&a, &b);
    let scalar = euclidean_scalar(&a, &b);
    assert!((simd - scalar).abs() < 1e-4, "{simd} vs {scalar}");
}

#[test]
fn test_cosine_identical_vectors() {
    let a = vec![0.3; 16];
    assert!((cosine_similarity_simd(&a, &a) - 1.0).abs() < 1e-5);
}

#[test]
fn test_cosine_orthogonal_vectors() {
    let mut a = vec![0.0; 8];
    let mut b = vec![0.0; 8];
    a[0] = 1.0;
    b[1] = 1.0;
    assert!(cosine_similarity_simd(&a, &b).abs() < 1e-6);
}

#[test]
fn test_cosine_zero_norm_is_zero() {
    let a = vec![0.0; 8];
    let b = vec![1.0; 8];
    assert_eq!(cosine_similarity_simd(&a, &b), 0.0);
}

#[test]
fn test_hamming_counts_differing_components() {
    let a = vec![0.0, 1.0, 1.0, 0.0];
    let b = vec![0.0, 0.0, 1.0, 1.0];
    assert_eq!(hamming_distance(&a, &b), 2.0);
    assert_eq!(hamming_distance(&a, &a), 0.0);
}

#[test]
fn test_lower_is_closer_for_every_metric() {
    let query = vec![1.0, 0.0, 0.0, 0.0];
    let near = vec![0.9, 0.1, 0.0, 0.0];
    let far = vec![0.0, 0.0, 0.5, 0.5];

    for metric in [MetricKind::L2, MetricKind::Cosine, MetricKind::InnerProduct] {
        assert!(
            metric.distance(&query, &near) < metric.distance(&query, &far),
            "metric {metric} does not rank the near vector closer"
        );
    }
}

#[test]
fn test_metric_code_roundtrip() {
    for metric in [
        MetricKind::L2,
        MetricKind::Cosine,
        MetricKind::InnerProduct,
        MetricKind::Hamming,
    ] {
        assert_eq!(MetricKind::from_code(metric.to_code()), Some(metric));
    }
}

#[test]
fn test_unknown_metric_code_rejected() {
    assert_eq!(MetricKind::from_code(200), None);
}
