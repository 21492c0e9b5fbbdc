//! Distance metrics for vector similarity calculations.
//!
//! All kernels use explicit SIMD via the `wide` crate (8-wide f32 lanes)
//! with a scalar tail for the remainder. Every metric is normalized to a
//! *distance*: lower is always closer. Cosine is reported as `1 - cos`,
//! inner product is negated. One ascending sort order therefore serves all
//! metrics, which keeps granule search and re-ranking metric-agnostic.

use serde::{Deserialize, Serialize};
use wide::f32x8;

/// Distance function used to compare vectors.
///
/// The discriminant bytes returned by [`MetricKind::to_code`] are part of the
/// persisted granule header and must never be reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricKind {
    /// Euclidean (L2) distance. Best when magnitude matters.
    L2,
    /// Cosine distance (`1 - cosine_similarity`). Best for normalized
    /// embeddings.
    Cosine,
    /// Negated inner product, for maximum inner product search.
    InnerProduct,
    /// Hamming distance over component equality. Meant for bit-packed
    /// vectors (`ScalarKind::B1`).
    Hamming,
}

impl MetricKind {
    /// Returns the stable on-disk byte code for this metric.
    #[must_use]
    pub const fn to_code(self) -> u8 {
        match self {
            Self::L2 => 0,
            Self::Cosine => 1,
            Self::InnerProduct => 2,
            Self::Hamming => 3,
        }
    }

    /// Decodes an on-disk byte code, `None` for unknown codes.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::L2),
            1 => Some(Self::Cosine),
            2 => Some(Self::InnerProduct),
            3 => Some(Self::Hamming),
            _ => None,
        }
    }

    /// Computes the distance between two vectors.
    ///
    /// Lower is closer for every metric kind.
    ///
    /// # Panics
    ///
    /// Panics if the vectors have different lengths. Callers go through
    /// dimension-checked entry points (`DenseIndex::add` / `search`).
    #[must_use]
    #[inline]
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::L2 => euclidean_distance_simd(a, b),
            Self::Cosine => 1.0 - cosine_similarity_simd(a, b),
            Self::InnerProduct => -dot_product_simd(a, b),
            Self::Hamming => hamming_distance(a, b),
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::L2 => "L2",
            Self::Cosine => "cosine",
            Self::InnerProduct => "inner_product",
            Self::Hamming => "hamming",
        };
        write!(f, "{name}")
    }
}

/// Computes dot product using explicit SIMD (8-wide f32 lanes).
///
/// # Panics
///
/// Panics if vectors have different lengths.
#[inline]
#[must_use]
pub fn dot_product_simd(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let len = a.len();
    let simd_len = len / 8;
    let remainder = len % 8;

    let mut sum = f32x8::ZERO;

    for i in 0..simd_len {
        let offset = i * 8;
        let va = f32x8::from(&a[offset..offset + 8]);
        let vb = f32x8::from(&b[offset..offset + 8]);
        sum = va.mul_add(vb, sum);
    }

    let mut result = sum.reduce_add();

    let base = simd_len * 8;
    for i in 0..remainder {
        result += a[base + i] * b[base + i];
    }

    result
}

/// Computes euclidean (L2) distance using explicit SIMD.
///
/// # Panics
///
/// Panics if vectors have different lengths.
#[inline]
#[must_use]
pub fn euclidean_distance_simd(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let len = a.len();
    let simd_len = len / 8;
    let remainder = len % 8;

    let mut sum = f32x8::ZERO;

    for i in 0..simd_len {
        let offset = i * 8;
        let va = f32x8::from(&a[offset..offset + 8]);
        let vb = f32x8::from(&b[offset..offset + 8]);
        let diff = va - vb;
        sum = diff.mul_add(diff, sum);
    }

    let mut result = sum.reduce_add();

    let base = simd_len * 8;
    for i in 0..remainder {
        let d = a[base + i] - b[base + i];
        result += d * d;
    }

    result.sqrt()
}

/// Computes cosine similarity with a single fused SIMD pass over both norms
/// and the dot product.
///
/// Returns 0.0 when either vector has zero norm.
///
/// # Panics
///
/// Panics if vectors have different lengths.
#[inline]
#[must_use]
pub fn cosine_similarity_simd(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let len = a.len();
    let simd_len = len / 8;
    let remainder = len % 8;

    let mut dot = f32x8::ZERO;
    let mut norm_a = f32x8::ZERO;
    let mut norm_b = f32x8::ZERO;

    for i in 0..simd_len {
        let offset = i * 8;
        let va = f32x8::from(&a[offset..offset + 8]);
        let vb = f32x8::from(&b[offset..offset + 8]);
        dot = va.mul_add(vb, dot);
        norm_a = va.mul_add(va, norm_a);
        norm_b = vb.mul_add(vb, norm_b);
    }

    let mut dot_sum = dot.reduce_add();
    let mut norm_a_sum = norm_a.reduce_add();
    let mut norm_b_sum = norm_b.reduce_add();

    let base = simd_len * 8;
    for i in 0..remainder {
        dot_sum += a[base + i] * b[base + i];
        norm_a_sum += a[base + i] * a[base + i];
        norm_b_sum += b[base + i] * b[base + i];
    }

    let denom = norm_a_sum.sqrt() * norm_b_sum.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot_sum / denom
    }
}

/// Counts the components where `a` and `b` differ.
///
/// Intended for vectors decoded from the `B1` scalar kind, where every
/// component is exactly 0.0 or 1.0, but defined for arbitrary f32 values.
///
/// # Panics
///
/// Panics if vectors have different lengths.
#[inline]
#[must_use]
pub fn hamming_distance(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let mut diff = 0u32;
    for (x, y) in a.iter().zip(b.iter()) {
        if x.to_bits() != y.to_bits() {
            diff += 1;
        }
    }
    diff as f32
}
