// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Embedding vector math.
//!
//! All functions degrade to neutral values on malformed input (mismatched
//! dimensions, zero vectors) instead of panicking, so they are safe to call
//! speculatively from retrieval hot paths.

/// Norms below this are treated as zero.
const EPSILON: f32 = 1e-8;

/// Cosine similarity between two vectors, in `[-1, 1]`.
///
/// Returns `0.0` when the dimensions differ or either vector has (near-)zero
/// norm — mismatched embeddings are treated as unrelated, never as an error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let len = a.len();
    if len != b.len() {
        return 0.0;
    }

    // Single-pass computation for cache efficiency
    let mut dot: f32 = 0.0;
    let mut norm_a_sq: f32 = 0.0;
    let mut norm_b_sq: f32 = 0.0;

    for i in 0..len {
        let x = a[i];
        let y = b[i];
        dot += x * y;
        norm_a_sq += x * x;
        norm_b_sq += y * y;
    }

    let norm_a = norm_a_sq.sqrt();
    let norm_b = norm_b_sq.sqrt();

    if norm_a > EPSILON && norm_b > EPSILON {
        (dot / (norm_a * norm_b)) as f64
    } else {
        0.0
    }
}

/// Normalize a vector to unit length in place. No-op on zero vectors.
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Recency-weighted mean of a sequence of vectors.
///
/// The i-th vector (0-based) carries weight `(i + 1) / n`, so later vectors
/// dominate the aggregate. Output dimension equals the first vector's
/// dimension; shorter/longer vectors contribute only their overlapping
/// prefix. Empty input yields an empty vector.
pub fn recency_weighted_mean(vectors: &[Vec<f32>]) -> Vec<f32> {
    let n = vectors.len();
    if n == 0 {
        return Vec::new();
    }

    let dim = vectors[0].len();
    let mut sum = vec![0.0f32; dim];
    let mut total_weight = 0.0f32;

    for (i, v) in vectors.iter().enumerate() {
        let weight = (i + 1) as f32 / n as f32;
        total_weight += weight;
        for (j, &x) in v.iter().enumerate().take(dim) {
            sum[j] += x * weight;
        }
    }

    if total_weight > EPSILON {
        for x in sum.iter_mut() {
            *x /= total_weight;
        }
    }

    sum
}
