//! Vector similarity utilities.
//!
//! Pure-Rust cosine similarity and nearest-neighbor ranking over memory
//! records. The store keeps embeddings as blobs; ranking happens here.

use waypoint_core::memory::MemoryRecord;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 =
/// opposite. Returns 0.0 if either vector is zero-length or the lengths
/// differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank records by cosine similarity to a query embedding.
///
/// Returns records sorted by descending similarity with `similarity` set.
/// Records without an embedding or below `min_similarity` are excluded;
/// the result is capped at `limit`.
pub fn rank_by_similarity(
    records: &[MemoryRecord],
    query_embedding: &[f32],
    limit: usize,
    min_similarity: f32,
) -> Vec<MemoryRecord> {
    let mut scored: Vec<(f32, MemoryRecord)> = records
        .iter()
        .filter_map(|record| {
            let emb = record.embedding.as_ref()?;
            let sim = cosine_similarity(emb, query_embedding);
            if sim >= min_similarity {
                let mut r = record.clone();
                r.similarity = sim;
                Some((sim, r))
            } else {
                None
            }
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored.into_iter().map(|(_, r)| r).collect()
}
