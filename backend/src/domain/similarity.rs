/// Exhaustive cosine-similarity ranking over index entries
use super::entities::VectorIndexEntry;
use super::value_objects::EmbeddingVector;

/// Euclidean norm, accumulated in f64
pub fn magnitude(v: &[f32]) -> f64 {
    v.iter()
        .map(|x| f64::from(*x) * f64::from(*x))
        .sum::<f64>()
        .sqrt()
}

/// Cosine similarity of two vectors of equal length.
///
/// Returns `None` when the score is undefined: mismatched lengths, empty
/// input, a zero-magnitude side, or a non-finite intermediate. Callers treat
/// `None` as "not a candidate", so NaN never reaches a comparison.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }

    let score = dot / denominator;
    if !score.is_finite() {
        return None;
    }

    Some(score.clamp(-1.0, 1.0) as f32)
}

/// An entry paired with its similarity to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredEntry<'a> {
    pub entry: &'a VectorIndexEntry,
    pub score: f32,
}

fn score_entry<'a>(query: &EmbeddingVector, entry: &'a VectorIndexEntry) -> Option<ScoredEntry<'a>> {
    let vector = entry.searchable_vector()?;
    let score = query.cosine_similarity(vector)?;
    Some(ScoredEntry { entry, score })
}

/// The single best entry. Ties keep the first entry encountered.
///
/// Returns `None` when no entry has a usable vector.
pub fn best_match<'a, I>(query: &EmbeddingVector, entries: I) -> Option<ScoredEntry<'a>>
where
    I: IntoIterator<Item = &'a VectorIndexEntry>,
{
    let mut best: Option<ScoredEntry<'a>> = None;
    for scored in entries.into_iter().filter_map(|e| score_entry(query, e)) {
        match best {
            Some(current) if scored.score <= current.score => {}
            _ => best = Some(scored),
        }
    }
    best
}

/// The `k` best entries by descending score; equal scores keep scan order.
pub fn top_k<'a, I>(query: &EmbeddingVector, entries: I, k: usize) -> Vec<ScoredEntry<'a>>
where
    I: IntoIterator<Item = &'a VectorIndexEntry>,
{
    if k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<ScoredEntry<'a>> = entries
        .into_iter()
        .filter_map(|e| score_entry(query, e))
        .collect();

    // Stable sort; scores are finite so the comparison is total.
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);
    scored
}
