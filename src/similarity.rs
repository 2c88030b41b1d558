//! Cosine similarity shared by the article and comment ranking stages.

/// Cosine similarity with a floor on the denominator.
///
/// Computes `a . b / max(|a| * |b|, eps)`, so an all-zero vector yields `0.0`
/// instead of NaN. Returns `None` when the vectors differ in length.
pub fn cosine_similarity(a: &[f32], b: &[f32], eps: f32) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    Some(dot / (norm_a * norm_b).max(eps))
}
