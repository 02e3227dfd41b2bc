// Utility functions for movie-ranking-service

/// Normalized position of a zero-based index within a ranking of `len` items.
/// 0.0 is the top of the list and 1.0 the bottom. Singleton rankings carry no
/// positional signal and map to 0.0.
pub fn rank_percentile(position: usize, len: usize) -> f64 {
    if len > 1 {
        position as f64 / (len - 1) as f64
    } else {
        0.0
    }
}

/// Arithmetic mean, `None` for an empty input.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
