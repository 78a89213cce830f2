use num_traits::Float;

/// Median of the values; the mean of the two middle values for even counts.
pub fn median<T: Float>(values: &[T]) -> Option<T> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        let two = T::one() + T::one();
        Some((sorted[mid - 1] + sorted[mid]) / two)
    } else {
        Some(sorted[mid])
    }
}

#[inline]
pub fn euclidean_distance<T: Float>(a: (T, T), b: (T, T)) -> T {
    (a.0 - b.0).hypot(a.1 - b.1)
}
