//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Calculate the `pct`th percentile of a slice of values.
///
/// Uses linear interpolation between the two nearest order statistics, so
/// for a sorted slice `v` of length `n` the percentile sits at the fractional
/// index `pct / 100 * (n - 1)`.
///
/// Returns `None` if the slice is empty or `pct` is outside `[0, 100]`.
pub fn percentile<T>(values: &[T], pct: T) -> Option<T>
where
    T: Float,
{
    if values.is_empty() {
        return None;
    }

    let hundred = T::from(100.0)?;
    if pct < T::zero() || pct > hundred {
        return None;
    }

    // Sort a copy of the values. NaNs are not expected in depth data but are
    // ordered last rather than causing a panic.
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let max_idx = T::from(sorted.len() - 1)?;
    let idx = pct / hundred * max_idx;

    let lower = idx.floor();
    let upper = idx.ceil();
    let frac = idx - lower;

    let lower_val = sorted[lower.to_usize()?];
    let upper_val = sorted[upper.to_usize()?];

    Some(lower_val + frac * (upper_val - lower_val))
}

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0) * (target_range.1 - target_range.0)
            / (source_range.1 - source_range.0))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_percentile() {
        // Simple 0..=10 sequence, percentiles land exactly on order stats
        let vals: Vec<f64> = (0..=10).map(|v| v as f64).collect();
        assert_eq!(percentile(&vals, 0.0), Some(0.0));
        assert_eq!(percentile(&vals, 50.0), Some(5.0));
        assert_eq!(percentile(&vals, 100.0), Some(10.0));

        // Interpolated case: 4 values, 10th pct at index 0.3
        let vals = vec![1.0, 2.0, 3.0, 4.0];
        let p = percentile(&vals, 10.0).unwrap();
        assert!((p - 1.3).abs() < 1e-12);

        // Unsorted input is handled
        let vals = vec![4.0, 1.0, 3.0, 2.0];
        let p = percentile(&vals, 10.0).unwrap();
        assert!((p - 1.3).abs() < 1e-12);

        // Degenerate cases
        assert_eq!(percentile::<f64>(&[], 10.0), None);
        assert_eq!(percentile(&[1.0f64], 110.0), None);
        assert_eq!(percentile(&[7.0f64], 10.0), Some(7.0));
    }

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0.0, 1.0), (0.0, 10.0), 0.5), 5.0);
        assert_eq!(lin_map((-1.0, 1.0), (0.0, 1.0), 0.0), 0.5);
    }
}
