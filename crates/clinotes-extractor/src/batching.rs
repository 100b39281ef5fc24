//! Partitioning a batch of notes into chunks

use std::ops::Range;

/// Split `total` notes into consecutive ranges of at most `batch_size`
///
/// Only the last range may be shorter. A `batch_size` of zero is treated as
/// one.
///
/// # Examples
///
/// ```
/// use clinotes_extractor::plan_chunks;
///
/// let sizes: Vec<usize> = plan_chunks(12, 5).iter().map(|r| r.len()).collect();
/// assert_eq!(sizes, vec![5, 5, 2]);
/// ```
pub fn plan_chunks(total: usize, batch_size: usize) -> Vec<Range<usize>> {
    let size = batch_size.max(1);
    (0..total)
        .step_by(size)
        .map(|start| start..(start + size).min(total))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(total: usize, batch_size: usize) -> Vec<usize> {
        plan_chunks(total, batch_size).iter().map(|r| r.len()).collect()
    }

    #[test]
    fn test_uneven_split() {
        assert_eq!(sizes(12, 5), vec![5, 5, 2]);
        assert_eq!(plan_chunks(12, 5), vec![0..5, 5..10, 10..12]);
    }

    #[test]
    fn test_even_split() {
        assert_eq!(sizes(10, 5), vec![5, 5]);
    }

    #[test]
    fn test_smaller_than_batch() {
        assert_eq!(sizes(3, 5), vec![3]);
    }

    #[test]
    fn test_empty_input() {
        assert!(plan_chunks(0, 5).is_empty());
    }

    #[test]
    fn test_zero_batch_size_treated_as_one() {
        assert_eq!(sizes(3, 0), vec![1, 1, 1]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: chunks cover every note exactly once, in order
        #[test]
        fn test_chunks_cover_input(total in 0usize..200, batch_size in 1usize..20) {
            let ranges = plan_chunks(total, batch_size);
            let covered: Vec<usize> = ranges.iter().flat_map(|r| r.clone()).collect();
            prop_assert_eq!(covered, (0..total).collect::<Vec<_>>());
            for (i, range) in ranges.iter().enumerate() {
                prop_assert!(range.len() <= batch_size);
                if i + 1 < ranges.len() {
                    prop_assert_eq!(range.len(), batch_size);
                }
            }
        }
    }
}
