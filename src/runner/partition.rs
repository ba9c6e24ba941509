//! # Partition Module
//!
//! Split statico della lista di task in slice contigue, decise una sola volta
//! prima dell'avvio dei nodi. Nessun ribilanciamento successivo.

/// Split `items` into `parts` contiguous slices whose sizes differ by at most one.
///
/// Larger slices come last, so 7 items over 2 parts give 3 + 4. The
/// concatenation of the slices is exactly `items`. Returns no slices when
/// `parts == 0`.
pub fn split_contiguous<T>(items: &[T], parts: usize) -> Vec<&[T]> {
    if parts == 0 {
        return Vec::new();
    }

    let base = items.len() / parts;
    let extra = items.len() % parts;
    let mut slices = Vec::with_capacity(parts);
    let mut start = 0;

    for index in 0..parts {
        // the last `extra` slices take one more item
        let size = if index >= parts - extra { base + 1 } else { base };
        slices.push(&items[start..start + size]);
        start += size;
    }

    slices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seven_over_two() {
        let items: Vec<u32> = (0..7).collect();
        let slices = split_contiguous(&items, 2);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0], &[0, 1, 2]);
        assert_eq!(slices[1], &[3, 4, 5, 6]);
    }

    #[test]
    fn test_sizes_are_floor_or_ceil_and_exhaustive() {
        for n in 0..40usize {
            for k in 1..9usize {
                let items: Vec<usize> = (0..n).collect();
                let slices = split_contiguous(&items, k);
                assert_eq!(slices.len(), k);

                let floor = n / k;
                let ceil = n.div_ceil(k);
                for slice in &slices {
                    assert!(slice.len() == floor || slice.len() == ceil);
                }

                let joined: Vec<usize> = slices.iter().flat_map(|s| s.iter().copied()).collect();
                assert_eq!(joined, items, "n={} k={}", n, k);
            }
        }
    }

    #[test]
    fn test_more_parts_than_items() {
        let items = [1, 2];
        let slices = split_contiguous(&items, 4);
        assert_eq!(slices.iter().map(|s| s.len()).collect::<Vec<_>>(), vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_zero_parts() {
        let items = [1, 2, 3];
        assert!(split_contiguous(&items, 0).is_empty());
    }
}
