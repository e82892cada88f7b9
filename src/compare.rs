//! Cross-node comparison helpers shared by the checkers

use std::collections::BTreeSet;

/// Return every `(i, j)` with `i < j` where `items[i] != items[j]`.
///
/// An empty result means all items agree. Unlike a chained `a == b == c`, the
/// result says which nodes disagree with which.
pub fn diverging_pairs<T: PartialEq>(items: &[T]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            if items[i] != items[j] {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

pub fn all_agree<T: PartialEq>(items: &[T]) -> bool {
    items.windows(2).all(|w| w[0] == w[1])
}

/// Entries present in exactly one of `a` and `b`, sorted and deduplicated.
pub fn symmetric_difference<T: Ord + Clone>(a: &[T], b: &[T]) -> Vec<T> {
    let a: BTreeSet<&T> = a.iter().collect();
    let b: BTreeSet<&T> = b.iter().collect();
    a.symmetric_difference(&b).map(|v| (*v).clone()).collect()
}

/// Human label for a node pair using 1-based numbering, e.g. `1&2`.
pub fn pair_label((i, j): (usize, usize)) -> String {
    format!("{}&{}", i + 1, j + 1)
}
