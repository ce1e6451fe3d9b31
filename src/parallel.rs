// src/parallel.rs
// PARALLEL PROCESSING ENGINE
// Shards the C(n,2) primer pair space across the Rayon pool.
// Every pair is independent, so workers share nothing but the read-only sequences.

use rayon::prelude::*;
use crate::complement::max_consecutive_binding;

pub struct ParallelProcessor;

impl ParallelProcessor {
    /// PAIR TEST: A pair may share a reaction if
    /// 1. Neither sequence contains the other (self-priming risk), AND
    /// 2. Their longest complementary run is at most `max_binding` (inclusive).
    pub fn is_compatible(seq1: &str, seq2: &str, max_binding: usize) -> bool {
        if seq1.contains(seq2) || seq2.contains(seq1) {
            return false;
        }
        max_consecutive_binding(seq1, seq2) <= max_binding
    }

    /// COMPATIBLE PAIRS: Returns index pairs `(i, j)` with `i < j` that pass `is_compatible`.
    ///
    /// Work is split by the first index; each worker walks `j in i+1..n`.
    /// The output is sorted, so it is identical to a sequential walk over
    /// all combinations in lexicographic order, whatever the thread count.
    pub fn compatible_pairs(seqs: &[&str], max_binding: usize) -> Vec<(usize, usize)> {
        let n = seqs.len();
        if n < 2 { return Vec::new(); }

        let mut pairs: Vec<(usize, usize)> = (0..n - 1)
        .into_par_iter()
        .flat_map_iter(|i| {
            (i + 1..n)
            .filter(move |&j| Self::is_compatible(seqs[i], seqs[j], max_binding))
            .map(move |j| (i, j))
        })
        .collect();

        // Output order is lexicographic by (i, j)
        pairs.par_sort_unstable();
        pairs
    }

    /// Longest complementary run for every pair, in combination order.
    /// Used for reporting, not for edge decisions.
    pub fn binding_matrix(seqs: &[&str]) -> Vec<(usize, usize, usize)> {
        let n = seqs.len();
        if n < 2 { return Vec::new(); }

        (0..n - 1)
        .into_par_iter()
        .flat_map_iter(|i| {
            (i + 1..n).map(move |j| (i, j, max_consecutive_binding(seqs[i], seqs[j])))
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn sequential_pairs(seqs: &[&str], max_binding: usize) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for i in 0..seqs.len() {
            for j in i + 1..seqs.len() {
                if ParallelProcessor::is_compatible(seqs[i], seqs[j], max_binding) {
                    out.push((i, j));
                }
            }
        }
        out
    }

    #[test]
    fn substring_pairs_are_never_compatible() {
        assert!(!ParallelProcessor::is_compatible("ATGCTC", "ATGC", 100));
        assert!(!ParallelProcessor::is_compatible("ATGC", "ATGCTC", 100));
        assert!(!ParallelProcessor::is_compatible("ATGC", "ATGC", 100));
    }

    #[test]
    fn threshold_is_inclusive() {
        // max_consecutive_binding("ATGC", "GGCC") == 2
        assert!(ParallelProcessor::is_compatible("ATGC", "GGCC", 2));
        assert!(!ParallelProcessor::is_compatible("ATGC", "GGCC", 1));
    }

    #[test]
    fn fewer_than_two_sequences_yield_nothing() {
        assert!(ParallelProcessor::compatible_pairs(&[], 3).is_empty());
        assert!(ParallelProcessor::compatible_pairs(&["ATGC"], 3).is_empty());
        assert!(ParallelProcessor::binding_matrix(&["ATGC"]).is_empty());
    }

    #[test]
    fn parallel_matches_sequential_order() {
        let mut rng = StdRng::seed_from_u64(11);
        let bases = ['A', 'C', 'G', 'T'];
        let owned: Vec<String> = (0..60)
        .map(|_| (0..8).map(|_| bases[rng.gen_range(0..4)]).collect())
        .collect();
        let seqs: Vec<&str> = owned.iter().map(String::as_str).collect();

        for max_binding in [1, 3, 5] {
            assert_eq!(
                ParallelProcessor::compatible_pairs(&seqs, max_binding),
                sequential_pairs(&seqs, max_binding)
            );
        }
    }

    #[test]
    fn binding_matrix_covers_every_combination_once() {
        let seqs = ["ATGC", "GGCC", "CCTA"];
        assert_eq!(
            ParallelProcessor::binding_matrix(&seqs),
            vec![(0, 1, 2), (0, 2, 1), (1, 2, 0)]
        );
    }
}
