//! parallel combination search
//!
//! one search step evaluates every `size`-subset of the share pool that
//! contains at least one share of the newest packet. the pool is ordered with
//! the newest shares first, so those are exactly the subsets whose smallest
//! index is below `fresh`, and a lexicographic walk can stop at the first
//! subset that starts past them.
//!
//! the candidates are the first ranks of that walk. each scoped worker thread
//! takes one contiguous rank range, unranks its first subset and walks only
//! its own range. each worker sends its matches once over a bounded channel;
//! the caller drains it after every worker has joined and sorts the matches
//! by subset.

use std::sync::mpsc;
use std::thread;

use tracing::trace;

/// lexicographic walk over the `k`-subsets of `0..n`
#[derive(Clone, Debug)]
pub struct Combinations {
    n: usize,
    idx: Vec<usize>,
    started: bool,
}

impl Combinations {
    pub fn new(n: usize, k: usize) -> Self {
        Self { n, idx: (0..k).collect(), started: false }
    }

    /// walk starting at the `rank`-th subset in lexicographic order.
    /// `rank` must be below `binomial(n, k)`.
    pub fn from_rank(n: usize, k: usize, mut rank: usize) -> Self {
        let mut idx = Vec::with_capacity(k);
        let mut c = 0;
        for i in 0..k {
            // subsets with `c` at position `i` and larger entries after it
            loop {
                let below = binomial(n - c - 1, k - i - 1);
                if rank < below {
                    break;
                }
                rank -= below;
                c += 1;
            }
            idx.push(c);
            c += 1;
        }
        Self { n, idx, started: false }
    }

    /// step to the next subset; false once the walk is exhausted
    pub fn advance(&mut self) -> bool {
        let k = self.idx.len();
        if !self.started {
            self.started = true;
            return k > 0 && k <= self.n;
        }
        let mut i = k;
        while i > 0 {
            i -= 1;
            if self.idx[i] < self.n - k + i {
                self.idx[i] += 1;
                for j in i + 1..k {
                    self.idx[j] = self.idx[j - 1] + 1;
                }
                return true;
            }
        }
        false
    }

    pub fn current(&self) -> &[usize] {
        &self.idx
    }
}

/// n choose k, saturating
pub fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        acc = acc * (n - i) as u128 / (i + 1) as u128;
        if acc > usize::MAX as u128 {
            return usize::MAX;
        }
    }
    acc as usize
}

/// subsets a step evaluates: all `size`-subsets of `pool` minus those
/// avoiding the `fresh` newest shares
pub fn candidates(pool: usize, fresh: usize, size: usize) -> usize {
    binomial(pool, size).saturating_sub(binomial(pool - fresh.min(pool), size))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match<M> {
    /// pool indices, ascending
    pub subset: Vec<usize>,
    pub found: M,
}

#[derive(Clone, Copy, Debug)]
pub struct Search {
    workers: usize,
}

impl Search {
    pub fn new(workers: usize) -> Self {
        Self { workers: workers.max(1) }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// evaluate every `size`-subset of `0..pool` whose smallest index is
    /// below `fresh`. matches come back sorted by subset.
    pub fn run<M, V>(&self, pool: usize, fresh: usize, size: usize, eval: V) -> Vec<Match<M>>
    where
        M: Send,
        V: Fn(&[usize]) -> Option<M> + Sync,
    {
        let total = candidates(pool, fresh, size);
        if total == 0 {
            return Vec::new();
        }
        let workers = self.workers.min(total);
        let chunk = total.div_ceil(workers);
        trace!(pool, fresh, size, total, workers, "search step");

        let (tx, rx) = mpsc::sync_channel(workers);
        let eval = &eval;
        thread::scope(|s| {
            for worker in 0..workers {
                let tx = tx.clone();
                let start = (worker * chunk).min(total);
                let end = (start + chunk).min(total);
                s.spawn(move || {
                    let mut found = Vec::new();
                    if start < end {
                        let mut walk = Combinations::from_rank(pool, size, start);
                        for _ in start..end {
                            if !walk.advance() {
                                break;
                            }
                            let subset = walk.current();
                            if let Some(m) = eval(subset) {
                                found.push(Match { subset: subset.to_vec(), found: m });
                            }
                        }
                    }
                    // receiver outlives the scope
                    let _ = tx.send(found);
                });
            }
        });
        drop(tx);

        let mut matches: Vec<Match<M>> = rx.iter().flatten().collect();
        matches.sort_by(|a, b| a.subset.cmp(&b.subset));
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(n: usize, k: usize) -> Vec<Vec<usize>> {
        let mut out = Vec::new();
        let mut c = Combinations::new(n, k);
        while c.advance() {
            out.push(c.current().to_vec());
        }
        out
    }

    #[test]
    fn test_combinations() {
        assert_eq!(walk(4, 2), vec![
            vec![0, 1],
            vec![0, 2],
            vec![0, 3],
            vec![1, 2],
            vec![1, 3],
            vec![2, 3],
        ]);
        assert_eq!(walk(3, 3), vec![vec![0, 1, 2]]);
        assert!(walk(2, 3).is_empty());
        assert!(walk(5, 0).is_empty());
        assert_eq!(walk(10, 4).len(), binomial(10, 4));
    }

    #[test]
    fn test_from_rank_matches_walk() {
        let all = walk(7, 3);
        for (rank, subset) in all.iter().enumerate() {
            let mut c = Combinations::from_rank(7, 3, rank);
            assert!(c.advance());
            assert_eq!(c.current(), subset.as_slice());
        }
        let mut tail = Combinations::from_rank(7, 3, all.len() - 2);
        let mut rest = Vec::new();
        while tail.advance() {
            rest.push(tail.current().to_vec());
        }
        assert_eq!(rest, all[all.len() - 2..].to_vec());
    }

    #[test]
    fn test_each_candidate_evaluated_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = AtomicUsize::new(0);
        let hits = Search::new(5).run(11, 3, 4, |s| {
            calls.fetch_add(1, Ordering::Relaxed);
            Some(s.to_vec())
        });
        assert_eq!(calls.load(Ordering::Relaxed), candidates(11, 3, 4));
        assert_eq!(hits.len(), candidates(11, 3, 4));
        assert!(hits.iter().all(|m| m.subset[0] < 3));
    }

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(60, 4), 487_635);
        assert_eq!(binomial(5, 0), 1);
        assert_eq!(binomial(3, 5), 0);
        assert_eq!(candidates(6, 2, 3), binomial(6, 3) - binomial(4, 3));
        assert_eq!(candidates(6, 0, 3), 0);
    }

    #[test]
    fn test_only_subsets_touching_fresh_shares() {
        let search = Search::new(4);
        let hits = search.run(8, 2, 3, |s| Some(s.to_vec()));
        assert_eq!(hits.len(), candidates(8, 2, 3));
        assert!(hits.iter().all(|m| m.subset[0] < 2));
        assert!(hits.windows(2).all(|w| w[0].subset < w[1].subset));
    }

    #[test]
    fn test_matches_independent_of_workers() {
        let eval = |s: &[usize]| (s.iter().sum::<usize>() % 7 == 0).then(|| s.len());
        let one = Search::new(1).run(12, 3, 4, eval);
        let many = Search::new(16).run(12, 3, 4, eval);
        assert!(!one.is_empty());
        assert_eq!(one, many);
    }
}
