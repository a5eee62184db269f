//! tree shape and share distribution arithmetic

use rand::seq::SliceRandom;

use crate::config::{Params, Scheme};
use crate::{Error, Result};

/// fan-out and threshold of every layer, root first
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct TreeLayout {
    /// children per node on each layer
    pub fanout: Vec<usize>,
    /// shares needed to rebuild a node from its children, per layer
    pub thresholds: Vec<usize>,
    /// children of each leaf parent when the last layer is uneven; those
    /// splits are full threshold. empty for uniform trees.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub leaf_fanout: Vec<usize>,
}

impl TreeLayout {
    /// same fan-out for every node of a layer
    pub fn uniform(fanout: Vec<usize>, thresholds: Vec<usize>) -> Self {
        Self { fanout, thresholds, leaf_fanout: Vec::new() }
    }

    pub fn for_params(params: &Params) -> Result<Self> {
        Ok(match params.scheme {
            Scheme::Layered if params.distinguishable => {
                Self::distinguishable(params.trustees, params.largest, params.smallest)?
            }
            Scheme::Layered => Self::layered(params.trustees, params.largest, params.smallest)?,
            Scheme::Thresholded => Self::uniform(
                vec![params.no_of_subsecrets, params.leaves_per_subsecret()],
                vec![params.upper_threshold(), params.absolute_threshold],
            ),
            Scheme::Additive | Scheme::Hinted => Self::uniform(
                vec![params.no_of_subsecrets, params.leaves_per_subsecret()],
                vec![params.no_of_subsecrets, params.absolute_threshold],
            ),
        })
    }

    /// full-threshold tree whose leaf count is the smallest product of
    /// fan-outs in `[smallest, largest]` covering `trustees`. populations that
    /// fit in one set get a single flat layer.
    pub fn layered(trustees: usize, largest: usize, smallest: usize) -> Result<Self> {
        check_range(largest, smallest)?;
        if trustees <= largest {
            return Ok(Self::uniform(vec![trustees], vec![trustees]));
        }
        let depth = levels(trustees, largest);
        let (fanout, _) = output_distribution(trustees, depth, largest, smallest);
        Ok(Self::uniform(fanout.clone(), fanout))
    }

    /// like [`Self::layered`], but leaf parents drop children until the tree
    /// has exactly one leaf per trustee
    pub fn distinguishable(trustees: usize, largest: usize, smallest: usize) -> Result<Self> {
        let mut layout = Self::layered(trustees, largest, smallest)?;
        if layout.depth() < 2 {
            return Ok(layout);
        }
        let product = layout.leaves();
        layout.leaf_fanout = leaves_distribution(&layout.fanout, trustees, product).ok_or_else(|| {
            Error::Config(format!(
                "{trustees} trustees cannot fill fan-out {:?} with 2 leaves per parent",
                layout.fanout
            ))
        })?;
        Ok(layout)
    }

    /// number of layers below the root, equal to the parent chain length of
    /// every leaf
    pub fn depth(&self) -> usize {
        self.fanout.len()
    }

    pub fn leaves(&self) -> usize {
        if self.leaf_fanout.is_empty() {
            self.fanout.iter().product()
        } else {
            self.leaf_fanout.iter().sum()
        }
    }

    /// fan-out and threshold of the `nth` node on `layer`
    pub fn split_of(&self, layer: usize, nth: usize) -> (usize, usize) {
        if layer + 1 == self.depth() {
            if let Some(&n) = self.leaf_fanout.get(nth) {
                return (n, n);
            }
        }
        (self.fanout[layer], self.thresholds[layer])
    }
}

fn check_range(largest: usize, smallest: usize) -> Result<()> {
    if largest < 2 || smallest < 2 || smallest > largest {
        return Err(Error::Config(format!(
            "fan-out range [{smallest}, {largest}] is empty or below 2"
        )));
    }
    Ok(())
}

/// smallest depth `L >= 2` with `largest^L >= trustees`. `largest` below 2
/// is treated as 2.
pub fn levels(trustees: usize, largest: usize) -> usize {
    let largest = largest.max(2);
    let mut depth = 2;
    while largest.saturating_pow(depth as u32) < trustees {
        depth += 1;
    }
    depth
}

/// children of every leaf parent so that they add up to `trustees`. starts
/// from the last fan-out everywhere and takes one leaf at a time, striding
/// by the fan-out of the layer above so the cuts spread across subtrees.
/// leaf parents keep at least 2 children; `None` when that cannot reach
/// `trustees`.
pub fn leaves_distribution(fanout: &[usize], trustees: usize, product: usize) -> Option<Vec<usize>> {
    let (&last, upper) = fanout.split_last()?;
    let parents: usize = upper.iter().product();
    let jump = upper.last().copied().unwrap_or(1).max(1);
    let mut counts = vec![last; parents];
    let mut surplus = product.saturating_sub(trustees);
    while surplus > 0 {
        let before = surplus;
        for start in 0..jump {
            for i in (start..parents).step_by(jump) {
                if surplus > 0 && counts[i] > 2 {
                    counts[i] -= 1;
                    surplus -= 1;
                }
            }
        }
        if surplus == before {
            return None;
        }
    }
    Some(counts)
}

/// walk every fan-out vector in `[smallest, largest]^depth` in odometer order
/// and keep the first one whose product is the minimum at or above `trustees`
pub fn output_distribution(
    trustees: usize,
    depth: usize,
    largest: usize,
    smallest: usize,
) -> (Vec<usize>, usize) {
    let mut current = vec![smallest; depth];
    let mut best: Option<(Vec<usize>, usize)> = None;
    loop {
        let product: usize = current.iter().product();
        let better = match &best {
            None => product >= trustees,
            Some((_, p)) => product >= trustees && product < *p,
        };
        if better {
            best = Some((current.clone(), product));
        }
        // advance the odometer, last digit fastest
        let mut i = depth;
        loop {
            if i == 0 {
                return best.unwrap_or_else(|| (vec![largest; depth], largest.pow(depth as u32)));
            }
            i -= 1;
            if current[i] < largest {
                current[i] += 1;
                break;
            }
            current[i] = smallest;
        }
    }
}

/// per-trustee real share counts: everyone gets `total / trustees`, the
/// remainder goes one each to distinct random trustees. returns the counts
/// and their maximum.
pub fn share_counts(trustees: usize, total: usize) -> (Vec<usize>, usize) {
    let base = total / trustees;
    let mut counts = vec![base; trustees];
    let mut order: Vec<usize> = (0..trustees).collect();
    order.shuffle(&mut rand::thread_rng());
    for &i in order.iter().take(total % trustees) {
        counts[i] += 1;
    }
    let max = counts.iter().copied().max().unwrap_or(0);
    (counts, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        assert_eq!(levels(20, 5), 2);
        assert_eq!(levels(25, 5), 2);
        assert_eq!(levels(26, 5), 3);
        assert_eq!(levels(4, 5), 2);
    }

    #[test]
    fn test_output_distribution() {
        assert_eq!(output_distribution(20, 2, 5, 3), (vec![4, 5], 20));
        assert_eq!(output_distribution(30, 3, 5, 3), (vec![3, 3, 4], 36));
        assert_eq!(output_distribution(9, 2, 5, 3), (vec![3, 3], 9));
    }

    #[test]
    fn test_leaves_distribution() {
        assert_eq!(leaves_distribution(&[3, 4], 10, 12), Some(vec![3, 3, 4]));
        assert_eq!(
            leaves_distribution(&[3, 3, 4], 32, 36),
            Some(vec![3, 3, 4, 3, 4, 4, 3, 4, 4])
        );
        assert_eq!(leaves_distribution(&[3, 3, 4], 36, 36), Some(vec![4; 9]));
        // a second pass once every parent lost one leaf
        assert_eq!(leaves_distribution(&[2, 4], 5, 8), Some(vec![2, 3]));
        // 4 trustees cannot keep 3 parents at 2 leaves each
        assert_eq!(leaves_distribution(&[3, 3], 4, 9), None);
    }

    #[test]
    fn test_distinguishable_layout() {
        let layout = TreeLayout::distinguishable(10, 5, 3).unwrap();
        assert_eq!(layout.fanout, vec![3, 4]);
        assert_eq!(layout.leaf_fanout, vec![3, 3, 4]);
        assert_eq!(layout.leaves(), 10);
        assert_eq!(layout.split_of(0, 0), (3, 3));
        assert_eq!(layout.split_of(1, 1), (3, 3));
        assert_eq!(layout.split_of(1, 2), (4, 4));

        for trustees in [6, 26, 32, 95, 100] {
            let layout = TreeLayout::distinguishable(trustees, 5, 3).unwrap();
            assert_eq!(layout.leaves(), trustees);
            assert!(layout.leaf_fanout.iter().all(|&n| (2..=5).contains(&n)));
        }

        let flat = TreeLayout::distinguishable(4, 5, 3).unwrap();
        assert_eq!(flat.fanout, vec![4]);
        assert!(flat.leaf_fanout.is_empty());
    }

    #[test]
    fn test_layered_rejects_degenerate_range() {
        assert!(matches!(TreeLayout::layered(2, 1, 1), Err(Error::Config(_))));
        assert!(matches!(TreeLayout::layered(10, 0, 0), Err(Error::Config(_))));
        assert!(matches!(TreeLayout::layered(10, 5, 6), Err(Error::Config(_))));
        assert!(matches!(TreeLayout::distinguishable(10, 1, 1), Err(Error::Config(_))));
        assert!(matches!(TreeLayout::distinguishable(4, 3, 3), Err(Error::Config(_))));
        assert_eq!(levels(10, 1), 4);

        let params = Params { scheme: Scheme::Layered, largest: 1, smallest: 1, ..Params::default() };
        assert!(TreeLayout::for_params(&params).is_err());
    }

    #[test]
    fn test_two_layer_layout() {
        let layout = TreeLayout::for_params(&Params::default()).unwrap();
        assert_eq!(layout.fanout, vec![5, 8]);
        assert_eq!(layout.thresholds, vec![5, 4]);
        assert_eq!(layout.leaves(), 40);
        assert_eq!(layout.depth(), 2);
    }

    #[test]
    fn test_flat_layered_layout() {
        let layout = TreeLayout::layered(4, 5, 3).unwrap();
        assert_eq!(layout.fanout, vec![4]);
        assert_eq!(layout.depth(), 1);
    }

    #[test]
    fn test_share_counts() {
        let (counts, max) = share_counts(20, 40);
        assert!(counts.iter().all(|&c| c == 2));
        assert_eq!(max, 2);

        let (counts, max) = share_counts(7, 30);
        assert_eq!(counts.iter().sum::<usize>(), 30);
        assert_eq!(max, 5);
        assert_eq!(counts.iter().filter(|&&c| c == 5).count(), 2);

        let (counts, max) = share_counts(10, 4);
        assert_eq!(counts.iter().sum::<usize>(), 4);
        assert_eq!(max, 1);
    }
}
