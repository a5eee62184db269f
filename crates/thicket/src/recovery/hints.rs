//! access-order rewriting driven by trustee hints

/// decides how hints reshape the part of the access order not yet visited
pub trait HintPolicy: Send + Sync {
    /// `order[..visited]` is fixed; reorder the rest given every hint seen so
    /// far, in the order they arrived
    fn reorder(&self, order: &mut [usize], visited: usize, hints: &[usize]);
}

/// hinted trustees jump the queue in the order their hints arrived. everyone
/// else keeps their relative position.
#[derive(Clone, Copy, Debug, Default)]
pub struct InsertionOrder;

impl HintPolicy for InsertionOrder {
    fn reorder(&self, order: &mut [usize], visited: usize, hints: &[usize]) {
        if visited >= order.len() {
            return;
        }
        let rest = &mut order[visited..];
        let mut front: Vec<usize> = Vec::with_capacity(rest.len());
        for h in hints {
            if rest.contains(h) && !front.contains(h) {
                front.push(*h);
            }
        }
        if front.is_empty() {
            return;
        }
        let tail = rest.iter().copied().filter(|p| !front.contains(p));
        let reordered: Vec<usize> = front.iter().copied().chain(tail).collect();
        rest.copy_from_slice(&reordered);
    }
}

/// leaves the access order alone
#[derive(Clone, Copy, Debug, Default)]
pub struct IgnoreHints;

impl HintPolicy for IgnoreHints {
    fn reorder(&self, _order: &mut [usize], _visited: usize, _hints: &[usize]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hinted_trustees_move_forward() {
        let mut order = vec![0, 1, 2, 3, 4, 5, 6];
        InsertionOrder.reorder(&mut order, 2, &[5, 3]);
        assert_eq!(order, vec![0, 1, 5, 3, 2, 4, 6]);
    }

    #[test]
    fn test_visited_hints_are_ignored() {
        let mut order = vec![4, 1, 2, 3, 0];
        InsertionOrder.reorder(&mut order, 2, &[1, 4, 0]);
        assert_eq!(order, vec![4, 1, 0, 2, 3]);
    }

    #[test]
    fn test_no_hints_no_change() {
        let mut order = vec![3, 2, 1, 0];
        InsertionOrder.reorder(&mut order, 1, &[]);
        assert_eq!(order, vec![3, 2, 1, 0]);
        IgnoreHints.reorder(&mut order, 1, &[0]);
        assert_eq!(order, vec![3, 2, 1, 0]);
    }
}
