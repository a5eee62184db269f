//! share tree construction
//!
//! the secret sits at the root (layer 0). every inner node is split into its
//! children with either an additive split or a shamir split, down to the
//! leaves that end up in trustee packets. nodes live in one arena and refer
//! to their parent by [`NodeId`].

use tracing::debug;

use crate::config::{Params, Scheme};
use crate::field::{combine, split, split_additive, sum, CoordSet, Field, Share};
use crate::layout::TreeLayout;
use crate::Result;

/// index into the tree arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Clone, Debug)]
pub struct Node<E> {
    pub value: E,
    /// coordinate in the parent's shamir split, 0 for the root and for
    /// additive terms
    pub x: u64,
    pub layer: usize,
    pub parent: Option<NodeId>,
    /// children needed to rebuild this node, 0 for leaves
    pub threshold: usize,
    pub children: Vec<NodeId>,
}

impl<E> Node<E> {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// how a layer is split into the next one
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Split {
    Additive,
    Shamir,
}

#[derive(Clone, Debug)]
pub struct ShareTree<F: Field> {
    field: F,
    layout: TreeLayout,
    nodes: Vec<Node<F::Elem>>,
    leaves: Vec<NodeId>,
}

impl<F: Field> ShareTree<F> {
    /// build the tree `params.scheme` asks for
    pub fn build(field: F, secret: &F::Elem, params: &Params, coords: &mut CoordSet) -> Result<Self> {
        let layout = TreeLayout::for_params(params)?;
        match params.scheme {
            Scheme::Additive | Scheme::Hinted => Self::grow(field, secret, layout, Split::Additive, coords),
            Scheme::Thresholded | Scheme::Layered => Self::grow(field, secret, layout, Split::Shamir, coords),
        }
    }

    /// additive upper layer over `subsecrets` terms, each shamir-split into
    /// `leaves` shares with `threshold`
    pub fn additive(
        field: F,
        secret: &F::Elem,
        subsecrets: usize,
        leaves: usize,
        threshold: usize,
        coords: &mut CoordSet,
    ) -> Result<Self> {
        let layout = TreeLayout::uniform(vec![subsecrets, leaves], vec![subsecrets, threshold]);
        Self::grow(field, secret, layout, Split::Additive, coords)
    }

    /// shamir upper layer with `upper_threshold`, leaves as in [`Self::additive`]
    pub fn thresholded(
        field: F,
        secret: &F::Elem,
        subsecrets: usize,
        upper_threshold: usize,
        leaves: usize,
        threshold: usize,
        coords: &mut CoordSet,
    ) -> Result<Self> {
        let layout = TreeLayout::uniform(vec![subsecrets, leaves], vec![upper_threshold, threshold]);
        Self::grow(field, secret, layout, Split::Shamir, coords)
    }

    /// full-threshold tree of any depth, uneven leaf parents included
    pub fn layered(field: F, secret: &F::Elem, layout: TreeLayout, coords: &mut CoordSet) -> Result<Self> {
        Self::grow(field, secret, layout, Split::Shamir, coords)
    }

    /// single shamir split of the secret over the whole population
    pub fn flat(
        field: F,
        secret: &F::Elem,
        parts: usize,
        threshold: usize,
        coords: &mut CoordSet,
    ) -> Result<Self> {
        let layout = TreeLayout::uniform(vec![parts], vec![threshold]);
        Self::grow(field, secret, layout, Split::Shamir, coords)
    }

    fn grow(
        field: F,
        secret: &F::Elem,
        layout: TreeLayout,
        top: Split,
        coords: &mut CoordSet,
    ) -> Result<Self> {
        let mut tree = Self {
            field,
            layout,
            nodes: Vec::new(),
            leaves: Vec::new(),
        };
        tree.nodes.push(Node {
            value: secret.clone(),
            x: 0,
            layer: 0,
            parent: None,
            threshold: 0,
            children: Vec::new(),
        });

        let mut frontier = vec![NodeId(0)];
        for layer in 0..tree.layout.depth() {
            let how = if layer == 0 { top } else { Split::Shamir };
            let mut next = Vec::with_capacity(frontier.len() * tree.layout.fanout[layer]);
            for (nth, &id) in frontier.iter().enumerate() {
                let (fanout, threshold) = tree.layout.split_of(layer, nth);
                let children = tree.split_node(id, fanout, threshold, how, coords)?;
                next.extend(children);
            }
            frontier = next;
        }
        tree.leaves = frontier;

        debug!(
            fanout = ?tree.layout.fanout,
            thresholds = ?tree.layout.thresholds,
            leaf_fanout = ?tree.layout.leaf_fanout,
            leaves = tree.leaves.len(),
            coords = coords.len(),
            "built share tree"
        );
        Ok(tree)
    }

    fn split_node(
        &mut self,
        id: NodeId,
        fanout: usize,
        threshold: usize,
        how: Split,
        coords: &mut CoordSet,
    ) -> Result<Vec<NodeId>> {
        let value = self.nodes[id.0].value.clone();
        let shares: Vec<Share<F::Elem>> = match how {
            Split::Additive => split_additive(&self.field, &value, fanout)?
                .into_iter()
                .map(|y| Share::new(0, y))
                .collect(),
            Split::Shamir => split(&self.field, &value, fanout, threshold, coords)?,
        };

        let layer = self.nodes[id.0].layer + 1;
        let mut ids = Vec::with_capacity(shares.len());
        for share in shares {
            let child = NodeId(self.nodes.len());
            self.nodes.push(Node {
                value: share.y,
                x: share.x,
                layer,
                parent: Some(id),
                threshold: 0,
                children: Vec::new(),
            });
            ids.push(child);
        }
        let node = &mut self.nodes[id.0];
        node.threshold = threshold;
        node.children = ids.clone();
        Ok(ids)
    }

    pub fn field(&self) -> &F {
        &self.field
    }

    pub fn layout(&self) -> &TreeLayout {
        &self.layout
    }

    /// parent chain length of every leaf
    pub fn depth(&self) -> usize {
        self.layout.depth()
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn secret(&self) -> &F::Elem {
        &self.nodes[0].value
    }

    pub fn node(&self, id: NodeId) -> &Node<F::Elem> {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn leaves(&self) -> &[NodeId] {
        &self.leaves
    }

    /// the share a trustee receives for `leaf`
    pub fn share(&self, leaf: NodeId) -> Share<F::Elem> {
        let node = self.node(leaf);
        Share::new(node.x, node.value.clone())
    }

    /// ancestors of `id`, nearest first, ending at the root
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_, F> {
        Ancestors { tree: self, next: self.node(id).parent }
    }

    /// rebuild `id` from its children: the sum of additive terms, or an
    /// interpolation over the first `threshold` shares
    pub fn rebuild(&self, id: NodeId) -> Result<F::Elem> {
        let node = self.node(id);
        let additive = node.children.iter().all(|c| self.node(*c).x == 0);
        if additive {
            let values: Vec<F::Elem> = node.children.iter().map(|c| self.node(*c).value.clone()).collect();
            return sum(&self.field, &values);
        }
        let picked = &node.children[..node.threshold.min(node.children.len())];
        let shares: Vec<Share<F::Elem>> = picked.iter().map(|c| self.share(*c)).collect();
        combine(&self.field, &shares)
    }
}

pub struct Ancestors<'a, F: Field> {
    tree: &'a ShareTree<F>,
    next: Option<NodeId>,
}

impl<F: Field> Iterator for Ancestors<'_, F> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.node(id).parent;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Gf16;

    #[test]
    fn test_additive_tree() {
        let field = Gf16::new(16);
        let secret = field.random();
        let mut coords = CoordSet::new();
        let tree = ShareTree::additive(field, &secret, 5, 8, 4, &mut coords).unwrap();

        assert_eq!(tree.leaves().len(), 40);
        assert_eq!(coords.len(), 40);
        assert_eq!(tree.depth(), 2);

        let root = tree.node(tree.root());
        let subsecrets: Vec<Vec<u16>> =
            root.children.iter().map(|c| tree.node(*c).value.clone()).collect();
        assert_eq!(sum(tree.field(), &subsecrets).unwrap(), secret);

        for &sub in &root.children {
            assert_eq!(tree.node(sub).x, 0);
            assert_eq!(tree.rebuild(sub).unwrap(), tree.node(sub).value);
        }
        assert_eq!(tree.rebuild(tree.root()).unwrap(), secret);
    }

    #[test]
    fn test_thresholded_tree() {
        let field = Gf16::new(4);
        let secret = field.random();
        let mut coords = CoordSet::new();
        let tree = ShareTree::thresholded(field, &secret, 5, 3, 8, 4, &mut coords).unwrap();

        // upper coordinates come from the same set
        assert_eq!(coords.len(), 45);
        let root = tree.node(tree.root());
        assert_eq!(root.threshold, 3);
        assert!(root.children.iter().all(|c| tree.node(*c).x != 0));
        assert_eq!(tree.rebuild(tree.root()).unwrap(), secret);
    }

    #[test]
    fn test_layered_tree_chains() {
        let field = Gf16::new(2);
        let secret = field.random();
        let mut coords = CoordSet::new();
        let layout = TreeLayout::layered(30, 5, 3).unwrap();
        let tree = ShareTree::layered(field, &secret, layout, &mut coords).unwrap();

        assert_eq!(tree.leaves().len(), 36);
        for &leaf in tree.leaves() {
            let chain: Vec<NodeId> = tree.ancestors(leaf).collect();
            assert_eq!(chain.len(), 3);
            assert_eq!(*chain.last().unwrap(), tree.root());
            assert_eq!(tree.node(leaf).layer, 3);
        }
        for id in (0..tree.len()).map(NodeId) {
            if !tree.node(id).is_leaf() {
                assert_eq!(tree.rebuild(id).unwrap(), tree.node(id).value);
            }
        }
    }

    #[test]
    fn test_distinguishable_tree_has_one_leaf_per_trustee() {
        let field = Gf16::new(2);
        let secret = field.random();
        let params = Params {
            scheme: Scheme::Layered,
            trustees: 10,
            distinguishable: true,
            ..Params::default()
        };
        let mut coords = CoordSet::new();
        let tree = ShareTree::build(field, &secret, &params, &mut coords).unwrap();

        assert_eq!(tree.leaves().len(), 10);
        let root = tree.node(tree.root());
        assert_eq!(root.children.len(), 3);
        let counts: Vec<usize> = root.children.iter().map(|&c| tree.node(c).children.len()).collect();
        assert_eq!(counts, vec![3, 3, 4]);
        for &parent in &root.children {
            let node = tree.node(parent);
            assert_eq!(node.threshold, node.children.len());
            assert_eq!(tree.rebuild(parent).unwrap(), node.value);
        }
        assert_eq!(tree.rebuild(tree.root()).unwrap(), secret);
    }

    #[test]
    fn test_build_rejects_degenerate_fanout() {
        let field = Gf16::new(2);
        let secret = field.random();
        let params = Params { scheme: Scheme::Layered, trustees: 2, largest: 1, smallest: 1, ..Params::default() };
        let err = ShareTree::build(field, &secret, &params, &mut CoordSet::new()).unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_flat_split() {
        let field = Gf16::new(8);
        let secret = field.random();
        let mut coords = CoordSet::new();
        let tree = ShareTree::flat(field, &secret, 10, 4, &mut coords).unwrap();
        assert_eq!(tree.leaves().len(), 10);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.rebuild(tree.root()).unwrap(), secret);
    }

    #[test]
    fn test_threshold_above_parts() {
        let field = Gf16::new(2);
        let secret = field.random();
        let mut coords = CoordSet::new();
        let err = ShareTree::flat(field, &secret, 3, 5, &mut coords).unwrap_err();
        assert_eq!(err, crate::Error::InvalidThreshold { threshold: 5, parts: 3 });
        assert!(coords.is_empty());
    }
}
