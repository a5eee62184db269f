//! end-to-end generation and recovery scenarios

use thicket::field::{split, sum, CoordSet, Field, Gf16};
use thicket::{
    generate, recover, shuffled_order, trustees_first, Error, Params, Scheme, ShareTree,
};

#[cfg(feature = "ristretto255")]
use thicket::Ristretto;

fn all_schemes() -> [Scheme; 4] {
    [Scheme::Additive, Scheme::Thresholded, Scheme::Hinted, Scheme::Layered]
}

#[test]
fn test_additive_tree_sizes() {
    let field = Gf16::new(16);
    let secret = field.random();
    let params = Params::default();
    let mut coords = CoordSet::new();
    let tree = ShareTree::build(field.clone(), &secret, &params, &mut coords).unwrap();

    assert_eq!(tree.leaves().len(), 40);
    let root = tree.node(tree.root());
    assert_eq!(root.children.len(), 5);
    let subsecrets: Vec<Vec<u16>> = root.children.iter().map(|&c| tree.node(c).value.clone()).collect();
    assert_eq!(sum(&field, &subsecrets).unwrap(), secret);
}

#[test]
fn test_threshold_above_population_is_rejected() {
    let field = Gf16::new(16);
    let secret = field.random();
    let mut coords = CoordSet::new();
    assert_eq!(
        split(&field, &secret, 3, 5, &mut coords),
        Err(Error::InvalidThreshold { threshold: 5, parts: 3 })
    );
    assert!(coords.is_empty());

    let params = Params { trustees: 3, absolute_threshold: 5, ..Params::default() };
    assert_eq!(
        generate(&field, &params, &secret).unwrap_err(),
        Error::InvalidThreshold { threshold: 5, parts: 3 }
    );
}

#[test]
fn test_anonymity_set_is_uniform() {
    let field = Gf16::new(16);
    for scheme in all_schemes() {
        let params = Params::default().with_scheme(scheme);
        let deal = generate(&field, &params, &field.random()).unwrap();
        assert_eq!(deal.set.len(), 30, "{scheme}");
        let shape = deal.set.shape().expect("uniform packet shape");
        assert_eq!(shape.shares, deal.set.max_shares);
        for p in &deal.set.packets {
            assert_eq!(p.hashes.len(), shape.hashes);
            assert_eq!(p.markers.len(), shape.markers);
        }
    }
}

#[test]
fn test_coordinates_unique_including_decoys() {
    let field = Gf16::new(4);
    for scheme in all_schemes() {
        let params = Params::default().with_scheme(scheme);
        let deal = generate(&field, &params, &field.random()).unwrap();
        let mut xs: Vec<u64> = deal
            .set
            .packets
            .iter()
            .flat_map(|p| p.shares.iter().map(|s| s.x))
            .collect();
        let n = xs.len();
        xs.sort_unstable();
        xs.dedup();
        assert_eq!(xs.len(), n, "{scheme}");
        assert!(xs[0] > 0);
    }
}

#[test]
fn test_full_recovery_shuffled_order() {
    let field = Gf16::new(16);
    for scheme in all_schemes() {
        let params = Params::default().with_scheme(scheme);
        let secret = field.random();
        let deal = generate(&field, &params, &secret).unwrap();
        let order = shuffled_order(deal.set.len());
        let out = recover(&field, &params, &deal.set, &order).unwrap();
        assert_eq!(out.secret, secret, "{scheme}");
        assert!(out.visited <= params.anonymity_set_size());
    }
}

#[test]
fn test_no_false_positive_across_secrets() {
    let field = Gf16::new(16);
    let params = Params::default();
    let first = field.random();
    let second = field.random();
    let a = generate(&field, &params, &first).unwrap();
    let b = generate(&field, &params, &second).unwrap();

    let out = recover(&field, &params, &b.set, &shuffled_order(b.set.len())).unwrap();
    assert_eq!(out.secret, second);
    assert_ne!(out.secret, first);

    // packets of one deal never verify values of another
    let mut mixed = a.set.clone();
    for (p, q) in mixed.packets.iter_mut().zip(&b.set.packets) {
        p.shares = q.shares.clone();
    }
    let order: Vec<usize> = (0..mixed.len()).collect();
    assert_eq!(recover(&field, &params, &mixed, &order), Err(Error::SecretNotFound));
}

#[test]
fn test_trustees_first_recovers_within_trustees() {
    let field = Gf16::new(16);
    for scheme in all_schemes() {
        let params = Params::default().with_scheme(scheme);
        let secret = field.random();
        let deal = generate(&field, &params, &secret).unwrap();
        let out = recover(&field, &params, &deal.set, &trustees_first(&deal.set)).unwrap();
        assert_eq!(out.secret, secret);
        assert!(out.visited <= params.trustees, "{scheme}: {}", out.visited);
    }
}

#[test]
fn test_deep_layered_tree() {
    let field = Gf16::new(8);
    let params = Params {
        scheme: Scheme::Layered,
        trustees: 30,
        anonymity_size: 30,
        largest: 4,
        ..Params::default()
    };
    let secret = field.random();
    let deal = generate(&field, &params, &secret).unwrap();
    assert_eq!(deal.layout.fanout, vec![3, 3, 4]);
    let out = recover(&field, &params, &deal.set, &shuffled_order(deal.set.len())).unwrap();
    assert_eq!(out.secret, secret);
}

#[test]
fn test_distinguishable_layered_recovery() {
    let field = Gf16::new(8);
    let params = Params {
        scheme: Scheme::Layered,
        trustees: 32,
        anonymity_size: 36,
        largest: 4,
        distinguishable: true,
        ..Params::default()
    };
    let secret = field.random();
    let deal = generate(&field, &params, &secret).unwrap();
    assert_eq!(deal.layout.fanout, vec![3, 3, 4]);
    assert_eq!(deal.layout.leaf_fanout, vec![3, 3, 4, 3, 4, 4, 3, 4, 4]);
    assert_eq!(deal.set.max_shares, 1);

    let out = recover(&field, &params, &deal.set, &shuffled_order(deal.set.len())).unwrap();
    assert_eq!(out.secret, secret);
    // every leaf parent is full threshold, so every trustee is needed
    assert!(out.visited >= params.trustees);
    assert_eq!(out.subsecrets, 9);
}

#[test]
fn test_degenerate_fanout_is_rejected() {
    let field = Gf16::new(4);
    let params = Params {
        scheme: Scheme::Layered,
        trustees: 2,
        absolute_threshold: 2,
        largest: 1,
        smallest: 1,
        ..Params::default()
    };
    let mut coords = CoordSet::new();
    assert!(matches!(
        ShareTree::build(field.clone(), &field.random(), &params, &mut coords),
        Err(Error::Config(_))
    ));
    assert!(matches!(generate(&field, &params, &field.random()), Err(Error::Config(_))));
}

#[test]
fn test_invalid_access_order() {
    let field = Gf16::new(4);
    let params = Params::default();
    let deal = generate(&field, &params, &field.random()).unwrap();
    let mut order = shuffled_order(deal.set.len());
    order[0] = order[1];
    assert_eq!(
        recover(&field, &params, &deal.set, &order),
        Err(Error::InvalidAccessOrder { size: 30 })
    );
}

#[cfg(feature = "ristretto255")]
#[test]
fn test_ristretto_recovery() {
    let field = Ristretto;
    let params = Params {
        trustees: 8,
        anonymity_size: 10,
        absolute_threshold: 2,
        no_of_subsecrets: 3,
        ..Params::default()
    };
    for scheme in all_schemes() {
        let params = params.clone().with_scheme(scheme);
        let secret = field.random();
        let deal = generate(&field, &params, &secret).unwrap();
        let out = recover(&field, &params, &deal.set, &shuffled_order(deal.set.len())).unwrap();
        assert_eq!(out.secret, secret, "{scheme}");
    }
}
