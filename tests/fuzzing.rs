// only run this test if the "fuzzing" feature is enabled
// this test takes a while to run so we don't want it run by default CI
// we only manually run it:
// $ cargo test --features fuzzing --test fuzzing -- --nocapture
#![cfg(feature = "fuzzing")]

//! Fuzz testing strategy:
//!
//! - Build two random qubes, each the union of a handful of random paths
//!   through a small fixed set of keys, drawn from a small values pool so
//!   that overlaps between the two qubes are common.
//!
//! - Check that the set algebra agrees with a leaf-set ground truth: convert
//!   both qubes to their expanded leaf identifiers (plain sets of key/value
//!   maps) and check each operation against the corresponding operation on
//!   those sets, across many random pairs.
//!
//! - Also check idempotence and compression stability: compressing an
//!   already-compressed qube changes nothing, and repeated identical unions
//!   reach a fixed point.

use {
    qubed_rs::{construct::NodeSpec, set_ops, Qube},
    rand::Rng,
    random_string::{charsets::ALPHANUMERIC, generate},
    std::collections::BTreeSet,
};

const KEYS: [&str; 3] = ["class", "stream", "level"];

fn rand_pool<R: Rng>(rng: &mut R, size: usize) -> Vec<String> {
    (0..size).map(|_| generate(rng.gen_range(1..=4), ALPHANUMERIC)).collect()
}

fn rand_qube<R: Rng>(rng: &mut R, pool: &[Vec<String>], n_paths: usize) -> Qube {
    let mut acc = Qube::empty().unwrap();
    for _ in 0..n_paths {
        let specs: Vec<NodeSpec> = KEYS
            .iter()
            .zip(pool)
            .map(|(key, values)| {
                let v = &values[rng.gen_range(0..values.len())];
                NodeSpec::new(*key, [v.clone()])
            })
            .collect();
        let path = Qube::from_nodes(specs).unwrap();
        acc = (&acc | &path).compress().unwrap();
    }
    acc
}

fn leaf_set(q: &Qube) -> BTreeSet<qubed_rs::iter::Identifier> {
    q.leaves().into_iter().collect()
}

#[test]
fn fuzzing() {
    let mut rng = rand::thread_rng();
    let pool: Vec<Vec<String>> = KEYS.iter().map(|_| rand_pool(&mut rng, 4)).collect();

    for trial in 0..100 {
        let a = rand_qube(&mut rng, &pool, rng.gen_range(1..=6));
        let b = rand_qube(&mut rng, &pool, rng.gen_range(1..=6));

        let set_a = leaf_set(&a);
        let set_b = leaf_set(&b);

        let union = (&a | &b).compress().unwrap();
        let inter = (&a & &b).compress().unwrap();
        let diff = (&a - &b).compress().unwrap();
        let symdiff_root = set_ops::apply(a.root(), b.root(), set_ops::SYMMETRIC_DIFFERENCE).unwrap();
        let symdiff = Qube::from_node(symdiff_root).compress().unwrap();

        assert_eq!(
            leaf_set(&union),
            set_a.union(&set_b).cloned().collect(),
            "trial {trial}: union mismatch"
        );
        assert_eq!(
            leaf_set(&inter),
            set_a.intersection(&set_b).cloned().collect(),
            "trial {trial}: intersection mismatch"
        );
        assert_eq!(
            leaf_set(&diff),
            set_a.difference(&set_b).cloned().collect(),
            "trial {trial}: difference mismatch"
        );
        assert_eq!(
            leaf_set(&symdiff),
            set_a.symmetric_difference(&set_b).cloned().collect(),
            "trial {trial}: symmetric difference mismatch"
        );

        // idempotence
        let a_again = (&a | &a).compress().unwrap();
        assert_eq!(leaf_set(&a_again), set_a, "trial {trial}: union with self changed leaves");

        // compression is a fixed point
        let twice = a.compress().unwrap().compress().unwrap();
        assert_eq!(twice.root().hash(), a.compress().unwrap().root().hash());
    }
}
