//! Benchmarks for score propagation and path selection.
//!
//! Run with: cargo bench -p natureid-core

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use natureid_core::prediction::{classify_path, propagate, top_labels};
use natureid_core::taxonomy::tree::ROOT_INDEX;
use natureid_core::{RankLevel, RankRegistry, TaxonTree};

/// Balanced tree of `fanout` kingdoms, each `depth` levels deep, one class per leaf.
fn synthetic_tree(fanout: usize, depth: usize) -> (TaxonTree, usize) {
    let mut tree = TaxonTree::new();
    let mut next_id = 1;
    let mut next_class = 0;
    let mut frontier = vec![ROOT_INDEX];

    for level in 0..depth {
        let rank = RankLevel::new(70.0 - 10.0 * level as f64);
        let mut children = Vec::with_capacity(frontier.len() * fanout);
        for &parent in &frontier {
            for _ in 0..fanout {
                let index = tree.get_or_insert(parent, next_id, &format!("taxon {next_id}"), rank);
                next_id += 1;
                children.push(index);
            }
        }
        frontier = children;
    }
    for &leaf in &frontier {
        tree.add_leaf_class(leaf, next_class);
        next_class += 1;
    }
    (tree, next_class)
}

fn scores(len: usize) -> Vec<f32> {
    // Skewed so the walk descends all the way
    (0..len).map(|i| if i == len / 3 { 50.0 } else { 0.01 }).collect()
}

fn benchmark_propagate(c: &mut Criterion) {
    let (mut tree, classes) = synthetic_tree(10, 4);
    let scores = scores(classes);

    c.bench_function("propagate_10k_leaves", |b| {
        b.iter(|| propagate(black_box(&mut tree), black_box(&scores)))
    });
}

fn benchmark_classify_path(c: &mut Criterion) {
    let (mut tree, classes) = synthetic_tree(10, 4);
    let scores = scores(classes);
    let ranks = RankRegistry::default();

    c.bench_function("classify_path_10k_leaves", |b| {
        b.iter(|| classify_path(black_box(&mut tree), &ranks, black_box(&scores)))
    });
}

fn benchmark_top_labels(c: &mut Criterion) {
    let scores = scores(10_000);
    let names: HashMap<usize, String> = (0..10_000).map(|i| (i, format!("label {i}"))).collect();

    c.bench_function("top_labels_10k", |b| {
        b.iter(|| top_labels(black_box(&scores), 5, &names))
    });
}

criterion_group!(
    benches,
    benchmark_propagate,
    benchmark_classify_path,
    benchmark_top_labels
);
criterion_main!(benches);
