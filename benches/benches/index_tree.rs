// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use trellis_index_tree::{BasicNode, IndexTree};

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }
}

/// A flat document of `paragraphs` blocks, each holding `runs` text nodes of 1..=16 chars.
fn gen_document(paragraphs: usize, runs: usize) -> IndexTree<BasicNode> {
    let mut tree = IndexTree::<BasicNode>::default();
    let root = tree.root();
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    for _ in 0..paragraphs {
        let p = tree.create_node(BasicNode::block("p"));
        let texts: Vec<_> = (0..runs)
            .map(|_| {
                let len = 1 + rng.below(16);
                tree.create_node(BasicNode::text("x".repeat(len)))
            })
            .collect();
        tree.append(p, texts).unwrap();
        tree.append(root, [p]).unwrap();
    }
    tree
}

/// Same as [`gen_document`], but every other run is tombstoned.
fn gen_tombstoned_document(paragraphs: usize, runs: usize) -> IndexTree<BasicNode> {
    let mut tree = gen_document(paragraphs, runs);
    let mut texts = Vec::new();
    tree.traverse(|node| {
        if node.is_inline() {
            texts.push(node.id());
        }
    });
    for id in texts.into_iter().step_by(2) {
        tree.data_mut(id).unwrap().set_removed(true);
        tree.update_ancestors_size(id).unwrap();
    }
    tree
}

fn sample_indices(tree: &IndexTree<BasicNode>, count: usize) -> Vec<usize> {
    let mut rng = Rng::new(0xBADC_F00D_1234_5678);
    (0..count).map(|_| rng.below(tree.size() + 1)).collect()
}

fn bench_find_tree_pos(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_tree_pos");
    for &n in &[64usize, 256, 1024] {
        let tree = gen_document(n, 8);
        let indices = sample_indices(&tree, 1000);
        group.throughput(Throughput::Elements(indices.len() as u64));
        group.bench_function(format!("prefer_inline_n{}", n), |b| {
            b.iter(|| {
                for &i in &indices {
                    black_box(tree.find_tree_pos(i, true).unwrap());
                }
            })
        });
        group.bench_function(format!("boundary_n{}", n), |b| {
            b.iter(|| {
                for &i in &indices {
                    black_box(tree.find_tree_pos(i, false).unwrap());
                }
            })
        });
    }
    let tree = gen_tombstoned_document(256, 8);
    let indices = sample_indices(&tree, 1000);
    group.bench_function("tombstoned_n256", |b| {
        b.iter(|| {
            for &i in &indices {
                black_box(tree.find_tree_pos(i, true).unwrap());
            }
        })
    });
    group.finish();
}

fn bench_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("paths");
    for &n in &[64usize, 256, 1024] {
        let tree = gen_document(n, 8);
        let indices = sample_indices(&tree, 1000);
        let paths: Vec<_> = indices
            .iter()
            .map(|&i| tree.index_to_path(i).unwrap())
            .collect();
        group.throughput(Throughput::Elements(indices.len() as u64));
        group.bench_function(format!("index_to_path_n{}", n), |b| {
            b.iter(|| {
                for &i in &indices {
                    black_box(tree.index_to_path(i).unwrap());
                }
            })
        });
        group.bench_function(format!("path_to_index_n{}", n), |b| {
            b.iter(|| {
                for path in &paths {
                    black_box(tree.path_to_index(path).unwrap());
                }
            })
        });
    }
    group.finish();
}

fn bench_nodes_between(c: &mut Criterion) {
    let mut group = c.benchmark_group("nodes_between");
    for &n in &[64usize, 256, 1024] {
        let tree = gen_document(n, 8);
        let mid = tree.size() / 2;
        group.bench_function(format!("quarter_range_n{}", n), |b| {
            b.iter(|| {
                let mut hits = 0_usize;
                tree.nodes_between(mid - mid / 4, mid + mid / 4, |_| hits += 1)
                    .unwrap();
                black_box(hits);
            })
        });
    }
    group.finish();
}

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split");
    for &depth in &[1usize, 2] {
        group.bench_function(format!("depth{}_x100_n256", depth), |b| {
            b.iter_batched(
                || {
                    let tree = gen_document(256, 8);
                    let indices = sample_indices(&tree, 100);
                    (tree, indices)
                },
                |(mut tree, indices)| {
                    for i in indices {
                        black_box(tree.split(i, depth).unwrap());
                    }
                    black_box(tree.size());
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_find_tree_pos,
    bench_paths,
    bench_nodes_between,
    bench_split,
);
criterion_main!(benches);
