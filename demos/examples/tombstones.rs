// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tombstones.
//!
//! Remove content logically, watch it drop out of the coordinates while staying
//! addressable, then prune it.
//!
//! Run:
//! - `RUST_LOG=trellis_index_tree=trace cargo run -p trellis_demos --example tombstones`

use tracing_subscriber::EnvFilter;
use trellis_index_tree::{BasicNode, IndexTree, NodeId, TreeError, TreeNode};

fn print_texts(tree: &IndexTree<BasicNode>) {
    let mut texts = Vec::new();
    tree.traverse(|node| {
        if node.is_inline() {
            texts.push(node.data().value().to_owned());
        }
    });
    println!("  live text: {texts:?}, size {}", tree.size());
}

fn main() -> Result<(), TreeError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut tree = IndexTree::<BasicNode>::default();
    let root = tree.root();
    let p = tree.create_node(BasicNode::block("p"));
    let texts: Vec<NodeId> = ["one ", "two ", "three"]
        .into_iter()
        .map(|s| tree.create_node(BasicNode::text(s)))
        .collect();
    tree.append(root, [p])?;
    tree.append(p, texts.iter().copied())?;
    println!("Initial document:");
    print_texts(&tree);

    // Logical removal: flip the flag, then propagate.
    let two = texts[1];
    if let Some(node) = tree.data_mut(two) {
        node.set_removed(true);
    }
    tree.update_ancestors_size(two)?;
    println!("After tombstoning \"two \":");
    print_texts(&tree);
    println!(
        "  still under branch {:?} of the paragraph",
        tree.find_branch_offset(p, two)?
    );
    println!("  live offset lookup: {:?}", tree.find_offset(p, two));

    // Physical removal.
    let mut doomed = Vec::new();
    tree.traverse_all(|node| {
        if let Some(parent) = node.parent().filter(|_| node.is_removed()) {
            doomed.push((parent, node.id()));
        }
    });
    for (parent, id) in doomed {
        let value = tree.remove_child(parent, id)?;
        println!("Pruned {:?}", value.value());
    }
    println!("  handle still alive: {}", tree.is_alive(two));
    print_texts(&tree);
    Ok(())
}
