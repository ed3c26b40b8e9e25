// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Index tree basics.
//!
//! Build a small document, convert between the three coordinate systems, and split a
//! paragraph in two.
//!
//! Run:
//! - `RUST_LOG=trace cargo run -p trellis_demos --example index_tree_basics`

use tracing_subscriber::EnvFilter;
use trellis_index_tree::{BasicNode, IndexTree, TreeError, TreeNode};

fn main() -> Result<(), TreeError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // <root><p>Hello world</p><p>bye</p></root>
    let mut tree = IndexTree::<BasicNode>::default();
    let root = tree.root();
    let first = tree.create_node(BasicNode::block("p"));
    let hello = tree.create_node(BasicNode::text("Hello "));
    let world = tree.create_node(BasicNode::text("world"));
    let second = tree.create_node(BasicNode::block("p"));
    let bye = tree.create_node(BasicNode::text("bye"));
    tree.append(root, [first, second])?;
    tree.append(first, [hello, world])?;
    tree.append(second, [bye])?;
    println!("Document size: {}", tree.size());

    for index in 0..=tree.size() {
        let pos = tree.find_tree_pos(index, true)?;
        let path = tree.tree_pos_to_path(pos)?;
        let node = tree.get(pos.node).ok_or(TreeError::DanglingNode(pos.node))?;
        println!(
            "  index {index:>2} -> {:>4}[{}] path {path:?}",
            node.node_type(),
            pos.offset
        );
    }

    // Everything the range 3..10 touches.
    print!("Nodes between 3 and 10:");
    tree.nodes_between(3, 10, |node| {
        if node.is_inline() {
            print!(" {:?}", node.data().value());
        } else {
            print!(" <{}>", node.node_type());
        }
    })?;
    println!();

    // Split the first paragraph between "Hello " and "world".
    let at = tree.index_of(world)?;
    let pos = tree.split(at, 2)?;
    println!(
        "Split at {at} ({pos:?}): {} paragraphs, size {}",
        tree.get(root).map_or(0, |r| r.children().count()),
        tree.size()
    );
    println!("'world' now starts at path {:?}", tree.index_to_path(tree.index_of(world)?)?);

    let common = tree.find_common_ancestor(hello, bye)?;
    println!("Common ancestor of 'Hello ' and 'bye' is the root: {}", common == Some(root));
    Ok(())
}
