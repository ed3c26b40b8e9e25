// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node capability, read views, and node-level structural operations.

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::TreeError;
use crate::tree::{IndexTree, Slot};
use crate::types::{BLOCK_PADDING_SIZE, DEFAULT_INLINE_TYPE, NodeId};

/// Capability a concrete node kind supplies to the tree.
///
/// The tree owns structure and sizes; the node owns its type tag, its content and its
/// tombstone flag.
pub trait TreeNode: Sized {
    /// The node's type tag.
    fn node_type(&self) -> &str;

    /// Whether this is an inline (content leaf) node.
    ///
    /// By default a node is inline exactly when its tag is [`DEFAULT_INLINE_TYPE`].
    fn is_inline(&self) -> bool {
        self.node_type() == DEFAULT_INLINE_TYPE
    }

    /// Whether the node is tombstoned.
    ///
    /// The flag belongs to the layer above the tree. After changing it, call
    /// [`IndexTree::update_ancestors_size`] so that the node stops (or starts) counting.
    fn is_removed(&self) -> bool;

    /// Content of an inline node.
    fn value(&self) -> &str;

    /// Replace the content of an inline node.
    fn set_value(&mut self, value: String);

    /// Length of the content in address units. Defaults to the number of `char`s.
    fn content_len(&self) -> usize {
        self.value().chars().count()
    }

    /// A new node of the same kind that will receive everything from `offset` on
    /// when this node is split. It must not carry children or content of its own.
    fn clone_at(&self, offset: usize) -> Self;
}

/// A plain node: a type tag, text content and a tombstone flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicNode {
    node_type: String,
    value: String,
    removed: bool,
}

impl BasicNode {
    /// A node with the given type tag and no content.
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            value: String::new(),
            removed: false,
        }
    }

    /// A block node of the given type.
    pub fn block(node_type: impl Into<String>) -> Self {
        Self::new(node_type)
    }

    /// An inline text node holding `value`.
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::new(DEFAULT_INLINE_TYPE)
        }
    }

    /// Set or clear the tombstone flag.
    pub fn set_removed(&mut self, removed: bool) {
        self.removed = removed;
    }
}

impl TreeNode for BasicNode {
    fn node_type(&self) -> &str {
        &self.node_type
    }

    fn is_removed(&self) -> bool {
        self.removed
    }

    fn value(&self) -> &str {
        &self.value
    }

    fn set_value(&mut self, value: String) {
        self.value = value;
    }

    fn clone_at(&self, _offset: usize) -> Self {
        Self {
            node_type: self.node_type.clone(),
            value: String::new(),
            removed: self.removed,
        }
    }
}

/// Borrowed view of a node in an [`IndexTree`].
pub struct NodeRef<'a, T> {
    tree: &'a IndexTree<T>,
    id: NodeId,
    slot: &'a Slot<T>,
}

impl<T> Clone for NodeRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeRef<'_, T> {}

impl<T: core::fmt::Debug> core::fmt::Debug for NodeRef<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("size", &self.slot.size)
            .field("parent", &self.slot.parent)
            .field("data", &self.slot.data)
            .finish_non_exhaustive()
    }
}

impl<'a, T: TreeNode> NodeRef<'a, T> {
    pub(crate) fn new(tree: &'a IndexTree<T>, id: NodeId, slot: &'a Slot<T>) -> Self {
        Self { tree, id, slot }
    }

    /// The node's handle.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The concrete node value.
    pub fn data(&self) -> &'a T {
        &self.slot.data
    }

    /// The node's type tag.
    pub fn node_type(&self) -> &'a str {
        self.slot.data.node_type()
    }

    /// Whether this is an inline node.
    pub fn is_inline(&self) -> bool {
        self.slot.data.is_inline()
    }

    /// Whether the node is tombstoned.
    pub fn is_removed(&self) -> bool {
        self.slot.data.is_removed()
    }

    /// Cached count of descendant positions, excluding the node's own padding.
    pub fn size(&self) -> usize {
        self.slot.size
    }

    /// Size as seen by the parent: `size` plus the open and close tokens of a block.
    pub fn padded_size(&self) -> usize {
        padded(self.slot)
    }

    /// The parent, if linked.
    pub fn parent(&self) -> Option<NodeId> {
        self.slot.parent
    }

    /// Live children, in order. Tombstoned children are skipped.
    pub fn children(self) -> impl Iterator<Item = NodeId> + 'a {
        let tree = self.tree;
        self.slot
            .children
            .iter()
            .copied()
            .filter(move |&child| !tree.is_removed_of(child))
    }

    /// Every linked child, tombstones included.
    pub fn raw_children(&self) -> &'a [NodeId] {
        &self.slot.children
    }

    /// Whether any live child is inline.
    pub fn has_inline_child(&self) -> bool {
        self.tree.has_inline_child_of(self.id)
    }
}

fn padded<T: TreeNode>(slot: &Slot<T>) -> usize {
    if slot.data.is_inline() {
        slot.size
    } else {
        slot.size + BLOCK_PADDING_SIZE
    }
}

/// Byte position of the `offset`-th char of `value`, or its length past the end.
fn char_boundary(value: &str, offset: usize) -> usize {
    value
        .char_indices()
        .nth(offset)
        .map_or(value.len(), |(at, _)| at)
}

impl<T: TreeNode> IndexTree<T> {
    /// Propagate the node's padded size to every ancestor.
    ///
    /// Adds it when the node is live and subtracts it when the node is tombstoned. Call
    /// this exactly once after flipping the tombstone flag. This does not detach the
    /// node; see [`IndexTree::remove_child`] for that.
    pub fn update_ancestors_size(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.checked(id)?;
        let amount = self.padded_size_of(id);
        self.adjust_ancestors(id, amount, !self.is_removed_of(id));
        Ok(())
    }

    /// Whether `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        if ancestor == node || !self.is_alive(ancestor) {
            return false;
        }
        let mut parent = self.checked(node).ok().and_then(|slot| slot.parent);
        while let Some(p) = parent {
            if p == ancestor {
                return true;
            }
            parent = self.slot(p).parent;
        }
        false
    }

    /// The next live sibling of `id`, if any.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.checked(id).ok()?.parent?;
        let siblings = &self.slot(parent).children;
        let at = siblings.iter().position(|&c| c == id)?;
        siblings[at + 1..]
            .iter()
            .copied()
            .find(|&c| !self.is_removed_of(c))
    }

    /// Split `id` at `offset` and return the new right-hand node.
    ///
    /// An inline node is split by content; splitting at `0` or at its size is a no-op
    /// and returns `None`. A block node is split by live children: it keeps the first
    /// `offset` of them and a fresh sibling takes the rest.
    pub fn split_node(&mut self, id: NodeId, offset: usize) -> Result<Option<NodeId>, TreeError> {
        self.checked(id)?;
        if self.is_inline_of(id) {
            self.split_inline(id, offset)
        } else {
            self.split_block(id, offset).map(Some)
        }
    }

    /// Append `nodes` after the existing children of `parent`.
    pub fn append(
        &mut self,
        parent: NodeId,
        nodes: impl IntoIterator<Item = NodeId>,
    ) -> Result<(), TreeError> {
        let nodes = self.ensure_linkable_all(parent, nodes)?;
        let at = self.slot(parent).children.len();
        self.link_all(parent, at, &nodes);
        Ok(())
    }

    /// Insert `nodes` before the existing children of `parent`.
    pub fn prepend(
        &mut self,
        parent: NodeId,
        nodes: impl IntoIterator<Item = NodeId>,
    ) -> Result<(), TreeError> {
        let nodes = self.ensure_linkable_all(parent, nodes)?;
        self.link_all(parent, 0, &nodes);
        Ok(())
    }

    /// Insert `node` right before `reference`, a child of `parent`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: NodeId,
    ) -> Result<(), TreeError> {
        self.ensure_linkable(parent, node)?;
        let at = self.raw_offset(parent, reference)?;
        self.link_all(parent, at, &[node]);
        Ok(())
    }

    /// Insert `node` right after `reference`, a child of `parent`.
    pub fn insert_after(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: NodeId,
    ) -> Result<(), TreeError> {
        self.ensure_linkable(parent, node)?;
        let at = self.raw_offset(parent, reference)?;
        self.link_all(parent, at + 1, &[node]);
        Ok(())
    }

    /// Insert `node` at `offset` among all children of `parent`, tombstones included.
    pub fn insert_at(&mut self, parent: NodeId, node: NodeId, offset: usize) -> Result<(), TreeError> {
        self.ensure_linkable(parent, node)?;
        let size = self.slot(parent).children.len();
        if offset > size {
            return Err(TreeError::IndexOutOfRange {
                index: offset,
                size,
            });
        }
        self.link_all(parent, offset, &[node]);
        Ok(())
    }

    /// Detach `child` from `parent` and free its subtree, returning the child's value.
    ///
    /// Sizes are left alone: a child is expected to be tombstoned (and its removal
    /// propagated with [`IndexTree::update_ancestors_size`]) before it is pruned.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<T, TreeError> {
        self.ensure_block(parent)?;
        self.checked(child)?;
        let at = self.raw_offset(parent, child)?;

        self.slot_mut(parent).children.remove(at);
        self.slot_mut(child).parent = None;
        tracing::trace!(?parent, ?child, "remove_child");
        Ok(self.free_subtree(child))
    }

    /// Offset of `node` among the live children of `parent`.
    pub fn find_offset(&self, parent: NodeId, node: NodeId) -> Result<usize, TreeError> {
        self.ensure_block(parent)?;
        self.live_offset(parent, node)
            .ok_or(TreeError::ReferenceNotFound)
    }

    /// Offset, among all children of `parent`, of the child whose subtree holds `node`.
    ///
    /// Tombstoned children count, so positions inside removed subtrees still resolve.
    /// Returns `None` when `node` does not descend from `parent`.
    pub fn find_branch_offset(&self, parent: NodeId, node: NodeId) -> Result<Option<usize>, TreeError> {
        self.ensure_block(parent)?;
        let children = &self.slot(parent).children;

        let mut current = self.checked(node).ok().map(|_| node);
        while let Some(c) = current {
            if let Some(at) = children.iter().position(|&child| child == c) {
                return Ok(Some(at));
            }
            current = self.slot(c).parent;
        }
        Ok(None)
    }

    /// Replace the content of a node, keeping the cached sizes in step.
    pub fn set_value(&mut self, id: NodeId, value: String) -> Result<(), TreeError> {
        let slot = self.checked_mut(id)?;
        slot.data.set_value(value);
        if !slot.data.is_inline() {
            return Ok(());
        }

        let old = slot.size;
        let new = slot.data.content_len();
        slot.size = new;
        if !slot.data.is_removed() {
            if new > old {
                self.adjust_ancestors(id, new - old, true);
            } else {
                self.adjust_ancestors(id, old - new, false);
            }
        }
        Ok(())
    }

    // --- internals ---

    pub(crate) fn is_inline_of(&self, id: NodeId) -> bool {
        self.slot(id).data.is_inline()
    }

    pub(crate) fn is_removed_of(&self, id: NodeId) -> bool {
        self.slot(id).data.is_removed()
    }

    pub(crate) fn size_of(&self, id: NodeId) -> usize {
        self.slot(id).size
    }

    pub(crate) fn padded_size_of(&self, id: NodeId) -> usize {
        padded(self.slot(id))
    }

    pub(crate) fn live_children(&self, id: NodeId) -> Vec<NodeId> {
        self.slot(id)
            .children
            .iter()
            .copied()
            .filter(|&child| !self.is_removed_of(child))
            .collect()
    }

    pub(crate) fn has_inline_child_of(&self, id: NodeId) -> bool {
        self.slot(id)
            .children
            .iter()
            .any(|&child| !self.is_removed_of(child) && self.is_inline_of(child))
    }

    pub(crate) fn live_offset(&self, parent: NodeId, node: NodeId) -> Option<usize> {
        self.live_children(parent).iter().position(|&c| c == node)
    }

    fn split_inline(&mut self, id: NodeId, offset: usize) -> Result<Option<NodeId>, TreeError> {
        let size = self.size_of(id);
        if offset == 0 || offset == size {
            return Ok(None);
        }
        if offset > size {
            return Err(TreeError::IndexOutOfRange {
                index: offset,
                size,
            });
        }
        let parent = self.slot(id).parent.ok_or(TreeError::InvalidPosition)?;

        let slot = self.slot_mut(id);
        let at = char_boundary(slot.data.value(), offset);
        let right_value = slot.data.value()[at..].to_owned();
        let left_value = slot.data.value()[..at].to_owned();
        let mut right = slot.data.clone_at(offset);
        slot.data.set_value(left_value);
        slot.size = slot.data.content_len();
        right.set_value(right_value);

        // The total span is unchanged, so ancestors keep their sizes.
        let right_id = self.create_node(right);
        let at = self.raw_offset(parent, id)?;
        self.link(parent, at + 1, right_id);
        tracing::trace!(node = ?id, offset, right = ?right_id, "split_inline");
        Ok(Some(right_id))
    }

    fn split_block(&mut self, id: NodeId, offset: usize) -> Result<NodeId, TreeError> {
        let parent = self.slot(id).parent.ok_or(TreeError::InvalidPosition)?;
        let live = self.live_children(id);
        if offset > live.len() {
            return Err(TreeError::IndexOutOfRange {
                index: offset,
                size: live.len(),
            });
        }

        let clone = self.slot(id).data.clone_at(offset);
        let clone_id = self.create_node(clone);
        let at = self.raw_offset(parent, id)?;
        self.link(parent, at + 1, clone_id);
        // The clone is still empty: this only adds its padding.
        self.count_linked(clone_id);

        // Tombstones in front of the first moved child stay on the left.
        let split_at = match live.get(offset) {
            Some(first) => self.raw_offset(id, *first)?,
            None => self.slot(id).children.len(),
        };
        let right = self.slot_mut(id).children.split_off(split_at);
        for &child in &right {
            self.slot_mut(child).parent = Some(clone_id);
        }
        self.slot_mut(clone_id).children = right;

        let left_size = self.live_padded_sum(id);
        self.slot_mut(id).size = left_size;
        let right_size = self.live_padded_sum(clone_id);
        self.slot_mut(clone_id).size = right_size;

        tracing::trace!(node = ?id, offset, right = ?clone_id, "split_block");
        Ok(clone_id)
    }

    fn live_padded_sum(&self, id: NodeId) -> usize {
        self.live_children(id)
            .into_iter()
            .map(|child| self.padded_size_of(child))
            .sum()
    }

    fn ensure_block(&self, id: NodeId) -> Result<(), TreeError> {
        let slot = self.checked(id)?;
        if slot.data.is_inline() {
            return Err(TreeError::InlineCannotHaveChildren {
                node_type: slot.data.node_type().to_owned(),
            });
        }
        Ok(())
    }

    /// `node` may be linked under `parent`: it is live, detached, not the root and not
    /// an ancestor of `parent`.
    fn ensure_linkable(&self, parent: NodeId, node: NodeId) -> Result<(), TreeError> {
        self.ensure_block(parent)?;
        let slot = self.checked(node)?;
        if slot.parent.is_some() || node == self.root() {
            return Err(TreeError::NodeAttached(node));
        }
        if node == parent || self.is_ancestor_of(node, parent) {
            return Err(TreeError::InvalidPosition);
        }
        Ok(())
    }

    fn ensure_linkable_all(
        &self,
        parent: NodeId,
        nodes: impl IntoIterator<Item = NodeId>,
    ) -> Result<Vec<NodeId>, TreeError> {
        self.ensure_block(parent)?;
        let nodes: Vec<NodeId> = nodes.into_iter().collect();
        for (i, &node) in nodes.iter().enumerate() {
            self.ensure_linkable(parent, node)?;
            if nodes[..i].contains(&node) {
                return Err(TreeError::NodeAttached(node));
            }
        }
        Ok(nodes)
    }

    /// Position of `child` among all children of `parent`.
    fn raw_offset(&self, parent: NodeId, child: NodeId) -> Result<usize, TreeError> {
        self.ensure_block(parent)?;
        self.slot(parent)
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(TreeError::ReferenceNotFound)
    }

    /// Link `nodes` at raw offset `at` and count each of them in the ancestors.
    fn link_all(&mut self, parent: NodeId, at: usize, nodes: &[NodeId]) {
        for (i, &node) in nodes.iter().enumerate() {
            self.link(parent, at + i, node);
            self.count_linked(node);
        }
    }

    /// Link without touching sizes.
    fn link(&mut self, parent: NodeId, at: usize, node: NodeId) {
        self.slot_mut(parent).children.insert(at, node);
        self.slot_mut(node).parent = Some(parent);
    }

    /// Add a newly linked node to its ancestors' sizes, unless it is tombstoned.
    fn count_linked(&mut self, id: NodeId) {
        if !self.is_removed_of(id) {
            let amount = self.padded_size_of(id);
            self.adjust_ancestors(id, amount, true);
        }
    }

    /// Grow or shrink every ancestor of `id` by `amount`.
    ///
    /// Stops after a tombstoned ancestor: it no longer counts in its own parent, so
    /// nothing above it sees the change.
    fn adjust_ancestors(&mut self, id: NodeId, amount: usize, grow: bool) {
        let mut parent = self.slot(id).parent;
        while let Some(p) = parent {
            let slot = self.slot_mut(p);
            if grow {
                slot.size += amount;
            } else {
                debug_assert!(slot.size >= amount, "ancestor size underflow");
                slot.size = slot.size.saturating_sub(amount);
            }
            parent = if slot.data.is_removed() {
                None
            } else {
                slot.parent
            };
        }
    }
}
