// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type shared by every tree and node operation.

use alloc::string::String;
use alloc::vec::Vec;

use thiserror::Error;

use crate::types::NodeId;

/// Precondition violations reported by [`IndexTree`](crate::IndexTree).
///
/// None of these are transient: the caller has to fix its input. They usually point at a
/// bug in the caller or in the bookkeeping that drives the tree.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    /// An index or offset is larger than the node or tree it addresses.
    #[error("index out of range: {index} > {size}")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The size it was checked against.
        size: usize,
    },

    /// A range whose start lies after its end.
    #[error("inverted range: {from} > {to}")]
    InvertedRange {
        /// Range start.
        from: usize,
        /// Range end.
        to: usize,
    },

    /// A structural operation was called on an inline node.
    #[error("inline node cannot have children: {node_type}")]
    InlineCannotHaveChildren {
        /// Type tag of the offending node.
        node_type: String,
    },

    /// The reference node is not a child of the given parent.
    #[error("reference not found")]
    ReferenceNotFound,

    /// The path does not address a position in the tree.
    #[error("invalid path: {0:?}")]
    InvalidPath(Vec<usize>),

    /// The position is not reachable from the root.
    #[error("invalid position")]
    InvalidPosition,

    /// The handle refers to a freed slot.
    #[error("dangling node id: {0:?}")]
    DanglingNode(NodeId),

    /// The node is already linked under a parent.
    #[error("node is already attached: {0:?}")]
    NodeAttached(NodeId),
}

impl TreeError {
    /// Whether the error reports an index, offset or range outside the addressed span.
    pub fn is_range_error(&self) -> bool {
        matches!(
            self,
            Self::IndexOutOfRange { .. } | Self::InvertedRange { .. }
        )
    }

    /// Whether the error reports a coordinate that does not resolve to a node.
    pub fn is_addressing_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPath(_) | Self::InvalidPosition | Self::ReferenceNotFound
        )
    }
}
