//! Error types
//!
//! Every failure in this crate is a local precondition violation: a
//! malformed tree, a query about a node that was never ordered, a handle
//! that is no longer live, or a sequence whose label space cannot be
//! recovered. None of them are retried internally.

use thiserror::Error;

use crate::dag::DagNodeId;
use crate::sp::NodeId;

/// Ways in which a caller-supplied SP tree can be malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
  #[error("the tree has no nodes")]
  EmptyTree,

  #[error("root `{root}` is not a node of the tree")]
  UnknownRoot { root: String },

  #[error("root `{root}` is the child of another node")]
  RootHasParent { root: String },

  #[error("node `{node}` is declared more than once")]
  DuplicateNode { node: String },

  #[error("node `{node}` has {found} children; expected 0 for a leaf or 2 otherwise")]
  BadChildCount { node: String, found: usize },

  #[error("node `{node}` names a child `{child}` that does not exist")]
  UnknownChild { node: String, child: String },

  #[error("node `{child}` has more than one parent")]
  SharedChild { child: String },

  #[error("node `{node}` lies on a cycle")]
  Cycle { node: String },

  #[error("node `{node}` is not reachable from the root")]
  Detached { node: String },

  #[error("internal node `{node}` carries an operation or variable")]
  InternalAccess { node: String },

  #[error("leaf `{node}` has an operation without a variable or vice versa")]
  IncompleteAccess { node: String },
}

/// The crate-wide error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("malformed SP tree: {0}")]
  Structural(#[from] StructuralError),

  #[error("node {0} has no position in the happens-before orders")]
  UnknownNode(NodeId),

  #[error("slot {index}:{generation} is not live in this sequence")]
  StaleSlot { index: u32, generation: u32 },

  #[error("label space exhausted for a sequence of {len} slots")]
  LabelSpaceExhausted { len: usize },

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("dag node {0} does not exist")]
  UnknownDagNode(DagNodeId),

  #[error("happens-before graph has a cycle through {0}")]
  DagCycle(DagNodeId),
}

pub type Result<T> = std::result::Result<T, Error>;
