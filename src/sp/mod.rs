//! Series-parallel parse trees
//!
//! A fork-join computation is described by a binary tree whose internal
//! nodes compose two sub-computations either in series (left runs before
//! right) or in parallel (left and right may interleave), and whose
//! leaves are the events of the computation. An event is a read or write
//! of a named variable, or a silent step with no access at all.
//!
//! `SpTree` is the validated, read-only form of such a tree. It is built
//! either with `SpTreeBuilder` or from a list of named `NodeSpec`s, the
//! shape in which external tree providers hand trees over.
//!
//! `SpOrderBuilder` walks a tree once and places every node in two
//! order-maintenance sequences, the English and the Hebrew order. A node
//! happens before another exactly when it comes first in both, which is
//! what `HappensBefore` answers. The construction is the SP-order
//! algorithm of Bender, Fineman, Gilbert and Leiserson, "On-the-fly
//! maintenance of series-parallel relationships in fork-join
//! multithreaded programs" (SPAA 2004).

mod order;
mod tree;

pub use self::order::{HappensBefore, SpOrderBuilder};
pub use self::tree::{NodeSpec, SpTree, SpTreeBuilder};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a node of an `SpTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
  pub fn index(self) -> usize {
    self.0
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "n{}", self.0)
  }
}

/// Identifies an event. Assigned in construction order and carried over
/// unchanged when a tree is converted into a DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub u32);

impl fmt::Display for EventId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "e{}", self.0)
  }
}

/// The kind of memory operation an event performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Op {
  #[serde(alias = "R", alias = "read")]
  Read,
  #[serde(alias = "W", alias = "write")]
  Write,
}

/// A read or write of a variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Access {
  pub op: Op,
  pub var: String,
}

impl Access {
  pub fn read(var: &str) -> Self {
    Self {
      op: Op::Read,
      var: var.to_string(),
    }
  }

  pub fn write(var: &str) -> Self {
    Self {
      op: Op::Write,
      var: var.to_string(),
    }
  }

  /// Two accesses conflict when they touch the same variable and at
  /// least one of them writes it.
  pub fn conflicts_with(&self, other: &Access) -> bool {
    self.var == other.var && (self.op == Op::Write || other.op == Op::Write)
  }
}

/// A leaf of an SP tree. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
  id: EventId,
  access: Option<Access>,
}

impl Event {
  pub fn new(id: EventId, access: Option<Access>) -> Self {
    Self {
      id: id,
      access: access,
    }
  }

  pub fn id(&self) -> EventId {
    self.id
  }

  /// The memory access, or `None` for a silent step.
  pub fn access(&self) -> Option<&Access> {
    self.access.as_ref()
  }
}

/// Node kinds as named by tree providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
  Series,
  Parallel,
  Leaf,
}

/// The shape of a node: a composition of two children or an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
  Series(NodeId, NodeId),
  Parallel(NodeId, NodeId),
  Leaf(Event),
}

impl NodeKind {
  pub fn kind(&self) -> Kind {
    match *self {
      NodeKind::Series(..) => Kind::Series,
      NodeKind::Parallel(..) => Kind::Parallel,
      NodeKind::Leaf(_) => Kind::Leaf,
    }
  }

  /// Returns `(left, right)` for internal nodes.
  pub fn children(&self) -> Option<(NodeId, NodeId)> {
    match *self {
      NodeKind::Series(l, r) | NodeKind::Parallel(l, r) => Some((l, r)),
      NodeKind::Leaf(_) => None,
    }
  }
}

/// A named node of an SP tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpNode {
  name: String,
  kind: NodeKind,
}

impl SpNode {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn kind(&self) -> &NodeKind {
    &self.kind
  }

  pub fn event(&self) -> Option<&Event> {
    match self.kind {
      NodeKind::Leaf(ref e) => Some(e),
      _ => None,
    }
  }
}


#[cfg(test)]
mod sp_tests {
  use crate::config::OrderConfig;
  use crate::error::{Error, StructuralError};
  use crate::sequence::{NaiveSequence, OrderedSequence, Sequence};
  use crate::testing::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use super::*;

  /// Left-deep chain of `n` writes, composed in series or in parallel.
  fn chain(n: usize, parallel: bool) -> (SpTree, Vec<NodeId>) {
    let mut b = SpTreeBuilder::new();
    let mut leaves = Vec::new();
    let mut acc = b.leaf("e0", Op::Write, "x");
    leaves.push(acc);
    for i in 1..n {
      let leaf = b.leaf(&format!("e{}", i), Op::Write, "x");
      leaves.push(leaf);
      let name = format!("c{}", i);
      acc = if parallel { b.parallel(&name, acc, leaf) } else { b.series(&name, acc, leaf) };
    }
    (b.finish(acc).unwrap(), leaves)
  }

  fn test_series_chain_is_total<S: Sequence<NodeId>>() {
    let (tree, leaves) = chain(12, false);
    let hb = HappensBefore::<S>::build_with(&tree, &OrderConfig::default()).unwrap();

    for i in 0..leaves.len() {
      for j in 0..leaves.len() {
        assert_eq!(hb.precedes(leaves[i], leaves[j]).unwrap(), i < j);
      }
    }
  }

  fn test_parallel_chain_is_unordered<S: Sequence<NodeId>>() {
    let (tree, leaves) = chain(12, true);
    let hb = HappensBefore::<S>::build_with(&tree, &OrderConfig::default()).unwrap();

    for i in 0..leaves.len() {
      for j in 0..leaves.len() {
        assert!(!hb.precedes(leaves[i], leaves[j]).unwrap());
        if i != j {
          assert!(hb.concurrent(leaves[i], leaves[j]).unwrap());
        }
      }
    }
  }

  fn test_orders_match_structure<S: Sequence<NodeId>>(seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..20 {
      let tree = random_tree(&mut rng, 24, &["x", "y"], 0.4, 0.5);
      let hb = HappensBefore::<S>::build_with(&tree, &OrderConfig::default()).unwrap();
      let leaves: Vec<NodeId> = tree.leaves().map(|(id, _)| id).collect();

      for &u in leaves.iter() {
        for &v in leaves.iter() {
          assert_eq!(hb.precedes(u, v).unwrap(), series_precedes(&tree, u, v),
                     "{:?} vs {:?}", tree.name(u), tree.name(v));
        }
      }
    }
  }

  #[test]
  fn ordered_series_chain_is_total() {
    test_series_chain_is_total::<OrderedSequence<NodeId>>();
  }

  #[test]
  fn naive_series_chain_is_total() {
    test_series_chain_is_total::<NaiveSequence<NodeId>>();
  }

  #[test]
  fn ordered_parallel_chain_is_unordered() {
    test_parallel_chain_is_unordered::<OrderedSequence<NodeId>>();
  }

  #[test]
  fn naive_parallel_chain_is_unordered() {
    test_parallel_chain_is_unordered::<NaiveSequence<NodeId>>();
  }

  #[test]
  fn ordered_orders_match_structure() {
    test_orders_match_structure::<OrderedSequence<NodeId>>(11);
  }

  #[test]
  fn naive_orders_match_structure() {
    test_orders_match_structure::<NaiveSequence<NodeId>>(12);
  }

  #[test]
  fn english_and_hebrew_disagree_only_under_parallel() {
    let mut b = SpTreeBuilder::new();
    let a = b.leaf("a", Op::Read, "x");
    let c = b.leaf("c", Op::Read, "x");
    let s = b.series("S", a, c);
    let d = b.leaf("d", Op::Read, "x");
    let e = b.leaf("e", Op::Read, "x");
    let p = b.parallel("P", d, e);
    let root = b.series("root", s, p);
    let tree = b.finish(root).unwrap();
    let hb = HappensBefore::build(&tree, &OrderConfig::default()).unwrap();

    let eng = |x| hb.english_slot(x).unwrap();
    let heb = |x| hb.hebrew_slot(x).unwrap();

    assert!(hb.english().precedes(eng(a), eng(c)).unwrap());
    assert!(hb.hebrew().precedes(heb(a), heb(c)).unwrap());

    assert!(hb.english().precedes(eng(d), eng(e)).unwrap());
    assert!(hb.hebrew().precedes(heb(e), heb(d)).unwrap());

    assert!(hb.precedes(a, d).unwrap());
    assert!(hb.precedes(c, e).unwrap());
    assert!(hb.concurrent(d, e).unwrap());
    assert_eq!(hb.english().len(), 7);
    assert_eq!(hb.hebrew().len(), 7);
  }

  #[test]
  fn single_leaf_tree() {
    let mut b = SpTreeBuilder::new();
    let only = b.silent_leaf("only");
    let tree = b.finish(only).unwrap();
    let hb = HappensBefore::build(&tree, &OrderConfig::default()).unwrap();

    assert!(!hb.precedes(only, only).unwrap());
    assert_eq!(hb.english().len(), 1);
  }

  #[test]
  fn unknown_nodes_fail_loudly() {
    let (tree, leaves) = chain(3, false);
    let hb = HappensBefore::build(&tree, &OrderConfig::default()).unwrap();
    let bogus = NodeId(tree.len() + 5);

    assert_eq!(hb.precedes(leaves[0], bogus), Err(Error::UnknownNode(bogus)));
    assert_eq!(hb.precedes(bogus, leaves[0]), Err(Error::UnknownNode(bogus)));
    assert_eq!(hb.english_slot(bogus), Err(Error::UnknownNode(bogus)));
  }

  #[test]
  fn small_gaps_still_build_correct_orders() {
    let (tree, leaves) = chain(200, false);
    let config = OrderConfig::default().with_initial_gap(2).with_block_size(2);
    let hb = HappensBefore::build(&tree, &config).unwrap();

    assert!(hb.english().stats().relabels > 0);
    hb.english().check_labels().unwrap();
    hb.hebrew().check_labels().unwrap();
    for w in leaves.windows(2) {
      assert!(hb.precedes(w[0], w[1]).unwrap());
    }
  }

  #[test]
  fn builder_rejects_shared_children() {
    let mut b = SpTreeBuilder::new();
    let a = b.leaf("a", Op::Read, "x");
    let s = b.series("S", a, a);
    assert_eq!(b.finish(s), Err(Error::Structural(StructuralError::SharedChild {
      child: "a".to_string(),
    })));
  }

  #[test]
  fn builder_rejects_detached_nodes() {
    let mut b = SpTreeBuilder::new();
    let a = b.leaf("a", Op::Read, "x");
    let c = b.leaf("c", Op::Read, "x");
    let _stray = b.silent_leaf("stray");
    let s = b.series("S", a, c);
    assert_eq!(b.finish(s), Err(Error::Structural(StructuralError::Detached {
      node: "stray".to_string(),
    })));
  }

  #[test]
  fn builder_rejects_duplicate_names() {
    let mut b = SpTreeBuilder::new();
    let a = b.leaf("a", Op::Read, "x");
    let c = b.leaf("a", Op::Read, "x");
    let s = b.series("S", a, c);
    assert_eq!(b.finish(s), Err(Error::Structural(StructuralError::DuplicateNode {
      node: "a".to_string(),
    })));
  }

  #[test]
  fn builder_rejects_non_root_as_root() {
    let mut b = SpTreeBuilder::new();
    let a = b.leaf("a", Op::Read, "x");
    let c = b.leaf("c", Op::Read, "x");
    b.series("S", a, c);
    assert_eq!(b.finish(a), Err(Error::Structural(StructuralError::RootHasParent {
      root: "a".to_string(),
    })));
  }

  #[test]
  fn access_conflicts() {
    assert!(Access::write("x").conflicts_with(&Access::read("x")));
    assert!(Access::read("x").conflicts_with(&Access::write("x")));
    assert!(Access::write("x").conflicts_with(&Access::write("x")));
    assert!(!Access::read("x").conflicts_with(&Access::read("x")));
    assert!(!Access::write("x").conflicts_with(&Access::write("y")));
  }
}
