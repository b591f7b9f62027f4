//! Explicit happens-before graphs
//!
//! `HbDag` holds events as nodes and direct happens-before arcs as
//! edges. One event happens before another when there is a directed
//! path between them. Unlike an `SpTree`, the graph need not be
//! series-parallel, which is what the reachability-based race detector
//! is for.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::error::{Error, Result};
use crate::sp::{Access, Event, NodeId, NodeKind, SpTree};

/// Identifies a node of an `HbDag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DagNodeId(pub(crate) usize);

impl DagNodeId {
  pub fn index(self) -> usize {
    self.0
  }
}

impl fmt::Display for DagNodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "d{}", self.0)
  }
}

/// A named node of an `HbDag`: an event, or a join point that only
/// carries ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DagNode {
  name: String,
  event: Option<Event>,
}

impl DagNode {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn event(&self) -> Option<&Event> {
    self.event.as_ref()
  }
}

/// A happens-before graph over events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HbDag {
  nodes: Vec<DagNode>,
  succs: Vec<Vec<DagNodeId>>,
  edges: usize,
}

impl HbDag {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_event(&mut self, name: &str, event: Event) -> DagNodeId {
    self.push(name, Some(event))
  }

  /// Adds a node with no event, used to join many predecessors to many
  /// successors.
  pub fn add_join(&mut self, name: &str) -> DagNodeId {
    self.push(name, None)
  }

  fn push(&mut self, name: &str, event: Option<Event>) -> DagNodeId {
    self.nodes.push(DagNode {
      name: name.to_string(),
      event: event,
    });
    self.succs.push(Vec::new());
    DagNodeId(self.nodes.len() - 1)
  }

  /// Records that `from` happens before `to`.
  pub fn add_edge(&mut self, from: DagNodeId, to: DagNodeId) -> Result<()> {
    self.check(from)?;
    self.check(to)?;
    self.succs[from.0].push(to);
    self.edges += 1;
    Ok(())
  }

  fn check(&self, id: DagNodeId) -> Result<()> {
    if id.0 < self.nodes.len() {
      Ok(())
    } else {
      Err(Error::UnknownDagNode(id))
    }
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub fn edge_count(&self) -> usize {
    self.edges
  }

  pub fn node(&self, id: DagNodeId) -> Option<&DagNode> {
    self.nodes.get(id.0)
  }

  pub fn successors(&self, id: DagNodeId) -> Result<&[DagNodeId]> {
    self.check(id)?;
    Ok(&self.succs[id.0])
  }

  /// Iterates over the nodes whose event reads or writes a variable.
  pub fn accesses(&self) -> impl Iterator<Item = (DagNodeId, &Event, &Access)> + '_ {
    self.nodes.iter().enumerate().filter_map(|(i, n)| {
      n.event.as_ref().and_then(|e| e.access().map(|a| (DagNodeId(i), e, a)))
    })
  }

  /// Tests if there is a non-empty directed path from `from` to `to`.
  pub fn reaches(&self, from: DagNodeId, to: DagNodeId) -> Result<bool> {
    self.check(from)?;
    self.check(to)?;

    let mut seen = vec![false; self.nodes.len()];
    let mut queue: VecDeque<DagNodeId> = self.succs[from.0].iter().copied().collect();
    while let Some(id) = queue.pop_front() {
      if id == to {
        return Ok(true);
      }
      if seen[id.0] {
        continue;
      }
      seen[id.0] = true;
      queue.extend(self.succs[id.0].iter().copied().filter(|s| !seen[s.0]));
    }

    Ok(false)
  }

  /// Fails with `DagCycle`, naming a node on a cycle, if any node can
  /// reach itself.
  pub fn check_acyclic(&self) -> Result<()> {
    let mut indegree = vec![0usize; self.nodes.len()];
    for succs in self.succs.iter() {
      for s in succs.iter() {
        indegree[s.0] += 1;
      }
    }

    let mut ready: Vec<usize> = (0..self.nodes.len()).filter(|&i| indegree[i] == 0).collect();
    let mut removed = 0;
    while let Some(i) = ready.pop() {
      removed += 1;
      for s in self.succs[i].iter() {
        indegree[s.0] -= 1;
        if indegree[s.0] == 0 {
          ready.push(s.0);
        }
      }
    }

    if removed == self.nodes.len() {
      return Ok(());
    }

    // Every node left over has a predecessor that is also left over.
    // Walking back through them for `n` steps must end on a cycle.
    let mut pred: Vec<Option<usize>> = vec![None; self.nodes.len()];
    for (i, succs) in self.succs.iter().enumerate() {
      if indegree[i] == 0 {
        continue;
      }
      for s in succs.iter() {
        if indegree[s.0] > 0 && pred[s.0].is_none() {
          pred[s.0] = Some(i);
        }
      }
    }

    let mut cursor = match indegree.iter().position(|&d| d > 0) {
      Some(i) => i,
      None => return Ok(()),
    };
    for _ in 0..self.nodes.len() {
      match pred[cursor] {
        Some(p) => cursor = p,
        None => break,
      }
    }
    Err(Error::DagCycle(DagNodeId(cursor)))
  }

  /// Builds the graph whose reachability between leaves is the
  /// happens-before relation of `tree`.
  ///
  /// Every leaf becomes a node, silent leaves included. A series node
  /// joins each sink of its left subtree to each source of its right
  /// subtree; a parallel node adds no edges. When that would take more
  /// edges than routing through one extra join node, the join node is
  /// added instead, so the edge count stays linear in the tree size.
  /// Also returns the node assigned to each leaf.
  pub fn from_sp_tree(tree: &SpTree) -> Result<(HbDag, HashMap<NodeId, DagNodeId>)> {
    let mut dag = HbDag::new();
    let mut leaf_nodes = HashMap::new();
    // (sources, sinks) of every finished subtree
    let mut ends: Vec<Option<(Vec<DagNodeId>, Vec<DagNodeId>)>> = vec![None; tree.len()];

    let mut stack = vec![(tree.root(), false)];
    while let Some((x, expanded)) = stack.pop() {
      let kind = tree.kind(x).ok_or(Error::UnknownNode(x))?;
      let (left, right) = match *kind {
        NodeKind::Leaf(ref event) => {
          let name = tree.name(x).unwrap_or_default();
          let id = dag.add_event(name, event.clone());
          leaf_nodes.insert(x, id);
          ends[x.0] = Some((vec![id], vec![id]));
          continue;
        }
        NodeKind::Series(l, r) | NodeKind::Parallel(l, r) => (l, r),
      };

      if !expanded {
        stack.push((x, true));
        stack.push((right, false));
        stack.push((left, false));
        continue;
      }

      let (l_src, l_snk) = ends[left.0].take().ok_or(Error::UnknownNode(left))?;
      let (r_src, r_snk) = ends[right.0].take().ok_or(Error::UnknownNode(right))?;
      ends[x.0] = Some(match *kind {
        NodeKind::Series(..) => {
          if l_snk.len() * r_src.len() > l_snk.len() + r_src.len() {
            let join = dag.add_join(&format!("{}.join", tree.name(x).unwrap_or_default()));
            for &a in l_snk.iter() {
              dag.add_edge(a, join)?;
            }
            for &b in r_src.iter() {
              dag.add_edge(join, b)?;
            }
          } else {
            for &a in l_snk.iter() {
              for &b in r_src.iter() {
                dag.add_edge(a, b)?;
              }
            }
          }
          (l_src, r_snk)
        }
        _ => ([l_src, r_src].concat(), [l_snk, r_snk].concat()),
      });
    }

    Ok((dag, leaf_nodes))
  }
}
