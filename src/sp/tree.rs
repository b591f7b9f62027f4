use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StructuralError};

use super::*;

/// One node as described by a tree provider: its kind, the names of its
/// children, and for leaves the operation and variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
  pub name: String,
  pub kind: Kind,
  #[serde(default)]
  pub children: Vec<String>,
  #[serde(default)]
  pub op: Option<Op>,
  #[serde(default)]
  pub var: Option<String>,
}

impl NodeSpec {
  pub fn series(name: &str, left: &str, right: &str) -> Self {
    Self::internal(name, Kind::Series, left, right)
  }

  pub fn parallel(name: &str, left: &str, right: &str) -> Self {
    Self::internal(name, Kind::Parallel, left, right)
  }

  fn internal(name: &str, kind: Kind, left: &str, right: &str) -> Self {
    Self {
      name: name.to_string(),
      kind: kind,
      children: vec![left.to_string(), right.to_string()],
      op: None,
      var: None,
    }
  }

  pub fn leaf(name: &str, op: Op, var: &str) -> Self {
    Self {
      name: name.to_string(),
      kind: Kind::Leaf,
      children: Vec::new(),
      op: Some(op),
      var: Some(var.to_string()),
    }
  }

  pub fn silent(name: &str) -> Self {
    Self {
      name: name.to_string(),
      kind: Kind::Leaf,
      children: Vec::new(),
      op: None,
      var: None,
    }
  }
}

/// Assembles an `SpTree` bottom-up. Children must be created before the
/// node that composes them.
#[derive(Debug, Default)]
pub struct SpTreeBuilder {
  nodes: Vec<SpNode>,
  next_event: u32,
}

impl SpTreeBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  fn push(&mut self, name: &str, kind: NodeKind) -> NodeId {
    self.nodes.push(SpNode {
      name: name.to_string(),
      kind: kind,
    });
    NodeId(self.nodes.len() - 1)
  }

  /// Adds a leaf; `access` is `None` for a silent step.
  pub fn event(&mut self, name: &str, access: Option<Access>) -> NodeId {
    let id = EventId(self.next_event);
    self.next_event += 1;
    self.push(name, NodeKind::Leaf(Event::new(id, access)))
  }

  pub fn leaf(&mut self, name: &str, op: Op, var: &str) -> NodeId {
    self.event(name, Some(Access {
      op: op,
      var: var.to_string(),
    }))
  }

  pub fn silent_leaf(&mut self, name: &str) -> NodeId {
    self.event(name, None)
  }

  pub fn series(&mut self, name: &str, left: NodeId, right: NodeId) -> NodeId {
    self.push(name, NodeKind::Series(left, right))
  }

  pub fn parallel(&mut self, name: &str, left: NodeId, right: NodeId) -> NodeId {
    self.push(name, NodeKind::Parallel(left, right))
  }

  /// Validates the nodes as a single tree rooted at `root`.
  pub fn finish(self, root: NodeId) -> Result<SpTree> {
    SpTree::validate(self.nodes, root)
  }
}

/// A validated series-parallel tree: every internal node has exactly two
/// children, every node other than the root has exactly one parent, and
/// every node is reachable from the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpTree {
  nodes: Vec<SpNode>,
  parents: Vec<Option<NodeId>>,
  by_name: HashMap<String, NodeId>,
  root: NodeId,
}

impl SpTree {
  /// Builds a tree from provider node descriptions, naming the root.
  pub fn from_nodes<I>(specs: I, root: &str) -> Result<SpTree>
  where I: IntoIterator<Item = NodeSpec> {
    let specs: Vec<NodeSpec> = specs.into_iter().collect();
    if specs.is_empty() {
      return Err(StructuralError::EmptyTree.into());
    }

    let mut ids = HashMap::new();
    for (i, spec) in specs.iter().enumerate() {
      if ids.insert(spec.name.as_str(), NodeId(i)).is_some() {
        return Err(StructuralError::DuplicateNode {
          node: spec.name.clone(),
        }.into());
      }
    }
    let root_id = *ids.get(root).ok_or_else(|| StructuralError::UnknownRoot {
      root: root.to_string(),
    })?;

    let mut nodes = Vec::with_capacity(specs.len());
    let mut next_event = 0;

    for spec in specs.iter() {
      let expected = if spec.kind == Kind::Leaf { 0 } else { 2 };
      if spec.children.len() != expected {
        return Err(StructuralError::BadChildCount {
          node: spec.name.clone(),
          found: spec.children.len(),
        }.into());
      }

      let mut children = Vec::with_capacity(2);
      for child in spec.children.iter() {
        let id = ids.get(child.as_str()).ok_or_else(|| StructuralError::UnknownChild {
          node: spec.name.clone(),
          child: child.clone(),
        })?;
        children.push(*id);
      }

      let kind = match spec.kind {
        Kind::Leaf => {
          let access = match (spec.op, &spec.var) {
            (Some(op), Some(var)) => Some(Access {
              op: op,
              var: var.clone(),
            }),
            (None, None) => None,
            _ => {
              return Err(StructuralError::IncompleteAccess {
                node: spec.name.clone(),
              }.into());
            }
          };
          let event = Event::new(EventId(next_event), access);
          next_event += 1;
          NodeKind::Leaf(event)
        }
        Kind::Series | Kind::Parallel => {
          if spec.op.is_some() || spec.var.is_some() {
            return Err(StructuralError::InternalAccess {
              node: spec.name.clone(),
            }.into());
          }
          if spec.kind == Kind::Series {
            NodeKind::Series(children[0], children[1])
          } else {
            NodeKind::Parallel(children[0], children[1])
          }
        }
      };

      nodes.push(SpNode {
        name: spec.name.clone(),
        kind: kind,
      });
    }

    SpTree::validate(nodes, root_id)
  }

  fn validate(nodes: Vec<SpNode>, root: NodeId) -> Result<SpTree> {
    if nodes.is_empty() {
      return Err(StructuralError::EmptyTree.into());
    }
    if root.0 >= nodes.len() {
      return Err(StructuralError::UnknownRoot {
        root: root.to_string(),
      }.into());
    }

    let mut by_name = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
      if by_name.insert(node.name.clone(), NodeId(i)).is_some() {
        return Err(StructuralError::DuplicateNode {
          node: node.name.clone(),
        }.into());
      }
    }

    let mut parents: Vec<Option<NodeId>> = vec![None; nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
      if let Some((left, right)) = node.kind.children() {
        for child in [left, right] {
          if child.0 >= nodes.len() {
            return Err(StructuralError::UnknownChild {
              node: node.name.clone(),
              child: child.to_string(),
            }.into());
          }
          if parents[child.0].is_some() {
            return Err(StructuralError::SharedChild {
              child: nodes[child.0].name.clone(),
            }.into());
          }
          parents[child.0] = Some(NodeId(i));
        }
      }
    }

    if parents[root.0].is_some() {
      return Err(StructuralError::RootHasParent {
        root: nodes[root.0].name.clone(),
      }.into());
    }

    let mut reached = vec![false; nodes.len()];
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
      reached[id.0] = true;
      if let Some((left, right)) = nodes[id.0].kind.children() {
        stack.push(right);
        stack.push(left);
      }
    }

    if let Some(stray) = reached.iter().position(|r| !r) {
      // With at most one parent per node, an unreached node either hangs
      // off another parentless node or sits on a cycle.
      let mut seen = HashSet::new();
      let mut cursor = Some(NodeId(stray));
      while let Some(id) = cursor {
        if !seen.insert(id) {
          return Err(StructuralError::Cycle {
            node: nodes[id.0].name.clone(),
          }.into());
        }
        cursor = parents[id.0];
      }
      return Err(StructuralError::Detached {
        node: nodes[stray].name.clone(),
      }.into());
    }

    Ok(SpTree {
      nodes: nodes,
      parents: parents,
      by_name: by_name,
      root: root,
    })
  }

  pub fn root(&self) -> NodeId {
    self.root
  }

  /// Returns the number of nodes, internal and leaf.
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn node(&self, id: NodeId) -> Option<&SpNode> {
    self.nodes.get(id.0)
  }

  pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
    self.node(id).map(|n| &n.kind)
  }

  pub fn name(&self, id: NodeId) -> Option<&str> {
    self.node(id).map(|n| n.name.as_str())
  }

  pub fn parent(&self, id: NodeId) -> Option<NodeId> {
    self.parents.get(id.0).and_then(|p| *p)
  }

  pub fn find(&self, name: &str) -> Option<NodeId> {
    self.by_name.get(name).copied()
  }

  /// Iterates over every leaf, silent or not, in node order.
  pub fn leaves(&self) -> impl Iterator<Item = (NodeId, &Event)> + '_ {
    self.nodes.iter().enumerate().filter_map(|(i, n)| {
      n.event().map(|e| (NodeId(i), e))
    })
  }

  /// Iterates over the leaves that read or write a variable.
  pub fn accesses(&self) -> impl Iterator<Item = (NodeId, &Event, &Access)> + '_ {
    self.leaves().filter_map(|(id, e)| e.access().map(|a| (id, e, a)))
  }

  /// Returns all node ids in depth-first, left-to-right order.
  pub fn preorder(&self) -> Vec<NodeId> {
    let mut order = Vec::with_capacity(self.nodes.len());
    let mut stack = vec![self.root];
    while let Some(id) = stack.pop() {
      order.push(id);
      if let Some((left, right)) = self.nodes[id.0].kind.children() {
        stack.push(right);
        stack.push(left);
      }
    }
    order
  }
}
