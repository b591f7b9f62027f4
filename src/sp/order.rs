use tracing::debug;

use crate::config::OrderConfig;
use crate::error::{Error, Result};
use crate::sequence::{OrderedSequence, Sequence, SlotId};

use super::*;

/// Happens-before queries over the nodes of an `SpTree`.
///
/// Holds the English and Hebrew orders produced by `SpOrderBuilder`. It
/// is read-only once built, so it can be shared between threads that
/// query it.
pub struct HappensBefore<S = OrderedSequence<NodeId>> {
  english: S,
  hebrew: S,
  english_slots: Vec<Option<SlotId>>,
  hebrew_slots: Vec<Option<SlotId>>,
}

impl HappensBefore {
  /// Builds the orders for `tree` on `OrderedSequence`s.
  pub fn build(tree: &SpTree, config: &OrderConfig) -> Result<Self> {
    Self::build_with(tree, config)
  }
}

impl<S> HappensBefore<S>
where S: Sequence<NodeId> {
  /// Builds the orders for `tree` on any `Sequence` implementation.
  pub fn build_with(tree: &SpTree, config: &OrderConfig) -> Result<Self> {
    SpOrderBuilder::new(tree, config)?.build()
  }

  fn slot(slots: &[Option<SlotId>], x: NodeId) -> Result<SlotId> {
    slots.get(x.0).copied().flatten().ok_or(Error::UnknownNode(x))
  }

  pub fn english_slot(&self, x: NodeId) -> Result<SlotId> {
    Self::slot(&self.english_slots, x)
  }

  pub fn hebrew_slot(&self, x: NodeId) -> Result<SlotId> {
    Self::slot(&self.hebrew_slots, x)
  }

  pub fn english(&self) -> &S {
    &self.english
  }

  pub fn hebrew(&self) -> &S {
    &self.hebrew
  }

  /// Tests if `x` happens before `y`: `x` comes first in both orders.
  pub fn precedes(&self, x: NodeId, y: NodeId) -> Result<bool> {
    let english = self.english.precedes(self.english_slot(x)?, self.english_slot(y)?)?;
    let hebrew = self.hebrew.precedes(self.hebrew_slot(x)?, self.hebrew_slot(y)?)?;
    Ok(english && hebrew)
  }

  /// Tests if neither of two distinct nodes happens before the other.
  pub fn concurrent(&self, x: NodeId, y: NodeId) -> Result<bool> {
    Ok(x != y && !self.precedes(x, y)? && !self.precedes(y, x)?)
  }
}

/// Places every node of an `SpTree` in the English and Hebrew orders.
///
/// Each internal node X is followed by its children. In the English
/// order the left child comes first. In the Hebrew order the left child
/// comes first under a series node and second under a parallel node.
/// Subtrees are then filled in directly after their roots, so the two
/// orders agree on series compositions and disagree on parallel ones.
pub struct SpOrderBuilder<'t, S> {
  tree: &'t SpTree,
  english: S,
  hebrew: S,
  english_slots: Vec<Option<SlotId>>,
  hebrew_slots: Vec<Option<SlotId>>,
}

impl<'t, S> SpOrderBuilder<'t, S>
where S: Sequence<NodeId> {
  pub fn new(tree: &'t SpTree, config: &OrderConfig) -> Result<Self> {
    Ok(Self {
      tree: tree,
      english: S::with_config(config)?,
      hebrew: S::with_config(config)?,
      english_slots: vec![None; tree.len()],
      hebrew_slots: vec![None; tree.len()],
    })
  }

  fn children(&self, x: NodeId) -> Result<Option<(NodeId, NodeId, bool)>> {
    match self.tree.kind(x) {
      Some(NodeKind::Series(l, r)) => Ok(Some((*l, *r, false))),
      Some(NodeKind::Parallel(l, r)) => Ok(Some((*l, *r, true))),
      Some(NodeKind::Leaf(_)) => Ok(None),
      None => Err(Error::UnknownNode(x)),
    }
  }

  /// Walks the tree once, depth first, with an explicit stack.
  pub fn build(mut self) -> Result<HappensBefore<S>> {
    let root = self.tree.root();
    self.english_slots[root.0] = Some(self.english.insert_after(None, root)?);
    self.hebrew_slots[root.0] = Some(self.hebrew.insert_after(None, root)?);

    let mut stack = vec![root];
    while let Some(x) = stack.pop() {
      let (left, right, parallel) = match self.children(x)? {
        Some(c) => c,
        None => continue,
      };

      let at = HappensBefore::<S>::slot(&self.english_slots, x)?;
      let eng_left = self.english.insert_after(Some(at), left)?;
      let eng_right = self.english.insert_after(Some(eng_left), right)?;

      let at = HappensBefore::<S>::slot(&self.hebrew_slots, x)?;
      let (heb_left, heb_right) = if parallel {
        let heb_right = self.hebrew.insert_after(Some(at), right)?;
        (self.hebrew.insert_after(Some(heb_right), left)?, heb_right)
      } else {
        let heb_left = self.hebrew.insert_after(Some(at), left)?;
        (heb_left, self.hebrew.insert_after(Some(heb_left), right)?)
      };

      self.english_slots[left.0] = Some(eng_left);
      self.english_slots[right.0] = Some(eng_right);
      self.hebrew_slots[left.0] = Some(heb_left);
      self.hebrew_slots[right.0] = Some(heb_right);

      stack.push(right);
      stack.push(left);
    }

    let (eng, heb) = (self.english.stats(), self.hebrew.stats());
    debug!(
      nodes = self.tree.len(),
      english_relabels = eng.relabels,
      hebrew_relabels = heb.relabels,
      rebuilds = eng.rebuilds + heb.rebuilds,
      "built english and hebrew orders");

    Ok(HappensBefore {
      english: self.english,
      hebrew: self.hebrew,
      english_slots: self.english_slots,
      hebrew_slots: self.hebrew_slots,
    })
  }
}
