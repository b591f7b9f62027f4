//! Order-maintenance sequences
//!
//! This module provides two implementations of the `Sequence<T>`
//! abstract data type, a list that supports inserting after a known
//! element, deleting an element, and asking which of two elements comes
//! first.
//!
//! `OrderedSequence` keeps an integer label on every slot and answers
//! order queries with a single comparison. Insertions take the midpoint
//! of the neighbouring labels, and when two neighbours run out of room a
//! bounded block of slots is respaced. The scheme follows Dietz and
//! Sleator, "Two algorithms for maintaining order in a list" (STOC 1987),
//! and the simplified presentation by Bender et al. (ESA 2002).
//!
//! `NaiveSequence` keeps the elements in a `Vec` and finds positions by
//! linear search. It exists to cross-check `OrderedSequence` and to give
//! a baseline for the amount of work each one does.

mod naive;
mod ordered;

pub use self::naive::NaiveSequence;
pub use self::ordered::{Iter, OrderedSequence};

use std::fmt;

use crate::config::OrderConfig;
use crate::error::{Error, Result};

/// A handle to a slot of a `Sequence<T>`.
///
/// Handles stay valid across relabeling. Once the slot is deleted the
/// handle is rejected with `Error::StaleSlot`, even if its storage has
/// been reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId {
  index: u32,
  generation: u32,
}

impl SlotId {
  pub const fn new(index: u32, generation: u32) -> Self {
    Self {
      index: index,
      generation: generation,
    }
  }

  pub const fn index(self) -> u32 {
    self.index
  }

  pub const fn generation(self) -> u32 {
    self.generation
  }

  pub(crate) fn stale(self) -> Error {
    Error::StaleSlot {
      index: self.index,
      generation: self.generation,
    }
  }
}

impl fmt::Debug for SlotId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "SlotId({}:{})", self.index, self.generation)
  }
}

/// Work counters kept by every `Sequence<T>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceStats {
  pub inserts: u64,
  pub deletes: u64,
  /// Number of block relabels performed.
  pub relabels: u64,
  /// Slot positions rewritten: labels reassigned by `OrderedSequence`,
  /// elements shifted by `NaiveSequence`.
  pub touched: u64,
  /// Number of whole-sequence renumberings.
  pub rebuilds: u64,
}

/// The order-maintenance abstract data type.
pub trait Sequence<T> {
  /// Creates a new, empty sequence with the default configuration.
  fn new() -> Self where Self: Sized;

  /// Creates a new, empty sequence after validating `config`.
  fn with_config(config: &OrderConfig) -> Result<Self> where Self: Sized;

  /// Inserts `value` immediately after `at`, or at the front when `at`
  /// is `None`. Returns the handle of the new slot.
  fn insert_after(&mut self, at: Option<SlotId>, value: T) -> Result<SlotId>;

  /// Removes the slot and returns its value.
  fn delete(&mut self, slot: SlotId) -> Result<T>;

  /// Tests if `a` comes strictly before `b`.
  fn precedes(&self, a: SlotId, b: SlotId) -> Result<bool>;

  /// Returns the value stored in the slot.
  fn get(&self, slot: SlotId) -> Result<&T>;

  /// Returns the handles of all live slots, front to back.
  fn handles(&self) -> Vec<SlotId>;

  /// Returns the number of live slots.
  fn len(&self) -> usize;

  /// Predicate that tests if the sequence is empty.
  fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Returns the work counters accumulated so far.
  fn stats(&self) -> SequenceStats;
}

/// One step of a workload replayed by `replay`.
///
/// Positions index the live slots in the order they were created, taken
/// modulo the number of live slots, so any list of steps is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqOp {
  InsertFront,
  InsertAfter(usize),
  Delete(usize),
}

/// Replays `ops` on both sequences and compares `precedes` for every
/// ordered pair of live slots after every step.
///
/// Returns `Ok(false)` at the first disagreement.
pub fn replay<A, B>(ops: &[SeqOp], a: &mut A, b: &mut B) -> Result<bool>
where A: Sequence<u64>, B: Sequence<u64> {
  let mut live: Vec<(SlotId, SlotId)> = Vec::new();
  let mut next_value = 0u64;

  for op in ops {
    match *op {
      SeqOp::InsertFront => {
        let sa = a.insert_after(None, next_value)?;
        let sb = b.insert_after(None, next_value)?;
        live.push((sa, sb));
        next_value += 1;
      }
      SeqOp::InsertAfter(i) => {
        let at = if live.is_empty() { None } else { Some(live[i % live.len()]) };
        let sa = a.insert_after(at.map(|p| p.0), next_value)?;
        let sb = b.insert_after(at.map(|p| p.1), next_value)?;
        live.push((sa, sb));
        next_value += 1;
      }
      SeqOp::Delete(i) => {
        if live.is_empty() {
          continue;
        }
        let (sa, sb) = live.remove(i % live.len());
        a.delete(sa)?;
        b.delete(sb)?;
      }
    }

    for &(xa, xb) in live.iter() {
      for &(ya, yb) in live.iter() {
        if a.precedes(xa, ya)? != b.precedes(xb, yb)? {
          return Ok(false);
        }
      }
    }
  }

  Ok(true)
}
