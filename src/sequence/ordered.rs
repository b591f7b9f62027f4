use std::cmp;

use tracing::{trace, warn};

use super::*;

/// Labels stay inside `[-LABEL_HALF_RANGE, LABEL_HALF_RANGE]` after a
/// rebuild, which leaves room for `MAX_INITIAL_GAP` steps at both ends.
const LABEL_HALF_RANGE: i128 = 1 << 62;

struct Entry<T> {
  /// `None` while the entry sits on the free list.
  value: Option<T>,
  generation: u32,
  label: i64,
  prev: Option<u32>,
  next: Option<u32>,
}

/// A `Sequence<T>` with O(1) order queries and amortized O(1) insertion.
///
/// Slots live in an arena and are linked by index. Every slot carries an
/// `i64` label and labels strictly increase from front to back, so
/// `precedes` is a single comparison.
pub struct OrderedSequence<T> {
  entries: Vec<Entry<T>>,
  free: Vec<u32>,
  head: Option<u32>,
  tail: Option<u32>,
  len: usize,
  gap: i64,
  block_size: usize,
  stats: SequenceStats,
}

impl<T> OrderedSequence<T> {
  fn resolve(&self, slot: SlotId) -> Result<u32> {
    match self.entries.get(slot.index() as usize) {
      Some(e) if e.value.is_some() && e.generation == slot.generation() => {
        Ok(slot.index())
      }
      _ => Err(slot.stale()),
    }
  }

  fn label(&self, idx: u32) -> i64 {
    self.entries[idx as usize].label
  }

  fn next_of(&self, idx: u32) -> Option<u32> {
    self.entries[idx as usize].next
  }

  fn handle(&self, idx: u32) -> SlotId {
    SlotId::new(idx, self.entries[idx as usize].generation)
  }

  fn exhausted(&self) -> Error {
    Error::LabelSpaceExhausted {
      len: self.len,
    }
  }

  /// Stores a new entry, linked between `prev` and `next`.
  fn link(&mut self, value: T, label: i64, prev: Option<u32>, next: Option<u32>) -> Result<u32> {
    let idx = match self.free.pop() {
      Some(idx) => {
        let e = &mut self.entries[idx as usize];
        e.value = Some(value);
        e.label = label;
        e.prev = prev;
        e.next = next;
        idx
      }
      None => {
        let idx = u32::try_from(self.entries.len()).map_err(|_| self.exhausted())?;
        self.entries.push(Entry {
          value: Some(value),
          generation: 0,
          label: label,
          prev: prev,
          next: next,
        });
        idx
      }
    };

    match prev {
      Some(p) => self.entries[p as usize].next = Some(idx),
      None => self.head = Some(idx),
    }
    match next {
      Some(n) => self.entries[n as usize].prev = Some(idx),
      None => self.tail = Some(idx),
    }

    self.len += 1;
    self.stats.inserts += 1;
    Ok(idx)
  }

  /// Label for a new first slot, renumbering if the front has run into
  /// the bottom of the label range.
  fn label_before(&mut self, head: u32) -> Result<i64> {
    if let Some(label) = self.label(head).checked_sub(self.gap) {
      return Ok(label);
    }
    self.rebuild()?;
    self.label(head).checked_sub(self.gap).ok_or_else(|| self.exhausted())
  }

  /// Label for a new last slot.
  fn label_after(&mut self, tail: u32) -> Result<i64> {
    if let Some(label) = self.label(tail).checked_add(self.gap) {
      return Ok(label);
    }
    self.rebuild()?;
    self.label(tail).checked_add(self.gap).ok_or_else(|| self.exhausted())
  }

  /// Label strictly between `prev` and `next`, relabeling first when the
  /// two are adjacent integers.
  fn label_between(&mut self, prev: u32, next: u32) -> Result<i64> {
    if room(self.label(prev), self.label(next)) <= 1 {
      self.relabel_from(prev)?;
    }
    let (lo, hi) = (self.label(prev), self.label(next));
    if room(lo, hi) <= 1 {
      return Err(self.exhausted());
    }
    Ok(lo + (room(lo, hi) / 2) as i64)
  }

  /// Respaces a window of slots starting at `start`, whose label is kept.
  ///
  /// The window covers at least `block_size` slots and keeps growing
  /// while the slot just past it is closer than `j * j` to `start`, `j`
  /// being the window length (the density test of Dietz and Sleator).
  /// Running off the end of the sequence places a virtual bound past the
  /// window, spaced by the larger of the gap and `2 * j`, so the block it
  /// leaves behind passes the density test on later relabels.
  fn relabel_from(&mut self, start: u32) -> Result<()> {
    let base = self.label(start) as i128;
    let gap = self.gap as i128;
    let mut window = vec![start];
    let mut cursor = self.next_of(start);

    let bound = loop {
      let j = window.len() as i128;
      match cursor {
        None => break base + j * cmp::max(gap, 2 * j),
        Some(n) => {
          let span = self.label(n) as i128 - base;
          if window.len() >= self.block_size && span > j * j {
            break self.label(n) as i128;
          }
          window.push(n);
          cursor = self.next_of(n);
        }
      }
    };

    if bound > i64::MAX as i128 {
      return self.rebuild();
    }

    let spacing = (bound - base) / window.len() as i128;
    for (i, idx) in window.iter().enumerate().skip(1) {
      self.entries[*idx as usize].label = (base + i as i128 * spacing) as i64;
    }

    self.stats.relabels += 1;
    self.stats.touched += (window.len() - 1) as u64;
    trace!(
      window = window.len(),
      base = base as i64,
      bound = bound as i64,
      spacing = spacing as i64,
      "relabeled block");
    Ok(())
  }

  /// Renumbers every slot, centred on zero, with the configured gap or
  /// the widest spacing that fits.
  ///
  /// Fails with `LabelSpaceExhausted` only if adjacent slots could not be
  /// given a gap of at least 2.
  pub fn rebuild(&mut self) -> Result<()> {
    let n = self.len as i128;
    let spacing = cmp::min(self.gap as i128, 2 * LABEL_HALF_RANGE / (n + 1));
    if spacing < 2 {
      return Err(self.exhausted());
    }

    let mut label = -(spacing * (n - 1).max(0)) / 2;
    let mut cursor = self.head;
    while let Some(idx) = cursor {
      self.entries[idx as usize].label = label as i64;
      label += spacing;
      cursor = self.next_of(idx);
    }

    self.stats.rebuilds += 1;
    self.stats.touched += self.len as u64;
    warn!(len = self.len, spacing = spacing as i64, "label space crowded; renumbered sequence");
    Ok(())
  }

  /// Returns the label of a live slot.
  pub fn label_of(&self, slot: SlotId) -> Result<i64> {
    Ok(self.label(self.resolve(slot)?))
  }

  /// Returns the labels of all live slots, front to back.
  pub fn labels(&self) -> Vec<i64> {
    self.iter().map(|(h, _)| self.label(h.index())).collect()
  }

  /// Verifies that labels strictly increase along the list and that the
  /// back links mirror the forward links.
  pub fn check_labels(&self) -> std::result::Result<(), String> {
    let mut prev: Option<u32> = None;
    let mut cursor = self.head;
    let mut count = 0;

    while let Some(idx) = cursor {
      let e = &self.entries[idx as usize];
      if e.prev != prev {
        return Err(format!("slot {} has a broken back link", idx));
      }
      if let Some(p) = prev {
        if self.label(p) >= e.label {
          return Err(format!("labels {} and {} out of order at slot {}",
                             self.label(p), e.label, idx));
        }
      }
      prev = cursor;
      cursor = e.next;
      count += 1;
    }

    if prev != self.tail {
      return Err("tail does not match the last slot".to_string());
    }
    if count != self.len {
      return Err(format!("walked {} slots but len is {}", count, self.len));
    }
    Ok(())
  }

  pub fn first(&self) -> Option<SlotId> {
    self.head.map(|idx| self.handle(idx))
  }

  pub fn last(&self) -> Option<SlotId> {
    self.tail.map(|idx| self.handle(idx))
  }

  /// Iterates over live slots front to back.
  pub fn iter(&self) -> Iter<'_, T> {
    Iter {
      seq: self,
      cursor: self.head,
    }
  }
}

/// Distance between two labels, which may not fit in an `i64`.
fn room(lo: i64, hi: i64) -> i128 {
  hi as i128 - lo as i128
}

impl<T> Sequence<T> for OrderedSequence<T> {
  fn new() -> Self {
    let config = OrderConfig::default();
    Self {
      entries: Vec::new(),
      free: Vec::new(),
      head: None,
      tail: None,
      len: 0,
      gap: config.initial_gap,
      block_size: config.block_size,
      stats: SequenceStats::default(),
    }
  }

  fn with_config(config: &OrderConfig) -> Result<Self> {
    config.validate()?;
    let mut seq = Self::new();
    seq.gap = config.initial_gap;
    seq.block_size = config.block_size;
    Ok(seq)
  }

  fn insert_after(&mut self, at: Option<SlotId>, value: T) -> Result<SlotId> {
    let idx = match at {
      None => match self.head {
        None => self.link(value, 0, None, None)?,
        Some(head) => {
          let label = self.label_before(head)?;
          self.link(value, label, None, Some(head))?
        }
      },
      Some(slot) => {
        let prev = self.resolve(slot)?;
        match self.next_of(prev) {
          None => {
            let label = self.label_after(prev)?;
            self.link(value, label, Some(prev), None)?
          }
          Some(next) => {
            let label = self.label_between(prev, next)?;
            self.link(value, label, Some(prev), Some(next))?
          }
        }
      }
    };

    Ok(self.handle(idx))
  }

  fn delete(&mut self, slot: SlotId) -> Result<T> {
    let idx = self.resolve(slot)?;
    let (prev, next) = {
      let e = &self.entries[idx as usize];
      (e.prev, e.next)
    };

    match prev {
      Some(p) => self.entries[p as usize].next = next,
      None => self.head = next,
    }
    match next {
      Some(n) => self.entries[n as usize].prev = prev,
      None => self.tail = prev,
    }

    let e = &mut self.entries[idx as usize];
    e.prev = None;
    e.next = None;
    e.generation = e.generation.wrapping_add(1);
    let value = e.value.take().ok_or_else(|| slot.stale())?;

    self.free.push(idx);
    self.len -= 1;
    self.stats.deletes += 1;
    Ok(value)
  }

  fn precedes(&self, a: SlotId, b: SlotId) -> Result<bool> {
    let (a, b) = (self.resolve(a)?, self.resolve(b)?);
    Ok(self.label(a) < self.label(b))
  }

  fn get(&self, slot: SlotId) -> Result<&T> {
    let idx = self.resolve(slot)?;
    self.entries[idx as usize].value.as_ref().ok_or_else(|| slot.stale())
  }

  fn handles(&self) -> Vec<SlotId> {
    self.iter().map(|(h, _)| h).collect()
  }

  fn len(&self) -> usize {
    self.len
  }

  fn stats(&self) -> SequenceStats {
    self.stats
  }
}

/// Front-to-back iterator over an `OrderedSequence`.
pub struct Iter<'a, T> {
  seq: &'a OrderedSequence<T>,
  cursor: Option<u32>,
}

impl<'a, T> Iterator for Iter<'a, T> {
  type Item = (SlotId, &'a T);

  fn next(&mut self) -> Option<Self::Item> {
    let idx = self.cursor?;
    let e = &self.seq.entries[idx as usize];
    self.cursor = e.next;
    e.value.as_ref().map(|v| (SlotId::new(idx, e.generation), v))
  }
}
