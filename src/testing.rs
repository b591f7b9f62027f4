//! Helpers shared by the unit tests.

use rand::Rng;
use rand::rngs::StdRng;

use crate::race::Race;
use crate::sp::{NodeId, NodeKind, Op, SpTree, SpTreeBuilder};

/// Picks one of `ops`, weighted by the paired probabilities.
pub fn choose_op<T: Copy>(rng: &mut StdRng, ops: &[(T, f64)]) -> T {
  let total: f64 = ops.iter().map(|&(_, p)| p).sum();
  let mut x = rng.gen::<f64>() * total;
  for &(op, p) in ops.iter() {
    if x < p {
      return op;
    }
    x -= p;
  }
  ops[ops.len() - 1].0
}

/// Generates a random tree with `leaves` leaves. Each leaf is silent with
/// probability 0.2, otherwise it accesses one of `vars` and writes with
/// probability `p_write`. Internal nodes are parallel with probability
/// `p_parallel`.
pub fn random_tree(rng: &mut StdRng, leaves: usize, vars: &[&str], p_write: f64, p_parallel: f64) -> SpTree {
  let mut b = SpTreeBuilder::new();
  let mut count = 0;
  let root = grow(&mut b, rng, leaves.max(1), vars, p_write, p_parallel, &mut count);
  b.finish(root).unwrap()
}

fn grow(b: &mut SpTreeBuilder, rng: &mut StdRng, leaves: usize, vars: &[&str],
        p_write: f64, p_parallel: f64, count: &mut usize) -> NodeId {
  *count += 1;
  let name = format!("n{}", count);

  if leaves == 1 {
    if rng.gen::<f64>() < 0.2 {
      return b.silent_leaf(&name);
    }
    let var = vars[rng.gen_range(0..vars.len())];
    let op = if rng.gen::<f64>() < p_write { Op::Write } else { Op::Read };
    return b.leaf(&name, op, var);
  }

  let split = rng.gen_range(1..leaves);
  let left = grow(b, rng, split, vars, p_write, p_parallel, count);
  let right = grow(b, rng, leaves - split, vars, p_write, p_parallel, count);
  if rng.gen::<f64>() < p_parallel {
    b.parallel(&name, left, right)
  } else {
    b.series(&name, left, right)
  }
}

fn ancestors(tree: &SpTree, x: NodeId) -> Vec<NodeId> {
  let mut path = vec![x];
  let mut cursor = x;
  while let Some(p) = tree.parent(cursor) {
    path.push(p);
    cursor = p;
  }
  path
}

/// Decides happens-before directly from the tree: `u` precedes `v` when
/// their lowest common ancestor is a series node with `u` on its left
/// and `v` on its right.
pub fn series_precedes(tree: &SpTree, u: NodeId, v: NodeId) -> bool {
  let up = ancestors(tree, u);
  let vp = ancestors(tree, v);

  let (mut i, mut j) = (up.len(), vp.len());
  while i > 0 && j > 0 && up[i - 1] == vp[j - 1] {
    i -= 1;
    j -= 1;
  }
  if i == 0 || j == 0 || i == up.len() {
    // One node is an ancestor of the other, or they are the same node.
    return false;
  }

  let lca = up[i];
  match tree.kind(lca) {
    Some(&NodeKind::Series(l, r)) => up[i - 1] == l && vp[j - 1] == r,
    _ => false,
  }
}

/// Every race in `tree`, found by checking all pairs against the tree
/// structure.
pub fn brute_force_races(tree: &SpTree) -> Vec<Race> {
  let accesses: Vec<_> = tree.accesses().collect();
  let mut races = Vec::new();

  for (i, &(u, ue, ua)) in accesses.iter().enumerate() {
    for &(v, ve, va) in accesses[i + 1..].iter() {
      if ua.conflicts_with(va) && !series_precedes(tree, u, v) && !series_precedes(tree, v, u) {
        races.push(Race::new(ue.id(), ve.id(), &ua.var));
      }
    }
  }

  races.sort();
  races
}
