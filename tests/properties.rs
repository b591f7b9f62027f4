//! Randomized checks of the order structure and both race detectors.

mod common;

use common::test_proptest_config;
use proptest::prelude::*;
use sprace::sequence::{replay, SeqOp};
use sprace::{DagRaceDetector, DetectConfig, HappensBefore, HbDag, NaiveSequence, NodeId, Op, OrderConfig,
             OrderedSequence, Sequence, SpRaceDetector, SpTree, SpTreeBuilder};

#[derive(Debug, Clone)]
enum Shape {
  Leaf(Option<(bool, u8)>),
  Series(Box<Shape>, Box<Shape>),
  Parallel(Box<Shape>, Box<Shape>),
}

fn shape() -> impl Strategy<Value = Shape> {
  let leaf = prop_oneof![
    1 => Just(Shape::Leaf(None)),
    4 => (any::<bool>(), 0u8..3).prop_map(|a| Shape::Leaf(Some(a))),
  ];
  leaf.prop_recursive(6, 64, 2, |inner| {
    prop_oneof![
      (inner.clone(), inner.clone()).prop_map(|(l, r)| Shape::Series(Box::new(l), Box::new(r))),
      (inner.clone(), inner).prop_map(|(l, r)| Shape::Parallel(Box::new(l), Box::new(r))),
    ]
  })
}

fn grow(b: &mut SpTreeBuilder, shape: &Shape, count: &mut usize) -> NodeId {
  *count += 1;
  let name = format!("n{}", count);
  match *shape {
    Shape::Leaf(None) => b.silent_leaf(&name),
    Shape::Leaf(Some((write, var))) => {
      let op = if write { Op::Write } else { Op::Read };
      b.leaf(&name, op, ["x", "y", "z"][var as usize])
    }
    Shape::Series(ref l, ref r) => {
      let (l, r) = (grow(b, l, count), grow(b, r, count));
      b.series(&name, l, r)
    }
    Shape::Parallel(ref l, ref r) => {
      let (l, r) = (grow(b, l, count), grow(b, r, count));
      b.parallel(&name, l, r)
    }
  }
}

fn build(shape: &Shape) -> SpTree {
  let mut b = SpTreeBuilder::new();
  let mut count = 0;
  let root = grow(&mut b, shape, &mut count);
  b.finish(root).unwrap()
}

fn seq_op() -> impl Strategy<Value = SeqOp> {
  prop_oneof![
    1 => Just(SeqOp::InsertFront),
    6 => (0usize..512).prop_map(SeqOp::InsertAfter),
    2 => (0usize..512).prop_map(SeqOp::Delete),
  ]
}

proptest! {
  #![proptest_config(test_proptest_config(64))]

  /// Label order always agrees with list order, whatever the spacing.
  #[test]
  fn ordered_sequence_matches_baseline(
    ops in prop::collection::vec(seq_op(), 1..160),
    gap in 2i64..64,
    block in 2usize..8,
  ) {
    let config = OrderConfig::default().with_initial_gap(gap).with_block_size(block);
    let mut om = OrderedSequence::with_config(&config).unwrap();
    let mut naive = NaiveSequence::new();

    prop_assert!(replay(&ops, &mut om, &mut naive).unwrap());
    prop_assert!(om.check_labels().is_ok());
    prop_assert_eq!(om.len(), naive.len());
  }

  /// The two orders decide happens-before exactly as graph reachability.
  #[test]
  fn orders_match_reachability(s in shape()) {
    let tree = build(&s);
    let hb = HappensBefore::build(&tree, &OrderConfig::default()).unwrap();
    let (dag, nodes) = HbDag::from_sp_tree(&tree).unwrap();

    for (u, _) in tree.leaves() {
      for (v, _) in tree.leaves() {
        prop_assert_eq!(hb.precedes(u, v).unwrap(), dag.reaches(nodes[&u], nodes[&v]).unwrap());
      }
    }
  }

  #[test]
  fn detectors_agree(s in shape(), threads in 1usize..4) {
    let tree = build(&s);
    let detect = DetectConfig::default().with_threads(threads);

    let sp = SpRaceDetector::new(OrderConfig::default(), detect).detect(&tree).unwrap();
    let (dag, _) = HbDag::from_sp_tree(&tree).unwrap();
    let naive = DagRaceDetector::new(detect).detect(&dag).unwrap();

    prop_assert_eq!(sp.races(), naive.races());
  }

  #[test]
  fn naive_orders_give_the_same_relation(s in shape()) {
    let tree = build(&s);
    let om = HappensBefore::build(&tree, &OrderConfig::default()).unwrap();
    let naive = HappensBefore::<NaiveSequence<NodeId>>::build_with(&tree, &OrderConfig::default()).unwrap();

    for u in tree.preorder() {
      for v in tree.preorder() {
        prop_assert_eq!(om.precedes(u, v).unwrap(), naive.precedes(u, v).unwrap());
      }
    }
    prop_assert_eq!(naive.english().len(), tree.len());
  }
}
