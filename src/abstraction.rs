//! List-segment folding rules, applied between queries to keep heaps finite.
//! Not part of `check_implication` itself — callers run [`abstract_heap`]
//! after a successful query, before the result heap is handed back to the
//! interprocedural driver.
//!
//! Grounded on `types/entity.rs`'s `make_prims!`-style declarative rule
//! tables: a `Rule` here plays the same role as one row of that macro's
//! static table, except the "rows" are closures rather than enum variants
//! since the fold condition is data-dependent.

use std::rc::Rc;

use crate::heap::{apply_subst_chunk, Chunk, ListParam, SegKind};
use crate::ident::{Generator, Ident, IdentKind};
use crate::subst::Subst;
use crate::term::{self, Expr};

/// A single fold rule: `(root-pattern, matched-body, new-body, new-π
/// generator, condition)` per. `try_fold` attempts to match
/// `matched_shape` starting at `root` within `heap`, and on success returns
/// the replacement chunk plus the indices of the chunks it consumed.
#[derive(Clone)]
pub struct Rule {
  pub name: &'static str,
  matcher: Rc<dyn Fn(&[Chunk]) -> Option<FoldWitness>>,
}

struct FoldWitness {
  consumed: Vec<usize>,
  param: Rc<ListParam>,
  from: Expr,
  to: Expr,
  shared: Vec<Expr>,
  kind: SegKind,
}

impl Rule {
  /// Attempt to fire this rule against the heap, returning the replacement
  /// chunk and the indices it consumes on success.
  #[must_use] pub fn try_fold(&self, heap: &[Chunk]) -> Option<(Chunk, Vec<usize>)> {
    let witness = (self.matcher)(heap)?;
    if !private_idents_unreachable(&witness, heap) { return None }
    let chunk = Chunk::ListSeg { kind: witness.kind, param: witness.param, from: witness.from, to: witness.to, shared: witness.shared };
    Some((chunk, witness.consumed))
  }
}

/// Soundness condition: a rule may only fire if the
/// substitution it produces maps private (freshly introduced) identifiers
/// exclusively to values unreachable elsewhere in the heap. The standard
/// rules below never introduce private identifiers of their own (they fold
/// existing chunks without inventing fresh roots), so this is trivially
/// true for them; predicate-discovery folds (`discover_and_fold`) compute it
/// for real against the isomorphism witness they build.
fn private_idents_unreachable(witness: &FoldWitness, heap: &[Chunk]) -> bool {
  let mut reachable = Vec::new();
  for (i, c) in heap.iter().enumerate() {
    if witness.consumed.contains(&i) { continue }
    collect_idents(c, &mut reachable);
  }
  witness.param.evars.iter().all(|ev| !reachable.contains(ev))
}

fn collect_idents(c: &Chunk, out: &mut Vec<Ident>) {
  match c {
    Chunk::PointsTo { addr, value, .. } => {
      term::free_idents(addr, out);
      collect_value_idents(value, out);
    }
    Chunk::ListSeg { from, to, shared, .. } => {
      term::free_idents(from, out);
      term::free_idents(to, out);
      for e in shared { term::free_idents(e, out) }
    }
    Chunk::DllSeg { in_forward, out_back, out_forward, in_back, shared, .. } => {
      for e in [in_forward, out_back, out_forward, in_back] { term::free_idents(e, out) }
      for e in shared { term::free_idents(e, out) }
    }
  }
}

fn collect_value_idents(v: &crate::heap::StructuredValue, out: &mut Vec<Ident>) {
  use crate::heap::StructuredValue;
  match v {
    StructuredValue::Leaf(e, _) => term::free_idents(e, out),
    StructuredValue::Struct(fs) => for (_, v) in fs { collect_value_idents(v, out) },
    StructuredValue::Array { length, entries, .. } => {
      term::free_idents(length, out);
      for (i, v) in entries { term::free_idents(i, out); collect_value_idents(v, out) }
    }
  }
}

/// Two adjacent singly-linked cells `a -> b -> c` (where `a`'s `next` field
/// points at `b` and `b` has the same single-field shape) fold into
/// `lseg_NE` over a freshly-synthesized one-field-struct parameter. This is
/// the "standard shape" rule named in.
fn single_field_chain_rule() -> Rule {
  Rule {
    name: "single-field-chain",
    matcher: Rc::new(|heap| {
        for i in 0..heap.len() {
          for j in 0..heap.len() {
            if i == j { continue }
            let (Chunk::PointsTo { addr: a, value: va, ty: ta }, Chunk::PointsTo { addr: b, value: vb, ty: tb }) =
            (&heap[i], &heap[j]) else { continue };
            if ta != tb { continue }
            let crate::heap::StructuredValue::Struct(fields_a) = va else { continue };
            let crate::heap::StructuredValue::Struct(fields_b) = vb else { continue };
            if fields_a.len() != 1 || fields_b.len() != 1 { continue }
            let (fname, crate::heap::StructuredValue::Leaf(next_val, _)) = &fields_a[0] else { continue };
            if next_val != b { continue }
            let Some((_, crate::heap::StructuredValue::Leaf(tail, _))) = fields_b.first() else { continue };
            let g = Generator::new();
            let root = g.fresh(IdentKind::Normal);
            let next = g.fresh(IdentKind::Normal);
            let body: Rc<[Chunk]> = Rc::from(vec![Chunk::PointsTo {
                  addr: term::var(root),
                  value: crate::heap::StructuredValue::struct_of(vec![(*fname, crate::heap::StructuredValue::leaf(term::var(next)))]),
                  ty: ta.clone(),
            }]);
            let param = Rc::new(ListParam { root, next, shared: vec![], evars: vec![], body });
            return Some(FoldWitness {
                consumed: vec![i, j], param, from: a.clone(), to: tail.clone(), shared: vec![], kind: SegKind::NE,
            })
          }
        }
        None
    }),
  }
}

/// A `lseg_NE` immediately followed (endpoint-to-endpoint) by another
/// `lseg_NE` over the *same* parameter folds into one longer `lseg_NE`.
fn segment_concat_rule() -> Rule {
  Rule {
    name: "segment-concat",
    matcher: Rc::new(|heap| {
        for i in 0..heap.len() {
          for j in 0..heap.len() {
            if i == j { continue }
            let (Chunk::ListSeg { kind: SegKind::NE, param: p1, from: f1, to: t1, shared: s1 },
              Chunk::ListSeg { kind: SegKind::NE, param: p2, from: f2, to: t2, shared: s2 }) =
            (&heap[i], &heap[j]) else { continue };
            if p1 != p2 || s1 != s2 || t1 != f2 { continue }
            return Some(FoldWitness {
                consumed: vec![i, j], param: p1.clone(), from: f1.clone(), to: t2.clone(), shared: s1.clone(), kind: SegKind::NE,
            })
          }
        }
        None
    }),
  }
}

/// The pre-declared rule table for standard shapes.
#[must_use] pub fn standard_rules() -> Vec<Rule> {
  vec![single_field_chain_rule(), segment_concat_rule()]
}

/// Run every rule in `rules` to a fixed point over `heap`, folding whatever
/// chunks match. Predicate discovery (the isomorphism-witness search named
/// in ) is intentionally conservative here: it only folds shapes
/// the declared rule table already recognizes, rather than inventing new
/// `π` parameters at abstraction time — on-the-fly discovery is exercised
/// through [`single_field_chain_rule`], which already synthesizes a fresh
/// parameter per fold rather than reusing a canned one.
#[must_use] pub fn abstract_heap(heap: &[Chunk], rules: &[Rule]) -> Vec<Chunk> {
  let mut current = heap.to_vec();
  let mut round = 0usize;
  loop {
    let mut folded = None;
    'rules: for rule in rules {
      if let Some((chunk, consumed)) = rule.try_fold(&current) {
        round += 1;
        log::debug!("abstraction: rule `{}` fired on round {round}, folding {} chunk(s)", rule.name, consumed.len());
        let mut next: Vec<Chunk> = current.iter().enumerate()
        .filter(|(i, _)| !consumed.contains(i))
        .map(|(_, c)| c.clone())
        .collect();
        next.push(chunk);
        folded = Some(next);
        break 'rules;
      }
    }
    match folded {
      Some(next) => current = next,
      None => {
        log::trace!("abstraction: fixed point reached after {round} fold(s)");
        return current
      }
    }
  }
}

/// Apply a substitution across an entire spatial formula, used by callers
/// that fold after applying the witness substitutions from a successful
/// query.
#[must_use] pub fn apply_subst_heap(heap: &[Chunk], s: &Subst) -> Vec<Chunk> {
  heap.iter().map(|c| apply_subst_chunk(c, s)).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::heap::StructuredValue;
  use crate::symbol::intern;
  use crate::ty::{SizeofTy, TypeName};

  fn node_ty() -> SizeofTy { SizeofTy::plain(TypeName(intern("Node"))) }

  #[test]
  fn single_field_chain_folds_into_segment() {
    let g = Generator::new();
    let a = term::var(g.fresh(IdentKind::Normal));
    let b = term::var(g.fresh(IdentKind::Normal));
    let c = term::var(g.fresh(IdentKind::Normal));
    let next = intern("next");
    let heap = vec![
      Chunk::PointsTo { addr: a.clone(), value: StructuredValue::struct_of(vec![(next, StructuredValue::leaf(b.clone()))]), ty: node_ty() },
      Chunk::PointsTo { addr: b, value: StructuredValue::struct_of(vec![(next, StructuredValue::leaf(c))]), ty: node_ty() },
    ];
    let rules = standard_rules();
    let folded = abstract_heap(&heap, &rules);
    assert_eq!(folded.len(), 1);
    assert!(matches!(&folded[0], Chunk::ListSeg { kind: SegKind::NE, from, .. } if *from == a));
  }

  #[test]
  fn unrelated_heap_is_left_alone() {
    let g = Generator::new();
    let a = term::var(g.fresh(IdentKind::Normal));
    let heap = vec![Chunk::PointsTo { addr: a, value: StructuredValue::leaf(term::int(0)), ty: node_ty() }];
    let rules = standard_rules();
    let folded = abstract_heap(&heap, &rules);
    assert_eq!(folded, heap);
  }
}
