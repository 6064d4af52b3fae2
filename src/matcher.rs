//! Finds the left-hand chunk matching a right-hand predicate.
//!
//! Grounded on `build_mir.rs`'s `Translator` lookup-or-translate dance: the
//! matcher here is the same "search a collection for the entry whose key is
//! equivalent modulo the current substitution" shape, just applied to heap
//! chunks instead of MIR types.

use std::rc::Rc;

use crate::heap::{Chunk, ListParam, SegKind};
use crate::subst::Subst;
use crate::term::Expr;

/// The outcome of matching one right-hand chunk against the left heap.
pub enum MatchResult {
  /// A left chunk matched directly; holds its index in the left chunk list.
  Found(usize),
  /// The right predicate was `NE` and the left held a `PE` over the same
  /// parameter/shared arguments: succeeds only by additionally recording
  /// the segment's non-emptiness as a missing-π fact.
  FoundPeToNe { left_index: usize, nonempty_witness: (Expr, Expr) },
  /// No left chunk matches.
  NotFound,
}

/// Total order used to tie-break matcher selection: points-to chunks sort before any segment, then by a
/// structural comparison of the chunk's root address expression, then by
/// position in the left heap list (the `position` index itself, since
/// `Vec` iteration already preserves source order).
fn chunk_rank(c: &Chunk) -> u8 {
  match c {
    Chunk::PointsTo {.. } => 0,
    Chunk::ListSeg {.. } => 1,
    Chunk::DllSeg {.. } => 2,
  }
}

fn chunk_root(c: &Chunk) -> &Expr {
  match c {
    Chunk::PointsTo { addr, .. } => addr,
    Chunk::ListSeg { from, .. } => from,
    Chunk::DllSeg { in_forward, .. } => in_forward,
  }
}

/// Address equality after applying the left-substitution, as
/// requires for points-to matching.
fn addr_eq(sub_l: &Subst, a: &Expr, b: &Expr) -> bool {
  sub_l.apply_expr(a) == sub_l.apply_expr(b)
}

/// Find the left chunk that a points-to right-hand predicate at address `rhs`
/// should match: the first left points-to whose (left-substituted) address
/// equals `rhs`, breaking ties by the order in `left`.
#[must_use] pub fn match_points_to(left: &[Chunk], sub_l: &Subst, rhs_addr: &Expr) -> MatchResult {
  let mut candidates: Vec<usize> = left.iter().enumerate()
  .filter(|(_, c)| matches!(c, Chunk::PointsTo { addr, .. } if addr_eq(sub_l, addr, rhs_addr)))
  .map(|(i, _)| i)
  .collect();
  candidates.sort_by_key(|&i| (chunk_rank(&left[i]), format!("{:?}", chunk_root(&left[i])), i));
  candidates.first().map_or(MatchResult::NotFound, |&i| MatchResult::Found(i))
}

/// Find the left chunk matching a right-hand list-segment predicate
/// (`rhs_kind`, `rhs_from`), restricted to the same inductive parameter when
/// `rhs_param` is given (`None` matches any parameter, used when the caller
/// only needs *some* non-empty segment to unroll — e.g. a right-hand
/// points-to matched against any left `NE` segment at that address). Handles
/// the `PE`/`NE` join: a left `PE` may satisfy a right `NE` provided its
/// non-emptiness is recorded separately by the caller.
#[must_use] pub fn match_segment(
  left: &[Chunk], sub_l: &Subst, rhs_kind: SegKind, rhs_param: Option<&Rc<ListParam>>, rhs_from: &Expr,
) -> MatchResult {
  let mut candidates: Vec<(usize, bool)> = Vec::new();
  for (i, c) in left.iter().enumerate() {
    let Chunk::ListSeg { kind, from, param, .. } = c else { continue };
    if !addr_eq(sub_l, from, rhs_from) { continue }
    if let Some(p) = rhs_param { if param != p { continue } }
    match (kind, rhs_kind) {
      (SegKind::NE, SegKind::PE) | (SegKind::PE, SegKind::PE) | (SegKind::NE, SegKind::NE) => candidates.push((i, false)),
      (SegKind::PE, SegKind::NE) => candidates.push((i, true)),
    }
  }
  candidates.sort_by_key(|&(i, _)| (chunk_rank(&left[i]), format!("{:?}", chunk_root(&left[i])), i));
  match candidates.first() {
    None => MatchResult::NotFound,
    Some(&(i, needs_nonempty)) => {
      if needs_nonempty {
        let Chunk::ListSeg { from, to, .. } = &left[i] else { unreachable!() };
        MatchResult::FoundPeToNe { left_index: i, nonempty_witness: (from.clone(), to.clone()) }
      } else {
        MatchResult::Found(i)
      }
    }
  }
}

/// Select the next right-hand chunk to process from `right`, per the
/// re-ordering rule of step 1: if the head chunk's address is a
/// primed variable under `sub_r`, move it to the back (a concrete address is
/// needed first). Returns the chosen index.
#[must_use] pub fn select_next_right(right: &[Chunk], sub_r: &Subst) -> usize {
  fn is_primed_addr(sub_r: &Subst, c: &Chunk) -> bool {
    matches!(&*sub_r.apply_expr(chunk_root(c)), crate::term::ExprKind::Var(v) if v.is_primed())
  }
  right.iter().position(|c| !is_primed_addr(sub_r, c)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::heap::StructuredValue;
  use crate::ident::{Generator, IdentKind};
  use crate::symbol::intern;
  use crate::term::{int, var};
  use crate::ty::{SizeofTy, TypeName};

  #[test]
  fn points_to_matches_by_address_equality() {
    let g = Generator::new();
    let a = var(g.fresh(IdentKind::Normal));
    let ty = SizeofTy::plain(TypeName(intern("int")));
    let left = vec![Chunk::PointsTo { addr: a.clone(), value: StructuredValue::leaf(int(1)), ty }];
    let result = match_points_to(&left, &Subst::empty(), &a);
    assert!(matches!(result, MatchResult::Found(0)));
  }

  #[test]
  fn points_to_no_match_when_address_differs() {
    let g = Generator::new();
    let a = var(g.fresh(IdentKind::Normal));
    let b = var(g.fresh(IdentKind::Normal));
    let ty = SizeofTy::plain(TypeName(intern("int")));
    let left = vec![Chunk::PointsTo { addr: a, value: StructuredValue::leaf(int(1)), ty }];
    let result = match_points_to(&left, &Subst::empty(), &b);
    assert!(matches!(result, MatchResult::NotFound));
  }

  fn trivial_param(g: &Generator) -> Rc<ListParam> {
    let root = g.fresh(IdentKind::Normal);
    let next = g.fresh(IdentKind::Normal);
    Rc::new(ListParam { root, next, shared: vec![], evars: vec![], body: Rc::from(vec![]) })
  }

  #[test]
  fn ne_segment_matches_a_right_ne_request_directly() {
    let g = Generator::new();
    let a = var(g.fresh(IdentKind::Normal));
    let param = trivial_param(&g);
    let left = vec![Chunk::ListSeg { kind: SegKind::NE, param: param.clone(), from: a.clone(), to: a.clone(), shared: vec![] }];
    let result = match_segment(&left, &Subst::empty(), SegKind::NE, Some(&param), &a);
    assert!(matches!(result, MatchResult::Found(0)));
  }

  #[test]
  fn pe_segment_satisfies_a_right_ne_request_via_nonempty_witness() {
    let g = Generator::new();
    let a = var(g.fresh(IdentKind::Normal));
    let b = var(g.fresh(IdentKind::Normal));
    let param = trivial_param(&g);
    let left = vec![Chunk::ListSeg { kind: SegKind::PE, param: param.clone(), from: a.clone(), to: b.clone(), shared: vec![] }];
    let result = match_segment(&left, &Subst::empty(), SegKind::NE, Some(&param), &a);
    match result {
      MatchResult::FoundPeToNe { left_index, nonempty_witness } => {
        assert_eq!(left_index, 0);
        assert_eq!(nonempty_witness, (a, b));
      }
      _ => panic!("expected a PE-to-NE join"),
    }
  }

  #[test]
  fn match_segment_with_no_param_restriction_ignores_parameter_identity() {
    let g = Generator::new();
    let a = var(g.fresh(IdentKind::Normal));
    let param = trivial_param(&g);
    let left = vec![Chunk::ListSeg { kind: SegKind::NE, param, from: a.clone(), to: a.clone(), shared: vec![] }];
    let result = match_segment(&left, &Subst::empty(), SegKind::NE, None, &a);
    assert!(matches!(result, MatchResult::Found(0)));
  }
}
