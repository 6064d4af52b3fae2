//! The mutable aggregation container threaded through one
//! `check_implication` call.
//!
//! Mutable prover state threaded through recursion takes the shape of a
//! single owner struct passed by exclusive reference through the call
//! tree; on exit, the caller reads results straight off it. `ProverState`
//! is that struct, owned by [`crate::entail::check_implication`] and
//! passed as `&mut ProverState` into every recursive helper.

use crate::heap::Chunk;
use crate::symbol::Symbol;
use crate::term::{Atom, Expr};
use crate::ty::SizeofTy;

/// A deferred obligation recorded during the spatial walk, resolved at
/// finalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
  /// An array-length ordering obligation: the right-hand length must not
  /// exceed the left-hand length.
  BoundsCheck { len_left: Expr, len_right: Expr },
  /// A dynamic cast whose safety could not be conclusively decided.
  ClassCastCheck { addr: Expr, from: SizeofTy, to: SizeofTy },
}

/// Per-query bookkeeping. Reset at the entry of every
/// `check_implication` call; never shared across queries.
#[derive(Debug, Clone, Default)]
pub struct ProverState {
  /// Pure facts the caller must additionally assume (bi-abduction output).
  pub missing_pi: Vec<Atom>,
  /// Spatial chunks the caller must additionally assume.
  pub missing_sigma: Vec<Chunk>,
  /// Struct fields present on the right but not on the matched left chunk.
  pub missing_fields: Vec<(Symbol, Expr)>,
  /// Type facts the right side demanded that the left side didn't supply.
  pub missing_typ: Vec<SizeofTy>,
  /// Struct fields present on the left but not asked for on the right.
  pub frame_fields: Vec<(Symbol, Expr)>,
  /// Type facts present on the left but not asked for on the right.
  pub frame_typ: Vec<SizeofTy>,
  /// Deferred array-length obligations, resolved at finalization.
  pub bounds_checks: Vec<(Expr, Expr)>,
  /// The checks the caller must additionally discharge (or merely record).
  pub checks: Vec<Check>,
  footprint_mode: bool,
}

impl ProverState {
  /// A freshly reset state for one query, with the footprint-mode flag set
  /// per the caller's `calc_missing` argument — never a process-wide global
  #[must_use] pub fn new(calc_missing: bool) -> Self {
    ProverState { footprint_mode: calc_missing, ..ProverState::default() }
  }

  /// `true` if this query is running in bi-abductive (footprint) mode.
  #[must_use] pub fn calc_missing(&self) -> bool { self.footprint_mode }

  /// Record a missing pure fact, only when running in footprint mode (the
  /// caller decides upstream whether to even construct the fact; this
  /// assertion catches a misuse where a non-footprint path tries to push
  /// one anyway).
  pub fn push_missing_pi(&mut self, a: Atom) {
    debug_assert!(self.footprint_mode, "missing-π recorded outside calc_missing mode");
    self.missing_pi.push(a);
  }

  /// Record a missing spatial chunk (footprint mode only, see
  /// [`push_missing_pi`](Self::push_missing_pi)).
  pub fn push_missing_sigma(&mut self, c: Chunk) {
    debug_assert!(self.footprint_mode, "missing-σ recorded outside calc_missing mode");
    self.missing_sigma.push(c);
  }

  /// Record a frame fact (left-only spatial content); valid in every mode.
  pub fn push_frame_field(&mut self, name: Symbol, e: Expr) { self.frame_fields.push((name, e)); }

  /// Record a type fact the right side demanded but the left side didn't
  /// supply (footprint mode only, see [`push_missing_pi`](Self::push_missing_pi)).
  pub fn push_missing_typ(&mut self, ty: SizeofTy) {
    debug_assert!(self.footprint_mode, "missing-type recorded outside calc_missing mode");
    self.missing_typ.push(ty);
  }

  /// Record a type fact present on the left but not asked for on the
  /// right; valid in every mode.
  pub fn push_frame_typ(&mut self, ty: SizeofTy) { self.frame_typ.push(ty); }

  /// Queue a deferred array-length obligation for resolution at
  /// finalization.
  pub fn push_bounds_check(&mut self, len_left: Expr, len_right: Expr) {
    self.bounds_checks.push((len_left, len_right));
  }

  /// Record a check the caller must act on.
  pub fn push_check(&mut self, c: Check) { self.checks.push(c); }

  /// `true` if this query recorded no missing obligations at all — the
  /// monotonicity property means adding atoms to the
  /// input can only shrink this set, never grow it.
  #[must_use] pub fn has_no_missing(&self) -> bool {
    self.missing_pi.is_empty() && self.missing_sigma.is_empty()
    && self.missing_fields.is_empty() && self.missing_typ.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fresh_state_has_no_missing_or_frame() {
    let st = ProverState::new(true);
    assert!(st.has_no_missing());
    assert!(st.frame_fields.is_empty());
    assert!(st.checks.is_empty());
  }

  #[test]
  fn calc_missing_flag_is_per_query() {
    let a = ProverState::new(true);
    let b = ProverState::new(false);
    assert!(a.calc_missing());
    assert!(!b.calc_missing());
  }
}
