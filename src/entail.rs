//! The central entailment algorithm: `check_implication` and the
//! public API surface built on top of it.
//!
//! Proof failure is modeled as a `Result` with a rich error variant rather
//! than exceptions or sentinels: every helper below threads
//! `Result<_, ImplError>`. `calc_missing`-mode recovery is decided inline at
//! each recursive descent site (struct fields, array indices, segment
//! matching, expression entailment): when the site cannot find what it
//! needs, it records the obligation on `ProverState` and returns `Ok(())`
//! instead of propagating a failure, exactly where the failure would
//! otherwise have been raised.

use crate::config::ProverConfig;
use crate::constraint::ConstraintSet;
use crate::error::{ImplError, ImplFailKind, ProofFailure};
use crate::heap::{self, Chunk, SegKind, StructuredValue};
use crate::ident::{Generator, IdentKind};
use crate::matcher::{self, MatchResult};
use crate::prover_state::{Check, ProverState};
use crate::subst::Subst;
use crate::subtype;
use crate::term::{self, Atom, Expr, ExprKind};
use crate::ty::TypeEnv;

/// A symbolic heap: `(substitution, pure-atoms, spatial-atoms)`.
#[derive(Debug, Clone, Default)]
pub struct SymHeap {
  pub subst: Subst,
  pub pure: Vec<Atom>,
  pub spatial: Vec<Chunk>,
}

impl SymHeap {
  /// A heap with no stored substitution, pure, or spatial content.
  #[must_use] pub fn empty() -> Self { SymHeap::default() }
}

/// The successful outcome of `check_implication_for_footprint`:
/// the two witness substitutions, the residual frame, and the full prover
/// state recording missing/frame/checks bookkeeping.
#[derive(Debug, Clone)]
pub struct ImplOk {
  pub subs: (Subst, Subst),
  pub frame: Vec<Chunk>,
  pub state: ProverState,
}

struct Budget { spent: u64, cap: u64 }

impl Budget {
  fn pay(&mut self) -> Result<(), ImplError> {
    self.spent += 1;
    if self.spent > self.cap { Err(ImplError::TimeBudgetExhausted) } else { Ok(()) }
  }
}

/// Rewrite variables in `e1`/`e2` under the current witness substitutions
/// and extend them so every instance of `e1[σ_L]` is an instance of
/// `e2[σ_R]`.
fn exp_imply(
  e1: &Expr, e2: &Expr, sub_l: &mut Subst, sub_r: &mut Subst, gen: &Generator,
  calc_missing: bool, state: &mut ProverState,
) -> Result<(), ImplError> {
  let l = sub_l.apply_expr(e1);
  let r = sub_r.apply_expr(e2);
  if l == r { return Ok(()) }

  if let ExprKind::Var(vr) = &*r {
    if vr.is_primed() {
      if term::occurs(vr, &l) { return Err(ImplError::Fail(ProofFailure::new(
              ImplFailKind::OccursCheck(*vr, l), (sub_l.clone(), sub_r.clone())))) }
      sub_r.extend(*vr, l).expect("checked above: vr not yet bound in σ_R lookup path");
      return Ok(())
    }
  }
  if let ExprKind::Var(vl) = &*l {
    if vl.is_primed() {
      if term::occurs(vl, &r) { return Err(ImplError::Fail(ProofFailure::new(
              ImplFailKind::OccursCheck(*vl, r), (sub_l.clone(), sub_r.clone())))) }
      sub_l.extend(*vl, r).expect("checked above: vl not yet bound");
      return Ok(())
    }
  }
  // Two distinct primed variables neither side could bind the other into:
  // unify via a fresh normal identifier.
  if let (ExprKind::Var(vl), ExprKind::Var(vr)) = (&*l, &*r) {
    if vl.is_primed() && vr.is_primed() {
      let fresh = term::var(gen.fresh(IdentKind::Normal));
      sub_l.extend(*vl, fresh.clone()).expect("vl unbound on this path");
      sub_r.extend(*vr, fresh).expect("vr unbound on this path");
      return Ok(())
    }
  }
  match (&*l, &*r) {
    (ExprKind::Const(a), ExprKind::Const(b)) => if a == b { Ok(()) } else {
      Err(ImplError::Fail(ProofFailure::new(ImplFailKind::UnequalExprs(l.clone(), r.clone()), (sub_l.clone(), sub_r.clone()))))
    },
    (ExprKind::Sizeof(t1), ExprKind::Sizeof(t2)) => {
      let names_equal = t1.name == t2.name;
      let annot_equal = match (&t1.annot, &t2.annot) {
        (Some(a), Some(b)) => a.equal_modulo_flag(b),
        (None, None) => true,
        _ => false,
      };
      if names_equal && annot_equal { Ok(()) } else if calc_missing {
        state.push_missing_pi(Atom::Eq(l.clone(), r.clone())); Ok(())
      } else {
        Err(ImplError::Fail(ProofFailure::new(ImplFailKind::UnequalExprs(l, r), (sub_l.clone(), sub_r.clone()))))
      }
    }
    (ExprKind::Field(a1, f1), ExprKind::Field(a2, f2)) if f1 == f2 =>
    exp_imply(a1, a2, sub_l, sub_r, gen, calc_missing, state),
    (ExprKind::Index(a1, i1), ExprKind::Index(a2, i2)) => {
      exp_imply(a1, a2, sub_l, sub_r, gen, calc_missing, state)?;
      exp_imply(i1, i2, sub_l, sub_r, gen, calc_missing, state)
    }
    (ExprKind::Binop(op1, a1, b1), ExprKind::Binop(op2, a2, b2)) if op1 == op2 => {
      exp_imply(a1, a2, sub_l, sub_r, gen, calc_missing, state)?;
      exp_imply(b1, b2, sub_l, sub_r, gen, calc_missing, state)
    }
    _ if calc_missing => { state.push_missing_pi(Atom::Eq(l, r)); Ok(()) }
    _ => Err(ImplError::Fail(ProofFailure::new(ImplFailKind::UnequalExprs(l, r), (sub_l.clone(), sub_r.clone())))),
  }
}

/// Entail structured values field-by-field / index-by-index.
fn sexp_imply(
  lv: &StructuredValue, rv: &StructuredValue, sub_l: &mut Subst, sub_r: &mut Subst, gen: &Generator,
  calc_missing: bool, state: &mut ProverState,
) -> Result<(), ImplError> {
  match (lv, rv) {
    (StructuredValue::Leaf(e1, _), StructuredValue::Leaf(e2, _)) => exp_imply(e1, e2, sub_l, sub_r, gen, calc_missing, state),
    (StructuredValue::Struct(fs_l), StructuredValue::Struct(fs_r)) => {
      let (mut i, mut j) = (0, 0);
      while i < fs_l.len() || j < fs_r.len() {
        match (fs_l.get(i), fs_r.get(j)) {
          (Some((nl, vl)), Some((nr, vr))) if nl == nr => {
            sexp_imply(vl, vr, sub_l, sub_r, gen, calc_missing, state)?;
            i += 1; j += 1;
          }
          (Some((nl, vl)), Some((nr, _))) if nl < nr => { record_field_frame(state, *nl, vl); i += 1 }
          (Some(_), Some((nr, vr))) => { record_field_missing(state, calc_missing, *nr, vr)?; j += 1 }
          (Some((nl, vl)), None) => { record_field_frame(state, *nl, vl); i += 1 }
          (None, Some((nr, vr))) => { record_field_missing(state, calc_missing, *nr, vr)?; j += 1 }
          (None, None) => unreachable!(),
        }
      }
      Ok(())
    }
    (StructuredValue::Array { length: ll, entries: el, .. }, StructuredValue::Array { length: lr, entries: er, .. }) => {
      state.push_bounds_check(ll.clone(), lr.clone());
      let (mut i, mut j) = (0, 0);
      while i < el.len() || j < er.len() {
        match (el.get(i), er.get(j)) {
          (Some((ix_l, vl)), Some((ix_r, vr))) if ix_l == ix_r => {
            sexp_imply(vl, vr, sub_l, sub_r, gen, calc_missing, state)?;
            i += 1; j += 1;
          }
          (Some(_), _) => i += 1,
          (None, Some((_, vr))) => {
            if !calc_missing { return Err(ImplError::Fail(ProofFailure::new(ImplFailKind::Unimplemented("array index missing without calc_missing"), (sub_l.clone(), sub_r.clone())))) }
            let _ = vr;
            j += 1;
          }
          (None, None) => unreachable!(),
        }
      }
      Ok(())
    }
    _ => Err(ImplError::Fail(ProofFailure::new(ImplFailKind::Unimplemented("sexp_imply: mismatched value shapes"), (sub_l.clone(), sub_r.clone())))),
  }
}

fn record_field_frame(state: &mut ProverState, name: crate::symbol::Symbol, v: &StructuredValue) {
  if let StructuredValue::Leaf(e, _) = v { state.push_frame_field(name, e.clone()) }
}

fn record_field_missing(state: &mut ProverState, calc_missing: bool, name: crate::symbol::Symbol, v: &StructuredValue) -> Result<(), ImplError> {
  if !calc_missing {
    return Err(ImplError::Fail(ProofFailure::new(ImplFailKind::Unimplemented("struct field missing without calc_missing"), (Subst::empty(), Subst::empty()))))
  }
  if let StructuredValue::Leaf(e, _) = v { state.missing_fields.push((name, e.clone())) }
  Ok(())
}

fn handle_type_entail(
  addr: &Expr, lty: &crate::ty::SizeofTy, rty: &crate::ty::SizeofTy, env: &dyn TypeEnv,
  calc_missing: bool, state: &mut ProverState,
) -> Result<(), ImplError> {
  match subtype::texp_imply(env, lty, rty) {
    Ok(_) => {
      state.push_frame_typ(lty.clone());
      Ok(())
    }
    Err(amb) => {
      if calc_missing {
        state.push_check(Check::ClassCastCheck { addr: addr.clone(), from: amb.from.clone(), to: amb.to.clone() });
        state.push_missing_typ(amb.to.clone());
        Ok(())
      } else {
        Err(ImplError::DefiniteCastFailure(addr.clone(), amb.from, amb.to))
      }
    }
  }
}

/// Remove the left segment at `i`, unroll it one step, push its body onto
/// `left` and its `PE` residual, and requeue `rhs` on `right` to be matched
/// against the now-unfolded points-to cell.
fn unroll_left_segment_and_requeue(
  left: &mut Vec<Chunk>, right: &mut Vec<Chunk>, i: usize, gen: &Generator,
  addr: Expr, value: StructuredValue, ty: crate::ty::SizeofTy,
) {
  let Chunk::ListSeg { param, from, to, shared, .. } = left.remove(i) else { unreachable!() };
  let (body, residual, _existentials) = heap::unroll_ne_list(&param, &from, &to, &shared, gen);
  left.extend(body);
  left.push(residual);
  right.push(Chunk::PointsTo { addr, value, ty });
}

/// Remove the left segment at `i` and entail its `to`/`shared` arguments
/// against the right-hand segment's, the tail bookkeeping shared by both a
/// direct segment match and a `PE`-to-`NE` join.
fn entail_segment_tail(
  left: &mut Vec<Chunk>, i: usize, to: &Expr, shared_applied: &[Expr],
  sub_l: &mut Subst, sub_r: &mut Subst, gen: &Generator, calc_missing: bool, state: &mut ProverState,
) -> Result<(), ImplError> {
  let Chunk::ListSeg { to: lto, shared: lshared, .. } = left.remove(i) else { unreachable!() };
  let to_applied = sub_r.apply_expr(to);
  exp_imply(&lto, &to_applied, sub_l, sub_r, gen, calc_missing, state)?;
  for (le, re) in lshared.iter().zip(shared_applied.iter()) {
    exp_imply(le, re, sub_l, sub_r, gen, calc_missing, state)?;
  }
  Ok(())
}

/// The worker behind both public entry points:
/// `check_implication(P₁, P₂, check_frame_empty, calc_missing)`. Logs entry
/// and exit; the actual walk lives in [`check_implication_inner_impl`].
pub fn check_implication_inner(
  p1: &SymHeap, p2: &SymHeap, check_frame_empty: bool, calc_missing: bool,
  env: &dyn TypeEnv, cfg: &ProverConfig,
) -> Result<ImplOk, ImplError> {
  log::debug!(
    "check_implication: entering (left spatial={}, right spatial={}, check_frame_empty={check_frame_empty}, calc_missing={calc_missing})",
    p1.spatial.len(), p2.spatial.len(),
  );
  let result = check_implication_inner_impl(p1, p2, check_frame_empty, calc_missing, env, cfg);
  match &result {
    Ok(ok) => log::debug!("check_implication: proved (frame len={}, missing_sigma={}, missing_pi={})",
      ok.frame.len(), ok.state.missing_sigma.len(), ok.state.missing_pi.len()),
    Err(e) => log::debug!("check_implication: failed ({e})"),
  }
  result
}

fn check_implication_inner_impl(
  p1: &SymHeap, p2: &SymHeap, check_frame_empty: bool, calc_missing: bool,
  env: &dyn TypeEnv, cfg: &ProverConfig,
) -> Result<ImplOk, ImplError> {
  let gen = Generator::new();
  let mut state = ProverState::new(calc_missing);
  let mut budget = Budget { spent: 0, cap: cfg.pay_budget };

  // Preamble: the caller-visible equality context, restricted to
  // normal-to-normal pairs.
  let sigma1_0 = Subst::from_pairs(p1.subst.iter()
    .filter(|(id, e)| id.is_normal() && matches!(&**e, ExprKind::Var(v) if v.is_normal()))
    .map(|(id, e)| (*id, e.clone())));

  let cs1 = ConstraintSet::build(&p1.pure, cfg).map_err(|_| ImplError::TimeBudgetExhausted)?;
  if cs1.is_inconsistent() {
    // Inconsistent left-hand pure context: vacuously entailed.
    return Ok(ImplOk { subs: (Subst::empty(), Subst::empty()), frame: vec![], state });
  }

  let mut sub_l = Subst::empty();
  let mut sub_r = Subst::empty();

  // Pure pre-check: fast-path assignable equalities.
  let mut deferred_pi2 = Vec::new();
  for a in &p2.pure {
    match a {
      Atom::Eq(l, r) if matches!(&**r, ExprKind::Var(v) if v.is_primed()) && !matches!(&**l, ExprKind::Var(v) if v.is_primed()) => {
        if let ExprKind::Var(vr) = &**r { sub_r.extend(*vr, l.clone()).ok(); }
      }
      Atom::Eq(l, r) if matches!(&**l, ExprKind::Var(v) if v.is_primed()) => {
        if let ExprKind::Var(vl) = &**l { sub_l.extend(*vl, r.clone()).ok(); }
      }
      other => deferred_pi2.push(other.clone()),
    }
  }

  let mut left_heap: Vec<Chunk> = p1.spatial.clone();
  let mut right_heap: Vec<Chunk> = p2.spatial.clone();

  while !right_heap.is_empty() {
    budget.pay()?;
    let idx = matcher::select_next_right(&right_heap, &sub_r);
    let rhs = right_heap.remove(idx);
    match rhs {
      Chunk::PointsTo { addr, value, ty } => {
        let rhs_addr = sub_r.apply_expr(&addr);
        match matcher::match_points_to(&left_heap, &sub_l, &rhs_addr) {
          MatchResult::Found(i) => {
            let Chunk::PointsTo { value: lvalue, ty: lty, .. } = left_heap.remove(i) else { unreachable!() };
            handle_type_entail(&rhs_addr, &lty, &ty, env, calc_missing, &mut state)?;
            sexp_imply(&lvalue, &value, &mut sub_l, &mut sub_r, &gen, calc_missing, &mut state)?;
          }
          MatchResult::NotFound => {
            // Any left `NE` segment at this address can be unrolled one step
            // to expose the cell the right side wants; a left `PE` segment
            // also qualifies, provided its non-emptiness is separately proved.
            match matcher::match_segment(&left_heap, &sub_l, SegKind::NE, None, &rhs_addr) {
              MatchResult::NotFound => {
                if calc_missing {
                  state.push_missing_sigma(Chunk::PointsTo { addr: rhs_addr, value, ty });
                } else {
                  return Err(ImplError::Fail(ProofFailure::new(
                        ImplFailKind::NoMatchingChunk(Chunk::PointsTo { addr: rhs_addr, value, ty }),
                        (sub_l.clone(), sub_r.clone()))))
                }
              }
              MatchResult::Found(i) => {
                unroll_left_segment_and_requeue(&mut left_heap, &mut right_heap, i, &gen, addr, value, ty);
                continue;
              }
              MatchResult::FoundPeToNe { left_index, nonempty_witness } => {
                if calc_missing {
                  state.push_missing_pi(Atom::Ne(nonempty_witness.0, nonempty_witness.1));
                } else {
                  return Err(ImplError::Fail(ProofFailure::new(
                        ImplFailKind::PureAtomUnproved(format!("{:?} != {:?}", nonempty_witness.0, nonempty_witness.1)),
                        (sub_l.clone(), sub_r.clone()))))
                }
                unroll_left_segment_and_requeue(&mut left_heap, &mut right_heap, left_index, &gen, addr, value, ty);
                continue;
              }
            }
          }
        }
      }
      Chunk::ListSeg { kind, param, from, to, shared } => {
        let from_applied = sub_r.apply_expr(&from);
        let shared_applied: Vec<Expr> = shared.iter().map(|e| sub_r.apply_expr(e)).collect();
        if let MatchResult::Found(i) = matcher::match_points_to(&left_heap, &sub_l, &from_applied) {
          let (inst, next_id) = heap::instantiate_list_param(&param, &from_applied, &shared_applied, &gen);
          if let [Chunk::PointsTo { value: rvalue, ty: rty, .. }] = inst.body.as_slice() {
            let Chunk::PointsTo { value: lvalue, ty: lty, .. } = left_heap.remove(i) else { unreachable!() };
            handle_type_entail(&from_applied, &lty, rty, env, calc_missing, &mut state)?;
            sexp_imply(&lvalue, rvalue, &mut sub_l, &mut sub_r, &gen, calc_missing, &mut state)?;
            right_heap.push(Chunk::ListSeg { kind, param: param.clone(), from: term::var(next_id), to, shared });
          } else {
            return Err(ImplError::Fail(ProofFailure::new(
                  ImplFailKind::Unimplemented("list parameter body is not a single points-to cell"),
                  (sub_l.clone(), sub_r.clone()))))
          }
        } else {
          match matcher::match_segment(&left_heap, &sub_l, kind, Some(&param), &from_applied) {
            MatchResult::NotFound => {
              if calc_missing {
                state.push_missing_sigma(Chunk::ListSeg { kind, param, from: from_applied, to, shared: shared_applied });
              } else {
                return Err(ImplError::Fail(ProofFailure::new(
                      ImplFailKind::NoMatchingChunk(Chunk::ListSeg { kind, param, from: from_applied, to, shared: shared_applied }),
                      (sub_l.clone(), sub_r.clone()))))
              }
            }
            MatchResult::Found(i) => {
              entail_segment_tail(&mut left_heap, i, &to, &shared_applied, &mut sub_l, &mut sub_r, &gen, calc_missing, &mut state)?;
            }
            MatchResult::FoundPeToNe { left_index, nonempty_witness } => {
              entail_segment_tail(&mut left_heap, left_index, &to, &shared_applied, &mut sub_l, &mut sub_r, &gen, calc_missing, &mut state)?;
              if calc_missing {
                state.push_missing_pi(Atom::Ne(nonempty_witness.0, nonempty_witness.1));
              } else {
                return Err(ImplError::Fail(ProofFailure::new(
                      ImplFailKind::PureAtomUnproved(format!("{:?} != {:?}", nonempty_witness.0, nonempty_witness.1)),
                      (sub_l.clone(), sub_r.clone()))))
              }
            }
          }
        }
      }
      Chunk::DllSeg { kind, param, in_forward, out_back, out_forward, in_back, shared } => {
        let in_forward_applied = sub_r.apply_expr(&in_forward);
        let shared_applied: Vec<Expr> = shared.iter().map(|e| sub_r.apply_expr(e)).collect();
        if let MatchResult::Found(i) = matcher::match_points_to(&left_heap, &sub_l, &in_forward_applied) {
          let (inst, _new_blink, new_flink) = heap::instantiate_dll_param(&param, &in_forward_applied, &shared_applied, &gen);
          if let [Chunk::PointsTo { value: rvalue, ty: rty, .. }] = inst.body.as_slice() {
            let Chunk::PointsTo { value: lvalue, ty: lty, .. } = left_heap.remove(i) else { unreachable!() };
            handle_type_entail(&in_forward_applied, &lty, rty, env, calc_missing, &mut state)?;
            sexp_imply(&lvalue, rvalue, &mut sub_l, &mut sub_r, &gen, calc_missing, &mut state)?;
            right_heap.push(Chunk::DllSeg {
              kind, param: param.clone(), in_forward: term::var(new_flink), out_back: in_forward_applied,
              out_forward: sub_r.apply_expr(&out_forward), in_back: sub_r.apply_expr(&in_back), shared: shared_applied,
            });
          } else {
            return Err(ImplError::Fail(ProofFailure::new(
                  ImplFailKind::Unimplemented("dll parameter body is not a single points-to cell"),
                  (sub_l.clone(), sub_r.clone()))))
          }
        } else if calc_missing {
          state.push_missing_sigma(Chunk::DllSeg {
            kind, param, in_forward: in_forward_applied, out_back: sub_r.apply_expr(&out_back),
            out_forward: sub_r.apply_expr(&out_forward), in_back: sub_r.apply_expr(&in_back), shared: shared_applied,
          });
        } else {
          return Err(ImplError::Fail(ProofFailure::new(
                ImplFailKind::Unimplemented("doubly-linked segment entailment: no matching left cell"),
                (sub_l.clone(), sub_r.clone()))))
        }
      }
    }
  }

  // Finalization: discharge every deferred π₂ atom against the
  // prepared context.
  let mut impl_atoms: Vec<Atom> = state.missing_pi.clone();
  impl_atoms.extend(p1.pure.iter().map(|a| sub_l.apply_atom(a)));
  impl_atoms.extend(sigma1_0.iter().map(|(id, e)| Atom::Eq(term::var(*id), e.clone())));

  for a in &deferred_pi2 {
    let applied = sub_r.apply_atom(a);
    if !check_atom_against(&impl_atoms, &applied, cfg) {
      if calc_missing { state.push_missing_pi(applied); impl_atoms.push(a.clone()); }
      else {
        return Err(ImplError::Fail(ProofFailure::new(
              ImplFailKind::PureAtomUnproved(format!("{applied}")), (sub_l.clone(), sub_r.clone()))))
      }
    }
  }

  for (len_l, len_r) in state.bounds_checks.clone() {
    let len_l_applied = sub_l.apply_expr(&len_l);
    let len_r_applied = sub_r.apply_expr(&len_r);
    if !check_atom_against(&impl_atoms, &Atom::Le(len_r_applied.clone(), len_l_applied.clone()), cfg) {
      if calc_missing { state.push_check(Check::BoundsCheck { len_left: len_l_applied, len_right: len_r_applied }) }
      else { return Err(ImplError::BoundsFailed { len_l: len_l_applied, len_r: len_r_applied }) }
    }
  }

  if check_frame_empty && !left_heap.is_empty() {
    return Err(ImplError::Fail(ProofFailure::new(
          ImplFailKind::Unimplemented("non-empty frame with check_frame_empty set"), (sub_l.clone(), sub_r.clone()))))
  }

  // Keep the residual frame finite before it's handed back as input to a
  // subsequent query.
  let frame = crate::abstraction::abstract_heap(&left_heap, &cfg.abstraction_rules);

  Ok(ImplOk { subs: (sub_l, sub_r), frame, state })
}

/// Discharge a single atom against a pure context.
fn check_atom_against(context: &[Atom], a: &Atom, cfg: &ProverConfig) -> bool {
  let Ok(cs) = ConstraintSet::build(context, cfg) else { return false };
  if cs.is_inconsistent() { return true } // ex falso quodlibet,
  match a {
    Atom::Eq(l, r) => l == r || (cs.check_le(l, r) && cs.check_le(r, l)),
    Atom::Ne(l, r) => cs.check_ne(l, r),
    Atom::Le(l, r) => cs.check_le(l, r),
    Atom::Lt(l, r) => cs.check_lt(l, r),
    Atom::Attr {.. } => context.contains(a),
  }
}

/// `check_implication(P₁, P₂) → bool`: plain entailment, no
/// bi-abduction.
#[must_use] pub fn check_implication(p1: &SymHeap, p2: &SymHeap, env: &dyn TypeEnv, cfg: &ProverConfig) -> bool {
  check_implication_inner(p1, p2, false, false, env, cfg).is_ok()
}

/// `check_implication_for_footprint(P₁, P₂) → OK(...) | FAIL(checks)`:
/// bi-abductive entailment, returning the witness substitutions, frame,
/// and accumulated missing/checks bookkeeping.
pub fn check_implication_for_footprint(p1: &SymHeap, p2: &SymHeap, env: &dyn TypeEnv, cfg: &ProverConfig) -> Result<ImplOk, ImplError> {
  check_implication_inner(p1, p2, false, true, env, cfg)
}

/// `check_atom(P, a) → bool`.
#[must_use] pub fn check_atom(heap: &SymHeap, a: &Atom, cfg: &ProverConfig) -> bool {
  check_atom_against(&heap.pure, a, cfg)
}

/// `check_inconsistency(P) → bool`.
#[must_use] pub fn check_inconsistency(heap: &SymHeap, cfg: &ProverConfig) -> bool {
  ConstraintSet::build(&heap.pure, cfg).map(|cs| cs.is_inconsistent()).unwrap_or(false)
}

/// `check_allocatedness(P, e) → bool`: `true` if `e` is the root
/// address of some chunk in `P`'s spatial part.
#[must_use] pub fn check_allocatedness(heap: &SymHeap, e: &Expr) -> bool {
  heap.spatial.iter().any(|c| match c {
      Chunk::PointsTo { addr, .. } => addr == e,
      Chunk::ListSeg { from, .. } => from == e,
      Chunk::DllSeg { in_forward, .. } => in_forward == e,
  })
}

/// `check_disequal(P, e, f) → bool`.
#[must_use] pub fn check_disequal(heap: &SymHeap, e: &Expr, f: &Expr, cfg: &ProverConfig) -> bool {
  ConstraintSet::build(&heap.pure, cfg).map(|cs| cs.check_ne(e, f)).unwrap_or(false)
}

/// `check_equal(P, e, f) → bool`.
#[must_use] pub fn check_equal(heap: &SymHeap, e: &Expr, f: &Expr, cfg: &ProverConfig) -> bool {
  e == f || ConstraintSet::build(&heap.pure, cfg).map(|cs| cs.check_le(e, f) && cs.check_le(f, e)).unwrap_or(false)
}

/// `get_bounds(P, e) → (upper?, lower?)`.
#[must_use] pub fn get_bounds(heap: &SymHeap, e: &Expr, cfg: &ProverConfig) -> (Option<i64>, Option<i64>) {
  ConstraintSet::build(&heap.pure, cfg).map(|cs| cs.get_bounds(e)).unwrap_or((None, None))
}

/// `compute_upper_bound_of_exp(P, e) → n?`.
#[must_use] pub fn compute_upper_bound_of_exp(heap: &SymHeap, e: &Expr, cfg: &ProverConfig) -> Option<i64> {
  ConstraintSet::build(&heap.pure, cfg).ok().and_then(|cs| cs.compute_upper_bound(e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::heap::StructuredValue;
  use crate::ident::IdentKind;
  use crate::symbol::intern;
  use crate::term::int;
  use crate::ty::{MapTypeEnv, SizeofTy, SubtypeAnnot, TypeDef, TypeName};

  fn tn(s: &str) -> TypeName { TypeName(intern(s)) }

  #[test]
  fn scenario_a_pure_equality_entailment() {
    let gen = Generator::new();
    let env = MapTypeEnv::new();
    let cfg = ProverConfig::default();
    let x0 = gen.fresh(IdentKind::Normal);
    let y0 = term::var(gen.fresh(IdentKind::Normal));
    let p1 = SymHeap { subst: Subst::empty().with(x0, y0.clone()), pure: vec![], spatial: vec![] };
    let p2 = SymHeap { subst: Subst::empty(), pure: vec![Atom::Eq(term::var(x0), y0)], spatial: vec![] };
    let result = check_implication_inner(&p1, &p2, false, false, &env, &cfg).unwrap();
    assert!(result.frame.is_empty());
    assert!(result.state.has_no_missing());
  }

  #[test]
  fn scenario_b_points_to_reordering() {
    let gen = Generator::new();
    let env = MapTypeEnv::new();
    let cfg = ProverConfig::default();
    let ty = SizeofTy::plain(tn("int"));
    let a = term::var(gen.fresh(IdentKind::Normal));
    let b = term::var(gen.fresh(IdentKind::Normal));
    let spatial_fwd = vec![
      Chunk::PointsTo { addr: a.clone(), value: StructuredValue::leaf(int(1)), ty: ty.clone() },
      Chunk::PointsTo { addr: b.clone(), value: StructuredValue::leaf(int(2)), ty: ty.clone() },
    ];
    let spatial_rev = vec![
      Chunk::PointsTo { addr: b, value: StructuredValue::leaf(int(2)), ty: ty.clone() },
      Chunk::PointsTo { addr: a, value: StructuredValue::leaf(int(1)), ty },
    ];
    let p1 = SymHeap { subst: Subst::empty(), pure: vec![], spatial: spatial_fwd };
    let p2 = SymHeap { subst: Subst::empty(), pure: vec![], spatial: spatial_rev };
    let result = check_implication_inner(&p1, &p2, false, false, &env, &cfg).unwrap();
    assert!(result.frame.is_empty());
  }

  #[test]
  fn scenario_c_biabduction_of_missing_cell() {
    let gen = Generator::new();
    let env = MapTypeEnv::new();
    let cfg = ProverConfig::default();
    let ty = SizeofTy::plain(tn("int"));
    let a = term::var(gen.fresh(IdentKind::Normal));
    let v = term::var(gen.fresh(IdentKind::Normal));
    let b = term::var(gen.fresh(IdentKind::Footprint));
    let w = term::var(gen.fresh(IdentKind::Footprint));
    let p1 = SymHeap { subst: Subst::empty(), pure: vec![], spatial: vec![Chunk::PointsTo { addr: a.clone(), value: StructuredValue::leaf(v.clone()), ty: ty.clone() }] };
    let p2 = SymHeap { subst: Subst::empty(), pure: vec![], spatial: vec![
        Chunk::PointsTo { addr: a, value: StructuredValue::leaf(v), ty: ty.clone() },
        Chunk::PointsTo { addr: b, value: StructuredValue::leaf(w), ty },
    ] };
    let result = check_implication_for_footprint(&p1, &p2, &env, &cfg).unwrap();
    assert!(result.frame.is_empty());
    assert_eq!(result.state.missing_sigma.len(), 1);
  }

  #[test]
  fn scenario_d_list_unrolling() {
    let gen = Generator::new();
    let env = MapTypeEnv::new();
    let cfg = ProverConfig::default();
    let ty = SizeofTy::plain(tn("Node"));
    let next_field = intern("next");
    let root = gen.fresh(IdentKind::Normal);
    let next_formal = gen.fresh(IdentKind::Normal);
    let body: std::rc::Rc<[Chunk]> = std::rc::Rc::from(vec![Chunk::PointsTo {
          addr: term::var(root),
          value: StructuredValue::struct_of(vec![(next_field, StructuredValue::leaf(term::var(next_formal)))]),
          ty: ty.clone(),
    }]);
    let param = std::rc::Rc::new(crate::heap::ListParam { root, next: next_formal, shared: vec![], evars: vec![], body });

    let a = term::var(gen.fresh(IdentKind::Normal));
    let c = term::var(gen.fresh(IdentKind::Normal));
    let n = term::var(gen.fresh(IdentKind::Primed));

    let p1 = SymHeap { subst: Subst::empty(), pure: vec![], spatial: vec![
        Chunk::ListSeg { kind: SegKind::NE, param: param.clone(), from: a.clone(), to: c.clone(), shared: vec![] },
    ] };
    let p2 = SymHeap { subst: Subst::empty(), pure: vec![], spatial: vec![
        Chunk::PointsTo { addr: a, value: StructuredValue::struct_of(vec![(next_field, StructuredValue::leaf(n.clone()))]), ty },
        Chunk::ListSeg { kind: SegKind::PE, param, from: n, to: c, shared: vec![] },
    ] };
    let result = check_implication_inner(&p1, &p2, false, false, &env, &cfg).unwrap();
    assert!(result.frame.is_empty());
    assert!(result.state.has_no_missing());
  }

  #[test]
  fn scenario_e_difference_constraint() {
    let gen = Generator::new();
    let cfg = ProverConfig::default();
    let x = term::var(gen.fresh(IdentKind::Normal));
    let y = term::var(gen.fresh(IdentKind::Normal));
    let z = term::var(gen.fresh(IdentKind::Normal));
    let heap = SymHeap { subst: Subst::empty(), pure: vec![Atom::Le(x.clone(), y.clone()), Atom::Le(y, z.clone())], spatial: vec![] };
    assert!(check_atom(&heap, &Atom::Le(x.clone(), z.clone()), &cfg));

    let mut pure2 = heap.pure.clone();
    pure2.push(Atom::Lt(z, x));
    let heap2 = SymHeap { pure: pure2, ..heap };
    assert!(check_inconsistency(&heap2, &cfg));
  }

  #[test]
  fn scenario_f_dynamic_cast_triggers_a_check() {
    let gen = Generator::new();
    let cfg = ProverConfig::default();
    let mut env = MapTypeEnv::new();
    env.insert(tn("T1"), TypeDef::default());
    env.insert(tn("T2"), TypeDef::default());
    let a = term::var(gen.fresh(IdentKind::Normal));
    let ty_l = SizeofTy { name: tn("T1"), len: None, annot: Some(SubtypeAnnot::Exact) };
    let ty_r = SizeofTy { name: tn("T2"), len: None, annot: Some(SubtypeAnnot::Subtypes { excluding: std::rc::Rc::from(vec![]), usage: crate::ty::CastUsage::Cast }) };
    let p1 = SymHeap { subst: Subst::empty(), pure: vec![], spatial: vec![Chunk::PointsTo { addr: a.clone(), value: StructuredValue::leaf(int(0)), ty: ty_l }] };
    let p2 = SymHeap { subst: Subst::empty(), pure: vec![], spatial: vec![Chunk::PointsTo { addr: a, value: StructuredValue::leaf(int(0)), ty: ty_r }] };
    let result = check_implication_for_footprint(&p1, &p2, &env, &cfg).unwrap();
    assert!(result.state.checks.iter().any(|c| matches!(c, Check::ClassCastCheck {.. })));
  }

  #[test]
  fn scenario_g_dll_segment_biabducts_when_no_left_cell_matches() {
    let gen = Generator::new();
    let env = MapTypeEnv::new();
    let cfg = ProverConfig::default();
    let ty = SizeofTy::plain(tn("DNode"));
    let blink_field = intern("blink");
    let flink_field = intern("flink");
    let root = gen.fresh(IdentKind::Normal);
    let blink_formal = gen.fresh(IdentKind::Normal);
    let flink_formal = gen.fresh(IdentKind::Normal);
    let body: std::rc::Rc<[Chunk]> = std::rc::Rc::from(vec![Chunk::PointsTo {
      addr: term::var(root),
      value: StructuredValue::struct_of(vec![
        (blink_field, StructuredValue::leaf(term::var(blink_formal))),
        (flink_field, StructuredValue::leaf(term::var(flink_formal))),
      ]),
      ty: ty.clone(),
    }]);
    let param = std::rc::Rc::new(crate::heap::DllParam { root, blink: blink_formal, flink: flink_formal, shared: vec![], evars: vec![], body });

    let ob = term::var(gen.fresh(IdentKind::Footprint));
    let of = term::var(gen.fresh(IdentKind::Footprint));
    let ib = term::var(gen.fresh(IdentKind::Footprint));

    let p1 = SymHeap { subst: Subst::empty(), pure: vec![], spatial: vec![] };
    let p2 = SymHeap { subst: Subst::empty(), pure: vec![], spatial: vec![
      Chunk::DllSeg { kind: SegKind::NE, param, in_forward: term::var(gen.fresh(IdentKind::Footprint)), out_back: ob, out_forward: of, in_back: ib, shared: vec![] },
    ]};
    let result = check_implication_for_footprint(&p1, &p2, &env, &cfg).unwrap();
    assert_eq!(result.state.missing_sigma.len(), 1);
    assert!(matches!(result.state.missing_sigma[0], Chunk::DllSeg { .. }));
  }
}
