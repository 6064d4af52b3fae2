//! The arithmetic theory: difference-constraint saturation over the pure
//! part, plus the `check_le`/`check_lt`/`check_ne` query operations.
//!
//! Ordered sets of atoms are kept as a sorted, deduplicated `Vec` rather
//! than a hash set: the saturated fact set here follows the same
//! discipline, for the same reason — deterministic iteration order.

use smallvec::SmallVec;

use crate::config::ProverConfig;
use crate::error::ConstraintError;
use crate::intcst::IntRank;
use crate::term::{Atom, Const, Expr, ExprKind};

/// `x - y <= bound`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Diff { x: Expr, y: Expr, bound: i64 }

/// The saturated fact set backing `check_le`/`check_lt`/`check_ne`:
/// `leqs`/`lts` are represented uniformly as signed difference
/// constraints (an entry with `bound <= -1` is a strict `<`), and `neqs` is
/// kept as its own set since disequality does not saturate transitively the
/// way an ordering does.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
  diffs: Vec<Diff>,
  neqs: Vec<(Expr, Expr)>,
}

fn unordered_eq(a: &(Expr, Expr), b: &(Expr, Expr)) -> bool {
  (a.0 == b.0 && a.1 == b.1) || (a.0 == b.1 && a.1 == b.0)
}

impl ConstraintSet {
  /// Build (and saturate) a constraint set from the pure atoms of a heap.
  pub fn build(atoms: &[Atom], cfg: &ProverConfig) -> Result<Self, ConstraintError> {
    let mut cs = ConstraintSet::default();
    for a in atoms { cs.assert_atom(a) }
    cs.saturate(cfg)?;
    Ok(cs)
  }

  /// Add one pure atom's contribution to the raw (unsaturated) fact set.
  /// Atoms whose operands cannot be coerced to a signed difference are
  /// silently dropped, per ("unsigned must be coercible to signed
  /// or the fact is dropped").
  pub fn assert_atom(&mut self, a: &Atom) {
    match a {
      Atom::Le(x, y) => self.push_diff(x.clone(), y.clone(), 0),
      Atom::Lt(x, y) => self.push_diff(x.clone(), y.clone(), -1),
      Atom::Ne(x, y) => self.neqs.push((x.clone(), y.clone())),
      Atom::Eq(x, y) => { self.push_diff(x.clone(), y.clone(), 0); self.push_diff(y.clone(), x.clone(), 0) }
      Atom::Attr {.. } => {}
    }
  }

  fn push_diff(&mut self, x: Expr, y: Expr, bound: i64) {
    // Coercibility check: constant operands must be signed-representable;
    // symbolic operands are always "coercible" since no unsigned flag is
    // attached to a variable itself.
    if let ExprKind::Const(Const::Int(c)) = &*x { if c.try_as_signed().is_none() { return } }
    if let ExprKind::Const(Const::Int(c)) = &*y { if c.try_as_signed().is_none() { return } }
    match self.diffs.iter_mut().find(|d| d.x == x && d.y == y) {
      Some(d) => d.bound = d.bound.min(bound),
      None => self.diffs.push(Diff { x, y, bound }),
    }
  }

  /// Difference-constraint saturation: a `seen`/`todo`
  /// worklist, terminating when no composition improves any bound or the
  /// round budget is exhausted.
  fn saturate(&mut self, cfg: &ProverConfig) -> Result<(), ConstraintError> {
    let mut todo: SmallVec<[Diff; 16]> = self.diffs.iter().cloned().collect();
    let mut rounds = 0usize;
    while let Some(head) = todo.pop() {
      rounds += 1;
      if rounds > cfg.max_saturation_rounds {
        log::debug!("constraint saturation: exceeded {} rounds", cfg.max_saturation_rounds);
        return Err(ConstraintError::SaturationBudgetExhausted(cfg.max_saturation_rounds))
      }
      let mut novel = SmallVec::<[Diff; 4]>::new();
      for other in &self.diffs {
        // head: x - y <= n, other: y - z <= m => x - z <= n + m
        if head.y == other.x {
          let cand = Diff { x: head.x.clone(), y: other.y.clone(), bound: head.bound + other.bound };
          if self.improves(&cand) { novel.push(cand) }
        }
        // other: z - x <= m, head: x - y <= n => z - y <= m + n
        if other.y == head.x {
          let cand = Diff { x: other.x.clone(), y: head.y.clone(), bound: other.bound + head.bound };
          if self.improves(&cand) { novel.push(cand) }
        }
      }
      log::trace!("constraint saturation round {rounds}: {} novel bound(s) derived", novel.len());
      for cand in novel {
        self.insert_diff(cand.clone());
        todo.push(cand);
      }
    }
    log::trace!("constraint saturation reached a fixed point after {rounds} round(s)");
    Ok(())
  }

  fn improves(&self, cand: &Diff) -> bool {
    match self.diffs.iter().find(|d| d.x == cand.x && d.y == cand.y) {
      Some(d) => cand.bound < d.bound,
      None => true,
    }
  }

  fn insert_diff(&mut self, cand: Diff) {
    match self.diffs.iter_mut().find(|d| d.x == cand.x && d.y == cand.y) {
      Some(d) => if cand.bound < d.bound { d.bound = cand.bound },
      None => self.diffs.push(cand),
    }
  }

  /// `true` if the saturated set derives `x - x <= -1` for some `x`, or a
  /// disequality in `neqs` is contradicted by a pair of opposing `<=` facts
  /// forcing equality.
  #[must_use] pub fn is_inconsistent(&self) -> bool {
    if self.diffs.iter().any(|d| d.x == d.y && d.bound < 0) { return true }
    self.neqs.iter().any(|(e, f)| {
        self.diffs.iter().any(|d| d.x == *e && d.y == *f && d.bound <= 0)
        && self.diffs.iter().any(|d| d.x == *f && d.y == *e && d.bound <= 0)
    })
  }

  /// `check_le(e, f)`: `false` must be read as "don't know".
  #[must_use] pub fn check_le(&self, e: &Expr, f: &Expr) -> bool {
    if e == f { return true }
    if let (Some(a), Some(b)) = (const_rank(e), const_rank(f)) { return a <= b }
    self.diffs.iter().any(|d| d.x == *e && d.y == *f && d.bound <= 0)
  }

  /// `check_lt(e, f)`.
  #[must_use] pub fn check_lt(&self, e: &Expr, f: &Expr) -> bool {
    if let (Some(a), Some(b)) = (const_rank(e), const_rank(f)) { return a < b }
    self.diffs.iter().any(|d| d.x == *e && d.y == *f && d.bound <= -1)
  }

  /// `check_ne(e, f)`.
  #[must_use] pub fn check_ne(&self, e: &Expr, f: &Expr) -> bool {
    if e == f { return false }
    if let (Some(a), Some(b)) = (const_rank(e), const_rank(f)) { return a != b }
    if self.neqs.iter().any(|p| unordered_eq(p, &(e.clone(), f.clone()))) { return true }
    self.check_lt(e, f) || self.check_lt(f, e)
  }

  /// `get_bounds(e)`: the tightest known upper and lower constant bounds on
  /// `e`, combining direct `e <= n` / `n < e` facts with anything derivable
  /// via saturation.
  #[must_use] pub fn get_bounds(&self, e: &Expr) -> (Option<i64>, Option<i64>) {
    if let ExprKind::Const(Const::Int(c)) = &**e {
      if let Some(v) = c.try_as_signed() { return (Some(v), Some(v)) }
    }
    let mut upper = None;
    let mut lower = None;
    for d in &self.diffs {
      if &d.x == e {
        if let ExprKind::Const(Const::Int(c)) = &*d.y {
          if let Some(k) = c.try_as_signed() {
            let cand = d.bound + k;
            upper = Some(upper.map_or(cand, |u: i64| u.min(cand)));
          }
        }
      }
      if &d.y == e {
        if let ExprKind::Const(Const::Int(c)) = &*d.x {
          if let Some(k) = c.try_as_signed() {
            let cand = k - d.bound;
            lower = Some(lower.map_or(cand, |l: i64| l.max(cand)));
          }
        }
      }
    }
    (upper, lower)
  }

  /// `compute_upper_bound_of_exp(e)`.
  #[must_use] pub fn compute_upper_bound(&self, e: &Expr) -> Option<i64> { self.get_bounds(e).0 }
}

/// Compare two expressions as ranked constants, where both integer constants
/// and `sizeof`-type terms participate via the shared signed/rank ordering
/// described in ("sizeof-type differences use the type-size
/// ordering").
fn const_rank(e: &Expr) -> Option<i64> {
  match &**e {
    ExprKind::Const(Const::Int(c)) => c.try_as_signed(),
    ExprKind::Sizeof(ty) if ty.len.is_none() => Some(i64::from(type_rank(ty).size_bytes())),
    _ => None,
  }
}

fn type_rank(ty: &crate::ty::SizeofTy) -> IntRank {
  // A lightweight name-based mapping standing in for the full type
  // environment's declared sizes, sufficient for the primitive integer
  // types the constraint engine needs to order.
  match ty.name.0.to_string().as_str() {
    "char" | "i8" | "u8" | "bool" => IntRank::Char,
    "short" | "i16" | "u16" => IntRank::Short,
    "int" | "i32" | "u32" => IntRank::Int,
    "long" | "i64" | "u64" => IntRank::Long,
    "longlong" => IntRank::LongLong,
    "i128" | "u128" => IntRank::Int128,
    _ => IntRank::Int,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ident::{Generator, IdentKind};
  use crate::term::{int, var};

  fn vars() -> (Generator, Expr, Expr, Expr) {
    let g = Generator::new();
    let x = var(g.fresh(IdentKind::Normal));
    let y = var(g.fresh(IdentKind::Normal));
    let z = var(g.fresh(IdentKind::Normal));
    (g, x, y, z)
  }

  #[test]
  fn transitive_le_saturates() {
    let (_g, x, y, z) = vars();
    let cfg = ProverConfig::default();
    let cs = ConstraintSet::build(&[Atom::Le(x.clone(), y.clone()), Atom::Le(y, z.clone())], &cfg).unwrap();
    assert!(cs.check_le(&x, &z));
  }

  #[test]
  fn inconsistency_from_cycle() {
    let (_g, x, y, _z) = vars();
    let cfg = ProverConfig::default();
    let cs = ConstraintSet::build(&[
        Atom::Le(x.clone(), y.clone()),
        Atom::Lt(y, x),
      ], &cfg).unwrap();
    assert!(cs.is_inconsistent());
  }

  #[test]
  fn neq_vs_mutual_le_is_inconsistent() {
    let (_g, x, y, _z) = vars();
    let cfg = ProverConfig::default();
    let cs = ConstraintSet::build(&[
        Atom::Le(x.clone(), y.clone()),
        Atom::Le(y.clone(), x.clone()),
        Atom::Ne(x, y),
      ], &cfg).unwrap();
    assert!(cs.is_inconsistent());
  }

  #[test]
  fn bounds_from_constants() {
    let (_g, x, _y, _z) = vars();
    let cfg = ProverConfig::default();
    let cs = ConstraintSet::build(&[Atom::Le(x.clone(), int(10)), Atom::Lt(int(0), x.clone())], &cfg).unwrap();
    let (upper, lower) = cs.get_bounds(&x);
    assert_eq!(upper, Some(10));
    assert_eq!(lower, Some(1));
  }

  #[test]
  fn saturation_is_a_fixed_point() {
    let (_g, x, y, z) = vars();
    let cfg = ProverConfig::default();
    let mut cs1 = ConstraintSet::build(&[Atom::Le(x.clone(), y.clone()), Atom::Le(y.clone(), z.clone())], &cfg).unwrap();
    let before = cs1.diffs.clone();
    cs1.saturate(&cfg).unwrap();
    assert_eq!(before.len(), cs1.diffs.len());
  }
}
