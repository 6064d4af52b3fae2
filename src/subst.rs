//! Substitutions: total maps from identifiers to expressions, represented
//! as an ordered list of (identifier -> expression) pairs sorted by
//! identifier, with no duplicates.
//!
//! Grounded on a sorted-vector-with-binary-search-insertion discipline,
//! matching the preference for `Box<[T]>`/`Vec<T>` over a full
//! balanced-tree map seen elsewhere where a simple sorted vector suffices
//! (e.g. `types/entity.rs`'s `Box<[global::Arg]>`).

use crate::ident::Ident;
use crate::term::Expr;

/// A substitution: `Ident -> Expr`, sorted by `Ident`, no duplicate domain
/// entries. The empty substitution is the identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subst {
  pairs: Vec<(Ident, Expr)>,
}

/// The outcome of [`Subst::join`] when two substitutions disagree on an
/// overlapping identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinConflict {
  /// The identifier both substitutions map, disagreeing on the target.
  pub ident: Ident,
}

impl Subst {
  /// The empty (identity) substitution.
  #[must_use] pub fn empty() -> Self { Subst::default() }

  /// Build a substitution from an iterator of pairs. Panics if the iterator
  /// contains a duplicate domain entry (an internal-invariant violation —
  /// callers should use `extend`/`join` to merge instead).
  #[must_use] pub fn from_pairs(pairs: impl IntoIterator<Item = (Ident, Expr)>) -> Self {
    let mut pairs: Vec<_> = pairs.into_iter().collect();
    pairs.sort_by_key(|(k, _)| *k);
    for w in pairs.windows(2) {
      assert_ne!(w[0].0, w[1].0, "duplicate domain entry in Subst::from_pairs");
    }
    Subst { pairs }
  }

  /// Number of bindings.
  #[must_use] pub fn len(&self) -> usize { self.pairs.len() }

  /// `true` if this substitution has no bindings.
  #[must_use] pub fn is_empty(&self) -> bool { self.pairs.is_empty() }

  /// Iterate the bindings in sorted-by-identifier order.
  pub fn iter(&self) -> impl Iterator<Item = &(Ident, Expr)> { self.pairs.iter() }

  fn position(&self, id: Ident) -> Result<usize, usize> {
    self.pairs.binary_search_by_key(&id, |(k, _)| *k)
  }

  /// **find**: look up the expression bound to `id`, if any.
  #[must_use] pub fn find(&self, id: Ident) -> Option<&Expr> {
    self.position(id).ok().map(|i| &self.pairs[i].1)
  }

  /// `true` if `id` is in the domain.
  #[must_use] pub fn contains(&self, id: Ident) -> bool { self.position(id).is_ok() }

  /// **filter**: keep only the bindings whose identifier satisfies `pred`.
  #[must_use] pub fn filter(&self, mut pred: impl FnMut(Ident) -> bool) -> Self {
    Subst { pairs: self.pairs.iter().filter(|(k, _)| pred(*k)).cloned().collect() }
  }

  /// **partition**: split into (matching, non-matching) by domain predicate.
  #[must_use] pub fn partition(&self, mut pred: impl FnMut(Ident) -> bool) -> (Self, Self) {
    let (yes, no): (Vec<_>, Vec<_>) = self.pairs.iter().cloned().partition(|(k, _)| pred(*k));
    (Subst { pairs: yes }, Subst { pairs: no })
  }

  /// **extend**: add a new binding. Fails (returning `Err`) if `id` is
  /// already in the domain — extension is only permitted at fresh
  /// identifiers.
  pub fn extend(&mut self, id: Ident, e: Expr) -> Result<(), Ident> {
    match self.position(id) {
      Ok(_) => Err(id),
      Err(i) => { self.pairs.insert(i, (id, e)); Ok(()) }
    }
  }

  /// Like `extend` but consuming and returning `self`, for fluent
  /// construction in tests and the prover's witness-building code.
  #[must_use] pub fn with(mut self, id: Ident, e: Expr) -> Self {
    self.extend(id, e).expect("Subst::with called on an already-bound identifier");
    self
  }

  /// **compose**: apply `self` first, then `other` — i.e. build the
  /// substitution `other. self` such that applying the result to an
  /// expression is the same as applying `self` then `other`. Bindings
  /// private to `other` (not also rebound by `self`) are carried through.
  #[must_use] pub fn compose(&self, other: &Subst) -> Self {
    let mut pairs: Vec<(Ident, Expr)> =
    self.pairs.iter().map(|(k, e)| (*k, other.apply_expr(e))).collect();
    for (k, e) in &other.pairs {
      if self.position(*k).is_err() { pairs.push((*k, e.clone())); }
    }
    pairs.sort_by_key(|(k, _)| *k);
    Subst { pairs }
  }

  /// **join**: merge two substitutions. Fails with the first identifier on
  /// which they disagree; identifiers present in only one side are carried
  /// through unchanged.
  pub fn join(&self, other: &Subst) -> Result<Self, JoinConflict> {
    let mut out = self.pairs.clone();
    for (k, e) in &other.pairs {
      match self.position(*k) {
        Ok(i) => if &out[i].1 != e { return Err(JoinConflict { ident: *k }) },
        Err(_) => out.push((*k, e.clone())),
      }
    }
    out.sort_by_key(|(k, _)| *k);
    Ok(Subst { pairs: out })
  }

  /// **symmetric difference**: returns `(common, left_only, right_only)`
  /// where `common` holds the (identifier, value) pairs present and equal in
  /// both.
  #[must_use] pub fn sym_diff(&self, other: &Subst) -> (Self, Self, Self) {
    let mut common = Vec::new();
    let mut left_only = Vec::new();
    let mut right_only = Vec::new();
    for (k, e) in &self.pairs {
      match other.find(*k) {
        Some(e2) if e2 == e => common.push((*k, e.clone())),
        _ => left_only.push((*k, e.clone())),
      }
    }
    for (k, e) in &other.pairs {
      if self.find(*k).is_none() { right_only.push((*k, e.clone())) }
    }
    (Subst { pairs: common }, Subst { pairs: left_only }, Subst { pairs: right_only })
  }

  /// Rewrite variables in `e` by lookup. Does **not** renormalize — callers
  /// requiring normal form must invoke `normalize::normalize_expr`
  /// explicitly.
  #[must_use] pub fn apply_expr(&self, e: &Expr) -> Expr {
    use crate::term::{mk, ExprKind};
    match &**e {
      ExprKind::Var(v) => self.find(*v).cloned().unwrap_or_else(|| e.clone()),
      ExprKind::Loc(_) | ExprKind::Const(_) | ExprKind::Sizeof(_) => e.clone(),
      ExprKind::Unop(op, a) => mk(ExprKind::Unop(*op, self.apply_expr(a))),
      ExprKind::Binop(op, a, b) => mk(ExprKind::Binop(*op, self.apply_expr(a), self.apply_expr(b))),
      ExprKind::Cast(ty, a) => mk(ExprKind::Cast(ty.clone(), self.apply_expr(a))),
      ExprKind::Field(a, f) => mk(ExprKind::Field(self.apply_expr(a), *f)),
      ExprKind::Index(a, i) => mk(ExprKind::Index(self.apply_expr(a), self.apply_expr(i))),
      ExprKind::Tuple(es) => mk(ExprKind::Tuple(es.iter().map(|e| self.apply_expr(e)).collect())),
    }
  }

  /// Rewrite variables in a pure atom by lookup (does not renormalize).
  #[must_use] pub fn apply_atom(&self, a: &crate::term::Atom) -> crate::term::Atom {
    use crate::term::Atom;
    match a {
      Atom::Eq(x, y) => Atom::Eq(self.apply_expr(x), self.apply_expr(y)),
      Atom::Ne(x, y) => Atom::Ne(self.apply_expr(x), self.apply_expr(y)),
      Atom::Le(x, y) => Atom::Le(self.apply_expr(x), self.apply_expr(y)),
      Atom::Lt(x, y) => Atom::Lt(self.apply_expr(x), self.apply_expr(y)),
      Atom::Attr { pred, args, positive } =>
      Atom::Attr { pred: *pred, args: args.iter().map(|e| self.apply_expr(e)).collect(), positive: *positive },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ident::{Generator, IdentKind};
  use crate::term::int;

  fn fresh(g: &Generator) -> Ident { g.fresh(IdentKind::Primed) }

  #[test]
  fn extend_rejects_domain_collision() {
    let g = Generator::new();
    let v = fresh(&g);
    let mut s = Subst::empty().with(v, int(1));
    assert_eq!(s.extend(v, int(2)), Err(v));
  }

  #[test]
  fn join_fails_on_disagreement() {
    let g = Generator::new();
    let v = fresh(&g);
    let a = Subst::empty().with(v, int(1));
    let b = Subst::empty().with(v, int(2));
    assert!(a.join(&b).is_err());
    let c = Subst::empty().with(v, int(1));
    assert!(a.join(&c).is_ok());
  }

  #[test]
  fn sym_diff_partitions_correctly() {
    let g = Generator::new();
    let v1 = fresh(&g);
    let v2 = fresh(&g);
    let v3 = fresh(&g);
    let a = Subst::empty().with(v1, int(1)).with(v2, int(2));
    let b = Subst::empty().with(v1, int(1)).with(v3, int(3));
    let (common, left, right) = a.sym_diff(&b);
    assert_eq!(common.len(), 1);
    assert_eq!(left.len(), 1);
    assert_eq!(right.len(), 1);
  }

  #[test]
  fn apply_does_not_renormalize() {
    use crate::term::{binop, var, BinOp};
    let g = Generator::new();
    let v = fresh(&g);
    let s = Subst::empty().with(v, int(1));
    // 1 + 1 would normalize to 2, but apply_expr must leave it folded-looking
    // only insofar as substitution itself does no folding.
    let e = binop(BinOp::Add, var(v), int(1));
    let applied = s.apply_expr(&e);
    assert_eq!(applied, binop(BinOp::Add, int(1), int(1)));
  }
}
