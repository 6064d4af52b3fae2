//! Canonicalization of expressions and atoms.
//!
//! The normalizer is required to be a pure function of its input and
//! idempotent (`N(N(x)) = N(x)`); every rewrite rule below is written so
//! that its output is already a fixed point of the rule set, which is what
//! makes that property hold (see the `idempotent_on_already_normal_input`
//! test).

use crate::intcst::IntConst;
use crate::term::{expr_cmp, mk, Atom, BinOp, Const, Expr, ExprKind, UnOp};

/// Fold a binary integer operation, if both sides are integer constants and
/// the operation is everywhere-defined. Division/modulo by the constant
/// zero is deliberately left unfolded — see `checked_div` for a strict
/// variant used where the caller needs to observe the division-by-zero
/// condition explicitly.
fn fold_int_binop(op: BinOp, a: IntConst, b: IntConst) -> Option<IntConst> {
  let (x, y) = (a.as_signed(), b.as_signed());
  Some(match op {
      BinOp::Add | BinOp::PtrAdd => IntConst::from_i64(x.wrapping_add(y)),
      BinOp::Sub | BinOp::PtrSub => IntConst::from_i64(x.wrapping_sub(y)),
      BinOp::Mul => IntConst::from_i64(x.wrapping_mul(y)),
      BinOp::Div => { if y == 0 { return None } IntConst::from_i64(x.wrapping_div(y)) }
      BinOp::Mod => { if y == 0 { return None } IntConst::from_i64(x.wrapping_rem(y)) }
      BinOp::BAnd => IntConst::from_i64(x & y),
      BinOp::BOr => IntConst::from_i64(x | y),
      BinOp::BXor => IntConst::from_i64(x ^ y),
      BinOp::Shl => IntConst::from_i64(x.wrapping_shl(y as u32)),
      BinOp::Shr => IntConst::from_i64(x.wrapping_shr(y as u32)),
      BinOp::LAnd => IntConst::from_i64(i64::from(x != 0 && y != 0)),
      BinOp::LOr => IntConst::from_i64(i64::from(x != 0 || y != 0)),
      BinOp::Eq => IntConst::from_i64(i64::from(a == b)),
      BinOp::Ne => IntConst::from_i64(i64::from(a != b)),
      BinOp::Le => IntConst::from_i64(i64::from(a <= b)),
      BinOp::Lt => IntConst::from_i64(i64::from(a < b)),
  })
}

/// Strict division used by callers (e.g. the constraint engine's bound
/// arithmetic) that need to observe a division-by-zero rather than leave the
/// term unfolded.
pub fn checked_div(a: IntConst, b: IntConst) -> Result<IntConst, crate::error::NormalizeError> {
  if b.as_signed() == 0 {
    return Err(crate::error::NormalizeError::DivByZero(crate::term::int_const(a)))
  }
  Ok(IntConst::from_i64(a.as_signed().wrapping_div(b.as_signed())))
}

fn as_int(e: &Expr) -> Option<IntConst> {
  match &**e { ExprKind::Const(Const::Int(c)) => Some(*c), _ => None }
}

/// Normalize an expression to canonical form. Idempotent and a pure function
/// of `e`.
#[must_use] pub fn normalize_expr(e: &Expr) -> Expr {
  match &**e {
    ExprKind::Var(_) | ExprKind::Loc(_) | ExprKind::Const(_) => e.clone(),
    ExprKind::Sizeof(ty) => {
      let ty = crate::ty::SizeofTy { name: ty.name, len: ty.len.as_ref().map(normalize_expr), annot: ty.annot.clone() };
      mk(ExprKind::Sizeof(ty))
    }
    ExprKind::Unop(op, a) => {
      let a = normalize_expr(a);
      match (op, &*a) {
        // neg(neg x) -> x
        (UnOp::Neg, ExprKind::Unop(UnOp::Neg, inner)) => inner.clone(),
        (UnOp::BNot, ExprKind::Unop(UnOp::BNot, inner)) => inner.clone(),
        (UnOp::Neg, ExprKind::Const(Const::Int(c))) => crate::term::int_const(c.neg()),
        _ => mk(ExprKind::Unop(*op, a)),
      }
    }
    ExprKind::Binop(op, a, b) => normalize_binop(*op, normalize_expr(a), normalize_expr(b)),
    ExprKind::Cast(ty, a) => {
      let a = normalize_expr(a);
      // Flatten nested casts: the outer type wins; collapse to a no-op when
      // casting to the same type the inner cast already produced.
      if let ExprKind::Cast(_, inner) = &*a {
        return mk(ExprKind::Cast(ty.clone(), inner.clone()))
      }
      mk(ExprKind::Cast(ty.clone(), a))
    }
    ExprKind::Field(a, f) => mk(ExprKind::Field(normalize_expr(a), *f)),
    ExprKind::Index(a, i) => mk(ExprKind::Index(normalize_expr(a), normalize_expr(i))),
    ExprKind::Tuple(es) => mk(ExprKind::Tuple(es.iter().map(normalize_expr).collect())),
  }
}

fn is_additive_inverse(a: &Expr, b: &Expr) -> bool {
  matches!(&**b, ExprKind::Unop(UnOp::Neg, inner) if inner == a)
  || matches!(&**a, ExprKind::Unop(UnOp::Neg, inner) if inner == b)
}

fn normalize_binop(op: BinOp, a: Expr, b: Expr) -> Expr {
  // Constant folding.
  if let (Some(x), Some(y)) = (as_int(&a), as_int(&b)) {
    if let Some(c) = fold_int_binop(op, x, y) { return crate::term::int_const(c) }
  }
  // Cancelation of additive inverses: x + (-x) -> 0, x - x -> 0.
  if matches!(op, BinOp::Add) && is_additive_inverse(&a, &b) { return crate::term::int(0) }
  if matches!(op, BinOp::Sub) && a == b { return crate::term::int(0) }

  // (x + c1) + c2 -> x + (c1 + c2), and symmetrically for the subtraction
  // encodings that show up once commutative reordering has run once.
  if matches!(op, BinOp::Add) {
    if let ExprKind::Binop(BinOp::Add, x, c1) = &*a {
      if let (Some(c1), Some(c2)) = (as_int(c1), as_int(&b)) {
        return mk(ExprKind::Binop(BinOp::Add, x.clone(), crate::term::int_const(
              fold_int_binop(BinOp::Add, c1, c2).unwrap_or_else(|| unreachable!()))))
      }
    }
  }

  // Commutative reordering: place the larger operand (by the total
  // structural order) on the left.
  let (a, b) = if op.is_commutative() && expr_cmp(&a, &b) == std::cmp::Ordering::Less {
    (b, a)
  } else {
    (a, b)
  };
  mk(ExprKind::Binop(op, a, b))
}

/// Rewrite `(e1 <= e2) = 1`-shaped atoms into the canonical relational atom,
/// and otherwise normalize both sides and re-orient `Eq`/`Ne` atoms so that
/// the structurally smaller side is on the left (a canonical form for
/// otherwise-symmetric atoms, analogous to the commutative-operand ordering
/// for expressions).
#[must_use] pub fn normalize_atom(a: &Atom) -> Atom {
  match a {
    Atom::Eq(l, r) => {
      let l = normalize_expr(l);
      let r = normalize_expr(r);
      // `(e1 <= e2) = 1` / `(e1 < e2) = 1` canonicalize to relational atoms.
      if as_int(&r) == Some(IntConst::from_i64(1)) {
        if let ExprKind::Binop(BinOp::Le, x, y) = &*l { return Atom::Le(x.clone(), y.clone()) }
        if let ExprKind::Binop(BinOp::Lt, x, y) = &*l { return Atom::Lt(x.clone(), y.clone()) }
      }
      if expr_cmp(&l, &r) == std::cmp::Ordering::Less { Atom::Eq(r, l) } else { Atom::Eq(l, r) }
    }
    Atom::Ne(l, r) => {
      let l = normalize_expr(l);
      let r = normalize_expr(r);
      if expr_cmp(&l, &r) == std::cmp::Ordering::Less { Atom::Ne(r, l) } else { Atom::Ne(l, r) }
    }
    Atom::Le(l, r) => Atom::Le(normalize_expr(l), normalize_expr(r)),
    Atom::Lt(l, r) => Atom::Lt(normalize_expr(l), normalize_expr(r)),
    Atom::Attr { pred, args, positive } =>
    Atom::Attr { pred: *pred, args: args.iter().map(normalize_expr).collect(), positive: *positive },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::term::{binop, int, unop, var, BinOp, UnOp};
  use crate::ident::{Generator, IdentKind};

  #[test]
  fn constant_folding() {
    let e = binop(BinOp::Add, int(2), int(3));
    assert_eq!(normalize_expr(&e), int(5));
  }

  #[test]
  fn double_negation_cancels() {
    let g = Generator::new();
    let x = var(g.fresh(IdentKind::Normal));
    let e = unop(UnOp::Neg, unop(UnOp::Neg, x.clone()));
    assert_eq!(normalize_expr(&e), x);
  }

  #[test]
  fn additive_inverse_cancels() {
    let g = Generator::new();
    let x = var(g.fresh(IdentKind::Normal));
    let e = binop(BinOp::Add, x.clone(), unop(UnOp::Neg, x));
    assert_eq!(normalize_expr(&e), int(0));
  }

  #[test]
  fn nested_constant_offset_collapses() {
    let g = Generator::new();
    let x = var(g.fresh(IdentKind::Normal));
    let e = binop(BinOp::Add, binop(BinOp::Add, x.clone(), int(1)), int(2));
    let got = normalize_expr(&e);
    assert_eq!(got, binop(BinOp::Add, x, int(3)));
  }

  #[test]
  fn idempotent_on_already_normal_input() {
    let g = Generator::new();
    let x = var(g.fresh(IdentKind::Normal));
    let y = var(g.fresh(IdentKind::Normal));
    let exprs = [
      binop(BinOp::Add, x.clone(), y.clone()),
      binop(BinOp::Add, binop(BinOp::Add, x.clone(), int(1)), int(2)),
      unop(UnOp::Neg, x.clone()),
    ];
    for e in exprs {
      let once = normalize_expr(&e);
      let twice = normalize_expr(&once);
      assert_eq!(once, twice);
    }
  }

  #[test]
  fn division_by_zero_left_unfolded() {
    let e = binop(BinOp::Div, int(4), int(0));
    // Not folded: stays a symbolic division rather than panicking.
    assert!(matches!(&*normalize_expr(&e), crate::term::ExprKind::Binop(BinOp::Div, ..)));
    assert!(checked_div(IntConst::from_i64(4), IntConst::from_i64(0)).is_err());
  }

  #[test]
  fn le_encoding_rewrites_to_relational_atom() {
    let g = Generator::new();
    let x = var(g.fresh(IdentKind::Normal));
    let y = var(g.fresh(IdentKind::Normal));
    let encoded = Atom::Eq(binop(BinOp::Le, x.clone(), y.clone()), int(1));
    assert_eq!(normalize_atom(&encoded), Atom::Le(x, y));
  }
}
