//! Expressions: the closed term language the prover reasons about,
//! interned for fast structural equality.
//!
//! Grounded on `build_mir.rs`'s `Translator`/`TrMap` memoization (each
//! `ty::TyKind`/`ExprKind` variant is translated once per generation and
//! cached behind an `Rc`, so repeated occurrences share a pointer) and on
//! the `Dedup`/`NodeHash` hash-consing-via-table idiom seen in other
//! reference material. Here the cache is a single global table keyed by
//! the structural `ExprKind`, so that two normalized expressions are
//! `Rc`-pointer-equal iff they are semantically equal.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use hashbrown::HashMap;

use crate::ident::Ident;
use crate::intcst::IntConst;
use crate::symbol::Symbol;
use crate::ty::SizeofTy;

/// Unary operators. Matches the "full set of arithmetic, bitwise, logical...
/// operators" called for in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
  /// Arithmetic negation.
  Neg,
  /// Bitwise complement.
  BNot,
  /// Boolean negation.
  LNot,
}

/// Binary operators, with pointer arithmetic kept distinct from its
/// arithmetic counterpart per ("pointer+integer and pointer−pointer
/// are distinct from their arithmetic counterparts").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
  /// Integer sum.
  Add,
  /// Integer difference.
  Sub,
  /// Integer product.
  Mul,
  /// Integer (truncating) division.
  Div,
  /// Integer remainder.
  Mod,
  /// Bitwise AND.
  BAnd,
  /// Bitwise OR.
  BOr,
  /// Bitwise XOR.
  BXor,
  /// Left shift.
  Shl,
  /// Right shift.
  Shr,
  /// Boolean AND.
  LAnd,
  /// Boolean OR.
  LOr,
  /// Equality.
  Eq,
  /// Disequality.
  Ne,
  /// Less-or-equal.
  Le,
  /// Strictly less.
  Lt,
  /// Pointer plus integer offset, distinct from `Add`.
  PtrAdd,
  /// Pointer minus pointer (yields the byte distance), distinct from `Sub`.
  PtrSub,
}

impl BinOp {
  /// `true` if this operator commutes, used by the normalizer to place the
  /// larger operand on the left.
  #[must_use] pub fn is_commutative(self) -> bool {
    matches!(self, BinOp::Add | BinOp::Mul | BinOp::BAnd | BinOp::BOr | BinOp::BXor
      | BinOp::LAnd | BinOp::LOr | BinOp::Eq | BinOp::Ne)
  }
}

/// A scalar constant, one variant per closed list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Const {
  /// An integer, with signedness-and-pointer flag (§3 Integer model).
  Int(IntConst),
  /// A string literal.
  Str(Rc<str>),
  /// A float literal, compared by bit pattern (no float reasoning is
  /// performed — Non-goals).
  Float(u64),
  /// A class/type reference used as a first-class value.
  Class(crate::ty::TypeName),
  /// A function reference.
  Func(Symbol),
  /// An attribute constant: tags a value with a resource/taint/etc. fact
  /// rather than denoting a runtime value.
  Attr(Symbol),
}

/// The recursive shape of an expression. Never constructed directly outside
/// this module — use the `mk_*` interning constructors so that structural
/// sharing (and therefore `Rc::ptr_eq`-fast equality on normalized terms) is
/// preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprKind {
  /// A variable (identifier).
  Var(Ident),
  /// A program location, named and process-scoped.
  Loc(Symbol),
  /// A constant.
  Const(Const),
  /// A unary operation.
  Unop(UnOp, Expr),
  /// A binary operation.
  Binop(BinOp, Expr, Expr),
  /// A cast to the given type.
  Cast(SizeofTy, Expr),
  /// A field-offset projection `e.f`.
  Field(Expr, Symbol),
  /// An array-index offset `e[i]`.
  Index(Expr, Expr),
  /// A size-of-type term, possibly carrying a length and subtype annotation.
  Sizeof(SizeofTy),
  /// A tuple of expressions.
  Tuple(Rc<[Expr]>),
}

/// An interned expression. Cheap to clone (`Rc` bump) and compares in `O(1)`
/// once normalized, since the global interner guarantees equal `ExprKind`s
/// share one allocation.
pub type Expr = Rc<ExprKind>;

thread_local! {
  static INTERNER: RefCell<HashMap<ExprKind, Expr>> = RefCell::new(HashMap::new());
}

/// Intern an `ExprKind`, returning the shared `Expr` for it. This is the only
/// way to build an `Expr`; every other constructor in this module and in
/// `normalize` funnels through it.
#[must_use] pub fn mk(kind: ExprKind) -> Expr {
  INTERNER.with(|tbl| {
      let mut tbl = tbl.borrow_mut();
      if let Some(e) = tbl.get(&kind) { return e.clone() }
      let e: Expr = Rc::new(kind.clone());
      tbl.insert(kind, e.clone());
      e
  })
}

/// Convenience constructors, used pervasively by the normalizer and prover.
#[must_use] pub fn var(id: Ident) -> Expr { mk(ExprKind::Var(id)) }
#[must_use] pub fn loc(name: Symbol) -> Expr { mk(ExprKind::Loc(name)) }
#[must_use] pub fn int(n: i64) -> Expr { mk(ExprKind::Const(Const::Int(IntConst::from_i64(n)))) }
#[must_use] pub fn int_const(c: IntConst) -> Expr { mk(ExprKind::Const(Const::Int(c))) }
#[must_use] pub fn null() -> Expr { mk(ExprKind::Const(Const::Int(IntConst::NULL))) }
#[must_use] pub fn unop(op: UnOp, e: Expr) -> Expr { mk(ExprKind::Unop(op, e)) }
#[must_use] pub fn binop(op: BinOp, a: Expr, b: Expr) -> Expr { mk(ExprKind::Binop(op, a, b)) }
#[must_use] pub fn field(e: Expr, f: Symbol) -> Expr { mk(ExprKind::Field(e, f)) }
#[must_use] pub fn index(e: Expr, i: Expr) -> Expr { mk(ExprKind::Index(e, i)) }
#[must_use] pub fn sizeof(ty: SizeofTy) -> Expr { mk(ExprKind::Sizeof(ty)) }
#[must_use] pub fn cast(ty: SizeofTy, e: Expr) -> Expr { mk(ExprKind::Cast(ty, e)) }
#[must_use] pub fn tuple(es: Vec<Expr>) -> Expr { mk(ExprKind::Tuple(es.into())) }

/// Structural (not just pointer) expression comparison, used to place the
/// larger operand on the left of commutative operators during normalization
/// — a total order independent of interning order.
#[must_use] pub fn expr_cmp(a: &Expr, b: &Expr) -> std::cmp::Ordering {
  fn rank(k: &ExprKind) -> u8 {
    match k {
      ExprKind::Const(_) => 0,
      ExprKind::Var(_) => 1,
      ExprKind::Loc(_) => 2,
      ExprKind::Field(..) => 3,
      ExprKind::Index(..) => 4,
      ExprKind::Unop(..) => 5,
      ExprKind::Binop(..) => 6,
      ExprKind::Cast(..) => 7,
      ExprKind::Sizeof(_) => 8,
      ExprKind::Tuple(_) => 9,
    }
  }
  rank(a).cmp(&rank(b)).then_with(|| format!("{a:?}").cmp(&format!("{b:?}")))
}

/// Does `needle` occur syntactically anywhere within `hay`? Used by the
/// occurs-check in `exp_imply`.
#[must_use] pub fn occurs(needle: &Ident, hay: &Expr) -> bool {
  match &**hay {
    ExprKind::Var(v) => v == needle,
    ExprKind::Loc(_) | ExprKind::Const(_) | ExprKind::Sizeof(_) => false,
    ExprKind::Unop(_, e) | ExprKind::Field(e, _) | ExprKind::Cast(_, e) => occurs(needle, e),
    ExprKind::Binop(_, a, b) | ExprKind::Index(a, b) => occurs(needle, a) || occurs(needle, b),
    ExprKind::Tuple(es) => es.iter().any(|e| occurs(needle, e)),
  }
}

/// Collect every free identifier mentioned in an expression (used by
/// abstraction's "private identifiers" unreachability check, §4.10).
pub fn free_idents(e: &Expr, out: &mut Vec<Ident>) {
  match &**e {
    ExprKind::Var(v) => out.push(*v),
    ExprKind::Loc(_) | ExprKind::Const(_) | ExprKind::Sizeof(_) => {}
    ExprKind::Unop(_, e) | ExprKind::Field(e, _) | ExprKind::Cast(_, e) => free_idents(e, out),
    ExprKind::Binop(_, a, b) | ExprKind::Index(a, b) => { free_idents(a, out); free_idents(b, out) }
    ExprKind::Tuple(es) => for e in es.iter() { free_idents(e, out) },
  }
}

/// A pure atom (§3 Pure part): plain (dis)equality, the two relational
/// orderings (kept first-class rather than literally stored as `(e<=f)=1`,
/// per §4.1's canonicalization), and attribute predications.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Atom {
  /// `e = f`.
  Eq(Expr, Expr),
  /// `e != f`.
  Ne(Expr, Expr),
  /// `e <= f`.
  Le(Expr, Expr),
  /// `e < f`.
  Lt(Expr, Expr),
  /// `P(e...)` if `positive`, `!P(e...)` otherwise.
  Attr { pred: Symbol, args: Rc<[Expr]>, positive: bool },
}

impl Atom {
  /// Negate this atom, used by the cover/minimum-disjunction search (§4.8).
  #[must_use] pub fn negate(&self) -> Atom {
    match self {
      Atom::Eq(a, b) => Atom::Ne(a.clone(), b.clone()),
      Atom::Ne(a, b) => Atom::Eq(a.clone(), b.clone()),
      Atom::Le(a, b) => Atom::Lt(b.clone(), a.clone()),
      Atom::Lt(a, b) => Atom::Le(b.clone(), a.clone()),
      Atom::Attr { pred, args, positive } =>
      Atom::Attr { pred: *pred, args: args.clone(), positive: !positive },
    }
  }
}

impl fmt::Display for Atom {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Atom::Eq(a, b) => write!(f, "{a:?} = {b:?}"),
      Atom::Ne(a, b) => write!(f, "{a:?} != {b:?}"),
      Atom::Le(a, b) => write!(f, "{a:?} <= {b:?}"),
      Atom::Lt(a, b) => write!(f, "{a:?} < {b:?}"),
      Atom::Attr { pred, args, positive } => {
        if !positive { f.write_str("!")? }
        write!(f, "{pred}({args:?})")
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn interning_shares_equal_terms() {
    let a = binop(BinOp::Add, int(1), int(2));
    let b = binop(BinOp::Add, int(1), int(2));
    assert!(Rc::ptr_eq(&a, &b));
  }

  #[test]
  fn distinct_terms_are_distinct() {
    let a = int(1);
    let b = int(2);
    assert!(!Rc::ptr_eq(&a, &b));
  }

  #[test]
  fn occurs_check_finds_nested_var() {
    let g = crate::ident::Generator::new();
    let v = g.fresh(crate::ident::IdentKind::Primed);
    let e = field(var(v), crate::symbol::intern("next"));
    assert!(occurs(&v, &e));
    let other = g.fresh(crate::ident::IdentKind::Primed);
    assert!(!occurs(&other, &e));
  }

  #[test]
  fn atom_double_negation_is_identity() {
    let a = Atom::Le(int(1), int(2));
    assert_eq!(a.negate().negate(), a);
  }
}
