//! The heap model: points-to, list segments,
//! doubly-linked segments, and their structured contents.
//!
//! Grounded on `types/entity.rs`'s enum-of-variants-with-payload style
//! (`Entity`, `GlobalTc`) for `Chunk`/`StructuredValue`, and on
//! `build_mir.rs`'s `Translate` trait for the subst-application helpers that
//! walk a chunk the way `Translate` walks a MIR type.

use std::rc::Rc;

use bitflags::bitflags;

use crate::ident::{Generator, Ident, IdentKind};
use crate::subst::Subst;
use crate::symbol::Symbol;
use crate::term::{self, Expr};
use crate::ty::SizeofTy;

bitflags! {
  /// Provenance tags carried on an `exp-leaf`/array value for diagnostics and
  /// joins.
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
  pub struct Instrumentation: u16 {
    /// Produced by folding a list of cells into a segment.
    const ABSTRACTION = 1 << 0;
    /// Tags the cell at a known allocation site.
    const ALLOCATION_SITE = 1 << 1;
    /// Originates from a formal parameter.
    const FORMAL_PARAM = 1 << 2;
    /// The formal parameter's zero-flag (paired with `FORMAL_PARAM`).
    const ZERO_FLAG = 1 << 3;
    /// The formal parameter's null-case flag.
    const NULL_CASE_FLAG = 1 << 4;
    /// Produced by a field/array lookup rather than supplied directly.
    const LOOKUP = 1 << 5;
    /// The value was nullified (e.g. on `free`).
    const NULLIFICATION = 1 << 6;
    /// Produced by heap rearrangement (unfold/unroll).
    const REARRANGEMENT = 1 << 7;
    /// Carries a taint fact.
    const TAINT = 1 << 8;
    /// Produced by a field/array update.
    const UPDATE = 1 << 9;
  }
}

/// A structured value stored at a points-to address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuredValue {
  /// A plain scalar value with provenance.
  Leaf(Expr, Instrumentation),
  /// Fields sorted by name, no duplicates.
  Struct(Vec<(Symbol, StructuredValue)>),
  /// `length`, indices distinct and each `< length`, sorted by index.
  Array { length: Expr, entries: Vec<(Expr, StructuredValue)>, instr: Instrumentation },
}

impl StructuredValue {
  /// A bare scalar leaf with no instrumentation, the common case for
  /// freshly-built test fixtures.
  #[must_use] pub fn leaf(e: Expr) -> Self { StructuredValue::Leaf(e, Instrumentation::empty()) }

  /// A struct value built from field/value pairs, sorted by field name as
  /// the data model requires.
  #[must_use] pub fn struct_of(mut fields: Vec<(Symbol, StructuredValue)>) -> Self {
    fields.sort_by_key(|(f, _)| *f);
    StructuredValue::Struct(fields)
  }
}

/// `NE` (non-empty) vs `PE` (possibly-empty) list/dll segment kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegKind { NE, PE }

/// A singly-linked inductive parameter `λ(root, next, shared…). ∃evars. body`
///. Two structurally-equal parameters denote the same predicate, so
/// this derives `PartialEq`/`Eq`/`Hash` down to its `Chunk` body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListParam {
  pub root: Ident,
  pub next: Ident,
  pub shared: Vec<Ident>,
  pub evars: Vec<Ident>,
  pub body: Rc<[Chunk]>,
}

/// A doubly-linked parameter, adding `blink`/`flink` per.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DllParam {
  pub root: Ident,
  pub blink: Ident,
  pub flink: Ident,
  pub shared: Vec<Ident>,
  pub evars: Vec<Ident>,
  pub body: Rc<[Chunk]>,
}

/// A single heap chunk (a `σ`-atom, ).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Chunk {
  /// `e ↦ s: τ̂`.
  PointsTo { addr: Expr, value: StructuredValue, ty: SizeofTy },
  /// `lseg_k(π, e_from, e_to, shared…)`.
  ListSeg { kind: SegKind, param: Rc<ListParam>, from: Expr, to: Expr, shared: Vec<Expr> },
  /// `dllseg_k(π, iF, oB, oF, iB, shared…)`.
  DllSeg {
    kind: SegKind,
    param: Rc<DllParam>,
    in_forward: Expr,
    out_back: Expr,
    out_forward: Expr,
    in_back: Expr,
    shared: Vec<Expr>,
  },
}

// `StructuredValue`/`Chunk` need `Hash`/`Eq`, which `Expr` (an `Rc<ExprKind>`)
// already supports structurally; hand-roll `Hash`/`Eq` for `StructuredValue`
// since it isn't a plain derive target once `Array`'s fields are involved —
// in fact a `#[derive]` would already do the right thing here, but we keep
// it explicit so the struct-field sort-order invariant stays documented at
// the point where equality is defined.
impl std::hash::Hash for StructuredValue {
  fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
    match self {
      StructuredValue::Leaf(e, i) => { 0u8.hash(state); e.hash(state); i.hash(state) }
      StructuredValue::Struct(fs) => { 1u8.hash(state); fs.hash(state) }
      StructuredValue::Array { length, entries, instr } => {
        2u8.hash(state); length.hash(state); entries.hash(state); instr.hash(state)
      }
    }
  }
}

/// Rewrite variables in a structured value by substitution lookup (does not
/// renormalize, matching `Subst::apply_expr`'s contract).
#[must_use] pub fn apply_subst_value(v: &StructuredValue, s: &Subst) -> StructuredValue {
  match v {
    StructuredValue::Leaf(e, i) => StructuredValue::Leaf(s.apply_expr(e), *i),
    StructuredValue::Struct(fs) =>
    StructuredValue::Struct(fs.iter().map(|(f, v)| (*f, apply_subst_value(v, s))).collect()),
    StructuredValue::Array { length, entries, instr } => StructuredValue::Array {
      length: s.apply_expr(length),
      entries: entries.iter().map(|(i, v)| (s.apply_expr(i), apply_subst_value(v, s))).collect(),
      instr: *instr,
    },
  }
}

/// Rewrite variables in a chunk by substitution lookup.
#[must_use] pub fn apply_subst_chunk(c: &Chunk, s: &Subst) -> Chunk {
  match c {
    Chunk::PointsTo { addr, value, ty } =>
    Chunk::PointsTo { addr: s.apply_expr(addr), value: apply_subst_value(value, s), ty: ty.clone() },
    Chunk::ListSeg { kind, param, from, to, shared } => Chunk::ListSeg {
      kind: *kind, param: param.clone(), from: s.apply_expr(from), to: s.apply_expr(to),
      shared: shared.iter().map(|e| s.apply_expr(e)).collect(),
    },
    Chunk::DllSeg { kind, param, in_forward, out_back, out_forward, in_back, shared } => Chunk::DllSeg {
      kind: *kind, param: param.clone(),
      in_forward: s.apply_expr(in_forward), out_back: s.apply_expr(out_back),
      out_forward: s.apply_expr(out_forward), in_back: s.apply_expr(in_back),
      shared: shared.iter().map(|e| s.apply_expr(e)).collect(),
    },
  }
}

/// The result of instantiating a predicate parameter: fresh
/// existentials (including the formal `next`/`blink`/`flink` identifiers,
/// which are existentially bound the same way the body's own `∃evars` are),
/// the rewritten body, and — for singly-linked params — the instantiated
/// `next` expression the caller needs to build the residual `PE` segment.
pub struct Instantiation {
  pub existentials: Vec<Ident>,
  pub body: Vec<Chunk>,
}

fn fresh_subst_for(formals: &[Ident], gen: &Generator) -> (Subst, Vec<Ident>) {
  let mut s = Subst::empty();
  let mut fresh = Vec::with_capacity(formals.len());
  for &f in formals {
    let id = gen.fresh(IdentKind::Primed);
    s.extend(f, term::var(id)).expect("formal parameters of a predicate are pairwise distinct");
    fresh.push(id);
  }
  s
}

/// Instantiate a singly-linked parameter at a concrete root and shared
/// arguments, producing fresh existentials (`next` included) and the
/// rewritten body.
#[must_use] pub fn instantiate_list_param(
  param: &ListParam, root_val: &Expr, shared_vals: &[Expr], gen: &Generator,
) -> (Instantiation, Ident) {
  let mut s = Subst::empty();
  s.extend(param.root, root_val.clone()).expect("root is not otherwise bound");
  for (formal, val) in param.shared.iter().zip(shared_vals) {
    s.extend(*formal, val.clone()).expect("shared formals are pairwise distinct");
  }
  let (next_subst, next_fresh) = fresh_subst_for(std::slice::from_ref(&param.next), gen);
  let (ev_subst, ev_fresh) = fresh_subst_for(&param.evars, gen);
  let s = s.join(&next_subst).expect("disjoint domains").join(&ev_subst).expect("disjoint domains");
  let body = param.body.iter().map(|c| apply_subst_chunk(c, &s)).collect();
  let mut existentials = next_fresh.clone();
  existentials.extend(ev_fresh);
  (Instantiation { existentials, body }, next_fresh[0])
}

/// Instantiate a doubly-linked parameter, analogous to
/// [`instantiate_list_param`] but binding `blink`/`flink` instead of `next`.
#[must_use] pub fn instantiate_dll_param(
  param: &DllParam, root_val: &Expr, shared_vals: &[Expr], gen: &Generator,
) -> (Instantiation, Ident, Ident) {
  let mut s = Subst::empty();
  s.extend(param.root, root_val.clone()).expect("root is not otherwise bound");
  for (formal, val) in param.shared.iter().zip(shared_vals) {
    s.extend(*formal, val.clone()).expect("shared formals are pairwise distinct");
  }
  let (link_subst, link_fresh) = fresh_subst_for(&[param.blink, param.flink], gen);
  let (ev_subst, ev_fresh) = fresh_subst_for(&param.evars, gen);
  let s = s.join(&link_subst).expect("disjoint domains").join(&ev_subst).expect("disjoint domains");
  let body = param.body.iter().map(|c| apply_subst_chunk(c, &s)).collect();
  let mut existentials = link_fresh.clone();
  existentials.extend(ev_fresh);
  (Instantiation { existentials, body }, link_fresh[0], link_fresh[1])
}

/// Unroll a non-empty list segment one step: `lseg_NE(π,a,b,s) ->
/// π(a,a',s) * lseg_PE(π,a',b,s)` with fresh `a'`.
#[must_use] pub fn unroll_ne_list(
  param: &Rc<ListParam>, from: &Expr, to: &Expr, shared: &[Expr], gen: &Generator,
) -> (Vec<Chunk>, Chunk, Vec<Ident>) {
  let (inst, next_id) = instantiate_list_param(param, from, shared, gen);
  let pe = Chunk::ListSeg {
    kind: SegKind::PE, param: param.clone(), from: term::var(next_id), to: to.clone(),
    shared: shared.to_vec(),
  };
  (inst.body, pe, inst.existentials)
}

/// Unroll a doubly-linked segment one step from the forward end — the
/// backward case is symmetric and handled by the caller swapping the
/// endpoint roles before calling this.
#[must_use] pub fn unroll_dll_forward(
  param: &Rc<DllParam>, in_forward: &Expr, out_back: &Expr, out_forward: &Expr, in_back: &Expr,
  shared: &[Expr], gen: &Generator,
) -> (Vec<Chunk>, Chunk, Vec<Ident>) {
  let (inst, new_blink, new_flink) = instantiate_dll_param(param, in_forward, shared, gen);
  let rest = Chunk::DllSeg {
    kind: SegKind::PE, param: param.clone(),
    in_forward: term::var(new_flink), out_back: in_forward.clone(),
    out_forward: out_forward.clone(), in_back: in_back.clone(),
    shared: shared.to_vec(),
  };
  let _ = new_blink; // bound inside `inst.body`, not referenced by the residual segment
  let _ = out_back;
  (inst.body, rest, inst.existentials)
}

/// Unfold a points-to whose address is a field projection `e.f` into
/// `e ↦ struct{f: v}`, manufacturing a synthetic single-field struct type
/// (named after the field's own type) when `whole_ty` is `None`.
#[must_use] pub fn unfold_field_projection(
  base: Expr, field: Symbol, value: StructuredValue, field_ty: &SizeofTy, whole_ty: Option<SizeofTy>,
) -> Chunk {
  let ty = whole_ty.unwrap_or_else(|| SizeofTy::plain(field_ty.name));
  Chunk::PointsTo { addr: base, value: StructuredValue::struct_of(vec![(field, value)]), ty }
}

/// Unfold a points-to whose address is an array index `e[i]` into
/// `e ↦ array{length: ?, [(i,v)]}`. The caller supplies the
/// array's known length, since the unfold alone doesn't determine it.
#[must_use] pub fn unfold_index_projection(base: Expr, index: Expr, value: StructuredValue, length: Expr, ty: SizeofTy) -> Chunk {
  Chunk::PointsTo {
    addr: base,
    value: StructuredValue::Array { length, entries: vec![(index, value)], instr: Instrumentation::empty() },
    ty,
  }
}

/// `true` if two points-to chunks are at the same address — the "two hpreds"
/// inconsistency of.
#[must_use] pub fn points_to_conflict(a: &Chunk, b: &Chunk) -> bool {
  matches!((a, b), (Chunk::PointsTo { addr: a, .. }, Chunk::PointsTo { addr: b, .. }) if a == b)
}

/// `true` if `c` is an `NE` segment whose endpoints coincide — inconsistent
/// per (a nonempty segment cannot have equal endpoints).
#[must_use] pub fn ne_seg_has_equal_endpoints(c: &Chunk) -> bool {
  match c {
    Chunk::ListSeg { kind: SegKind::NE, from, to, .. } => from == to,
    Chunk::DllSeg { kind: SegKind::NE, in_forward, out_forward, .. } => in_forward == out_forward,
    _ => false,
  }
}

/// `true` if `c` is a `PE` segment with equal endpoints and an empty body —
/// such a segment denotes the empty heap.
#[must_use] pub fn pe_seg_is_trivially_empty(c: &Chunk) -> bool {
  match c {
    Chunk::ListSeg { kind: SegKind::PE, from, to, param, .. } => from == to && param.body.is_empty(),
    Chunk::DllSeg { kind: SegKind::PE, in_forward, out_forward, param, .. } =>
    in_forward == out_forward && param.body.is_empty(),
    _ => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ident::IdentKind;
  use crate::term::int;

  fn trivial_list_param(gen: &Generator) -> Rc<ListParam> {
    let root = gen.fresh(IdentKind::Normal);
    let next = gen.fresh(IdentKind::Normal);
    Rc::new(ListParam { root, next, shared: vec![], evars: vec![], body: Rc::from(vec![]) })
  }

  #[test]
  fn points_to_conflict_detects_same_address() {
    let g = Generator::new();
    let a = term::var(g.fresh(IdentKind::Normal));
    let c1 = Chunk::PointsTo { addr: a.clone(), value: StructuredValue::leaf(int(1)), ty: SizeofTy::plain(crate::ty::TypeName(crate::symbol::intern("int"))) };
    let c2 = Chunk::PointsTo { addr: a, value: StructuredValue::leaf(int(2)), ty: SizeofTy::plain(crate::ty::TypeName(crate::symbol::intern("int"))) };
    assert!(points_to_conflict(&c1, &c2));
  }

  #[test]
  fn ne_segment_with_equal_endpoints_is_inconsistent() {
    let g = Generator::new();
    let param = trivial_list_param(&g);
    let a = term::var(g.fresh(IdentKind::Normal));
    let c = Chunk::ListSeg { kind: SegKind::NE, param, from: a.clone(), to: a, shared: vec![] };
    assert!(ne_seg_has_equal_endpoints(&c));
  }

  #[test]
  fn pe_segment_with_empty_body_and_equal_endpoints_is_empty() {
    let g = Generator::new();
    let param = trivial_list_param(&g);
    let a = term::var(g.fresh(IdentKind::Normal));
    let c = Chunk::ListSeg { kind: SegKind::PE, param, from: a.clone(), to: a, shared: vec![] };
    assert!(pe_seg_is_trivially_empty(&c));
  }

  #[test]
  fn unroll_ne_produces_fresh_next_and_pe_residual() {
    let g = Generator::new();
    let param = trivial_list_param(&g);
    let a = term::var(g.fresh(IdentKind::Normal));
    let b = term::var(g.fresh(IdentKind::Normal));
    let (body, pe, existentials) = unroll_ne_list(&param, &a, &b, &[], &g);
    assert!(body.is_empty());
    assert_eq!(existentials.len(), 1);
    assert!(matches!(pe, Chunk::ListSeg { kind: SegKind::PE, .. }));
  }
}
