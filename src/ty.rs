//! Type expressions: `sizeof` terms and the subtype-annotation machinery
//! consumed by the subtype reasoner (§4.9).
//!
//! Grounded on `types/entity.rs` (`TypeTy`, `PrimType`), which shows the
//! shape of a type-constructor record (`intrinsic`, `tyargs`, `args`,
//! `val`) — generalized here to `sizeof(τ, annot)` terms.

use std::fmt;
use std::rc::Rc;

use crate::symbol::Symbol;
use crate::term::Expr;

/// A named class/struct type, as looked up in the type environment (§6).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeName(pub Symbol);

impl fmt::Debug for TypeName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Why a subtype annotation was attached to a `sizeof` term — affects how
/// the subtype reasoner's case analysis is allowed to be used (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastUsage {
  /// An explicit `(T)e` cast.
  Cast,
  /// An `instanceof` test, which never fails — it just returns a boolean.
  InstanceOf,
  /// Plain typing, no cast semantics in play.
  Normal,
}

/// A subtype annotation refining a `sizeof(τ)` term for dynamic dispatch
///: either the type is known exactly, or it ranges over the
/// subtype lattice at or below some class, optionally excluding a list of
/// subtypes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubtypeAnnot {
  /// The runtime type is known to be exactly this one.
  Exact,
  /// The runtime type is some (unexcluded) subtype, tagged with why the
  /// annotation is being consulted.
  Subtypes {
    /// Subtypes that are known *not* to be the runtime type (e.g. already
    /// ruled out by a previous case split).
    excluding: Rc<[TypeName]>,
    /// Why this annotation exists.
    usage: CastUsage,
  },
}

impl SubtypeAnnot {
  /// `true` if both annotations denote the same possibilities modulo the
  /// usage-flag, per `equal_modulo_flag` on subtype-annotation
  /// comparisons.
  #[must_use] pub fn equal_modulo_flag(&self, other: &Self) -> bool {
    match (self, other) {
      (SubtypeAnnot::Exact, SubtypeAnnot::Exact) => true,
      (SubtypeAnnot::Subtypes { excluding: e1, .. }, SubtypeAnnot::Subtypes { excluding: e2, .. }) => {
        let mut a: Vec<_> = e1.iter().collect();
        let mut b: Vec<_> = e2.iter().collect();
        a.sort(); b.sort();
        a == b
      }
      _ => false,
    }
  }
}

/// A `sizeof(τ, annot)` term: the base type name, an optional length
/// expression (for arrays-as-sizeof, ), and the subtype annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SizeofTy {
  /// The base type name.
  pub name: TypeName,
  /// Length expression, for array-shaped sizeof terms.
  pub len: Option<Expr>,
  /// Subtype annotation, for object/class types participating in dynamic
  /// dispatch.
  pub annot: Option<SubtypeAnnot>,
}

impl SizeofTy {
  /// A bare, non-array, non-annotated type.
  #[must_use] pub fn plain(name: TypeName) -> Self {
    SizeofTy { name, len: None, annot: None }
  }

  /// `true` if this denotes an object class participating in dynamic
  /// dispatch (i.e. it carries a subtype annotation).
  #[must_use] pub fn is_object(&self) -> bool { self.annot.is_some() }
}

/// A field or method declared on a structured type.
#[derive(Debug, Clone)]
pub struct FieldDecl {
  /// Field name.
  pub name: Symbol,
  /// Field type.
  pub ty: SizeofTy,
}

/// A structured-type definition, as looked up in the type environment.
#[derive(Debug, Clone, Default)]
pub struct TypeDef {
  /// Declared fields, in declaration order (the heap model sorts by name
  /// independently when building struct values — see `heap::StructVal`).
  pub fields: Vec<FieldDecl>,
  /// Declared method names (presence only; bodies are out of scope here).
  pub methods: Vec<Symbol>,
  /// Direct super-types, for subtype lattice construction.
  pub supers: Vec<TypeName>,
}

/// The external type environment (§6 Inputs consumed): a mapping from
/// type-name to structured-type definition, plus the subtype-lattice and
/// field-lookup queries the prover needs.
pub trait TypeEnv {
  /// Look up a type's definition by name.
  fn lookup(&self, name: TypeName) -> Option<&TypeDef>;

  /// `true` if `a` is a known subtype of `b` (reflexive: every type is a
  /// subtype of itself).
  fn is_known_subtype(&self, a: TypeName, b: TypeName) -> bool {
    if a == b { return true }
    let Some(def) = self.lookup(a) else { return false };
    def.supers.iter().any(|&s| self.is_known_subtype(s, b))
  }

  /// Look up the type of a field on a given type, walking super-types.
  fn field_type(&self, ty: TypeName, field: Symbol) -> Option<SizeofTy> {
    let def = self.lookup(ty)?;
    if let Some(f) = def.fields.iter().find(|f| f.name == field) {
      return Some(f.ty.clone())
    }
    def.supers.iter().find_map(|&s| self.field_type(s, field))
  }

  /// `true` if `ty` (or a super-type) declares a method of this name.
  fn has_method(&self, ty: TypeName, method: Symbol) -> bool {
    let Some(def) = self.lookup(ty) else { return false };
    def.methods.contains(&method) || def.supers.iter().any(|&s| self.has_method(s, method))
  }

  /// Enumerate every known type, most specific call sites need this to
  /// compute a subtype reasoner's case split (§4.9).
  fn all_types(&self) -> Vec<TypeName>;
}

/// A simple in-memory `TypeEnv`, sufficient for tests and for embedding
/// callers that don't need a persistent index.
#[derive(Default)]
pub struct MapTypeEnv {
  defs: hashbrown::HashMap<TypeName, TypeDef>,
}

impl MapTypeEnv {
  /// An empty environment.
  #[must_use] pub fn new() -> Self { Self::default() }

  /// Declare or replace a type's definition.
  pub fn insert(&mut self, name: TypeName, def: TypeDef) { self.defs.insert(name, def); }
}

impl TypeEnv for MapTypeEnv {
  fn lookup(&self, name: TypeName) -> Option<&TypeDef> { self.defs.get(&name) }
  fn all_types(&self) -> Vec<TypeName> { self.defs.keys().copied().collect() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::symbol::intern;

  fn tn(s: &str) -> TypeName { TypeName(intern(s)) }

  #[test]
  fn subtype_lattice_is_reflexive_and_transitive() {
    let mut env = MapTypeEnv::new();
    env.insert(tn("Animal"), TypeDef::default());
    env.insert(tn("Dog"), TypeDef { supers: vec![tn("Animal")], ..Default::default() });
    env.insert(tn("Puppy"), TypeDef { supers: vec![tn("Dog")], ..Default::default() });
    assert!(env.is_known_subtype(tn("Puppy"), tn("Puppy")));
    assert!(env.is_known_subtype(tn("Puppy"), tn("Animal")));
    assert!(!env.is_known_subtype(tn("Animal"), tn("Puppy")));
  }

  #[test]
  fn field_lookup_walks_supers() {
    let mut env = MapTypeEnv::new();
    env.insert(tn("Base"), TypeDef {
        fields: vec![FieldDecl { name: intern("x"), ty: SizeofTy::plain(tn("int")) }],
        ..Default::default()
    });
    env.insert(tn("Derived"), TypeDef { supers: vec![tn("Base")], ..Default::default() });
    assert!(env.field_type(tn("Derived"), intern("x")).is_some());
    assert!(env.field_type(tn("Derived"), intern("y")).is_none());
  }
}
