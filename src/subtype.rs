//! Dynamic-cast case analysis over the subtype lattice.

use std::rc::Rc;

use crate::error::AmbiguousCast;
use crate::ty::{CastUsage, SizeofTy, SubtypeAnnot, TypeEnv, TypeName};

/// The outcome of [`case_analyze`]: which subtypes of the lattice are
/// consistent with `τ₁ <: τ₂` holding (`positive`) and which are consistent
/// with it failing (`negative`). Both may be non-empty — the default case,
/// per, is "consider both possibilities".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseSplit {
  pub positive: Vec<TypeName>,
  pub negative: Vec<TypeName>,
}

impl CaseSplit {
  /// `true` when every consistent subtype admits the cast succeeding — it
  /// is therefore always safe.
  #[must_use] pub fn always_safe(&self) -> bool { self.negative.is_empty() && !self.positive.is_empty() }

  /// `true` when no consistent subtype admits the cast succeeding — a
  /// definite class-cast error.
  #[must_use] pub fn always_fails(&self) -> bool { self.positive.is_empty() && !self.negative.is_empty() }
}

fn candidates(env: &dyn TypeEnv, base: TypeName, annot: &SubtypeAnnot) -> Vec<TypeName> {
  let excluding: &[TypeName] = match annot {
    SubtypeAnnot::Exact => return vec![base],
    SubtypeAnnot::Subtypes { excluding, .. } => excluding,
  };
  env.all_types().into_iter()
  .filter(|t| env.is_known_subtype(*t, base) && !excluding.contains(t))
  .collect()
}

/// Perform the case analysis of for `from <: to`, given the
/// subtype annotations attached to each side's `sizeof` term.
#[must_use] pub fn case_analyze(env: &dyn TypeEnv, from: TypeName, annot_from: &SubtypeAnnot, to: TypeName, annot_to: &SubtypeAnnot) -> CaseSplit {
  let mut positive = Vec::new();
  let mut negative = Vec::new();
  for t in candidates(env, from, annot_from) {
    if env.is_known_subtype(t, to) { positive.push(t) } else { negative.push(t) }
  }
  let _ = annot_to; // consulted only for the usage-flag downstream, not the lattice query itself
  CaseSplit { positive, negative }
}

/// Entail `sizeof(τ₁, annot₁) ⊢ sizeof(τ₂, annot₂)`. Returns `Ok(split)` with both possibilities when neither
/// is conclusive (the `InstanceOf` usage never fails, since it only yields
/// a boolean test result); returns `Err` with the ambiguous-cast record when
/// a definite negative is found and `calc_missing = false` — callers in
/// footprint mode should instead inspect `split.always_fails()` themselves
/// and raise a `ClassCastCheck` without failing.
pub fn texp_imply(env: &dyn TypeEnv, from: &SizeofTy, to: &SizeofTy) -> Result<CaseSplit, AmbiguousCast> {
  let (Some(from_annot), Some(to_annot)) = (&from.annot, &to.annot) else {
    // Non-object types: plain type-name equality, no case analysis.
    return Ok(if from.name == to.name {
        CaseSplit { positive: vec![from.name], negative: vec![] }
      } else {
        CaseSplit { positive: vec![], negative: vec![from.name] }
    })
  };
  let split = case_analyze(env, from.name, from_annot, to.name, to_annot);
  if split.always_fails() && !matches!(to_annot, SubtypeAnnot::Subtypes { usage: CastUsage::InstanceOf, .. }) {
    return Err(AmbiguousCast {
        from: from.clone(), to: to.clone(), annot_from: from_annot.clone(), annot_to: to_annot.clone(),
    })
  }
  Ok(split)
}

/// Refine a subtype annotation by excluding the subtypes a negative case
/// split ruled out, for callers that want to narrow the annotation after a
/// successful case analysis rather than discard it.
#[must_use] pub fn exclude_negative(annot: &SubtypeAnnot, split: &CaseSplit) -> SubtypeAnnot {
  match annot {
    SubtypeAnnot::Exact => SubtypeAnnot::Exact,
    SubtypeAnnot::Subtypes { excluding, usage } => {
      let mut excluded: Vec<TypeName> = excluding.iter().copied().collect();
      excluded.extend(split.negative.iter().copied());
      SubtypeAnnot::Subtypes { excluding: Rc::from(excluded), usage: *usage }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::symbol::intern;
  use crate::ty::{MapTypeEnv, TypeDef};

  fn tn(s: &str) -> TypeName { TypeName(intern(s)) }

  fn env() -> MapTypeEnv {
    let mut env = MapTypeEnv::new();
    env.insert(tn("Animal"), TypeDef::default());
    env.insert(tn("Dog"), TypeDef { supers: vec![tn("Animal")], ..Default::default() });
    env.insert(tn("Cat"), TypeDef { supers: vec![tn("Animal")], ..Default::default() });
    env
  }

  #[test]
  fn exact_not_subtype_is_a_definite_failure() {
    let env = env();
    let from = SizeofTy { name: tn("Dog"), len: None, annot: Some(SubtypeAnnot::Exact) };
    let to = SizeofTy { name: tn("Cat"), len: None, annot: Some(SubtypeAnnot::Subtypes { excluding: Rc::from(vec![]), usage: CastUsage::Cast }) };
    let result = texp_imply(&env, &from, &to);
    assert!(result.is_err());
  }

  #[test]
  fn instance_of_never_fails_even_when_definitely_false() {
    let env = env();
    let from = SizeofTy { name: tn("Dog"), len: None, annot: Some(SubtypeAnnot::Exact) };
    let to = SizeofTy { name: tn("Cat"), len: None, annot: Some(SubtypeAnnot::Subtypes { excluding: Rc::from(vec![]), usage: CastUsage::InstanceOf }) };
    let result = texp_imply(&env, &from, &to);
    assert!(result.is_ok());
    assert!(result.unwrap().always_fails());
  }

  #[test]
  fn ambiguous_subtype_annotation_yields_both_cases() {
    let env = env();
    let from = SizeofTy { name: tn("Animal"), len: None, annot: Some(SubtypeAnnot::Subtypes { excluding: Rc::from(vec![]), usage: CastUsage::Cast }) };
    let to = SizeofTy { name: tn("Dog"), len: None, annot: Some(SubtypeAnnot::Exact) };
    let split = texp_imply(&env, &from, &to).unwrap();
    assert!(!split.positive.is_empty());
    assert!(!split.negative.is_empty());
  }
}
