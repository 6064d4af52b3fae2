//! Minimum-disjunction cover search: given a set of pure-context
//! cases, decide whether their disjunction is valid and, if so, find a
//! minimal covering subset.

use crate::constraint::ConstraintSet;
use crate::config::ProverConfig;
use crate::term::Atom;

/// One candidate disjunct: its pure atoms and an opaque tag the caller uses
/// to identify which case fired (e.g. a subtype-cast branch).
#[derive(Debug, Clone)]
pub struct Case<T> {
  pub atoms: Vec<Atom>,
  pub tag: T,
}

/// Outcome of [`find_cover`]. Holds indices into the original `cases` slice
/// rather than the cases themselves, so it carries no type parameter of its
/// own — callers index back in to recover each case's tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverOutcome {
  /// The full set of cases covers (their disjunction is valid); holds the
  /// minimal covering subset's indices.
  Covers(Vec<usize>),
  /// The cases do not cover: some model satisfies none of them.
  DoesNotCover,
  /// The cooperative time budget was exhausted before a verdict.
  TimedOut,
}

/// `⋁ᵢ πᵢ ≡ ⊤` iff negating every `πᵢ` in the candidate set and conjoining
/// them with the ambient pure context yields an inconsistency.
fn candidate_is_contradictory(cases: &[&[Atom]], ambient: &[Atom], cfg: &ProverConfig) -> bool {
  let mut atoms: Vec<Atom> = ambient.to_vec();
  for case in cases {
    for a in *case { atoms.push(a.negate()) }
  }
  match ConstraintSet::build(&atoms, cfg) {
    Ok(cs) => cs.is_inconsistent(),
    Err(_) => false,
  }
}

/// Find a minimum-size covering subset of `cases` whose disjunction, added
/// to `ambient`, is valid — or determine none exists. `pay` is invoked
/// before each coverage test; returning `false` aborts the search as `TimedOut`.
pub fn find_cover<T>(cases: &[Case<T>], ambient: &[Atom], cfg: &ProverConfig, mut pay: impl FnMut() -> bool) -> CoverOutcome {
  let slices: Vec<&[Atom]> = cases.iter().map(|c| c.atoms.as_slice()).collect();
  if slices.is_empty() { return CoverOutcome::DoesNotCover }

  if !pay() { return CoverOutcome::TimedOut }
  if !candidate_is_contradictory(&slices, ambient, cfg) { return CoverOutcome::DoesNotCover }

  // Greedy grow-then-shrink: sort candidate indices by the length of their
  // atom list (shorter first, a cheap proxy for "more general"), take the
  // full set as the starting cover, then try dropping each member in turn,
  // keeping the drop whenever the remainder still covers.
  let mut order: Vec<usize> = (0..cases.len()).collect();
  order.sort_by_key(|&i| cases[i].atoms.len());

  let mut cover = order.clone();
  let mut i = 0;
  while i < cover.len() {
    if !pay() { return CoverOutcome::TimedOut }
    let candidate: Vec<usize> = cover.iter().copied().filter(|&j| j != cover[i]).collect();
    let candidate_slices: Vec<&[Atom]> = candidate.iter().map(|&j| slices[j]).collect();
    if candidate_is_contradictory(&candidate_slices, ambient, cfg) {
      cover = candidate;
      // don't advance `i`: the element now at this position hasn't been tried
    } else {
      i += 1;
    }
  }
  cover.sort_unstable();
  CoverOutcome::Covers(cover)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ident::{Generator, IdentKind};
  use crate::term::{int, var};

  #[test]
  fn two_complementary_cases_cover() {
    let g = Generator::new();
    let x = var(g.fresh(IdentKind::Normal));
    let cfg = ProverConfig::default();
    let cases = vec![
      Case { atoms: vec![Atom::Le(x.clone(), int(0))], tag: "neg-or-zero" },
      Case { atoms: vec![Atom::Lt(int(0), x.clone())], tag: "pos" },
    ];
    let outcome = find_cover(&cases, &[], &cfg, || true);
    assert!(matches!(outcome, CoverOutcome::Covers(_)));
  }

  #[test]
  fn a_single_partial_case_does_not_cover() {
    let g = Generator::new();
    let x = var(g.fresh(IdentKind::Normal));
    let cfg = ProverConfig::default();
    let cases = vec![Case { atoms: vec![Atom::Le(x.clone(), int(0))], tag: "neg-or-zero" }];
    let outcome = find_cover(&cases, &[], &cfg, || true);
    assert_eq!(outcome, CoverOutcome::DoesNotCover);
  }

  #[test]
  fn redundant_case_is_dropped_from_the_minimal_cover() {
    let g = Generator::new();
    let x = var(g.fresh(IdentKind::Normal));
    let cfg = ProverConfig::default();
    let cases = vec![
      Case { atoms: vec![Atom::Le(x.clone(), int(0))], tag: "neg-or-zero" },
      Case { atoms: vec![Atom::Lt(int(0), x.clone())], tag: "pos" },
      Case { atoms: vec![Atom::Eq(x.clone(), int(1))], tag: "redundant" },
    ];
    let outcome = find_cover(&cases, &[], &cfg, || true);
    assert_eq!(outcome, CoverOutcome::Covers(vec![0, 1]));
  }

  #[test]
  fn time_budget_aborts_the_search() {
    let g = Generator::new();
    let x = var(g.fresh(IdentKind::Normal));
    let cfg = ProverConfig::default();
    let cases = vec![
      Case { atoms: vec![Atom::Le(x.clone(), int(0))], tag: "neg-or-zero" },
      Case { atoms: vec![Atom::Lt(int(0), x.clone())], tag: "pos" },
    ];
    let outcome = find_cover(&cases, &[], &cfg, || false);
    assert_eq!(outcome, CoverOutcome::TimedOut);
  }
}
