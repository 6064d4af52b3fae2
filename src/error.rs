//! Error types for every fallible subsystem of the prover.
//!
//! The prover never panics on malformed-but-reachable input; `panic!` is
//! reserved for internal invariant violations (hash-consing corruption,
//! `unreachable!` arms).

use std::fmt;
use thiserror::Error;

use crate::heap::Chunk;
use crate::ident::Ident;
use crate::subst::Subst;
use crate::term::Expr;
use crate::ty::{SizeofTy, SubtypeAnnot};

/// Failures from [`crate::normalize`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizeError {
  /// Constant folding overflowed in a way that is not representable by the
  /// integer model (e.g. division by a statically-known zero).
  #[error("division by zero while folding {0:?}")]
  DivByZero(Expr),
  /// A `cast` or `sizeof` term nested beyond what the flattening rewrite can
  /// resolve (internal inconsistency, should not occur on well-formed input).
  #[error("malformed nested type term: {0}")]
  MalformedType(String),
}

/// Failures from [`crate::constraint`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConstraintError {
  /// The pure part is inconsistent (`x - x <= -1` or an equivalent
  /// contradiction was derived). Not itself a hard failure — callers are
  /// expected to treat this as "vacuously entailed" per.
  #[error("pure context is inconsistent")]
  Inconsistent,
  /// Saturation exceeded [`crate::config::ProverConfig::max_saturation_rounds`].
  #[error("difference-constraint saturation exceeded {0} rounds")]
  SaturationBudgetExhausted(usize),
}

/// The classification of why a [`check_implication`](crate::entail::check_implication)
/// call failed to find a proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImplFailKind {
  /// Two expressions were required to be equal under the current
  /// substitutions but are provably distinct.
  UnequalExprs(Expr, Expr),
  /// No left chunk could be matched against a given right chunk.
  NoMatchingChunk(Chunk),
  /// A substitution would have to map a primed variable to an expression
  /// that syntactically contains it.
  OccursCheck(Ident, Expr),
  /// The pure right-hand atom could not be discharged against the prepared
  /// left-hand prop.
  PureAtomUnproved(String),
  /// A design gap: a right-hand shape has no handling rule yet.
  Unimplemented(&'static str),
}

impl fmt::Display for ImplFailKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ImplFailKind::UnequalExprs(a, b) => write!(f, "cannot prove {a:?} = {b:?}"),
      ImplFailKind::NoMatchingChunk(c) => write!(f, "no left chunk matches {c:?}"),
      ImplFailKind::OccursCheck(v, e) => write!(f, "occurs check: {v:?} occurs in {e:?}"),
      ImplFailKind::PureAtomUnproved(s) => write!(f, "could not discharge pure atom: {s}"),
      ImplFailKind::Unimplemented(site) => write!(f, "unimplemented prover case: {site}"),
    }
  }
}

/// Failure to prove an implication when `calc_missing = false`, or any
/// unconditional failure (occurs check, no match with missing disallowed,
/// etc).
#[derive(Debug, Clone, Error)]
#[error("proof failed: {kind}")]
pub struct ProofFailure {
  /// What went wrong.
  pub kind: ImplFailKind,
  /// The substitutions accumulated up to the point of failure, useful for
  /// diagnostics.
  pub subs: (Subst, Subst),
}

impl ProofFailure {
  /// Build a failure.
  #[must_use] pub fn new(kind: ImplFailKind, subs: (Subst, Subst)) -> Self {
    ProofFailure { kind, subs }
  }
}

/// The error threaded through the entailment walk. Every recursive helper
/// decides for itself, at the point of failure, whether `calc_missing` turns
/// the failure into bookkeeping (`state.push_missing_*`, then `Ok(())`) or an
/// unconditional [`ProofFailure`]; there is no separate recoverable-error
/// variant, since the decision always needs the specific missing fact or
/// chunk at hand, which only the call site has in scope.
#[derive(Debug, Clone, Error)]
pub enum ImplError {
  /// See [`ProofFailure`].
  #[error(transparent)]
  Fail(#[from] ProofFailure),
  /// A deferred array bounds check could not be proved to hold and
  /// `calc_missing = false`.
  #[error("array bounds check failed: required {len_r:?} <= {len_l:?}")]
  BoundsFailed {
    /// The length available on the left.
    len_l: Expr,
    /// The length required on the right.
    len_r: Expr,
  },
  /// Subtype analysis determined the cast can never succeed and
  /// `calc_missing = false`.
  #[error("definite class cast failure: {0:?}: {1:?} is not a subtype of {2:?}")]
  DefiniteCastFailure(Expr, SizeofTy, SizeofTy),
  /// Cooperative time budget was exhausted mid-proof.
  #[error("time budget exhausted")]
  TimeBudgetExhausted,
}

/// A subtype-annotation case analysis failure: neither the positive nor
/// negative instantiation is the empty set and the context demands a
/// definite answer (only used by non-footprint callers of §4.9).
#[derive(Debug, Clone, Error)]
#[error("cast between {from:?} and {to:?} requires case analysis ({annot_from:?}, {annot_to:?})")]
pub struct AmbiguousCast {
  /// Source type of the cast.
  pub from: SizeofTy,
  /// Destination type of the cast.
  pub to: SizeofTy,
  /// Subtype annotation attached to the source.
  pub annot_from: SubtypeAnnot,
  /// Subtype annotation attached to the destination.
  pub annot_to: SubtypeAnnot,
}
