//! Caller-supplied, query-scoped configuration. Never a process-wide
//! global, the same discipline the footprint-mode flag on `ProverState`
//! follows, generalized to every other tunable the prover has.

use crate::abstraction::Rule;

/// Tunables threaded through one [`crate::entail::check_implication`] call
/// (and, for `abstraction_rules`, shared across the calls an interprocedural
/// caller makes between queries).
#[derive(Clone)]
pub struct ProverConfig {
  /// Hard cap on difference-constraint saturation rounds.
  /// Exceeding it raises [`crate::error::ConstraintError::SaturationBudgetExhausted`].
  pub max_saturation_rounds: usize,
  /// Number of cooperative `pay()` hook calls allowed before the query
  /// raises `TimeBudgetExhausted`.
  pub pay_budget: u64,
  /// The ordered list-segment folding rule table consulted by
  /// `abstraction::abstract_heap`.
  pub abstraction_rules: Vec<Rule>,
  /// How many candidate covers the minimum-disjunction search tries
  /// between consulting the time budget.
  pub cover_tick_interval: usize,
}

impl Default for ProverConfig {
  fn default() -> Self {
    ProverConfig {
      max_saturation_rounds: 64,
      pay_budget: 1_000_000,
      abstraction_rules: crate::abstraction::standard_rules(),
      cover_tick_interval: 50,
    }
  }
}

impl ProverConfig {
  /// A configuration with abstraction disabled, useful for tests that want
  /// to observe unfolded heaps.
  #[must_use] pub fn no_abstraction() -> Self {
    ProverConfig { abstraction_rules: Vec::new(), ..ProverConfig::default() }
  }
}
