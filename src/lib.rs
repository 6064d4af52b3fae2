//! A symbolic-heap separation logic entailment prover with bi-abduction:
//! given two symbolic heaps `P1` and `P2`, decide whether `P1` entails `P2`
//! (modulo a witness substitution), and — in footprint mode — additionally
//! infer the missing pure facts and spatial chunks `P1` would need in order
//! for the entailment to hold, plus the frame left over from `P1` once
//! `P2`'s obligations are discharged.

pub mod symbol;
pub mod ident;
pub mod intcst;
pub mod ty;
pub mod term;
pub mod subst;
pub mod normalize;
pub mod constraint;
pub mod heap;
pub mod abstraction;
pub mod matcher;
pub mod subtype;
pub mod cover;
pub mod prover_state;
pub mod entail;
pub mod error;
pub mod config;
pub mod telemetry;

pub use config::ProverConfig;
pub use entail::{
  check_allocatedness, check_atom, check_disequal, check_equal, check_implication,
  check_implication_for_footprint, check_inconsistency, compute_upper_bound_of_exp, get_bounds,
  ImplOk, SymHeap,
};
pub use error::{ImplError, ImplFailKind, ProofFailure};
pub use prover_state::{Check, ProverState};
pub use ty::TypeEnv;
