//! Lightweight counters for cooperative pay events and a stable cache-key
//! digest, for callers that layer a memoization cache over
//! `check_implication` queries between interprocedural steps.
//!
//! Grounded on the `bitflags!`-tagged instrumentation style used elsewhere
//! in this crate for cheap, always-on counters rather than a full metrics
//! framework — this crate has no async runtime or server loop to hang a
//! heavier metrics exporter off of, so a plain `Cell`-backed counter struct
//! plus a `log::trace!` call at the point of increment is the idiomatic fit.

use std::cell::Cell;
use std::fmt::Write as _;

use crate::entail::SymHeap;
use crate::term::Atom;

/// Per-query counters. Reset at the start of a query by the caller driving
/// `check_implication`; not part of `ProverState` since telemetry is
/// advisory and never feeds back into proof search.
#[derive(Debug, Default)]
pub struct Counters {
  pays: Cell<u64>,
  cache_hits: Cell<u64>,
  cache_misses: Cell<u64>,
}

impl Counters {
  /// A fresh, zeroed counter set.
  #[must_use] pub fn new() -> Self { Counters::default() }

  /// Record one cooperative `pay()` tick.
  pub fn record_pay(&self) {
    self.pays.set(self.pays.get() + 1);
    log::trace!("pay tick {}", self.pays.get());
  }

  /// Record a cache lookup outcome, logging at `trace` so the caller can
  /// enable it per-query without recompiling.
  pub fn record_cache(&self, hit: bool) {
    if hit {
      self.cache_hits.set(self.cache_hits.get() + 1);
      log::trace!("cache hit ({} total)", self.cache_hits.get());
    } else {
      self.cache_misses.set(self.cache_misses.get() + 1);
      log::trace!("cache miss ({} total)", self.cache_misses.get());
    }
  }

  #[must_use] pub fn pays(&self) -> u64 { self.pays.get() }
  #[must_use] pub fn cache_hits(&self) -> u64 { self.cache_hits.get() }
  #[must_use] pub fn cache_misses(&self) -> u64 { self.cache_misses.get() }
}

/// A small non-cryptographic hash over a byte stream, in the spirit of
/// FNV-1a: stability across runs is the only property a cache key needs,
/// not collision-resistance, so no cryptographic hash function is pulled
/// in for this.
fn fnv1a(bytes: &[u8]) -> u64 {
  let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
  for &b in bytes {
    hash ^= u64::from(b);
    hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
  }
  hash
}

/// Canonical pretty-print of a symbolic heap, used as the hash input.
/// Sorted-vector substitutions and deduplicated atom/chunk lists already
/// give every `SymHeap` a single canonical textual form, so `{:?}` doubles
/// as the stable serialization a cache key needs.
fn render_heap(heap: &SymHeap, out: &mut String) {
  let _ = write!(out, "{:?}|{:?}|{:?}", heap.subst, heap.pure, heap.spatial);
}

/// The cache key for memoizing `check_implication(p1, p2)`: a hex-encoded
/// 64-bit digest of the canonical pretty-print of both heaps. Two queries
/// with the same digest are, barring a hash collision, the same query.
#[must_use] pub fn cache_key(p1: &SymHeap, p2: &SymHeap) -> String {
  let mut text = String::new();
  render_heap(p1, &mut text);
  text.push('#');
  render_heap(p2, &mut text);
  hex::encode(fnv1a(text.as_bytes()).to_be_bytes())
}

/// The cache key for memoizing a single-atom query (`check_atom` and
/// friends), keyed on the heap's pure part plus the atom.
#[must_use] pub fn cache_key_atom(pure: &[Atom], a: &Atom) -> String {
  let text = format!("{pure:?}#{a:?}");
  hex::encode(fnv1a(text.as_bytes()).to_be_bytes())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ident::{Generator, IdentKind};
  use crate::subst::Subst;
  use crate::term;

  #[test]
  fn same_heaps_produce_the_same_cache_key() {
    let gen = Generator::new();
    let x = term::var(gen.fresh(IdentKind::Normal));
    let p1 = SymHeap { subst: Subst::empty(), pure: vec![Atom::Eq(x.clone(), x.clone())], spatial: vec![] };
    let p2 = SymHeap::empty();
    assert_eq!(cache_key(&p1, &p2), cache_key(&p1, &p2));
  }

  #[test]
  fn different_heaps_usually_produce_different_cache_keys() {
    let gen = Generator::new();
    let x = term::var(gen.fresh(IdentKind::Normal));
    let y = term::var(gen.fresh(IdentKind::Normal));
    let p1 = SymHeap { subst: Subst::empty(), pure: vec![Atom::Eq(x.clone(), x)], spatial: vec![] };
    let p2 = SymHeap { subst: Subst::empty(), pure: vec![Atom::Eq(y.clone(), y)], spatial: vec![] };
    assert_ne!(cache_key(&p1, &SymHeap::empty()), cache_key(&p2, &SymHeap::empty()));
  }

  #[test]
  fn counters_start_at_zero_and_increment() {
    let c = Counters::new();
    assert_eq!(c.pays(), 0);
    c.record_pay();
    c.record_pay();
    assert_eq!(c.pays(), 2);
    c.record_cache(true);
    c.record_cache(false);
    assert_eq!(c.cache_hits(), 1);
    assert_eq!(c.cache_misses(), 1);
  }
}
