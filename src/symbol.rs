//! String interning for identifier names and attribute tags.
//!
//! `mmcc` consumes a `Symbol`/`Interner` pair from its `mm0_util` sibling
//! crate without defining them locally (see `types/entity.rs`'s
//! `PrimOp::from_symbol`/`as_symbol`, and `Compiler::make_names`, which
//! builds a `HashMap<Symbol, Entity>`). That crate is not part of this
//! workspace (see `DESIGN.md`), so the small slice of interning behaviour
//! `mmcc` actually exercises is reimplemented here as a first-party
//! module, in the same shape: a dense, append-only table with `O(1)`
//! round trip between a string and a small integer handle.

use hashbrown::HashMap;
use std::fmt;
use std::sync::{Mutex, OnceLock};

/// An interned string handle. Copy, `Eq`, and small enough to live inline in
/// every identifier and heap chunk that needs a name.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl Symbol {
  /// The interned empty string, used as a "no name" placeholder rather than
  /// threading `Option<Symbol>` everywhere.
  pub const EMPTY: Symbol = Symbol(0);

  /// Get the dense index backing this symbol, for use as an array key (see
  /// `init_dense_symbol_map`).
  #[must_use] pub fn into_usize(self) -> usize { self.0 as usize }
}

impl fmt::Debug for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:?}", with_interner(|i| i.resolve(*self).to_owned()))
  }
}

impl fmt::Display for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&with_interner(|i| i.resolve(*self).to_owned()))
  }
}

/// A simple append-only string interner. `mmcc`'s `init_dense_symbol_map`
/// relies on symbols forming a dense range from zero, so lookup never
/// removes or renumbers entries.
#[derive(Default)]
pub struct Interner {
  strings: Vec<Box<str>>,
  ids: HashMap<Box<str>, Symbol>,
}

impl Interner {
  /// Create an interner pre-seeded with the empty string at [`Symbol::EMPTY`].
  #[must_use] pub fn new() -> Self {
    let mut i = Interner::default();
    let empty = i.intern_fresh("");
    debug_assert_eq!(empty, Symbol::EMPTY);
    i
  }

  fn intern_fresh(&mut self, s: &str) -> Symbol {
    let sym = Symbol(u32::try_from(self.strings.len()).expect("too many interned symbols"));
    self.strings.push(s.into());
    self.ids.insert(s.into(), sym);
    sym
  }

  /// Intern `s`, returning the existing handle if already present.
  pub fn intern(&mut self, s: &str) -> Symbol {
    if let Some(&sym) = self.ids.get(s) { return sym }
    self.intern_fresh(s)
  }

  /// Resolve a symbol back to its string. Panics if the symbol was not
  /// produced by this interner — an internal-invariant violation, the
  /// same treatment given to hash-consing corruption elsewhere.
  #[must_use] pub fn resolve(&self, sym: Symbol) -> &str {
    &self.strings[sym.into_usize()]
  }
}

static GLOBAL: OnceLock<Mutex<Interner>> = OnceLock::new();

fn with_interner<R>(f: impl FnOnce(&Interner) -> R) -> R {
  let m = GLOBAL.get_or_init(|| Mutex::new(Interner::new()));
  f(&m.lock().unwrap_or_else(|e| e.into_inner()))
}

/// Intern a string in the process-global table. Structural data (expressions,
/// heaps) is immutable once built and shared by reference across threads,
/// so symbols — which are embedded in that data — are interned globally
/// rather than per-prover-state.
pub fn intern(s: &str) -> Symbol {
  let m = GLOBAL.get_or_init(|| Mutex::new(Interner::new()));
  m.lock().unwrap_or_else(|e| e.into_inner()).intern(s)
}

/// Build a dense `Box<[Option<V>]>` map from symbol index to `V`, as used by
/// `PrimOp::from_symbol` in the `make_prims!` macro.
#[must_use] pub fn init_dense_symbol_map<V: Copy>(pairs: &[(Symbol, V)]) -> Box<[Option<V>]> {
  let len = pairs.iter().map(|(s, _)| s.into_usize() + 1).max().unwrap_or(0);
  let mut map = vec![None; len];
  for &(s, v) in pairs { map[s.into_usize()] = Some(v) }
  map.into_boxed_slice()
}

/// A source location, process-scoped by file path. Carried only for
/// diagnostics; entailment never branches on it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FileSpan {
  /// The file this span belongs to.
  pub file: Symbol,
  /// Byte offset range within the file.
  pub span: (u32, u32),
}

impl fmt::Debug for FileSpan {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}-{}", self.file, self.span.0, self.span.1)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn intern_is_idempotent() {
    let mut i = Interner::new();
    let a = i.intern("foo");
    let b = i.intern("foo");
    assert_eq!(a, b);
    assert_eq!(i.resolve(a), "foo");
  }

  #[test]
  fn dense_map_round_trips() {
    let mut i = Interner::new();
    let x = i.intern("x");
    let y = i.intern("y");
    let map = init_dense_symbol_map(&[(x, 1u8), (y, 2u8)]);
    assert_eq!(map[x.into_usize()], Some(1));
    assert_eq!(map[y.into_usize()], Some(2));
  }
}
