//! The integer model: a triple `(unsigned-flag, 64-bit value,
//! pointer-flag)`, with value comparison partitioning the 64-bit space into
//! three areas (signed-only, overlap, unsigned-only).

use std::cmp::Ordering;
use std::fmt;

/// Which region of the 64-bit space a value's signed interpretation lands
/// in, used to order mixed signed/unsigned constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Area {
  /// Negative when interpreted as signed (top half of the bit pattern space,
  /// below zero).
  SignedOnly,
  /// Representable as both a non-negative signed and an unsigned value.
  Overlap,
  /// Only representable as unsigned (exceeds `i64::MAX`), but this model
  /// never actually produces values beyond `i64::MAX` read from `u64`
  /// bits, so this area coincides with `SignedOnly`'s complement; kept as
  /// a distinct case for documentation fidelity with the three-way
  /// partition.
  UnsignedOnly,
}

fn area(bits: u64) -> Area {
  if (bits as i64) < 0 { Area::SignedOnly }
  else if bits > i64::MAX as u64 { Area::UnsignedOnly }
  else { Area::Overlap }
}

/// An integer constant: `(unsigned, bits, is_pointer)`. The pointer flag is
/// semantic only for a dedicated "null" constant distinct from integer 0:
/// `IntConst::NULL != IntConst::from_i64(0)` even though their
/// bit patterns coincide.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntConst {
  bits: u64,
  unsigned: bool,
  pointer: bool,
}

impl IntConst {
  /// The dedicated null pointer constant, distinct from the integer zero.
  pub const NULL: IntConst = IntConst { bits: 0, unsigned: false, pointer: true };

  /// Construct a signed integer constant from an `i64`.
  #[must_use] pub fn from_i64(v: i64) -> Self {
    IntConst { bits: v as u64, unsigned: false, pointer: false }
  }

  /// Construct an unsigned integer constant from a `u64`.
  #[must_use] pub fn from_u64(v: u64) -> Self {
    IntConst { bits: v, unsigned: true, pointer: false }
  }

  /// `true` if this is the dedicated null constant.
  #[must_use] pub fn is_null(self) -> bool { self.pointer }

  /// `true` if tagged unsigned.
  #[must_use] pub fn is_unsigned(self) -> bool { self.unsigned }

  /// The raw 64-bit pattern.
  #[must_use] pub fn bits(self) -> u64 { self.bits }

  /// Interpret the raw bits as a signed value, irrespective of the
  /// unsigned flag (used by the constraint engine, which only reasons about
  /// signed bounds).
  #[must_use] pub fn as_signed(self) -> i64 { self.bits as i64 }

  /// Attempt to coerce to a signed `i64`, failing if the unsigned flag is
  /// set and the value lies outside the signed range.
  #[must_use] pub fn try_as_signed(self) -> Option<i64> {
    if self.unsigned && self.bits > i64::MAX as u64 { None } else { Some(self.as_signed()) }
  }

  /// Wrapping negation, per the overflow semantics of the integer model.
  #[must_use] pub fn neg(self) -> Self {
    IntConst { bits: self.bits.wrapping_neg(), unsigned: self.unsigned, pointer: false }
  }

  /// Wrapping addition of a signed offset.
  #[must_use] pub fn add_i64(self, n: i64) -> Self {
    IntConst { bits: self.bits.wrapping_add(n as u64), unsigned: self.unsigned, pointer: self.pointer }
  }
}

impl fmt::Debug for IntConst {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.pointer && self.bits == 0 { return f.write_str("null") }
    if self.unsigned { write!(f, "{}u", self.bits) } else { write!(f, "{}", self.as_signed()) }
  }
}

/// Value ordering is "by area then numeric". The pointer flag
/// does not participate in ordering (only `is_null`/equality special-case
/// it) — the flag is semantic only for the null constant.
impl PartialOrd for IntConst {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}
impl Ord for IntConst {
  fn cmp(&self, other: &Self) -> Ordering {
    area(self.bits).cmp(&area(other.bits)).then_with(|| {
        match (area(self.bits), area(other.bits)) {
          (Area::UnsignedOnly, Area::UnsignedOnly) => self.bits.cmp(&other.bits),
          _ => self.as_signed().cmp(&other.as_signed()),
        }
    })
  }
}

/// Ranking of integer *types* by size, used by `texp_imply`/sizeof ordering:
/// char < short < int < long < long-long < 128-bit, signed and unsigned
/// share the same rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum IntRank {
  /// 8-bit.
  Char = 0,
  /// 16-bit.
  Short = 1,
  /// 32-bit.
  Int = 2,
  /// 64-bit.
  Long = 3,
  /// Also 64-bit on most ABIs but kept as a distinct rank in its own
  /// right.
  LongLong = 4,
  /// 128-bit.
  Int128 = 5,
}

impl IntRank {
  /// Size in bytes implied by this rank.
  #[must_use] pub fn size_bytes(self) -> u32 {
    match self {
      IntRank::Char => 1,
      IntRank::Short => 2,
      IntRank::Int => 4,
      IntRank::Long | IntRank::LongLong => 8,
      IntRank::Int128 => 16,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn null_distinct_from_zero() {
    assert_ne!(IntConst::NULL, IntConst::from_i64(0));
    assert!(IntConst::NULL.is_null());
    assert!(!IntConst::from_i64(0).is_null());
  }

  #[test]
  fn area_ordering_signed_then_overlap() {
    let neg = IntConst::from_i64(-1);
    let pos = IntConst::from_i64(1);
    assert!(neg < pos);
  }

  #[test]
  fn unsigned_out_of_signed_range_not_coercible() {
    let huge = IntConst::from_u64(u64::MAX);
    assert_eq!(huge.try_as_signed(), None);
    let small = IntConst::from_u64(5);
    assert_eq!(small.try_as_signed(), Some(5));
  }

  #[test]
  fn rank_ordering_matches_char_to_128bit() {
    assert!(IntRank::Char < IntRank::Short);
    assert!(IntRank::Short < IntRank::Int);
    assert!(IntRank::Int < IntRank::Long);
    assert!(IntRank::Long < IntRank::LongLong);
    assert!(IntRank::LongLong < IntRank::Int128);
  }
}
