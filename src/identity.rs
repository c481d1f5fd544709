//! Identity normalization and percentage bucketing.
use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Number of buckets the population is split into for percentage rules.
pub const BUCKETS: u64 = 100;

/// Identifier as supplied by the caller: a user id from a database, a session number, an email,
/// etc.
#[derive(Debug, Clone, PartialEq, PartialOrd, Serialize, Deserialize, From)]
#[serde(untagged)]
pub enum RawId {
    /// Integer maps to its own absolute value.
    Integer(i64),
    /// Floating point number is truncated towards zero. Must be finite.
    Number(f64),
    /// String maps through a stable 32-bit hash.
    String(String),
}

impl From<&str> for RawId {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<i32> for RawId {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<u32> for RawId {
    fn from(value: u32) -> Self {
        Self::Integer(value.into())
    }
}

/// Canonical non-negative form of a [`RawId`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    From,
    Into,
    Display,
)]
#[serde(transparent)]
pub struct NormalizedId(u64);

impl NormalizedId {
    /// Bucket of this id, `id mod 100`.
    pub fn bucket(self) -> u64 {
        self.0 % BUCKETS
    }
}

/// Anything that can be turned into a [`NormalizedId`].
pub trait Identity {
    /// Normalize the identity, failing with [`Error::InvalidIdentifier`] if it is not
    /// representable.
    fn normalized_id(&self) -> Result<NormalizedId>;
}

impl Identity for NormalizedId {
    fn normalized_id(&self) -> Result<NormalizedId> {
        Ok(*self)
    }
}

impl Identity for RawId {
    fn normalized_id(&self) -> Result<NormalizedId> {
        normalize(self)
    }
}

/// Convert an arbitrary identifier into a stable non-negative integer.
///
/// Numbers map to their truncated absolute value. Strings map to the absolute value of a 32-bit
/// `djb2` hash over their bytes, which does not depend on any per-process seed.
pub fn normalize(raw: &RawId) -> Result<NormalizedId> {
    match raw {
        RawId::Integer(i) => Ok(NormalizedId(i.unsigned_abs())),
        RawId::Number(n) if n.is_finite() => Ok(NormalizedId(n.trunc().abs() as u64)),
        RawId::Number(n) => Err(Error::InvalidIdentifier {
            value: n.to_string(),
        }),
        RawId::String(s) => Ok(NormalizedId(string_hash(s).into())),
    }
}

fn string_hash(s: &str) -> u32 {
    let hash = s.bytes().fold(5381_i32, |hash, byte| {
        hash.wrapping_mul(33).wrapping_add(i32::from(byte))
    });
    hash.unsigned_abs()
}

/// Inclusive range of buckets, `low..=high`, both within `0..=99`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PercentRange {
    low: u8,
    high: u8,
}

impl PercentRange {
    /// Range covering the whole population.
    pub const EVERYONE: PercentRange = PercentRange { low: 0, high: 99 };

    /// Create a range, clamping both bounds into `0..=99`. Missing `low` defaults to 0 and missing
    /// `high` to 99.
    pub fn new(low: Option<u64>, high: Option<u64>) -> PercentRange {
        let clamp = |v: u64| v.min(BUCKETS - 1) as u8;
        PercentRange {
            low: clamp(low.unwrap_or(0)),
            high: clamp(high.unwrap_or(BUCKETS - 1)),
        }
    }

    /// Shorthand for `"37%"`, i.e. `0..=high`.
    pub fn up_to(high: u64) -> PercentRange {
        PercentRange::new(None, Some(high))
    }

    /// Lowest bucket in the range.
    pub fn low(&self) -> u8 {
        self.low
    }

    /// Highest bucket in the range.
    pub fn high(&self) -> u8 {
        self.high
    }

    /// Return `true` if the bucket of `id` falls within the range (inclusive on both ends).
    pub fn contains(&self, id: NormalizedId) -> bool {
        let bucket = id.bucket();
        u64::from(self.low) <= bucket && bucket <= u64::from(self.high)
    }
}

/// Return `true` if `id mod 100` lies within `[low, high]`. See [`PercentRange::new`] for how
/// bounds are clamped and defaulted.
pub fn in_range(id: NormalizedId, low: Option<u64>, high: Option<u64>) -> bool {
    PercentRange::new(low, high).contains(id)
}
