//! Deterministic structural fingerprints.
//!
//! This module provides [`Fingerprint`], a 64-bit hash computed from the
//! structure of a discovered record. Fingerprints are deterministic across
//! passes and threads, which makes them suitable as stable identifiers in
//! logs and diagnostics:
//!
//! - Same structure = same fingerprint
//! - Part order matters (`Map<K, V>` differs from `Map<V, K>`)
//! - Different record kinds never share a fingerprint domain
//!
//! The dedup store keys on full structural equality; the fingerprint is the
//! compact name of that key, not a replacement for it.
//!
//! # Hash Computation
//!
//! Uses XXHash64 with domain-specific mixing constants so that an interface and
//! an implementation with the same name do not collide.
//!
//! # Examples
//!
//! ```
//! use stencil_core::Fingerprint;
//!
//! let a = Fingerprint::from_name("Comparer");
//! let b = Fingerprint::from_name("Comparer");
//! assert_eq!(a, b);
//!
//! let ab = Fingerprint::builder(Fingerprint::TYPE).str("Map").str("K").str("V").finish();
//! let ba = Fingerprint::builder(Fingerprint::TYPE).str("Map").str("V").str("K").finish();
//! assert_ne!(ab, ba);
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for fingerprint computation.
pub mod hash_constants {
    /// Separator constant used between mixed parts.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type references.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for template interface records.
    pub const INTERFACE: u64 = 0x5ea77ffbcdf5f302;

    /// Domain marker for template implementation records.
    pub const IMPLEMENTATION: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for template instantiation records.
    pub const INSTANTIATION: u64 = 0x3e9f5d2a8c7b1403;

    /// Domain marker for constraint sets.
    pub const CONSTRAINT: u64 = 0x9a7f3d5e2b8c4601;

    /// Position mixing constants. Each position gets its own constant so that
    /// part order changes the result.
    pub const PART_MARKERS: [u64; 16] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
        0x7c3e9f2a5b8d1403,
        0x5d8c7b4a3e9f2106,
        0x3f1e9d8c7b5a4203,
        0x1a2b3c4d5e6f7089,
        0x9f8e7d6c5b4a3210,
        0x2468ace013579bdf,
        0xfdb97531eca86420,
        0x123456789abcdef0,
    ];
}

/// A deterministic 64-bit structural fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Empty/invalid fingerprint.
    pub const EMPTY: Fingerprint = Fingerprint(0);

    pub const TYPE: u64 = hash_constants::TYPE;
    pub const INTERFACE: u64 = hash_constants::INTERFACE;
    pub const IMPLEMENTATION: u64 = hash_constants::IMPLEMENTATION;
    pub const INSTANTIATION: u64 = hash_constants::INSTANTIATION;
    pub const CONSTRAINT: u64 = hash_constants::CONSTRAINT;

    /// Fingerprint of a bare name in the type domain.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        Fingerprint(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Start an ordered fingerprint in the given domain.
    #[inline]
    pub fn builder(domain: u64) -> FingerprintBuilder {
        FingerprintBuilder {
            state: domain,
            position: 0,
        }
    }

    /// Check if this is the empty fingerprint.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:#018x})", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Incremental, order-sensitive fingerprint computation.
#[derive(Debug, Clone)]
pub struct FingerprintBuilder {
    state: u64,
    position: usize,
}

impl FingerprintBuilder {
    /// Mix a raw 64-bit part.
    #[inline]
    pub fn u64(mut self, part: u64) -> Self {
        let marker = hash_constants::PART_MARKERS
            .get(self.position % hash_constants::PART_MARKERS.len())
            .copied()
            .unwrap_or(hash_constants::PART_MARKERS[0])
            .wrapping_add(self.position as u64);
        // wrapping_mul keeps part order significant (XOR alone would commute)
        self.state = self
            .state
            .wrapping_mul(hash_constants::SEP)
            .wrapping_add(marker ^ part);
        self.position += 1;
        self
    }

    /// Mix a string part.
    #[inline]
    pub fn str(self, part: &str) -> Self {
        self.u64(xxh64(part.as_bytes(), 0))
    }

    /// Mix a boolean part.
    #[inline]
    pub fn flag(self, part: bool) -> Self {
        self.u64(part as u64)
    }

    /// Mix a nested fingerprint.
    #[inline]
    pub fn nested(self, part: Fingerprint) -> Self {
        self.u64(part.0)
    }

    /// Mix a length prefix, so that `[a, b] + [c]` and `[a] + [b, c]` differ.
    #[inline]
    pub fn len(self, len: usize) -> Self {
        self.u64(len as u64 ^ hash_constants::SEP)
    }

    /// Finish the computation.
    #[inline]
    pub fn finish(self) -> Fingerprint {
        Fingerprint(self.state)
    }
}

/// Types with a structural fingerprint.
pub trait Fingerprinted {
    /// Compute the fingerprint of this value.
    fn fingerprint(&self) -> Fingerprint;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_is_deterministic() {
        assert_eq!(Fingerprint::from_name("Comparer"), Fingerprint::from_name("Comparer"));
        assert_ne!(Fingerprint::from_name("Comparer"), Fingerprint::from_name("Hasher"));
    }

    #[test]
    fn part_order_matters() {
        let a = Fingerprint::builder(Fingerprint::TYPE).str("K").str("V").finish();
        let b = Fingerprint::builder(Fingerprint::TYPE).str("V").str("K").finish();
        assert_ne!(a, b);
    }

    #[test]
    fn domains_do_not_collide() {
        let iface = Fingerprint::builder(Fingerprint::INTERFACE).str("Comparer").finish();
        let imp = Fingerprint::builder(Fingerprint::IMPLEMENTATION).str("Comparer").finish();
        assert_ne!(iface, imp);
    }

    #[test]
    fn length_prefix_separates_groupings() {
        let a = Fingerprint::builder(Fingerprint::TYPE)
            .len(2)
            .str("a")
            .str("b")
            .len(1)
            .str("c")
            .finish();
        let b = Fingerprint::builder(Fingerprint::TYPE)
            .len(1)
            .str("a")
            .len(2)
            .str("b")
            .str("c")
            .finish();
        assert_ne!(a, b);
    }

    #[test]
    fn display_is_fixed_width_hex() {
        let text = Fingerprint(0xab).to_string();
        assert_eq!(text, "00000000000000ab");
        assert!(Fingerprint::EMPTY.is_empty());
    }
}
