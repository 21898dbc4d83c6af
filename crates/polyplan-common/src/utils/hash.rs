//! Stable hashing.
//!
//! Plan digests are used as cache keys and printed by tooling, so they must
//! not change between runs. The seeds below are fixed for that reason.

use ahash::RandomState;
use std::hash::Hash;

const SEEDS: (u64, u64, u64, u64) = (
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
);

/// Returns a hasher builder with fixed seeds.
#[must_use]
pub fn stable_state() -> RandomState {
    RandomState::with_seeds(SEEDS.0, SEEDS.1, SEEDS.2, SEEDS.3)
}

/// Hashes a value with the fixed-seed hasher.
#[must_use]
pub fn stable_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    stable_state().hash_one(value)
}
