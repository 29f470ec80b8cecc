//! Deterministic, splittable random sources
//!
//! All randomness in gentrace threads explicitly through a [`PrngKey`]: an
//! opaque, copyable value that can be split into a fixed, order-stable
//! sequence of child keys. Re-running a computation with the same parent key
//! always reproduces the same children, which the edit protocol relies on.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// SplitMix64 finalizer. Decorrelates sibling keys derived from one parent.
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

/// An opaque, splittable random source.
///
/// `PrngKey` carries no mutable state: drawing randomness means converting a
/// key into a seeded [`StdRng`] with [`PrngKey::rng`], and independent
/// streams come from [`PrngKey::split`] rather than from sharing an RNG.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrngKey {
    state: u64,
}

impl PrngKey {
    /// Create a key from a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            state: splitmix64(seed),
        }
    }

    /// Derive the `lane`-th child key.
    ///
    /// `key.child(i)` equals `key.split(n)[i]` for any `n > i`.
    pub fn child(&self, lane: u64) -> PrngKey {
        PrngKey {
            state: splitmix64(self.state ^ splitmix64(lane.wrapping_add(1))),
        }
    }

    /// Split into `n` independent child keys, in a fixed order.
    pub fn split(&self, n: usize) -> Vec<PrngKey> {
        (0..n as u64).map(|lane| self.child(lane)).collect()
    }

    /// Materialize a seeded RNG for drawing from distributions.
    pub fn rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.state)
    }
}
