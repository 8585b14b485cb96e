//! Injectable random number generation.
//!
//! RULE: No formula may call a platform RNG.
//! Every stochastic function takes a `&mut impl RandomSource`, so callers
//! decide whether draws come from a seeded stream or a pinned sequence.
//!
//! Each concern gets its own stream, seeded deterministically from
//! (master_seed XOR slot_index). This means:
//!   - Drawing extra feedback messages never shifts acquisition outcomes.
//!   - A preview never consumes draws from the committed streams.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// The capability every stochastic computation receives.
pub trait RandomSource {
    /// Roll a float in [0.0, 1.0).
    fn next_f64(&mut self) -> f64;

    /// Uniform float in [lo, hi).
    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }

    /// Bernoulli trial: returns true with probability p.
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Fair coin.
    fn coin(&mut self) -> bool {
        self.next_f64() >= 0.5
    }

    /// Uniform index in [0, n). Returns 0 when n == 0 so callers
    /// must check emptiness themselves.
    fn pick_index(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        ((self.next_f64() * n as f64) as usize).min(n - 1)
    }
}

/// A named, deterministic RNG for a single concern.
pub struct SubsystemRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SubsystemRng {
    /// Create a stream from the master seed and a stable slot index.
    /// The index must never change once assigned.
    pub fn new(master_seed: u64, slot_index: u64) -> Self {
        let derived_seed = master_seed ^ (slot_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

impl RandomSource for SubsystemRng {
    fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

/// Replays a fixed list of draws, cycling when exhausted.
///
/// Used by tests and tooling to pin exact outcomes.
#[derive(Debug, Clone)]
pub struct SequenceRng {
    draws: Vec<f64>,
    cursor: usize,
}

impl SequenceRng {
    pub fn new(draws: Vec<f64>) -> Self {
        assert!(!draws.is_empty(), "SequenceRng needs at least one draw");
        Self { draws, cursor: 0 }
    }

    /// Every draw returns the same value.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    /// How many draws have been taken so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for SequenceRng {
    fn next_f64(&mut self) -> f64 {
        let v = self.draws[self.cursor % self.draws.len()];
        self.cursor += 1;
        v.clamp(0.0, 0.999_999_999)
    }
}

/// All streams for a single session, indexed by stable slot.
pub struct RngBank {
    master_seed: u64,
    streams: Vec<SubsystemRng>,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        let streams = RngSlot::ALL
            .iter()
            .map(|slot| SubsystemRng::new(master_seed, *slot as u64).with_name(slot.name()))
            .collect();
        Self { master_seed, streams }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// The persistent stream for `slot`. Successive calls continue the
    /// same sequence.
    pub fn stream(&mut self, slot: RngSlot) -> &mut SubsystemRng {
        &mut self.streams[slot as usize]
    }
}

/// Stable slot assignments.
/// NEVER reorder or remove entries. Only append.
/// Reordering changes every stream's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum RngSlot {
    Acquisition = 0,
    Retention = 1,
    Monetization = 2,
    Variance = 3,
    Events = 4,
    Feedback = 5,
    Preview = 6,
}

impl RngSlot {
    pub const ALL: [RngSlot; 7] = [
        Self::Acquisition,
        Self::Retention,
        Self::Monetization,
        Self::Variance,
        Self::Events,
        Self::Feedback,
        Self::Preview,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Acquisition => "acquisition",
            Self::Retention => "retention",
            Self::Monetization => "monetization",
            Self::Variance => "variance",
            Self::Events => "events",
            Self::Feedback => "feedback",
            Self::Preview => "preview",
        }
    }
}
