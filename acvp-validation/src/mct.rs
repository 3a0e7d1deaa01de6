#![deny(unsafe_code)]
#![allow(missing_docs)]
#![warn(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Monte Carlo Test iteration engine.
//!
//! Three rolling message slots are seeded from the test message. Each inner
//! round hashes `slot0 || slot1 || slot2`, drops `slot0` and pushes the
//! digest into `slot2`. After the inner loop one entry is emitted with the
//! message the outer round started from and the final digest, then slots 0
//! and 1 are reseeded from slot 2. Entries are produced strictly in order.

use acvp_prelude::prelude::{AcvpError, Result};
use tracing::trace;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Loop counts of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MctConfig {
    pub outer: usize,
    pub inner: usize,
}

impl Default for MctConfig {
    fn default() -> Self {
        Self { outer: 100, inner: 1000 }
    }
}

impl MctConfig {
    #[must_use]
    pub fn new(outer: usize, inner: usize) -> Self {
        Self { outer, inner }
    }

    fn validate(&self) -> Result<()> {
        if self.outer == 0 || self.inner == 0 {
            return Err(AcvpError::InvalidArgument(format!(
                "MCT counts must be non-zero (outer {}, inner {})",
                self.outer, self.inner
            )));
        }
        Ok(())
    }
}

/// The three rolling message slots.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct MctRing {
    slots: [Vec<u8>; 3],
}

impl MctRing {
    /// All three slots hold `seed`.
    #[must_use]
    pub fn seed(seed: &[u8]) -> Self {
        Self { slots: [seed.to_vec(), seed.to_vec(), seed.to_vec()] }
    }

    /// `slot0 || slot1 || slot2`.
    #[must_use]
    pub fn message(&self) -> Vec<u8> {
        self.slots.concat()
    }

    /// Drop slot 0, shift the others down and place `digest` in slot 2.
    pub fn roll(&mut self, digest: Vec<u8>) {
        self.slots.rotate_left(1);
        let mut evicted = std::mem::replace(&mut self.slots[2], digest);
        evicted.zeroize();
    }

    /// Start the next outer round: slots 0 and 1 take the value of slot 2.
    pub fn reseed_from_last(&mut self) {
        let last = self.slots[2].clone();
        self.slots[0].zeroize();
        self.slots[1].zeroize();
        self.slots[0].clone_from(&last);
        self.slots[1] = last;
    }

    #[must_use]
    pub fn slots(&self) -> [&[u8]; 3] {
        [&self.slots[0], &self.slots[1], &self.slots[2]]
    }

    #[must_use]
    pub fn last(&self) -> &[u8] {
        &self.slots[2]
    }
}

/// One emitted result of the chain.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct MctEntry {
    /// Message the outer round started from.
    pub msg: Vec<u8>,
    /// Digest after the last inner round.
    pub md: Vec<u8>,
}

/// Run the chain from `seed`, calling `step` once per inner round.
///
/// `step` receives the concatenated slots and returns the digest.
///
/// # Errors
/// `InvalidArgument` for zero loop counts or an empty seed, and whatever
/// `step` returns. The chain stops at the first failing round.
pub fn run_mct<F>(config: &MctConfig, seed: &[u8], mut step: F) -> Result<Vec<MctEntry>>
where
    F: FnMut(&[u8]) -> Result<Vec<u8>>,
{
    config.validate()?;
    if seed.is_empty() {
        return Err(AcvpError::InvalidArgument("MCT seed message is empty".to_string()));
    }

    let mut ring = MctRing::seed(seed);
    let mut entries = Vec::with_capacity(config.outer);
    for outer in 0..config.outer {
        let start = ring.message();
        for _ in 0..config.inner {
            let digest = step(&ring.message())?;
            ring.roll(digest);
        }
        trace!(outer, "MCT outer round complete");
        entries.push(MctEntry { msg: start, md: ring.last().to_vec() });
        ring.reseed_from_last();
    }
    Ok(entries)
}
