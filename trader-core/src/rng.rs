//! The world's single random stream.
//!
//! Every stochastic rule in the simulation draws from one `SimRng`, in a fixed
//! order, so a seed fully determines a run. The underlying ChaCha stream is
//! seekable: `word_pos` / `seek` let callers checkpoint and replay it.

use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone)]
pub struct SimRng {
    inner: ChaCha8Rng,
}

impl SimRng {
    pub fn seed_from_u64(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Uniform draw in [0, 1)
    pub fn uniform(&mut self) -> f64 {
        self.inner.random::<f64>()
    }

    /// Raw 32-bit draw, used to seed noise sources.
    pub fn seed_u32(&mut self) -> u32 {
        self.inner.random::<u32>()
    }

    /// Uniform draw in [lo, hi)
    pub fn uniform_range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.uniform()
    }

    /// Bernoulli trial: one uniform compared against `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.uniform() < p
    }

    /// Exponential draw with the given mean (inverse transform).
    pub fn exponential(&mut self, mean: f64) -> f64 {
        let u = self.uniform();
        -mean * (1.0 - u).ln()
    }

    /// Number of trials up to and including the first success (support 1, 2, ...).
    pub fn geometric(&mut self, p: f64) -> u32 {
        let u = self.uniform();
        if p >= 1.0 {
            return 1;
        }
        let k = ((1.0 - u).ln() / (1.0 - p).ln()).ceil();
        if k.is_finite() { k.max(1.0) as u32 } else { 1 }
    }

    /// `amount` distinct indices from `0..len`, in draw order.
    pub fn sample_indices(&mut self, len: usize, amount: usize) -> Vec<usize> {
        index::sample(&mut self.inner, len, amount).into_vec()
    }

    /// Current position in the underlying stream, in 32-bit words.
    pub fn word_pos(&self) -> u128 {
        self.inner.get_word_pos()
    }

    /// Move the stream to a position previously returned by `word_pos`.
    pub fn seek(&mut self, word_pos: u128) {
        self.inner.set_word_pos(word_pos);
    }
}
