//! Probabilistic event sampling
//!
//! With a sample rate of N, one event in N is kept and the rest are
//! dropped before they reach the work queue. The rate rides along on the
//! wire record (`samplerate`) so the receiver can reconstruct population
//! estimates.

use rand::Rng;

/// Sampling decision hook.
///
/// The default implementation rolls a thread-local RNG; tests inject a
/// deterministic implementation via
/// [`Config::with_sampler`](crate::Config::with_sampler).
pub trait Sampler: Send + Sync {
    /// True if an event with the given sample rate should be dropped.
    ///
    /// A rate of 0 or 1 must never drop.
    fn should_drop(&self, rate: u32) -> bool;
}

/// Default sampler: uniform integer in `[0, rate)`, drop unless it lands
/// on zero. Thread-local RNG, freshly seeded per thread, safe for
/// concurrent submitters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSampler;

impl Sampler for RandomSampler {
    fn should_drop(&self, rate: u32) -> bool {
        if rate <= 1 {
            return false;
        }
        rand::rng().random_range(0..rate) != 0
    }
}
