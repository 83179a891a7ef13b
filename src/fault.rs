// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Probabilistic drop/corrupt applied to received acks. Named "congestion
//! probability" in the original source, which is misleading (it fires on
//! the ack receive path, not on outbound data) — renamed here and modeled
//! as two independent draws.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AckFate {
    Delivered,
    Dropped,
    Corrupted,
}

pub struct FaultInjector {
    p_loss: f64,
    p_corrupt: f64,
    rng: SmallRng,
}

impl FaultInjector {
    pub fn new(p_loss: f64, p_corrupt: f64) -> Self {
        FaultInjector {
            p_loss,
            p_corrupt,
            rng: SmallRng::from_entropy(),
        }
    }

    /// Same probabilities, but with a fixed seed so test runs are
    /// reproducible.
    pub fn with_seed(p_loss: f64, p_corrupt: f64, seed: u64) -> Self {
        FaultInjector {
            p_loss,
            p_corrupt,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Draws independently for loss then corruption, matching the order the
    /// original sender checks them in.
    pub fn apply(&mut self) -> AckFate {
        if self.rng.gen::<f64>() < self.p_loss {
            return AckFate::Dropped;
        }
        if self.rng.gen::<f64>() < self.p_corrupt {
            return AckFate::Corrupted;
        }
        AckFate::Delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_probabilities_always_deliver() {
        let mut injector = FaultInjector::with_seed(0.0, 0.0, 42);
        for _ in 0..100 {
            assert_eq!(injector.apply(), AckFate::Delivered);
        }
    }

    #[test]
    fn certain_loss_always_drops() {
        let mut injector = FaultInjector::with_seed(1.0, 0.0, 7);
        assert_eq!(injector.apply(), AckFate::Dropped);
    }

    #[test]
    fn certain_corruption_with_no_loss() {
        let mut injector = FaultInjector::with_seed(0.0, 1.0, 7);
        assert_eq!(injector.apply(), AckFate::Corrupted);
    }

    #[test]
    fn same_seed_is_deterministic() {
        let mut a = FaultInjector::with_seed(0.5, 0.5, 99);
        let mut b = FaultInjector::with_seed(0.5, 0.5, 99);
        let sequence_a: Vec<_> = (0..20).map(|_| a.apply()).collect();
        let sequence_b: Vec<_> = (0..20).map(|_| b.apply()).collect();
        assert_eq!(sequence_a, sequence_b);
    }
}
