//! Background telemetry pulse

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::registry::Registry;

/// Randomness used by the simulation
pub trait Noise: Send {
    /// Sample in `[low, high)`; an empty range yields `low`
    fn uniform(&mut self, low: f64, high: f64) -> f64;

    fn chance(&mut self, probability: f64) -> bool;

    fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T>;
}

/// [`Noise`] over any `rand` generator
#[derive(Debug, Clone)]
pub struct RngNoise<R>(R);

impl<R: Rng + Send> RngNoise<R> {
    pub fn new(rng: R) -> Self {
        Self(rng)
    }
}

impl RngNoise<StdRng> {
    /// OS-seeded generator; `Send`, unlike `thread_rng`, so it can live in a task
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }
}

impl<R: Rng + Send> Noise for RngNoise<R> {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if low < high {
            self.0.gen_range(low..high)
        } else {
            low
        }
    }

    fn chance(&mut self, probability: f64) -> bool {
        self.0.gen_bool(probability.clamp(0.0, 1.0))
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.0)
    }
}

/// Jitter the fleet every `period` until the task is dropped
pub async fn run<N: Noise>(registry: Arc<Registry>, period: Duration, mut noise: N) {
    info!(period_ms = period.as_millis() as u64, "Telemetry pulse started");
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately; start jittering one period in
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let changed = registry.pulse(&mut noise).await;
        if changed > 0 {
            debug!(changed, "Pulse flipped device status");
        }
    }
}

/// Deterministic noise pinned at one point of every range
#[cfg(test)]
pub struct FixedNoise(pub f64);

#[cfg(test)]
impl Noise for FixedNoise {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.0
    }

    fn chance(&mut self, probability: f64) -> bool {
        self.0 < probability
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        let index = (self.0 * items.len() as f64) as usize;
        items.get(index.min(items.len().saturating_sub(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_noise_ranges() {
        let mut noise = RngNoise::new(StdRng::seed_from_u64(7));
        for _ in 0..1000 {
            let v = noise.uniform(-3.0, 3.0);
            assert!((-3.0..3.0).contains(&v));
        }
        assert_eq!(noise.uniform(5.0, 5.0), 5.0);
        assert!(!noise.chance(0.0));
        assert!(noise.chance(1.0));
        assert!(noise.chance(7.5));
        assert!(noise.pick(&["a", "b", "c"]).is_some());
        assert_eq!(noise.pick::<u8>(&[]), None);
    }

    #[test]
    fn test_seeded_noise_is_repeatable() {
        let mut a = RngNoise::new(StdRng::seed_from_u64(42));
        let mut b = RngNoise::new(StdRng::seed_from_u64(42));
        for _ in 0..10 {
            assert_eq!(a.uniform(0.0, 100.0), b.uniform(0.0, 100.0));
        }
    }

    #[test]
    fn test_fixed_noise() {
        assert_eq!(FixedNoise(0.5).uniform(-3.0, 3.0), 0.0);
        assert!(FixedNoise(0.01).chance(0.02));
        assert!(!FixedNoise(0.5).chance(0.02));
        assert_eq!(FixedNoise(0.99).pick(&["a", "b", "c"]), Some(&"c"));
        assert_eq!(FixedNoise(0.0).pick::<u8>(&[]), None);
    }
}
