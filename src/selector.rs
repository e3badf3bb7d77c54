//! Random question selection with a cooldown window
//!
//! Recently drawn indices are kept in a bounded FIFO history and cannot be drawn
//! again until they fall out of it.

use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

use crate::error::{QuizError, QuizResult};

#[derive(Debug)]
pub struct CooldownSelector<R = StdRng> {
    pool_size: usize,
    capacity: usize,
    history: VecDeque<usize>,
    rng: R,
}

impl CooldownSelector<StdRng> {
    /// Create a selector seeded from the operating system
    pub fn new(pool_size: usize, cooldown_fraction: f64) -> QuizResult<Self> {
        Self::with_rng(pool_size, cooldown_fraction, StdRng::from_os_rng())
    }

    /// Create a selector with a fixed seed (reproducible draw sequences)
    pub fn seeded(pool_size: usize, cooldown_fraction: f64, seed: u64) -> QuizResult<Self> {
        Self::with_rng(pool_size, cooldown_fraction, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> CooldownSelector<R> {
    pub fn with_rng(pool_size: usize, cooldown_fraction: f64, rng: R) -> QuizResult<Self> {
        let capacity = cooldown_capacity(pool_size, cooldown_fraction)?;

        tracing::debug!(
            pool_size,
            cooldown_fraction,
            capacity,
            "Created cooldown selector"
        );

        Ok(Self {
            pool_size,
            capacity,
            history: VecDeque::with_capacity(capacity + 1),
            rng,
        })
    }

    /// Draw an index that is not on cooldown and put it on cooldown
    pub fn draw(&mut self) -> QuizResult<usize> {
        let history = &self.history;
        let chosen = (0..self.pool_size)
            .filter(|index| !history.contains(index))
            .choose(&mut self.rng)
            .ok_or(QuizError::ExhaustedPool {
                pool_size: self.pool_size,
            })?;

        if self.capacity > 0 {
            self.history.push_back(chosen);
            while self.history.len() > self.capacity {
                self.history.pop_front();
            }
        }

        tracing::debug!("Drew index {} (cooldown: {:?})", chosen, self.history);
        Ok(chosen)
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Maximum number of indices on cooldown at once
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Indices currently on cooldown, oldest first
    pub fn cooldown(&self) -> impl Iterator<Item = usize> + '_ {
        self.history.iter().copied()
    }
}

/// Validate the selector parameters and compute the cooldown capacity.
///
/// The cooldown must leave at least two eligible indices on every draw, otherwise
/// "random" selection degenerates into a fixed rotation (or an empty pool). A pool
/// with no cooldown at all is always valid, including a single-question pool.
pub fn cooldown_capacity(pool_size: usize, cooldown_fraction: f64) -> QuizResult<usize> {
    if pool_size == 0 {
        return Err(QuizError::InvalidConfiguration(
            "Question pool must not be empty".to_string(),
        ));
    }

    if !(0.0..1.0).contains(&cooldown_fraction) {
        return Err(QuizError::InvalidConfiguration(format!(
            "Cooldown fraction must be in [0, 1), got {}",
            cooldown_fraction
        )));
    }

    let capacity = (pool_size as f64 * cooldown_fraction).floor() as usize;

    if capacity > 0 && capacity + 1 >= pool_size {
        return Err(QuizError::InvalidConfiguration(format!(
            "Cooldown of {} questions leaves too few eligible questions in a pool of {}",
            capacity, pool_size
        )));
    }

    Ok(capacity)
}
