//! Bounded history of generated samples fed to discriminators.
//!
//! Once full, each query returns a stored entry (and stores the new one in its
//! place) with probability `p`, otherwise it returns the new entry and leaves
//! the pool untouched.

use std::mem;

use burn::prelude::*;
use rand::{Rng, RngCore};

use crate::config::PoolOptions;
use crate::errors::TrainError;
use crate::rng::DeterministicRng;

/// Fixed-capacity, randomly-sampled buffer of owned entries.
#[derive(Debug, Clone)]
pub struct HistoryPool<T, R = DeterministicRng> {
    capacity: usize,
    replace_probability: f64,
    entries: Vec<T>,
    rng: R,
}

impl<T: Clone> HistoryPool<T, DeterministicRng> {
    /// Build a pool from validated options.
    pub fn new(options: &PoolOptions) -> Result<Self, TrainError> {
        Self::with_rng(
            options.capacity,
            options.replace_probability,
            DeterministicRng::new(options.seed),
        )
    }
}

impl<T: Clone, R: RngCore> HistoryPool<T, R> {
    /// Build a pool with an injected random source.
    ///
    /// Negative capacity or a probability outside `[0, 1]` is a configuration error.
    pub fn with_rng(capacity: i64, replace_probability: f64, rng: R) -> Result<Self, TrainError> {
        if capacity < 0 {
            return Err(TrainError::Configuration(format!(
                "pool capacity must be non-negative, got {capacity}"
            )));
        }
        if !(0.0..=1.0).contains(&replace_probability) {
            return Err(TrainError::Configuration(format!(
                "pool replace probability must lie in [0, 1], got {replace_probability}"
            )));
        }
        let capacity = capacity as usize;
        Ok(Self {
            capacity,
            replace_probability,
            entries: Vec::with_capacity(capacity),
            rng,
        })
    }

    /// Return either `new` or a previously stored entry, updating the pool.
    pub fn query(&mut self, new: T) -> T {
        if self.capacity == 0 {
            return new;
        }
        if self.entries.len() < self.capacity {
            self.entries.push(new.clone());
            return new;
        }
        if self.rng.random::<f64>() < self.replace_probability {
            let slot = self.rng.random_range(0..self.capacity);
            mem::replace(&mut self.entries[slot], new)
        } else {
            new
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of stored entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Probability of returning a stored entry once full.
    pub fn replace_probability(&self) -> f64 {
        self.replace_probability
    }

    /// Stored entries in slot order.
    pub fn entries(&self) -> &[T] {
        &self.entries
    }
}

/// History pool of generated images, queried one batch element at a time.
#[derive(Debug, Clone)]
pub struct ImagePool<B: Backend, R = DeterministicRng> {
    inner: HistoryPool<Tensor<B, 4>, R>,
}

impl<B: Backend> ImagePool<B, DeterministicRng> {
    /// Build an image pool from validated options.
    pub fn new(options: &PoolOptions) -> Result<Self, TrainError> {
        Ok(Self {
            inner: HistoryPool::new(options)?,
        })
    }
}

impl<B: Backend, R: RngCore> ImagePool<B, R> {
    /// Build an image pool with an injected random source.
    pub fn with_rng(capacity: i64, replace_probability: f64, rng: R) -> Result<Self, TrainError> {
        Ok(Self {
            inner: HistoryPool::with_rng(capacity, replace_probability, rng)?,
        })
    }

    /// Detach `images` (`[N, C, H, W]`), query each element independently, and
    /// re-concatenate the results in batch order.
    pub fn query_batch(&mut self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let images = images.detach();
        if self.inner.capacity() == 0 {
            return images;
        }
        let count = images.dims()[0];
        let returned: Vec<Tensor<B, 4>> = images
            .chunk(count, 0)
            .into_iter()
            .map(|image| self.inner.query(image))
            .collect();
        Tensor::cat(returned, 0)
    }

    /// Number of stored images.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Maximum number of stored images.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn zero_capacity_is_identity() {
        let mut pool = HistoryPool::with_rng(0, 0.5, DeterministicRng::new(1)).unwrap();
        for value in 0..10 {
            assert_eq!(pool.query(value), value);
        }
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn fills_before_sampling() {
        let mut pool = HistoryPool::with_rng(3, 1.0, DeterministicRng::new(1)).unwrap();
        assert_eq!(pool.query(10), 10);
        assert_eq!(pool.query(11), 11);
        assert_eq!(pool.query(12), 12);
        assert_eq!(pool.entries(), &[10, 11, 12]);
    }

    #[test]
    fn full_pool_returns_new_or_prior_member() {
        let mut pool = HistoryPool::with_rng(4, 0.5, DeterministicRng::new(9)).unwrap();
        for value in 0..200 {
            let before: Vec<i32> = pool.entries().to_vec();
            let returned = pool.query(value);
            assert!(returned == value || before.contains(&returned));
            assert!(pool.len() <= 4);
        }
        assert_eq!(pool.len(), 4);
    }

    #[test]
    fn probability_one_always_swaps() {
        let mut pool = HistoryPool::with_rng(1, 1.0, DeterministicRng::new(2)).unwrap();
        assert_eq!(pool.query("t1"), "t1");
        assert_eq!(pool.query("t2"), "t1");
        assert_eq!(pool.query("t3"), "t2");
        assert_eq!(pool.entries(), &["t3"]);
    }

    #[test]
    fn probability_zero_never_swaps() {
        let mut pool = HistoryPool::with_rng(1, 0.0, DeterministicRng::new(2)).unwrap();
        pool.query(1);
        for value in 2..20 {
            assert_eq!(pool.query(value), value);
        }
        assert_eq!(pool.entries(), &[1]);
    }

    #[test]
    fn invalid_construction_is_rejected() {
        assert!(HistoryPool::<u8>::with_rng(-1, 0.5, DeterministicRng::new(0)).is_err());
        assert!(HistoryPool::<u8>::with_rng(2, 1.5, DeterministicRng::new(0)).is_err());
    }

    #[test]
    fn image_pool_preserves_batch_shape() {
        let device = Default::default();
        let mut pool = ImagePool::<TestBackend>::with_rng(2, 0.5, DeterministicRng::new(4)).unwrap();
        for step in 0..5 {
            let batch = Tensor::<TestBackend, 4>::full([3, 2, 4, 4], step as f32, &device);
            let out = pool.query_batch(batch);
            assert_eq!(out.dims(), [3, 2, 4, 4]);
        }
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn image_pool_without_capacity_returns_input() {
        let device = Default::default();
        let mut pool = ImagePool::<TestBackend>::with_rng(0, 0.5, DeterministicRng::new(4)).unwrap();
        let batch = Tensor::<TestBackend, 4>::full([2, 1, 2, 2], 3.0, &device);
        let out = pool.query_batch(batch);
        assert_eq!(out.into_data().to_vec::<f32>().unwrap(), vec![3.0; 8]);
        assert!(pool.is_empty());
    }
}
