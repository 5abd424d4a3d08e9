//! Epoch ordering, parallel decoding, and background prefetch of composite samples.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use rand::seq::SliceRandom;
use rayon::prelude::*;
use tracing::debug;

use crate::config::ScheduleOptions;
use crate::constants::training::{EPOCH_SEED_OFFSET, PREFETCHER_STOPPED_REASON};
use crate::data::CompositeSample;
use crate::errors::TrainError;
use crate::rng::{DeterministicRng, derive_seed};
use crate::source::AlignedDataset;

/// Batches dataset indices for one epoch and decodes them on the rayon pool.
#[derive(Clone, Debug)]
pub struct DataLoader {
    dataset: Arc<AlignedDataset>,
    batch_size: usize,
    serial_batches: bool,
    seed: u64,
    prefetch_batches: usize,
}

impl DataLoader {
    /// Create a loader over `dataset`.
    pub fn new(dataset: Arc<AlignedDataset>, batch_size: usize) -> Result<Self, TrainError> {
        if batch_size == 0 {
            return Err(TrainError::Configuration(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            dataset,
            batch_size,
            serial_batches: false,
            seed: 0,
            prefetch_batches: 1,
        })
    }

    /// Create a loader from schedule options.
    pub fn from_schedule(
        dataset: Arc<AlignedDataset>,
        schedule: &ScheduleOptions,
    ) -> Result<Self, TrainError> {
        Ok(Self::new(dataset, schedule.batch_size)?
            .with_serial_batches(schedule.serial_batches)
            .with_seed(schedule.seed)
            .with_prefetch_batches(schedule.prefetch_batches))
    }

    /// Keep dataset order instead of shuffling each epoch.
    pub fn with_serial_batches(mut self, serial_batches: bool) -> Self {
        self.serial_batches = serial_batches;
        self
    }

    /// Seed of the epoch shuffle.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of decoded batches kept ahead of the consumer.
    pub fn with_prefetch_batches(mut self, prefetch_batches: usize) -> Self {
        self.prefetch_batches = prefetch_batches.max(1);
        self
    }

    /// Dataset being loaded.
    pub fn dataset(&self) -> &Arc<AlignedDataset> {
        &self.dataset
    }

    /// Samples per batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Batches per epoch; the final batch may be partial.
    pub fn batches_per_epoch(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    /// Sample order for `epoch`: identity when serial, otherwise a seeded shuffle.
    pub fn epoch_order(&self, epoch: u64) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if !self.serial_batches {
            let seed = derive_seed(self.seed ^ EPOCH_SEED_OFFSET, &[epoch]);
            order.shuffle(&mut DeterministicRng::new(seed));
        }
        order
    }

    /// Index batches of `epoch`.
    pub fn epoch_batches(&self, epoch: u64) -> Vec<Vec<usize>> {
        self.epoch_order(epoch)
            .chunks(self.batch_size)
            .map(<[usize]>::to_vec)
            .collect()
    }

    /// Decode `indices` in parallel, preserving their order.
    pub fn load_batch(&self, indices: &[usize], epoch: u64) -> Result<Vec<CompositeSample>, TrainError> {
        indices
            .par_iter()
            .map(|index| self.dataset.sample(*index, epoch))
            .collect()
    }

    /// Decode every batch of `epoch` on a background thread.
    pub fn prefetch(&self, epoch: u64) -> BatchPrefetcher<Vec<CompositeSample>> {
        let batches = self.epoch_batches(epoch);
        debug!(
            epoch,
            batches = batches.len(),
            samples = self.dataset.len(),
            "epoch prefetch started"
        );
        let loader = self.clone();
        let mut pending = batches.into_iter();
        BatchPrefetcher::new(self.prefetch_batches, move || {
            pending
                .next()
                .map(|indices| loader.load_batch(&indices, epoch))
        })
    }
}

/// Background prefetcher that fills a bounded queue with decoded batches.
pub struct BatchPrefetcher<T> {
    receiver: Option<mpsc::Receiver<Result<T, TrainError>>>,
    handle: Option<thread::JoinHandle<()>>,
    stats: Arc<PrefetcherStats>,
}

#[derive(Default)]
/// Prefetcher runtime counters.
struct PrefetcherStats {
    queued: AtomicUsize,
    produced: AtomicUsize,
    errors: AtomicUsize,
    finished: AtomicBool,
}

impl<T: Send + 'static> BatchPrefetcher<T> {
    /// Spawn a worker that calls `producer` until it returns `None` or the
    /// prefetcher is dropped.
    pub fn new<F>(capacity: usize, mut producer: F) -> Self
    where
        F: FnMut() -> Option<Result<T, TrainError>> + Send + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        let stats = Arc::new(PrefetcherStats::default());
        let stats_thread = Arc::clone(&stats);
        let handle = thread::spawn(move || {
            while let Some(result) = producer() {
                if result.is_err() {
                    stats_thread.errors.fetch_add(1, Ordering::Relaxed);
                }
                if sender.send(result).is_err() {
                    break;
                }
                stats_thread.queued.fetch_add(1, Ordering::Relaxed);
                stats_thread.produced.fetch_add(1, Ordering::Relaxed);
            }
            stats_thread.finished.store(true, Ordering::Relaxed);
        });
        Self {
            receiver: Some(receiver),
            handle: Some(handle),
            stats,
        }
    }

    /// Block until the next batch is available.
    ///
    /// Returns `None` once the producer is exhausted and the queue is drained.
    pub fn next_batch(&self) -> Option<Result<T, TrainError>> {
        let Some(receiver) = self.receiver.as_ref() else {
            return Some(Err(TrainError::LoaderStopped(
                PREFETCHER_STOPPED_REASON.into(),
            )));
        };
        let result = receiver.recv().ok()?;
        self.stats
            .queued
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |value| {
                Some(value.saturating_sub(1))
            })
            .ok();
        Some(result)
    }

    /// Number of prefetched batches currently queued.
    pub fn queue_len(&self) -> usize {
        self.stats.queued.load(Ordering::Relaxed)
    }

    /// Total number of batches produced by the background worker.
    pub fn produced_count(&self) -> usize {
        self.stats.produced.load(Ordering::Relaxed)
    }

    /// Total number of errors produced by the background worker.
    pub fn error_count(&self) -> usize {
        self.stats.errors.load(Ordering::Relaxed)
    }

    /// True once the producer returned `None` (or the consumer went away).
    pub fn is_finished(&self) -> bool {
        self.stats.finished.load(Ordering::Relaxed)
    }
}

impl<T: Send + 'static> Iterator for BatchPrefetcher<T> {
    type Item = Result<T, TrainError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch()
    }
}

impl<T> Drop for BatchPrefetcher<T> {
    fn drop(&mut self) {
        self.receiver.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
