//! Aligned-sample provider.
//!
//! Ownership model:
//! - `AlignedDataset` owns the enumerated, index-aligned path lists and the
//!   validated `DatasetOptions`; it is immutable after construction and shared
//!   behind an `Arc` by the loader.
//! - Every `record`/`sample` call decodes fresh, fully-owned tensors, so decoding
//!   can run on any thread.

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::info;

use crate::assembly::assemble;
use crate::config::{DatasetOptions, EnumerationStrategy, TrainOptions, TransformSharing};
use crate::data::{CompositeSample, RoleSample, SampleRecord};
use crate::errors::TrainError;
use crate::rng::{DeterministicRng, derive_seed};
use crate::transform::{SampleTransform, StandardTransform, decode_image};
use crate::types::RoleName;

/// Enumeration strategies for the supported on-disk layouts.
pub mod strategies;
/// Utility helpers used by enumeration strategies.
pub mod utilities;

pub use strategies::Enumeration;
pub use utilities::grouping::GroupSpan;

/// Index-addressable collection of aligned multi-role samples.
pub struct AlignedDataset {
    options: DatasetOptions,
    role_paths: IndexMap<RoleName, Vec<PathBuf>>,
    groups: Vec<GroupSpan>,
    len: usize,
    transform: Arc<dyn SampleTransform>,
}

impl AlignedDataset {
    /// Validate `options`, enumerate every role, and enforce alignment.
    pub fn new(options: DatasetOptions) -> Result<Self, TrainError> {
        options.validate()?;
        let enumeration = match &options.strategy {
            EnumerationStrategy::Pair {
                dataset_class,
                suffixes,
            } => {
                let ordered: IndexMap<RoleName, String> = options
                    .roles
                    .role_names()
                    .into_iter()
                    .filter_map(|role| suffixes.get(&role).map(|suffix| (role, suffix.clone())))
                    .collect();
                strategies::enumerate_pair(
                    &options.dataroot,
                    &options.phase,
                    dataset_class,
                    &ordered,
                    &options.max_dataset_size,
                )?
            }
            EnumerationStrategy::Grouped { groups } => strategies::enumerate_grouped(
                &options.dataroot,
                &options.phase,
                groups,
                &options.roles.role_names(),
                &options.max_dataset_size,
            )?,
        };
        let len = enumeration.len();
        info!(
            dataroot = %options.dataroot.display(),
            phase = options.phase.as_str(),
            direction = options.direction.as_str(),
            roles = enumeration.role_paths.len(),
            groups = enumeration.groups.len(),
            samples = len,
            "aligned dataset ready"
        );
        let transform: Arc<dyn SampleTransform> =
            Arc::new(StandardTransform::new(options.transform.clone()));
        Ok(Self {
            options,
            role_paths: enumeration.role_paths,
            groups: enumeration.groups,
            len,
            transform,
        })
    }

    /// Validate the full training options first, then build the dataset they describe.
    pub fn from_train_options(options: &TrainOptions) -> Result<Self, TrainError> {
        options.validate()?;
        Self::new(options.dataset.clone())
    }

    /// Replace the pixel transform.
    pub fn with_transform(mut self, transform: Arc<dyn SampleTransform>) -> Self {
        self.transform = transform;
        self
    }

    /// Options the dataset was built from.
    pub fn options(&self) -> &DatasetOptions {
        &self.options
    }

    /// Common per-role sample count.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the dataset holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Declared roles in layout order.
    pub fn roles(&self) -> impl Iterator<Item = &RoleName> {
        self.role_paths.keys()
    }

    /// Sorted, truncated paths of `role`.
    pub fn role_paths(&self, role: &str) -> Option<&[PathBuf]> {
        self.role_paths.get(role).map(Vec::as_slice)
    }

    /// Index ranges contributed by each group (one span for pair layouts).
    pub fn groups(&self) -> &[GroupSpan] {
        &self.groups
    }

    /// Decode and transform every role of sample `index`.
    ///
    /// Transform randomness is derived from `(seed, epoch, index)`, so the same
    /// call always yields the same tensors.
    pub fn record(&self, index: usize, epoch: u64) -> Result<SampleRecord, TrainError> {
        if index >= self.len {
            return Err(TrainError::OutOfRange {
                index,
                len: self.len,
            });
        }
        let mut rng = DeterministicRng::new(derive_seed(self.options.seed, &[epoch, index as u64]));
        let mut decoded = Vec::with_capacity(self.role_paths.len());
        for (role, paths) in &self.role_paths {
            let path = paths[index].clone();
            let image = decode_image(&path)?;
            decoded.push((role.clone(), path, image));
        }

        let shared = match &self.options.roles.transform_sharing {
            TransformSharing::Shared { reference } => {
                let (_, _, image) = decoded
                    .iter()
                    .find(|(role, _, _)| role == reference)
                    .ok_or_else(|| {
                        TrainError::Configuration(format!(
                            "reference role '{reference}' was not enumerated"
                        ))
                    })?;
                Some(self.transform.params((image.width(), image.height()), &mut rng))
            }
            TransformSharing::PerRole => None,
        };

        let mut roles = IndexMap::with_capacity(decoded.len());
        let mut spatial: Option<(RoleName, Vec<usize>)> = None;
        for (role, path, image) in decoded {
            let params = match shared {
                Some(params) => params,
                None => self.transform.params((image.width(), image.height()), &mut rng),
            };
            let channels = self.options.roles.role_channels(&role).unwrap_or(3);
            let data = self.transform.apply(image, &params, channels)?;
            let sample = RoleSample { data, path };
            match &spatial {
                Some((reference, expected)) if expected.as_slice() != sample.spatial() => {
                    return Err(TrainError::Shape {
                        name: format!("{role} (aligned with {reference})"),
                        expected: expected.clone(),
                        actual: sample.spatial().to_vec(),
                    });
                }
                Some(_) => {}
                None => spatial = Some((role.clone(), sample.spatial().to_vec())),
            }
            roles.insert(role, sample);
        }
        Ok(SampleRecord { index, roles })
    }

    /// Decode sample `index` and assemble its slot composites.
    pub fn sample(&self, index: usize, epoch: u64) -> Result<CompositeSample, TrainError> {
        let record = self.record(index, epoch)?;
        assemble(&record, &self.options.roles)
    }

    /// Composite sample `index` with epoch-0 transform randomness.
    pub fn get(&self, index: usize) -> Result<CompositeSample, TrainError> {
        self.sample(index, 0)
    }
}

impl std::fmt::Debug for AlignedDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedDataset")
            .field("dataroot", &self.options.dataroot)
            .field("phase", &self.options.phase)
            .field("roles", &self.role_paths.keys().collect::<Vec<_>>())
            .field("len", &self.len)
            .finish()
    }
}
