#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Reusable command-line apps shared by the demos.
pub mod apps;
/// Channel-wise composite assembly and masked recombination.
pub mod assembly;
/// Dataset, model, pool, loss, and schedule configuration types.
pub mod config;
/// Centralized constants used across the dataset, pool, model, and trainer.
pub mod constants;
/// Sample records, composite samples, and device batches.
pub mod data;
/// Epoch ordering and background batch prefetch.
pub mod loader;
/// Adversarial, reconstruction, and discriminator loss helpers.
pub mod loss;
/// Loss averaging and group balance helpers.
pub mod metrics;
/// Training orchestrator for paired and cyclic variants.
pub mod model;
/// Generator/discriminator seams implemented by caller networks.
pub mod networks;
/// Bounded history buffer of generated images.
pub mod pool;
/// Seedable random source shared by transforms, pools, and the loader.
pub mod rng;
/// Aligned multi-role dataset provider.
pub mod source;
/// Reference training loop over `burn` optimizers.
pub mod trainer;
/// Image decoding and pixel transforms.
pub mod transform;
/// Input transports used by the provider (filesystem today).
pub mod transport;
/// Shared type aliases.
pub mod types;

mod errors;

pub use assembly::{CompositeLayout, PartRange, assemble, masked_recombine};
pub use config::{
    DatasetLimit, DatasetOptions, Direction, EnumerationStrategy, GanMode, LossOptions, LrPolicy,
    ModelVariant, PartSpec, PoolOptions, Preprocess, RoleGroupConfig, ScheduleOptions, SlotSpec,
    TrainOptions, TransformOptions, TransformSharing,
};
pub use data::{Batch, CompositeSample, RoleSample, SampleRecord};
pub use errors::TrainError;
pub use loader::{BatchPrefetcher, DataLoader};
pub use loss::{GanCriterion, LossValues};
pub use model::{Stage, TranslationModel};
pub use networks::{Critic, NetworkRole, Networks, Translator};
pub use pool::{HistoryPool, ImagePool};
pub use rng::DeterministicRng;
pub use source::{AlignedDataset, GroupSpan};
pub use trainer::{EpochSummary, Trainer, TrainingSummary};
pub use transform::{SampleTransform, StandardTransform, TransformParams};
pub use types::{GroupId, LossName, PathString, PhaseName, RoleName, SlotName, VisualName};
