use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constants::dataset::{
    DEFAULT_GROUPS, DEFAULT_PHASE, PAIR_IMAGE_SUFFIX, PAIR_LABEL_SUFFIX,
};
use crate::constants::loss::{
    DEFAULT_LAMBDA_A, DEFAULT_LAMBDA_B, DEFAULT_LAMBDA_IDENTITY, DEFAULT_LAMBDA_L1,
};
use crate::constants::pool::{DEFAULT_CYCLIC_POOL_SIZE, DEFAULT_REPLACE_PROBABILITY};
use crate::constants::roles::{
    IMAGE, LABEL, OBJECT, PART_A1, PART_A2, PART_A3, RGB_CHANNELS, SCENE, SLOT_A, SLOT_B,
    STRUCTURE,
};
use crate::constants::training::{
    DEFAULT_BETA1, DEFAULT_LR, DEFAULT_N_EPOCHS, DEFAULT_N_EPOCHS_DECAY,
    DEFAULT_PREFETCH_BATCHES, DEFAULT_PRINT_FREQ,
};
use crate::constants::transform::{DEFAULT_CROP_SIZE, DEFAULT_LOAD_SIZE};
use crate::errors::TrainError;
use crate::types::{GroupId, PhaseName, RoleName, SlotName};

/// Which composite slot is the translation source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Translate slot `A` into slot `B`.
    #[default]
    AtoB,
    /// Translate slot `B` into slot `A`.
    BtoA,
}

impl Direction {
    /// Name as written in option files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::AtoB => "AtoB",
            Direction::BtoA => "BtoA",
        }
    }
}

/// Global cap on the number of enumerated samples.
///
/// Option files accept either an integer or one of `"inf"`, `"infinity"`,
/// `"no limit"`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LimitRepr", into = "LimitRepr")]
pub enum DatasetLimit {
    /// Keep every enumerated sample.
    #[default]
    Unlimited,
    /// Keep at most this many samples.
    Max(usize),
}

impl DatasetLimit {
    /// Number of samples kept out of `available`.
    pub fn apply(&self, available: usize) -> usize {
        match self {
            DatasetLimit::Unlimited => available,
            DatasetLimit::Max(max) => available.min(*max),
        }
    }

    /// True when no cap applies.
    pub fn is_unlimited(&self) -> bool {
        matches!(self, DatasetLimit::Unlimited)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LimitRepr {
    Count(usize),
    Text(String),
}

impl TryFrom<LimitRepr> for DatasetLimit {
    type Error = String;

    fn try_from(value: LimitRepr) -> Result<Self, Self::Error> {
        match value {
            LimitRepr::Count(max) => Ok(DatasetLimit::Max(max)),
            LimitRepr::Text(text) => {
                let normalized = text.trim().to_ascii_lowercase();
                match normalized.as_str() {
                    "inf" | "infinity" | "no limit" | "unlimited" => Ok(DatasetLimit::Unlimited),
                    other => other.parse::<usize>().map(DatasetLimit::Max).map_err(|_| {
                        format!("max_dataset_size must be a non-negative integer or \"inf\", got '{text}'")
                    }),
                }
            }
        }
    }
}

impl From<DatasetLimit> for LimitRepr {
    fn from(value: DatasetLimit) -> Self {
        match value {
            DatasetLimit::Unlimited => LimitRepr::Text("inf".to_string()),
            DatasetLimit::Max(max) => LimitRepr::Count(max),
        }
    }
}

/// Geometric preprocessing applied before tensor conversion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preprocess {
    /// Resize to `load_size` square, then crop `crop_size`.
    #[default]
    ResizeAndCrop,
    /// Crop `crop_size` without resizing.
    Crop,
    /// Scale width to `load_size` keeping aspect ratio.
    ScaleWidth,
    /// Scale width to `load_size`, then crop `crop_size`.
    ScaleWidthAndCrop,
    /// Only round sides to a multiple of four.
    None,
}

/// Transform toggles consumed by the sample transform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Geometric preprocessing mode.
    pub preprocess: Preprocess,
    /// Edge length used by resize and scale-width modes.
    pub load_size: u32,
    /// Edge length of the crop window.
    pub crop_size: u32,
    /// Disable random horizontal flips.
    pub no_flip: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            preprocess: Preprocess::ResizeAndCrop,
            load_size: DEFAULT_LOAD_SIZE,
            crop_size: DEFAULT_CROP_SIZE,
            no_flip: false,
        }
    }
}

impl TransformOptions {
    /// Override the preprocessing mode.
    pub fn with_preprocess(mut self, preprocess: Preprocess) -> Self {
        self.preprocess = preprocess;
        self
    }

    /// Override load and crop sizes.
    pub fn with_sizes(mut self, load_size: u32, crop_size: u32) -> Self {
        self.load_size = load_size;
        self.crop_size = crop_size;
        self
    }

    /// Enable or disable random flips.
    pub fn with_no_flip(mut self, no_flip: bool) -> Self {
        self.no_flip = no_flip;
        self
    }

    fn validate(&self) -> Result<(), TrainError> {
        if self.load_size == 0 || self.crop_size == 0 {
            return Err(TrainError::Configuration(
                "load_size and crop_size must be greater than zero".to_string(),
            ));
        }
        if matches!(self.preprocess, Preprocess::ResizeAndCrop) && self.crop_size > self.load_size
        {
            return Err(TrainError::Configuration(format!(
                "crop_size {} exceeds load_size {} for resize_and_crop",
                self.crop_size, self.load_size
            )));
        }
        Ok(())
    }
}

/// One role placed into a composite slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSpec {
    /// Part identifier inside the slot (`A1`, `A2`, ...; the slot name for single-part slots).
    pub part: SlotName,
    /// Semantic role whose tensor fills this part.
    pub role: RoleName,
    /// Channel count of the role tensor (1 decodes grayscale, 3 decodes RGB).
    pub channels: usize,
}

impl PartSpec {
    /// Build a part spec.
    pub fn new(part: impl Into<SlotName>, role: impl Into<RoleName>, channels: usize) -> Self {
        Self {
            part: part.into(),
            role: role.into(),
            channels,
        }
    }
}

/// A composite slot and its channel-concatenation order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSpec {
    /// Slot name (`A` or `B`).
    pub name: SlotName,
    /// Parts in concatenation order.
    pub parts: Vec<PartSpec>,
}

impl SlotSpec {
    /// Build a slot spec.
    pub fn new(name: impl Into<SlotName>, parts: Vec<PartSpec>) -> Self {
        Self {
            name: name.into(),
            parts,
        }
    }

    /// Single-part slot whose part shares the slot name.
    pub fn single(name: &str, role: &str, channels: usize) -> Self {
        Self::new(name, vec![PartSpec::new(name, role, channels)])
    }

    /// Total channel count of the composite.
    pub fn channels(&self) -> usize {
        self.parts.iter().map(|part| part.channels).sum()
    }

    /// True when more than one role is concatenated into this slot.
    pub fn is_composite(&self) -> bool {
        self.parts.len() > 1
    }
}

/// How transform parameters are drawn for the roles of one record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformSharing {
    /// One parameter set, drawn from the reference role's size, applied to every role.
    Shared {
        /// Role whose decoded size seeds the parameters.
        reference: RoleName,
    },
    /// Independent parameters per role.
    PerRole,
}

/// Declares which roles fill which composite slots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGroupConfig {
    /// Composite slots in declaration order.
    pub slots: Vec<SlotSpec>,
    /// Transform parameter sharing for one record.
    pub transform_sharing: TransformSharing,
}

impl RoleGroupConfig {
    /// Photo (`A`) and semantic label map (`B`) pairs, transformed independently.
    pub fn ade20k() -> Self {
        Self {
            slots: vec![
                SlotSpec::single(SLOT_A, IMAGE, RGB_CHANNELS),
                SlotSpec::single(SLOT_B, LABEL, RGB_CHANNELS),
            ],
            transform_sharing: TransformSharing::PerRole,
        }
    }

    /// Object and scene layers translated into the composed image.
    pub fn advnet_paired() -> Self {
        Self {
            slots: vec![
                SlotSpec::new(
                    SLOT_A,
                    vec![
                        PartSpec::new(PART_A1, OBJECT, RGB_CHANNELS),
                        PartSpec::new(PART_A2, SCENE, RGB_CHANNELS),
                    ],
                ),
                SlotSpec::single(SLOT_B, IMAGE, RGB_CHANNELS),
            ],
            transform_sharing: TransformSharing::Shared {
                reference: IMAGE.to_string(),
            },
        }
    }

    /// Object, scene, and structure layers translated into the composed image.
    pub fn advnet_cyclic() -> Self {
        Self {
            slots: vec![
                SlotSpec::new(
                    SLOT_A,
                    vec![
                        PartSpec::new(PART_A1, OBJECT, RGB_CHANNELS),
                        PartSpec::new(PART_A2, SCENE, RGB_CHANNELS),
                        PartSpec::new(PART_A3, STRUCTURE, RGB_CHANNELS),
                    ],
                ),
                SlotSpec::single(SLOT_B, IMAGE, RGB_CHANNELS),
            ],
            transform_sharing: TransformSharing::Shared {
                reference: IMAGE.to_string(),
            },
        }
    }

    /// Look up a slot by name.
    pub fn slot(&self, name: &str) -> Option<&SlotSpec> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    /// All parts across slots, in slot then concatenation order.
    pub fn parts(&self) -> impl Iterator<Item = &PartSpec> {
        self.slots.iter().flat_map(|slot| slot.parts.iter())
    }

    /// Declared role names, in slot then concatenation order.
    pub fn role_names(&self) -> Vec<RoleName> {
        self.parts().map(|part| part.role.clone()).collect()
    }

    /// Channel count declared for `role`.
    pub fn role_channels(&self, role: &str) -> Option<usize> {
        self.parts()
            .find(|part| part.role == role)
            .map(|part| part.channels)
    }

    /// Check slot, part, and role declarations for consistency.
    pub fn validate(&self) -> Result<(), TrainError> {
        if self.slots.is_empty() {
            return Err(TrainError::Configuration(
                "role layout declares no slots".to_string(),
            ));
        }
        let mut slot_names: Vec<&str> = Vec::new();
        let mut part_names: Vec<&str> = Vec::new();
        let mut roles: Vec<&str> = Vec::new();
        for slot in &self.slots {
            if slot_names.contains(&slot.name.as_str()) {
                return Err(TrainError::Configuration(format!(
                    "slot '{}' is declared more than once",
                    slot.name
                )));
            }
            slot_names.push(&slot.name);
            if slot.parts.is_empty() {
                return Err(TrainError::Configuration(format!(
                    "slot '{}' has no parts",
                    slot.name
                )));
            }
            for part in &slot.parts {
                if part_names.contains(&part.part.as_str()) {
                    return Err(TrainError::Configuration(format!(
                        "part '{}' is declared more than once",
                        part.part
                    )));
                }
                part_names.push(&part.part);
                if roles.contains(&part.role.as_str()) {
                    return Err(TrainError::Configuration(format!(
                        "role '{}' is mapped to more than one part",
                        part.role
                    )));
                }
                roles.push(&part.role);
                if part.channels != 1 && part.channels != RGB_CHANNELS {
                    return Err(TrainError::Configuration(format!(
                        "role '{}' declares {} channels; only 1 (grayscale) or 3 (RGB) are supported",
                        part.role, part.channels
                    )));
                }
            }
        }
        if let TransformSharing::Shared { reference } = &self.transform_sharing
            && !roles.contains(&reference.as_str())
        {
            return Err(TrainError::Configuration(format!(
                "shared transform reference role '{reference}' is not declared"
            )));
        }
        Ok(())
    }
}

/// File enumeration strategy of a dataset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnumerationStrategy {
    /// Two roles in one directory (`{root}/images/{phase}/{class[0]}/{class}`), split by filename suffix.
    Pair {
        /// Scene class directory name.
        dataset_class: String,
        /// Filename suffix per role.
        suffixes: IndexMap<RoleName, String>,
    },
    /// Roles in per-group directories (`{root}/{phase}/{group}/{group}_{role}`).
    Grouped {
        /// Group identifiers in concatenation order.
        groups: Vec<GroupId>,
    },
}

impl EnumerationStrategy {
    /// ADE20K photo/label pairs of one scene class.
    pub fn ade20k(dataset_class: impl Into<String>) -> Self {
        let mut suffixes = IndexMap::new();
        suffixes.insert(IMAGE.to_string(), PAIR_IMAGE_SUFFIX.to_string());
        suffixes.insert(LABEL.to_string(), PAIR_LABEL_SUFFIX.to_string());
        EnumerationStrategy::Pair {
            dataset_class: dataset_class.into(),
            suffixes,
        }
    }

    /// Grouped layout over the default object groups.
    pub fn default_groups() -> Self {
        EnumerationStrategy::Grouped {
            groups: DEFAULT_GROUPS.iter().map(|group| group.to_string()).collect(),
        }
    }
}

/// Everything the aligned-sample provider needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetOptions {
    /// Dataset root directory.
    pub dataroot: PathBuf,
    /// Phase directory (`train`, `test`, ...).
    #[serde(default = "default_phase")]
    pub phase: PhaseName,
    /// Translation direction.
    #[serde(default)]
    pub direction: Direction,
    /// Global sample cap.
    #[serde(default)]
    pub max_dataset_size: DatasetLimit,
    /// Enumeration strategy.
    pub strategy: EnumerationStrategy,
    /// Role layout.
    pub roles: RoleGroupConfig,
    /// Transform toggles.
    #[serde(default)]
    pub transform: TransformOptions,
    /// Seed for per-sample transform randomness.
    #[serde(default)]
    pub seed: u64,
}

fn default_phase() -> PhaseName {
    DEFAULT_PHASE.to_string()
}

impl DatasetOptions {
    /// Create dataset options with default phase, direction, limit, and transforms.
    pub fn new(
        dataroot: impl Into<PathBuf>,
        strategy: EnumerationStrategy,
        roles: RoleGroupConfig,
    ) -> Self {
        Self {
            dataroot: dataroot.into(),
            phase: default_phase(),
            direction: Direction::AtoB,
            max_dataset_size: DatasetLimit::Unlimited,
            strategy,
            roles,
            transform: TransformOptions::default(),
            seed: 0,
        }
    }

    /// Override the phase directory.
    pub fn with_phase(mut self, phase: impl Into<PhaseName>) -> Self {
        self.phase = phase.into();
        self
    }

    /// Override the direction.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Override the global sample cap.
    pub fn with_max_dataset_size(mut self, limit: DatasetLimit) -> Self {
        self.max_dataset_size = limit;
        self
    }

    /// Override the transform toggles.
    pub fn with_transform(mut self, transform: TransformOptions) -> Self {
        self.transform = transform;
        self
    }

    /// Override the transform seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check the role layout against the enumeration strategy and direction.
    pub fn validate(&self) -> Result<(), TrainError> {
        if self.phase.trim().is_empty() {
            return Err(TrainError::Configuration(
                "phase must not be empty".to_string(),
            ));
        }
        self.roles.validate()?;
        self.transform.validate()?;
        match &self.strategy {
            EnumerationStrategy::Pair {
                dataset_class,
                suffixes,
            } => {
                if dataset_class.is_empty() {
                    return Err(TrainError::Configuration(
                        "pair layouts require a dataset_class".to_string(),
                    ));
                }
                let roles = self.roles.role_names();
                if roles.len() != 2 {
                    return Err(TrainError::Configuration(format!(
                        "pair layouts join exactly two roles, {} declared",
                        roles.len()
                    )));
                }
                for role in &roles {
                    if !suffixes.contains_key(role) {
                        return Err(TrainError::Configuration(format!(
                            "pair layout has no filename suffix for role '{role}'"
                        )));
                    }
                }
                let first = &suffixes[&roles[0]];
                let second = &suffixes[&roles[1]];
                if first.is_empty()
                    || second.is_empty()
                    || first.ends_with(second.as_str())
                    || second.ends_with(first.as_str())
                {
                    return Err(TrainError::Configuration(format!(
                        "pair suffixes '{first}' and '{second}' do not partition filenames"
                    )));
                }
            }
            EnumerationStrategy::Grouped { groups } => {
                if groups.is_empty() {
                    return Err(TrainError::Configuration(
                        "grouped layouts require at least one group".to_string(),
                    ));
                }
                if self.direction != Direction::AtoB {
                    return Err(TrainError::Configuration(format!(
                        "grouped layouts only support direction AtoB, got {}",
                        self.direction.as_str()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Training objective family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    /// One generator, conditional discriminator, reconstruction loss against the paired target.
    Paired,
    /// Two generators and two discriminators with cycle-consistency.
    Cyclic,
}

/// Adversarial criterion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GanMode {
    /// Mean squared error against 1/0 targets.
    #[default]
    LeastSquares,
    /// Binary cross-entropy on logits.
    Vanilla,
}

/// Loss weights.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LossOptions {
    /// Adversarial criterion.
    pub gan_mode: GanMode,
    /// Weight of the A cycle (and of identity on A2).
    #[serde(rename = "lambda_A")]
    pub lambda_a: f64,
    /// Weight of the B cycle (and of identity on B).
    #[serde(rename = "lambda_B")]
    pub lambda_b: f64,
    /// Identity weight relative to the cycle weights; `<= 0` disables identity terms.
    pub lambda_identity: f64,
    /// Reconstruction weight of the paired variant.
    #[serde(rename = "lambda_L1")]
    pub lambda_l1: f64,
}

impl Default for LossOptions {
    fn default() -> Self {
        Self {
            gan_mode: GanMode::LeastSquares,
            lambda_a: DEFAULT_LAMBDA_A,
            lambda_b: DEFAULT_LAMBDA_B,
            lambda_identity: DEFAULT_LAMBDA_IDENTITY,
            lambda_l1: DEFAULT_LAMBDA_L1,
        }
    }
}

impl LossOptions {
    fn validate(&self) -> Result<(), TrainError> {
        for (name, value) in [
            ("lambda_A", self.lambda_a),
            ("lambda_B", self.lambda_b),
            ("lambda_identity", self.lambda_identity),
            ("lambda_L1", self.lambda_l1),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(TrainError::Configuration(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Discriminator history buffer settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolOptions {
    /// Pool capacity; 0 disables pooling, negative values are rejected.
    #[serde(rename = "pool_size")]
    pub capacity: i64,
    /// Probability of returning a stored entry once the pool is full.
    #[serde(rename = "pool_replace_probability")]
    pub replace_probability: f64,
    /// Seed of the pool random source.
    #[serde(rename = "pool_seed")]
    pub seed: u64,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CYCLIC_POOL_SIZE,
            replace_probability: DEFAULT_REPLACE_PROBABILITY,
            seed: 0,
        }
    }
}

impl PoolOptions {
    /// Pool with `capacity` and default probability.
    pub fn with_capacity(capacity: i64) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Check capacity and probability.
    pub fn validate(&self) -> Result<(), TrainError> {
        if self.capacity < 0 {
            return Err(TrainError::Configuration(format!(
                "pool capacity must be non-negative, got {}",
                self.capacity
            )));
        }
        if !(0.0..=1.0).contains(&self.replace_probability) {
            return Err(TrainError::Configuration(format!(
                "pool replace probability must lie in [0, 1], got {}",
                self.replace_probability
            )));
        }
        Ok(())
    }
}

/// Learning-rate policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LrPolicy {
    /// Keep the initial rate.
    Constant,
    /// Keep the initial rate for `n_epochs`, then decay linearly to zero over `n_epochs_decay`.
    #[default]
    Linear,
}

/// Loop, batching, and optimizer-schedule settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleOptions {
    /// Samples per batch.
    pub batch_size: usize,
    /// Take batches in dataset order instead of shuffling.
    pub serial_batches: bool,
    /// Epochs at the initial learning rate.
    pub n_epochs: usize,
    /// Epochs of linear decay.
    pub n_epochs_decay: usize,
    /// Starting epoch count.
    pub epoch_count: usize,
    /// Initial learning rate.
    pub lr: f64,
    /// Adam beta1.
    pub beta1: f64,
    /// Learning-rate policy.
    pub lr_policy: LrPolicy,
    /// Iterations between loss reports.
    pub print_freq: usize,
    /// Decoded batches kept ahead of the training thread.
    pub prefetch_batches: usize,
    /// Seed of the epoch shuffle.
    pub seed: u64,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            batch_size: 1,
            serial_batches: false,
            n_epochs: DEFAULT_N_EPOCHS,
            n_epochs_decay: DEFAULT_N_EPOCHS_DECAY,
            epoch_count: 1,
            lr: DEFAULT_LR,
            beta1: DEFAULT_BETA1,
            lr_policy: LrPolicy::Linear,
            print_freq: DEFAULT_PRINT_FREQ,
            prefetch_batches: DEFAULT_PREFETCH_BATCHES,
            seed: 0,
        }
    }
}

impl ScheduleOptions {
    /// Number of epochs a full run trains for.
    pub fn total_epochs(&self) -> usize {
        (self.n_epochs + self.n_epochs_decay + 1).saturating_sub(self.epoch_count)
    }

    fn validate(&self) -> Result<(), TrainError> {
        if self.batch_size == 0 {
            return Err(TrainError::Configuration(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        if self.print_freq == 0 {
            return Err(TrainError::Configuration(
                "print_freq must be greater than zero".to_string(),
            ));
        }
        if !self.lr.is_finite() || self.lr <= 0.0 {
            return Err(TrainError::Configuration(format!(
                "lr must be positive, got {}",
                self.lr
            )));
        }
        Ok(())
    }
}

/// Top-level training configuration, validated once and shared by reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainOptions {
    /// Dataset provider settings.
    pub dataset: DatasetOptions,
    /// Objective family.
    pub model: ModelVariant,
    /// Channels of the generator input (the source slot after direction).
    pub input_nc: usize,
    /// Channels of the generator output (the target slot after direction).
    pub output_nc: usize,
    /// Channels of the translated source part of the cyclic variant (defaults to `output_nc`).
    #[serde(default)]
    pub input2_nc: Option<usize>,
    /// Loss weights.
    #[serde(default)]
    pub loss: LossOptions,
    /// History buffer settings.
    #[serde(default)]
    pub pool: PoolOptions,
    /// Loop settings.
    #[serde(default)]
    pub schedule: ScheduleOptions,
}

impl TrainOptions {
    /// Unpaired object/scene/structure → image translation over the grouped layout.
    pub fn advnet_cyclic(dataroot: impl Into<PathBuf>) -> Self {
        let roles = RoleGroupConfig::advnet_cyclic();
        let input_nc = roles.slot(SLOT_A).map(SlotSpec::channels).unwrap_or_default();
        Self {
            dataset: DatasetOptions::new(dataroot, EnumerationStrategy::default_groups(), roles)
                .with_transform(TransformOptions::default().with_no_flip(true)),
            model: ModelVariant::Cyclic,
            input_nc,
            output_nc: RGB_CHANNELS,
            input2_nc: Some(RGB_CHANNELS),
            loss: LossOptions::default(),
            pool: PoolOptions::default(),
            schedule: ScheduleOptions::default(),
        }
    }

    /// Paired object/scene → image translation over the grouped layout.
    pub fn advnet_paired(dataroot: impl Into<PathBuf>) -> Self {
        let roles = RoleGroupConfig::advnet_paired();
        let input_nc = roles.slot(SLOT_A).map(SlotSpec::channels).unwrap_or_default();
        Self {
            dataset: DatasetOptions::new(dataroot, EnumerationStrategy::default_groups(), roles)
                .with_transform(TransformOptions::default().with_no_flip(true)),
            model: ModelVariant::Paired,
            input_nc,
            output_nc: RGB_CHANNELS,
            input2_nc: None,
            loss: LossOptions {
                gan_mode: GanMode::Vanilla,
                ..LossOptions::default()
            },
            pool: PoolOptions::with_capacity(0),
            schedule: ScheduleOptions::default(),
        }
    }

    /// Paired label → photo translation over one ADE20K scene class.
    pub fn ade20k(dataroot: impl Into<PathBuf>, dataset_class: impl Into<String>) -> Self {
        Self {
            dataset: DatasetOptions::new(
                dataroot,
                EnumerationStrategy::ade20k(dataset_class),
                RoleGroupConfig::ade20k(),
            )
            .with_direction(Direction::BtoA),
            model: ModelVariant::Paired,
            input_nc: RGB_CHANNELS,
            output_nc: RGB_CHANNELS,
            input2_nc: None,
            loss: LossOptions {
                gan_mode: GanMode::Vanilla,
                ..LossOptions::default()
            },
            pool: PoolOptions::with_capacity(0),
            schedule: ScheduleOptions::default(),
        }
    }

    /// Parse options from JSON text and validate them.
    pub fn from_json_str(text: &str) -> Result<Self, TrainError> {
        let options: TrainOptions = serde_json::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    /// Read options from a JSON file and validate them.
    pub fn from_json_path(path: &Path) -> Result<Self, TrainError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Slot translated from, after applying the direction.
    pub fn source_slot(&self) -> Result<&SlotSpec, TrainError> {
        let name = match self.dataset.direction {
            Direction::AtoB => SLOT_A,
            Direction::BtoA => SLOT_B,
        };
        self.require_slot(name)
    }

    /// Slot translated into, after applying the direction.
    pub fn target_slot(&self) -> Result<&SlotSpec, TrainError> {
        let name = match self.dataset.direction {
            Direction::AtoB => SLOT_B,
            Direction::BtoA => SLOT_A,
        };
        self.require_slot(name)
    }

    /// Channels of the translated source part (`input2_nc`, defaulting to `output_nc`).
    pub fn effective_input2_nc(&self) -> usize {
        self.input2_nc.unwrap_or(self.output_nc)
    }

    fn require_slot(&self, name: &str) -> Result<&SlotSpec, TrainError> {
        self.dataset.roles.slot(name).ok_or_else(|| {
            TrainError::Configuration(format!("role layout has no slot '{name}'"))
        })
    }

    /// Validate every section and the channel declarations against the role layout.
    pub fn validate(&self) -> Result<(), TrainError> {
        self.dataset.validate()?;
        self.loss.validate()?;
        self.pool.validate()?;
        self.schedule.validate()?;

        if self.dataset.roles.slots.len() != 2 {
            return Err(TrainError::Configuration(format!(
                "translation needs exactly the slots '{SLOT_A}' and '{SLOT_B}', {} declared",
                self.dataset.roles.slots.len()
            )));
        }
        let source = self.source_slot()?;
        let target = self.target_slot()?;
        if source.is_composite() && self.dataset.direction == Direction::BtoA {
            return Err(TrainError::Configuration(format!(
                "direction BtoA is not supported when slot '{}' is a multi-part composite",
                source.name
            )));
        }
        if target.is_composite() {
            return Err(TrainError::Configuration(format!(
                "target slot '{}' must hold a single role",
                target.name
            )));
        }
        if self.input_nc != source.channels() {
            return Err(TrainError::Configuration(format!(
                "input_nc is {} but slot '{}' concatenates {} channels",
                self.input_nc,
                source.name,
                source.channels()
            )));
        }
        if self.output_nc != target.channels() {
            return Err(TrainError::Configuration(format!(
                "output_nc is {} but slot '{}' holds {} channels",
                self.output_nc,
                target.name,
                target.channels()
            )));
        }
        if self.model == ModelVariant::Cyclic {
            self.validate_cyclic_parts(source)?;
        }
        Ok(())
    }

    fn validate_cyclic_parts(&self, source: &SlotSpec) -> Result<(), TrainError> {
        let [_, translated, structure] = source.parts.as_slice() else {
            return Err(TrainError::Configuration(format!(
                "the cyclic variant needs a three-part source composite, slot '{}' has {} parts",
                source.name,
                source.parts.len()
            )));
        };
        let input2_nc = self.effective_input2_nc();
        if translated.channels != input2_nc {
            return Err(TrainError::Configuration(format!(
                "input2_nc is {input2_nc} but part '{}' holds {} channels",
                translated.part, translated.channels
            )));
        }
        if input2_nc != self.output_nc {
            return Err(TrainError::Configuration(format!(
                "input2_nc ({input2_nc}) must equal output_nc ({}) for the reverse generator",
                self.output_nc
            )));
        }
        if structure.channels != translated.channels {
            return Err(TrainError::Configuration(format!(
                "parts '{}' and '{}' must have equal channels for masked recombination",
                translated.part, structure.part
            )));
        }
        Ok(())
    }
}
