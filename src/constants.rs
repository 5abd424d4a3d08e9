/// Constants describing on-disk dataset layouts.
pub mod dataset {
    /// Image file extensions accepted during enumeration.
    pub const IMG_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "ppm", "bmp", "tif", "tiff"];
    /// Top-level directory holding ADE20K-style pair layouts (`{root}/images/{phase}/{c}/{class}`).
    pub const PAIR_IMAGES_DIR: &str = "images";
    /// Filename suffix of ground-truth photos in ADE20K-style pair layouts.
    pub const PAIR_IMAGE_SUFFIX: &str = ".jpg";
    /// Filename suffix of semantic label maps in ADE20K-style pair layouts.
    pub const PAIR_LABEL_SUFFIX: &str = "_seg.png";
    /// Separator joining group id and role in grouped layouts (`{group}_{role}`).
    pub const GROUP_ROLE_SEPARATOR: &str = "_";
    /// Default object groups of the AdvNet grouped layout.
    pub const DEFAULT_GROUPS: [&str; 4] = ["cola", "sprite", "milk", "tea"];
    /// Default dataset phase.
    pub const DEFAULT_PHASE: &str = "train";
}

/// Role and slot names used by the built-in role layouts.
pub mod roles {
    /// Object without background.
    pub const OBJECT: &str = "object";
    /// Ground truth background only.
    pub const SCENE: &str = "scene";
    /// Object mask with background.
    pub const STRUCTURE: &str = "structure";
    /// Ground truth image with object.
    pub const IMAGE: &str = "image";
    /// Semantic label map of a pair layout.
    pub const LABEL: &str = "label";

    /// Source composite slot.
    pub const SLOT_A: &str = "A";
    /// Target composite slot.
    pub const SLOT_B: &str = "B";
    /// First part of a multi-part source composite.
    pub const PART_A1: &str = "A1";
    /// Second part of a multi-part source composite.
    pub const PART_A2: &str = "A2";
    /// Third part of a multi-part source composite.
    pub const PART_A3: &str = "A3";
    /// Channel count of an RGB role.
    pub const RGB_CHANNELS: usize = 3;
}

/// Constants used by the history buffer.
pub mod pool {
    /// Probability of swapping a stored entry for the incoming one once the pool is full.
    pub const DEFAULT_REPLACE_PROBABILITY: f64 = 0.5;
    /// Pool capacity used by the cyclic variant.
    pub const DEFAULT_CYCLIC_POOL_SIZE: i64 = 50;
    /// Seed offset separating the two pools of one model.
    pub const SECOND_POOL_SEED_OFFSET: u64 = 0x5EED_B00F;
}

/// Default loss weights.
pub mod loss {
    /// Weight of the A → B → A cycle loss.
    pub const DEFAULT_LAMBDA_A: f64 = 10.0;
    /// Weight of the B → A → B cycle loss.
    pub const DEFAULT_LAMBDA_B: f64 = 10.0;
    /// Identity weight relative to the cycle weights.
    pub const DEFAULT_LAMBDA_IDENTITY: f64 = 0.5;
    /// Weight of the paired reconstruction loss.
    pub const DEFAULT_LAMBDA_L1: f64 = 100.0;
    /// Weight of each half of a discriminator objective.
    pub const DISCRIMINATOR_HALF: f64 = 0.5;
}

/// Constants used by the model orchestrator.
pub mod model {
    use crate::types::{LossName, VisualName};

    /// Fill value of the placeholder object layer used for identity inputs.
    pub const EMPTY_FILL: f64 = -1.0;
    /// Visual slots of the paired variant.
    pub const PAIRED_VISUALS: [VisualName; 4] = ["real_A1", "real_A2", "fake_B", "real_B"];
    /// Visual slots of the paired variant with a single-part source.
    pub const PAIRED_SINGLE_VISUALS: [VisualName; 3] = ["real_A", "fake_B", "real_B"];
    /// Visual slots of the cyclic variant.
    pub const CYCLIC_VISUALS: [VisualName; 8] = [
        "real_A1", "real_A2", "real_A3", "fake_B", "rec_A2", "real_B", "fake_A2", "rec_B",
    ];
    /// Visual slots of the cyclic variant when identity loss is active.
    pub const CYCLIC_IDENTITY_VISUALS: [VisualName; 10] = [
        "real_A1", "real_A2", "real_A3", "fake_B", "rec_A2", "idt_B", "real_B", "fake_A2",
        "rec_B", "idt_A",
    ];
    /// Reported losses of the paired variant.
    pub const PAIRED_LOSSES: [LossName; 4] = ["G_GAN", "G_L1", "D_real", "D_fake"];
    /// Reported losses of the cyclic variant.
    pub const CYCLIC_LOSSES: [LossName; 8] = [
        "D_A", "G_A", "cycle_A", "idt_A", "D_B", "G_B", "cycle_B", "idt_B",
    ];
}

/// Constants used by image transforms.
pub mod transform {
    /// Default edge length images are resized to before cropping.
    pub const DEFAULT_LOAD_SIZE: u32 = 286;
    /// Default crop edge length.
    pub const DEFAULT_CROP_SIZE: u32 = 256;
    /// Side lengths are rounded to a multiple of this when preprocessing is disabled.
    pub const POWER_BASE: u32 = 4;
    /// Flip is applied when the drawn value exceeds this threshold.
    pub const FLIP_THRESHOLD: f64 = 0.5;
}

/// Constants used by the loader and trainer.
pub mod training {
    /// Offset mixed into per-epoch shuffle seeds.
    pub const EPOCH_SEED_OFFSET: u64 = 0xB4C3_5EED;
    /// Default number of decoded batches kept ahead of the training thread.
    pub const DEFAULT_PREFETCH_BATCHES: usize = 2;
    /// Default learning rate.
    pub const DEFAULT_LR: f64 = 0.0002;
    /// Default Adam beta1.
    pub const DEFAULT_BETA1: f64 = 0.5;
    /// Default number of epochs at the initial learning rate.
    pub const DEFAULT_N_EPOCHS: usize = 100;
    /// Default number of epochs of linear learning-rate decay.
    pub const DEFAULT_N_EPOCHS_DECAY: usize = 100;
    /// Default iteration interval between loss reports.
    pub const DEFAULT_PRINT_FREQ: usize = 100;
    /// Failure reason emitted when a prefetch worker stops unexpectedly.
    pub const PREFETCHER_STOPPED_REASON: &str = "prefetcher stopped";
}
