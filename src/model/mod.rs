//! Training orchestrator for the paired and cyclic translation variants.
//!
//! One iteration is strictly sequential:
//! `set_input → forward → generator_losses → (backward) → discriminator_loss per role`.
//! Calls made out of that order fail with `TrainError::Lifecycle` and leave the
//! model untouched.

use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use tracing::{debug, info};

use crate::assembly::{CompositeLayout, masked_recombine};
use crate::config::{Direction, ModelVariant, PoolOptions, TrainOptions};
use crate::constants::model::{
    CYCLIC_IDENTITY_VISUALS, CYCLIC_LOSSES, CYCLIC_VISUALS, EMPTY_FILL, PAIRED_LOSSES,
    PAIRED_SINGLE_VISUALS, PAIRED_VISUALS,
};
use crate::constants::pool::SECOND_POOL_SEED_OFFSET;
use crate::data::Batch;
use crate::errors::TrainError;
use crate::loss::{GanCriterion, LossValues};
use crate::networks::{Critic, NetworkRole, Networks, Translator};
use crate::pool::ImagePool;
use crate::types::{PathString, VisualName};

mod cyclic;
mod paired;
/// Iteration stage and per-iteration tensors.
pub mod state;

pub use state::{ModelState, Stage};

/// Visual names of the source parts, by concatenation position.
const PART_VISUALS: [VisualName; 3] = ["real_A1", "real_A2", "real_A3"];

/// Orchestrates ingest, forward, and loss computation over caller-provided networks.
pub struct TranslationModel<B: Backend, G, D> {
    options: TrainOptions,
    networks: Networks<G, D>,
    source_layout: CompositeLayout,
    criterion: GanCriterion,
    fake_b_pool: ImagePool<B>,
    fake_a_pool: ImagePool<B>,
    stage: Stage,
    state: ModelState<B>,
    device: B::Device,
}

impl<B: Backend, G: Translator<B>, D: Critic<B>> TranslationModel<B, G, D> {
    /// Validate `options` against `networks` and build an idle model on `device`.
    pub fn new(
        options: &TrainOptions,
        networks: Networks<G, D>,
        device: &B::Device,
    ) -> Result<Self, TrainError> {
        options.validate()?;
        if networks.variant() != options.model {
            return Err(TrainError::Configuration(format!(
                "options describe the {:?} variant but {:?} networks were provided",
                options.model,
                networks.variant()
            )));
        }
        let source_layout = CompositeLayout::for_slot(options.source_slot()?);
        let fake_b_pool = ImagePool::new(&options.pool)?;
        let fake_a_pool = ImagePool::new(&PoolOptions {
            seed: options.pool.seed.wrapping_add(SECOND_POOL_SEED_OFFSET),
            ..options.pool.clone()
        })?;
        let loss_names: &[&'static str] = match options.model {
            ModelVariant::Paired => &PAIRED_LOSSES,
            ModelVariant::Cyclic => &CYCLIC_LOSSES,
        };
        info!(
            variant = ?options.model,
            direction = options.dataset.direction.as_str(),
            input_nc = options.input_nc,
            output_nc = options.output_nc,
            pool_size = options.pool.capacity,
            lambda_identity = options.loss.lambda_identity,
            "translation model ready"
        );
        Ok(Self {
            options: options.clone(),
            networks,
            source_layout,
            criterion: GanCriterion::new(options.loss.gan_mode),
            fake_b_pool,
            fake_a_pool,
            stage: Stage::Idle,
            state: ModelState::new(loss_names),
            device: device.clone(),
        })
    }

    /// Validated options the model was built from.
    pub fn options(&self) -> &TrainOptions {
        &self.options
    }

    /// Current iteration stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Device every ingested tensor is moved to.
    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Variant of this model.
    pub fn variant(&self) -> ModelVariant {
        self.options.model
    }

    /// True when identity terms are computed (cyclic variant with `lambda_identity > 0`).
    pub fn identity_enabled(&self) -> bool {
        self.options.model == ModelVariant::Cyclic && self.options.loss.lambda_identity > 0.0
    }

    /// Channel layout of the source composite.
    pub fn source_layout(&self) -> &CompositeLayout {
        &self.source_layout
    }

    /// Ingest one batch: swap slots for `BtoA`, check shapes, slice parts, and
    /// (cyclic) recombine the structure layer under the object mask.
    pub fn set_input(&mut self, batch: Batch<B>) -> Result<(), TrainError> {
        self.stage.require(
            "set_input",
            &[Stage::Idle, Stage::BackwardApplied],
            "idle or backward-applied",
        )?;
        let Batch {
            a,
            b,
            a_paths,
            b_paths,
        } = batch.to_device(&self.device);
        let (source, target, source_paths) = match self.options.dataset.direction {
            Direction::AtoB => (a, b, a_paths),
            Direction::BtoA => (b, a, b_paths),
        };
        let source_dims = source.dims();
        let target_dims = target.dims();
        if source_dims[1] != self.options.input_nc {
            return Err(TrainError::Shape {
                name: "real_A".to_string(),
                expected: vec![source_dims[0], self.options.input_nc, source_dims[2], source_dims[3]],
                actual: source_dims.to_vec(),
            });
        }
        let expected_target = [source_dims[0], self.options.output_nc, source_dims[2], source_dims[3]];
        if target_dims != expected_target {
            return Err(TrainError::Shape {
                name: "real_B".to_string(),
                expected: expected_target.to_vec(),
                actual: target_dims.to_vec(),
            });
        }

        let mut parts = Vec::with_capacity(self.source_layout.parts().len());
        if self.source_layout.parts().len() > 1 {
            for (part, visual) in self.source_layout.parts().iter().zip(PART_VISUALS) {
                parts.push((visual, self.source_layout.slice(&source, &part.part)?));
            }
        }
        if self.options.model == ModelVariant::Cyclic {
            let [(_, object), (_, scene), (_, structure)] = &mut parts[..] else {
                return Err(TrainError::Configuration(
                    "the cyclic variant needs a three-part source composite".to_string(),
                ));
            };
            let empty = object.ones_like().mul_scalar(EMPTY_FILL);
            *structure = masked_recombine(object.clone(), scene.clone(), structure.clone())?;
            self.state.clear_iteration();
            self.state.insert("empty", empty);
        } else {
            self.state.clear_iteration();
        }
        for (visual, tensor) in parts {
            self.state.insert(visual, tensor);
        }
        self.state.insert("real_A", source);
        self.state.insert("real_B", target);
        self.state.source_paths = source_paths;
        self.stage = Stage::Ingested;
        debug!(batch = source_dims[0], "batch ingested");
        Ok(())
    }

    /// Run the generators over the ingested batch.
    pub fn forward(&mut self) -> Result<(), TrainError> {
        self.stage
            .require("forward", &[Stage::Ingested], Stage::Ingested.as_str())?;
        match self.options.model {
            ModelVariant::Paired => self.forward_paired()?,
            ModelVariant::Cyclic => self.forward_cyclic()?,
        }
        self.stage = Stage::ForwardComputed;
        Ok(())
    }

    /// Compute every generator term and return their sum (`loss_G`).
    pub fn generator_losses(&mut self) -> Result<Tensor<B, 1>, TrainError> {
        self.stage.require(
            "generator_losses",
            &[Stage::ForwardComputed],
            Stage::ForwardComputed.as_str(),
        )?;
        let terms = match self.options.model {
            ModelVariant::Paired => self.paired_generator_terms()?,
            ModelVariant::Cyclic => self.cyclic_generator_terms()?,
        };
        let total = terms.total().ok_or_else(|| {
            TrainError::Configuration("the generator objective has no active terms".to_string())
        })?;
        self.state.record_losses(terms.values());
        self.state.generator_terms = Some(terms);
        self.stage = Stage::LossesComputed;
        Ok(total)
    }

    /// Discriminator objective of `role`: `½ · (GAN(D(real), real) + GAN(D(pool(fake)), fake))`.
    ///
    /// Each discriminator is scored at most once per iteration.
    pub fn discriminator_loss(&mut self, role: NetworkRole) -> Result<Tensor<B, 1>, TrainError> {
        self.stage.require(
            "discriminator_loss",
            &[Stage::LossesComputed, Stage::BackwardApplied],
            "losses-computed or backward-applied",
        )?;
        if !self.networks.discriminator_roles().contains(&role) {
            return Err(TrainError::Configuration(format!(
                "the {:?} variant has no discriminator {}",
                self.options.model,
                role.as_str()
            )));
        }
        if self.state.scored.contains(&role) {
            return Err(TrainError::Lifecycle {
                operation: "discriminator_loss",
                expected: "one score per discriminator per iteration",
                actual: self.stage.as_str(),
            });
        }
        let loss = match self.options.model {
            ModelVariant::Paired => self.paired_discriminator_loss()?,
            ModelVariant::Cyclic => self.cyclic_discriminator_loss(role)?,
        };
        self.state.scored.push(role);
        self.finish_if_complete();
        Ok(loss)
    }

    /// Static visual names of the configured variant.
    pub fn visual_names(&self) -> &'static [VisualName] {
        match self.options.model {
            ModelVariant::Paired if self.source_layout.parts().len() > 1 => &PAIRED_VISUALS,
            ModelVariant::Paired => &PAIRED_SINGLE_VISUALS,
            ModelVariant::Cyclic if self.identity_enabled() => &CYCLIC_IDENTITY_VISUALS,
            ModelVariant::Cyclic => &CYCLIC_VISUALS,
        }
    }

    /// Current tensor `name`, if computed this iteration.
    pub fn visual(&self, name: &str) -> Option<Tensor<B, 4>> {
        self.state.tensors.get(name).cloned()
    }

    /// Latest loss scalars in reporting order.
    pub fn losses(&self) -> &LossValues {
        &self.state.losses
    }

    /// Source-slot provenance of the ingested batch.
    pub fn image_paths(&self) -> &[Vec<PathString>] {
        &self.state.source_paths
    }

    /// Networks owned by the model.
    pub fn networks(&self) -> &Networks<G, D> {
        &self.networks
    }

    /// Mutable access for optimizer updates.
    pub fn networks_mut(&mut self) -> &mut Networks<G, D> {
        &mut self.networks
    }

    /// Give the networks back to the caller.
    pub fn into_networks(self) -> Networks<G, D> {
        self.networks
    }

    /// Number of stored images per history pool (`fake_B`, `fake_A2`).
    pub fn pool_sizes(&self) -> (usize, usize) {
        (self.fake_b_pool.len(), self.fake_a_pool.len())
    }

    /// Abandon the current iteration and return to `Idle`.
    pub fn reset(&mut self) {
        self.state.clear_iteration();
        self.stage = Stage::Idle;
    }

    fn finish_if_complete(&mut self) {
        let complete = self
            .networks
            .discriminator_roles()
            .iter()
            .all(|role| self.state.scored.contains(role));
        if self.stage == Stage::BackwardApplied && complete {
            self.stage = Stage::Idle;
        }
    }
}

impl<B, G, D> TranslationModel<B, G, D>
where
    B: AutodiffBackend,
    G: Translator<B>,
    D: Critic<B>,
{
    /// Backpropagate `loss_G`, computing the generator losses first if needed.
    pub fn backward_g(&mut self) -> Result<B::Gradients, TrainError> {
        let loss = match self.stage {
            Stage::ForwardComputed => self.generator_losses()?,
            Stage::LossesComputed => self
                .state
                .generator_terms
                .as_ref()
                .and_then(|terms| terms.total())
                .ok_or_else(|| {
                    TrainError::Configuration(
                        "the generator objective has no active terms".to_string(),
                    )
                })?,
            actual => {
                return Err(TrainError::Lifecycle {
                    operation: "backward_g",
                    expected: "forward-computed or losses-computed",
                    actual: actual.as_str(),
                });
            }
        };
        let gradients = loss.backward();
        self.stage = Stage::BackwardApplied;
        self.finish_if_complete();
        Ok(gradients)
    }

    /// Score discriminator `role` and backpropagate its objective.
    pub fn backward_d(&mut self, role: NetworkRole) -> Result<B::Gradients, TrainError> {
        let loss = self.discriminator_loss(role)?;
        Ok(loss.backward())
    }
}

pub(crate) fn generator<G, D>(networks: &Networks<G, D>, role: NetworkRole) -> Result<&G, TrainError> {
    networks.generator(role).ok_or_else(|| {
        TrainError::Configuration(format!("no generator {} for this variant", role.as_str()))
    })
}

pub(crate) fn discriminator<G, D>(
    networks: &Networks<G, D>,
    role: NetworkRole,
) -> Result<&D, TrainError> {
    networks.discriminator(role).ok_or_else(|| {
        TrainError::Configuration(format!("no discriminator {} for this variant", role.as_str()))
    })
}

/// Check a generator output against `[N, channels, H, W]` of `reference`.
pub(crate) fn check_output<B: Backend>(
    name: &str,
    output: &Tensor<B, 4>,
    channels: usize,
    reference: [usize; 4],
) -> Result<(), TrainError> {
    let expected = [reference[0], channels, reference[2], reference[3]];
    let actual = output.dims();
    if actual != expected {
        return Err(TrainError::Shape {
            name: name.to_string(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}
