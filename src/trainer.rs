//! Reference training loop driving the model lifecycle with `burn` optimizers.

use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::{LrPolicy, ScheduleOptions};
use crate::data::Batch;
use crate::errors::TrainError;
use crate::loader::DataLoader;
use crate::loss::LossValues;
use crate::metrics::{LossTracker, format_losses};
use crate::model::TranslationModel;
use crate::networks::{Critic, NetworkRole, Networks, Translator};

/// Averages of one finished epoch.
#[derive(Clone, Debug)]
pub struct EpochSummary {
    /// Epoch number as reported in logs (`epoch_count` based).
    pub epoch: usize,
    /// Iterations run in the epoch.
    pub iterations: usize,
    /// Learning rate used for the epoch.
    pub learning_rate: f64,
    /// Mean loss values over the epoch.
    pub losses: LossValues,
}

/// Outcome of a full training run.
#[derive(Clone, Debug)]
pub struct TrainingSummary {
    /// Epochs trained.
    pub epochs: usize,
    /// Iterations across all epochs.
    pub iterations: usize,
    /// Mean loss values of the final epoch.
    pub losses: LossValues,
    /// Wall-clock start.
    pub started_at: DateTime<Utc>,
    /// Wall-clock end.
    pub finished_at: DateTime<Utc>,
}

/// Drives `set_input → forward → backward_g → step G → backward_d → step D` per batch.
pub struct Trainer<B, G, D, OG, OD>
where
    B: AutodiffBackend,
    G: Translator<B> + AutodiffModule<B>,
    D: Critic<B> + AutodiffModule<B>,
    OG: Optimizer<G, B>,
    OD: Optimizer<D, B>,
{
    model: TranslationModel<B, G, D>,
    loader: DataLoader,
    schedule: ScheduleOptions,
    generator_optimizers: Vec<(NetworkRole, OG)>,
    discriminator_optimizers: Vec<(NetworkRole, OD)>,
    window: LossTracker,
    iterations: usize,
}

impl<B, G, D, OG, OD> Trainer<B, G, D, OG, OD>
where
    B: AutodiffBackend,
    G: Translator<B> + AutodiffModule<B>,
    D: Critic<B> + AutodiffModule<B>,
    OG: Optimizer<G, B>,
    OD: Optimizer<D, B>,
{
    /// Create a trainer with one optimizer per network role.
    pub fn new(
        model: TranslationModel<B, G, D>,
        loader: DataLoader,
        mut make_generator_optimizer: impl FnMut() -> OG,
        mut make_discriminator_optimizer: impl FnMut() -> OD,
    ) -> Self {
        let schedule = model.options().schedule.clone();
        let generator_optimizers = model
            .networks()
            .generator_roles()
            .iter()
            .map(|role| (*role, make_generator_optimizer()))
            .collect();
        let discriminator_optimizers = model
            .networks()
            .discriminator_roles()
            .iter()
            .map(|role| (*role, make_discriminator_optimizer()))
            .collect();
        Self {
            model,
            loader,
            schedule,
            generator_optimizers,
            discriminator_optimizers,
            window: LossTracker::new(),
            iterations: 0,
        }
    }

    /// Model being trained.
    pub fn model(&self) -> &TranslationModel<B, G, D> {
        &self.model
    }

    /// Iterations run so far.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Learning rate of the `epoch_index`-th epoch of this run (0-based).
    ///
    /// The linear policy keeps the initial rate for the first `n_epochs` epochs
    /// (counted from `epoch_count`) and then decays it linearly over
    /// `n_epochs_decay + 1` steps.
    pub fn learning_rate(&self, epoch_index: usize) -> f64 {
        learning_rate(&self.schedule, epoch_index)
    }

    /// Run one full iteration on `batch` and return the latest losses.
    pub fn train_iteration(&mut self, batch: Batch<B>, lr: f64) -> Result<LossValues, TrainError> {
        self.model.set_input(batch)?;
        self.model.forward()?;

        let mut gradients = self.model.backward_g()?;
        for (role, optimizer) in self.generator_optimizers.iter_mut() {
            let networks = self.model.networks_mut();
            let Some(generator) = networks.generator(*role) else {
                continue;
            };
            let params = GradientsParams::from_module::<B, G>(&mut gradients, generator);
            networks.update_generator(*role, |module| optimizer.step(lr, module, params));
        }

        for (role, optimizer) in self.discriminator_optimizers.iter_mut() {
            let gradients = self.model.backward_d(*role)?;
            let networks = self.model.networks_mut();
            let Some(discriminator) = networks.discriminator(*role) else {
                continue;
            };
            let params = GradientsParams::from_grads::<B, D>(gradients, discriminator);
            networks.update_discriminator(*role, |module| optimizer.step(lr, module, params));
        }
        Ok(self.model.losses().clone())
    }

    /// Train one epoch of the run (`epoch_index` is 0-based).
    pub fn train_epoch(&mut self, epoch_index: usize) -> Result<EpochSummary, TrainError> {
        let epoch = self.schedule.epoch_count + epoch_index;
        let lr = self.learning_rate(epoch_index);
        if epoch_index == 0 || lr != self.learning_rate(epoch_index - 1) {
            info!(epoch, learning_rate = lr, "learning rate updated");
        }
        let mut epoch_losses = LossTracker::new();
        let device = self.model.device().clone();
        let prefetcher = self.loader.prefetch(epoch as u64);
        for samples in prefetcher {
            let samples = samples?;
            let batch = Batch::collate(&samples, &device)?;
            let losses = self.train_iteration(batch, lr)?;
            epoch_losses.record(&losses);
            self.window.record(&losses);
            self.iterations += 1;
            if self.iterations % self.schedule.print_freq == 0 {
                let averages = self.window.take_averages();
                info!(
                    epoch,
                    iteration = self.iterations,
                    losses = %format_losses(&averages),
                    "training progress"
                );
            }
        }
        let summary = EpochSummary {
            epoch,
            iterations: epoch_losses.count(),
            learning_rate: lr,
            losses: epoch_losses.averages(),
        };
        debug!(
            epoch,
            iterations = summary.iterations,
            losses = %format_losses(&summary.losses),
            "epoch finished"
        );
        Ok(summary)
    }

    /// Train every epoch of the schedule.
    pub fn train(&mut self) -> Result<TrainingSummary, TrainError> {
        let started_at = Utc::now();
        let epochs = self.schedule.total_epochs();
        info!(
            epochs,
            samples = self.loader.dataset().len(),
            batch_size = self.loader.batch_size(),
            "training started"
        );
        let mut losses = LossValues::new();
        for epoch_index in 0..epochs {
            losses = self.train_epoch(epoch_index)?.losses;
        }
        let finished_at = Utc::now();
        info!(
            epochs,
            iterations = self.iterations,
            elapsed_secs = (finished_at - started_at).num_seconds(),
            "training finished"
        );
        Ok(TrainingSummary {
            epochs,
            iterations: self.iterations,
            losses,
            started_at,
            finished_at,
        })
    }

    /// Give the trained networks back.
    pub fn into_networks(self) -> Networks<G, D> {
        self.model.into_networks()
    }
}

/// Adam configuration for every network, with `beta1` taken from `schedule`.
pub fn adam_config(schedule: &ScheduleOptions) -> AdamConfig {
    AdamConfig::new().with_beta_1(schedule.beta1 as f32)
}

/// Trainer with one Adam optimizer per network, configured from the model's schedule.
pub fn adam_trainer<B, G, D>(
    model: TranslationModel<B, G, D>,
    loader: DataLoader,
) -> Trainer<B, G, D, impl Optimizer<G, B>, impl Optimizer<D, B>>
where
    B: AutodiffBackend,
    G: Translator<B> + AutodiffModule<B>,
    D: Critic<B> + AutodiffModule<B>,
{
    let config = adam_config(&model.options().schedule);
    debug!(beta1 = model.options().schedule.beta1, "adam optimizers configured");
    Trainer::new(
        model,
        loader,
        || config.init::<B, G>(),
        || config.init::<B, D>(),
    )
}

/// Learning rate of the `epoch_index`-th epoch under `schedule`.
pub fn learning_rate(schedule: &ScheduleOptions, epoch_index: usize) -> f64 {
    match schedule.lr_policy {
        LrPolicy::Constant => schedule.lr,
        LrPolicy::Linear => {
            let elapsed = (epoch_index + schedule.epoch_count).saturating_sub(schedule.n_epochs);
            let factor = 1.0 - elapsed as f64 / (schedule.n_epochs_decay + 1) as f64;
            schedule.lr * factor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(n_epochs: usize, n_epochs_decay: usize) -> ScheduleOptions {
        ScheduleOptions {
            n_epochs,
            n_epochs_decay,
            epoch_count: 1,
            lr: 0.0002,
            ..ScheduleOptions::default()
        }
    }

    #[test]
    fn linear_policy_holds_then_decays() {
        let schedule = schedule(100, 100);
        assert_eq!(learning_rate(&schedule, 0), 0.0002);
        assert_eq!(learning_rate(&schedule, 99), 0.0002);
        let decayed = learning_rate(&schedule, 100);
        assert!((decayed - 0.0002 * (1.0 - 1.0 / 101.0)).abs() < 1e-12);
        let last = learning_rate(&schedule, schedule.total_epochs() - 1);
        assert!((last - 0.0002 / 101.0).abs() < 1e-12);
    }

    #[test]
    fn constant_policy_never_changes() {
        let mut schedule = schedule(1, 1);
        schedule.lr_policy = LrPolicy::Constant;
        assert_eq!(learning_rate(&schedule, 0), learning_rate(&schedule, 50));
    }
}
