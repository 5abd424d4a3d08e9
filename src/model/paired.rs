use burn::prelude::*;

use super::{TranslationModel, check_output, discriminator, generator};
use crate::errors::TrainError;
use crate::loss::{LossTerms, discriminator_loss, l1_loss, scalar};
use crate::networks::{Critic, NetworkRole, Translator};

impl<B: Backend, G: Translator<B>, D: Critic<B>> TranslationModel<B, G, D> {
    pub(super) fn forward_paired(&mut self) -> Result<(), TrainError> {
        let real_a = self.state.tensor("real_A")?;
        let reference = real_a.dims();
        let fake_b = generator(&self.networks, NetworkRole::A)?.translate(real_a);
        check_output("fake_B", &fake_b, self.options.output_nc, reference)?;
        self.state.insert("fake_B", fake_b);
        Ok(())
    }

    pub(super) fn paired_generator_terms(&mut self) -> Result<LossTerms<B>, TrainError> {
        let real_a = self.state.tensor("real_A")?;
        let real_b = self.state.tensor("real_B")?;
        let fake_b = self.state.tensor("fake_B")?;
        let critic = discriminator(&self.networks, NetworkRole::A)?;

        let fake_ab = Tensor::cat(vec![real_a, fake_b.clone()], 1);
        let mut terms = LossTerms::new();
        terms.insert("G_GAN", self.criterion.loss(critic.critique(fake_ab), true));
        terms.insert(
            "G_L1",
            l1_loss(fake_b, real_b).mul_scalar(self.options.loss.lambda_l1),
        );
        Ok(terms)
    }

    pub(super) fn paired_discriminator_loss(&mut self) -> Result<Tensor<B, 1>, TrainError> {
        let real_a = self.state.tensor("real_A")?;
        let real_b = self.state.tensor("real_B")?;
        let fake_b = self.state.tensor("fake_B")?;
        let fake_ab = self
            .fake_b_pool
            .query_batch(Tensor::cat(vec![real_a.clone(), fake_b], 1));
        let real_ab = Tensor::cat(vec![real_a, real_b], 1);

        let critic = discriminator(&self.networks, NetworkRole::A)?;
        let loss_fake = self.criterion.loss(critic.critique(fake_ab), false);
        let loss_real = self.criterion.loss(critic.critique(real_ab), true);
        self.state.losses.insert("D_fake", scalar(&loss_fake));
        self.state.losses.insert("D_real", scalar(&loss_real));
        Ok(discriminator_loss(loss_real, loss_fake))
    }
}
