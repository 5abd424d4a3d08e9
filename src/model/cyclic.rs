use burn::prelude::*;

use super::{TranslationModel, check_output, discriminator, generator};
use crate::errors::TrainError;
use crate::loss::{LossTerms, discriminator_loss, l1_loss, scalar};
use crate::networks::{Critic, NetworkRole, Translator};

impl<B: Backend, G: Translator<B>, D: Critic<B>> TranslationModel<B, G, D> {
    pub(super) fn forward_cyclic(&mut self) -> Result<(), TrainError> {
        let real_a = self.state.tensor("real_A")?;
        let real_a1 = self.state.tensor("real_A1")?;
        let real_a3 = self.state.tensor("real_A3")?;
        let real_b = self.state.tensor("real_B")?;
        let reference = real_a.dims();
        let output_nc = self.options.output_nc;
        let input2_nc = self.options.effective_input2_nc();

        let g_a = generator(&self.networks, NetworkRole::A)?;
        let g_b = generator(&self.networks, NetworkRole::B)?;

        let fake_b = g_a.translate(real_a);
        check_output("fake_B", &fake_b, output_nc, reference)?;
        let rec_a2 = g_b.translate(fake_b.clone());
        check_output("rec_A2", &rec_a2, input2_nc, reference)?;
        let fake_a2 = g_b.translate(real_b);
        check_output("fake_A2", &fake_a2, input2_nc, reference)?;
        let fake_a = Tensor::cat(vec![real_a1, fake_a2.clone(), real_a3], 1);
        let rec_b = g_a.translate(fake_a.clone());
        check_output("rec_B", &rec_b, output_nc, reference)?;

        self.state.insert("fake_B", fake_b);
        self.state.insert("rec_A2", rec_a2);
        self.state.insert("fake_A2", fake_a2);
        self.state.insert("fake_A", fake_a);
        self.state.insert("rec_B", rec_b);
        Ok(())
    }

    pub(super) fn cyclic_generator_terms(&mut self) -> Result<LossTerms<B>, TrainError> {
        let lambda_a = self.options.loss.lambda_a;
        let lambda_b = self.options.loss.lambda_b;
        let lambda_idt = self.options.loss.lambda_identity;
        let real_a2 = self.state.tensor("real_A2")?;
        let real_b = self.state.tensor("real_B")?;
        let fake_b = self.state.tensor("fake_B")?;
        let fake_a2 = self.state.tensor("fake_A2")?;
        let rec_a2 = self.state.tensor("rec_A2")?;
        let rec_b = self.state.tensor("rec_B")?;
        let reference = real_b.dims();

        let g_a = generator(&self.networks, NetworkRole::A)?;
        let g_b = generator(&self.networks, NetworkRole::B)?;
        let d_a = discriminator(&self.networks, NetworkRole::A)?;
        let d_b = discriminator(&self.networks, NetworkRole::B)?;

        let mut terms = LossTerms::new();
        let mut identity = None;
        if lambda_idt > 0.0 {
            let empty = self.state.tensor("empty")?;
            let idt_a = g_a.translate(Tensor::cat(vec![empty, real_b.clone(), real_b.clone()], 1));
            check_output("idt_A", &idt_a, self.options.output_nc, reference)?;
            let idt_b = g_b.translate(real_a2.clone());
            check_output("idt_B", &idt_b, self.options.effective_input2_nc(), reference)?;
            terms.insert(
                "idt_A",
                l1_loss(idt_a.clone(), real_b.clone()).mul_scalar(lambda_b * lambda_idt),
            );
            terms.insert(
                "idt_B",
                l1_loss(idt_b.clone(), real_a2.clone()).mul_scalar(lambda_a * lambda_idt),
            );
            identity = Some((idt_a, idt_b));
        } else {
            terms.skip("idt_A");
            terms.skip("idt_B");
        }

        terms.insert("G_A", self.criterion.loss(d_a.critique(fake_b), true));
        terms.insert("G_B", self.criterion.loss(d_b.critique(fake_a2), true));
        terms.insert("cycle_A", l1_loss(rec_a2, real_a2).mul_scalar(lambda_a));
        terms.insert("cycle_B", l1_loss(rec_b, real_b).mul_scalar(lambda_b));

        if let Some((idt_a, idt_b)) = identity {
            self.state.insert("idt_A", idt_a);
            self.state.insert("idt_B", idt_b);
        }
        Ok(terms)
    }

    pub(super) fn cyclic_discriminator_loss(
        &mut self,
        role: NetworkRole,
    ) -> Result<Tensor<B, 1>, TrainError> {
        let (real, fake, name) = match role {
            NetworkRole::A => {
                let fake = self.state.tensor("fake_B")?;
                (self.state.tensor("real_B")?, self.fake_b_pool.query_batch(fake), "D_A")
            }
            NetworkRole::B => {
                let fake = self.state.tensor("fake_A2")?;
                (self.state.tensor("real_A2")?, self.fake_a_pool.query_batch(fake), "D_B")
            }
        };
        let critic = discriminator(&self.networks, role)?;
        let loss_real = self.criterion.loss(critic.critique(real), true);
        let loss_fake = self.criterion.loss(critic.critique(fake), false);
        let loss = discriminator_loss(loss_real, loss_fake);
        self.state.losses.insert(name, scalar(&loss));
        Ok(loss)
    }
}
