//! Adversarial, reconstruction, and combined loss terms.

use burn::nn::loss::{MseLoss, Reduction};
use burn::prelude::*;
use burn::tensor::ElementConversion;
use burn::tensor::activation::log_sigmoid;
use indexmap::IndexMap;

use crate::config::GanMode;
use crate::constants::loss::DISCRIMINATOR_HALF;
use crate::types::LossName;

/// Ordered loss name → scalar value map.
pub type LossValues = IndexMap<LossName, f64>;

/// Adversarial criterion comparing discriminator scores against a real/fake target.
#[derive(Clone, Copy, Debug, Default)]
pub struct GanCriterion {
    mode: GanMode,
}

impl GanCriterion {
    /// Criterion for `mode`.
    pub fn new(mode: GanMode) -> Self {
        Self { mode }
    }

    /// Configured mode.
    pub fn mode(&self) -> GanMode {
        self.mode
    }

    /// Mean loss of `prediction` against an all-real (`1`) or all-fake (`0`) target.
    pub fn loss<B: Backend, const D: usize>(
        &self,
        prediction: Tensor<B, D>,
        target_is_real: bool,
    ) -> Tensor<B, 1> {
        match self.mode {
            GanMode::LeastSquares => {
                let target = if target_is_real {
                    prediction.ones_like()
                } else {
                    prediction.zeros_like()
                };
                MseLoss::new().forward(prediction, target, Reduction::Mean)
            }
            GanMode::Vanilla => {
                let logits = if target_is_real {
                    prediction
                } else {
                    prediction.neg()
                };
                log_sigmoid(logits).mean().neg()
            }
        }
    }
}

/// Mean absolute error.
pub fn l1_loss<B: Backend, const D: usize>(
    prediction: Tensor<B, D>,
    target: Tensor<B, D>,
) -> Tensor<B, 1> {
    prediction.sub(target).abs().mean()
}

/// `½ · (real term + fake term)`.
pub fn discriminator_loss<B: Backend>(real: Tensor<B, 1>, fake: Tensor<B, 1>) -> Tensor<B, 1> {
    real.add(fake).mul_scalar(DISCRIMINATOR_HALF)
}

/// Scalar value of a one-element loss tensor.
pub fn scalar<B: Backend>(loss: &Tensor<B, 1>) -> f64 {
    loss.clone().into_scalar().elem::<f64>()
}

/// Named loss terms of one objective.
///
/// Skipped terms keep their name and report `0.0`, so the reported map always
/// lists the same names in the same order.
#[derive(Clone, Debug)]
pub struct LossTerms<B: Backend> {
    terms: IndexMap<LossName, Option<Tensor<B, 1>>>,
}

impl<B: Backend> Default for LossTerms<B> {
    fn default() -> Self {
        Self {
            terms: IndexMap::new(),
        }
    }
}

impl<B: Backend> LossTerms<B> {
    /// Empty term set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an active term.
    pub fn insert(&mut self, name: LossName, value: Tensor<B, 1>) {
        self.terms.insert(name, Some(value));
    }

    /// Record a term that was not computed.
    pub fn skip(&mut self, name: LossName) {
        self.terms.insert(name, None);
    }

    /// Active term `name`.
    pub fn get(&self, name: &str) -> Option<&Tensor<B, 1>> {
        self.terms.get(name).and_then(Option::as_ref)
    }

    /// True when `name` was recorded but skipped.
    pub fn is_skipped(&self, name: &str) -> bool {
        matches!(self.terms.get(name), Some(None))
    }

    /// Sum of the active terms, `None` when nothing is active.
    pub fn total(&self) -> Option<Tensor<B, 1>> {
        self.terms
            .values()
            .flatten()
            .cloned()
            .reduce(|acc, term| acc.add(term))
    }

    /// Scalar value per recorded name; skipped terms read as `0.0`.
    pub fn values(&self) -> LossValues {
        self.terms
            .iter()
            .map(|(name, term)| (*name, term.as_ref().map(scalar).unwrap_or(0.0)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn close(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-5
    }

    #[test]
    fn least_squares_targets_one_and_zero() {
        let device = Default::default();
        let criterion = GanCriterion::new(GanMode::LeastSquares);
        let pred = Tensor::<TestBackend, 4>::full([1, 1, 2, 2], 0.5, &device);
        assert!(close(scalar(&criterion.loss(pred.clone(), true)), 0.25));
        assert!(close(scalar(&criterion.loss(pred, false)), 0.25));
        let perfect = Tensor::<TestBackend, 4>::ones([1, 1, 2, 2], &device);
        assert!(close(scalar(&criterion.loss(perfect, true)), 0.0));
    }

    #[test]
    fn vanilla_matches_binary_cross_entropy() {
        let device = Default::default();
        let criterion = GanCriterion::new(GanMode::Vanilla);
        let zero = Tensor::<TestBackend, 2>::zeros([1, 4], &device);
        let ln2 = std::f64::consts::LN_2;
        assert!(close(scalar(&criterion.loss(zero.clone(), true)), ln2));
        assert!(close(scalar(&criterion.loss(zero, false)), ln2));
        let confident = Tensor::<TestBackend, 2>::full([1, 4], 20.0, &device);
        assert!(scalar(&criterion.loss(confident.clone(), true)) < 1e-6);
        assert!(scalar(&criterion.loss(confident, false)) > 19.0);
    }

    #[test]
    fn l1_is_mean_absolute_error() {
        let device = Default::default();
        let left = Tensor::<TestBackend, 1>::from_floats([1.0, -1.0, 0.0, 2.0], &device);
        let right = Tensor::<TestBackend, 1>::zeros([4], &device);
        assert!(close(scalar(&l1_loss(left, right)), 1.0));
    }

    #[test]
    fn skipped_terms_report_zero_and_stay_out_of_total() {
        let device = Default::default();
        let mut terms = LossTerms::<TestBackend>::new();
        terms.insert("G_A", Tensor::from_floats([1.5], &device));
        terms.skip("idt_A");
        terms.insert("cycle_A", Tensor::from_floats([2.0], &device));
        assert!(close(scalar(&terms.total().unwrap()), 3.5));
        let values = terms.values();
        assert_eq!(values.keys().copied().collect::<Vec<_>>(), vec!["G_A", "idt_A", "cycle_A"]);
        assert_eq!(values["idt_A"], 0.0);
        assert!(terms.is_skipped("idt_A"));
        assert!(LossTerms::<TestBackend>::new().total().is_none());
    }

    #[test]
    fn discriminator_loss_halves_the_sum() {
        let device = Default::default();
        let real = Tensor::<TestBackend, 1>::from_floats([0.4], &device);
        let fake = Tensor::<TestBackend, 1>::from_floats([0.6], &device);
        assert!(close(scalar(&discriminator_loss(real, fake)), 0.5));
    }
}
