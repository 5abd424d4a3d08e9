use burn::prelude::*;
use indexmap::IndexMap;

use crate::errors::TrainError;
use crate::loss::{LossTerms, LossValues};
use crate::networks::NetworkRole;
use crate::types::{LossName, PathString, VisualName};

/// Position of the model inside one training iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// No batch ingested.
    Idle,
    /// A batch was ingested.
    Ingested,
    /// Generator outputs exist.
    ForwardComputed,
    /// Generator losses exist.
    LossesComputed,
    /// The generator objective was backpropagated.
    BackwardApplied,
}

impl Stage {
    /// Name used in lifecycle errors and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Ingested => "ingested",
            Stage::ForwardComputed => "forward-computed",
            Stage::LossesComputed => "losses-computed",
            Stage::BackwardApplied => "backward-applied",
        }
    }

    pub(crate) fn require(
        &self,
        operation: &'static str,
        allowed: &[Stage],
        expected: &'static str,
    ) -> Result<(), TrainError> {
        if allowed.contains(self) {
            Ok(())
        } else {
            Err(TrainError::Lifecycle {
                operation,
                expected,
                actual: self.as_str(),
            })
        }
    }
}

/// Live tensors and loss values of the current iteration.
///
/// Overwritten every iteration and never persisted.
#[derive(Debug)]
pub struct ModelState<B: Backend> {
    pub(crate) tensors: IndexMap<VisualName, Tensor<B, 4>>,
    pub(crate) generator_terms: Option<LossTerms<B>>,
    pub(crate) scored: Vec<NetworkRole>,
    pub(crate) losses: LossValues,
    pub(crate) source_paths: Vec<Vec<PathString>>,
}

impl<B: Backend> ModelState<B> {
    pub(crate) fn new(loss_names: &[LossName]) -> Self {
        Self {
            tensors: IndexMap::new(),
            generator_terms: None,
            scored: Vec::new(),
            losses: loss_names.iter().map(|name| (*name, 0.0)).collect(),
            source_paths: Vec::new(),
        }
    }

    /// Drop the tensors of the previous iteration; reported losses keep their last values.
    pub(crate) fn clear_iteration(&mut self) {
        self.tensors.clear();
        self.generator_terms = None;
        self.scored.clear();
    }

    pub(crate) fn insert(&mut self, name: VisualName, tensor: Tensor<B, 4>) {
        self.tensors.insert(name, tensor);
    }

    pub(crate) fn tensor(&self, name: &str) -> Result<Tensor<B, 4>, TrainError> {
        self.tensors.get(name).cloned().ok_or_else(|| {
            TrainError::Configuration(format!("tensor '{name}' was not computed this iteration"))
        })
    }

    pub(crate) fn record_losses(&mut self, values: LossValues) {
        for (name, value) in values {
            self.losses.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_reports_operation_and_stages() {
        let err = Stage::Idle
            .require("forward", &[Stage::Ingested], "ingested")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'forward'"));
        assert!(message.contains("idle"));
        assert!(Stage::Ingested
            .require("forward", &[Stage::Ingested], "ingested")
            .is_ok());
    }
}
