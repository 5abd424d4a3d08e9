use std::path::PathBuf;

use burn::prelude::*;
use burn::tensor::TensorData;
use indexmap::IndexMap;

use crate::constants::roles::{SLOT_A, SLOT_B};
use crate::errors::TrainError;
use crate::types::{PathString, RoleName, SlotName};

/// One decoded, transformed role tensor of shape `[channels, height, width]`.
#[derive(Clone, Debug)]
pub struct RoleSample {
    /// Normalized pixel values in `[-1, 1]`.
    pub data: TensorData,
    /// File the tensor was decoded from.
    pub path: PathBuf,
}

impl RoleSample {
    /// `[channels, height, width]` of the tensor.
    pub fn shape(&self) -> &[usize] {
        &self.data.shape
    }

    /// Spatial `[height, width]` of the tensor.
    pub fn spatial(&self) -> &[usize] {
        spatial_dims(&self.data.shape)
    }
}

/// Index-aligned record holding one tensor per declared role.
#[derive(Clone, Debug)]
pub struct SampleRecord {
    /// Dataset index the record was built from.
    pub index: usize,
    /// Role tensors in role-layout order.
    pub roles: IndexMap<RoleName, RoleSample>,
}

impl SampleRecord {
    /// Look up a role, failing with a configuration error when it was not decoded.
    pub fn role(&self, role: &str) -> Result<&RoleSample, TrainError> {
        self.roles.get(role).ok_or_else(|| {
            TrainError::Configuration(format!(
                "record {} has no role '{role}'",
                self.index
            ))
        })
    }
}

/// Fully-owned composite sample, ready to cross thread boundaries and be collated.
#[derive(Clone, Debug)]
pub struct CompositeSample {
    /// Dataset index.
    pub index: usize,
    /// Composite tensor per slot (`A`, `B`), channels concatenated in layout order.
    pub slots: IndexMap<SlotName, TensorData>,
    /// Provenance paths per slot, one per concatenated part.
    pub paths: IndexMap<SlotName, Vec<PathString>>,
}

impl CompositeSample {
    /// Composite tensor of `slot`.
    pub fn slot(&self, slot: &str) -> Result<&TensorData, TrainError> {
        self.slots.get(slot).ok_or_else(|| {
            TrainError::Configuration(format!("sample {} has no slot '{slot}'", self.index))
        })
    }

    /// Provenance paths of `slot`.
    pub fn slot_paths(&self, slot: &str) -> &[PathString] {
        self.paths.get(slot).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Collated batch of `[N, C, H, W]` tensors for the source and target slots.
#[derive(Clone, Debug)]
pub struct Batch<B: Backend> {
    /// Slot `A` composites.
    pub a: Tensor<B, 4>,
    /// Slot `B` composites.
    pub b: Tensor<B, 4>,
    /// Slot `A` provenance, one entry per batch element.
    pub a_paths: Vec<Vec<PathString>>,
    /// Slot `B` provenance, one entry per batch element.
    pub b_paths: Vec<Vec<PathString>>,
}

impl<B: Backend> Batch<B> {
    /// Stack samples into device tensors. Every sample must share each slot's shape.
    pub fn collate(samples: &[CompositeSample], device: &B::Device) -> Result<Self, TrainError> {
        if samples.is_empty() {
            return Err(TrainError::Configuration(
                "cannot collate an empty batch".to_string(),
            ));
        }
        Ok(Self {
            a: stack_slot(samples, SLOT_A, device)?,
            b: stack_slot(samples, SLOT_B, device)?,
            a_paths: samples
                .iter()
                .map(|sample| sample.slot_paths(SLOT_A).to_vec())
                .collect(),
            b_paths: samples
                .iter()
                .map(|sample| sample.slot_paths(SLOT_B).to_vec())
                .collect(),
        })
    }

    /// Move both tensors to `device`.
    pub fn to_device(self, device: &B::Device) -> Self {
        Self {
            a: self.a.to_device(device),
            b: self.b.to_device(device),
            a_paths: self.a_paths,
            b_paths: self.b_paths,
        }
    }

    /// Number of batch elements.
    pub fn len(&self) -> usize {
        self.a.dims()[0]
    }

    /// True when the batch holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn stack_slot<B: Backend>(
    samples: &[CompositeSample],
    slot: &str,
    device: &B::Device,
) -> Result<Tensor<B, 4>, TrainError> {
    let expected = samples[0].slot(slot)?.shape.clone();
    let mut tensors = Vec::with_capacity(samples.len());
    for sample in samples {
        let data = sample.slot(slot)?;
        if data.shape != expected {
            return Err(TrainError::Shape {
                name: format!("{slot} (sample {})", sample.index),
                expected,
                actual: data.shape.clone(),
            });
        }
        tensors.push(Tensor::<B, 3>::from_data(data.clone(), device));
    }
    Ok(Tensor::stack::<4>(tensors, 0))
}

pub(crate) fn spatial_dims(shape: &[usize]) -> &[usize] {
    &shape[shape.len().saturating_sub(2)..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn sample(index: usize, a_channels: usize, side: usize) -> CompositeSample {
        let mut slots = IndexMap::new();
        slots.insert(
            SLOT_A.to_string(),
            TensorData::new(vec![index as f32; a_channels * side * side], [a_channels, side, side]),
        );
        slots.insert(
            SLOT_B.to_string(),
            TensorData::new(vec![-(index as f32); 3 * side * side], [3, side, side]),
        );
        let mut paths = IndexMap::new();
        paths.insert(SLOT_A.to_string(), vec![format!("a/{index}.png")]);
        paths.insert(SLOT_B.to_string(), vec![format!("b/{index}.png")]);
        CompositeSample {
            index,
            slots,
            paths,
        }
    }

    #[test]
    fn collate_stacks_samples_in_order() {
        let device = Default::default();
        let batch =
            Batch::<TestBackend>::collate(&[sample(1, 6, 2), sample(2, 6, 2)], &device).unwrap();
        assert_eq!(batch.a.dims(), [2, 6, 2, 2]);
        assert_eq!(batch.b.dims(), [2, 3, 2, 2]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.a_paths[1], vec!["a/2.png".to_string()]);
        let values = batch.a.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values[0], 1.0);
        assert_eq!(values[values.len() - 1], 2.0);
    }

    #[test]
    fn collate_rejects_mixed_shapes() {
        let device = Default::default();
        let err = Batch::<TestBackend>::collate(&[sample(0, 6, 2), sample(1, 6, 4)], &device)
            .unwrap_err();
        assert!(matches!(err, TrainError::Shape { .. }));
    }

    #[test]
    fn collate_rejects_empty_batches() {
        let device = Default::default();
        assert!(Batch::<TestBackend>::collate(&[], &device).is_err());
    }
}
