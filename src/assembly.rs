//! Composite assembly: channel concatenation of role tensors and masked recombination.
//!
//! Channel ranges are fixed offsets computed from the role layout, so a composite
//! can always be split back into its parts with the same offsets used to build it.

use std::ops::Range;

use burn::prelude::*;
use burn::tensor::TensorData;
use indexmap::IndexMap;

use crate::config::{RoleGroupConfig, SlotSpec};
use crate::data::{CompositeSample, SampleRecord, spatial_dims};
use crate::errors::TrainError;
use crate::types::{RoleName, SlotName};

/// Channel range of one part inside a composite.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartRange {
    /// Part identifier (`A1`, `A2`, ...).
    pub part: SlotName,
    /// Role filling the part.
    pub role: RoleName,
    /// Channel offsets inside the composite.
    pub channels: Range<usize>,
}

/// Channel offsets of every part of one slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositeLayout {
    slot: SlotName,
    parts: Vec<PartRange>,
}

impl CompositeLayout {
    /// Compute offsets for `slot` in declared concatenation order.
    pub fn for_slot(slot: &SlotSpec) -> Self {
        let mut offset = 0;
        let parts = slot
            .parts
            .iter()
            .map(|part| {
                let range = offset..offset + part.channels;
                offset = range.end;
                PartRange {
                    part: part.part.clone(),
                    role: part.role.clone(),
                    channels: range,
                }
            })
            .collect();
        Self {
            slot: slot.name.clone(),
            parts,
        }
    }

    /// Slot the layout belongs to.
    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Parts in concatenation order.
    pub fn parts(&self) -> &[PartRange] {
        &self.parts
    }

    /// Total channels of the composite.
    pub fn channels(&self) -> usize {
        self.parts.last().map(|part| part.channels.end).unwrap_or(0)
    }

    /// Channel range of `part`.
    pub fn range(&self, part: &str) -> Option<Range<usize>> {
        self.parts
            .iter()
            .find(|entry| entry.part == part)
            .map(|entry| entry.channels.clone())
    }

    /// Concatenate the record's role tensors along the channel axis.
    pub fn concat(&self, record: &SampleRecord) -> Result<TensorData, TrainError> {
        let mut values: Vec<f32> = Vec::new();
        let mut spatial: Option<Vec<usize>> = None;
        for part in &self.parts {
            let sample = record.role(&part.role)?;
            let shape = sample.shape();
            let expected_channels = part.channels.len();
            if shape.len() != 3 || shape[0] != expected_channels {
                return Err(TrainError::Shape {
                    name: part.role.clone(),
                    expected: vec![expected_channels],
                    actual: shape.to_vec(),
                });
            }
            match &spatial {
                Some(expected) if expected.as_slice() != sample.spatial() => {
                    return Err(TrainError::Shape {
                        name: part.role.clone(),
                        expected: expected.clone(),
                        actual: sample.spatial().to_vec(),
                    });
                }
                Some(_) => {}
                None => spatial = Some(sample.spatial().to_vec()),
            }
            values.extend(tensor_values(&sample.data)?);
        }
        let spatial = spatial.unwrap_or_default();
        let mut shape = vec![self.channels()];
        shape.extend(spatial);
        Ok(TensorData::new(values, shape))
    }

    /// Split a `[C, H, W]` composite back into per-part tensors.
    pub fn split(&self, composite: &TensorData) -> Result<IndexMap<SlotName, TensorData>, TrainError> {
        let shape = &composite.shape;
        if shape.len() != 3 || shape[0] != self.channels() {
            return Err(TrainError::Shape {
                name: self.slot.clone(),
                expected: vec![self.channels()],
                actual: shape.clone(),
            });
        }
        let plane = shape[1] * shape[2];
        let values = tensor_values(composite)?;
        Ok(self
            .parts
            .iter()
            .map(|part| {
                let slice = values[part.channels.start * plane..part.channels.end * plane].to_vec();
                (
                    part.part.clone(),
                    TensorData::new(slice, [part.channels.len(), shape[1], shape[2]]),
                )
            })
            .collect())
    }

    /// Narrow a `[N, C, H, W]` composite to the channels of `part`.
    pub fn slice<B: Backend>(
        &self,
        composite: &Tensor<B, 4>,
        part: &str,
    ) -> Result<Tensor<B, 4>, TrainError> {
        let range = self.range(part).ok_or_else(|| {
            TrainError::Configuration(format!("slot '{}' has no part '{part}'", self.slot))
        })?;
        let dims = composite.dims();
        if dims[1] != self.channels() {
            return Err(TrainError::Shape {
                name: self.slot.clone(),
                expected: vec![dims[0], self.channels(), dims[2], dims[3]],
                actual: dims.to_vec(),
            });
        }
        Ok(composite.clone().narrow(1, range.start, range.len()))
    }
}

/// Build every slot composite of `record` following the role layout.
pub fn assemble(record: &SampleRecord, roles: &RoleGroupConfig) -> Result<CompositeSample, TrainError> {
    let mut slots = IndexMap::new();
    let mut paths = IndexMap::new();
    for slot in &roles.slots {
        let layout = CompositeLayout::for_slot(slot);
        slots.insert(slot.name.clone(), layout.concat(record)?);
        let mut slot_paths = Vec::with_capacity(slot.parts.len());
        for part in &slot.parts {
            slot_paths.push(record.role(&part.role)?.path.display().to_string());
        }
        paths.insert(slot.name.clone(), slot_paths);
    }
    Ok(CompositeSample {
        index: record.index,
        slots,
        paths,
    })
}

/// Select `structure` where the object is present and `scene` elsewhere.
///
/// The object is present at a pixel when its maximum over channels is above zero.
/// `scene` and `structure` must share one shape; `object` must match their batch
/// and spatial dimensions.
pub fn masked_recombine<B: Backend>(
    object: Tensor<B, 4>,
    scene: Tensor<B, 4>,
    structure: Tensor<B, 4>,
) -> Result<Tensor<B, 4>, TrainError> {
    let scene_dims = scene.dims();
    let structure_dims = structure.dims();
    if scene_dims != structure_dims {
        return Err(TrainError::Shape {
            name: "structure".to_string(),
            expected: scene_dims.to_vec(),
            actual: structure_dims.to_vec(),
        });
    }
    let object_dims = object.dims();
    if object_dims[0] != scene_dims[0] || spatial_dims(&object_dims) != spatial_dims(&scene_dims) {
        return Err(TrainError::Shape {
            name: "object".to_string(),
            expected: vec![scene_dims[0], object_dims[1], scene_dims[2], scene_dims[3]],
            actual: object_dims.to_vec(),
        });
    }
    let mask = object.max_dim(1).greater_elem(0.0);
    let mask = Tensor::cat(vec![mask; scene_dims[1]], 1);
    Ok(scene.mask_where(mask, structure))
}

fn tensor_values(data: &TensorData) -> Result<Vec<f32>, TrainError> {
    data.to_vec::<f32>()
        .map_err(|err| TrainError::TensorData(format!("{err:?}")))
}
