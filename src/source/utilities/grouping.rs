//! Grouping helpers shared by enumeration strategies.
//!
//! Grouped layouts split one global sample cap evenly across groups and then
//! concatenate per-role lists in group order. These helpers keep that
//! arithmetic and the alignment check in one place.

use indexmap::IndexMap;

use crate::config::DatasetLimit;
use crate::errors::TrainError;
use crate::types::{GroupId, RoleName};

/// Contiguous index range contributed by one group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupSpan {
    /// Group identifier.
    pub group: GroupId,
    /// First dataset index belonging to the group.
    pub start: usize,
    /// Number of samples contributed by the group.
    pub len: usize,
}

impl GroupSpan {
    /// True when `index` falls inside the span.
    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.start + self.len
    }
}

/// Per-group prefix length `floor(max / group_count)` for a global cap.
///
/// Returns `None` when the cap is unlimited. `group_count == 0` is treated as `1`.
pub fn per_group_limit(limit: &DatasetLimit, group_count: usize) -> Option<usize> {
    match limit {
        DatasetLimit::Unlimited => None,
        DatasetLimit::Max(max) => Some(max / group_count.max(1)),
    }
}

/// Verify every role has the same count and return it.
///
/// The first role is the reference named in the error.
pub fn ensure_aligned(counts: &IndexMap<RoleName, usize>) -> Result<usize, TrainError> {
    let mut iter = counts.iter();
    let Some((reference, expected)) = iter.next() else {
        return Ok(0);
    };
    for (role, actual) in iter {
        if actual != expected {
            return Err(TrainError::Alignment {
                reference: reference.clone(),
                expected: *expected,
                role: role.clone(),
                actual: *actual,
            });
        }
    }
    Ok(*expected)
}

/// Clip group spans to the first `len` indices after global truncation.
pub fn clip_spans(spans: &mut Vec<GroupSpan>, len: usize) {
    for span in spans.iter_mut() {
        span.len = span.len.min(len.saturating_sub(span.start));
    }
    spans.retain(|span| span.len > 0);
}
