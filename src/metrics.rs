use indexmap::IndexMap;

use crate::loss::LossValues;
use crate::source::GroupSpan;
use crate::types::{GroupId, LossName};

/// Running averages of loss scalars between reports.
#[derive(Clone, Debug, Default)]
pub struct LossTracker {
    sums: IndexMap<LossName, f64>,
    count: usize,
}

impl LossTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one iteration's losses.
    pub fn record(&mut self, losses: &LossValues) {
        for (name, value) in losses {
            *self.sums.entry(*name).or_insert(0.0) += value;
        }
        self.count += 1;
    }

    /// Number of recorded iterations since the last reset.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Mean value per loss name, in first-recorded order.
    pub fn averages(&self) -> LossValues {
        if self.count == 0 {
            return LossValues::new();
        }
        self.sums
            .iter()
            .map(|(name, sum)| (*name, sum / self.count as f64))
            .collect()
    }

    /// Return the averages and start a new window.
    pub fn take_averages(&mut self) -> LossValues {
        let averages = self.averages();
        self.sums.clear();
        self.count = 0;
        averages
    }
}

/// Render losses as `name=value` pairs for log lines.
pub fn format_losses(losses: &LossValues) -> String {
    losses
        .iter()
        .map(|(name, value)| format!("{name}={value:.4}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Aggregate skew metrics for per-group sample counts.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupSkew {
    pub total: usize,
    pub groups: usize,
    pub min: usize,
    pub max: usize,
    pub mean: f64,
    pub max_share: f64,
    pub min_share: f64,
    pub ratio: f64,
    pub per_group: Vec<GroupShare>,
}

/// Per-group share of a dataset for skew inspection.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupShare {
    pub group: GroupId,
    pub count: usize,
    pub share: f64,
}

/// Compute skew metrics from the group spans of a dataset.
pub fn group_skew(spans: &[GroupSpan]) -> Option<GroupSkew> {
    let min = spans.iter().map(|span| span.len).min()?;
    let max = spans.iter().map(|span| span.len).max()?;
    let total: usize = spans.iter().map(|span| span.len).sum();
    let groups = spans.len();
    let share = |count: usize| {
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64
        }
    };
    let ratio = if min == 0 {
        f64::INFINITY
    } else {
        max as f64 / min as f64
    };
    let mut per_group: Vec<GroupShare> = spans
        .iter()
        .map(|span| GroupShare {
            group: span.group.clone(),
            count: span.len,
            share: share(span.len),
        })
        .collect();
    per_group.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.group.cmp(&b.group)));
    Some(GroupSkew {
        total,
        groups,
        min,
        max,
        mean: total as f64 / groups as f64,
        max_share: share(max),
        min_share: share(min),
        ratio,
        per_group,
    })
}
