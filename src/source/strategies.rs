//! File enumeration for the two on-disk dataset layouts.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::config::DatasetLimit;
use crate::constants::dataset::{GROUP_ROLE_SEPARATOR, PAIR_IMAGES_DIR};
use crate::errors::TrainError;
use crate::source::utilities::grouping::{
    GroupSpan, clip_spans, ensure_aligned, per_group_limit,
};
use crate::transport::ImageDirectory;
use crate::types::{GroupId, RoleName};

/// Index-aligned per-role path lists produced by an enumeration strategy.
#[derive(Clone, Debug, Default)]
pub struct Enumeration {
    /// Sorted paths per role; every list has the same length.
    pub role_paths: IndexMap<RoleName, Vec<PathBuf>>,
    /// Index ranges contributed by each group.
    pub groups: Vec<GroupSpan>,
}

impl Enumeration {
    /// Common per-role count.
    pub fn len(&self) -> usize {
        self.role_paths.values().next().map(Vec::len).unwrap_or(0)
    }

    /// True when no sample was enumerated.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn truncate(&mut self, limit: &DatasetLimit) {
        let len = limit.apply(self.len());
        for paths in self.role_paths.values_mut() {
            paths.truncate(len);
        }
        clip_spans(&mut self.groups, len);
    }
}

/// `{dataroot}/images/{phase}/{class[0]}/{class}`.
pub fn pair_directory(dataroot: &Path, phase: &str, dataset_class: &str) -> PathBuf {
    let initial: String = dataset_class.chars().take(1).collect();
    dataroot
        .join(PAIR_IMAGES_DIR)
        .join(phase)
        .join(initial)
        .join(dataset_class)
}

/// `{dataroot}/{phase}/{group}/{group}_{role}`.
pub fn group_role_directory(dataroot: &Path, phase: &str, group: &str, role: &str) -> PathBuf {
    dataroot
        .join(phase)
        .join(group)
        .join(format!("{group}{GROUP_ROLE_SEPARATOR}{role}"))
}

/// List one directory and partition its images into roles by filename suffix.
///
/// Lists are paired by position after sorting; counts must match before the
/// global cap truncates them.
pub fn enumerate_pair(
    dataroot: &Path,
    phase: &str,
    dataset_class: &str,
    suffixes: &IndexMap<RoleName, String>,
    limit: &DatasetLimit,
) -> Result<Enumeration, TrainError> {
    let directory = ImageDirectory::new(pair_directory(dataroot, phase, dataset_class));
    let images = directory.list_images()?;
    let mut role_paths = IndexMap::new();
    let mut counts = IndexMap::new();
    for (role, suffix) in suffixes {
        let paths: Vec<PathBuf> = images
            .iter()
            .filter(|path| crate::transport::has_suffix(path, suffix))
            .cloned()
            .collect();
        debug!(
            role = role.as_str(),
            suffix = suffix.as_str(),
            count = paths.len(),
            "pair role enumerated"
        );
        counts.insert(role.clone(), paths.len());
        role_paths.insert(role.clone(), paths);
    }
    let len = ensure_aligned(&counts)?;
    let mut enumeration = Enumeration {
        role_paths,
        groups: vec![GroupSpan {
            group: dataset_class.to_string(),
            start: 0,
            len,
        }],
    };
    enumeration.truncate(limit);
    Ok(enumeration)
}

/// Enumerate every role inside every group directory.
///
/// Each group contributes at most `floor(max / group_count)` samples per role.
/// Only the concatenated totals must align; a group whose roles disagree is
/// logged and its span follows the first role's count.
pub fn enumerate_grouped(
    dataroot: &Path,
    phase: &str,
    groups: &[GroupId],
    roles: &[RoleName],
    limit: &DatasetLimit,
) -> Result<Enumeration, TrainError> {
    let share = per_group_limit(limit, groups.len());
    let mut role_paths: IndexMap<RoleName, Vec<PathBuf>> = roles
        .iter()
        .map(|role| (role.clone(), Vec::new()))
        .collect();
    let mut spans = Vec::with_capacity(groups.len());
    let mut start = 0;
    for group in groups {
        let mut counts = IndexMap::new();
        let mut group_paths = Vec::with_capacity(roles.len());
        for role in roles {
            let directory = ImageDirectory::new(group_role_directory(dataroot, phase, group, role));
            let mut paths = directory.list_images()?;
            if let Some(share) = share {
                paths.truncate(share);
            }
            counts.insert(format!("{group}/{role}"), paths.len());
            group_paths.push(paths);
        }
        let len = counts.values().next().copied().unwrap_or(0);
        if counts.values().any(|count| *count != len) {
            warn!(
                group = group.as_str(),
                counts = ?counts,
                "group roles have differing sample counts"
            );
        }
        if len == 0 {
            warn!(group = group.as_str(), "group contributes no samples");
        }
        for (role, paths) in roles.iter().zip(group_paths) {
            if let Some(entry) = role_paths.get_mut(role) {
                entry.extend(paths);
            }
        }
        spans.push(GroupSpan {
            group: group.clone(),
            start,
            len,
        });
        start += len;
    }
    let counts: IndexMap<RoleName, usize> = role_paths
        .iter()
        .map(|(role, paths)| (role.clone(), paths.len()))
        .collect();
    ensure_aligned(&counts)?;
    let mut enumeration = Enumeration {
        role_paths,
        groups: spans,
    };
    enumeration.truncate(limit);
    Ok(enumeration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn fill(root: &Path, group: &str, role: &str, count: usize) {
        for idx in 0..count {
            touch(&group_role_directory(root, "train", group, role).join(format!("{idx}.png")));
        }
    }

    #[test]
    fn directory_conventions() {
        let root = Path::new("data");
        assert_eq!(
            pair_directory(root, "train", "bathroom"),
            Path::new("data/images/train/b/bathroom")
        );
        assert_eq!(
            group_role_directory(root, "train", "cola", "object"),
            Path::new("data/train/cola/cola_object")
        );
    }

    #[test]
    fn pair_enumeration_partitions_by_suffix() {
        let temp = tempdir().unwrap();
        let dir = pair_directory(temp.path(), "train", "kitchen");
        for stem in ["k1", "k2", "k3"] {
            touch(&dir.join(format!("{stem}.jpg")));
            touch(&dir.join(format!("{stem}_seg.png")));
        }
        let suffixes: IndexMap<RoleName, String> = [
            ("image".to_string(), ".jpg".to_string()),
            ("label".to_string(), "_seg.png".to_string()),
        ]
        .into_iter()
        .collect();
        let enumeration =
            enumerate_pair(temp.path(), "train", "kitchen", &suffixes, &DatasetLimit::Max(2))
                .unwrap();
        assert_eq!(enumeration.len(), 2);
        assert!(enumeration.role_paths["label"][1].ends_with("k2_seg.png"));
        assert_eq!(enumeration.groups[0].len, 2);
    }

    #[test]
    fn grouped_enumeration_accepts_uneven_groups_with_equal_totals() {
        let temp = tempdir().unwrap();
        let roles = vec!["object".to_string(), "image".to_string()];
        let groups = vec!["cola".to_string(), "tea".to_string()];
        fill(temp.path(), "cola", "object", 3);
        fill(temp.path(), "cola", "image", 2);
        fill(temp.path(), "tea", "object", 2);
        fill(temp.path(), "tea", "image", 3);
        let enumeration =
            enumerate_grouped(temp.path(), "train", &groups, &roles, &DatasetLimit::Unlimited)
                .unwrap();
        assert_eq!(enumeration.len(), 5);
        assert_eq!(enumeration.role_paths["object"].len(), 5);
        assert_eq!(enumeration.role_paths["image"].len(), 5);
        assert_eq!(enumeration.groups[0].len, 3);
        assert_eq!(enumeration.groups[1].start, 3);
        assert_eq!(enumeration.groups[1].len, 2);
    }

    #[test]
    fn grouped_enumeration_rejects_misaligned_totals() {
        let temp = tempdir().unwrap();
        let roles = vec!["object".to_string(), "image".to_string()];
        let groups = vec!["cola".to_string(), "tea".to_string()];
        fill(temp.path(), "cola", "object", 3);
        fill(temp.path(), "cola", "image", 2);
        fill(temp.path(), "tea", "object", 2);
        fill(temp.path(), "tea", "image", 2);
        let err = enumerate_grouped(temp.path(), "train", &groups, &roles, &DatasetLimit::Unlimited)
            .unwrap_err();
        assert!(matches!(err, TrainError::Alignment { .. }));
    }

    #[test]
    fn grouped_enumeration_requires_every_role_directory() {
        let temp = tempdir().unwrap();
        let roles = vec!["object".to_string(), "image".to_string()];
        let groups = vec!["milk".to_string()];
        touch(&group_role_directory(temp.path(), "train", "milk", "object").join("0.png"));
        let err = enumerate_grouped(temp.path(), "train", &groups, &roles, &DatasetLimit::Unlimited)
            .unwrap_err();
        assert!(matches!(err, TrainError::DatasetUnavailable { .. }));
    }
}
