use crate::merge::status_of;
use crate::{MergeError, MismatchKind};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use vega_bundle::{
    shard_id_for_result, sorted_range_ids, Bundle, FileStatus, Id, IdAllocator,
};

/// A complete range-id remapping for one patch bundle.
///
/// Computed from read-only borrows of both bundles so every fatal validation
/// runs before anything is mutated, then applied to the patch in one pass.
#[derive(Debug, Default)]
pub(crate) struct RangeRemapPlan {
    /// Patch range id → id the merged range will use.
    renames: BTreeMap<Id, Id>,
}

impl RangeRemapPlan {
    /// Plans the remapping for every path present in the patch.
    ///
    /// Unchanged paths must carry the same physical range set as the base:
    /// their patch ids map pairwise, in position order, onto the base ids.
    /// Any disagreement in count or position is a data-integrity error — the
    /// indexer is assumed deterministic for unchanged content — and aborts
    /// the merge. All other paths mint fresh ids.
    pub(crate) fn compute(
        base: &Bundle,
        patch: &Bundle,
        file_status: &BTreeMap<String, FileStatus>,
        alloc: &mut impl IdAllocator,
    ) -> Result<Self, MergeError> {
        let mut renames = BTreeMap::new();
        let no_ranges = BTreeMap::new();

        for (path, patch_doc) in &patch.documents {
            if status_of(file_status, path) == FileStatus::Unchanged {
                let base_ranges = base
                    .documents
                    .get(path)
                    .map(|doc| &doc.ranges)
                    .unwrap_or(&no_ranges);

                let base_ids = sorted_range_ids(base_ranges);
                let patch_ids = sorted_range_ids(&patch_doc.ranges);
                if base_ids.len() != patch_ids.len() {
                    return Err(MergeError::UnchangedPathMismatch {
                        path: path.clone(),
                        kind: MismatchKind::RangeCount {
                            base: base_ids.len(),
                            patch: patch_ids.len(),
                        },
                    });
                }

                for (index, (base_id, patch_id)) in base_ids.iter().zip(&patch_ids).enumerate() {
                    let base_range = &base_ranges[base_id];
                    let patch_range = &patch_doc.ranges[patch_id];
                    if base_range.position_cmp(patch_range) != Ordering::Equal {
                        return Err(MergeError::UnchangedPathMismatch {
                            path: path.clone(),
                            kind: MismatchKind::RangePosition { index },
                        });
                    }
                    renames.insert(patch_id.clone(), base_id.clone());
                }
            } else {
                for patch_id in patch_doc.ranges.keys() {
                    renames.insert(patch_id.clone(), alloc.fresh()?);
                }
            }
        }

        Ok(Self { renames })
    }

    /// Relabels every patch document's range table and rewrites range ids in
    /// the patch's own shard location lists for every result touched by a
    /// relabeled range. Shard-local document ids are left alone; they are
    /// remapped into the base's namespace later, during the
    /// definition/reference merge.
    pub(crate) fn apply(&self, patch: &mut Bundle) {
        let mut touched: BTreeSet<Id> = BTreeSet::new();

        for doc in patch.documents.values_mut() {
            let ranges = std::mem::take(&mut doc.ranges);
            doc.ranges = ranges
                .into_iter()
                .map(|(old_id, range)| {
                    if let Some(id) = &range.definition_result_id {
                        touched.insert(id.clone());
                    }
                    if let Some(id) = &range.reference_result_id {
                        touched.insert(id.clone());
                    }
                    let new_id = self.renames.get(&old_id).cloned().unwrap_or(old_id);
                    (new_id, range)
                })
                .collect();
        }

        for result_id in touched {
            let shard_id = shard_id_for_result(&result_id, patch.meta.num_result_shards);
            let Some(shard) = patch.result_shards.get_mut(&shard_id) else {
                continue;
            };
            let Some(locations) = shard.locations.get_mut(&result_id) else {
                continue;
            };
            for location in locations {
                if let Some(new_id) = self.renames.get(&location.range_id) {
                    location.range_id = new_id.clone();
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn rename_of(&self, old_id: &Id) -> Option<&Id> {
        self.renames.get(old_id)
    }
}
