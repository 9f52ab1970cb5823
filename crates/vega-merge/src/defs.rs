use crate::merge::status_of;
use crate::MergeError;
use std::collections::{BTreeMap, BTreeSet};
use vega_bundle::{
    shard_id_for_result, sorted_range_ids, Bundle, FileStatus, Id, IdAllocator, IdExhaustedError,
    Location, Range, ShardId,
};

/// Resolves a result's locations together with each location's owning path,
/// skipping entries whose document id is not registered in the shard.
fn locations_with_paths(bundle: &Bundle, result_id: Option<&Id>) -> Vec<(Location, String)> {
    let Some(result_id) = result_id else {
        return Vec::new();
    };
    let shard_id = shard_id_for_result(result_id, bundle.meta.num_result_shards);
    let Some(shard) = bundle.result_shards.get(&shard_id) else {
        return Vec::new();
    };
    let Some(locations) = shard.locations.get(result_id) else {
        return Vec::new();
    };
    locations
        .iter()
        .filter_map(|location| {
            shard
                .document_paths
                .get(&location.document_id)
                .map(|path| (location.clone(), path.clone()))
        })
        .collect()
}

/// Every definition range reachable from a copied document, grouped by the
/// path owning the definition. Deduplicated by range id; the first occurrence
/// wins.
fn candidate_definitions(
    patch: &Bundle,
    paths_to_copy: &BTreeSet<String>,
) -> BTreeMap<String, BTreeMap<Id, Range>> {
    let mut by_path: BTreeMap<String, BTreeMap<Id, Range>> = BTreeMap::new();

    for path in paths_to_copy {
        let Some(doc) = patch.documents.get(path) else {
            continue;
        };
        for range in doc.ranges.values() {
            for (location, def_path) in
                locations_with_paths(patch, range.definition_result_id.as_ref())
            {
                let Some(def_range) = patch
                    .documents
                    .get(&def_path)
                    .and_then(|doc| doc.ranges.get(&location.range_id))
                else {
                    continue;
                };
                by_path
                    .entry(def_path)
                    .or_default()
                    .entry(location.range_id)
                    .or_insert_with(|| def_range.clone());
            }
        }
    }

    by_path
}

/// Working copy of one base result group: its location list plus the owning
/// shard's path → document-id table, checked out before the per-reference
/// loop and committed back to the base shard once afterwards.
struct ResultGroup {
    result_id: Option<Id>,
    shard_id: ShardId,
    locations: Vec<Location>,
    doc_ids_by_path: BTreeMap<String, Id>,
    added_paths: Vec<(Id, String)>,
}

impl ResultGroup {
    fn checkout(base: &Bundle, result_id: Option<Id>) -> Self {
        let (shard_id, locations, doc_ids_by_path) = match &result_id {
            Some(id) => {
                let shard_id = shard_id_for_result(id, base.meta.num_result_shards);
                match base.result_shards.get(&shard_id) {
                    Some(shard) => (
                        shard_id,
                        shard.locations.get(id).cloned().unwrap_or_default(),
                        shard
                            .document_paths
                            .iter()
                            .map(|(doc_id, path)| (path.clone(), doc_id.clone()))
                            .collect(),
                    ),
                    None => (shard_id, Vec::new(), BTreeMap::new()),
                }
            }
            None => (0, Vec::new(), BTreeMap::new()),
        };
        Self {
            result_id,
            shard_id,
            locations,
            doc_ids_by_path,
            added_paths: Vec::new(),
        }
    }

    /// Base document id for `path` in this group's shard, minting and
    /// registering a new one on first use in this merge pass.
    fn document_id_for(
        &mut self,
        path: &str,
        alloc: &mut impl IdAllocator,
    ) -> Result<Id, IdExhaustedError> {
        if let Some(id) = self.doc_ids_by_path.get(path) {
            return Ok(id.clone());
        }
        let id = alloc.fresh()?;
        self.doc_ids_by_path.insert(path.to_string(), id.clone());
        self.added_paths.push((id.clone(), path.to_string()));
        Ok(id)
    }

    fn commit(self, base: &mut Bundle) {
        let Some(result_id) = self.result_id else {
            return;
        };
        let shard = base.result_shards.entry(self.shard_id).or_default();
        for (doc_id, path) in self.added_paths {
            shard.document_paths.insert(doc_id, path);
        }
        shard.locations.insert(result_id, self.locations);
    }
}

/// Merges the patch's definition/reference graphs into the base's result
/// shards for every document being copied in.
///
/// For each copied file's definition targets: unchanged files extend their
/// existing base result group, changed files get a freshly minted group.
/// Reference locations owned by changed files are relocated into the base's
/// own document-id namespace and appended; a definition location co-located
/// with one of those references is added when the base has none. Copied
/// ranges are rewritten (in the patch, which is installed afterwards) to
/// point at the canonical result ids.
pub(crate) fn merge_definitions(
    base: &mut Bundle,
    patch: &mut Bundle,
    paths_to_copy: &BTreeSet<String>,
    file_status: &BTreeMap<String, FileStatus>,
    alloc: &mut impl IdAllocator,
) -> Result<(), MergeError> {
    let definitions_by_path = candidate_definitions(patch, paths_to_copy);
    tracing::debug!(
        target = "vega.merge",
        definition_paths = definitions_by_path.len(),
        copied_paths = paths_to_copy.len(),
        "merging definition and reference results"
    );

    for (path, candidates) in &definitions_by_path {
        let unchanged = status_of(file_status, path) == FileStatus::Unchanged;

        for candidate_id in sorted_range_ids(candidates) {
            let candidate = &candidates[&candidate_id];

            let (def_id, ref_id) = if unchanged {
                // Range unification already relabeled the patch with the
                // base's range ids, so the candidate id addresses the base
                // range whose result group this merge extends.
                let Some(base_range) = base
                    .documents
                    .get(path)
                    .and_then(|doc| doc.ranges.get(&candidate_id))
                else {
                    continue;
                };
                (
                    base_range.definition_result_id.clone(),
                    base_range.reference_result_id.clone(),
                )
            } else {
                (Some(alloc.fresh()?), Some(alloc.fresh()?))
            };

            let patch_refs = locations_with_paths(patch, candidate.reference_result_id.as_ref());
            let patch_defs = locations_with_paths(patch, candidate.definition_result_id.as_ref());

            let mut ref_group = ResultGroup::checkout(base, ref_id.clone());
            let mut def_group = ResultGroup::checkout(base, def_id.clone());

            for (patch_ref, ref_path) in &patch_refs {
                // Locations inside unchanged files are already present in the
                // base's lists; everything else must be (re-)added under a
                // document id valid in the base's namespace.
                if status_of(file_status, ref_path) != FileStatus::Unchanged
                    && ref_group.result_id.is_some()
                {
                    let document_id = ref_group.document_id_for(ref_path, alloc)?;
                    ref_group.locations.push(Location {
                        document_id,
                        range_id: patch_ref.range_id.clone(),
                    });
                }

                // First appearance of this definition in the base: adopt the
                // definition occurrence co-located with this reference.
                if def_group.locations.is_empty() && def_group.result_id.is_some() {
                    let colocated = patch_defs.iter().find(|(def_loc, def_path)| {
                        def_path == ref_path && def_loc.range_id == patch_ref.range_id
                    });
                    if let Some((def_loc, def_path)) = colocated {
                        let document_id = def_group.document_id_for(def_path, alloc)?;
                        def_group.locations.push(Location {
                            document_id,
                            range_id: def_loc.range_id.clone(),
                        });
                    }
                }

                if paths_to_copy.contains(ref_path) {
                    if let Some(range) = patch
                        .documents
                        .get_mut(ref_path)
                        .and_then(|doc| doc.ranges.get_mut(&patch_ref.range_id))
                    {
                        range.definition_result_id = def_id.clone();
                        range.reference_result_id = ref_id.clone();
                    }
                }
            }

            ref_group.commit(base);
            def_group.commit(base);
        }
    }

    Ok(())
}
