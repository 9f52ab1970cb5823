use std::collections::BTreeSet;
use vega_bundle::{Bundle, Id};

/// Purges every reference-result location in `base` that points into a path
/// being removed or replaced.
///
/// Those files' content disappears from the base once the merge completes,
/// so reference occurrences inside them are no longer valid. A reference
/// result may be pointed to by many ranges; each is filtered at most once.
pub(crate) fn remove_stale_refs(base: &mut Bundle, removed: &BTreeSet<String>) {
    let shard_count = base.meta.num_result_shards;
    let mut processed: BTreeSet<Id> = BTreeSet::new();

    for path in removed {
        let Some(doc) = base.documents.get(path) else {
            continue;
        };
        for range in doc.ranges.values() {
            let Some(ref_id) = &range.reference_result_id else {
                continue;
            };
            if !processed.insert(ref_id.clone()) {
                continue;
            }

            let shard_id = vega_bundle::shard_id_for_result(ref_id, shard_count);
            let Some(shard) = base.result_shards.get_mut(&shard_id) else {
                continue;
            };
            let Some(locations) = shard.locations.get_mut(ref_id) else {
                continue;
            };
            let document_paths = &shard.document_paths;
            locations.retain(|location| {
                document_paths
                    .get(&location.document_id)
                    .map_or(true, |path| !removed.contains(path))
            });
        }
    }
}
