use crate::defs::merge_definitions;
use crate::remap::RangeRemapPlan;
use crate::stale::remove_stale_refs;
use crate::MergeError;
use std::collections::{BTreeMap, BTreeSet};
use vega_bundle::{Bundle, FileStatus, IdAllocator, UuidAllocator};

/// Merges `patch` into `base`, mutating `base` in place into the index for
/// the new commit.
///
/// `reindexed` names the paths the patch bundle carries index data for beyond
/// what `file_status` implies: a superset of the added paths, possibly
/// including unchanged paths the indexer reprocessed anyway. `file_status`
/// must classify every path participating in the diff.
///
/// The patch is consumed: it serves as scratch space during range-id
/// unification and is dismantled by the apply phase.
///
/// On [`MergeError::UnchangedPathMismatch`] the base is observably untouched.
/// On [`MergeError::IdExhausted`] the base may be partially mutated and must
/// be discarded.
pub fn merge(
    base: &mut Bundle,
    patch: Bundle,
    reindexed: &BTreeSet<String>,
    file_status: &BTreeMap<String, FileStatus>,
) -> Result<(), MergeError> {
    merge_with(&mut UuidAllocator, base, patch, reindexed, file_status)
}

/// [`merge`] with a caller-supplied id source.
pub fn merge_with<A: IdAllocator>(
    alloc: &mut A,
    base: &mut Bundle,
    mut patch: Bundle,
    reindexed: &BTreeSet<String>,
    file_status: &BTreeMap<String, FileStatus>,
) -> Result<(), MergeError> {
    let invocation = uuid::Uuid::new_v4();
    let span = tracing::debug_span!(
        "bundle_merge",
        invocation = %invocation,
        base_documents = base.documents.len(),
        patch_documents = patch.documents.len(),
    );
    let _guard = span.enter();

    // Every fatal data-integrity check runs here, on read-only borrows, so a
    // mismatch error leaves the caller's bundles untouched.
    let plan = RangeRemapPlan::compute(base, &patch, file_status, alloc)?;

    let mut removed: BTreeSet<String> = BTreeSet::new();
    for (path, status) in file_status {
        if matches!(status, FileStatus::Modified | FileStatus::Deleted) {
            removed.insert(path.clone());
        }
    }
    tracing::debug!(
        target = "vega.merge",
        removed = removed.len(),
        "removing stale reference locations"
    );
    remove_stale_refs(base, &removed);

    plan.apply(&mut patch);

    let mut paths_to_copy: BTreeSet<String> = reindexed.clone();
    for (path, status) in file_status {
        if *status == FileStatus::Added {
            paths_to_copy.insert(path.clone());
        }
    }

    merge_definitions(base, &mut patch, &paths_to_copy, file_status, alloc)?;

    apply_documents(base, patch, &paths_to_copy, file_status);
    Ok(())
}

/// Completes the merge: deleted paths leave the base and the copied
/// documents (already relabeled and rewritten) replace or join the base's.
fn apply_documents(
    base: &mut Bundle,
    mut patch: Bundle,
    paths_to_copy: &BTreeSet<String>,
    file_status: &BTreeMap<String, FileStatus>,
) {
    for (path, status) in file_status {
        if *status == FileStatus::Deleted {
            base.documents.remove(path);
        }
    }
    for path in paths_to_copy {
        if let Some(doc) = patch.documents.remove(path) {
            tracing::debug!(target = "vega.merge", path = %path, "installing document");
            base.documents.insert(path.clone(), doc);
        }
    }
}

/// Status for a path, defaulting to `Unchanged` when the classification has
/// no entry. Callers are required to classify every participating path; an
/// unclassified patch path then gets validated against the base instead of
/// being silently re-added.
pub(crate) fn status_of(file_status: &BTreeMap<String, FileStatus>, path: &str) -> FileStatus {
    file_status
        .get(path)
        .copied()
        .unwrap_or(FileStatus::Unchanged)
}
