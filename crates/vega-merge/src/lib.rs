//! Incremental merge of precise code-intelligence bundles.
//!
//! Given a previously computed index for one commit (the *base* bundle), a
//! freshly computed index for a descendant commit (the *patch* bundle), a
//! per-file change classification from version control, and the set of paths
//! the indexer actually reprocessed, [`merge`] updates the base in place into
//! the index for the new commit — without re-indexing unchanged files.
//!
//! The hard part is that the two bundles use unrelated identifier namespaces
//! even for byte-identical files. The pipeline reconciles them in four
//! phases: purge base reference locations pointing into replaced files, unify
//! the patch's range ids with the base's, merge the patch's
//! definition/reference graphs into the base's result shards, then delete
//! removed documents and install the copied ones.
//!
//! The merge is single-threaded and performs no I/O; the only fallible
//! operation is identifier generation.

mod defs;
mod merge;
mod remap;
mod stale;

pub use merge::{merge, merge_with};

use vega_bundle::IdExhaustedError;

/// Fatal merge failures. Neither kind is retried internally; retries, if
/// any, belong to the harness re-running the pipeline from raw indexing.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// The unique-id source failed. The base bundle may be partially mutated
    /// and must be discarded, never persisted.
    #[error(transparent)]
    IdExhausted(#[from] IdExhaustedError),

    /// An `Unchanged` file's range set differs between base and patch. This
    /// signals a broken determinism assumption in the upstream indexer; the
    /// whole patch is unusable. Raised before either bundle is mutated.
    #[error("ranges of unchanged file `{path}` do not match the base index: {kind}")]
    UnchangedPathMismatch { path: String, kind: MismatchKind },
}

/// How an unchanged file's ranges disagreed between base and patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MismatchKind {
    #[error("range count differs (base {base}, patch {patch})")]
    RangeCount { base: usize, patch: usize },
    #[error("range position differs at sorted index {index}")]
    RangePosition { index: usize },
}
