use crate::ids::Id;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

pub type ShardId = u32;

/// Per-bundle parameters fixed at indexing time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// Shard count used when hashing result ids into [`Bundle::result_shards`].
    ///
    /// Two bundles may legitimately disagree on this value, so shard indices
    /// are never compared across bundles — only shard contents are.
    pub num_result_shards: u32,
}

/// A source-position span plus links into the result-location tables.
///
/// A range has at most one definition result and at most one reference
/// result. Ranges of the same document never overlap (indexer guarantee,
/// not enforced here).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start_line: u32,
    pub start_character: u32,
    pub end_line: u32,
    pub end_character: u32,
    pub definition_result_id: Option<Id>,
    pub reference_result_id: Option<Id>,
    pub hover_result_id: Option<Id>,
    pub moniker_ids: BTreeSet<Id>,
}

impl Range {
    pub fn new(start_line: u32, start_character: u32, end_line: u32, end_character: u32) -> Self {
        Self {
            start_line,
            start_character,
            end_line,
            end_character,
            ..Self::default()
        }
    }

    /// Total order over ranges by position tuple.
    ///
    /// Ranges with identical positions compare equal; correspondence among
    /// equals is arbitrary (the indexer never emits overlapping ranges, so
    /// equal positions only arise from duplicate entries).
    #[must_use]
    pub fn position_cmp(&self, other: &Range) -> Ordering {
        (
            self.start_line,
            self.start_character,
            self.end_line,
            self.end_character,
        )
            .cmp(&(
                other.start_line,
                other.start_character,
                other.end_line,
                other.end_character,
            ))
    }
}

/// A moniker attached to a range (symbol identity across bundles).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Moniker {
    pub kind: String,
    pub scheme: String,
    pub identifier: String,
    pub package_information_id: Option<Id>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInformation {
    pub name: String,
    pub version: String,
}

/// The per-file portion of a bundle.
///
/// The hover/moniker/package tables are carried through merges untouched;
/// only `ranges` participates in identifier reconciliation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub ranges: BTreeMap<Id, Range>,
    pub hover_results: BTreeMap<Id, String>,
    pub monikers: BTreeMap<Id, Moniker>,
    pub package_information: BTreeMap<Id, PackageInformation>,
}

/// One entry of a result's location list.
///
/// `document_id` is local to the owning shard's [`ResultShard::document_paths`]
/// table; it is *not* in the same namespace as range ids. It exists so one
/// shard can reference ranges living in many files compactly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub document_id: Id,
    pub range_id: Id,
}

/// A partition of the result-location space.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultShard {
    /// Shard-local document id → file path.
    pub document_paths: BTreeMap<Id, String>,
    /// Result id → ordered location list.
    pub locations: BTreeMap<Id, Vec<Location>>,
}

/// One commit's complete precise code-intelligence index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub meta: Meta,
    pub documents: BTreeMap<String, Document>,
    pub result_shards: BTreeMap<ShardId, ResultShard>,
}

impl Bundle {
    pub fn new(num_result_shards: u32) -> Self {
        Self {
            meta: Meta { num_result_shards },
            documents: BTreeMap::new(),
            result_shards: BTreeMap::new(),
        }
    }

    /// Shard index a result id resolves through in this bundle.
    #[must_use]
    pub fn shard_for(&self, result_id: &Id) -> ShardId {
        shard_id_for_result(result_id, self.meta.num_result_shards)
    }

    /// Location list stored for a result id, empty if the id is unknown.
    #[must_use]
    pub fn locations(&self, result_id: &Id) -> &[Location] {
        self.result_shards
            .get(&self.shard_for(result_id))
            .and_then(|shard| shard.locations.get(result_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Classification of a path between the base and patch commits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Unchanged,
}

/// Deterministic, stable shard selector for a result id.
///
/// The same id within the same bundle always resolves to the same shard.
pub fn shard_id_for_result(id: &Id, shard_count: u32) -> ShardId {
    if shard_count == 0 {
        return 0;
    }

    let hash = blake3::hash(id.as_str().as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[..8]);
    let value = u64::from_le_bytes(prefix);
    (value % shard_count as u64) as ShardId
}

/// Every range id of a document, ordered by the range it names.
///
/// The sort is stable, so ids of equal-position ranges keep their map order
/// and the result is fully deterministic.
#[must_use]
pub fn sorted_range_ids(ranges: &BTreeMap<Id, Range>) -> Vec<Id> {
    let mut ids: Vec<Id> = ranges.keys().cloned().collect();
    ids.sort_by(|a, b| ranges[a].position_cmp(&ranges[b]));
    ids
}
