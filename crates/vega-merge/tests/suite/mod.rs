//! Shared fixtures for the merge scenarios.

mod failures;

use std::collections::{BTreeMap, BTreeSet};
use vega_bundle::{
    shard_id_for_result, Bundle, FileStatus, Id, IdAllocator, IdExhaustedError, Location, Range,
};

/// Deterministic id source: `new-1`, `new-2`, ...
pub struct SeqIds {
    next: u32,
}

impl SeqIds {
    pub fn new() -> Self {
        Self { next: 0 }
    }
}

impl IdAllocator for SeqIds {
    fn fresh(&mut self) -> Result<Id, IdExhaustedError> {
        self.next += 1;
        Ok(Id::from(format!("new-{}", self.next)))
    }
}

/// Id source whose randomness failed.
pub struct ExhaustedIds;

impl IdAllocator for ExhaustedIds {
    fn fresh(&mut self) -> Result<Id, IdExhaustedError> {
        Err(IdExhaustedError {
            message: "entropy source unavailable".to_string(),
        })
    }
}

pub fn range(
    start_line: u32,
    start_character: u32,
    end_line: u32,
    end_character: u32,
    def: Option<&str>,
    reference: Option<&str>,
) -> Range {
    let mut range = Range::new(start_line, start_character, end_line, end_character);
    range.definition_result_id = def.map(Id::from);
    range.reference_result_id = reference.map(Id::from);
    range
}

pub fn add_range(bundle: &mut Bundle, path: &str, range_id: &str, range: Range) {
    bundle
        .documents
        .entry(path.to_string())
        .or_default()
        .ranges
        .insert(Id::from(range_id), range);
}

/// Stores a result's location list, registering shard-local document ids for
/// the named paths as needed.
pub fn set_locations(bundle: &mut Bundle, result_id: &str, locations: &[(&str, &str)]) {
    let result_id = Id::from(result_id);
    let shard_id = shard_id_for_result(&result_id, bundle.meta.num_result_shards);
    let shard = bundle.result_shards.entry(shard_id).or_default();

    let mut list = Vec::new();
    for (path, range_id) in locations {
        let existing = shard
            .document_paths
            .iter()
            .find_map(|(id, p)| (p.as_str() == *path).then(|| id.clone()));
        let document_id = match existing {
            Some(id) => id,
            None => {
                let id = Id::from(format!("doc-{shard_id}-{path}"));
                shard.document_paths.insert(id.clone(), path.to_string());
                id
            }
        };
        list.push(Location {
            document_id,
            range_id: Id::from(*range_id),
        });
    }
    shard.locations.insert(result_id, list);
}

/// A result's location list resolved to `(owning path, range id)` pairs,
/// order preserved. Shard-local document ids never leak into assertions, so
/// the same expectations hold across bundles with different shard counts.
pub fn resolved_locations(bundle: &Bundle, result_id: &str) -> Vec<(String, Id)> {
    let result_id = Id::from(result_id);
    let shard_id = shard_id_for_result(&result_id, bundle.meta.num_result_shards);
    let Some(shard) = bundle.result_shards.get(&shard_id) else {
        return Vec::new();
    };
    shard
        .locations
        .get(&result_id)
        .into_iter()
        .flatten()
        .map(|location| {
            (
                shard
                    .document_paths
                    .get(&location.document_id)
                    .cloned()
                    .unwrap_or_default(),
                location.range_id.clone(),
            )
        })
        .collect()
}

pub fn statuses(entries: &[(&str, FileStatus)]) -> BTreeMap<String, FileStatus> {
    entries
        .iter()
        .map(|(path, status)| (path.to_string(), *status))
        .collect()
}

pub fn paths(entries: &[&str]) -> BTreeSet<String> {
    entries.iter().map(|path| path.to_string()).collect()
}
