use super::*;
use vega_merge::{merge_with, MergeError, MismatchKind};

fn base_with_two_ranges() -> Bundle {
    let mut base = Bundle::new(4);
    add_range(&mut base, "a.go", "base-1", range(0, 0, 0, 5, None, Some("R1")));
    add_range(&mut base, "a.go", "base-2", range(2, 0, 2, 5, None, Some("R1")));
    set_locations(&mut base, "R1", &[("a.go", "base-1"), ("a.go", "base-2")]);
    base
}

#[test]
fn range_count_mismatch_aborts_without_mutating_the_base() {
    let mut base = base_with_two_ranges();
    let before = base.clone();

    // Patch claims a.go is unchanged but indexed only one range.
    let mut patch = Bundle::new(2);
    add_range(&mut patch, "a.go", "p-1", range(0, 0, 0, 5, None, Some("PR")));
    set_locations(&mut patch, "PR", &[("a.go", "p-1")]);

    let status = statuses(&[("a.go", FileStatus::Unchanged)]);
    let err = merge_with(&mut SeqIds::new(), &mut base, patch, &paths(&[]), &status).unwrap_err();

    match err {
        MergeError::UnchangedPathMismatch { ref path, kind } => {
            assert_eq!(path, "a.go");
            assert_eq!(kind, MismatchKind::RangeCount { base: 2, patch: 1 });
        }
        other => panic!("expected UnchangedPathMismatch, got {other:?}"),
    }
    assert!(
        err.to_string().contains("a.go"),
        "message should name the offending path: {err}"
    );
    assert_eq!(base, before, "a rejected merge must leave the base untouched");
}

#[test]
fn range_position_mismatch_aborts_without_mutating_the_base() {
    let mut base = base_with_two_ranges();
    let before = base.clone();

    // Same count, but the second range moved.
    let mut patch = Bundle::new(2);
    add_range(&mut patch, "a.go", "p-1", range(0, 0, 0, 5, None, Some("PR")));
    add_range(&mut patch, "a.go", "p-2", range(3, 0, 3, 5, None, Some("PR")));
    set_locations(&mut patch, "PR", &[("a.go", "p-1"), ("a.go", "p-2")]);

    let status = statuses(&[("a.go", FileStatus::Unchanged)]);
    let err = merge_with(&mut SeqIds::new(), &mut base, patch, &paths(&[]), &status).unwrap_err();

    assert!(matches!(
        err,
        MergeError::UnchangedPathMismatch {
            kind: MismatchKind::RangePosition { index: 1 },
            ..
        }
    ));
    assert_eq!(base, before);
}

#[test]
fn id_exhaustion_aborts_the_merge() {
    let mut base = Bundle::new(4);
    let before = base.clone();

    let mut patch = Bundle::new(2);
    add_range(&mut patch, "b.go", "p-1", range(1, 0, 1, 4, None, None));

    let status = statuses(&[("b.go", FileStatus::Added)]);
    let err = merge_with(&mut ExhaustedIds, &mut base, patch, &paths(&[]), &status).unwrap_err();

    assert!(matches!(err, MergeError::IdExhausted(_)));
    assert!(err.to_string().contains("identifier source exhausted"));
    // Exhaustion during planning happens before any mutation.
    assert_eq!(base, before);
}

#[test]
fn unclassified_patch_paths_are_validated_as_unchanged() {
    // No file_status entry for a.go at all: the conservative default treats
    // it as unchanged, so disagreement with the (empty) base surfaces as a
    // mismatch instead of silently duplicating data.
    let mut base = Bundle::new(4);
    let mut patch = Bundle::new(2);
    add_range(&mut patch, "a.go", "p-1", range(0, 0, 0, 5, None, None));

    let err = merge_with(
        &mut SeqIds::new(),
        &mut base,
        patch,
        &paths(&[]),
        &statuses(&[]),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        MergeError::UnchangedPathMismatch {
            kind: MismatchKind::RangeCount { base: 0, patch: 1 },
            ..
        }
    ));
}
