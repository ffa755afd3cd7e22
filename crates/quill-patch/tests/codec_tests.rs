use pretty_assertions::assert_eq;
use proptest::prelude::*;
use quill_patch::{apply_patch, compute_diff, parse_patch, PatchCodec, PatchError, PatchOptions};

proptest! {
    #[test]
    fn prop_diff_then_apply_reproduces_new(
        old in "\\PC{0,200}",
        new in "\\PC{0,200}",
    ) {
        let patch = compute_diff(&old, &new);
        let outcome = apply_patch(&patch, &old);
        prop_assert!(outcome.is_complete());
        prop_assert_eq!(outcome.text, new);
    }

    #[test]
    fn prop_text_encoding_survives_parse(
        old in "[a-z \\n%]{0,120}",
        new in "[a-z \\n%]{0,120}",
    ) {
        let patch = compute_diff(&old, &new);
        let parsed = parse_patch(&patch.to_text()).unwrap();
        prop_assert_eq!(parsed, patch);
    }

    #[test]
    fn prop_narrow_context_still_reproduces_new(
        old in "[ab\\n ]{0,150}",
        new in "[ab\\n ]{0,150}",
        margin in 0..8usize,
    ) {
        let codec = PatchCodec::new(PatchOptions::default().with_context_margin(margin));
        let patch = codec.compute_diff(&old, &new);
        let outcome = codec.apply_patch(&patch, &old);
        prop_assert_eq!(outcome.text, new);
    }
}

#[test]
fn test_equal_texts_give_empty_patch_text() {
    let patch = compute_diff("Chapter one", "Chapter one");
    assert!(patch.is_empty());
    assert_eq!(patch.to_text(), "");
}

#[test]
fn test_insert_into_short_text() {
    let patch = compute_diff("Hello world", "Hello brave world");
    assert_eq!(patch.to_text(), "@@ -0,11 +0,17 @@ $\n Hello \n+brave \n world\n");

    let outcome = apply_patch(&patch, "Hello world");
    assert_eq!(outcome.text, "Hello brave world");
    assert_eq!(outcome.text.chars().count(), 17);
    assert_eq!(outcome.hunk_results, vec![true]);
}

#[test]
fn test_diverged_base_reports_failed_hunk() {
    let patch = compute_diff("Hello world", "Hello brave world");
    let outcome = apply_patch(&patch, "Hello world!!");
    assert_eq!(outcome.hunk_results, vec![false]);
    assert_eq!(outcome.text, "Hello world!!");
}

#[test]
fn test_edit_in_long_text_survives_unrelated_prefix_edit() {
    let preface = "A preface long enough that no change touches the opening words of the text. ";
    let paragraph = "It was a bright cold day in April, and the clocks were striking thirteen. ";
    let old = format!("{preface}{}", paragraph.repeat(4));
    let new = old.replacen("thirteen", "fourteen", 1).replace("April", "May");
    let patch = compute_diff(&old, &new);
    assert!(patch.len() >= 2);

    // Someone else prepended a sentence on the server.
    let drifted = format!("Prologue. {old}");
    let outcome = apply_patch(&patch, &drifted);
    assert!(outcome.is_complete());
    assert_eq!(outcome.text, format!("Prologue. {new}"));
}

#[test]
fn test_multiline_and_unicode_text() {
    let old = "Première ligne\nDeuxième ligne\n";
    let new = "Première ligne\nDeuxième ligne modifiée\n🙂\n";
    let patch = compute_diff(old, new);
    let text = patch.to_text();
    assert!(!text.contains('é'));

    let parsed = parse_patch(&text).unwrap();
    let outcome = apply_patch(&parsed, old);
    assert_eq!(outcome.text, new);
}

#[test]
fn test_deleting_everything() {
    let patch = compute_diff("gone", "");
    let outcome = apply_patch(&patch, "gone");
    assert_eq!(outcome.text, "");
    assert!(outcome.is_complete());
}

#[test]
fn test_malformed_patch_text() {
    for bad in ["not a patch", "@@ -1 +1 @@\n x\n", "@@ -0,1 +0,1 @@\n?x\n"] {
        let err = parse_patch(bad).unwrap_err();
        assert!(matches!(err, PatchError::Malformed { .. }), "{bad:?}");
    }
}

#[test]
fn test_out_of_range_header_offsets_apply_without_panicking() {
    let texts = [
        "@@ -5,3 +9223372036854775808,3 @@\n abc\n".to_string(),
        format!("@@ -{0},1 +{0},1 @@\n-x\n+y\n", usize::MAX),
        format!("@@ -1,1 +{},2 @@\n a\n+b\n@@ -3,1 +0,0 @@\n-c\n", usize::MAX - 1),
    ];

    for text in &texts {
        let patch = parse_patch(text).unwrap();
        let outcome = apply_patch(&patch, "zabcz");
        assert_eq!(outcome.hunk_results.len(), patch.len(), "{text}");
    }
}
