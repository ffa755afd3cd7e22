//! Applying patches to text that may have drifted
//!
//! Each hunk is located near its expected offset by exact match of its
//! source text. Anchored hunks only match at the text boundary they are
//! anchored to. Hunks that cannot be located are skipped and reported as
//! failed; the remaining hunks still apply.

use crate::patch::{Hunk, Patch};

/// Result of applying a patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Resulting text
    pub text: String,
    /// One entry per hunk, `true` when the hunk applied
    pub hunk_results: Vec<bool>,
}

impl ApplyOutcome {
    /// Every hunk applied
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.hunk_results.iter().all(|ok| *ok)
    }

    /// Indices of hunks that could not be applied
    #[must_use]
    pub fn failed_hunks(&self) -> Vec<usize> {
        self.hunk_results
            .iter()
            .enumerate()
            .filter(|(_, ok)| !**ok)
            .map(|(idx, _)| idx)
            .collect()
    }
}

/// Apply `patch` to `base`, searching at most `window` characters away
/// from each hunk's expected position
#[must_use]
pub fn apply(patch: &Patch, base: &str, window: usize) -> ApplyOutcome {
    let mut text: Vec<char> = base.chars().collect();
    let mut hunk_results = Vec::with_capacity(patch.len());
    // Drift between where hunks were computed and where they landed
    let mut delta: isize = 0;

    for hunk in patch.hunks() {
        // Header offsets are untrusted; never look past the end of the text
        let expected = hunk
            .new_start()
            .saturating_add_signed(delta)
            .min(text.len());
        let source: Vec<char> = hunk.source_text().chars().collect();

        match locate(hunk, &text, &source, expected, window) {
            Some(at) => {
                let target: Vec<char> = hunk.target_text().chars().collect();
                text.splice(at..at + source.len(), target);
                delta = delta.saturating_add(signed(at) - signed(expected));
                hunk_results.push(true);
            }
            None => {
                delta = delta.saturating_sub(signed(hunk.new_len()) - signed(hunk.old_len()));
                hunk_results.push(false);
            }
        }
    }

    ApplyOutcome {
        text: text.into_iter().collect(),
        hunk_results,
    }
}

fn locate(hunk: &Hunk, text: &[char], source: &[char], expected: usize, window: usize) -> Option<usize> {
    if source.len() > text.len() {
        return None;
    }
    let last = text.len() - source.len();
    let matches_at = |at: usize| text[at..at + source.len()] == *source;

    match (hunk.is_start_anchored(), hunk.is_end_anchored()) {
        (true, true) => (text.len() == source.len() && matches_at(0)).then_some(0),
        (true, false) => matches_at(0).then_some(0),
        (false, true) => matches_at(last).then_some(last),
        (false, false) => {
            let expected = expected.min(last);
            (0..=window).find_map(|dist| {
                let before = expected.checked_sub(dist).filter(|at| matches_at(*at));
                let after = expected
                    .checked_add(dist)
                    .filter(|at| dist > 0 && *at <= last && matches_at(*at));
                before.or(after)
            })
        }
    }
}

/// Lengths here are bounded by in-memory text, so they fit in `isize`
fn signed(n: usize) -> isize {
    isize::try_from(n).unwrap_or(isize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::edit_script;

    fn patch_for(old: &str, new: &str, margin: usize) -> Patch {
        Patch::from_edits(&edit_script(old, new, None), margin)
    }

    #[test]
    fn applies_to_identical_base() {
        let patch = patch_for("Hello world", "Hello brave world", 32);
        let outcome = apply(&patch, "Hello world", 1000);
        assert_eq!(outcome.text, "Hello brave world");
        assert!(outcome.is_complete());
    }

    #[test]
    fn anchored_hunk_rejects_longer_base() {
        let patch = patch_for("Hello world", "Hello brave world", 32);
        let outcome = apply(&patch, "Hello world!!", 1000);
        assert_eq!(outcome.hunk_results, vec![false]);
        assert_eq!(outcome.text, "Hello world!!");
        assert_eq!(outcome.failed_hunks(), vec![0]);
    }

    #[test]
    fn floating_hunk_follows_shifted_text() {
        let old = format!("{}target word{}", "x".repeat(50), "y".repeat(50));
        let new = format!("{}target WORD{}", "x".repeat(50), "y".repeat(50));
        let patch = patch_for(&old, &new, 4);
        let drifted = format!("prefix {old}");
        let outcome = apply(&patch, &drifted, 1000);
        assert!(outcome.is_complete());
        assert_eq!(outcome.text, format!("prefix {new}"));
    }

    #[test]
    fn hunk_outside_window_fails() {
        let old = format!("{}abc{}", "x".repeat(10), "y".repeat(10));
        let new = format!("{}aXc{}", "x".repeat(10), "y".repeat(10));
        let patch = patch_for(&old, &new, 2);
        let drifted = format!("{}{old}", "z".repeat(40));
        let outcome = apply(&patch, &drifted, 8);
        assert!(!outcome.is_complete());
        assert_eq!(outcome.text, drifted);
    }

    #[test]
    fn later_hunks_apply_after_earlier_failure() {
        let filler = "-".repeat(40);
        let old = format!("alpha{filler}omega");
        let new = format!("ALPHA{filler}OMEGA");
        let patch = patch_for(&old, &new, 4);
        assert_eq!(patch.len(), 2);

        let base = format!("gamma{filler}omega");
        let outcome = apply(&patch, &base, 1000);
        assert_eq!(outcome.hunk_results, vec![false, true]);
        assert_eq!(outcome.text, format!("gamma{filler}OMEGA"));
    }

    #[test]
    fn out_of_range_offsets_do_not_overflow() {
        let huge = "@@ -5,3 +9223372036854775808,3 @@\n abc\n".parse::<Patch>().unwrap();
        let outcome = apply(&huge, "xxabcxx", 1000);
        assert!(outcome.is_complete());
        assert_eq!(outcome.text, "xxabcxx");

        let max = format!("@@ -{0},3 +{0},4 @@\n ab\n+Z\n c\n", usize::MAX);
        let outcome = apply(&max.parse().unwrap(), "abc abc", usize::MAX);
        assert!(outcome.is_complete());
        assert_eq!(outcome.text, "abc abZc");
    }

    #[test]
    fn empty_patch_leaves_text() {
        let outcome = apply(&Patch::empty(), "anything", 1000);
        assert_eq!(outcome.text, "anything");
        assert!(outcome.hunk_results.is_empty());
        assert!(outcome.is_complete());
    }
}
