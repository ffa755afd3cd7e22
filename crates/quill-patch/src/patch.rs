//! Patches, hunks and their text encoding
//!
//! A [`Patch`] is a list of [`Hunk`]s. Each hunk carries a run of edits plus
//! surrounding equal context, and the offsets where it expects to apply.
//!
//! # Text format
//!
//! ```text
//! @@ -0,11 +0,17 @@ $
//!  Hello%20
//! +brave%20
//!  world
//! ```
//!
//! Offsets and lengths are 0-based character counts. Body lines start with
//! ` ` (context), `-` (delete) or `+` (insert); the rest of the line is
//! percent-encoded. A trailing ` $` on the header marks a hunk whose context
//! runs to the end of the old text. A hunk starting at offset 0 is anchored
//! to the start of the text.

use crate::diff::Edit;
use once_cell::sync::Lazy;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Bytes escaped in hunk bodies (non-ASCII is always escaped)
const BODY: &AsciiSet = &CONTROLS.add(b'%');

static HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@@ -(\d+),(\d+) \+(\d+),(\d+) @@( \$)?$").expect("hunk header pattern is valid")
});

/// One localized change with its context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    old_start: usize,
    old_len: usize,
    new_start: usize,
    new_len: usize,
    anchored_end: bool,
    edits: Vec<Edit>,
}

impl Hunk {
    /// Character offset of the hunk in the old text
    #[inline]
    #[must_use]
    pub fn old_start(&self) -> usize {
        self.old_start
    }

    /// Characters of old text covered (context + deletions)
    #[inline]
    #[must_use]
    pub fn old_len(&self) -> usize {
        self.old_len
    }

    /// Character offset of the hunk in the new text
    #[inline]
    #[must_use]
    pub fn new_start(&self) -> usize {
        self.new_start
    }

    /// Characters of new text produced (context + insertions)
    #[inline]
    #[must_use]
    pub fn new_len(&self) -> usize {
        self.new_len
    }

    /// Hunk must match at the very start of the text
    #[inline]
    #[must_use]
    pub fn is_start_anchored(&self) -> bool {
        self.old_start == 0
    }

    /// Hunk must match at the very end of the text
    #[inline]
    #[must_use]
    pub fn is_end_anchored(&self) -> bool {
        self.anchored_end
    }

    /// Edits in order
    #[inline]
    #[must_use]
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    /// Text the hunk expects to find (context and deletions)
    #[must_use]
    pub fn source_text(&self) -> String {
        self.edits
            .iter()
            .filter(|e| e.in_old())
            .map(Edit::text)
            .collect()
    }

    /// Text the hunk leaves behind (context and insertions)
    #[must_use]
    pub fn target_text(&self) -> String {
        self.edits
            .iter()
            .filter(|e| e.in_new())
            .map(Edit::text)
            .collect()
    }

    fn write_to(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "@@ -{},{} +{},{} @@{}",
            self.old_start,
            self.old_len,
            self.new_start,
            self.new_len,
            if self.anchored_end { " $" } else { "" }
        )?;
        for edit in &self.edits {
            if edit.text().is_empty() {
                continue;
            }
            let prefix = match edit {
                Edit::Equal(_) => ' ',
                Edit::Delete(_) => '-',
                Edit::Insert(_) => '+',
            };
            writeln!(f, "{prefix}{}", utf8_percent_encode(edit.text(), BODY))?;
        }
        Ok(())
    }
}

/// Ordered list of hunks turning one text into another
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Patch {
    hunks: Vec<Hunk>,
}

impl Patch {
    /// Patch with no hunks
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Hunks in application order
    #[inline]
    #[must_use]
    pub fn hunks(&self) -> &[Hunk] {
        &self.hunks
    }

    /// Number of hunks
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.hunks.len()
    }

    /// No difference to submit
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Serialize to the portable text format
    #[must_use]
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Group an edit script into hunks with `margin` characters of context
    ///
    /// Changes separated by at most `2 * margin` equal characters share a
    /// hunk.
    #[must_use]
    pub fn from_edits(edits: &[Edit], margin: usize) -> Self {
        let old_total: usize = edits.iter().filter(|e| e.in_old()).map(Edit::char_len).sum();

        let mut hunks = Vec::new();
        let mut current: Option<HunkBuilder> = None;
        let mut old_pos = 0;
        let mut new_pos = 0;
        let mut prev_equal: &str = "";

        for (idx, edit) in edits.iter().enumerate() {
            let is_last = idx + 1 == edits.len();
            match edit {
                Edit::Equal(text) => {
                    let len = edit.char_len();
                    if let Some(mut builder) = current.take() {
                        if !is_last && len <= 2 * margin {
                            builder.push(edit.clone());
                            current = Some(builder);
                        } else {
                            builder.push(Edit::Equal(take_prefix(text, margin)));
                            hunks.push(builder.finish(old_total));
                        }
                    }
                    prev_equal = text;
                    old_pos += len;
                    new_pos += len;
                }
                Edit::Delete(_) | Edit::Insert(_) => {
                    let builder = current.get_or_insert_with(|| {
                        let lead = take_suffix(prev_equal, margin);
                        let lead_len = lead.chars().count();
                        let mut builder = HunkBuilder::new(old_pos - lead_len, new_pos - lead_len);
                        builder.push(Edit::Equal(lead));
                        builder
                    });
                    builder.push(edit.clone());
                    if edit.in_old() {
                        old_pos += edit.char_len();
                    } else {
                        new_pos += edit.char_len();
                    }
                    prev_equal = "";
                }
            }
        }

        if let Some(builder) = current {
            hunks.push(builder.finish(old_total));
        }

        Self { hunks }
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for hunk in &self.hunks {
            hunk.write_to(f)?;
        }
        Ok(())
    }
}

impl FromStr for Patch {
    type Err = PatchError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut hunks = Vec::new();
        let mut current: Option<ParsedHunk> = None;

        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            if line.is_empty() {
                continue;
            }

            if line.starts_with("@@") {
                if let Some(parsed) = current.take() {
                    hunks.push(parsed.finish()?);
                }
                current = Some(ParsedHunk::from_header(line, line_no)?);
                continue;
            }

            let Some(parsed) = current.as_mut() else {
                return Err(PatchError::malformed(line_no, "body line before hunk header"));
            };

            let mut chars = line.chars();
            let op = chars.next().unwrap_or(' ');
            let body = percent_decode_str(chars.as_str())
                .decode_utf8()
                .map_err(|e| PatchError::malformed(line_no, format!("invalid encoding: {e}")))?
                .into_owned();

            let edit = match op {
                ' ' => Edit::Equal(body),
                '-' => Edit::Delete(body),
                '+' => Edit::Insert(body),
                other => {
                    return Err(PatchError::malformed(
                        line_no,
                        format!("unknown line prefix {other:?}"),
                    ))
                }
            };
            parsed.hunk.push(edit);
        }

        if let Some(parsed) = current {
            hunks.push(parsed.finish()?);
        }

        Ok(Self { hunks })
    }
}

/// Errors produced while decoding a patch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    /// Text is not a valid patch encoding
    #[error("malformed patch at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

impl PatchError {
    /// Create malformed-patch error
    #[inline]
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            reason: reason.into(),
        }
    }
}

/// Accumulates edits and tracks lengths
#[derive(Debug)]
struct HunkBuilder {
    old_start: usize,
    new_start: usize,
    old_len: usize,
    new_len: usize,
    edits: Vec<Edit>,
}

impl HunkBuilder {
    fn new(old_start: usize, new_start: usize) -> Self {
        Self {
            old_start,
            new_start,
            old_len: 0,
            new_len: 0,
            edits: Vec::new(),
        }
    }

    fn push(&mut self, edit: Edit) {
        if edit.text().is_empty() {
            return;
        }
        let len = edit.char_len();
        if edit.in_old() {
            self.old_len += len;
        }
        if edit.in_new() {
            self.new_len += len;
        }
        self.edits.push(edit);
    }

    fn finish(self, old_total: usize) -> Hunk {
        Hunk {
            old_start: self.old_start,
            old_len: self.old_len,
            new_start: self.new_start,
            new_len: self.new_len,
            anchored_end: self.old_start + self.old_len == old_total,
            edits: self.edits,
        }
    }
}

/// Hunk being decoded, with the lengths its header promised
struct ParsedHunk {
    hunk: HunkBuilder,
    declared_old: usize,
    declared_new: usize,
    anchored_end: bool,
    line: usize,
}

impl ParsedHunk {
    fn from_header(line: &str, line_no: usize) -> Result<Self, PatchError> {
        let caps = HEADER
            .captures(line)
            .ok_or_else(|| PatchError::malformed(line_no, "invalid hunk header"))?;
        let number = |i: usize| -> Result<usize, PatchError> {
            caps[i]
                .parse()
                .map_err(|_| PatchError::malformed(line_no, "hunk offset out of range"))
        };

        Ok(Self {
            hunk: HunkBuilder::new(number(1)?, number(3)?),
            declared_old: number(2)?,
            declared_new: number(4)?,
            anchored_end: caps.get(5).is_some(),
            line: line_no,
        })
    }

    fn finish(self) -> Result<Hunk, PatchError> {
        if self.hunk.edits.is_empty() {
            return Err(PatchError::malformed(self.line, "hunk has no body"));
        }
        if self.hunk.old_len != self.declared_old || self.hunk.new_len != self.declared_new {
            return Err(PatchError::malformed(
                self.line,
                format!(
                    "hunk body covers -{},+{} but header declares -{},+{}",
                    self.hunk.old_len, self.hunk.new_len, self.declared_old, self.declared_new
                ),
            ));
        }
        Ok(Hunk {
            old_start: self.hunk.old_start,
            old_len: self.hunk.old_len,
            new_start: self.hunk.new_start,
            new_len: self.hunk.new_len,
            anchored_end: self.anchored_end,
            edits: self.hunk.edits,
        })
    }
}

fn take_prefix(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

fn take_suffix(text: &str, n: usize) -> String {
    let len = text.chars().count();
    text.chars().skip(len.saturating_sub(n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::edit_script;
    use pretty_assertions::assert_eq;

    fn patch_for(old: &str, new: &str, margin: usize) -> Patch {
        Patch::from_edits(&edit_script(old, new, None), margin)
    }

    #[test]
    fn no_edits_means_empty_patch() {
        let patch = patch_for("unchanged", "unchanged", 4);
        assert!(patch.is_empty());
        assert_eq!(patch.to_text(), "");
    }

    #[test]
    fn small_text_is_fully_anchored() {
        let patch = patch_for("Hello world", "Hello brave world", 32);
        assert_eq!(patch.len(), 1);
        let hunk = &patch.hunks()[0];
        assert!(hunk.is_start_anchored());
        assert!(hunk.is_end_anchored());
        assert_eq!(hunk.old_len(), 11);
        assert_eq!(hunk.new_len(), 17);
        assert_eq!(
            patch.to_text(),
            "@@ -0,11 +0,17 @@ $\n Hello \n+brave \n world\n"
        );
    }

    #[test]
    fn context_is_trimmed_to_margin() {
        let patch = patch_for("Hello world", "Hello brave world", 4);
        let hunk = &patch.hunks()[0];
        assert_eq!(hunk.old_start(), 2);
        assert_eq!(hunk.source_text(), "llo worl");
        assert_eq!(hunk.target_text(), "llo brave worl");
        assert!(!hunk.is_start_anchored());
        assert!(!hunk.is_end_anchored());
    }

    #[test]
    fn distant_changes_get_separate_hunks() {
        let old = format!("a{}b", "-".repeat(40));
        let new = format!("A{}B", "-".repeat(40));
        let patch = patch_for(&old, &new, 4);
        assert_eq!(patch.len(), 2);
        assert_eq!(patch.hunks()[1].old_start(), 37);
        assert!(patch.hunks()[1].is_end_anchored());
    }

    #[test]
    fn nearby_changes_share_a_hunk() {
        let patch = patch_for("a-----b", "A-----B", 4);
        assert_eq!(patch.len(), 1);
    }

    #[test]
    fn text_encoding_escapes_newlines_and_percent() {
        let patch = patch_for("50%\nline", "75%\nline", 32);
        let text = patch.to_text();
        assert!(text.contains("%25%0A"));
        assert_eq!(text.lines().filter(|l| l.starts_with("@@")).count(), 1);
    }

    #[test]
    fn encoded_text_parses_back() {
        let patch = patch_for("Señor\tgato", "Señora\tgata", 8);
        let parsed: Patch = patch.to_text().parse().unwrap();
        assert_eq!(parsed, patch);
    }

    #[test]
    fn empty_text_parses_to_empty_patch() {
        let parsed: Patch = "".parse().unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn rejects_body_before_header() {
        let err = " orphan\n".parse::<Patch>().unwrap_err();
        assert!(matches!(err, PatchError::Malformed { line: 1, .. }));
    }

    #[test]
    fn rejects_unknown_prefix() {
        let err = "@@ -0,1 +0,1 @@\n*x\n".parse::<Patch>().unwrap_err();
        assert!(err.to_string().contains("unknown line prefix"));
    }

    #[test]
    fn rejects_bad_header() {
        let err = "@@ -a,1 +0,1 @@\n x\n".parse::<Patch>().unwrap_err();
        assert!(err.to_string().contains("invalid hunk header"));
    }

    #[test]
    fn rejects_length_mismatch() {
        let err = "@@ -0,5 +0,1 @@\n x\n".parse::<Patch>().unwrap_err();
        assert!(err.to_string().contains("header declares"));
    }

    #[test]
    fn rejects_invalid_utf8_escape() {
        let err = "@@ -0,1 +0,1 @@\n %FF\n".parse::<Patch>().unwrap_err();
        assert!(err.to_string().contains("invalid encoding"));
    }

    #[test]
    fn rejects_headerless_hunk_body() {
        let err = "@@ -0,0 +0,0 @@\n".parse::<Patch>().unwrap_err();
        assert!(err.to_string().contains("no body"));
    }
}
