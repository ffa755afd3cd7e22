//! Edit scripts between two texts
//!
//! Character-level Myers diff from [`similar`], followed by a semantic
//! cleanup pass that folds short equalities into the surrounding edits so
//! that hunks describe whole-word changes instead of scattered characters.

use similar::{Algorithm, DiffTag, TextDiff};
use std::time::Duration;

/// One step of an edit script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Text present in both old and new
    Equal(String),
    /// Text only present in old
    Delete(String),
    /// Text only present in new
    Insert(String),
}

impl Edit {
    /// Text carried by this edit
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Equal(t) | Self::Delete(t) | Self::Insert(t) => t,
        }
    }

    /// Length in characters
    #[inline]
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text().chars().count()
    }

    /// Whether this edit consumes old text (equal or delete)
    #[inline]
    #[must_use]
    pub fn in_old(&self) -> bool {
        !matches!(self, Self::Insert(_))
    }

    /// Whether this edit produces new text (equal or insert)
    #[inline]
    #[must_use]
    pub fn in_new(&self) -> bool {
        !matches!(self, Self::Delete(_))
    }
}

/// Alternating form used by the cleanup pass
#[derive(Debug, Clone, PartialEq, Eq)]
enum Chunk {
    Equal(String),
    Change { delete: String, insert: String },
}

/// Compute a semantically cleaned edit script turning `old` into `new`
///
/// `timeout` bounds the Myers search; past the deadline the diff is still
/// correct but may not be minimal.
#[must_use]
pub fn edit_script(old: &str, new: &str, timeout: Option<Duration>) -> Vec<Edit> {
    if old == new {
        return if old.is_empty() {
            Vec::new()
        } else {
            vec![Edit::Equal(old.to_string())]
        };
    }

    let mut config = TextDiff::configure();
    config.algorithm(Algorithm::Myers);
    if let Some(timeout) = timeout {
        config.timeout(timeout);
    }
    let diff = config.diff_chars(old, new);
    let old_slices = diff.old_slices();
    let new_slices = diff.new_slices();

    let mut chunks = Vec::with_capacity(diff.ops().len());
    for op in diff.ops() {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        let old_text = old_slices[old_range].concat();
        let new_text = new_slices[new_range].concat();
        chunks.push(match tag {
            DiffTag::Equal => Chunk::Equal(old_text),
            DiffTag::Delete => Chunk::Change {
                delete: old_text,
                insert: String::new(),
            },
            DiffTag::Insert => Chunk::Change {
                delete: String::new(),
                insert: new_text,
            },
            DiffTag::Replace => Chunk::Change {
                delete: old_text,
                insert: new_text,
            },
        });
    }

    into_edits(cleanup_semantic(normalize(chunks)))
}

/// Merge neighbouring chunks of the same kind and drop empty ones
fn normalize(chunks: Vec<Chunk>) -> Vec<Chunk> {
    let mut out: Vec<Chunk> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        match (out.last_mut(), chunk) {
            (_, Chunk::Equal(text)) if text.is_empty() => {}
            (_, Chunk::Change { delete, insert }) if delete.is_empty() && insert.is_empty() => {}
            (Some(Chunk::Equal(prev)), Chunk::Equal(text)) => prev.push_str(&text),
            (
                Some(Chunk::Change {
                    delete: prev_delete,
                    insert: prev_insert,
                }),
                Chunk::Change { delete, insert },
            ) => {
                prev_delete.push_str(&delete);
                prev_insert.push_str(&insert);
            }
            (_, chunk) => out.push(chunk),
        }
    }
    out
}

/// Fold equalities that are no longer than the changes on both sides
///
/// An equality of `n` characters between two changes is absorbed when
/// each neighbouring change deletes or inserts at least `n` characters.
fn cleanup_semantic(mut chunks: Vec<Chunk>) -> Vec<Chunk> {
    loop {
        let mut folded = false;

        for i in 1..chunks.len().saturating_sub(1) {
            let (
                Chunk::Change {
                    delete: d1,
                    insert: i1,
                },
                Chunk::Equal(eq),
                Chunk::Change {
                    delete: d2,
                    insert: i2,
                },
            ) = (&chunks[i - 1], &chunks[i], &chunks[i + 1])
            else {
                continue;
            };

            let eq_len = eq.chars().count();
            let before = d1.chars().count().max(i1.chars().count());
            let after = d2.chars().count().max(i2.chars().count());
            if eq_len > before || eq_len > after {
                continue;
            }

            let merged = Chunk::Change {
                delete: format!("{d1}{eq}{d2}"),
                insert: format!("{i1}{eq}{i2}"),
            };
            chunks.splice(i - 1..=i + 1, std::iter::once(merged));
            folded = true;
            break;
        }

        chunks = normalize(chunks);
        if !folded {
            return chunks;
        }
    }
}

fn into_edits(chunks: Vec<Chunk>) -> Vec<Edit> {
    let mut edits = Vec::with_capacity(chunks.len() * 2);
    for chunk in chunks {
        match chunk {
            Chunk::Equal(text) => edits.push(Edit::Equal(text)),
            Chunk::Change { delete, insert } => {
                if !delete.is_empty() {
                    edits.push(Edit::Delete(delete));
                }
                if !insert.is_empty() {
                    edits.push(Edit::Insert(insert));
                }
            }
        }
    }
    edits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rebuild(edits: &[Edit]) -> (String, String) {
        let old = edits
            .iter()
            .filter(|e| e.in_old())
            .map(Edit::text)
            .collect();
        let new = edits
            .iter()
            .filter(|e| e.in_new())
            .map(Edit::text)
            .collect();
        (old, new)
    }

    #[test]
    fn identical_texts_are_one_equality() {
        let edits = edit_script("same", "same", None);
        assert_eq!(edits, vec![Edit::Equal("same".to_string())]);
        assert!(edit_script("", "", None).is_empty());
    }

    #[test]
    fn insertion_in_the_middle() {
        let edits = edit_script("Hello world", "Hello brave world", None);
        assert_eq!(
            edits,
            vec![
                Edit::Equal("Hello ".to_string()),
                Edit::Insert("brave ".to_string()),
                Edit::Equal("world".to_string()),
            ]
        );
    }

    #[test]
    fn edit_script_reconstructs_both_sides() {
        let old = "The quick brown fox jumps over the lazy dog";
        let new = "The quick red fox leaped over a lazy dog!";
        let (a, b) = rebuild(&edit_script(old, new, None));
        assert_eq!(a, old);
        assert_eq!(b, new);
    }

    #[test]
    fn short_equalities_are_folded() {
        let chunks = vec![
            Chunk::Change {
                delete: "abc".to_string(),
                insert: "xyz".to_string(),
            },
            Chunk::Equal("d".to_string()),
            Chunk::Change {
                delete: "efg".to_string(),
                insert: "uvw".to_string(),
            },
        ];
        let cleaned = cleanup_semantic(chunks);
        assert_eq!(
            cleaned,
            vec![Chunk::Change {
                delete: "abcdefg".to_string(),
                insert: "xyzduvw".to_string(),
            }]
        );
    }

    #[test]
    fn long_equalities_survive_cleanup() {
        let chunks = vec![
            Chunk::Change {
                delete: "a".to_string(),
                insert: String::new(),
            },
            Chunk::Equal("a long shared run".to_string()),
            Chunk::Change {
                delete: String::new(),
                insert: "b".to_string(),
            },
        ];
        assert_eq!(cleanup_semantic(chunks.clone()), chunks);
    }

    #[test]
    fn normalize_merges_and_drops() {
        let chunks = vec![
            Chunk::Equal("a".to_string()),
            Chunk::Equal(String::new()),
            Chunk::Equal("b".to_string()),
            Chunk::Change {
                delete: "c".to_string(),
                insert: String::new(),
            },
            Chunk::Change {
                delete: String::new(),
                insert: "d".to_string(),
            },
        ];
        assert_eq!(
            normalize(chunks),
            vec![
                Chunk::Equal("ab".to_string()),
                Chunk::Change {
                    delete: "c".to_string(),
                    insert: "d".to_string(),
                },
            ]
        );
    }
}
