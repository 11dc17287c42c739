//! Span-based text rewriting.
//!
//! Compiled views and statement substitution never regenerate ECSQL from the
//! AST; they splice replacements into the original text at byte ranges the
//! parser recorded. Edits must not overlap.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range<usize>,
    pub replacement: String,
}

impl TextEdit {
    pub fn new(range: Range<usize>, replacement: impl Into<String>) -> Self {
        TextEdit {
            range,
            replacement: replacement.into(),
        }
    }

    fn within(&self, range: &Range<usize>) -> bool {
        self.range.start >= range.start && self.range.end <= range.end
    }
}

/// Render `text[range]` with every edit that falls inside `range` applied.
/// Edits straddling the range boundary are ignored.
pub fn render_range(text: &str, range: Range<usize>, edits: &[TextEdit]) -> String {
    let mut inside: Vec<&TextEdit> = edits.iter().filter(|e| e.within(&range)).collect();
    inside.sort_by_key(|e| e.range.start);

    let mut out = String::with_capacity(range.len());
    let mut cursor = range.start;
    for edit in inside {
        if edit.range.start < cursor {
            // Nested inside an edit already applied
            continue;
        }
        out.push_str(&text[cursor..edit.range.start]);
        out.push_str(&edit.replacement);
        cursor = edit.range.end;
    }
    out.push_str(&text[cursor..range.end]);
    out
}

/// Apply all edits to the whole text.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> String {
    render_range(text, 0..text.len(), edits)
}

/// Byte offset of `inner` inside `outer`. `inner` must be a subslice of `outer`.
pub fn subslice_offset(outer: &str, inner: &str) -> Option<usize> {
    let outer_start = outer.as_ptr() as usize;
    let inner_start = inner.as_ptr() as usize;
    if inner_start < outer_start || inner_start + inner.len() > outer_start + outer.len() {
        return None;
    }
    Some(inner_start - outer_start)
}

/// Byte range of `inner` inside `outer`.
pub fn subslice_range(outer: &str, inner: &str) -> Option<Range<usize>> {
    let start = subslice_offset(outer, inner)?;
    Some(start..start + inner.len())
}
