//! Subrange selection shared by the array, string and bytes routines.
//!
//! Each bound is a signed index plus a "from end" flag. A from-end bound is
//! offset by `len - 1` before clamping; `first` clamps into `[0, len]` and
//! `last` into `[-1, len - 1]`. The selection `[first, last]` is inclusive, so
//! `last < first` selects nothing.

/// A clamped, inclusive range; `is_empty` when `last < first`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub first: usize,
    /// One past the last selected element.
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.first
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.first
    }
}

/// Resolve a pair of bounds against a sequence of `len` elements.
pub fn span(len: usize, first: i64, first_from_end: bool, last: i64, last_from_end: bool) -> Span {
    let top = len as i64 - 1;
    let mut first = if first_from_end {
        first.saturating_add(top)
    } else {
        first
    };
    let mut last = if last_from_end {
        last.saturating_add(top)
    } else {
        last
    };
    first = first.clamp(0, len as i64);
    last = last.clamp(-1, top);
    if last < first - 1 {
        last = first - 1;
    }
    Span {
        first: first as usize,
        end: (last + 1) as usize,
    }
}

/// Copy out the selected elements.
pub fn slice<T: Clone>(items: &[T], span: Span) -> Vec<T> {
    items[span.first..span.end].to_vec()
}

/// `prefix ++ replacement ++ suffix`, where prefix and suffix are the parts of
/// `items` outside the span.
pub fn splice<T: Clone>(items: &[T], replacement: &[T], span: Span) -> Vec<T> {
    let mut out = Vec::with_capacity(items.len() - span.len() + replacement.len());
    out.extend_from_slice(&items[..span.first]);
    out.extend_from_slice(replacement);
    out.extend_from_slice(&items[span.end..]);
    out
}
