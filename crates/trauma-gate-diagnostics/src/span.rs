//! Byte spans inside evidence text

use serde::{Deserialize, Serialize};

/// A span in a block of evidence text, represented as a byte range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Create a new span from start and end offsets
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Merge two spans into one that covers both
    #[inline]
    pub fn merge(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// The span of up to `chars` characters immediately before this span.
    ///
    /// Window sizes are counted in characters, so the result always falls on
    /// UTF-8 boundaries of `text`.
    pub fn window_before(&self, text: &str, chars: usize) -> Span {
        let end = self.start.min(text.len());
        let start = text[..end]
            .char_indices()
            .rev()
            .take(chars)
            .last()
            .map(|(i, _)| i)
            .unwrap_or(end);
        Span::new(start, end)
    }

    /// The span of up to `chars` characters immediately after this span.
    pub fn window_after(&self, text: &str, chars: usize) -> Span {
        let start = self.end.min(text.len());
        let end = text[start..]
            .char_indices()
            .nth(chars)
            .map(|(i, _)| start + i)
            .unwrap_or(text.len());
        Span::new(start, end)
    }

    /// This span widened by `before` characters on the left and `after` on the right
    pub fn widen(&self, text: &str, before: usize, after: usize) -> Span {
        self.window_before(text, before)
            .merge(self.window_after(text, after))
    }

    /// Slice `text` by this span, clamped to the text bounds
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        let end = self.end.min(text.len());
        let start = self.start.min(end);
        text.get(start..end).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge() {
        let a = Span::new(0, 5);
        let b = Span::new(3, 10);
        assert_eq!(a.merge(b), Span::new(0, 10));
    }

    #[test]
    fn test_windows_respect_char_boundaries() {
        let text = "énorme fracture";
        let hit = Span::new(8, 16);
        let before = hit.window_before(text, 3);
        assert_eq!(before.slice(text), "me ");
        let all_before = hit.window_before(text, 400);
        assert_eq!(all_before.slice(text), "énorme ");
        assert_eq!(hit.window_after(text, 10).slice(text), "");
        assert_eq!(hit.widen(text, 2, 0).slice(text), "e fracture");
    }

    #[test]
    fn test_slice_is_clamped() {
        assert_eq!(Span::new(4, 99).slice("hip fracture"), "fracture");
        assert_eq!(Span::new(20, 30).slice("hip"), "");
    }
}
