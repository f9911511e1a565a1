/// A byte range `[start, end)` into a document buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    /// Inclusive start byte offset.
    pub start: usize,
    /// Exclusive end byte offset.
    pub end: usize,
}

impl Span {
    /// Returns the length in bytes. Uses saturating subtraction for safety.
    #[must_use]
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the span is empty (start >= end).
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// True if the two ranges share at least one byte, or if an empty
    /// `other` sits inside `self`.
    #[must_use]
    pub fn intersects(self, other: std::ops::Range<usize>) -> bool {
        if other.start == other.end {
            return self.start <= other.start && other.start < self.end.max(self.start + 1);
        }
        self.start < other.end && other.start < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersects_overlapping_ranges() {
        let sp = Span { start: 10, end: 20 };
        assert!(sp.intersects(15..30));
        assert!(sp.intersects(0..11));
        assert!(!sp.intersects(20..30));
        assert!(!sp.intersects(0..10));
    }

    #[test]
    fn intersects_empty_range_inside() {
        let sp = Span { start: 10, end: 20 };
        assert!(sp.intersects(12..12));
        assert!(!sp.intersects(25..25));
    }
}
