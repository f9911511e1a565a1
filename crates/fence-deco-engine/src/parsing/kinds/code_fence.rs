#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceKind {
    Backticks,
    Tildes,
}

impl FenceKind {
    pub fn marker(self) -> char {
        match self {
            FenceKind::Backticks => '`',
            FenceKind::Tildes => '~',
        }
    }
}

/// The opening delimiter of a fenced block: its character and run length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FenceSig {
    pub kind: FenceKind,
    pub len: usize,
}

/// A fence-open line split into delimiter and info string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FenceOpen<'a> {
    pub sig: FenceSig,
    /// Everything after the marker run, untrimmed.
    pub info: &'a str,
}

pub struct CodeFence;

impl CodeFence {
    pub const MIN_LEN: usize = 3;

    /// Detects a fence delimiter at the start of `remainder` (leading
    /// whitespace allowed). Quote prefixes must already be stripped.
    pub fn sig(remainder: &str) -> Option<FenceSig> {
        let t = remainder.trim_end_matches(['\r', '\n']).trim_start();
        let kind = match t.chars().next()? {
            '`' => FenceKind::Backticks,
            '~' => FenceKind::Tildes,
            _ => return None,
        };
        let len = t.chars().take_while(|&c| c == kind.marker()).count();
        (len >= Self::MIN_LEN).then_some(FenceSig { kind, len })
    }

    /// Parses a fence-open line. Backtick info strings may not contain
    /// backticks, otherwise the line is inline code rather than a fence.
    pub fn open(remainder: &str) -> Option<FenceOpen<'_>> {
        let t = remainder.trim_end_matches(['\r', '\n']).trim_start();
        let sig = Self::sig(t)?;
        let info = &t[sig.len..];
        if sig.kind == FenceKind::Backticks && info.contains('`') {
            return None;
        }
        Some(FenceOpen { sig, info })
    }

    /// True if `remainder` is a pure closing fence for `open`: same
    /// character, at least as long, nothing but whitespace after it.
    pub fn closes(open: FenceSig, remainder: &str) -> bool {
        let t = remainder.trim();
        match Self::sig(t) {
            Some(sig) => {
                sig.kind == open.kind && sig.len >= open.len && t[sig.len..].trim().is_empty()
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_backtick_fence() {
        assert_eq!(
            CodeFence::sig("```rust"),
            Some(FenceSig {
                kind: FenceKind::Backticks,
                len: 3
            })
        );
    }

    #[test]
    fn detect_long_tilde_fence() {
        assert_eq!(
            CodeFence::sig("~~~~~"),
            Some(FenceSig {
                kind: FenceKind::Tildes,
                len: 5
            })
        );
    }

    #[test]
    fn no_fence() {
        assert_eq!(CodeFence::sig("hello"), None);
        assert_eq!(CodeFence::sig("``not"), None);
    }

    #[test]
    fn open_splits_info_string() {
        let open = CodeFence::open("  ```python title:x\n").unwrap();
        assert_eq!(open.info, "python title:x");
    }

    #[test]
    fn open_rejects_backtick_in_info() {
        assert!(CodeFence::open("```js `x`").is_none());
        assert!(CodeFence::open("~~~js `x`").is_some());
    }

    #[test]
    fn closes_matching_fence() {
        let open = CodeFence::sig("````").unwrap();
        assert!(CodeFence::closes(open, "````"));
        assert!(CodeFence::closes(open, "`````  "));
    }

    #[test]
    fn does_not_close_shorter_or_mismatched_fence() {
        let open = CodeFence::sig("````").unwrap();
        assert!(!CodeFence::closes(open, "```"));
        assert!(!CodeFence::closes(open, "~~~~"));
    }

    #[test]
    fn does_not_close_with_info_string() {
        let open = CodeFence::sig("```").unwrap();
        assert!(!CodeFence::closes(open, "```rust"));
    }
}
