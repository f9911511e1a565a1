use super::kinds::{BlockQuote, CodeFence, FenceOpen, FenceSig};

/// The role of one (quote-stripped) line in the fenced block structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceLine<'a> {
    Outside,
    Open(FenceOpen<'a>),
    Content,
    Close,
}

/// One raw line as seen by [`FenceTracker::step_line`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineStep<'a> {
    /// The line the automaton matched against: quote prefixes removed,
    /// except inside a block opened outside any quote.
    pub text: &'a str,
    pub role: FenceLine<'a>,
    /// A quoted block ended here without a closing fence.
    pub abandoned: bool,
}

/// Line-at-a-time fence automaton shared by every scanner.
///
/// A block is closed only by a pure fence of the same character that is
/// at least as long as the opener, so a ```` block may contain ``` lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct FenceTracker {
    open: Option<FenceSig>,
    quoted: bool,
}

impl FenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step<'a>(&mut self, stripped: &'a str) -> FenceLine<'a> {
        match self.open {
            Some(sig) => {
                if CodeFence::closes(sig, stripped) {
                    self.open = None;
                    FenceLine::Close
                } else {
                    FenceLine::Content
                }
            }
            None => match CodeFence::open(stripped) {
                Some(open) => {
                    self.open = Some(open.sig);
                    FenceLine::Open(open)
                }
                None => FenceLine::Outside,
            },
        }
    }

    /// Steps a raw document line, quote prefixes included.
    ///
    /// A block opened inside a blockquote ends with the quote run: the
    /// first unquoted line abandons it and is then read as a fresh line.
    /// A block opened outside any quote keeps `>` lines as raw content.
    pub fn step_line<'a>(&mut self, line: &'a str) -> LineStep<'a> {
        let quoted = BlockQuote::is_quoted(line);
        let abandoned = self.open.is_some() && self.quoted && !quoted;
        if abandoned {
            self.reset();
        }

        let text = if self.open.is_some() && !self.quoted {
            line
        } else {
            BlockQuote::strip(line)
        };
        let role = self.step(text);
        if let FenceLine::Open(_) = role {
            self.quoted = quoted;
        }
        LineStep {
            text,
            role,
            abandoned,
        }
    }

    /// Abandons any block in progress.
    pub fn reset(&mut self) {
        self.open = None;
    }

    pub fn in_block(&self) -> bool {
        self.open.is_some()
    }
}
