//! Copy-to-clipboard button state.
//!
//! A successful copy flips the button to "copied" and schedules a reset
//! [`COPY_RESET`] later. Resets are never cancelled: a reset scheduled by
//! an earlier click fires on time even if a later click happened since,
//! returning the button to idle early.

use std::time::{Duration, Instant};

use crate::dom::{Dom, NodeId};

pub const COPY_RESET: Duration = Duration::from_secs(2);
pub const IDLE_LABEL: &str = "Copy";
pub const COPIED_LABEL: &str = "Copied";
pub const COPIED_CLASS: &str = "is-copied";

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("Clipboard unavailable")]
    Unavailable,
    #[error("Clipboard write failed: {0}")]
    Write(String),
}

pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// Transient user-visible notices.
pub trait Notifier {
    fn notify(&mut self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyState {
    Idle,
    Copied,
}

#[derive(Debug)]
pub struct CopyButton {
    button: NodeId,
    code: NodeId,
    state: CopyState,
    resets: Vec<Instant>,
}

impl CopyButton {
    pub fn new(button: NodeId, code: NodeId) -> Self {
        Self {
            button,
            code,
            state: CopyState::Idle,
            resets: Vec::new(),
        }
    }

    pub fn state(&self) -> CopyState {
        self.state
    }

    pub fn button(&self) -> NodeId {
        self.button
    }

    /// Copies the code text. Failure shows a notice and leaves the button
    /// idle; it never propagates.
    pub fn click(
        &mut self,
        dom: &mut Dom,
        clipboard: &mut dyn Clipboard,
        notifier: &mut dyn Notifier,
        now: Instant,
    ) -> bool {
        let text = dom.text_content(self.code);
        match clipboard.write_text(&text) {
            Ok(()) => {
                self.set_state(dom, CopyState::Copied);
                self.resets.push(now + COPY_RESET);
                true
            }
            Err(e) => {
                log::warn!("Copy failed: {e}");
                notifier.notify("Failed to copy code");
                false
            }
        }
    }

    /// Fires every reset due at `now`.
    pub fn tick(&mut self, dom: &mut Dom, now: Instant) {
        let before = self.resets.len();
        self.resets.retain(|&due| due > now);
        if self.resets.len() != before {
            self.set_state(dom, CopyState::Idle);
        }
    }

    /// Next pending reset, if any.
    pub fn next_reset(&self) -> Option<Instant> {
        self.resets.iter().min().copied()
    }

    fn set_state(&mut self, dom: &mut Dom, state: CopyState) {
        self.state = state;
        match state {
            CopyState::Idle => {
                dom.remove_class(self.button, COPIED_CLASS);
                dom.set_text(self.button, IDLE_LABEL);
            }
            CopyState::Copied => {
                dom.add_class(self.button, COPIED_CLASS);
                dom.set_text(self.button, COPIED_LABEL);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct MemoryClipboard {
        text: Option<String>,
        fail: bool,
    }

    impl Clipboard for MemoryClipboard {
        fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            if self.fail {
                return Err(ClipboardError::Unavailable);
            }
            self.text = Some(text.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct Notices(Vec<String>);

    impl Notifier for Notices {
        fn notify(&mut self, message: &str) {
            self.0.push(message.to_string());
        }
    }

    fn setup() -> (Dom, CopyButton) {
        let mut dom = Dom::new();
        let button = dom.create_element("button");
        dom.set_text(button, IDLE_LABEL);
        let code = dom.create_element("code");
        dom.set_text(code, "ls -la\n");
        (dom, CopyButton::new(button, code))
    }

    #[test]
    fn click_copies_and_resets_after_delay() {
        let (mut dom, mut copy) = setup();
        let mut clipboard = MemoryClipboard::default();
        let mut notices = Notices::default();
        let t0 = Instant::now();

        assert!(copy.click(&mut dom, &mut clipboard, &mut notices, t0));
        assert_eq!(clipboard.text.as_deref(), Some("ls -la\n"));
        assert_eq!(dom.text_content(copy.button()), COPIED_LABEL);

        copy.tick(&mut dom, t0 + Duration::from_secs(1));
        assert_eq!(copy.state(), CopyState::Copied);

        copy.tick(&mut dom, t0 + COPY_RESET);
        assert_eq!(copy.state(), CopyState::Idle);
        assert_eq!(dom.text_content(copy.button()), IDLE_LABEL);
    }

    #[test]
    fn earlier_reset_stomps_later_copy() {
        let (mut dom, mut copy) = setup();
        let mut clipboard = MemoryClipboard::default();
        let mut notices = Notices::default();
        let t0 = Instant::now();

        copy.click(&mut dom, &mut clipboard, &mut notices, t0);
        copy.click(&mut dom, &mut clipboard, &mut notices, t0 + Duration::from_secs(1));
        copy.tick(&mut dom, t0 + COPY_RESET);

        assert_eq!(copy.state(), CopyState::Idle);
        assert_eq!(copy.next_reset(), Some(t0 + Duration::from_secs(3)));
    }

    #[test]
    fn failure_notifies_and_stays_idle() {
        let (mut dom, mut copy) = setup();
        let mut clipboard = MemoryClipboard {
            fail: true,
            ..MemoryClipboard::default()
        };
        let mut notices = Notices::default();

        assert!(!copy.click(&mut dom, &mut clipboard, &mut notices, Instant::now()));
        assert_eq!(copy.state(), CopyState::Idle);
        assert_eq!(notices.0, vec!["Failed to copy code".to_string()]);
        assert_eq!(copy.next_reset(), None);
    }
}
