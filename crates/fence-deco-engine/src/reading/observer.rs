//! Late decoration of code blocks inside callouts.
//!
//! Hosts render callout bodies after the surrounding document, so their
//! `<pre>` elements appear (and settle) after the first decoration pass.
//! [`CalloutObserver`] reacts to inserted subtrees, and because the host
//! never says when rendering is finished it also polls a bounded number of
//! times after navigation and after scrolling settles.
//!
//! Each scan correlates callout `<pre>` elements with the fenced blocks in
//! the source's blockquotes: exact content first, then the same position,
//! then the only entry if there is just one.

use std::time::{Duration, Instant};

use crate::context::DecorationEnv;
use crate::dom::{Dom, NodeId};
use crate::locate::{CalloutFenceEntry, extract_callout_fence_entries};
use crate::parsing::{normalize, parse_fence_parameters};

use super::{
    DECORATED_CLASS, DecorateOutcome, PENDING_CLASS, SourceContext, decorate_with_fence_line,
    is_front_matter, is_in_callout, is_wrapped, refresh_header,
};

pub const POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const POLL_MAX_ATTEMPTS: u32 = 10;
pub const SCROLL_SETTLE: Duration = Duration::from_millis(150);

/// Bounded fixed-interval retry.
#[derive(Debug, Clone)]
pub struct Poller {
    interval: Duration,
    max_attempts: u32,
    attempts: u32,
    next_due: Option<Instant>,
}

impl Poller {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            attempts: 0,
            next_due: None,
        }
    }

    pub fn restart(&mut self, now: Instant) {
        self.attempts = 0;
        self.next_due = (self.max_attempts > 0).then(|| now + self.interval);
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// True if an attempt is due at `now`. Consumes the attempt and
    /// schedules the next one until the cap is reached.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if due <= now => {
                self.attempts += 1;
                self.next_due = (self.attempts < self.max_attempts).then(|| now + self.interval);
                true
            }
            _ => false,
        }
    }
}

/// Fires once scrolling has been quiet for the settle time.
#[derive(Debug, Clone)]
pub struct ScrollDebounce {
    settle: Duration,
    deadline: Option<Instant>,
}

impl ScrollDebounce {
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            deadline: None,
        }
    }

    pub fn on_scroll(&mut self, now: Instant) {
        self.deadline = Some(now + self.settle);
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }
}

/// What one scan did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub decorated: usize,
    pub refreshed: usize,
    /// Blocks marked decorated whose wrapper had been rendered away.
    pub unmarked: usize,
    pub unmatched: usize,
}

fn code_of(dom: &Dom, pre: NodeId) -> Option<NodeId> {
    dom.find_child(pre, |d, n| d.is_element(n, "code"))
}

fn is_callout_pre(dom: &Dom, node: NodeId) -> bool {
    dom.is_element(node, "pre")
        && is_in_callout(dom, node)
        && code_of(dom, node).is_some_and(|code| !is_front_matter(dom, node, code))
}

fn needs_decoration(dom: &Dom, pre: NodeId) -> bool {
    !dom.has_class(pre, PENDING_CLASS) && (!dom.has_class(pre, DECORATED_CLASS) || !is_wrapped(dom, pre))
}

/// True if some callout block under `root` still waits for decoration.
pub fn has_undecorated_callouts(dom: &Dom, root: NodeId) -> bool {
    dom.query_all(root, is_callout_pre)
        .into_iter()
        .any(|pre| needs_decoration(dom, pre))
}

fn correlate<'e>(
    entries: &'e [CalloutFenceEntry],
    index: usize,
    code_text: &str,
) -> Option<&'e CalloutFenceEntry> {
    let target = normalize(code_text);
    entries
        .iter()
        .find(|e| e.content == target)
        .or_else(|| entries.get(index))
        .or_else(|| match entries {
            [only] => Some(only),
            _ => None,
        })
}

#[derive(Debug)]
pub struct CalloutObserver {
    scan_scheduled: bool,
    poller: Poller,
    scroll: ScrollDebounce,
    torn_down: bool,
}

impl Default for CalloutObserver {
    fn default() -> Self {
        Self::new(POLL_INTERVAL, POLL_MAX_ATTEMPTS, SCROLL_SETTLE)
    }
}

impl CalloutObserver {
    pub fn new(interval: Duration, max_attempts: u32, settle: Duration) -> Self {
        Self {
            scan_scheduled: false,
            poller: Poller::new(interval, max_attempts),
            scroll: ScrollDebounce::new(settle),
            torn_down: false,
        }
    }

    pub fn is_scan_scheduled(&self) -> bool {
        self.scan_scheduled
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    /// Schedules a scan if any added subtree holds a callout block that
    /// still needs decoration. Returns whether a scan is scheduled.
    pub fn on_mutations(&mut self, dom: &Dom, added: &[NodeId]) -> bool {
        if self.torn_down {
            return false;
        }
        let relevant = added.iter().any(|&node| {
            dom.query_all(node, is_callout_pre)
                .into_iter()
                .any(|pre| needs_decoration(dom, pre) && !dom.has_class(pre, DECORATED_CLASS))
        });
        if relevant {
            self.scan_scheduled = true;
        }
        self.scan_scheduled
    }

    /// A view, file or layout change: scan soon and poll for late renders.
    pub fn on_view_change(&mut self, now: Instant) {
        if self.torn_down {
            return;
        }
        self.scan_scheduled = true;
        self.poller.restart(now);
    }

    pub fn on_scroll(&mut self, now: Instant) {
        if self.torn_down {
            return;
        }
        self.scroll.on_scroll(now);
    }

    /// Runs a scan if one is scheduled, a poll is due, or scrolling just
    /// settled. Polling stops once nothing is left to decorate.
    pub fn tick(
        &mut self,
        dom: &mut Dom,
        root: NodeId,
        env: &DecorationEnv<'_>,
        source: &SourceContext<'_>,
        now: Instant,
    ) -> Option<ScanReport> {
        if self.torn_down {
            return None;
        }
        let mut run = std::mem::take(&mut self.scan_scheduled);
        if self.poller.poll(now) {
            run = true;
        }
        if self.scroll.poll(now) {
            self.poller.restart(now);
            run = true;
        }
        if !run {
            return None;
        }

        let report = self.scan(dom, root, env, source);
        if !has_undecorated_callouts(dom, root) {
            self.poller.cancel();
        }
        Some(report)
    }

    /// Correlates every callout block under `root` with the source.
    pub fn scan(
        &mut self,
        dom: &mut Dom,
        root: NodeId,
        env: &DecorationEnv<'_>,
        source: &SourceContext<'_>,
    ) -> ScanReport {
        let mut report = ScanReport::default();
        let Some(text) = source.provider.source_text(source.path) else {
            log::debug!("Callout scan skipped: no source text");
            return report;
        };
        let entries = extract_callout_fence_entries(&text);
        let pres = dom.query_all(root, is_callout_pre);
        log::debug!(
            "Callout scan: {} blocks, {} source entries",
            pres.len(),
            entries.len()
        );

        for (index, pre) in pres.into_iter().enumerate() {
            if dom.has_class(pre, PENDING_CLASS) {
                continue;
            }
            if dom.has_class(pre, DECORATED_CLASS) && !is_wrapped(dom, pre) {
                dom.remove_class(pre, DECORATED_CLASS);
                report.unmarked += 1;
                continue;
            }
            let Some(code) = code_of(dom, pre) else {
                continue;
            };
            let code_text = dom.text_content(code);
            if code_text.trim().is_empty() {
                continue;
            }
            let Some(entry) = correlate(&entries, index, &code_text) else {
                report.unmatched += 1;
                continue;
            };

            if dom.has_class(pre, DECORATED_CLASS) {
                let mut params = parse_fence_parameters(Some(&entry.fence_line));
                if params.language.is_empty() {
                    params.language = super::class_language(dom, code).unwrap_or_default();
                }
                if refresh_header(dom, pre, &params, env) {
                    report.refreshed += 1;
                }
            } else if let DecorateOutcome::Decorated { .. } =
                decorate_with_fence_line(dom, pre, code, Some(&entry.fence_line), env)
            {
                report.decorated += 1;
            }
        }

        report
    }

    /// Cancels every pending scan, poll and debounce. The observer ignores
    /// all events afterwards.
    pub fn teardown(&mut self) {
        self.torn_down = true;
        self.scan_scheduled = false;
        self.poller.cancel();
        self.scroll.cancel();
    }

    /// Nothing scheduled and no timers running.
    pub fn is_idle(&self) -> bool {
        !self.scan_scheduled && !self.poller.is_running() && !self.scroll.is_pending()
    }
}
