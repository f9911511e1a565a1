use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::context::{DecorationVersion, PluginContext};
use crate::highlight::{HighlighterState, SubscriptionId};

use super::{DecorationSet, EditorState, build_decorations};

/// What changed in an editor view since the last update.
#[derive(Debug, Clone, Copy)]
pub struct ViewUpdate<'a> {
    pub state: &'a EditorState,
    pub doc_changed: bool,
    pub viewport_changed: bool,
}

/// Per-view owner of a cached [`DecorationSet`].
///
/// The set is rebuilt when the document or viewport changed, or when the
/// shared decoration version moved past the one the cache was built at.
/// Otherwise the cached `Rc` is returned as is.
pub struct LiveDecorator {
    version: DecorationVersion,
    built_version: Option<u64>,
    cached: Option<Rc<DecorationSet>>,
    highlighter: Rc<RefCell<HighlighterState>>,
    subscription: Option<SubscriptionId>,
    refresh_requested: Rc<Cell<bool>>,
    rebuilds: usize,
}

impl LiveDecorator {
    /// Creates a decorator and subscribes it to the highlighter so the
    /// hosting view can be asked to refresh.
    ///
    /// Created while the highlighter is borrowed (inside
    /// [`PluginContext::with_env`]), the decorator has no subscription and
    /// relies on the version counter alone.
    pub fn new(ctx: &PluginContext) -> Self {
        let highlighter = ctx.highlighter_handle();
        let refresh_requested = Rc::new(Cell::new(false));
        let flag = refresh_requested.clone();
        let subscription = match highlighter.try_borrow_mut() {
            Ok(mut hl) => Some(hl.subscribe(move |_| flag.set(true))),
            Err(_) => {
                log::warn!("Highlighter is busy; live decorator created without a subscription");
                None
            }
        };

        Self {
            version: ctx.version().clone(),
            built_version: None,
            cached: None,
            highlighter,
            subscription,
            refresh_requested,
            rebuilds: 0,
        }
    }

    pub fn needs_rebuild(&self, update: &ViewUpdate<'_>) -> bool {
        self.cached.is_none()
            || update.doc_changed
            || update.viewport_changed
            || self.built_version != Some(self.version.current())
    }

    pub fn update(&mut self, update: &ViewUpdate<'_>, ctx: &PluginContext) -> Rc<DecorationSet> {
        if let Some(cached) = &self.cached
            && !self.needs_rebuild(update)
        {
            return cached.clone();
        }

        let version = self.version.current();
        let set = Rc::new(ctx.with_env(|env| build_decorations(update.state, env)));
        log::debug!(
            "Rebuilt {} decorations at version {version}",
            set.len()
        );
        self.built_version = Some(version);
        self.cached = Some(set.clone());
        self.refresh_requested.set(false);
        self.rebuilds += 1;
        set
    }

    /// True once the highlighter changed since the last rebuild. The view
    /// should then run an update even without edits.
    pub fn wants_refresh(&self) -> bool {
        self.refresh_requested.get()
    }

    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    /// Drops the cache and the highlighter subscription.
    pub fn destroy(&mut self) {
        if let Some(id) = self.subscription.take()
            && let Ok(mut hl) = self.highlighter.try_borrow_mut()
        {
            hl.unsubscribe(id);
        }
        self.cached = None;
        self.built_version = None;
    }
}

impl Drop for LiveDecorator {
    fn drop(&mut self) {
        // The highlighter may be mid-notification if the view is dropped
        // from a subscriber; leave the subscription then.
        if let Some(id) = self.subscription.take()
            && let Ok(mut hl) = self.highlighter.try_borrow_mut()
        {
            hl.unsubscribe(id);
        }
    }
}
