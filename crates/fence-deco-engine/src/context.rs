//! The explicitly owned plugin context.
//!
//! Everything that would otherwise be process-wide state (the highlighter,
//! the decoration version counter, the injected stylesheet) lives in a
//! [`PluginContext`] created on activation and torn down on deactivation.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use fence_deco_config::{IconRegistry, IconSet, LanguageTable, Settings};

use crate::dom::{Dom, NodeId};
use crate::highlight::{HighlighterState, SubscriptionId, SyntectTokenizer, Tokenizer};

pub const STYLE_ELEMENT_ID: &str = "fence-deco-styles";

/// Shared, monotonically increasing decoration version.
///
/// Live decorators compare the value they last built against with
/// [`DecorationVersion::current`]; a bump invalidates every cached set.
#[derive(Debug, Clone, Default)]
pub struct DecorationVersion(Rc<Cell<u64>>);

impl DecorationVersion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.get()
    }

    /// Increments the version and returns the new value.
    pub fn bump(&self) -> u64 {
        let next = self.0.get() + 1;
        self.0.set(next);
        next
    }
}

/// Read-only view of everything a decoration pass needs.
pub struct DecorationEnv<'a> {
    pub settings: &'a Settings,
    pub languages: &'a LanguageTable,
    pub icons: &'a dyn IconRegistry,
    pub highlighter: &'a HighlighterState,
    pub tokenizer: &'a dyn Tokenizer,
}

pub struct PluginContext {
    highlighter: Rc<RefCell<HighlighterState>>,
    version: DecorationVersion,
    languages: LanguageTable,
    icons: Box<dyn IconRegistry>,
    tokenizer: Box<dyn Tokenizer>,
    styles_dirty: Rc<Cell<bool>>,
    style_element: Option<NodeId>,
    subscription: Option<SubscriptionId>,
}

impl PluginContext {
    /// Builds the context and starts the highlighter.
    ///
    /// Every highlighter notification bumps the decoration version; reloads
    /// additionally mark the stylesheet stale.
    pub fn activate(settings: Settings) -> Self {
        Self::with_collaborators(
            settings,
            Box::new(IconSet::builtin()),
            Box::new(SyntectTokenizer::new()),
        )
    }

    pub fn with_collaborators(
        settings: Settings,
        icons: Box<dyn IconRegistry>,
        tokenizer: Box<dyn Tokenizer>,
    ) -> Self {
        let languages = settings.language_table();
        let highlighter = Rc::new(RefCell::new(HighlighterState::new(settings)));
        let version = DecorationVersion::new();
        let styles_dirty = Rc::new(Cell::new(true));

        let subscription = {
            let mut hl = highlighter.borrow_mut();
            let bump = version.clone();
            let id = hl.subscribe(move |event| {
                let v = bump.bump();
                log::debug!("Decoration version {v} after {event:?}");
            });
            let dirty = styles_dirty.clone();
            hl.on_reload(move || dirty.set(true));
            hl.start();
            id
        };

        Self {
            highlighter,
            version,
            languages,
            icons,
            tokenizer,
            styles_dirty,
            style_element: None,
            subscription: Some(subscription),
        }
    }

    pub fn version(&self) -> &DecorationVersion {
        &self.version
    }

    pub fn highlighter(&self) -> Ref<'_, HighlighterState> {
        self.highlighter.borrow()
    }

    /// Shared handle for live decorators that watch the highlighter.
    pub fn highlighter_handle(&self) -> Rc<RefCell<HighlighterState>> {
        self.highlighter.clone()
    }

    pub fn languages(&self) -> &LanguageTable {
        &self.languages
    }

    /// Applies new settings: rebuilds the language table and forwards them
    /// to the highlighter, which bumps the version. A theme change marks the
    /// stylesheet stale.
    pub fn update_settings(&mut self, settings: Settings) {
        self.languages = settings.language_table();
        let theme_changed = self.highlighter.borrow().settings().theme != settings.theme;
        self.highlighter.borrow_mut().update_settings(settings);
        if theme_changed {
            self.styles_dirty.set(true);
        }
    }

    /// Turns token highlighting on or off.
    pub fn set_highlighting(&mut self, on: bool) {
        let mut hl = self.highlighter.borrow_mut();
        if on {
            hl.start();
        } else {
            hl.stop();
        }
    }

    pub fn reload(&mut self) {
        self.highlighter.borrow_mut().reload();
    }

    /// Runs `f` with a borrowed [`DecorationEnv`].
    pub fn with_env<R>(&self, f: impl FnOnce(&DecorationEnv<'_>) -> R) -> R {
        let hl = self.highlighter.borrow();
        let env = DecorationEnv {
            settings: hl.settings(),
            languages: &self.languages,
            icons: self.icons.as_ref(),
            highlighter: &hl,
            tokenizer: self.tokenizer.as_ref(),
        };
        f(&env)
    }

    /// Injects the theme stylesheet into `head`. Replaces a previous
    /// element if one was installed.
    pub fn install_styles(&mut self, dom: &mut Dom, head: NodeId) -> NodeId {
        if let Some(old) = self.style_element.take() {
            dom.detach(old);
        }
        let style = dom.create_element("style");
        dom.set_attr(style, "id", STYLE_ELEMENT_ID);
        dom.set_text(style, &self.highlighter.borrow().css_text());
        dom.append_child(head, style);
        self.style_element = Some(style);
        self.styles_dirty.set(false);
        style
    }

    /// Rewrites the stylesheet text if it went stale. Returns true if it
    /// was rewritten.
    pub fn sync_styles(&mut self, dom: &mut Dom) -> bool {
        let Some(style) = self.style_element else {
            return false;
        };
        if !self.styles_dirty.get() {
            return false;
        }
        dom.set_text(style, &self.highlighter.borrow().css_text());
        self.styles_dirty.set(false);
        true
    }

    /// Stops the highlighter, removes the stylesheet and drops the version
    /// subscription.
    pub fn deactivate(&mut self, dom: Option<&mut Dom>) {
        if let (Some(dom), Some(style)) = (dom, self.style_element.take()) {
            dom.detach(style);
        }
        let mut hl = self.highlighter.borrow_mut();
        hl.stop();
        if let Some(id) = self.subscription.take() {
            hl.unsubscribe(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn activation_starts_highlighter_and_bumps_version() {
        let ctx = PluginContext::activate(Settings::default());

        assert!(ctx.highlighter().is_active());
        assert_eq!(ctx.version().current(), 1);
    }

    #[test]
    fn every_settings_change_bumps_version() {
        let mut ctx = PluginContext::activate(Settings::default());
        let before = ctx.version().current();

        ctx.update_settings(Settings {
            show_line_numbers: true,
            ..Settings::default()
        });
        ctx.reload();

        assert_eq!(ctx.version().current(), before + 2);
    }

    #[test]
    fn version_clones_share_the_counter() {
        let version = DecorationVersion::new();
        let other = version.clone();

        other.bump();

        assert_eq!(version.current(), 1);
    }

    #[test]
    fn styles_resync_after_theme_change() {
        let mut ctx = PluginContext::activate(Settings::default());
        let mut dom = Dom::new();
        let head = dom.create_element("head");
        let style = ctx.install_styles(&mut dom, head);
        let before = dom.text_content(style);

        assert!(!ctx.sync_styles(&mut dom));

        ctx.update_settings(Settings {
            theme: "github-light".to_string(),
            ..Settings::default()
        });
        assert!(ctx.sync_styles(&mut dom));
        assert_ne!(dom.text_content(style), before);
    }

    #[test]
    fn deactivate_removes_style_and_stops_bumping() {
        let mut ctx = PluginContext::activate(Settings::default());
        let mut dom = Dom::new();
        let head = dom.create_element("head");
        ctx.install_styles(&mut dom, head);

        ctx.deactivate(Some(&mut dom));
        let version = ctx.version().current();
        ctx.reload();

        assert!(dom.children(head).is_empty());
        assert!(!ctx.highlighter().is_active());
        assert_eq!(ctx.version().current(), version);
    }

    #[test]
    fn env_exposes_current_settings() {
        let mut ctx = PluginContext::activate(Settings::default());
        ctx.update_settings(Settings {
            ignore_languages: vec!["mermaid".to_string()],
            ..Settings::default()
        });

        assert!(ctx.with_env(|env| env.settings.is_ignored("mermaid")));
    }
}
