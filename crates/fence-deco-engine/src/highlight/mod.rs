//! Token highlighting state shared by both surfaces.
//!
//! [`HighlighterState`] holds the active theme's precomputed style tables
//! and notifies subscribers synchronously on every mutating call. There is
//! no queue: subscribers run inside the call and must stay cheap. They must
//! not reach back into the state that is notifying them.

pub mod theme;
pub mod tokenizer;

use std::collections::HashMap;

use fence_deco_config::Settings;

pub use theme::{DEFAULT_THEME, THEMES, Theme, TokenStyle, next_theme};
pub use tokenizer::{SyntectTokenizer, Token, Tokenizer};

/// What changed in a [`HighlighterState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlighterEvent {
    Started,
    Stopped,
    SettingsChanged,
    Reloaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A style applied when a token carries every class in `classes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedOverride {
    pub classes: Vec<String>,
    pub style: TokenStyle,
}

type Subscriber = Box<dyn FnMut(HighlighterEvent)>;

pub struct HighlighterState {
    active: bool,
    settings: Settings,
    style_map: HashMap<String, TokenStyle>,
    combined_overrides: Vec<CombinedOverride>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    reload_callbacks: Vec<Box<dyn FnMut()>>,
    next_id: u64,
}

impl std::fmt::Debug for HighlighterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlighterState")
            .field("active", &self.active)
            .field("theme", &self.settings.theme)
            .field("styles", &self.style_map.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl HighlighterState {
    /// Creates an inactive state with styles computed for `settings.theme`.
    pub fn new(settings: Settings) -> Self {
        let mut state = Self {
            active: false,
            settings,
            style_map: HashMap::new(),
            combined_overrides: Vec::new(),
            subscribers: Vec::new(),
            reload_callbacks: Vec::new(),
            next_id: 0,
        };
        state.recompute_styles();
        state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Active and enabled in settings.
    pub fn is_enabled(&self) -> bool {
        self.active && self.settings.highlighter_enabled
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn start(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        self.notify(HighlighterEvent::Started);
    }

    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.notify(HighlighterEvent::Stopped);
    }

    /// Replaces the settings. Styles are recomputed only when the theme
    /// changed; subscribers are notified either way.
    pub fn update_settings(&mut self, settings: Settings) {
        let theme_changed = settings.theme != self.settings.theme;
        self.settings = settings;
        if theme_changed {
            self.recompute_styles();
        }
        self.notify(HighlighterEvent::SettingsChanged);
    }

    /// Recomputes styles, then runs reload callbacks and notifies.
    pub fn reload(&mut self) {
        self.recompute_styles();
        for callback in &mut self.reload_callbacks {
            callback();
        }
        self.notify(HighlighterEvent::Reloaded);
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(HighlighterEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn on_reload(&mut self, callback: impl FnMut() + 'static) {
        self.reload_callbacks.push(Box::new(callback));
    }

    fn notify(&mut self, event: HighlighterEvent) {
        log::debug!("Highlighter {event:?}, {} subscribers", self.subscribers.len());
        for (_, subscriber) in &mut self.subscribers {
            subscriber(event);
        }
    }

    fn recompute_styles(&mut self) {
        let theme = theme::theme(&self.settings.theme).unwrap_or_else(|| {
            log::warn!(
                "Unknown theme {:?}, using {DEFAULT_THEME}",
                self.settings.theme
            );
            THEMES
                .iter()
                .find(|t| t.name == DEFAULT_THEME)
                .unwrap_or(&THEMES[0])
        });
        self.style_map = theme
            .styles
            .iter()
            .map(|(class, style)| (class.to_string(), *style))
            .collect();
        self.combined_overrides = theme
            .overrides
            .iter()
            .map(|(classes, style)| CombinedOverride {
                classes: classes.iter().map(|c| c.to_string()).collect(),
                style: *style,
            })
            .collect();
    }

    /// Style for a token with `classes`: the first combined override whose
    /// classes are all present, else the first class with a style.
    pub fn style_for<S: AsRef<str>>(&self, classes: &[S]) -> Option<TokenStyle> {
        let has = |wanted: &str| classes.iter().any(|c| c.as_ref() == wanted);
        if let Some(o) = self
            .combined_overrides
            .iter()
            .find(|o| o.classes.iter().all(|c| has(c)))
        {
            return Some(o.style);
        }
        classes
            .iter()
            .find_map(|c| self.style_map.get(c.as_ref()).copied())
    }

    /// Stylesheet text for the current theme.
    pub fn css_text(&self) -> String {
        let mut rules: Vec<String> = self
            .style_map
            .iter()
            .map(|(class, style)| format!(".fence-deco-token.{class} {{ {}; }}", style.css()))
            .collect();
        rules.sort();
        rules.join("\n")
    }
}
