//! Built-in token color themes.
//!
//! Token classes are scope atoms produced by the tokenizer (`keyword`,
//! `string-quoted`, `entity-name`, ...). A theme maps single classes to
//! styles and lists combined overrides that apply when every class in a set
//! is present on one token.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenStyle {
    pub color: &'static str,
    pub bold: bool,
    pub italic: bool,
}

impl TokenStyle {
    const fn plain(color: &'static str) -> Self {
        Self {
            color,
            bold: false,
            italic: false,
        }
    }

    const fn italic(color: &'static str) -> Self {
        Self {
            color,
            bold: false,
            italic: true,
        }
    }

    const fn bold(color: &'static str) -> Self {
        Self {
            color,
            bold: true,
            italic: false,
        }
    }

    /// Inline CSS declarations for this style.
    pub fn css(&self) -> String {
        let mut css = format!("color: {}", self.color);
        if self.bold {
            css.push_str("; font-weight: bold");
        }
        if self.italic {
            css.push_str("; font-style: italic");
        }
        css
    }
}

#[derive(Debug)]
pub struct Theme {
    pub name: &'static str,
    pub styles: &'static [(&'static str, TokenStyle)],
    /// Evaluated in order before `styles`.
    pub overrides: &'static [(&'static [&'static str], TokenStyle)],
}

pub const DEFAULT_THEME: &str = "one-dark";

pub static THEMES: &[Theme] = &[ONE_DARK, GITHUB_LIGHT, GITHUB_DARK];

const ONE_DARK: Theme = Theme {
    name: "one-dark",
    styles: &[
        ("comment", TokenStyle::italic("#5c6370")),
        ("keyword-operator", TokenStyle::plain("#56b6c2")),
        ("keyword", TokenStyle::plain("#c678dd")),
        ("storage", TokenStyle::plain("#c678dd")),
        ("string", TokenStyle::plain("#98c379")),
        ("constant-numeric", TokenStyle::plain("#d19a66")),
        ("constant", TokenStyle::plain("#d19a66")),
        ("entity-name", TokenStyle::plain("#61afef")),
        ("entity", TokenStyle::plain("#e5c07b")),
        ("support", TokenStyle::plain("#56b6c2")),
        ("variable", TokenStyle::plain("#e06c75")),
        ("punctuation", TokenStyle::plain("#abb2bf")),
        ("markup-heading", TokenStyle::bold("#e06c75")),
    ],
    overrides: &[
        (&["punctuation", "string"], TokenStyle::plain("#98c379")),
        (&["punctuation", "comment"], TokenStyle::italic("#5c6370")),
    ],
};

const GITHUB_LIGHT: Theme = Theme {
    name: "github-light",
    styles: &[
        ("comment", TokenStyle::plain("#6a737d")),
        ("keyword", TokenStyle::plain("#d73a49")),
        ("storage", TokenStyle::plain("#d73a49")),
        ("string", TokenStyle::plain("#032f62")),
        ("constant", TokenStyle::plain("#005cc5")),
        ("entity-name", TokenStyle::plain("#6f42c1")),
        ("entity", TokenStyle::plain("#6f42c1")),
        ("support", TokenStyle::plain("#005cc5")),
        ("variable", TokenStyle::plain("#e36209")),
        ("punctuation", TokenStyle::plain("#24292e")),
        ("markup-heading", TokenStyle::bold("#005cc5")),
    ],
    overrides: &[
        (&["punctuation", "string"], TokenStyle::plain("#032f62")),
        (&["punctuation", "comment"], TokenStyle::plain("#6a737d")),
    ],
};

const GITHUB_DARK: Theme = Theme {
    name: "github-dark",
    styles: &[
        ("comment", TokenStyle::plain("#8b949e")),
        ("keyword", TokenStyle::plain("#ff7b72")),
        ("storage", TokenStyle::plain("#ff7b72")),
        ("string", TokenStyle::plain("#a5d6ff")),
        ("constant", TokenStyle::plain("#79c0ff")),
        ("entity-name", TokenStyle::plain("#d2a8ff")),
        ("entity", TokenStyle::plain("#d2a8ff")),
        ("support", TokenStyle::plain("#79c0ff")),
        ("variable", TokenStyle::plain("#ffa657")),
        ("punctuation", TokenStyle::plain("#c9d1d9")),
        ("markup-heading", TokenStyle::bold("#1f6feb")),
    ],
    overrides: &[
        (&["punctuation", "string"], TokenStyle::plain("#a5d6ff")),
        (&["punctuation", "comment"], TokenStyle::plain("#8b949e")),
    ],
};

/// Looks a theme up by name.
pub fn theme(name: &str) -> Option<&'static Theme> {
    THEMES.iter().find(|t| t.name == name)
}

/// The theme after `name` in [`THEMES`], wrapping around.
pub fn next_theme(name: &str) -> &'static str {
    let index = THEMES.iter().position(|t| t.name == name).unwrap_or(0);
    THEMES[(index + 1) % THEMES.len()].name
}
