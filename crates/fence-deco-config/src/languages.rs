use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Presentation settings for one language.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Label shown in the header; the table key is used when empty.
    pub display_name: String,
    /// Language label color (`#rrggbb`).
    #[serde(alias = "language_color")]
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    /// Icon id looked up in the icon registry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Icon size in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_size: Option<u32>,
    pub aliases: Vec<String>,
}

impl LanguageConfig {
    fn new(display_name: &str, color: &str, icon: &str, aliases: &[&str]) -> Self {
        Self {
            display_name: display_name.to_string(),
            color: color.to_string(),
            icon: Some(icon.to_string()),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Overlays the non-empty fields of `other` onto `self`.
    fn overlay(&mut self, other: &LanguageConfig) {
        if !other.display_name.is_empty() {
            self.display_name = other.display_name.clone();
        }
        if !other.color.is_empty() {
            self.color = other.color.clone();
        }
        if other.title_color.is_some() {
            self.title_color = other.title_color.clone();
        }
        if other.border_color.is_some() {
            self.border_color = other.border_color.clone();
        }
        if other.icon.is_some() {
            self.icon = other.icon.clone();
        }
        if other.icon_size.is_some() {
            self.icon_size = other.icon_size;
        }
        for alias in &other.aliases {
            if !self.aliases.iter().any(|a| a.eq_ignore_ascii_case(alias)) {
                self.aliases.push(alias.clone());
            }
        }
    }
}

/// A language lookup result: the canonical table key and its config.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedLanguage<'a> {
    pub key: &'a str,
    pub config: &'a LanguageConfig,
}

impl ResolvedLanguage<'_> {
    pub fn display_name(&self) -> &str {
        if self.config.display_name.is_empty() {
            self.key
        } else {
            &self.config.display_name
        }
    }
}

/// Language configuration keyed by lowercase canonical name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LanguageTable {
    entries: BTreeMap<String, LanguageConfig>,
}

impl LanguageTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The languages shipped with the crate.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for (key, config) in [
            ("bash", LanguageConfig::new("Bash", "#89e051", "terminal", &["sh", "shell", "zsh"])),
            ("c", LanguageConfig::new("C", "#555555", "code", &["h"])),
            ("cpp", LanguageConfig::new("C++", "#f34b7d", "code", &["c++", "hpp", "cc"])),
            ("csharp", LanguageConfig::new("C#", "#178600", "code", &["c#", "cs"])),
            ("css", LanguageConfig::new("CSS", "#563d7c", "code", &[])),
            ("go", LanguageConfig::new("Go", "#00add8", "code", &["golang"])),
            ("html", LanguageConfig::new("HTML", "#e34c26", "code", &["xml", "svg"])),
            ("java", LanguageConfig::new("Java", "#b07219", "code", &[])),
            ("javascript", LanguageConfig::new("JavaScript", "#f1e05a", "code", &["js", "jsx", "mjs"])),
            ("json", LanguageConfig::new("JSON", "#292929", "braces", &["jsonc"])),
            ("markdown", LanguageConfig::new("Markdown", "#083fa1", "file", &["md"])),
            ("python", LanguageConfig::new("Python", "#3572a5", "code", &["py", "python3"])),
            ("ruby", LanguageConfig::new("Ruby", "#701516", "code", &["rb"])),
            ("rust", LanguageConfig::new("Rust", "#dea584", "code", &["rs"])),
            ("sql", LanguageConfig::new("SQL", "#e38c00", "code", &[])),
            ("toml", LanguageConfig::new("TOML", "#9c4221", "file", &[])),
            ("typescript", LanguageConfig::new("TypeScript", "#3178c6", "code", &["ts", "tsx"])),
            ("yaml", LanguageConfig::new("YAML", "#cb171e", "file", &["yml"])),
        ] {
            table.entries.insert(key.to_string(), config);
        }
        table
    }

    pub fn insert(&mut self, key: &str, config: LanguageConfig) {
        self.entries.insert(key.to_lowercase(), config);
    }

    /// Merges user overrides field by field; unknown keys are added.
    pub fn merge(&mut self, overrides: &BTreeMap<String, LanguageConfig>) {
        for (key, config) in overrides {
            self.entries
                .entry(key.to_lowercase())
                .or_default()
                .overlay(config);
        }
    }

    /// Looks up `language` by exact key, then by alias.
    pub fn resolve(&self, language: &str) -> Option<ResolvedLanguage<'_>> {
        let language = language.trim().to_lowercase();
        if language.is_empty() {
            return None;
        }
        if let Some((key, config)) = self.entries.get_key_value(&language) {
            return Some(ResolvedLanguage { key, config });
        }
        self.entries
            .iter()
            .find(|(_, config)| {
                config
                    .aliases
                    .iter()
                    .any(|alias| alias.to_lowercase() == language)
            })
            .map(|(key, config)| ResolvedLanguage { key, config })
    }

    /// Canonical key for `language`, if the table knows it.
    pub fn canonical_name(&self, language: &str) -> Option<&str> {
        self.resolve(language).map(|r| r.key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
