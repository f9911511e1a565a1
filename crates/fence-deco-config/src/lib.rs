pub mod icons;
pub mod languages;

pub use icons::{Icon, IconRegistry, IconSet};
pub use languages::{LanguageConfig, LanguageTable, ResolvedLanguage};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Neutral color used when a language has no configured color.
pub const FALLBACK_COLOR: &str = "#8b949e";

/// User settings for code block decoration.
///
/// Every field has a default so a partial `config.toml` is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Notes folder opened by the terminal front end.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes_path: Option<PathBuf>,
    /// Highlighting theme identifier.
    pub theme: String,
    /// Whether token highlighting starts enabled.
    pub highlighter_enabled: bool,
    /// Let the tokenizer guess a language for unlabelled blocks.
    pub auto_detect_language: bool,
    /// Global line-number default, overridden per block by `ln:`.
    pub show_line_numbers: bool,
    pub show_copy_button: bool,
    pub show_language_icon: bool,
    /// Languages (or glob patterns such as `dataview*`) left undecorated.
    pub ignore_languages: Vec<String>,
    /// Color used for languages without a configured color.
    pub default_color: String,
    /// Per-language overrides merged over the built-in table.
    pub languages: BTreeMap<String, LanguageConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notes_path: None,
            theme: "one-dark".to_string(),
            highlighter_enabled: true,
            auto_detect_language: false,
            show_line_numbers: false,
            show_copy_button: true,
            show_language_icon: true,
            ignore_languages: Vec::new(),
            default_color: FALLBACK_COLOR.to_string(),
            languages: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut settings: Settings =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the notes path
        settings.notes_path = settings
            .notes_path
            .map(|p| Self::expand_path(&p).unwrap_or(p));

        Ok(Some(settings))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/fence-deco");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Returns true if blocks in `language` must be left undecorated.
    ///
    /// Entries are matched case-insensitively; entries containing glob
    /// metacharacters are treated as patterns. Empty languages are never
    /// ignored.
    pub fn is_ignored(&self, language: &str) -> bool {
        if language.is_empty() {
            return false;
        }
        let language = language.to_lowercase();
        self.ignore_languages.iter().any(|entry| {
            let entry = entry.trim().to_lowercase();
            if entry == language {
                return true;
            }
            match glob::Pattern::new(&entry) {
                Ok(pattern) => pattern.matches(&language),
                Err(e) => {
                    log::debug!("Ignoring malformed ignore-list pattern {entry:?}: {e}");
                    false
                }
            }
        })
    }

    /// Built-in language table with this user's overrides merged in.
    pub fn language_table(&self) -> LanguageTable {
        let mut table = LanguageTable::builtin();
        table.merge(&self.languages);
        table
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Settings::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/fence-deco/config.toml"));
    }

    #[test]
    fn test_settings_serialization_roundtrip() {
        let mut original = Settings {
            theme: "github-light".to_string(),
            ignore_languages: vec!["dataview".to_string()],
            ..Settings::default()
        };
        original.languages.insert(
            "python".to_string(),
            LanguageConfig {
                color: "#ff0000".to_string(),
                ..LanguageConfig::default()
            },
        );

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Settings = toml::from_str(&toml_str).unwrap();

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let settings: Settings = toml::from_str("show_line_numbers = true\n").unwrap();

        assert!(settings.show_line_numbers);
        assert_eq!(settings.theme, "one-dark");
        assert!(settings.show_copy_button);
        assert_eq!(settings.default_color, FALLBACK_COLOR);
    }

    #[test]
    fn test_language_color_alias_key() {
        let content = r##"
[languages.python]
language_color = "#123456"
aliases = ["py3"]
"##;
        let settings: Settings = toml::from_str(content).unwrap();
        let table = settings.language_table();

        let resolved = table.resolve("py3").unwrap();
        assert_eq!(resolved.key, "python");
        assert_eq!(resolved.config.color, "#123456");
    }

    #[rstest]
    #[case("dataview", true)]
    #[case("DataView", true)]
    #[case("dataviewjs", true)]
    #[case("mermaid", true)]
    #[case("python", false)]
    #[case("", false)]
    fn test_is_ignored(#[case] language: &str, #[case] expected: bool) {
        let settings = Settings {
            ignore_languages: vec!["dataview*".to_string(), " Mermaid ".to_string()],
            ..Settings::default()
        };

        assert_eq!(settings.is_ignored(language), expected);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/path");
        let expanded = Settings::expand_path(&path).unwrap();

        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_notes_path_with_env_var_in_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        unsafe {
            env::set_var("FENCE_DECO_TEST_NOTES", "/custom/notes");
        }
        std::fs::write(
            &config_file,
            "notes_path = \"$FENCE_DECO_TEST_NOTES/my-notes\"\n",
        )
        .unwrap();

        let settings = Settings::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(
            settings.notes_path,
            Some(PathBuf::from("/custom/notes/my-notes"))
        );
        unsafe {
            env::remove_var("FENCE_DECO_TEST_NOTES");
        }
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Settings::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_malformed_config_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "theme = [unterminated").unwrap();

        let err = Settings::load_from_path(&config_file).unwrap_err();

        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_save_and_load_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let settings = Settings {
            notes_path: Some(PathBuf::from("/tmp/test-notes")),
            show_line_numbers: true,
            ..Settings::default()
        };

        settings.save_to_path(&config_file).unwrap();
        let loaded = Settings::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded, settings);
    }
}
