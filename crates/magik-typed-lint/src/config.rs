//! `magik-lint.toml` settings.
//!
//! ```toml
//! types = ["types/sw.jsonl", "types/project.jsonl"]
//! package = "user"
//! json = false
//! no_color = false
//! ```
//!
//! Relative `types` paths are taken from the directory holding the file.
//! Command-line flags win over every key.

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const CONFIG_FILE: &str = "magik-lint.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LintConfig {
    pub types: Vec<PathBuf>,
    pub package: Option<String>,
    pub json: bool,
    pub no_color: bool,
}

impl LintConfig {
    /// Read and parse a config file, anchoring its type paths to the file.
    pub fn from_file(path: &Path) -> Result<LintConfig, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        let mut config = Self::from_str(&content)
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        if let Some(dir) = path.parent() {
            config.types = config.types.into_iter().map(|t| dir.join(t)).collect();
        }
        Ok(config)
    }

    pub fn from_str(content: &str) -> Result<LintConfig, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// The config file in `dir`, if there is one.
    pub fn discover(dir: &Path) -> Result<Option<LintConfig>, String> {
        let path = dir.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        tracing::debug!(path = %path.display(), "using config file");
        Self::from_file(&path).map(Some)
    }

    /// Layer `flags` over this file config.
    pub fn overridden_by(self, flags: LintConfig) -> LintConfig {
        LintConfig {
            types: if flags.types.is_empty() {
                self.types
            } else {
                flags.types
            },
            package: flags.package.or(self.package),
            json: flags.json || self.json,
            no_color: flags.no_color || self.no_color,
        }
    }

    pub fn package(&self) -> &str {
        self.package.as_deref().unwrap_or("user")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let config = LintConfig::from_str(
            r#"
types = ["a.jsonl", "b.jsonl"]
package = "geo"
json = true
"#,
        )
        .unwrap();
        assert_eq!(config.types, vec![PathBuf::from("a.jsonl"), PathBuf::from("b.jsonl")]);
        assert_eq!(config.package(), "geo");
        assert!(config.json);
        assert!(!config.no_color);
    }

    #[test]
    fn empty_config_defaults_to_user() {
        let config = LintConfig::from_str("").unwrap();
        assert_eq!(config, LintConfig::default());
        assert_eq!(config.package(), "user");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = LintConfig::from_str("colour = true").unwrap_err();
        assert!(err.contains("colour"), "{err}");
    }

    #[test]
    fn flags_win_over_the_file() {
        let file = LintConfig {
            types: vec![PathBuf::from("file.jsonl")],
            package: Some("geo".to_string()),
            json: false,
            no_color: true,
        };
        let flags = LintConfig {
            types: vec![PathBuf::from("flag.jsonl")],
            package: None,
            json: true,
            no_color: false,
        };
        let merged = file.overridden_by(flags);
        assert_eq!(merged.types, vec![PathBuf::from("flag.jsonl")]);
        assert_eq!(merged.package(), "geo");
        assert!(merged.json);
        assert!(merged.no_color);
    }

    #[test]
    fn file_types_are_relative_to_the_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(LintConfig::discover(dir.path()).unwrap(), None);
        std::fs::write(dir.path().join(CONFIG_FILE), "types = [\"sw.jsonl\"]\n").unwrap();
        let config = LintConfig::discover(dir.path()).unwrap().expect("config file");
        assert_eq!(config.types, vec![dir.path().join("sw.jsonl")]);
    }
}
