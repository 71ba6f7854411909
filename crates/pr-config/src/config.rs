//! The closed, enumerated configuration type and the provider registry it
//! overrides: built-in provider/model definitions, merged with whatever a
//! user's config file supplies.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_port() -> u16 {
    7247
}

/// Top-level config, loaded once at startup from a single TOML file.
/// Unknown top-level keys are preserved in `extra` and logged, never silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub github_token: Option<String>,
    #[serde(default)]
    pub yolo: bool,
    #[serde(default)]
    pub providers: HashMap<String, ProviderOverride>,
    #[serde(default)]
    pub monorepos: HashMap<String, MonorepoConfig>,
    #[serde(flatten)]
    pub extra: toml::value::Table,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            theme: None,
            github_token: None,
            yolo: false,
            providers: HashMap::new(),
            monorepos: HashMap::new(),
            extra: toml::value::Table::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderOverride {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub install_instructions: Option<String>,
    #[serde(default)]
    pub models: Vec<ModelDef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonorepoConfig {
    pub path: String,
    #[serde(default)]
    pub checkout_script: Option<String>,
    #[serde(default)]
    pub worktree_directory: Option<String>,
    #[serde(default)]
    pub worktree_name_template: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDef {
    pub id: String,
    pub tier: crate::Tier,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A provider registration: how to invoke it, and which models it offers.
#[derive(Debug, Clone)]
pub struct Provider {
    pub id: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub models: Vec<ModelDef>,
    /// When set, replaces the conservative allow-list argv with a permissive flag.
    pub yolo_flag: Option<String>,
}

impl Provider {
    /// First model flagged default; else first balanced; else first overall; else None.
    pub fn default_model(&self) -> Option<&ModelDef> {
        self.models
            .iter()
            .find(|m| m.default)
            .or_else(|| self.models.iter().find(|m| m.tier == crate::Tier::Balanced))
            .or_else(|| self.models.first())
    }
}

impl Config {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let raw: toml::Value = toml::from_str(&content)?;
        crate::config_merge::warn_unknown_top_level_keys(&raw, &path.display().to_string());
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_nonexistent_returns_default() {
        let dir = tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.port, 7247);
        assert!(!config.yolo);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.port = 9000;
        config.yolo = true;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.port, 9000);
        assert!(loaded.yolo);
    }

    #[test]
    fn test_default_model_prefers_flagged_default() {
        let provider = Provider {
            id: "codex".into(),
            command: "codex".into(),
            args: vec![],
            env: HashMap::new(),
            yolo_flag: None,
            models: vec![
                ModelDef {
                    id: "a".into(),
                    tier: crate::Tier::Fast,
                    name: None,
                    badge: None,
                    default: false,
                    tagline: None,
                    description: None,
                },
                ModelDef {
                    id: "b".into(),
                    tier: crate::Tier::Balanced,
                    name: None,
                    badge: None,
                    default: true,
                    tagline: None,
                    description: None,
                },
            ],
        };
        assert_eq!(provider.default_model().unwrap().id, "b");
    }

    #[test]
    fn test_default_model_falls_back_to_balanced_then_first() {
        let provider = Provider {
            id: "codex".into(),
            command: "codex".into(),
            args: vec![],
            env: HashMap::new(),
            yolo_flag: None,
            models: vec![
                ModelDef {
                    id: "a".into(),
                    tier: crate::Tier::Fast,
                    name: None,
                    badge: None,
                    default: false,
                    tagline: None,
                    description: None,
                },
                ModelDef {
                    id: "b".into(),
                    tier: crate::Tier::Balanced,
                    name: None,
                    badge: None,
                    default: false,
                    tagline: None,
                    description: None,
                },
            ],
        };
        assert_eq!(provider.default_model().unwrap().id, "b");

        let no_balanced = Provider {
            models: vec![ModelDef {
                id: "only".into(),
                tier: crate::Tier::Fast,
                name: None,
                badge: None,
                default: false,
                tagline: None,
                description: None,
            }],
            ..provider
        };
        assert_eq!(no_balanced.default_model().unwrap().id, "only");
    }
}
