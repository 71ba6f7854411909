//! Built-in provider definitions, overridden by the loaded `Config`.

use crate::Tier;
use crate::config::{Config, ModelDef, Provider};
use std::collections::HashMap;

fn builtin_providers() -> Vec<Provider> {
    vec![
        Provider {
            id: "claude-code".into(),
            command: "claude".into(),
            args: vec!["--print".into(), "--output-format".into(), "stream-json".into()],
            env: HashMap::new(),
            yolo_flag: Some("--dangerously-skip-permissions".into()),
            models: vec![
                ModelDef {
                    id: "claude-sonnet".into(),
                    tier: Tier::Balanced,
                    name: Some("Sonnet".into()),
                    badge: None,
                    default: true,
                    tagline: None,
                    description: None,
                },
                ModelDef {
                    id: "claude-opus".into(),
                    tier: Tier::Thorough,
                    name: Some("Opus".into()),
                    badge: None,
                    default: false,
                    tagline: None,
                    description: None,
                },
            ],
        },
        Provider {
            id: "codex".into(),
            command: "codex".into(),
            args: vec!["exec".into(), "--json".into()],
            env: HashMap::new(),
            yolo_flag: Some("--dangerously-bypass-approvals-and-sandbox".into()),
            models: vec![ModelDef {
                id: "gpt-5".into(),
                tier: Tier::Balanced,
                name: None,
                badge: None,
                default: true,
                tagline: None,
                description: None,
            }],
        },
        Provider {
            id: "gemini-cli".into(),
            command: "gemini".into(),
            args: vec!["--output-format".into(), "json".into()],
            env: HashMap::new(),
            yolo_flag: Some("--yolo".into()),
            models: vec![ModelDef {
                id: "gemini-2.5-pro".into(),
                tier: Tier::Balanced,
                name: None,
                badge: None,
                default: true,
                tagline: None,
                description: None,
            }],
        },
    ]
}

/// Resolves the effective provider registry: built-ins overridden by config-file merge rules.
pub struct ProviderRegistry {
    providers: HashMap<String, Provider>,
}

impl ProviderRegistry {
    pub fn from_config(config: &Config) -> Self {
        let mut providers: HashMap<String, Provider> = builtin_providers()
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        for (id, over) in &config.providers {
            let entry = providers.entry(id.clone()).or_insert_with(|| Provider {
                id: id.clone(),
                command: id.clone(),
                args: vec![],
                env: HashMap::new(),
                yolo_flag: None,
                models: vec![],
            });
            if let Some(command) = &over.command {
                entry.command = command.clone();
            }
            if !over.extra_args.is_empty() {
                entry.args.extend(over.extra_args.clone());
            }
            entry.env.extend(over.env.clone());
            entry.models = crate::config_merge::merge_models(
                std::mem::take(&mut entry.models),
                over.models.clone(),
            );
        }

        Self { providers }
    }

    pub fn get(&self, id: &str) -> Option<&Provider> {
        self.providers.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(|s| s.as_str())
    }
}
