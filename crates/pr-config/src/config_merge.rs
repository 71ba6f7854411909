//! Merge semantics for provider overrides: models with the same `id`
//! replace the built-in; new ids are appended; an empty override array means
//! "no override" (the built-in list passes through unchanged).

use crate::config::ModelDef;

/// Logs unknown top-level keys instead of silently absorbing them ("prefer
/// a closed, enumerated configuration type ... unknown keys logged, not
/// silently absorbed").
pub(crate) fn warn_unknown_top_level_keys(raw: &toml::Value, source: &str) {
    const KNOWN: &[&str] = &["port", "theme", "github_token", "yolo", "providers", "monorepos"];
    let Some(table) = raw.as_table() else {
        return;
    };
    for key in table.keys() {
        if !KNOWN.contains(&key.as_str()) {
            tracing::warn!(config_source = source, key = %key, "unknown config key ignored");
        }
    }
}

/// Merge a built-in model list with a config override list, by `id`.
pub fn merge_models(builtin: Vec<ModelDef>, overrides: Vec<ModelDef>) -> Vec<ModelDef> {
    if overrides.is_empty() {
        return builtin;
    }
    let mut merged = builtin;
    for over in overrides {
        if let Some(existing) = merged.iter_mut().find(|m| m.id == over.id) {
            *existing = over;
        } else {
            merged.push(over);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tier;

    fn model(id: &str, tier: Tier, default: bool) -> ModelDef {
        ModelDef {
            id: id.into(),
            tier,
            name: None,
            badge: None,
            default,
            tagline: None,
            description: None,
        }
    }

    #[test]
    fn test_empty_override_means_no_override() {
        let builtin = vec![model("a", Tier::Fast, false)];
        let merged = merge_models(builtin.clone(), vec![]);
        assert_eq!(merged, builtin);
    }

    #[test]
    fn test_matching_id_replaces_builtin() {
        let builtin = vec![model("a", Tier::Fast, false)];
        let overrides = vec![model("a", Tier::Thorough, true)];
        let merged = merge_models(builtin, overrides);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].tier, Tier::Thorough);
        assert!(merged[0].default);
    }

    #[test]
    fn test_new_id_is_appended() {
        let builtin = vec![model("a", Tier::Fast, false)];
        let overrides = vec![model("b", Tier::Balanced, false)];
        let merged = merge_models(builtin, overrides);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].id, "b");
    }
}
