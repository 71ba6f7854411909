//! Resolves one `Voice` against the provider registry into a runnable
//! `tokio::process::Command` plus the provider-qualified voice id used to
//! tag its suggestions.

use pr_config::{Provider, ProviderRegistry};
use pr_core::AppError;
use pr_core::model::Voice;
use std::path::Path;
use tokio::process::Command;

/// `provider:model`, the opaque label stamped onto every suggestion a voice
/// produces so the UI can group by voice without joining back to the plan.
pub fn voice_id(voice: &Voice) -> String {
    format!("{}:{}", voice.provider, voice.model)
}

fn resolve_provider<'a>(registry: &'a ProviderRegistry, voice: &Voice) -> Result<&'a Provider, AppError> {
    registry
        .get(&voice.provider)
        .ok_or_else(|| AppError::InvalidInput(format!("unknown provider '{}'", voice.provider)))
}

/// Builds the child-process command for one voice invocation: the
/// provider's base argv, a `--model` selector, the yolo flag when enabled,
/// and the repo root as the working directory.
pub fn build_command(
    registry: &ProviderRegistry,
    voice: &Voice,
    repo_root: &Path,
    yolo: bool,
) -> Result<Command, AppError> {
    let provider = resolve_provider(registry, voice)?;
    let mut cmd = Command::new(&provider.command);
    cmd.args(&provider.args);
    cmd.arg("--model").arg(&voice.model);
    if yolo {
        if let Some(flag) = &provider.yolo_flag {
            cmd.arg(flag);
        }
    }
    for (key, value) in &provider.env {
        cmd.env(key, value);
    }
    cmd.current_dir(repo_root);
    Ok(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pr_config::Config;
    use pr_core::model::Tier;

    fn voice(provider: &str, model: &str) -> Voice {
        Voice {
            provider: provider.into(),
            model: model.into(),
            tier: Some(Tier::Balanced),
            custom_instructions: None,
        }
    }

    #[test]
    fn voice_id_joins_provider_and_model() {
        assert_eq!(voice_id(&voice("codex", "gpt-5")), "codex:gpt-5");
    }

    #[test]
    fn build_command_rejects_unknown_provider() {
        let registry = ProviderRegistry::from_config(&Config::default());
        let err = build_command(&registry, &voice("no-such-provider", "x"), Path::new("/tmp"), false).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn build_command_resolves_known_provider() {
        let registry = ProviderRegistry::from_config(&Config::default());
        let cmd = build_command(&registry, &voice("codex", "gpt-5"), Path::new("/tmp"), false).unwrap();
        let program = cmd.as_std().get_program().to_string_lossy().into_owned();
        assert_eq!(program, "codex");
    }
}
