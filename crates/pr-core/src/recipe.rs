//! Prompt recipe seam.
//!
//! The exact prompt shape per provider is a separate concern (see the open
//! question in the design notes); the orchestrator only needs something that
//! turns a voice's inputs into the text written to the provider's stdin.

use crate::model::Voice;

/// Inputs available to a recipe when composing a prompt for one voice invocation.
pub struct RecipeInput<'a> {
    pub voice: &'a Voice,
    pub diff_text: &'a str,
    pub custom_instructions: Option<&'a str>,
    pub repo_instructions: Option<&'a str>,
    pub request_instructions: Option<&'a str>,
    /// Digest of earlier levels' suggestions, when this voice is not in level 1.
    pub prior_levels_digest: Option<&'a str>,
}

/// Composes the textual prompt written to a provider's stdin for one voice.
pub trait PromptRecipe: Send + Sync {
    fn compose(&self, input: &RecipeInput<'_>) -> String;
}

/// Minimal built-in recipe: concatenates instructions and diff. Not a final
/// prompt design, just enough to drive the orchestrator end to end.
pub struct BasicRecipe;

impl PromptRecipe for BasicRecipe {
    fn compose(&self, input: &RecipeInput<'_>) -> String {
        let mut out = String::new();
        if let Some(repo) = input.repo_instructions {
            out.push_str(repo);
            out.push('\n');
        }
        if let Some(custom) = input.custom_instructions {
            out.push_str(custom);
            out.push('\n');
        }
        if let Some(request) = input.request_instructions {
            out.push_str(request);
            out.push('\n');
        }
        if let Some(prior) = input.prior_levels_digest {
            out.push_str("Earlier-level findings:\n");
            out.push_str(prior);
            out.push('\n');
        }
        out.push_str("Diff:\n");
        out.push_str(input.diff_text);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tier;

    #[test]
    fn test_basic_recipe_includes_diff() {
        let voice = Voice {
            provider: "codex".into(),
            model: "gpt".into(),
            tier: Some(Tier::Balanced),
            custom_instructions: None,
        };
        let input = RecipeInput {
            voice: &voice,
            diff_text: "+added line",
            custom_instructions: None,
            repo_instructions: None,
            request_instructions: None,
            prior_levels_digest: None,
        };
        let prompt = BasicRecipe.compose(&input);
        assert!(prompt.contains("+added line"));
    }

    #[test]
    fn test_basic_recipe_includes_prior_digest() {
        let voice = Voice {
            provider: "codex".into(),
            model: "gpt".into(),
            tier: None,
            custom_instructions: None,
        };
        let input = RecipeInput {
            voice: &voice,
            diff_text: "d",
            custom_instructions: None,
            repo_instructions: None,
            request_instructions: None,
            prior_levels_digest: Some("level 1 found 2 bugs"),
        };
        let prompt = BasicRecipe.compose(&input);
        assert!(prompt.contains("level 1 found 2 bugs"));
    }
}
