//! Startup configuration and the provider registry it overrides.

pub mod config;
mod config_merge;
pub mod paths;
pub mod registry;

pub use config::{Config, ModelDef, MonorepoConfig, Provider, ProviderOverride};
pub use pr_core::model::Tier;
pub use registry::ProviderRegistry;
