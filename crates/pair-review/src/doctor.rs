//! Startup environment diagnostics: confirms the store directory is
//! writable and every configured provider's command resolves on PATH.

use anyhow::Result;
use pr_config::{Config, ProviderRegistry};

pub fn run(config: &Config) -> Result<()> {
    println!("=== pair-review environment check ===");
    print_platform();
    print_store_dir()?;
    println!();

    println!("=== Providers ===");
    print_provider_availability(config);

    Ok(())
}

fn print_platform() {
    println!("Platform: {} {}", std::env::consts::OS, std::env::consts::ARCH);
    println!("Version:  {}", env!("CARGO_PKG_VERSION"));
}

fn print_store_dir() -> Result<()> {
    let Some(dir) = pr_config::paths::state_dir() else {
        println!("Store dir: (unable to determine)");
        return Ok(());
    };
    std::fs::create_dir_all(&dir)?;
    let probe = dir.join(".doctor-write-check");
    let writable = std::fs::write(&probe, b"ok").is_ok();
    let _ = std::fs::remove_file(&probe);
    println!("Store dir: {} ({})", dir.display(), if writable { "writable" } else { "NOT WRITABLE" });
    Ok(())
}

fn print_provider_availability(config: &Config) {
    let registry = ProviderRegistry::from_config(config);
    for id in registry.ids() {
        let Some(provider) = registry.get(id) else { continue };
        match which::which(&provider.command) {
            Ok(path) => println!("{id:<14} ok   {}", path.display()),
            Err(_) => println!("{id:<14} MISSING  command '{}' not found on PATH", provider.command),
        }
    }
}
