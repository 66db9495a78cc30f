//! `mcpcat config`.

use mcpcat_core::Config;
use std::path::PathBuf;

/// Print configuration sources and the effective probe settings.
pub fn show_config(config: &Config, sources: &[PathBuf]) -> anyhow::Result<()> {
    println!("Configuration sources:");
    if sources.is_empty() {
        println!("  (none)");
    } else {
        for source in sources {
            println!("  {}", source.display());
        }
    }
    println!();

    println!("Current configuration:");
    println!("{}", serde_json::to_string_pretty(config)?);
    println!();

    let settings = config.probe_settings()?;
    println!("Effective probe settings:");
    println!("  timeout:          {}ms", settings.timeout.as_millis());
    println!("  max redirects:    {}", settings.max_redirects);
    println!("  background delay: {}ms", settings.background_delay.as_millis());
    println!(
        "  client:           {} {}",
        settings.client_info.name,
        settings.client_info.version.as_deref().unwrap_or("-")
    );
    println!("  log level:        {}", config.log_level().as_str());

    Ok(())
}
