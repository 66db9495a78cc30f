//! `mcpcat probe`.

use mcpcat_core::Config;
use mcpcat_mcp::{McpProber, ProbeOutcome, ProbeTarget, Prober, TransportType};
use std::time::Duration;

/// Probe one endpoint and print the outcome.
///
/// Exits with an error when the server could not be reached so scripts can
/// branch on the status code.
pub async fn handle_probe(
    config: &Config,
    endpoint: String,
    transport: TransportType,
    timeout_ms: Option<u64>,
    json: bool,
) -> anyhow::Result<()> {
    let settings = config.probe_settings()?;
    let prober = McpProber::new(settings.prober_config())?;

    let timeout = timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(settings.timeout);
    let target = ProbeTarget::new(endpoint, transport).with_timeout(timeout);

    let outcome = prober.probe(&target).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&target, &outcome);
    }

    if !outcome.reachable {
        anyhow::bail!(
            "{} is unreachable: {}",
            target.endpoint,
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn print_outcome(target: &ProbeTarget, outcome: &ProbeOutcome) {
    let status = if outcome.reachable { "online" } else { "offline" };
    println!("Endpoint:  {} ({})", target.endpoint, target.transport);
    println!("Status:    {status} in {}ms", outcome.response_time_ms);

    if let Some(actual) = &outcome.actual_endpoint {
        println!("Moved to:  {actual}");
    }
    if let Some(info) = &outcome.server_info {
        println!(
            "Server:    {} {} (protocol {})",
            info.name, info.version, info.protocol_version
        );
    }
    if let Some(error) = &outcome.error {
        println!("Error:     {error}");
    }

    if outcome.tools.is_empty() {
        return;
    }
    println!();
    println!("Tools ({}):", outcome.tools.len());
    for tool in &outcome.tools {
        match &tool.description {
            Some(description) => println!("  {:<24} {}", tool.name, first_line(description)),
            None => println!("  {}", tool.name),
        }
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim()
}
