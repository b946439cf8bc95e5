//! Serve command implementation for the encore CLI.

use encore_core::EngineConfig;
use encore_server::ServerConfig;

use crate::colors;
use crate::pages;

/// Start the WebSocket server for the demo app.
pub async fn execute(host: String, port: u16, seed: u64) -> anyhow::Result<()> {
    let registry = pages::registry()?;

    println!(
        "\n{}encore Server{} - Interactive Pages",
        colors::BOLD,
        colors::RESET
    );
    println!("{}", "─".repeat(50));

    println!(
        "{}  ◆ Pages:{} {}",
        colors::CYAN,
        colors::RESET,
        registry
            .pages()
            .iter()
            .map(|p| p.label.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let config = ServerConfig { host, port };

    println!(
        "{}  ◆ Server:{} http://{}:{}",
        colors::CYAN,
        colors::RESET,
        config.host,
        config.port
    );
    println!(
        "{}  ◆ WebSocket:{} ws://{}:{}/ws",
        colors::CYAN,
        colors::RESET,
        config.host,
        config.port
    );
    println!("{}", "─".repeat(50));
    println!("{}Press Ctrl+C to stop{}", colors::GREEN, colors::RESET);
    println!();

    let engine = EngineConfig {
        seed,
        ..EngineConfig::default()
    };
    encore_server::serve(registry, engine, config).await?;

    Ok(())
}
