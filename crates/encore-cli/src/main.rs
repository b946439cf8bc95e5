//! encore CLI - run pages headlessly or serve them over WebSocket.

mod colors;
mod pages;
mod run;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use encore_core::engine::DEFAULT_SEED;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "encore")]
#[command(about = "Page re-execution engine with per-session state")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one pass of a page and print its output
    Run {
        /// Page slug or label (defaults to the main page)
        page: Option<String>,

        /// Session store file; read before the pass and written after it
        #[arg(long)]
        state: Option<PathBuf>,

        /// Report a widget value before the pass (`key=value`, value parsed as JSON when possible)
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
        sets: Vec<(String, Value)>,

        /// Click a button for this pass
        #[arg(long, value_name = "ID")]
        click: Option<String>,

        /// Print the pass output as JSON
        #[arg(long)]
        json: bool,

        /// Seed for page randomness
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
    },

    /// List the app's pages in navigation order
    Pages,

    /// Start the WebSocket server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Seed for page randomness
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
    },
}

/// Parse `key=value`; the value is JSON when it parses, a string otherwise.
fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{}`", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in `{}`", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Surface encore-core recovery hints
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        if let Some(core_err) = err.downcast_ref::<encore_core::Error>() {
            anyhow::anyhow!("{}", core_err.with_hint())
        } else {
            err
        }
    };

    match cli.command {
        Commands::Run {
            page,
            state,
            sets,
            click,
            json,
            seed,
        } => {
            let options = run::RunOptions {
                page,
                state,
                sets,
                click,
                json,
                seed,
            };
            run::execute(&options).map_err(format_error)?;
        }

        Commands::Pages => run::list_pages().map_err(format_error)?,

        Commands::Serve { host, port, seed } => {
            serve::execute(host, port, seed).await.map_err(format_error)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(parse_assignment("slider_key=5"), Ok(("slider_key".to_string(), json!(5))));
        assert_eq!(parse_assignment("show=true"), Ok(("show".to_string(), json!(true))));
        assert_eq!(parse_assignment("name=Ada"), Ok(("name".to_string(), json!("Ada"))));
        assert_eq!(parse_assignment("name="), Ok(("name".to_string(), json!(""))));
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=3").is_err());
    }
}
