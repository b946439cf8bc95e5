//! Run command implementation for the encore CLI.
//!
//! Executes one pass of a page headlessly. With `--state`, the session store
//! is loaded before the pass and saved after it, so successive invocations
//! behave like successive passes of one session.

use std::path::PathBuf;
use std::time::Instant;

use encore_core::{Container, Engine, EngineConfig, PassOutput, Session, SessionStore, Trigger};
use serde_json::Value;

use crate::colors;
use crate::pages;

/// Options for a headless pass.
pub struct RunOptions {
    pub page: Option<String>,
    pub state: Option<PathBuf>,
    pub sets: Vec<(String, Value)>,
    pub click: Option<String>,
    pub json: bool,
    pub seed: u64,
}

/// Execute one pass.
pub fn execute(options: &RunOptions) -> anyhow::Result<()> {
    let start = Instant::now();
    let registry = pages::registry()?;

    let store = match &options.state {
        Some(path) => SessionStore::restore(path)?,
        None => SessionStore::new(),
    };

    let mut session = Session::with_store("cli", &registry, store);
    if let Some(page) = &options.page {
        session.select_page(&registry, page)?;
    }

    for (key, value) in &options.sets {
        session.store_mut().insert(key.clone(), value.clone());
    }

    let trigger = options
        .click
        .as_ref()
        .map(|id| Trigger::ButtonClicked { id: id.clone() });

    let engine = Engine::new(EngineConfig {
        seed: options.seed,
        ..EngineConfig::default()
    });

    let result = session
        .rerun(&engine, &registry, trigger.as_ref())
        .cloned();

    // Writes made before a failure still count.
    if let Some(path) = &options.state {
        session.store().flush(path)?;
        tracing::debug!("Saved session store to {}", path.display());
    }

    let output = match result {
        Ok(output) => output,
        Err(failure) => {
            if !options.json {
                eprintln!(
                    "{}Pass failed{} on page {} after {} instructions",
                    colors::RED,
                    colors::RESET,
                    failure.page,
                    failure.position
                );
            }
            return Err(failure.error.into());
        }
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_output(&output);
    println!("{}", "─".repeat(50));
    println!(
        "{}Completed{} {} instructions in {:.2}s",
        colors::GREEN,
        colors::RESET,
        output.items.len(),
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

fn print_output(output: &PassOutput) {
    let title = output
        .page_config
        .as_ref()
        .map(|c| match &c.icon {
            Some(icon) => format!("{} {}", icon, c.title),
            None => c.title.clone(),
        })
        .unwrap_or_else(|| output.page.clone());

    println!("\n{}{}{}", colors::BOLD, title, colors::RESET);
    println!("{}", "─".repeat(50));

    for item in &output.items {
        let body = item.element.render_text();
        if body.is_empty() {
            continue;
        }
        match item.container {
            Container::Main => println!("{}", body),
            Container::Sidebar => println!("{}[sidebar]{} {}", colors::DIM, colors::RESET, body),
            Container::Column { index, of } => println!(
                "{}[column {}/{}]{} {}",
                colors::DIM,
                index + 1,
                of,
                colors::RESET,
                body
            ),
        }
    }
}

/// List pages in navigation order.
pub fn list_pages() -> anyhow::Result<()> {
    let registry = pages::registry()?;

    for entry in registry.pages() {
        let order = entry.order.map(|n| n.to_string()).unwrap_or_default();
        let marker = if entry.main { " (main)" } else { "" };
        println!(
            "{}{:>3}{} {}{}{} {}[{}]{}",
            colors::DIM,
            order,
            colors::RESET,
            colors::BOLD,
            entry.label,
            marker,
            colors::CYAN,
            entry.slug,
            colors::RESET
        );
    }

    Ok(())
}
