//! The demo app: a main "Hello" page plus one numbered sibling page.

mod example_page;
mod hello;

use encore_core::{PageRegistry, Result, Table};
use rand::Rng;
use rand::rngs::StdRng;

/// Build the app's page registry.
pub fn registry() -> Result<PageRegistry> {
    let mut registry = PageRegistry::new("Hello", hello::page);
    registry.register("4_example_page", example_page::page)?;
    Ok(registry)
}

/// One standard normal sample (Box-Muller).
fn randn(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// `rows` x `columns.len()` table of standard normal samples, each column
/// scaled by `scale` and shifted by `offset`.
fn normal_table(
    rng: &mut StdRng,
    rows: usize,
    columns: &[&str],
    scale: f64,
    offset: &[f64],
) -> Result<Table> {
    let data = (0..rows)
        .map(|_| {
            (0..columns.len())
                .map(|c| randn(rng) * scale + offset.get(c).copied().unwrap_or(0.0))
                .collect::<Vec<f64>>()
        })
        .collect::<Vec<Vec<f64>>>();
    Table::from_rows(columns.iter().map(|c| c.to_string()).collect(), data)
}
