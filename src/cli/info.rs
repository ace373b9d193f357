use anyhow::{Context, Result};
use serde_json::Value;
use std::path::PathBuf;

use super::{open_existing, Config};

/// Display information about a document
pub fn run(document: PathBuf, config: &Config) -> Result<()> {
    let store = open_existing(&document, config)?;
    let attrs = store
        .root()
        .and_then(|root| root.attrs())
        .context("Failed to read document attributes")?;
    let attr = |key: &str| match attrs.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(value) => value.to_string(),
        None => "<unset>".to_string(),
    };

    println!("ORIGAMI Document Information");
    println!("============================");
    println!("Title: {}", store.title());
    println!("Path: {}", store.path().display());
    println!("Created: {}", attr("created"));
    println!("Format version: {}", attr("format_version"));
    println!("Written by: origami-docstore {}", attr("origami_version"));
    println!();

    println!("Data:");
    println!(
        "  Type: {}",
        store.data_type()?.unwrap_or_else(|| "<unset>".to_string())
    );
    println!(
        "  Format: {}",
        store.file_format()?.unwrap_or_else(|| "<unset>".to_string())
    );
    let parameters = store.parameters()?;
    if !parameters.is_empty() {
        println!("  Parameters:");
        for (key, value) in &parameters {
            println!("    {key}: {value}");
        }
    }
    println!();

    println!("Datasets:");
    let mut total = 0;
    for category in store.groups()? {
        let count = store.view_group(&category)?.len();
        total += count;
        println!("  {category:<20} {count}");
    }
    println!("  {:<20} {total}", "Total");

    let tandem = store.tandem_spectra();
    if !tandem.is_empty()? {
        println!();
        println!("Tandem spectra: {}", tandem.len()?);
    }

    Ok(())
}
