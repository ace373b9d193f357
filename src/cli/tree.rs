use anyhow::{Context, Result};
use serde_json::Value;
use std::path::PathBuf;

use super::{open_existing, Config};

/// List the datasets of a document, grouped by category
pub fn run(document: PathBuf, category: Option<String>, config: &Config) -> Result<()> {
    let store = open_existing(&document, config)?;
    let categories = match category {
        Some(category) => {
            if !store.contains(&category) {
                anyhow::bail!("Category `{category}` does not exist in {}", store.title());
            }
            vec![category]
        }
        None => store.groups()?,
    };

    println!("{}", store.title());
    for category in categories {
        let datasets = store.view_group(&category)?;
        println!("├── {category}/ ({})", datasets.len());
        for (i, path) in datasets.iter().enumerate() {
            let branch = if i + 1 == datasets.len() { "└──" } else { "├──" };
            let attrs = store
                .get_attrs(path)
                .with_context(|| format!("Failed to read attributes of `{path}`"))?;
            let name = path.rsplit('/').next().unwrap_or(path);
            match attrs.get("class").and_then(Value::as_str) {
                Some(class) => println!("│   {branch} {name} [{class}]"),
                None => println!("│   {branch} {name}"),
            }
        }
    }
    Ok(())
}
