use anyhow::{Context, Result};
use colored::Colorize;

use super::Project;

pub fn execute(project: &Project, path: &str, api: bool) -> Result<()> {
    let manifest = project
        .route_builder()
        .build()
        .context("Route discovery failed")?;
    let table = if api { &manifest.api } else { &manifest.pages };

    let Some(hit) = table.match_path(path) else {
        println!("{} {}", "✗ No route matches".red(), path);
        return Ok(());
    };

    println!("{} {} → {}", "✓".green(), path, hit.entry.pattern.to_string().cyan());
    println!("  source:  {}", hit.entry.source);

    if !hit.entry.layouts.is_empty() {
        let layouts: Vec<&str> = hit.entry.layouts.iter().map(|l| l.as_str()).collect();
        println!("  layouts: {}", layouts.join(" > "));
    }
    if !hit.entry.methods.is_empty() {
        let methods: Vec<&str> = hit.entry.methods.iter().map(|m| m.as_str()).collect();
        println!("  methods: {}", methods.join(", "));
    }

    let mut params: Vec<_> = hit.params.iter().collect();
    params.sort();
    for (name, value) in params {
        println!("  {} = {}", name.yellow(), value);
    }

    Ok(())
}
