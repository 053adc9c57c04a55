use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use nohr_router::ManifestCache;

use super::Project;

pub fn execute(project: &Project, output: Option<PathBuf>) -> Result<()> {
    let output = output
        .map(|path| project.root.join(path))
        .unwrap_or_else(|| project.config.routing.manifest_path(&project.root));

    println!("{}", "Generating routes...".green().bold());

    let manifest = project
        .route_builder()
        .build()
        .context("Route discovery failed")?;

    ManifestCache::new(&output)
        .write(&manifest)
        .context("Failed to write route manifest")?;

    let pages = manifest.pages.stats();
    let api = manifest.api.stats();
    println!(
        "  {} {} page routes ({} static, {} dynamic)",
        "✓".green(),
        pages.total,
        pages.static_routes,
        pages.dynamic_routes
    );
    println!(
        "  {} {} API routes ({} handlers)",
        "✓".green(),
        api.total,
        api.methods
    );
    println!("  {} {}", "→".cyan(), output.display());

    Ok(())
}
