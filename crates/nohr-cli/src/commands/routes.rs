use anyhow::{Context, Result};
use colored::Colorize;
use nohr_router::{RouteEntry, RouteTable};

use super::Project;

pub fn execute(project: &Project, json: bool) -> Result<()> {
    let manifest = project
        .route_builder()
        .build()
        .context("Route discovery failed")?;

    if json {
        println!("{}", manifest.to_json_pretty()?);
        return Ok(());
    }

    print_table("Pages", &manifest.pages, describe_page);
    println!();
    print_table("API", &manifest.api, describe_api);

    Ok(())
}

fn print_table(title: &str, table: &RouteTable, describe: fn(&RouteEntry) -> String) {
    let stats = table.stats();
    println!(
        "{} {}",
        title.green().bold(),
        format!(
            "({} total, {} static, {} dynamic)",
            stats.total, stats.static_routes, stats.dynamic_routes
        )
        .dimmed()
    );

    if table.is_empty() {
        println!("  {}", "no routes".dimmed());
        return;
    }

    let width = table
        .iter()
        .map(|e| e.pattern.to_string().len())
        .max()
        .unwrap_or(0);

    for entry in table {
        let pattern = format!("{:width$}", entry.pattern.to_string(), width = width);
        let pattern = if entry.is_static() {
            pattern.cyan()
        } else {
            pattern.yellow()
        };
        println!("  {}  {}", pattern, describe(entry));
    }
}

fn describe_page(entry: &RouteEntry) -> String {
    let layouts: Vec<&str> = entry.layouts.iter().map(|l| l.as_str()).collect();
    if layouts.is_empty() {
        entry.source.to_string()
    } else {
        format!("{}  [{}]", entry.source, layouts.join(" > "))
    }
}

fn describe_api(entry: &RouteEntry) -> String {
    let methods: Vec<&str> = entry.methods.iter().map(|m| m.as_str()).collect();
    format!("{}  {}", methods.join(","), entry.source)
}
