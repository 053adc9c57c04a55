use anyhow::Result;
use colored::Colorize;
use nohr_dev::{DevOptions, DevServer};

use super::Project;

pub fn execute(project: Project, port: Option<u16>, no_server: bool) -> Result<()> {
    println!("{}", "NOHR development server".magenta().bold());
    println!("{} {}", "Project:".cyan(), project.root.display());
    println!();

    let server = DevServer::new(project.config, project.root, DevOptions { port, no_server });

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async {
            server
                .run(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await
        })?;

    println!("{}", "Dev server stopped".green());
    Ok(())
}
