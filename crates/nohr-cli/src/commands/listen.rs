use anyhow::Result;
use colored::Colorize;
use nohr_dev::{UpdateClient, UpdateKind, UpdateMessage};

use super::Project;

pub fn execute(project: &Project, url: Option<String>) -> Result<()> {
    let dev = &project.config.dev;
    let url = url.unwrap_or_else(|| format!("ws://{}:{}", dev.host, dev.hmr_port));
    let client = UpdateClient::new(url, dev.reconnect);

    println!("{} {}", "Listening on".cyan(), client.url());

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(async {
            tokio::select! {
                result = client.run(print_message) => result.map_err(anyhow::Error::from),
                _ = tokio::signal::ctrl_c() => Ok(()),
            }
        })
}

fn print_message(message: UpdateMessage) {
    match message {
        UpdateMessage::Connected => println!("{}", "● connected".green()),
        UpdateMessage::Update {
            update_type, file, ..
        } => {
            let action = match update_type {
                UpdateKind::Client => "reload",
                UpdateKind::Css => "css",
                UpdateKind::Component => "component",
            };
            println!("{} {} {}", "↻".cyan(), action.bold(), file);
        }
        UpdateMessage::Error { error, .. } => {
            println!("{} {}", "✗ build error".red().bold(), error);
        }
    }
}
