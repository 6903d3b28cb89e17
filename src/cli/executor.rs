use super::{app::*, output};
use crate::core::channel::ShellChannel;
use crate::core::config::{ConfigField, load_settings};
use crate::frontend::Frontend;
use crate::{Context, Result};
use std::sync::Arc;
use tokio::io::AsyncReadExt;

pub async fn execute(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.config)?;
    let channel = Arc::new(
        ShellChannel::new(settings.channel.timeout_ms).with_shell(settings.channel.shell.clone()),
    );
    let frontend = Frontend::new(channel, &settings);

    let result = dispatch(&frontend, cli.command).await;
    frontend.dispose();
    result
}

async fn dispatch(frontend: &Frontend, command: Commands) -> Result<()> {
    match command {
        Commands::Status => {
            frontend.init().await;
            frontend.monitor().stop();
            output::print_status(&frontend.monitor().snapshot());
        }

        Commands::Refresh { key } => {
            let value = frontend.request_refresh(&key).await?;
            println!("{}: {}", key, value);
        }

        Commands::Apps => {
            let doc = frontend.config().load_config().await;
            output::print_apps(&doc);
        }

        Commands::Show { package } => {
            let doc = frontend.config().load_config().await;
            output::print_app(&package, doc.state(&package));
        }

        Commands::Enable { package } => {
            frontend.set_enabled(&package, true).await?;
            output::print_success(&format!("{} enabled", package));
        }

        Commands::Disable { package } => {
            frontend.set_enabled(&package, false).await?;
            output::print_success(&format!("{} disabled", package));
        }

        Commands::Set { package, field, value } => {
            let field = ConfigField::from(field);
            frontend.set_config_field(&package, field.name(), &value).await?;
            output::print_success(&format!("{}: {} = {}", package, field, value));
        }

        Commands::Gamelist { action } => handle_gamelist(frontend, action).await?,
    }

    Ok(())
}

async fn handle_gamelist(frontend: &Frontend, action: GamelistAction) -> Result<()> {
    match action {
        GamelistAction::Show { filter } => {
            frontend.begin_list_edit().await?;
            output::print_list(&frontend.filter_list(filter.as_deref().unwrap_or("")));
        }

        GamelistAction::Save { filter, file } => {
            let edited = match file {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    tokio::io::stdin()
                        .read_to_string(&mut buf)
                        .await
                        .context("Failed to read edited list from stdin")?;
                    buf
                }
            };

            frontend.begin_list_edit().await?;
            let count = frontend.merge_and_save_list(&edited, &filter).await?;
            output::print_success(&format!("Game list saved: {} packages", count));
        }
    }
    Ok(())
}
