use std::path::PathBuf;
use std::time::Duration;

use admin_client::messages::{format_diff, format_roster, format_validation};
use admin_client::workflow::watch_roster;
use admin_client::{
    AccessMode, Dashboard, HttpBackend, MediaFile, RegistrationForm, UploadPhase, WorkflowState,
};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use shared::{BackendConfig, DisplayConfig, WorkflowConfig};

#[derive(Parser)]
#[command(name = "matrix-admin", version, about = "Administer the LED matrix leaderboard display")]
struct Cli {
    /// Show admin-only panels (same as `isAdmin=true` in a dashboard link)
    #[arg(long, global = true)]
    admin: bool,

    /// Dashboard link whose query decides the access mode
    #[arg(long, global = true, value_name = "URL")]
    link: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the address of the live LED matrix emulator
    Emulator,
    #[command(flatten)]
    Console(ConsoleCommand),
}

/// Commands that talk to the backend.
#[derive(Subcommand)]
enum ConsoleCommand {
    /// Register a LeetCode user for the leaderboard
    Register {
        #[arg(long)]
        username: String,
        #[arg(long = "confirm")]
        confirm_username: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
    },
    /// Administer registered users
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
    /// Validate and upload an announcement image or video
    Upload {
        path: PathBuf,
        /// Declared MIME type; inferred from the extension when omitted
        #[arg(long)]
        mime: Option<String>,
        /// Only validate, do not upload
        #[arg(long)]
        check: bool,
    },
    /// Keep the user list on screen, refreshing periodically
    Watch {
        /// Refresh interval; defaults to ROSTER_REFRESH_INTERVAL_MS
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: Option<u64>,
    },
}

#[derive(Subcommand)]
enum UsersAction {
    List,
    Delete { username: String },
    Rename { old_username: String, new_username: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    shared::init_tracing("matrix-admin")
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let command = match cli.command {
        Command::Emulator => {
            let display = DisplayConfig::from_env()?;
            println!("{}", display.emulator_url);
            return Ok(());
        }
        Command::Console(command) => command,
    };

    let backend_config = BackendConfig::from_env()?;
    let workflow_config = WorkflowConfig::from_env()?;

    if let Ok(port) = std::env::var("METRICS_PORT") {
        let port: u16 = port.parse().context("METRICS_PORT must be a valid port number")?;
        shared::init_metrics(port).map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;
    }

    tracing::debug!("Configuration:");
    tracing::debug!("  Backend URL: {}", backend_config.base_url);
    tracing::debug!("  Request timeout: {:?}", backend_config.request_timeout);
    tracing::debug!("  Registration cooldown: {:?}", workflow_config.registration_cooldown);

    let access = match (&cli.link, cli.admin) {
        (_, true) => AccessMode::Admin,
        (Some(link), false) => AccessMode::from_link(link)?,
        (None, false) => AccessMode::Operator,
    };

    let backend = HttpBackend::new(backend_config)?;
    let dashboard = Dashboard::new(backend, &workflow_config, access);

    let outcome = run(command, &dashboard, &workflow_config).await;
    dashboard.shutdown();
    outcome
}

async fn run(
    command: ConsoleCommand,
    dashboard: &Dashboard<HttpBackend>,
    workflow_config: &WorkflowConfig,
) -> anyhow::Result<()> {
    match command {
        ConsoleCommand::Register {
            username,
            confirm_username,
            first_name,
            last_name,
        } => {
            let form = RegistrationForm::new(username, confirm_username, first_name, last_name);
            match dashboard.registration().submit(form).await {
                WorkflowState::Succeeded(message) => println!("{}", message),
                WorkflowState::Failed(message) => bail!(message),
                other => bail!("Registration not submitted: {}", other),
            }
        }
        ConsoleCommand::Users { action } => {
            let roster = dashboard.roster()?;
            match action {
                UsersAction::List => {
                    let users = roster.load().await?;
                    println!("{}", format_roster(&users));
                }
                UsersAction::Delete { username } => {
                    roster.delete(&username).await?;
                    println!("{}", roster.state());
                }
                UsersAction::Rename {
                    old_username,
                    new_username,
                } => {
                    roster.load().await?;
                    roster.toggle_edit();
                    let updated = roster.update(&old_username, &new_username).await?;
                    println!("Renamed {} to {}", old_username, updated.username);
                }
            }
        }
        ConsoleCommand::Upload { path, mime, check } => {
            let file = MediaFile::from_path(&path, mime.as_deref()).await?;
            let upload = dashboard.upload();
            let file_name = file.file_name().to_string();

            let phase = upload.select_file(file).await;
            if let Some(preview) = upload.preview_path() {
                println!("Preview: {}", preview.display());
            }
            if let Some(validation) = upload.validation() {
                println!("{}", format_validation(&file_name, &validation));
            }

            if check {
                upload.reset();
                return match phase {
                    UploadPhase::Ready => Ok(()),
                    other => bail!("{}", other),
                };
            }

            let result = match upload.upload().await {
                UploadPhase::Succeeded => {
                    if let Some(payload) = upload.last_payload() {
                        println!("Uploaded {}: {}", file_name, payload);
                    }
                    Ok(())
                }
                other => Err(anyhow::anyhow!("{}", other)),
            };
            upload.reset();
            result?;
        }
        ConsoleCommand::Watch { interval_ms } => {
            let roster = dashboard.roster()?;
            let interval = interval_ms
                .map(Duration::from_millis)
                .unwrap_or(workflow_config.roster_refresh_interval);

            watch_roster(
                roster,
                interval,
                |diff, users| {
                    println!("{}", format_diff(diff));
                    println!("{}\n", format_roster(users));
                },
                async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!("Failed to listen for ctrl-c: {}", e);
                    }
                },
            )
            .await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_rejects_zero_interval() {
        let result = Cli::try_parse_from(["matrix-admin", "watch", "--interval-ms", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_watch_accepts_interval() {
        let cli = Cli::try_parse_from(["matrix-admin", "--admin", "watch", "--interval-ms", "250"]).unwrap();
        assert!(cli.admin);
        assert!(matches!(
            cli.command,
            Command::Console(ConsoleCommand::Watch { interval_ms: Some(250) })
        ));
    }

    #[test]
    fn test_emulator_is_top_level() {
        let cli = Cli::try_parse_from(["matrix-admin", "emulator"]).unwrap();
        assert!(matches!(cli.command, Command::Emulator));
    }
}
