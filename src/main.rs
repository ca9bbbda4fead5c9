//! # finboard
//!
//! Command-line front end for the finboard analysis platform: log in, upload
//! statements, submit analyses and watch job notifications as they arrive.

#![deny(unsafe_code)]

mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use finboard_client::api::{AnalysisSubmission, Registration};
use finboard_client::bus::recv_lossy;
use finboard_client::{ConnectionEvent, ConnectionState, Platform};
use finboard_core::{AnalysisId, FileId, ToastLevel, UiSignal, format_duration_ms};
use serde::Serialize;
use tokio::sync::broadcast;

/// finboard client.
#[derive(Parser, Debug)]
#[command(name = "finboard", version, about = "Financial analysis platform client")]
struct Cli {
    /// Settings file (defaults to `~/.finboard/settings.json`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the session.
    Login {
        /// Account email.
        #[arg(long, env = "FINBOARD_EMAIL")]
        email: String,
        /// Account password.
        #[arg(long, env = "FINBOARD_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and store the session.
    Register {
        /// Account email.
        #[arg(long)]
        email: String,
        /// Account password.
        #[arg(long, env = "FINBOARD_PASSWORD", hide_env_values = true)]
        password: String,
        /// Display name.
        #[arg(long)]
        name: String,
    },
    /// Clear the stored session.
    Logout,
    /// Show the logged-in user.
    Whoami,
    /// Upload a statement file.
    Upload {
        /// Local file.
        path: PathBuf,
    },
    /// List uploaded files.
    Files,
    /// Delete an uploaded file.
    DeleteFile {
        /// File id.
        id: String,
    },
    /// Submit an analysis on an uploaded file.
    Analyze {
        /// File id.
        file_id: String,
        /// Analysis kind, e.g. `financial_ratios`.
        analysis_type: String,
        /// Benchmark sector.
        #[arg(long)]
        sector: Option<String>,
        /// Business activity within the sector.
        #[arg(long)]
        activity: Option<String>,
        /// Extra parameters as a JSON object.
        #[arg(long)]
        params: Option<String>,
    },
    /// List analyses.
    Analyses,
    /// Show one analysis.
    Status {
        /// Analysis id.
        id: String,
    },
    /// Follow push notifications until Ctrl-C.
    Watch,
    /// Check the backend is up.
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => finboard_settings::load_settings_from_path(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => finboard_settings::load_settings().context("failed to load settings")?,
    };
    logging::init(&settings.logging, cli.json_logs);
    tracing::debug!(base_url = %settings.api.base_url, "settings loaded");

    let mut platform = Platform::new(settings).context("failed to build client")?;
    // `watch` reports signals itself.
    let mut signals =
        (!matches!(cli.command, Command::Watch)).then(|| platform.signals().subscribe());
    let quiet_expiry = matches!(cli.command, Command::Login { .. } | Command::Register { .. });

    let result = run(cli.command, &mut platform).await;
    if let Some(rx) = signals.as_mut() {
        drain_signals(rx, quiet_expiry);
    }
    platform.shutdown();
    result
}

async fn run(command: Command, platform: &mut Platform) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let user = platform.login(&email, &password).await?;
            println!("logged in as {}", user.display_name());
        }
        Command::Register {
            email,
            password,
            name,
        } => {
            let registration = Registration {
                email,
                password,
                full_name: name,
            };
            let user = platform.register(&registration).await?;
            println!("registered {}", user.display_name());
        }
        Command::Logout => {
            if platform.logout()? {
                println!("logged out");
            } else {
                println!("not logged in");
            }
        }
        Command::Whoami => {
            require_session(platform)?;
            print_json(&platform.client().auth().me().await?)?;
        }
        Command::Upload { path } => {
            require_session(platform)?;
            print_json(&platform.upload(&path).await?)?;
        }
        Command::Files => {
            require_session(platform)?;
            print_json(&platform.client().files().list().await?)?;
        }
        Command::DeleteFile { id } => {
            require_session(platform)?;
            let file_id = FileId::from_raw(id.clone());
            platform.client().files().delete(&file_id).await?;
            println!("deleted file {id}");
        }
        Command::Analyze {
            file_id,
            analysis_type,
            sector,
            activity,
            params,
        } => {
            require_session(platform)?;
            let mut submission = AnalysisSubmission::new(FileId::from_raw(file_id), analysis_type);
            submission.sector = sector;
            submission.activity = activity;
            submission.parameters = params
                .map(|raw| serde_json::from_str(&raw))
                .transpose()
                .context("--params must be valid JSON")?;
            print_json(&platform.submit_analysis(&submission).await?)?;
        }
        Command::Analyses => {
            require_session(platform)?;
            print_json(&platform.client().analysis().list().await?)?;
        }
        Command::Status { id } => {
            require_session(platform)?;
            let analysis_id = AnalysisId::from_raw(id);
            let record = platform.client().analysis().get(&analysis_id).await?;
            print_json(&record)?;
            if let Some(ms) = record.execution_time_ms {
                eprintln!("execution time: {}", format_duration_ms(ms));
            }
        }
        Command::Watch => watch(platform).await?,
        Command::Health => print_json(&platform.client().health().await?)?,
    }
    Ok(())
}

async fn watch(platform: &mut Platform) -> Result<()> {
    require_session(platform)?;
    platform.start();
    let mut signals = platform.signals().subscribe();
    let mut events = platform.realtime().events().subscribe();
    let mut status = platform.realtime().subscribe_status();

    let Some(user) = platform.resume() else {
        bail!("stored session has no user profile; run `finboard login` again");
    };
    eprintln!("watching notifications for {} (Ctrl-C to stop)", user.display_name());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            Some(event) = recv_lossy(&mut events, "cli_events") => {
                println!("{}", serde_json::to_string(&event)?);
            }
            Some(signal) = recv_lossy(&mut signals, "cli_signals") => {
                report(&signal, false);
                if signal == UiSignal::SessionExpired {
                    break;
                }
            }
            Some(change) = recv_lossy(&mut status, "cli_status") => match change {
                ConnectionEvent::StateChanged(ConnectionState::Dead) => {
                    let attempts = platform.realtime().policy().max_attempts;
                    bail!("push channel gave up after {attempts} reconnect attempts");
                }
                ConnectionEvent::StateChanged(state) => eprintln!("push channel {state}"),
                ConnectionEvent::ReconnectScheduled { attempt, delay } => {
                    let wait = format_duration_ms(delay.as_secs_f64() * 1000.0);
                    eprintln!("reconnecting in {wait} (attempt {attempt})");
                }
            },
            else => break,
        }
    }
    Ok(())
}

fn require_session(platform: &Platform) -> Result<()> {
    if !platform.session().is_authenticated() {
        bail!("not logged in; run `finboard login` first");
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn drain_signals(rx: &mut broadcast::Receiver<UiSignal>, quiet_expiry: bool) {
    while let Ok(signal) = rx.try_recv() {
        report(&signal, quiet_expiry);
    }
}

fn report(signal: &UiSignal, quiet_expiry: bool) {
    match signal {
        UiSignal::Toast(toast) => eprintln!("[{}] {}", level_label(toast.level), toast.message),
        UiSignal::SessionExpired if !quiet_expiry => {
            eprintln!("session expired; run `finboard login` again");
        }
        UiSignal::SessionExpired => {}
    }
}

fn level_label(level: ToastLevel) -> &'static str {
    match level {
        ToastLevel::Info => "info",
        ToastLevel::Success => "ok",
        ToastLevel::Warning => "warn",
        ToastLevel::Error => "error",
    }
}
