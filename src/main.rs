mod cli;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::Parser;
use cli::{Cli, Commands, ConfigAction};
use pkg_updater::config::{
    load_package_info, load_settings, manifest_path, normalize_key, parse_bool, save_settings,
};
use pkg_updater::types::{CheckReport, UpdaterSettings};
use pkg_updater::ui::{HeadlessView, TerminalView};
use pkg_updater::{Collaborators, CompletionCallback, UpdateOrchestrator, UpdateState};
use std::path::PathBuf;
use std::process::Command;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let package = match cli.command {
        Commands::Check { .. } | Commands::Update { .. } => {
            Some(load_package_info(&manifest_path(cli.manifest.as_deref()))?)
        }
        _ => None,
    };
    let debug = package.as_ref().is_some_and(|p| p.debug);

    setup_logging(&cli, debug)?;

    match cli.command {
        Commands::Version => {
            println!("pkg-updater v{}", env!("CARGO_PKG_VERSION"));
        }

        Commands::Check { ref format } => {
            let package = package.context("Check needs a package manifest")?;
            let settings = load_settings()?;
            let orchestrator = UpdateOrchestrator::new(
                package,
                settings.clone(),
                Collaborators::http(&settings, Box::new(HeadlessView)),
                None,
            )
            .await;
            print_check(&orchestrator, format)?;
        }

        Commands::Update { yes, exec } => {
            let package = package.context("Update needs a package manifest")?;
            let settings = load_settings()?;
            let callback = exec.map(|command| {
                Box::new(move || run_exec(&command)) as CompletionCallback
            });
            let orchestrator = UpdateOrchestrator::new(
                package,
                settings.clone(),
                Collaborators::http(&settings, Box::new(TerminalView::new())),
                callback,
            )
            .await;
            run_update(orchestrator, yes).await?;
        }

        Commands::Config { action } => config_command(action)?,
    }

    Ok(())
}

/// `debug` is the manifest's flag; it lifts the default level so the
/// package's diagnostics show without `-v`.
fn setup_logging(cli: &Cli, debug: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if cli.quiet {
        "error"
    } else if cli.verbose == 0 && !debug {
        "warn"
    } else if cli.verbose == 1 {
        "info"
    } else {
        "debug"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    Ok(())
}

fn print_check(orchestrator: &UpdateOrchestrator, format: &str) -> Result<()> {
    let package = orchestrator.package();
    let report = CheckReport {
        package: package.name.clone(),
        current_version: package.version.clone(),
        latest_version: orchestrator.remote_version().map(str::to_string),
        update_available: orchestrator.is_update_available(),
        checked_at: Utc::now().to_rfc3339(),
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "plain" => match orchestrator.state() {
            UpdateState::UpdateAvailable => println!(
                "{} v{}: update available (v{})",
                package.full_name(),
                report.current_version,
                report.latest_version.as_deref().unwrap_or("?")
            ),
            UpdateState::UpToDate => {
                println!("{} v{} is up to date", package.full_name(), report.current_version)
            }
            _ => {
                let reason = orchestrator
                    .last_error()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown error".to_string());
                println!("{}: could not check for updates ({})", package.full_name(), reason);
            }
        },
        other => return Err(anyhow!("Unsupported format '{}'. Use plain or json.", other)),
    }
    Ok(())
}

async fn run_update(mut orchestrator: UpdateOrchestrator, yes: bool) -> Result<()> {
    match orchestrator.state() {
        UpdateState::UpToDate => {
            let package = orchestrator.package();
            println!("{} v{} is up to date", package.full_name(), package.version);
            return Ok(());
        }
        UpdateState::Failed => {
            let reason = orchestrator
                .last_error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            println!("Could not check for updates: {}", reason);
            return Ok(());
        }
        _ => {}
    }

    orchestrator.open_details();

    let mut question = "Install this update?";
    loop {
        if !yes && !confirm_prompt(question)? {
            println!("Update skipped.");
            return Ok(());
        }

        if orchestrator.confirm().await == UpdateState::Done {
            break;
        }

        let reason = orchestrator
            .last_error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        eprintln!("Update failed: {}", reason);
        if yes {
            std::process::exit(1);
        }
        question = "Try again?";
    }

    if !yes {
        wait_for_dismiss()?;
    }
    orchestrator.dismiss();
    Ok(())
}

fn confirm_prompt(question: &str) -> Result<bool> {
    let term = console::Term::stderr();
    term.write_str(&format!("{} [y/N] ", question))?;
    let answer = term.read_line()?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn wait_for_dismiss() -> Result<()> {
    let term = console::Term::stderr();
    term.write_str("Press Enter to close ")?;
    term.read_line()?;
    Ok(())
}

fn run_exec(command: &str) -> Result<()> {
    let mut cmd = if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };

    tracing::debug!("Executing: {}", command);
    let status = cmd.status()?;
    if !status.success() {
        return Err(anyhow!("`{}` exited with {}", command, status));
    }
    Ok(())
}

const SETTINGS_KEYS: &str = "staging_dir, show_progress, user_agent";

fn setting_value(settings: &UpdaterSettings, key: &str) -> Option<String> {
    match key {
        "staging_dir" => Some(settings.staging_dir.display().to_string()),
        "show_progress" => Some(settings.show_progress.to_string()),
        "user_agent" => Some(settings.user_agent.clone()),
        _ => None,
    }
}

fn config_command(action: ConfigAction) -> Result<()> {
    let mut settings = load_settings()?;

    match action {
        ConfigAction::Get { key } => {
            if let Some(key) = key {
                let key = normalize_key(&key);
                match setting_value(&settings, &key) {
                    Some(value) => println!("{}", value),
                    None => println!("Setting '{}' not found", key),
                }
            } else {
                println!("--- pkg-updater Settings ---");
                for key in ["staging_dir", "show_progress", "user_agent"] {
                    if let Some(value) = setting_value(&settings, key) {
                        println!("  {}: {}", key, value);
                    }
                }
            }
        }
        ConfigAction::Set { key_value } => {
            let Some((key, value)) = key_value.split_once('=') else {
                return Err(anyhow!("Invalid format. Use 'key=value'."));
            };
            let key = normalize_key(key.trim());
            let value = value.trim();
            match key.as_str() {
                "staging_dir" => settings.staging_dir = PathBuf::from(value),
                "show_progress" => settings.show_progress = parse_bool(value),
                "user_agent" => settings.user_agent = value.to_string(),
                _ => {
                    return Err(anyhow!(
                        "'{}' is not a valid configuration setting. Valid settings: {}",
                        key,
                        SETTINGS_KEYS
                    ))
                }
            }
            save_settings(&settings)?;
            tracing::info!("Setting '{}' updated to '{}'", key, value);
        }
        ConfigAction::Unset { key } => {
            let key = normalize_key(&key);
            let defaults = UpdaterSettings::default();
            match key.as_str() {
                "staging_dir" => settings.staging_dir = defaults.staging_dir,
                "show_progress" => settings.show_progress = defaults.show_progress,
                "user_agent" => settings.user_agent = defaults.user_agent,
                _ => {
                    return Err(anyhow!(
                        "'{}' is not a valid configuration setting. Valid settings: {}",
                        key,
                        SETTINGS_KEYS
                    ))
                }
            }
            save_settings(&settings)?;
            tracing::info!("Setting '{}' unset", key);
        }
        ConfigAction::Show { format } => match format.as_str() {
            "json" => println!("{}", serde_json::to_string_pretty(&settings)?),
            "yaml" => print!("{}", serde_yaml::to_string(&settings)?),
            other => return Err(anyhow!("Unsupported format '{}'. Use json or yaml.", other)),
        },
    }

    Ok(())
}
