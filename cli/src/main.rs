// background-locator — desktop harness for the background location service
//
// Drives the service with scripted commands against simulated backends and
// prints every location delivery and diagnostic event as a JSON line.

mod config;
mod host;
mod output;
mod script;
mod simulator;

use anyhow::{Context, Result};
use background_locator_core::keys;
use background_locator_core::{
    BackgroundLocator, LocationClient, PreferenceStore, ServiceCollaborators, ServiceState,
    SledPreferences,
};
use clap::{Parser, Subcommand};
use colored::*;
use script::ScriptLine;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "background-locator")]
#[command(about = "Background location service harness", long_about = None)]
#[command(version)]
struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the service, reading JSON-line commands from a script or stdin
    Run {
        #[arg(short, long)]
        script: Option<PathBuf>,
        /// Backend to select before starting (platform | third-party)
        #[arg(short, long)]
        provider: Option<String>,
    },
    /// Show persisted service state
    Status,
    /// Configure the harness
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Edit persisted preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Set { key: String, value: String },
    Get { key: String },
    List,
}

#[derive(Subcommand)]
enum PrefsAction {
    /// Select the backend used by the next start
    SetProvider { provider: String },
    /// Register the handle sent with every location delivery
    SetCallback { handle: i64 },
    /// Clear a running flag left behind by a killed process
    ClearRunning,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = match cli.log_file {
        Some(path) => Some(path),
        None => config::Config::load()
            .ok()
            .and_then(|c| c.log_file)
            .map(PathBuf::from),
    };
    let _log_guard = init_logging(log_file.as_deref())?;

    match cli.command {
        Commands::Run { script, provider } => cmd_run(script, provider).await,
        Commands::Status => cmd_status(),
        Commands::Config { action } => cmd_config(action),
        Commands::Prefs { action } => cmd_prefs(action),
    }
}

/// Console logging on stderr, plus a non-blocking file writer when asked
fn init_logging(
    log_file: Option<&Path>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let console_layer = fmt::layer().with_writer(std::io::stderr).compact();

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().context("Log file path has no file name")?;
    std::fs::create_dir_all(dir).context("Failed to create log directory")?;

    let (non_blocking, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(Some(guard))
}

fn open_preferences(config: &config::Config) -> Result<SledPreferences> {
    let path = config.preferences_path()?;
    let fresh = !path.exists();

    let preferences = SledPreferences::open(&path).with_context(|| {
        format!(
            "Failed to open preferences at {} (is another harness running?)",
            path.display()
        )
    })?;

    if fresh {
        preferences.set_location_client(config.default_provider)?;
        preferences.set_callback_handle(keys::CALLBACK_HANDLE_KEY, config.callback_handle)?;
    }
    Ok(preferences)
}

async fn cmd_run(script: Option<PathBuf>, provider: Option<String>) -> Result<()> {
    let config = config::Config::load()?;
    let preferences = Arc::new(open_preferences(&config)?);

    if let Some(provider) = provider {
        let client: LocationClient = provider.parse().context("Invalid provider")?;
        preferences.set_location_client(client)?;
    }
    if preferences.is_service_running() {
        eprintln!(
            "{} running flag is set from an earlier session; START is ignored until SHUTDOWN",
            "⚠".yellow()
        );
    }

    let host = Arc::new(host::ProcessHost::new());
    let (locator, main_loop) = BackgroundLocator::new(ServiceCollaborators {
        preferences: preferences.clone(),
        notifications: Arc::new(host::ConsoleNotifications::new()),
        wake_lock: Arc::new(host::TimedWakeLock::new()),
        host: host.clone(),
        backends: Arc::new(simulator::SimulatedBackends::new(config.simulator.clone())),
    });
    let main_task = tokio::spawn(main_loop.run());

    let output = Arc::new(output::JsonLines::stdout());
    locator.engine().attach(output.clone());

    let service = locator.service().clone();
    service.listen(output);
    service.on_create();

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &script {
        Some(path) => Box::new(BufReader::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open script {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let mut lines = reader.lines();

    eprintln!("{}", "Service created; waiting for commands".bold());

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read commands")?,
            _ = host.stopped() => break,
            _ = tokio::signal::ctrl_c() => break,
        };
        let Some(line) = line else { break };

        let parsed = match ScriptLine::parse(&line) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("  {} {:#}", "✗".red(), e);
                continue;
            }
        };

        match parsed {
            ScriptLine::Intent(intent) => {
                let intent = script::with_default_interval(intent, config.fix_interval_ms);
                let result = service.on_start_command(Some(&intent));
                eprintln!(
                    "  {} {} -> {:?}",
                    "▸".bright_green(),
                    intent.action.as_deref().unwrap_or("(no action)"),
                    result
                );
            }
            ScriptLine::Method(call) => {
                let result = service.on_method_call(&call);
                eprintln!("  {} {} -> {:?}", "▸".bright_green(), call.method, result);
            }
            ScriptLine::Sleep { sleep_ms } => {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(sleep_ms)) => {}
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }

        if host.stop_requested() {
            break;
        }
    }

    if service.state() == ServiceState::Running {
        eprintln!("{}", "Input finished; shutting down".dimmed());
        service.shutdown();
    }
    service.on_destroy();
    locator.main().flush().await;
    main_task.abort();

    eprintln!("{}", "Service destroyed".bold());
    Ok(())
}

fn cmd_status() -> Result<()> {
    let config = config::Config::load()?;
    let preferences = open_preferences(&config)?;

    println!("{}", "Background Locator Status".bold());
    let running = if preferences.is_service_running() {
        "running".bright_green()
    } else {
        "stopped".dimmed()
    };
    println!("  Service:   {}", running);
    println!(
        "  Provider:  {}",
        preferences.location_client().to_string().bright_cyan()
    );
    match preferences.callback_handle(keys::CALLBACK_HANDLE_KEY) {
        Some(handle) => println!("  Callback:  {}", handle),
        None => println!("  Callback:  {}", "(not registered)".yellow()),
    }
    println!(
        "  Storage:   {}",
        config.preferences_path()?.display().to_string().dimmed()
    );

    Ok(())
}

fn cmd_config(action: ConfigAction) -> Result<()> {
    let mut config = config::Config::load()?;

    match action {
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            config.save()?;
            println!("{} {} = {}", "✓".green(), key.bright_cyan(), value);
        }
        ConfigAction::Get { key } => match config.get(&key) {
            Some(value) => println!("{}", value),
            None => anyhow::bail!("Unknown or unset config key: {}", key),
        },
        ConfigAction::List => {
            println!("{}", "Configuration".bold());
            for (key, value) in config.list() {
                println!("  {:<18} {}", key.bright_cyan(), value);
            }
            println!();
            println!("File: {}", config::Config::config_file()?.display());
        }
    }

    Ok(())
}

fn cmd_prefs(action: PrefsAction) -> Result<()> {
    let config = config::Config::load()?;
    let preferences = open_preferences(&config)?;

    match action {
        PrefsAction::SetProvider { provider } => {
            let client: LocationClient = provider.parse().context("Invalid provider")?;
            preferences.set_location_client(client)?;
            println!("{} provider = {}", "✓".green(), client);
        }
        PrefsAction::SetCallback { handle } => {
            preferences.set_callback_handle(keys::CALLBACK_HANDLE_KEY, handle)?;
            println!("{} callback = {}", "✓".green(), handle);
        }
        PrefsAction::ClearRunning => {
            preferences.set_service_running(false)?;
            println!("{} running flag cleared", "✓".green());
        }
    }

    Ok(())
}
