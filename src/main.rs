mod app;
mod backend;
mod cli;
mod config;
mod dialog;
mod dispatch;
mod docker;
mod input;
mod jobs;
mod list;
mod model;
mod size_cache;
mod ui;

use anyhow::{Context, Result};
use app::App;
use backend::ContainerBackend;
use clap::Parser;
use cli::CliArgs;
use config::RuntimeConfig;
use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use dispatch::{LoopEffect, execute_app_command, handle_tick, refresh_all, refresh_kind};
use docker::DockerGateway;
use futures::StreamExt;
use model::ResourceKind;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use size_cache::SizeCache;
use std::fs::File;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::Mutex;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let mut config = RuntimeConfig::load(args.config.as_deref())?;
    config.apply_cli(&args);
    match &config.source {
        Some(source) => info!("loaded config from {source}"),
        None => debug!("no config file found, using defaults"),
    }

    let gateway = DockerGateway::connect(
        config.list_all_containers,
        config.exec_shell.clone(),
        config.stop_grace_secs,
    )?;
    gateway.ping().await?;

    let sizes = SizeCache::new();
    sizes.populate_all(&gateway);

    let mut app = App::new(sizes, config.app_settings(), config.list_all_containers);
    run(&mut app, &gateway, config.refresh_ms).await
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    // The TUI owns stdout, so logs go to a file or nowhere.
    let _ = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(io::sink).try_init(),
    };

    Ok(())
}

async fn run<B: ContainerBackend>(app: &mut App, backend: &B, refresh_ms: u64) -> Result<()> {
    let mut terminal = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, backend, refresh_ms).await;
    let restore_result = restore_terminal(&mut terminal);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<TuiTerminal> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop<B: ContainerBackend>(
    terminal: &mut TuiTerminal,
    app: &mut App,
    backend: &B,
    refresh_ms: u64,
) -> Result<()> {
    let size = terminal.size().context("failed to read terminal size")?;
    app.handle_resize(size.width, size.height);
    app.set_status("Loading docker resources...");
    refresh_all(app, backend).await;
    app.set_status("Ready");

    let mut reader = EventStream::new();
    let mut ticker = interval(Duration::from_millis(refresh_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(app.mode(), key) {
                            debug!("action={action:?}");
                            let command = app.apply_action(action);
                            terminal
                                .draw(|frame| ui::render(frame, app))
                                .context("failed to render terminal frame")?;
                            let effect = execute_app_command(app, backend, command).await;
                            if let LoopEffect::OpenShell { container_id } = effect {
                                open_container_shell(terminal, app, backend, &container_id).await;
                            }
                        }
                    }
                    Some(Ok(Event::Resize(width, height))) => app.handle_resize(width, height),
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(format!("terminal event error: {error}"));
                    }
                    None => {
                        app.set_status("terminal event stream closed");
                        break;
                    }
                }
            }
            _ = ticker.tick() => handle_tick(app, backend).await,
        }
    }

    Ok(())
}

async fn open_container_shell<B: ContainerBackend>(
    terminal: &mut TuiTerminal,
    app: &mut App,
    backend: &B,
    container_id: &str,
) {
    info!("opening shell in container {container_id}");
    match run_container_shell(terminal, backend, container_id).await {
        Ok(()) => app.set_status(format!("Shell closed: {}", model::short_id(container_id))),
        Err(error) => {
            warn!("shell in {container_id} failed: {error:#}");
            app.open_error(dispatch::compact_error(&error));
        }
    }
    refresh_kind(app, backend, ResourceKind::Containers).await;
}

async fn run_container_shell<B: ContainerBackend>(
    terminal: &mut TuiTerminal,
    backend: &B,
    container_id: &str,
) -> Result<()> {
    suspend_terminal_for_subprocess(terminal)?;

    let run_result = backend
        .exec_command(container_id)
        .status()
        .await
        .with_context(|| format!("failed to run shell for container {container_id}"));
    let restore_result = resume_terminal_after_subprocess(terminal);

    let status = match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => {
            return Err(anyhow::anyhow!(
                "{run_error:#}\nterminal resume error: {restore_error:#}"
            ));
        }
        (Err(error), _) => return Err(error),
        (_, Err(error)) => return Err(error),
        (Ok(status), Ok(())) => status,
    };

    if status.success() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("container shell exited with {status}"))
    }
}

fn suspend_terminal_for_subprocess(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode for subprocess")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen for subprocess")?;
    terminal
        .show_cursor()
        .context("failed to show cursor for subprocess")?;
    Ok(())
}

fn resume_terminal_after_subprocess(terminal: &mut TuiTerminal) -> Result<()> {
    enable_raw_mode().context("failed to re-enable raw mode after subprocess")?;
    execute!(terminal.backend_mut(), EnterAlternateScreen)
        .context("failed to re-enter alternate screen after subprocess")?;
    terminal
        .clear()
        .context("failed to clear terminal after subprocess")?;
    Ok(())
}
