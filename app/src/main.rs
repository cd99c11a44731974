//! GIF Portal - share GIF links on a Solana program from the terminal

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use solana_sdk::pubkey::Pubkey;
use std::{
    fs::OpenOptions,
    io,
    path::{Path, PathBuf},
    str::FromStr,
    sync::{Arc, Mutex},
    time::Instant,
};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app;
mod base_account;
mod config;
mod idl;
mod preview;
mod program;
mod rpc;
mod screens;
#[cfg(test)]
mod testing;
mod view_model;
mod wallet;

use app::{App, AppMessage};
use config::{AppConfig, Cluster, Commitment};
use idl::Idl;
use program::ProgramClient;
use rpc::SolanaRpc;
use wallet::{KeypairWallet, WalletConnector, WalletProvider};

#[derive(Parser, Debug)]
#[command(name = "portal")]
#[command(about = "GIF Portal - share GIF links on Solana")]
#[command(version)]
struct Cli {
    /// Cluster to connect to
    #[arg(short, long, value_enum)]
    cluster: Option<Cluster>,

    /// RPC endpoint (overrides the cluster default)
    #[arg(long)]
    rpc_url: Option<String>,

    /// Commitment level for reads and confirmations
    #[arg(long, value_enum)]
    commitment: Option<Commitment>,

    /// Program address (defaults to the one in the IDL)
    #[arg(long)]
    program_id: Option<String>,

    /// Wallet keypair file
    #[arg(short, long)]
    wallet: Option<String>,

    /// Base account keypair file for a private list (generated if missing)
    #[arg(long)]
    base_account: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Re-fetch the list every N seconds (0 disables)
    #[arg(long)]
    refresh_interval: Option<u64>,

    /// Log file path
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Apply command line overrides on top of the stored config.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(cluster) = self.cluster {
            config.cluster = cluster;
            // A cluster switch drops a stored endpoint for the old one
            config.rpc_url = None;
        }
        if let Some(url) = &self.rpc_url {
            config.rpc_url = Some(url.clone());
        }
        if let Some(commitment) = self.commitment {
            config.commitment = commitment;
        }
        if let Some(id) = &self.program_id {
            config.program_id = Some(id.clone());
        }
        if let Some(path) = &self.wallet {
            config.wallet_path = Some(path.clone());
        }
        if let Some(path) = &self.base_account {
            config.base_account_path = Some(path.clone());
        }
        if let Some(secs) = self.timeout {
            config.request_timeout_secs = secs;
        }
        if let Some(secs) = self.refresh_interval {
            config.refresh_interval_secs = Some(secs);
        }
    }
}

/// Send logs to a file; the terminal belongs to the UI.
fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))
}

fn build_program(config: &AppConfig) -> Result<ProgramClient> {
    let idl = Idl::embedded()?;
    let program_id = match &config.program_id {
        Some(id) => Pubkey::from_str(id).with_context(|| format!("Invalid program id {}", id))?,
        None => idl.program_id()?,
    };
    let base_account = base_account::resolve(config.base_account_path().as_deref())?;
    let rpc = SolanaRpc::new(config.rpc_url(), config.commitment);
    info!(
        idl = %idl.name,
        idl_version = %idl.version,
        cluster = config.cluster.name(),
        rpc = %rpc.url(),
        program = %program_id,
        "Using program"
    );

    Ok(ProgramClient::new(
        idl,
        program_id,
        base_account,
        Arc::new(rpc),
        config.request_timeout(),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_default();
    cli.apply(&mut config);

    let log_path = cli
        .log_file
        .clone()
        .unwrap_or_else(|| AppConfig::dir().join("portal.log"));
    init_logging(&log_path)?;

    // Fail before touching the terminal if the program cannot be reached at all
    let program = Arc::new(build_program(&config)?);

    let provider: Arc<dyn WalletProvider> =
        Arc::new(KeypairWallet::new(config.wallet_path(), config.trusted()));
    let wallet = WalletConnector::new(Some(provider), config.request_timeout());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let picker = App::detect_picker();
    let mut app = App::new(config, wallet, program, Some(picker));

    // Create message channel for async operations
    let (tx, mut rx) = mpsc::channel::<AppMessage>(32);

    // Reconnect a previously approved wallet
    app.init_session(tx.clone());

    // Run app
    let result = run_app(&mut terminal, &mut app, tx, &mut rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        error!(error = %e, "Exited with error");
        eprintln!("Error: {}", e);
    }

    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    tx: mpsc::Sender<AppMessage>,
    rx: &mut mpsc::Receiver<AppMessage>,
) -> Result<()> {
    let refresh_interval = app.config.refresh_interval();
    let mut last_refresh = Instant::now();

    loop {
        // Draw UI
        terminal.draw(|f| app.render(f))?;

        // Handle async messages
        while let Ok(msg) = rx.try_recv() {
            app.handle_message(msg, tx.clone()).await?;
        }

        // Periodic list refresh
        if let Some(interval) = refresh_interval {
            if last_refresh.elapsed() >= interval {
                last_refresh = Instant::now();
                app.refresh_if_idle(tx.clone());
            }
        }

        // Poll for events with timeout
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    // Global quit
                    if matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q')) && app.can_quit() {
                        return Ok(());
                    }

                    // Let app handle key
                    app.handle_key(key, tx.clone()).await?;
                }
            }
        }

        // Check if app wants to quit
        if app.should_quit() {
            return Ok(());
        }
    }
}
