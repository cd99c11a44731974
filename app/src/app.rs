//! Application state machine.

use crate::{
    config::AppConfig,
    preview::{is_web_link, PreviewFetcher},
    program::{ProgramClient, ProgramError},
    screens::{
        disconnected::DisconnectedScreen, ready::ReadyScreen, uninitialized::UninitializedScreen,
        Screen, FOOTER_LINK,
    },
    view_model::{FetchTicket, ItemList, Notice, Refused, RenderState, ViewModel},
    wallet::{WalletConnector, WalletError},
};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use image::DynamicImage;
use ratatui::Frame;
use ratatui_image::{picker::Picker, protocol::StatefulProtocol};
use solana_sdk::pubkey::Pubkey;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Messages for async operations.
#[derive(Debug, Clone)]
pub enum AppMessage {
    /// Wallet connected (silently on start, or after the connect key)
    WalletConnected { address: Pubkey, explicit: bool },
    /// Wallet connection failed
    WalletFailed { error: WalletError, explicit: bool },
    /// Item list fetched
    ItemsFetched { ticket: FetchTicket, result: Result<ItemList, ProgramError> },
    /// Submit finished
    ItemSubmitted(Result<(), ProgramError>),
    /// Base account creation finished
    AccountInitialized(Result<(), ProgramError>),
    /// Preview image downloaded
    PreviewLoaded { link: String, image: DynamicImage },
    /// Preview download failed
    PreviewFailed { link: String, reason: String },
}

/// Preview pane state for the selected item.
pub enum Preview {
    Empty,
    Loading(String),
    Ready { link: String, image: StatefulProtocol },
    Failed { link: String, reason: String },
}

impl Preview {
    pub fn link(&self) -> Option<&str> {
        match self {
            Preview::Empty => None,
            Preview::Loading(link) => Some(link),
            Preview::Ready { link, .. } | Preview::Failed { link, .. } => Some(link),
        }
    }
}

/// Main application state.
pub struct App {
    pub config: AppConfig,
    pub config_path: PathBuf,
    pub view: ViewModel,
    pub wallet: WalletConnector,
    pub program: Arc<ProgramClient>,
    pub previews: PreviewFetcher,
    pub quit: bool,

    // Screens
    pub disconnected: DisconnectedScreen,
    pub uninitialized: UninitializedScreen,
    pub ready: ReadyScreen,

    // Image support for the preview pane. None disables previews.
    pub picker: Option<Picker>,
    pub preview: Preview,
}

impl App {
    pub fn new(
        config: AppConfig,
        wallet: WalletConnector,
        program: Arc<ProgramClient>,
        picker: Option<Picker>,
    ) -> Self {
        let previews = PreviewFetcher::new(config.request_timeout());
        Self {
            config,
            config_path: AppConfig::path(),
            view: ViewModel::new(),
            wallet,
            program,
            previews,
            quit: false,
            disconnected: DisconnectedScreen::new(),
            uninitialized: UninitializedScreen::new(),
            ready: ReadyScreen::new(),
            picker,
            preview: Preview::Empty,
        }
    }

    /// Query the terminal for graphics support.
    /// Must be called after entering the alternate screen and before the event loop.
    pub fn detect_picker() -> Picker {
        // Detects Kitty, iTerm2 or Sixel; otherwise halfblocks with an estimated font size
        Picker::from_query_stdio().unwrap_or_else(|_| Picker::from_fontsize((8, 16)))
    }

    /// Try to reconnect a previously approved wallet without prompting.
    /// Called once after App::new() with the message sender.
    pub fn init_session(&self, tx: mpsc::Sender<AppMessage>) {
        let wallet = self.wallet.clone();
        tokio::spawn(async move {
            let msg = match wallet.try_reconnect_silently().await {
                Ok(address) => AppMessage::WalletConnected { address, explicit: false },
                Err(error) => AppMessage::WalletFailed { error, explicit: false },
            };
            let _ = tx.send(msg).await;
        });
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();

        match self.view.render_state() {
            RenderState::Disconnected => self.disconnected.render(frame, area, self),
            RenderState::Uninitialized => self.uninitialized.render(frame, area, self),
            RenderState::Ready => crate::screens::ready::render_ready_with_preview(frame, area, self),
        }
    }

    pub async fn handle_key(&mut self, key: KeyEvent, tx: mpsc::Sender<AppMessage>) -> Result<()> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        // Global keys
        match key.code {
            KeyCode::Char('c') if ctrl => {
                self.quit = true;
                return Ok(());
            }
            KeyCode::Char('t') if ctrl => {
                self.open_link(FOOTER_LINK);
                return Ok(());
            }
            KeyCode::Esc => {
                self.view.dismiss_notice();
                return Ok(());
            }
            KeyCode::Char('d') if ctrl => {
                if self.view.wallet_address().is_some() {
                    self.disconnect().await;
                }
                return Ok(());
            }
            _ => {}
        }

        match self.view.render_state() {
            RenderState::Disconnected => self.handle_disconnected_key(key, tx),
            RenderState::Uninitialized => self.handle_uninitialized_key(key, ctrl, tx),
            RenderState::Ready => self.handle_ready_key(key, ctrl, tx),
        }
        Ok(())
    }

    fn handle_disconnected_key(&mut self, key: KeyEvent, tx: mpsc::Sender<AppMessage>) {
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('C') | KeyCode::Enter => self.connect(tx),
            _ => {}
        }
    }

    fn handle_uninitialized_key(&mut self, key: KeyEvent, ctrl: bool, tx: mpsc::Sender<AppMessage>) {
        match key.code {
            KeyCode::Char('r') if ctrl => self.refresh(tx),
            KeyCode::Char('i') | KeyCode::Char('I') | KeyCode::Enter => self.initialize(tx),
            _ => {}
        }
    }

    fn handle_ready_key(&mut self, key: KeyEvent, ctrl: bool, tx: mpsc::Sender<AppMessage>) {
        match key.code {
            KeyCode::Char('r') if ctrl => self.refresh(tx),
            KeyCode::Char('o') if ctrl => {
                if let Some(item) = self.view.selected_item() {
                    let link = item.link.clone();
                    self.open_link(&link);
                }
            }
            KeyCode::Char(_) if ctrl => {}
            KeyCode::Char(c) => self.view.push_char(c),
            KeyCode::Backspace => self.view.pop_char(),
            KeyCode::Enter => self.submit(tx),
            KeyCode::Up => {
                self.view.select_previous();
                self.sync_preview(tx);
            }
            KeyCode::Down => {
                self.view.select_next();
                self.sync_preview(tx);
            }
            _ => {}
        }
    }

    fn connect(&mut self, tx: mpsc::Sender<AppMessage>) {
        if !self.view.begin_connect() {
            return;
        }
        let wallet = self.wallet.clone();
        tokio::spawn(async move {
            let msg = match wallet.connect().await {
                Ok(address) => AppMessage::WalletConnected { address, explicit: true },
                Err(error) => AppMessage::WalletFailed { error, explicit: true },
            };
            let _ = tx.send(msg).await;
        });
    }

    /// Forget the session. The provider is released before returning so a
    /// following connect cannot be overtaken by it.
    async fn disconnect(&mut self) {
        if let Err(refused) = self.view.disconnect() {
            self.report_refused(refused);
            return;
        }
        self.preview = Preview::Empty;
        self.wallet.disconnect().await;
    }

    fn initialize(&mut self, tx: mpsc::Sender<AppMessage>) {
        if let Err(refused) = self.view.begin_initialize() {
            self.report_refused(refused);
            return;
        }
        let provider = match self.wallet.provider() {
            Ok(p) => p,
            Err(e) => {
                self.view.initialize_finished(Err(e.into()));
                return;
            }
        };

        info!("Creating the program account");
        let program = self.program.clone();
        tokio::spawn(async move {
            let result = program.initialize_account(provider.as_ref()).await.map(|_| ());
            let _ = tx.send(AppMessage::AccountInitialized(result)).await;
        });
    }

    fn submit(&mut self, tx: mpsc::Sender<AppMessage>) {
        let link = match self.view.begin_submit() {
            Ok(link) => link,
            Err(refused) => {
                self.report_refused(refused);
                return;
            }
        };
        let provider = match self.wallet.provider() {
            Ok(p) => p,
            Err(e) => {
                self.view.submit_finished(Err(e.into()));
                return;
            }
        };

        info!(%link, "Submitting link");
        let program = self.program.clone();
        tokio::spawn(async move {
            let result = program.submit_item(provider.as_ref(), &link).await.map(|_| ());
            let _ = tx.send(AppMessage::ItemSubmitted(result)).await;
        });
    }

    fn report_refused(&mut self, refused: Refused) {
        match refused {
            Refused::Empty => debug!("Ignoring empty submit"),
            Refused::Busy => self.view.set_notice(Notice::warning("Still waiting on the previous request")),
            Refused::NotConnected => self.view.set_notice(Notice::error("Connect a wallet first")),
            Refused::AlreadyInitialized => {}
        }
    }

    /// Re-fetch the list on demand.
    pub fn refresh(&mut self, tx: mpsc::Sender<AppMessage>) {
        if self.view.wallet_address().is_none() {
            return;
        }
        let ticket = self.view.begin_fetch();
        self.fetch_items(ticket, tx);
    }

    /// Periodic refresh, skipped while a mutation or fetch is in flight.
    pub fn refresh_if_idle(&mut self, tx: mpsc::Sender<AppMessage>) {
        if self.view.render_state() == RenderState::Ready && !self.view.is_busy() && !self.view.is_fetching() {
            self.refresh(tx);
        }
    }

    fn fetch_items(&self, ticket: FetchTicket, tx: mpsc::Sender<AppMessage>) {
        let program = self.program.clone();
        tokio::spawn(async move {
            let result = program.fetch_items().await;
            let _ = tx.send(AppMessage::ItemsFetched { ticket, result }).await;
        });
    }

    pub async fn handle_message(&mut self, msg: AppMessage, tx: mpsc::Sender<AppMessage>) -> Result<()> {
        match msg {
            AppMessage::WalletConnected { address, explicit } => {
                if explicit && self.config.trust_wallet(&address) {
                    if let Err(e) = AppConfig::persist_trusted(&self.config_path, &address) {
                        warn!(error = %e, "Failed to save trusted wallet");
                    }
                }
                if let Some(ticket) = self.view.wallet_connected(address) {
                    self.fetch_items(ticket, tx);
                }
            }
            AppMessage::WalletFailed { error, explicit } => {
                self.view.wallet_failed(&error, explicit);
            }
            AppMessage::ItemsFetched { ticket, result } => {
                if self.view.apply_fetch(ticket, result) {
                    self.sync_preview(tx);
                }
            }
            AppMessage::ItemSubmitted(result) => {
                if let Some(ticket) = self.view.submit_finished(result) {
                    self.fetch_items(ticket, tx);
                }
            }
            AppMessage::AccountInitialized(result) => {
                if let Some(ticket) = self.view.initialize_finished(result) {
                    self.fetch_items(ticket, tx);
                }
            }
            AppMessage::PreviewLoaded { link, image } => {
                if self.preview.link() == Some(link.as_str()) {
                    if let Some(picker) = &self.picker {
                        self.preview = Preview::Ready { link, image: picker.new_resize_protocol(image) };
                    }
                }
            }
            AppMessage::PreviewFailed { link, reason } => {
                if self.preview.link() == Some(link.as_str()) {
                    debug!(%link, %reason, "Preview unavailable");
                    self.preview = Preview::Failed { link, reason };
                }
            }
        }
        Ok(())
    }

    /// Start loading the selected item's preview if it is not already shown.
    fn sync_preview(&mut self, tx: mpsc::Sender<AppMessage>) {
        if self.picker.is_none() {
            return;
        }
        let Some(item) = self.view.selected_item() else {
            self.preview = Preview::Empty;
            return;
        };
        if self.preview.link() == Some(item.link.as_str()) {
            return;
        }

        let link = item.link.clone();
        if !is_web_link(&link) {
            self.preview = Preview::Failed { link, reason: "Not an http(s) link".to_string() };
            return;
        }

        self.preview = Preview::Loading(link.clone());
        let previews = self.previews.clone();
        tokio::spawn(async move {
            let msg = match previews.fetch(&link).await {
                Ok(image) => AppMessage::PreviewLoaded { link, image },
                Err(e) => AppMessage::PreviewFailed { link, reason: e.to_string() },
            };
            let _ = tx.send(msg).await;
        });
    }

    fn open_link(&mut self, url: &str) {
        if let Err(e) = open::that(url) {
            warn!(%url, error = %e, "Failed to open link");
            self.view.set_notice(Notice::error(format!("Could not open {}: {}", url, e)));
        }
    }

    /// Whether `q` quits. In the submission form it is typed instead.
    pub fn can_quit(&self) -> bool {
        self.view.render_state() != RenderState::Ready
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }
}
