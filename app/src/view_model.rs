//! Client state and the transitions between the three screens.
//!
//! Nothing in here performs I/O. Operations that need the network hand back
//! a [`FetchTicket`] or the link to submit, and the app runs the request and
//! feeds the result back in.

use crate::{program::ProgramError, wallet::WalletError};
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info, warn};

/// A submitted link as stored in the program account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub link: String,
    pub user_address: Pubkey,
}

/// Remote item list. `Uninitialized` means the program account has not been created.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ItemList {
    #[default]
    Uninitialized,
    Ready(Vec<Item>),
}

impl ItemList {
    pub fn items(&self) -> &[Item] {
        match self {
            ItemList::Uninitialized => &[],
            ItemList::Ready(items) => items,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub wallet_address: Option<Pubkey>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftInput {
    pub text: String,
}

/// Which screen to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Disconnected,
    Uninitialized,
    Ready,
}

/// The mutation currently in flight, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    Connecting,
    Initializing,
    Submitting(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

/// Identifies one issued fetch. Only the latest ticket's result is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

/// Why a submit or initialize was refused before reaching the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refused {
    /// Draft is empty.
    Empty,
    /// Another operation is still running.
    Busy,
    /// No wallet connected.
    NotConnected,
    /// Account already exists.
    AlreadyInitialized,
}

#[derive(Debug, Default)]
pub struct ViewModel {
    session: Session,
    draft: DraftInput,
    items: ItemList,
    pending: Option<Pending>,
    fetching: bool,
    notice: Option<Notice>,
    fetch_seq: u64,
    provider_missing_reported: bool,
    selected: usize,
}

impl ViewModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render_state(&self) -> RenderState {
        match (&self.session.wallet_address, &self.items) {
            (None, _) => RenderState::Disconnected,
            (Some(_), ItemList::Uninitialized) => RenderState::Uninitialized,
            (Some(_), ItemList::Ready(_)) => RenderState::Ready,
        }
    }

    pub fn wallet_address(&self) -> Option<Pubkey> {
        self.session.wallet_address
    }

    pub fn items(&self) -> &ItemList {
        &self.items
    }

    pub fn draft(&self) -> &str {
        &self.draft.text
    }

    pub fn pending(&self) -> Option<&Pending> {
        self.pending.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    // Draft editing

    pub fn push_char(&mut self, c: char) {
        self.draft.text.push(c);
    }

    pub fn pop_char(&mut self) {
        self.draft.text.pop();
    }

    // Wallet

    /// Mark an explicit connection attempt. Returns false if one is running.
    pub fn begin_connect(&mut self) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.pending = Some(Pending::Connecting);
        true
    }

    /// Record the connected address. A new address needs a fetch.
    pub fn wallet_connected(&mut self, address: Pubkey) -> Option<FetchTicket> {
        if self.pending == Some(Pending::Connecting) {
            self.pending = None;
        }
        if self.session.wallet_address == Some(address) {
            return None;
        }
        info!(%address, "Wallet address set");
        self.session.wallet_address = Some(address);
        self.items = ItemList::Uninitialized;
        self.selected = 0;
        if matches!(self.notice.as_ref(), Some(n) if n.level != NoticeLevel::Info) {
            self.notice = None;
        }
        Some(self.begin_fetch())
    }

    /// Record a failed connection. `explicit` is false for the silent reconnect on start.
    pub fn wallet_failed(&mut self, err: &WalletError, explicit: bool) {
        if self.pending == Some(Pending::Connecting) {
            self.pending = None;
        }
        match err {
            WalletError::ProviderMissing => {
                warn!("Wallet provider not found");
                if explicit || !self.provider_missing_reported {
                    self.provider_missing_reported = true;
                    self.notice = Some(Notice::warning(err.to_string()));
                }
            }
            WalletError::Rejected(reason) if !explicit => {
                debug!(%reason, "Silent reconnect declined");
            }
            other => {
                warn!(error = %other, "Wallet connection failed");
                if explicit {
                    self.notice = Some(Notice::error(other.to_string()));
                }
            }
        }
    }

    /// Drop the session and everything fetched for it.
    ///
    /// Refused while a submit or initialize is in flight, so its result
    /// cannot land on a later session.
    pub fn disconnect(&mut self) -> Result<(), Refused> {
        if matches!(self.pending, Some(Pending::Initializing) | Some(Pending::Submitting(_))) {
            return Err(Refused::Busy);
        }
        self.session.wallet_address = None;
        self.items = ItemList::Uninitialized;
        self.pending = None;
        self.fetching = false;
        self.selected = 0;
        // Invalidate any fetch still in flight.
        self.fetch_seq += 1;
        self.notice = Some(Notice::info("Wallet disconnected"));
        Ok(())
    }

    // Fetch

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.fetch_seq += 1;
        self.fetching = true;
        debug!(seq = self.fetch_seq, "Fetching item list");
        FetchTicket(self.fetch_seq)
    }

    /// Apply a fetch result. Returns false when the ticket is stale.
    pub fn apply_fetch(&mut self, ticket: FetchTicket, result: Result<ItemList, ProgramError>) -> bool {
        if ticket.0 != self.fetch_seq || self.session.wallet_address.is_none() {
            debug!(seq = ticket.0, latest = self.fetch_seq, "Dropping stale fetch result");
            return false;
        }
        self.fetching = false;
        match result {
            Ok(list) => {
                if let ItemList::Ready(items) = &list {
                    info!(count = items.len(), "Got the item list");
                    self.selected = self.selected.min(items.len().saturating_sub(1));
                } else {
                    info!("Program account not created yet");
                    self.selected = 0;
                }
                self.items = list;
            }
            Err(err) => {
                warn!(error = %err, "Failed to fetch item list");
                self.notice = Some(Notice::error(format!("Could not load items: {}", err)));
            }
        }
        true
    }

    // Submit

    /// Take the draft for submission.
    pub fn begin_submit(&mut self) -> Result<String, Refused> {
        let link = self.draft.text.trim();
        if link.is_empty() {
            debug!("No link given");
            return Err(Refused::Empty);
        }
        if self.session.wallet_address.is_none() {
            return Err(Refused::NotConnected);
        }
        if self.pending.is_some() {
            return Err(Refused::Busy);
        }
        let link = link.to_string();
        self.pending = Some(Pending::Submitting(link.clone()));
        Ok(link)
    }

    pub fn submit_finished(&mut self, result: Result<(), ProgramError>) -> Option<FetchTicket> {
        let link = match self.pending.take() {
            Some(Pending::Submitting(link)) => link,
            other => {
                self.pending = other;
                return None;
            }
        };
        match result {
            Ok(()) => {
                info!(%link, "Link sent to program");
                if self.draft.text.trim() == link {
                    self.draft.text.clear();
                }
                self.notice = Some(Notice::info("Link submitted"));
                Some(self.begin_fetch())
            }
            Err(err) => {
                warn!(%link, error = %err, "Error when sending link");
                self.notice = Some(Notice::error(format!("Submit failed: {}", err)));
                None
            }
        }
    }

    // Initialize

    pub fn begin_initialize(&mut self) -> Result<(), Refused> {
        if self.session.wallet_address.is_none() {
            return Err(Refused::NotConnected);
        }
        if matches!(self.items, ItemList::Ready(_)) {
            return Err(Refused::AlreadyInitialized);
        }
        if self.pending.is_some() {
            return Err(Refused::Busy);
        }
        self.pending = Some(Pending::Initializing);
        Ok(())
    }

    pub fn initialize_finished(&mut self, result: Result<(), ProgramError>) -> Option<FetchTicket> {
        if self.pending != Some(Pending::Initializing) {
            return None;
        }
        self.pending = None;
        match result {
            Ok(()) => {
                info!("Created the program account");
                self.notice = Some(Notice::info("Program account created"));
                Some(self.begin_fetch())
            }
            Err(err) => {
                warn!(error = %err, "Error when creating the program account");
                self.notice = Some(Notice::error(format!("Initialization failed: {}", err)));
                None
            }
        }
    }

    // Selection

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected_item(&self) -> Option<&Item> {
        self.items.items().get(self.selected)
    }

    pub fn select_next(&mut self) {
        let len = self.items.items().len();
        if len > 0 && self.selected + 1 < len {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(link: &str) -> Item {
        Item { link: link.to_string(), user_address: Pubkey::new_unique() }
    }

    fn connected() -> (ViewModel, FetchTicket) {
        let mut vm = ViewModel::new();
        let ticket = vm.wallet_connected(Pubkey::new_unique()).unwrap();
        (vm, ticket)
    }

    fn ready(items: Vec<Item>) -> ViewModel {
        let (mut vm, ticket) = connected();
        assert!(vm.apply_fetch(ticket, Ok(ItemList::Ready(items))));
        vm
    }

    fn type_text(vm: &mut ViewModel, text: &str) {
        for c in text.chars() {
            vm.push_char(c);
        }
    }

    #[test]
    fn test_starts_disconnected() {
        let vm = ViewModel::new();
        assert_eq!(vm.render_state(), RenderState::Disconnected);
        assert_eq!(vm.items(), &ItemList::Uninitialized);
    }

    #[test]
    fn test_connect_triggers_single_fetch() {
        let mut vm = ViewModel::new();
        let address = Pubkey::new_unique();

        assert!(vm.begin_connect());
        let ticket = vm.wallet_connected(address);
        assert!(ticket.is_some());
        assert_eq!(vm.wallet_address(), Some(address));
        assert!(vm.is_fetching());
        assert!(!vm.is_busy());

        // Same address again: no second fetch.
        assert_eq!(vm.wallet_connected(address), None);
    }

    #[test]
    fn test_uninitialized_fetch_wins_over_prior_list() {
        let mut vm = ready(vec![item("https://example.com/old.gif")]);
        assert_eq!(vm.render_state(), RenderState::Ready);

        let ticket = vm.begin_fetch();
        vm.apply_fetch(ticket, Ok(ItemList::Uninitialized));
        assert_eq!(vm.render_state(), RenderState::Uninitialized);
        assert!(vm.items().items().is_empty());
    }

    #[test]
    fn test_empty_submit_changes_nothing() {
        let mut vm = ready(vec![]);
        assert_eq!(vm.begin_submit(), Err(Refused::Empty));
        type_text(&mut vm, "   ");
        assert_eq!(vm.begin_submit(), Err(Refused::Empty));
        assert!(vm.pending().is_none());
        assert_eq!(vm.draft(), "   ");
        assert_eq!(vm.render_state(), RenderState::Ready);
    }

    #[test]
    fn test_submit_then_refetch_replaces_list() {
        let mut vm = ready(vec![item("https://example.com/old.gif")]);
        type_text(&mut vm, "https://example.com/a.gif");

        let link = vm.begin_submit().unwrap();
        assert_eq!(link, "https://example.com/a.gif");
        assert_eq!(vm.pending(), Some(&Pending::Submitting(link.clone())));

        let ticket = vm.submit_finished(Ok(())).unwrap();
        assert_eq!(vm.draft(), "");

        let remote = vec![item("https://example.com/a.gif")];
        vm.apply_fetch(ticket, Ok(ItemList::Ready(remote.clone())));
        assert_eq!(vm.items(), &ItemList::Ready(remote.clone()));

        // Same remote state fetched again yields the same list.
        let ticket = vm.begin_fetch();
        vm.apply_fetch(ticket, Ok(ItemList::Ready(remote.clone())));
        assert_eq!(vm.items(), &ItemList::Ready(remote));
    }

    #[test]
    fn test_submit_failure_keeps_draft_and_reports() {
        let mut vm = ready(vec![]);
        type_text(&mut vm, "https://example.com/a.gif");
        vm.begin_submit().unwrap();

        assert_eq!(vm.submit_finished(Err(ProgramError::Rpc("boom".into()))), None);
        assert_eq!(vm.draft(), "https://example.com/a.gif");
        assert!(vm.pending().is_none());
        assert_eq!(vm.notice().unwrap().level, NoticeLevel::Error);
    }

    #[test]
    fn test_overlapping_submit_refused() {
        let mut vm = ready(vec![]);
        type_text(&mut vm, "https://example.com/a.gif");
        vm.begin_submit().unwrap();
        assert_eq!(vm.begin_submit(), Err(Refused::Busy));
        assert_eq!(vm.begin_initialize(), Err(Refused::AlreadyInitialized));
    }

    #[test]
    fn test_stale_fetch_ignored() {
        let (mut vm, first) = connected();
        let second = vm.begin_fetch();

        assert!(!vm.apply_fetch(first, Ok(ItemList::Ready(vec![item("stale")]))));
        assert_eq!(vm.render_state(), RenderState::Uninitialized);

        assert!(vm.apply_fetch(second, Ok(ItemList::Ready(vec![]))));
        assert_eq!(vm.render_state(), RenderState::Ready);
    }

    #[test]
    fn test_fetch_error_is_not_uninitialized() {
        let mut vm = ready(vec![item("https://example.com/keep.gif")]);
        let ticket = vm.begin_fetch();
        vm.apply_fetch(ticket, Err(ProgramError::Rpc("connection refused".into())));

        assert_eq!(vm.render_state(), RenderState::Ready);
        assert_eq!(vm.items().items().len(), 1);
        assert!(!vm.is_fetching());
        assert!(vm.notice().unwrap().message.contains("connection refused"));
    }

    #[test]
    fn test_provider_missing_reported_once() {
        let mut vm = ViewModel::new();
        vm.wallet_failed(&WalletError::ProviderMissing, false);
        assert_eq!(vm.notice().unwrap().level, NoticeLevel::Warning);
        assert_eq!(vm.render_state(), RenderState::Disconnected);

        vm.dismiss_notice();
        vm.wallet_failed(&WalletError::ProviderMissing, false);
        assert!(vm.notice().is_none());

        // Pressing connect reports it again.
        vm.wallet_failed(&WalletError::ProviderMissing, true);
        assert!(vm.notice().is_some());
    }

    #[test]
    fn test_silent_rejection_is_quiet() {
        let mut vm = ViewModel::new();
        vm.wallet_failed(&WalletError::Rejected("not trusted".into()), false);
        assert!(vm.notice().is_none());
        assert_eq!(vm.render_state(), RenderState::Disconnected);

        assert!(vm.begin_connect());
        vm.wallet_failed(&WalletError::Rejected("user said no".into()), true);
        assert_eq!(vm.notice().unwrap().level, NoticeLevel::Error);
        assert!(!vm.is_busy());
    }

    #[test]
    fn test_connect_initialize_flow() {
        let (mut vm, ticket) = connected();
        vm.apply_fetch(ticket, Ok(ItemList::Uninitialized));
        assert_eq!(vm.render_state(), RenderState::Uninitialized);

        vm.begin_initialize().unwrap();
        assert_eq!(vm.begin_initialize(), Err(Refused::Busy));
        let ticket = vm.initialize_finished(Ok(())).unwrap();
        vm.apply_fetch(ticket, Ok(ItemList::Ready(vec![])));

        assert_eq!(vm.render_state(), RenderState::Ready);
        assert!(vm.items().items().is_empty());
    }

    #[test]
    fn test_initialize_failure_stays_uninitialized() {
        let (mut vm, ticket) = connected();
        vm.apply_fetch(ticket, Ok(ItemList::Uninitialized));
        vm.begin_initialize().unwrap();

        assert_eq!(vm.initialize_finished(Err(ProgramError::Rpc("insufficient funds".into()))), None);
        assert_eq!(vm.render_state(), RenderState::Uninitialized);
        assert!(!vm.is_busy());
    }

    #[test]
    fn test_disconnect_drops_in_flight_fetch() {
        let mut vm = ready(vec![item("a")]);
        let ticket = vm.begin_fetch();
        vm.disconnect().unwrap();

        assert_eq!(vm.render_state(), RenderState::Disconnected);
        assert!(!vm.apply_fetch(ticket, Ok(ItemList::Ready(vec![item("b")]))));
        assert_eq!(vm.items(), &ItemList::Uninitialized);
    }

    #[test]
    fn test_disconnect_refused_while_mutation_runs() {
        let mut vm = ready(vec![item("a")]);
        for c in "https://a.gif".chars() {
            vm.push_char(c);
        }
        vm.begin_submit().unwrap();

        assert_eq!(vm.disconnect(), Err(Refused::Busy));
        assert_eq!(vm.render_state(), RenderState::Ready);
        assert_eq!(vm.pending(), Some(&Pending::Submitting("https://a.gif".to_string())));

        // The result still belongs to this session and releases the guard.
        let ticket = vm.submit_finished(Err(ProgramError::Rpc("a failed".into())));
        assert_eq!(ticket, None);
        assert!(vm.pending().is_none());
        assert_eq!(vm.disconnect(), Ok(()));
        assert_eq!(vm.render_state(), RenderState::Disconnected);
    }

    #[test]
    fn test_disconnect_refused_while_initializing() {
        let (mut vm, ticket) = connected();
        vm.apply_fetch(ticket, Ok(ItemList::Uninitialized));
        vm.begin_initialize().unwrap();

        assert_eq!(vm.disconnect(), Err(Refused::Busy));
        assert!(vm.wallet_address().is_some());
    }

    #[test]
    fn test_selection_bounds() {
        let mut vm = ready(vec![item("a"), item("b")]);
        assert_eq!(vm.selected_item().unwrap().link, "a");
        vm.select_previous();
        assert_eq!(vm.selected_index(), 0);
        vm.select_next();
        vm.select_next();
        assert_eq!(vm.selected_item().unwrap().link, "b");

        let ticket = vm.begin_fetch();
        vm.apply_fetch(ticket, Ok(ItemList::Ready(vec![item("only")])));
        assert_eq!(vm.selected_item().unwrap().link, "only");
    }
}
