//! Wallet connection through an injected provider.
//!
//! The connector never reaches for ambient state: whatever holds the user's
//! key is handed in as a [`WalletProvider`]. The shipped provider reads a
//! Solana CLI keypair file.

use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair},
    signer::Signer,
    transaction::Transaction,
};
use std::{
    collections::HashSet,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, info};

/// Wallet error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("No wallet found. Create one with `solana-keygen new` or pass --wallet")]
    ProviderMissing,

    #[error("Connection rejected: {0}")]
    Rejected(String),

    #[error("Wallet unavailable: {0}")]
    Unavailable(String),

    #[error("Wallet is not connected")]
    NotConnected,

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Wallet did not respond within {0}s")]
    Timeout(u64),
}

/// Options for a connection request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Only connect if the wallet was approved before; never prompt.
    pub only_if_trusted: bool,
}

/// Capability supplied by whatever custodies the user's key.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Human readable provider name.
    fn name(&self) -> &str;

    /// Whether the provider is installed at all.
    fn is_present(&self) -> bool;

    async fn connect(&self, options: ConnectOptions) -> Result<Pubkey, WalletError>;

    async fn disconnect(&self);

    fn public_key(&self) -> Option<Pubkey>;

    /// Add the wallet's signature to a transaction whose blockhash is set.
    async fn sign_transaction(&self, tx: Transaction) -> Result<Transaction, WalletError>;
}

/// Wallet backed by a Solana CLI keypair file.
pub struct KeypairWallet {
    path: PathBuf,
    trusted: Mutex<HashSet<Pubkey>>,
    session: Mutex<Option<Keypair>>,
}

impl KeypairWallet {
    pub fn new(path: impl Into<PathBuf>, trusted: impl IntoIterator<Item = Pubkey>) -> Self {
        Self {
            path: path.into(),
            trusted: Mutex::new(trusted.into_iter().collect()),
            session: Mutex::new(None),
        }
    }

    /// Default Solana CLI keypair location.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("solana")
            .join("id.json")
    }
}

#[async_trait]
impl WalletProvider for KeypairWallet {
    fn name(&self) -> &str {
        "keypair file"
    }

    fn is_present(&self) -> bool {
        self.path.is_file()
    }

    async fn connect(&self, options: ConnectOptions) -> Result<Pubkey, WalletError> {
        if !self.is_present() {
            return Err(WalletError::ProviderMissing);
        }

        let keypair = read_keypair_file(&self.path)
            .map_err(|e| WalletError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
        let pubkey = keypair.pubkey();

        {
            let mut trusted = self.trusted.lock().unwrap_or_else(|e| e.into_inner());
            if options.only_if_trusted && !trusted.contains(&pubkey) {
                return Err(WalletError::Rejected(
                    "wallet has not been approved for this app yet".to_string(),
                ));
            }
            trusted.insert(pubkey);
        }

        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = Some(keypair);
        Ok(pubkey)
    }

    async fn disconnect(&self) {
        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn public_key(&self) -> Option<Pubkey> {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|k| k.pubkey())
    }

    async fn sign_transaction(&self, mut tx: Transaction) -> Result<Transaction, WalletError> {
        let session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        let keypair = session.as_ref().ok_or(WalletError::NotConnected)?;
        let blockhash = tx.message.recent_blockhash;
        tx.try_partial_sign(&[keypair], blockhash)
            .map_err(|e| WalletError::Signing(e.to_string()))?;
        Ok(tx)
    }
}

/// Connects to the injected provider with a bounded wait.
#[derive(Clone)]
pub struct WalletConnector {
    provider: Option<Arc<dyn WalletProvider>>,
    timeout: Duration,
}

impl WalletConnector {
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// The provider, if one is installed.
    pub fn provider(&self) -> Result<Arc<dyn WalletProvider>, WalletError> {
        match &self.provider {
            Some(p) if p.is_present() => Ok(p.clone()),
            _ => Err(WalletError::ProviderMissing),
        }
    }

    /// Reconnect a previously approved wallet without prompting.
    pub async fn try_reconnect_silently(&self) -> Result<Pubkey, WalletError> {
        self.request(ConnectOptions { only_if_trusted: true }).await
    }

    /// Explicit, user-initiated connection.
    pub async fn connect(&self) -> Result<Pubkey, WalletError> {
        self.request(ConnectOptions::default()).await
    }

    pub async fn disconnect(&self) {
        if let Some(provider) = &self.provider {
            provider.disconnect().await;
            info!("Wallet disconnected");
        }
    }

    async fn request(&self, options: ConnectOptions) -> Result<Pubkey, WalletError> {
        let provider = self.provider()?;
        debug!(provider = provider.name(), silent = options.only_if_trusted, "Requesting wallet connection");

        let pubkey = tokio::time::timeout(self.timeout, provider.connect(options))
            .await
            .map_err(|_| WalletError::Timeout(self.timeout.as_secs()))??;

        info!(%pubkey, "Connected with public key");
        Ok(pubkey)
    }
}

/// Get short display version of a public key.
pub fn short_address(address: &Pubkey) -> String {
    let s = address.to_string();
    if s.len() > 16 {
        format!("{}...{}", &s[..6], &s[s.len() - 6..])
    } else {
        s
    }
}

impl std::fmt::Debug for WalletConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletConnector")
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("timeout", &self.timeout)
            .finish()
    }
}
