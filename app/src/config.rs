//! Local configuration management for GIF Portal.

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

const APP_DIR: &str = "gif-portal";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Solana cluster to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Cluster {
    #[default]
    Devnet,
    Testnet,
    MainnetBeta,
    Localnet,
}

impl Cluster {
    pub fn rpc_url(&self) -> &'static str {
        match self {
            Cluster::Devnet => "https://api.devnet.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::MainnetBeta => "https://api.mainnet-beta.solana.com",
            Cluster::Localnet => "http://localhost:8899",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Cluster::Devnet => "Devnet",
            Cluster::Testnet => "Testnet",
            Cluster::MainnetBeta => "Mainnet Beta",
            Cluster::Localnet => "Localnet",
        }
    }
}

/// How finalized queried state must be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    #[default]
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn config(&self) -> CommitmentConfig {
        match self {
            Commitment::Processed => CommitmentConfig::processed(),
            Commitment::Confirmed => CommitmentConfig::confirmed(),
            Commitment::Finalized => CommitmentConfig::finalized(),
        }
    }
}

/// Application configuration stored locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub cluster: Cluster,

    /// Explicit RPC endpoint; overrides the cluster default.
    #[serde(default)]
    pub rpc_url: Option<String>,

    #[serde(default)]
    pub commitment: Commitment,

    /// Program address; overrides the one in the IDL.
    #[serde(default)]
    pub program_id: Option<String>,

    /// Wallet keypair file. If None, use the Solana CLI default.
    #[serde(default)]
    pub wallet_path: Option<String>,

    /// Base account keypair file. If None, use the shared account.
    #[serde(default)]
    pub base_account_path: Option<String>,

    /// Wallets approved for silent reconnection.
    #[serde(default)]
    pub trusted_wallets: Vec<String>,

    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Re-fetch the list periodically while on the ready screen.
    #[serde(default)]
    pub refresh_interval_secs: Option<u64>,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cluster: Cluster::default(),
            rpc_url: None,
            commitment: Commitment::default(),
            program_id: None,
            wallet_path: None,
            base_account_path: None,
            trusted_wallets: Vec::new(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            refresh_interval_secs: None,
        }
    }
}

impl AppConfig {
    /// Directory holding config, base account and log.
    pub fn dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    /// Get the config file path.
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load config from disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to disk.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn rpc_url(&self) -> String {
        self.rpc_url
            .clone()
            .unwrap_or_else(|| self.cluster.rpc_url().to_string())
    }

    pub fn wallet_path(&self) -> PathBuf {
        match &self.wallet_path {
            Some(path) => PathBuf::from(path),
            None => crate::wallet::KeypairWallet::default_path(),
        }
    }

    /// Private base account file. None means the shared account.
    pub fn base_account_path(&self) -> Option<PathBuf> {
        self.base_account_path.as_ref().map(PathBuf::from)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Trusted wallets that parse as public keys.
    pub fn trusted(&self) -> Vec<Pubkey> {
        self.trusted_wallets
            .iter()
            .filter_map(|s| Pubkey::from_str(s).ok())
            .collect()
    }

    /// Remember a wallet for silent reconnection. Returns true if it was new.
    pub fn trust_wallet(&mut self, wallet: &Pubkey) -> bool {
        let key = wallet.to_string();
        if self.trusted_wallets.contains(&key) {
            return false;
        }
        self.trusted_wallets.push(key);
        true
    }

    /// Add a trusted wallet to the file at `path` and save it.
    ///
    /// Only the trusted list changes. Command line overrides applied to the
    /// running config stay out of the file.
    pub fn persist_trusted(path: &Path, wallet: &Pubkey) -> Result<bool> {
        let mut stored = Self::load_from(path)?;
        if !stored.trust_wallet(wallet) {
            return Ok(false);
        }
        stored.save_to(path)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_urls() {
        assert_eq!(Cluster::Devnet.rpc_url(), "https://api.devnet.solana.com");
        assert_eq!(Cluster::MainnetBeta.rpc_url(), "https://api.mainnet-beta.solana.com");
        assert_eq!(Cluster::Localnet.rpc_url(), "http://localhost:8899");
    }

    #[test]
    fn test_rpc_url_override() {
        let mut config = AppConfig::default();
        assert_eq!(config.rpc_url(), Cluster::Devnet.rpc_url());
        config.rpc_url = Some("http://127.0.0.1:9999".to_string());
        assert_eq!(config.rpc_url(), "http://127.0.0.1:9999");
    }

    #[test]
    fn test_commitment_levels() {
        assert_eq!(Commitment::default().config(), CommitmentConfig::processed());
        assert_eq!(Commitment::Finalized.config(), CommitmentConfig::finalized());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.cluster, Cluster::Devnet);
        assert_eq!(config.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.trusted_wallets.is_empty());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"cluster":"localnet","commitment":"confirmed"}"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.cluster, Cluster::Localnet);
        assert_eq!(config.commitment, Commitment::Confirmed);
        assert_eq!(config.request_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.refresh_interval(), None);
    }

    #[test]
    fn test_trusted_wallets_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let wallet = Pubkey::new_unique();

        let mut config = AppConfig::default();
        assert!(config.trust_wallet(&wallet));
        assert!(!config.trust_wallet(&wallet));
        config.trusted_wallets.push("garbage".to_string());
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.trusted(), vec![wallet]);
    }

    #[test]
    fn test_persist_trusted_keeps_stored_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"commitment":"finalized"}"#).unwrap();

        // A running config with one-off overrides
        let mut running = AppConfig::load_from(&path).unwrap();
        running.cluster = Cluster::Localnet;
        running.rpc_url = Some("http://127.0.0.1:1234".to_string());

        let wallet = Pubkey::new_unique();
        assert!(AppConfig::persist_trusted(&path, &wallet).unwrap());
        assert!(!AppConfig::persist_trusted(&path, &wallet).unwrap());

        let stored = AppConfig::load_from(&path).unwrap();
        assert_eq!(stored.trusted(), vec![wallet]);
        assert_eq!(stored.cluster, Cluster::Devnet);
        assert_eq!(stored.rpc_url, None);
        assert_eq!(stored.commitment, Commitment::Finalized);
    }

    #[test]
    fn test_shared_base_account_by_default() {
        let mut config = AppConfig::default();
        assert_eq!(config.base_account_path(), None);
        config.base_account_path = Some("/tmp/mine.json".to_string());
        assert_eq!(config.base_account_path(), Some(PathBuf::from("/tmp/mine.json")));
    }
}
