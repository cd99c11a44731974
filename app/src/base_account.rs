//! Keypair of the program account that holds the item list.
//!
//! By default every client uses the shared account compiled into the
//! binary, so all users read and append to the same list. Pointing at a
//! keypair file instead gives a private list; the file uses the Solana CLI
//! keypair format and is generated if it does not exist yet.

use anyhow::{anyhow, Result};
use rust_embed::RustEmbed;
use solana_sdk::signature::{read_keypair, read_keypair_file, write_keypair_file, Keypair};
use std::{io::Cursor, path::Path};
use tracing::info;

/// Shared base account keypair from the accounts/ directory.
#[derive(RustEmbed)]
#[folder = "accounts/"]
#[include = "*.json"]
struct AccountAssets;

const SHARED_ACCOUNT_FILE: &str = "base_account.json";

/// The base account shared by every client that does not name its own.
pub fn shared() -> Result<Keypair> {
    let file = AccountAssets::get(SHARED_ACCOUNT_FILE)
        .ok_or_else(|| anyhow!("Shared base account {} is not embedded", SHARED_ACCOUNT_FILE))?;
    read_keypair(&mut Cursor::new(file.data.as_ref()))
        .map_err(|e| anyhow!("Failed to parse shared base account: {}", e))
}

/// The configured base account file, or the shared account if none is set.
pub fn resolve(path: Option<&Path>) -> Result<Keypair> {
    match path {
        Some(path) => load_or_generate(path),
        None => shared(),
    }
}

/// Load the base account keypair from disk.
pub fn load(path: &Path) -> Result<Option<Keypair>> {
    if path.exists() {
        let keypair = read_keypair_file(path)
            .map_err(|e| anyhow!("Failed to read base account {}: {}", path.display(), e))?;
        Ok(Some(keypair))
    } else {
        Ok(None)
    }
}

/// Load or generate the base account keypair.
pub fn load_or_generate(path: &Path) -> Result<Keypair> {
    if let Some(keypair) = load(path)? {
        Ok(keypair)
    } else {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let keypair = Keypair::new();
        write_keypair_file(&keypair, path)
            .map_err(|e| anyhow!("Failed to write base account {}: {}", path.display(), e))?;
        info!(path = %path.display(), "Generated new base account keypair");
        Ok(keypair)
    }
}
