//! Embedded program interface description.
//!
//! The portal program's Anchor IDL is compiled into the binary. It supplies
//! the program address, the instructions with their account lists, and the
//! account type that holds the item list. Anchor discriminators are derived
//! from the names found here.

use rust_embed::RustEmbed;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use thiserror::Error;

/// Embedded IDL files from the idl/ directory.
#[derive(RustEmbed)]
#[folder = "idl/"]
#[include = "*.json"]
pub struct IdlAssets;

pub const IDL_FILE: &str = "gif_portal.json";

/// Account-creating instruction.
pub const INITIALIZE_INSTRUCTION: &str = "startStuffOff";
/// Item-appending instruction, takes the link as its only argument.
pub const ADD_ITEM_INSTRUCTION: &str = "addGif";
/// Account type holding the item list.
pub const ITEM_ACCOUNT: &str = "BaseAccount";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdlError {
    #[error("IDL file {0} is not embedded")]
    Missing(String),

    #[error("IDL is malformed: {0}")]
    Malformed(String),

    #[error("IDL has no instruction named {0}")]
    UnknownInstruction(String),

    #[error("IDL has no account type named {0}")]
    UnknownAccount(String),

    #[error("IDL has no program address")]
    NoAddress,

    #[error("Invalid program address: {0}")]
    InvalidAddress(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Idl {
    pub version: String,
    pub name: String,
    pub instructions: Vec<IdlInstruction>,
    #[serde(default)]
    pub accounts: Vec<IdlAccountDef>,
    #[serde(default)]
    pub metadata: Option<IdlMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdlInstruction {
    pub name: String,
    pub accounts: Vec<IdlAccountItem>,
    #[serde(default)]
    pub args: Vec<IdlField>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdlAccountItem {
    pub name: String,
    pub is_mut: bool,
    pub is_signer: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdlField {
    #[serde(rename = "type")]
    pub ty: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdlAccountDef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdlMetadata {
    pub address: String,
}

impl Idl {
    /// Load the IDL compiled into the binary.
    pub fn embedded() -> Result<Self, IdlError> {
        let file = IdlAssets::get(IDL_FILE).ok_or_else(|| IdlError::Missing(IDL_FILE.to_string()))?;
        Self::parse(&String::from_utf8_lossy(&file.data))
    }

    pub fn parse(json: &str) -> Result<Self, IdlError> {
        serde_json::from_str(json).map_err(|e| IdlError::Malformed(e.to_string()))
    }

    /// Program address from `metadata.address`.
    pub fn program_id(&self) -> Result<Pubkey, IdlError> {
        let address = self
            .metadata
            .as_ref()
            .map(|m| m.address.as_str())
            .ok_or(IdlError::NoAddress)?;
        Pubkey::from_str(address).map_err(|_| IdlError::InvalidAddress(address.to_string()))
    }

    pub fn instruction(&self, name: &str) -> Result<&IdlInstruction, IdlError> {
        self.instructions
            .iter()
            .find(|ix| ix.name == name)
            .ok_or_else(|| IdlError::UnknownInstruction(name.to_string()))
    }

    pub fn account(&self, name: &str) -> Result<&IdlAccountDef, IdlError> {
        self.accounts
            .iter()
            .find(|acc| acc.name == name)
            .ok_or_else(|| IdlError::UnknownAccount(name.to_string()))
    }
}

impl IdlInstruction {
    pub fn discriminator(&self) -> [u8; 8] {
        instruction_discriminator(&self.name)
    }
}

impl IdlAccountDef {
    pub fn discriminator(&self) -> [u8; 8] {
        account_discriminator(&self.name)
    }
}

/// `sha256("global:<snake_case name>")[..8]`
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    sighash("global", &to_snake_case(name))
}

/// `sha256("account:<Name>")[..8]`
pub fn account_discriminator(name: &str) -> [u8; 8] {
    sighash("account", name)
}

fn sighash(namespace: &str, name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("{}:{}", namespace, name).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// IDL names are camelCase; the program's handlers are snake_case.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
