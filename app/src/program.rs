//! Client for the on-chain portal program.
//!
//! Instructions are built from the embedded IDL: the account list is
//! resolved by name and the data is the Anchor discriminator followed by
//! Borsh-encoded arguments. The item list lives in a single base account.

use crate::{
    idl::{Idl, IdlError, IdlInstruction, ADD_ITEM_INSTRUCTION, INITIALIZE_INSTRUCTION, ITEM_ACCOUNT},
    rpc::RpcTransport,
    view_model::{Item, ItemList},
    wallet::{WalletError, WalletProvider},
};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};
use std::{future::Future, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, info};

/// Program error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("Link must not be empty")]
    EmptyLink,

    #[error("RPC request failed: {0}")]
    Rpc(String),

    #[error("Account data could not be decoded: {0}")]
    Decode(String),

    #[error("Instruction data could not be encoded: {0}")]
    Encode(String),

    #[error("Instruction {instruction} has no known address for account {account}")]
    UnresolvedAccount { instruction: String, account: String },

    #[error("Instruction {instruction} takes {expected} string argument(s), got {got}")]
    Arguments { instruction: String, expected: usize, got: usize },

    #[error(transparent)]
    Idl(#[from] IdlError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("Request timed out after {0}s")]
    Timeout(u64),
}

/// On-chain layout of the base account after its discriminator.
#[derive(Debug, BorshSerialize, BorshDeserialize)]
struct BaseAccountData {
    total_gifs: u64,
    gif_list: Vec<ItemRecord>,
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
struct ItemRecord {
    gif_link: String,
    user_address: [u8; 32],
}

/// Handle to the remote program.
pub struct ProgramClient {
    idl: Idl,
    program_id: Pubkey,
    base_account: Keypair,
    transport: Arc<dyn RpcTransport>,
    timeout: Duration,
}

impl ProgramClient {
    pub fn new(
        idl: Idl,
        program_id: Pubkey,
        base_account: Keypair,
        transport: Arc<dyn RpcTransport>,
        timeout: Duration,
    ) -> Self {
        Self { idl, program_id, base_account, transport, timeout }
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    pub fn base_account(&self) -> Pubkey {
        self.base_account.pubkey()
    }

    /// Read the item list. A missing account is `Uninitialized`, not an error.
    pub async fn fetch_items(&self) -> Result<ItemList, ProgramError> {
        let address = self.base_account();
        let data = self.deadline(self.transport.account_data(&address)).await?;
        match data {
            None => Ok(ItemList::Uninitialized),
            Some(bytes) => {
                let discriminator = self.idl.account(ITEM_ACCOUNT)?.discriminator();
                decode_item_account(discriminator, &bytes).map(ItemList::Ready)
            }
        }
    }

    /// Append a link to the list.
    pub async fn submit_item(&self, wallet: &dyn WalletProvider, link: &str) -> Result<Signature, ProgramError> {
        let link = link.trim();
        if link.is_empty() {
            return Err(ProgramError::EmptyLink);
        }
        let user = wallet.public_key().ok_or(WalletError::NotConnected)?;
        let ix = self.instruction(self.idl.instruction(ADD_ITEM_INSTRUCTION)?, &user, &[link])?;
        let signature = self.send(wallet, ix, None).await?;
        info!(%signature, %link, "Link sent to program");
        Ok(signature)
    }

    /// One-time creation of the base account.
    pub async fn initialize_account(&self, wallet: &dyn WalletProvider) -> Result<Signature, ProgramError> {
        let user = wallet.public_key().ok_or(WalletError::NotConnected)?;
        let ix = self.instruction(self.idl.instruction(INITIALIZE_INSTRUCTION)?, &user, &[])?;
        let signature = self.send(wallet, ix, Some(&self.base_account)).await?;
        info!(%signature, base_account = %self.base_account(), "Created base account");
        Ok(signature)
    }

    fn instruction(&self, def: &IdlInstruction, user: &Pubkey, args: &[&str]) -> Result<Instruction, ProgramError> {
        let accounts = def
            .accounts
            .iter()
            .map(|acc| {
                let pubkey = self.resolve_account(&def.name, &acc.name, user)?;
                Ok(if acc.is_mut {
                    AccountMeta::new(pubkey, acc.is_signer)
                } else {
                    AccountMeta::new_readonly(pubkey, acc.is_signer)
                })
            })
            .collect::<Result<Vec<_>, ProgramError>>()?;

        let string_args = def.args.iter().filter(|a| a.ty == "string").count();
        if string_args != def.args.len() || string_args != args.len() {
            return Err(ProgramError::Arguments {
                instruction: def.name.clone(),
                expected: def.args.len(),
                got: args.len(),
            });
        }

        let mut data = def.discriminator().to_vec();
        for arg in args {
            arg.serialize(&mut data)
                .map_err(|e| ProgramError::Encode(e.to_string()))?;
        }

        Ok(Instruction { program_id: self.program_id, accounts, data })
    }

    fn resolve_account(&self, instruction: &str, name: &str, user: &Pubkey) -> Result<Pubkey, ProgramError> {
        match name {
            "baseAccount" => Ok(self.base_account()),
            "user" => Ok(*user),
            "systemProgram" => Ok(solana_program::system_program::id()),
            other => Err(ProgramError::UnresolvedAccount {
                instruction: instruction.to_string(),
                account: other.to_string(),
            }),
        }
    }

    async fn send(
        &self,
        wallet: &dyn WalletProvider,
        ix: Instruction,
        co_signer: Option<&Keypair>,
    ) -> Result<Signature, ProgramError> {
        let payer = wallet.public_key().ok_or(WalletError::NotConnected)?;
        let blockhash = self.deadline(self.transport.latest_blockhash()).await?;

        let mut tx = Transaction::new_with_payer(&[ix], Some(&payer));
        tx.message.recent_blockhash = blockhash;
        if let Some(signer) = co_signer {
            tx.try_partial_sign(&[signer], blockhash)
                .map_err(|e| WalletError::Signing(e.to_string()))?;
        }

        debug!(%payer, "Requesting wallet signature");
        let tx = self
            .deadline(async { wallet.sign_transaction(tx).await.map_err(ProgramError::from) })
            .await?;

        self.deadline(self.transport.send_and_confirm(&tx)).await
    }

    async fn deadline<T, F>(&self, fut: F) -> Result<T, ProgramError>
    where
        F: Future<Output = Result<T, ProgramError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| ProgramError::Timeout(self.timeout.as_secs()))?
    }
}

/// Decode base account data into items, checking the discriminator.
pub fn decode_item_account(discriminator: [u8; 8], data: &[u8]) -> Result<Vec<Item>, ProgramError> {
    if data.len() < 8 {
        return Err(ProgramError::Decode("account data too short".to_string()));
    }
    if data[..8] != discriminator {
        return Err(ProgramError::Decode("unexpected account discriminator".to_string()));
    }

    // Accounts are allocated with spare room; trailing bytes are ignored.
    let mut rest = &data[8..];
    let account = BaseAccountData::deserialize(&mut rest).map_err(|e| ProgramError::Decode(e.to_string()))?;
    debug!(total = account.total_gifs, "Decoded base account");

    Ok(account
        .gif_list
        .into_iter()
        .map(|r| Item { link: r.gif_link, user_address: Pubkey::new_from_array(r.user_address) })
        .collect())
}

/// Encode items in the base account layout.
#[cfg(test)]
pub fn encode_item_account(discriminator: [u8; 8], items: &[Item]) -> Vec<u8> {
    let account = BaseAccountData {
        total_gifs: items.len() as u64,
        gif_list: items
            .iter()
            .map(|i| ItemRecord { gif_link: i.link.clone(), user_address: i.user_address.to_bytes() })
            .collect(),
    };
    let mut data = discriminator.to_vec();
    data.extend(borsh::to_vec(&account).unwrap());
    data
}
