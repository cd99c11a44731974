//! JSON-RPC transport to the Solana cluster.

use crate::{config::Commitment, program::ProgramError};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use tracing::debug;

/// The three RPC calls the program client needs.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Raw account data, or `None` if the account does not exist.
    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, ProgramError>;

    async fn latest_blockhash(&self) -> Result<Hash, ProgramError>;

    async fn send_and_confirm(&self, tx: &Transaction) -> Result<Signature, ProgramError>;
}

/// RPC client bound to one endpoint and commitment level.
pub struct SolanaRpc {
    client: RpcClient,
    commitment: CommitmentConfig,
}

impl SolanaRpc {
    pub fn new(rpc_url: String, commitment: Commitment) -> Self {
        let commitment = commitment.config();
        Self {
            client: RpcClient::new_with_commitment(rpc_url, commitment),
            commitment,
        }
    }

    pub fn url(&self) -> String {
        self.client.url()
    }
}

#[async_trait]
impl RpcTransport for SolanaRpc {
    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, ProgramError> {
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(|e| ProgramError::Rpc(e.to_string()))?;
        debug!(%address, slot = response.context.slot, found = response.value.is_some(), "Fetched account");
        Ok(response.value.map(|account| account.data))
    }

    async fn latest_blockhash(&self) -> Result<Hash, ProgramError> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(|e| ProgramError::Rpc(format!("Failed to get latest blockhash: {}", e)))
    }

    async fn send_and_confirm(&self, tx: &Transaction) -> Result<Signature, ProgramError> {
        self.client
            .send_and_confirm_transaction(tx)
            .await
            .map_err(|e| ProgramError::Rpc(format!("Failed to send transaction: {}", e)))
    }
}
