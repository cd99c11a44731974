//! In-memory wallet and cluster used by the unit tests.

use crate::{
    idl::{
        account_discriminator, instruction_discriminator, Idl, ADD_ITEM_INSTRUCTION,
        INITIALIZE_INSTRUCTION, ITEM_ACCOUNT,
    },
    program::{decode_item_account, encode_item_account, ProgramClient, ProgramError},
    rpc::RpcTransport,
    view_model::Item,
    wallet::{ConnectOptions, WalletError, WalletProvider},
};
use async_trait::async_trait;
use borsh::BorshDeserialize;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

/// Allocated size of the base account, as the program does.
const ACCOUNT_SPACE: usize = 9000;

/// Stand-in for the cluster that runs the two portal instructions.
#[derive(Default)]
pub struct FakeChain {
    pub account: Mutex<Option<Vec<u8>>>,
    pub sent: Mutex<Vec<Transaction>>,
    pub reads: AtomicUsize,
    pub fail_reads: bool,
    pub fail_sends: bool,
}

impl FakeChain {
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn with_items(items: &[Item]) -> Self {
        let chain = Self::default();
        *chain.account.lock().unwrap() = Some(account_bytes(items));
        chain
    }
}

fn account_bytes(items: &[Item]) -> Vec<u8> {
    let mut data = encode_item_account(account_discriminator(ITEM_ACCOUNT), items);
    data.resize(ACCOUNT_SPACE, 0);
    data
}

#[async_trait]
impl RpcTransport for FakeChain {
    async fn account_data(&self, _address: &Pubkey) -> Result<Option<Vec<u8>>, ProgramError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(ProgramError::Rpc("connection refused".to_string()));
        }
        Ok(self.account.lock().unwrap().clone())
    }

    async fn latest_blockhash(&self) -> Result<Hash, ProgramError> {
        Ok(Hash::new_unique())
    }

    async fn send_and_confirm(&self, tx: &Transaction) -> Result<Signature, ProgramError> {
        if self.fail_sends {
            return Err(ProgramError::Rpc("blockhash not found".to_string()));
        }
        tx.verify().map_err(|e| ProgramError::Rpc(e.to_string()))?;

        let ix = &tx.message.instructions[0];
        let user = tx.message.account_keys[0];
        let mut account = self.account.lock().unwrap();

        if ix.data[..8] == instruction_discriminator(INITIALIZE_INSTRUCTION) {
            if account.is_some() {
                return Err(ProgramError::Rpc("account already in use".to_string()));
            }
            *account = Some(account_bytes(&[]));
        } else if ix.data[..8] == instruction_discriminator(ADD_ITEM_INSTRUCTION) {
            let data = account
                .as_ref()
                .ok_or_else(|| ProgramError::Rpc("AccountNotInitialized".to_string()))?;
            let mut items = decode_item_account(account_discriminator(ITEM_ACCOUNT), data)?;
            let link = String::try_from_slice(&ix.data[8..]).map_err(|e| ProgramError::Rpc(e.to_string()))?;
            items.push(Item { link, user_address: user });
            *account = Some(account_bytes(&items));
        } else {
            return Err(ProgramError::Rpc("unknown instruction".to_string()));
        }

        self.sent.lock().unwrap().push(tx.clone());
        Ok(tx.signatures[0])
    }
}

/// Wallet holding a throwaway keypair.
pub struct TestWallet {
    pub keypair: Keypair,
    pub connected: Mutex<bool>,
    pub trusted: bool,
}

impl TestWallet {
    pub fn new(trusted: bool) -> Self {
        Self { keypair: Keypair::new(), connected: Mutex::new(false), trusted }
    }

    pub fn connected() -> Self {
        let wallet = Self::new(true);
        *wallet.connected.lock().unwrap() = true;
        wallet
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }
}

#[async_trait]
impl WalletProvider for TestWallet {
    fn name(&self) -> &str {
        "test"
    }

    fn is_present(&self) -> bool {
        true
    }

    async fn connect(&self, options: ConnectOptions) -> Result<Pubkey, WalletError> {
        if options.only_if_trusted && !self.trusted {
            return Err(WalletError::Rejected("not trusted".to_string()));
        }
        *self.connected.lock().unwrap() = true;
        Ok(self.keypair.pubkey())
    }

    async fn disconnect(&self) {
        *self.connected.lock().unwrap() = false;
    }

    fn public_key(&self) -> Option<Pubkey> {
        self.connected.lock().unwrap().then(|| self.keypair.pubkey())
    }

    async fn sign_transaction(&self, mut tx: Transaction) -> Result<Transaction, WalletError> {
        let blockhash = tx.message.recent_blockhash;
        tx.try_partial_sign(&[&self.keypair], blockhash)
            .map_err(|e| WalletError::Signing(e.to_string()))?;
        Ok(tx)
    }
}

/// Program client over the given transport with the embedded IDL.
pub fn program_client(transport: Arc<dyn RpcTransport>, timeout: Duration) -> ProgramClient {
    let idl = Idl::embedded().unwrap();
    let program_id = idl.program_id().unwrap();
    ProgramClient::new(idl, program_id, Keypair::new(), transport, timeout)
}
