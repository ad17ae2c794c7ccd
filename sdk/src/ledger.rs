use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::error::LedgerError;

/// Outcome of a preflight simulation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Simulation {
    pub error: Option<String>,
    pub logs: Vec<String>,
    pub units_consumed: Option<u64>,
}

/// Access to the ledger. Every read distinguishes "absent" (`Ok(None)`) from
/// a failed request (`Err`).
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn latest_blockhash(&self) -> Result<Hash, LedgerError>;

    async fn simulate(&self, transaction: &Transaction) -> Result<Simulation, LedgerError>;

    /// Broadcasts an already-signed transaction. Acceptance here is not
    /// settlement.
    async fn send(&self, transaction: &Transaction) -> Result<Signature, LedgerError>;

    /// `None` while the transaction has not reached the client commitment.
    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<Result<(), String>>, LedgerError>;

    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, LedgerError>;
}

#[async_trait]
impl Ledger for RpcClient {
    async fn latest_blockhash(&self) -> Result<Hash, LedgerError> {
        Ok(self.get_latest_blockhash().await?)
    }

    async fn simulate(&self, transaction: &Transaction) -> Result<Simulation, LedgerError> {
        let result = self.simulate_transaction(transaction).await?.value;
        Ok(Simulation {
            error: result.err.map(|err| err.to_string()),
            logs: result.logs.unwrap_or_default(),
            units_consumed: result.units_consumed,
        })
    }

    async fn send(&self, transaction: &Transaction) -> Result<Signature, LedgerError> {
        let config = RpcSendTransactionConfig {
            // the submitter runs its own simulation first
            skip_preflight: true,
            preflight_commitment: Some(self.commitment().commitment),
            ..RpcSendTransactionConfig::default()
        };
        Ok(self
            .send_transaction_with_config(transaction, config)
            .await?)
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<Result<(), String>>, LedgerError> {
        let status = self
            .get_signature_status_with_commitment(signature, self.commitment())
            .await?;
        Ok(status.map(|result| result.map_err(|err| err.to_string())))
    }

    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, LedgerError> {
        let response = self
            .get_account_with_commitment(address, self.commitment())
            .await?;
        Ok(response.value.map(|account| account.data))
    }
}
