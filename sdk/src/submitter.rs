//! Signs, simulates and broadcasts an ordered batch of instructions as one
//! atomic transaction. Nothing is retried here.

use std::time::Duration;

use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;

use crate::error::{Error, SubmissionError, ValidationError};
use crate::ledger::Ledger;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    pub skip_preflight: bool,
    /// When set, wait for confirmation for at most this long.
    pub confirm_timeout: Option<Duration>,
    pub poll_interval: Duration,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            skip_preflight: false,
            confirm_timeout: Some(Duration::from_secs(60)),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Signers are deduplicated by key; the fee payer always signs first.
pub fn sign_transaction(
    instructions: &[Instruction],
    payer: &Keypair,
    co_signers: &[&Keypair],
    blockhash: Hash,
) -> Result<Transaction, Error> {
    if instructions.is_empty() {
        return Err(ValidationError::EmptyBatch.into());
    }

    let mut signers: Vec<&dyn Signer> = vec![payer];
    let mut keys: Vec<Pubkey> = vec![payer.pubkey()];
    for signer in co_signers {
        let key = signer.pubkey();
        if !keys.contains(&key) {
            keys.push(key);
            signers.push(*signer);
        }
    }

    let mut transaction = Transaction::new_with_payer(instructions, Some(&payer.pubkey()));
    let required = transaction.message.header.num_required_signatures as usize;
    for key in &transaction.message.account_keys[..required] {
        if !keys.contains(key) {
            return Err(ValidationError::MissingSigner(*key).into());
        }
    }
    // Extra signers would make `try_sign` fail with KeypairPubkeyMismatch.
    signers.retain(|signer| {
        transaction.message.account_keys[..required].contains(&signer.pubkey())
    });
    transaction.try_sign(&signers, blockhash)?;
    Ok(transaction)
}

pub async fn submit(
    ledger: &dyn Ledger,
    instructions: &[Instruction],
    payer: &Keypair,
    co_signers: &[&Keypair],
    options: &SubmitOptions,
) -> Result<Signature, Error> {
    let blockhash = ledger.latest_blockhash().await?;
    let transaction = sign_transaction(instructions, payer, co_signers, blockhash)?;

    if !options.skip_preflight {
        let simulation = ledger.simulate(&transaction).await?;
        if let Some(error) = simulation.error {
            tracing::warn!("simulation error: {}", error);
            for log in &simulation.logs {
                tracing::info!("{}", log);
            }
            return Err(SubmissionError::SimulationFailed {
                message: error,
                logs: simulation.logs,
            }
            .into());
        }
        for log in &simulation.logs {
            tracing::debug!("{}", log);
        }
    }

    let signature = ledger
        .send(&transaction)
        .await
        .map_err(|error| SubmissionError::RejectedByNetwork(error.to_string()))?;
    tracing::info!("submitted {}", signature);

    if let Some(timeout) = options.confirm_timeout {
        confirm(ledger, &signature, timeout, options.poll_interval).await?;
    }
    Ok(signature)
}

/// Polls until the transaction reaches the ledger's commitment. A broadcast
/// transaction cannot be withdrawn; expiry only stops the wait.
pub async fn confirm(
    ledger: &dyn Ledger,
    signature: &Signature,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<(), Error> {
    let poll = poll_status(ledger, signature, poll_interval);
    match tokio::time::timeout(timeout, poll).await {
        Ok(result) => {
            result?;
            tracing::info!("confirmed {}", signature);
            Ok(())
        }
        Err(_) => Err(SubmissionError::Timeout {
            signature: *signature,
            waited: timeout,
        }
        .into()),
    }
}

async fn poll_status(
    ledger: &dyn Ledger,
    signature: &Signature,
    poll_interval: Duration,
) -> Result<(), Error> {
    loop {
        let status = ledger
            .signature_status(signature)
            .await
            .map_err(|source| SubmissionError::ConfirmationUnavailable {
                signature: *signature,
                source,
            })?;
        match status {
            Some(Ok(())) => return Ok(()),
            Some(Err(reason)) => {
                return Err(SubmissionError::TransactionFailed {
                    signature: *signature,
                    reason,
                }
                .into())
            }
            None => tokio::time::sleep(poll_interval).await,
        }
    }
}
