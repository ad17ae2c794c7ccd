//! In-memory ledger that executes the stablecoin program's documented
//! effects, so the client can be driven end to end without a validator.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use borsh::BorshDeserialize;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::transaction::Transaction;
use spl_token_2022::state::{Account as TokenAccount, AccountState};

use sss_sdk::client::{decode_token_account, encode_token_account};
use sss_sdk::error::LedgerError;
use sss_sdk::instructions::{
    anchor_discriminator, split_data, AddressArgs, AmountArgs, InitializeArgs,
    IX_ADD_TO_BLACKLIST, IX_FREEZE_ACCOUNT, IX_INITIALIZE, IX_MINT_TO, IX_REMOVE_FROM_BLACKLIST,
    IX_SEIZE_TOKENS, IX_THAW_ACCOUNT, IX_UPDATE_FREEZER, IX_UPDATE_MINTER,
};
use sss_sdk::ledger::{Ledger, Simulation};
use sss_sdk::pda::find_config_pda;
use sss_sdk::state::{BlacklistEntry, ProgramAccount, StablecoinConfig};
use sss_sdk::{StablecoinClient, SubmitOptions};
use tracing_subscriber::EnvFilter;

pub const NOW: i64 = 1_700_000_000;

#[derive(Default)]
struct Inner {
    accounts: HashMap<Pubkey, Vec<u8>>,
    statuses: HashMap<Signature, Result<(), String>>,
    sent: usize,
    simulated: usize,
    force_simulation_error: Option<String>,
    never_confirm: bool,
    fail_reads: bool,
    fail_status: bool,
}

pub struct MemoryLedger {
    program_id: Pubkey,
    inner: Mutex<Inner>,
}

impl MemoryLedger {
    pub fn new(program_id: Pubkey) -> Arc<Self> {
        Arc::new(Self {
            program_id,
            inner: Mutex::new(Inner::default()),
        })
    }

    pub fn sent(&self) -> usize {
        self.inner.lock().unwrap().sent
    }

    pub fn simulated(&self) -> usize {
        self.inner.lock().unwrap().simulated
    }

    pub fn force_simulation_error(&self, error: &str) {
        self.inner.lock().unwrap().force_simulation_error = Some(error.to_string());
    }

    pub fn never_confirm(&self) {
        self.inner.lock().unwrap().never_confirm = true;
    }

    pub fn fail_status(&self, fail: bool) {
        self.inner.lock().unwrap().fail_status = fail;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.inner.lock().unwrap().fail_reads = fail;
    }

    /// Runs every instruction against a copy of the accounts. The copy is
    /// returned only if the whole transaction succeeds.
    fn execute(
        &self,
        accounts: &HashMap<Pubkey, Vec<u8>>,
        transaction: &Transaction,
    ) -> Result<HashMap<Pubkey, Vec<u8>>, String> {
        transaction
            .verify()
            .map_err(|err| format!("signature verification failed: {}", err))?;

        let mut state = accounts.clone();
        let message = &transaction.message;
        for (index, compiled) in message.instructions.iter().enumerate() {
            let program_id = message.account_keys[compiled.program_id_index as usize];
            let keys: Vec<Pubkey> = compiled
                .accounts
                .iter()
                .map(|i| message.account_keys[*i as usize])
                .collect();
            let signers: Vec<bool> = compiled
                .accounts
                .iter()
                .map(|i| message.is_signer(*i as usize))
                .collect();

            if program_id == spl_associated_token_account::id() {
                create_ata(&mut state, &keys);
            } else if program_id == self.program_id {
                self.run_program(&mut state, &keys, &signers, &compiled.data)
                    .map_err(|err| format!("instruction {}: {}", index, err))?;
            } else {
                return Err(format!("unknown program {}", program_id));
            }
        }
        Ok(state)
    }

    fn run_program(
        &self,
        state: &mut HashMap<Pubkey, Vec<u8>>,
        keys: &[Pubkey],
        signers: &[bool],
        data: &[u8],
    ) -> Result<(), String> {
        let (tag, args) = split_data(data).ok_or("instruction data too short")?;
        let is = |name: &str| tag == anchor_discriminator(name);

        if is(IX_INITIALIZE) {
            let args = InitializeArgs::try_from_slice(args).map_err(|e| e.to_string())?;
            let (config_key, mint) = (keys[0], keys[1]);
            if state.contains_key(&config_key) {
                return Err("already initialized".to_string());
            }
            if !signers[1] {
                return Err("mint must sign".to_string());
            }
            let bump = find_config_pda(&mint, &self.program_id)
                .map_err(|e| e.to_string())?
                .bump;
            let config = StablecoinConfig {
                name: args.name,
                symbol: args.symbol,
                uri: args.uri,
                decimals: args.decimals,
                enable_permanent_delegate: args.enable_permanent_delegate,
                enable_transfer_hook: args.enable_transfer_hook,
                default_account_frozen: args.default_account_frozen,
                mint_authority: args.mint_authority,
                freeze_authority: args.freeze_authority,
                bump,
            };
            let mut data = config.encode().map_err(|e| e.to_string())?;
            data.resize(512, 0);
            state.insert(config_key, data);
            state.insert(mint, vec![1]);
            return Ok(());
        }

        let blacklist = is(IX_ADD_TO_BLACKLIST) || is(IX_REMOVE_FROM_BLACKLIST);
        let mut config = load_config(state, &keys[if blacklist { 1 } else { 0 }])?;
        if is(IX_MINT_TO) {
            let amount = AmountArgs::try_from_slice(args)
                .map_err(|e| e.to_string())?
                .amount;
            require_authority(keys[4], signers[4], config.mint_authority)?;
            update_token(state, &keys[3], |account| {
                account.amount = account.amount.checked_add(amount).ok_or("overflow")?;
                Ok(())
            })
        } else if is(IX_FREEZE_ACCOUNT) || is(IX_THAW_ACCOUNT) {
            require_authority(keys[4], signers[4], config.freeze_authority)?;
            let frozen = is(IX_FREEZE_ACCOUNT);
            update_token(state, &keys[2], |account| {
                account.state = if frozen {
                    AccountState::Frozen
                } else {
                    AccountState::Initialized
                };
                Ok(())
            })
        } else if blacklist {
            require_authority(keys[2], signers[2], config.mint_authority)?;
            let address = AddressArgs::try_from_slice(args)
                .map_err(|e| e.to_string())?
                .address;
            let entry = BlacklistEntry {
                address,
                is_blacklisted: is(IX_ADD_TO_BLACKLIST),
                timestamp: NOW,
            };
            state.insert(keys[0], entry.encode().map_err(|e| e.to_string())?);
            Ok(())
        } else if is(IX_SEIZE_TOKENS) {
            if !config.enable_permanent_delegate {
                return Err("permanent delegate not enabled".to_string());
            }
            require_authority(keys[5], signers[5], config.freeze_authority)?;
            let amount = AmountArgs::try_from_slice(args)
                .map_err(|e| e.to_string())?
                .amount;
            update_token(state, &keys[2], |account| {
                account.amount = account
                    .amount
                    .checked_sub(amount)
                    .ok_or("insufficient funds")?;
                Ok(())
            })?;
            update_token(state, &keys[3], |account| {
                account.amount = account.amount.checked_add(amount).ok_or("overflow")?;
                Ok(())
            })
        } else if is(IX_UPDATE_MINTER) || is(IX_UPDATE_FREEZER) {
            let new_authority = AddressArgs::try_from_slice(args)
                .map_err(|e| e.to_string())?
                .address;
            if is(IX_UPDATE_MINTER) {
                require_authority(keys[1], signers[1], config.mint_authority)?;
                config.mint_authority = new_authority;
            } else {
                require_authority(keys[1], signers[1], config.freeze_authority)?;
                config.freeze_authority = new_authority;
            }
            let mut data = config.encode().map_err(|e| e.to_string())?;
            data.resize(512, 0);
            state.insert(keys[0], data);
            Ok(())
        } else {
            Err("unknown instruction".to_string())
        }
    }
}

fn load_config(state: &HashMap<Pubkey, Vec<u8>>, key: &Pubkey) -> Result<StablecoinConfig, String> {
    let data = state.get(key).ok_or("config not initialized")?;
    StablecoinConfig::decode(key, data).map_err(|e| e.to_string())
}

fn require_authority(key: Pubkey, signed: bool, expected: Pubkey) -> Result<(), String> {
    if !signed || key != expected {
        return Err(format!("unauthorized: {}", key));
    }
    Ok(())
}

fn update_token(
    state: &mut HashMap<Pubkey, Vec<u8>>,
    key: &Pubkey,
    f: impl FnOnce(&mut TokenAccount) -> Result<(), &'static str>,
) -> Result<(), String> {
    let data = state.get(key).ok_or("token account not found")?;
    let mut account = decode_token_account(key, data).map_err(|e| e.to_string())?;
    f(&mut account)?;
    state.insert(*key, encode_token_account(&account));
    Ok(())
}

fn create_ata(state: &mut HashMap<Pubkey, Vec<u8>>, keys: &[Pubkey]) {
    let (ata, wallet, mint) = (keys[1], keys[2], keys[3]);
    state.entry(ata).or_insert_with(|| {
        encode_token_account(&TokenAccount {
            mint,
            owner: wallet,
            state: AccountState::Initialized,
            ..TokenAccount::default()
        })
    });
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn latest_blockhash(&self) -> Result<Hash, LedgerError> {
        Ok(Hash::new_unique())
    }

    async fn simulate(&self, transaction: &Transaction) -> Result<Simulation, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        inner.simulated += 1;
        if let Some(error) = inner.force_simulation_error.clone() {
            return Ok(Simulation {
                error: Some(error.clone()),
                logs: vec![format!("Program log: {}", error)],
                units_consumed: Some(0),
            });
        }
        Ok(match self.execute(&inner.accounts, transaction) {
            Ok(_) => Simulation {
                error: None,
                logs: vec!["Program log: ok".to_string()],
                units_consumed: Some(5_000),
            },
            Err(error) => Simulation {
                logs: vec![format!("Program log: {}", error)],
                error: Some(error),
                units_consumed: Some(5_000),
            },
        })
    }

    async fn send(&self, transaction: &Transaction) -> Result<Signature, LedgerError> {
        if transaction.verify().is_err() {
            return Err(LedgerError::Other("invalid signature".to_string()));
        }
        let mut inner = self.inner.lock().unwrap();
        inner.sent += 1;
        let signature = transaction.signatures[0];
        let outcome = self.execute(&inner.accounts, transaction);
        let status = match outcome {
            Ok(accounts) => {
                inner.accounts = accounts;
                Ok(())
            }
            Err(error) => Err(error),
        };
        inner.statuses.insert(signature, status);
        Ok(signature)
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<Result<(), String>>, LedgerError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_status {
            return Err(LedgerError::Other("503 service unavailable".to_string()));
        }
        if inner.never_confirm {
            return Ok(None);
        }
        Ok(inner.statuses.get(signature).cloned())
    }

    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, LedgerError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_reads {
            return Err(LedgerError::Other("connection refused".to_string()));
        }
        Ok(inner.accounts.get(address).cloned())
    }
}

/// `RUST_LOG=sss_sdk=debug cargo test` shows submission logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn fast_options() -> SubmitOptions {
    SubmitOptions {
        skip_preflight: false,
        confirm_timeout: Some(Duration::from_secs(5)),
        poll_interval: Duration::from_millis(5),
    }
}

pub fn client(ledger: &Arc<MemoryLedger>, program_id: Pubkey, payer: Keypair) -> StablecoinClient {
    client_with(ledger, program_id, payer, fast_options())
}

pub fn client_with(
    ledger: &Arc<MemoryLedger>,
    program_id: Pubkey,
    payer: Keypair,
    options: SubmitOptions,
) -> StablecoinClient {
    init_tracing();
    StablecoinClient::new(ledger.clone(), program_id, payer, options)
}
