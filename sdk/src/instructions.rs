//! Instruction assembly for the stablecoin program.
//!
//! Each builder validates its params, derives the addresses it needs and
//! returns exactly one [`Instruction`]. Nothing here touches the network.

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::{system_program, sysvar};

use crate::error::{Error, ValidationError};
use crate::pda::{
    find_blacklist_pda, find_config_pda, find_freeze_authority_pda, find_mint_authority_pda,
    DerivedAddresses,
};

pub const MAX_NAME_LEN: usize = 32;
pub const MAX_SYMBOL_LEN: usize = 16;
pub const MAX_URI_LEN: usize = 256;
pub const MAX_DECIMALS: u8 = 9;

pub const IX_INITIALIZE: &str = "initialize";
pub const IX_MINT_TO: &str = "mint_to";
pub const IX_FREEZE_ACCOUNT: &str = "freeze_account";
pub const IX_THAW_ACCOUNT: &str = "thaw_account";
pub const IX_ADD_TO_BLACKLIST: &str = "add_to_blacklist";
pub const IX_REMOVE_FROM_BLACKLIST: &str = "remove_from_blacklist";
pub const IX_SEIZE_TOKENS: &str = "seize_tokens";
pub const IX_UPDATE_MINTER: &str = "update_minter";
pub const IX_UPDATE_FREEZER: &str = "update_freezer";

pub fn anchor_discriminator(name: &str) -> [u8; 8] {
    let mut hasher = Sha256::new();
    hasher.update(format!("global:{}", name));
    let hash = hasher.finalize();
    let mut output = [0u8; 8];
    output.copy_from_slice(&hash[..8]);
    output
}

fn build_instruction(
    name: &str,
    data: Vec<u8>,
    accounts: Vec<AccountMeta>,
    program_id: Pubkey,
) -> Instruction {
    let mut payload = Vec::with_capacity(8 + data.len());
    payload.extend_from_slice(&anchor_discriminator(name));
    payload.extend_from_slice(&data);
    Instruction {
        program_id,
        accounts,
        data: payload,
    }
}

fn encode<T: BorshSerialize>(args: &T) -> Result<Vec<u8>, Error> {
    Ok(args.try_to_vec()?)
}

fn require_present(field: &'static str, key: &Pubkey) -> Result<(), ValidationError> {
    if *key == Pubkey::default() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

fn require_len(
    field: &'static str,
    value: &str,
    max: usize,
    allow_empty: bool,
) -> Result<(), ValidationError> {
    if value.is_empty() && !allow_empty {
        return Err(ValidationError::MissingField(field));
    }
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field,
            max,
            len: value.len(),
        });
    }
    Ok(())
}

// Argument payloads, borsh-encoded after the discriminator.

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct InitializeArgs {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub decimals: u8,
    pub enable_permanent_delegate: bool,
    pub enable_transfer_hook: bool,
    pub default_account_frozen: bool,
    pub transfer_hook_program: Option<Pubkey>,
    pub mint_authority: Pubkey,
    pub freeze_authority: Pubkey,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountArgs {
    pub amount: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressArgs {
    pub address: Pubkey,
}

/// Parameters for creating a new stablecoin. `mint_authority` and
/// `freeze_authority` are the keys recorded in the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializeParams {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub decimals: u8,
    pub enable_permanent_delegate: bool,
    pub enable_transfer_hook: bool,
    pub default_account_frozen: bool,
    pub transfer_hook_program: Option<Pubkey>,
    pub mint_authority: Pubkey,
    pub freeze_authority: Pubkey,
}

impl InitializeParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_len("name", &self.name, MAX_NAME_LEN, false)?;
        require_len("symbol", &self.symbol, MAX_SYMBOL_LEN, false)?;
        require_len("uri", &self.uri, MAX_URI_LEN, true)?;
        if self.decimals > MAX_DECIMALS {
            return Err(ValidationError::InvalidDecimals {
                got: self.decimals,
                max: MAX_DECIMALS,
            });
        }
        require_present("mint_authority", &self.mint_authority)?;
        require_present("freeze_authority", &self.freeze_authority)?;
        if self.enable_transfer_hook && self.transfer_hook_program.is_none() {
            return Err(ValidationError::MissingTransferHookProgram);
        }
        Ok(())
    }
}

pub fn build_initialize_instruction(
    program_id: &Pubkey,
    params: InitializeParams,
    mint: &Pubkey,
    authority: &Pubkey,
    payer: &Pubkey,
) -> Result<Instruction, Error> {
    params.validate()?;
    require_present("mint", mint)?;
    let derived = DerivedAddresses::for_mint(mint, program_id)?;

    let accounts = vec![
        AccountMeta::new(derived.config.address, false),
        AccountMeta::new(*mint, true),
        AccountMeta::new_readonly(derived.mint_authority.address, false),
        AccountMeta::new_readonly(derived.freeze_authority.address, false),
        AccountMeta::new(*authority, true),
        AccountMeta::new(*payer, true),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(spl_token_2022::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
    ];

    let data = encode(&InitializeArgs {
        name: params.name,
        symbol: params.symbol,
        uri: params.uri,
        decimals: params.decimals,
        enable_permanent_delegate: params.enable_permanent_delegate,
        enable_transfer_hook: params.enable_transfer_hook,
        default_account_frozen: params.default_account_frozen,
        transfer_hook_program: if params.enable_transfer_hook {
            params.transfer_hook_program
        } else {
            None
        },
        mint_authority: params.mint_authority,
        freeze_authority: params.freeze_authority,
    })?;

    Ok(build_instruction(IX_INITIALIZE, data, accounts, *program_id))
}

/// `recipient` is the wallet; tokens land in its associated token account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintToParams {
    pub mint: Pubkey,
    pub recipient: Pubkey,
    pub amount: u64,
}

pub fn recipient_token_account(mint: &Pubkey, owner: &Pubkey) -> Pubkey {
    spl_associated_token_account::get_associated_token_address_with_program_id(
        owner,
        mint,
        &spl_token_2022::id(),
    )
}

pub fn build_mint_to_instruction(
    program_id: &Pubkey,
    params: MintToParams,
    authority: &Pubkey,
) -> Result<Instruction, Error> {
    require_present("mint", &params.mint)?;
    require_present("recipient", &params.recipient)?;
    let config = find_config_pda(&params.mint, program_id)?;
    let mint_authority = find_mint_authority_pda(&params.mint, program_id)?;
    let recipient_ata = recipient_token_account(&params.mint, &params.recipient);

    let accounts = vec![
        AccountMeta::new_readonly(config.address, false),
        AccountMeta::new(params.mint, false),
        AccountMeta::new_readonly(mint_authority.address, false),
        AccountMeta::new(recipient_ata, false),
        AccountMeta::new_readonly(*authority, true),
        AccountMeta::new_readonly(spl_token_2022::id(), false),
    ];
    let data = encode(&AmountArgs {
        amount: params.amount,
    })?;
    Ok(build_instruction(IX_MINT_TO, data, accounts, *program_id))
}

/// `account` is the token account to freeze or thaw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreezeParams {
    pub mint: Pubkey,
    pub account: Pubkey,
}

fn freeze_accounts(
    program_id: &Pubkey,
    params: &FreezeParams,
    authority: &Pubkey,
) -> Result<Vec<AccountMeta>, Error> {
    require_present("mint", &params.mint)?;
    require_present("account", &params.account)?;
    let config = find_config_pda(&params.mint, program_id)?;
    let freeze_authority = find_freeze_authority_pda(&params.mint, program_id)?;
    Ok(vec![
        AccountMeta::new_readonly(config.address, false),
        AccountMeta::new_readonly(params.mint, false),
        AccountMeta::new(params.account, false),
        AccountMeta::new_readonly(freeze_authority.address, false),
        AccountMeta::new_readonly(*authority, true),
        AccountMeta::new_readonly(spl_token_2022::id(), false),
    ])
}

pub fn build_freeze_instruction(
    program_id: &Pubkey,
    params: FreezeParams,
    authority: &Pubkey,
) -> Result<Instruction, Error> {
    let accounts = freeze_accounts(program_id, &params, authority)?;
    Ok(build_instruction(
        IX_FREEZE_ACCOUNT,
        Vec::new(),
        accounts,
        *program_id,
    ))
}

pub fn build_thaw_instruction(
    program_id: &Pubkey,
    params: FreezeParams,
    authority: &Pubkey,
) -> Result<Instruction, Error> {
    let accounts = freeze_accounts(program_id, &params, authority)?;
    Ok(build_instruction(
        IX_THAW_ACCOUNT,
        Vec::new(),
        accounts,
        *program_id,
    ))
}

/// The entry address comes from `target` alone; `mint` only selects the
/// config whose authority signs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlacklistParams {
    pub mint: Pubkey,
    pub target: Pubkey,
}

fn blacklist_instruction(
    name: &str,
    program_id: &Pubkey,
    params: BlacklistParams,
    authority: &Pubkey,
    payer: &Pubkey,
) -> Result<Instruction, Error> {
    require_present("mint", &params.mint)?;
    require_present("target", &params.target)?;
    let config = find_config_pda(&params.mint, program_id)?;
    let entry = find_blacklist_pda(&params.target, program_id)?;
    let accounts = vec![
        AccountMeta::new(entry.address, false),
        AccountMeta::new_readonly(config.address, false),
        AccountMeta::new(*authority, true),
        AccountMeta::new(*payer, true),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    let data = encode(&AddressArgs {
        address: params.target,
    })?;
    Ok(build_instruction(name, data, accounts, *program_id))
}

pub fn build_add_to_blacklist_instruction(
    program_id: &Pubkey,
    params: BlacklistParams,
    authority: &Pubkey,
    payer: &Pubkey,
) -> Result<Instruction, Error> {
    blacklist_instruction(IX_ADD_TO_BLACKLIST, program_id, params, authority, payer)
}

pub fn build_remove_from_blacklist_instruction(
    program_id: &Pubkey,
    params: BlacklistParams,
    authority: &Pubkey,
    payer: &Pubkey,
) -> Result<Instruction, Error> {
    blacklist_instruction(
        IX_REMOVE_FROM_BLACKLIST,
        program_id,
        params,
        authority,
        payer,
    )
}

/// `from` and `to` are token accounts. `amount` is moved verbatim; there is
/// no "everything" sentinel, callers fetch the balance first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeizeParams {
    pub mint: Pubkey,
    pub from: Pubkey,
    pub to: Pubkey,
    pub amount: u64,
}

pub fn build_seize_instruction(
    program_id: &Pubkey,
    params: SeizeParams,
    authority: &Pubkey,
) -> Result<Instruction, Error> {
    require_present("mint", &params.mint)?;
    require_present("from", &params.from)?;
    require_present("to", &params.to)?;
    if params.amount == 0 {
        return Err(ValidationError::ZeroAmount("amount").into());
    }
    let config = find_config_pda(&params.mint, program_id)?;
    let freeze_authority = find_freeze_authority_pda(&params.mint, program_id)?;
    let accounts = vec![
        AccountMeta::new_readonly(config.address, false),
        AccountMeta::new(params.mint, false),
        AccountMeta::new(params.from, false),
        AccountMeta::new(params.to, false),
        AccountMeta::new_readonly(freeze_authority.address, false),
        AccountMeta::new_readonly(*authority, true),
        AccountMeta::new_readonly(spl_token_2022::id(), false),
    ];
    let data = encode(&AmountArgs {
        amount: params.amount,
    })?;
    Ok(build_instruction(IX_SEIZE_TOKENS, data, accounts, *program_id))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateAuthorityParams {
    pub mint: Pubkey,
    pub new_authority: Pubkey,
}

fn update_authority_instruction(
    name: &str,
    program_id: &Pubkey,
    params: UpdateAuthorityParams,
    authority: &Pubkey,
) -> Result<Instruction, Error> {
    require_present("mint", &params.mint)?;
    if params.new_authority == Pubkey::default() {
        return Err(ValidationError::NullAuthority("new_authority").into());
    }
    let config = find_config_pda(&params.mint, program_id)?;
    let accounts = vec![
        AccountMeta::new(config.address, false),
        AccountMeta::new_readonly(*authority, true),
    ];
    let data = encode(&AddressArgs {
        address: params.new_authority,
    })?;
    Ok(build_instruction(name, data, accounts, *program_id))
}

pub fn build_update_mint_authority_instruction(
    program_id: &Pubkey,
    params: UpdateAuthorityParams,
    authority: &Pubkey,
) -> Result<Instruction, Error> {
    update_authority_instruction(IX_UPDATE_MINTER, program_id, params, authority)
}

pub fn build_update_freeze_authority_instruction(
    program_id: &Pubkey,
    params: UpdateAuthorityParams,
    authority: &Pubkey,
) -> Result<Instruction, Error> {
    update_authority_instruction(IX_UPDATE_FREEZER, program_id, params, authority)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Initialize,
    MintTo,
    Freeze,
    Thaw,
    AddBlacklist,
    RemoveBlacklist,
    Seize,
    UpdateMintAuthority,
    UpdateFreezeAuthority,
}

impl OperationKind {
    pub fn instruction_name(&self) -> &'static str {
        match self {
            Self::Initialize => IX_INITIALIZE,
            Self::MintTo => IX_MINT_TO,
            Self::Freeze => IX_FREEZE_ACCOUNT,
            Self::Thaw => IX_THAW_ACCOUNT,
            Self::AddBlacklist => IX_ADD_TO_BLACKLIST,
            Self::RemoveBlacklist => IX_REMOVE_FROM_BLACKLIST,
            Self::Seize => IX_SEIZE_TOKENS,
            Self::UpdateMintAuthority => IX_UPDATE_MINTER,
            Self::UpdateFreezeAuthority => IX_UPDATE_FREEZER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationRequest {
    Initialize(InitializeParams),
    MintTo(MintToParams),
    Freeze(FreezeParams),
    Thaw(FreezeParams),
    AddBlacklist(BlacklistParams),
    RemoveBlacklist(BlacklistParams),
    Seize(SeizeParams),
    UpdateMintAuthority(UpdateAuthorityParams),
    UpdateFreezeAuthority(UpdateAuthorityParams),
}

/// A single program call plus the keys that must sign for it.
#[derive(Debug)]
pub struct CallDescription {
    pub kind: OperationKind,
    pub instruction: Instruction,
    pub required_signers: Vec<Pubkey>,
    /// Keys created while building, e.g. the fresh mint for `Initialize`.
    pub generated_signers: Vec<Keypair>,
}

impl OperationRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Initialize(_) => OperationKind::Initialize,
            Self::MintTo(_) => OperationKind::MintTo,
            Self::Freeze(_) => OperationKind::Freeze,
            Self::Thaw(_) => OperationKind::Thaw,
            Self::AddBlacklist(_) => OperationKind::AddBlacklist,
            Self::RemoveBlacklist(_) => OperationKind::RemoveBlacklist,
            Self::Seize(_) => OperationKind::Seize,
            Self::UpdateMintAuthority(_) => OperationKind::UpdateMintAuthority,
            Self::UpdateFreezeAuthority(_) => OperationKind::UpdateFreezeAuthority,
        }
    }

    pub fn build(
        self,
        program_id: &Pubkey,
        authority: &Pubkey,
        payer: &Pubkey,
    ) -> Result<CallDescription, Error> {
        let kind = self.kind();
        let mut generated_signers = Vec::new();
        let instruction = match self {
            Self::Initialize(params) => {
                let mint = Keypair::new();
                let ix = build_initialize_instruction(
                    program_id,
                    params,
                    &mint.pubkey(),
                    authority,
                    payer,
                )?;
                generated_signers.push(mint);
                ix
            }
            Self::MintTo(params) => build_mint_to_instruction(program_id, params, authority)?,
            Self::Freeze(params) => build_freeze_instruction(program_id, params, authority)?,
            Self::Thaw(params) => build_thaw_instruction(program_id, params, authority)?,
            Self::AddBlacklist(params) => {
                build_add_to_blacklist_instruction(program_id, params, authority, payer)?
            }
            Self::RemoveBlacklist(params) => {
                build_remove_from_blacklist_instruction(program_id, params, authority, payer)?
            }
            Self::Seize(params) => build_seize_instruction(program_id, params, authority)?,
            Self::UpdateMintAuthority(params) => {
                build_update_mint_authority_instruction(program_id, params, authority)?
            }
            Self::UpdateFreezeAuthority(params) => {
                build_update_freeze_authority_instruction(program_id, params, authority)?
            }
        };
        Ok(CallDescription {
            kind,
            required_signers: required_signers(&instruction),
            instruction,
            generated_signers,
        })
    }
}

pub fn required_signers(instruction: &Instruction) -> Vec<Pubkey> {
    let mut signers: Vec<Pubkey> = Vec::new();
    for meta in instruction.accounts.iter().filter(|meta| meta.is_signer) {
        if !signers.contains(&meta.pubkey) {
            signers.push(meta.pubkey);
        }
    }
    signers
}

/// Splits instruction data into its discriminator and argument bytes.
pub fn split_data(data: &[u8]) -> Option<([u8; 8], &[u8])> {
    if data.len() < 8 {
        return None;
    }
    let (tag, args) = data.split_at(8);
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(tag);
    Some((discriminator, args))
}
