use std::sync::Arc;

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::Instruction;
use solana_sdk::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use spl_token_2022::extension::StateWithExtensions;
use spl_token_2022::state::Account as TokenAccount2022;

use crate::error::{Error, Result};
use crate::instructions::{
    build_initialize_instruction, recipient_token_account, BlacklistParams, CallDescription,
    FreezeParams, InitializeParams, MintToParams, OperationRequest, SeizeParams,
    UpdateAuthorityParams,
};
use crate::ledger::Ledger;
use crate::pda::{find_blacklist_pda, find_config_pda};
use crate::state::{BlacklistEntry, ProgramAccount, StablecoinConfig};
use crate::submitter::{self, SubmitOptions};

#[derive(Debug)]
pub struct Initialized {
    pub signature: Signature,
    pub mint: Pubkey,
    pub config: Pubkey,
}

/// Result of an atomic batch.
#[derive(Debug)]
pub struct Executed {
    pub signature: Signature,
    /// Keys created while building the batch, in request order. For each
    /// `Initialize` this is the new mint.
    pub generated: Vec<Pubkey>,
}

/// Everything an operation needs: ledger handle, program id and the fee
/// payer. There is no global provider; pass this around instead.
pub struct StablecoinClient {
    ledger: Arc<dyn Ledger>,
    program_id: Pubkey,
    payer: Keypair,
    options: SubmitOptions,
}

impl StablecoinClient {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        program_id: Pubkey,
        payer: Keypair,
        options: SubmitOptions,
    ) -> Self {
        Self {
            ledger,
            program_id,
            payer,
            options,
        }
    }

    pub fn from_rpc_url(
        url: String,
        commitment: CommitmentConfig,
        program_id: Pubkey,
        payer: Keypair,
        options: SubmitOptions,
    ) -> Self {
        let rpc = RpcClient::new_with_commitment(url, commitment);
        Self::new(Arc::new(rpc), program_id, payer, options)
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn payer(&self) -> &Keypair {
        &self.payer
    }

    pub fn options(&self) -> &SubmitOptions {
        &self.options
    }

    pub fn ledger(&self) -> &dyn Ledger {
        self.ledger.as_ref()
    }

    /// Builds every request first, then submits them as one atomic
    /// transaction. Any validation failure aborts before the network is
    /// touched.
    pub async fn execute(
        &self,
        requests: Vec<OperationRequest>,
        authority: &Keypair,
    ) -> Result<Executed> {
        let calls = self.build_calls(requests, authority)?;
        let generated = calls
            .iter()
            .flat_map(|call| call.generated_signers.iter().map(|signer| signer.pubkey()))
            .collect();
        let signature = self.submit_calls(Vec::new(), calls, authority).await?;
        Ok(Executed {
            signature,
            generated,
        })
    }

    fn build_calls(
        &self,
        requests: Vec<OperationRequest>,
        authority: &Keypair,
    ) -> Result<Vec<CallDescription>> {
        requests
            .into_iter()
            .map(|request| {
                request.build(&self.program_id, &authority.pubkey(), &self.payer.pubkey())
            })
            .collect()
    }

    async fn submit_calls(
        &self,
        mut instructions: Vec<Instruction>,
        calls: Vec<CallDescription>,
        authority: &Keypair,
    ) -> Result<Signature> {
        let mut generated = Vec::new();
        for call in calls {
            tracing::debug!(
                "{} requires {} signer(s)",
                call.kind.instruction_name(),
                call.required_signers.len()
            );
            instructions.push(call.instruction);
            generated.extend(call.generated_signers);
        }
        let mut co_signers: Vec<&Keypair> = vec![authority];
        co_signers.extend(generated.iter());
        submitter::submit(
            self.ledger.as_ref(),
            &instructions,
            &self.payer,
            &co_signers,
            &self.options,
        )
        .await
    }

    /// Creates a new mint and its config. The mint key is generated fresh, so
    /// resubmitting after a failure creates a different stablecoin.
    pub async fn initialize(
        &self,
        params: InitializeParams,
        authority: &Keypair,
    ) -> Result<Initialized> {
        let mint = Keypair::new();
        let instruction = build_initialize_instruction(
            &self.program_id,
            params,
            &mint.pubkey(),
            &authority.pubkey(),
            &self.payer.pubkey(),
        )?;
        let config = find_config_pda(&mint.pubkey(), &self.program_id)?.address;
        let signature = submitter::submit(
            self.ledger.as_ref(),
            &[instruction],
            &self.payer,
            &[authority, &mint],
            &self.options,
        )
        .await?;
        tracing::info!(
            "initialized stablecoin mint {} config {}",
            mint.pubkey(),
            config
        );
        Ok(Initialized {
            signature,
            mint: mint.pubkey(),
            config,
        })
    }

    /// Mints into the recipient's associated token account, creating it in
    /// the same transaction when missing.
    pub async fn mint_to(&self, params: MintToParams, authority: &Keypair) -> Result<Signature> {
        let create_ata = create_associated_token_account_idempotent(
            &self.payer.pubkey(),
            &params.recipient,
            &params.mint,
            &spl_token_2022::id(),
        );
        let amount = params.amount;
        let recipient = params.recipient;
        let calls = self.build_calls(vec![OperationRequest::MintTo(params)], authority)?;
        let signature = self.submit_calls(vec![create_ata], calls, authority).await?;
        tracing::info!("minted {} to {}", amount, recipient);
        Ok(signature)
    }

    pub async fn freeze_account(
        &self,
        params: FreezeParams,
        authority: &Keypair,
    ) -> Result<Signature> {
        self.single(OperationRequest::Freeze(params), authority).await
    }

    pub async fn thaw_account(
        &self,
        params: FreezeParams,
        authority: &Keypair,
    ) -> Result<Signature> {
        self.single(OperationRequest::Thaw(params), authority).await
    }

    pub async fn add_to_blacklist(
        &self,
        params: BlacklistParams,
        authority: &Keypair,
    ) -> Result<Signature> {
        self.single(OperationRequest::AddBlacklist(params), authority)
            .await
    }

    pub async fn remove_from_blacklist(
        &self,
        params: BlacklistParams,
        authority: &Keypair,
    ) -> Result<Signature> {
        self.single(OperationRequest::RemoveBlacklist(params), authority)
            .await
    }

    pub async fn seize(&self, params: SeizeParams, authority: &Keypair) -> Result<Signature> {
        self.single(OperationRequest::Seize(params), authority).await
    }

    pub async fn update_mint_authority(
        &self,
        params: UpdateAuthorityParams,
        authority: &Keypair,
    ) -> Result<Signature> {
        self.single(OperationRequest::UpdateMintAuthority(params), authority)
            .await
    }

    pub async fn update_freeze_authority(
        &self,
        params: UpdateAuthorityParams,
        authority: &Keypair,
    ) -> Result<Signature> {
        self.single(OperationRequest::UpdateFreezeAuthority(params), authority)
            .await
    }

    async fn single(&self, request: OperationRequest, authority: &Keypair) -> Result<Signature> {
        let kind = request.kind();
        let calls = self.build_calls(vec![request], authority)?;
        let signature = self.submit_calls(Vec::new(), calls, authority).await?;
        tracing::info!("{} landed in {}", kind.instruction_name(), signature);
        Ok(signature)
    }

    /// A missing entry means "never blacklisted". Transport failures are
    /// returned, not folded into `false`.
    pub async fn is_blacklisted(&self, address: &Pubkey) -> Result<bool> {
        Ok(self
            .blacklist_entry(address)
            .await?
            .map(|entry| entry.is_blacklisted)
            .unwrap_or(false))
    }

    pub async fn blacklist_entry(&self, address: &Pubkey) -> Result<Option<BlacklistEntry>> {
        let entry = find_blacklist_pda(address, &self.program_id)?.address;
        match self.ledger.fetch_account(&entry).await? {
            Some(data) => Ok(Some(BlacklistEntry::decode(&entry, &data)?)),
            None => Ok(None),
        }
    }

    pub async fn get_config(&self, mint: &Pubkey) -> Result<StablecoinConfig> {
        let config = find_config_pda(mint, &self.program_id)?.address;
        let data = self
            .ledger
            .fetch_account(&config)
            .await?
            .ok_or(Error::NotFound(config))?;
        StablecoinConfig::decode(&config, &data)
    }

    /// Balance of `owner`'s associated token account; zero when that account
    /// does not exist.
    pub async fn try_token_balance(&self, mint: &Pubkey, owner: &Pubkey) -> Result<u64> {
        let address = recipient_token_account(mint, owner);
        match self.ledger.fetch_account(&address).await? {
            Some(data) => Ok(decode_token_account(&address, &data)?.amount),
            None => Ok(0),
        }
    }

    /// Like [`Self::try_token_balance`] but any failure degrades to zero.
    pub async fn get_token_balance(&self, mint: &Pubkey, owner: &Pubkey) -> u64 {
        match self.try_token_balance(mint, owner).await {
            Ok(balance) => balance,
            Err(error) => {
                tracing::warn!("could not get balance for {}: {}", owner, error);
                0
            }
        }
    }

    /// Balance of an arbitrary token account, e.g. the source of a seizure.
    pub async fn token_account(&self, address: &Pubkey) -> Result<TokenAccount2022> {
        let data = self
            .ledger
            .fetch_account(address)
            .await?
            .ok_or(Error::NotFound(*address))?;
        decode_token_account(address, &data)
    }
}

pub fn decode_token_account(address: &Pubkey, data: &[u8]) -> Result<TokenAccount2022> {
    StateWithExtensions::<TokenAccount2022>::unpack(data)
        .map(|state| state.base)
        .map_err(|err| Error::Decode {
            kind: "TokenAccount",
            address: *address,
            reason: err.to_string(),
        })
}

/// Packs a bare (extension-free) token account; used by in-memory ledgers.
pub fn encode_token_account(account: &TokenAccount2022) -> Vec<u8> {
    let mut data = vec![0u8; TokenAccount2022::LEN];
    TokenAccount2022::pack_into_slice(account, &mut data);
    data
}
