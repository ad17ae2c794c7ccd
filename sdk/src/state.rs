//! Account layouts owned by the program. The client only ever decodes
//! snapshots of these; it never mutates them.

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;

use crate::error::Error;

pub const DISCRIMINATOR_LEN: usize = 8;

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct StablecoinConfig {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub decimals: u8,
    pub enable_permanent_delegate: bool,
    pub enable_transfer_hook: bool,
    pub default_account_frozen: bool,
    pub mint_authority: Pubkey,
    pub freeze_authority: Pubkey,
    pub bump: u8,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct BlacklistEntry {
    pub address: Pubkey,
    pub is_blacklisted: bool,
    pub timestamp: i64,
}

/// An account type stored behind an 8-byte Anchor discriminator.
pub trait ProgramAccount: BorshSerialize + BorshDeserialize {
    const NAME: &'static str;

    fn discriminator() -> [u8; DISCRIMINATOR_LEN] {
        account_discriminator(Self::NAME)
    }

    /// Trailing bytes past the encoded value are allocation padding and are
    /// ignored.
    fn decode(address: &Pubkey, data: &[u8]) -> Result<Self, Error> {
        let decode_error = |reason: String| Error::Decode {
            kind: Self::NAME,
            address: *address,
            reason,
        };
        if data.len() < DISCRIMINATOR_LEN {
            return Err(decode_error(format!("account data too short ({} bytes)", data.len())));
        }
        let (tag, mut body) = data.split_at(DISCRIMINATOR_LEN);
        if tag != Self::discriminator() {
            return Err(decode_error("discriminator mismatch".to_string()));
        }
        Self::deserialize(&mut body).map_err(|err| decode_error(err.to_string()))
    }

    fn encode(&self) -> std::io::Result<Vec<u8>> {
        let mut data = Self::discriminator().to_vec();
        self.serialize(&mut data)?;
        Ok(data)
    }
}

impl ProgramAccount for StablecoinConfig {
    const NAME: &'static str = "StablecoinConfig";
}

impl ProgramAccount for BlacklistEntry {
    const NAME: &'static str = "BlacklistEntry";
}

pub fn account_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(format!("account:{}", name));
    let hash = hasher.finalize();
    let mut output = [0u8; DISCRIMINATOR_LEN];
    output.copy_from_slice(&hash[..DISCRIMINATOR_LEN]);
    output
}
