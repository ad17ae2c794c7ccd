//! Program-derived addresses used by the stablecoin program.
//!
//! Every seed layout here must match the program byte for byte. Addresses
//! are recomputed on demand and never cached.

use solana_sdk::pubkey::Pubkey;

use crate::error::DerivationError;

pub const SEED_STABLECOIN: &[u8] = b"stablecoin";
pub const SEED_AUTHORITY: &[u8] = b"authority";
pub const SEED_MINT: &[u8] = b"mint";
pub const SEED_FREEZE: &[u8] = b"freeze";
pub const SEED_BLACKLIST: &[u8] = b"blacklist";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DerivedAddress {
    pub address: Pubkey,
    pub bump: u8,
}

/// Canonical bump search over `seeds`, from 255 down to 0.
pub fn derive_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<DerivedAddress, DerivationError> {
    Pubkey::try_find_program_address(seeds, program_id)
        .map(|(address, bump)| DerivedAddress { address, bump })
        .ok_or(DerivationError::ExhaustedSearchSpace {
            program_id: *program_id,
        })
}

pub fn find_config_pda(
    mint: &Pubkey,
    program_id: &Pubkey,
) -> Result<DerivedAddress, DerivationError> {
    derive_address(&[SEED_STABLECOIN, mint.as_ref()], program_id)
}

pub fn find_mint_authority_pda(
    mint: &Pubkey,
    program_id: &Pubkey,
) -> Result<DerivedAddress, DerivationError> {
    derive_address(&[SEED_AUTHORITY, SEED_MINT, mint.as_ref()], program_id)
}

pub fn find_freeze_authority_pda(
    mint: &Pubkey,
    program_id: &Pubkey,
) -> Result<DerivedAddress, DerivationError> {
    derive_address(&[SEED_AUTHORITY, SEED_FREEZE, mint.as_ref()], program_id)
}

/// Keyed by the target alone, so one entry covers every mint.
pub fn find_blacklist_pda(
    target: &Pubkey,
    program_id: &Pubkey,
) -> Result<DerivedAddress, DerivationError> {
    derive_address(&[SEED_BLACKLIST, target.as_ref()], program_id)
}

/// The per-mint addresses, derived together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedAddresses {
    pub config: DerivedAddress,
    pub mint_authority: DerivedAddress,
    pub freeze_authority: DerivedAddress,
}

impl DerivedAddresses {
    pub fn for_mint(mint: &Pubkey, program_id: &Pubkey) -> Result<Self, DerivationError> {
        Ok(Self {
            config: find_config_pda(mint, program_id)?,
            mint_authority: find_mint_authority_pda(mint, program_id)?,
            freeze_authority: find_freeze_authority_pda(mint, program_id)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let program_id = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let first = find_config_pda(&mint, &program_id).unwrap();
        let second = find_config_pda(&mint, &program_id).unwrap();
        assert_eq!(first, second);

        let all = DerivedAddresses::for_mint(&mint, &program_id).unwrap();
        assert_eq!(all.config, first);
        assert_eq!(
            all,
            DerivedAddresses::for_mint(&mint, &program_id).unwrap()
        );
    }

    #[test]
    fn matches_find_program_address() {
        let program_id = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let derived = find_mint_authority_pda(&mint, &program_id).unwrap();
        let (address, bump) =
            Pubkey::find_program_address(&[b"authority", b"mint", mint.as_ref()], &program_id);
        assert_eq!(derived.address, address);
        assert_eq!(derived.bump, bump);
    }

    #[test]
    fn seed_sets_do_not_collide() {
        let program_id = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let all = DerivedAddresses::for_mint(&mint, &program_id).unwrap();
        let blacklist = find_blacklist_pda(&mint, &program_id).unwrap();
        assert_ne!(all.config.address, all.mint_authority.address);
        assert_ne!(all.mint_authority.address, all.freeze_authority.address);
        assert_ne!(all.config.address, blacklist.address);
        assert!(!all.config.address.is_on_curve());
    }

    #[test]
    fn blacklist_entry_ignores_mint() {
        let program_id = Pubkey::new_unique();
        let target = Pubkey::new_unique();
        let entry = find_blacklist_pda(&target, &program_id).unwrap();
        let (expected, _) =
            Pubkey::find_program_address(&[b"blacklist", target.as_ref()], &program_id);
        assert_eq!(entry.address, expected);
    }

    #[test]
    fn different_program_gives_different_address() {
        let mint = Pubkey::new_unique();
        let a = find_config_pda(&mint, &Pubkey::new_unique()).unwrap();
        let b = find_config_pda(&mint, &Pubkey::new_unique()).unwrap();
        assert_ne!(a.address, b.address);
    }
}
