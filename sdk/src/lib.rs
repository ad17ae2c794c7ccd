//! Client SDK for the Solana Stablecoin Standard program.
//!
//! The program owns all state. This crate derives the program's addresses,
//! assembles its instructions, submits them and decodes what it reads back.

use solana_sdk::pubkey::Pubkey;

pub mod amount;
pub mod client;
pub mod config;
pub mod error;
pub mod instructions;
pub mod ledger;
pub mod pda;
pub mod state;
pub mod submitter;

pub use client::{Executed, Initialized, StablecoinClient};
pub use error::{Error, Result};
pub use instructions::{
    BlacklistParams, FreezeParams, InitializeParams, MintToParams, OperationRequest, SeizeParams,
    UpdateAuthorityParams,
};
pub use ledger::Ledger;
pub use state::{BlacklistEntry, StablecoinConfig};
pub use submitter::SubmitOptions;

/// Default deployment of the stablecoin program.
pub const ID: Pubkey = solana_sdk::pubkey!("StabLEcoin111111111111111111111111111111111");
