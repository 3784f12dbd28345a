//! PDA helpers for deriving listing program addresses.
//!
//! Every address here is a pure function of its inputs: the same seed under the same program id
//! always yields the same addresses.

use listing_interface::{
    program::SPL_TOKEN_ID,
    LISTING_SEED,
    MINT_SEED,
    VAULT_SEED,
};
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account_interface::address::get_associated_token_address_with_program_id;

use crate::{
    args::Seed,
    error::DerivationError,
};

/// Every address a listing owns, derived from its seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DerivedAddressSet {
    pub seed: Seed,
    pub listing: Pubkey,
    pub mint: Pubkey,
    pub sol_vault: Pubkey,
    /// The listing's associated token account for its own mint.
    pub mint_vault: Pubkey,
    pub bumps: DerivedBumps,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DerivedBumps {
    pub listing: u8,
    pub mint: u8,
    pub sol_vault: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressDeriver {
    pub program_id: Pubkey,
    pub token_program: Pubkey,
}

impl AddressDeriver {
    pub const fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            token_program: SPL_TOKEN_ID,
        }
    }

    pub fn derive(&self, seed: Seed) -> Result<DerivedAddressSet, DerivationError> {
        let (listing, listing_bump) = self.find(LISTING_SEED, seed, "listing")?;
        let (mint, mint_bump) = self.find(MINT_SEED, seed, "mint")?;
        let (sol_vault, vault_bump) = self.find(VAULT_SEED, seed, "vault")?;
        let mint_vault = self.user_token_address(&mint, &listing);

        Ok(DerivedAddressSet {
            seed,
            listing,
            mint,
            sol_vault,
            mint_vault,
            bumps: DerivedBumps {
                listing: listing_bump,
                mint: mint_bump,
                sol_vault: vault_bump,
            },
        })
    }

    /// The associated token account holding `owner`'s balance of `mint`.
    pub fn user_token_address(&self, mint: &Pubkey, owner: &Pubkey) -> Pubkey {
        get_associated_token_address_with_program_id(owner, mint, &self.token_program)
    }

    fn find(
        &self,
        tag: &'static [u8],
        seed: Seed,
        label: &'static str,
    ) -> Result<(Pubkey, u8), DerivationError> {
        Pubkey::try_find_program_address(&[tag, &seed.to_le_bytes()], &self.program_id).ok_or(
            DerivationError {
                tag: label,
                seed: seed.get(),
                program_id: self.program_id,
            },
        )
    }
}
