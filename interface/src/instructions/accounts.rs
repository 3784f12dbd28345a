//! Account contexts of each instruction, listed in the order the program's IDL declares them.
//!
//! Every role is a required field: there is no partial resolution of accounts, so a missing or
//! substituted account can't silently make it into a transaction.

use solana_sdk::{
    instruction::AccountMeta,
    pubkey::Pubkey,
};

use crate::program::{
    SPL_ASSOCIATED_TOKEN_ACCOUNT_ID,
    SPL_TOKEN_ID,
    SYSTEM_PROGRAM_ID,
};

/// Accounts for `create_listing`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateListingAccounts {
    pub signer: Pubkey,
    pub mint: Pubkey,
    pub listing: Pubkey,
    pub mint_vault: Pubkey,
    pub sol_vault: Pubkey,
    pub token_program: Pubkey,
    pub associated_token_program: Pubkey,
    pub system_program: Pubkey,
}

/// Accounts for `buy`, `sell` and `burn_tokens`, which share one account context shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapAccounts {
    pub user: Pubkey,
    pub mint: Pubkey,
    pub sol_vault: Pubkey,
    pub listing: Pubkey,
    pub mint_vault: Pubkey,
    pub user_ata: Pubkey,
    pub token_program: Pubkey,
    pub associated_token_program: Pubkey,
    pub system_program: Pubkey,
}

/// The three program ids every instruction passes along.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgramAccounts {
    pub token_program: Pubkey,
    pub associated_token_program: Pubkey,
    pub system_program: Pubkey,
}

impl Default for ProgramAccounts {
    fn default() -> Self {
        Self {
            token_program: SPL_TOKEN_ID,
            associated_token_program: SPL_ASSOCIATED_TOKEN_ACCOUNT_ID,
            system_program: SYSTEM_PROGRAM_ID,
        }
    }
}

impl CreateListingAccounts {
    pub fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.signer, true),
            AccountMeta::new(self.mint, false),
            AccountMeta::new(self.listing, false),
            AccountMeta::new(self.mint_vault, false),
            AccountMeta::new_readonly(self.sol_vault, false),
            AccountMeta::new_readonly(self.token_program, false),
            AccountMeta::new_readonly(self.associated_token_program, false),
            AccountMeta::new_readonly(self.system_program, false),
        ]
    }

    /// Reads the account context back out of an ordered list of account keys.
    pub fn from_keys(keys: &[Pubkey]) -> Option<Self> {
        let [signer, mint, listing, mint_vault, sol_vault, token_program, associated_token_program, system_program]: [Pubkey; 8] =
            keys.try_into().ok()?;
        Some(Self {
            signer,
            mint,
            listing,
            mint_vault,
            sol_vault,
            token_program,
            associated_token_program,
            system_program,
        })
    }
}

impl SwapAccounts {
    pub fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.user, true),
            AccountMeta::new(self.mint, false),
            AccountMeta::new(self.sol_vault, false),
            AccountMeta::new(self.listing, false),
            AccountMeta::new(self.mint_vault, false),
            AccountMeta::new(self.user_ata, false),
            AccountMeta::new_readonly(self.token_program, false),
            AccountMeta::new_readonly(self.associated_token_program, false),
            AccountMeta::new_readonly(self.system_program, false),
        ]
    }

    pub fn from_keys(keys: &[Pubkey]) -> Option<Self> {
        let [user, mint, sol_vault, listing, mint_vault, user_ata, token_program, associated_token_program, system_program]: [Pubkey; 9] =
            keys.try_into().ok()?;
        Some(Self {
            user,
            mint,
            sol_vault,
            listing,
            mint_vault,
            user_ata,
            token_program,
            associated_token_program,
            system_program,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_accounts_round_trip_through_keys() {
        let programs = ProgramAccounts::default();
        let accounts = SwapAccounts {
            user: Pubkey::new_unique(),
            mint: Pubkey::new_unique(),
            sol_vault: Pubkey::new_unique(),
            listing: Pubkey::new_unique(),
            mint_vault: Pubkey::new_unique(),
            user_ata: Pubkey::new_unique(),
            token_program: programs.token_program,
            associated_token_program: programs.associated_token_program,
            system_program: programs.system_program,
        };
        let metas = accounts.to_account_metas();
        let keys: Vec<_> = metas.iter().map(|m| m.pubkey).collect();

        assert_eq!(SwapAccounts::from_keys(&keys), Some(accounts));
        assert_eq!(metas.iter().filter(|m| m.is_signer).count(), 1);
        assert!(SwapAccounts::from_keys(&keys[..8]).is_none());
    }

    #[test]
    fn sol_vault_is_readonly_on_create() {
        let accounts = CreateListingAccounts {
            signer: Pubkey::new_unique(),
            mint: Pubkey::new_unique(),
            listing: Pubkey::new_unique(),
            mint_vault: Pubkey::new_unique(),
            sol_vault: Pubkey::new_unique(),
            token_program: SPL_TOKEN_ID,
            associated_token_program: SPL_ASSOCIATED_TOKEN_ACCOUNT_ID,
            system_program: SYSTEM_PROGRAM_ID,
        };
        let metas = accounts.to_account_metas();
        assert_eq!(metas.len(), 8);
        assert!(metas[0].is_signer && metas[0].is_writable);
        assert!(!metas[4].is_writable);
    }
}
