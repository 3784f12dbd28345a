//! Token-level context for a listing's mint.
//!
//! The program creates user token accounts on demand (`init_if_needed`), so the client only needs
//! to derive them and read their balances.

use anyhow::Context;
use solana_sdk::{
    program_pack::Pack,
    pubkey::Pubkey,
};
use spl_associated_token_account_interface::address::get_associated_token_address_with_program_id;
use spl_token_interface::state::Account as TokenAccount;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenContext {
    pub mint_address: Pubkey,
    pub token_program: Pubkey,
}

impl TokenContext {
    pub const fn new(mint_address: Pubkey, token_program: Pubkey) -> Self {
        Self {
            mint_address,
            token_program,
        }
    }

    pub fn get_ata_for(&self, owner: &Pubkey) -> Pubkey {
        get_associated_token_address_with_program_id(owner, &self.mint_address, &self.token_program)
    }

    /// Unpacks a token account and returns its balance, checking it holds this context's mint.
    pub fn balance_from_account_data(&self, data: &[u8]) -> anyhow::Result<u64> {
        let account = TokenAccount::unpack(data).context("Couldn't unpack token account")?;
        anyhow::ensure!(
            account.mint == self.mint_address,
            "Token account holds mint {}, expected {}",
            account.mint,
            self.mint_address
        );
        Ok(account.amount)
    }
}

#[cfg(test)]
mod tests {
    use listing_interface::program::SPL_TOKEN_ID;
    use spl_token_interface::state::AccountState;

    use super::*;

    fn packed_account(mint: Pubkey, amount: u64) -> Vec<u8> {
        let account = TokenAccount {
            mint,
            owner: Pubkey::new_unique(),
            amount,
            state: AccountState::Initialized,
            ..Default::default()
        };
        let mut data = vec![0; TokenAccount::LEN];
        TokenAccount::pack(account, &mut data).unwrap();
        data
    }

    #[test]
    fn reads_balances_of_its_own_mint() {
        let token = TokenContext::new(Pubkey::new_unique(), SPL_TOKEN_ID);
        let data = packed_account(token.mint_address, 1_000);
        assert_eq!(token.balance_from_account_data(&data).unwrap(), 1_000);

        let foreign = packed_account(Pubkey::new_unique(), 5);
        assert!(token.balance_from_account_data(&foreign).is_err());
        assert!(token.balance_from_account_data(&[0; 3]).is_err());
    }
}
