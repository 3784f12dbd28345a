//! Listing-level context: one listing's derived addresses and the instructions that act on it.
//!
//! Every instruction built here spells out its full account list. Nothing is left for the
//! program or the wallet to resolve.

use borsh::BorshSerialize;
use listing_interface::instructions::{
    accounts::{
        CreateListingAccounts,
        ProgramAccounts,
        SwapAccounts,
    },
    pack,
    BurnTokensInstructionData,
    CreateListingInstructionData,
    ListingInstruction,
    SwapInstructionData,
};
use solana_sdk::{
    instruction::{
        AccountMeta,
        Instruction,
    },
    pubkey::Pubkey,
};

use crate::{
    args::{
        Amount,
        ListingName,
    },
    context::token::TokenContext,
    error::ValidationError,
    pda::DerivedAddressSet,
};

#[derive(Clone, Debug)]
pub struct ListingContext {
    pub program_id: Pubkey,
    pub addresses: DerivedAddressSet,
    pub token: TokenContext,
    pub programs: ProgramAccounts,
}

impl ListingContext {
    pub fn new(program_id: Pubkey, addresses: DerivedAddressSet, programs: ProgramAccounts) -> Self {
        Self {
            program_id,
            token: TokenContext::new(addresses.mint, programs.token_program),
            addresses,
            programs,
        }
    }

    pub fn create_listing(
        &self,
        signer: Pubkey,
        name: &ListingName,
    ) -> Result<Instruction, ValidationError> {
        let accounts = CreateListingAccounts {
            signer,
            mint: self.addresses.mint,
            listing: self.addresses.listing,
            mint_vault: self.addresses.mint_vault,
            sol_vault: self.addresses.sol_vault,
            token_program: self.programs.token_program,
            associated_token_program: self.programs.associated_token_program,
            system_program: self.programs.system_program,
        };
        let args = CreateListingInstructionData {
            seed: self.addresses.seed.get(),
            name: name.as_str().to_string(),
        };
        self.instruction(
            ListingInstruction::CreateListing,
            &args,
            accounts.to_account_metas(),
        )
    }

    pub fn buy(&self, user: Pubkey, amount: Amount) -> Result<Instruction, ValidationError> {
        self.swap(ListingInstruction::Buy, user, amount)
    }

    pub fn sell(&self, user: Pubkey, amount: Amount) -> Result<Instruction, ValidationError> {
        self.swap(ListingInstruction::Sell, user, amount)
    }

    /// Builds `burn_tokens`. The program takes a `u64` here, so larger amounts are rejected.
    ///
    /// The accounts are the swap accounts, including the `sol_vault` derived from the
    /// little-endian seed. Program builds whose burn constraint derives the vault from big-endian
    /// seed bytes reject this with `ConstraintSeeds` for every seed that isn't a byte palindrome.
    pub fn burn_tokens(&self, user: Pubkey, amount: Amount) -> Result<Instruction, ValidationError> {
        let args = BurnTokensInstructionData {
            amount: amount.to_u64()?,
        };
        self.instruction(
            ListingInstruction::BurnTokens,
            &args,
            self.swap_accounts(user).to_account_metas(),
        )
    }

    pub fn swap_accounts(&self, user: Pubkey) -> SwapAccounts {
        SwapAccounts {
            user,
            mint: self.addresses.mint,
            sol_vault: self.addresses.sol_vault,
            listing: self.addresses.listing,
            mint_vault: self.addresses.mint_vault,
            user_ata: self.token.get_ata_for(&user),
            token_program: self.programs.token_program,
            associated_token_program: self.programs.associated_token_program,
            system_program: self.programs.system_program,
        }
    }

    fn swap(
        &self,
        instruction: ListingInstruction,
        user: Pubkey,
        amount: Amount,
    ) -> Result<Instruction, ValidationError> {
        let args = SwapInstructionData {
            amount: amount.get(),
        };
        self.instruction(
            instruction,
            &args,
            self.swap_accounts(user).to_account_metas(),
        )
    }

    fn instruction<T: BorshSerialize>(
        &self,
        instruction: ListingInstruction,
        args: &T,
        accounts: Vec<AccountMeta>,
    ) -> Result<Instruction, ValidationError> {
        let data = pack(instruction, args).map_err(|e| ValidationError::Encoding(e.to_string()))?;
        Ok(Instruction {
            program_id: self.program_id,
            accounts,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use listing_interface::{
        instructions::unpack,
        program,
        VAULT_SEED,
    };

    use super::*;
    use crate::{
        args::Seed,
        pda::AddressDeriver,
    };

    fn context(seed: u64) -> ListingContext {
        let addresses = AddressDeriver::new(program::ID)
            .derive(Seed::new(seed))
            .unwrap();
        ListingContext::new(program::ID, addresses, ProgramAccounts::default())
    }

    #[test]
    fn create_listing_lists_every_account_in_order() {
        let ctx = context(7);
        let signer = Pubkey::new_unique();
        let name = ListingName::try_from("token7").unwrap();
        let ixn = ctx.create_listing(signer, &name).unwrap();

        let keys: Vec<_> = ixn.accounts.iter().map(|meta| meta.pubkey).collect();
        let accounts = CreateListingAccounts::from_keys(&keys).unwrap();
        assert_eq!(accounts.signer, signer);
        assert_eq!(accounts.listing, ctx.addresses.listing);
        assert_eq!(accounts.mint, ctx.addresses.mint);
        assert_eq!(accounts.mint_vault, ctx.addresses.mint_vault);
        assert_eq!(accounts.sol_vault, ctx.addresses.sol_vault);
        assert_eq!(accounts.token_program, program::SPL_TOKEN_ID);
        assert!(ixn.accounts[0].is_signer);

        let (tag, args): (_, CreateListingInstructionData) = unpack(&ixn.data).unwrap();
        assert_eq!(tag, ListingInstruction::CreateListing);
        assert_eq!(args.seed, 7);
        assert_eq!(args.name, "token7");
    }

    #[test]
    fn swaps_target_the_users_token_account() {
        let ctx = context(9);
        let user = Pubkey::new_unique();
        let amount = Amount::try_from(1_000).unwrap();

        for (ixn, tag) in [
            (ctx.buy(user, amount).unwrap(), ListingInstruction::Buy),
            (ctx.sell(user, amount).unwrap(), ListingInstruction::Sell),
        ] {
            let keys: Vec<_> = ixn.accounts.iter().map(|meta| meta.pubkey).collect();
            assert_eq!(SwapAccounts::from_keys(&keys), Some(ctx.swap_accounts(user)));
            let (decoded, args): (_, SwapInstructionData) = unpack(&ixn.data).unwrap();
            assert_eq!(decoded, tag);
            assert_eq!(args.amount, 1_000);
        }
    }

    #[test]
    fn burn_is_its_own_instruction() {
        let ctx = context(9);
        let user = Pubkey::new_unique();
        let amount = Amount::try_from(5).unwrap();
        let burn = ctx.burn_tokens(user, amount).unwrap();
        let sell = ctx.sell(user, amount).unwrap();
        assert_ne!(burn.data[..8], sell.data[..8]);

        let (tag, args): (_, BurnTokensInstructionData) = unpack(&burn.data).unwrap();
        assert_eq!(tag, ListingInstruction::BurnTokens);
        assert_eq!(args.amount, 5);

        let too_big = Amount::try_from(u64::MAX as i128 + 1).unwrap();
        assert!(matches!(
            ctx.burn_tokens(user, too_big),
            Err(ValidationError::AmountOutOfRange { .. })
        ));
    }

    #[test]
    fn burn_sends_the_little_endian_vault() {
        let ctx = context(7);
        let user = Pubkey::new_unique();
        let burn = ctx.burn_tokens(user, Amount::try_from(5).unwrap()).unwrap();
        let keys: Vec<_> = burn.accounts.iter().map(|meta| meta.pubkey).collect();
        let accounts = SwapAccounts::from_keys(&keys).unwrap();

        let (little_endian, _) =
            Pubkey::find_program_address(&[VAULT_SEED, &7u64.to_le_bytes()], &program::ID);
        let (big_endian, _) =
            Pubkey::find_program_address(&[VAULT_SEED, &7u64.to_be_bytes()], &program::ID);
        assert_eq!(accounts.sol_vault, little_endian);
        assert_ne!(accounts.sol_vault, big_endian);
        assert_eq!(accounts, ctx.swap_accounts(user));
    }
}
