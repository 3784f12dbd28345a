//! Assembles fully-specified operation requests from raw arguments.
//!
//! Arguments are validated and addresses derived before anything is built. Nothing in here talks
//! to the network, so every failure is a [`BuildError`].

use listing_interface::instructions::accounts::ProgramAccounts;
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
};

use crate::{
    args::{
        Amount,
        CreateListingArgs,
        Seed,
        SwapArgs,
    },
    context::listing::ListingContext,
    error::{
        BuildError,
        DerivationError,
        ValidationError,
    },
    pda::{
        AddressDeriver,
        DerivedAddressSet,
    },
    transactions::VerificationMode,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Operation {
    CreateListing,
    Buy,
    Sell,
    Burn,
}

impl Operation {
    /// Burns skip preflight simulation. Every other operation is simulated first.
    pub fn verification_mode(self) -> VerificationMode {
        match self {
            Self::Burn => VerificationMode::Unverified,
            Self::CreateListing | Self::Buy | Self::Sell => VerificationMode::Verified,
        }
    }

    pub fn failure_message(self) -> &'static str {
        match self {
            Self::CreateListing => "Failed to create list.",
            Self::Buy => "Failed to buy.",
            Self::Sell => "Failed to sell.",
            Self::Burn => "Failed to burn.",
        }
    }
}

/// A built operation, ready to be signed and submitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationRequest {
    pub operation: Operation,
    /// The fee payer and only signer.
    pub signer: Pubkey,
    pub addresses: DerivedAddressSet,
    pub instruction: Instruction,
}

impl OperationRequest {
    pub fn listing(&self) -> Pubkey {
        self.addresses.listing
    }
}

#[derive(Clone, Copy, Debug)]
pub struct InstructionBuilder {
    deriver: AddressDeriver,
    programs: ProgramAccounts,
}

impl InstructionBuilder {
    pub fn new(program_id: Pubkey) -> Self {
        Self::with_programs(program_id, ProgramAccounts::default())
    }

    pub fn with_programs(program_id: Pubkey, programs: ProgramAccounts) -> Self {
        let mut deriver = AddressDeriver::new(program_id);
        deriver.token_program = programs.token_program;
        Self { deriver, programs }
    }

    pub fn program_id(&self) -> Pubkey {
        self.deriver.program_id
    }

    pub fn deriver(&self) -> &AddressDeriver {
        &self.deriver
    }

    pub fn derive(&self, seed: Seed) -> Result<DerivedAddressSet, DerivationError> {
        self.deriver.derive(seed)
    }

    pub fn listing_context(&self, seed: Seed) -> Result<ListingContext, DerivationError> {
        let addresses = self.derive(seed)?;
        Ok(ListingContext::new(
            self.deriver.program_id,
            addresses,
            self.programs,
        ))
    }

    pub fn create_listing(
        &self,
        signer: Pubkey,
        args: &CreateListingArgs,
    ) -> Result<OperationRequest, BuildError> {
        let (seed, name) = args.validate()?;
        let ctx = self.listing_context(seed)?;
        let instruction = ctx.create_listing(signer, &name)?;
        Ok(OperationRequest {
            operation: Operation::CreateListing,
            signer,
            addresses: ctx.addresses,
            instruction,
        })
    }

    pub fn buy(&self, user: Pubkey, args: &SwapArgs) -> Result<OperationRequest, BuildError> {
        self.swap(Operation::Buy, user, args, ListingContext::buy)
    }

    pub fn sell(&self, user: Pubkey, args: &SwapArgs) -> Result<OperationRequest, BuildError> {
        self.swap(Operation::Sell, user, args, ListingContext::sell)
    }

    pub fn burn(&self, user: Pubkey, args: &SwapArgs) -> Result<OperationRequest, BuildError> {
        self.swap(Operation::Burn, user, args, ListingContext::burn_tokens)
    }

    fn swap(
        &self,
        operation: Operation,
        user: Pubkey,
        args: &SwapArgs,
        build: fn(&ListingContext, Pubkey, Amount) -> Result<Instruction, ValidationError>,
    ) -> Result<OperationRequest, BuildError> {
        let (seed, amount, mint) = args.validate()?;
        let ctx = self.listing_context(seed)?;
        if mint != ctx.addresses.mint {
            return Err(ValidationError::MintMismatch {
                expected: ctx.addresses.mint,
                actual: mint,
            }
            .into());
        }

        let instruction = build(&ctx, user, amount)?;

        Ok(OperationRequest {
            operation,
            signer: user,
            addresses: ctx.addresses,
            instruction,
        })
    }
}

#[cfg(test)]
mod tests {
    use listing_interface::program;

    use super::*;

    #[test]
    fn burns_are_unverified() {
        assert_eq!(Operation::Burn.verification_mode(), VerificationMode::Unverified);
        assert_eq!(Operation::Buy.verification_mode(), VerificationMode::Verified);
        assert_eq!(Operation::Sell.verification_mode(), VerificationMode::Verified);
        assert_eq!(
            Operation::CreateListing.verification_mode(),
            VerificationMode::Verified
        );
    }

    #[test]
    fn forged_mints_are_rejected() {
        let builder = InstructionBuilder::new(program::ID);
        let user = Pubkey::new_unique();
        let forged = Pubkey::new_unique();
        let err = builder
            .buy(user, &SwapArgs::new(7, 10, forged))
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Validation(ValidationError::MintMismatch { actual, .. }) if actual == forged
        ));
    }

    #[test]
    fn requests_carry_their_listing() {
        let builder = InstructionBuilder::new(program::ID);
        let signer = Pubkey::new_unique();
        let request = builder
            .create_listing(signer, &CreateListingArgs::new(7, "token7"))
            .unwrap();
        assert_eq!(request.listing(), builder.derive(Seed::new(7)).unwrap().listing);
        assert_eq!(request.instruction.program_id, program::ID);
        assert_eq!(request.signer, signer);
    }
}
