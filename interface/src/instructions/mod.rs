//! Instruction tags and argument layouts of the listing program.
//!
//! Instruction data is the 8-byte discriminator of the instruction name followed by the
//! borsh-encoded arguments.

use std::sync::LazyLock;

use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use strum::IntoEnumIterator;

use crate::discriminator::{
    instruction_discriminator,
    Discriminator,
    DISCRIMINATOR_LEN,
};

pub mod accounts;

/// The program's instructions, named as the IDL names them (snake case on the wire).
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumIter,
    strum_macros::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum ListingInstruction {
    CreateListing,
    Buy,
    Sell,
    BurnTokens,
}

static DISCRIMINATORS: LazyLock<Vec<(ListingInstruction, Discriminator)>> = LazyLock::new(|| {
    ListingInstruction::iter()
        .map(|ixn| (ixn, instruction_discriminator(ixn.name())))
        .collect()
});

impl ListingInstruction {
    /// The instruction name as hashed into its discriminator, e.g. `burn_tokens`.
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn discriminator(self) -> Discriminator {
        // The table is built from `iter()`, so it's indexed by variant order.
        DISCRIMINATORS[self as usize].1
    }

    /// Matches the leading bytes of instruction data against every known discriminator.
    pub fn from_instruction_data(data: &[u8]) -> Option<Self> {
        let tag = data.get(..DISCRIMINATOR_LEN)?;
        DISCRIMINATORS
            .iter()
            .find_map(|(ixn, disc)| (disc.as_slice() == tag).then_some(*ixn))
    }
}

/// Arguments of `create_listing`.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct CreateListingInstructionData {
    pub seed: u64,
    pub name: String,
}

/// Arguments of `buy` and `sell`. The program takes a `u128` amount for both.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapInstructionData {
    pub amount: u128,
}

/// Arguments of `burn_tokens`. Unlike swaps, burns take a `u64` amount.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BurnTokensInstructionData {
    pub amount: u64,
}

/// Packs `args` behind the discriminator of `instruction`.
pub fn pack<T: BorshSerialize>(
    instruction: ListingInstruction,
    args: &T,
) -> borsh::io::Result<Vec<u8>> {
    let mut data = Vec::with_capacity(DISCRIMINATOR_LEN + 32);
    data.extend_from_slice(&instruction.discriminator());
    args.serialize(&mut data)?;
    Ok(data)
}

/// Splits instruction data into its instruction tag and the decoded arguments.
pub fn unpack<T: BorshDeserialize>(data: &[u8]) -> Option<(ListingInstruction, T)> {
    let instruction = ListingInstruction::from_instruction_data(data)?;
    let args = T::try_from_slice(&data[DISCRIMINATOR_LEN..]).ok()?;
    Some((instruction, args))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn instruction_names_match_the_idl() {
        let names: Vec<_> = ListingInstruction::iter().map(|i| i.name()).collect();
        assert_eq!(names, ["create_listing", "buy", "sell", "burn_tokens"]);
        assert_eq!(ListingInstruction::BurnTokens.to_string(), "burn_tokens");
    }

    #[test]
    fn sell_and_burn_are_distinct_instructions() {
        let tags: HashSet<_> = ListingInstruction::iter()
            .map(ListingInstruction::discriminator)
            .collect();
        assert_eq!(tags.len(), 4);
        assert_ne!(
            ListingInstruction::Sell.discriminator(),
            ListingInstruction::BurnTokens.discriminator()
        );
    }

    #[test]
    fn create_listing_layout() {
        let data = pack(
            ListingInstruction::CreateListing,
            &CreateListingInstructionData {
                seed: 7,
                name: "token7".to_string(),
            },
        )
        .unwrap();

        assert_eq!(&data[..8], &instruction_discriminator("create_listing"));
        assert_eq!(&data[8..16], &7u64.to_le_bytes());
        assert_eq!(&data[16..20], &6u32.to_le_bytes());
        assert_eq!(&data[20..], b"token7");
    }

    #[test]
    fn amount_widths() {
        let swap = pack(ListingInstruction::Buy, &SwapInstructionData { amount: 1000 }).unwrap();
        assert_eq!(swap.len(), 8 + 16);
        assert_eq!(&swap[8..], &1000u128.to_le_bytes());

        let burn = pack(
            ListingInstruction::BurnTokens,
            &BurnTokensInstructionData { amount: 1000 },
        )
        .unwrap();
        assert_eq!(burn.len(), 8 + 8);

        let (ixn, args) = unpack::<BurnTokensInstructionData>(&burn).unwrap();
        assert_eq!(ixn, ListingInstruction::BurnTokens);
        assert_eq!(args.amount, 1000);
    }

    #[test]
    fn unknown_tags_are_rejected() {
        assert_eq!(ListingInstruction::from_instruction_data(&[0; 8]), None);
        assert_eq!(ListingInstruction::from_instruction_data(&[1, 2, 3]), None);
    }
}
