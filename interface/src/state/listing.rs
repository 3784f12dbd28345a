//! The program's `Listing` account.

use std::{
    fmt::Display,
    sync::LazyLock,
};

use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use static_assertions::const_assert_eq;

use crate::discriminator::{
    account_discriminator,
    Discriminator,
    DISCRIMINATOR_LEN,
};

/// The program allocates room for names of at most this many bytes.
pub const LISTING_MAX_NAME_LEN: usize = 32;

/// The allocated size of the account's borsh payload, i.e. Anchor's `INIT_SPACE`.
pub const LISTING_INIT_SPACE: usize = (4 + LISTING_MAX_NAME_LEN) // name
    + 8 // seed
    + 32 // mint
    + 8 // funding_goal
    + 16 // pool_mint_supply
    + 8 // funding_raised
    + 16 // available_tokens
    + 8 // base_price
    + 16 // tokens_sold
    + 3; // bump, vault_bump, mint_bump

/// The full size of a listing account, discriminator included.
pub const LISTING_ACCOUNT_LEN: usize = DISCRIMINATOR_LEN + LISTING_INIT_SPACE;

const_assert_eq!(LISTING_ACCOUNT_LEN, 159);

pub static LISTING_ACCOUNT_DISCRIMINATOR: LazyLock<Discriminator> =
    LazyLock::new(|| account_discriminator("Listing"));

/// A listing record exactly as the program stores it.
///
/// Only `name`, `seed` and `mint` carry meaning for the client; the remaining fields are the
/// program's own accounting state and are surfaced as-is.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct Listing {
    pub name: String,
    pub seed: u64,
    pub mint: [u8; 32],
    pub funding_goal: u64,
    pub pool_mint_supply: u128,
    pub funding_raised: u64,
    pub available_tokens: u128,
    pub base_price: f64,
    pub tokens_sold: u128,
    pub bump: u8,
    pub vault_bump: u8,
    pub mint_bump: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListingDecodeError {
    InsufficientByteLength,
    InvalidAccountDiscriminant,
    InvalidData(String),
}

impl Display for ListingDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientByteLength => write!(f, "Listing account data is too short"),
            Self::InvalidAccountDiscriminant => write!(f, "Account isn't a listing account"),
            Self::InvalidData(e) => write!(f, "Listing account data is malformed: {e}"),
        }
    }
}

impl std::error::Error for ListingDecodeError {}

impl Listing {
    /// Decodes a listing from raw account data.
    ///
    /// The account is allocated for the longest possible name, so shorter names leave zeroed
    /// trailing bytes that are ignored here.
    pub fn try_from_account_data(data: &[u8]) -> Result<Self, ListingDecodeError> {
        if data.len() < DISCRIMINATOR_LEN {
            return Err(ListingDecodeError::InsufficientByteLength);
        }
        let (discriminator, mut payload) = data.split_at(DISCRIMINATOR_LEN);
        if discriminator != LISTING_ACCOUNT_DISCRIMINATOR.as_slice() {
            return Err(ListingDecodeError::InvalidAccountDiscriminant);
        }

        Self::deserialize(&mut payload).map_err(|e| ListingDecodeError::InvalidData(e.to_string()))
    }

    /// Encodes the listing into a zero-padded account buffer of [`LISTING_ACCOUNT_LEN`] bytes.
    pub fn to_account_data(&self) -> borsh::io::Result<Vec<u8>> {
        let mut data = Vec::with_capacity(LISTING_ACCOUNT_LEN);
        data.extend_from_slice(LISTING_ACCOUNT_DISCRIMINATOR.as_slice());
        self.serialize(&mut data)?;
        if data.len() < LISTING_ACCOUNT_LEN {
            data.resize(LISTING_ACCOUNT_LEN, 0);
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(name: &str) -> Listing {
        Listing {
            name: name.to_string(),
            seed: 42,
            mint: [7; 32],
            funding_goal: 350,
            pool_mint_supply: 0,
            funding_raised: 800_000,
            available_tokens: 200_000,
            base_price: 0.001,
            tokens_sold: 0,
            bump: 255,
            vault_bump: 254,
            mint_bump: 253,
        }
    }

    #[test]
    fn padded_account_data_decodes() {
        let expected = listing("token42");
        let data = expected.to_account_data().unwrap();
        assert_eq!(data.len(), LISTING_ACCOUNT_LEN);
        assert_eq!(Listing::try_from_account_data(&data).unwrap(), expected);
    }

    #[test]
    fn longest_name_fills_the_account() {
        let expected = listing(&"x".repeat(LISTING_MAX_NAME_LEN));
        let data = expected.to_account_data().unwrap();
        assert_eq!(data.len(), LISTING_ACCOUNT_LEN);
        assert_eq!(Listing::try_from_account_data(&data).unwrap(), expected);
    }

    #[test]
    fn foreign_accounts_are_rejected() {
        let mut data = listing("a").to_account_data().unwrap();
        data[0] ^= 0xff;
        assert_eq!(
            Listing::try_from_account_data(&data),
            Err(ListingDecodeError::InvalidAccountDiscriminant)
        );
        assert_eq!(
            Listing::try_from_account_data(&[0; 4]),
            Err(ListingDecodeError::InsufficientByteLength)
        );
        assert!(matches!(
            Listing::try_from_account_data(&data[..12]),
            Err(ListingDecodeError::InvalidAccountDiscriminant)
        ));
    }

    #[test]
    fn truncated_payload_is_invalid() {
        let data = listing("abc").to_account_data().unwrap();
        assert!(matches!(
            Listing::try_from_account_data(&data[..20]),
            Err(ListingDecodeError::InvalidData(_))
        ));
    }
}
