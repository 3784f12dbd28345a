//! Caller-supplied arguments and their validation.
//!
//! Raw arguments arrive as loosely-typed values (signed integers, strings) the way a form or a
//! command line hands them over. Everything is checked here, before any address is derived or any
//! request touches the network.

use std::{
    fmt::Display,
    str::FromStr,
};

use listing_interface::state::LISTING_MAX_NAME_LEN;
use solana_sdk::pubkey::Pubkey;

use crate::error::ValidationError;

/// A listing seed, guaranteed to fit the program's `u64`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Seed(u64);

impl Seed {
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub fn to_le_bytes(self) -> [u8; 8] {
        listing_interface::seed_bytes(self.0)
    }
}

impl TryFrom<i128> for Seed {
    type Error = ValidationError;

    fn try_from(value: i128) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| ValidationError::SeedOutOfRange(value))
    }
}

impl FromStr for Seed {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_integer("seed", s).and_then(Self::try_from)
    }
}

impl Display for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A strictly positive token amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Amount(u128);

impl Amount {
    pub fn get(self) -> u128 {
        self.0
    }

    /// Narrows the amount for instructions that take a `u64`.
    pub fn to_u64(self) -> Result<u64, ValidationError> {
        u64::try_from(self.0).map_err(|_| ValidationError::AmountOutOfRange {
            amount: self.0,
            max: u64::MAX as u128,
        })
    }
}

impl TryFrom<i128> for Amount {
    type Error = ValidationError;

    fn try_from(value: i128) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(ValidationError::NonPositiveAmount(value));
        }
        Ok(Self(value as u128))
    }
}

impl FromStr for Amount {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_integer("amount", s).and_then(Self::try_from)
    }
}

/// A non-empty listing name that fits the program's account allocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListingName(String);

impl ListingName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ListingName {
    type Error = ValidationError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if name.len() > LISTING_MAX_NAME_LEN {
            return Err(ValidationError::NameTooLong {
                len: name.len(),
                max: LISTING_MAX_NAME_LEN,
            });
        }
        Ok(Self(name))
    }
}

impl TryFrom<&str> for ListingName {
    type Error = ValidationError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        Self::try_from(name.to_string())
    }
}

pub fn parse_address(address: &str) -> Result<Pubkey, ValidationError> {
    Pubkey::from_str(address.trim())
        .map_err(|_| ValidationError::InvalidAddress(address.to_string()))
}

fn parse_integer(field: &'static str, value: &str) -> Result<i128, ValidationError> {
    value
        .trim()
        .parse::<i128>()
        .map_err(|_| ValidationError::NotAnInteger {
            field,
            value: value.to_string(),
        })
}

/// Raw arguments of a create listing request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateListingArgs {
    pub seed: i128,
    pub name: String,
}

/// Raw arguments of a buy, sell or burn request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapArgs {
    pub seed: i128,
    pub amount: i128,
    /// The listing's mint, as an encoded address.
    pub mint: String,
}

impl CreateListingArgs {
    pub fn new(seed: i128, name: impl Into<String>) -> Self {
        Self {
            seed,
            name: name.into(),
        }
    }

    pub fn validate(&self) -> Result<(Seed, ListingName), ValidationError> {
        let seed = Seed::try_from(self.seed)?;
        let name = ListingName::try_from(self.name.as_str())?;
        Ok((seed, name))
    }
}

impl SwapArgs {
    pub fn new(seed: i128, amount: i128, mint: impl Display) -> Self {
        Self {
            seed,
            amount,
            mint: mint.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(Seed, Amount, Pubkey), ValidationError> {
        let seed = Seed::try_from(self.seed)?;
        let amount = Amount::try_from(self.amount)?;
        let mint = parse_address(&self.mint)?;
        Ok((seed, amount, mint))
    }
}
