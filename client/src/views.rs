//! Client-side views of decoded listing accounts.

use listing_interface::state::{
    curve,
    Listing,
    ListingDecodeError,
};
use solana_sdk::pubkey::Pubkey;

#[derive(Clone, Debug, PartialEq)]
pub struct ListingView {
    pub address: Pubkey,
    pub name: String,
    pub seed: u64,
    pub mint: Pubkey,
    pub funding_goal: u64,
    pub pool_mint_supply: u128,
    pub funding_raised: u64,
    pub available_tokens: u128,
    pub base_price: f64,
    pub tokens_sold: u128,
}

impl From<(Pubkey, Listing)> for ListingView {
    fn from((address, listing): (Pubkey, Listing)) -> Self {
        Self {
            address,
            name: listing.name,
            seed: listing.seed,
            mint: Pubkey::new_from_array(listing.mint),
            funding_goal: listing.funding_goal,
            pool_mint_supply: listing.pool_mint_supply,
            funding_raised: listing.funding_raised,
            available_tokens: listing.available_tokens,
            base_price: listing.base_price,
            tokens_sold: listing.tokens_sold,
        }
    }
}

impl ListingView {
    /// Price of `amount` base units on the listing's bonding curve, at its current supply.
    pub fn quote(&self, amount: u128) -> f64 {
        curve::quote(amount, self.available_tokens, self.base_price)
    }
}

pub fn try_listing_view_from_owner_and_data(
    address: Pubkey,
    owner: &Pubkey,
    program_id: &Pubkey,
    data: &[u8],
) -> Result<ListingView, ListingDecodeError> {
    if owner != program_id {
        return Err(ListingDecodeError::InvalidData(format!(
            "owned by {owner}, not {program_id}"
        )));
    }
    Listing::try_from_account_data(data).map(|listing| (address, listing).into())
}
