//! On-chain interface of the listing marketplace program.
//!
//! Everything a client needs to talk to the program byte-for-byte: program ids, PDA seed tags,
//! Anchor discriminators, instruction data layouts, the `Listing` account layout and the
//! program's custom error codes.

use static_assertions::const_assert_eq;

pub mod discriminator;
pub mod error;
pub mod instructions;
pub mod program;
pub mod state;

/// PDA seed tag for a listing account.
pub const LISTING_SEED: &[u8] = b"listing";
/// PDA seed tag for a listing's mint.
pub const MINT_SEED: &[u8] = b"mint";
/// PDA seed tag for a listing's SOL escrow vault.
pub const VAULT_SEED: &[u8] = b"vault";

/// Listing seeds are always encoded as 8 little-endian bytes.
pub const SEED_LEN: usize = 8;

const_assert_eq!(SEED_LEN, core::mem::size_of::<u64>());

/// Encodes a listing seed the way the program does in its PDA seeds.
#[inline(always)]
pub fn seed_bytes(seed: u64) -> [u8; SEED_LEN] {
    seed.to_le_bytes()
}
