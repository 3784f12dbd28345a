//! Program ids the listing program and its instructions reference.

use solana_sdk::pubkey::Pubkey;

/// The listing program id declared in its IDL. Deployed on mainnet and used by default locally.
pub const ID: Pubkey = Pubkey::from_str_const("FqzkXZdwYjurnUKetJCAvaUw5WAqbwzU6gZEwydeEfqS");
/// The listing program id deployed to devnet and testnet.
pub const DEVNET_ID: Pubkey =
    Pubkey::from_str_const("5ENQgn6CTuDUxEyntSuuALPQBkJj9Fd917kyL3Kbwccc");

/// The SPL Token program id.
pub const SPL_TOKEN_ID: Pubkey =
    Pubkey::from_str_const("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
/// The SPL Associated Token Account program id.
pub const SPL_ASSOCIATED_TOKEN_ACCOUNT_ID: Pubkey =
    Pubkey::from_str_const("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");
/// The System program id.
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::from_str_const("11111111111111111111111111111111");
