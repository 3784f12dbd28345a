//! Command line arguments. Every global option falls back to a `LISTING_*` environment variable.

use std::path::{
    Path,
    PathBuf,
};

use anyhow::Context;
use clap::{
    Args,
    Parser,
    Subcommand,
};
use client::cluster::Cluster;
use solana_sdk::{
    pubkey::Pubkey,
    signature::Keypair,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Create and trade listings on the listing marketplace program", long_about = None)]
pub struct Cli {
    /// Cluster name (devnet, testnet, mainnet, localnet) or an RPC URL.
    #[arg(short, long, env = "LISTING_CLUSTER", default_value = "localnet")]
    pub cluster: Cluster,

    /// RPC endpoint, overriding the cluster's default.
    #[arg(short, long, env = "LISTING_RPC_URL")]
    pub url: Option<String>,

    /// Listing program id, overriding the cluster's default.
    #[arg(short, long, env = "LISTING_PROGRAM_ID")]
    pub program_id: Option<Pubkey>,

    /// Path to a JSON keypair file, as written by `solana-keygen`.
    #[arg(short, long, env = "LISTING_KEYPAIR")]
    pub keypair: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the addresses derived from a seed
    Derive {
        #[arg(short, long, allow_negative_numbers = true)]
        seed: i128,
    },
    /// Create a listing and mint its supply into the listing's vault
    Create {
        #[arg(short, long, allow_negative_numbers = true)]
        seed: i128,
        #[arg(short, long)]
        name: String,
    },
    /// Buy tokens from a listing's vault
    Buy(SwapCommand),
    /// Sell tokens back to a listing's vault
    Sell(SwapCommand),
    /// Burn tokens held in your token account
    Burn(SwapCommand),
    /// List every listing of the program
    List,
    /// Show one listing, and your balance when a keypair is set
    Show {
        #[arg(short, long, allow_negative_numbers = true)]
        seed: i128,
    },
    /// Check that the program is deployed
    Status,
}

#[derive(Args, Debug)]
pub struct SwapCommand {
    #[arg(short, long, allow_negative_numbers = true)]
    pub seed: i128,
    /// Amount in base units of the listing's mint.
    #[arg(short, long, allow_negative_numbers = true)]
    pub amount: i128,
    /// The listing's mint. Defaults to the mint derived from the seed.
    #[arg(short, long)]
    pub mint: Option<String>,
}

impl Cli {
    pub fn load_keypair(&self) -> anyhow::Result<Keypair> {
        let path = self
            .keypair
            .as_deref()
            .context("This command signs a transaction. Pass --keypair or set LISTING_KEYPAIR.")?;
        read_keypair(path)
    }
}

pub fn read_keypair(path: &Path) -> anyhow::Result<Keypair> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Couldn't read keypair file {}", path.display()))?;
    let bytes: Vec<u8> = serde_json::from_str(&contents)
        .with_context(|| format!("{} isn't a JSON keypair file", path.display()))?;
    Keypair::try_from(bytes.as_slice())
        .with_context(|| format!("{} doesn't hold a valid keypair", path.display()))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use solana_sdk::signer::Signer;

    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn negative_seeds_reach_validation() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["listing-cli", "buy", "--seed", "-1", "--amount", "5"])?;
        let Command::Buy(swap) = cli.command else {
            panic!("Expected a buy, got {:?}", cli.command);
        };
        assert_eq!(swap.seed, -1);
        assert_eq!(swap.amount, 5);
        assert_eq!(swap.mint, None);
        Ok(())
    }

    #[test]
    fn keypair_files_round_trip() -> anyhow::Result<()> {
        let keypair = Keypair::new();
        let path = std::env::temp_dir().join(format!("listing-cli-{}.json", keypair.pubkey()));
        std::fs::write(&path, serde_json::to_string(&keypair.to_bytes().to_vec())?)?;
        let read = read_keypair(&path);
        std::fs::remove_file(&path)?;
        assert_eq!(read?.pubkey(), keypair.pubkey());
        Ok(())
    }
}
