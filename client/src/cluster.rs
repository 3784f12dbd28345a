//! Cluster selection: which RPC endpoint to talk to and which program identity lives there.

use std::{
    fmt::Display,
    str::FromStr,
};

use listing_interface::program;
use solana_sdk::pubkey::Pubkey;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Cluster {
    Devnet,
    Testnet,
    Mainnet,
    Localnet,
    /// Any other RPC endpoint, identified by its URL.
    Custom(String),
}

impl Cluster {
    pub fn rpc_url(&self) -> &str {
        match self {
            Self::Devnet => "https://api.devnet.solana.com",
            Self::Testnet => "https://api.testnet.solana.com",
            Self::Mainnet => "https://api.mainnet-beta.solana.com",
            Self::Localnet => "http://localhost:8899",
            Self::Custom(url) => url,
        }
    }

    /// The listing program's address on this cluster. Devnet and testnet run their own
    /// deployment; everything else uses the IDL's address.
    pub fn program_id(&self) -> Pubkey {
        match self {
            Self::Devnet | Self::Testnet => program::DEVNET_ID,
            Self::Mainnet | Self::Localnet | Self::Custom(_) => program::ID,
        }
    }
}

impl Display for Cluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Devnet => write!(f, "devnet"),
            Self::Testnet => write!(f, "testnet"),
            Self::Mainnet => write!(f, "mainnet-beta"),
            Self::Localnet => write!(f, "localnet"),
            Self::Custom(url) => write!(f, "{url}"),
        }
    }
}

impl FromStr for Cluster {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "devnet" | "d" => Ok(Self::Devnet),
            "testnet" | "t" => Ok(Self::Testnet),
            "mainnet" | "mainnet-beta" | "m" => Ok(Self::Mainnet),
            "localnet" | "localhost" | "l" => Ok(Self::Localnet),
            _ if s.starts_with("http://") || s.starts_with("https://") => {
                Ok(Self::Custom(s.to_string()))
            }
            _ => anyhow::bail!("Unknown cluster {s:?}. Pass a cluster name or an RPC URL."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_identity_per_cluster() {
        assert_eq!(Cluster::Devnet.program_id(), Cluster::Testnet.program_id());
        assert_eq!(Cluster::Mainnet.program_id(), program::ID);
        assert_eq!(Cluster::Localnet.program_id(), program::ID);
        assert_ne!(Cluster::Devnet.program_id(), Cluster::Mainnet.program_id());
    }

    #[test]
    fn parse_names_and_urls() -> anyhow::Result<()> {
        assert_eq!("mainnet-beta".parse::<Cluster>()?, Cluster::Mainnet);
        assert_eq!("Devnet".parse::<Cluster>()?, Cluster::Devnet);
        let custom: Cluster = "http://127.0.0.1:8899".parse()?;
        assert_eq!(custom.rpc_url(), "http://127.0.0.1:8899");
        assert_eq!(custom.to_string(), "http://127.0.0.1:8899");
        assert!("moonnet".parse::<Cluster>().is_err());
        Ok(())
    }
}
