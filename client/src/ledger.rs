//! Read access to the ledger: single accounts by address and all accounts of a program that
//! start with a given discriminator.

use async_trait::async_trait;
use listing_interface::discriminator::Discriminator;
use solana_sdk::pubkey::Pubkey;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountData {
    pub owner: Pubkey,
    pub data: Vec<u8>,
    pub executable: bool,
}

#[async_trait]
pub trait LedgerConnection: Send + Sync {
    /// Fetches one account. `Ok(None)` means the account doesn't exist.
    async fn account_data(&self, address: &Pubkey) -> anyhow::Result<Option<AccountData>>;

    /// Fetches every account owned by `program_id` whose data starts with `discriminator`.
    async fn program_accounts(
        &self,
        program_id: &Pubkey,
        discriminator: &Discriminator,
    ) -> anyhow::Result<Vec<(Pubkey, AccountData)>>;

    /// Whether `program_id` is deployed as an executable account.
    async fn program_account_exists(&self, program_id: &Pubkey) -> anyhow::Result<bool> {
        Ok(self
            .account_data(program_id)
            .await?
            .is_some_and(|account| account.executable))
    }
}
