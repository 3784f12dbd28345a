//! The wallet capability: something that can sign a transaction on the user's behalf, or refuse.

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
    transaction::Transaction,
};

use crate::error::SubmissionError;

#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    /// Signs `transaction` against `recent_blockhash`. A refusal is a
    /// [`SubmissionErrorKind::Rejected`](crate::error::SubmissionErrorKind::Rejected) error.
    async fn sign_transaction(
        &self,
        transaction: &mut Transaction,
        recent_blockhash: Hash,
    ) -> Result<(), SubmissionError>;
}

#[async_trait]
impl WalletSigner for Keypair {
    fn pubkey(&self) -> Pubkey {
        Signer::pubkey(self)
    }

    async fn sign_transaction(
        &self,
        transaction: &mut Transaction,
        recent_blockhash: Hash,
    ) -> Result<(), SubmissionError> {
        transaction
            .try_sign(&[self], recent_blockhash)
            .map_err(|e| SubmissionError::rejected(e.to_string()))
    }
}
