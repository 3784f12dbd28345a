//! Sequences a mutation: build, submit and, on success, invalidate and refetch the cache.
//!
//! Only one mutation per listing may be pending at a time. A second call for a listing that
//! is still pending fails with [`MutationError::Busy`] instead of queueing.

use std::sync::Arc;

use dashmap::DashSet;
use solana_sdk::{
    pubkey::Pubkey,
    signature::Signature,
};

use crate::{
    args::{
        CreateListingArgs,
        SwapArgs,
    },
    builder::{
        InstructionBuilder,
        Operation,
        OperationRequest,
    },
    cache::StateCache,
    error::{
        BuildError,
        MutationError,
    },
    logs::{
        log_error,
        log_info,
        log_success,
    },
    signer::WalletSigner,
    transactions::TransactionSubmitter,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationState {
    Idle,
    Pending,
    Succeeded(Signature),
    Failed(MutationError),
}

/// Receives every state a mutation passes through. Validation failures go straight to
/// [`MutationState::Failed`] without a [`MutationState::Pending`] first.
pub trait MutationObserver: Send + Sync {
    fn notify(&self, operation: Operation, state: &MutationState);
}

/// Logs mutation outcomes to the console.
pub struct LoggingObserver;

impl MutationObserver for LoggingObserver {
    fn notify(&self, operation: Operation, state: &MutationState) {
        match state {
            MutationState::Idle => (),
            MutationState::Pending => log_info(operation, "Pending"),
            MutationState::Succeeded(signature) => log_success(operation, signature),
            MutationState::Failed(error) => log_error(operation.failure_message(), error),
        }
    }
}

/// Marks a listing as pending for as long as it's alive.
struct PendingGuard<'a> {
    pending: &'a DashSet<Pubkey>,
    listing: Pubkey,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.listing);
    }
}

pub struct MutationOrchestrator {
    builder: InstructionBuilder,
    submitter: TransactionSubmitter,
    cache: StateCache,
    observer: Arc<dyn MutationObserver>,
    pending: DashSet<Pubkey>,
}

impl MutationOrchestrator {
    pub fn new(
        builder: InstructionBuilder,
        submitter: TransactionSubmitter,
        cache: StateCache,
        observer: Arc<dyn MutationObserver>,
    ) -> Self {
        Self {
            builder,
            submitter,
            cache,
            observer,
            pending: DashSet::new(),
        }
    }

    /// [`MutationState::Pending`] while a mutation of `listing` is in progress, otherwise
    /// [`MutationState::Idle`].
    pub fn state(&self, listing: &Pubkey) -> MutationState {
        if self.pending.contains(listing) {
            MutationState::Pending
        } else {
            MutationState::Idle
        }
    }

    pub async fn create_listing(
        &self,
        signer: &dyn WalletSigner,
        args: &CreateListingArgs,
    ) -> Result<Signature, MutationError> {
        let request = self.builder.create_listing(signer.pubkey(), args);
        self.run(Operation::CreateListing, signer, request).await
    }

    pub async fn buy(
        &self,
        signer: &dyn WalletSigner,
        args: &SwapArgs,
    ) -> Result<Signature, MutationError> {
        let request = self.builder.buy(signer.pubkey(), args);
        self.run(Operation::Buy, signer, request).await
    }

    pub async fn sell(
        &self,
        signer: &dyn WalletSigner,
        args: &SwapArgs,
    ) -> Result<Signature, MutationError> {
        let request = self.builder.sell(signer.pubkey(), args);
        self.run(Operation::Sell, signer, request).await
    }

    pub async fn burn(
        &self,
        signer: &dyn WalletSigner,
        args: &SwapArgs,
    ) -> Result<Signature, MutationError> {
        let request = self.builder.burn(signer.pubkey(), args);
        self.run(Operation::Burn, signer, request).await
    }

    async fn run(
        &self,
        operation: Operation,
        signer: &dyn WalletSigner,
        request: Result<OperationRequest, BuildError>,
    ) -> Result<Signature, MutationError> {
        let request = request.map_err(|e| self.fail(operation, e.into()))?;
        let listing = request.listing();
        let _guard = self
            .acquire(listing)
            .map_err(|e| self.fail(operation, e))?;
        self.observer.notify(operation, &MutationState::Pending);

        let signature = self
            .submitter
            .submit(&request, signer, operation.verification_mode())
            .await
            .map_err(|e| self.fail(operation, e.into()))?;

        self.refresh(listing).await;
        self.observer
            .notify(operation, &MutationState::Succeeded(signature));
        Ok(signature)
    }

    fn acquire(&self, listing: Pubkey) -> Result<PendingGuard<'_>, MutationError> {
        if !self.pending.insert(listing) {
            return Err(MutationError::Busy { listing });
        }
        Ok(PendingGuard {
            pending: &self.pending,
            listing,
        })
    }

    /// Invalidates the mutated listing and the listing index once each, then waits for both to
    /// be refetched. Refetch failures stay in the cache entries.
    async fn refresh(&self, listing: Pubkey) {
        let listing_key = self.cache.listing_key(listing);
        let all_key = self.cache.all_listings_key();
        self.cache.invalidate(&listing_key);
        self.cache.invalidate(&all_key);
        let _ = tokio::join!(
            self.cache.refetch(&listing_key),
            self.cache.refetch(&all_key)
        );
    }

    fn fail(&self, operation: Operation, error: MutationError) -> MutationError {
        self.observer
            .notify(operation, &MutationState::Failed(error.clone()));
        error
    }
}
