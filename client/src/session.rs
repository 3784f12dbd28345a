//! A session wires one cluster's builder, cache and orchestrator together around a single
//! backend. Construct it once and hand it to whatever needs ledger access.

use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;

use crate::{
    builder::InstructionBuilder,
    cache::StateCache,
    cluster::Cluster,
    ledger::LedgerConnection,
    orchestrator::{
        LoggingObserver,
        MutationObserver,
        MutationOrchestrator,
    },
    transactions::{
        Broadcaster,
        CustomRpcClient,
        SendTransactionConfig,
        TransactionSubmitter,
    },
};

pub struct Session {
    pub cluster: Cluster,
    pub program_id: Pubkey,
    pub builder: InstructionBuilder,
    pub cache: StateCache,
    pub orchestrator: MutationOrchestrator,
    pub ledger: Arc<dyn LedgerConnection>,
}

pub struct SessionBuilder {
    cluster: Cluster,
    program_id: Option<Pubkey>,
    rpc_url: Option<String>,
    config: SendTransactionConfig,
    observer: Arc<dyn MutationObserver>,
}

impl Session {
    pub fn builder(cluster: Cluster) -> SessionBuilder {
        SessionBuilder {
            cluster,
            program_id: None,
            rpc_url: None,
            config: SendTransactionConfig::default(),
            observer: Arc::new(LoggingObserver),
        }
    }
}

impl SessionBuilder {
    /// Overrides the cluster's default program id.
    pub fn program_id(mut self, program_id: Pubkey) -> Self {
        self.program_id = Some(program_id);
        self
    }

    /// Overrides the cluster's default RPC endpoint.
    pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = Some(url.into());
        self
    }

    pub fn config(mut self, config: SendTransactionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn MutationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Connects to the cluster over JSON RPC.
    pub fn connect(self) -> Session {
        let url = self
            .rpc_url
            .clone()
            .unwrap_or_else(|| self.cluster.rpc_url().to_string());
        let rpc = Arc::new(CustomRpcClient::new(url, self.config.commitment));
        self.with_backend(rpc)
    }

    /// Uses `backend` for both reads and submissions.
    pub fn with_backend<B>(self, backend: Arc<B>) -> Session
    where
        B: Broadcaster + LedgerConnection + 'static,
    {
        let program_id = self.program_id.unwrap_or_else(|| self.cluster.program_id());
        let builder = InstructionBuilder::new(program_id);
        let ledger: Arc<dyn LedgerConnection> = backend.clone();
        let cache = StateCache::new(self.cluster.clone(), program_id, ledger.clone());
        let submitter = TransactionSubmitter::new(backend, self.config);
        let orchestrator =
            MutationOrchestrator::new(builder, submitter, cache.clone(), self.observer);

        Session {
            cluster: self.cluster,
            program_id,
            builder,
            cache,
            orchestrator,
            ledger,
        }
    }
}
