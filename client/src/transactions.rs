//! Transaction submission: sign a built request, hand it to the network and wait for it to
//! confirm.
//!
//! [`TransactionSubmitter`] does one round trip per call and never retries. The network side is
//! behind the [`Broadcaster`] trait; [`CustomRpcClient`] implements it over JSON RPC.

use std::{
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use colored::Colorize;
use listing_interface::discriminator::Discriminator;
use solana_client::{
    client_error::{
        ClientError,
        ClientErrorKind,
    },
    nonblocking::rpc_client::RpcClient,
    rpc_config::{
        RpcAccountInfoConfig,
        RpcProgramAccountsConfig,
        RpcSendTransactionConfig,
        UiAccountEncoding,
    },
    rpc_filter::{
        Memcmp,
        RpcFilterType,
    },
    rpc_request::{
        RpcError::RpcResponseError,
        RpcResponseErrorData,
    },
};
use solana_commitment_config::CommitmentConfig;
use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::Message,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};

use crate::{
    builder::OperationRequest,
    error::{
        SubmissionError,
        SubmissionErrorKind,
    },
    ledger::{
        AccountData,
        LedgerConnection,
    },
    logs::{
        log_info,
        log_warning,
        LogColor,
    },
    pretty::instruction_error::PrettyInstructionError,
    signer::WalletSigner,
};

/// How a transaction is handed to the network.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum VerificationMode {
    /// The transaction is simulated before it's sent. A failing simulation is reported as
    /// [`SubmissionErrorKind::Simulation`] and nothing is broadcast.
    #[default]
    Verified,
    /// Preflight simulation is skipped. Failures only surface after the transaction lands, as
    /// [`SubmissionErrorKind::Broadcast`], and the fee is spent either way.
    Unverified,
}

impl VerificationMode {
    pub fn skip_preflight(self) -> bool {
        matches!(self, Self::Unverified)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendTransactionConfig {
    /// Prepends compute budget instructions when set.
    pub compute_budget: Option<u32>,
    pub debug_logs: Option<bool>,
    /// How long to wait for confirmation before giving up with
    /// [`SubmissionErrorKind::ConfirmationTimeout`].
    pub confirm_timeout: Duration,
    pub poll_interval: Duration,
    pub commitment: CommitmentConfig,
}

impl Default for SendTransactionConfig {
    fn default() -> Self {
        SendTransactionConfig {
            compute_budget: Default::default(),
            debug_logs: Some(true),
            confirm_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
            commitment: CommitmentConfig::confirmed(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignatureStatus {
    /// Not yet seen at the requested commitment.
    Pending,
    Confirmed,
    /// Landed, but the transaction failed.
    Failed(String),
}

/// The network side of a submission.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn latest_blockhash(&self) -> Result<Hash, SubmissionError>;

    async fn send_transaction(
        &self,
        transaction: &Transaction,
        mode: VerificationMode,
    ) -> Result<Signature, SubmissionError>;

    async fn signature_status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> anyhow::Result<SignatureStatus>;
}

#[derive(Clone)]
pub struct TransactionSubmitter {
    broadcaster: Arc<dyn Broadcaster>,
    config: SendTransactionConfig,
}

impl TransactionSubmitter {
    pub fn new(broadcaster: Arc<dyn Broadcaster>, config: SendTransactionConfig) -> Self {
        Self {
            broadcaster,
            config,
        }
    }

    pub fn config(&self) -> &SendTransactionConfig {
        &self.config
    }

    /// Signs, sends and confirms `request`. Outcomes are reported by the caller. With
    /// `debug_logs` on, only the sent signature is logged.
    ///
    /// Once a transaction has been sent it can't be recalled: errors returned after that point
    /// carry its signature, and a [`SubmissionErrorKind::ConfirmationTimeout`] transaction may
    /// still land.
    pub async fn submit(
        &self,
        request: &OperationRequest,
        signer: &dyn WalletSigner,
        mode: VerificationMode,
    ) -> Result<Signature, SubmissionError> {
        if signer.pubkey() != request.signer {
            return Err(SubmissionError::rejected(format!(
                "Signer {} can't sign for {}",
                signer.pubkey(),
                request.signer
            )));
        }

        let msg = Message::new(
            &self.with_compute_budget(&request.instruction),
            Some(&request.signer),
        );
        let mut tx = Transaction::new_unsigned(msg);
        let bh = self.broadcaster.latest_blockhash().await?;
        signer.sign_transaction(&mut tx, bh).await?;

        let signature = self.broadcaster.send_transaction(&tx, mode).await?;
        if matches!(self.config.debug_logs, Some(true)) {
            let sender_info = format!("{}: {}", "sender".color(LogColor::Gray), request.signer);
            log_info(
                format!("Sent {}", request.operation),
                format!("{signature}\n{sender_info}"),
            );
        }
        self.confirm(signature).await
    }

    fn with_compute_budget(&self, instruction: &Instruction) -> Vec<Instruction> {
        [
            self.config.compute_budget.map_or(vec![], |budget| {
                vec![
                    ComputeBudgetInstruction::set_compute_unit_limit(budget),
                    ComputeBudgetInstruction::set_compute_unit_price(1),
                ]
            }),
            vec![instruction.clone()],
        ]
        .concat()
    }

    /// Polls the signature status until it settles or the confirmation timeout elapses. Failed
    /// status reads are retried until then.
    async fn confirm(&self, signature: Signature) -> Result<Signature, SubmissionError> {
        let poll = async {
            loop {
                match self
                    .broadcaster
                    .signature_status(&signature, self.config.commitment)
                    .await
                {
                    Ok(SignatureStatus::Confirmed) => return Ok(signature),
                    Ok(SignatureStatus::Failed(reason)) => {
                        return Err(SubmissionError::broadcast(reason).with_signature(signature))
                    }
                    Ok(SignatureStatus::Pending) => (),
                    Err(e) => log_warning("Signature status", format!("{signature}: {e:#}")),
                }
                tokio::time::sleep(self.config.poll_interval).await;
            }
        };

        tokio::time::timeout(self.config.confirm_timeout, poll)
            .await
            .unwrap_or_else(|_| {
                Err(SubmissionError::new(
                    SubmissionErrorKind::ConfirmationTimeout,
                    format!(
                        "Not confirmed within {:?}, it may still land",
                        self.config.confirm_timeout
                    ),
                )
                .with_signature(signature))
            })
    }
}

/// The JSON RPC backed [`Broadcaster`] and [`LedgerConnection`].
pub struct CustomRpcClient {
    pub client: RpcClient,
}

impl CustomRpcClient {
    pub fn new(url: impl Into<String>, commitment: CommitmentConfig) -> Self {
        Self {
            client: RpcClient::new_with_commitment(url.into(), commitment),
        }
    }
}

impl Default for CustomRpcClient {
    fn default() -> Self {
        Self::new("http://localhost:8899", CommitmentConfig::confirmed())
    }
}

/// Preflight failures become [`SubmissionErrorKind::Simulation`] errors with the failing
/// instruction decoded when possible. Everything else is a [`SubmissionErrorKind::Broadcast`].
pub fn classify_send_error(error: &ClientError, message: &Message) -> SubmissionError {
    match error.kind() {
        ClientErrorKind::RpcError(RpcResponseError {
            data: RpcResponseErrorData::SendTransactionPreflightFailure(_),
            ..
        }) => match PrettyInstructionError::new(error, message) {
            Some(pretty) => SubmissionError::simulation(pretty.to_string()),
            None => SubmissionError::simulation(error.to_string()),
        },
        _ => SubmissionError::broadcast(error.to_string()),
    }
}

#[async_trait]
impl Broadcaster for CustomRpcClient {
    async fn latest_blockhash(&self) -> Result<Hash, SubmissionError> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(|e| SubmissionError::broadcast(format!("Couldn't get a blockhash: {e}")))
    }

    async fn send_transaction(
        &self,
        transaction: &Transaction,
        mode: VerificationMode,
    ) -> Result<Signature, SubmissionError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: mode.skip_preflight(),
            preflight_commitment: Some(self.client.commitment().commitment),
            ..Default::default()
        };
        self.client
            .send_transaction_with_config(transaction, config)
            .await
            .map_err(|e| classify_send_error(&e, &transaction.message))
    }

    async fn signature_status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> anyhow::Result<SignatureStatus> {
        let status = self
            .client
            .get_signature_status_with_commitment(signature, commitment)
            .await?;

        let res = match status {
            None => SignatureStatus::Pending,
            Some(Ok(())) => SignatureStatus::Confirmed,
            Some(Err(error)) => SignatureStatus::Failed(error.to_string()),
        };

        Ok(res)
    }
}

#[async_trait]
impl LedgerConnection for CustomRpcClient {
    async fn account_data(&self, address: &Pubkey) -> anyhow::Result<Option<AccountData>> {
        let account = self
            .client
            .get_account_with_commitment(address, self.client.commitment())
            .await?
            .value;

        Ok(account.map(|account| AccountData {
            owner: account.owner,
            data: account.data,
            executable: account.executable,
        }))
    }

    async fn program_accounts(
        &self,
        program_id: &Pubkey,
        discriminator: &Discriminator,
    ) -> anyhow::Result<Vec<(Pubkey, AccountData)>> {
        let config = RpcProgramAccountsConfig {
            filters: Some(vec![RpcFilterType::Memcmp(Memcmp::new_raw_bytes(
                0,
                discriminator.to_vec(),
            ))]),
            account_config: RpcAccountInfoConfig {
                commitment: Some(self.client.commitment()),
                encoding: Some(UiAccountEncoding::Base64),
                data_slice: None,
                min_context_slot: None,
            },
            ..Default::default()
        };

        let accounts = self
            .client
            .get_program_accounts_with_config(program_id, config)
            .await?;

        Ok(accounts
            .into_iter()
            .map(|(address, account)| {
                (
                    address,
                    AccountData {
                        owner: account.owner,
                        data: account.data,
                        executable: account.executable,
                    },
                )
            })
            .collect())
    }
}
