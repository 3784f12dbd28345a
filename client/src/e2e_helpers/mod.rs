//! An in-memory ledger standing in for a validator running the listing program.
//!
//! [`MockLedger`] implements both [`Broadcaster`] and [`LedgerConnection`]. It executes listing
//! instructions with the program's account checks and token movements, keeps signature statuses
//! and counts every call made to it. Lamport balances aren't modeled.

use std::{
    collections::HashMap,
    sync::{
        atomic::{
            AtomicU64,
            Ordering,
        },
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use listing_interface::{
    discriminator::Discriminator,
    instructions::{
        accounts::{
            CreateListingAccounts,
            ProgramAccounts,
            SwapAccounts,
        },
        unpack,
        BurnTokensInstructionData,
        CreateListingInstructionData,
        ListingInstruction,
        SwapInstructionData,
    },
    state::{
        curve::TOKEN_UNITS_PER_WHOLE,
        Listing,
        LISTING_MAX_NAME_LEN,
    },
};
use parking_lot::Mutex;
use solana_commitment_config::CommitmentConfig;
use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_instruction_error::InstructionError;
use solana_sdk::{
    hash::Hash,
    message::Message,
    program_pack::Pack,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};
use solana_transaction_error::TransactionError;
use spl_token_interface::state::{
    Account as TokenAccount,
    AccountState,
};

use crate::{
    args::Seed,
    cluster::Cluster,
    error::SubmissionError,
    ledger::{
        AccountData,
        LedgerConnection,
    },
    orchestrator::{
        LoggingObserver,
        MutationObserver,
    },
    pda::AddressDeriver,
    pretty::instruction_error::PrettyInstructionError,
    session::Session,
    signer::WalletSigner,
    transactions::{
        Broadcaster,
        SendTransactionConfig,
        SignatureStatus,
        VerificationMode,
    },
};

pub const BPF_LOADER_UPGRADEABLE_ID: Pubkey =
    Pubkey::from_str_const("BPFLoaderUpgradeab1e11111111111111111111111");

/// Listing defaults the program writes on creation.
pub const INITIAL_FUNDING_GOAL: u64 = 350;
pub const INITIAL_FUNDING_RAISED: u64 = 800_000;
pub const INITIAL_AVAILABLE_TOKENS: u128 = 200_000;
pub const INITIAL_BASE_PRICE: f64 = 0.001;

/// System program `AccountAlreadyInUse`.
const ACCOUNT_ALREADY_IN_USE: u32 = 0;
/// SPL token `InsufficientFunds`.
const INSUFFICIENT_FUNDS: u32 = 1;
/// Anchor `ConstraintSeeds`.
const CONSTRAINT_SEEDS: u32 = 2006;
/// Anchor `AccountNotInitialized`.
const ACCOUNT_NOT_INITIALIZED: u32 = 3012;
/// Anchor `AccountDidNotSerialize`.
const ACCOUNT_DID_NOT_SERIALIZE: u32 = 3004;

#[derive(Default, Debug)]
pub struct CallCounters {
    pub blockhashes: AtomicU64,
    pub sends: AtomicU64,
    pub status_reads: AtomicU64,
    pub account_reads: AtomicU64,
    pub program_account_reads: AtomicU64,
}

impl CallCounters {
    pub fn reads(&self) -> u64 {
        self.account_reads.load(Ordering::SeqCst) + self.program_account_reads.load(Ordering::SeqCst)
    }

    /// Every call made to the ledger, reads and writes alike.
    pub fn network_calls(&self) -> u64 {
        self.reads()
            + self.blockhashes.load(Ordering::SeqCst)
            + self.sends.load(Ordering::SeqCst)
            + self.status_reads.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug)]
struct TokenHolding {
    mint: Pubkey,
    owner: Pubkey,
    amount: u64,
}

/// Ledger contents. Transactions run against a copy that's committed only if every instruction
/// succeeds.
#[derive(Clone, Debug, Default)]
struct Bank {
    accounts: HashMap<Pubkey, AccountData>,
    tokens: HashMap<Pubkey, TokenHolding>,
}

#[derive(Default)]
struct Knobs {
    fail_next_send: Option<SubmissionError>,
    withhold_confirmations: bool,
    fail_reads: bool,
    read_delay: Option<Duration>,
}

pub struct MockLedger {
    program_id: Pubkey,
    deriver: AddressDeriver,
    programs: ProgramAccounts,
    compute_budget_program: Pubkey,
    bank: Mutex<Bank>,
    statuses: Mutex<HashMap<Signature, SignatureStatus>>,
    knobs: Mutex<Knobs>,
    pub counters: CallCounters,
}

impl MockLedger {
    /// A ledger with the listing program deployed at `program_id`.
    pub fn new(program_id: Pubkey) -> Arc<Self> {
        let mut bank = Bank::default();
        bank.accounts.insert(
            program_id,
            AccountData {
                owner: BPF_LOADER_UPGRADEABLE_ID,
                data: vec![],
                executable: true,
            },
        );

        Arc::new(Self {
            program_id,
            deriver: AddressDeriver::new(program_id),
            programs: ProgramAccounts::default(),
            compute_budget_program: ComputeBudgetInstruction::set_compute_unit_limit(0).program_id,
            bank: Mutex::new(bank),
            statuses: Mutex::new(HashMap::new()),
            knobs: Mutex::new(Knobs::default()),
            counters: CallCounters::default(),
        })
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// The next send fails with `error` before anything executes.
    pub fn fail_next_send(&self, error: SubmissionError) {
        self.knobs.lock().fail_next_send = Some(error);
    }

    /// Sent transactions still execute but their status stays pending.
    pub fn withhold_confirmations(&self, withhold: bool) {
        self.knobs.lock().withhold_confirmations = withhold;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.knobs.lock().fail_reads = fail;
    }

    /// Delays every account read, so concurrent reads overlap.
    pub fn set_read_delay(&self, delay: Option<Duration>) {
        self.knobs.lock().read_delay = delay;
    }

    pub fn insert_account(&self, address: Pubkey, account: AccountData) {
        self.bank.lock().accounts.insert(address, account);
    }

    pub fn listing(&self, address: &Pubkey) -> Option<Listing> {
        let bank = self.bank.lock();
        let account = bank.accounts.get(address)?;
        Listing::try_from_account_data(&account.data).ok()
    }

    pub fn token_balance(&self, token_account: &Pubkey) -> u64 {
        self.bank
            .lock()
            .tokens
            .get(token_account)
            .map_or(0, |holding| holding.amount)
    }

    /// Credits `amount` of `mint` to `owner`'s associated token account.
    pub fn mint_to(&self, mint: &Pubkey, owner: &Pubkey, amount: u64) {
        let ata = self.deriver.user_token_address(mint, owner);
        let mut bank = self.bank.lock();
        bank.tokens
            .entry(ata)
            .or_insert(TokenHolding {
                mint: *mint,
                owner: *owner,
                amount: 0,
            })
            .amount += amount;
    }

    pub fn status(&self, signature: &Signature) -> Option<SignatureStatus> {
        self.statuses.lock().get(signature).cloned()
    }

    async fn before_read(&self) -> anyhow::Result<()> {
        let (fail, delay) = {
            let knobs = self.knobs.lock();
            (knobs.fail_reads, knobs.read_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        anyhow::ensure!(!fail, "Connection refused");
        Ok(())
    }

    /// Runs every instruction of `message` against a copy of the bank and commits it only if all
    /// of them succeed.
    fn execute(&self, message: &Message) -> Result<(), TransactionError> {
        let mut bank = self.bank.lock();
        let mut next = bank.clone();

        for (index, compiled) in message.instructions.iter().enumerate() {
            let index = index as u8;
            let fail = |error| TransactionError::InstructionError(index, error);

            let program_id = message.account_keys[compiled.program_id_index as usize];
            if program_id == self.compute_budget_program {
                continue;
            }
            if program_id != self.program_id {
                return Err(TransactionError::InvalidProgramForExecution);
            }

            let keys: Vec<Pubkey> = compiled
                .accounts
                .iter()
                .map(|i| message.account_keys[*i as usize])
                .collect();
            let signer_signed = compiled
                .accounts
                .first()
                .is_some_and(|i| message.is_signer(*i as usize));
            if !signer_signed {
                return Err(fail(InstructionError::MissingRequiredSignature));
            }

            let tag = ListingInstruction::from_instruction_data(&compiled.data)
                .ok_or(fail(InstructionError::InvalidInstructionData))?;
            match tag {
                ListingInstruction::CreateListing => {
                    self.create_listing(&mut next, &compiled.data, &keys).map_err(fail)?
                }
                ListingInstruction::Buy | ListingInstruction::Sell | ListingInstruction::BurnTokens => {
                    self.swap(&mut next, tag, &compiled.data, &keys).map_err(fail)?
                }
            }
        }

        *bank = next;
        Ok(())
    }

    fn create_listing(
        &self,
        bank: &mut Bank,
        data: &[u8],
        keys: &[Pubkey],
    ) -> Result<(), InstructionError> {
        let (_, args): (_, CreateListingInstructionData) =
            unpack(data).ok_or(InstructionError::InvalidInstructionData)?;
        let accounts =
            CreateListingAccounts::from_keys(keys).ok_or(InstructionError::NotEnoughAccountKeys)?;
        let addresses = self
            .deriver
            .derive(Seed::new(args.seed))
            .map_err(|_| InstructionError::InvalidSeeds)?;

        let expected = CreateListingAccounts {
            signer: accounts.signer,
            mint: addresses.mint,
            listing: addresses.listing,
            mint_vault: addresses.mint_vault,
            sol_vault: addresses.sol_vault,
            token_program: self.programs.token_program,
            associated_token_program: self.programs.associated_token_program,
            system_program: self.programs.system_program,
        };
        if accounts != expected {
            return Err(InstructionError::Custom(CONSTRAINT_SEEDS));
        }
        if bank.accounts.contains_key(&addresses.listing) {
            return Err(InstructionError::Custom(ACCOUNT_ALREADY_IN_USE));
        }
        if args.name.len() > LISTING_MAX_NAME_LEN {
            return Err(InstructionError::Custom(ACCOUNT_DID_NOT_SERIALIZE));
        }

        let listing = Listing {
            name: args.name,
            seed: args.seed,
            mint: addresses.mint.to_bytes(),
            funding_goal: INITIAL_FUNDING_GOAL,
            pool_mint_supply: 0,
            funding_raised: INITIAL_FUNDING_RAISED,
            available_tokens: INITIAL_AVAILABLE_TOKENS,
            base_price: INITIAL_BASE_PRICE,
            tokens_sold: 0,
            bump: addresses.bumps.listing,
            vault_bump: addresses.bumps.sol_vault,
            mint_bump: addresses.bumps.mint,
        };
        write_listing(bank, self.program_id, addresses.listing, &listing)?;

        let supply = (INITIAL_AVAILABLE_TOKENS * TOKEN_UNITS_PER_WHOLE) as u64;
        bank.tokens.insert(
            addresses.mint_vault,
            TokenHolding {
                mint: addresses.mint,
                owner: addresses.listing,
                amount: supply,
            },
        );
        Ok(())
    }

    fn swap(
        &self,
        bank: &mut Bank,
        tag: ListingInstruction,
        data: &[u8],
        keys: &[Pubkey],
    ) -> Result<(), InstructionError> {
        let accounts = SwapAccounts::from_keys(keys).ok_or(InstructionError::NotEnoughAccountKeys)?;
        let mut listing = bank
            .accounts
            .get(&accounts.listing)
            .and_then(|account| Listing::try_from_account_data(&account.data).ok())
            .ok_or(InstructionError::Custom(ACCOUNT_NOT_INITIALIZED))?;

        let addresses = self
            .deriver
            .derive(Seed::new(listing.seed))
            .map_err(|_| InstructionError::InvalidSeeds)?;
        let expected = SwapAccounts {
            user: accounts.user,
            mint: addresses.mint,
            sol_vault: addresses.sol_vault,
            listing: addresses.listing,
            mint_vault: addresses.mint_vault,
            user_ata: self.deriver.user_token_address(&addresses.mint, &accounts.user),
            token_program: self.programs.token_program,
            associated_token_program: self.programs.associated_token_program,
            system_program: self.programs.system_program,
        };
        if accounts != expected {
            return Err(InstructionError::Custom(CONSTRAINT_SEEDS));
        }

        let user_ata = bank
            .tokens
            .entry(accounts.user_ata)
            .or_insert(TokenHolding {
                mint: addresses.mint,
                owner: accounts.user,
                amount: 0,
            })
            .clone();
        let vault = bank
            .tokens
            .get(&accounts.mint_vault)
            .cloned()
            .ok_or(InstructionError::UninitializedAccount)?;

        let (user_amount, vault_amount) = match tag {
            ListingInstruction::Buy => {
                let (_, args): (_, SwapInstructionData) =
                    unpack(data).ok_or(InstructionError::InvalidInstructionData)?;
                let amount = args.amount as u64;
                let vault_amount = vault
                    .amount
                    .checked_sub(amount)
                    .ok_or(InstructionError::Custom(INSUFFICIENT_FUNDS))?;
                listing.available_tokens = listing
                    .available_tokens
                    .checked_sub(args.amount / TOKEN_UNITS_PER_WHOLE)
                    .ok_or(InstructionError::ProgramFailedToComplete)?;
                listing.tokens_sold = listing
                    .tokens_sold
                    .checked_add(args.amount)
                    .ok_or(InstructionError::ProgramFailedToComplete)?;
                (user_ata.amount + amount, vault_amount)
            }
            ListingInstruction::Sell => {
                let (_, args): (_, SwapInstructionData) =
                    unpack(data).ok_or(InstructionError::InvalidInstructionData)?;
                let amount = args.amount as u64;
                let user_amount = user_ata
                    .amount
                    .checked_sub(amount)
                    .ok_or(InstructionError::Custom(INSUFFICIENT_FUNDS))?;
                listing.available_tokens = listing
                    .available_tokens
                    .checked_add(args.amount / TOKEN_UNITS_PER_WHOLE)
                    .ok_or(InstructionError::ProgramFailedToComplete)?;
                listing.tokens_sold = listing
                    .tokens_sold
                    .checked_sub(args.amount)
                    .ok_or(InstructionError::ProgramFailedToComplete)?;
                (user_amount, vault.amount + amount)
            }
            ListingInstruction::BurnTokens => {
                let (_, args): (_, BurnTokensInstructionData) =
                    unpack(data).ok_or(InstructionError::InvalidInstructionData)?;
                let user_amount = user_ata
                    .amount
                    .checked_sub(args.amount)
                    .ok_or(InstructionError::Custom(INSUFFICIENT_FUNDS))?;
                (user_amount, vault.amount)
            }
            ListingInstruction::CreateListing => return Err(InstructionError::InvalidInstructionData),
        };

        set_balance(bank, &accounts.user_ata, user_amount);
        set_balance(bank, &accounts.mint_vault, vault_amount);
        write_listing(bank, self.program_id, accounts.listing, &listing)
    }
}

fn write_listing(
    bank: &mut Bank,
    program_id: Pubkey,
    address: Pubkey,
    listing: &Listing,
) -> Result<(), InstructionError> {
    let data = listing
        .to_account_data()
        .map_err(|_| InstructionError::Custom(ACCOUNT_DID_NOT_SERIALIZE))?;
    bank.accounts.insert(
        address,
        AccountData {
            owner: program_id,
            data,
            executable: false,
        },
    );
    Ok(())
}

fn set_balance(bank: &mut Bank, token_account: &Pubkey, amount: u64) {
    if let Some(holding) = bank.tokens.get_mut(token_account) {
        holding.amount = amount;
    }
}

fn describe(error: &TransactionError, message: &Message) -> String {
    PrettyInstructionError::from_transaction_error(error, message)
        .map_or_else(|| error.to_string(), |pretty| format!("{error}: {pretty}"))
}

#[async_trait]
impl Broadcaster for MockLedger {
    async fn latest_blockhash(&self) -> Result<Hash, SubmissionError> {
        self.counters.blockhashes.fetch_add(1, Ordering::SeqCst);
        Ok(Hash::new_unique())
    }

    async fn send_transaction(
        &self,
        transaction: &Transaction,
        mode: VerificationMode,
    ) -> Result<Signature, SubmissionError> {
        self.counters.sends.fetch_add(1, Ordering::SeqCst);

        let (fail_next_send, withhold) = {
            let mut knobs = self.knobs.lock();
            (knobs.fail_next_send.take(), knobs.withhold_confirmations)
        };
        if let Some(error) = fail_next_send {
            return Err(error);
        }
        transaction
            .verify()
            .map_err(|e| SubmissionError::broadcast(e.to_string()))?;

        let signature = transaction.signatures[0];
        let status = match self.execute(&transaction.message) {
            Ok(()) if withhold => SignatureStatus::Pending,
            Ok(()) => SignatureStatus::Confirmed,
            Err(error) => {
                let reason = describe(&error, &transaction.message);
                match mode {
                    VerificationMode::Verified => {
                        return Err(SubmissionError::simulation(format!(
                            "Transaction simulation failed: {reason}"
                        )))
                    }
                    VerificationMode::Unverified => SignatureStatus::Failed(reason),
                }
            }
        };

        self.statuses.lock().insert(signature, status);
        Ok(signature)
    }

    async fn signature_status(
        &self,
        signature: &Signature,
        _commitment: CommitmentConfig,
    ) -> anyhow::Result<SignatureStatus> {
        self.counters.status_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.status(signature).unwrap_or(SignatureStatus::Pending))
    }
}

#[async_trait]
impl LedgerConnection for MockLedger {
    async fn account_data(&self, address: &Pubkey) -> anyhow::Result<Option<AccountData>> {
        self.counters.account_reads.fetch_add(1, Ordering::SeqCst);
        self.before_read().await?;

        let bank = self.bank.lock();
        if let Some(account) = bank.accounts.get(address) {
            return Ok(Some(account.clone()));
        }

        let Some(holding) = bank.tokens.get(address) else {
            return Ok(None);
        };
        let account = TokenAccount {
            mint: holding.mint,
            owner: holding.owner,
            amount: holding.amount,
            state: AccountState::Initialized,
            ..Default::default()
        };
        let mut data = vec![0; TokenAccount::LEN];
        TokenAccount::pack(account, &mut data)?;
        Ok(Some(AccountData {
            owner: self.programs.token_program,
            data,
            executable: false,
        }))
    }

    async fn program_accounts(
        &self,
        program_id: &Pubkey,
        discriminator: &Discriminator,
    ) -> anyhow::Result<Vec<(Pubkey, AccountData)>> {
        self.counters
            .program_account_reads
            .fetch_add(1, Ordering::SeqCst);
        self.before_read().await?;

        let bank = self.bank.lock();
        Ok(bank
            .accounts
            .iter()
            .filter(|(_, account)| {
                account.owner == *program_id && account.data.starts_with(discriminator)
            })
            .map(|(address, account)| (*address, account.clone()))
            .collect())
    }
}

/// A wallet that declines every signature request.
pub struct RejectingSigner(pub Pubkey);

#[async_trait]
impl WalletSigner for RejectingSigner {
    fn pubkey(&self) -> Pubkey {
        self.0
    }

    async fn sign_transaction(
        &self,
        _transaction: &mut Transaction,
        _recent_blockhash: Hash,
    ) -> Result<(), SubmissionError> {
        Err(SubmissionError::rejected("User rejected the request."))
    }
}

/// A localnet session backed by a fresh [`MockLedger`].
pub struct E2e {
    pub ledger: Arc<MockLedger>,
    pub session: Session,
}

impl E2e {
    pub fn new() -> Self {
        Self::with_observer(Arc::new(LoggingObserver))
    }

    pub fn with_observer(observer: Arc<dyn MutationObserver>) -> Self {
        let cluster = Cluster::Localnet;
        let ledger = MockLedger::new(cluster.program_id());
        let config = SendTransactionConfig {
            debug_logs: Some(false),
            ..Default::default()
        };
        let session = Session::builder(cluster)
            .config(config)
            .observer(observer)
            .with_backend(ledger.clone());

        Self { ledger, session }
    }
}

impl Default for E2e {
    fn default() -> Self {
        Self::new()
    }
}
