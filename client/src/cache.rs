//! A keyed read-through cache of listing accounts.
//!
//! Each key owns a [`watch`] channel holding its current [`CacheEntry`]. Entries are replaced as a
//! whole under the channel's lock, so readers never see a half-updated entry. At most one fetch
//! per key is in flight: concurrent refetches share the same future, and a key invalidated during
//! a fetch is read again by that same fetch once its current read returns.

use std::{
    fmt::Display,
    sync::{
        Arc,
        Weak,
    },
};

use chrono::{
    DateTime,
    Utc,
};
use dashmap::DashMap;
use futures::{
    future::{
        BoxFuture,
        Shared,
    },
    FutureExt,
};
use itertools::Itertools;
use listing_interface::state::LISTING_ACCOUNT_DISCRIMINATOR;
use solana_sdk::pubkey::Pubkey;
use tokio::sync::watch;

use crate::{
    args::Seed,
    cluster::Cluster,
    error::{
        CacheError,
        DerivationError,
    },
    ledger::LedgerConnection,
    logs::log_warning,
    pda::AddressDeriver,
    views::{
        try_listing_view_from_owner_and_data,
        ListingView,
    },
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ListingQuery {
    All,
    ByAddress(Pubkey),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub network: Cluster,
    pub query: ListingQuery,
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.query {
            ListingQuery::All => write!(f, "{}/listings", self.network),
            ListingQuery::ByAddress(address) => write!(f, "{}/listing/{address}", self.network),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ListingSnapshot {
    /// Every listing of the program, sorted by seed.
    All(Vec<ListingView>),
    /// A single listing, `None` if its account doesn't exist.
    One(Option<ListingView>),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CacheEntry {
    /// The last successfully fetched snapshot. Kept when a later refetch fails.
    pub data: Option<Arc<ListingSnapshot>>,
    pub is_loading: bool,
    pub is_stale: bool,
    /// The error of the latest fetch, cleared by the next successful one.
    pub error: Option<CacheError>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// Stale entries and entries that never loaded. A failed first fetch is retried on the next
    /// read of the entry.
    fn needs_fetch(&self) -> bool {
        self.is_stale || self.data.is_none()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyCounters {
    /// Network reads started for the key.
    pub fetches: u64,
    pub invalidations: u64,
}

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<ListingSnapshot>, CacheError>>>;

struct Slot {
    entry: watch::Sender<CacheEntry>,
    /// Bumped by every invalidation. A read only settles into the entry if the generation it
    /// started under is still current, otherwise the fetch reads again.
    generation: u64,
    in_flight: Option<SharedFetch>,
    counters: KeyCounters,
}

impl Slot {
    fn new() -> Self {
        Self {
            entry: watch::Sender::new(CacheEntry::default()),
            generation: 0,
            in_flight: None,
            counters: KeyCounters::default(),
        }
    }
}

struct CacheInner {
    network: Cluster,
    program_id: Pubkey,
    ledger: Arc<dyn LedgerConnection>,
    slots: DashMap<CacheKey, Slot>,
}

/// The session's single listing cache. Cloning it is cheap and every clone shares the same
/// entries.
#[derive(Clone)]
pub struct StateCache {
    inner: Arc<CacheInner>,
}

impl StateCache {
    pub fn new(network: Cluster, program_id: Pubkey, ledger: Arc<dyn LedgerConnection>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                network,
                program_id,
                ledger,
                slots: DashMap::new(),
            }),
        }
    }

    pub fn network(&self) -> &Cluster {
        &self.inner.network
    }

    pub fn program_id(&self) -> Pubkey {
        self.inner.program_id
    }

    pub fn key(&self, query: ListingQuery) -> CacheKey {
        CacheKey {
            network: self.inner.network.clone(),
            query,
        }
    }

    pub fn all_listings_key(&self) -> CacheKey {
        self.key(ListingQuery::All)
    }

    pub fn listing_key(&self, address: Pubkey) -> CacheKey {
        self.key(ListingQuery::ByAddress(address))
    }

    pub fn seed_key(&self, seed: Seed) -> Result<CacheKey, DerivationError> {
        let addresses = AddressDeriver::new(self.inner.program_id).derive(seed)?;
        Ok(self.listing_key(addresses.listing))
    }

    /// Returns the current entry without waiting. A missing or stale entry starts a background
    /// refetch when called inside a tokio runtime.
    pub fn get(&self, key: &CacheKey) -> CacheEntry {
        let needs_fetch = {
            let slot = self.inner.slots.entry(key.clone()).or_insert_with(Slot::new);
            let needs_fetch = slot.in_flight.is_none() && slot.entry.borrow().needs_fetch();
            needs_fetch
        };
        if needs_fetch {
            self.spawn_refetch(key);
        }
        self.peek(key).unwrap_or_default()
    }

    /// Returns the current entry, if the key was ever queried, without triggering a fetch.
    pub fn peek(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.inner
            .slots
            .get(key)
            .map(|slot| slot.entry.borrow().clone())
    }

    /// Every entry currently held.
    pub fn entries(&self) -> Vec<(CacheKey, CacheEntry)> {
        self.inner
            .slots
            .iter()
            .map(|slot| (slot.key().clone(), slot.entry.borrow().clone()))
            .collect()
    }

    pub fn counters(&self, key: &CacheKey) -> KeyCounters {
        self.inner
            .slots
            .get(key)
            .map(|slot| slot.counters)
            .unwrap_or_default()
    }

    /// Subscribes to every replacement of `key`'s entry. Subscribed keys are refetched as soon as
    /// they're invalidated.
    pub fn subscribe(&self, key: &CacheKey) -> watch::Receiver<CacheEntry> {
        let (receiver, needs_fetch) = {
            let slot = self.inner.slots.entry(key.clone()).or_insert_with(Slot::new);
            let needs_fetch = slot.in_flight.is_none() && slot.entry.borrow().needs_fetch();
            (slot.entry.subscribe(), needs_fetch)
        };
        if needs_fetch {
            self.spawn_refetch(key);
        }
        receiver
    }

    /// Reads `key` from the ledger and replaces its entry. Joins the fetch already in flight for
    /// `key` if there is one.
    pub async fn refetch(&self, key: &CacheKey) -> Result<Arc<ListingSnapshot>, CacheError> {
        self.start_fetch(key).await
    }

    /// Marks `key` stale. Subscribed keys are refetched right away, the others on their next
    /// [`StateCache::get`]. A fetch already in flight stays the only one: it reads once more
    /// before settling.
    pub fn invalidate(&self, key: &CacheKey) {
        let subscribed = {
            let mut slot = self.inner.slots.entry(key.clone()).or_insert_with(Slot::new);
            slot.generation += 1;
            slot.counters.invalidations += 1;
            let loading = slot.in_flight.is_some();
            slot.entry.send_modify(|entry| {
                entry.is_stale = true;
                entry.is_loading = loading;
            });
            slot.entry.receiver_count() > 0
        };
        if subscribed {
            self.spawn_refetch(key);
        }
    }

    fn spawn_refetch(&self, key: &CacheKey) {
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let fetch = self.start_fetch(key);
            handle.spawn(async move {
                // Failures are recorded in the entry.
                let _ = fetch.await;
            });
        }
    }

    fn start_fetch(&self, key: &CacheKey) -> SharedFetch {
        let mut slot = self.inner.slots.entry(key.clone()).or_insert_with(Slot::new);
        if let Some(fetch) = &slot.in_flight {
            return fetch.clone();
        }

        let generation = slot.generation;
        slot.counters.fetches += 1;
        slot.entry.send_modify(|entry| entry.is_loading = true);

        let inner = Arc::downgrade(&self.inner);
        let fetch_key = key.clone();
        let fetch = async move {
            let Some(inner) = Weak::upgrade(&inner) else {
                return Err(CacheError::Fetch("The cache was dropped".to_string()));
            };
            inner.read_until_current(&fetch_key, generation).await
        }
        .boxed()
        .shared();

        slot.in_flight = Some(fetch.clone());
        fetch
    }
}

impl CacheInner {
    async fn read(&self, key: &CacheKey) -> Result<Arc<ListingSnapshot>, CacheError> {
        if key.network != self.network {
            return Err(CacheError::Fetch(format!(
                "{key} belongs to another network than {}",
                self.network
            )));
        }

        let snapshot = match &key.query {
            ListingQuery::All => {
                let accounts = self
                    .ledger
                    .program_accounts(&self.program_id, &LISTING_ACCOUNT_DISCRIMINATOR)
                    .await
                    .map_err(|e| CacheError::Fetch(format!("{e:#}")))?;

                let views = accounts
                    .into_iter()
                    .filter_map(|(address, account)| {
                        try_listing_view_from_owner_and_data(
                            address,
                            &account.owner,
                            &self.program_id,
                            &account.data,
                        )
                        .inspect_err(|e| log_warning("Skipping account", format!("{address}: {e}")))
                        .ok()
                    })
                    .sorted_by_key(|view| view.seed)
                    .collect();

                ListingSnapshot::All(views)
            }
            ListingQuery::ByAddress(address) => {
                let account = self
                    .ledger
                    .account_data(address)
                    .await
                    .map_err(|e| CacheError::Fetch(format!("{e:#}")))?;

                let view = account
                    .map(|account| {
                        try_listing_view_from_owner_and_data(
                            *address,
                            &account.owner,
                            &self.program_id,
                            &account.data,
                        )
                        .map_err(|e| CacheError::Decode {
                            address: *address,
                            reason: e.to_string(),
                        })
                    })
                    .transpose()?;

                ListingSnapshot::One(view)
            }
        };

        Ok(Arc::new(snapshot))
    }

    /// Reads `key` until a read completes without an invalidation landing in between, and settles
    /// that read into the entry.
    async fn read_until_current(
        &self,
        key: &CacheKey,
        mut generation: u64,
    ) -> Result<Arc<ListingSnapshot>, CacheError> {
        loop {
            let res = self.read(key).await;
            match self.settle(key, generation, &res) {
                Some(current) => generation = current,
                None => return res,
            }
        }
    }

    /// Replaces the entry with the outcome of a read started under `generation`. Returns the
    /// current generation instead when the key was invalidated since, counting the read that
    /// follows.
    fn settle(
        &self,
        key: &CacheKey,
        generation: u64,
        res: &Result<Arc<ListingSnapshot>, CacheError>,
    ) -> Option<u64> {
        let mut slot = self.slots.get_mut(key)?;
        if slot.generation != generation {
            slot.counters.fetches += 1;
            return Some(slot.generation);
        }
        slot.in_flight = None;

        match res {
            Ok(data) => slot.entry.send_modify(|entry| {
                *entry = CacheEntry {
                    data: Some(data.clone()),
                    is_loading: false,
                    is_stale: false,
                    error: None,
                    updated_at: Some(Utc::now()),
                }
            }),
            Err(error) => {
                log_warning("Cache refetch failed", format!("{key}: {error}"));
                slot.entry.send_modify(|entry| {
                    entry.is_loading = false;
                    entry.error = Some(error.clone());
                });
            }
        }
        None
    }
}
