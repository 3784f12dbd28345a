use std::{
    sync::atomic::Ordering,
    time::Duration,
};

use client::{
    args::{
        CreateListingArgs,
        Seed,
    },
    cache::ListingSnapshot,
    e2e_helpers::E2e,
    error::CacheError,
    ledger::AccountData,
};
use listing_interface::state::{
    Listing,
    LISTING_ACCOUNT_DISCRIMINATOR,
};
use solana_sdk::{
    pubkey::Pubkey,
    signature::Keypair,
};

fn listing(seed: u64, name: &str) -> Listing {
    Listing {
        name: name.to_string(),
        seed,
        mint: Pubkey::new_unique().to_bytes(),
        funding_goal: 350,
        pool_mint_supply: 0,
        funding_raised: 800_000,
        available_tokens: 200_000,
        base_price: 0.001,
        tokens_sold: 0,
        bump: 255,
        vault_bump: 255,
        mint_bump: 255,
    }
}

fn insert_listing(e2e: &E2e, listing: &Listing) -> anyhow::Result<Pubkey> {
    let address = Pubkey::new_unique();
    e2e.ledger.insert_account(
        address,
        AccountData {
            owner: e2e.session.program_id,
            data: listing.to_account_data()?,
            executable: false,
        },
    );
    Ok(address)
}

fn names(snapshot: &ListingSnapshot) -> Vec<String> {
    match snapshot {
        ListingSnapshot::All(views) => views.iter().map(|view| view.name.clone()).collect(),
        ListingSnapshot::One(view) => view.iter().map(|view| view.name.clone()).collect(),
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_refetches_share_one_read() -> anyhow::Result<()> {
    let e2e = E2e::new();
    let cache = &e2e.session.cache;
    let key = cache.all_listings_key();
    e2e.ledger.set_read_delay(Some(Duration::from_millis(250)));

    let (a, b, c) = tokio::join!(cache.refetch(&key), cache.refetch(&key), cache.refetch(&key));
    assert_eq!(a?, b.clone()?);
    assert_eq!(b?, c?);

    assert_eq!(
        e2e.ledger
            .counters
            .program_account_reads
            .load(Ordering::SeqCst),
        1
    );
    assert_eq!(cache.counters(&key).fetches, 1);

    // Once settled, the next refetch reads again.
    cache.refetch(&key).await?;
    assert_eq!(cache.counters(&key).fetches, 2);
    Ok(())
}

#[tokio::test]
async fn listings_are_sorted_by_seed_and_junk_is_skipped() -> anyhow::Result<()> {
    let e2e = E2e::new();
    insert_listing(&e2e, &listing(9, "nine"))?;
    insert_listing(&e2e, &listing(2, "two"))?;
    insert_listing(&e2e, &listing(5, "five"))?;

    let mut junk = LISTING_ACCOUNT_DISCRIMINATOR.to_vec();
    junk.extend_from_slice(&[0xff; 4]);
    e2e.ledger.insert_account(
        Pubkey::new_unique(),
        AccountData {
            owner: e2e.session.program_id,
            data: junk,
            executable: false,
        },
    );

    let cache = &e2e.session.cache;
    let snapshot = cache.refetch(&cache.all_listings_key()).await?;
    assert_eq!(names(&snapshot), ["two", "five", "nine"]);
    assert!(cache.peek(&cache.all_listings_key()).unwrap().error.is_none());
    Ok(())
}

#[tokio::test]
async fn missing_listings_are_empty_not_errors() -> anyhow::Result<()> {
    let e2e = E2e::new();
    let cache = &e2e.session.cache;
    let key = cache.seed_key(Seed::new(11))?;

    let snapshot = cache.refetch(&key).await?;
    assert_eq!(*snapshot, ListingSnapshot::One(None));

    // A non-listing account at a listing address is a decode error.
    let address = e2e.session.builder.derive(Seed::new(11))?.listing;
    e2e.ledger.insert_account(
        address,
        AccountData {
            owner: e2e.session.program_id,
            data: vec![1; 16],
            executable: false,
        },
    );
    cache.invalidate(&key);
    assert!(matches!(
        cache.refetch(&key).await,
        Err(CacheError::Decode { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn failed_refetch_keeps_the_last_snapshot() -> anyhow::Result<()> {
    let e2e = E2e::new();
    let cache = &e2e.session.cache;
    let key = cache.all_listings_key();
    insert_listing(&e2e, &listing(1, "one"))?;

    cache.refetch(&key).await?;
    let good = cache.peek(&key).unwrap();
    assert_eq!(names(good.data.as_ref().unwrap()), ["one"]);

    e2e.ledger.fail_reads(true);
    assert!(matches!(cache.refetch(&key).await, Err(CacheError::Fetch(_))));
    let failed = cache.peek(&key).unwrap();
    assert_eq!(failed.data, good.data);
    assert_eq!(failed.updated_at, good.updated_at);
    assert!(matches!(failed.error, Some(CacheError::Fetch(_))));
    assert!(!failed.is_loading);

    e2e.ledger.fail_reads(false);
    cache.refetch(&key).await?;
    assert!(cache.peek(&key).unwrap().error.is_none());
    Ok(())
}

#[tokio::test]
async fn get_returns_immediately_and_loads_in_the_background() -> anyhow::Result<()> {
    let e2e = E2e::new();
    let cache = &e2e.session.cache;
    let key = cache.all_listings_key();
    insert_listing(&e2e, &listing(3, "three"))?;

    let entry = cache.get(&key);
    assert!(entry.is_loading);
    assert!(entry.data.is_none());

    let mut updates = cache.subscribe(&key);
    let loaded = updates.wait_for(|entry| entry.data.is_some()).await?.clone();
    assert_eq!(names(loaded.data.as_ref().unwrap()), ["three"]);
    assert_eq!(cache.counters(&key).fetches, 1);

    // Fresh entries are served from the cache.
    let again = cache.get(&key);
    assert_eq!(again.data, loaded.data);
    assert_eq!(cache.counters(&key).fetches, 1);
    Ok(())
}

#[tokio::test]
async fn invalidation_refetches_subscribed_keys_right_away() -> anyhow::Result<()> {
    let e2e = E2e::new();
    let cache = &e2e.session.cache;
    let key = cache.all_listings_key();

    let mut updates = cache.subscribe(&key);
    updates.wait_for(|entry| entry.data.is_some()).await?;
    assert_eq!(names(updates.borrow().data.as_ref().unwrap()).len(), 0);

    insert_listing(&e2e, &listing(4, "four"))?;
    cache.invalidate(&key);
    let refreshed = updates
        .wait_for(|entry| !entry.is_stale && entry.data.is_some())
        .await?
        .clone();
    assert_eq!(names(refreshed.data.as_ref().unwrap()), ["four"]);
    assert_eq!(cache.counters(&key).fetches, 2);
    assert_eq!(cache.counters(&key).invalidations, 1);
    Ok(())
}

#[tokio::test]
async fn unsubscribed_keys_refetch_on_the_next_get() -> anyhow::Result<()> {
    let e2e = E2e::new();
    let cache = &e2e.session.cache;
    let key = cache.all_listings_key();
    cache.refetch(&key).await?;

    cache.invalidate(&key);
    assert_eq!(cache.counters(&key).fetches, 1);
    let stale = cache.get(&key);
    assert!(stale.is_stale);
    assert!(stale.is_loading);
    assert_eq!(cache.counters(&key).fetches, 2);
    Ok(())
}

#[tokio::test]
async fn created_listings_show_up_under_their_seed() -> anyhow::Result<()> {
    let e2e = E2e::new();
    let user = Keypair::new();
    e2e.session
        .orchestrator
        .create_listing(&user, &CreateListingArgs::new(21, "twenty-one"))
        .await?;

    let cache = &e2e.session.cache;
    let entry = cache.peek(&cache.seed_key(Seed::new(21))?).unwrap();
    assert_eq!(names(entry.data.as_ref().unwrap()), ["twenty-one"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn invalidation_during_a_fetch_reads_again_without_overlap() -> anyhow::Result<()> {
    let e2e = E2e::new();
    let cache = e2e.session.cache.clone();
    let key = cache.all_listings_key();
    let reads = || e2e.ledger.counters.program_account_reads.load(Ordering::SeqCst);
    e2e.ledger.set_read_delay(Some(Duration::from_millis(250)));

    let first = tokio::spawn({
        let cache = cache.clone();
        let key = key.clone();
        async move { cache.refetch(&key).await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(reads(), 1);

    // The listing lands while the first read is still running.
    insert_listing(&e2e, &listing(6, "six"))?;
    cache.invalidate(&key);
    let entry = cache.peek(&key).unwrap();
    assert!(entry.is_loading);
    assert!(entry.is_stale);

    let second = tokio::spawn({
        let cache = cache.clone();
        let key = key.clone();
        async move { cache.refetch(&key).await }
    });
    let _ = cache.get(&key);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(reads(), 1);

    // The first read returns at 250ms, the follow-up read starts then.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(reads(), 2);

    let (first, second) = (first.await??, second.await??);
    assert_eq!(first, second);
    assert_eq!(names(&first), ["six"]);
    assert_eq!(reads(), 2);
    assert_eq!(cache.counters(&key).fetches, 2);

    let settled = cache.peek(&key).unwrap();
    assert!(!settled.is_loading);
    assert!(!settled.is_stale);
    assert_eq!(settled.data, Some(first));
    Ok(())
}

#[tokio::test]
async fn failed_first_fetch_is_retried_on_the_next_get() -> anyhow::Result<()> {
    let e2e = E2e::new();
    let cache = &e2e.session.cache;
    let key = cache.all_listings_key();
    insert_listing(&e2e, &listing(8, "eight"))?;

    e2e.ledger.fail_reads(true);
    assert!(matches!(cache.refetch(&key).await, Err(CacheError::Fetch(_))));
    let failed = cache.peek(&key).unwrap();
    assert!(failed.data.is_none());
    assert!(failed.error.is_some());

    e2e.ledger.fail_reads(false);
    let retrying = cache.get(&key);
    assert!(retrying.is_loading);
    assert_eq!(cache.counters(&key).fetches, 2);

    let mut updates = cache.subscribe(&key);
    let loaded = updates.wait_for(|entry| entry.data.is_some()).await?.clone();
    assert_eq!(names(loaded.data.as_ref().unwrap()), ["eight"]);
    assert!(loaded.error.is_none());
    Ok(())
}
