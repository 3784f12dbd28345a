//! Command line front end for the listing marketplace program.

use anyhow::Context;
use clap::Parser;
use client::{
    args::{
        parse_address,
        CreateListingArgs,
        Seed,
        SwapArgs,
    },
    cache::{
        ListingQuery,
        ListingSnapshot,
    },
    ledger::LedgerConnection,
    logs::log_divider,
    print_kv,
    session::Session,
    views::ListingView,
    LogColor,
};
use colored::Colorize;
use listing_interface::state::curve::TOKEN_UNITS_PER_WHOLE;
use solana_sdk::{
    pubkey::Pubkey,
    signer::Signer,
};

use crate::cli::{
    Cli,
    Command,
    SwapCommand,
};

pub mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut builder = Session::builder(cli.cluster.clone());
    if let Some(url) = &cli.url {
        builder = builder.rpc_url(url);
    }
    if let Some(program_id) = cli.program_id {
        builder = builder.program_id(program_id);
    }
    let session = builder.connect();

    match &cli.command {
        Command::Derive { seed } => derive(&session, *seed),
        Command::Create { seed, name } => {
            let keypair = cli.load_keypair()?;
            let args = CreateListingArgs::new(*seed, name.as_str());
            session.orchestrator.create_listing(&keypair, &args).await?;
            show(&session, *seed, Some(keypair.pubkey())).await
        }
        Command::Buy(swap) => {
            let keypair = cli.load_keypair()?;
            let args = swap_args(&session, swap)?;
            session.orchestrator.buy(&keypair, &args).await?;
            show(&session, swap.seed, Some(keypair.pubkey())).await
        }
        Command::Sell(swap) => {
            let keypair = cli.load_keypair()?;
            let args = swap_args(&session, swap)?;
            session.orchestrator.sell(&keypair, &args).await?;
            show(&session, swap.seed, Some(keypair.pubkey())).await
        }
        Command::Burn(swap) => {
            let keypair = cli.load_keypair()?;
            let args = swap_args(&session, swap)?;
            session.orchestrator.burn(&keypair, &args).await?;
            show(&session, swap.seed, Some(keypair.pubkey())).await
        }
        Command::List => list(&session).await,
        Command::Show { seed } => {
            let owner = match &cli.keypair {
                Some(path) => Some(cli::read_keypair(path)?.pubkey()),
                None => None,
            };
            show(&session, *seed, owner).await
        }
        Command::Status => status(&session).await,
    }
}

/// Fills in the derived mint when none was passed. A passed mint is checked against the derived
/// one when the instruction is built.
fn swap_args(session: &Session, swap: &SwapCommand) -> anyhow::Result<SwapArgs> {
    let mint = match &swap.mint {
        Some(mint) => parse_address(mint)?,
        None => session.builder.derive(Seed::try_from(swap.seed)?)?.mint,
    };
    Ok(SwapArgs::new(swap.seed, swap.amount, mint))
}

fn derive(session: &Session, seed: i128) -> anyhow::Result<()> {
    let addresses = session.builder.derive(Seed::try_from(seed)?)?;
    print_kv!("Seed", addresses.seed, LogColor::Header);
    print_kv!("Listing", addresses.listing);
    print_kv!("Mint", addresses.mint);
    print_kv!("SOL vault", addresses.sol_vault);
    print_kv!("Mint vault", addresses.mint_vault);
    Ok(())
}

async fn list(session: &Session) -> anyhow::Result<()> {
    let key = session.cache.key(ListingQuery::All);
    let snapshot = session.cache.refetch(&key).await?;
    let ListingSnapshot::All(views) = snapshot.as_ref() else {
        anyhow::bail!("Expected every listing for {key}");
    };

    if views.is_empty() {
        println!("{}", "No listings yet".color(LogColor::FadedGray));
    }
    for view in views {
        print_listing(view);
        log_divider();
    }
    Ok(())
}

async fn show(session: &Session, seed: i128, owner: Option<Pubkey>) -> anyhow::Result<()> {
    let seed = Seed::try_from(seed)?;
    let key = session.cache.seed_key(seed)?;
    let snapshot = session.cache.refetch(&key).await?;
    let ListingSnapshot::One(view) = snapshot.as_ref() else {
        anyhow::bail!("Expected a single listing for {key}");
    };
    let Some(view) = view else {
        println!("{}", format!("No listing for seed {seed}").color(LogColor::Warning));
        return Ok(());
    };
    print_listing(view);

    if let Some(owner) = owner {
        let token = session.builder.listing_context(seed)?.token;
        let ata = token.get_ata_for(&owner);
        let balance = match session
            .ledger
            .account_data(&ata)
            .await
            .with_context(|| format!("Couldn't read token account {ata}"))?
        {
            Some(account) => token.balance_from_account_data(&account.data)?,
            None => 0,
        };
        print_kv!("Token account", ata, LogColor::Info);
        print_kv!("Balance", balance, LogColor::Info);
    }
    Ok(())
}

async fn status(session: &Session) -> anyhow::Result<()> {
    print_kv!("Cluster", session.cluster, LogColor::Header);
    print_kv!("Program", session.program_id);
    let deployed = session
        .ledger
        .program_account_exists(&session.program_id)
        .await
        .context("Couldn't read the program account")?;
    if deployed {
        print_kv!("Deployed", "yes");
    } else {
        print_kv!("Deployed", "no", LogColor::Error);
    }
    Ok(())
}

fn print_listing(view: &ListingView) {
    print_kv!("Name", view.name, LogColor::Header);
    print_kv!("Seed", view.seed);
    print_kv!("Address", view.address);
    print_kv!("Mint", view.mint);
    print_kv!("Funding goal", view.funding_goal, LogColor::Gray);
    print_kv!("Funding raised", view.funding_raised, LogColor::Gray);
    print_kv!("Pool mint supply", view.pool_mint_supply, LogColor::Gray);
    print_kv!("Available tokens", view.available_tokens, LogColor::Gray);
    print_kv!("Tokens sold", view.tokens_sold, LogColor::Gray);
    print_kv!("Base price", view.base_price, LogColor::Gray);
    print_kv!(
        "Price of one token",
        view.quote(TOKEN_UNITS_PER_WHOLE),
        LogColor::Gray
    );
}
