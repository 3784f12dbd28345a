use client::{
    e2e_helpers::E2e,
    ledger::LedgerConnection,
};
use solana_sdk::pubkey::Pubkey;

#[tokio::test]
async fn deployed_program_is_found() -> anyhow::Result<()> {
    let e2e = E2e::new();
    let ledger = &e2e.session.ledger;
    assert!(ledger.program_account_exists(&e2e.session.program_id).await?);
    assert!(!ledger.program_account_exists(&Pubkey::new_unique()).await?);
    Ok(())
}

#[tokio::test]
async fn unreachable_ledger_is_an_error() {
    let e2e = E2e::new();
    e2e.ledger.fail_reads(true);
    assert!(e2e
        .session
        .ledger
        .program_account_exists(&e2e.session.program_id)
        .await
        .is_err());
}
