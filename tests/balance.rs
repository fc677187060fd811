#![allow(non_snake_case)]

use duelhall::{
    balance::{
        AccountId,
        BalanceSnapshot,
        BalanceSynchronizer,
        SyncConfig,
    },
    test_helpers::FakeLedger,
};
use std::time::Duration;
use tokio::{
    sync::watch,
    time,
};

fn test_config() -> SyncConfig {
    SyncConfig {
        poll_interval: Duration::from_secs(30),
        unit_divisor: 1_000_000_000,
    }
}

async fn wait_for<F>(
    snapshots: &mut watch::Receiver<BalanceSnapshot>,
    pred: F,
) -> BalanceSnapshot
where
    F: Fn(&BalanceSnapshot) -> bool,
{
    loop {
        let current = snapshots.borrow_and_update().clone();
        if pred(&current) {
            return current;
        }
        snapshots.changed().await.expect("snapshot channel closed");
    }
}

#[tokio::test]
async fn fetch__success__converts_native_units_to_display_units() {
    // given
    let (ledger, mut requests) = FakeLedger::new_with_requests();
    let (_identity_tx, identity_rx) = watch::channel(Some(AccountId::new("alice")));
    let sync = BalanceSynchronizer::spawn(ledger, identity_rx, test_config());
    let mut snapshots = sync.subscribe();

    // when
    let request = requests.recv().await.unwrap();
    assert_eq!(request.account().as_str(), "alice");
    request.succeed(1_500_000_000);

    // then
    let snapshot = wait_for(&mut snapshots, |s| s.amount.is_some()).await;
    assert_eq!(snapshot.amount, Some(1.5));
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.error, None);
}

#[tokio::test]
async fn fetch__failure__surfaces_error_and_discards_previous_amount() {
    // given a known-good balance
    let (ledger, mut requests) = FakeLedger::new_with_requests();
    let (_identity_tx, identity_rx) = watch::channel(Some(AccountId::new("alice")));
    let sync = BalanceSynchronizer::spawn(ledger, identity_rx, test_config());
    let mut snapshots = sync.subscribe();

    requests.recv().await.unwrap().succeed(2_000_000_000);
    wait_for(&mut snapshots, |s| s.amount == Some(2.0)).await;

    // when the next fetch fails
    sync.refresh();
    requests.recv().await.unwrap().fail("timeout");

    // then the error replaces the value instead of sitting next to it
    let snapshot = wait_for(&mut snapshots, |s| s.error.is_some()).await;
    assert_eq!(snapshot.amount, None);
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.error.as_deref(), Some("timeout"));
}

#[tokio::test]
async fn identity_cleared__snapshot_resets_and_polling_stops() {
    // given an in-flight fetch for the connected account
    let (ledger, mut requests) = FakeLedger::new_with_requests();
    let (identity_tx, identity_rx) = watch::channel(Some(AccountId::new("alice")));
    let sync = BalanceSynchronizer::spawn(ledger, identity_rx, test_config());
    let mut snapshots = sync.subscribe();

    let pending = requests.recv().await.unwrap();

    // when the wallet disconnects
    identity_tx.send(None).unwrap();

    // then the snapshot clears without waiting for the fetch
    let snapshot = wait_for(&mut snapshots, |s| !s.is_loading).await;
    assert_eq!(snapshot, BalanceSnapshot::disconnected());

    // a late result for the cleared identity is dropped
    pending.succeed(999_000_000_000);
    time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sync.snapshot(), BalanceSnapshot::disconnected());

    // and no new fetch is issued while disconnected
    let no_request = time::timeout(Duration::from_millis(50), requests.recv()).await;
    assert!(no_request.is_err());
}

#[tokio::test]
async fn identity_switch__stale_result_never_overwrites_the_new_account() {
    // given a fetch still pending for the previous account
    let (ledger, mut requests) = FakeLedger::new_with_requests();
    let (identity_tx, identity_rx) = watch::channel(Some(AccountId::new("alice")));
    let sync = BalanceSynchronizer::spawn(ledger, identity_rx, test_config());
    let mut snapshots = sync.subscribe();

    let for_alice = requests.recv().await.unwrap();
    assert_eq!(for_alice.account().as_str(), "alice");

    // when the wallet switches accounts
    identity_tx.send(Some(AccountId::new("bob"))).unwrap();
    let for_bob = requests.recv().await.unwrap();
    assert_eq!(for_bob.account().as_str(), "bob");

    // and the old fetch resolves late
    for_alice.succeed(999_000_000_000);
    time::sleep(Duration::from_millis(50)).await;

    // then the snapshot stays untouched while bob's fetch is pending
    let current = sync.snapshot();
    assert_eq!(current.amount, None);
    assert!(current.is_loading);

    // and bob's result lands normally
    for_bob.succeed(250_000_000);
    let snapshot = wait_for(&mut snapshots, |s| s.amount.is_some()).await;
    assert_eq!(snapshot.amount, Some(0.25));
}

#[tokio::test]
async fn refresh__overlapping_fetches__last_completion_wins() {
    // given a fetch already in flight
    let (ledger, mut requests) = FakeLedger::new_with_requests();
    let (_identity_tx, identity_rx) = watch::channel(Some(AccountId::new("alice")));
    let sync = BalanceSynchronizer::spawn(ledger, identity_rx, test_config());
    let mut snapshots = sync.subscribe();

    let first = requests.recv().await.unwrap();

    // when a manual refresh races it
    sync.refresh();
    let second = requests.recv().await.unwrap();

    first.succeed(1_000_000_000);
    wait_for(&mut snapshots, |s| s.amount == Some(1.0)).await;

    second.succeed(3_000_000_000);

    // then whichever fetch completed last owns the snapshot
    let snapshot = wait_for(&mut snapshots, |s| s.amount == Some(3.0)).await;
    assert_eq!(snapshot.error, None);
    assert!(!snapshot.is_loading);
}

#[tokio::test]
async fn refresh__without_identity__clears_without_fetching() {
    // given no connected account
    let (ledger, mut requests) = FakeLedger::new_with_requests();
    let (_identity_tx, identity_rx) = watch::channel(None);
    let sync = BalanceSynchronizer::spawn(ledger, identity_rx, test_config());

    // when
    sync.refresh();

    // then
    let no_request = time::timeout(Duration::from_millis(50), requests.recv()).await;
    assert!(no_request.is_err());
    assert_eq!(sync.snapshot(), BalanceSnapshot::disconnected());
}

#[tokio::test(start_paused = true)]
async fn poll_timer__issues_periodic_fetches_while_identity_present() {
    // given
    let (ledger, mut requests) = FakeLedger::new_with_requests();
    let (_identity_tx, identity_rx) = watch::channel(Some(AccountId::new("alice")));
    let sync = BalanceSynchronizer::spawn(ledger, identity_rx, test_config());
    let mut snapshots = sync.subscribe();

    // the identity itself triggers the first fetch
    requests.recv().await.unwrap().succeed(1_000_000_000);
    wait_for(&mut snapshots, |s| s.amount == Some(1.0)).await;

    // when the poll interval elapses
    let request = requests.recv().await.unwrap();
    request.succeed(2_000_000_000);

    // then the timer-triggered fetch updates the snapshot
    let snapshot = wait_for(&mut snapshots, |s| s.amount == Some(2.0)).await;
    assert!(!snapshot.is_loading);
}

#[tokio::test(start_paused = true)]
async fn drop__tears_down_the_worker_and_its_timer() {
    // given
    let (ledger, mut requests) = FakeLedger::new_with_requests();
    let (_identity_tx, identity_rx) = watch::channel(Some(AccountId::new("alice")));
    let sync = BalanceSynchronizer::spawn(ledger, identity_rx, test_config());

    requests.recv().await.unwrap().succeed(1_000_000_000);

    // when
    drop(sync);

    // then the worker's side of the request channel closes and no timer
    // tick ever fires again
    let outcome = time::timeout(Duration::from_secs(120), requests.recv()).await;
    assert!(matches!(outcome, Ok(None)));
}
