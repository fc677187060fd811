use color_eyre::eyre::Result;
use futures::{
    future::BoxFuture,
    stream::{
        FuturesUnordered,
        StreamExt,
    },
};
use std::{
    fmt,
    time::Duration,
};
use tokio::{
    sync::{
        mpsc,
        watch,
    },
    task::JoinHandle,
    time::{
        self,
        Instant,
    },
};
use tracing::{
    debug,
    warn,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Native ledger units per display unit in the reference deployment.
pub const DEFAULT_UNIT_DIVISOR: u64 = 1_000_000_000;

/// Opaque ledger account identity. Owned by the wallet collaborator; the
/// synchronizer only reacts to it changing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Latest known balance state. `amount` is in display units.
#[derive(Clone, Debug, PartialEq)]
pub struct BalanceSnapshot {
    pub amount: Option<f64>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl BalanceSnapshot {
    /// State while no account is connected.
    pub fn disconnected() -> Self {
        Self {
            amount: None,
            is_loading: false,
            error: None,
        }
    }
}

impl Default for BalanceSnapshot {
    fn default() -> Self {
        Self::disconnected()
    }
}

#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub poll_interval: Duration,
    /// Native ledger units per display unit.
    pub unit_divisor: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            unit_divisor: DEFAULT_UNIT_DIVISOR,
        }
    }
}

/// Read-only ledger RPC seam. Implementations must be cheap to clone; the
/// worker clones one per in-flight fetch.
pub trait LedgerClient: Clone + Send + Sync + 'static {
    fn get_balance(
        &self,
        account: &AccountId,
    ) -> impl Future<Output = Result<u64>> + Send;
}

/// Keeps a cached balance for the active account: refetches on identity
/// change, on a recurring timer while an identity is present, and on manual
/// [`BalanceSynchronizer::refresh`]. Consumers read snapshots; the worker is
/// the only writer.
pub struct BalanceSynchronizer {
    snapshot_rx: watch::Receiver<BalanceSnapshot>,
    refresh_tx: mpsc::Sender<()>,
    worker: JoinHandle<()>,
}

impl BalanceSynchronizer {
    /// Spawns the sync worker. It follows `identity` until the sender side
    /// closes or the synchronizer is dropped.
    pub fn spawn<C: LedgerClient>(
        client: C,
        identity: watch::Receiver<Option<AccountId>>,
        config: SyncConfig,
    ) -> Self {
        let (snapshot_tx, snapshot_rx) = watch::channel(BalanceSnapshot::disconnected());
        let (refresh_tx, refresh_rx) = mpsc::channel(1);
        let worker =
            tokio::spawn(sync_loop(client, identity, refresh_rx, snapshot_tx, config));
        Self {
            snapshot_rx,
            refresh_tx,
            worker,
        }
    }

    /// Latest known snapshot; never blocks.
    pub fn snapshot(&self) -> BalanceSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Change feed for consumers that want to await updates.
    pub fn subscribe(&self) -> watch::Receiver<BalanceSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Fire-and-forget manual refresh, observable only through snapshot
    /// changes. Requests collapse while one is already queued; overlapping
    /// in-flight fetches are allowed and the last completion wins.
    pub fn refresh(&self) {
        let _ = self.refresh_tx.try_send(());
    }
}

impl Drop for BalanceSynchronizer {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

type FetchOutcome = (u64, Result<u64>);

async fn sync_loop<C: LedgerClient>(
    client: C,
    mut identity_rx: watch::Receiver<Option<AccountId>>,
    mut refresh_rx: mpsc::Receiver<()>,
    snapshot_tx: watch::Sender<BalanceSnapshot>,
    config: SyncConfig,
) {
    // Bumped on every identity change; a result tagged with an older epoch
    // is stale and must not touch the snapshot.
    let mut epoch: u64 = 0;
    let mut timer: Option<time::Interval> = None;
    let mut in_flight: FuturesUnordered<BoxFuture<'static, FetchOutcome>> =
        FuturesUnordered::new();

    let mut account = identity_rx.borrow_and_update().clone();
    if let Some(account) = &account {
        timer = Some(poll_timer(config.poll_interval));
        begin_fetch(&client, account, epoch, &mut in_flight, &snapshot_tx);
    }

    loop {
        tokio::select! {
            changed = identity_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                epoch += 1;
                account = identity_rx.borrow_and_update().clone();
                match &account {
                    None => {
                        timer = None;
                        snapshot_tx.send_replace(BalanceSnapshot::disconnected());
                    }
                    Some(account) => {
                        timer = Some(poll_timer(config.poll_interval));
                        begin_fetch(&client, account, epoch, &mut in_flight, &snapshot_tx);
                    }
                }
            }
            Some(()) = refresh_rx.recv() => {
                match &account {
                    None => {
                        snapshot_tx.send_replace(BalanceSnapshot::disconnected());
                    }
                    Some(account) => {
                        begin_fetch(&client, account, epoch, &mut in_flight, &snapshot_tx);
                    }
                }
            }
            _ = next_tick(&mut timer) => {
                if let Some(account) = &account {
                    begin_fetch(&client, account, epoch, &mut in_flight, &snapshot_tx);
                }
            }
            Some((fetch_epoch, outcome)) = in_flight.next(), if !in_flight.is_empty() => {
                if fetch_epoch != epoch {
                    debug!("discarding stale balance result");
                    continue;
                }
                let next = match outcome {
                    Ok(native_units) => BalanceSnapshot {
                        amount: Some(native_units as f64 / config.unit_divisor as f64),
                        is_loading: false,
                        error: None,
                    },
                    Err(err) => {
                        warn!(?err, "balance fetch failed");
                        BalanceSnapshot {
                            amount: None,
                            is_loading: false,
                            error: Some(err.to_string()),
                        }
                    }
                };
                snapshot_tx.send_replace(next);
            }
        }
    }
}

fn begin_fetch<C: LedgerClient>(
    client: &C,
    account: &AccountId,
    epoch: u64,
    in_flight: &mut FuturesUnordered<BoxFuture<'static, FetchOutcome>>,
    snapshot_tx: &watch::Sender<BalanceSnapshot>,
) {
    snapshot_tx.send_modify(|snapshot| {
        snapshot.is_loading = true;
        snapshot.error = None;
    });
    debug!(account = %account, "balance fetch started");
    let client = client.clone();
    let account = account.clone();
    in_flight.push(Box::pin(async move {
        (epoch, client.get_balance(&account).await)
    }));
}

fn poll_timer(period: Duration) -> time::Interval {
    // First tick lands one full period out; the identity change itself
    // already triggered a fetch.
    time::interval_at(Instant::now() + period, period)
}

async fn next_tick(timer: &mut Option<time::Interval>) {
    match timer {
        Some(interval) => {
            interval.tick().await;
        }
        // No identity: polling is parked until the next identity change.
        None => std::future::pending().await,
    }
}
