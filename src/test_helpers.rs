use crate::{
    balance::{
        AccountId,
        LedgerClient,
    },
    registry::{
        GameApp,
        ModuleLoader,
    },
    router::Navigator,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use std::sync::{
    Arc,
    Mutex,
    atomic::{
        AtomicUsize,
        Ordering,
    },
};
use tokio::sync::{
    mpsc,
    oneshot,
};

/// Ledger double. Every `get_balance` call parks as a [`BalanceRequest`] on
/// the receiver handed out by [`FakeLedger::new_with_requests`]; the test
/// decides when and how each one completes.
#[derive(Clone)]
pub struct FakeLedger {
    requests: mpsc::Sender<BalanceRequest>,
}

pub struct BalanceRequest {
    account: AccountId,
    respond: oneshot::Sender<std::result::Result<u64, String>>,
}

impl BalanceRequest {
    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn succeed(self, native_units: u64) {
        let _ = self.respond.send(Ok(native_units));
    }

    pub fn fail(self, message: impl Into<String>) {
        let _ = self.respond.send(Err(message.into()));
    }
}

impl FakeLedger {
    pub fn new_with_requests() -> (Self, mpsc::Receiver<BalanceRequest>) {
        let (requests, receiver) = mpsc::channel(16);
        (Self { requests }, receiver)
    }
}

impl LedgerClient for FakeLedger {
    async fn get_balance(&self, account: &AccountId) -> Result<u64> {
        let (respond, outcome) = oneshot::channel();
        self.requests
            .send(BalanceRequest {
                account: account.clone(),
                respond,
            })
            .await
            .map_err(|_| eyre!("fake ledger dropped"))?;
        match outcome.await {
            Ok(Ok(native_units)) => Ok(native_units),
            Ok(Err(message)) => Err(eyre!(message)),
            Err(_) => Err(eyre!("fake ledger response dropped")),
        }
    }
}

/// Module loader double; counts loads and optionally fails every request.
#[derive(Clone, Default)]
pub struct FakeLoader {
    loads: Arc<AtomicUsize>,
    failure: Option<String>,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            loads: Arc::new(AtomicUsize::new(0)),
            failure: Some(message.into()),
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

pub struct FakeGame {
    title: String,
}

impl GameApp for FakeGame {
    fn title(&self) -> &str {
        &self.title
    }
}

impl ModuleLoader for FakeLoader {
    async fn load(&self, module_ref: &str) -> Result<Arc<dyn GameApp>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(eyre!("{message}")),
            None => Ok(Arc::new(FakeGame {
                title: module_ref.to_string(),
            })),
        }
    }
}

/// Records every path the router sends the user to.
#[derive(Default)]
pub struct FakeNavigator {
    visited: Mutex<Vec<String>>,
}

impl FakeNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

impl Navigator for FakeNavigator {
    fn go_to(&self, path: &str) {
        self.visited.lock().unwrap().push(path.to_string());
    }
}
