//! Client core for a catalog of peer-to-peer wagering games.
//!
//! Three pieces compose under a host view layer: a [`registry`] of game
//! descriptors with lazy, memoized module activation, a [`router`] that turns
//! a requested game id into a mountable module or a terminal failure state,
//! and a [`balance`] synchronizer that keeps a live view of the active
//! account's wallet balance on an external ledger.

pub mod balance;
pub mod config;
pub mod ledger;
pub mod registry;
pub mod router;

pub mod test_helpers;

pub use balance::{
    AccountId,
    BalanceSnapshot,
    BalanceSynchronizer,
    LedgerClient,
    SyncConfig,
};
pub use registry::{
    GameApp,
    GameDescriptor,
    GameMeta,
    GameRegistry,
    ModuleLoader,
    builtin_catalog,
};
pub use router::{
    GameRouter,
    Navigator,
    RouteState,
};
