use crate::balance::{
    AccountId,
    SyncConfig,
};

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";
pub const DEFAULT_GAME_ID: &str = "rps";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub rpc_url: String,
    /// Account to watch; absent means no wallet is connected.
    pub account: Option<AccountId>,
    pub default_game: String,
    pub sync: SyncConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            account: None,
            default_game: DEFAULT_GAME_ID.to_string(),
            sync: SyncConfig::default(),
        }
    }
}
