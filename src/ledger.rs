use crate::balance::{
    AccountId,
    LedgerClient,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use serde::Deserialize;
use serde_json::json;
use std::fmt;

/// JSON-RPC 2.0 ledger endpoint speaking `getBalance`. Balances come back in
/// the ledger's native smallest unit.
#[derive(Clone)]
pub struct RpcLedgerClient {
    base_url: String,
    http: reqwest::Client,
}

impl RpcLedgerClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .build()
            .wrap_err("failed to build HTTP client for ledger")?;
        Ok(Self { base_url, http })
    }
}

impl LedgerClient for RpcLedgerClient {
    async fn get_balance(&self, account: &AccountId) -> Result<u64> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getBalance",
            "params": [account.as_str()],
        });
        let res = self
            .http
            .post(self.base_url.as_str())
            .json(&body)
            .send()
            .await
            .wrap_err("ledger request failed")?;
        let status = res.status();
        if !status.is_success() {
            let body = res
                .text()
                .await
                .unwrap_or_else(|_| "<unavailable body>".to_string());
            return Err(eyre!(
                "ledger responded with {status} when fetching balance: {body}"
            ));
        }
        let dto: RpcResponseDto = res
            .json()
            .await
            .wrap_err("invalid ledger balance payload")?;
        if let Some(err) = dto.error {
            return Err(eyre!(
                "ledger rejected getBalance: {} (code {})",
                err.message,
                err.code
            ));
        }
        let result = dto
            .result
            .ok_or_else(|| eyre!("ledger response carried neither result nor error"))?;
        Ok(result.value)
    }
}

impl fmt::Display for RpcLedgerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}

#[derive(Deserialize)]
struct RpcResponseDto {
    result: Option<BalanceResultDto>,
    error: Option<RpcErrorDto>,
}

#[derive(Deserialize)]
struct BalanceResultDto {
    value: u64,
}

#[derive(Deserialize)]
struct RpcErrorDto {
    code: i64,
    message: String,
}
