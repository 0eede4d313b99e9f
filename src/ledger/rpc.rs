//! JSON-RPC 2.0 transport to the ledger node.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Thin JSON-RPC client over the configured ledger endpoint. Each call
/// applies its own timeout; retries live in the gateway, not here.
pub struct RpcClient {
    http: Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: String, call_timeout: Duration) -> Result<Self, LedgerError> {
        let http = Client::builder()
            .timeout(call_timeout)
            .build()
            .map_err(|e| LedgerError::Unreachable(e.to_string()))?;
        Ok(Self {
            http,
            url,
            next_id: AtomicU64::new(1),
        })
    }

    /// Issue one JSON-RPC call. A missing `result` on a non-error
    /// response maps to [`LedgerError::NotFound`].
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, LedgerError> {
        self.call_inner(method, params, None).await
    }

    /// Like [`RpcClient::call`] with a per-call timeout override, used
    /// for transaction submission which carries its own budget.
    pub async fn call_with_timeout<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
        timeout: Duration,
    ) -> Result<T, LedgerError> {
        self.call_inner(method, params, Some(timeout)).await
    }

    async fn call_inner<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
        timeout: Option<Duration>,
    ) -> Result<T, LedgerError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let mut builder = self.http.post(&self.url).json(&request);
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LedgerError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Unreachable(format!(
                "ledger endpoint returned HTTP {}",
                status
            )));
        }

        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| LedgerError::MalformedResponse(e.to_string()))?;

        if let Some(err) = body.error {
            return Err(LedgerError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        body.result
            .ok_or_else(|| LedgerError::NotFound(format!("{} returned no result", method)))
    }

    /// Variant for calls where `null` is a meaningful answer (e.g. a
    /// receipt that is not yet available).
    pub async fn call_optional<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<T>, LedgerError> {
        match self.call(method, params).await {
            Ok(value) => Ok(Some(value)),
            Err(LedgerError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
