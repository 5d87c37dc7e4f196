//! Minimal JSON-RPC transport for registry reads.
//!
//! Calls fail over across the configured endpoint list and retry transient
//! failures with a small linear backoff (2 attempts, 300ms step). Callers
//! still get a `Result`; the degrade-to-default policy lives in `registry`.

use std::time::Duration;

use serde_json::{json, Value};

const HTTP_TIMEOUT_SECS: u64 = 20;
const RPC_ATTEMPTS: u32 = 2;
const RPC_BACKOFF: Duration = Duration::from_millis(300);

pub struct RpcClient {
    http: reqwest::Client,
    urls: Vec<String>,
}

impl RpcClient {
    pub fn new(urls: Vec<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self { http, urls }
    }

    /// Issue one JSON-RPC request, failing over across endpoints and
    /// retrying the whole list with linear backoff.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, String> {
        if self.urls.is_empty() {
            return Err("no RPC endpoints configured".to_string());
        }
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let mut last_err = String::new();
        for attempt in 0..RPC_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(RPC_BACKOFF * attempt).await;
            }
            for url in &self.urls {
                match self.request_one(url, &payload).await {
                    Ok(result) => return Ok(result),
                    Err(e) => {
                        log::warn!("[Rpc] {method} via {url} failed: {e}");
                        last_err = e;
                    }
                }
            }
        }
        Err(last_err)
    }

    async fn request_one(&self, url: &str, payload: &Value) -> Result<Value, String> {
        let resp = self
            .http
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| format!("RPC request failed: {e}"))?;

        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .map_err(|e| format!("RPC response not JSON: {e}"))?;

        if !status.is_success() {
            return Err(format!("RPC HTTP failure ({status}): {body}"));
        }
        if let Some(err) = body.get("error") {
            return Err(format!("RPC error: {err}"));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| "RPC response missing result".to_string())
    }

    /// `eth_call` against a contract; returns the raw hex result string.
    pub async fn eth_call(&self, to: &str, data: &str) -> Result<String, String> {
        let result = self
            .request("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| "eth_call returned non-string result".to_string())
    }
}
