use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::ports::{ExecutionError, OrderAck, OrderExecution, RawActivityRecord, ScaledOrder, VenueQuery};

use super::auth::VenueAuth;
use super::types::{ApiActivityResponse, ApiBalance, ApiOrderRequest, ApiOrderResponse};

#[derive(Debug, Error)]
pub enum VenueError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("venue returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("authentication error: {0}")]
    Auth(#[from] super::auth::AuthError),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl From<VenueError> for ExecutionError {
    fn from(err: VenueError) -> Self {
        match err {
            VenueError::Http(e) if e.is_timeout() => ExecutionError::Timeout(e.to_string()),
            VenueError::Http(e) if e.is_connect() || e.is_request() => ExecutionError::Network(e.to_string()),
            VenueError::Http(e) if e.is_decode() => ExecutionError::Rejected(format!("undecodable response: {e}")),
            VenueError::Http(e) => ExecutionError::Network(e.to_string()),
            VenueError::Status { status, body } => classify_status(status, body),
            VenueError::Auth(e) => ExecutionError::Unauthorized(e.to_string()),
            VenueError::Unexpected(msg) => ExecutionError::Rejected(msg),
        }
    }
}

fn classify_status(status: StatusCode, body: String) -> ExecutionError {
    let msg = format!("{status}: {body}");
    match status {
        StatusCode::TOO_MANY_REQUESTS => ExecutionError::RateLimited(msg),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ExecutionError::Unauthorized(msg),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ExecutionError::Invalid(msg),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ExecutionError::Timeout(msg),
        s if s.is_server_error() => ExecutionError::Network(msg),
        _ => ExecutionError::Rejected(msg),
    }
}

/// REST client for the order venue: activity queries, order submission and
/// account balances. Signed requests carry HMAC headers when credentials
/// are configured.
#[derive(Debug, Clone)]
pub struct VenueClient {
    http: Client,
    base_url: String,
    auth: Option<VenueAuth>,
}

impl VenueClient {
    pub fn new(http: Client, base_url: impl Into<String>, auth: Option<VenueAuth>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.auth.is_some()
    }

    /// Attach signature headers for `method path body`.
    fn signed(
        &self,
        req: RequestBuilder,
        method: &str,
        path: &str,
        body: &str,
    ) -> Result<RequestBuilder, VenueError> {
        let Some(auth) = &self.auth else {
            return Ok(req);
        };
        let timestamp = Utc::now().timestamp().to_string();
        let signature = auth.sign(&timestamp, method, path, body)?;

        Ok(req
            .header("X-API-KEY", &auth.api_key)
            .header("X-SIGNATURE", signature)
            .header("X-TIMESTAMP", &timestamp)
            .header("X-PASSPHRASE", &auth.passphrase))
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, VenueError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(VenueError::Status { status, body })
    }

    /// Activity on `market` strictly after `since`, in venue order.
    pub async fn get_activity(
        &self,
        market: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<RawActivityRecord>, VenueError> {
        let path = format!("/markets/{market}/activity?since={}", since.timestamp_millis());
        let url = format!("{}{}", self.base_url, path);

        let req = self.signed(self.http.get(&url), "GET", &path, "")?;
        let resp = Self::check(req.send().await?).await?;

        let body: ApiActivityResponse = resp.json().await?;
        Ok(body.into_records())
    }

    /// Place one order. The client order id doubles as the idempotency key.
    pub async fn place_order(&self, order: &ScaledOrder) -> Result<ApiOrderResponse, VenueError> {
        let request = ApiOrderRequest {
            account: order.execution_account_key.clone(),
            market: order.market.clone(),
            side: order.side.as_str().to_string(),
            price: order.price,
            quantity: order.quantity,
            client_order_id: order.client_token.clone(),
        };
        let body = serde_json::to_string(&request)
            .map_err(|e| VenueError::Unexpected(format!("order serialization: {e}")))?;

        let path = "/orders";
        let url = format!("{}{}", self.base_url, path);
        let req = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Idempotency-Key", &order.client_token)
            .body(body.clone());
        let req = self.signed(req, "POST", path, &body)?;

        let resp = Self::check(req.send().await?).await?;
        let parsed: ApiOrderResponse = resp.json().await?;
        Ok(parsed)
    }

    /// Spendable balance on an execution account.
    pub async fn get_balance(&self, account: &str) -> Result<Decimal, VenueError> {
        let path = format!("/accounts/{account}/balance");
        let url = format!("{}{}", self.base_url, path);

        let req = self.signed(self.http.get(&url), "GET", &path, "")?;
        let resp = Self::check(req.send().await?).await?;

        let balance: ApiBalance = resp.json().await?;
        Ok(balance.available)
    }
}

#[async_trait]
impl VenueQuery for VenueClient {
    async fn query_recent_activity(
        &self,
        market: &str,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<RawActivityRecord>> {
        Ok(self.get_activity(market, since).await?)
    }
}

#[async_trait]
impl OrderExecution for VenueClient {
    async fn submit_scaled_order(&self, order: &ScaledOrder) -> Result<OrderAck, ExecutionError> {
        let resp = self.place_order(order).await?;

        if !resp.success {
            return Err(ExecutionError::Rejected(
                resp.error_msg.unwrap_or_else(|| "order not accepted".into()),
            ));
        }

        Ok(OrderAck {
            order_id: resp.order_id.unwrap_or_default(),
            external_reference: resp.tx_hash,
        })
    }
}
