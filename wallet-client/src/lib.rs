//! # Wallet Client SDK
//!
//! A typed Rust client for the Wallet API, plus [`RatePoller`] for processes
//! that want to keep an up-to-date rate snapshot.

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use wallet_types::{
    AddExpenseRequest, BackupDocument, CurrencyCode, Expense, Holdings, ImportReport,
    RateSnapshot, SummaryResponse, UpdateHoldingRequest,
};

mod poller;

pub use poller::{PollState, PollerConfig, RatePoller, RateSource};

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status returned by the API, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Wallet API client.
#[derive(Clone)]
pub struct WalletClient {
    base_url: String,
    http: Client,
}

impl WalletClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    /// Current exchange rates (possibly stale).
    pub async fn rates(&self) -> Result<RateSnapshot, ClientError> {
        self.send(self.request(Method::GET, "/api/rates")).await
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Holdings
    // ─────────────────────────────────────────────────────────────────────────────

    pub async fn holdings(&self) -> Result<Holdings, ClientError> {
        self.send(self.request(Method::GET, "/api/holdings")).await
    }

    pub async fn update_holding(
        &self,
        currency: CurrencyCode,
        value: f64,
    ) -> Result<Holdings, ClientError> {
        let req = self
            .request(Method::PUT, &format!("/api/holdings/{}", currency))
            .json(&UpdateHoldingRequest { value });
        self.send(req).await
    }

    pub async fn replace_holdings(&self, holdings: &Holdings) -> Result<Holdings, ClientError> {
        self.send(self.request(Method::PUT, "/api/holdings").json(holdings))
            .await
    }

    pub async fn reset_holdings(&self) -> Result<Holdings, ClientError> {
        self.send(self.request(Method::DELETE, "/api/holdings"))
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Expenses
    // ─────────────────────────────────────────────────────────────────────────────

    /// Lists expenses, newest first.
    pub async fn expenses(&self) -> Result<Vec<Expense>, ClientError> {
        self.send(self.request(Method::GET, "/api/expenses")).await
    }

    pub async fn add_expense(&self, req: &AddExpenseRequest) -> Result<Expense, ClientError> {
        self.send(self.request(Method::POST, "/api/expenses").json(req))
            .await
    }

    pub async fn remove_expense(&self, id: &str) -> Result<(), ClientError> {
        self.send_empty(self.request(Method::DELETE, &format!("/api/expenses/{}", id)))
            .await
    }

    /// Restores the most recently removed expense.
    pub async fn restore_expense(&self) -> Result<Expense, ClientError> {
        self.send(self.request(Method::POST, "/api/expenses/restore"))
            .await
    }

    pub async fn clear_expenses(&self) -> Result<(), ClientError> {
        self.send_empty(self.request(Method::DELETE, "/api/expenses"))
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Summary & backup
    // ─────────────────────────────────────────────────────────────────────────────

    pub async fn summary(&self) -> Result<SummaryResponse, ClientError> {
        self.send(self.request(Method::GET, "/api/summary")).await
    }

    pub async fn export_backup(&self) -> Result<BackupDocument, ClientError> {
        self.send(self.request(Method::GET, "/api/backup")).await
    }

    /// Imports a backup. The document is sent as-is; the server keeps what is valid.
    pub async fn import_backup(
        &self,
        document: &serde_json::Value,
    ) -> Result<ImportReport, ClientError> {
        self.send(self.request(Method::POST, "/api/backup").json(document))
            .await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn send_empty(&self, req: RequestBuilder) -> Result<(), ClientError> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(api_error(status, resp).await)
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(api_error(status, resp).await)
        }
    }
}

/// Builds an `Api` error from a `{message}` body, falling back to the raw body.
async fn api_error(status: StatusCode, resp: reqwest::Response) -> ClientError {
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or(body);
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_client_creation() {
        let client = WalletClient::new("http://localhost:3000");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_client_with_trailing_slash() {
        let client = WalletClient::new("http://localhost:3000/");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[tokio::test]
    async fn test_rates_decodes_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/rates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "localPerUsd": 60000,
                "localPerEur": 62000,
                "localPerUsdt": 60050,
                "asOf": "2024-01-01T00:00:00Z",
                "stale": true,
                "error": "Rate provider returned 503 Service Unavailable"
            })))
            .mount(&server)
            .await;

        let rates = WalletClient::new(server.uri()).rates().await.unwrap();

        assert_eq!(rates.local_per_usdt, 60_050);
        assert!(rates.stale);
        assert!(rates.error_message.is_some());
    }

    #[tokio::test]
    async fn test_error_body_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/rates"))
            .respond_with(
                ResponseTemplate::new(429).set_body_json(json!({"message": "Slow down"})),
            )
            .mount(&server)
            .await;

        let err = WalletClient::new(server.uri()).rates().await.unwrap_err();

        assert!(matches!(
            err,
            ClientError::Api { status: 429, ref message } if message == "Slow down"
        ));
        assert_eq!(err.status(), Some(429));
    }

    #[tokio::test]
    async fn test_update_holding_sends_value() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/holdings/USDT"))
            .and(body_json(json!({"value": 3.5})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "IRT": 0.0, "USD": 0.0, "EUR": 0.0, "USDT": 3.5
            })))
            .expect(1)
            .mount(&server)
            .await;

        let holdings = WalletClient::new(server.uri())
            .update_holding(CurrencyCode::USDT, 3.5)
            .await
            .unwrap();

        assert_eq!(holdings.usdt, 3.5);
    }

    #[tokio::test]
    async fn test_remove_expense_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/expenses/abc"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"message": "Expense abc not found"})),
            )
            .mount(&server)
            .await;

        let err = WalletClient::new(server.uri())
            .remove_expense("abc")
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(404));
    }
}
