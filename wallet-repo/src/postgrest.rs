//! Remote mirror adapter for a PostgREST endpoint (e.g. Supabase).
//!
//! Expects two tables: `expenses` (one row per expense, keyed by `id`) and
//! `holdings` (a single row keyed by `id = 'default'`).

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use tracing::debug;

use wallet_types::{Expense, ExpenseId, Holdings, RemoteMirror, RepoError};

use crate::types::{RemoteExpense, RemoteHoldings};

const EXPENSES_TABLE: &str = "expenses";
const HOLDINGS_TABLE: &str = "holdings";

/// Connection settings for the remote store.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub url: String,
    pub api_key: String,
}

/// PostgREST client implementing the `RemoteMirror` port.
pub struct PostgrestMirror {
    base_url: String,
    api_key: String,
    http: Client,
}

impl PostgrestMirror {
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            http: Client::new(),
        }
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn upsert(&self, table: &str) -> RequestBuilder {
        self.request(Method::POST, table)
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, RepoError> {
        let resp = req
            .send()
            .await
            .map_err(|e| RepoError::Remote(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(RepoError::Remote(format!("HTTP {}: {}", status.as_u16(), body)))
        }
    }
}

#[async_trait]
impl RemoteMirror for PostgrestMirror {
    async fn upsert_expense(&self, expense: &Expense) -> Result<(), RepoError> {
        debug!(expense_id = %expense.id, "Mirroring expense upsert");
        let row = RemoteExpense::from(expense);
        self.send(self.upsert(EXPENSES_TABLE).json(&[row])).await?;
        Ok(())
    }

    async fn delete_expense(&self, id: &ExpenseId) -> Result<(), RepoError> {
        debug!(expense_id = %id, "Mirroring expense delete");
        let req = self
            .request(Method::DELETE, EXPENSES_TABLE)
            .query(&[("id", format!("eq.{}", id))]);
        self.send(req).await?;
        Ok(())
    }

    async fn clear_expenses(&self) -> Result<(), RepoError> {
        let req = self
            .request(Method::DELETE, EXPENSES_TABLE)
            .query(&[("id", "not.is.null")]);
        self.send(req).await?;
        Ok(())
    }

    async fn list_expenses(&self) -> Result<Vec<Expense>, RepoError> {
        let req = self
            .request(Method::GET, EXPENSES_TABLE)
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        let rows: Vec<RemoteExpense> = self
            .send(req)
            .await?
            .json()
            .await
            .map_err(|e| RepoError::Remote(e.to_string()))?;

        rows.into_iter().map(RemoteExpense::into_domain).collect()
    }

    async fn upsert_holdings(&self, holdings: &Holdings) -> Result<(), RepoError> {
        let row = RemoteHoldings::from_domain(holdings);
        self.send(self.upsert(HOLDINGS_TABLE).json(&[row])).await?;
        Ok(())
    }
}
