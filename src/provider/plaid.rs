//! An HTTP client for a Plaid-style banking-data API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use time::{Date, OffsetDateTime};

use crate::{
    ProviderConfig, UserID,
    config::MAX_HISTORY_DAYS,
    provider::{BankingProvider, ItemCredentials, LinkToken, ProviderError},
};

const CLIENT_NAME: &str = "Ledgerly";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TRANSACTIONS_PAGE_SIZE: usize = 500;

/// A [BankingProvider] that calls the provider's JSON API over HTTPS.
pub struct PlaidClient {
    config: ProviderConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct TransactionsPage {
    transactions: Vec<Value>,
    total_transactions: usize,
}

impl PlaidClient {
    /// Create a client with a request timeout applied to every call.
    ///
    /// # Errors
    /// Returns [ProviderError::Connection] if the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| ProviderError::Connection(error.to_string()))?;

        Ok(Self { config, client })
    }

    async fn post<R: DeserializeOwned>(&self, path: &str, body: Value) -> Result<R, ProviderError> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|error| ProviderError::Connection(format!("{path}: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|error| ProviderError::InvalidResponse(format!("{path}: {error}")))
    }
}

#[async_trait]
impl BankingProvider for PlaidClient {
    async fn create_link_token(&self, user_id: UserID) -> Result<LinkToken, ProviderError> {
        self.post(
            "/link/token/create",
            json!({
                "client_id": self.config.client_id,
                "secret": self.config.secret,
                "client_name": CLIENT_NAME,
                "user": {"client_user_id": user_id.to_string()},
                "products": ["transactions"],
                "country_codes": ["US"],
                "language": "en",
            }),
        )
        .await
    }

    async fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> Result<ItemCredentials, ProviderError> {
        self.post(
            "/item/public_token/exchange",
            json!({
                "client_id": self.config.client_id,
                "secret": self.config.secret,
                "public_token": public_token,
            }),
        )
        .await
    }

    async fn fetch_transactions(&self, access_token: &str) -> Result<Vec<Value>, ProviderError> {
        let (start_date, end_date) =
            transactions_window(OffsetDateTime::now_utc().date(), self.config.history_days);
        let mut transactions = Vec::new();

        loop {
            let page: TransactionsPage = self
                .post(
                    "/transactions/get",
                    json!({
                        "client_id": self.config.client_id,
                        "secret": self.config.secret,
                        "access_token": access_token,
                        "start_date": start_date.to_string(),
                        "end_date": end_date.to_string(),
                        "options": {
                            "count": TRANSACTIONS_PAGE_SIZE,
                            "offset": transactions.len(),
                        },
                    }),
                )
                .await?;

            let page_length = page.transactions.len();
            transactions.extend(page.transactions);

            if page_length == 0 || transactions.len() >= page.total_transactions {
                break;
            }
        }

        tracing::debug!("Fetched {} transactions from the provider", transactions.len());

        Ok(transactions)
    }
}

/// The inclusive date range covering the last `history_days` days up to `today`.
///
/// `history_days` is clamped to `0..=MAX_HISTORY_DAYS`.
fn transactions_window(today: Date, history_days: i64) -> (Date, Date) {
    let history_days = history_days.clamp(0, MAX_HISTORY_DAYS);
    let start_date = today.saturating_sub(time::Duration::days(history_days));

    (start_date, today)
}
