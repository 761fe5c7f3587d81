//! The banking-data provider: the trait the rest of the app talks to, the
//! HTTP client that implements it, and the transaction records it returns.

mod endpoints;
mod plaid;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::FromRef;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AppState, Error, UserID};

pub use endpoints::{create_link_token_endpoint, exchange_public_token_endpoint};
pub use plaid::PlaidClient;

/// The errors returned by a [BankingProvider].
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ProviderError {
    /// The provider could not be reached or the request timed out.
    #[error("could not reach the banking provider: {0}")]
    Connection(String),

    /// The provider answered with a non-success status code.
    #[error("the banking provider returned status {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body, for the logs.
        body: String,
    },

    /// The provider's response did not have the expected shape.
    #[error("could not parse the banking provider response: {0}")]
    InvalidResponse(String),
}

impl From<ProviderError> for Error {
    fn from(error: ProviderError) -> Self {
        Error::Provider(error.to_string())
    }
}

/// A short-lived token the client uses to open the provider's bank linking flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkToken {
    /// The token to hand to the linking flow.
    pub link_token: String,
    /// When the token stops working, as reported by the provider.
    #[serde(default)]
    pub expiration: Option<String>,
}

/// The long-lived credentials for one linked bank.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemCredentials {
    /// The token used to fetch data for the bank.
    pub access_token: String,
    /// The provider's ID for the linked bank.
    pub item_id: String,
}

/// A source of bank data for the app's users.
#[async_trait]
pub trait BankingProvider: Send + Sync {
    /// Create a token for starting the bank linking flow for `user_id`.
    async fn create_link_token(&self, user_id: UserID) -> Result<LinkToken, ProviderError>;

    /// Swap the public token from a finished linking flow for long-lived credentials.
    async fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> Result<ItemCredentials, ProviderError>;

    /// Fetch the raw transaction records for one linked bank.
    async fn fetch_transactions(&self, access_token: &str) -> Result<Vec<Value>, ProviderError>;
}

/// The state needed by routes that call the banking provider.
#[derive(Clone)]
pub struct ProviderState {
    /// The database connection for linked items and categorizations.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The client for the banking-data provider.
    pub provider: Arc<dyn BankingProvider>,
}

impl FromRef<AppState> for ProviderState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            provider: state.provider.clone(),
        }
    }
}

/// A transaction record from the provider.
///
/// Only the fields used for categorization are pulled out, the full record
/// is kept as-is in `data` with its key order preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderTransaction {
    /// The provider-assigned ID, unique per user.
    pub transaction_id: String,
    /// The provider's primary category code, e.g. `TRANSFER_IN`.
    pub category_code: Option<String>,
    /// The full provider record, always a JSON object.
    pub data: Value,
}

impl ProviderTransaction {
    /// Read a provider record.
    ///
    /// Returns `None` if `value` is not an object or does not have a
    /// non-empty string `transaction_id`.
    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }

        let transaction_id = value
            .get("transaction_id")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())?
            .to_owned();

        let category_code = value
            .get("personal_finance_category")
            .and_then(|category| category.get("primary"))
            .and_then(Value::as_str)
            .map(str::to_owned);

        Some(Self {
            transaction_id,
            category_code,
            data: value,
        })
    }
}

/// Read a batch of provider records, skipping any without a usable transaction ID.
pub fn parse_provider_transactions(values: Vec<Value>) -> Vec<ProviderTransaction> {
    let mut transactions = Vec::with_capacity(values.len());

    for value in values {
        match ProviderTransaction::from_value(value) {
            Some(transaction) => transactions.push(transaction),
            None => tracing::warn!("Skipping provider record without a valid transaction_id"),
        }
    }

    transactions
}
