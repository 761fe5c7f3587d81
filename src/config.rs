//! Configuration for the banking-data provider.

use std::fmt::Debug;

use clap::ValueEnum;

/// How many days of transactions are fetched on each sync by default.
pub const DEFAULT_HISTORY_DAYS: i64 = 30;
/// The longest history window the provider serves, in days.
pub const MAX_HISTORY_DAYS: i64 = 730;

/// Which of the provider's environments to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderEnvironment {
    /// Test institutions and fake credentials.
    Sandbox,
    /// Real institutions with a limited number of items.
    Development,
    /// Real institutions.
    Production,
}

impl ProviderEnvironment {
    /// The base URL of the provider's API for this environment.
    pub fn base_url(self) -> &'static str {
        match self {
            ProviderEnvironment::Sandbox => "https://sandbox.plaid.com",
            ProviderEnvironment::Development => "https://development.plaid.com",
            ProviderEnvironment::Production => "https://production.plaid.com",
        }
    }
}

/// The settings needed to call the provider's API.
///
/// The `Debug` output redacts the API secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// The base URL of the provider's API, without a trailing slash.
    pub base_url: String,
    /// The app's client ID.
    pub client_id: String,
    /// The app's API secret.
    pub secret: String,
    /// How many days of transactions to fetch on each sync.
    pub history_days: i64,
}

impl ProviderConfig {
    /// Create a config for `environment` with the default history window.
    pub fn new(environment: ProviderEnvironment, client_id: &str, secret: &str) -> Self {
        Self {
            base_url: environment.base_url().to_owned(),
            client_id: client_id.to_owned(),
            secret: secret.to_owned(),
            history_days: DEFAULT_HISTORY_DAYS,
        }
    }

    /// Override how many days of transactions are fetched on each sync.
    pub fn history_days(mut self, days: i64) -> Self {
        self.history_days = days;
        self
    }
}

impl Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("secret", &"********")
            .field("history_days", &self.history_days)
            .finish()
    }
}
