//! Shared fixtures for unit and route handler tests.

#![allow(missing_docs)]

use std::{
    collections::HashMap,
    sync::{
        Arc, MutexGuard,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use axum::{Router, routing::post};
use axum_extra::extract::{PrivateCookieJar, cookie::Cookie};
use axum_test::TestServer;
use rusqlite::Connection;
use serde_json::{Value, json};

use crate::{
    AppState, UserID,
    auth::COOKIE_USER_ID,
    build_router,
    db::initialize,
    provider::{BankingProvider, ItemCredentials, LinkToken, ProviderError, ProviderTransaction},
    user::create_user,
};

const TEST_LOG_IN_ROUTE: &str = "/test/log_in";

static USER_COUNT: AtomicUsize = AtomicUsize::new(0);

/// An in-memory database with every table created.
pub fn get_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&connection).expect("Could not initialize database");
    connection
}

/// Insert a user with a unique email and return their ID.
pub fn create_test_user(connection: &Connection) -> UserID {
    let n = USER_COUNT.fetch_add(1, Ordering::Relaxed);

    create_user(&format!("user{n}@example.com"), connection)
        .expect("Could not create test user")
        .id
}

/// A provider record with an optional primary category code.
pub fn provider_transaction(transaction_id: &str, category_code: Option<&str>) -> ProviderTransaction {
    let mut data = json!({"transaction_id": transaction_id, "amount": 12.34});
    if let Some(code) = category_code {
        data["personal_finance_category"] = json!({"primary": code});
    }

    ProviderTransaction {
        transaction_id: transaction_id.to_owned(),
        category_code: category_code.map(str::to_owned),
        data,
    }
}

/// A [BankingProvider] that answers from canned data.
///
/// Public tokens of the form `public-X` exchange for `item-X` and `access-X`,
/// except `public-expired`, which the provider rejects.
#[derive(Default)]
pub struct StubProvider {
    transactions: HashMap<String, Result<Vec<Value>, ProviderError>>,
}

impl StubProvider {
    /// Return `transactions` when fetching for `access_token`.
    pub fn with_transactions(mut self, access_token: &str, transactions: Vec<Value>) -> Self {
        self.transactions
            .insert(access_token.to_owned(), Ok(transactions));
        self
    }

    /// Fail with `error` when fetching for `access_token`.
    pub fn with_failure(mut self, access_token: &str, error: ProviderError) -> Self {
        self.transactions.insert(access_token.to_owned(), Err(error));
        self
    }
}

#[async_trait]
impl BankingProvider for StubProvider {
    async fn create_link_token(&self, user_id: UserID) -> Result<LinkToken, ProviderError> {
        Ok(LinkToken {
            link_token: format!("link-sandbox-{user_id}"),
            expiration: None,
        })
    }

    async fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> Result<ItemCredentials, ProviderError> {
        match public_token.strip_prefix("public-") {
            Some("expired") | None => Err(ProviderError::Status {
                status: 400,
                body: "INVALID_PUBLIC_TOKEN".to_owned(),
            }),
            Some(name) => Ok(ItemCredentials {
                access_token: format!("access-{name}"),
                item_id: format!("item-{name}"),
            }),
        }
    }

    async fn fetch_transactions(&self, access_token: &str) -> Result<Vec<Value>, ProviderError> {
        self.transactions
            .get(access_token)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// The full router backed by an in-memory database and a [StubProvider].
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
}

impl TestApp {
    pub fn new(provider: StubProvider) -> Self {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        let state = AppState::new(connection, "42", Arc::new(provider))
            .expect("Could not create app state");

        // Stands in for the log-in service that issues the auth cookie.
        let log_in = Router::new()
            .route(TEST_LOG_IN_ROUTE, post(stub_log_in_route))
            .with_state(state.clone());
        let app = build_router(state.clone()).merge(log_in);

        Self {
            server: TestServer::new(app),
            state,
        }
    }

    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.state
            .db_connection
            .lock()
            .expect("Could not acquire database lock")
    }

    /// Register a new user and return their ID with a valid auth cookie.
    pub async fn log_in_new_user(&self) -> (UserID, Cookie<'static>) {
        let user_id = create_test_user(&self.connection());

        let response = self
            .server
            .post(TEST_LOG_IN_ROUTE)
            .text(user_id.to_string())
            .await;
        response.assert_status_ok();

        (user_id, response.cookie(COOKIE_USER_ID))
    }
}

async fn stub_log_in_route(jar: PrivateCookieJar, user_id: String) -> PrivateCookieJar {
    jar.add(Cookie::new(COOKIE_USER_ID, user_id))
}
