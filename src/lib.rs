//! Ledgerly is the JSON API behind a personal budgeting app.
//!
//! It links bank accounts through a banking-data provider, pulls their
//! transactions, and sorts each one into either an automatic category or a
//! queue for manual review. Budgets are managed through the same API.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
mod auth;
mod budget;
mod categorization;
mod config;
mod db;
mod endpoints;
mod linked_item;
mod logging;
mod provider;
mod reconcile;
mod routing;
mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use categorization::{display_category, is_auto_categorizable};
pub use config::{
    DEFAULT_HISTORY_DAYS, MAX_HISTORY_DAYS, ProviderConfig, ProviderEnvironment,
};
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use provider::{BankingProvider, PlaidClient, ProviderError, ProviderTransaction};
pub use reconcile::{Classification, ReconcileSummary, classify, reconcile_transactions};
pub use routing::build_router;
pub use user::{User, UserID};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request did not carry a valid auth cookie, or the cookie belongs
    /// to a user that no longer exists.
    #[error("missing or invalid auth cookie")]
    Unauthorized,

    /// A required text field was empty or only whitespace.
    ///
    /// Callers should pass in the name of the field as it appears in the
    /// request body.
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    /// A budget amount was negative, infinite or NaN.
    #[error("{0} is not a valid budget amount")]
    InvalidBudgetAmount(f64),

    /// The user already has a budget for the category.
    #[error("a budget for the category \"{0}\" already exists")]
    DuplicateBudgetCategory(String),

    /// The bank is already linked by a different user.
    #[error("this bank is already linked to another account")]
    ItemLinkedToAnotherUser,

    /// Tried to update a budget that does not exist
    #[error("tried to update a budget that is not in the database")]
    UpdateMissingBudget,

    /// Tried to delete a budget that does not exist
    #[error("tried to delete a budget that is not in the database")]
    DeleteMissingBudget,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A call to the banking provider failed.
    ///
    /// The string holds the provider error and should only be logged.
    #[error("the banking provider request failed: {0}")]
    Provider(String),

    /// The categorization tables could not be read, so no ingestion can
    /// happen. The client may retry later.
    #[error("the categorization store is unavailable: {0}")]
    StoreUnavailable(String),

    /// An error occurred while serializing a value as JSON.
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            Error::EmptyField(_) | Error::InvalidBudgetAmount(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Error::DuplicateBudgetCategory(_) | Error::ItemLinkedToAnotherUser => {
                (StatusCode::CONFLICT, self.to_string())
            }
            Error::NotFound | Error::UpdateMissingBudget | Error::DeleteMissingBudget => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            Error::Provider(error) => {
                tracing::error!("Banking provider request failed: {error}");
                (
                    StatusCode::BAD_GATEWAY,
                    "The banking provider could not complete the request.".to_owned(),
                )
            }
            Error::StoreUnavailable(error) => {
                tracing::error!("Categorization store unavailable: {error}");
                let body = json!({
                    "error": "Transactions could not be processed right now, try again later.",
                    "retryable": true,
                });

                return (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response();
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_owned(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod error_response_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::Error;

    #[test]
    fn client_errors_map_to_client_status_codes() {
        let cases = [
            (Error::Unauthorized, StatusCode::UNAUTHORIZED),
            (Error::EmptyField("category"), StatusCode::BAD_REQUEST),
            (Error::InvalidBudgetAmount(-1.0), StatusCode::BAD_REQUEST),
            (
                Error::DuplicateBudgetCategory("Rent".to_owned()),
                StatusCode::CONFLICT,
            ),
            (Error::ItemLinkedToAnotherUser, StatusCode::CONFLICT),
            (Error::NotFound, StatusCode::NOT_FOUND),
            (Error::DeleteMissingBudget, StatusCode::NOT_FOUND),
        ];

        for (error, want_status) in cases {
            assert_eq!(error.into_response().status(), want_status);
        }
    }

    #[test]
    fn store_unavailable_is_service_unavailable() {
        let response = Error::StoreUnavailable("disk I/O error".to_owned()).into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn provider_error_is_bad_gateway() {
        let response = Error::Provider("timed out".to_owned()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        assert_eq!(
            Error::from(rusqlite::Error::QueryReturnedNoRows),
            Error::NotFound
        );
    }
}
