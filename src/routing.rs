//! Application router configuration.

use axum::{
    Router,
    extract::FromRef,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};

use crate::{
    AppState, Error,
    auth::{AuthState, auth_guard},
    budget::{
        create_budget_endpoint, delete_budget_endpoint, get_budgets_endpoint,
        update_budget_endpoint,
    },
    categorization::{
        categorize_transaction_endpoint, get_categorizations_endpoint, get_manual_review_endpoint,
    },
    endpoints,
    provider::{create_link_token_endpoint, exchange_public_token_endpoint},
    reconcile::sync_transactions_endpoint,
};

/// Return a router with all the app's routes.
///
/// Every route requires a valid auth cookie.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::LINK_TOKEN, post(create_link_token_endpoint))
        .route(
            endpoints::EXCHANGE_PUBLIC_TOKEN,
            post(exchange_public_token_endpoint),
        )
        .route(endpoints::SYNC_TRANSACTIONS, post(sync_transactions_endpoint))
        .route(
            endpoints::CATEGORIZATIONS,
            get(get_categorizations_endpoint).post(categorize_transaction_endpoint),
        )
        .route(endpoints::MANUAL_REVIEW, get(get_manual_review_endpoint))
        .route(
            endpoints::BUDGETS,
            get(get_budgets_endpoint).post(create_budget_endpoint),
        )
        .route(
            endpoints::BUDGET,
            put(update_budget_endpoint).delete(delete_budget_endpoint),
        )
        .route_layer(middleware::from_fn_with_state(
            AuthState::from_ref(&state),
            auth_guard,
        ))
        .fallback(get_404_not_found)
        .with_state(state)
}

async fn get_404_not_found() -> Response {
    Error::NotFound.into_response()
}
