use std::time::Instant;

use axum::{Extension, Json, extract::State};
use futures::future::join_all;
use serde::Serialize;

use crate::{
    Error, UserID,
    db::lock_connection,
    linked_item::get_linked_items,
    provider::{ProviderState, parse_provider_transactions},
    reconcile::{ReconcileSummary, reconcile_transactions},
};

/// The response for a transaction sync.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    #[serde(flatten)]
    summary: ReconcileSummary,
    /// The linked banks whose transactions could not be fetched.
    failed_items: Vec<String>,
}

/// A route handler that fetches recent transactions from every bank the
/// user has linked and reconciles them.
///
/// Banks are fetched concurrently. A bank that fails to respond is listed in
/// `failedItems` and the transactions from the other banks are still
/// reconciled.
pub async fn sync_transactions_endpoint(
    State(state): State<ProviderState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<SyncResponse>, Error> {
    let start_time = Instant::now();

    let linked_items = {
        let connection = lock_connection(&state.db_connection)?;
        get_linked_items(user_id, &connection)?
    };

    let fetches = linked_items
        .iter()
        .map(|item| state.provider.fetch_transactions(&item.access_token));
    let results = join_all(fetches).await;

    let mut raw_transactions = Vec::new();
    let mut failed_items = Vec::new();

    for (item, result) in linked_items.iter().zip(results) {
        match result {
            Ok(transactions) => raw_transactions.extend(transactions),
            Err(error) => {
                tracing::error!(
                    "Could not fetch transactions for item {} of user {user_id}: {error}",
                    item.item_id
                );
                failed_items.push(item.item_id.clone());
            }
        }
    }

    let transactions = parse_provider_transactions(raw_transactions);

    let summary = {
        let connection = lock_connection(&state.db_connection)?;
        reconcile_transactions(user_id, &transactions, &connection)?
    };

    tracing::info!(
        "Synced {} transactions from {} items for user {user_id} in {:.1}ms: {} categorized, {} queued for review, {} items failed",
        transactions.len(),
        linked_items.len(),
        start_time.elapsed().as_secs_f64() * 1000.0,
        summary.auto_count,
        summary.manual_count,
        failed_items.len(),
    );

    Ok(Json(SyncResponse {
        summary,
        failed_items,
    }))
}
