//! Sorting freshly fetched provider transactions into categorizations and
//! the manual-review queue.
//!
//! Ingestion is idempotent: transactions that are already categorized or
//! queued are filtered out up front with one query per table, and the
//! remaining writes use `ON CONFLICT DO NOTHING`, so re-running a batch
//! changes nothing. Ingestion never overwrites an existing categorization,
//! whereas [crate::categorization::categorize_transaction] always does.

mod sync_endpoint;

use std::collections::HashSet;

use rusqlite::Connection;
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error, UserID,
    categorization::{
        create_categorization_tables, display_category, get_categorized_transaction_ids,
        get_pending_review_transaction_ids, insert_categorization_if_absent,
        insert_manual_review_if_absent, is_auto_categorizable,
    },
    provider::ProviderTransaction,
};

pub use sync_endpoint::sync_transactions_endpoint;

/// The outcome of reconciling a batch of transactions.
///
/// The counts are the number of transactions sorted into each bucket, which
/// includes any whose individual write failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    /// Transactions given a category by the rule table.
    pub auto_count: usize,
    /// Transactions queued for manual review.
    pub manual_count: usize,
}

/// Where a transaction that has not been seen before should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The rule table knows the provider's category code.
    Auto {
        /// The display name of the category.
        category: String,
    },
    /// The user has to pick a category.
    Manual,
}

/// Decide whether a transaction can be categorized automatically.
pub fn classify(transaction: &ProviderTransaction) -> Classification {
    match transaction.category_code.as_deref() {
        Some(code) if is_auto_categorizable(code) => Classification::Auto {
            category: display_category(code),
        },
        _ => Classification::Manual,
    }
}

/// Categorize or queue every transaction in `transactions` that the user
/// has not seen before.
///
/// A failed write for one transaction is logged and skipped, the rest of
/// the batch is still written.
///
/// # Errors
///
/// Returns [Error::StoreUnavailable] if the existing categorizations or
/// review queue could not be read. Nothing is written in that case.
pub fn reconcile_transactions(
    user_id: UserID,
    transactions: &[ProviderTransaction],
    connection: &Connection,
) -> Result<ReconcileSummary, Error> {
    let unseen = filter_unseen_transactions(user_id, transactions, connection)?;
    if unseen.is_empty() {
        return Ok(ReconcileSummary::default());
    }

    let mut auto = Vec::new();
    let mut manual = Vec::new();

    for transaction in unseen {
        match classify(transaction) {
            Classification::Auto { category } => auto.push((transaction, category)),
            Classification::Manual => manual.push(transaction),
        }
    }

    let created_at = OffsetDateTime::now_utc();

    for (transaction, category) in &auto {
        if let Err(error) = insert_categorization_if_absent(
            user_id,
            &transaction.transaction_id,
            category,
            &transaction.data,
            created_at,
            connection,
        ) {
            tracing::warn!(
                "Could not categorize transaction {} for user {user_id}: {error}",
                transaction.transaction_id
            );
        }
    }

    for transaction in &manual {
        if let Err(error) = insert_manual_review_if_absent(
            user_id,
            &transaction.transaction_id,
            &transaction.data,
            created_at,
            connection,
        ) {
            tracing::warn!(
                "Could not queue transaction {} for review for user {user_id}: {error}",
                transaction.transaction_id
            );
        }
    }

    Ok(ReconcileSummary {
        auto_count: auto.len(),
        manual_count: manual.len(),
    })
}

/// Keep the transactions that are neither categorized nor queued for
/// review, dropping repeats of the same ID within the batch.
fn filter_unseen_transactions<'a>(
    user_id: UserID,
    transactions: &'a [ProviderTransaction],
    connection: &Connection,
) -> Result<Vec<&'a ProviderTransaction>, Error> {
    if transactions.is_empty() {
        return Ok(Vec::new());
    }

    let categorized = query_with_table_retry(connection, |connection| {
        get_categorized_transaction_ids(user_id, connection)
    })?;
    let pending = query_with_table_retry(connection, |connection| {
        get_pending_review_transaction_ids(user_id, connection)
    })?;

    let mut seen_in_batch = HashSet::new();

    Ok(transactions
        .iter()
        .filter(|&transaction| {
            let id = transaction.transaction_id.as_str();
            !categorized.contains(id) && !pending.contains(id) && seen_in_batch.insert(id)
        })
        .collect())
}

/// Run `query`, creating the categorization tables and retrying once if
/// they do not exist.
fn query_with_table_retry<T>(
    connection: &Connection,
    query: impl Fn(&Connection) -> Result<T, rusqlite::Error>,
) -> Result<T, Error> {
    match query(connection) {
        Ok(result) => Ok(result),
        Err(error) if is_missing_table(&error) => {
            tracing::warn!("Categorization tables are missing, creating them: {error}");
            create_categorization_tables(connection).map_err(store_unavailable)?;
            query(connection).map_err(store_unavailable)
        }
        Err(error) => Err(store_unavailable(error)),
    }
}

fn is_missing_table(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(_, Some(message)) if message.starts_with("no such table")
    )
}

fn store_unavailable(error: rusqlite::Error) -> Error {
    Error::StoreUnavailable(error.to_string())
}
