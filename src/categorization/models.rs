use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::UserID;

/// The category assigned to a provider transaction, either by the rule
/// table during ingestion or by the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Categorization {
    /// The user that owns the transaction.
    pub user_id: UserID,
    /// The provider-assigned transaction ID, unique per user.
    pub transaction_id: String,
    /// The display name of the category.
    pub category: String,
    /// The provider payload the category was assigned from, stored verbatim.
    pub source_data: Value,
    /// When the category was assigned. Refreshed when a user overwrites it.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A provider transaction waiting for the user to pick a category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualReviewEntry {
    /// The user that owns the transaction.
    pub user_id: UserID,
    /// The provider-assigned transaction ID, unique per user.
    pub transaction_id: String,
    /// The provider payload, stored verbatim.
    pub transaction_data: Value,
    /// When the transaction was queued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
