//! Categorizations, the manual-review queue, and the rule table that decides between them.
//!
//! A transaction is either resolved (it has a [Categorization]) or pending
//! (it has a [ManualReviewEntry]), never both.

mod db;
mod endpoints;
mod models;
mod rules;

pub use db::{
    categorize_transaction, create_categorization_tables, get_categorizations,
    get_categorized_transaction_ids, get_manual_review_entries,
    get_pending_review_transaction_ids, get_review_transaction_data, insert_categorization_if_absent,
    insert_manual_review_if_absent,
};
pub use endpoints::{
    categorize_transaction_endpoint, get_categorizations_endpoint, get_manual_review_endpoint,
};
pub use models::{Categorization, ManualReviewEntry};
pub use rules::{display_category, is_auto_categorizable};

#[cfg(test)]
pub use db::get_categorization;
