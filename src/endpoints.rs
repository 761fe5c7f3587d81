//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/budgets/{budget_id}', use the matching
//! `format_*` function.

/// The route for starting the bank linking flow.
pub const LINK_TOKEN: &str = "/api/provider/link_token";
/// The route for finishing the bank linking flow.
pub const EXCHANGE_PUBLIC_TOKEN: &str = "/api/provider/exchange";
/// The route for fetching and reconciling transactions from every linked bank.
pub const SYNC_TRANSACTIONS: &str = "/api/transactions/sync";
/// The route for listing and setting transaction categories.
pub const CATEGORIZATIONS: &str = "/api/categorizations";
/// The route for listing transactions waiting to be categorized by hand.
pub const MANUAL_REVIEW: &str = "/api/manual_review";
/// The route for listing and creating budgets.
pub const BUDGETS: &str = "/api/budgets";
/// The route for updating and deleting a budget.
pub const BUDGET: &str = "/api/budgets/{budget_id}";

/// Replace the `{budget_id}` parameter in [BUDGET] with `budget_id`.
#[cfg(test)]
pub fn format_budget_endpoint(budget_id: i64) -> String {
    BUDGET.replace("{budget_id}", &budget_id.to_string())
}
