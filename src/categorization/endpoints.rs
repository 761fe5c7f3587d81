//! Route handlers for listing categorizations and the review queue, and for
//! categorizing a transaction by hand.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::{
    AppState, Error, UserID,
    categorization::{
        Categorization, ManualReviewEntry, categorize_transaction, get_categorizations,
        get_manual_review_entries, get_review_transaction_data,
    },
    db::lock_connection,
};

/// The state needed to read and write categorizations.
#[derive(Debug, Clone)]
pub struct CategorizationState {
    /// The database connection for managing categorizations.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategorizationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for categorizing a transaction by hand.
#[derive(Debug, Deserialize)]
pub struct CategorizeForm {
    /// The provider-assigned transaction ID.
    pub transaction_id: String,
    /// The category picked by the user.
    pub category: String,
    /// The provider payload the user was shown, stored alongside the category.
    ///
    /// When omitted, the payload queued for review is kept.
    #[serde(default)]
    pub transaction_data: Option<Value>,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// A route handler that lists the user's categorizations.
pub async fn get_categorizations_endpoint(
    State(state): State<CategorizationState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<Categorization>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_categorizations(user_id, &connection).map(Json)
}

/// A route handler that lists the transactions waiting for the user to categorize them.
pub async fn get_manual_review_endpoint(
    State(state): State<CategorizationState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<ManualReviewEntry>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_manual_review_entries(user_id, &connection).map(Json)
}

/// A route handler that sets a transaction's category, overwriting any
/// previous category and resolving its manual-review entry.
pub async fn categorize_transaction_endpoint(
    State(state): State<CategorizationState>,
    Extension(user_id): Extension<UserID>,
    Json(form): Json<CategorizeForm>,
) -> Result<Json<Categorization>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let transaction_data = match form.transaction_data {
        Some(data) => data,
        None => get_review_transaction_data(user_id, form.transaction_id.trim(), &connection)?
            .unwrap_or_else(empty_object),
    };

    let categorization = categorize_transaction(
        user_id,
        &form.transaction_id,
        &form.category,
        transaction_data,
        OffsetDateTime::now_utc(),
        &connection,
    )?;

    tracing::info!(
        "User {user_id} categorized transaction {} as \"{}\"",
        categorization.transaction_id,
        categorization.category
    );

    Ok(Json(categorization))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use time::OffsetDateTime;

    use crate::{
        categorization::{get_categorization, insert_manual_review_if_absent},
        endpoints,
        test_utils::{StubProvider, TestApp},
    };

    #[tokio::test]
    async fn categorize_resolves_queued_transaction() {
        let app = TestApp::new(StubProvider::default());
        let (user_id, cookie) = app.log_in_new_user().await;
        {
            let connection = app.connection();
            insert_manual_review_if_absent(
                user_id,
                "txn-1",
                &json!({"name": "Corner shop"}),
                OffsetDateTime::now_utc(),
                &connection,
            )
            .unwrap();
        }

        let response = app
            .server
            .post(endpoints::CATEGORIZATIONS)
            .add_cookie(cookie.clone())
            .json(&json!({
                "transaction_id": "txn-1",
                "category": "Groceries",
                "transaction_data": {"name": "Corner shop"},
            }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["category"], "Groceries");
        assert_eq!(body["transaction_id"], "txn-1");

        let queue: Vec<Value> = app
            .server
            .get(endpoints::MANUAL_REVIEW)
            .add_cookie(cookie)
            .await
            .json();
        assert!(queue.is_empty());

        let connection = app.connection();
        let categorization = get_categorization(user_id, "txn-1", &connection).unwrap();
        assert_eq!(categorization.source_data, json!({"name": "Corner shop"}));
    }

    #[tokio::test]
    async fn categorize_without_data_keeps_queued_payload() {
        let app = TestApp::new(StubProvider::default());
        let (user_id, cookie) = app.log_in_new_user().await;
        let payload = json!({"transaction_id": "txn-1", "name": "Corner shop", "amount": 4.5});
        {
            let connection = app.connection();
            insert_manual_review_if_absent(
                user_id,
                "txn-1",
                &payload,
                OffsetDateTime::now_utc(),
                &connection,
            )
            .unwrap();
        }

        let response = app
            .server
            .post(endpoints::CATEGORIZATIONS)
            .add_cookie(cookie)
            .json(&json!({"transaction_id": "txn-1", "category": "Groceries"}))
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["source_data"], payload);
        let connection = app.connection();
        let categorization = get_categorization(user_id, "txn-1", &connection).unwrap();
        assert_eq!(categorization.source_data, payload);
    }

    #[tokio::test]
    async fn categorize_without_data_stores_empty_object() {
        let app = TestApp::new(StubProvider::default());
        let (user_id, cookie) = app.log_in_new_user().await;

        app.server
            .post(endpoints::CATEGORIZATIONS)
            .add_cookie(cookie)
            .json(&json!({"transaction_id": "txn-1", "category": "Rent"}))
            .await
            .assert_status_ok();

        let connection = app.connection();
        let categorization = get_categorization(user_id, "txn-1", &connection).unwrap();
        assert_eq!(categorization.source_data, json!({}));
    }

    #[tokio::test]
    async fn categorize_rejects_blank_category() {
        let app = TestApp::new(StubProvider::default());
        let (_, cookie) = app.log_in_new_user().await;

        let response = app
            .server
            .post(endpoints::CATEGORIZATIONS)
            .add_cookie(cookie)
            .json(&json!({"transaction_id": "txn-1", "category": "  "}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "category cannot be empty");
    }

    #[tokio::test]
    async fn listings_only_show_own_rows() {
        let app = TestApp::new(StubProvider::default());
        let (_, cookie) = app.log_in_new_user().await;
        let (_, other_cookie) = app.log_in_new_user().await;

        app.server
            .post(endpoints::CATEGORIZATIONS)
            .add_cookie(other_cookie)
            .json(&json!({"transaction_id": "txn-1", "category": "Rent"}))
            .await
            .assert_status_ok();

        let categorizations: Vec<Value> = app
            .server
            .get(endpoints::CATEGORIZATIONS)
            .add_cookie(cookie)
            .await
            .json();
        assert!(categorizations.is_empty());
    }
}
