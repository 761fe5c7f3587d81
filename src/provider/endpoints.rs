//! Route handlers for linking a bank through the provider.

use axum::{Extension, Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error, UserID,
    db::lock_connection,
    linked_item::create_linked_item,
    provider::{LinkToken, ProviderState},
};

/// The request body for finishing the bank linking flow.
#[derive(Debug, Deserialize)]
pub struct ExchangeForm {
    /// The public token handed back by the linking flow.
    pub public_token: String,
    /// The bank's name, shown to the user in the linking flow.
    #[serde(default)]
    pub institution_name: Option<String>,
}

/// The response for a newly linked bank.
#[derive(Debug, Serialize)]
pub struct ExchangeResponse {
    /// The provider's ID for the linked bank.
    pub item_id: String,
}

/// A route handler that starts the bank linking flow for the user.
pub async fn create_link_token_endpoint(
    State(state): State<ProviderState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<LinkToken>, Error> {
    let link_token = state.provider.create_link_token(user_id).await?;

    Ok(Json(link_token))
}

/// A route handler that finishes the bank linking flow and stores the bank's credentials.
pub async fn exchange_public_token_endpoint(
    State(state): State<ProviderState>,
    Extension(user_id): Extension<UserID>,
    Json(form): Json<ExchangeForm>,
) -> Result<(StatusCode, Json<ExchangeResponse>), Error> {
    let public_token = form.public_token.trim();
    if public_token.is_empty() {
        return Err(Error::EmptyField("public_token"));
    }

    let credentials = state.provider.exchange_public_token(public_token).await?;

    let connection = lock_connection(&state.db_connection)?;
    let institution_name = form
        .institution_name
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty());
    let item = create_linked_item(
        user_id,
        credentials,
        institution_name,
        OffsetDateTime::now_utc(),
        &connection,
    )?;

    tracing::info!("User {user_id} linked item {}", item.item_id);

    Ok((
        StatusCode::CREATED,
        Json(ExchangeResponse {
            item_id: item.item_id,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::{
        endpoints,
        linked_item::get_linked_items,
        test_utils::{StubProvider, TestApp},
    };

    #[tokio::test]
    async fn link_token_comes_from_provider() {
        let app = TestApp::new(StubProvider::default());
        let (user_id, cookie) = app.log_in_new_user().await;

        let response = app.server.post(endpoints::LINK_TOKEN).add_cookie(cookie).await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["link_token"], format!("link-sandbox-{user_id}"));
    }

    #[tokio::test]
    async fn exchange_stores_linked_item() {
        let app = TestApp::new(StubProvider::default());
        let (user_id, cookie) = app.log_in_new_user().await;

        let response = app
            .server
            .post(endpoints::EXCHANGE_PUBLIC_TOKEN)
            .add_cookie(cookie)
            .json(&json!({"public_token": "public-abc", "institution_name": "First Bank"}))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body, json!({"item_id": "item-abc"}));

        let connection = app.connection();
        let items = get_linked_items(user_id, &connection).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].access_token, "access-abc");
        assert_eq!(items[0].institution_name.as_deref(), Some("First Bank"));
    }

    #[tokio::test]
    async fn exchange_of_item_linked_by_another_user_is_conflict() {
        let app = TestApp::new(StubProvider::default());
        let (user_id, cookie) = app.log_in_new_user().await;
        let (other_user_id, other_cookie) = app.log_in_new_user().await;
        app.server
            .post(endpoints::EXCHANGE_PUBLIC_TOKEN)
            .add_cookie(cookie)
            .json(&json!({"public_token": "public-abc"}))
            .await
            .assert_status(StatusCode::CREATED);

        app.server
            .post(endpoints::EXCHANGE_PUBLIC_TOKEN)
            .add_cookie(other_cookie)
            .json(&json!({"public_token": "public-abc"}))
            .await
            .assert_status(StatusCode::CONFLICT);

        let connection = app.connection();
        assert_eq!(get_linked_items(user_id, &connection).unwrap().len(), 1);
        assert!(get_linked_items(other_user_id, &connection).unwrap().is_empty());
    }

    #[tokio::test]
    async fn exchange_rejects_blank_public_token() {
        let app = TestApp::new(StubProvider::default());
        let (_, cookie) = app.log_in_new_user().await;

        app.server
            .post(endpoints::EXCHANGE_PUBLIC_TOKEN)
            .add_cookie(cookie)
            .json(&json!({"public_token": " "}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn exchange_failure_is_bad_gateway() {
        let app = TestApp::new(StubProvider::default());
        let (user_id, cookie) = app.log_in_new_user().await;

        app.server
            .post(endpoints::EXCHANGE_PUBLIC_TOKEN)
            .add_cookie(cookie)
            .json(&json!({"public_token": "public-expired"}))
            .await
            .assert_status(StatusCode::BAD_GATEWAY);

        let connection = app.connection();
        assert!(get_linked_items(user_id, &connection).unwrap().is_empty());
    }
}
