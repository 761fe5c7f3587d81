//! Authentication middleware for the API routes.
//!
//! Users log in through a separate service that shares the cookie key with
//! this one. That service sets a private (encrypted and signed) cookie
//! holding the user's ID, and this module only verifies it.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;

use crate::{AppState, Error, UserID, db::lock_connection, user::get_user_by_id};

/// The name of the private cookie that holds the logged in user's ID.
pub const COOKIE_USER_ID: &str = "user_id";

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The database connection for checking that the user exists.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Read the user ID from the auth cookie in `jar`.
///
/// # Errors
///
/// Returns [Error::Unauthorized] if the cookie is missing, could not be
/// decrypted, or does not hold an integer.
pub fn get_user_id_from_auth_cookie(jar: &PrivateCookieJar) -> Result<UserID, Error> {
    let cookie = jar.get(COOKIE_USER_ID).ok_or(Error::Unauthorized)?;

    cookie
        .value()
        .parse::<i64>()
        .map(UserID::new)
        .map_err(|error| {
            tracing::warn!("Auth cookie held an invalid user ID: {error}");
            Error::Unauthorized
        })
}

/// Middleware function that checks for a valid authorization cookie.
/// The user ID is placed into the request and then the request executed normally if the cookie is
/// valid and belongs to a registered user, otherwise a 401 response is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
///
/// **Note**: The app state must contain an `axum_extra::extract::cookie::Key` for decrypting and verifying the cookie contents.
pub async fn auth_guard(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let user_id = match authenticate(&state, &jar) {
        Ok(user_id) => user_id,
        Err(error) => return error.into_response(),
    };

    request.extensions_mut().insert(user_id);
    next.run(request).await
}

fn authenticate(state: &AuthState, jar: &PrivateCookieJar) -> Result<UserID, Error> {
    let user_id = get_user_id_from_auth_cookie(jar)?;
    let connection = lock_connection(&state.db_connection)?;

    match get_user_by_id(user_id, &connection) {
        Ok(user) => Ok(user.id),
        Err(Error::NotFound) => {
            tracing::warn!("Auth cookie for unknown user {user_id}");
            Err(Error::Unauthorized)
        }
        Err(error) => Err(error),
    }
}
