//! Route handlers for managing budgets.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AppState, Error, UserID,
    budget::{
        Budget, BudgetForm, BudgetId, create_budget, delete_budget, get_budgets, update_budget,
    },
    db::lock_connection,
};

/// The state needed for managing budgets.
#[derive(Debug, Clone)]
pub struct BudgetState {
    /// The database connection for managing budgets.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that lists the user's budgets.
pub async fn get_budgets_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<Budget>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_budgets(user_id, &connection).map(Json)
}

/// A route handler for creating a budget.
pub async fn create_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    Json(form): Json<BudgetForm>,
) -> Result<(StatusCode, Json<Budget>), Error> {
    let (category, amount) = form.validate()?;
    let connection = lock_connection(&state.db_connection)?;

    let budget = create_budget(user_id, category, amount, &connection)?;
    tracing::info!("User {user_id} created budget {} for {}", budget.id, budget.category);

    Ok((StatusCode::CREATED, Json(budget)))
}

/// A route handler for replacing a budget's category and amount.
pub async fn update_budget_endpoint(
    Path(budget_id): Path<BudgetId>,
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    Json(form): Json<BudgetForm>,
) -> Result<Json<Budget>, Error> {
    let (category, amount) = form.validate()?;
    let connection = lock_connection(&state.db_connection)?;

    update_budget(budget_id, user_id, category, amount, &connection).map(Json)
}

/// A route handler for deleting a budget.
pub async fn delete_budget_endpoint(
    Path(budget_id): Path<BudgetId>,
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_budget(budget_id, user_id, &connection)?;
    tracing::info!("User {user_id} deleted budget {budget_id}");

    Ok(StatusCode::NO_CONTENT)
}
