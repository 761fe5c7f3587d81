//! Database operations for budgets.
//!
//! Every query is scoped to a user, so a budget owned by someone else looks
//! the same as one that does not exist.

use rusqlite::{Connection, Row};

use crate::{
    Error, UserID,
    budget::{Budget, BudgetAmount, BudgetCategory, BudgetId},
};

/// Initialize the budget table and indexes.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            category TEXT NOT NULL,
            amount REAL NOT NULL,
            UNIQUE(user_id, category),
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_budget_user_id ON budget(user_id);",
    )?;

    Ok(())
}

/// Create a budget and return it with its generated ID.
///
/// # Errors
///
/// Returns [Error::DuplicateBudgetCategory] if the user already has a budget
/// for `category`.
pub fn create_budget(
    user_id: UserID,
    category: BudgetCategory,
    amount: BudgetAmount,
    connection: &Connection,
) -> Result<Budget, Error> {
    connection
        .execute(
            "INSERT INTO budget (user_id, category, amount) VALUES (?1, ?2, ?3)",
            (user_id.as_i64(), category.as_ref(), amount.as_f64()),
        )
        .map_err(|error| map_unique_violation(error, &category))?;

    let id = connection.last_insert_rowid();

    Ok(Budget {
        id,
        user_id,
        category,
        amount,
    })
}

/// Retrieve a single budget owned by `user_id`.
#[cfg(test)]
pub fn get_budget(
    budget_id: BudgetId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Budget, Error> {
    connection
        .prepare("SELECT id, user_id, category, amount FROM budget WHERE id = ?1 AND user_id = ?2")?
        .query_row((budget_id, user_id.as_i64()), map_row)
        .map_err(|error| error.into())
}

/// Retrieve the user's budgets ordered alphabetically by category.
pub fn get_budgets(user_id: UserID, connection: &Connection) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, category, amount FROM budget
            WHERE user_id = ?1
            ORDER BY category ASC",
        )?
        .query_map([user_id.as_i64()], map_row)?
        .map(|maybe_budget| maybe_budget.map_err(|error| error.into()))
        .collect()
}

/// Replace a budget's category and amount.
///
/// # Errors
///
/// Returns [Error::UpdateMissingBudget] if the budget does not exist or is
/// owned by another user, or [Error::DuplicateBudgetCategory] if the user
/// has another budget for `category`.
pub fn update_budget(
    budget_id: BudgetId,
    user_id: UserID,
    category: BudgetCategory,
    amount: BudgetAmount,
    connection: &Connection,
) -> Result<Budget, Error> {
    let rows_affected = connection
        .execute(
            "UPDATE budget SET category = ?1, amount = ?2 WHERE id = ?3 AND user_id = ?4",
            (
                category.as_ref(),
                amount.as_f64(),
                budget_id,
                user_id.as_i64(),
            ),
        )
        .map_err(|error| map_unique_violation(error, &category))?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingBudget);
    }

    Ok(Budget {
        id: budget_id,
        user_id,
        category,
        amount,
    })
}

/// Delete a budget owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::DeleteMissingBudget] if the budget does not exist or is
/// owned by another user.
pub fn delete_budget(
    budget_id: BudgetId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM budget WHERE id = ?1 AND user_id = ?2",
        (budget_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingBudget);
    }

    Ok(())
}

fn map_unique_violation(error: rusqlite::Error, category: &BudgetCategory) -> Error {
    match error {
        // Code 2067 occurs when a UNIQUE constraint failed.
        rusqlite::Error::SqliteFailure(error, Some(_)) if error.extended_code == 2067 => {
            Error::DuplicateBudgetCategory(category.to_string())
        }
        error => error.into(),
    }
}

fn map_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    let raw_category: String = row.get(2)?;
    let raw_amount: f64 = row.get(3)?;

    Ok(Budget {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        category: BudgetCategory::new(&raw_category).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, error.into())
        })?,
        amount: BudgetAmount::new(raw_amount).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Real, error.into())
        })?,
    })
}
