//! Database operations for categorizations and the manual-review queue.

use std::collections::HashSet;

use rusqlite::{Connection, OptionalExtension, Row, types::Type};
use serde_json::Value;
use time::OffsetDateTime;

use crate::{
    Error, UserID,
    categorization::{Categorization, ManualReviewEntry},
};

/// Create the categorization and manual-review tables.
///
/// Triggers remove a transaction from the manual-review queue whenever a
/// categorization is inserted or updated for it.
pub fn create_categorization_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS categorization (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            transaction_id TEXT NOT NULL,
            category TEXT NOT NULL,
            source_data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(user_id, transaction_id),
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS manual_review (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            transaction_id TEXT NOT NULL,
            transaction_data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(user_id, transaction_id),
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
        );

        CREATE TRIGGER IF NOT EXISTS resolve_manual_review_on_categorization_insert
        AFTER INSERT ON categorization
        BEGIN
            DELETE FROM manual_review
            WHERE user_id = NEW.user_id AND transaction_id = NEW.transaction_id;
        END;

        CREATE TRIGGER IF NOT EXISTS resolve_manual_review_on_categorization_update
        AFTER UPDATE ON categorization
        BEGIN
            DELETE FROM manual_review
            WHERE user_id = NEW.user_id AND transaction_id = NEW.transaction_id;
        END;",
    )?;

    Ok(())
}

/// Get the IDs of every transaction the user has already categorized.
///
/// Returns the raw SQL error so callers can tell a missing table apart from
/// other failures.
pub fn get_categorized_transaction_ids(
    user_id: UserID,
    connection: &Connection,
) -> Result<HashSet<String>, rusqlite::Error> {
    connection
        .prepare("SELECT transaction_id FROM categorization WHERE user_id = ?1")?
        .query_map([user_id.as_i64()], |row| row.get(0))?
        .collect()
}

/// Get the IDs of every transaction waiting in the user's manual-review queue.
///
/// Returns the raw SQL error so callers can tell a missing table apart from
/// other failures.
pub fn get_pending_review_transaction_ids(
    user_id: UserID,
    connection: &Connection,
) -> Result<HashSet<String>, rusqlite::Error> {
    connection
        .prepare("SELECT transaction_id FROM manual_review WHERE user_id = ?1")?
        .query_map([user_id.as_i64()], |row| row.get(0))?
        .collect()
}

/// Insert a categorization unless one already exists for the transaction.
///
/// An existing categorization is never modified, it may hold a category the
/// user picked.
///
/// Returns whether a row was inserted.
pub fn insert_categorization_if_absent(
    user_id: UserID,
    transaction_id: &str,
    category: &str,
    source_data: &Value,
    created_at: OffsetDateTime,
    connection: &Connection,
) -> Result<bool, Error> {
    let rows_affected = connection.execute(
        "INSERT INTO categorization (user_id, transaction_id, category, source_data, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(user_id, transaction_id) DO NOTHING",
        (
            user_id.as_i64(),
            transaction_id,
            category,
            to_json(source_data)?,
            created_at,
        ),
    )?;

    Ok(rows_affected > 0)
}

/// Queue a transaction for manual review unless it is already queued.
///
/// Returns whether a row was inserted.
pub fn insert_manual_review_if_absent(
    user_id: UserID,
    transaction_id: &str,
    transaction_data: &Value,
    created_at: OffsetDateTime,
    connection: &Connection,
) -> Result<bool, Error> {
    let rows_affected = connection.execute(
        "INSERT INTO manual_review (user_id, transaction_id, transaction_data, created_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(user_id, transaction_id) DO NOTHING",
        (
            user_id.as_i64(),
            transaction_id,
            to_json(transaction_data)?,
            created_at,
        ),
    )?;

    Ok(rows_affected > 0)
}

/// Set the category of a transaction on behalf of the user.
///
/// Unlike ingestion, this overwrites an existing categorization: the
/// category, source data and timestamp are replaced. The transaction is
/// removed from the manual-review queue.
///
/// # Errors
///
/// Returns a:
/// - [Error::EmptyField] if `transaction_id` or `category` is blank,
/// - [Error::SqlError] if there is some other SQL error.
pub fn categorize_transaction(
    user_id: UserID,
    transaction_id: &str,
    category: &str,
    raw_data: Value,
    created_at: OffsetDateTime,
    connection: &Connection,
) -> Result<Categorization, Error> {
    let transaction_id = transaction_id.trim();
    if transaction_id.is_empty() {
        return Err(Error::EmptyField("transaction_id"));
    }

    let category = category.trim();
    if category.is_empty() {
        return Err(Error::EmptyField("category"));
    }

    connection.execute(
        "INSERT INTO categorization (user_id, transaction_id, category, source_data, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(user_id, transaction_id) DO UPDATE SET
            category = excluded.category,
            source_data = excluded.source_data,
            created_at = excluded.created_at",
        (
            user_id.as_i64(),
            transaction_id,
            category,
            to_json(&raw_data)?,
            created_at,
        ),
    )?;

    Ok(Categorization {
        user_id,
        transaction_id: transaction_id.to_owned(),
        category: category.to_owned(),
        source_data: raw_data,
        created_at,
    })
}

/// Get the user's categorizations, most recent first.
pub fn get_categorizations(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Categorization>, Error> {
    connection
        .prepare(
            "SELECT user_id, transaction_id, category, source_data, created_at
            FROM categorization
            WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC",
        )?
        .query_map([user_id.as_i64()], map_categorization_row)?
        .map(|maybe_categorization| maybe_categorization.map_err(Error::from))
        .collect()
}

/// Get a single categorization by its transaction ID.
#[cfg(test)]
pub fn get_categorization(
    user_id: UserID,
    transaction_id: &str,
    connection: &Connection,
) -> Result<Categorization, Error> {
    connection
        .prepare(
            "SELECT user_id, transaction_id, category, source_data, created_at
            FROM categorization
            WHERE user_id = ?1 AND transaction_id = ?2",
        )?
        .query_row((user_id.as_i64(), transaction_id), map_categorization_row)
        .map_err(Error::from)
}

/// Get the transactions waiting in the user's manual-review queue, most recent first.
pub fn get_manual_review_entries(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<ManualReviewEntry>, Error> {
    connection
        .prepare(
            "SELECT user_id, transaction_id, transaction_data, created_at
            FROM manual_review
            WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC",
        )?
        .query_map([user_id.as_i64()], |row| {
            Ok(ManualReviewEntry {
                user_id: UserID::new(row.get(0)?),
                transaction_id: row.get(1)?,
                transaction_data: parse_json(row, 2)?,
                created_at: row.get(3)?,
            })
        })?
        .map(|maybe_entry| maybe_entry.map_err(Error::from))
        .collect()
}

/// Get the provider payload stored with a queued transaction, if it is queued.
pub fn get_review_transaction_data(
    user_id: UserID,
    transaction_id: &str,
    connection: &Connection,
) -> Result<Option<Value>, Error> {
    connection
        .prepare(
            "SELECT transaction_data FROM manual_review
            WHERE user_id = ?1 AND transaction_id = ?2",
        )?
        .query_row((user_id.as_i64(), transaction_id), |row| parse_json(row, 0))
        .optional()
        .map_err(Error::from)
}

fn map_categorization_row(row: &Row) -> Result<Categorization, rusqlite::Error> {
    Ok(Categorization {
        user_id: UserID::new(row.get(0)?),
        transaction_id: row.get(1)?,
        category: row.get(2)?,
        source_data: parse_json(row, 3)?,
        created_at: row.get(4)?,
    })
}

fn parse_json(row: &Row, index: usize) -> Result<Value, rusqlite::Error> {
    let raw: String = row.get(index)?;

    serde_json::from_str(&raw)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error)))
}

fn to_json(value: &Value) -> Result<String, Error> {
    serde_json::to_string(value).map_err(|error| Error::JSONSerializationError(error.to_string()))
}
