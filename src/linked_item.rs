//! Storage for the banks a user has linked through the provider.

use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{Error, UserID, provider::ItemCredentials};

/// A bank the user has linked, along with the token for fetching its data.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedItem {
    /// The ID of the item in the application database.
    pub id: i64,
    /// The user that linked the bank.
    pub user_id: UserID,
    /// The provider's ID for the linked bank.
    pub item_id: String,
    /// The token for fetching the bank's data. Never sent to clients.
    pub access_token: String,
    /// The bank's name, if the client supplied it.
    pub institution_name: Option<String>,
    /// When the bank was linked or last re-linked.
    pub created_at: OffsetDateTime,
}

/// Create the linked item table.
pub fn create_linked_item_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS linked_item (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            item_id TEXT NOT NULL UNIQUE,
            access_token TEXT NOT NULL,
            institution_name TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_linked_item_user_id ON linked_item(user_id);",
    )?;

    Ok(())
}

/// Store the credentials for a newly linked bank.
///
/// Re-linking a bank the provider already knows (same `item_id`) replaces
/// its access token instead of adding a second row. The stored row is
/// returned, so an omitted `institution_name` keeps the previous name.
///
/// # Errors
///
/// Returns [Error::ItemLinkedToAnotherUser] if `item_id` is already linked
/// by a different user. Their row is left untouched.
pub fn create_linked_item(
    user_id: UserID,
    credentials: ItemCredentials,
    institution_name: Option<String>,
    created_at: OffsetDateTime,
    connection: &Connection,
) -> Result<LinkedItem, Error> {
    connection
        .query_row(
            "INSERT INTO linked_item (user_id, item_id, access_token, institution_name, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(item_id) DO UPDATE SET
                access_token = excluded.access_token,
                institution_name = COALESCE(excluded.institution_name, institution_name),
                created_at = excluded.created_at
            WHERE linked_item.user_id = excluded.user_id
            RETURNING id, user_id, item_id, access_token, institution_name, created_at",
            (
                user_id.as_i64(),
                &credentials.item_id,
                &credentials.access_token,
                &institution_name,
                created_at,
            ),
            map_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => {
                tracing::warn!(
                    "User {user_id} tried to link item {} owned by another user",
                    credentials.item_id
                );
                Error::ItemLinkedToAnotherUser
            }
            error => error.into(),
        })
}

/// Get every bank the user has linked, oldest first.
pub fn get_linked_items(user_id: UserID, connection: &Connection) -> Result<Vec<LinkedItem>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, item_id, access_token, institution_name, created_at
            FROM linked_item
            WHERE user_id = ?1
            ORDER BY id ASC",
        )?
        .query_map([user_id.as_i64()], map_row)?
        .map(|maybe_item| maybe_item.map_err(Error::from))
        .collect()
}

fn map_row(row: &Row) -> Result<LinkedItem, rusqlite::Error> {
    Ok(LinkedItem {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        item_id: row.get(2)?,
        access_token: row.get(3)?,
        institution_name: row.get(4)?,
        created_at: row.get(5)?,
    })
}
