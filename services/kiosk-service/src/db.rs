use serde_json::Value;

use crate::models::{InteractionRecord, NewInteraction};
use crate::storage::{Record, SqlParam, Storage, StorageError};

pub const RECENT_INTERACTIONS_LIMIT: i64 = 100;

pub const SQL_INSERT_INTERACTION: &str =
    "INSERT INTO interactions (screen, action, timestamp, kiosk_id) VALUES ($1, $2, $3, $4)";
pub const SQL_RECENT_INTERACTIONS: &str = "SELECT i.screen, i.action, i.timestamp::text AS timestamp, \
i.kiosk_id, k.friendly_name \
FROM interactions i \
LEFT JOIN kiosk_locations k ON k.kiosk_id = i.kiosk_id \
ORDER BY i.timestamp DESC NULLS LAST \
LIMIT $1";
pub const SQL_RESTART_SESSION: &str = "UPDATE sessions \
SET restart_clicks = COALESCE(restart_clicks, 0) + 1 \
WHERE REPLACE(UPPER(session_id::text), '-', '') = REPLACE(UPPER($1::text), '-', '') \
AND completed_at IS NULL AND abandoned_at IS NULL \
RETURNING restart_clicks::bigint AS restart_clicks";
pub const SQL_RESTART_SESSION_NORMALIZED: &str = "UPDATE sessions \
SET restart_clicks = COALESCE(restart_clicks, 0) + 1 \
WHERE REPLACE(UPPER(session_id::text), '-', '') = $1 \
AND completed_at IS NULL AND abandoned_at IS NULL \
RETURNING restart_clicks::bigint AS restart_clicks";

pub async fn insert_interaction(
    storage: &dyn Storage,
    interaction: &NewInteraction,
) -> Result<(), StorageError> {
    let params = [
        SqlParam::from(interaction.screen.as_str()),
        SqlParam::from(interaction.action.as_str()),
        SqlParam::from(interaction.timestamp.as_str()),
        SqlParam::from(interaction.kiosk_id.as_str()),
    ];
    storage.execute(SQL_INSERT_INTERACTION, &params).await?;
    Ok(())
}

pub async fn fetch_recent_interactions(
    storage: &dyn Storage,
) -> Result<Vec<InteractionRecord>, StorageError> {
    let records = storage
        .query(
            SQL_RECENT_INTERACTIONS,
            &[SqlParam::from(RECENT_INTERACTIONS_LIMIT)],
        )
        .await?;
    records
        .into_iter()
        .map(|record| {
            serde_json::from_value::<InteractionRecord>(Value::Object(record))
                .map_err(StorageError::from)
        })
        .collect()
}

/// Bumps the restart counter of an active session. `None` when no active session matches.
///
/// Ids compare like uuids: case and dashes are ignored on both sides.
pub async fn restart_session(
    storage: &dyn Storage,
    session_id: &str,
) -> Result<Option<i64>, StorageError> {
    let records = storage
        .query(SQL_RESTART_SESSION, &[SqlParam::from(session_id)])
        .await?;
    Ok(first_restart_count(records))
}

/// Same as [`restart_session`], matching on the dash-free upper-case form of the id.
pub async fn restart_session_normalized(
    storage: &dyn Storage,
    normalized_id: &str,
) -> Result<Option<i64>, StorageError> {
    let records = storage
        .query(
            SQL_RESTART_SESSION_NORMALIZED,
            &[SqlParam::from(normalized_id)],
        )
        .await?;
    Ok(first_restart_count(records))
}

fn first_restart_count(records: Vec<Record>) -> Option<i64> {
    records
        .into_iter()
        .next()
        .map(|record| record.get("restart_clicks").and_then(Value::as_i64).unwrap_or(0))
}
