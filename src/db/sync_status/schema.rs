use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;
use strum::{Display, EnumString};
use time::OffsetDateTime;

pub const TABLE_NAME: &str = "sync_status";

pub enum Columns {
    Id,
    State,
    Message,
    LastUpdated,
    SyncStartedAt,
}

impl Columns {
    pub fn as_str(&self) -> &'static str {
        match self {
            Columns::Id => "id",
            Columns::State => "state",
            Columns::Message => "message",
            Columns::LastUpdated => "last_updated",
            Columns::SyncStartedAt => "sync_started_at",
        }
    }
}

/// Shared synchronization state, visible to every API reader. Only one
/// syncing period may be active at a time, which [`super::queries::try_begin`]
/// enforces with a compare-and-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum SyncState {
    Ready,
    Syncing,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    pub state: SyncState,
    pub message: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_updated: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub sync_started_at: Option<OffsetDateTime>,
}

impl SyncStatus {
    pub fn projection() -> &'static str {
        static PROJECTION: OnceLock<String> = OnceLock::new();
        PROJECTION.get_or_init(|| {
            [
                Columns::State,
                Columns::Message,
                Columns::LastUpdated,
                Columns::SyncStartedAt,
            ]
            .iter()
            .map(Columns::as_str)
            .collect::<Vec<_>>()
            .join(", ")
        })
    }

    pub const fn mapper() -> fn(&Row) -> rusqlite::Result<SyncStatus> {
        |row: &_| {
            let state: String = row.get(Columns::State.as_str())?;
            let state = SyncState::from_str(&state).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            Ok(SyncStatus {
                state,
                message: row.get(Columns::Message.as_str())?,
                last_updated: row.get(Columns::LastUpdated.as_str())?,
                sync_started_at: row.get(Columns::SyncStartedAt.as_str())?,
            })
        }
    }
}
