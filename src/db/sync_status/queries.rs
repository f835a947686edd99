use super::schema::{self, Columns, SyncStatus};
use crate::Result;
use rusqlite::{named_params, Connection};

pub fn select(conn: &Connection) -> Result<SyncStatus> {
    let sql = format!(
        r#"
            SELECT {projection}
            FROM {table}
            WHERE {id} = 1
        "#,
        projection = SyncStatus::projection(),
        table = schema::TABLE_NAME,
        id = Columns::Id.as_str(),
    );
    conn.query_row(&sql, [], SyncStatus::mapper())
        .map_err(Into::into)
}

/// Atomically claims the syncing slot. Returns false when another sync is
/// already in flight, in which case nothing is modified.
pub fn try_begin(message: &str, conn: &Connection) -> Result<bool> {
    let sql = format!(
        r#"
            UPDATE {table}
            SET {state} = 'Syncing', {message} = :message, {sync_started_at} = strftime('%Y-%m-%dT%H:%M:%SZ')
            WHERE {id} = 1 AND {state} != 'Syncing'
        "#,
        table = schema::TABLE_NAME,
        state = Columns::State.as_str(),
        message = Columns::Message.as_str(),
        sync_started_at = Columns::SyncStartedAt.as_str(),
        id = Columns::Id.as_str(),
    );
    let changed = conn.execute(&sql, named_params! { ":message": message })?;
    Ok(changed > 0)
}

pub fn set_message(message: &str, conn: &Connection) -> Result<()> {
    let sql = format!(
        r#"
            UPDATE {table}
            SET {message} = :message
            WHERE {id} = 1
        "#,
        table = schema::TABLE_NAME,
        message = Columns::Message.as_str(),
        id = Columns::Id.as_str(),
    );
    conn.execute(&sql, named_params! { ":message": message })?;
    Ok(())
}

pub fn set_completed(message: &str, conn: &Connection) -> Result<()> {
    let sql = format!(
        r#"
            UPDATE {table}
            SET {state} = 'Ready', {message} = :message, {last_updated} = strftime('%Y-%m-%dT%H:%M:%SZ')
            WHERE {id} = 1
        "#,
        table = schema::TABLE_NAME,
        state = Columns::State.as_str(),
        message = Columns::Message.as_str(),
        last_updated = Columns::LastUpdated.as_str(),
        id = Columns::Id.as_str(),
    );
    conn.execute(&sql, named_params! { ":message": message })?;
    Ok(())
}

pub fn set_error(message: &str, conn: &Connection) -> Result<()> {
    let sql = format!(
        r#"
            UPDATE {table}
            SET {state} = 'Error', {message} = :message
            WHERE {id} = 1
        "#,
        table = schema::TABLE_NAME,
        state = Columns::State.as_str(),
        message = Columns::Message.as_str(),
        id = Columns::Id.as_str(),
    );
    conn.execute(&sql, named_params! { ":message": message })?;
    Ok(())
}

#[cfg(test)]
mod test {
    use crate::db::sync_status::schema::SyncState;
    use crate::test::mock_conn;
    use crate::Result;

    #[test]
    fn initial_state_is_ready() -> Result<()> {
        let conn = mock_conn();
        let status = super::select(&conn)?;
        assert_eq!(SyncState::Ready, status.state);
        assert!(status.last_updated.is_none());
        assert!(status.sync_started_at.is_none());
        Ok(())
    }

    #[test]
    fn try_begin_claims_the_slot_once() -> Result<()> {
        let conn = mock_conn();
        assert!(super::try_begin("Descargando reportes...", &conn)?);
        let status = super::select(&conn)?;
        assert_eq!(SyncState::Syncing, status.state);
        assert!(status.sync_started_at.is_some());
        // a second trigger must not start while one is in flight
        assert!(!super::try_begin("Descargando reportes...", &conn)?);
        assert_eq!(SyncState::Syncing, super::select(&conn)?.state);
        Ok(())
    }

    #[test]
    fn completed_releases_the_slot() -> Result<()> {
        let conn = mock_conn();
        assert!(super::try_begin("Descargando reportes...", &conn)?);
        super::set_completed("Sincronización completada", &conn)?;
        let status = super::select(&conn)?;
        assert_eq!(SyncState::Ready, status.state);
        assert!(status.last_updated.is_some());
        assert!(super::try_begin("Descargando reportes...", &conn)?);
        Ok(())
    }

    #[test]
    fn error_allows_retry() -> Result<()> {
        let conn = mock_conn();
        assert!(super::try_begin("Descargando reportes...", &conn)?);
        super::set_error("Error: login fallido", &conn)?;
        let status = super::select(&conn)?;
        assert_eq!(SyncState::Error, status.state);
        assert!(status.last_updated.is_none());
        assert!(super::try_begin("Descargando reportes...", &conn)?);
        Ok(())
    }

    #[test]
    fn set_message_keeps_state() -> Result<()> {
        let conn = mock_conn();
        assert!(super::try_begin("Descargando reportes...", &conn)?);
        super::set_message("Procesando datos...", &conn)?;
        let status = super::select(&conn)?;
        assert_eq!(SyncState::Syncing, status.state);
        assert_eq!("Procesando datos...", status.message);
        Ok(())
    }
}
