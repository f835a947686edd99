use crate::conf::{Conf, Credentials};
use crate::service::{portal, reports};
use crate::{db, Result};
use deadpool_sqlite::Pool;
use serde::Serialize;
use std::path::PathBuf;
use time::OffsetDateTime;
use tracing::{error, info};

#[derive(Serialize)]
pub struct SyncSummary {
    pub downloaded_files: Vec<PathBuf>,
    pub loaded_rows: Vec<(String, usize)>,
    pub total_time_s: f64,
}

/// Runs one full sync under an already-claimed syncing slot and always
/// releases it, to Ready on success and to Error on any failure. Callers must
/// have won [`db::sync_status::queries::try_begin`] first.
pub async fn run(pool: &Pool, conf: &Conf, creds: &Credentials) -> Result<SyncSummary> {
    match execute(pool, conf, creds).await {
        Ok(summary) => {
            db::sync_status::queries_async::set_completed("Sincronización completada", pool)
                .await?;
            info!(
                downloaded = summary.downloaded_files.len(),
                total_time_s = summary.total_time_s,
                "Sync completed"
            );
            Ok(summary)
        }
        Err(e) => {
            error!(error = e.to_string(), "Sync failed");
            db::sync_status::queries_async::set_error(&format!("Error: {e}"), pool).await?;
            Err(e)
        }
    }
}

async fn execute(pool: &Pool, conf: &Conf, creds: &Credentials) -> Result<SyncSummary> {
    let started_at = OffsetDateTime::now_utc();

    let downloaded_files = portal::synchronize(conf, creds).await?;

    db::sync_status::queries_async::set_message("Procesando datos...", pool).await?;

    // a load right after the fetch surfaces parse problems in the sync log,
    // the read path re-parses on every request anyway
    let download_dir = conf.download_dir.clone();
    let tables = tokio::task::spawn_blocking(move || reports::load_all(&download_dir))
        .await
        .map_err(|e| format!("Table load task failed: {e}"))?;
    let loaded_rows = tables
        .iter()
        .map(|(kind, table)| (kind.to_string(), table.len()))
        .collect();

    Ok(SyncSummary {
        downloaded_files,
        loaded_rows,
        total_time_s: (OffsetDateTime::now_utc() - started_at).as_seconds_f64(),
    })
}

/// One-shot foreground sync for the `sync` CLI command
pub async fn run_cli(conf: &Conf) -> Result<()> {
    let creds = conf.credentials()?;
    let pool = db::pool(conf)?;
    if !db::sync_status::queries_async::try_begin("Descargando reportes de Evolta...", &pool)
        .await?
    {
        Err("Sync is already in progress")?
    }
    run(&pool, conf, &creds).await?;
    Ok(())
}
