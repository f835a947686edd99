use crate::conf::Conf;
use crate::db;
use crate::db::sync_status::schema::SyncStatus;
use crate::rest::error::{RestApiError, RestResult};
use crate::service::metrics::{self, MetricRow, TARGET_PROJECTS};
use crate::service::reports;
use actix_web::{
    get,
    web::{self, Data, Json},
};
use deadpool_sqlite::Pool;
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Serialize)]
pub struct SemaforoResponse {
    pub data: Vec<MetricRow>,
    pub status: SyncStatus,
}

/// The KPI snapshot. Tables are re-parsed from the latest exports on every
/// read, so the response always reflects whatever data is on disk, even
/// mid-sync.
#[get("")]
pub async fn get(pool: Data<Pool>, conf: Data<Conf>) -> RestResult<SemaforoResponse> {
    let goals = db::goal::queries_async::ensure_all(&TARGET_PROJECTS, &pool)
        .await
        .map_err(|_| RestApiError::database())?;

    let download_dir = conf.download_dir.clone();
    let tables = web::block(move || reports::load_all(&download_dir))
        .await
        .map_err(|e| RestApiError::internal(format!("Table load failed: {e}")))?;

    let data = metrics::compute(&tables, &goals, OffsetDateTime::now_utc().date());

    let status = db::sync_status::queries_async::select(&pool)
        .await
        .map_err(|_| RestApiError::database())?;

    Ok(Json(SemaforoResponse { data, status }))
}
