use crate::conf::Conf;
use crate::db;
use crate::db::sync_status::schema::SyncState;
use crate::rest::error::{RestApiError, RestResult};
use crate::rest::Message;
use crate::service;
use actix_web::{
    post,
    web::{Data, Json},
};
use deadpool_sqlite::Pool;
use tracing::error;

/// Kicks off a sync in the background and returns immediately. The outcome is
/// observed later through the shared status, a second trigger while one run
/// is in flight is rejected.
#[post("")]
pub async fn post(pool: Data<Pool>, conf: Data<Conf>) -> RestResult<Message> {
    let status = db::sync_status::queries_async::select(&pool)
        .await
        .map_err(|_| RestApiError::database())?;
    if status.state == SyncState::Syncing {
        return Err(RestApiError::conflict("Sync ya está en progreso"));
    }

    let creds = conf
        .credentials()
        .map_err(|e| RestApiError::configuration(e.to_string()))?;

    // the status row is shared across workers, so the state check above is
    // only advisory and the claim has to be a compare-and-set
    if !db::sync_status::queries_async::try_begin("Descargando reportes de Evolta...", &pool)
        .await
        .map_err(|_| RestApiError::database())?
    {
        return Err(RestApiError::conflict("Sync ya está en progreso"));
    }

    let pool = pool.into_inner();
    let conf = conf.into_inner();
    actix_web::rt::spawn(async move {
        if let Err(e) = service::sync::run(&pool, &conf, &creds).await {
            error!(error = e.to_string(), "Background sync failed");
        }
    });

    Ok(Json(Message::new("Sync iniciado")))
}
