use super::queries;
use super::schema::SyncStatus;
use crate::Result;
use deadpool_sqlite::Pool;

pub async fn select(pool: &Pool) -> Result<SyncStatus> {
    pool.get()
        .await?
        .interact(|conn| queries::select(conn))
        .await?
}

pub async fn try_begin(message: &str, pool: &Pool) -> Result<bool> {
    let message = message.to_string();
    pool.get()
        .await?
        .interact(move |conn| queries::try_begin(&message, conn))
        .await?
}

pub async fn set_message(message: &str, pool: &Pool) -> Result<()> {
    let message = message.to_string();
    pool.get()
        .await?
        .interact(move |conn| queries::set_message(&message, conn))
        .await?
}

pub async fn set_completed(message: &str, pool: &Pool) -> Result<()> {
    let message = message.to_string();
    pool.get()
        .await?
        .interact(move |conn| queries::set_completed(&message, conn))
        .await?
}

pub async fn set_error(message: &str, pool: &Pool) -> Result<()> {
    let message = message.to_string();
    pool.get()
        .await?
        .interact(move |conn| queries::set_error(&message, conn))
        .await?
}
