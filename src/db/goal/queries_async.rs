use super::queries;
use super::schema::Goal;
use crate::Result;
use deadpool_sqlite::Pool;
use std::collections::HashMap;

pub async fn select_all(pool: &Pool) -> Result<Vec<Goal>> {
    pool.get()
        .await?
        .interact(|conn| queries::select_all(conn))
        .await?
}

pub async fn ensure_all(projects: &[&str], pool: &Pool) -> Result<Vec<Goal>> {
    let projects: Vec<String> = projects.iter().map(|it| it.to_string()).collect();
    pool.get()
        .await?
        .interact(move |conn| {
            let projects: Vec<&str> = projects.iter().map(|it| it.as_str()).collect();
            queries::ensure_all(&projects, conn)
        })
        .await?
}

pub async fn upsert(project: String, metrics: HashMap<String, i64>, pool: &Pool) -> Result<Goal> {
    pool.get()
        .await?
        .interact(move |conn| queries::upsert(&project, &metrics, conn))
        .await?
}
