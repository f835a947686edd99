use crate::db;
use crate::db::sync_status::schema::SyncStatus;
use crate::rest::error::{RestApiError, RestResult};
use crate::rest::Message;
use actix_web::{
    get,
    web::{Data, Json},
};
use deadpool_sqlite::Pool;

#[get("/")]
pub async fn root() -> Json<Message> {
    Json(Message::new("Semaforo API running"))
}

#[get("")]
pub async fn get(pool: Data<Pool>) -> RestResult<SyncStatus> {
    let status = db::sync_status::queries_async::select(&pool)
        .await
        .map_err(|_| RestApiError::database())?;
    Ok(Json(status))
}

#[cfg(test)]
mod test {
    use crate::test::mock_pool;
    use crate::Result;
    use actix_web::test::TestRequest;
    use actix_web::web::{scope, Data};
    use actix_web::{test, App};
    use serde_json::Value;

    #[actix_web::test]
    async fn get_initial_status() -> Result<()> {
        let pool = mock_pool().await;
        let app = test::init_service(
            App::new()
                .app_data(Data::new(pool))
                .service(scope("status").service(super::get)),
        )
        .await;
        let req = TestRequest::get().uri("/status").to_request();
        let res: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!("Ready", res["state"]);
        assert!(res["last_updated"].is_null());
        Ok(())
    }

    #[actix_web::test]
    async fn root_is_alive() -> Result<()> {
        let app = test::init_service(App::new().service(super::root)).await;
        let req = TestRequest::get().uri("/").to_request();
        let res: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!("Semaforo API running", res["message"]);
        Ok(())
    }
}
