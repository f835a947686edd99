use crate::db;
use crate::rest::error::{RestApiError, RestResult};
use crate::rest::Message;
use crate::service::metrics::TARGET_PROJECTS;
use actix_web::{
    get, post,
    web::{Data, Json},
};
use deadpool_sqlite::Pool;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Serialize)]
pub struct GetResponse {
    pub metas: Map<String, Value>,
}

#[derive(Deserialize)]
pub struct UpdateArgs {
    pub project: String,
    pub metric: String,
    pub value: i64,
}

#[derive(Deserialize)]
pub struct BulkUpdateArgs {
    pub project: String,
    pub metas: HashMap<String, i64>,
}

/// All goal sets keyed by project, creating missing ones at zero
#[get("")]
pub async fn get(pool: Data<Pool>) -> RestResult<GetResponse> {
    let goals = db::goal::queries_async::ensure_all(&TARGET_PROJECTS, &pool)
        .await
        .map_err(|_| RestApiError::database())?;
    let mut metas = Map::new();
    for goal in goals {
        metas.insert(goal.project.clone(), goal.metrics_map().into());
    }
    Ok(Json(GetResponse { metas }))
}

#[post("")]
pub async fn post(args: Json<UpdateArgs>, pool: Data<Pool>) -> RestResult<Message> {
    let args = args.into_inner();
    if !db::goal::schema::METRIC_KEYS.contains(&args.metric.as_str()) {
        return Err(RestApiError::invalid_input(format!(
            "Unknown metric: {}",
            args.metric
        )));
    }
    db::goal::queries_async::upsert(
        args.project,
        HashMap::from([(args.metric, args.value)]),
        &pool,
    )
    .await
    .map_err(|_| RestApiError::database())?;
    Ok(Json(Message::new("Meta actualizada")))
}

#[post("bulk")]
pub async fn post_bulk(args: Json<BulkUpdateArgs>, pool: Data<Pool>) -> RestResult<Message> {
    let args = args.into_inner();
    db::goal::queries_async::upsert(args.project, args.metas, &pool)
        .await
        .map_err(|_| RestApiError::database())?;
    Ok(Json(Message::new("Metas actualizadas")))
}

#[cfg(test)]
mod test {
    use crate::test::mock_pool;
    use crate::Result;
    use actix_web::test::TestRequest;
    use actix_web::web::{scope, Data};
    use actix_web::{test, App};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn get_synthesizes_default_goals() -> Result<()> {
        let pool = mock_pool().await;
        let app = test::init_service(
            App::new()
                .app_data(Data::new(pool))
                .service(scope("metas").service(super::get)),
        )
        .await;
        let req = TestRequest::get().uri("/metas").to_request();
        let res: Value = test::call_and_read_body_json(&app, req).await;
        let metas = res["metas"].as_object().unwrap();
        assert_eq!(4, metas.len());
        assert_eq!(0, metas["SUNNY"]["prospectos_totales"]);
        Ok(())
    }

    #[actix_web::test]
    async fn post_updates_single_metric() -> Result<()> {
        let pool = mock_pool().await;
        let app = test::init_service(
            App::new()
                .app_data(Data::new(pool.clone()))
                .service(scope("meta").service(super::post))
                .service(scope("metas").service(super::get)),
        )
        .await;
        let req = TestRequest::post()
            .uri("/meta")
            .set_json(json!({"project": "SUNNY", "metric": "prospectos_totales", "value": 100}))
            .to_request();
        let res: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!("Meta actualizada", res["message"]);
        let req = TestRequest::get().uri("/metas").to_request();
        let res: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(100, res["metas"]["SUNNY"]["prospectos_totales"]);
        Ok(())
    }

    #[actix_web::test]
    async fn post_rejects_unknown_metric() -> Result<()> {
        let pool = mock_pool().await;
        let app = test::init_service(
            App::new()
                .app_data(Data::new(pool))
                .service(scope("meta").service(super::post)),
        )
        .await;
        let req = TestRequest::post()
            .uri("/meta")
            .set_json(json!({"project": "SUNNY", "metric": "typo", "value": 1}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(400, res.status().as_u16());
        Ok(())
    }

    #[actix_web::test]
    async fn bulk_update_is_idempotent() -> Result<()> {
        let pool = mock_pool().await;
        let app = test::init_service(
            App::new()
                .app_data(Data::new(pool))
                .service(scope("metas").service(super::get).service(super::post_bulk)),
        )
        .await;
        let payload = json!({
            "project": "LITORAL 900",
            "metas": {"prospectos_totales": 80, "metas_minutas": 3}
        });
        for _ in 0..2 {
            let req = TestRequest::post()
                .uri("/metas/bulk")
                .set_json(&payload)
                .to_request();
            let res: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!("Metas actualizadas", res["message"]);
        }
        let req = TestRequest::get().uri("/metas").to_request();
        let res: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(80, res["metas"]["LITORAL 900"]["prospectos_totales"]);
        assert_eq!(3, res["metas"]["LITORAL 900"]["metas_minutas"]);
        Ok(())
    }
}
