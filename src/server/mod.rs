use crate::conf::Conf;
use crate::{db, rest, Result};
use actix_cors::Cors;
use actix_web::web::scope;
use actix_web::{
    middleware::{Compress, NormalizePath},
    web::Data,
    App, HttpServer,
};
use actix_web::dev::Service;
use futures_util::future::FutureExt;
use time::OffsetDateTime;
use tracing::info;

pub async fn run(conf: Conf) -> Result<()> {
    // All the worker threads are sharing a single connection pool
    let pool = db::pool(&conf)?;

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();
        for origin in &conf.allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap_fn(|req, srv| {
                let req_method = req.method().as_str().to_string();
                let req_path = req.path().to_string();
                let req_time = OffsetDateTime::now_utc();
                srv.call(req).map(move |res| {
                    if let Ok(res) = res.as_ref() {
                        let res_status = res.status().as_u16();
                        info!(
                            req_method,
                            req_path,
                            res_status,
                            res_time_sec = (OffsetDateTime::now_utc() - req_time).as_seconds_f64(),
                        );
                    }
                    res
                })
            })
            .wrap(NormalizePath::trim())
            .wrap(Compress::default())
            .wrap(cors)
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(conf.clone()))
            .service(rest::status::root)
            .service(
                scope("api")
                    .service(scope("status").service(rest::status::get))
                    .service(scope("semaforo").service(rest::semaforo::get))
                    .service(
                        scope("metas")
                            .service(rest::goals::get)
                            .service(rest::goals::post_bulk),
                    )
                    .service(scope("meta").service(rest::goals::post))
                    .service(scope("sync").service(rest::sync::post)),
            )
    })
    .bind(("0.0.0.0", 8000))?
    .run()
    .await?;

    Ok(())
}
