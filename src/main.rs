mod cors;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, cookie::Key, web};
use std::sync::Arc;

use plan_checkout::{
    auth, common::env_config::Config, db, logger,
    plans::{
        routes::plan,
        services::billing::{PaymentGateway, StripeGateway},
        store::{PgPlanStore, PlanStore},
    },
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let config_data = config.clone();

    // get info
    let logger_enabled = config_data.console_logging_enabled;
    let is_production = config.environment == "production";
    let origin = config.cors_allowed_origin.clone();
    let cookie_secure = !origin.contains("localhost");

    // init logger
    if logger_enabled {
        logger::setup().expect("Failed to set up logger");
    }

    // init db connection and run migrations
    let pool = db::setup(&config.database_url, is_production)
        .await
        .expect("Failed to set up database");

    let plan_store: Arc<dyn PlanStore> = Arc::new(PgPlanStore::new(pool.clone()));
    let gateway: Arc<dyn PaymentGateway> =
        Arc::new(StripeGateway::new(&config.stripe.secret_key));
    let session_key = Key::derive_from(config.session_secret.as_bytes());

    HttpServer::new(move || {
        App::new()
            .wrap(logger::middleware(logger_enabled))
            .wrap(cors::default(&origin))
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
                    .cookie_secure(cookie_secure)
                    .build(),
            )
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config_data.clone()))
            .app_data(web::Data::new(plan_store.clone()))
            .app_data(web::Data::new(gateway.clone()))
            .service(plan::get_plans)
            // Registered last so the empty scope cannot shadow public routes.
            .service(
                web::scope("")
                    .wrap(auth::AuthMiddleware::new(config_data.jwt_config.secret.clone()))
                    .service(plan::get_checkout)
                    .service(plan::post_subscription),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
