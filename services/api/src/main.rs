use actix_cors::Cors;
use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::middleware::Logger;
use actix_web::HttpServer;
use tracing_subscriber::EnvFilter;

use api::state::{AppState, Settings};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let s = Settings::from_env();
    let db = db::connect(&s.database_url, 10).await.expect("db");
    db::migrate(&db).await.expect("migrations");

    let state = AppState {
        db,
        jwt: auth::JwtKeys::from_secret(&s.jwt_secret),
        token_ttl: s.token_ttl_seconds.unwrap_or(auth::DEFAULT_TOKEN_TTL_SECS),
    };
    let bind = s.bind_addr.unwrap_or_else(|| "0.0.0.0:8080".into());

    let governor_conf = GovernorConfigBuilder::default()
        .burst_size(10)
        .finish()
        .expect("governor config");

    tracing::info!(
        env = s.app_env.as_deref().unwrap_or("development"),
        %bind,
        "starting clinic api"
    );

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_header()
            .allow_any_method();
        api::create_app(state.clone())
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Governor::new(&governor_conf))
    })
    .bind(bind)?
    .run()
    .await
}
