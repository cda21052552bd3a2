use auth::JwtKeys;
use db::Db;
use serde::Deserialize;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub jwt: JwtKeys,
    pub token_ttl: i64,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl_seconds: Option<i64>,
    pub bind_addr: Option<String>,
    pub app_env: Option<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let cfg = config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true))
            .build()
            .expect("config");

        cfg.try_deserialize::<Settings>()
            .expect("deserialize settings")
    }
}
