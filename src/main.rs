use std::time::Duration;

use dotenvy::dotenv;
use snafu::ResultExt;

use wetube::api::{self, AppState};
use wetube::config;
use wetube::database::Database;
use wetube::error::*;
use wetube::logger;
use wetube::session::SessionStore;

const SESSION_SWEEP_PERIOD: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    dotenv().ok();

    let config = config::load()?;

    let _guard = logger::init(&config)?;

    let database = Database::connect(&config.database)
        .await
        .context(ConnectDatabaseSnafu)?;

    let storage = config.storage();
    storage.prepare().await.context(PrepareStorageSnafu)?;

    let engine = api::render::engine().context(LoadTemplatesSnafu)?;

    let sessions = SessionStore::new(config.secure_cookies);
    tokio::spawn(
        sessions
            .clone()
            .expire_every(SESSION_SWEEP_PERIOD, config.session_idle()),
    );

    let state = AppState::new(database, engine, sessions, storage);
    let router = api::create_router(state, config.upload_limit);

    let listener = tokio::net::TcpListener::bind(config.host)
        .await
        .context(BindAddressSnafu { address: config.host })?;

    tracing::info!(address = %config.host, "listening");

    axum::serve(listener, router).await.context(WebServerSnafu)
}
