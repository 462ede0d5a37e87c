use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use taskdesk::{
    auth::TokenService,
    config::Config,
    routes,
    store::{PgStore, Store},
};

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    log::error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| startup_error("invalid configuration", e))?;

    let pg = PgStore::connect(&config.database_url, config.database_max_connections)
        .await
        .map_err(|e| startup_error("failed to connect to database", e))?;
    pg.migrate()
        .await
        .map_err(|e| startup_error("failed to run migrations", e))?;

    let store: Arc<dyn Store> = Arc::new(pg.clone());
    let store = web::Data::from(store);
    let tokens = web::Data::new(TokenService::new(&config.jwt_secret, config.token_ttl_hours));

    if config.token_ttl_hours.is_none() {
        log::warn!("TOKEN_TTL_HOURS not set: issued tokens do not expire");
    }
    log::info!("Starting taskdesk server at {}", config.server_url());

    HttpServer::new(move || {
        App::new()
            .app_data(store.clone())
            .app_data(tokens.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(routes::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await?;

    log::info!("Server stopped, closing database pool");
    pg.close().await;
    Ok(())
}
