use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info};

use taskdesk::{
    auth::TokenKeys,
    config::Config,
    db, routes,
    state::AppState,
    store::PgStore,
};

fn startup_error<E: std::fmt::Display>(context: &str, e: E) -> io::Error {
    error!("{}: {}", context, e);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| startup_error("Invalid configuration", e))?;

    let pool = db::connect(&config.database)
        .await
        .map_err(|e| startup_error("Failed to connect to database", e))?;

    if config.database.run_migrations {
        db::migrate(&pool)
            .await
            .map_err(|e| startup_error("Failed to run migrations", e))?;
    }

    let state = web::Data::new(AppState::new(
        Arc::new(PgStore::new(pool)),
        TokenKeys::new(&config.jwt_secret, config.jwt_expiration_hours),
    ));

    info!("Starting TaskDesk server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .app_data(state.clone())
            .configure(routes::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
