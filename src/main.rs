use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod balance;
mod config;
mod error;
mod exchange;
mod routes;
mod schemas;
mod store;

use config::Config;
use store::{InMemoryStore, MongoStore, Store};

fn cors(config: &Config) -> Cors {
    match &config.cors_allowed_origin {
        Some(origin) => Cors::default()
            .allowed_origin(origin)
            .allow_any_method()
            .allow_any_header(),
        None => Cors::permissive(),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,groupsplit=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match &config.mongodb_uri {
        Some(uri) => {
            tracing::info!(database = %config.database_name, "Connecting to MongoDB");
            let store = MongoStore::connect(uri, &config.database_name).await?;
            tracing::info!("Connected");
            Arc::new(store)
        }
        None => {
            tracing::warn!("MONGODB_URI is not set, data will be kept in memory only");
            Arc::new(InMemoryStore::new())
        }
    };

    tracing::info!("Listening on {}:{}", config.host, config.port);
    let bind = (config.host.clone(), config.port);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(cors(&config))
            .app_data(web::Data::from(store.clone()))
            .configure(routes::configure)
    })
    .bind(bind)?
    .run()
    .await?;
    Ok(())
}
