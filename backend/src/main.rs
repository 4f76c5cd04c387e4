mod config;
mod editor;
mod services;
mod store;

use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::info;

use crate::config::Config;
use crate::editor::Workspaces;
use crate::store::SqliteStore;

/// Shared application state handed to every handler as `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub workspaces: Workspaces,
}

impl AppState {
    /// Store handle for the configured database. Connections are opened per
    /// operation, so handing out a fresh handle is cheap.
    pub fn store(&self) -> SqliteStore {
        SqliteStore::new(&self.config.database_path)
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::from_env();
    let state = AppState {
        config: config.clone(),
        workspaces: Workspaces::new(),
    };

    state
        .store()
        .ensure_schema()
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    info!("Server running at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(10 * 1024 * 1024)) // 10 MB
            .app_data(web::Data::new(state.clone()))
            .service(services::session::configure_routes())
            .service(services::logo::configure_routes())
            .service(services::drive::configure_routes())
            .service(services::editor::configure_routes())
            .service(services::invoices::configure_routes())
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
