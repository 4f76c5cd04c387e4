//! # Invoice Service Module
//!
//! The invoice record lifecycle over HTTP. Handlers authenticate, assemble
//! the lifecycle coordinator with the real adapters and translate its
//! outcomes into responses; every decision about what gets persisted lives
//! in `lifecycle`, not here.
//!
//! ## Registered Routes:
//!
//! *   **`POST /save`**: persists the posted payload as a new saved record.
//! *   **`POST /export`**: renders the posted payload to PDF, optionally
//!     uploads it to Google Drive, and records the download.
//! *   **`GET ""`**: lists the caller's records, newest first, optionally
//!     filtered by status.
//! *   **`GET /{id}/load`**: projects a record into the caller's editor
//!     workspace.
//! *   **`POST /{id}/downloaded`**: marks an existing record downloaded in
//!     place.
//! *   **`DELETE /{id}`**: permanently removes a record.

pub mod lifecycle;
pub mod pdf;

mod export;
mod history;
mod save;

use actix_web::web::{delete, get, post, scope};
use actix_web::{HttpResponse, Scope};

use common::requests::ErrorResponse;

use crate::services::session::unauthorized;
use lifecycle::LifecycleError;

const API_PATH: &str = "/api/invoices";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/save", post().to(save::process))
        .route("/export", post().to(export::process))
        .route("", get().to(history::list))
        .route("/{id}/load", get().to(history::load))
        .route("/{id}/downloaded", post().to(history::mark_downloaded))
        .route("/{id}", delete().to(history::remove))
}

/// Maps coordinator errors onto the HTTP surface. Warnings and
/// cancellations never reach this point; they are successful outcomes.
fn error_response(err: LifecycleError) -> HttpResponse {
    match err {
        LifecycleError::NotAuthenticated => unauthorized(),
        LifecycleError::Render(_) => HttpResponse::BadGateway().json(ErrorResponse {
            error: err.to_string(),
        }),
        LifecycleError::Persistence(_) => HttpResponse::ServiceUnavailable().json(ErrorResponse {
            error: err.to_string(),
        }),
    }
}
