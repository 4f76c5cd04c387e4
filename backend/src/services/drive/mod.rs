//! # Google Drive Service Module
//!
//! Connection management for the per-user Drive access token. The OAuth
//! dance happens client-side; the browser hands over the resulting access
//! token and this module stores it for the export pipeline to use.
//!
//! ## Registered Routes:
//!
//! *   **`POST /connect`**: stores the presented access token for the user.
//! *   **`POST /disconnect`**: forgets the stored token.
//! *   **`GET /status`**: reports whether a token is on file.

pub mod client;

use actix_web::web::{get, post, scope};
use actix_web::{web, HttpRequest, HttpResponse, Responder, Scope};
use log::info;

use common::requests::{DriveConnectRequest, DriveStatusResponse, ErrorResponse};

use crate::services::session::{current_session, unauthorized};
use crate::AppState;

const API_PATH: &str = "/api/drive";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/connect", post().to(connect))
        .route("/disconnect", post().to(disconnect))
        .route("/status", get().to(status))
}

async fn connect(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<DriveConnectRequest>,
) -> impl Responder {
    let Some(session) = current_session(&state, &req) else {
        return unauthorized();
    };
    if payload.access_token.trim().is_empty() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "access token must not be empty".to_string(),
        });
    }
    match state
        .store()
        .set_drive_token(&session.user_id, payload.access_token.trim())
    {
        Ok(()) => {
            info!("connected Google Drive for {}", session.user_id);
            HttpResponse::Ok().json(DriveStatusResponse { connected: true })
        }
        Err(e) => HttpResponse::ServiceUnavailable().json(ErrorResponse {
            error: e.to_string(),
        }),
    }
}

async fn disconnect(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let Some(session) = current_session(&state, &req) else {
        return unauthorized();
    };
    match state.store().clear_drive_token(&session.user_id) {
        Ok(()) => HttpResponse::Ok().json(DriveStatusResponse { connected: false }),
        Err(e) => HttpResponse::ServiceUnavailable().json(ErrorResponse {
            error: e.to_string(),
        }),
    }
}

async fn status(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let Some(session) = current_session(&state, &req) else {
        return unauthorized();
    };
    match state.store().drive_token(&session.user_id) {
        Ok(token) => HttpResponse::Ok().json(DriveStatusResponse {
            connected: token.is_some(),
        }),
        Err(e) => HttpResponse::ServiceUnavailable().json(ErrorResponse {
            error: e.to_string(),
        }),
    }
}
