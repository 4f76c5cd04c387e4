//! # Logo Service Module
//!
//! One logo per user, stored on the user document as a base64 data URL so
//! sign-in can restore it without a second asset fetch. Uploading replaces
//! the previous logo and rebinds the user's editor workspace to it.
//!
//! ## Registered Routes:
//!
//! *   **`GET ""`**: returns the stored logo data URL, if any.
//! *   **`POST ""`**: accepts a multipart image upload, validates and
//!     re-encodes it as a data URL, stores it and updates the workspace.
//! *   **`DELETE ""`**: removes the stored logo and clears it from the
//!     workspace.

use actix_multipart::Multipart;
use actix_web::web::{delete, get, post, scope};
use actix_web::{web, HttpRequest, HttpResponse, Responder, Scope};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::StreamExt;
use log::info;

use common::requests::{ErrorResponse, LogoResponse};

use crate::services::session::{current_session, unauthorized};
use crate::AppState;

const API_PATH: &str = "/api/logo";

// Data URLs live inside JSON bodies and user documents; keep them small.
const MAX_LOGO_BYTES: usize = 2 * 1024 * 1024;

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(fetch))
        .route("", post().to(upload))
        .route("", delete().to(remove))
}

async fn fetch(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let Some(session) = current_session(&state, &req) else {
        return unauthorized();
    };
    match state.store().logo_for_user(&session.user_id) {
        Ok(logo_url) => HttpResponse::Ok().json(LogoResponse { logo_url }),
        Err(e) => HttpResponse::ServiceUnavailable().json(ErrorResponse {
            error: e.to_string(),
        }),
    }
}

async fn upload(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: Multipart,
) -> impl Responder {
    let Some(session) = current_session(&state, &req) else {
        return unauthorized();
    };

    let data_url = match read_image_as_data_url(payload).await {
        Ok(url) => url,
        Err(e) => return HttpResponse::BadRequest().json(ErrorResponse { error: e }),
    };

    if let Err(e) = state.store().set_logo(&session.user_id, &data_url) {
        return HttpResponse::ServiceUnavailable().json(ErrorResponse {
            error: e.to_string(),
        });
    }
    state
        .workspaces
        .set_logo(&session.user_id, Some(data_url.clone()))
        .await;
    info!("stored logo for {}", session.user_id);
    HttpResponse::Ok().json(LogoResponse {
        logo_url: Some(data_url),
    })
}

async fn remove(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let Some(session) = current_session(&state, &req) else {
        return unauthorized();
    };
    if let Err(e) = state.store().set_logo(&session.user_id, "") {
        return HttpResponse::ServiceUnavailable().json(ErrorResponse {
            error: e.to_string(),
        });
    }
    state.workspaces.set_logo(&session.user_id, None).await;
    HttpResponse::Ok().json(LogoResponse { logo_url: None })
}

/// Reads the first image field of the multipart body and re-encodes it as a
/// `data:<mime>;base64,...` URL. The bytes are sniffed with `image` so a
/// mislabeled or corrupt upload is rejected before it reaches the store.
async fn read_image_as_data_url(mut payload: Multipart) -> Result<String, String> {
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| e.to_string())?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));
        if name.as_deref() != Some("file") {
            continue;
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| e.to_string())?;
            if bytes.len() + chunk.len() > MAX_LOGO_BYTES {
                return Err("logo must be at most 2 MB".to_string());
            }
            bytes.extend_from_slice(&chunk);
        }

        let format = image::guess_format(&bytes)
            .map_err(|_| "the uploaded file is not a recognised image".to_string())?;
        let mime = match format {
            image::ImageFormat::Png => "image/png",
            image::ImageFormat::Jpeg => "image/jpeg",
            _ => return Err("only PNG and JPEG logos are supported".to_string()),
        };

        return Ok(format!("data:{};base64,{}", mime, BASE64.encode(&bytes)));
    }
    Err("missing file field".to_string())
}
