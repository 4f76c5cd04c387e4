//! # Session Service Module
//!
//! Bearer-token sign-in against the user store. A sign-in upserts the user
//! document, mints a session token and returns the stored logo so the
//! editor can restore it immediately.
//!
//! ## Registered Routes:
//!
//! *   **`POST /sign-in`**: upserts the user by email and returns a fresh
//!     token together with the user snapshot and stored logo.
//! *   **`POST /sign-out`**: deletes the presented session token.
//! *   **`GET /me`**: resolves the presented token to its user snapshot.

use actix_web::web::{get, post, scope};
use actix_web::{web, HttpRequest, HttpResponse, Responder, Scope};
use log::info;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use common::model::session::SessionSnapshot;
use common::requests::{ErrorResponse, SignInRequest, SignInResponse};

use crate::AppState;

const API_PATH: &str = "/api/session";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/sign-in", post().to(sign_in))
        .route("/sign-out", post().to(sign_out))
        .route("/me", get().to(me))
}

/// Extracts the bearer token from the `Authorization` header, if any.
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

/// Resolves the request's bearer token to a session snapshot. `None` means
/// the caller is anonymous; handlers decide whether that is acceptable.
pub fn current_session(state: &AppState, req: &HttpRequest) -> Option<SessionSnapshot> {
    let token = bearer_token(req)?;
    state.store().session_for_token(&token).ok().flatten()
}

pub fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(ErrorResponse {
        error: "sign in to continue".to_string(),
    })
}

async fn sign_in(state: web::Data<AppState>, payload: web::Json<SignInRequest>) -> impl Responder {
    let email = payload.email.trim();
    if email.is_empty() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "email must not be empty".to_string(),
        });
    }

    let store = state.store();
    let result = store
        .upsert_user(email, payload.display_name.trim())
        .and_then(|user_id| {
            let created_at = OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default();
            let token = store.create_session(&user_id, &created_at)?;
            let logo_url = store.logo_for_user(&user_id)?;
            Ok((user_id, token, logo_url))
        });

    match result {
        Ok((user_id, token, logo_url)) => {
            info!("signed in {} as {}", email, user_id);
            HttpResponse::Ok().json(SignInResponse {
                token,
                user: SessionSnapshot {
                    user_id,
                    display_name: payload.display_name.trim().to_string(),
                    email: email.to_string(),
                },
                logo_url,
            })
        }
        Err(e) => HttpResponse::ServiceUnavailable().json(ErrorResponse {
            error: e.to_string(),
        }),
    }
}

async fn sign_out(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    if let Some(token) = bearer_token(&req) {
        if let Err(e) = state.store().delete_session(&token) {
            return HttpResponse::ServiceUnavailable().json(ErrorResponse {
                error: e.to_string(),
            });
        }
    }
    HttpResponse::Ok().finish()
}

async fn me(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    match current_session(&state, &req) {
        Some(session) => HttpResponse::Ok().json(session),
        None => unauthorized(),
    }
}
