//! # Editor Service Module
//!
//! Exposes the per-user editing workspace: the payload under edit, the logo
//! bound to it and the history record it was loaded from. Switching
//! templates goes through here so the reseed-on-switch rule is enforced in
//! one place.
//!
//! ## Registered Routes:
//!
//! *   **`GET ""`**: current workspace, seeding a fresh classic one on
//!     first access.
//! *   **`PUT /payload`**: replaces the edited payload with the request
//!     body.
//! *   **`POST /template/{kind}`**: switches the workspace to the named
//!     template. A real switch starts from the template's defaults and
//!     forgets any loaded record; same-template switches keep edits.

use actix_web::web::{get, post, put, scope};
use actix_web::{web, HttpRequest, HttpResponse, Responder, Scope};
use serde::Serialize;

use common::model::invoice::{InvoicePayload, TemplateKind};
use common::model::record::EditorSnapshot;
use common::requests::ErrorResponse;

use crate::editor::Workspace;
use crate::services::session::{current_session, unauthorized};
use crate::AppState;

const API_PATH: &str = "/api/editor";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(fetch))
        .route("/payload", put().to(set_payload))
        .route("/template/{kind}", post().to(switch_template))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceView {
    #[serde(flatten)]
    snapshot: EditorSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    loaded_record: Option<String>,
}

impl From<Workspace> for WorkspaceView {
    fn from(ws: Workspace) -> WorkspaceView {
        WorkspaceView {
            snapshot: ws.snapshot,
            loaded_record: ws.loaded_record,
        }
    }
}

async fn fetch(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let Some(session) = current_session(&state, &req) else {
        return unauthorized();
    };
    let ws = state.workspaces.current(&session.user_id).await;
    HttpResponse::Ok().json(WorkspaceView::from(ws))
}

async fn set_payload(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<InvoicePayload>,
) -> impl Responder {
    let Some(session) = current_session(&state, &req) else {
        return unauthorized();
    };
    state
        .workspaces
        .set_payload(&session.user_id, payload.into_inner())
        .await;
    HttpResponse::Ok().finish()
}

async fn switch_template(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> impl Responder {
    let Some(session) = current_session(&state, &req) else {
        return unauthorized();
    };
    let Some(kind) = TemplateKind::from_str(&path) else {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: format!("unknown template type: {}", path),
        });
    };
    let ws = state.workspaces.switch_template(&session.user_id, kind).await;
    HttpResponse::Ok().json(WorkspaceView::from(ws))
}
