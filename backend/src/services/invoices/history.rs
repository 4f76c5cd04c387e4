use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

use common::model::record::InvoiceStatus;
use common::requests::ErrorResponse;

use crate::services::drive::client::DisconnectedUploader;
use crate::services::invoices::lifecycle::Coordinator;
use crate::services::invoices::pdf::GenpdfExporter;
use crate::services::session::{current_session, unauthorized};
use crate::store::{InvoiceStore, StoreError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryFilter {
    status: Option<String>,
}

fn store_error_response(err: StoreError) -> HttpResponse {
    match err {
        StoreError::NotFound(_) => HttpResponse::NotFound().json(ErrorResponse {
            error: err.to_string(),
        }),
        StoreError::Backend(_) => HttpResponse::ServiceUnavailable().json(ErrorResponse {
            error: err.to_string(),
        }),
    }
}

/// `GET /api/invoices?status=saved|downloaded`.
pub async fn list(
    state: web::Data<AppState>,
    req: HttpRequest,
    filter: web::Query<HistoryFilter>,
) -> impl Responder {
    let Some(session) = current_session(&state, &req) else {
        return unauthorized();
    };
    let status = match filter.status.as_deref() {
        None => None,
        Some(raw) => match InvoiceStatus::from_str(raw) {
            Some(status) => Some(status),
            None => {
                return HttpResponse::BadRequest().json(ErrorResponse {
                    error: format!("unknown status filter: {}", raw),
                })
            }
        },
    };
    match state.store().invoices_for_owner(&session.user_id, status) {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => store_error_response(e),
    }
}

/// `GET /api/invoices/{id}/load`. Projects the record into the caller's
/// workspace and returns the snapshot. The record itself is not touched.
pub async fn load(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> impl Responder {
    let Some(session) = current_session(&state, &req) else {
        return unauthorized();
    };
    let record = match state.store().get_invoice(&path, &session.user_id) {
        Ok(record) => record,
        Err(e) => return store_error_response(e),
    };
    let snapshot = Coordinator::load_into_editor(&record);
    state
        .workspaces
        .adopt(&session.user_id, snapshot.clone(), &record.id)
        .await;
    HttpResponse::Ok().json(snapshot)
}

/// `POST /api/invoices/{id}/downloaded`. The single in-place transition.
pub async fn mark_downloaded(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> impl Responder {
    let session = current_session(&state, &req);

    let store = state.store();
    let exporter = GenpdfExporter::new(&state.config.fonts_dir);
    let uploader = DisconnectedUploader;
    let coordinator = Coordinator::new(&store, &exporter, &uploader);

    match coordinator.mark_downloaded_from_history(&path, session.as_ref()) {
        Ok(()) => HttpResponse::Ok().finish(),
        Err(e) => super::error_response(e),
    }
}

/// `DELETE /api/invoices/{id}`.
pub async fn remove(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> impl Responder {
    let Some(session) = current_session(&state, &req) else {
        return unauthorized();
    };
    match state.store().delete_invoice(&path, &session.user_id) {
        Ok(()) => HttpResponse::Ok().finish(),
        Err(e) => store_error_response(e),
    }
}
