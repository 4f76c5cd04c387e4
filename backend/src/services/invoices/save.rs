use actix_web::{web, HttpRequest, HttpResponse, Responder};

use common::requests::{SaveInvoiceRequest, SaveInvoiceResponse};

use crate::services::drive::client::DisconnectedUploader;
use crate::services::invoices::lifecycle::Coordinator;
use crate::services::invoices::pdf::GenpdfExporter;
use crate::services::session::current_session;
use crate::AppState;

/// `POST /api/invoices/save`. Saving never renders and never touches
/// Drive, so the coordinator gets inert adapters for both.
pub async fn process(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<SaveInvoiceRequest>,
) -> impl Responder {
    let session = current_session(&state, &req);

    let store = state.store();
    let exporter = GenpdfExporter::new(&state.config.fonts_dir);
    let uploader = DisconnectedUploader;
    let coordinator = Coordinator::new(&store, &exporter, &uploader);

    match coordinator.save_for_later(
        &payload.payload,
        session.as_ref(),
        payload.logo_url.as_deref(),
    ) {
        Ok(record_id) => HttpResponse::Ok().json(SaveInvoiceResponse { record_id }),
        Err(e) => super::error_response(e),
    }
}
