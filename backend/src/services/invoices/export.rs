use actix_web::{web, HttpRequest, HttpResponse, Responder};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use common::requests::{ErrorResponse, ExportRequest, ExportResponse, ExportStatus};

use crate::services::drive::client::{CloudUploader, DisconnectedUploader, GoogleDriveClient};
use crate::services::invoices::lifecycle::{Coordinator, ExportOutcome};
use crate::services::invoices::pdf::GenpdfExporter;
use crate::services::session::{current_session, unauthorized};
use crate::AppState;

/// `POST /api/invoices/export`. Rendering, the Drive round trip and the
/// record insert are all blocking, so the whole pipeline runs on the
/// blocking pool.
pub async fn process(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<ExportRequest>,
) -> impl Responder {
    let Some(session) = current_session(&state, &req) else {
        return unauthorized();
    };

    let store = state.store();
    let drive_token = match store.drive_token(&session.user_id) {
        Ok(token) => token,
        Err(e) => {
            return HttpResponse::ServiceUnavailable().json(ErrorResponse {
                error: e.to_string(),
            })
        }
    };

    let config = state.config.clone();
    let request = payload.into_inner();
    let result = tokio::task::spawn_blocking(move || {
        let exporter = GenpdfExporter::new(&config.fonts_dir);
        let uploader: Box<dyn CloudUploader> = match drive_token {
            Some(token) => Box::new(GoogleDriveClient::new(
                token,
                config.drive_api_base,
                config.drive_upload_base,
            )),
            None => Box::new(DisconnectedUploader),
        };
        let coordinator = Coordinator::new(&store, &exporter, uploader.as_ref());
        coordinator.export_and_record(
            &request.payload,
            Some(&session),
            request.logo_url.as_deref(),
            &request.target,
        )
    })
    .await;

    match result {
        Ok(Ok(outcome)) => HttpResponse::Ok().json(outcome_response(outcome)),
        Ok(Err(e)) => super::error_response(e),
        Err(e) => HttpResponse::ServiceUnavailable().json(ErrorResponse {
            error: e.to_string(),
        }),
    }
}

fn outcome_response(outcome: ExportOutcome) -> ExportResponse {
    match outcome {
        ExportOutcome::Completed {
            record_id,
            file_name,
            pdf,
            drive_url,
        } => ExportResponse {
            status: ExportStatus::Completed,
            record_id: Some(record_id),
            file_name: Some(file_name),
            pdf_base64: Some(BASE64.encode(&pdf)),
            drive_url,
            warning: None,
        },
        ExportOutcome::CompletedWithWarning {
            record_id,
            file_name,
            pdf,
            warning,
        } => ExportResponse {
            status: ExportStatus::CompletedWithWarning,
            record_id: Some(record_id),
            file_name: Some(file_name),
            pdf_base64: Some(BASE64.encode(&pdf)),
            drive_url: None,
            warning: Some(warning),
        },
        ExportOutcome::Cancelled => ExportResponse {
            status: ExportStatus::Cancelled,
            record_id: None,
            file_name: None,
            pdf_base64: None,
            drive_url: None,
            warning: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_outcome_carries_no_artifact() {
        let response = outcome_response(ExportOutcome::Cancelled);
        assert_eq!(response.status, ExportStatus::Cancelled);
        assert!(response.record_id.is_none());
        assert!(response.pdf_base64.is_none());
    }

    #[test]
    fn warning_outcome_keeps_the_pdf_but_not_a_drive_link() {
        let response = outcome_response(ExportOutcome::CompletedWithWarning {
            record_id: "inv-1".to_string(),
            file_name: "Proposal-1.pdf".to_string(),
            pdf: b"%PDF".to_vec(),
            warning: "upload failed".to_string(),
        });
        assert_eq!(response.status, ExportStatus::CompletedWithWarning);
        assert_eq!(response.pdf_base64.as_deref(), Some(&*BASE64.encode(b"%PDF")));
        assert!(response.drive_url.is_none());
        assert_eq!(response.warning.as_deref(), Some("upload failed"));
    }
}
