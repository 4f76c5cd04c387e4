//! Invoice record lifecycle coordinator.
//!
//! The single place allowed to create an `InvoiceRecord` or move one
//! forward. Records follow `NonExistent → Saved → Downloaded`; no
//! transition goes backward, and every save or export creates a fresh
//! record. The one in-place update is `mark_downloaded_from_history`, used
//! when a history entry is re-exported without regenerating the PDF.
//!
//! Failure semantics:
//! - a missing session is recoverable: the caller is told to prompt
//!   sign-in and the in-memory edit is never dropped;
//! - a rendering failure aborts the export before anything is persisted or
//!   uploaded;
//! - a Drive failure is non-fatal: the local artifact already exists, so
//!   the record is still written and the outcome carries a warning;
//! - cancelling the folder picker is a benign no-op with zero side effects.
//!
//! Adapter errors never cross this boundary raw; they are translated into
//! `LifecycleError` or folded into the outcome before reaching a handler.

use log::{info, warn};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use common::model::export::{ExportTarget, FolderChoice};
use common::model::invoice::InvoicePayload;
use common::model::record::{EditorSnapshot, InvoiceDraft, InvoiceRecord, InvoiceStatus};
use common::model::session::SessionSnapshot;

use crate::services::drive::client::{CloudUploader, DEFAULT_FOLDER_NAME};
use crate::services::invoices::pdf::PdfExporter;
use crate::store::{InvoiceStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// No authenticated session. Recoverable: prompt sign-in and retry;
    /// the edit stays in memory.
    #[error("sign in to save invoices")]
    NotAuthenticated,
    /// PDF generation failed. Fatal to this export attempt; nothing was
    /// persisted or uploaded.
    #[error("PDF generation failed: {0}")]
    Render(String),
    /// The document store rejected a write. The edit stays in memory and
    /// the user may retry.
    #[error("saving the invoice failed: {0}")]
    Persistence(String),
}

impl From<StoreError> for LifecycleError {
    fn from(e: StoreError) -> LifecycleError {
        LifecycleError::Persistence(e.to_string())
    }
}

/// How an export ended. Remote trouble and picker cancellation are
/// outcomes, not errors: the caller always gets an explicit answer.
#[derive(Debug)]
pub enum ExportOutcome {
    Completed {
        record_id: String,
        file_name: String,
        pdf: Vec<u8>,
        drive_url: Option<String>,
    },
    CompletedWithWarning {
        record_id: String,
        file_name: String,
        pdf: Vec<u8>,
        warning: String,
    },
    Cancelled,
}

pub struct Coordinator<'a> {
    store: &'a dyn InvoiceStore,
    exporter: &'a dyn PdfExporter,
    uploader: &'a dyn CloudUploader,
}

impl<'a> Coordinator<'a> {
    pub fn new(
        store: &'a dyn InvoiceStore,
        exporter: &'a dyn PdfExporter,
        uploader: &'a dyn CloudUploader,
    ) -> Coordinator<'a> {
        Coordinator {
            store,
            exporter,
            uploader,
        }
    }

    /// Persists the current edit as a fresh `Saved` record and returns its
    /// id. Never updates an existing record, even when the payload was
    /// loaded from history.
    pub fn save_for_later(
        &self,
        payload: &InvoicePayload,
        session: Option<&SessionSnapshot>,
        logo_url: Option<&str>,
    ) -> Result<String, LifecycleError> {
        let owner = session.ok_or(LifecycleError::NotAuthenticated)?;
        let draft = InvoiceDraft {
            owner_id: owner.user_id.clone(),
            payload: payload.clone(),
            status: InvoiceStatus::Saved,
            created_at: now_rfc3339(),
            logo_url: logo_url.map(str::to_string),
            drive_url: None,
        };
        let record_id = self.store.create_invoice(&draft)?;
        info!(
            "saved invoice {} ({}) for {}",
            record_id,
            payload.template_kind().as_str(),
            owner.user_id
        );
        Ok(record_id)
    }

    /// Renders the payload to PDF, optionally pushes it to Google Drive and
    /// records the download.
    ///
    /// Order matters: rendering completes first and aborts everything on
    /// failure; a cancelled folder pick returns before any upload or store
    /// write; the record is written last, with the Drive reference only
    /// when the upload succeeded.
    pub fn export_and_record(
        &self,
        payload: &InvoicePayload,
        session: Option<&SessionSnapshot>,
        logo_url: Option<&str>,
        target: &ExportTarget,
    ) -> Result<ExportOutcome, LifecycleError> {
        let owner = session.ok_or(LifecycleError::NotAuthenticated)?;

        let pdf = self
            .exporter
            .render(payload, logo_url)
            .map_err(|e| LifecycleError::Render(e.to_string()))?;
        let file_name = export_file_name(payload);

        let folder_choice = match target {
            ExportTarget::LocalOnly => None,
            ExportTarget::Remote { folder } | ExportTarget::Both { folder } => Some(folder),
        };

        let mut warning = None;
        let mut drive_url = None;
        if let Some(choice) = folder_choice {
            let folder_id = match choice {
                FolderChoice::Cancelled => return Ok(ExportOutcome::Cancelled),
                FolderChoice::Picked { folder_id } => Some(folder_id.clone()),
                FolderChoice::Default => {
                    match self.uploader.resolve_or_create_folder(DEFAULT_FOLDER_NAME) {
                        Ok(id) => Some(id),
                        Err(e) => {
                            // Fall through to an upload without a parent
                            // folder; the upload itself decides the outcome.
                            warn!("could not resolve Drive folder: {}", e);
                            None
                        }
                    }
                }
            };

            match self.uploader.upload(&pdf, &file_name, folder_id.as_deref()) {
                Ok(file) => drive_url = Some(file.view_url),
                Err(e) => {
                    warn!("Drive upload failed for {}: {}", file_name, e);
                    warning = Some(format!(
                        "PDF downloaded locally, but the Google Drive upload failed: {}",
                        e
                    ));
                }
            }
        }

        let draft = InvoiceDraft {
            owner_id: owner.user_id.clone(),
            payload: payload.clone(),
            status: InvoiceStatus::Downloaded,
            created_at: now_rfc3339(),
            logo_url: logo_url.map(str::to_string),
            drive_url: drive_url.clone(),
        };
        let record_id = self.store.create_invoice(&draft)?;
        info!(
            "recorded download {} ({}) for {}",
            record_id,
            payload.template_kind().as_str(),
            owner.user_id
        );

        Ok(match warning {
            Some(warning) => ExportOutcome::CompletedWithWarning {
                record_id,
                file_name,
                pdf,
                warning,
            },
            None => ExportOutcome::Completed {
                record_id,
                file_name,
                pdf,
                drive_url,
            },
        })
    }

    /// Pure projection of a history record into an editor snapshot. The
    /// record itself is untouched; in particular its status does not move.
    pub fn load_into_editor(record: &InvoiceRecord) -> EditorSnapshot {
        EditorSnapshot {
            payload: record.payload.clone(),
            logo_url: record.logo_url.clone(),
        }
    }

    /// Marks an existing record `Downloaded` in place. This is the one
    /// exception to "every save creates a new record", used when a history
    /// entry is re-exported.
    pub fn mark_downloaded_from_history(
        &self,
        record_id: &str,
        session: Option<&SessionSnapshot>,
    ) -> Result<(), LifecycleError> {
        let owner = session.ok_or(LifecycleError::NotAuthenticated)?;
        self.store.set_invoice_status(
            record_id,
            &owner.user_id,
            InvoiceStatus::Downloaded,
            None,
        )?;
        info!("marked invoice {} downloaded for {}", record_id, owner.user_id);
        Ok(())
    }
}

/// `Proposal-<number>.pdf`, with path separators kept out of the name.
pub fn export_file_name(payload: &InvoicePayload) -> String {
    let number = payload.proposal_number().trim();
    let number = if number.is_empty() { "Untitled" } else { number };
    let safe: String = number
        .chars()
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect();
    format!("Proposal-{}.pdf", safe)
}

fn now_rfc3339() -> String {
    // Formatting the current UTC instant as RFC 3339 cannot fail for any
    // representable year.
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use common::model::invoice::{ClassicInvoice, TemplateKind};
    use common::model::record::InvoiceStatus;

    use crate::services::drive::client::{DriveError, DriveFile};
    use crate::services::invoices::pdf::RenderError;

    #[derive(Default)]
    struct MemStore {
        invoices: RefCell<Vec<InvoiceRecord>>,
        fail_create: bool,
    }

    impl MemStore {
        fn records(&self) -> Vec<InvoiceRecord> {
            self.invoices.borrow().clone()
        }
    }

    impl InvoiceStore for MemStore {
        fn create_invoice(&self, draft: &InvoiceDraft) -> Result<String, StoreError> {
            if self.fail_create {
                return Err(StoreError::Backend("disk full".to_string()));
            }
            let mut invoices = self.invoices.borrow_mut();
            let id = format!("inv-{}", invoices.len() + 1);
            invoices.push(InvoiceRecord {
                id: id.clone(),
                owner_id: draft.owner_id.clone(),
                payload: draft.payload.clone(),
                status: draft.status,
                created_at: draft.created_at.clone(),
                logo_url: draft.logo_url.clone(),
                drive_url: draft.drive_url.clone(),
            });
            Ok(id)
        }

        fn set_invoice_status(
            &self,
            id: &str,
            owner_id: &str,
            status: InvoiceStatus,
            drive_url: Option<&str>,
        ) -> Result<(), StoreError> {
            let mut invoices = self.invoices.borrow_mut();
            let record = invoices
                .iter_mut()
                .find(|r| r.id == id && r.owner_id == owner_id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            record.status = status;
            if drive_url.is_some() {
                record.drive_url = drive_url.map(str::to_string);
            }
            Ok(())
        }

        fn get_invoice(&self, id: &str, owner_id: &str) -> Result<InvoiceRecord, StoreError> {
            self.invoices
                .borrow()
                .iter()
                .find(|r| r.id == id && r.owner_id == owner_id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(id.to_string()))
        }

        fn invoices_for_owner(
            &self,
            owner_id: &str,
            status: Option<InvoiceStatus>,
        ) -> Result<Vec<InvoiceRecord>, StoreError> {
            let mut records: Vec<InvoiceRecord> = self
                .invoices
                .borrow()
                .iter()
                .filter(|r| r.owner_id == owner_id)
                .filter(|r| status.map(|s| r.status == s).unwrap_or(true))
                .cloned()
                .collect();
            records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(records)
        }

        fn delete_invoice(&self, id: &str, owner_id: &str) -> Result<(), StoreError> {
            let mut invoices = self.invoices.borrow_mut();
            let before = invoices.len();
            invoices.retain(|r| !(r.id == id && r.owner_id == owner_id));
            if invoices.len() == before {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeExporter {
        fail: bool,
        renders: RefCell<u32>,
    }

    impl PdfExporter for FakeExporter {
        fn render(
            &self,
            _payload: &InvoicePayload,
            _logo_url: Option<&str>,
        ) -> Result<Vec<u8>, RenderError> {
            *self.renders.borrow_mut() += 1;
            if self.fail {
                return Err(RenderError::Pdf("canvas exploded".to_string()));
            }
            Ok(b"%PDF-1.4 fake".to_vec())
        }
    }

    #[derive(Default)]
    struct FakeUploader {
        fail_upload: bool,
        fail_folder: bool,
        uploads: RefCell<Vec<(String, Option<String>)>>,
        folder_lookups: RefCell<Vec<String>>,
    }

    impl CloudUploader for FakeUploader {
        fn resolve_or_create_folder(&self, name: &str) -> Result<String, DriveError> {
            self.folder_lookups.borrow_mut().push(name.to_string());
            if self.fail_folder {
                return Err(DriveError::Http("folder lookup failed".to_string()));
            }
            Ok("folder-default".to_string())
        }

        fn upload(
            &self,
            _bytes: &[u8],
            file_name: &str,
            folder_id: Option<&str>,
        ) -> Result<DriveFile, DriveError> {
            self.uploads
                .borrow_mut()
                .push((file_name.to_string(), folder_id.map(str::to_string)));
            if self.fail_upload {
                return Err(DriveError::Http("quota exceeded".to_string()));
            }
            Ok(DriveFile {
                id: "file-1".to_string(),
                view_url: "https://drive.example/view/file-1".to_string(),
            })
        }
    }

    fn session() -> SessionSnapshot {
        SessionSnapshot {
            user_id: "user-1".to_string(),
            display_name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
        }
    }

    fn payload() -> InvoicePayload {
        let mut classic = ClassicInvoice::default();
        classic.client.proposal_num = "CVMS0008".to_string();
        InvoicePayload::Classic(classic)
    }

    #[test]
    fn save_for_later_creates_a_saved_record_without_drive_reference() {
        for kind in [TemplateKind::Classic, TemplateKind::Modern] {
            let store = MemStore::default();
            let exporter = FakeExporter::default();
            let uploader = FakeUploader::default();
            let coordinator = Coordinator::new(&store, &exporter, &uploader);

            let payload = InvoicePayload::default_for(kind);
            let id = coordinator
                .save_for_later(&payload, Some(&session()), Some("data:logo"))
                .unwrap();

            let records = store.records();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].id, id);
            assert_eq!(records[0].status, InvoiceStatus::Saved);
            assert_eq!(records[0].drive_url, None);
            assert_eq!(records[0].template_kind(), kind);
            assert_eq!(records[0].logo_url.as_deref(), Some("data:logo"));
        }
    }

    #[test]
    fn anonymous_save_is_rejected_and_nothing_is_written() {
        let store = MemStore::default();
        let exporter = FakeExporter::default();
        let uploader = FakeUploader::default();
        let coordinator = Coordinator::new(&store, &exporter, &uploader);

        let payload = payload();
        let err = coordinator.save_for_later(&payload, None, None).unwrap_err();
        assert!(matches!(err, LifecycleError::NotAuthenticated));
        assert!(store.records().is_empty());
        // The caller's payload is untouched and can be retried after
        // signing in.
        assert_eq!(payload.proposal_number(), "CVMS0008");
    }

    #[test]
    fn render_failure_aborts_before_any_store_or_drive_call() {
        let store = MemStore::default();
        let exporter = FakeExporter {
            fail: true,
            ..FakeExporter::default()
        };
        let uploader = FakeUploader::default();
        let coordinator = Coordinator::new(&store, &exporter, &uploader);

        let err = coordinator
            .export_and_record(
                &payload(),
                Some(&session()),
                None,
                &ExportTarget::Both {
                    folder: FolderChoice::Default,
                },
            )
            .unwrap_err();

        assert!(matches!(err, LifecycleError::Render(_)));
        assert!(store.records().is_empty());
        assert!(uploader.uploads.borrow().is_empty());
        assert!(uploader.folder_lookups.borrow().is_empty());
    }

    #[test]
    fn local_only_export_records_a_download_without_touching_drive() {
        let store = MemStore::default();
        let exporter = FakeExporter::default();
        let uploader = FakeUploader::default();
        let coordinator = Coordinator::new(&store, &exporter, &uploader);

        let outcome = coordinator
            .export_and_record(&payload(), Some(&session()), None, &ExportTarget::LocalOnly)
            .unwrap();

        match outcome {
            ExportOutcome::Completed {
                file_name,
                pdf,
                drive_url,
                ..
            } => {
                assert_eq!(file_name, "Proposal-CVMS0008.pdf");
                assert!(pdf.starts_with(b"%PDF"));
                assert_eq!(drive_url, None);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, InvoiceStatus::Downloaded);
        assert_eq!(records[0].drive_url, None);
        assert!(uploader.uploads.borrow().is_empty());
    }

    #[test]
    fn remote_success_sets_the_drive_reference() {
        let store = MemStore::default();
        let exporter = FakeExporter::default();
        let uploader = FakeUploader::default();
        let coordinator = Coordinator::new(&store, &exporter, &uploader);

        let outcome = coordinator
            .export_and_record(
                &payload(),
                Some(&session()),
                None,
                &ExportTarget::Both {
                    folder: FolderChoice::Default,
                },
            )
            .unwrap();

        match outcome {
            ExportOutcome::Completed { drive_url, .. } => {
                assert_eq!(
                    drive_url.as_deref(),
                    Some("https://drive.example/view/file-1")
                );
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(
            uploader.folder_lookups.borrow().as_slice(),
            ["Invoice Proposals"]
        );
        assert_eq!(
            uploader.uploads.borrow().as_slice(),
            [(
                "Proposal-CVMS0008.pdf".to_string(),
                Some("folder-default".to_string())
            )]
        );
        let records = store.records();
        assert_eq!(records[0].status, InvoiceStatus::Downloaded);
        assert_eq!(
            records[0].drive_url.as_deref(),
            Some("https://drive.example/view/file-1")
        );
    }

    #[test]
    fn remote_failure_still_records_the_download_with_a_warning() {
        let store = MemStore::default();
        let exporter = FakeExporter::default();
        let uploader = FakeUploader {
            fail_upload: true,
            ..FakeUploader::default()
        };
        let coordinator = Coordinator::new(&store, &exporter, &uploader);

        let outcome = coordinator
            .export_and_record(
                &payload(),
                Some(&session()),
                None,
                &ExportTarget::Both {
                    folder: FolderChoice::Default,
                },
            )
            .unwrap();

        match outcome {
            ExportOutcome::CompletedWithWarning { warning, pdf, .. } => {
                assert!(warning.contains("Google Drive"));
                assert!(pdf.starts_with(b"%PDF"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, InvoiceStatus::Downloaded);
        assert_eq!(records[0].drive_url, None);
    }

    #[test]
    fn folder_resolution_failure_degrades_to_a_rootless_upload() {
        let store = MemStore::default();
        let exporter = FakeExporter::default();
        let uploader = FakeUploader {
            fail_folder: true,
            ..FakeUploader::default()
        };
        let coordinator = Coordinator::new(&store, &exporter, &uploader);

        let outcome = coordinator
            .export_and_record(
                &payload(),
                Some(&session()),
                None,
                &ExportTarget::Remote {
                    folder: FolderChoice::Default,
                },
            )
            .unwrap();

        assert!(matches!(outcome, ExportOutcome::Completed { .. }));
        assert_eq!(
            uploader.uploads.borrow().as_slice(),
            [("Proposal-CVMS0008.pdf".to_string(), None)]
        );
    }

    #[test]
    fn cancelled_folder_pick_is_a_no_op() {
        let store = MemStore::default();
        let exporter = FakeExporter::default();
        let uploader = FakeUploader::default();
        let coordinator = Coordinator::new(&store, &exporter, &uploader);

        let outcome = coordinator
            .export_and_record(
                &payload(),
                Some(&session()),
                None,
                &ExportTarget::Remote {
                    folder: FolderChoice::Cancelled,
                },
            )
            .unwrap();

        assert!(matches!(outcome, ExportOutcome::Cancelled));
        assert!(store.records().is_empty());
        assert!(uploader.uploads.borrow().is_empty());
        assert!(uploader.folder_lookups.borrow().is_empty());
    }

    #[test]
    fn saving_then_exporting_creates_two_distinct_records() {
        let store = MemStore::default();
        let exporter = FakeExporter::default();
        let uploader = FakeUploader::default();
        let coordinator = Coordinator::new(&store, &exporter, &uploader);

        let saved_id = coordinator
            .save_for_later(&payload(), Some(&session()), None)
            .unwrap();
        coordinator
            .export_and_record(&payload(), Some(&session()), None, &ExportTarget::LocalOnly)
            .unwrap();

        let records = store.records();
        assert_eq!(records.len(), 2);
        let saved = records.iter().find(|r| r.id == saved_id).unwrap();
        assert_eq!(saved.status, InvoiceStatus::Saved);
        let downloaded = records.iter().find(|r| r.id != saved_id).unwrap();
        assert_eq!(downloaded.status, InvoiceStatus::Downloaded);
    }

    #[test]
    fn load_into_editor_round_trips_without_mutating_the_record() {
        let store = MemStore::default();
        let exporter = FakeExporter::default();
        let uploader = FakeUploader::default();
        let coordinator = Coordinator::new(&store, &exporter, &uploader);

        let id = coordinator
            .save_for_later(&payload(), Some(&session()), Some("data:logo"))
            .unwrap();
        let record = store.get_invoice(&id, "user-1").unwrap();

        let snapshot = Coordinator::load_into_editor(&record);
        assert_eq!(snapshot.payload, record.payload);
        assert_eq!(snapshot.template_kind(), record.template_kind());
        assert_eq!(snapshot.logo_url, record.logo_url);

        let after = store.get_invoice(&id, "user-1").unwrap();
        assert_eq!(after, record);
        assert_eq!(after.status, InvoiceStatus::Saved);
    }

    #[test]
    fn history_redownload_updates_status_in_place() {
        let store = MemStore::default();
        let exporter = FakeExporter::default();
        let uploader = FakeUploader::default();
        let coordinator = Coordinator::new(&store, &exporter, &uploader);

        let id = coordinator
            .save_for_later(&payload(), Some(&session()), None)
            .unwrap();
        coordinator
            .mark_downloaded_from_history(&id, Some(&session()))
            .unwrap();

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, InvoiceStatus::Downloaded);

        let err = coordinator
            .mark_downloaded_from_history("missing", Some(&session()))
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Persistence(_)));
    }

    #[test]
    fn persistence_failure_surfaces_and_preserves_the_edit() {
        let store = MemStore {
            fail_create: true,
            ..MemStore::default()
        };
        let exporter = FakeExporter::default();
        let uploader = FakeUploader::default();
        let coordinator = Coordinator::new(&store, &exporter, &uploader);

        let payload = payload();
        let err = coordinator
            .save_for_later(&payload, Some(&session()), None)
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Persistence(_)));
        assert_eq!(payload.proposal_number(), "CVMS0008");
    }

    #[test]
    fn export_file_name_is_derived_from_the_proposal_number() {
        let mut classic = ClassicInvoice::default();
        classic.client.proposal_num = "A/B 9".to_string();
        assert_eq!(
            export_file_name(&InvoicePayload::Classic(classic.clone())),
            "Proposal-A-B 9.pdf"
        );
        classic.client.proposal_num = "   ".to_string();
        assert_eq!(
            export_file_name(&InvoicePayload::Classic(classic)),
            "Proposal-Untitled.pdf"
        );
    }
}
