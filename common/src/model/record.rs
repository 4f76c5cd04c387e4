use serde::{Deserialize, Serialize};

use crate::model::invoice::{InvoicePayload, TemplateKind};

/// Lifecycle status of a persisted invoice.
///
/// `Saved` means persisted but not yet exported; `Downloaded` means exported
/// at least once. Transitions only ever move forward (`Saved` →
/// `Downloaded`) and only through explicit user actions. Loading a record
/// back into the editor never changes its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    #[serde(rename = "saved")]
    Saved,
    #[serde(rename = "downloaded")]
    Downloaded,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Saved => "saved",
            InvoiceStatus::Downloaded => "downloaded",
        }
    }

    pub fn from_str(s: &str) -> Option<InvoiceStatus> {
        match s {
            "saved" => Some(InvoiceStatus::Saved),
            "downloaded" => Some(InvoiceStatus::Downloaded),
            _ => None,
        }
    }
}

/// A persisted invoice snapshot.
///
/// The id is assigned by the document store on first save. `created_at` is
/// fixed at persistence time and never updated. `logo_url` is a snapshot of
/// the owner's logo at save time; later logo changes do not rewrite history.
/// `drive_url` is only ever present on `Downloaded` records whose export was
/// also pushed to Google Drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    pub id: String,
    pub owner_id: String,
    #[serde(flatten)]
    pub payload: InvoicePayload,
    pub status: InvoiceStatus,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drive_url: Option<String>,
}

impl InvoiceRecord {
    pub fn template_kind(&self) -> TemplateKind {
        self.payload.template_kind()
    }
}

/// A record as handed to the document store for creation, before an id
/// exists.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDraft {
    pub owner_id: String,
    pub payload: InvoicePayload,
    pub status: InvoiceStatus,
    pub created_at: String,
    pub logo_url: Option<String>,
    pub drive_url: Option<String>,
}

/// What the field-edit workspace adopts when a history entry is loaded:
/// a copy of the record's payload and logo, nothing more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorSnapshot {
    #[serde(flatten)]
    pub payload: InvoicePayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

impl EditorSnapshot {
    pub fn template_kind(&self) -> TemplateKind {
        self.payload.template_kind()
    }
}
