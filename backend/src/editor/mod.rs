//! In-memory field-edit workspaces, one per signed-in user.
//!
//! A workspace holds the payload currently being edited, the logo bound to
//! it and, when the payload came from a history entry, the id of that
//! record. It is shared across request handlers as `web::Data` the same way
//! the rest of the application state is.
//!
//! Switching templates always starts the target template from its default
//! payload and forgets any loaded record, so a stale payload can never be
//! rendered under the wrong template.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use common::model::invoice::{InvoicePayload, TemplateKind};
use common::model::record::EditorSnapshot;

#[derive(Debug, Clone)]
pub struct Workspace {
    pub snapshot: EditorSnapshot,
    /// Id of the history record this payload was loaded from, if any.
    pub loaded_record: Option<String>,
}

impl Workspace {
    fn fresh(kind: TemplateKind) -> Workspace {
        Workspace {
            snapshot: EditorSnapshot {
                payload: InvoicePayload::default_for(kind),
                logo_url: None,
            },
            loaded_record: None,
        }
    }
}

#[derive(Clone, Default)]
pub struct Workspaces {
    inner: Arc<RwLock<HashMap<String, Workspace>>>,
}

impl Workspaces {
    pub fn new() -> Workspaces {
        Workspaces::default()
    }

    /// Current workspace for a user, creating a fresh classic-template
    /// workspace on first access.
    pub async fn current(&self, user_id: &str) -> Workspace {
        let mut map = self.inner.write().await;
        map.entry(user_id.to_string())
            .or_insert_with(|| Workspace::fresh(TemplateKind::Classic))
            .clone()
    }

    /// Replaces the edited payload, keeping logo and loaded-record marker.
    pub async fn set_payload(&self, user_id: &str, payload: InvoicePayload) {
        let mut map = self.inner.write().await;
        let ws = map
            .entry(user_id.to_string())
            .or_insert_with(|| Workspace::fresh(payload.template_kind()));
        ws.snapshot.payload = payload;
    }

    pub async fn set_logo(&self, user_id: &str, logo_url: Option<String>) {
        let mut map = self.inner.write().await;
        let ws = map
            .entry(user_id.to_string())
            .or_insert_with(|| Workspace::fresh(TemplateKind::Classic));
        ws.snapshot.logo_url = logo_url;
    }

    /// Switches the workspace to `kind`. Same-template switches are no-ops;
    /// a real switch reseeds the default payload for the target template and
    /// clears any loaded snapshot. The logo survives the switch.
    pub async fn switch_template(&self, user_id: &str, kind: TemplateKind) -> Workspace {
        let mut map = self.inner.write().await;
        let ws = map
            .entry(user_id.to_string())
            .or_insert_with(|| Workspace::fresh(kind));
        if ws.snapshot.template_kind() != kind {
            ws.snapshot.payload = InvoicePayload::default_for(kind);
            ws.loaded_record = None;
        }
        ws.clone()
    }

    /// Adopts a snapshot projected from a history record.
    pub async fn adopt(&self, user_id: &str, snapshot: EditorSnapshot, record_id: &str) {
        let mut map = self.inner.write().await;
        map.insert(
            user_id.to_string(),
            Workspace {
                snapshot,
                loaded_record: Some(record_id.to_string()),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::invoice::ClassicInvoice;

    fn loaded_snapshot() -> EditorSnapshot {
        let mut classic = ClassicInvoice::default();
        classic.client.proposal_num = "CVMS0008".to_string();
        EditorSnapshot {
            payload: InvoicePayload::Classic(classic),
            logo_url: Some("data:image/png;base64,AAAA".to_string()),
        }
    }

    #[tokio::test]
    async fn first_access_seeds_a_classic_workspace() {
        let workspaces = Workspaces::new();
        let ws = workspaces.current("u").await;
        assert_eq!(ws.snapshot.template_kind(), TemplateKind::Classic);
        assert!(ws.loaded_record.is_none());
    }

    #[tokio::test]
    async fn adopted_snapshot_is_returned_verbatim() {
        let workspaces = Workspaces::new();
        let snapshot = loaded_snapshot();
        workspaces.adopt("u", snapshot.clone(), "inv-1").await;

        let ws = workspaces.current("u").await;
        assert_eq!(ws.snapshot, snapshot);
        assert_eq!(ws.loaded_record.as_deref(), Some("inv-1"));
    }

    #[tokio::test]
    async fn switching_templates_clears_the_loaded_snapshot() {
        let workspaces = Workspaces::new();
        workspaces.adopt("u", loaded_snapshot(), "inv-1").await;

        let ws = workspaces.switch_template("u", TemplateKind::Modern).await;
        assert_eq!(ws.snapshot.template_kind(), TemplateKind::Modern);
        assert_eq!(
            ws.snapshot.payload,
            InvoicePayload::default_for(TemplateKind::Modern)
        );
        assert!(ws.loaded_record.is_none());
        // The logo is user-level state and survives the switch.
        assert_eq!(
            ws.snapshot.logo_url.as_deref(),
            Some("data:image/png;base64,AAAA")
        );
    }

    #[tokio::test]
    async fn same_template_switch_keeps_edits() {
        let workspaces = Workspaces::new();
        workspaces.adopt("u", loaded_snapshot(), "inv-1").await;

        let ws = workspaces.switch_template("u", TemplateKind::Classic).await;
        assert_eq!(ws.snapshot, loaded_snapshot());
        assert_eq!(ws.loaded_record.as_deref(), Some("inv-1"));
    }

    #[tokio::test]
    async fn workspaces_are_isolated_per_user() {
        let workspaces = Workspaces::new();
        workspaces.adopt("u1", loaded_snapshot(), "inv-1").await;

        let other = workspaces.current("u2").await;
        assert!(other.loaded_record.is_none());
        assert_eq!(
            other.snapshot.payload,
            InvoicePayload::default_for(TemplateKind::Classic)
        );
    }
}
