use serde::{Deserialize, Serialize};

/// Where an exported PDF should end up.
///
/// `LocalOnly` delivers the artifact to the caller and records the download.
/// `Remote` and `Both` additionally push the artifact to the connected
/// Google Drive; they carry the folder choice the user made in the picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExportTarget {
    LocalOnly,
    Remote { folder: FolderChoice },
    Both { folder: FolderChoice },
}

/// Outcome of the client-side Drive folder picker.
///
/// `Default` means "use the Invoice Proposals folder, creating it if
/// needed". `Cancelled` is an explicit marker: the user dismissed the
/// picker, and the whole export is treated as a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FolderChoice {
    Default,
    Picked {
        #[serde(rename = "folderId")]
        folder_id: String,
    },
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_target_wire_shape() {
        let target = ExportTarget::Both {
            folder: FolderChoice::Picked {
                folder_id: "folder-9".to_string(),
            },
        };
        let json = serde_json::to_value(&target).unwrap();
        assert_eq!(json["both"]["folder"]["picked"]["folderId"], "folder-9");

        let back: ExportTarget = serde_json::from_value(json).unwrap();
        assert_eq!(back, target);

        let local: ExportTarget = serde_json::from_str("\"localOnly\"").unwrap();
        assert_eq!(local, ExportTarget::LocalOnly);
    }
}
