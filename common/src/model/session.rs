use serde::{Deserialize, Serialize};

/// The authenticated identity observed at the moment of an operation.
///
/// Lifecycle operations take this snapshot as an explicit argument instead
/// of reading ambient auth state, so sign-out between calls is always seen
/// and the coordinator stays testable without a live auth backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
}
