//! Google Drive v3 REST client.
//!
//! Talks to the Drive API with the per-user OAuth bearer token stored at
//! connect time. `ureq` is synchronous, so callers run these methods inside
//! `tokio::task::spawn_blocking`. Folder picking is interactive and happens
//! client-side; this module only ever receives the picked folder id.

use serde_json::Value;

/// Name of the folder used when the user does not pick one explicitly.
pub const DEFAULT_FOLDER_NAME: &str = "Invoice Proposals";

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveFile {
    pub id: String,
    pub view_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("Google Drive is not connected")]
    NotConnected,
    #[error("Google Drive request failed: {0}")]
    Http(String),
    #[error("unexpected Google Drive response: {0}")]
    Protocol(String),
}

/// Remote destination for exported artifacts, as the lifecycle coordinator
/// sees it. Upload failures are reported, never swallowed; the coordinator
/// decides that they are non-fatal.
pub trait CloudUploader {
    /// Finds a non-trashed folder named `name`, creating it when missing,
    /// and returns its id.
    fn resolve_or_create_folder(&self, name: &str) -> Result<String, DriveError>;

    /// Uploads `bytes` as `file_name`, optionally into `folder_id`, and
    /// returns the created file's id and view link.
    fn upload(
        &self,
        bytes: &[u8],
        file_name: &str,
        folder_id: Option<&str>,
    ) -> Result<DriveFile, DriveError>;
}

/// Stand-in uploader for users who never connected Google Drive. Every call
/// reports `NotConnected`, which the coordinator turns into a non-fatal
/// warning on the export.
pub struct DisconnectedUploader;

impl CloudUploader for DisconnectedUploader {
    fn resolve_or_create_folder(&self, _name: &str) -> Result<String, DriveError> {
        Err(DriveError::NotConnected)
    }

    fn upload(
        &self,
        _bytes: &[u8],
        _file_name: &str,
        _folder_id: Option<&str>,
    ) -> Result<DriveFile, DriveError> {
        Err(DriveError::NotConnected)
    }
}

pub struct GoogleDriveClient {
    access_token: String,
    api_base: String,
    upload_base: String,
}

impl GoogleDriveClient {
    pub fn new(access_token: String, api_base: String, upload_base: String) -> GoogleDriveClient {
        GoogleDriveClient {
            access_token,
            api_base,
            upload_base,
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    fn create_folder(&self, name: &str) -> Result<String, DriveError> {
        let agent = ureq::Agent::new_with_defaults();
        let url = format!("{}/drive/v3/files", self.api_base);
        let response = agent
            .post(&url)
            .header("Authorization", &self.bearer())
            .send_json(serde_json::json!({
                "name": name,
                "mimeType": FOLDER_MIME,
            }))
            .map_err(classify)?;

        let folder: Value = response
            .into_body()
            .read_json()
            .map_err(|e| DriveError::Protocol(e.to_string()))?;
        folder["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| DriveError::Protocol("folder creation returned no id".to_string()))
    }
}

impl CloudUploader for GoogleDriveClient {
    fn resolve_or_create_folder(&self, name: &str) -> Result<String, DriveError> {
        let agent = ureq::Agent::new_with_defaults();
        let query = folder_query(name);
        let url = format!(
            "{}/drive/v3/files?q={}&fields=files(id,name)",
            self.api_base,
            urlencoded(&query)
        );

        let response = agent
            .get(&url)
            .header("Authorization", &self.bearer())
            .call()
            .map_err(classify)?;

        let listing: Value = response
            .into_body()
            .read_json()
            .map_err(|e| DriveError::Protocol(e.to_string()))?;

        if let Some(id) = listing["files"]
            .as_array()
            .and_then(|files| files.first())
            .and_then(|file| file["id"].as_str())
        {
            return Ok(id.to_string());
        }

        self.create_folder(name)
    }

    fn upload(
        &self,
        bytes: &[u8],
        file_name: &str,
        folder_id: Option<&str>,
    ) -> Result<DriveFile, DriveError> {
        let agent = ureq::Agent::new_with_defaults();
        let url = format!(
            "{}/upload/drive/v3/files?uploadType=multipart&fields=id,name,webViewLink",
            self.upload_base
        );

        let metadata = upload_metadata(file_name, folder_id);
        let boundary = format!("invoice-{}", uuid::Uuid::new_v4());
        let body = multipart_related_body(&metadata, bytes, &boundary);

        let response = agent
            .post(&url)
            .header("Authorization", &self.bearer())
            .header(
                "Content-Type",
                &format!("multipart/related; boundary={}", boundary),
            )
            .send(&body[..])
            .map_err(classify)?;

        let file: Value = response
            .into_body()
            .read_json()
            .map_err(|e| DriveError::Protocol(e.to_string()))?;

        match (file["id"].as_str(), file["webViewLink"].as_str()) {
            (Some(id), Some(view_url)) => Ok(DriveFile {
                id: id.to_string(),
                view_url: view_url.to_string(),
            }),
            _ => Err(DriveError::Protocol(
                "upload response missing id or webViewLink".to_string(),
            )),
        }
    }
}

/// Drive search expression for a non-trashed folder with the given name.
fn folder_query(name: &str) -> String {
    format!(
        "name='{}' and mimeType='{}' and trashed=false",
        name.replace('\\', "\\\\").replace('\'', "\\'"),
        FOLDER_MIME
    )
}

fn upload_metadata(file_name: &str, folder_id: Option<&str>) -> String {
    let mut metadata = serde_json::json!({
        "name": file_name,
        "mimeType": "application/pdf",
    });
    if let Some(folder) = folder_id {
        metadata["parents"] = serde_json::json!([folder]);
    }
    metadata.to_string()
}

/// Builds a `multipart/related` body with a JSON metadata part and a PDF
/// part. ureq does not bundle multipart support, so the body is framed by
/// hand.
fn multipart_related_body(metadata: &str, pdf: &[u8], boundary: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata.len() + pdf.len() + 256);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(metadata.as_bytes());
    body.extend_from_slice(
        format!("\r\n--{boundary}\r\nContent-Type: application/pdf\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(pdf);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

/// Collapses a ureq error into the Drive taxonomy. ureq v3 formats status
/// errors as "http status: NNN ...", which this inspects for auth failures.
fn classify(err: ureq::Error) -> DriveError {
    let msg = err.to_string();
    if let Some(status) = extract_status(&msg) {
        if status == 401 || status == 403 {
            return DriveError::NotConnected;
        }
    }
    DriveError::Http(msg)
}

fn extract_status(msg: &str) -> Option<u16> {
    for word in msg.split_whitespace() {
        let clean = word.trim_matches(|c: char| !c.is_ascii_digit());
        if clean.len() == 3 {
            if let Ok(code) = clean.parse::<u16>() {
                if (100..=599).contains(&code) {
                    return Some(code);
                }
            }
        }
    }
    None
}

/// Percent-encode a query string value (spaces → %20, etc.).
fn urlencoded(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => out.push(ch),
            ' ' => out.push_str("%20"),
            _ => {
                for byte in ch.to_string().as_bytes() {
                    out.push_str(&format!("%{:02X}", byte));
                }
            }
        }
    }
    out
}
