//! Server configuration, read once at startup from the environment.

use std::env;
use std::path::PathBuf;

const DEFAULT_DB_PATH: &str = "invoices.sqlite";
const DEFAULT_FONTS_DIR: &str = "./fonts";
const DRIVE_API_BASE: &str = "https://www.googleapis.com";
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// SQLite file acting as the document store.
    pub database_path: PathBuf,
    /// Directory holding the TTF families used for PDF rendering.
    pub fonts_dir: PathBuf,
    pub drive_api_base: String,
    pub drive_upload_base: String,
}

impl Config {
    pub fn from_env() -> Config {
        Config {
            host: env::var("INVOICE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("INVOICE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            database_path: env::var("INVOICE_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH)),
            fonts_dir: env::var("INVOICE_FONTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_FONTS_DIR)),
            drive_api_base: env::var("INVOICE_DRIVE_API_BASE")
                .unwrap_or_else(|_| DRIVE_API_BASE.to_string()),
            drive_upload_base: env::var("INVOICE_DRIVE_UPLOAD_BASE")
                .unwrap_or_else(|_| DRIVE_UPLOAD_BASE.to_string()),
        }
    }
}
