//! On-disk settings document.
//!
//! The document is plain JSON holding one `ProbeSettings` object. Documents
//! written by the older dashboard keep everything in one file with the
//! settings under a `pingSettings` key; those are read as well.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::probe::ProbeSettings;
use crate::store::SettingsError;

/// Parse a settings document. Missing fields take their defaults.
pub fn parse_document(content: &str) -> Result<ProbeSettings, SettingsError> {
    let value: Value = serde_json::from_str(content)?;
    let settings = match value.get("pingSettings") {
        Some(inner) => serde_json::from_value(inner.clone())?,
        None => serde_json::from_value(value)?,
    };
    Ok(settings)
}

/// Read the document, `Ok(None)` when it does not exist yet.
pub fn read_document(path: &Path) -> Result<Option<ProbeSettings>, SettingsError> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_document(&content).map(Some),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write the document through a temporary file and rename it into place.
pub async fn write_document(path: &Path, settings: &ProbeSettings) -> Result<(), SettingsError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }

    let body = serde_json::to_vec_pretty(settings)?;
    let tmp = temp_path(path);
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
