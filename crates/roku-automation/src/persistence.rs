//! JSON-file persistence for automation settings
//!
//! Settings are intent, not state: they are what `restore()` re-arms
//! from after a process restart.

use crate::model::AutomationSettings;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;

/// Read persisted settings, defaulting on any failure
pub async fn load_settings(path: &Path) -> AutomationSettings {
    match fs::read_to_string(path).await {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
            tracing::warn!("Corrupt settings file {:?}: {}", path, e);
            AutomationSettings::default()
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => AutomationSettings::default(),
        Err(e) => {
            tracing::warn!("Could not read settings file {:?}: {}", path, e);
            AutomationSettings::default()
        }
    }
}

/// Write settings through a temp file and rename
#[allow(clippy::missing_errors_doc)]
pub async fn save_settings(
    path: &Path,
    settings: &AutomationSettings,
) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json.as_bytes()).await?;
    fs::rename(&tmp, path).await
}
