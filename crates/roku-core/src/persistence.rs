//! JSON-file persistence for the device registry

use crate::registry::RegistrySnapshot;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;

/// Read a snapshot from disk
///
/// A missing file is a fresh start; an unreadable or corrupt one is
/// logged and treated the same way rather than failing startup.
pub async fn load_registry(path: &Path) -> RegistrySnapshot {
    let contents = match fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) => {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!("Could not read registry file {:?}: {}", path, e);
            }
            return RegistrySnapshot::default();
        }
    };

    match serde_json::from_str::<RegistrySnapshot>(&contents) {
        Ok(snapshot) => {
            tracing::info!("Loaded {} device(s) from {:?}", snapshot.devices.len(), path);
            snapshot
        }
        Err(e) => {
            tracing::warn!("Corrupt registry file {:?}: {}", path, e);
            RegistrySnapshot::default()
        }
    }
}

/// Write a snapshot to disk, via a temp file and rename so a crash
/// mid-write never leaves a truncated registry behind
#[allow(clippy::missing_errors_doc)]
pub async fn save_registry(path: &Path, snapshot: &RegistrySnapshot) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_vec_pretty(snapshot)
        .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &json).await?;
    fs::rename(&tmp, path).await?;

    tracing::debug!(
        "Persisted {} device(s) and {} suppression flag(s) to {:?}",
        snapshot.devices.len(),
        snapshot.suppressed.len(),
        path
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::RokuDevice;

    fn temp_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("roku-core-{tag}-{}", std::process::id()))
    }

    #[tokio::test]
    async fn test_registry_round_trip() {
        let path = temp_path("round-trip").join("registry.json");
        let snapshot = RegistrySnapshot {
            devices: vec![RokuDevice::new("10.0.0.5", "Lobby TV")],
            suppressed: vec!["10.0.0.5".to_string()],
            activity: vec!["Power Off → 10.0.0.5".to_string()],
        };

        save_registry(&path, &snapshot).await.unwrap();
        let loaded = load_registry(&path).await;

        assert_eq!(loaded.devices, snapshot.devices);
        assert_eq!(loaded.suppressed, snapshot.suppressed);
        assert_eq!(loaded.activity, snapshot.activity);
    }

    #[tokio::test]
    async fn test_missing_file_starts_fresh() {
        let path = temp_path("missing").join("nope.json");
        let loaded = load_registry(&path).await;
        assert!(loaded.devices.is_empty());
        assert!(loaded.suppressed.is_empty());
    }
}
