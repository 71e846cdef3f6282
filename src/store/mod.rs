//! Settings store.
//!
//! # Data Flow
//! ```text
//! startup:   document on disk (or config defaults) → validate → ArcSwap
//! probe:     snapshot() → Arc<ProbeSettings> held for the whole invocation
//! admin:     SettingsPatch → merge over snapshot → validate → persist → swap
//! watcher:   edited document → validate → swap
//! ```
//!
//! # Design Decisions
//! - Readers never lock; every read is one atomic pointer load
//! - Writers are serialized so two patches cannot lose each other's fields
//! - A value is validated as a whole before it becomes visible
//! - The document is written before the swap; a failed write changes nothing

pub mod document;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::loader::join_errors;
use crate::config::validation::{validate_settings, ValidationError};
use crate::observability::metrics;
use crate::probe::{ProbeMethod, ProbeSettings};

/// Errors raised at the settings-write boundary.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),

    #[error("settings document I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings document is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Partial settings update. Absent fields keep their current value.
///
/// Numeric fields accept JSON numbers or numeric strings, since the admin
/// page submits raw form values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, alias = "level4", deserialize_with = "lenient")]
    pub tier4: Option<u64>,

    #[serde(default, alias = "level3", deserialize_with = "lenient")]
    pub tier3: Option<u64>,

    #[serde(default, alias = "level2", deserialize_with = "lenient")]
    pub tier2: Option<u64>,

    #[serde(default, alias = "level1", deserialize_with = "lenient")]
    pub tier1: Option<u64>,

    #[serde(default)]
    pub mode: Option<ProbeMethod>,

    #[serde(default, deserialize_with = "lenient")]
    pub tcp_port: Option<u16>,

    #[serde(default, deserialize_with = "lenient")]
    pub retry_count: Option<u32>,

    #[serde(default, alias = "retryDelay", deserialize_with = "lenient")]
    pub retry_delay_ms: Option<u64>,
}

impl SettingsPatch {
    /// Build a new value from `base` with this patch applied.
    pub fn apply_to(&self, base: &ProbeSettings) -> ProbeSettings {
        ProbeSettings {
            tier4: self.tier4.unwrap_or(base.tier4),
            tier3: self.tier3.unwrap_or(base.tier3),
            tier2: self.tier2.unwrap_or(base.tier2),
            tier1: self.tier1.unwrap_or(base.tier1),
            mode: self.mode.unwrap_or(base.mode),
            tcp_port: self.tcp_port.unwrap_or(base.tcp_port),
            retry_count: self.retry_count.unwrap_or(base.retry_count),
            retry_delay_ms: self.retry_delay_ms.unwrap_or(base.retry_delay_ms),
        }
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Deserialize<'de>,
    T::Err: std::fmt::Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString<T> {
        Number(T),
        String(String),
    }

    match Option::<NumberOrString<T>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) => {
            s.trim().parse().map(Some).map_err(serde::de::Error::custom)
        }
    }
}

/// Process-wide holder of the current `ProbeSettings`.
pub struct SettingsStore {
    current: ArcSwap<ProbeSettings>,
    path: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl SettingsStore {
    /// A store that never touches the filesystem.
    pub fn in_memory(initial: ProbeSettings) -> Result<Self, SettingsError> {
        validate_settings(&initial).map_err(SettingsError::Invalid)?;
        Ok(Self {
            current: ArcSwap::from_pointee(initial),
            path: None,
            write_lock: Mutex::new(()),
        })
    }

    /// Load the document at `path`, falling back to `defaults` when absent.
    pub fn open(path: impl Into<PathBuf>, defaults: ProbeSettings) -> Result<Self, SettingsError> {
        let path = path.into();
        let initial = match document::read_document(&path)? {
            Some(stored) => {
                tracing::info!(path = %path.display(), "Loaded probe settings document");
                stored
            }
            None => {
                tracing::info!(
                    path = %path.display(),
                    "No settings document yet, using configured defaults"
                );
                defaults
            }
        };
        validate_settings(&initial).map_err(SettingsError::Invalid)?;

        Ok(Self {
            current: ArcSwap::from_pointee(initial),
            path: Some(path),
            write_lock: Mutex::new(()),
        })
    }

    /// The current settings as one consistent snapshot.
    pub fn snapshot(&self) -> Arc<ProbeSettings> {
        self.current.load_full()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Validate, persist and publish a complete replacement.
    pub async fn replace(
        &self,
        settings: ProbeSettings,
    ) -> Result<Arc<ProbeSettings>, SettingsError> {
        let _guard = self.write_lock.lock().await;
        self.publish(settings, true, "admin").await
    }

    /// Merge `patch` over the current snapshot and publish the result.
    pub async fn update(
        &self,
        patch: &SettingsPatch,
    ) -> Result<Arc<ProbeSettings>, SettingsError> {
        let _guard = self.write_lock.lock().await;
        let merged = patch.apply_to(&self.current.load());
        self.publish(merged, true, "admin").await
    }

    /// Publish settings that were read back from the document itself.
    ///
    /// Ignored when it matches the current snapshot (our own writes come back
    /// through the watcher) or when the document has since moved on.
    pub async fn reload(
        &self,
        settings: ProbeSettings,
    ) -> Result<Arc<ProbeSettings>, SettingsError> {
        let _guard = self.write_lock.lock().await;
        let current = self.current.load_full();
        if *current == settings {
            return Ok(current);
        }

        if let Some(path) = &self.path {
            if let Ok(Some(on_disk)) = document::read_document(path) {
                if on_disk != settings {
                    tracing::debug!(path = %path.display(), "Skipping stale settings reload");
                    return Ok(current);
                }
            }
        }

        self.publish(settings, false, "reload").await
    }

    async fn publish(
        &self,
        settings: ProbeSettings,
        persist: bool,
        source: &'static str,
    ) -> Result<Arc<ProbeSettings>, SettingsError> {
        if let Err(errors) = validate_settings(&settings) {
            tracing::warn!(source, errors = %join_errors(&errors), "Rejected probe settings");
            return Err(SettingsError::Invalid(errors));
        }

        if persist {
            if let Some(path) = &self.path {
                document::write_document(path, &settings).await?;
            }
        }

        let settings = Arc::new(settings);
        self.current.store(settings.clone());
        metrics::record_settings_update(source);
        tracing::info!(
            source,
            tier4 = settings.tier4,
            tier3 = settings.tier3,
            tier2 = settings.tier2,
            tier1 = settings.tier1,
            mode = %settings.mode,
            tcp_port = settings.tcp_port,
            retry_count = settings.retry_count,
            retry_delay_ms = settings.retry_delay_ms,
            "Probe settings updated"
        );
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_accepts_strings_and_legacy_names() {
        let raw = r#"{"level4": "30", "tier3": 80, "retryDelay": "250", "mode": "tcp"}"#;
        let patch: SettingsPatch = serde_json::from_str(raw).unwrap();
        assert_eq!(patch.tier4, Some(30));
        assert_eq!(patch.tier3, Some(80));
        assert_eq!(patch.retry_delay_ms, Some(250));
        assert_eq!(patch.mode, Some(ProbeMethod::Tcp));
        assert_eq!(patch.tcp_port, None);

        assert!(serde_json::from_str::<SettingsPatch>(r#"{"tcpPort": "https"}"#).is_err());
    }

    #[test]
    fn test_patch_merge() {
        let patch = SettingsPatch {
            tier1: Some(900),
            retry_count: Some(5),
            ..SettingsPatch::default()
        };
        let merged = patch.apply_to(&ProbeSettings::default());
        assert_eq!(merged.tier1, 900);
        assert_eq!(merged.retry_count, 5);
        assert_eq!(merged.tier4, 50);
        assert_eq!(merged.tcp_port, 443);
    }

    #[test]
    fn test_in_memory_rejects_invalid_initial() {
        let bad = ProbeSettings {
            retry_count: 0,
            ..ProbeSettings::default()
        };
        assert!(matches!(SettingsStore::in_memory(bad), Err(SettingsError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_update_swaps_whole_snapshot() {
        let store = SettingsStore::in_memory(ProbeSettings::default()).unwrap();
        let before = store.snapshot();

        let patch = SettingsPatch {
            tier4: Some(10),
            tier3: Some(20),
            ..SettingsPatch::default()
        };
        let after = store.update(&patch).await.unwrap();

        // The old snapshot is untouched.
        assert_eq!(before.tier4, 50);
        assert_eq!(after.tier4, 10);
        assert_eq!(store.snapshot().tier3, 20);
    }

    #[tokio::test]
    async fn test_invalid_update_keeps_current() {
        let store = SettingsStore::in_memory(ProbeSettings::default()).unwrap();
        let patch = SettingsPatch {
            tier4: Some(700),
            ..SettingsPatch::default()
        };

        let err = store.update(&patch).await.unwrap_err();
        assert!(err.to_string().contains("tier4 (700 ms) must be below tier3 (100 ms)"));
        assert_eq!(*store.snapshot(), ProbeSettings::default());
    }

    #[tokio::test]
    async fn test_persists_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::open(&path, ProbeSettings::default()).unwrap();
        assert!(!path.exists());

        store
            .replace(ProbeSettings {
                mode: ProbeMethod::Tcp,
                tcp_port: 8443,
                ..ProbeSettings::default()
            })
            .await
            .unwrap();
        assert!(path.exists());

        let reopened = SettingsStore::open(&path, ProbeSettings::default()).unwrap();
        assert_eq!(reopened.snapshot().mode, ProbeMethod::Tcp);
        assert_eq!(reopened.snapshot().tcp_port, 8443);
    }

    #[tokio::test]
    async fn test_reload_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::open(&path, ProbeSettings::default()).unwrap();

        store
            .reload(ProbeSettings {
                retry_count: 1,
                ..ProbeSettings::default()
            })
            .await
            .unwrap();

        assert_eq!(store.snapshot().retry_count, 1);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_reload_skips_own_and_stale_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::open(&path, ProbeSettings::default()).unwrap();

        let first = ProbeSettings {
            tcp_port: 8443,
            ..ProbeSettings::default()
        };
        let second = ProbeSettings {
            tcp_port: 9443,
            ..ProbeSettings::default()
        };
        store.replace(first.clone()).await.unwrap();
        let published = store.replace(second.clone()).await.unwrap();

        // The watcher echoing our own write back is a no-op.
        let echoed = store.reload(second).await.unwrap();
        assert!(Arc::ptr_eq(&echoed, &published));

        // A read of the earlier document that lost the race is dropped.
        store.reload(first).await.unwrap();
        assert_eq!(store.snapshot().tcp_port, 9443);
        assert!(Arc::ptr_eq(&store.snapshot(), &published));
    }

    #[test]
    fn test_open_rejects_invalid_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"tier4": 100, "tier3": 50}"#).unwrap();

        assert!(matches!(
            SettingsStore::open(&path, ProbeSettings::default()),
            Err(SettingsError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_patches_are_not_lost() {
        let store = Arc::new(SettingsStore::in_memory(ProbeSettings::default()).unwrap());

        let a = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .update(&SettingsPatch {
                        tcp_port: Some(8443),
                        ..SettingsPatch::default()
                    })
                    .await
            })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .update(&SettingsPatch {
                        retry_count: Some(7),
                        ..SettingsPatch::default()
                    })
                    .await
            })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.tcp_port, 8443);
        assert_eq!(snapshot.retry_count, 7);
    }
}
