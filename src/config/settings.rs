//! Live settings shared between the bridge, the queue and the page controller.

use serde::Deserialize;
use tokio::sync::watch;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::media::QualityTier;

/// A partial settings change as sent by the host settings store.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(default)]
    pub quality: Option<serde_json::Value>,
    #[serde(default)]
    pub auto_create_folder: Option<bool>,
}

/// Writer side of the live settings. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    tx: watch::Sender<Settings>,
}

impl SettingsHandle {
    pub fn new(initial: Settings) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// A reader that always sees the latest settings.
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Settings {
        *self.tx.borrow()
    }

    /// Apply a partial update. Fields absent from the update keep their value.
    pub fn apply(&self, update: &SettingsUpdate) -> Result<Settings> {
        let mut next = self.current();

        if let Some(quality) = &update.quality {
            let raw = match quality {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                other => {
                    return Err(Error::ConfigValidation {
                        field: "quality".to_string(),
                        message: format!("Unsupported quality value: {}", other),
                    })
                }
            };
            next.quality = raw
                .parse::<QualityTier>()
                .map_err(|message| Error::ConfigValidation {
                    field: "quality".to_string(),
                    message,
                })?;
        }
        if let Some(auto_create_folder) = update.auto_create_folder {
            next.auto_create_folder = auto_create_folder;
        }

        self.tx.send_replace(next);
        tracing::info!(
            "Settings updated: quality={}, auto_create_folder={}",
            next.quality,
            next.auto_create_folder
        );
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(value: serde_json::Value) -> SettingsUpdate {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_apply_partial_updates() {
        let handle = SettingsHandle::new(Settings::default());
        let rx = handle.subscribe();

        handle.apply(&update(json!({"quality": "720"}))).unwrap();
        assert_eq!(rx.borrow().quality, QualityTier::P720);
        assert!(rx.borrow().auto_create_folder);

        handle.apply(&update(json!({"autoCreateFolder": false}))).unwrap();
        assert_eq!(rx.borrow().quality, QualityTier::P720);
        assert!(!rx.borrow().auto_create_folder);

        handle.apply(&update(json!({"quality": 240}))).unwrap();
        assert_eq!(handle.current().quality, QualityTier::P240);
    }

    #[test]
    fn test_invalid_quality_keeps_previous() {
        let handle = SettingsHandle::new(Settings::default());
        assert!(handle.apply(&update(json!({"quality": "4k"}))).is_err());
        assert!(handle.apply(&update(json!({"quality": true}))).is_err());
        assert_eq!(handle.current(), Settings::default());
    }
}
