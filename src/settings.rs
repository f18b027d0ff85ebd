//! Settings service
//!
//! Persisted UI preferences with an explicit load-at-startup /
//! save-on-change lifecycle, stored as a JSON file. Injected into the
//! composing layer rather than held as ambient global state.

use crate::config::SCALE_DEFAULT;
use crate::database::models::NoteColor;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// Persisted viewport transform, restored on startup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ViewportSettings {
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub translate_x: f64,
    #[serde(default)]
    pub translate_y: f64,
}

fn default_scale() -> f64 {
    SCALE_DEFAULT
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppSettings {
    #[serde(default)]
    pub viewport: ViewportSettings,
    /// Which calendar is open; None falls back to the user's first one.
    #[serde(default)]
    pub active_calendar_id: Option<String>,
    #[serde(default)]
    pub default_color: NoteColor,
}

/// Service for managing application settings
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new(app_data_dir: PathBuf) -> Self {
        Self {
            settings_path: app_data_dir.join("settings.json"),
        }
    }

    /// Load settings from disk or create default if not exists
    pub async fn load(&self) -> Result<AppSettings> {
        if !self.settings_path.exists() {
            tracing::info!("Settings file not found, creating default settings");
            let default = AppSettings::default();
            self.save(&default).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(&self.settings_path).await?;
        let settings: AppSettings = serde_json::from_str(&content)
            .map_err(|e| AppError::Generic(format!("Failed to parse settings: {}", e)))?;

        Ok(settings)
    }

    /// Save settings to disk
    pub async fn save(&self, settings: &AppSettings) -> Result<()> {
        let content = serde_json::to_string_pretty(settings)
            .map_err(|e| AppError::Generic(format!("Failed to serialize settings: {}", e)))?;

        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.settings_path, content).await?;
        tracing::info!("Settings saved to {:?}", self.settings_path);

        Ok(())
    }

    /// Get the persisted viewport transform
    pub async fn get_viewport(&self) -> Result<ViewportSettings> {
        let settings = self.load().await?;
        Ok(settings.viewport)
    }

    /// Update the persisted viewport transform
    pub async fn update_viewport(&self, viewport: ViewportSettings) -> Result<()> {
        let mut settings = self.load().await?;
        settings.viewport = viewport;
        self.save(&settings).await?;
        Ok(())
    }

    /// Get the active calendar selection
    pub async fn get_active_calendar(&self) -> Result<Option<String>> {
        let settings = self.load().await?;
        Ok(settings.active_calendar_id)
    }

    /// Update the active calendar selection
    pub async fn update_active_calendar(&self, calendar_id: Option<String>) -> Result<()> {
        let mut settings = self.load().await?;
        settings.active_calendar_id = calendar_id;
        self.save(&settings).await?;
        Ok(())
    }
}
