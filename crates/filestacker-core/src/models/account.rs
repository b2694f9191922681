//! Dashboard statistics and per-user settings

use serde::{Deserialize, Serialize};

use super::file::human_size;

/// Theme mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Light theme
    #[default]
    Light,
    /// Dark theme
    Dark,
}

impl ThemeMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// User preferences stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default)]
    pub theme: ThemeMode,
    #[serde(default = "default_notifications")]
    pub notifications: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme: ThemeMode::Light,
            notifications: default_notifications(),
        }
    }
}

const fn default_notifications() -> bool {
    true
}

/// Partial settings update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub theme: Option<ThemeMode>,
    pub notifications: Option<bool>,
}

impl SettingsUpdate {
    pub const fn is_empty(&self) -> bool {
        self.theme.is_none() && self.notifications.is_none()
    }
}

/// Storage totals for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageStats {
    pub total_files: u64,
    #[serde(default)]
    pub storage_used: f64,
    #[serde(default = "default_storage_unit")]
    pub storage_unit: String,
}

impl StorageStats {
    /// Storage used rendered with the same units as file sizes.
    pub fn human_storage_used(&self) -> String {
        let multiplier: f64 = match self.storage_unit.trim().to_ascii_uppercase().as_str() {
            "KB" => 1024.0,
            "MB" => 1024.0 * 1024.0,
            "GB" => 1024.0 * 1024.0 * 1024.0,
            _ => 1.0,
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bytes = (self.storage_used.max(0.0) * multiplier).round() as u64;
        human_size(bytes)
    }
}

fn default_storage_unit() -> String {
    "KB".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_to_light_with_notifications() {
        let settings: UserSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, UserSettings::default());
        assert!(settings.notifications);
    }

    #[test]
    fn stats_render_storage_in_display_units() {
        let stats: StorageStats =
            serde_json::from_str(r#"{"total_files": 3, "storage_used": 5120, "storage_unit": "KB"}"#)
                .unwrap();
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.human_storage_used(), "5.0 MB");
    }

    #[test]
    fn settings_update_reports_emptiness() {
        assert!(SettingsUpdate::default().is_empty());
        assert!(!SettingsUpdate {
            theme: Some(ThemeMode::Dark),
            notifications: None,
        }
        .is_empty());
    }
}
