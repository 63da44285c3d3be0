/*
 * Copyright (c):
 * 2025 zephyrj
 * zephyrj@protonmail.com
 *
 * This file is part of custom-drivetrain.
 *
 * custom-drivetrain is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * custom-drivetrain is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with custom-drivetrain. If not, see <https://www.gnu.org/licenses/>.
 */


use std::fs;
use std::path::Path;
use config::Config;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::host::VehicleHost;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    All,
    Errors,
    None
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MainSettings {
    pub enable_npc: bool,
    pub auto_load: bool,
    pub auto_fix: bool,
    pub npc_scan_interval_ms: u64,
    pub reapply_interval_ms: u64
}

impl Default for MainSettings {
    fn default() -> Self {
        MainSettings {
            enable_npc: true,
            auto_load: true,
            auto_fix: true,
            npc_scan_interval_ms: 1000,
            reapply_interval_ms: 1000
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct NotificationSettings {
    pub level: NotificationLevel
}

impl Default for NotificationSettings {
    fn default() -> Self {
        NotificationSettings { level: NotificationLevel::All }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Rgba {
        Rgba { r, g, b, a }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TachometerColours {
    pub background: Rgba,
    pub normal: Rgba,
    pub normal_hi: Rgba,
    pub redline: Rgba,
    pub redline_hi: Rgba
}

impl Default for TachometerColours {
    fn default() -> Self {
        TachometerColours {
            background: Rgba::new(0, 0, 0, 127),
            normal: Rgba::new(255, 255, 255, 255),
            normal_hi: Rgba::new(127, 127, 127, 255),
            redline: Rgba::new(255, 0, 0, 255),
            redline_hi: Rgba::new(127, 0, 0, 255)
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TachometerSettings {
    pub enable: bool,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub colours: TachometerColours
}

impl Default for TachometerSettings {
    fn default() -> Self {
        TachometerSettings {
            enable: false,
            x: 0.9,
            y: 0.9,
            w: 0.1,
            h: 0.025,
            colours: TachometerColours::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TorqueGraphSettings {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32
}

impl Default for TorqueGraphSettings {
    fn default() -> Self {
        TorqueGraphSettings { x: 0.85, y: 0.6, w: 0.25, h: 0.25 }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct UiSettings {
    pub tachometer: TachometerSettings,
    pub torque_graph: TorqueGraphSettings
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct DebugSettings {
    pub display_info: bool,
    pub npc_details: bool,
    pub log_debug: bool
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct ScriptSettings {
    pub main: MainSettings,
    pub notifications: NotificationSettings,
    pub ui: UiSettings,
    pub debug: DebugSettings
}

impl ScriptSettings {
    pub const FILE_NAME: &'static str = "settings_general.toml";
    const ENV_PREFIX: &'static str = "CUSTOM_DRIVETRAIN";

    /// Loads settings from `path`, filling anything missing with defaults.
    ///
    /// A missing file is replaced by one holding the defaults. A file that can't be read or
    /// decoded is left alone and the defaults are used for this session.
    pub fn load(path: &Path) -> ScriptSettings {
        if !path.is_file() {
            warn!("No settings found at {}. Using defaults", path.display());
            let ret = ScriptSettings::default();
            ret.write(path).unwrap_or_else(|e| { error!("Failed to write settings. {}", e.to_string()) });
            return ret;
        }
        match ScriptSettings::try_load(path) {
            Ok(settings) => {
                info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                warn!("Failed to load settings. {}", e.to_string());
                ScriptSettings::default()
            }
        }
    }

    fn try_load(path: &Path) -> crate::error::Result<ScriptSettings> {
        let settings = Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix(ScriptSettings::ENV_PREFIX)
                .separator("__")
                .try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn write(&self, path: &Path) -> crate::error::Result<()> {
        fs::write(path, toml::to_string(&self)?)?;
        Ok(())
    }

    pub fn should_notify(&self, is_error: bool) -> bool {
        match self.notifications.level {
            NotificationLevel::All => true,
            NotificationLevel::Errors => is_error,
            NotificationLevel::None => false
        }
    }
}

/// Shows `message` to the player if the notification level allows it.
pub fn notify(host: &mut dyn VehicleHost, settings: &ScriptSettings, message: &str, is_error: bool) {
    if settings.should_notify(is_error) {
        host.notify(message);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use crate::settings::{NotificationLevel, ScriptSettings};

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ScriptSettings::FILE_NAME);
        let settings = ScriptSettings::load(&path);
        assert_eq!(settings, ScriptSettings::default());
        assert!(path.is_file());
        assert_eq!(ScriptSettings::load(&path), settings);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ScriptSettings::FILE_NAME);
        fs::write(&path, "[main]\nenable_npc = false\n\n[notifications]\nlevel = \"errors\"\n").unwrap();
        let settings = ScriptSettings::load(&path);
        assert!(!settings.main.enable_npc);
        assert!(settings.main.auto_fix);
        assert_eq!(settings.main.reapply_interval_ms, 1000);
        assert_eq!(settings.notifications.level, NotificationLevel::Errors);
        assert!(settings.should_notify(true));
        assert!(!settings.should_notify(false));
    }

    #[test]
    fn broken_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ScriptSettings::FILE_NAME);
        fs::write(&path, "[main\nenable_npc = ").unwrap();
        assert_eq!(ScriptSettings::load(&path), ScriptSettings::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), "[main\nenable_npc = ");
    }
}
