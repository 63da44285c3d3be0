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


use std::path::{Path, PathBuf};

use crate::settings::ScriptSettings;

/// Where a plugin keeps its files, all below one root directory named after the plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModPaths {
    name: String,
    root: PathBuf
}

impl ModPaths {
    const PRESETS_DIR: &'static str = "Configs";
    const RECORDINGS_DIR: &'static str = "Recordings";

    pub fn new(parent: &Path, name: &str) -> ModPaths {
        ModPaths { name: String::from(name), root: parent.join(name) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn presets_dir(&self) -> PathBuf {
        self.root.join(ModPaths::PRESETS_DIR)
    }

    pub fn recordings_dir(&self) -> PathBuf {
        self.root.join(ModPaths::RECORDINGS_DIR)
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join(ScriptSettings::FILE_NAME)
    }

    pub fn log_file_name(&self) -> String {
        format!("{}.log", self.name)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use crate::paths::ModPaths;

    #[test]
    fn layout() {
        let paths = ModPaths::new(Path::new("scripts"), "CustomTorqueMap");
        assert_eq!(paths.root(), Path::new("scripts/CustomTorqueMap"));
        assert_eq!(paths.presets_dir(), Path::new("scripts/CustomTorqueMap/Configs"));
        assert_eq!(paths.settings_file(), Path::new("scripts/CustomTorqueMap/settings_general.toml"));
        assert_eq!(paths.log_file_name(), "CustomTorqueMap.log");
    }
}
