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


//! Drivetrain plugins for a vehicle simulator: custom torque maps and gear ratios loaded from
//! per-vehicle presets and kept applied while the game runs.
//!
//! The game is reached only through [host::VehicleHost]. Each plugin owns one app context
//! ([torque::TorqueScript] or [gears::GearScript]) and calls its `tick` once per game frame.

pub mod error;
pub mod ini_utils;
pub mod curve;
pub mod host;
pub mod preset;
pub mod controller;
pub mod pool;
pub mod torque;
pub mod gears;
pub mod recorder;
pub mod settings;
pub mod paths;
pub mod logging;

use std::fs;
use std::path::Path;

use crate::gears::GearScript;
use crate::paths::ModPaths;
use crate::preset::ModelNameCache;
use crate::settings::ScriptSettings;
use crate::torque::TorqueScript;

pub const TORQUE_MAP_NAME: &str = "CustomTorqueMap";
pub const GEAR_RATIOS_NAME: &str = "CustomGearRatios";

/// Plugin entry point for the torque map plugin. `scripts_dir` is the game's script folder.
pub fn start_torque_map(scripts_dir: &Path, names: ModelNameCache) -> TorqueScript {
    let paths = ModPaths::new(scripts_dir, TORQUE_MAP_NAME);
    start_logging(&paths);
    TorqueScript::init(paths, names)
}

/// Plugin entry point for the gear ratio plugin.
pub fn start_gear_ratios(scripts_dir: &Path, names: ModelNameCache) -> GearScript {
    let paths = ModPaths::new(scripts_dir, GEAR_RATIOS_NAME);
    start_logging(&paths);
    GearScript::init(paths, names)
}

fn start_logging(paths: &ModPaths) {
    if let Err(e) = fs::create_dir_all(paths.root()) {
        eprintln!("Failed to create {}. {}", paths.root().display(), e);
        return;
    }
    let settings = ScriptSettings::load(&paths.settings_file());
    logging::init_logging(paths.root(), &paths.log_file_name(), settings.debug.log_debug);
}
