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


use utils::numeric::is_near;
use utils::units::mps_to_kph;

use crate::error::{Error, ErrorKind, Result};
use crate::host::{VehicleHandle, VehicleHost};
use crate::ini_utils;
use crate::ini_utils::{FromIni, Ini, IniUpdater};
use crate::preset::{Identity, ModelNameCache, Preset, DEFAULT_PRESET_NAME};

pub const MIN_TOP_GEAR: u8 = 1;
pub const MAX_TOP_GEAR: u8 = 10;

/// Initial flat velocity is always written as this fraction of the drive max flat velocity.
pub const INITIAL_FLAT_VEL_DIVISOR: f32 = 1.2;

const COMPARE_TOLERANCE: f32 = 1e-4;

/// Gearbox values as the game stores them. `ratios[0]` is reverse.
#[derive(Debug, Clone, PartialEq)]
pub struct GearData {
    pub top_gear: u8,
    pub drive_max_vel: f32,
    pub ratios: Vec<f32>
}

impl GearData {
    const SECTION_NAME: &'static str = "Gears";
    const TOP_GEAR: &'static str = "TopGear";
    const DRIVE_MAX_VEL: &'static str = "DriveMaxVel";

    pub fn new(top_gear: u8, drive_max_vel: f32, ratios: Vec<f32>) -> Result<GearData> {
        let data = GearData { top_gear, drive_max_vel, ratios };
        data.validate()?;
        Ok(data)
    }

    /// Reads the gearbox as it currently is, keeping ratios up to and including top gear.
    ///
    /// Top gear is limited to [MAX_TOP_GEAR] and to the ratios the game actually holds.
    pub fn read_from_host(host: &dyn VehicleHost, vehicle: VehicleHandle) -> GearData {
        let mut ratios = host.gear_ratios(vehicle);
        let top_gear = (host.top_gear(vehicle) as usize)
            .min(MAX_TOP_GEAR as usize)
            .min(ratios.len().saturating_sub(1));
        ratios.truncate(top_gear + 1);
        let top_gear = top_gear as u8;
        GearData { top_gear, drive_max_vel: host.drive_max_flat_vel(vehicle), ratios }
    }

    pub fn write_to_host(&self, host: &mut dyn VehicleHost, vehicle: VehicleHandle) {
        host.set_top_gear(vehicle, self.top_gear);
        host.set_drive_max_flat_vel(vehicle, self.drive_max_vel);
        host.set_initial_drive_max_flat_vel(vehicle, self.drive_max_vel / INITIAL_FLAT_VEL_DIVISOR);
        host.set_gear_ratios(vehicle, &self.ratios);
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_TOP_GEAR..=MAX_TOP_GEAR).contains(&self.top_gear) {
            return Err(Error::new(ErrorKind::InvalidPreset,
                                  format!("Top gear {} outside {}-{}", self.top_gear, MIN_TOP_GEAR, MAX_TOP_GEAR)));
        }
        if self.ratios.len() != self.top_gear as usize + 1 {
            return Err(Error::new(ErrorKind::InvalidPreset,
                                  format!("Expected {} gear ratios for top gear {}, found {}",
                                          self.top_gear as usize + 1, self.top_gear, self.ratios.len())));
        }
        if !self.drive_max_vel.is_finite() || self.drive_max_vel <= 0.0 {
            return Err(Error::new(ErrorKind::InvalidPreset,
                                  format!("Invalid drive max velocity {}", self.drive_max_vel)));
        }
        if let Some((idx, ratio)) = self.ratios.iter().enumerate().find(|(_, r)| !r.is_finite() || **r == 0.0) {
            return Err(Error::new(ErrorKind::InvalidPreset,
                                  format!("Invalid ratio {} for gear {}", ratio, idx)));
        }
        Ok(())
    }

    /// Top speed in top gear, in km/h.
    pub fn top_speed_kph(&self) -> f32 {
        match self.ratios.get(self.top_gear as usize) {
            Some(ratio) if *ratio != 0.0 => mps_to_kph(self.drive_max_vel / ratio),
            _ => 0.0
        }
    }

    /// True when `other` differs in top gear, flat velocity or any ratio up to top gear.
    pub fn diverges_from(&self, other: &GearData) -> bool {
        if self.top_gear != other.top_gear || !is_near(self.drive_max_vel, other.drive_max_vel, COMPARE_TOLERANCE) {
            return true;
        }
        let expected = self.top_gear as usize + 1;
        if self.ratios.len() < expected || other.ratios.len() < expected {
            return true;
        }
        self.ratios[..expected].iter()
            .zip(other.ratios[..expected].iter())
            .any(|(a, b)| !is_near(*a, *b, COMPARE_TOLERANCE))
    }

    fn gear_key(gear: usize) -> String {
        format!("Gear{}", gear)
    }
}

impl Default for GearData {
    fn default() -> Self {
        GearData {
            top_gear: 6,
            drive_max_vel: 50.0,
            ratios: vec![-3.33, 3.33, 1.90, 1.35, 1.0, 0.8, 0.67]
        }
    }
}

impl FromIni for GearData {
    fn load_from_ini(ini_data: &Ini) -> Result<Self> {
        ini_utils::validate_section_exists(ini_data, GearData::SECTION_NAME)?;
        let top_gear: u8 = ini_utils::get_mandatory_property(ini_data, GearData::SECTION_NAME, GearData::TOP_GEAR)?;
        let drive_max_vel: f32 = ini_utils::get_mandatory_property(ini_data, GearData::SECTION_NAME, GearData::DRIVE_MAX_VEL)?;
        let mut ratios = Vec::new();
        for gear in 0..=top_gear.min(MAX_TOP_GEAR) as usize {
            ratios.push(ini_utils::get_mandatory_property(ini_data, GearData::SECTION_NAME, &GearData::gear_key(gear))?);
        }
        GearData::new(top_gear, drive_max_vel, ratios)
    }
}

impl IniUpdater for GearData {
    fn update_ini(&self, ini_data: &mut Ini) -> Result<()> {
        ini_utils::set_value(ini_data, GearData::SECTION_NAME, GearData::TOP_GEAR, self.top_gear);
        ini_utils::set_float(ini_data, GearData::SECTION_NAME, GearData::DRIVE_MAX_VEL, self.drive_max_vel, 4);
        for (gear, ratio) in self.ratios.iter().enumerate() {
            ini_utils::set_float(ini_data, GearData::SECTION_NAME, &GearData::gear_key(gear), *ratio, 4);
        }
        // Drop ratios left over from a preset that had more gears
        for gear in self.ratios.len()..=MAX_TOP_GEAR as usize {
            ini_data.remove_value(GearData::SECTION_NAME, &GearData::gear_key(gear));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GearPreset {
    name: String,
    identity: Identity,
    data: GearData
}

impl GearPreset {
    pub fn new(name: String, identity: Identity, data: GearData) -> GearPreset {
        GearPreset { name, identity, data }
    }

    pub fn data(&self) -> &GearData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut GearData {
        &mut self.data
    }

    pub fn description(&self) -> &str {
        &self.identity.description
    }

    /// Description used when saving without one, e.g. `"Adder - 6 gears - 360 kph"`.
    pub fn default_description(model_name: &str, data: &GearData) -> String {
        format!("{} - {} gears - {:.0} kph", model_name, data.top_gear, data.top_speed_kph())
    }
}

impl Preset for GearPreset {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn set_identity(&mut self, identity: Identity) {
        self.identity = identity;
    }

    fn load(name: String, ini: &Ini, names: &ModelNameCache) -> Result<Self> {
        let identity = Identity::load_from_ini(ini, names)?;
        let data = ini.extract::<GearData>()?;
        Ok(GearPreset::new(name, identity, data))
    }

    fn to_ini(&self) -> Result<Ini> {
        let mut ini = Ini::new();
        self.identity.update_ini(&mut ini)?;
        self.data.update_ini(&mut ini)?;
        Ok(ini)
    }

    fn default_preset() -> Self {
        let identity = Identity { description: String::from("Stock gearing"), ..Default::default() };
        GearPreset::new(String::from(DEFAULT_PRESET_NAME), identity, GearData::default())
    }

    fn apply_data_from(&mut self, other: &Self) {
        self.data = other.data.clone();
    }
}
