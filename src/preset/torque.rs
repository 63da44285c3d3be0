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


use utils::numeric::map_range;

use crate::curve::{Extrapolation, ScaledCurve};
use crate::error::Result;
use crate::ini_utils;
use crate::ini_utils::{FromIni, Ini, IniUpdater};
use crate::preset::{Identity, ModelNameCache, Preset, DEFAULT_PRESET_NAME};

/// Normalized RPM the game treats as idle.
pub const IDLE_NORMALIZED_RPM: f32 = 0.2;

const PEAK_SCAN_STEPS: usize = 100;

/// The numeric half of a torque preset.
#[derive(Debug, Clone, PartialEq)]
pub struct TorqueMapData {
    /// 0 when unknown.
    pub idle_rpm: u32,
    /// 0 when unknown.
    pub rev_limit_rpm: u32,
    pub redline_rpm: Option<u32>,
    pub torque_mult_map: ScaledCurve
}

impl TorqueMapData {
    const SECTION_NAME: &'static str = "Data";
    const IDLE_RPM: &'static str = "IdleRPM";
    const REV_LIMIT_RPM: &'static str = "RevLimitRPM";
    const REDLINE_RPM: &'static str = "RedlineRPM";
    const TORQUE_MULT_MAP: &'static str = "TorqueMultMap";
    const MAP_END_TAG: &'static str = "END";

    pub fn has_rpm_info(&self) -> bool {
        self.idle_rpm != 0 && self.rev_limit_rpm != 0
    }

    /// Converts a normalized RPM into engine RPM. `None` without idle and rev limit figures.
    pub fn real_rpm(&self, normalized_rpm: f32) -> Option<f32> {
        if !self.has_rpm_info() {
            return None;
        }
        let idle = self.idle_rpm as f32;
        let rev_limit = self.rev_limit_rpm as f32;
        Some(if normalized_rpm < IDLE_NORMALIZED_RPM {
            map_range(normalized_rpm, 0.0, IDLE_NORMALIZED_RPM, 0.0, idle)
        } else {
            map_range(normalized_rpm, IDLE_NORMALIZED_RPM, 1.0, idle, rev_limit)
        })
    }

    pub fn multiplier_at(&self, normalized_rpm: f32) -> f32 {
        self.torque_mult_map.evaluate(normalized_rpm, Extrapolation::FloorZero)
    }
}

impl Default for TorqueMapData {
    fn default() -> Self {
        TorqueMapData {
            idle_rpm: 0,
            rev_limit_rpm: 0,
            redline_rpm: None,
            torque_mult_map: ScaledCurve::flat(1.0)
        }
    }
}

impl FromIni for TorqueMapData {
    fn load_from_ini(ini_data: &Ini) -> Result<Self> {
        ini_utils::validate_section_exists(ini_data, TorqueMapData::SECTION_NAME)?;
        let map_text: String = ini_data.get_value(TorqueMapData::SECTION_NAME, TorqueMapData::TORQUE_MULT_MAP)
            .ok_or_else(|| ini_utils::MissingMandatoryProperty::new(TorqueMapData::SECTION_NAME,
                                                                    TorqueMapData::TORQUE_MULT_MAP))?;
        Ok(TorqueMapData {
            idle_rpm: ini_utils::get_optional_property(ini_data, TorqueMapData::SECTION_NAME, TorqueMapData::IDLE_RPM)?.unwrap_or(0),
            rev_limit_rpm: ini_utils::get_optional_property(ini_data, TorqueMapData::SECTION_NAME, TorqueMapData::REV_LIMIT_RPM)?.unwrap_or(0),
            redline_rpm: ini_utils::get_optional_property(ini_data, TorqueMapData::SECTION_NAME, TorqueMapData::REDLINE_RPM)?,
            torque_mult_map: ScaledCurve::from_text(&map_text)?
        })
    }
}

impl IniUpdater for TorqueMapData {
    fn update_ini(&self, ini_data: &mut Ini) -> Result<()> {
        ini_utils::set_value(ini_data, TorqueMapData::SECTION_NAME, TorqueMapData::IDLE_RPM, self.idle_rpm);
        ini_utils::set_value(ini_data, TorqueMapData::SECTION_NAME, TorqueMapData::REV_LIMIT_RPM, self.rev_limit_rpm);
        match self.redline_rpm {
            Some(redline) => {
                ini_utils::set_value(ini_data, TorqueMapData::SECTION_NAME, TorqueMapData::REDLINE_RPM, redline);
            }
            None => {
                ini_data.remove_value(TorqueMapData::SECTION_NAME, TorqueMapData::REDLINE_RPM);
            }
        }
        ini_data.set_multiline_value(TorqueMapData::SECTION_NAME,
                                     TorqueMapData::TORQUE_MULT_MAP,
                                     self.torque_mult_map.to_text(),
                                     TorqueMapData::MAP_END_TAG);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PeakPoint {
    pub normalized_rpm: f32,
    pub multiplier: f32,
    pub real_rpm: Option<f32>
}

/// Peak torque and power positions found by scanning the curve.
///
/// Power is compared as `multiplier * rpm`, using engine RPM when known and normalized RPM
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PeakStats {
    pub torque: PeakPoint,
    pub power: PeakPoint
}

impl PeakStats {
    pub fn scan(data: &TorqueMapData) -> PeakStats {
        let mut stats = PeakStats::default();
        let mut max_torque = f32::MIN;
        let mut max_power = f32::MIN;
        for (rpm, mult) in data.torque_mult_map.sample(PEAK_SCAN_STEPS, Extrapolation::FloorZero) {
            let real_rpm = data.real_rpm(rpm);
            let point = PeakPoint { normalized_rpm: rpm, multiplier: mult, real_rpm };
            if mult > max_torque {
                max_torque = mult;
                stats.torque = point;
            }
            let power = mult * real_rpm.unwrap_or(rpm);
            if power > max_power {
                max_power = power;
                stats.power = point;
            }
        }
        stats
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TorquePreset {
    name: String,
    identity: Identity,
    data: TorqueMapData,
    peaks: PeakStats
}

impl TorquePreset {
    pub fn new(name: String, identity: Identity, data: TorqueMapData) -> TorquePreset {
        let peaks = PeakStats::scan(&data);
        TorquePreset { name, identity, data, peaks }
    }

    pub fn data(&self) -> &TorqueMapData {
        &self.data
    }

    pub fn peaks(&self) -> &PeakStats {
        &self.peaks
    }

    /// True for the stock record that carries no curve of its own.
    pub fn is_passthrough(&self) -> bool {
        self.is_default() && self.data.torque_mult_map.is_flat(1.0)
    }
}

impl Preset for TorquePreset {
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
        let data = ini.extract::<TorqueMapData>()?;
        Ok(TorquePreset::new(name, identity, data))
    }

    fn to_ini(&self) -> Result<Ini> {
        let mut ini = Ini::new();
        self.identity.update_ini(&mut ini)?;
        self.data.update_ini(&mut ini)?;
        Ok(ini)
    }

    fn default_preset() -> Self {
        TorquePreset::new(String::from(DEFAULT_PRESET_NAME), Identity::default(), TorqueMapData::default())
    }

    /// Only the multiplier map is taken; the RPM figures describe this vehicle's engine.
    fn apply_data_from(&mut self, other: &Self) {
        self.data.torque_mult_map = other.data.torque_mult_map.clone();
        self.peaks = PeakStats::scan(&self.data);
    }
}
