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


use utils::units::{calculate_power_hp, calculate_power_kw, nm_to_lbft};

use crate::host::{VehicleHandle, VehicleHost};
use crate::preset::TorquePreset;

/// Figures that need the preset's idle and rev limit RPM.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RpmData {
    pub real_rpm: f32,
    pub power_kw: f32,
    pub power_hp: f32
}

/// A snapshot of what the torque map is doing to a vehicle right now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorqueData {
    pub normalized_rpm: f32,
    pub torque_mult: f32,
    /// Sum of the power currently sent to each wheel.
    pub total_force: f32,
    pub total_force_nm: f32,
    pub total_force_lbft: f32,
    /// Map multiplier applied to the vehicle's base drive force, in N·m.
    pub raw_map_force_nm: f32,
    pub rpm_data: Option<RpmData>
}

pub fn get_torque_data(host: &dyn VehicleHost, vehicle: VehicleHandle, preset: &TorquePreset) -> TorqueData {
    let normalized_rpm = if host.is_engine_running(vehicle) { host.current_rpm(vehicle) } else { 0.0 };
    let torque_mult = preset.data().multiplier_at(normalized_rpm);

    let mass = host.mass(vehicle);
    let total_force: f32 = host.wheel_power(vehicle).iter().sum();
    let base_drive_force = mass * host.initial_drive_force(vehicle);

    let gear = host.current_gear(vehicle) as usize;
    let total_force_nm = match host.gear_ratios(vehicle).get(gear) {
        Some(ratio) if *ratio != 0.0 => total_force * mass / ratio,
        _ => 0.0
    };
    let total_force_lbft = nm_to_lbft(total_force_nm);

    let rpm_data = preset.data().real_rpm(normalized_rpm).map(|real_rpm| RpmData {
        real_rpm,
        power_kw: calculate_power_kw(real_rpm, total_force_nm),
        power_hp: calculate_power_hp(real_rpm, total_force_lbft)
    });

    TorqueData {
        normalized_rpm,
        torque_mult,
        total_force,
        total_force_nm,
        total_force_lbft,
        raw_map_force_nm: torque_mult * base_drive_force,
        rpm_data
    }
}

#[cfg(test)]
mod tests {
    use crate::curve::ScaledCurve;
    use crate::host::memory::{FakeVehicle, MemoryHost};
    use crate::preset::{Identity, TorqueMapData, TorquePreset};
    use crate::torque::data::get_torque_data;

    fn preset(idle_rpm: u32, rev_limit_rpm: u32) -> TorquePreset {
        let data = TorqueMapData {
            idle_rpm,
            rev_limit_rpm,
            redline_rpm: None,
            torque_mult_map: ScaledCurve::new(vec![(0.0, 1.0), (1.0, 2.0)]).unwrap()
        };
        TorquePreset::new(String::from("test"), Identity::default(), data)
    }

    #[test]
    fn torque_and_power() {
        let mut host = MemoryHost::new();
        let mut vehicle = FakeVehicle::new(1, "P");
        vehicle.rpm = 0.6;
        vehicle.gear = 4;
        vehicle.mass = 1000.0;
        vehicle.wheel_power = vec![0.1, 0.1, 0.0, 0.0];
        let car = host.spawn(vehicle);

        let data = get_torque_data(&host, car, &preset(800, 7000));
        assert!((data.torque_mult - 1.6).abs() < 1e-5);
        assert!((data.total_force - 0.2).abs() < 1e-5);
        assert!((data.total_force_nm - 200.0).abs() < 1e-3);
        assert!((data.raw_map_force_nm - 1.6 * 300.0).abs() < 1e-3);
        let rpm_data = data.rpm_data.unwrap();
        assert!((rpm_data.real_rpm - 3900.0).abs() < 0.5);
        assert!((rpm_data.power_kw - 200.0 * 3900.0 * 0.10471975 / 1000.0).abs() < 0.1);
    }

    #[test]
    fn no_rpm_data_without_rpm_figures() {
        let mut host = MemoryHost::new();
        let car = host.spawn(FakeVehicle::new(1, "P"));
        assert!(get_torque_data(&host, car, &preset(0, 7000)).rpm_data.is_none());
    }

    #[test]
    fn engine_off_reads_zero_rpm() {
        let mut host = MemoryHost::new();
        let mut vehicle = FakeVehicle::new(1, "P");
        vehicle.engine_running = false;
        vehicle.rpm = 0.9;
        let car = host.spawn(vehicle);
        let data = get_torque_data(&host, car, &preset(800, 7000));
        assert_eq!(data.normalized_rpm, 0.0);
        assert_eq!(data.rpm_data.unwrap().real_rpm, 0.0);
    }
}
