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

pub mod memory;

use std::fmt::{Display, Formatter};

/// Opaque vehicle entity handle. The game owns the entity; we only ever observe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleHandle(pub i32);

impl Display for VehicleHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "vehicle#{}", self.0)
    }
}

/// Everything the plugins need from the running game.
///
/// Reads on a handle that no longer exists return unspecified values, so callers check
/// [VehicleHost::vehicle_exists] (or [VehicleHost::is_vehicle_alive]) before touching a vehicle.
pub trait VehicleHost {
    fn player_vehicle(&self) -> Option<VehicleHandle>;
    /// True when the player is alive and sitting in `vehicle`.
    fn is_player_in_vehicle(&self, vehicle: VehicleHandle) -> bool;
    fn all_vehicles(&self) -> Vec<VehicleHandle>;

    fn vehicle_exists(&self, vehicle: VehicleHandle) -> bool;
    fn is_vehicle_dead(&self, vehicle: VehicleHandle) -> bool;
    fn is_engine_running(&self, vehicle: VehicleHandle) -> bool;
    fn model_hash(&self, vehicle: VehicleHandle) -> u32;
    fn plate_text(&self, vehicle: VehicleHandle) -> String;
    fn display_name(&self, model: u32) -> String;

    /// Engine speed as a 0.0 - 1.0 fraction between idle and the rev limit.
    fn current_rpm(&self, vehicle: VehicleHandle) -> f32;
    fn current_gear(&self, vehicle: VehicleHandle) -> u8;
    fn throttle(&self, vehicle: VehicleHandle) -> f32;
    fn wheel_speeds(&self, vehicle: VehicleHandle) -> Vec<f32>;
    fn wheel_power(&self, vehicle: VehicleHandle) -> Vec<f32>;
    fn mass(&self, vehicle: VehicleHandle) -> f32;
    fn initial_drive_force(&self, vehicle: VehicleHandle) -> f32;
    fn drive_force(&self, vehicle: VehicleHandle) -> f32;
    fn set_drive_force(&mut self, vehicle: VehicleHandle, force: f32);
    /// Engine modification level as a percentage, 0 for stock and 100 for fully upgraded.
    fn engine_upgrade_level(&self, vehicle: VehicleHandle) -> f32;
    fn set_engine_upgrade_level(&mut self, vehicle: VehicleHandle, level: f32);

    fn top_gear(&self, vehicle: VehicleHandle) -> u8;
    fn set_top_gear(&mut self, vehicle: VehicleHandle, top_gear: u8);
    /// Index 0 is reverse.
    fn gear_ratios(&self, vehicle: VehicleHandle) -> Vec<f32>;
    fn set_gear_ratios(&mut self, vehicle: VehicleHandle, ratios: &[f32]);
    fn drive_max_flat_vel(&self, vehicle: VehicleHandle) -> f32;
    fn set_drive_max_flat_vel(&mut self, vehicle: VehicleHandle, velocity: f32);
    fn initial_drive_max_flat_vel(&self, vehicle: VehicleHandle) -> f32;
    fn set_initial_drive_max_flat_vel(&mut self, vehicle: VehicleHandle, velocity: f32);

    /// Shows a message to the player.
    fn notify(&mut self, message: &str);

    fn is_vehicle_alive(&self, vehicle: VehicleHandle) -> bool {
        self.vehicle_exists(vehicle) && !self.is_vehicle_dead(vehicle)
    }
}
