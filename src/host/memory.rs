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

//! In-memory stand-in for the game. Vehicles are plain structs that tests (or a replay tool)
//! can poke directly to imitate the game changing its own state.

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::host::{VehicleHandle, VehicleHost};

#[derive(Debug, Clone, PartialEq)]
pub struct FakeVehicle {
    pub model: u32,
    pub plate: String,
    pub dead: bool,
    pub engine_running: bool,
    pub rpm: f32,
    pub gear: u8,
    pub throttle: f32,
    pub wheel_speeds: Vec<f32>,
    pub wheel_power: Vec<f32>,
    pub mass: f32,
    pub initial_drive_force: f32,
    pub drive_force: f32,
    pub engine_upgrade_level: f32,
    pub top_gear: u8,
    pub gear_ratios: Vec<f32>,
    pub drive_max_flat_vel: f32,
    pub initial_drive_max_flat_vel: f32,
}

impl FakeVehicle {
    /// A running, stock, six speed car.
    pub fn new(model: u32, plate: &str) -> FakeVehicle {
        FakeVehicle {
            model,
            plate: String::from(plate),
            dead: false,
            engine_running: true,
            rpm: 0.2,
            gear: 1,
            throttle: 0.0,
            wheel_speeds: vec![0.0; 4],
            wheel_power: vec![0.0; 4],
            mass: 1500.0,
            initial_drive_force: 0.3,
            drive_force: 0.3,
            engine_upgrade_level: 0.0,
            top_gear: 6,
            gear_ratios: vec![-3.33, 3.33, 1.90, 1.35, 1.0, 0.8, 0.67],
            drive_max_flat_vel: 50.0,
            initial_drive_max_flat_vel: 50.0 / 1.2,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryHost {
    vehicles: BTreeMap<VehicleHandle, FakeVehicle>,
    next_handle: i32,
    player_vehicle: Option<VehicleHandle>,
    display_names: HashMap<u32, String>,
    notifications: Vec<String>,
    gearbox_writes: usize,
    drive_force_writes: usize,
}

impl MemoryHost {
    pub fn new() -> MemoryHost {
        MemoryHost { next_handle: 1, ..Default::default() }
    }

    pub fn spawn(&mut self, vehicle: FakeVehicle) -> VehicleHandle {
        let handle = VehicleHandle(self.next_handle.max(1));
        self.next_handle = handle.0 + 1;
        self.vehicles.insert(handle, vehicle);
        handle
    }

    pub fn despawn(&mut self, handle: VehicleHandle) -> Option<FakeVehicle> {
        if self.player_vehicle == Some(handle) {
            self.player_vehicle = None;
        }
        self.vehicles.remove(&handle)
    }

    pub fn vehicle(&self, handle: VehicleHandle) -> Option<&FakeVehicle> {
        self.vehicles.get(&handle)
    }

    pub fn vehicle_mut(&mut self, handle: VehicleHandle) -> Option<&mut FakeVehicle> {
        self.vehicles.get_mut(&handle)
    }

    /// Seats the player in `handle`, or on foot for `None`.
    pub fn set_player_vehicle(&mut self, handle: Option<VehicleHandle>) {
        self.player_vehicle = handle;
    }

    pub fn set_display_name(&mut self, model: u32, name: &str) {
        self.display_names.insert(model, String::from(name));
    }

    pub fn notifications(&self) -> &[String] {
        &self.notifications
    }

    /// Number of writes to top gear, ratios or flat velocity made through [VehicleHost].
    pub fn gearbox_writes(&self) -> usize {
        self.gearbox_writes
    }

    pub fn drive_force_writes(&self) -> usize {
        self.drive_force_writes
    }

    pub fn reset_write_counters(&mut self) {
        self.gearbox_writes = 0;
        self.drive_force_writes = 0;
    }

    fn read<T: Default>(&self, handle: VehicleHandle, f: impl FnOnce(&FakeVehicle) -> T) -> T {
        self.vehicles.get(&handle).map(f).unwrap_or_default()
    }

    fn write(&mut self, handle: VehicleHandle, f: impl FnOnce(&mut FakeVehicle)) {
        if let Some(vehicle) = self.vehicles.get_mut(&handle) {
            f(vehicle);
        }
    }
}

impl VehicleHost for MemoryHost {
    fn player_vehicle(&self) -> Option<VehicleHandle> {
        self.player_vehicle.filter(|h| self.vehicles.contains_key(h))
    }

    fn is_player_in_vehicle(&self, vehicle: VehicleHandle) -> bool {
        self.player_vehicle() == Some(vehicle) && self.is_vehicle_alive(vehicle)
    }

    fn all_vehicles(&self) -> Vec<VehicleHandle> {
        self.vehicles.keys().copied().collect()
    }

    fn vehicle_exists(&self, vehicle: VehicleHandle) -> bool {
        self.vehicles.contains_key(&vehicle)
    }

    fn is_vehicle_dead(&self, vehicle: VehicleHandle) -> bool {
        self.read(vehicle, |v| v.dead)
    }

    fn is_engine_running(&self, vehicle: VehicleHandle) -> bool {
        self.read(vehicle, |v| v.engine_running)
    }

    fn model_hash(&self, vehicle: VehicleHandle) -> u32 {
        self.read(vehicle, |v| v.model)
    }

    fn plate_text(&self, vehicle: VehicleHandle) -> String {
        self.read(vehicle, |v| v.plate.clone())
    }

    fn display_name(&self, model: u32) -> String {
        self.display_names.get(&model).cloned().unwrap_or_else(|| format!("{:08X}", model))
    }

    fn current_rpm(&self, vehicle: VehicleHandle) -> f32 {
        self.read(vehicle, |v| v.rpm)
    }

    fn current_gear(&self, vehicle: VehicleHandle) -> u8 {
        self.read(vehicle, |v| v.gear)
    }

    fn throttle(&self, vehicle: VehicleHandle) -> f32 {
        self.read(vehicle, |v| v.throttle)
    }

    fn wheel_speeds(&self, vehicle: VehicleHandle) -> Vec<f32> {
        self.read(vehicle, |v| v.wheel_speeds.clone())
    }

    fn wheel_power(&self, vehicle: VehicleHandle) -> Vec<f32> {
        self.read(vehicle, |v| v.wheel_power.clone())
    }

    fn mass(&self, vehicle: VehicleHandle) -> f32 {
        self.read(vehicle, |v| v.mass)
    }

    fn initial_drive_force(&self, vehicle: VehicleHandle) -> f32 {
        self.read(vehicle, |v| v.initial_drive_force)
    }

    fn drive_force(&self, vehicle: VehicleHandle) -> f32 {
        self.read(vehicle, |v| v.drive_force)
    }

    fn set_drive_force(&mut self, vehicle: VehicleHandle, force: f32) {
        self.drive_force_writes += 1;
        self.write(vehicle, |v| v.drive_force = force);
    }

    fn engine_upgrade_level(&self, vehicle: VehicleHandle) -> f32 {
        self.read(vehicle, |v| v.engine_upgrade_level)
    }

    fn set_engine_upgrade_level(&mut self, vehicle: VehicleHandle, level: f32) {
        self.write(vehicle, |v| v.engine_upgrade_level = level);
    }

    fn top_gear(&self, vehicle: VehicleHandle) -> u8 {
        self.read(vehicle, |v| v.top_gear)
    }

    fn set_top_gear(&mut self, vehicle: VehicleHandle, top_gear: u8) {
        self.gearbox_writes += 1;
        self.write(vehicle, |v| v.top_gear = top_gear);
    }

    fn gear_ratios(&self, vehicle: VehicleHandle) -> Vec<f32> {
        self.read(vehicle, |v| v.gear_ratios.clone())
    }

    fn set_gear_ratios(&mut self, vehicle: VehicleHandle, ratios: &[f32]) {
        self.gearbox_writes += 1;
        self.write(vehicle, |v| v.gear_ratios = ratios.to_vec());
    }

    fn drive_max_flat_vel(&self, vehicle: VehicleHandle) -> f32 {
        self.read(vehicle, |v| v.drive_max_flat_vel)
    }

    fn set_drive_max_flat_vel(&mut self, vehicle: VehicleHandle, velocity: f32) {
        self.gearbox_writes += 1;
        self.write(vehicle, |v| v.drive_max_flat_vel = velocity);
    }

    fn initial_drive_max_flat_vel(&self, vehicle: VehicleHandle) -> f32 {
        self.read(vehicle, |v| v.initial_drive_max_flat_vel)
    }

    fn set_initial_drive_max_flat_vel(&mut self, vehicle: VehicleHandle, velocity: f32) {
        self.gearbox_writes += 1;
        self.write(vehicle, |v| v.initial_drive_max_flat_vel = velocity);
    }

    fn notify(&mut self, message: &str) {
        debug!("Notification: {}", message);
        self.notifications.push(String::from(message));
    }
}
