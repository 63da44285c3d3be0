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


use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::controller;
use crate::controller::{Binding, VehicleController};
use crate::host::{VehicleHandle, VehicleHost};
use crate::preset::gears::{MAX_TOP_GEAR, MIN_TOP_GEAR};
use crate::preset::{GearData, GearPreset, Preset, PresetStore};
use crate::settings::ScriptSettings;

pub const MAX_DRIVE_VEL: f32 = 500.0;
pub const MIN_DRIVE_VEL: f32 = 1.0;
pub const MAX_RATIO: f32 = 10.0;
pub const MIN_RATIO: f32 = 0.01;

/// Keeps a vehicle's gearbox on its preset.
///
/// While bound to `Default` the controller only mirrors the stock gearbox. Once a preset has
/// been applied, or the player edits a value, those values are enforced: any change the game
/// makes behind our back is written over on the next check.
#[derive(Debug, Clone)]
pub struct GearController {
    binding: Binding,
    vehicle: Option<VehicleHandle>,
    active: Option<GearPreset>,
    snapshot: Option<GearData>,
    enforce: bool,
    last_check: Option<Instant>
}

impl GearController {
    pub fn is_enforcing(&self) -> bool {
        self.enforce
    }

    /// Values last written to (or read from) the vehicle.
    pub fn snapshot(&self) -> Option<&GearData> {
        self.snapshot.as_ref()
    }

    /// Compares the vehicle against the snapshot and writes the active values back if the game
    /// changed anything. Returns the number of corrections made (0 or 1).
    pub fn check_reapply(&mut self, host: &mut dyn VehicleHost) -> usize {
        let vehicle = match self.vehicle {
            Some(vehicle) if host.is_vehicle_alive(vehicle) => vehicle,
            _ => return 0
        };
        let (active, snapshot) = match (self.active.as_mut(), self.snapshot.as_mut()) {
            (Some(active), Some(snapshot)) => (active, snapshot),
            _ => return 0
        };
        let current = GearData::read_from_host(host, vehicle);
        if !self.enforce {
            *active.data_mut() = current.clone();
            *snapshot = current;
            return 0;
        }
        if !snapshot.diverges_from(&current) {
            return 0;
        }
        info!("{} gearbox changed by the game, reapplying {}", vehicle, active.name());
        active.data().write_to_host(host, vehicle);
        *snapshot = active.data().clone();
        1
    }

    pub fn set_top_gear(&mut self, host: &mut dyn VehicleHost, top_gear: u8) -> bool {
        let top_gear = top_gear.clamp(MIN_TOP_GEAR, MAX_TOP_GEAR);
        let stock_ratios = match self.vehicle {
            Some(vehicle) => host.gear_ratios(vehicle),
            None => Vec::new()
        };
        self.edit(host, |data| {
            let wanted = top_gear as usize + 1;
            while data.ratios.len() < wanted {
                let idx = data.ratios.len();
                let fill = stock_ratios.get(idx).copied()
                    .filter(|r| *r != 0.0)
                    .or_else(|| data.ratios.last().copied())
                    .unwrap_or(1.0);
                data.ratios.push(fill);
            }
            data.ratios.truncate(wanted);
            data.top_gear = top_gear;
        })
    }

    pub fn set_drive_max_vel(&mut self, host: &mut dyn VehicleHost, velocity: f32) -> bool {
        let velocity = velocity.clamp(MIN_DRIVE_VEL, MAX_DRIVE_VEL);
        self.edit(host, |data| data.drive_max_vel = velocity)
    }

    /// Gear 0 is reverse and stays negative; forward gears stay positive.
    pub fn set_ratio(&mut self, host: &mut dyn VehicleHost, gear: usize, ratio: f32) -> bool {
        if self.active.as_ref().map_or(true, |a| gear > a.data().top_gear as usize) {
            return false;
        }
        let ratio = if gear == 0 {
            ratio.clamp(-MAX_RATIO, -MIN_RATIO)
        } else {
            ratio.clamp(MIN_RATIO, MAX_RATIO)
        };
        self.edit(host, |data| {
            if let Some(slot) = data.ratios.get_mut(gear) {
                *slot = ratio;
            }
        })
    }

    fn edit(&mut self, host: &mut dyn VehicleHost, change: impl FnOnce(&mut GearData)) -> bool {
        let (vehicle, active) = match (self.vehicle, self.active.as_mut()) {
            (Some(vehicle), Some(active)) if host.is_vehicle_alive(vehicle) => (vehicle, active),
            _ => return false
        };
        change(active.data_mut());
        active.data().write_to_host(host, vehicle);
        self.snapshot = Some(active.data().clone());
        self.enforce = true;
        true
    }
}

impl VehicleController for GearController {
    type Preset = GearPreset;

    fn new(binding: Binding) -> Self {
        let vehicle = match binding {
            Binding::Player => None,
            Binding::Npc(vehicle) => Some(vehicle)
        };
        GearController { binding, vehicle, active: None, snapshot: None, enforce: false, last_check: None }
    }

    fn binding(&self) -> Binding {
        self.binding
    }

    fn vehicle(&self) -> Option<VehicleHandle> {
        self.vehicle
    }

    fn active_config(&self) -> Option<&GearPreset> {
        self.active.as_ref()
    }

    fn update_active_config(&mut self,
                            host: &mut dyn VehicleHost,
                            store: &PresetStore<GearPreset>,
                            settings: &ScriptSettings,
                            require_player: bool) {
        self.enforce = false;
        self.snapshot = None;
        let (vehicle, matched) = match (self.vehicle, controller::match_vehicle(host, self.vehicle, store, require_player)) {
            (Some(vehicle), Some(matched)) => (vehicle, matched),
            _ => {
                self.active = None;
                return;
            }
        };
        let matched = if settings.main.auto_load { matched } else { store.default_preset() };
        let mut active = matched.clone();
        if matched.is_default() {
            *active.data_mut() = GearData::read_from_host(host, vehicle);
        } else {
            debug!("{} loading gear preset {}", vehicle, matched.name());
            active.data().write_to_host(host, vehicle);
            self.enforce = true;
        }
        self.snapshot = Some(active.data().clone());
        self.active = Some(active);
    }

    fn tick(&mut self,
            host: &mut dyn VehicleHost,
            store: &PresetStore<GearPreset>,
            settings: &ScriptSettings,
            _now: Instant) {
        if self.binding == Binding::Player && controller::follow_player(host, &mut self.vehicle) {
            self.update_active_config(host, store, settings, true);
        }
    }

    fn periodic_check(&mut self, host: &mut dyn VehicleHost, settings: &ScriptSettings, now: Instant) -> usize {
        if !settings.main.auto_fix {
            return 0;
        }
        let interval = Duration::from_millis(settings.main.reapply_interval_ms);
        if let Some(last) = self.last_check {
            if now.saturating_duration_since(last) < interval {
                return 0;
            }
        }
        self.last_check = Some(now);
        self.check_reapply(host)
    }

    fn apply_config(&mut self, host: &mut dyn VehicleHost, other: &GearPreset) -> bool {
        let data = other.data().clone();
        self.edit(host, |current| *current = data)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use crate::controller::{Binding, VehicleController};
    use crate::gears::controller::GearController;
    use crate::host::memory::{FakeVehicle, MemoryHost};
    use crate::host::{VehicleHandle, VehicleHost};
    use crate::preset::{GearData, GearPreset, Identity, Preset, PresetStore, SaveType};
    use crate::settings::ScriptSettings;

    const ADDER: u32 = 0xB779A091;

    fn five_speed() -> GearData {
        GearData::new(5, 45.0, vec![-3.0, 3.2, 2.1, 1.5, 1.1, 0.9]).unwrap()
    }

    fn store(dir: &std::path::Path) -> PresetStore<GearPreset> {
        let mut store = PresetStore::new(dir.to_path_buf());
        store.load_all();
        let preset = GearPreset::new(String::from("short"), Identity::default(), five_speed());
        let identity = Identity { model_hash: Some(ADDER), ..Default::default() };
        store.save(&preset, "short", identity, SaveType::GenericModel).unwrap();
        store
    }

    fn seated(host: &mut MemoryHost, model: u32) -> VehicleHandle {
        let car = host.spawn(FakeVehicle::new(model, "PLATE"));
        host.set_player_vehicle(Some(car));
        car
    }

    #[test]
    fn matched_preset_is_applied_on_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let settings = ScriptSettings::default();
        let mut host = MemoryHost::new();
        let car = seated(&mut host, ADDER);

        let mut controller = GearController::new(Binding::Player);
        controller.tick(&mut host, &store, &settings, Instant::now());
        assert_eq!(controller.active_config().unwrap().name(), "short");
        assert!(controller.is_enforcing());
        let vehicle = host.vehicle(car).unwrap();
        assert_eq!(vehicle.top_gear, 5);
        assert_eq!(vehicle.gear_ratios, five_speed().ratios);
        assert!((vehicle.initial_drive_max_flat_vel - 45.0 / 1.2).abs() < 1e-5);
    }

    #[test]
    fn default_mirrors_stock_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let settings = ScriptSettings::default();
        let mut host = MemoryHost::new();
        let car = seated(&mut host, 42);

        let mut controller = GearController::new(Binding::Player);
        let now = Instant::now();
        controller.tick(&mut host, &store, &settings, now);
        assert!(controller.active_config().unwrap().is_default());
        assert_eq!(controller.active_config().unwrap().data(), &GearData::read_from_host(&host, car));

        host.vehicle_mut(car).unwrap().gear_ratios[6] = 0.6;
        assert_eq!(controller.periodic_check(&mut host, &settings, now), 0);
        assert_eq!(host.gearbox_writes(), 0);
        assert!((controller.active_config().unwrap().data().ratios[6] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn reapply_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let settings = ScriptSettings::default();
        let mut host = MemoryHost::new();
        let car = seated(&mut host, ADDER);
        let mut controller = GearController::new(Binding::Player);
        let start = Instant::now();
        controller.tick(&mut host, &store, &settings, start);
        host.reset_write_counters();

        assert_eq!(controller.periodic_check(&mut host, &settings, start), 0);
        assert_eq!(host.gearbox_writes(), 0);

        // Workshop upgrade resets the gearbox
        host.vehicle_mut(car).unwrap().top_gear = 6;
        host.vehicle_mut(car).unwrap().gear_ratios = vec![-3.33, 3.33, 1.90, 1.35, 1.0, 0.8, 0.67];
        assert_eq!(controller.periodic_check(&mut host, &settings, start + Duration::from_millis(500)), 0);
        assert_eq!(controller.periodic_check(&mut host, &settings, start + Duration::from_millis(1000)), 1);
        assert!(host.gearbox_writes() > 0);
        assert_eq!(host.vehicle(car).unwrap().top_gear, 5);
        assert_eq!(host.vehicle(car).unwrap().gear_ratios, five_speed().ratios);

        host.reset_write_counters();
        assert_eq!(controller.periodic_check(&mut host, &settings, start + Duration::from_millis(2000)), 0);
        assert_eq!(host.gearbox_writes(), 0);
    }

    #[test]
    fn auto_fix_off_leaves_changes() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let mut settings = ScriptSettings::default();
        settings.main.auto_fix = false;
        let mut host = MemoryHost::new();
        let car = seated(&mut host, ADDER);
        let mut controller = GearController::new(Binding::Player);
        controller.tick(&mut host, &store, &settings, Instant::now());

        host.vehicle_mut(car).unwrap().drive_max_flat_vel = 60.0;
        assert_eq!(controller.periodic_check(&mut host, &settings, Instant::now()), 0);
        assert_eq!(host.vehicle(car).unwrap().drive_max_flat_vel, 60.0);
    }

    #[test]
    fn auto_load_off_keeps_stock() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let mut settings = ScriptSettings::default();
        settings.main.auto_load = false;
        let mut host = MemoryHost::new();
        let car = seated(&mut host, ADDER);
        let mut controller = GearController::new(Binding::Player);
        controller.tick(&mut host, &store, &settings, Instant::now());

        assert!(controller.active_config().unwrap().is_default());
        assert!(!controller.has_custom_config());
        assert!(!controller.is_enforcing());
        assert_eq!(host.gearbox_writes(), 0);
        assert_eq!(host.vehicle(car).unwrap().top_gear, 6);
    }

    #[test]
    fn short_ratio_array_is_mirrored_safely() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let settings = ScriptSettings::default();
        let mut host = MemoryHost::new();
        let car = seated(&mut host, 42);
        host.vehicle_mut(car).unwrap().gear_ratios = vec![-3.33, 3.33, 1.90, 1.35];
        let mut controller = GearController::new(Binding::Player);
        controller.tick(&mut host, &store, &settings, Instant::now());

        let mirrored = controller.active_config().unwrap().data();
        assert_eq!(mirrored.top_gear, 3);
        assert_eq!(mirrored.ratios.len(), 4);
        assert!(!controller.set_ratio(&mut host, 5, 1.0));
        assert!(controller.set_ratio(&mut host, 3, 1.1));
        assert_eq!(host.vehicle(car).unwrap().gear_ratios, vec![-3.33, 3.33, 1.90, 1.1]);
        assert_eq!(host.vehicle(car).unwrap().top_gear, 3);
    }

    #[test]
    fn edits_are_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let settings = ScriptSettings::default();
        let mut host = MemoryHost::new();
        let car = seated(&mut host, 42);
        let mut controller = GearController::new(Binding::Player);
        let start = Instant::now();
        controller.tick(&mut host, &store, &settings, start);

        assert!(controller.set_top_gear(&mut host, 8));
        assert_eq!(host.vehicle(car).unwrap().top_gear, 8);
        assert_eq!(controller.active_config().unwrap().data().ratios.len(), 9);
        assert!(controller.set_ratio(&mut host, 8, 25.0));
        assert_eq!(host.vehicle(car).unwrap().gear_ratios[8], 10.0);
        assert!(controller.set_ratio(&mut host, 0, 2.0));
        assert_eq!(host.vehicle(car).unwrap().gear_ratios[0], -0.01);
        assert!(!controller.set_ratio(&mut host, 9, 1.0));
        assert!(controller.set_drive_max_vel(&mut host, 1000.0));
        assert_eq!(host.drive_max_flat_vel(car), 500.0);
        assert!(controller.is_enforcing());

        host.vehicle_mut(car).unwrap().top_gear = 6;
        assert_eq!(controller.periodic_check(&mut host, &settings, start), 1);
        assert_eq!(host.vehicle(car).unwrap().top_gear, 8);

        assert!(controller.set_top_gear(&mut host, 0));
        assert_eq!(host.vehicle(car).unwrap().top_gear, 1);
        assert_eq!(host.vehicle(car).unwrap().gear_ratios.len(), 2);
    }

    #[test]
    fn apply_config_keeps_identity() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let settings = ScriptSettings::default();
        let mut host = MemoryHost::new();
        let car = seated(&mut host, 42);
        let mut controller = GearController::new(Binding::Player);
        controller.tick(&mut host, &store, &settings, Instant::now());

        assert!(controller.apply_config(&mut host, &store.presets()[1]));
        assert!(controller.active_config().unwrap().is_default());
        assert_eq!(controller.active_config().unwrap().data(), &five_speed());
        assert_eq!(host.vehicle(car).unwrap().top_gear, 5);
    }
}
