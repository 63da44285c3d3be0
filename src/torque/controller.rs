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


use std::sync::OnceLock;
use std::time::Instant;
use tracing::debug;

use crate::controller;
use crate::controller::{Binding, VehicleController};
use crate::curve::{Extrapolation, ScaledCurve};
use crate::host::{VehicleHandle, VehicleHost};
use crate::preset::{Preset, PresetStore, TorquePreset};
use crate::settings::ScriptSettings;

/// Extra drive force a fully upgraded engine gets.
const MAX_ENGINE_UPGRADE_BONUS: f32 = 0.2;

/// How the game scales drive force with RPM on its own: flat up to 80%, rising to 1/0.6 at the
/// limiter. Only applied from second gear up.
fn base_torque_curve() -> &'static ScaledCurve {
    static CURVE: OnceLock<ScaledCurve> = OnceLock::new();
    CURVE.get_or_init(|| {
        ScaledCurve::new(vec![(0.0, 1.0), (0.8, 1.0), (1.0, 1.0 / 0.6)])
            .unwrap_or_else(|_| ScaledCurve::flat(1.0))
    })
}

pub fn base_multiplier(normalized_rpm: f32, gear: u8) -> f32 {
    if gear < 2 {
        return 1.0;
    }
    base_torque_curve().evaluate(normalized_rpm, Extrapolation::Bounded)
}

/// Maps an engine upgrade percentage onto a 1.0 - 1.2 drive force multiplier.
pub fn engine_upgrade_multiplier(level: f32) -> f32 {
    1.0 + MAX_ENGINE_UPGRADE_BONUS * level.clamp(0.0, 100.0) / 100.0
}

/// Drive force for one tick: the vehicle's stock force scaled by its engine upgrade, the game's
/// own RPM curve and the preset's torque map.
pub fn compute_drive_force(initial_drive_force: f32,
                           upgrade_level: f32,
                           normalized_rpm: f32,
                           gear: u8,
                           preset: &TorquePreset) -> f32 {
    initial_drive_force
        * engine_upgrade_multiplier(upgrade_level)
        * base_multiplier(normalized_rpm, gear)
        * preset.data().multiplier_at(normalized_rpm)
}

#[derive(Debug, Clone)]
pub struct TorqueController {
    binding: Binding,
    vehicle: Option<VehicleHandle>,
    active: Option<TorquePreset>
}

impl TorqueController {
    pub fn active_config_mut(&mut self) -> Option<&mut TorquePreset> {
        self.active.as_mut()
    }

    fn update_torque(&self, host: &mut dyn VehicleHost) {
        let (vehicle, preset) = match (self.vehicle, self.active.as_ref()) {
            (Some(vehicle), Some(preset)) => (vehicle, preset),
            _ => return
        };
        if preset.is_passthrough() || !host.vehicle_exists(vehicle) {
            return;
        }
        let force = compute_drive_force(host.initial_drive_force(vehicle),
                                        host.engine_upgrade_level(vehicle),
                                        host.current_rpm(vehicle),
                                        host.current_gear(vehicle),
                                        preset);
        host.set_drive_force(vehicle, force);
    }
}

impl VehicleController for TorqueController {
    type Preset = TorquePreset;

    fn new(binding: Binding) -> Self {
        let vehicle = match binding {
            Binding::Player => None,
            Binding::Npc(vehicle) => Some(vehicle)
        };
        TorqueController { binding, vehicle, active: None }
    }

    fn binding(&self) -> Binding {
        self.binding
    }

    fn vehicle(&self) -> Option<VehicleHandle> {
        self.vehicle
    }

    fn active_config(&self) -> Option<&TorquePreset> {
        self.active.as_ref()
    }

    fn update_active_config(&mut self,
                            host: &mut dyn VehicleHost,
                            store: &PresetStore<TorquePreset>,
                            _settings: &ScriptSettings,
                            require_player: bool) {
        self.active = controller::match_vehicle(host, self.vehicle, store, require_player).cloned();
        if let (Some(vehicle), Some(preset)) = (self.vehicle, self.active.as_ref()) {
            debug!("{} using torque preset {}", vehicle, preset.name());
        }
    }

    fn tick(&mut self,
            host: &mut dyn VehicleHost,
            store: &PresetStore<TorquePreset>,
            settings: &ScriptSettings,
            _now: Instant) {
        if self.binding == Binding::Player && controller::follow_player(host, &mut self.vehicle) {
            self.update_active_config(host, store, settings, true);
        }
        if controller::is_drivable(host, self.binding, self.vehicle) {
            self.update_torque(host);
        }
    }

    fn apply_config(&mut self, _host: &mut dyn VehicleHost, other: &TorquePreset) -> bool {
        match self.active.as_mut() {
            Some(active) => {
                active.apply_data_from(other);
                true
            }
            None => false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use crate::controller::{Binding, VehicleController};
    use crate::curve::ScaledCurve;
    use crate::host::memory::{FakeVehicle, MemoryHost};
    use crate::host::VehicleHost;
    use crate::preset::{Identity, Preset, PresetStore, TorqueMapData, TorquePreset};
    use crate::settings::ScriptSettings;
    use crate::torque::controller::{base_multiplier, engine_upgrade_multiplier, TorqueController};

    const ADDER: u32 = 0xB779A091;

    fn store_with_adder(dir: &std::path::Path) -> PresetStore<TorquePreset> {
        let mut store = PresetStore::new(dir.to_path_buf());
        store.load_all();
        let data = TorqueMapData {
            idle_rpm: 800,
            rev_limit_rpm: 7000,
            redline_rpm: None,
            torque_mult_map: ScaledCurve::new(vec![(0.0, 0.5), (1.0, 1.5)]).unwrap()
        };
        let preset = TorquePreset::new(String::from("adder"), Identity::default(), data);
        let identity = Identity { model_hash: Some(ADDER), ..Default::default() };
        store.save(&preset, "adder", identity, crate::preset::SaveType::GenericModel).unwrap();
        store
    }

    #[test]
    fn multipliers() {
        assert_eq!(engine_upgrade_multiplier(0.0), 1.0);
        assert!((engine_upgrade_multiplier(50.0) - 1.1).abs() < 1e-6);
        assert!((engine_upgrade_multiplier(250.0) - 1.2).abs() < 1e-6);
        assert_eq!(base_multiplier(1.0, 1), 1.0);
        assert_eq!(base_multiplier(0.5, 3), 1.0);
        assert!((base_multiplier(1.0, 3) - 1.0 / 0.6).abs() < 1e-4);
        assert!((base_multiplier(1.2, 3) - 1.0 / 0.6).abs() < 1e-4);
    }

    #[test]
    fn player_controller_writes_drive_force() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_adder(dir.path());
        let settings = ScriptSettings::default();
        let mut host = MemoryHost::new();
        let car = host.spawn(FakeVehicle::new(ADDER, "PLATE"));
        host.vehicle_mut(car).unwrap().rpm = 0.5;
        host.vehicle_mut(car).unwrap().gear = 2;

        let mut controller = TorqueController::new(Binding::Player);
        controller.tick(&mut host, &store, &settings, Instant::now());
        assert_eq!(controller.vehicle(), None);
        assert!(controller.active_config().is_none());
        assert_eq!(host.drive_force_writes(), 0);

        host.set_player_vehicle(Some(car));
        controller.tick(&mut host, &store, &settings, Instant::now());
        assert_eq!(controller.vehicle(), Some(car));
        assert_eq!(controller.active_config().unwrap().name(), "adder");
        assert!((host.drive_force(car) - 0.3).abs() < 1e-6);

        host.vehicle_mut(car).unwrap().engine_upgrade_level = 100.0;
        controller.tick(&mut host, &store, &settings, Instant::now());
        assert!((host.drive_force(car) - 0.36).abs() < 1e-6);
    }

    #[test]
    fn default_preset_leaves_vehicle_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_adder(dir.path());
        let settings = ScriptSettings::default();
        let mut host = MemoryHost::new();
        let car = host.spawn(FakeVehicle::new(1234, "PLATE"));
        host.set_player_vehicle(Some(car));

        let mut controller = TorqueController::new(Binding::Player);
        controller.tick(&mut host, &store, &settings, Instant::now());
        assert!(controller.active_config().unwrap().is_default());
        assert_eq!(host.drive_force_writes(), 0);

        let adder = store.presets()[1].clone();
        assert!(controller.apply_config(&mut host, &adder));
        assert_eq!(controller.active_config().unwrap().name(), "Default");
        controller.tick(&mut host, &store, &settings, Instant::now());
        assert_eq!(host.drive_force_writes(), 1);
    }

    #[test]
    fn leaving_vehicle_clears_config() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_adder(dir.path());
        let settings = ScriptSettings::default();
        let mut host = MemoryHost::new();
        let car = host.spawn(FakeVehicle::new(ADDER, "PLATE"));
        host.set_player_vehicle(Some(car));

        let mut controller = TorqueController::new(Binding::Player);
        controller.tick(&mut host, &store, &settings, Instant::now());
        assert!(controller.active_config().is_some());

        host.set_player_vehicle(None);
        controller.tick(&mut host, &store, &settings, Instant::now());
        assert!(controller.active_config().is_none());
        assert!(!controller.apply_config(&mut host, &TorquePreset::default_preset()));
    }

    #[test]
    fn npc_controller_goes_inert_when_vehicle_dies() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_adder(dir.path());
        let settings = ScriptSettings::default();
        let mut host = MemoryHost::new();
        let car = host.spawn(FakeVehicle::new(ADDER, "NPC"));

        let mut controller = TorqueController::new(Binding::Npc(car));
        controller.update_active_config(&mut host, &store, &settings, false);
        assert!(controller.has_custom_config());
        controller.tick(&mut host, &store, &settings, Instant::now());
        assert_eq!(host.drive_force_writes(), 1);

        host.vehicle_mut(car).unwrap().dead = true;
        controller.tick(&mut host, &store, &settings, Instant::now());
        assert_eq!(host.drive_force_writes(), 1);
    }
}
