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
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info};

use crate::controller::VehicleController;
use crate::error::{Error, ErrorKind, Result};
use crate::host::VehicleHost;
use crate::paths::ModPaths;
use crate::pool::ControllerPool;
use crate::preset::{Identity, ModelNameCache, Preset, PresetStore, SaveType, TorquePreset};
use crate::recorder::PerformanceLog;
use crate::settings;
use crate::settings::ScriptSettings;
use crate::torque::controller::TorqueController;
use crate::torque::data::{get_torque_data, TorqueData};

/// Engine speed figures for the player's vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RpmInfo {
    pub idle_rpm: u32,
    pub rev_limit_rpm: u32,
    pub redline_rpm: Option<u32>,
    pub actual_rpm: f32
}

/// Everything the torque map plugin keeps between ticks.
#[derive(Debug)]
pub struct TorqueScript {
    paths: ModPaths,
    settings: ScriptSettings,
    store: PresetStore<TorquePreset>,
    pool: ControllerPool<TorqueController>,
    recorder: PerformanceLog
}

impl TorqueScript {
    pub fn init(paths: ModPaths, names: ModelNameCache) -> TorqueScript {
        if let Err(e) = fs::create_dir_all(paths.root()) {
            error!("Couldn't create {}. {}", paths.root().display(), e);
        }
        let settings = ScriptSettings::load(&paths.settings_file());
        let mut store = PresetStore::new(paths.presets_dir()).with_name_cache(names);
        store.load_all();
        let recorder = PerformanceLog::new(paths.recordings_dir());
        info!("{} initialised", paths.name());
        TorqueScript { paths, settings, store, pool: ControllerPool::new(), recorder }
    }

    pub fn paths(&self) -> &ModPaths {
        &self.paths
    }

    pub fn settings(&self) -> &ScriptSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ScriptSettings {
        &mut self.settings
    }

    pub fn save_settings(&self) -> Result<()> {
        self.settings.write(&self.paths.settings_file())
    }

    pub fn store(&self) -> &PresetStore<TorquePreset> {
        &self.store
    }

    pub fn pool(&self) -> &ControllerPool<TorqueController> {
        &self.pool
    }

    pub fn recorder(&self) -> &PerformanceLog {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut PerformanceLog {
        &mut self.recorder
    }

    /// Re-reads settings and presets from disk and rebinds every controller.
    pub fn reload(&mut self, host: &mut dyn VehicleHost) {
        self.settings = ScriptSettings::load(&self.paths.settings_file());
        let count = self.store.load_all();
        self.pool.update_active_configs(host, &self.store, &self.settings);
        settings::notify(host, &self.settings, &format!("Loaded {} torque presets", count), false);
    }

    /// Player controller, then NPCs, then the recorder.
    pub fn tick(&mut self, host: &mut dyn VehicleHost, now: Instant) {
        self.pool.tick(host, &self.store, &self.settings, now);
        let player = self.pool.player();
        self.recorder.update(host, player.vehicle(), player.active_config());
    }

    pub fn set_npc_enabled(&mut self, enabled: bool) {
        self.settings.main.enable_npc = enabled;
        if !enabled {
            self.pool.clear_npcs();
        }
    }

    pub fn active_npc_count(&self) -> usize {
        self.pool.active_npc_count()
    }

    /// Loads the data of stored preset `index` onto the player's vehicle.
    pub fn apply_preset(&mut self, host: &mut dyn VehicleHost, index: usize) -> bool {
        let preset = match self.store.get(index) {
            Some(preset) => preset,
            None => return false
        };
        let applied = self.pool.player_mut().apply_config(host, preset);
        if applied {
            settings::notify(host, &self.settings, &format!("Applied torque preset {}", preset.name()), false);
        } else {
            settings::notify(host, &self.settings, "No vehicle to apply the preset to", true);
        }
        applied
    }

    /// Saves the player's current torque map under `name`.
    pub fn save_active(&mut self, host: &mut dyn VehicleHost, name: &str, save_type: SaveType) -> Result<PathBuf> {
        let result = self.try_save_active(host, name, save_type);
        match &result {
            Ok(path) => settings::notify(host, &self.settings, &format!("Saved {}", path.display()), false),
            Err(e) => {
                error!("Failed to save torque preset {}. {}", name, e);
                settings::notify(host, &self.settings, &format!("Failed to save {}. {}", name, e), true)
            }
        }
        result
    }

    fn try_save_active(&mut self, host: &dyn VehicleHost, name: &str, save_type: SaveType) -> Result<PathBuf> {
        let player = self.pool.player();
        let vehicle = player.vehicle()
            .filter(|v| host.is_vehicle_alive(*v))
            .ok_or_else(|| Error::new(ErrorKind::NoVehicle, String::from("player has no vehicle")))?;
        let preset = player.active_config()
            .cloned()
            .ok_or_else(|| Error::new(ErrorKind::NoActiveConfig, String::from("player vehicle has no torque preset")))?;
        let model_hash = host.model_hash(vehicle);
        let identity = Identity {
            model_hash: Some(model_hash),
            model_name: self.model_name(host, model_hash),
            plate: host.plate_text(vehicle),
            description: String::new()
        };
        self.store.save(&preset, name, identity, save_type)
    }

    fn model_name(&self, host: &dyn VehicleHost, model_hash: u32) -> String {
        self.store.name_cache().get(model_hash)
            .map(String::from)
            .unwrap_or_else(|| host.display_name(model_hash))
    }

    pub fn player_torque_data(&self, host: &dyn VehicleHost) -> Option<TorqueData> {
        let player = self.pool.player();
        let vehicle = player.vehicle().filter(|v| host.is_player_in_vehicle(*v))?;
        Some(get_torque_data(host, vehicle, player.active_config()?))
    }

    /// Idle, rev limit and current engine RPM, if the player's preset knows them.
    pub fn player_rpm_info(&self, host: &dyn VehicleHost) -> Option<RpmInfo> {
        let player = self.pool.player();
        let vehicle = player.vehicle().filter(|v| host.is_player_in_vehicle(*v))?;
        let data = player.active_config()?.data();
        let actual_rpm = data.real_rpm(host.current_rpm(vehicle))?;
        Some(RpmInfo {
            idle_rpm: data.idle_rpm,
            rev_limit_rpm: data.rev_limit_rpm,
            redline_rpm: data.redline_rpm,
            actual_rpm
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::time::{Duration, Instant};

    use crate::controller::VehicleController;
    use crate::host::memory::{FakeVehicle, MemoryHost};
    use crate::host::VehicleHost;
    use crate::paths::ModPaths;
    use crate::preset::{ModelNameCache, Preset, SaveType};
    use crate::recorder::LogState;
    use crate::torque::script::TorqueScript;

    const ADDER: u32 = 0xB779A091;

    const ADDER_PLATE: &str = "\
[ID]
ModelName = adder
Plate = 46EEK572

[Data]
IdleRPM = 800
RevLimitRPM = 7000
TorqueMultMap = <<<END
0.0|0.8
0.5|1.2
1.0|0.9
END
";

    fn script_with(files: &[(&str, &str)]) -> (tempfile::TempDir, TorqueScript) {
        let dir = tempfile::tempdir().unwrap();
        let paths = ModPaths::new(dir.path(), "CustomTorqueMap");
        fs::create_dir_all(paths.presets_dir()).unwrap();
        for (name, contents) in files {
            fs::write(paths.presets_dir().join(name), contents).unwrap();
        }
        (dir, TorqueScript::init(paths, ModelNameCache::new()))
    }

    #[test]
    fn init_creates_layout() {
        let (dir, script) = script_with(&[]);
        let root = dir.path().join("CustomTorqueMap");
        assert!(root.join("settings_general.toml").is_file());
        assert!(root.join("Configs").join("Default.ini").is_file());
        assert_eq!(script.store().len(), 1);
    }

    #[test]
    fn plate_preset_drives_the_player() {
        let (_dir, mut script) = script_with(&[("adder.ini", ADDER_PLATE)]);
        let mut host = MemoryHost::new();
        let mut vehicle = FakeVehicle::new(ADDER, "46eek572 ");
        vehicle.rpm = 0.5;
        vehicle.gear = 3;
        let car = host.spawn(vehicle);
        host.set_player_vehicle(Some(car));

        script.tick(&mut host, Instant::now());
        assert_eq!(script.pool().player().active_config().unwrap().name(), "adder");
        assert!((host.drive_force(car) - 0.3 * 1.2).abs() < 1e-5);

        host.vehicle_mut(car).unwrap().rpm = 0.6;
        let info = script.player_rpm_info(&host).unwrap();
        assert_eq!(info.idle_rpm, 800);
        assert_eq!(info.rev_limit_rpm, 7000);
        assert!((info.actual_rpm - 3900.0).abs() < 0.5);
    }

    #[test]
    fn other_plates_fall_back_to_default() {
        let (_dir, mut script) = script_with(&[("adder.ini", ADDER_PLATE)]);
        let mut host = MemoryHost::new();
        let car = host.spawn(FakeVehicle::new(ADDER, "OTHER"));
        host.set_player_vehicle(Some(car));
        script.tick(&mut host, Instant::now());
        assert!(script.pool().player().active_config().unwrap().is_default());
        assert_eq!(host.drive_force_writes(), 0);
        assert!(script.player_rpm_info(&host).is_none());
    }

    #[test]
    fn save_then_reload_matches_model() {
        let (_dir, mut script) = script_with(&[("adder.ini", ADDER_PLATE)]);
        let mut host = MemoryHost::new();
        let mut vehicle = FakeVehicle::new(ADDER, "46EEK572");
        vehicle.rpm = 0.5;
        let car = host.spawn(vehicle);
        host.set_player_vehicle(Some(car));
        script.tick(&mut host, Instant::now());

        let path = script.save_active(&mut host, "Adder generic", SaveType::GenericModel).unwrap();
        assert!(path.is_file());

        let other = host.spawn(FakeVehicle::new(ADDER, "SECOND"));
        host.set_player_vehicle(Some(other));
        script.reload(&mut host);
        script.tick(&mut host, Instant::now());
        assert_eq!(script.pool().player().active_config().unwrap().name(), "Adder_generic");
    }

    #[test]
    fn save_without_vehicle_fails() {
        let (_dir, mut script) = script_with(&[]);
        let mut host = MemoryHost::new();
        assert!(script.save_active(&mut host, "nothing", SaveType::Specific).is_err());
        assert!(host.notifications().last().unwrap().contains("nothing"));
    }

    #[test]
    fn apply_preset_from_store() {
        let (_dir, mut script) = script_with(&[("adder.ini", ADDER_PLATE)]);
        let mut host = MemoryHost::new();
        let car = host.spawn(FakeVehicle::new(1, "X"));
        host.set_player_vehicle(Some(car));
        script.tick(&mut host, Instant::now());
        assert!(!script.apply_preset(&mut host, 7));
        assert!(script.apply_preset(&mut host, 1));
        let active = script.pool().player().active_config().unwrap();
        assert!(active.is_default());
        assert_eq!(active.data().idle_rpm, 0);
        assert!((active.data().multiplier_at(0.5) - 1.2).abs() < 1e-4);
    }

    #[test]
    fn npcs_and_recording_share_the_tick() {
        let (_dir, mut script) = script_with(&[("adder.ini", ADDER_PLATE)]);
        let mut host = MemoryHost::new();
        host.spawn(FakeVehicle::new(ADDER, "46EEK572"));
        host.spawn(FakeVehicle::new(ADDER, "OTHER"));
        let start = Instant::now();
        script.tick(&mut host, start);
        assert_eq!(script.pool().npcs().len(), 2);
        assert_eq!(script.active_npc_count(), 1);

        script.set_npc_enabled(false);
        script.tick(&mut host, start + Duration::from_millis(2000));
        assert!(script.pool().npcs().is_empty());

        script.recorder_mut().start(&mut host);
        script.tick(&mut host, start + Duration::from_millis(3000));
        assert_eq!(script.recorder().state(), LogState::Idle);
    }

    #[test]
    fn unknown_directory_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let script = TorqueScript::init(ModPaths::new(&dir.path().join("a").join("b"), "T"), ModelNameCache::new());
        assert!(script.store().default_preset().is_default());
        assert!(Path::new(&dir.path().join("a/b/T/Configs/Default.ini")).is_file());
    }
}
