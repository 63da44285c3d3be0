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
use crate::gears::controller::GearController;
use crate::host::VehicleHost;
use crate::paths::ModPaths;
use crate::pool::ControllerPool;
use crate::preset::{GearPreset, Identity, ModelNameCache, PresetStore, SaveType};
use crate::settings;
use crate::settings::ScriptSettings;

/// Everything the gear ratio plugin keeps between ticks.
#[derive(Debug)]
pub struct GearScript {
    paths: ModPaths,
    settings: ScriptSettings,
    store: PresetStore<GearPreset>,
    pool: ControllerPool<GearController>
}

impl GearScript {
    pub fn init(paths: ModPaths, names: ModelNameCache) -> GearScript {
        if let Err(e) = fs::create_dir_all(paths.root()) {
            error!("Couldn't create {}. {}", paths.root().display(), e);
        }
        let settings = ScriptSettings::load(&paths.settings_file());
        let mut store = PresetStore::new(paths.presets_dir()).with_name_cache(names);
        store.load_all();
        info!("{} initialised", paths.name());
        GearScript { paths, settings, store, pool: ControllerPool::new() }
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

    pub fn store(&self) -> &PresetStore<GearPreset> {
        &self.store
    }

    pub fn pool(&self) -> &ControllerPool<GearController> {
        &self.pool
    }

    /// The player's controller, for gearbox edits.
    pub fn player_mut(&mut self) -> &mut GearController {
        self.pool.player_mut()
    }

    pub fn reload(&mut self, host: &mut dyn VehicleHost) {
        self.settings = ScriptSettings::load(&self.paths.settings_file());
        let count = self.store.load_all();
        self.pool.update_active_configs(host, &self.store, &self.settings);
        settings::notify(host, &self.settings, &format!("Loaded {} gear presets", count), false);
    }

    /// Player controller then NPCs. Menus run between this and [GearScript::reapply_check].
    pub fn tick_controllers(&mut self, host: &mut dyn VehicleHost, now: Instant) {
        self.pool.tick(host, &self.store, &self.settings, now);
    }

    /// Writes back any gearbox values the game changed since the last check.
    pub fn reapply_check(&mut self, host: &mut dyn VehicleHost, now: Instant) -> usize {
        let corrections = self.pool.periodic_check(host, &self.settings, now);
        if corrections > 0 {
            info!("Reapplied gearing on {} vehicles", corrections);
        }
        corrections
    }

    pub fn tick(&mut self, host: &mut dyn VehicleHost, now: Instant) -> usize {
        self.tick_controllers(host, now);
        self.reapply_check(host, now)
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

    pub fn apply_preset(&mut self, host: &mut dyn VehicleHost, index: usize) -> bool {
        let preset = match self.store.get(index) {
            Some(preset) => preset,
            None => return false
        };
        let applied = self.pool.player_mut().apply_config(host, preset);
        if applied {
            settings::notify(host, &self.settings, &format!("Applied {}", preset.description()), false);
        } else {
            settings::notify(host, &self.settings, "No vehicle to apply the gearing to", true);
        }
        applied
    }

    /// Saves the player's current gearbox. An empty description is replaced with a summary of
    /// the gearbox.
    pub fn save_current(&mut self,
                        host: &mut dyn VehicleHost,
                        name: &str,
                        description: &str,
                        save_type: SaveType) -> Result<PathBuf> {
        let result = self.try_save_current(host, name, description, save_type);
        match &result {
            Ok(path) => settings::notify(host, &self.settings, &format!("Saved {}", path.display()), false),
            Err(e) => {
                error!("Failed to save gear preset {}. {}", name, e);
                settings::notify(host, &self.settings, &format!("Failed to save {}. {}", name, e), true)
            }
        }
        result
    }

    fn try_save_current(&mut self,
                        host: &dyn VehicleHost,
                        name: &str,
                        description: &str,
                        save_type: SaveType) -> Result<PathBuf> {
        let player = self.pool.player();
        let vehicle = player.vehicle()
            .filter(|v| host.is_vehicle_alive(*v))
            .ok_or_else(|| Error::new(ErrorKind::NoVehicle, String::from("player has no vehicle")))?;
        let preset = player.active_config()
            .cloned()
            .ok_or_else(|| Error::new(ErrorKind::NoActiveConfig, String::from("player vehicle has no gear preset")))?;
        preset.data().validate()?;

        let model_hash = host.model_hash(vehicle);
        let model_name = self.store.name_cache().get(model_hash)
            .map(String::from)
            .unwrap_or_else(|| host.display_name(model_hash));
        let description = match description.trim() {
            "" => GearPreset::default_description(&model_name, preset.data()),
            text => String::from(text)
        };
        let identity = Identity {
            model_hash: Some(model_hash),
            model_name,
            plate: host.plate_text(vehicle),
            description
        };
        let name = if name.trim().is_empty() { identity.description.clone() } else { String::from(name) };
        self.store.save(&preset, &name, identity, save_type)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::{Duration, Instant};

    use crate::controller::VehicleController;
    use crate::gears::script::GearScript;
    use crate::host::memory::{FakeVehicle, MemoryHost};
    use crate::paths::ModPaths;
    use crate::preset::{ModelNameCache, Preset, SaveType};

    const ADDER: u32 = 0xB779A091;

    const SHORT_BOX: &str = "\
[ID]
ModelHash = 0xB779A091
Description = Short box

[Gears]
TopGear = 5
DriveMaxVel = 45.0
Gear0 = -3.0
Gear1 = 3.2
Gear2 = 2.1
Gear3 = 1.5
Gear4 = 1.1
Gear5 = 0.9
";

    fn script_with(files: &[(&str, &str)]) -> (tempfile::TempDir, GearScript) {
        let dir = tempfile::tempdir().unwrap();
        let paths = ModPaths::new(dir.path(), "CustomGearRatios");
        fs::create_dir_all(paths.presets_dir()).unwrap();
        for (name, contents) in files {
            fs::write(paths.presets_dir().join(name), contents).unwrap();
        }
        (dir, GearScript::init(paths, ModelNameCache::new()))
    }

    #[test]
    fn workshop_reset_is_undone() {
        let (_dir, mut script) = script_with(&[("short.ini", SHORT_BOX)]);
        let mut host = MemoryHost::new();
        let car = host.spawn(FakeVehicle::new(ADDER, "PLATE"));
        host.set_player_vehicle(Some(car));
        let start = Instant::now();

        assert_eq!(script.tick(&mut host, start), 0);
        assert_eq!(host.vehicle(car).unwrap().top_gear, 5);

        host.vehicle_mut(car).unwrap().gear_ratios[5] = 0.7;
        assert_eq!(script.tick(&mut host, start + Duration::from_millis(1000)), 1);
        assert!((host.vehicle(car).unwrap().gear_ratios[5] - 0.9).abs() < 1e-6);
        host.reset_write_counters();
        assert_eq!(script.tick(&mut host, start + Duration::from_millis(2000)), 0);
        assert_eq!(host.gearbox_writes(), 0);
    }

    #[test]
    fn npc_gearboxes_follow_presets() {
        let (_dir, mut script) = script_with(&[("short.ini", SHORT_BOX)]);
        let mut host = MemoryHost::new();
        let npc = host.spawn(FakeVehicle::new(ADDER, "NPC"));
        let stock = host.spawn(FakeVehicle::new(7, "NPC"));
        script.tick(&mut host, Instant::now());
        assert_eq!(script.active_npc_count(), 1);
        assert_eq!(host.vehicle(npc).unwrap().top_gear, 5);
        assert_eq!(host.vehicle(stock).unwrap().top_gear, 6);
    }

    #[test]
    fn save_with_default_description() {
        let (_dir, mut script) = script_with(&[]);
        let mut host = MemoryHost::new();
        host.set_display_name(ADDER, "Adder");
        let car = host.spawn(FakeVehicle::new(ADDER, "PLATE"));
        host.set_player_vehicle(Some(car));
        script.tick(&mut host, Instant::now());
        assert!(script.player_mut().set_top_gear(&mut host, 5));

        let path = script.save_current(&mut host, "", "", SaveType::Specific).unwrap();
        assert_eq!(path.file_name().unwrap().to_string_lossy(), "Adder_-_5_gears_-_225_kph.ini");
        let saved = script.store().presets().iter().find(|p| p.name() == "Adder_-_5_gears_-_225_kph").unwrap();
        assert_eq!(saved.description(), "Adder - 5 gears - 225 kph");
        assert_eq!(saved.identity().plate, "PLATE");
    }

    #[test]
    fn apply_stored_gearing() {
        let (_dir, mut script) = script_with(&[("short.ini", SHORT_BOX)]);
        let mut host = MemoryHost::new();
        let car = host.spawn(FakeVehicle::new(99, "PLATE"));
        host.set_player_vehicle(Some(car));
        script.tick(&mut host, Instant::now());
        assert!(script.pool().player().active_config().unwrap().is_default());

        assert!(script.apply_preset(&mut host, 1));
        assert_eq!(host.vehicle(car).unwrap().top_gear, 5);
        assert_eq!(host.notifications().last().unwrap(), "Applied Short box");
    }
}
