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
use tracing::debug;

use crate::controller::{Binding, VehicleController};
use crate::host::{VehicleHandle, VehicleHost};
use crate::preset::PresetStore;
use crate::settings::ScriptSettings;

/// The player's controller plus one controller per NPC vehicle with a running engine.
#[derive(Debug)]
pub struct ControllerPool<C: VehicleController> {
    player: C,
    npcs: Vec<C>,
    last_scan: Option<Instant>
}

impl<C: VehicleController> ControllerPool<C> {
    pub fn new() -> ControllerPool<C> {
        ControllerPool { player: C::new(Binding::Player), npcs: Vec::new(), last_scan: None }
    }

    pub fn player(&self) -> &C {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut C {
        &mut self.player
    }

    pub fn npcs(&self) -> &[C] {
        &self.npcs
    }

    /// NPC controllers bound to a preset other than `Default`.
    pub fn active_npc_count(&self) -> usize {
        self.npcs.iter().filter(|c| c.has_custom_config()).count()
    }

    pub fn clear_npcs(&mut self) {
        if !self.npcs.is_empty() {
            debug!("Dropping {} NPC controllers", self.npcs.len());
        }
        self.npcs.clear();
        self.last_scan = None;
    }

    pub fn tick(&mut self,
                host: &mut dyn VehicleHost,
                store: &PresetStore<C::Preset>,
                settings: &ScriptSettings,
                now: Instant) {
        self.player.tick(host, store, settings, now);
        if settings.main.enable_npc {
            self.update_npcs(host, store, settings, now);
        } else if !self.npcs.is_empty() {
            self.clear_npcs();
        }
    }

    /// Picks up new NPC vehicles (at most once per scan interval) and ticks or drops the
    /// tracked ones.
    pub fn update_npcs(&mut self,
                       host: &mut dyn VehicleHost,
                       store: &PresetStore<C::Preset>,
                       settings: &ScriptSettings,
                       now: Instant) {
        let player_vehicle = self.player.vehicle();
        let interval = Duration::from_millis(settings.main.npc_scan_interval_ms);
        if self.last_scan.map_or(true, |t| now.saturating_duration_since(t) >= interval) {
            self.last_scan = Some(now);
            self.scan_vehicles(host, store, settings, player_vehicle);
        }

        let mut to_remove = Vec::new();
        for (idx, npc) in self.npcs.iter_mut().enumerate() {
            match npc.vehicle() {
                Some(vehicle) if host.is_vehicle_alive(vehicle) && Some(vehicle) != player_vehicle => {
                    npc.tick(host, store, settings, now);
                }
                _ => to_remove.push(idx)
            }
        }
        for idx in to_remove.into_iter().rev() {
            let removed = self.npcs.remove(idx);
            debug!("Dropped NPC controller for {:?}", removed.vehicle());
        }
    }

    /// Runs every controller's repair check.
    pub fn periodic_check(&mut self, host: &mut dyn VehicleHost, settings: &ScriptSettings, now: Instant) -> usize {
        let mut corrections = self.player.periodic_check(host, settings, now);
        for npc in self.npcs.iter_mut() {
            corrections += npc.periodic_check(host, settings, now);
        }
        corrections
    }

    /// Re-matches every controller, e.g. after presets were reloaded.
    pub fn update_active_configs(&mut self,
                                 host: &mut dyn VehicleHost,
                                 store: &PresetStore<C::Preset>,
                                 settings: &ScriptSettings) {
        self.player.update_active_config(host, store, settings, true);
        for npc in self.npcs.iter_mut() {
            npc.update_active_config(host, store, settings, false);
        }
    }

    fn scan_vehicles(&mut self,
                     host: &mut dyn VehicleHost,
                     store: &PresetStore<C::Preset>,
                     settings: &ScriptSettings,
                     player_vehicle: Option<VehicleHandle>) {
        for vehicle in host.all_vehicles() {
            if Some(vehicle) == player_vehicle
                || !host.is_vehicle_alive(vehicle)
                || !host.is_engine_running(vehicle)
                || self.npcs.iter().any(|c| c.vehicle() == Some(vehicle)) {
                continue;
            }
            let mut npc = C::new(Binding::Npc(vehicle));
            npc.update_active_config(host, store, settings, false);
            debug!("Tracking NPC {}", vehicle);
            self.npcs.push(npc);
        }
    }
}

impl<C: VehicleController> Default for ControllerPool<C> {
    fn default() -> Self {
        ControllerPool::new()
    }
}
