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


use std::time::Instant;

use crate::host::{VehicleHandle, VehicleHost};
use crate::preset::{Preset, PresetStore};
use crate::settings::ScriptSettings;

/// What decides the vehicle a controller drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Whatever the player is sitting in, re-resolved every tick.
    Player,
    /// One NPC vehicle for the controller's whole life.
    Npc(VehicleHandle)
}

/// Keeps one vehicle's parameters in line with its active preset.
pub trait VehicleController {
    type Preset: Preset;

    fn new(binding: Binding) -> Self where Self: Sized;

    fn binding(&self) -> Binding;

    fn vehicle(&self) -> Option<VehicleHandle>;

    /// The controller's working copy of the matched preset, `None` while it has no usable vehicle.
    fn active_config(&self) -> Option<&Self::Preset>;

    /// Re-matches the bound vehicle against `store`. Clears the active preset when the vehicle is
    /// gone, dead or (with `require_player`) not occupied by the player.
    fn update_active_config(&mut self,
                            host: &mut dyn VehicleHost,
                            store: &PresetStore<Self::Preset>,
                            settings: &ScriptSettings,
                            require_player: bool);

    fn tick(&mut self,
            host: &mut dyn VehicleHost,
            store: &PresetStore<Self::Preset>,
            settings: &ScriptSettings,
            now: Instant);

    /// Repairs values the game overwrote. Returns how many corrections were written.
    fn periodic_check(&mut self, _host: &mut dyn VehicleHost, _settings: &ScriptSettings, _now: Instant) -> usize {
        0
    }

    /// Overwrites the active preset's data with `other`'s. False without an active preset.
    fn apply_config(&mut self, host: &mut dyn VehicleHost, other: &Self::Preset) -> bool;

    /// True when bound to anything other than the default preset.
    fn has_custom_config(&self) -> bool {
        self.active_config().map_or(false, |c| !c.is_default())
    }
}

/// Picks the preset for `vehicle`, or `None` if the vehicle can't take one right now.
pub fn match_vehicle<'a, P: Preset>(host: &dyn VehicleHost,
                                    vehicle: Option<VehicleHandle>,
                                    store: &'a PresetStore<P>,
                                    require_player: bool) -> Option<&'a P> {
    let vehicle = vehicle?;
    let usable = if require_player {
        host.is_player_in_vehicle(vehicle)
    } else {
        host.is_vehicle_alive(vehicle)
    };
    if !usable {
        return None;
    }
    Some(store.find_active(host.model_hash(vehicle), &host.plate_text(vehicle)))
}

/// Follows the player into a new vehicle. Returns true if the bound vehicle changed.
pub fn follow_player(host: &dyn VehicleHost, current: &mut Option<VehicleHandle>) -> bool {
    let player_vehicle = host.player_vehicle();
    if player_vehicle != *current {
        *current = player_vehicle;
        return true;
    }
    false
}

/// True when the controller's vehicle can still be driven this tick.
pub fn is_drivable(host: &dyn VehicleHost, binding: Binding, vehicle: Option<VehicleHandle>) -> bool {
    match (binding, vehicle) {
        (Binding::Player, Some(v)) => host.is_player_in_vehicle(v),
        (Binding::Npc(_), Some(v)) => host.is_vehicle_alive(v),
        (_, None) => false
    }
}
