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


pub fn nm_to_lbft(torque_nm: f32) -> f32 {
    torque_nm * 0.737562
}

pub fn mps_to_kph(speed: f32) -> f32 {
    speed * 3.6
}

pub fn calculate_power_kw(rpm: f32, torque_nm: f32) -> f32 {
    (torque_nm * rpm * 2.0 * std::f32::consts::PI) / (60.0 * 1000.0)
}

pub fn calculate_power_hp(rpm: f32, torque_lbft: f32) -> f32 {
    (torque_lbft * rpm) / 5252.0
}
