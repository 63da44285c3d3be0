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


//! Records a full throttle pull through the rev range to a CSV file.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use utils::numeric::average;

use crate::error::Result;
use crate::host::{VehicleHandle, VehicleHost};
use crate::preset::TorquePreset;
use crate::torque::data::get_torque_data;
use crate::torque::data::TorqueData;
use crate::preset::torque::IDLE_NORMALIZED_RPM;

/// Recording starts once RPM has settled at or below this.
const START_RPM_THRESHOLD: f32 = 0.21;
/// Fraction of idle speed the wheels must exceed before recording starts.
const START_SPEED_FRACTION: f32 = 0.75;

pub const CSV_HEADER: [&str; 7] = [
    "NormalizedRPM", "RealRPM", "PowerkW", "PowerHP", "TorqueNm", "TorqueLbFt", "TorqueMapNm"
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogState {
    Idle,
    Waiting,
    Recording,
    Finished
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogEntry {
    pub normalized_rpm: f32,
    pub real_rpm: Option<f32>,
    pub power_kw: Option<f32>,
    pub power_hp: Option<f32>,
    pub torque_nm: f32,
    pub torque_lbft: f32,
    pub torque_map_nm: f32
}

impl From<TorqueData> for LogEntry {
    fn from(data: TorqueData) -> Self {
        LogEntry {
            normalized_rpm: data.normalized_rpm,
            real_rpm: data.rpm_data.map(|d| d.real_rpm),
            power_kw: data.rpm_data.map(|d| d.power_kw),
            power_hp: data.rpm_data.map(|d| d.power_hp),
            torque_nm: data.total_force_nm,
            torque_lbft: data.total_force_lbft,
            torque_map_nm: data.raw_map_force_nm
        }
    }
}

impl LogEntry {
    fn to_record(&self) -> [String; 7] {
        let optional = |v: Option<f32>| format!("{:.3}", v.unwrap_or(0.0));
        [
            format!("{:.3}", self.normalized_rpm),
            optional(self.real_rpm),
            optional(self.power_kw),
            optional(self.power_hp),
            format!("{:.3}", self.torque_nm),
            format!("{:.3}", self.torque_lbft),
            format!("{:.3}", self.torque_map_nm)
        ]
    }
}

#[derive(Debug)]
pub struct PerformanceLog {
    state: LogState,
    entries: Vec<LogEntry>,
    output_dir: PathBuf
}

impl PerformanceLog {
    pub fn new(output_dir: PathBuf) -> PerformanceLog {
        PerformanceLog { state: LogState::Idle, entries: Vec::new(), output_dir }
    }

    pub fn state(&self) -> LogState {
        self.state
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn start(&mut self, host: &mut dyn VehicleHost) {
        self.entries.clear();
        self.state = LogState::Waiting;
        host.notify("Performance log: waiting for a full throttle run from idle");
    }

    pub fn cancel(&mut self, host: &mut dyn VehicleHost) {
        if self.state != LogState::Idle {
            host.notify("Performance log cancelled");
        }
        self.entries.clear();
        self.state = LogState::Idle;
    }

    /// Advances the state machine by one tick. Returns the written file once a run is saved.
    pub fn update(&mut self,
                  host: &mut dyn VehicleHost,
                  vehicle: Option<VehicleHandle>,
                  preset: Option<&TorquePreset>) -> Option<PathBuf> {
        if self.state == LogState::Idle {
            return None;
        }
        let vehicle = match vehicle.filter(|v| host.is_vehicle_alive(*v)) {
            Some(vehicle) => vehicle,
            None => {
                self.cancel(host);
                return None;
            }
        };
        match self.state {
            LogState::Idle => None,
            LogState::Waiting => {
                if PerformanceLog::ready_to_record(host, vehicle) {
                    info!("Performance log recording {}", vehicle);
                    self.state = LogState::Recording;
                }
                None
            }
            LogState::Recording => {
                match preset {
                    Some(preset) => self.entries.push(LogEntry::from(get_torque_data(host, vehicle, preset))),
                    None => {
                        self.cancel(host);
                        return None;
                    }
                }
                if host.current_rpm(vehicle) >= 1.0 || host.throttle(vehicle) <= 0.0 {
                    self.state = LogState::Finished;
                }
                None
            }
            LogState::Finished => {
                let model_name = host.display_name(host.model_hash(vehicle));
                let result = self.write(&model_name);
                self.entries.clear();
                self.state = LogState::Idle;
                match result {
                    Ok(path) => {
                        host.notify(&format!("Performance log saved to {}", path.display()));
                        Some(path)
                    }
                    Err(e) => {
                        error!("Failed to write performance log. {}", e);
                        host.notify(&format!("Performance log failed to save. {}", e));
                        None
                    }
                }
            }
        }
    }

    fn ready_to_record(host: &dyn VehicleHost, vehicle: VehicleHandle) -> bool {
        let gear = host.current_gear(vehicle) as usize;
        let idle_speed = match host.gear_ratios(vehicle).get(gear) {
            Some(ratio) if *ratio != 0.0 => IDLE_NORMALIZED_RPM * (host.drive_max_flat_vel(vehicle) / ratio),
            _ => return false
        };
        host.current_rpm(vehicle) <= START_RPM_THRESHOLD
            && host.throttle(vehicle) >= 1.0
            && average(&host.wheel_speeds(vehicle)) > START_SPEED_FRACTION * idle_speed
    }

    fn write(&self, model_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let path = utils::filesystem::create_safe_filename_in_path(&self.output_dir,
                                                                    &format!("{}-{}", timestamp, model_name),
                                                                    "csv");
        write_entries(&path, &self.entries)?;
        info!("Wrote {} performance log entries to {}", self.entries.len(), path.display());
        Ok(path)
    }
}

fn write_entries(path: &Path, entries: &[LogEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(CSV_HEADER)?;
    for entry in entries {
        writer.write_record(entry.to_record())?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::curve::ScaledCurve;
    use crate::host::memory::{FakeVehicle, MemoryHost};
    use crate::host::VehicleHandle;
    use crate::preset::{Identity, TorqueMapData, TorquePreset};
    use crate::recorder::{LogState, PerformanceLog, CSV_HEADER};

    fn preset() -> TorquePreset {
        let data = TorqueMapData {
            idle_rpm: 800,
            rev_limit_rpm: 7000,
            redline_rpm: None,
            torque_mult_map: ScaledCurve::flat(1.0)
        };
        TorquePreset::new(String::from("test"), Identity::default(), data)
    }

    fn launch_ready(host: &mut MemoryHost) -> VehicleHandle {
        let mut vehicle = FakeVehicle::new(1, "P");
        vehicle.rpm = 0.2;
        vehicle.throttle = 1.0;
        vehicle.wheel_speeds = vec![3.0; 4];
        vehicle.wheel_power = vec![0.1; 4];
        host.set_display_name(1, "Adder");
        host.spawn(vehicle)
    }

    #[test]
    fn full_run_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = MemoryHost::new();
        let car = launch_ready(&mut host);
        let preset = preset();
        let mut log = PerformanceLog::new(dir.path().join("Recordings"));

        log.start(&mut host);
        assert_eq!(log.state(), LogState::Waiting);
        assert!(log.update(&mut host, Some(car), Some(&preset)).is_none());
        assert_eq!(log.state(), LogState::Recording);

        for rpm in [0.3, 0.5, 0.7, 0.9, 1.0] {
            host.vehicle_mut(car).unwrap().rpm = rpm;
            assert!(log.update(&mut host, Some(car), Some(&preset)).is_none());
        }
        assert_eq!(log.state(), LogState::Finished);
        assert_eq!(log.entries().len(), 5);

        let path = log.update(&mut host, Some(car), Some(&preset)).unwrap();
        assert_eq!(log.state(), LogState::Idle);
        assert!(log.entries().is_empty());
        assert!(path.file_name().unwrap().to_string_lossy().ends_with("-Adder.csv"));

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], CSV_HEADER.join(","));
        assert!(lines[1].starts_with("0.300,1575.000,"));
    }

    #[test]
    fn unknown_rpm_figures_are_written_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = MemoryHost::new();
        let car = launch_ready(&mut host);
        let preset = TorquePreset::new(String::from("bare"), Identity::default(), TorqueMapData::default());
        let mut log = PerformanceLog::new(dir.path().to_path_buf());

        log.start(&mut host);
        log.update(&mut host, Some(car), Some(&preset));
        host.vehicle_mut(car).unwrap().rpm = 1.0;
        log.update(&mut host, Some(car), Some(&preset));
        let path = log.update(&mut host, Some(car), Some(&preset)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let row: Vec<&str> = contents.lines().nth(1).unwrap().split(',').collect();
        assert_eq!(row.len(), 7);
        assert_eq!(&row[..4], &["1.000", "0.000", "0.000", "0.000"]);
    }

    #[test]
    fn waits_for_launch_conditions() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = MemoryHost::new();
        let car = launch_ready(&mut host);
        host.vehicle_mut(car).unwrap().wheel_speeds = vec![1.0; 4];
        let mut log = PerformanceLog::new(dir.path().to_path_buf());

        log.start(&mut host);
        log.update(&mut host, Some(car), Some(&preset()));
        assert_eq!(log.state(), LogState::Waiting);

        host.vehicle_mut(car).unwrap().wheel_speeds = vec![3.0; 4];
        host.vehicle_mut(car).unwrap().throttle = 0.5;
        log.update(&mut host, Some(car), Some(&preset()));
        assert_eq!(log.state(), LogState::Waiting);
    }

    #[test]
    fn lifting_off_finishes_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = MemoryHost::new();
        let car = launch_ready(&mut host);
        let mut log = PerformanceLog::new(dir.path().to_path_buf());
        log.start(&mut host);
        log.update(&mut host, Some(car), Some(&preset()));

        host.vehicle_mut(car).unwrap().rpm = 0.4;
        host.vehicle_mut(car).unwrap().throttle = 0.0;
        log.update(&mut host, Some(car), Some(&preset()));
        assert_eq!(log.state(), LogState::Finished);
        assert_eq!(log.entries().len(), 1);
    }

    #[test]
    fn cancel_discards_samples() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = MemoryHost::new();
        let car = launch_ready(&mut host);
        let mut log = PerformanceLog::new(dir.path().to_path_buf());
        log.start(&mut host);
        log.update(&mut host, Some(car), Some(&preset()));
        host.vehicle_mut(car).unwrap().rpm = 0.5;
        log.update(&mut host, Some(car), Some(&preset()));
        assert_eq!(log.entries().len(), 1);

        log.cancel(&mut host);
        assert_eq!(log.state(), LogState::Idle);
        assert!(log.entries().is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        fs::write(&blocker, "").unwrap();
        let mut host = MemoryHost::new();
        let car = launch_ready(&mut host);
        let mut log = PerformanceLog::new(blocker.join("Recordings"));
        log.start(&mut host);
        log.update(&mut host, Some(car), Some(&preset()));
        host.vehicle_mut(car).unwrap().rpm = 1.0;
        log.update(&mut host, Some(car), Some(&preset()));

        assert!(log.update(&mut host, Some(car), Some(&preset())).is_none());
        assert_eq!(log.state(), LogState::Idle);
        assert!(host.notifications().last().unwrap().contains("failed"));
    }

    #[test]
    fn losing_the_vehicle_cancels() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = MemoryHost::new();
        let car = launch_ready(&mut host);
        let mut log = PerformanceLog::new(dir.path().to_path_buf());
        log.start(&mut host);
        host.despawn(car);
        log.update(&mut host, Some(car), Some(&preset()));
        assert_eq!(log.state(), LogState::Idle);
    }
}
