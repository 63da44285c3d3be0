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


use std::path::Path;
use tracing::{info, Level};
use tracing_appender::rolling::{Builder, Rotation};

/// Sends all tracing output to `file_name` in `directory`.
///
/// Returns false if the log file can't be created or a global subscriber was already installed,
/// e.g. when both plugins run in the same process.
pub fn init_logging(directory: &Path, file_name: &str, debug: bool) -> bool {
    let file_appender = match Builder::new()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Failed to init logging. Couldn't create {} in {}. {}", file_name, directory.display(), e.to_string());
            return false;
        }
    };
    let subscriber = tracing_subscriber::fmt()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_max_level(if debug { Level::DEBUG } else { Level::INFO })
        .compact()
        .finish();
    match tracing::subscriber::set_global_default(subscriber) {
        Ok(_) => {
            info!("Logging initialised");
            true
        }
        Err(e) => {
            eprintln!("Failed to init logging. {}", e.to_string());
            false
        }
    }
}
