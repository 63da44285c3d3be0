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

use std::{error, fmt, io, result};
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug)]
pub struct Error{
    kind: ErrorKind,
    details: String
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, details: String) -> Error {
        Error{ kind, details }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn details(&self) -> &str {
        &self.details
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.kind.as_str(), self.details)
    }
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::new(ErrorKind::IOError, format!("{}. {}", e.to_string(), e.kind().to_string()))
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::new(ErrorKind::IOError, e.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::new(ErrorKind::SettingsError, e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::new(ErrorKind::SettingsError, e.to_string())
    }
}

impl From<CurveError> for Error {
    fn from(e: CurveError) -> Self {
        Error::new(ErrorKind::InvalidCurve, e.to_string())
    }
}


#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ErrorKind {
    InvalidPreset,
    InvalidCurve,
    IniParseError,
    IOError,
    SettingsError,
    NoActiveConfig,
    NoVehicle,
    Uncategorized
}

impl ErrorKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidPreset => "invalid preset",
            ErrorKind::InvalidCurve => "invalid curve",
            ErrorKind::IniParseError => "ini parse error",
            ErrorKind::IOError => "io error",
            ErrorKind::SettingsError => "settings error",
            ErrorKind::NoActiveConfig => "no active config",
            ErrorKind::NoVehicle => "no vehicle",
            ErrorKind::Uncategorized => "uncategorized error"
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CurveError {
    #[error("curve needs at least 2 points, got {0}")]
    TooFewPoints(usize),
    #[error("curve keys must be strictly increasing ({previous} followed by {next})")]
    NotIncreasing {
        previous: f32,
        next: f32
    },
    #[error("malformed curve line '{line}'. {reason}")]
    Malformed {
        line: String,
        reason: String
    }
}
