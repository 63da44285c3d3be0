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

use std::fmt::{Display, Formatter};
use csv::Terminator;
use itertools::Itertools;

use crate::error::CurveError;

/// How a curve treats results computed from the bracketing segment.
///
/// Both policies locate the segment the same way, and a key outside the curve always uses the
/// nearest edge segment. They differ only in how the interpolated result is limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extrapolation {
    /// Clamp to the smaller and larger value of the segment used.
    Bounded,
    /// Only forbid negative results; overshoot past the segment is kept.
    FloorZero
}

/// Piecewise-linear mapping from a normalized key (usually the 0.0 - 1.0 RPM fraction) to a
/// multiplier. Always holds at least two points with strictly increasing keys.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledCurve {
    points: Vec<(f32, f32)>
}

impl ScaledCurve {
    pub fn new(points: Vec<(f32, f32)>) -> Result<ScaledCurve, CurveError> {
        if points.len() < 2 {
            return Err(CurveError::TooFewPoints(points.len()));
        }
        for (key, value) in points.iter() {
            if !key.is_finite() || !value.is_finite() {
                return Err(CurveError::Malformed {
                    line: format!("{}|{}", key, value),
                    reason: String::from("values must be finite")
                });
            }
        }
        if let Some(((previous, _), (next, _))) = points.iter().tuple_windows().find(|(a, b)| b.0 <= a.0) {
            return Err(CurveError::NotIncreasing { previous: *previous, next: *next });
        }
        Ok(ScaledCurve { points })
    }

    /// Two point curve from 0.0 to 1.0 that always evaluates to `value`.
    pub fn flat(value: f32) -> ScaledCurve {
        ScaledCurve { points: vec![(0.0, value), (1.0, value)] }
    }

    pub fn points(&self) -> &[(f32, f32)] {
        &self.points
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn is_flat(&self, value: f32) -> bool {
        self.points.iter().all(|(_, v)| *v == value)
    }

    pub fn evaluate(&self, key: f32, policy: Extrapolation) -> f32 {
        let last_segment = self.points.len() - 2;
        let lower_idx = self.points
            .partition_point(|(k, _)| *k <= key)
            .saturating_sub(1)
            .min(last_segment);
        let (lower_key, lower_val) = self.points[lower_idx];
        let (upper_key, upper_val) = self.points[lower_idx + 1];

        let value = lower_val + (key - lower_key) * (upper_val - lower_val) / (upper_key - lower_key);
        match policy {
            Extrapolation::Bounded => {
                value.clamp(lower_val.min(upper_val), lower_val.max(upper_val))
            }
            Extrapolation::FloorZero => value.max(0.0)
        }
    }

    /// Evaluates the curve at `steps + 1` evenly spaced keys from 0.0 to 1.0 inclusive.
    pub fn sample(&self, steps: usize, policy: Extrapolation) -> Vec<(f32, f32)> {
        let steps = steps.max(1);
        (0..=steps).map(|step| {
            let key = step as f32 / steps as f32;
            (key, self.evaluate(key, policy))
        }).collect()
    }

    /// Parses one `key|value` pair per line. Lines starting with `;` are ignored.
    pub fn from_text(text: &str) -> Result<ScaledCurve, CurveError> {
        let mut points = Vec::new();
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b'|')
            .terminator(Terminator::CRLF)
            .comment(Some(b';'))
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(text.as_bytes());
        for result in rdr.records() {
            let record = result.map_err(|e| CurveError::Malformed {
                line: String::new(),
                reason: e.to_string()
            })?;
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            let line = record.iter().join("|");
            if record.len() != 2 {
                return Err(CurveError::Malformed {
                    line,
                    reason: format!("expected 2 fields, found {}", record.len())
                });
            }
            let key = parse_curve_element(&record, 0, &line)?;
            let value = parse_curve_element(&record, 1, &line)?;
            points.push((key, value));
        }
        ScaledCurve::new(points)
    }

    pub fn to_text(&self) -> String {
        self.points.iter()
            .map(|(key, value)| format!("{:.3}|{:.3}", key, value))
            .join("\n")
    }
}

impl Display for ScaledCurve {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

fn parse_curve_element(record: &csv::StringRecord, index: usize, line: &str) -> Result<f32, CurveError> {
    let raw = record.get(index).unwrap_or_default();
    raw.parse::<f32>().map_err(|e| CurveError::Malformed {
        line: String::from(line),
        reason: format!("'{}' is not a number. {}", raw, e)
    })
}
