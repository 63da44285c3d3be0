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

pub mod store;
pub mod torque;
pub mod gears;

pub use store::PresetStore;
pub use torque::{TorqueMapData, TorquePreset};
pub use gears::{GearData, GearPreset};

use std::collections::HashMap;
use std::fmt::Debug;

use crate::error::{Error, ErrorKind, Result};
use crate::ini_utils::{Ini, IniUpdater};

pub const DEFAULT_PRESET_NAME: &str = "Default";
pub const PRESET_FILE_EXTENSION: &str = "ini";
pub const ID_SECTION: &str = "ID";

/// Plate text that marks a preset as valid for every plate of its model.
pub const ANY_PLATE: &str = "any";

/// Which vehicles a preset loads itself onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadType {
    /// Model and plate must both match.
    Plate,
    /// Any vehicle of the model.
    Model,
    /// Never loaded automatically.
    None
}

/// Which identity fields get written when saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveType {
    /// Model + plate.
    Specific,
    /// Model only.
    GenericModel,
    /// Neither.
    GenericNone
}

/// Case and surrounding whitespace are ignored.
pub fn plates_match(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Hash to display name lookup for models the game can't name itself, e.g. add-on vehicles.
#[derive(Debug, Clone, Default)]
pub struct ModelNameCache {
    names: HashMap<u32, String>
}

impl ModelNameCache {
    pub fn new() -> ModelNameCache {
        ModelNameCache::default()
    }

    pub fn insert(&mut self, model_name: &str) -> u32 {
        let hash = utils::hash::joaat(model_name);
        self.names.insert(hash, String::from(model_name));
        hash
    }

    pub fn get(&self, model_hash: u32) -> Option<&str> {
        self.names.get(&model_hash).map(|s| s.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Identity {
    pub model_hash: Option<u32>,
    pub model_name: String,
    pub plate: String,
    pub description: String
}

impl Identity {
    const MODEL_HASH: &'static str = "ModelHash";
    const MODEL_NAME: &'static str = "ModelName";
    const PLATE: &'static str = "Plate";
    const DESCRIPTION: &'static str = "Description";

    /// Builds the identity written for `save_type`.
    pub fn for_save(model_hash: u32, model_name: &str, plate: &str, save_type: SaveType) -> Identity {
        match save_type {
            SaveType::Specific => Identity {
                model_hash: Some(model_hash),
                model_name: String::from(model_name),
                plate: String::from(plate.trim()),
                description: String::new()
            },
            SaveType::GenericModel => Identity {
                model_hash: Some(model_hash),
                model_name: String::from(model_name),
                plate: String::new(),
                description: String::new()
            },
            SaveType::GenericNone => Identity::default()
        }
    }

    pub fn load_type(&self) -> LoadType {
        match self.model_hash {
            None => LoadType::None,
            Some(_) => {
                let plate = self.plate.trim();
                if plate.is_empty() || plate.eq_ignore_ascii_case(ANY_PLATE) {
                    LoadType::Model
                } else {
                    LoadType::Plate
                }
            }
        }
    }

    pub fn matches_plate(&self, model_hash: u32, plate: &str) -> bool {
        self.load_type() == LoadType::Plate
            && self.model_hash == Some(model_hash)
            && plates_match(&self.plate, plate)
    }

    pub fn matches_model(&self, model_hash: u32) -> bool {
        self.load_type() == LoadType::Model && self.model_hash == Some(model_hash)
    }

    pub fn load_from_ini(ini: &Ini, names: &ModelNameCache) -> Result<Identity> {
        let hash_str = ini.get_value(ID_SECTION, Identity::MODEL_HASH).unwrap_or_default();
        let name_str = ini.get_value(ID_SECTION, Identity::MODEL_NAME).unwrap_or_default();
        let hash_str = hash_str.trim();
        let name_str = name_str.trim();

        let (model_hash, model_name) = if hash_str.is_empty() && name_str.is_empty() {
            (None, String::new())
        } else if hash_str.is_empty() {
            (Some(utils::hash::joaat(name_str)), String::from(name_str))
        } else {
            let hash = parse_model_hash(hash_str)?;
            let model_name = if !name_str.is_empty() {
                String::from(name_str)
            } else {
                names.get(hash).map(String::from).unwrap_or_default()
            };
            (Some(hash), model_name)
        };

        Ok(Identity {
            model_hash,
            model_name,
            plate: ini.get_value(ID_SECTION, Identity::PLATE).unwrap_or_default().trim().to_string(),
            description: ini.get_value(ID_SECTION, Identity::DESCRIPTION).unwrap_or_default()
        })
    }
}

impl IniUpdater for Identity {
    fn update_ini(&self, ini_data: &mut Ini) -> Result<()> {
        for key in [Identity::MODEL_HASH, Identity::MODEL_NAME, Identity::PLATE] {
            ini_data.remove_value(ID_SECTION, key);
        }
        if let Some(hash) = self.model_hash {
            ini_data.set_value(ID_SECTION, Identity::MODEL_HASH, format!("0x{:08X}", hash));
            if !self.model_name.is_empty() {
                ini_data.set_value(ID_SECTION, Identity::MODEL_NAME, self.model_name.clone());
            }
            if !self.plate.is_empty() {
                ini_data.set_value(ID_SECTION, Identity::PLATE, self.plate.clone());
            }
        }
        if !self.description.is_empty() {
            ini_data.set_value(ID_SECTION, Identity::DESCRIPTION, self.description.clone());
        }
        Ok(())
    }
}

fn parse_model_hash(hash_str: &str) -> Result<u32> {
    let digits = hash_str.strip_prefix("0x")
        .or_else(|| hash_str.strip_prefix("0X"))
        .unwrap_or(hash_str);
    u32::from_str_radix(digits, 16).map_err(|e| {
        Error::new(ErrorKind::InvalidPreset, format!("Invalid model hash '{}'. {}", hash_str, e))
    })
}

/// A configuration record: identity plus the numeric data a controller applies.
pub trait Preset: Clone + Debug {
    fn name(&self) -> &str;
    fn set_name(&mut self, name: String);
    fn identity(&self) -> &Identity;
    fn set_identity(&mut self, identity: Identity);

    fn load(name: String, ini: &Ini, names: &ModelNameCache) -> Result<Self> where Self: Sized;
    fn to_ini(&self) -> Result<Ini>;

    /// Record synthesized when no `Default` preset exists on disk.
    fn default_preset() -> Self where Self: Sized;

    /// Copies the numeric data of `other` onto this record, leaving its identity untouched.
    fn apply_data_from(&mut self, other: &Self);

    fn is_default(&self) -> bool {
        self.name().eq_ignore_ascii_case(DEFAULT_PRESET_NAME)
    }
}
