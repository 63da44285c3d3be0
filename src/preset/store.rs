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


use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::ini_utils::Ini;
use crate::preset::{Identity, ModelNameCache, Preset, SaveType, DEFAULT_PRESET_NAME, PRESET_FILE_EXTENSION};

/// Presets loaded from one directory. Once loaded the first entry is always the `Default` preset.
#[derive(Debug)]
pub struct PresetStore<P: Preset> {
    directory: PathBuf,
    presets: Vec<P>,
    files: HashMap<String, PathBuf>,
    names: ModelNameCache,
    fallback: P
}

impl<P: Preset> PresetStore<P> {
    pub fn new(directory: PathBuf) -> PresetStore<P> {
        PresetStore {
            directory,
            presets: Vec::new(),
            files: HashMap::new(),
            names: ModelNameCache::new(),
            fallback: P::default_preset()
        }
    }

    pub fn with_name_cache(mut self, names: ModelNameCache) -> PresetStore<P> {
        self.names = names;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn presets(&self) -> &[P] {
        &self.presets
    }

    pub fn get(&self, index: usize) -> Option<&P> {
        self.presets.get(index)
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn name_cache(&self) -> &ModelNameCache {
        &self.names
    }

    /// Reloads every preset in the directory, returning how many were loaded.
    ///
    /// Files that fail to parse are logged and skipped. If no `Default` preset is found one is
    /// synthesized and written out so the next load picks it up.
    pub fn load_all(&mut self) -> usize {
        self.presets.clear();
        self.files.clear();

        if !self.directory.is_dir() {
            if let Err(e) = fs::create_dir_all(&self.directory) {
                error!("Couldn't create preset directory {}. {}", self.directory.display(), e);
            }
        }

        let preset_files = match utils::filesystem::get_filetypes_in_path(&self.directory, PRESET_FILE_EXTENSION) {
            Ok(files) => files,
            Err(e) => {
                error!("Couldn't read preset directory {}. {}", self.directory.display(), e);
                Vec::new()
            }
        };

        for path in preset_files {
            let name = match utils::filesystem::file_stem_string(&path) {
                Some(name) => name,
                None => continue
            };
            match load_preset::<P>(&path, name, &self.names) {
                Ok(preset) => {
                    debug!("Loaded preset {} from {}", preset.name(), path.display());
                    self.files.insert(preset.name().to_lowercase(), path);
                    if preset.is_default() && !self.has_default() {
                        self.presets.insert(0, preset);
                    } else {
                        self.presets.push(preset);
                    }
                }
                Err(e) => {
                    error!("{} skipped due to errors. {}", path.display(), e);
                }
            }
        }

        if !self.has_default() {
            warn!("No default preset found in {}. Creating one", self.directory.display());
            let default_preset = P::default_preset();
            let path = self.directory.join(format!("{}.{}", DEFAULT_PRESET_NAME, PRESET_FILE_EXTENSION));
            match write_preset(&default_preset, &path) {
                Ok(_) => {
                    self.files.insert(default_preset.name().to_lowercase(), path);
                }
                Err(e) => error!("Couldn't write {}. {}", path.display(), e)
            }
            self.presets.insert(0, default_preset);
        }

        info!("Loaded {} presets from {}", self.presets.len(), self.directory.display());
        self.presets.len()
    }

    /// Finds the preset a vehicle should use.
    ///
    /// A preset for the exact model and plate wins over one for the model only, which wins over
    /// `Default`. Within a tier the first preset in load order wins.
    pub fn find_active(&self, model_hash: u32, plate: &str) -> &P {
        if let Some(preset) = self.presets.iter().find(|p| p.identity().matches_plate(model_hash, plate)) {
            return preset;
        }
        if let Some(preset) = self.presets.iter().find(|p| p.identity().matches_model(model_hash)) {
            return preset;
        }
        self.default_preset()
    }

    pub fn default_preset(&self) -> &P {
        match self.presets.first() {
            Some(preset) if preset.is_default() => preset,
            _ => &self.fallback
        }
    }

    /// Saves a copy of `preset` under `name` with the identity fields selected by `save_type`.
    ///
    /// Saving under the name of a loaded preset overwrites it. Otherwise a new file is created,
    /// never replacing one already on disk. Returns the path written.
    pub fn save(&mut self,
                preset: &P,
                name: &str,
                identity: Identity,
                save_type: SaveType) -> Result<PathBuf> {
        fs::create_dir_all(&self.directory)?;
        let mut to_save = preset.clone();
        let description = identity.description.clone();
        let mut identity = Identity::for_save(identity.model_hash.unwrap_or_default(),
                                              &identity.model_name,
                                              &identity.plate,
                                              save_type);
        identity.description = description;
        to_save.set_identity(identity);

        let path = match self.files.get(&name.trim().to_lowercase()) {
            Some(existing) => existing.clone(),
            None => utils::filesystem::create_safe_filename_in_path(&self.directory, name, PRESET_FILE_EXTENSION)
        };
        let saved_name = utils::filesystem::file_stem_string(&path).unwrap_or_else(|| String::from(name));
        to_save.set_name(saved_name);
        write_preset(&to_save, &path)?;
        info!("Saved preset {} to {}", to_save.name(), path.display());

        self.files.insert(to_save.name().to_lowercase(), path.clone());
        match self.presets.iter_mut().find(|p| p.name().eq_ignore_ascii_case(to_save.name())) {
            Some(existing) => *existing = to_save,
            None => self.presets.push(to_save)
        }
        Ok(path)
    }

    fn has_default(&self) -> bool {
        self.presets.first().map_or(false, |p| p.is_default())
    }
}

fn load_preset<P: Preset>(path: &Path, name: String, names: &ModelNameCache) -> Result<P> {
    let ini = Ini::load_from_file(path)?;
    P::load(name, &ini, names)
}

fn write_preset<P: Preset>(preset: &P, path: &Path) -> Result<()> {
    preset.to_ini()?.write_to_file(path)?;
    Ok(())
}
