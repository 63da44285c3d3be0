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

use std::{fs, io};
use std::path::{Path, PathBuf};

/// Returns every file in `path` whose extension matches `file_type`, ignoring case.
///
/// The returned paths are sorted by file name so that callers see the same order regardless of
/// how the underlying filesystem iterates its directory entries.
pub fn get_filetypes_in_path(path: &Path, file_type: &str) -> io::Result<Vec<PathBuf>> {
    let dir_entries = fs::read_dir(path)?;
    let mut files: Vec<PathBuf> = dir_entries.filter_map(|e| {
        match e {
            Ok(dir_entry) => {
                let entry_path = dir_entry.path();
                if !entry_path.is_file() {
                    return None;
                }
                match entry_path.extension() {
                    Some(ext) => {
                        if !ext.to_string_lossy().eq_ignore_ascii_case(file_type) {
                            return None
                        }
                    },
                    None => return None
                }
                Some(entry_path)
            },
            _ => None
        }
    }).collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

pub fn file_stem_string(path: &Path) -> Option<String> {
    Some(path.file_stem()?.to_string_lossy().into_owned())
}

/// Takes a name and turns it into a safe filename in the provided path. The filename
/// will be "safe" in the sense that the returned filename will be free of any characters that
/// would be illegal to use in a filesystem path and also unique so as not to
/// override anything else in the provided path. Additionally, any spaces in the filename will
/// be replaced with underscores.
///
/// To provide uniqueness a two digit suffix will be appended to the returned filename if the name
/// would clash with anything else in the provided path. i.e. if you have a file called test.ini
/// present in the path then the next filename returned would be test_00.ini
///
pub fn create_safe_filename_in_path(path: &Path, name: &str, extension: &str) -> PathBuf {
    let mut sanitized_name = sanitize_filename::sanitize(name.trim());
    sanitized_name = sanitized_name.replace(" ", "_");
    if sanitized_name.is_empty() {
        sanitized_name = String::from("unnamed");
    }
    let mut file_path = path.join(format!("{}.{}", sanitized_name, extension));
    let mut extra_num = 0;
    while file_path.exists() {
        file_path = path.join(format!("{}_{:02}.{}", sanitized_name, extra_num, extension));
        extra_num += 1;
    }
    file_path
}

#[cfg(test)]
mod tests {
    use std::fs;
    use crate::filesystem::{create_safe_filename_in_path, get_filetypes_in_path};

    #[test]
    fn filetypes_are_filtered_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.ini"), "").unwrap();
        fs::write(dir.path().join("a.INI"), "").unwrap();
        fs::write(dir.path().join("c.xml"), "").unwrap();
        fs::create_dir(dir.path().join("d.ini")).unwrap();

        let names: Vec<String> = get_filetypes_in_path(dir.path(), "ini").unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.INI".to_string(), "b.ini".to_string()]);
    }

    #[test]
    fn safe_filename_is_unique() {
        let dir = tempfile::tempdir().unwrap();
        let first = create_safe_filename_in_path(dir.path(), "My Car: fast", "ini");
        assert_eq!(first.file_name().unwrap().to_string_lossy(), "My_Car_fast.ini");
        fs::write(&first, "").unwrap();
        let second = create_safe_filename_in_path(dir.path(), "My Car: fast", "ini");
        assert_eq!(second.file_name().unwrap().to_string_lossy(), "My_Car_fast_00.ini");
    }
}
