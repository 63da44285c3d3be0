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

use std::{error, fs, io};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::path::Path;

use indexmap::IndexMap;
use crate::error::{Error, ErrorKind};

/// Opens a multi-line value. Everything up to a line equal to the tag that follows is the value.
pub const MULTILINE_MARKER: &str = "<<<";

pub trait IniUpdater {
    fn update_ini(&self, ini_data: &mut Ini) -> crate::error::Result<()>;
}

pub trait FromIni {
    fn load_from_ini(ini_data: &Ini) -> crate::error::Result<Self> where Self: Sized;
}

#[derive(Debug)]
pub struct FieldTypeError {
    section_name: String,
    field_name: String,
    expected_type: String
}

impl FieldTypeError {
    pub fn new(section_name: &str, field_name: &str, expected_type: &str) -> FieldTypeError {
        FieldTypeError {
            section_name: String::from(section_name),
            field_name: String::from(field_name),
            expected_type: String::from(expected_type)
        }
    }
}

impl Display for FieldTypeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Expected {}-{} to be {} type",
               &self.section_name,
               &self.field_name,
               &self.expected_type)
    }
}

impl error::Error for FieldTypeError {}

impl From<FieldTypeError> for Error {
    fn from(err: FieldTypeError) -> Self {
        Error::new(ErrorKind::InvalidPreset, err.to_string() )
    }
}

#[derive(Debug)]
pub struct MissingMandatoryProperty {
    pub section_name: String,
    pub property_name: String
}

impl MissingMandatoryProperty {
    pub fn new(section_name: &str, property_name: &str) -> MissingMandatoryProperty {
        MissingMandatoryProperty {
            section_name: String::from(section_name),
            property_name: String::from(property_name)
        }
    }
}

impl Display for MissingMandatoryProperty {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{} is missing",
               &self.section_name,
               &self.property_name,)
    }
}

impl error::Error for MissingMandatoryProperty {}

impl From<MissingMandatoryProperty> for Error {
    fn from(err: MissingMandatoryProperty) -> Self {
        Error::new(ErrorKind::InvalidPreset, err.to_string() )
    }
}

#[derive(Debug)]
pub struct MissingSection {
    pub section_name: String
}

impl MissingSection {
    pub fn new(section_name: String) -> MissingSection {
        MissingSection { section_name }
    }
}

impl Display for MissingSection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Section {} is missing",
               &self.section_name)
    }
}

impl error::Error for MissingSection {}

impl From<MissingSection> for Error {
    fn from(err: MissingSection) -> Self {
        Error::new(ErrorKind::IniParseError, err.to_string() )
    }
}

pub fn get_value<T: std::str::FromStr>(ini: &Ini,
                                       section: &str,
                                       key: &str) -> Option<T> {
    let item = ini.get_value(section, key)?;
    match item.trim().parse::<T>() {
        Ok(val) => { Some(val) }
        Err(_) => { None }
    }
}

pub fn get_mandatory_property<T: std::str::FromStr>(ini_data: &Ini, section_name: &str, key: &str) -> Result<T, MissingMandatoryProperty> {
    let res: T = match get_value(ini_data, section_name, key) {
        Some(val) => val,
        None => { return Err(MissingMandatoryProperty::new(section_name, key)); }
    };
    Ok(res)
}

/// Like [get_value] but distinguishes a missing property (`Ok(None)`) from one that is present
/// and can't be parsed as `T`.
pub fn get_optional_property<T: std::str::FromStr>(ini_data: &Ini,
                                                   section_name: &str,
                                                   key: &str) -> Result<Option<T>, FieldTypeError> {
    let raw = match ini_data.get_value(section_name, key) {
        None => return Ok(None),
        Some(raw) => raw
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    match raw.trim().parse::<T>() {
        Ok(val) => Ok(Some(val)),
        Err(_) => Err(FieldTypeError::new(section_name, key, std::any::type_name::<T>()))
    }
}

pub fn set_value<T: std::fmt::Display>(ini: &mut Ini,
                                       section: &str,
                                       key: &str,
                                       val: T) -> Option<String> {
    ini.set_value(section, key, val.to_string())
}

pub fn set_float(ini: &mut Ini, section: &str, key: &str, val: f32, precision: usize) -> Option<String> {
    ini.set_value(section,
                  key,
                  format!("{number:.prec$}", number=val, prec=precision))
}

pub fn validate_section_exists(ini: &Ini, section_name: &str) -> Result<(), MissingSection> {
    match ini.contains_section(section_name) {
        true => Ok(()),
        false => Err(MissingSection::new(section_name.to_string()))
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct Section {
    name: String,
    property_map: IndexMap<String, Property>,
    name_comment: Option<Comment>,
    comments: Vec<Comment>,
    ordering: Vec<LineType>
}

impl Section {
    pub fn new(name: String) -> Section {
        Section {
            name,
            property_map: IndexMap::new(),
            name_comment: None,
            comments: Vec::new(),
            ordering: Vec::new()
        }
    }

    pub fn from_line(line: &str, comment_symbols: &HashSet<char>) -> Result<Section, String> {
        let opening_bracket_pos = match line.find('[') {
            None => return Err(String::from("No opening '[' for section name found")),
            Some(pos) => pos
        };
        let closing_bracket_pos = match line.find(']') {
            None => return Err(String::from("No closing ']' for section name found")),
            Some(pos) => pos
        };
        if closing_bracket_pos < opening_bracket_pos {
            return Err(String::from("Section name closed before it was opened"));
        }
        let name = String::from(line[opening_bracket_pos + 1..closing_bracket_pos].trim());
        let name_comment = Comment::from_line(&line[closing_bracket_pos+1..], comment_symbols);
        let mut section = Section::new(name);
        section.name_comment = name_comment;
        Ok(section)
    }

    pub fn get_property(&self, property_key: &str) -> Option<&Property> {
        self.property_map.get(property_key)
    }

    pub fn get_property_mut(&mut self, property_key: &str) -> Option<&mut Property> {
        self.property_map.get_mut(property_key)
    }

    pub fn contains_property(&self, key: &str) -> bool {
        self.property_map.contains_key(key)
    }

    pub fn add_property(&mut self, property: Property) {
        if !self.property_map.contains_key(&property.key) {
            self.ordering.push(LineType::KeyValue(property.key.clone()));
        }
        self.property_map.insert(property.key.clone(), property);
    }

    pub fn remove_property(&mut self, key: &str) -> Option<Property> {
        self.ordering.retain(|line| !matches!(line, LineType::KeyValue(k) if k == key));
        let (_, val) = self.property_map.shift_remove_entry(key)?;
        Some(val)
    }

    pub fn add_comment(&mut self, comment: Comment) {
        self.comments.push(comment);
        self.ordering.push(LineType::Comment(self.comments.len() - 1));
    }
}

impl Display for Section {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut out = String::new();
        if !self.name.is_empty() {
            out += &format!("[{}]", &self.name);
            if let Some(comment) = &self.name_comment {
                out += &comment.to_string();
            }
            out += "\n";
        }
        let lines: Vec<String> = self.ordering.iter().filter_map(|line_type| {
            match line_type {
                LineType::KeyValue(key) => {
                    self.property_map.get(key).map(|p| p.to_string())
                }
                LineType::Comment(idx) => {
                    self.comments.get(*idx).map(|c| c.to_string())
                }
            }
        }).collect();
        out += &lines.join("\n");
        write!(f, "{}", out)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct Property {
    key: String,
    value: String,
    multiline_tag: Option<String>,
    comment: Option<Comment>
}

impl Property {
    pub fn new(key: &str, value: String) -> Property {
        Property { key: String::from(key), value, multiline_tag: None, comment: None }
    }

    pub fn from_line(line: &str, comment_symbols: &HashSet<char>) -> Result<Property, String> {
        let delimiter_pos = match line.find('=') {
            None => return Err(String::from("Cannot find valid property value")),
            Some(pos) => pos
        };
        let key = line[..delimiter_pos].trim();
        if key.is_empty() {
            return Err(String::from("Cannot find valid property name"));
        }
        let remainder = &line[delimiter_pos+1..];
        let mut comment = None;
        let value = match remainder.find(|c: char| comment_symbols.contains(&c)) {
            None => remainder.trim(),
            Some(comment_start_pos) => {
                comment = Comment::from_line(&remainder[comment_start_pos..], comment_symbols);
                remainder[..comment_start_pos].trim()
            }
        };
        let mut property = Property::new(key, String::from(value));
        property.comment = comment;
        if let Some(tag) = value.strip_prefix(MULTILINE_MARKER) {
            property.multiline_tag = Some(String::from(tag.trim()));
            property.value = String::new();
        }
        Ok(property)
    }

    pub fn get_value(&self) -> String {
        self.value.clone()
    }

    pub fn set_value(&mut self, val: String) -> String {
        std::mem::replace(&mut self.value, val)
    }
}

impl Display for Property {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = ", &self.key)?;
        match &self.multiline_tag {
            None => {
                write!(f, "{}", &self.value)?;
                if let Some(comment) = &self.comment {
                    write!(f, " {}", comment)?;
                }
            }
            Some(tag) => {
                write!(f, "{}{}", MULTILINE_MARKER, tag)?;
                if let Some(comment) = &self.comment {
                    write!(f, " {}", comment)?;
                }
                write!(f, "\n{}\n{}", self.value.trim_end_matches('\n'), tag)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct Comment {
    symbol: String,
    value: String,
}

impl Comment {
    pub fn from_line(line: &str, comment_symbols: &HashSet<char>) -> Option<Comment> {
        match line.match_indices(|c: char| comment_symbols.contains(&c)).next() {
            None => None,
            Some((idx, matched_char)) => {
                Some(Comment{
                    symbol: String::from(matched_char),
                    value: String::from(line[idx+1..].trim_end()),
                })
            }
        }
    }
}

impl Display for Comment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.symbol, self.value)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub (crate) enum LineType {
    KeyValue(String),
    Comment(usize),
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum ParsedLine {
    SectionName,
    KeyValue,
    Comment,
    Ignore
}

/// Raised when a line can't be understood. Carries the 1-based line number.
#[derive(Debug)]
pub struct IniSyntaxError {
    pub line_number: usize,
    pub reason: String
}

impl Display for IniSyntaxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line_number, self.reason)
    }
}

impl error::Error for IniSyntaxError {}

impl From<IniSyntaxError> for Error {
    fn from(err: IniSyntaxError) -> Self {
        Error::new(ErrorKind::IniParseError, err.to_string())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Ini {
    sections: IndexMap<String, Section>,
    comment_symbols: HashSet<char>,
}

impl Default for Ini {
    fn default() -> Self {
        Ini::new()
    }
}

impl Ini {
    const TOP_LEVEL: &'static str = "topLevel";

    pub fn new() -> Ini {
        Ini {
            sections: IndexMap::new(),
            comment_symbols: HashSet::from([';', '#'])
        }
    }

    pub fn load_from_string(ini_data: &str) -> Result<Ini, IniSyntaxError> {
        let mut ini = Ini::new();
        ini.parse(ini_data)?;
        Ok(ini)
    }

    pub fn load_from_file(path: &Path) -> crate::error::Result<Ini> {
        let data = fs::read_to_string(path)?;
        Ok(Ini::load_from_string(&data)?)
    }

    pub fn parse(&mut self, input: &str) -> Result<(), IniSyntaxError> {
        let mut current_section= Section::new(String::new());
        let mut lines = input.lines().enumerate();
        while let Some((idx, line)) = lines.next() {
            let line_number = idx + 1;
            let syntax_error = |reason: String| IniSyntaxError { line_number, reason };
            match self.get_expected_line_type(line) {
                ParsedLine::SectionName => {
                    let next_section = Section::from_line(line, &self.comment_symbols)
                        .map_err(syntax_error)?;
                    self.finish_section(std::mem::replace(&mut current_section, next_section));
                }
                ParsedLine::KeyValue => {
                    let mut property = Property::from_line(line, &self.comment_symbols)
                        .map_err(syntax_error)?;
                    if let Some(tag) = property.multiline_tag.clone() {
                        let mut value_lines: Vec<&str> = Vec::new();
                        let mut terminated = false;
                        for (_, value_line) in lines.by_ref() {
                            if value_line.trim() == tag {
                                terminated = true;
                                break;
                            }
                            value_lines.push(value_line);
                        }
                        if !terminated {
                            return Err(syntax_error(
                                format!("multi-line value {} is missing its '{}' terminator", property.key, tag)
                            ));
                        }
                        property.value = value_lines.join("\n");
                    }
                    current_section.add_property(property);
                }
                ParsedLine::Comment => {
                    if let Some(comment) = Comment::from_line(line, &self.comment_symbols) {
                        current_section.add_comment(comment);
                    }
                }
                ParsedLine::Ignore => {}
            }
        }
        self.finish_section(current_section);
        Ok(())
    }

    pub fn extract<T: FromIni>(&self) -> crate::error::Result<T> {
        T::load_from_ini(self)
    }

    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.to_string())
    }

    pub fn get_value(&self, section_name: &str, property_name: &str) -> Option<String> {
        Some(self.sections.get(section_name)?.get_property(property_name)?.get_value())
    }

    /// Remove a property from a given section.
    /// Returns the previous value of the property as `Some(value)` where value is a `String` or
    /// `None` if this operation didn't remove anything
    pub fn remove_value(&mut self, section_name: &str, property_name: &str) -> Option<String> {
        let section = self.sections.get_mut(section_name)?;
        section.remove_property(property_name).map(|old_prop| old_prop.value)
    }

    /// Set a ini property value to the provided String.
    /// Returns the previous value of the property as `Some(value)` where value is a `String` or
    /// `None` if this operation added a new property
    pub fn set_value(&mut self,
                     section_name: &str,
                     property_key: &str,
                     property_value: String) -> Option<String> {
        let section = self.sections
            .entry(String::from(section_name))
            .or_insert_with(|| Section::new(String::from(section_name)));
        match section.get_property_mut(property_key) {
            Some(property) => Some(property.set_value(property_value)),
            None => {
                section.add_property(Property::new(property_key, property_value));
                None
            }
        }
    }

    /// Set a property that is written across several lines, closed by a line holding `tag`.
    pub fn set_multiline_value(&mut self,
                               section_name: &str,
                               property_key: &str,
                               property_value: String,
                               tag: &str) -> Option<String> {
        let old = self.set_value(section_name, property_key, property_value);
        if let Some(property) = self.sections
            .get_mut(section_name)
            .and_then(|s| s.get_property_mut(property_key)) {
            property.multiline_tag = Some(String::from(tag));
        }
        old
    }

    pub fn contains_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    pub fn section_contains_property(&self, section_name: &str, property_name: &str) -> bool {
        match self.sections.get(section_name) {
            None => false,
            Some(section) => section.contains_property(property_name)
        }
    }

    fn finish_section(&mut self, section: Section) {
        let key = if section.name.is_empty() {
            if section.property_map.is_empty() && section.comments.is_empty() {
                return;
            }
            String::from(Ini::TOP_LEVEL)
        } else {
            section.name.clone()
        };
        self.sections.insert(key, section);
    }

    /// Essentially "what delimiting character comes first?"
    fn get_expected_line_type(&self, line: &str) -> ParsedLine {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('=') {
            return ParsedLine::Ignore;
        }

        let comment_opt = self.find_comment_start(trimmed);
        let kv_opt = self.find_key_value_delimiter(trimmed);
        if trimmed.starts_with('[') {
            if let Some(comment_start_pos) = comment_opt {
                if comment_start_pos == 0 {
                    return ParsedLine::Comment
                }
            }
            return ParsedLine::SectionName
        }
        if let Some(kv_delimiter_pos) = kv_opt {
            if let Some(comment_start_pos) = comment_opt {
                if comment_start_pos < kv_delimiter_pos {
                    return ParsedLine::Comment
                }
            }
            return ParsedLine::KeyValue
        }
        match comment_opt {
            None => { ParsedLine::Ignore }
            Some(_) => { ParsedLine::Comment }
        }
    }

    fn find_comment_start(&self, line: &str) -> Option<usize> {
        line.find(|c: char| self.comment_symbols.contains(&c))
    }

    fn find_key_value_delimiter(&self, line: &str) -> Option<usize> {
        match line.find('=') {
            // Can't have a empty Key so we didn't match
            Some(0) | None => None,
            Some(idx) => Some(idx)
        }
    }
}

impl Display for Ini {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let section_strings: Vec<String> = self.sections.values().filter_map(|section| {
            let section_string = section.to_string();
            if !section_string.is_empty() {
                Some(section_string)
            } else {
                None
            }
        }).collect();
        writeln!(f, "{}", section_strings.join("\n\n"))
    }
}
