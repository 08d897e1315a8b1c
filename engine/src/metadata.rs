//! Classification metadata: sources and translation into remote fields.
//!
//! A `ClassificationSource` reports the typed properties of a local file.
//! `translate_property` maps one of them to the field the library expects,
//! and `read_fields` runs the whole pass for one file, tolerating failures.

use crate::error::MetadataError;
use crate::model::{ClassificationProperty, FieldDescriptor, FieldType, PropertyType};
use chrono::{DateTime, Datelike};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Suffix of the JSON side-car read by `SidecarClassification`.
pub const SIDECAR_SUFFIX: &str = ".classification.json";

/// Seconds between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_OFFSET_SECS: i64 = 11_644_473_600;
const FILETIME_TICKS_PER_SEC: i64 = 10_000_000;

/// Supplier of classification properties for local files.
pub trait ClassificationSource {
    /// Read all properties of `path`.
    ///
    /// Properties whose definition cannot be resolved are returned with
    /// `property_type: None` rather than as an error.
    fn read_properties(&self, path: &Path) -> Result<Vec<ClassificationProperty>, MetadataError>;
}

/// A source that never reports any property.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoClassification;

impl ClassificationSource for NoClassification {
    fn read_properties(&self, _path: &Path) -> Result<Vec<ClassificationProperty>, MetadataError> {
        Ok(Vec::new())
    }
}

/// Reads properties from `<file>.classification.json` next to each file.
///
/// The side-car holds an array of `{"name", "value", "type"}` objects where
/// `type` is the numeric classification type code. A missing side-car means
/// the file has no properties.
#[derive(Debug, Default, Clone, Copy)]
pub struct SidecarClassification;

#[derive(Debug, Deserialize)]
struct SidecarEntry {
    name: String,
    value: String,
    #[serde(rename = "type")]
    type_code: u32,
}

impl SidecarClassification {
    pub fn sidecar_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(SIDECAR_SUFFIX);
        PathBuf::from(name)
    }
}

impl ClassificationSource for SidecarClassification {
    fn read_properties(&self, path: &Path) -> Result<Vec<ClassificationProperty>, MetadataError> {
        let sidecar = Self::sidecar_path(path);
        let raw = match fs::read_to_string(&sidecar) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(MetadataError::Io {
                    path: sidecar,
                    source: e,
                })
            }
        };
        let entries: Vec<SidecarEntry> =
            serde_json::from_str(&raw).map_err(|e| MetadataError::Parse {
                path: sidecar.clone(),
                source: e,
            })?;

        Ok(entries
            .into_iter()
            .map(|entry| ClassificationProperty {
                property_type: PropertyType::from_code(entry.type_code),
                name: entry.name,
                value: entry.value,
            })
            .collect())
    }
}

/// Translate one property into a remote field.
///
/// Returns `None` when the property has no resolvable type, or when a date
/// value is not a representable FILETIME.
pub fn translate_property(property: &ClassificationProperty) -> Option<FieldDescriptor> {
    let property_type = property.property_type?;
    let (field_type, value) = match property_type {
        PropertyType::OrderedList => (FieldType::Choice, property.value.clone()),
        PropertyType::MultiChoiceList => (FieldType::MultiChoice, property.value.replace('|', ";#")),
        PropertyType::String => (FieldType::Text, property.value.clone()),
        PropertyType::MultiString => (FieldType::Note, property.value.clone()),
        PropertyType::Int => (FieldType::Number, property.value.clone()),
        PropertyType::Bool => {
            let flag = if property.value == "1" { "True" } else { "False" };
            (FieldType::Boolean, flag.to_string())
        }
        PropertyType::Date => (FieldType::DateTime, filetime_to_iso8601(&property.value)?),
    };

    Some(FieldDescriptor {
        display_name: property.name.clone(),
        field_type,
        value,
    })
}

/// Render a Windows FILETIME (100 ns ticks since 1601-01-01 UTC) in the
/// round-trip form `YYYY-MM-DDTHH:MM:SS.fffffffZ`.
pub fn filetime_to_iso8601(raw: &str) -> Option<String> {
    let ticks: i64 = raw.trim().parse().ok()?;
    if ticks < 0 {
        return None;
    }
    let secs = ticks / FILETIME_TICKS_PER_SEC - FILETIME_UNIX_OFFSET_SECS;
    let fraction = ticks % FILETIME_TICKS_PER_SEC;
    let instant = DateTime::from_timestamp(secs, 0)?;
    // Four-digit years only
    if instant.year() > 9999 {
        return None;
    }
    Some(format!("{}.{:07}Z", instant.format("%Y-%m-%dT%H:%M:%S"), fraction))
}

/// Collect the fields to send with `path`.
///
/// A failing source yields no fields, and untranslatable properties are
/// dropped; neither stops the upload.
pub fn read_fields(source: &dyn ClassificationSource, path: &Path) -> Vec<FieldDescriptor> {
    let properties = match source.read_properties(path) {
        Ok(properties) => properties,
        Err(e) => {
            log::warn!("Classification unavailable for {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    properties
        .iter()
        .filter_map(|property| {
            let field = translate_property(property);
            if field.is_none() {
                log::warn!(
                    "Skipping property '{}' of {}: no usable definition",
                    property.name,
                    path.display()
                );
            }
            field
        })
        .collect()
}
