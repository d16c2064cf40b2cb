//! Merge engine for hand-authored fragments and external overlays.
//!
//! Mappings merge key by key, recursing while both sides are mappings.
//! Every other value in the overlay, sequences included, replaces the base
//! value outright. Replacement of sequences is what lets an overlay swap out
//! a generated `parameters` list instead of appending to it.

use crate::error::{Error, Result};
use crate::openapi_builder::SpecDocument;
use log::{debug, info};
use serde_json::{Map, Value};
use serde_yaml::Value as YamlValue;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;

/// Deep-merge `overlay` into `base`.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                if value.is_object() {
                    if let Some(existing) = base_map.get_mut(&key).filter(|v| v.is_object()) {
                        deep_merge(existing, value);
                        continue;
                    }
                }
                base_map.insert(key, value);
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Convert parsed YAML to JSON. Non-string mapping keys (`204:`) are
/// rendered as strings and tags are dropped.
pub fn yaml_to_json(value: YamlValue) -> Value {
    match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(b),
        YamlValue::Number(n) => yaml_number(&n),
        YamlValue::String(s) => Value::String(s),
        YamlValue::Sequence(items) => Value::Array(items.into_iter().map(yaml_to_json).collect()),
        YamlValue::Mapping(mapping) => Value::Object(
            mapping
                .into_iter()
                .map(|(key, value)| (yaml_key(key), yaml_to_json(value)))
                .collect(),
        ),
        YamlValue::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_number(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::from(i)
    } else if let Some(u) = n.as_u64() {
        Value::from(u)
    } else {
        n.as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn yaml_key(key: YamlValue) -> String {
    match key {
        YamlValue::String(s) => s,
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Null => "null".to_string(),
        YamlValue::Tagged(tagged) => yaml_key(tagged.value),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

/// Where an overlay document comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OverlaySource {
    /// A file on disk
    File(PathBuf),
    /// A resource inside a package, written `package:path/inside.yaml`
    Resource { package: String, path: String },
}

impl OverlaySource {
    /// Parse an overlay reference. A single-letter prefix (`C:\...`) is a
    /// drive letter, not a package.
    pub fn parse(source: &str) -> Self {
        match source.split_once(':') {
            Some((package, path)) if is_package_name(package) => OverlaySource::Resource {
                package: package.to_string(),
                path: path.to_string(),
            },
            _ => OverlaySource::File(PathBuf::from(source)),
        }
    }
}

fn is_package_name(name: &str) -> bool {
    name.chars().count() > 1
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

impl fmt::Display for OverlaySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlaySource::File(path) => write!(f, "{}", path.display()),
            OverlaySource::Resource { package, path } => write!(f, "{}:{}", package, path),
        }
    }
}

/// Packaged resources that `package:path` overlay references resolve to.
///
/// A package is either a set of bundled documents (typically `include_str!`
/// content of the host application) or a directory on disk.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    bundled: HashMap<(String, String), String>,
    roots: HashMap<String, PathBuf>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_bytes(
        &mut self,
        package: impl Into<String>,
        path: impl Into<String>,
        contents: impl Into<String>,
    ) -> &mut Self {
        self.bundled
            .insert((package.into(), path.into()), contents.into());
        self
    }

    pub fn register_dir(&mut self, package: impl Into<String>, dir: impl Into<PathBuf>) -> &mut Self {
        self.roots.insert(package.into(), dir.into());
        self
    }

    /// Read a resource. Bundled documents shadow directory roots.
    pub fn read(&self, package: &str, path: &str) -> Result<String> {
        let display = format!("{}:{}", package, path);
        if let Some(contents) = self.bundled.get(&(package.to_string(), path.to_string())) {
            return Ok(contents.clone());
        }
        match self.roots.get(package) {
            Some(root) => {
                let file = root.join(path.trim_start_matches('/'));
                debug!("Reading resource {} from {}", display, file.display());
                fs::read_to_string(&file).map_err(|e| Error::overlay(display, e.to_string()))
            }
            None => Err(Error::overlay(
                display,
                format!("no resources registered for package {:?}", package),
            )),
        }
    }
}

/// Load an overlay as a JSON mapping. An empty document is an empty mapping.
pub fn load_overlay(source: &OverlaySource, resources: &ResourceRegistry) -> Result<Map<String, Value>> {
    let text = match source {
        OverlaySource::File(path) => {
            fs::read_to_string(path).map_err(|e| Error::overlay(source.to_string(), e.to_string()))?
        }
        OverlaySource::Resource { package, path } => resources.read(package, path)?,
    };

    let parsed: YamlValue = serde_yaml::from_str(&text)
        .map_err(|e| Error::overlay(source.to_string(), e.to_string()))?;
    match yaml_to_json(parsed) {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(Error::overlay(source.to_string(), "document is not a mapping")),
    }
}

/// Merge one overlay into a finished document.
pub fn merge(document: SpecDocument, source: &OverlaySource, resources: &ResourceRegistry) -> Result<SpecDocument> {
    info!("Merging overlay {}", source);
    let overlay = load_overlay(source, resources)?;
    Ok(document.merged(Value::Object(overlay)))
}

/// Merge overlays in order, each over the result of the previous one.
pub fn merge_all(
    document: SpecDocument,
    sources: &[OverlaySource],
    resources: &ResourceRegistry,
) -> Result<SpecDocument> {
    sources
        .iter()
        .try_fold(document, |document, source| merge(document, source, resources))
}
