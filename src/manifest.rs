//! Application manifest loader.
//!
//! A manifest describes an application's routing in YAML (or JSON): the
//! schemas its views validate and marshal with, the traversal contexts, the
//! named routes and the views themselves.
//!
//! ```yaml
//! settings:
//!   openapi.title: Albums
//!   openapi.version: 1.0.0
//! schemas:
//!   AlbumSchema:
//!     fields:
//!       title: {type: string, required: true}
//!       release_date: date
//! contexts:
//!   Album:
//!     path: /album/{albumId}
//!     params:
//!       - name: albumId
//!         schema: {type: integer}
//! routes:
//!   get_album: /album/{albumId}
//! views:
//!   - callable: get_album
//!     route_name: get_album
//!     marshal: AlbumSchema
//! ```
//!
//! The legacy TOML config names a manifest in its `[openapi]` table and may
//! override the manifest's settings.

use crate::error::{Error, Result};
use crate::merge::yaml_to_json;
use crate::registry::{
    Context, PathParam, RequestMethods, ResourceContext, RouteRegistry, Settings, Tag, TagRef,
    ViewMetadata,
};
use crate::schema::{FieldKind, FieldMap, FieldSpec, SchemaClass, SchemaHandle, SchemaRef};
use log::{debug, info};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use serde_yaml::{Mapping, Value as YamlValue};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    #[serde(default)]
    settings: SettingsDecl,
    #[serde(default)]
    schemas: Mapping,
    #[serde(default)]
    contexts: Mapping,
    #[serde(default)]
    routes: Mapping,
    #[serde(default)]
    views: Vec<ViewDecl>,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsDecl {
    #[serde(rename = "openapi.title", default, deserialize_with = "scalar_string")]
    title: Option<String>,
    #[serde(rename = "openapi.version", default, deserialize_with = "scalar_string")]
    version: Option<String>,
    #[serde(rename = "openapi.merge")]
    merge: Option<OneOrMany>,
}

/// A single string or a list of strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    /// Overlay list; a single string is comma separated
    fn into_merge_list(self) -> Vec<String> {
        match self {
            OneOrMany::One(value) => Settings::parse_merge_list(&value),
            OneOrMany::Many(values) => values,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaDecl {
    #[serde(default)]
    description: Option<String>,
    #[serde(default = "default_register")]
    register: bool,
    #[serde(default)]
    fields: Mapping,
}

fn default_register() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldDecl {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    allow_none: bool,
    #[serde(default)]
    description: Option<String>,
    /// Element field of a `list`
    #[serde(default)]
    items: Option<YamlValue>,
    /// Schema reference of a `nested` field
    #[serde(default)]
    schema: Option<YamlValue>,
    #[serde(default)]
    many: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaUseDecl {
    schema: String,
    #[serde(default)]
    only: Option<Vec<String>>,
    #[serde(default)]
    partial: bool,
    #[serde(default)]
    many: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContextDecl {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    params: Vec<PathParam>,
    #[serde(default)]
    tag: Option<TagDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagDecl {
    Name(String),
    Described(Tag),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ViewDecl {
    callable: String,
    #[serde(default)]
    doc: Option<String>,
    #[serde(default)]
    route_name: Option<String>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    request_method: Option<OneOrMany>,
    #[serde(default)]
    validate: Option<YamlValue>,
    #[serde(default)]
    marshal: Option<YamlValue>,
    #[serde(default)]
    api_zone: Option<String>,
    #[serde(default)]
    api_spec: Option<YamlValue>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    openapi: ConfigSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigSection {
    manifest: PathBuf,
    #[serde(default, deserialize_with = "scalar_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    version: Option<String>,
    #[serde(default)]
    merge: Option<OneOrMany>,
}

/// Reads a string, number or boolean as its text; `version: 1.0` is "1.0".
fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<YamlValue>::deserialize(deserializer)? {
        None | Some(YamlValue::Null) => Ok(None),
        Some(YamlValue::String(text)) => Ok(Some(text)),
        Some(YamlValue::Number(number)) => Ok(Some(number.to_string())),
        Some(YamlValue::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(_) => Err(de::Error::custom("expected a string, number or boolean")),
    }
}

fn manifest_error(file: &Path, message: impl ToString) -> Error {
    Error::Manifest {
        file: file.to_path_buf(),
        message: message.to_string(),
    }
}

/// Load a manifest from a `.yaml`, `.yml` or `.json` file
pub fn load_manifest(path: &Path) -> Result<RouteRegistry> {
    info!("Loading manifest {}", path.display());
    let text = fs::read_to_string(path).map_err(|e| manifest_error(path, e))?;
    parse_manifest(&text, path)
}

/// Parse manifest text. `origin` names the manifest in errors and decides the
/// syntax: JSON for a `.json` extension, YAML otherwise.
pub fn parse_manifest(text: &str, origin: &Path) -> Result<RouteRegistry> {
    let is_json = origin
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let file: ManifestFile = if is_json {
        serde_json::from_str(text).map_err(|e| manifest_error(origin, e))?
    } else if text.trim().is_empty() {
        ManifestFile::default()
    } else {
        serde_yaml::from_str(text).map_err(|e| manifest_error(origin, e))?
    };
    ManifestLoader::new(origin, &file)?.build(file)
}

/// Load the legacy TOML config and the manifest it names.
///
/// A relative manifest path is resolved against the config file's directory.
/// Title, version and merge set in the config override the manifest's.
pub fn load_config(path: &Path) -> Result<RouteRegistry> {
    info!("Loading config {}", path.display());
    let text = fs::read_to_string(path).map_err(|e| manifest_error(path, e))?;
    let config: ConfigFile = toml::from_str(&text).map_err(|e| manifest_error(path, e))?;
    let section = config.openapi;

    let manifest = match path.parent() {
        Some(dir) if section.manifest.is_relative() => dir.join(&section.manifest),
        _ => section.manifest.clone(),
    };
    let mut registry = load_manifest(&manifest)?;

    let settings = registry.settings_mut();
    if section.title.is_some() {
        settings.title = section.title;
    }
    if section.version.is_some() {
        settings.version = section.version;
    }
    if let Some(merge) = section.merge {
        settings.merge = merge.into_merge_list();
    }
    Ok(registry)
}

/// Decode every entry of a name -> declaration mapping
fn entries<T: DeserializeOwned>(mapping: &Mapping, section: &str, file: &Path) -> Result<Vec<(String, T)>> {
    mapping
        .iter()
        .map(|(key, value)| {
            let name = key
                .as_str()
                .ok_or_else(|| manifest_error(file, format!("{} names must be strings", section)))?;
            let decl = serde_yaml::from_value(value.clone())
                .map_err(|e| manifest_error(file, format!("{} {:?}: {}", section, name, e)))?;
            Ok((name.to_string(), decl))
        })
        .collect()
}

struct ManifestLoader<'m> {
    file: &'m Path,
    schemas: Vec<(String, SchemaDecl)>,
    built: HashMap<String, Arc<SchemaClass>>,
    /// Schemas whose fields are being built, outermost first
    building: Vec<String>,
}

impl<'m> ManifestLoader<'m> {
    fn new(file: &'m Path, manifest: &ManifestFile) -> Result<Self> {
        Ok(Self {
            file,
            schemas: entries(&manifest.schemas, "schema", file)?,
            built: HashMap::new(),
            building: Vec::new(),
        })
    }

    fn build(mut self, manifest: ManifestFile) -> Result<RouteRegistry> {
        // Build every declared class so errors surface even in unused ones.
        let names: Vec<String> = self.schemas.iter().map(|(name, _)| name.clone()).collect();
        for name in &names {
            self.class(name, name)?;
        }

        let settings = Settings {
            title: manifest.settings.title,
            version: manifest.settings.version,
            merge: manifest
                .settings
                .merge
                .map(OneOrMany::into_merge_list)
                .unwrap_or_default(),
        };
        let mut registry = RouteRegistry::new().with_settings(settings);

        for (name, pattern) in entries::<String>(&manifest.routes, "route", self.file)? {
            registry.add_route(name, pattern);
        }

        let mut contexts: HashMap<String, Arc<dyn Context>> = HashMap::new();
        for (name, decl) in entries::<ContextDecl>(&manifest.contexts, "context", self.file)? {
            let mut context = ResourceContext::new(name.clone());
            context.path = decl.path;
            context.params = decl.params;
            context.tag = decl.tag.map(|tag| match tag {
                TagDecl::Name(name) => TagRef::Name(name),
                TagDecl::Described(tag) => TagRef::Described(tag),
            });
            contexts.insert(name, context.shared());
        }

        for decl in manifest.views {
            let view = self.view(decl, &contexts)?;
            registry.add_view(view);
        }

        debug!(
            "Loaded {} schemas, {} routes and {} views from {}",
            self.built.len(),
            registry.routes().len(),
            registry.views().len(),
            self.file.display()
        );
        Ok(registry)
    }

    fn view(&mut self, decl: ViewDecl, contexts: &HashMap<String, Arc<dyn Context>>) -> Result<ViewMetadata> {
        let context = match &decl.context {
            Some(name) => match contexts.get(name) {
                Some(context) => Some(Arc::clone(context)),
                None => {
                    return Err(Error::Configuration(format!(
                        "view {} uses unknown context {:?}",
                        decl.callable, name
                    )))
                }
            },
            None => None,
        };

        let validate = match &decl.validate {
            Some(value) => Some(self.schema_ref(value, &format!("{} validate", decl.callable))?),
            None => None,
        };
        let marshal = match &decl.marshal {
            Some(value) => Some(self.schema_ref(value, &format!("{} marshal", decl.callable))?),
            None => None,
        };
        let api_spec = match decl.api_spec {
            Some(value) => match yaml_to_json(value) {
                Value::Object(map) => Some(map),
                Value::Null => Some(Map::new()),
                _ => {
                    return Err(manifest_error(
                        self.file,
                        format!("api_spec of view {} must be a mapping", decl.callable),
                    ))
                }
            },
            None => None,
        };

        Ok(ViewMetadata {
            callable: decl.callable,
            doc: decl.doc,
            route_name: decl.route_name,
            context,
            name: decl.name,
            request_methods: match decl.request_method {
                None => RequestMethods::Unspecified,
                Some(OneOrMany::One(method)) => RequestMethods::One(method),
                Some(OneOrMany::Many(methods)) => RequestMethods::Many(methods),
            },
            validate,
            marshal,
            api_zone: decl.api_zone,
            api_spec,
        })
    }

    /// Build (or fetch) the class declared under `name`
    fn class(&mut self, name: &str, context: &str) -> Result<Arc<SchemaClass>> {
        if let Some(class) = self.built.get(name) {
            return Ok(Arc::clone(class));
        }
        if self.building.iter().any(|pending| pending == name) {
            let mut chain = self.building.clone();
            chain.push(name.to_string());
            return Err(Error::schema(
                context,
                format!("nested schemas form a cycle: {}", chain.join(" -> ")),
            ));
        }
        let Some(index) = self.schemas.iter().position(|(declared, _)| declared == name) else {
            return Err(Error::schema(context, format!("unknown schema {:?}", name)));
        };

        self.building.push(name.to_string());
        let (description, register, declared_fields) = {
            let decl = &self.schemas[index].1;
            (decl.description.clone(), decl.register, decl.fields.clone())
        };
        let mut fields = FieldMap::new();
        for (key, value) in &declared_fields {
            let field = key
                .as_str()
                .ok_or_else(|| Error::schema(name, "field names must be strings"))?;
            let spec = self.field(value, &format!("{}.{}", name, field))?;
            fields.insert(field, spec);
        }
        self.building.pop();

        let mut class = SchemaClass::new(name, fields);
        if let Some(description) = description {
            class = class.with_description(description);
        }
        if !register {
            class = class.unregistered();
        }
        let class = class.shared();
        self.built.insert(name.to_string(), Arc::clone(&class));
        Ok(class)
    }

    /// Decode a field declaration: a type name, or a mapping with `type`
    fn field(&mut self, value: &YamlValue, context: &str) -> Result<FieldSpec> {
        let decl = match value {
            YamlValue::String(kind) => FieldDecl {
                kind: kind.clone(),
                required: false,
                allow_none: false,
                description: None,
                items: None,
                schema: None,
                many: false,
            },
            YamlValue::Mapping(_) => {
                serde_yaml::from_value(value.clone()).map_err(|e| Error::schema(context, e.to_string()))?
            }
            _ => {
                return Err(Error::schema(
                    context,
                    "a field is declared as a type name or a mapping with `type`",
                ))
            }
        };

        let kind = match decl.kind.as_str() {
            "string" | "str" => FieldKind::String,
            "integer" | "int" => FieldKind::Integer,
            "float" | "number" => FieldKind::Float,
            "boolean" | "bool" => FieldKind::Boolean,
            "date" => FieldKind::Date,
            "datetime" | "date-time" => FieldKind::DateTime,
            "dict" | "object" => FieldKind::Dict,
            "raw" => FieldKind::Raw,
            "list" => {
                let items = decl
                    .items
                    .as_ref()
                    .ok_or_else(|| Error::schema(context, "a list field needs `items`"))?;
                FieldKind::List(Box::new(self.field(items, &format!("{}[]", context))?))
            }
            "nested" => {
                let schema = decl
                    .schema
                    .as_ref()
                    .ok_or_else(|| Error::schema(context, "a nested field needs `schema`"))?;
                FieldKind::Nested {
                    schema: Box::new(self.schema_ref(schema, context)?),
                    many: decl.many,
                }
            }
            other => return Err(Error::schema(context, format!("unknown field type {:?}", other))),
        };

        let mut spec = FieldSpec::new(kind);
        spec.required = decl.required;
        spec.allow_none = decl.allow_none;
        spec.description = decl.description;
        Ok(spec)
    }

    /// Decode a schema reference: a schema name, a use of a named schema
    /// with modifiers, or an inline field mapping.
    fn schema_ref(&mut self, value: &YamlValue, context: &str) -> Result<SchemaRef> {
        match value {
            YamlValue::String(name) => Ok(SchemaHandle::new(self.class(name, context)?).into()),
            YamlValue::Mapping(mapping) if mapping.contains_key("schema") => {
                let decl: SchemaUseDecl =
                    serde_yaml::from_value(value.clone()).map_err(|e| Error::schema(context, e.to_string()))?;
                let mut handle = SchemaHandle::new(self.class(&decl.schema, context)?);
                if let Some(only) = decl.only {
                    handle = handle.only(only);
                }
                if decl.partial {
                    handle = handle.partial();
                }
                if decl.many {
                    handle = handle.many();
                }
                Ok(handle.into())
            }
            YamlValue::Mapping(mapping) if mapping.contains_key("fields") => {
                let fields = match mapping.get("fields") {
                    Some(YamlValue::Mapping(fields)) => fields,
                    _ => return Err(Error::schema(context, "`fields` must be a mapping")),
                };
                let mut inline = FieldMap::new();
                for (key, field) in fields {
                    let name = key
                        .as_str()
                        .ok_or_else(|| Error::schema(context, "field names must be strings"))?;
                    let spec = self.field(field, &format!("{}.{}", context, name))?;
                    inline.insert(name, spec);
                }
                Ok(inline.into())
            }
            _ => Err(Error::schema(
                context,
                "expected a schema name, a mapping with `schema` or a mapping with `fields`",
            )),
        }
    }
}
