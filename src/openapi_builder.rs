use crate::error::{Error, Result};
use crate::merge::deep_merge;
use crate::registry::{Tag, TagRef};
use crate::schema_resolver::SchemaResolver;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// OpenAPI version written into every document
pub const OPENAPI_VERSION: &str = "3.0.2";

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    /// Named schemas, in registration order
    #[serde(default)]
    pub schemas: Map<String, Value>,
}

/// Complete OpenAPI document, as assembled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Info,
    /// Path template -> method -> Operation Object
    pub paths: Map<String, Value>,
    /// Components (schemas)
    pub components: Components,
    /// Document-level tags, in registration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// Spec assembler - collects path items, named schemas and tags for one
/// generation run.
///
/// A fresh assembler is created per run, so nothing registered here outlives
/// the document it produces.
pub struct SpecAssembler {
    /// OpenAPI info section
    info: Info,
    /// Schema resolver owning the named-schema registry
    resolver: SchemaResolver,
    /// Tag registry (tag name -> tag), in first-registration order
    tags: Vec<Tag>,
    /// Paths collection (path template -> PathItem)
    paths: Map<String, Value>,
}

impl SpecAssembler {
    /// Create an assembler for a document with the given title and version
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        debug!("Initializing SpecAssembler");
        Self {
            info: Info {
                title: title.into(),
                version: version.into(),
                description: None,
            },
            resolver: SchemaResolver::new(),
            tags: Vec::new(),
            paths: Map::new(),
        }
    }

    pub fn info(&self) -> &Info {
        &self.info
    }

    /// The schema resolver used for every schema reference of this run
    pub fn resolver(&mut self) -> &mut SchemaResolver {
        &mut self.resolver
    }

    /// Return the name to put on an operation for `tag`.
    ///
    /// Described tags are added to the document's tag list on first use.
    /// Bare names are only referenced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RegistryCollision`] when a described tag reuses the
    /// name of an earlier tag with a different description.
    pub fn register_tag(&mut self, tag: &TagRef) -> Result<String> {
        if let TagRef::Described(tag) = tag {
            match self.tags.iter().find(|existing| existing.name == tag.name) {
                Some(existing) if existing == tag => {}
                Some(_) => {
                    return Err(Error::RegistryCollision {
                        kind: "tag",
                        name: tag.name.clone(),
                    })
                }
                None => {
                    debug!("Registering tag {}", tag.name);
                    self.tags.push(tag.clone());
                }
            }
        }
        Ok(tag.name().to_string())
    }

    /// Add operations (method -> Operation Object) under `path`.
    ///
    /// Operations for a path that already exists are merged into its
    /// path item; an operation for a method already present replaces it.
    pub fn add_path(&mut self, path: &str, operations: Map<String, Value>) {
        debug!("Adding path {} with {} operations", path, operations.len());
        match self.paths.get_mut(path) {
            Some(Value::Object(item)) => item.extend(operations),
            _ => {
                self.paths.insert(path.to_string(), Value::Object(operations));
            }
        }
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    /// Build the final OpenAPI document
    pub fn build(self) -> Result<SpecDocument> {
        debug!("Building final OpenAPI document");

        let document = OpenApiDocument {
            openapi: OPENAPI_VERSION.to_string(),
            info: self.info,
            paths: self.paths,
            components: Components {
                schemas: self.resolver.registry().to_map(),
            },
            tags: self.tags,
        };
        let value = serde_json::to_value(&document)?;
        Ok(SpecDocument { value })
    }
}

/// A finished OpenAPI document.
///
/// Immutable apart from overlay merging, which consumes the document and
/// returns the merged one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecDocument {
    value: Value,
}

impl SpecDocument {
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Deep-merge `overlay` over this document
    pub fn merged(mut self, overlay: Value) -> Self {
        deep_merge(&mut self.value, overlay);
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.value.pointer("/info/title").and_then(Value::as_str)
    }

    pub fn version(&self) -> Option<&str> {
        self.value.pointer("/info/version").and_then(Value::as_str)
    }

    pub fn path(&self, path: &str) -> Option<&Map<String, Value>> {
        self.value
            .get("paths")
            .and_then(|paths| paths.get(path))
            .and_then(Value::as_object)
    }

    pub fn operation(&self, path: &str, method: &str) -> Option<&Value> {
        self.path(path).and_then(|item| item.get(method))
    }

    pub fn schema(&self, name: &str) -> Option<&Value> {
        self.value
            .get("components")
            .and_then(|components| components.get("schemas"))
            .and_then(|schemas| schemas.get(name))
    }
}

impl From<SpecDocument> for Value {
    fn from(document: SpecDocument) -> Self {
        document.value
    }
}
