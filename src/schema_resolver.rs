use crate::error::{Error, Result};
use crate::schema::{FieldKind, FieldMap, FieldSpec, SchemaClass, SchemaHandle, SchemaRef};
use log::debug;
use serde_json::{json, Map, Value};
use std::sync::Arc;

const SCHEMA_SUFFIX: &str = "Schema";
const COMPONENT_PREFIX: &str = "#/components/schemas/";

/// Schema resolver - turns schema references into OpenAPI schema objects
pub struct SchemaResolver {
    /// Named schemas emitted as components, in first-use order
    registry: SchemaRegistry,
}

/// A resolved schema reference
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSchema {
    /// Component name when the schema was registered, `None` when inlined
    pub name: Option<String>,
    /// Either a `$ref` to the component or the inline schema object
    pub schema: Value,
}

/// Registry of named schemas for `components.schemas`.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    entries: Vec<RegistryEntry>,
}

#[derive(Debug)]
struct RegistryEntry {
    name: String,
    class: Arc<SchemaClass>,
    partial: bool,
    /// `None` while the entry's own fields are being resolved
    schema: Option<Value>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names in first-use order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .and_then(|entry| entry.schema.as_ref())
    }

    fn lookup(&self, handle: &SchemaHandle) -> Option<&RegistryEntry> {
        self.entries
            .iter()
            .find(|entry| handle.same_class(&entry.class) && entry.partial == handle.is_partial())
    }

    /// Claim `name` for the handle's class. Fails if a different class (or
    /// the other partial variant) already holds the name.
    fn reserve(&mut self, name: &str, handle: &SchemaHandle) -> Result<()> {
        if self.entries.iter().any(|entry| entry.name == name) {
            return Err(Error::RegistryCollision {
                kind: "schema",
                name: name.to_string(),
            });
        }
        self.entries.push(RegistryEntry {
            name: name.to_string(),
            class: Arc::clone(handle.class()),
            partial: handle.is_partial(),
            schema: None,
        });
        Ok(())
    }

    fn fill(&mut self, name: &str, schema: Value) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.name == name) {
            entry.schema = Some(schema);
        }
    }

    /// Render as the `components.schemas` mapping
    pub fn to_map(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .filter_map(|entry| {
                entry
                    .schema
                    .as_ref()
                    .map(|schema| (entry.name.clone(), schema.clone()))
            })
            .collect()
    }
}

/// Compute the component name for a schema use, or `None` when the use must
/// be inlined.
///
/// Subsets and classes marked unregistered are always inlined so they never
/// shadow the full schema's component. A trailing `Schema` is dropped from
/// the class name and partial uses are prefixed with `Partial`.
pub fn display_name(handle: &SchemaHandle) -> Option<String> {
    let class = handle.class();
    if !class.is_registrable() || handle.only_fields().is_some() {
        return None;
    }
    let name = class.name();
    let base = match name.strip_suffix(SCHEMA_SUFFIX) {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => name,
    };
    if handle.is_partial() {
        Some(format!("Partial{}", base))
    } else {
        Some(base.to_string())
    }
}

fn reference(name: &str) -> Value {
    json!({ "$ref": format!("{}{}", COMPONENT_PREFIX, name) })
}

fn array_of(items: Value) -> Value {
    json!({ "type": "array", "items": items })
}

impl SchemaResolver {
    pub fn new() -> Self {
        debug!("Initializing SchemaResolver");
        Self {
            registry: SchemaRegistry::new(),
        }
    }

    /// Resolve a schema reference for use at `context` (used in error messages).
    pub fn resolve(&mut self, schema_ref: &SchemaRef, context: &str) -> Result<ResolvedSchema> {
        match schema_ref {
            SchemaRef::Inline(fields) => {
                debug!("Inlining one-off schema with {} fields for {}", fields.len(), context);
                let schema = self.object_schema(fields.iter(), false, None, context)?;
                Ok(ResolvedSchema { name: None, schema })
            }
            SchemaRef::Named(handle) => {
                let (name, schema) = match display_name(handle) {
                    Some(name) => {
                        let schema = self.register(&name, handle, context)?;
                        (Some(name), schema)
                    }
                    None => {
                        debug!("Inlining {} for {}", handle.class().name(), context);
                        let fields = active_fields(handle, context)?;
                        let schema = self.object_schema(
                            fields.into_iter(),
                            handle.is_partial(),
                            handle.class().description(),
                            context,
                        )?;
                        (None, schema)
                    }
                };
                let schema = if handle.is_many() { array_of(schema) } else { schema };
                Ok(ResolvedSchema { name, schema })
            }
        }
    }

    /// Expand a request schema into one `in: query` parameter per active field.
    pub fn query_parameters(&mut self, schema_ref: &SchemaRef, context: &str) -> Result<Vec<Value>> {
        let (fields, partial): (Vec<(&str, &FieldSpec)>, bool) = match schema_ref {
            SchemaRef::Inline(fields) => (fields.iter().collect(), false),
            SchemaRef::Named(handle) => (active_fields(handle, context)?, handle.is_partial()),
        };

        let mut parameters = Vec::with_capacity(fields.len());
        for (name, spec) in fields {
            let mut parameter = Map::new();
            parameter.insert("in".into(), json!("query"));
            parameter.insert("name".into(), json!(name));
            parameter.insert("required".into(), json!(spec.required && !partial));
            parameter.insert("schema".into(), self.field_schema(spec, context)?);
            if let Some(description) = &spec.description {
                parameter.insert("description".into(), json!(description));
            }
            parameters.push(Value::Object(parameter));
        }
        Ok(parameters)
    }

    /// Register a named schema (on first use) and return a reference to it
    fn register(&mut self, name: &str, handle: &SchemaHandle, context: &str) -> Result<Value> {
        if let Some(entry) = self.registry.lookup(handle) {
            debug!("Schema {} already registered", entry.name);
            return Ok(reference(&entry.name));
        }

        debug!("Registering schema {} as {}", handle.class().name(), name);
        self.registry.reserve(name, handle)?;
        let class = Arc::clone(handle.class());
        let schema = self.object_schema(
            class.fields().iter(),
            handle.is_partial(),
            class.description(),
            context,
        )?;
        self.registry.fill(name, schema);
        Ok(reference(name))
    }

    fn object_schema<'f>(
        &mut self,
        fields: impl Iterator<Item = (&'f str, &'f FieldSpec)>,
        partial: bool,
        description: Option<&str>,
        context: &str,
    ) -> Result<Value> {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for (name, spec) in fields {
            properties.insert(name.to_string(), self.field_schema(spec, context)?);
            if spec.required && !partial {
                required.push(Value::String(name.to_string()));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), Value::Array(required));
        }
        if let Some(description) = description {
            schema.insert("description".into(), json!(description));
        }
        Ok(Value::Object(schema))
    }

    /// Convert one field declaration to its schema
    fn field_schema(&mut self, spec: &FieldSpec, context: &str) -> Result<Value> {
        let schema = match &spec.kind {
            FieldKind::String => json!({ "type": "string" }),
            FieldKind::Integer => json!({ "type": "integer" }),
            FieldKind::Float => json!({ "type": "number" }),
            FieldKind::Boolean => json!({ "type": "boolean" }),
            FieldKind::Date => json!({ "type": "string", "format": "date" }),
            FieldKind::DateTime => json!({ "type": "string", "format": "date-time" }),
            FieldKind::Dict => json!({ "type": "object" }),
            FieldKind::Raw => json!({}),
            FieldKind::List(inner) => array_of(self.field_schema(inner, context)?),
            FieldKind::Nested { schema, many } => {
                let resolved = self.resolve(schema, context)?.schema;
                if *many {
                    array_of(resolved)
                } else {
                    resolved
                }
            }
        };
        Ok(decorate(schema, spec))
    }

    /// Get the named schemas registered so far
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }
}

impl Default for SchemaResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// The fields a handle exposes, honouring an `only` subset.
fn active_fields<'h>(handle: &'h SchemaHandle, context: &str) -> Result<Vec<(&'h str, &'h FieldSpec)>> {
    let fields: &FieldMap = handle.class().fields();
    let Some(only) = handle.only_fields() else {
        return Ok(fields.iter().collect());
    };

    if let Some(unknown) = only.iter().find(|name| fields.get(name).is_none()) {
        return Err(Error::schema(
            context,
            format!(
                "field {:?} selected with `only` is not declared on {}",
                unknown,
                handle.class().name()
            ),
        ));
    }
    Ok(fields
        .iter()
        .filter(|(name, _)| only.iter().any(|selected| selected == name))
        .collect())
}

/// Apply nullability and description. Siblings of `$ref` are ignored by
/// OpenAPI 3.0, so a reference is wrapped in `allOf` first.
fn decorate(schema: Value, spec: &FieldSpec) -> Value {
    if !spec.allow_none && spec.description.is_none() {
        return schema;
    }
    let mut object = match schema {
        Value::Object(map) if !map.contains_key("$ref") => map,
        other => {
            let mut wrapper = Map::new();
            wrapper.insert("allOf".into(), json!([other]));
            wrapper
        }
    };
    if spec.allow_none {
        object.insert("nullable".into(), json!(true));
    }
    if let Some(description) = &spec.description {
        object.insert("description".into(), json!(description));
    }
    Value::Object(object)
}
