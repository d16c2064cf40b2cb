//! Route and view registry consumed by the generator.
//!
//! The registry is the read-only picture of an application's routing: named
//! routes with URL patterns, and the views bound to them. A view is found
//! either through a named route or through a traversal [`Context`] that
//! knows its own base path.
//!
//! # Example
//!
//! ```
//! use openapi_from_routes::registry::{RouteRegistry, ViewMetadata};
//!
//! let mut registry = RouteRegistry::new();
//! registry.add_route("hello", "/hello");
//! registry.add_view(ViewMetadata::new("hello_world").route("hello").doc("Say hello."));
//! assert_eq!(registry.views().len(), 1);
//! ```

use crate::schema::SchemaRef;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt::Debug;
use std::sync::Arc;

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_VERSION: &str = "0.0.0";

/// Application-level settings read by the generator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    /// `openapi.title`
    pub title: Option<String>,
    /// `openapi.version`
    pub version: Option<String>,
    /// `openapi.merge`: overlay sources applied after any requested ones
    pub merge: Vec<String>,
}

impl Settings {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_TITLE)
    }

    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or(DEFAULT_VERSION)
    }

    /// Parse the comma separated form of `openapi.merge`
    pub fn parse_merge_list(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// A named route and its URL pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: String,
    pub pattern: String,
}

/// HTTP methods a view answers to, as declared.
///
/// A single method is kept distinct from a list so that `"POST"` can never be
/// mistaken for the characters `P`, `O`, `S`, `T`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestMethods {
    /// Not declared: the view answers GET
    #[default]
    Unspecified,
    One(String),
    Many(Vec<String>),
}

impl RequestMethods {
    /// Lower-cased method names in declaration order. Falls back to `get`
    /// when nothing is declared.
    pub fn normalized(&self) -> Vec<String> {
        let methods: Vec<String> = match self {
            RequestMethods::Unspecified => Vec::new(),
            RequestMethods::One(method) => vec![method.to_lowercase()],
            RequestMethods::Many(methods) => methods.iter().map(|m| m.to_lowercase()).collect(),
        };
        if methods.is_empty() {
            vec!["get".to_string()]
        } else {
            methods
        }
    }
}

impl From<&str> for RequestMethods {
    fn from(method: &str) -> Self {
        RequestMethods::One(method.to_string())
    }
}

impl<const N: usize> From<[&str; N]> for RequestMethods {
    fn from(methods: [&str; N]) -> Self {
        RequestMethods::Many(methods.iter().map(|m| m.to_string()).collect())
    }
}

/// A path parameter declared by a traversal context
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PathParam {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "string_schema")]
    pub schema: Value,
    /// Any further parameter fields, emitted as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn string_schema() -> Value {
    json!({ "type": "string" })
}

impl PathParam {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            description: None,
            schema,
            extra: Map::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Render as an OpenAPI parameter; path parameters are always required
    pub fn to_value(&self) -> Value {
        let mut param = Map::new();
        param.insert("name".into(), json!(self.name));
        if let Some(description) = &self.description {
            param.insert("description".into(), json!(description));
        }
        param.insert("schema".into(), self.schema.clone());
        for (key, value) in &self.extra {
            param.insert(key.clone(), value.clone());
        }
        param.insert("in".into(), json!("path"));
        param.insert("required".into(), json!(true));
        Value::Object(param)
    }
}

/// An entry of the document's tag list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Tag a context puts on its operations: a bare name, or a tag that is also
/// registered in the document's tag list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagRef {
    Name(String),
    Described(Tag),
}

impl TagRef {
    pub fn name(&self) -> &str {
        match self {
            TagRef::Name(name) => name,
            TagRef::Described(tag) => &tag.name,
        }
    }
}

/// Capability: a context that contributes path parameters
pub trait HasPathParams {
    fn path_params(&self) -> &[PathParam];
}

/// Capability: a context that tags its operations
pub trait HasTag {
    fn tag(&self) -> Option<&TagRef>;
}

/// A traversal context a view is bound to.
///
/// Capabilities are queried explicitly; a context that does not provide one
/// simply returns `None`.
pub trait Context: Debug + Send + Sync {
    fn name(&self) -> &str;

    /// URL template of the resource, used to derive view paths
    fn base_path(&self) -> Option<&str> {
        None
    }

    fn as_path_params(&self) -> Option<&dyn HasPathParams> {
        None
    }

    fn as_tag(&self) -> Option<&dyn HasTag> {
        None
    }
}

/// A plain context value carrying a path, parameters and a tag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceContext {
    pub name: String,
    pub path: Option<String>,
    pub params: Vec<PathParam>,
    pub tag: Option<TagRef>,
}

impl ResourceContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn param(mut self, param: PathParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn tagged(mut self, tag: TagRef) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn shared(self) -> Arc<dyn Context> {
        Arc::new(self)
    }
}

impl HasPathParams for ResourceContext {
    fn path_params(&self) -> &[PathParam] {
        &self.params
    }
}

impl HasTag for ResourceContext {
    fn tag(&self) -> Option<&TagRef> {
        self.tag.as_ref()
    }
}

impl Context for ResourceContext {
    fn name(&self) -> &str {
        &self.name
    }

    fn base_path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    fn as_path_params(&self) -> Option<&dyn HasPathParams> {
        Some(self)
    }

    fn as_tag(&self) -> Option<&dyn HasTag> {
        Some(self)
    }
}

/// Everything the generator reads about one registered view
#[derive(Debug, Clone, Default)]
pub struct ViewMetadata {
    /// Handler identity, used in logs and error messages
    pub callable: String,
    /// Handler documentation string
    pub doc: Option<String>,
    pub route_name: Option<String>,
    pub context: Option<Arc<dyn Context>>,
    /// View name appended to the context path
    pub name: Option<String>,
    pub request_methods: RequestMethods,
    /// Request schema
    pub validate: Option<SchemaRef>,
    /// Response schema
    pub marshal: Option<SchemaRef>,
    pub api_zone: Option<String>,
    /// Hand-authored operation fields with the highest precedence
    pub api_spec: Option<Map<String, Value>>,
}

impl ViewMetadata {
    pub fn new(callable: impl Into<String>) -> Self {
        Self {
            callable: callable.into(),
            ..Default::default()
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn route(mut self, route_name: impl Into<String>) -> Self {
        self.route_name = Some(route_name.into());
        self
    }

    pub fn context(mut self, context: Arc<dyn Context>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn methods(mut self, methods: impl Into<RequestMethods>) -> Self {
        self.request_methods = methods.into();
        self
    }

    pub fn validate(mut self, schema: impl Into<SchemaRef>) -> Self {
        self.validate = Some(schema.into());
        self
    }

    pub fn marshal(mut self, schema: impl Into<SchemaRef>) -> Self {
        self.marshal = Some(schema.into());
        self
    }

    pub fn zone(mut self, zone: impl Into<String>) -> Self {
        self.api_zone = Some(zone.into());
        self
    }

    pub fn api_spec(mut self, fragment: Map<String, Value>) -> Self {
        self.api_spec = Some(fragment);
        self
    }
}

/// Routes, views and settings of one application
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    settings: Settings,
    routes: Vec<Route>,
    views: Vec<ViewMetadata>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Add a named route. Re-adding a name replaces its pattern.
    pub fn add_route(&mut self, name: impl Into<String>, pattern: impl Into<String>) -> &mut Self {
        let route = Route {
            name: name.into(),
            pattern: pattern.into(),
        };
        match self.routes.iter_mut().find(|existing| existing.name == route.name) {
            Some(existing) => *existing = route,
            None => self.routes.push(route),
        }
        self
    }

    /// Add a view; views are kept in registration order.
    pub fn add_view(&mut self, view: ViewMetadata) -> &mut Self {
        self.views.push(view);
        self
    }

    pub fn route(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.name == name)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn views(&self) -> &[ViewMetadata] {
        &self.views
    }
}
