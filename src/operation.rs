//! Builds one OpenAPI Operation Object per (path, method, view).

use crate::docstring::split_docstring;
use crate::error::{Error, Result};
use crate::merge::deep_merge;
use crate::openapi_builder::SpecAssembler;
use crate::registry::ViewMetadata;
use log::debug;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Generated part of an operation, before hand-authored fields are merged in
#[derive(Debug, Clone, Default, Serialize)]
pub struct Operation {
    /// Operation summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Operation description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Path and query parameters
    pub parameters: Vec<Value>,
    /// Request body
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses by status code
    pub responses: BTreeMap<String, Response>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, Serialize)]
pub struct RequestBody {
    /// Content types and their schemas
    pub content: BTreeMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, Serialize)]
pub struct MediaType {
    pub schema: Value,
}

/// OpenAPI Response object
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<BTreeMap<String, MediaType>>,
}

fn json_content(schema: Value) -> BTreeMap<String, MediaType> {
    BTreeMap::from([(JSON_CONTENT_TYPE.to_string(), MediaType { schema })])
}

/// Build the Operation Object for `view` answering `method` on `path`.
///
/// Generated fields come first, then the fragment from the handler's doc
/// string is merged over them, then the view's `api_spec` fragment.
///
/// # Errors
///
/// Fails on a doc string fragment that is not a mapping, on an unresolvable
/// schema and on a schema or tag name collision.
pub fn build_operation(
    spec: &mut SpecAssembler,
    path: &str,
    method: &str,
    view: &ViewMetadata,
) -> Result<Value> {
    debug!("Building operation {} {} from {}", method.to_uppercase(), path, view.callable);
    let context = format!("{} {} ({})", method.to_uppercase(), path, view.callable);

    let split = split_docstring(view.doc.as_deref()).map_err(|message| Error::InvalidDocstring {
        handler: view.callable.clone(),
        message,
    })?;

    let mut operation = Operation {
        summary: split.summary,
        description: split.description,
        ..Default::default()
    };

    let view_context = view.context.as_deref();
    if let Some(params) = view_context.and_then(|c| c.as_path_params()) {
        operation
            .parameters
            .extend(params.path_params().iter().map(|param| param.to_value()));
    }

    if let Some(schema) = &view.validate {
        if method == "get" {
            let params = spec.resolver().query_parameters(schema, &context)?;
            operation.parameters.extend(params);
        } else {
            let resolved = spec.resolver().resolve(schema, &context)?;
            operation.request_body = Some(RequestBody {
                content: json_content(resolved.schema),
            });
        }
    }

    if let Some(schema) = &view.marshal {
        let resolved = spec.resolver().resolve(schema, &context)?;
        operation.responses.insert(
            "200".to_string(),
            Response {
                description: String::new(),
                content: Some(json_content(resolved.schema)),
            },
        );
    }

    if let Some(tag) = view_context.and_then(|c| c.as_tag()).and_then(|t| t.tag()) {
        let name = spec.register_tag(tag)?;
        operation.tags.push(name);
    }

    let mut value = serde_json::to_value(&operation)?;
    deep_merge(&mut value, Value::Object(split.overrides));
    if let Some(api_spec) = &view.api_spec {
        deep_merge(&mut value, Value::Object(api_spec.clone()));
    }
    ensure_response(&mut value);
    Ok(value)
}

/// An operation must document at least one response.
fn ensure_response(operation: &mut Value) {
    let Some(operation) = operation.as_object_mut() else {
        return;
    };
    let missing = match operation.get("responses") {
        None | Some(Value::Null) => true,
        Some(Value::Object(responses)) => responses.is_empty(),
        Some(_) => false,
    };
    if missing {
        let mut responses = Map::new();
        responses.insert("200".to_string(), json!({ "description": "" }));
        operation.insert("responses".to_string(), Value::Object(responses));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{PathParam, ResourceContext, Tag, TagRef};
    use crate::schema::{FieldMap, FieldSpec, SchemaClass};
    use pretty_assertions::assert_eq;

    fn album_schema() -> std::sync::Arc<SchemaClass> {
        SchemaClass::new(
            "AlbumSchema",
            FieldMap::new()
                .field("title", FieldSpec::string())
                .field("release_date", FieldSpec::date()),
        )
        .shared()
    }

    #[test]
    fn test_default_response_is_synthesized() {
        let mut spec = SpecAssembler::new("t", "v");
        let view = ViewMetadata::new("hello");

        let operation = build_operation(&mut spec, "/hello", "get", &view).unwrap();
        assert_eq!(
            operation,
            json!({ "parameters": [], "responses": { "200": { "description": "" } } })
        );
    }

    #[test]
    fn test_path_params_and_marshal_response() {
        let mut spec = SpecAssembler::new("t", "v");
        let album = ResourceContext::new("Album")
            .path("/album/{albumId}")
            .param(PathParam::new("albumId", json!({ "type": "integer" })))
            .shared();
        let view = ViewMetadata::new("get_album")
            .context(album)
            .marshal(album_schema())
            .doc("Return one album.");

        let operation = build_operation(&mut spec, "/album/{albumId}", "get", &view).unwrap();
        assert_eq!(
            operation,
            json!({
                "summary": "Return one album.",
                "parameters": [
                    { "name": "albumId", "schema": { "type": "integer" }, "in": "path", "required": true }
                ],
                "responses": {
                    "200": {
                        "description": "",
                        "content": {
                            "application/json": { "schema": { "$ref": "#/components/schemas/Album" } }
                        }
                    }
                }
            })
        );
        assert!(operation.get("requestBody").is_none());
    }

    #[test]
    fn test_validate_on_post_is_request_body() {
        let mut spec = SpecAssembler::new("t", "v");
        let view = ViewMetadata::new("create").validate(album_schema());

        let operation = build_operation(&mut spec, "/album", "post", &view).unwrap();
        assert_eq!(
            operation["requestBody"],
            json!({ "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Album" } } } })
        );
    }

    #[test]
    fn test_validate_on_get_is_query_parameters() {
        let mut spec = SpecAssembler::new("t", "v");
        let view = ViewMetadata::new("search")
            .validate(FieldMap::new().field("q", FieldSpec::string().required()));

        let operation = build_operation(&mut spec, "/search", "get", &view).unwrap();
        assert_eq!(
            operation["parameters"],
            json!([{ "in": "query", "name": "q", "required": true, "schema": { "type": "string" } }])
        );
        assert!(operation.get("requestBody").is_none());
    }

    #[test]
    fn test_docstring_overrides_then_api_spec_win() {
        let mut spec = SpecAssembler::new("t", "v");
        let mut api_spec = Map::new();
        api_spec.insert("summary".into(), json!("From api_spec"));
        let view = ViewMetadata::new("like")
            .doc("Like an album.\n---\nsummary: From doc\nresponses:\n  204:\n    description: Recorded.\n")
            .api_spec(api_spec);

        let operation = build_operation(&mut spec, "/album/like", "post", &view).unwrap();
        assert_eq!(operation["summary"], "From api_spec");
        assert_eq!(
            operation["responses"],
            json!({ "204": { "description": "Recorded." } })
        );
    }

    #[test]
    fn test_override_keeps_generated_parameters_it_does_not_mention() {
        let mut spec = SpecAssembler::new("t", "v");
        let context = ResourceContext::new("Album")
            .param(PathParam::new("albumId", json!({ "type": "integer" })))
            .shared();
        let view = ViewMetadata::new("get_album")
            .context(context)
            .doc("Get.\n---\ndeprecated: true\n");

        let operation = build_operation(&mut spec, "/album/{albumId}", "get", &view).unwrap();
        assert_eq!(operation["deprecated"], true);
        assert_eq!(operation["parameters"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_context_tag_is_registered() {
        let mut spec = SpecAssembler::new("t", "v");
        let context = ResourceContext::new("Album")
            .tagged(TagRef::Described(Tag {
                name: "album".to_string(),
                description: None,
            }))
            .shared();
        let view = ViewMetadata::new("get_album").context(context);

        let operation = build_operation(&mut spec, "/album", "get", &view).unwrap();
        assert_eq!(operation["tags"], json!(["album"]));
        let document = spec.build().unwrap();
        assert_eq!(document.as_value()["tags"], json!([{ "name": "album" }]));
    }

    #[test]
    fn test_invalid_docstring_fragment_names_handler() {
        let mut spec = SpecAssembler::new("t", "v");
        let view = ViewMetadata::new("broken").doc("Broken.\n---\n- not\n- a mapping\n");

        let err = build_operation(&mut spec, "/broken", "get", &view).unwrap_err();
        match err {
            Error::InvalidDocstring { handler, .. } => assert_eq!(handler, "broken"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
