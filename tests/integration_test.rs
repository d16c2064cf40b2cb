use clap::Parser;
use openapi_from_routes::{
    cli::{self, CliArgs},
    generator::{create_spec, SpecGenerator},
    manifest::load_manifest,
    merge::{OverlaySource, ResourceRegistry},
    registry::{RouteRegistry, ViewMetadata},
    schema::{FieldMap, FieldSpec, SchemaClass},
    serializer::{serialize_json_compact, serialize_yaml},
    zone::ZoneFilter,
    Error, SpecDocument,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;

/// Path of the sample album application manifest
fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/album_app.yaml")
}

fn album_app() -> RouteRegistry {
    load_manifest(&fixture()).expect("Failed to load album app manifest")
}

fn generate(registry: &RouteRegistry, zone: &ZoneFilter, merges: &[OverlaySource]) -> SpecDocument {
    create_spec(registry, zone, merges, &ResourceRegistry::new()).expect("Failed to generate spec")
}

fn path_names(document: &SpecDocument) -> Vec<String> {
    document.as_value()["paths"]
        .as_object()
        .map(|paths| paths.keys().cloned().collect())
        .unwrap_or_default()
}

#[test]
fn test_album_app_end_to_end() {
    let document = generate(&album_app(), &ZoneFilter::all(), &[]);

    assert_eq!(document.as_value()["openapi"], "3.0.2");
    assert_eq!(document.title(), Some("Album Store"));
    assert_eq!(document.version(), Some("1.2.0"));
    assert_eq!(
        path_names(&document),
        vec![
            "/hello",
            "/validate",
            "/validate-list",
            "/marshal",
            "/list",
            "/album/{albumId}",
            "/album/hello",
            "/album/{albumId}/like",
            "/album/{albumId}/update",
            "/stats",
        ]
    );

    // One path parameter, a 200 referencing the registered schema, no request body
    assert_eq!(
        document.operation("/album/{albumId}", "get").unwrap(),
        &json!({
            "parameters": [{
                "name": "albumId",
                "description": "The ID of the album.",
                "schema": { "type": "integer" },
                "in": "path",
                "required": true
            }],
            "responses": {
                "200": {
                    "description": "",
                    "content": {
                        "application/json": { "schema": { "$ref": "#/components/schemas/Album" } }
                    }
                }
            },
            "tags": ["album"]
        })
    );

    assert_eq!(
        document.schema("Album").unwrap(),
        &json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "release_date": { "type": "string", "format": "date", "nullable": true },
                "artists": { "type": "array", "items": { "type": "string" } }
            },
            "description": "Information about an album."
        })
    );
    let schema_names: Vec<_> = document.as_value()["components"]["schemas"]
        .as_object()
        .unwrap()
        .keys()
        .cloned()
        .collect();
    assert_eq!(schema_names, vec!["Album", "PartialAlbum"]);

    assert_eq!(
        document.as_value()["tags"],
        json!([{ "name": "album", "description": "A collection of songs." }])
    );
}

#[test]
fn test_docstring_fragment_overrides_responses() {
    let document = generate(&album_app(), &ZoneFilter::all(), &[]);
    let like = document.operation("/album/{albumId}/like", "post").unwrap();

    assert_eq!(like["summary"], "Indicate that you like an album.");
    assert!(like.get("description").is_none());
    assert_eq!(
        like["responses"],
        json!({ "204": { "description": "Indicates that the like was successfully recorded.\n" } })
    );

    let marshal = document.operation("/marshal", "get").unwrap();
    assert_eq!(marshal["summary"], "Returns JSON-serialized information about the album.");
}

#[test]
fn test_validate_schema_per_method() {
    let document = generate(&album_app(), &ZoneFilter::all(), &[]);

    let get = document.operation("/validate", "get").unwrap();
    assert!(get.get("requestBody").is_none());
    assert_eq!(
        get["parameters"],
        json!([
            { "in": "query", "name": "title", "required": false, "schema": { "type": "string" } },
            {
                "in": "query",
                "name": "release_date",
                "required": false,
                "schema": { "type": "string", "format": "date", "nullable": true }
            },
            {
                "in": "query",
                "name": "artists",
                "required": false,
                "schema": { "type": "array", "items": { "type": "string" } }
            }
        ])
    );

    let post = document.operation("/validate", "post").unwrap();
    assert_eq!(
        post["requestBody"]["content"]["application/json"]["schema"],
        json!({ "$ref": "#/components/schemas/Album" })
    );

    let update = document.operation("/album/{albumId}/update", "patch").unwrap();
    assert_eq!(
        update["requestBody"]["content"]["application/json"]["schema"],
        json!({ "$ref": "#/components/schemas/PartialAlbum" })
    );
}

#[test]
fn test_inline_response_schema_with_nested_many() {
    let document = generate(&album_app(), &ZoneFilter::all(), &[]);
    let list = document.operation("/list", "get").unwrap();

    assert_eq!(
        list["responses"]["200"]["content"]["application/json"]["schema"],
        json!({
            "type": "object",
            "properties": {
                "items": { "type": "array", "items": { "$ref": "#/components/schemas/Album" } },
                "whatever": { "type": "string", "nullable": true }
            }
        })
    );
}

#[test]
fn test_default_response_synthesis() {
    let document = generate(&album_app(), &ZoneFilter::all(), &[]);
    let hello = document.operation("/hello", "get").unwrap();

    assert_eq!(hello["responses"], json!({ "200": { "description": "" } }));
    assert_eq!(hello["parameters"], json!([]));
}

#[test]
fn test_generation_is_idempotent() {
    let registry = album_app();

    let first = serialize_json_compact(&generate(&registry, &ZoneFilter::all(), &[])).unwrap();
    let second = serialize_json_compact(&generate(&registry, &ZoneFilter::all(), &[])).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_zone_filtering() {
    let registry = album_app();

    let internal = generate(&registry, &ZoneFilter::only("internal"), &[]);
    assert_eq!(path_names(&internal), vec!["/stats"]);
    assert_eq!(internal.as_value()["components"]["schemas"], json!({}));
    assert!(internal.as_value().get("tags").is_none());

    let all = generate(&registry, &ZoneFilter::all(), &[]);
    assert!(all.operation("/stats", "get").is_some());
}

#[test]
fn test_named_schema_dedup_and_collision() {
    let album = SchemaClass::new("AlbumSchema", FieldMap::new().field("title", FieldSpec::string())).shared();

    let mut registry = RouteRegistry::new();
    registry.add_route("one", "/one").add_route("two", "/two");
    registry
        .add_view(ViewMetadata::new("one").route("one").marshal(&album))
        .add_view(ViewMetadata::new("two").route("two").marshal(&album));

    let document = generate(&registry, &ZoneFilter::all(), &[]);
    assert_eq!(document.as_value()["components"]["schemas"].as_object().unwrap().len(), 1);
    for path in ["/one", "/two"] {
        assert_eq!(
            document.operation(path, "get").unwrap()["responses"]["200"]["content"]["application/json"]["schema"],
            json!({ "$ref": "#/components/schemas/Album" })
        );
    }

    let impostor = SchemaClass::new("AlbumSchema", FieldMap::new().field("name", FieldSpec::string())).shared();
    registry.add_route("three", "/three");
    registry.add_view(ViewMetadata::new("three").route("three").marshal(&impostor));

    let err = create_spec(&registry, &ZoneFilter::all(), &[], &ResourceRegistry::new()).unwrap_err();
    assert!(
        matches!(err, Error::RegistryCollision { kind: "schema", ref name } if name == "Album"),
        "unexpected error: {:?}",
        err
    );
}

#[test]
fn test_overlays_merge_mappings_and_replace_sequences() {
    let dir = TempDir::new().unwrap();
    let overlay = dir.path().join("overlay.yaml");
    std::fs::write(
        &overlay,
        r#"
info:
  description: Served by the album store.
paths:
  /album/{albumId}:
    get:
      parameters: []
components:
  securitySchemes:
    bearer: {type: http, scheme: bearer}
"#,
    )
    .unwrap();

    let mut resources = ResourceRegistry::new();
    resources.register_bytes("albumstore", "overlays/contact.yaml", "info:\n  contact: {name: Support}\n");

    let document = create_spec(
        &album_app(),
        &ZoneFilter::all(),
        &[
            OverlaySource::File(overlay),
            OverlaySource::parse("albumstore:overlays/contact.yaml"),
        ],
        &resources,
    )
    .unwrap();
    let value = document.as_value();

    assert_eq!(value["info"]["title"], "Album Store");
    assert_eq!(value["info"]["description"], "Served by the album store.");
    assert_eq!(value["info"]["contact"], json!({ "name": "Support" }));
    assert_eq!(value["paths"]["/album/{albumId}"]["get"]["parameters"], json!([]));
    assert!(value["paths"]["/album/{albumId}"]["get"]["responses"]["200"].is_object());
    assert!(value["components"]["schemas"]["Album"].is_object());
    assert_eq!(value["components"]["securitySchemes"]["bearer"]["scheme"], "bearer");
}

#[test]
fn test_missing_overlay_aborts_generation() {
    let err = create_spec(
        &album_app(),
        &ZoneFilter::all(),
        &[OverlaySource::File(PathBuf::from("/nonexistent/overlay.yaml"))],
        &ResourceRegistry::new(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::OverlayLoad { .. }));
}

#[test]
fn test_spec_generator_serves_cached_documents() {
    let generator = SpecGenerator::new(album_app());

    let first = generator.generate(&ZoneFilter::all(), &[]).unwrap();
    let again = generator.generate(&ZoneFilter::all(), &[]).unwrap();
    let internal = generator.generate(&ZoneFilter::only("internal"), &[]).unwrap();

    assert!(std::sync::Arc::ptr_eq(&first, &again));
    assert_ne!(first.as_value(), internal.as_value());
    assert_eq!(generator.cached(), 2);
}

#[test]
fn test_cli_writes_yaml_with_overrides() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out").join("openapi.yaml");
    let fixture = fixture();

    let args = CliArgs::try_parse_from([
        "openapi-from-routes",
        fixture.to_str().unwrap(),
        "--format",
        "yaml",
        "--output",
        output.to_str().unwrap(),
        "--title",
        "Overridden",
        "--zone",
        "internal",
    ])
    .unwrap();
    cli::run(cli::parse_args_from_parsed(args).unwrap()).unwrap();

    let written: serde_yaml::Value = serde_yaml::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["info"]["title"].as_str(), Some("Overridden"));
    assert_eq!(written["info"]["version"].as_str(), Some("1.2.0"));
    assert_eq!(written["paths"].as_mapping().map(|paths| paths.len()), Some(1));
}

#[test]
fn test_cli_renders_html_and_json() {
    let fixture = fixture();
    let fixture = fixture.to_str().unwrap();

    let html = cli::render(&CliArgs::try_parse_from(["openapi-from-routes", fixture, "-f", "html"]).unwrap()).unwrap();
    assert!(html.contains("<title>Album Store 1.2.0</title>"));
    assert!(html.contains("Redoc.init"));

    let pretty =
        cli::render(&CliArgs::try_parse_from(["openapi-from-routes", fixture, "--pretty"]).unwrap()).unwrap();
    let compact = cli::render(&CliArgs::try_parse_from(["openapi-from-routes", fixture]).unwrap()).unwrap();
    assert!(pretty.lines().count() > 1);
    assert_eq!(compact.lines().count(), 1);
    assert_eq!(
        serde_json::from_str::<Value>(&pretty).unwrap(),
        serde_json::from_str::<Value>(&compact).unwrap()
    );
}

#[test]
fn test_cli_loads_legacy_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("openapi.toml");
    std::fs::write(
        &config,
        format!(
            "[openapi]\nmanifest = {:?}\ntitle = \"From config\"\n",
            fixture().to_str().unwrap()
        ),
    )
    .unwrap();

    let args = CliArgs::try_parse_from(["openapi-from-routes", "--config", config.to_str().unwrap()]).unwrap();
    let document: Value = serde_json::from_str(&cli::render(&args).unwrap()).unwrap();
    assert_eq!(document["info"]["title"], "From config");
    assert_eq!(document["info"]["version"], "1.2.0");
}

#[test]
fn test_cli_rejects_bad_invocations() {
    let fixture = fixture();
    let fixture = fixture.to_str().unwrap();

    let neither = CliArgs::try_parse_from(["openapi-from-routes"]).unwrap();
    assert!(cli::parse_args_from_parsed(neither).is_err());

    let both = CliArgs::try_parse_from(["openapi-from-routes", fixture, "--config", "openapi.toml"]).unwrap();
    assert!(cli::parse_args_from_parsed(both).is_err());

    assert!(CliArgs::try_parse_from(["openapi-from-routes", fixture, "--format", "pdf"]).is_err());

    let missing_overlay =
        CliArgs::try_parse_from(["openapi-from-routes", fixture, "--merge", "/nonexistent/overlay.yaml"]).unwrap();
    assert!(cli::render(&missing_overlay).is_err());
}

#[test]
fn test_yaml_output_round_trips() {
    let document = generate(&album_app(), &ZoneFilter::all(), &[]);
    let yaml = serialize_yaml(&document).unwrap();

    let parsed: Value = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(&parsed, document.as_value());
}
