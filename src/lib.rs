//! OpenAPI from routes - OpenAPI documents generated from an application's route registry.
//!
//! This library walks a registry of routes and views, reads the request and
//! response schemas attached to each view, and assembles a single OpenAPI
//! 3.0 document. Handler doc strings may carry a YAML fragment after a `---`
//! line that is merged over the generated operation, and whole documents can
//! be overlaid on the result.
//!
//! # Architecture
//!
//! The library is organized into several modules that work together:
//!
//! 1. [`registry`] - Routes, views, traversal contexts and settings
//! 2. [`schema`] - Schema classes, field declarations and schema references
//! 3. [`walker`] - Groups views by the path they serve
//! 4. [`docstring`] - Splits doc strings into summary, description and fragment
//! 5. [`schema_resolver`] - Converts schema references to OpenAPI schemas and registers named ones
//! 6. [`operation`] - Builds one Operation Object per path and method
//! 7. [`openapi_builder`] - Assembles paths, schemas and tags into the document
//! 8. [`merge`] - Deep merge and overlay loading
//! 9. [`generator`] - Ties the above together, with a memoizing generator
//! 10. [`serializer`] - Renders the document as JSON, YAML or HTML
//! 11. [`manifest`] - Loads a registry from a YAML/JSON manifest or TOML config
//! 12. [`zone`] - Restricts generation to one API zone
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_routes::{
//!     generator::create_spec,
//!     merge::{OverlaySource, ResourceRegistry},
//!     registry::{PathParam, ResourceContext, RouteRegistry, ViewMetadata},
//!     schema::{FieldMap, FieldSpec, SchemaClass},
//!     serializer::serialize_yaml,
//!     zone::ZoneFilter,
//! };
//! use serde_json::json;
//!
//! let album = SchemaClass::new(
//!     "AlbumSchema",
//!     FieldMap::new()
//!         .field("title", FieldSpec::string().required())
//!         .field("release_date", FieldSpec::date()),
//! )
//! .shared();
//!
//! let context = ResourceContext::new("Album")
//!     .param(PathParam::new("albumId", json!({ "type": "integer" })))
//!     .shared();
//!
//! let mut registry = RouteRegistry::new();
//! registry.add_route("album", "/album/{albumId}");
//! registry.add_view(
//!     ViewMetadata::new("get_album")
//!         .route("album")
//!         .context(context)
//!         .marshal(&album)
//!         .doc("Return one album."),
//! );
//!
//! // Generate, then merge an overlay from disk
//! let document = create_spec(
//!     &registry,
//!     &ZoneFilter::all(),
//!     &[OverlaySource::parse("overlays/security.yaml")],
//!     &ResourceRegistry::new(),
//! )
//! .unwrap();
//!
//! // Serialize to YAML
//! let yaml = serialize_yaml(&document).unwrap();
//! println!("{}", yaml);
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod cli;
pub mod docstring;
pub mod error;
pub mod generator;
pub mod manifest;
pub mod merge;
pub mod openapi_builder;
pub mod operation;
pub mod registry;
pub mod schema;
pub mod schema_resolver;
pub mod serializer;
pub mod walker;
pub mod zone;

pub use error::{Error, Result};
pub use generator::{create_spec, SpecGenerator};
pub use openapi_builder::SpecDocument;
