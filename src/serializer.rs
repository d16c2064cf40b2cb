//! Serialization module for rendering OpenAPI documents as JSON, YAML or a
//! standalone HTML page.
//!
//! This module provides functions to serialize generated documents into
//! standard formats and write them to files or return them as strings.

use crate::openapi_builder::SpecDocument;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Serializes an OpenAPI document to YAML format.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Example
///
/// ```
/// use openapi_from_routes::openapi_builder::SpecAssembler;
/// use openapi_from_routes::serializer::serialize_yaml;
///
/// let doc = SpecAssembler::new("Albums", "1.0.0").build().unwrap();
/// let yaml = serialize_yaml(&doc).unwrap();
/// assert!(yaml.contains("title: Albums"));
/// ```
pub fn serialize_yaml(doc: &SpecDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    serde_yaml::to_string(doc.as_value()).context("Failed to serialize OpenAPI document to YAML")
}

/// Serializes an OpenAPI document to JSON format with pretty printing.
///
/// The output is formatted with indentation for readability, making it suitable
/// for human review and version control.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json(doc: &SpecDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON");
    serde_json::to_string_pretty(doc.as_value()).context("Failed to serialize OpenAPI document to JSON")
}

/// Serializes an OpenAPI document to single-line JSON.
///
/// Key order follows the document, so two generations from the same registry
/// produce byte-identical output.
pub fn serialize_json_compact(doc: &SpecDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to compact JSON");
    serde_json::to_string(doc.as_value()).context("Failed to serialize OpenAPI document to JSON")
}

fn html_page(title: &str, version: &str, spec: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
    <head>
        <title>{title} {version}</title>
        <meta charset="utf-8">
        <meta name="viewport" content="width=device-width, initial-scale=1">
        <link href="https://fonts.googleapis.com/css?family=Montserrat:300,400,700|Roboto:300,400,700" rel="stylesheet">
        <style>
            body {{
                margin: 0;
                padding: 0;
            }}
        </style>
    </head>
    <body>
        <div id="redoc"></div>
        <script type="text/json" id="spec">{spec}</script>
        <script src="https://cdn.jsdelivr.net/npm/redoc@next/bundles/redoc.standalone.js"></script>
        <script>
            window.addEventListener('load', function() {{
                var el = document.getElementById('redoc');
                var spec = JSON.parse(document.getElementById('spec').text);
                Redoc.init(spec, {{}}, el);
            }});
        </script>
    </body>
</html>
"#
    )
}

/// Renders a self-contained HTML page that shows the document with Redoc.
///
/// The JSON document is embedded in a `<script type="text/json">` element.
/// Every `<` in it is written as `\u003c`, which is the same string to a JSON
/// parser but cannot open or close markup inside the script element.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized to JSON.
pub fn render_html(doc: &SpecDocument) -> Result<String> {
    debug!("Rendering OpenAPI document as HTML");
    // `<` only occurs inside JSON strings, where `\u003c` decodes to the same text.
    let spec = serialize_json_compact(doc)?.replace('<', "\\u003c");
    let title = escape_html(doc.title().unwrap_or_default());
    let version = escape_html(doc.version().unwrap_or_default());

    Ok(html_page(&title, &version, &spec))
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Writes string content to a file.
///
/// Creates the file if it doesn't exist, or overwrites it if it does.
/// Parent directories are created as needed.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content).with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openapi_builder::SpecAssembler;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    /// Helper function to create a minimal OpenAPI document for testing
    fn create_test_document() -> SpecDocument {
        SpecAssembler::new("Test API", "1.0.0")
            .build()
            .unwrap()
            .merged(json!({
                "paths": {
                    "/users": {
                        "get": {
                            "summary": "List users",
                            "parameters": [],
                            "responses": { "200": { "description": "" } }
                        }
                    }
                }
            }))
    }

    #[test]
    fn test_serialize_yaml() {
        let yaml = serialize_yaml(&create_test_document()).unwrap();

        assert!(yaml.contains("openapi: 3.0.2"));
        assert!(yaml.contains("title: Test API"));
        assert!(yaml.contains("/users:"));

        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed["info"]["version"].as_str(), Some("1.0.0"));
    }

    #[test]
    fn test_serialize_json() {
        let doc = create_test_document();
        let json = serialize_json(&doc).unwrap();

        assert!(json.contains("\"openapi\": \"3.0.2\""));
        assert!(json.contains('\n'));
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(&parsed, doc.as_value());
    }

    #[test]
    fn test_compact_json_keeps_document_order() {
        let json = serialize_json_compact(&create_test_document()).unwrap();

        assert!(!json.contains('\n'));
        assert!(json.starts_with(r#"{"openapi":"3.0.2","info":{"title":"Test API","version":"1.0.0"},"paths""#));
    }

    #[test]
    fn test_render_html_embeds_escaped_spec() {
        let doc = create_test_document().merged(json!({
            "info": { "title": "Tom & <Jerry>", "description": "</script><script>alert(1)" },
            "x-note": "<!--<script>"
        }));
        let html = render_html(&doc).unwrap();

        assert!(html.contains("<title>Tom &amp; &lt;Jerry&gt; 1.0.0</title>"));
        assert!(html.contains("<script type=\"text/json\" id=\"spec\">"));
        assert!(html.contains("redoc.standalone.js"));
        assert!(!html.contains("</script><script>alert(1)"));
        assert!(html.contains("\\u003c/script>\\u003cscript>alert(1)"));
        assert!(html.contains("\\u003c!--\\u003cscript>"));

        let start = html.find("id=\"spec\">").unwrap() + "id=\"spec\">".len();
        let end = start + html[start..].find("</script>").unwrap();
        assert!(!html[start..end].contains('<'));
        let embedded: Value = serde_json::from_str(&html[start..end]).unwrap();
        assert_eq!(&embedded, doc.as_value());
    }

    #[test]
    fn test_write_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("openapi.json");

        write_to_file("{}", &file_path).unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "{}");
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("nested").join("dir").join("openapi.yaml");

        write_to_file("openapi: 3.0.2\n", &file_path).unwrap();
        assert!(file_path.exists());
    }

    #[test]
    fn test_write_to_file_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("openapi.json");

        write_to_file("first", &file_path).unwrap();
        write_to_file("second", &file_path).unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "second");
    }
}
