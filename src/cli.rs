use crate::error::Error;
use crate::generator::create_spec;
use crate::manifest::{load_config, load_manifest};
use crate::merge::{OverlaySource, ResourceRegistry};
use crate::registry::RouteRegistry;
use crate::serializer::{render_html, serialize_json, serialize_json_compact, serialize_yaml, write_to_file};
use crate::zone::ZoneFilter;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Output destination meaning standard output
pub const STDOUT: &str = "-";

/// OpenAPI from routes - Generate an OpenAPI document from an application's route registry
#[derive(Parser, Debug)]
#[command(name = "openapi-from-routes")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Application manifest (YAML or JSON)
    #[arg(value_name = "APP")]
    pub app: Option<PathBuf>,

    /// Load the application through a TOML config file instead
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Only document views in this API zone
    #[arg(long = "zone", value_name = "ZONE")]
    pub zone: Option<String>,

    /// Document to merge over the generated one; a path or `package:path` (repeatable)
    #[arg(long = "merge", value_name = "SOURCE")]
    pub merge: Vec<String>,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Output file path, `-` for stdout
    #[arg(short = 'o', long = "output", value_name = "FILE", default_value = STDOUT)]
    pub output_path: PathBuf,

    /// Override the document title
    #[arg(long = "title")]
    pub title: Option<String>,

    /// Override the document version
    #[arg(long = "api-version", value_name = "VERSION")]
    pub api_version: Option<String>,

    /// Indent JSON output
    #[arg(long = "pretty")]
    pub pretty: bool,

    /// Directory holding the resources of a package (repeatable)
    #[arg(long = "resource-root", value_name = "PACKAGE=DIR")]
    pub resource_roots: Vec<String>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Standalone HTML page rendered with Redoc
    Html,
}

/// Where the application comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppSource {
    Manifest(PathBuf),
    Config(PathBuf),
}

impl CliArgs {
    /// The application source; exactly one of APP and `--config` must be given.
    pub fn app_source(&self) -> Result<AppSource, Error> {
        match (&self.app, &self.config) {
            (Some(_), Some(_)) => Err(Error::Configuration(
                "cannot specify both APP and --config".to_string(),
            )),
            (Some(app), None) => Ok(AppSource::Manifest(app.clone())),
            (None, Some(config)) => Ok(AppSource::Config(config.clone())),
            (None, None) => Err(Error::Configuration(
                "must specify one of APP or --config".to_string(),
            )),
        }
    }

    /// Parse `--resource-root PACKAGE=DIR` values
    pub fn resource_registry(&self) -> Result<ResourceRegistry, Error> {
        let mut resources = ResourceRegistry::new();
        for root in &self.resource_roots {
            match root.split_once('=') {
                Some((package, dir)) if !package.is_empty() && !dir.is_empty() => {
                    resources.register_dir(package, dir);
                }
                _ => {
                    return Err(Error::Configuration(format!(
                        "invalid resource root {:?}, expected PACKAGE=DIR",
                        root
                    )))
                }
            }
        }
        Ok(resources)
    }

    pub fn overlay_sources(&self) -> Vec<OverlaySource> {
        self.merge.iter().map(|source| OverlaySource::parse(source)).collect()
    }

    pub fn writes_to_stdout(&self) -> bool {
        self.output_path.as_os_str() == STDOUT
    }
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    match args.app_source()? {
        AppSource::Manifest(path) => info!("Application manifest: {}", path.display()),
        AppSource::Config(path) => info!("Config file: {}", path.display()),
    }
    args.resource_registry()?;

    info!("Output format: {:?}", args.output_format);
    if args.writes_to_stdout() {
        info!("Output: stdout");
    } else {
        info!("Output file: {}", args.output_path.display());
    }
    match &args.zone {
        Some(zone) => info!("Zone: {}", zone),
        None => info!("Zone: all"),
    }
    if !args.merge.is_empty() {
        info!("Merging: {}", args.merge.join(", "));
    }

    Ok(args)
}

/// Load the application the arguments point at, with title and version overrides applied
pub fn load_registry(args: &CliArgs) -> Result<RouteRegistry> {
    let mut registry = match args.app_source()? {
        AppSource::Manifest(path) => load_manifest(&path)?,
        AppSource::Config(path) => load_config(&path)?,
    };
    let settings = registry.settings_mut();
    if let Some(title) = &args.title {
        settings.title = Some(title.clone());
    }
    if let Some(version) = &args.api_version {
        settings.version = Some(version.clone());
    }
    Ok(registry)
}

/// Generate and serialize the document without writing it anywhere
pub fn render(args: &CliArgs) -> Result<String> {
    // Step 1: Load the application
    let registry = load_registry(args)?;
    info!(
        "Loaded {} routes and {} views",
        registry.routes().len(),
        registry.views().len()
    );

    // Step 2: Generate the document, overlays included
    let zone = ZoneFilter::from(args.zone.clone());
    let resources = args.resource_registry()?;
    let document = create_spec(&registry, &zone, &args.overlay_sources(), &resources)?;
    info!("OpenAPI document built successfully");

    // Step 3: Serialize to requested format
    info!("Serializing to {:?} format...", args.output_format);
    let content = match args.output_format {
        OutputFormat::Json if args.pretty => serialize_json(&document)?,
        OutputFormat::Json => serialize_json_compact(&document)?,
        OutputFormat::Yaml => serialize_yaml(&document)?,
        OutputFormat::Html => render_html(&document)?,
    };
    Ok(content)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");

    let content = render(&args)?;

    // Output to file or stdout
    if args.writes_to_stdout() {
        println!("{}", content);
    } else {
        let output_path: &Path = &args.output_path;
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
        info!("Successfully wrote OpenAPI document to {}", output_path.display());
    }

    info!("Generation complete!");
    Ok(())
}
