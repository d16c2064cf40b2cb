use std::path::PathBuf;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types raised while loading a registry or generating a document.
///
/// Every variant is fatal to the generation that raised it: a partially
/// correct document is never produced.
#[derive(Debug)]
pub enum Error {
    /// Missing, conflicting or malformed configuration.
    Configuration(String),
    /// A schema reference could not be turned into a schema.
    SchemaResolution { context: String, message: String },
    /// Two distinct schemas or tags claimed the same name.
    RegistryCollision { kind: &'static str, name: String },
    /// An overlay could not be read or parsed.
    OverlayLoad { source: String, message: String },
    /// The structured part of a handler doc string is not a mapping.
    InvalidDocstring { handler: String, message: String },
    /// A manifest or config file could not be read or parsed.
    Manifest { file: PathBuf, message: String },
    IoError(std::io::Error),
    SerializationError(String),
}

impl Error {
    pub(crate) fn schema(context: impl Into<String>, message: impl Into<String>) -> Self {
        Error::SchemaResolution {
            context: context.into(),
            message: message.into(),
        }
    }

    pub(crate) fn overlay(source: impl Into<String>, message: impl Into<String>) -> Self {
        Error::OverlayLoad {
            source: source.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Configuration(msg) => write!(f, "configuration error: {}", msg),
            Error::SchemaResolution { context, message } => {
                write!(f, "cannot resolve schema for {}: {}", context, message)
            }
            Error::RegistryCollision { kind, name } => write!(
                f,
                "two different {}s are registered under the name {:?}",
                kind, name
            ),
            Error::OverlayLoad { source, message } => {
                write!(f, "cannot load overlay {}: {}", source, message)
            }
            Error::InvalidDocstring { handler, message } => {
                write!(f, "invalid doc string on {}: {}", handler, message)
            }
            Error::Manifest { file, message } => {
                write!(f, "cannot load {}: {}", file.display(), message)
            }
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::SerializationError(msg) => write!(f, "serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(format!("YAML: {}", err))
    }
}
