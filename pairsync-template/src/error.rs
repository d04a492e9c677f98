//! Error types for pairsync-template.

use std::path::PathBuf;

use thiserror::Error;

use pairsync_core::TemplateError;

/// All errors that can arise from loading or rendering a pair template.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Tera template engine error, tagged with the expression that failed.
    #[error("template '{name}': {message}")]
    Tera { name: String, message: String },

    /// JSON serialization error (building tera context).
    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while loading the template file.
    #[error("template io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The template file is not valid YAML or misses a required key.
    #[error("failed to parse template at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A dotted override path collides with a non-object value.
    #[error("cannot set '{field}': '{blocked_by}' is not an object")]
    Shape { field: String, blocked_by: String },
}

impl RenderError {
    /// Wrap a tera error, flattening its cause chain into the message.
    pub(crate) fn tera(name: &str, err: tera::Error) -> Self {
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        RenderError::Tera {
            name: name.to_string(),
            message,
        }
    }
}

impl From<RenderError> for TemplateError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Tera { name, message } => TemplateError::Render { name, message },
            RenderError::Shape { field, .. } => TemplateError::Shape {
                field,
                expected: "a path through objects",
            },
            other => TemplateError::Hook(other.to_string()),
        }
    }
}
