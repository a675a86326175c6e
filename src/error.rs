//! Error types for schema generation and prompt rendering.

/// Schema serialization errors
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Failed to serialize schema: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Prompt template errors
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template cannot be empty")]
    EmptyTemplate,

    #[error("Invalid template settings: {0}")]
    InvalidSettings(String),

    #[error("Failed to parse template: {0}")]
    Parse(#[source] minijinja::Error),

    #[error("Failed to render template: {0}")]
    Render(#[source] minijinja::Error),
}
