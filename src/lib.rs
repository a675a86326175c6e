//! 'prompt-schema' - Variable discovery and JSON Schema generation for prompt templates.
//!
//! Given a Django/Jinja-style template, this crate determines which variables
//! and loop arrays the template references, without executing it, and
//! describes the expected input as a draft-04 JSON Schema. Hosts use the
//! schema to offer one input field per variable, then hand the collected
//! values back for rendering.
//!
//! Discovery is lexical. `{{ user.name|upper }}` contributes the name
//! `user.name`; `{% for task in tasks %}` marks `tasks` as an array.
//!
//! ```
//! use prompt_schema::{build_schema, extract_for_loop_arrays, extract_variables};
//!
//! let template = "{{ greeting }}! {% for task in tasks %}- {{ task }}\n{% endfor %}";
//!
//! assert_eq!(extract_variables(template), vec!["greeting", "task"]);
//! assert_eq!(extract_for_loop_arrays(template), vec!["tasks"]);
//!
//! let schema = build_schema(template);
//! assert!(schema.property("tasks").unwrap().is_array());
//! ```
//!
//! Rendering goes through [`PromptTemplate`], which runs `minijinja` with a
//! Django compatibility layer (`|floatformat:0`, `forloop.Counter`).

pub mod django;
pub mod error;
pub mod loops;
pub mod observability;
pub mod render;
pub mod schema;
pub mod variables;

pub use error::{SchemaError, TemplateError};
pub use loops::{extract_for_loop_arrays, is_array_variable, is_loop_iterator};
pub use render::{
    PromptConfig, PromptSettings, PromptTemplate, RenderedPrompt, TemplateVariables,
    render_prompt,
};
pub use schema::{
    DRAFT_04_SCHEMA, ItemsDescriptor, PropertyDescriptor, PropertyType, SchemaDocument,
    SchemaProvider, Settings, TemplateSchemaProvider, build_schema, build_schema_json,
    get_input_schema, template_schema_json,
};
pub use variables::extract_variables;
