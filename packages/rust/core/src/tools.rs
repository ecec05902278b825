//! Tool surface: definitions and handlers for `publish_post`, `list_tags`
//! and `list_categories`.
//!
//! Handlers never fail: every error is folded into an error [`ToolResult`].
//! Only an unknown tool name or malformed arguments are rejected outright.

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use halopub_client::HaloClient;
use halopub_shared::{HaloPubError, Result};

use crate::workflow::{PublishRequest, PublishWorkflow, SilentProgress};

pub const PUBLISH_POST: &str = "publish_post";
pub const LIST_TAGS: &str = "list_tags";
pub const LIST_CATEGORIES: &str = "list_categories";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Text answer of a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub text: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// A tool as advertised to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// The three tools with their JSON input schemas.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: PUBLISH_POST,
            description: "Publish a post to the Halo blog, generating tags and categories automatically",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "Post title"},
                    "content": {"type": "string", "description": "Post content (Markdown supported)"},
                    "excerpt": {"type": "string", "description": "Post excerpt (optional)"},
                    "slug": {"type": "string", "description": "URL slug (optional)"},
                    "tags": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Tag names (optional, generated when omitted)"
                    },
                    "categories": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Category names (optional, generated when omitted)"
                    },
                    "allowComment": {"type": "boolean", "description": "Allow comments", "default": true},
                    "pinned": {"type": "boolean", "description": "Pin the post", "default": false}
                },
                "required": ["title", "content"]
            }),
        },
        ToolDefinition {
            name: LIST_TAGS,
            description: "List all tags",
            input_schema: json!({"type": "object", "properties": {}}),
        },
        ToolDefinition {
            name: LIST_CATEGORIES,
            description: "List all categories",
            input_schema: json!({"type": "object", "properties": {}}),
        },
    ]
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Dispatches tool calls against one backend.
#[derive(Debug, Clone)]
pub struct ToolHandlers {
    workflow: PublishWorkflow,
}

impl ToolHandlers {
    pub fn new(client: HaloClient) -> Self {
        Self {
            workflow: PublishWorkflow::new(client),
        }
    }

    /// Run the tool `name` with JSON `arguments`.
    ///
    /// Fails with [`HaloPubError::Validation`] for an unknown tool or
    /// arguments that do not fit its schema.
    #[instrument(skip(self, arguments))]
    pub async fn call(&self, name: &str, arguments: Value) -> Result<ToolResult> {
        match name {
            PUBLISH_POST => {
                let arguments = if arguments.is_null() { json!({}) } else { arguments };
                let request: PublishRequest = serde_json::from_value(arguments).map_err(|e| {
                    HaloPubError::validation(format!("invalid {PUBLISH_POST} arguments: {e}"))
                })?;
                Ok(self.publish_post(&request).await)
            }
            LIST_TAGS => Ok(self.list_tags().await),
            LIST_CATEGORIES => Ok(self.list_categories().await),
            other => Err(HaloPubError::validation(format!("unknown tool: {other}"))),
        }
    }

    pub async fn publish_post(&self, request: &PublishRequest) -> ToolResult {
        match self.workflow.publish(request, &SilentProgress).await {
            Ok(outcome) => ToolResult::success(outcome.summary()),
            Err(failure) => {
                warn!(stage = %failure.stage, error = %failure.error, "publish failed");
                ToolResult::error(format!("Failed to publish post: {}", failure.error))
            }
        }
    }

    pub async fn list_tags(&self) -> ToolResult {
        match self.workflow.client().get_tags().await {
            Ok(tags) => {
                info!(count = tags.items.len(), "listed tags");
                let lines: Vec<String> = tags
                    .items
                    .iter()
                    .map(|t| format!("- {} ({})", t.spec.display_name, t.spec.slug))
                    .collect();
                ToolResult::success(format!(
                    "Tags ({} total):\n{}",
                    tags.items.len(),
                    lines.join("\n")
                ))
            }
            Err(e) => ToolResult::error(format!("Failed to list tags: {e}")),
        }
    }

    pub async fn list_categories(&self) -> ToolResult {
        match self.workflow.client().get_categories().await {
            Ok(categories) => {
                info!(count = categories.items.len(), "listed categories");
                let lines: Vec<String> = categories
                    .items
                    .iter()
                    .map(|c| {
                        let description = match c.spec.description.as_str() {
                            "" => "none",
                            d => d,
                        };
                        format!("- {} ({}): {description}", c.spec.display_name, c.spec.slug)
                    })
                    .collect();
                ToolResult::success(format!(
                    "Categories ({} total):\n{}",
                    categories.items.len(),
                    lines.join("\n")
                ))
            }
            Err(e) => ToolResult::error(format!("Failed to list categories: {e}")),
        }
    }
}
