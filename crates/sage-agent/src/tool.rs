//! Tool trait and the registry the controller dispatches through

use async_trait::async_trait;
use sage_ai::Content;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Result of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Content returned to the model
    pub content: Vec<Content>,
    /// Whether the execution resulted in an error
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful text result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: false,
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(message)],
            is_error: true,
        }
    }

    /// Get the text content as a single string
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| c.as_text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A capability the reasoner can invoke by name
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (used in API calls)
    fn name(&self) -> &str;

    /// Tool description for the model
    fn description(&self) -> &str;

    /// JSON Schema for parameters
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool. Failures are reported in the result, not raised.
    async fn execute(&self, arguments: serde_json::Value) -> ToolResult;
}

/// Type alias for a shared tool
pub type BoxedTool = Arc<dyn Tool>;

/// Schema shared by every tool that takes a single search query
pub fn query_schema(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": description
            }
        },
        "required": ["query"]
    })
}

/// Convert a Tool to a sage_ai::Tool for API calls
pub fn to_api_tool(tool: &dyn Tool) -> sage_ai::Tool {
    sage_ai::Tool {
        name: tool.name().to_string(),
        description: tool.description().to_string(),
        parameters: tool.parameters_schema(),
    }
}

struct RegisteredTool {
    tool: BoxedTool,
    validator: Option<Arc<jsonschema::Validator>>,
}

/// Ordered set of uniquely named tools.
///
/// Each tool's parameter schema is compiled once at registration.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, rejecting duplicate names.
    pub fn register(&mut self, tool: BoxedTool) -> Result<()> {
        let name = tool.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(Error::DuplicateTool(name));
        }

        let schema = tool.parameters_schema();
        let validator = match jsonschema::validator_for(&schema) {
            Ok(v) => Some(Arc::new(v)),
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "invalid tool schema, arguments will not be validated");
                None
            }
        };

        self.by_name.insert(name, self.tools.len());
        self.tools.push(RegisteredTool { tool, validator });
        Ok(())
    }

    /// Build a registry from a list of tools.
    pub fn from_tools(tools: impl IntoIterator<Item = BoxedTool>) -> Result<Self> {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&BoxedTool> {
        self.by_name.get(name).map(|&i| &self.tools[i].tool)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.tool.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Iterate tools in registration order
    pub fn iter(&self) -> impl Iterator<Item = &BoxedTool> {
        self.tools.iter().map(|t| &t.tool)
    }

    /// API definitions in registration order
    pub fn definitions(&self) -> Vec<sage_ai::Tool> {
        self.tools.iter().map(|t| to_api_tool(t.tool.as_ref())).collect()
    }

    /// Validate and run a tool by exact name.
    ///
    /// Unknown names and invalid arguments come back as error results.
    pub async fn invoke(&self, name: &str, arguments: serde_json::Value) -> ToolResult {
        let Some(&index) = self.by_name.get(name) else {
            return ToolResult::error(format!("Tool not found: {}", name));
        };
        let entry = &self.tools[index];

        if let Some(err) = entry
            .validator
            .as_deref()
            .and_then(|v| validate_with_validator(&arguments, v))
        {
            return ToolResult::error(err);
        }

        entry.tool.execute(arguments).await
    }
}

/// Validate tool arguments using a pre-compiled validator.
/// Returns `Some(error_message)` if validation fails, `None` if valid.
fn validate_with_validator(
    args: &serde_json::Value,
    validator: &jsonschema::Validator,
) -> Option<String> {
    let errors: Vec<String> = validator
        .iter_errors(args)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{}: {}", path, e)
            }
        })
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(format!(
            "Tool argument validation failed:\n{}",
            errors.join("\n")
        ))
    }
}
