use serde_json::{Value, json};
use thiserror::Error;

/// Handler selector for a registered tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolKind {
    Search,
    Fetch,
    List,
}

#[derive(Debug)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ToolKind,
    pub input_schema: Value,
    pub output_schema: Option<Value>,
}

impl ToolDefinition {
    /// Catalog entry as exposed by `tools/list`.
    pub fn to_value(&self) -> Value {
        let mut entry = json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        });
        if let Some(schema) = &self.output_schema {
            entry["responseSchema"] = schema.clone();
        }
        entry
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate tool name '{0}'")]
    DuplicateName(&'static str),
}

/// Immutable tool catalog. Iteration order is declaration order.
#[derive(Debug)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<ToolDefinition>) -> Result<Self, RegistryError> {
        for (i, tool) in tools.iter().enumerate() {
            if tools[..i].iter().any(|earlier| earlier.name == tool.name) {
                return Err(RegistryError::DuplicateName(tool.name));
            }
        }
        Ok(Self { tools })
    }

    /// The connector's built-in catalog.
    pub fn standard() -> Result<Self, RegistryError> {
        Self::new(tool_definitions())
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn catalog(&self) -> Value {
        let tools: Vec<Value> = self.tools.iter().map(ToolDefinition::to_value).collect();
        json!({ "tools": tools })
    }
}

fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "search",
            description: "Search construction projects, customers, and data",
            kind: ToolKind::Search,
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search terms for construction data"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results",
                        "default": 10,
                        "minimum": 1,
                        "maximum": 100
                    }
                },
                "required": ["query"]
            }),
            output_schema: None,
        },
        ToolDefinition {
            name: "fetch",
            description: "Fetch detailed information about a specific construction item",
            kind: ToolKind::Fetch,
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "string",
                        "description": "Unique identifier for the construction item"
                    }
                },
                "required": ["id"]
            }),
            output_schema: Some(json!({
                "type": "object",
                "properties": {
                    "id": { "type": "string" },
                    "title": { "type": "string" },
                    "text": { "type": "string" },
                    "url": { "type": "string" },
                    "metadata": { "type": "object" }
                },
                "required": ["id"]
            })),
        },
        ToolDefinition {
            name: "list",
            description: "List construction jobs or customers",
            kind: ToolKind::List,
            input_schema: json!({
                "type": "object",
                "properties": {
                    "type": {
                        "type": "string",
                        "enum": ["jobs", "customers"],
                        "default": "jobs"
                    },
                    "limit": {
                        "type": "integer",
                        "default": 10,
                        "minimum": 1,
                        "maximum": 100
                    }
                }
            }),
            output_schema: None,
        },
    ]
}
