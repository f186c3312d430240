//! Tool handler trait and descriptor types.

use crate::controller::TransportError;
use crate::tools::schema::{self, Arguments, ParamSpec, ValidationError};
use crate::types::FailureKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Static description of a tool: name, purpose and declared parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl ToolDescriptor {
    pub fn new(name: &str, description: &str, params: Vec<ParamSpec>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            params,
        }
    }

    /// Wire form advertised to the client.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: schema::input_schema(&self.params),
        }
    }
}

/// Definition of a tool as listed to the client (`tools/list`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Errors a handler may surface; converted to a failure result by the
/// dispatcher.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ToolError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidArguments(_) => FailureKind::InvalidArguments,
            Self::Transport(e) => e.kind(),
        }
    }
}

/// One callable capability.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Name, description and parameter schema.
    fn descriptor(&self) -> &ToolDescriptor;

    /// Check raw arguments. The default checks them against the declared
    /// parameters; override only to add cross-field rules.
    fn validate(&self, args: &serde_json::Value) -> Result<Arguments, ValidationError> {
        schema::validate_arguments(&self.descriptor().params, args)
    }

    /// Run the tool with validated arguments.
    async fn execute(&self, args: Arguments) -> Result<serde_json::Value, ToolError>;
}
