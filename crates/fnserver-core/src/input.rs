//! The `server.fn.crossplane.io/v1alpha1` `ServerInput` API type.
//!
//! A composition passes a `ServerInput` as the input of the function step. It
//! names the server function to invoke and carries that function's own input.
//!
//! ```yaml
//! apiVersion: server.fn.crossplane.io/v1alpha1
//! kind: ServerInput
//! spec:
//!   functionName: my-function
//!   input:
//!     apiGroups: [""]
//!     resources: [pods]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ServerError;

pub const GROUP: &str = "server.fn.crossplane.io";
pub const VERSION: &str = "v1alpha1";
pub const KIND: &str = "ServerInput";

/// `group/version` string of the `ServerInput` type.
pub fn api_version() -> String {
    format!("{GROUP}/{VERSION}")
}

/// Request data for a server function call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInput {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub spec: ServerInputSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInputSpec {
    /// Name of the server function to invoke.
    #[serde(default)]
    pub function_name: String,
    /// Payload handed to the function. Any valid JSON.
    #[serde(default)]
    pub input: Value,
}

impl ServerInput {
    pub fn new(function_name: impl Into<String>, input: Value) -> Self {
        Self {
            api_version: api_version(),
            kind: KIND.into(),
            metadata: None,
            spec: ServerInputSpec {
                function_name: function_name.into(),
                input,
            },
        }
    }

    /// Decode the routing envelope out of a request's generic input slot.
    pub fn from_value(value: Option<&Value>) -> Result<Self, ServerError> {
        let value = value.ok_or_else(|| ServerError::InvalidInput("missing input".into()))?;
        let input: ServerInput = serde_json::from_value(value.clone())
            .map_err(|e| ServerError::decode("input", e))?;
        input.validate()?;
        Ok(input)
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        if self.spec.function_name.is_empty() {
            return Err(ServerError::InvalidInput(
                "spec.functionName must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn function_name(&self) -> &str {
        &self.spec.function_name
    }
}
