//! Function input supplied by the Composition pipeline step
//!
//! ```yaml
//! input:
//!   apiVersion: logging-labeler.fn.crossplane.io/v1beta1
//!   kind: Input
//!   namespaceLabel: example.com/project
//! ```

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// API version of the function input
pub const INPUT_API_VERSION: &str = "logging-labeler.fn.crossplane.io/v1beta1";

/// Kind of the function input
pub const INPUT_KIND: &str = "Input";

/// Input for the logging labeler
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Input {
    /// API version of the input object
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    /// Kind of the input object
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    /// Namespace label key whose value is the project identifier
    pub namespace_label: String,
}

impl Input {
    /// Create an input for the given namespace label key
    pub fn new(namespace_label: impl Into<String>) -> Self {
        Self {
            api_version: INPUT_API_VERSION.to_string(),
            kind: INPUT_KIND.to_string(),
            namespace_label: namespace_label.into(),
        }
    }

    /// Reject inputs that decoded but can't be used
    pub fn validate(&self) -> Result<()> {
        if self.namespace_label.trim().is_empty() {
            return Err(Error::config("namespaceLabel must not be empty"));
        }
        Ok(())
    }
}
