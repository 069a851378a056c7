//! The `Logging` resource of the logging operator and its synthesis
//!
//! Only the fields this function sets are modelled. The logging operator
//! fills in everything else with its own defaults.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Spec of a `logging.banzaicloud.io/v1beta1` `Logging`
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "logging.banzaicloud.io",
    version = "v1beta1",
    kind = "Logging",
    plural = "loggings"
)]
#[serde(rename_all = "camelCase")]
pub struct LoggingSpec {
    /// Namespace the operator deploys the logging stack into
    pub control_namespace: String,

    /// Limits which namespaces' flows and outputs this Logging picks up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_namespace_selector: Option<LabelSelector>,
}

/// Build the Logging for a project's control namespace
///
/// The selector has exactly one label, `label_key: project_id`, so the stack
/// only watches namespaces belonging to the same project. Metadata is left
/// empty; Crossplane names composed resources itself.
pub fn synthesize(control_namespace: &str, label_key: &str, project_id: &str) -> Logging {
    Logging {
        metadata: ObjectMeta::default(),
        spec: LoggingSpec {
            control_namespace: control_namespace.to_string(),
            watch_namespace_selector: Some(LabelSelector {
                match_labels: Some(BTreeMap::from([(
                    label_key.to_string(),
                    project_id.to_string(),
                )])),
                match_expressions: None,
            }),
        },
    }
}
